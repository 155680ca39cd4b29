//! Presentation callbacks.

use std::sync::Arc;

use hwpair_protocol::{AuthenticatedSession, CandidateDevice, DeviceId};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// Receives progress, error, and navigation signals from the pairing core.
///
/// All methods default to no-ops.
pub trait PairingObserver: Send + Sync {
	fn candidates_changed(&self, _candidates: &[CandidateDevice]) {}

	fn progress_started(&self) {}

	fn progress_stopped(&self) {}

	/// A pairing attempt failed; `message` is ready for display.
	fn error(&self, _message: &str) {}

	/// Login finished; the caller should enter the authenticated area.
	fn authenticated(&self, _session: &AuthenticatedSession) {}
}

/// Logs every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PairingObserver for TracingObserver {
	fn candidates_changed(&self, candidates: &[CandidateDevice]) {
		info!(target = "hwpair.observer", count = candidates.len(), "candidates changed");
	}

	fn progress_started(&self) {
		info!(target = "hwpair.observer", "login in progress");
	}

	fn progress_stopped(&self) {
		info!(target = "hwpair.observer", "login progress finished");
	}

	fn error(&self, message: &str) {
		warn!(target = "hwpair.observer", %message, "pairing failed");
	}

	fn authenticated(&self, session: &AuthenticatedSession) {
		info!(target = "hwpair.observer", device = %session.device, network = %session.network, "authenticated");
	}
}

/// Signal captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ObserverEvent {
	Candidates { count: usize },
	ProgressStarted,
	ProgressStopped,
	Error { message: String },
	Authenticated { device: DeviceId },
}

/// Records every signal in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
	events: Arc<Mutex<Vec<ObserverEvent>>>,
}

impl RecordingObserver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<ObserverEvent> {
		self.events.lock().clone()
	}

	pub fn count(&self, event: &ObserverEvent) -> usize {
		self.events.lock().iter().filter(|e| *e == event).count()
	}

	fn push(&self, event: ObserverEvent) {
		self.events.lock().push(event);
	}
}

impl PairingObserver for RecordingObserver {
	fn candidates_changed(&self, candidates: &[CandidateDevice]) {
		self.push(ObserverEvent::Candidates { count: candidates.len() });
	}

	fn progress_started(&self) {
		self.push(ObserverEvent::ProgressStarted);
	}

	fn progress_stopped(&self) {
		self.push(ObserverEvent::ProgressStopped);
	}

	fn error(&self, message: &str) {
		self.push(ObserverEvent::Error {
			message: message.to_string(),
		});
	}

	fn authenticated(&self, session: &AuthenticatedSession) {
		self.push(ObserverEvent::Authenticated {
			device: session.device.clone(),
		});
	}
}

/// Emits `progress_started` on creation and `progress_stopped` on drop, so
/// the stop signal fires on every exit path including cancellation.
pub(crate) struct ProgressGuard {
	observer: Arc<dyn PairingObserver>,
}

impl ProgressGuard {
	pub(crate) fn start(observer: Arc<dyn PairingObserver>) -> Self {
		observer.progress_started();
		Self { observer }
	}
}

impl Drop for ProgressGuard {
	fn drop(&mut self) {
		self.observer.progress_stopped();
	}
}
