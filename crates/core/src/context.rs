use std::sync::Arc;

use hwpair_runtime::{AppDelegate, RadioAdapter, RemoteSession};

use crate::config::PairingConfig;
use crate::observer::{PairingObserver, TracingObserver};
use crate::session::SessionState;

/// Collaborators shared by every pairing component.
#[derive(Clone)]
pub struct PairingContext {
	pub adapter: Arc<dyn RadioAdapter>,
	pub remote: Arc<dyn RemoteSession>,
	pub app_delegate: Arc<dyn AppDelegate>,
	pub observer: Arc<dyn PairingObserver>,
	pub session: SessionState,
	pub config: PairingConfig,
}

impl PairingContext {
	/// Context with a fresh session slot and a logging observer.
	pub fn new(
		adapter: Arc<dyn RadioAdapter>,
		remote: Arc<dyn RemoteSession>,
		app_delegate: Arc<dyn AppDelegate>,
		config: PairingConfig,
	) -> Self {
		Self {
			adapter,
			remote,
			app_delegate,
			observer: Arc::new(TracingObserver),
			session: SessionState::new(),
			config,
		}
	}

	pub fn with_observer(mut self, observer: Arc<dyn PairingObserver>) -> Self {
		self.observer = observer;
		self
	}

	/// Shares an existing session slot instead of the fresh one.
	pub fn with_session(mut self, session: SessionState) -> Self {
		self.session = session;
		self
	}
}

impl std::fmt::Debug for PairingContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PairingContext")
			.field("session", &self.session)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
