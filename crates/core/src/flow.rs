//! Scan-select-connect-login flow.
//!
//! [`PairingFlow`] owns at most one discovery run and one pairing attempt.
//! Selecting a device stops discovery, releases any authenticated session and
//! replaces the current attempt; the predecessor is torn down before the new
//! attempt starts connecting.

use std::sync::Arc;

use hwpair_protocol::{AuthenticatedSession, CandidateDevice};
use tracing::{debug, info};

use crate::attempt::{AttemptHandle, AttemptSlot};
use crate::connect::ConnectionEstablisher;
use crate::context::PairingContext;
use crate::discovery::{DeviceDiscovery, DiscoveryEvent, DiscoveryHandle};
use crate::error::PairingError;
use crate::gate::ApplicationGate;
use crate::login::{LoginOrchestrator, LoginState};
use crate::session::SessionState;

pub struct PairingFlow {
	context: PairingContext,
	discovery: DeviceDiscovery,
	establisher: Arc<ConnectionEstablisher>,
	gate: ApplicationGate,
	login: LoginOrchestrator,
	scan: Option<DiscoveryHandle>,
	candidates: Vec<CandidateDevice>,
	attempts: AttemptSlot,
}

impl PairingFlow {
	pub fn new(context: PairingContext) -> Self {
		Self {
			discovery: DeviceDiscovery::new(Arc::clone(&context.adapter), context.config.replace_policy),
			establisher: Arc::new(ConnectionEstablisher::new(Arc::clone(&context.adapter), &context.config)),
			gate: ApplicationGate::new(&context.config),
			login: LoginOrchestrator::new(&context),
			scan: None,
			candidates: Vec::new(),
			attempts: AttemptSlot::new(),
			context,
		}
	}

	/// Restarts discovery with the configured name filter.
	pub async fn start_discovery(&mut self) {
		self.stop_discovery().await;
		self.scan = Some(self.discovery.start(self.context.config.name_filter.clone()));
	}

	pub async fn stop_discovery(&mut self) {
		if let Some(scan) = self.scan.take() {
			scan.stop().await;
		}
		self.candidates.clear();
	}

	pub fn is_scanning(&self) -> bool {
		self.scan.as_ref().is_some_and(DiscoveryHandle::is_running)
	}

	/// Waits for the next discovery event and forwards it to the observer.
	/// `None` when no discovery is running or the run has ended.
	pub async fn next_discovery_event(&mut self) -> Option<DiscoveryEvent> {
		let event = self.scan.as_mut()?.next().await;
		match &event {
			Some(DiscoveryEvent::Snapshot(devices)) => {
				self.candidates = devices.clone();
				self.context.observer.candidates_changed(&self.candidates);
			}
			Some(DiscoveryEvent::Failed(err)) => {
				self.context.observer.error(&PairingError::from(err.clone()).user_message());
			}
			None => self.scan = None,
		}
		event
	}

	/// Latest candidate snapshot.
	pub fn candidates(&self) -> &[CandidateDevice] {
		&self.candidates
	}

	/// Pairs with `device`, disposing discovery and any running attempt first.
	///
	/// An authenticated session is released before the new attempt connects,
	/// so its device connection is closed by then.
	pub async fn select(&mut self, device: CandidateDevice) -> PairingAttempt {
		self.stop_discovery().await;
		self.attempts.dispose().await;
		if let Some(previous) = self.context.session.clear() {
			info!(target = "hwpair.flow", device = %previous.device, next = %device.identifier, "released session for re-pair");
		}

		let establisher = Arc::clone(&self.establisher);
		let gate = self.gate.clone();
		let login = self.login.clone();
		let observer = Arc::clone(&self.context.observer);

		let handle = self
			.attempts
			.spawn(async move {
				let result = pair(&establisher, &gate, &login, &device).await;
				match &result {
					Ok(session) => observer.authenticated(session),
					Err(err) => observer.error(&err.user_message()),
				}
				result
			})
			.await;
		debug!(target = "hwpair.flow", generation = handle.generation(), "pairing attempt started");
		PairingAttempt { handle }
	}

	/// Disposes discovery and any running attempt.
	pub async fn teardown(&mut self) {
		self.stop_discovery().await;
		self.attempts.dispose().await;
		debug!(target = "hwpair.flow", "flow torn down");
	}

	/// Clears the active session, closing its device connection.
	pub fn logout(&self) -> Option<AuthenticatedSession> {
		let session = self.context.session.clear();
		if session.is_some() {
			info!(target = "hwpair.flow", "logged out");
		}
		session
	}

	pub fn session(&self) -> &SessionState {
		&self.context.session
	}

	pub fn login_state(&self) -> LoginState {
		self.login.state()
	}

	pub fn context(&self) -> &PairingContext {
		&self.context
	}
}

async fn pair(
	establisher: &ConnectionEstablisher,
	gate: &ApplicationGate,
	login: &LoginOrchestrator,
	device: &CandidateDevice,
) -> Result<AuthenticatedSession, PairingError> {
	let connection = establisher.connect(device).await?;
	gate.check(connection.application())?;
	Ok(login.authenticate(connection).await?)
}

/// One pairing attempt started by [`PairingFlow::select`].
pub struct PairingAttempt {
	handle: AttemptHandle<Result<AuthenticatedSession, PairingError>>,
}

impl PairingAttempt {
	pub fn generation(&self) -> u64 {
		self.handle.generation()
	}

	/// Waits for the attempt; [`PairingError::Superseded`] if it was disposed.
	pub async fn outcome(self) -> Result<AuthenticatedSession, PairingError> {
		self.handle.outcome().await.unwrap_or(Err(PairingError::Superseded))
	}
}
