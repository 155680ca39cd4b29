//! Two-factor login handshake.
//!
//! Registration and login are two sequential challenge round trips, both
//! using the signing device's descriptor as second factor. The handshake is
//! single-flight per orchestrator and writes [`SessionState`] only after the
//! second challenge resolves.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hwpair_protocol::{AuthenticatedSession, Network};
use hwpair_runtime::{AppDelegate, RemoteSession, SessionError};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::connect::DeviceConnection;
use crate::context::PairingContext;
use crate::error::{AuthError, LoginStep};
use crate::observer::{PairingObserver, ProgressGuard};
use crate::session::SessionState;

/// Handshake progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "camelCase")]
pub enum LoginState {
	Idle,
	ConnectingAppDelegate,
	IssuingRegisterOrLoginCall,
	ResolvingChallenge,
	LoggingIn,
	ResolvingChallenge2,
	Authenticated,
	Failed(String),
}

#[derive(Clone)]
pub struct LoginOrchestrator {
	remote: Arc<dyn RemoteSession>,
	app_delegate: Arc<dyn AppDelegate>,
	observer: Arc<dyn PairingObserver>,
	session: SessionState,
	network: Network,
	in_flight: Arc<Mutex<()>>,
	state: Arc<watch::Sender<LoginState>>,
}

impl LoginOrchestrator {
	pub fn new(context: &PairingContext) -> Self {
		let (state, _) = watch::channel(LoginState::Idle);
		Self {
			remote: Arc::clone(&context.remote),
			app_delegate: Arc::clone(&context.app_delegate),
			observer: Arc::clone(&context.observer),
			session: context.session.clone(),
			network: context.config.network,
			in_flight: Arc::new(Mutex::new(())),
			state: Arc::new(state),
		}
	}

	pub fn state(&self) -> LoginState {
		self.state.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<LoginState> {
		self.state.subscribe()
	}

	/// Runs the handshake with `device` as second factor.
	///
	/// On success the connection moves into the session slot. A call made
	/// while another is running fails with [`AuthError::Busy`] without
	/// touching the running one.
	pub async fn authenticate(&self, device: DeviceConnection) -> Result<AuthenticatedSession, AuthError> {
		let _progress = ProgressGuard::start(Arc::clone(&self.observer));
		let Ok(_flight) = self.in_flight.try_lock() else {
			warn!(target = "hwpair.login", device = %device.identifier(), "authentication already running");
			return Err(AuthError::Busy);
		};

		let mut transitions = Transitions::new(&self.state);
		info!(target = "hwpair.login", device = %device.identifier(), network = %self.network, "authenticating");

		match self.handshake(&device, &mut transitions).await {
			Ok(login_data) => {
				let session = AuthenticatedSession {
					device: device.identifier().clone(),
					application: device.application().clone(),
					network: self.network,
					login_data,
					authenticated_at: unix_now(),
				};
				self.session.set(session.clone(), device);
				transitions.settle(LoginState::Authenticated);
				info!(target = "hwpair.login", device = %session.device, "authenticated");
				Ok(session)
			}
			Err(err) => {
				warn!(target = "hwpair.login", error = %err, "authentication failed");
				transitions.settle(LoginState::Failed(err.to_string()));
				Err(err)
			}
		}
	}

	async fn handshake(&self, device: &DeviceConnection, transitions: &mut Transitions<'_>) -> Result<Value, AuthError> {
		transitions.enter(LoginState::ConnectingAppDelegate);
		self.app_delegate.connect().await.map_err(setup_failed)?;

		let factor = device.hw_device().as_factor();

		transitions.enter(LoginState::IssuingRegisterOrLoginCall);
		let challenge = self.remote.register_user(&factor).await.map_err(challenge_failed(LoginStep::Register))?;
		transitions.enter(LoginState::ResolvingChallenge);
		challenge.resolve().await.map_err(challenge_failed(LoginStep::Register))?;

		transitions.enter(LoginState::LoggingIn);
		let challenge = self.remote.login(&factor).await.map_err(challenge_failed(LoginStep::Login))?;
		transitions.enter(LoginState::ResolvingChallenge2);
		challenge.resolve().await.map_err(challenge_failed(LoginStep::Login))
	}
}

fn setup_failed(err: SessionError) -> AuthError {
	match err {
		SessionError::Setup(cause) => AuthError::SetupFailed(cause),
		other => AuthError::SetupFailed(other.to_string()),
	}
}

fn challenge_failed(step: LoginStep) -> impl Fn(SessionError) -> AuthError {
	move |err| AuthError::ChallengeFailed {
		step,
		cause: err.to_string(),
	}
}

fn unix_now() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Publishes state transitions of one run; resets to `Idle` if the run is
/// dropped before settling.
struct Transitions<'a> {
	state: &'a watch::Sender<LoginState>,
	settled: bool,
}

impl<'a> Transitions<'a> {
	fn new(state: &'a watch::Sender<LoginState>) -> Self {
		Self { state, settled: false }
	}

	fn enter(&mut self, next: LoginState) {
		debug!(target = "hwpair.login", state = ?next, "login state");
		self.state.send_replace(next);
	}

	fn settle(&mut self, last: LoginState) {
		self.enter(last);
		self.settled = true;
	}
}

impl Drop for Transitions<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.state.send_replace(LoginState::Idle);
		}
	}
}
