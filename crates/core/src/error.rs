//! Error taxonomy for every pairing stage.
//!
//! Each stage maps its underlying fault into exactly one of these types.
//! [`PairingError`] is what the flow surfaces to presentation, together with
//! a stable [`ErrorKind`] and a human-readable message.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use hwpair_protocol::DeviceId;
use hwpair_runtime::AdapterError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
	#[error("bluetooth access is not authorized")]
	Unauthorized,

	#[error("bluetooth is not supported on this device")]
	Unsupported,

	#[error("adapter state stream ended before the adapter became ready")]
	AdapterGone,

	#[error("scan failed: {0}")]
	Transport(#[source] AdapterError),
}

/// Connection stage in which a fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectStage {
	Connect,
	OpenChannel,
	QueryApplication,
}

impl fmt::Display for ConnectStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectStage::Connect => write!(f, "connect"),
			ConnectStage::OpenChannel => write!(f, "open channel"),
			ConnectStage::QueryApplication => write!(f, "query application"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
	#[error("{stage} timed out after {}ms", .after.as_millis())]
	Timeout { stage: ConnectStage, after: Duration },

	#[error("{stage} failed: {details}")]
	TransportFault { stage: ConnectStage, details: String },

	#[error("device {0} is not connectable")]
	NotConnectable(DeviceId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
	#[error("device is at its dashboard; open the {expected} app")]
	AtDashboard { expected: String },

	#[error("device is running {running}; expected {expected}")]
	WrongApplication { running: String, expected: String },
}

/// Round trip of the login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginStep {
	Register,
	Login,
}

impl fmt::Display for LoginStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LoginStep::Register => write!(f, "register"),
			LoginStep::Login => write!(f, "login"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
	#[error("an authentication is already in progress")]
	Busy,

	#[error("session setup failed: {0}")]
	SetupFailed(String),

	#[error("{step} challenge failed: {cause}")]
	ChallengeFailed { step: LoginStep, cause: String },
}

/// Any failure of one pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),

	#[error(transparent)]
	Connect(#[from] ConnectError),

	#[error(transparent)]
	Gate(#[from] GateError),

	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error("pairing attempt was superseded")]
	Superseded,
}

/// Stable error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	DiscoveryUnavailable,
	ConnectTimeout,
	TransportFault,
	NotConnectable,
	AtDashboard,
	WrongApplication,
	LoginBusy,
	SetupFailed,
	ChallengeFailed,
	Superseded,
}

impl PairingError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			PairingError::Discovery(_) => ErrorKind::DiscoveryUnavailable,
			PairingError::Connect(ConnectError::Timeout { .. }) => ErrorKind::ConnectTimeout,
			PairingError::Connect(ConnectError::TransportFault { .. }) => ErrorKind::TransportFault,
			PairingError::Connect(ConnectError::NotConnectable(_)) => ErrorKind::NotConnectable,
			PairingError::Gate(GateError::AtDashboard { .. }) => ErrorKind::AtDashboard,
			PairingError::Gate(GateError::WrongApplication { .. }) => ErrorKind::WrongApplication,
			PairingError::Auth(AuthError::Busy) => ErrorKind::LoginBusy,
			PairingError::Auth(AuthError::SetupFailed(_)) => ErrorKind::SetupFailed,
			PairingError::Auth(AuthError::ChallengeFailed { .. }) => ErrorKind::ChallengeFailed,
			PairingError::Superseded => ErrorKind::Superseded,
		}
	}

	/// Message shown to the user, keyed by error kind.
	pub fn user_message(&self) -> String {
		match self {
			PairingError::Discovery(err) => format!("Bluetooth is unavailable: {err}"),
			PairingError::Connect(ConnectError::Timeout { .. }) => {
				"Communication with the device timed out. Make sure the unit is powered on, move closer to it, and try again.".to_string()
			}
			PairingError::Connect(ConnectError::TransportFault { .. }) => {
				"Connection to unit failed! Move closer to the unit and try again.".to_string()
			}
			PairingError::Connect(ConnectError::NotConnectable(_)) => "This device does not accept connections. Select another unit.".to_string(),
			PairingError::Gate(GateError::AtDashboard { expected }) => format!("Open {expected} app on your Ledger"),
			PairingError::Gate(GateError::WrongApplication { expected, .. }) => {
				format!("Quit current app and open {expected} app on your Ledger")
			}
			PairingError::Auth(err) => format!("Login failed: {err}"),
			PairingError::Superseded => "Pairing was cancelled.".to_string(),
		}
	}

	/// Whether the user should simply try again (as opposed to acting on the
	/// device first).
	pub fn is_retryable(&self) -> bool {
		!matches!(self, PairingError::Gate(_))
	}
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("invalid config {}: {reason}", .path.display())]
	Invalid { path: PathBuf, reason: String },
}
