use hwpair::ErrorKind;
use hwpair::protocol::{AuthenticatedSession, CandidateDevice, DeviceId, Network};
use hwpair::{LoginState, ObserverEvent};
use serde::{Deserialize, Serialize};

use crate::store::PairedDevice;

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The result envelope returned by all commands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Stable error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
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
	DeviceNotFound,
	ConfigError,
	InvalidInput,
	IoError,
	InternalError,
}

impl From<ErrorKind> for ErrorCode {
	fn from(kind: ErrorKind) -> Self {
		match kind {
			ErrorKind::DiscoveryUnavailable => ErrorCode::DiscoveryUnavailable,
			ErrorKind::ConnectTimeout => ErrorCode::ConnectTimeout,
			ErrorKind::TransportFault => ErrorCode::TransportFault,
			ErrorKind::NotConnectable => ErrorCode::NotConnectable,
			ErrorKind::AtDashboard => ErrorCode::AtDashboard,
			ErrorKind::WrongApplication => ErrorCode::WrongApplication,
			ErrorKind::LoginBusy => ErrorCode::LoginBusy,
			ErrorKind::SetupFailed => ErrorCode::SetupFailed,
			ErrorKind::ChallengeFailed => ErrorCode::ChallengeFailed,
			ErrorKind::Superseded => ErrorCode::Superseded,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::DiscoveryUnavailable => write!(f, "DISCOVERY_UNAVAILABLE"),
			ErrorCode::ConnectTimeout => write!(f, "CONNECT_TIMEOUT"),
			ErrorCode::TransportFault => write!(f, "TRANSPORT_FAULT"),
			ErrorCode::NotConnectable => write!(f, "NOT_CONNECTABLE"),
			ErrorCode::AtDashboard => write!(f, "AT_DASHBOARD"),
			ErrorCode::WrongApplication => write!(f, "WRONG_APPLICATION"),
			ErrorCode::LoginBusy => write!(f, "LOGIN_BUSY"),
			ErrorCode::SetupFailed => write!(f, "SETUP_FAILED"),
			ErrorCode::ChallengeFailed => write!(f, "CHALLENGE_FAILED"),
			ErrorCode::Superseded => write!(f, "SUPERSEDED"),
			ErrorCode::DeviceNotFound => write!(f, "DEVICE_NOT_FOUND"),
			ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

/// Candidate row in scan output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
	#[serde(flatten)]
	pub device: CandidateDevice,
	/// Whether this is the remembered device.
	pub current: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanData {
	pub network: Network,
	pub candidates: Vec<CandidateView>,
	pub snapshots: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairData {
	pub session: AuthenticatedSession,
	pub login_state: LoginState,
	pub events: Vec<ObserverEvent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateData {
	pub running: String,
	pub expected: String,
	pub ready: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedData {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device: Option<PairedDevice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cleared: Option<DeviceId>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pairing_kinds_map_to_matching_codes() {
		let code = ErrorCode::from(ErrorKind::ChallengeFailed);
		assert_eq!(code, ErrorCode::ChallengeFailed);
		assert_eq!(code.to_string(), "CHALLENGE_FAILED");
		assert_eq!(serde_json::to_value(code).unwrap(), serde_json::json!(code.to_string()));
		assert_eq!(ErrorCode::from(ErrorKind::AtDashboard).to_string(), "AT_DASHBOARD");
	}
}
