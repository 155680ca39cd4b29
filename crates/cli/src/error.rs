use hwpair::{ConfigError, ConnectError, PairingError};
use serde_json::{Value, json};
use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Pairing(#[from] PairingError),

	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("no matching device discovered within {waited_ms}ms")]
	DeviceNotFound { waited_ms: u64 },

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("{0:#}")]
	Io(anyhow::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Pairing(err) => err.kind().into(),
			CliError::Config(_) => ErrorCode::ConfigError,
			CliError::DeviceNotFound { .. } => ErrorCode::DeviceNotFound,
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Io(_) => ErrorCode::IoError,
			CliError::Anyhow(_) => ErrorCode::InternalError,
		}
	}

	/// Message placed in the output envelope.
	pub fn message(&self) -> String {
		match self {
			CliError::Pairing(err) => err.user_message(),
			other => other.to_string(),
		}
	}

	/// Structured context for the output envelope, when there is any.
	pub fn details(&self) -> Option<Value> {
		match self {
			CliError::Pairing(PairingError::Connect(ConnectError::Timeout { stage, after })) => Some(json!({
				"stage": stage,
				"afterMs": after.as_millis() as u64,
			})),
			CliError::Pairing(PairingError::Connect(ConnectError::TransportFault { stage, details })) => Some(json!({
				"stage": stage,
				"cause": details,
			})),
			CliError::DeviceNotFound { waited_ms } => Some(json!({ "waitedMs": waited_ms })),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
	use hwpair::GateError;

	use super::*;

	#[test]
	fn pairing_errors_use_user_messages() {
		let err = CliError::from(PairingError::from(GateError::WrongApplication {
			running: "Ethereum".into(),
			expected: "Bitcoin".into(),
		}));
		assert_eq!(err.code(), ErrorCode::WrongApplication);
		assert_eq!(err.message(), "Quit current app and open Bitcoin app on your Ledger");
	}

	#[test]
	fn stage_errors_carry_details() {
		let err = CliError::from(PairingError::from(ConnectError::Timeout {
			stage: hwpair::ConnectStage::OpenChannel,
			after: std::time::Duration::from_secs(10),
		}));
		assert_eq!(err.details(), Some(json!({ "stage": "openChannel", "afterMs": 10000 })));
		assert_eq!(CliError::DeviceNotFound { waited_ms: 250 }.details(), Some(json!({ "waitedMs": 250 })));
		assert_eq!(CliError::InvalidInput("x".into()).details(), None);
	}

	#[test]
	fn io_errors_keep_context_chain() {
		let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
		let err = CliError::Io(anyhow::Error::new(source).context("reading scenario s.json"));
		assert_eq!(err.code(), ErrorCode::IoError);
		assert_eq!(err.message(), "reading scenario s.json: missing");
	}
}
