use hwpair_protocol::{AdapterState, DeviceId};
use thiserror::Error;

/// Faults raised by the radio stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
	#[error("adapter not ready (state: {0})")]
	NotReady(AdapterState),

	#[error("unknown peripheral: {0}")]
	UnknownPeripheral(DeviceId),

	#[error("bluetooth error: {0}")]
	Bluetooth(String),

	#[error("peripheral disconnected")]
	Disconnected,
}

/// Faults raised by the remote wallet session or the app delegate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
	#[error("remote session error: {0}")]
	Remote(String),

	#[error("device interaction failed: {0}")]
	Device(String),

	#[error("setup failed: {0}")]
	Setup(String),
}
