//! Radio-level device types: adapter state, advertisements, candidates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of one physical device, as assigned by the radio stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DeviceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for DeviceId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for DeviceId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// Power/authorization state reported by the radio adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdapterState {
	/// No state reported yet.
	#[default]
	Unknown,
	PoweredOff,
	PoweredOn,
	Unauthorized,
	Unsupported,
	Resetting,
}

impl AdapterState {
	/// Whether scanning may start in this state.
	pub fn is_ready(self) -> bool {
		matches!(self, AdapterState::PoweredOn)
	}
}

impl fmt::Display for AdapterState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			AdapterState::Unknown => "unknown",
			AdapterState::PoweredOff => "poweredOff",
			AdapterState::PoweredOn => "poweredOn",
			AdapterState::Unauthorized => "unauthorized",
			AdapterState::Unsupported => "unsupported",
			AdapterState::Resetting => "resetting",
		};
		f.write_str(name)
	}
}

/// One advertisement event from the scan stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
	pub identifier: DeviceId,
	/// Advertised local name; absent for anonymous peripherals.
	#[serde(default)]
	pub display_name: Option<String>,
	/// RSSI in dBm.
	pub signal_strength: i16,
	#[serde(default)]
	pub is_connectable: bool,
}

/// A device offered for selection after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDevice {
	pub identifier: DeviceId,
	pub display_name: String,
	pub signal_strength: i16,
	pub is_connectable: bool,
}

impl CandidateDevice {
	/// Builds a candidate from a named advertisement.
	///
	/// Returns `None` for anonymous advertisements, which can never match a
	/// device-family filter.
	pub fn from_advertisement(ad: Advertisement) -> Option<Self> {
		let display_name = ad.display_name?;
		Some(Self {
			identifier: ad.identifier,
			display_name,
			signal_strength: ad.signal_strength,
			is_connectable: ad.is_connectable,
		})
	}
}
