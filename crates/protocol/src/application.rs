//! On-device application reports and network naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Application name reported by the device while the dashboard is showing.
pub const DASHBOARD_MARKER: &str = "OLOS";

/// Running application as reported by the signing channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

impl ApplicationInfo {
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			version: None,
		}
	}
}

/// Wallet network the session logs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	#[default]
	Mainnet,
	Testnet,
}

impl Network {
	/// Maps a wallet-backend network name onto the network family.
	///
	/// Only `testnet` (any case) selects the test network.
	pub fn from_gdk_name(name: &str) -> Self {
		if name.trim().eq_ignore_ascii_case("testnet") {
			Network::Testnet
		} else {
			Network::Mainnet
		}
	}

	/// Name of the signing application the device must be running.
	pub fn expected_app_name(self) -> &'static str {
		match self {
			Network::Mainnet => "Bitcoin",
			Network::Testnet => "Bitcoin Test",
		}
	}
}

impl FromStr for Network {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
			"testnet" | "test" => Ok(Network::Testnet),
			_ => Err(format!("unknown network: {s}")),
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Network::Mainnet => write!(f, "mainnet"),
			Network::Testnet => write!(f, "testnet"),
		}
	}
}

/// Capability descriptor of a signing device, passed to the remote session as
/// the second authentication factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwDevice {
	pub name: String,
	#[serde(default)]
	pub supports_low_r: bool,
	#[serde(default)]
	pub supports_liquid: u8,
	#[serde(default)]
	pub supports_ae_protocol: u8,
	#[serde(default)]
	pub supports_arbitrary_scripts: bool,
}

impl HwDevice {
	/// Descriptor for a Ledger-family device.
	pub fn ledger() -> Self {
		Self {
			name: "Ledger".to_string(),
			supports_low_r: false,
			supports_liquid: 0,
			supports_ae_protocol: 0,
			supports_arbitrary_scripts: true,
		}
	}

	/// Second-factor payload in the shape the wallet backend expects.
	pub fn as_factor(&self) -> Value {
		json!({ "device": self })
	}
}
