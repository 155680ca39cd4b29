//! Pairing configuration.
//!
//! Loaded from a camelCase JSON file; every field has a default so partial
//! files are accepted.

use std::fs;
use std::path::Path;
use std::time::Duration;

use hwpair_protocol::{DASHBOARD_MARKER, Network};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_STAGE_TIMEOUT_MS;
use crate::error::ConfigError;

/// Advertisement name filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamePredicate {
	/// Name contains the given substring (case-sensitive).
	Contains(String),
	Prefix(String),
	/// Every named advertisement matches.
	Any,
}

impl NamePredicate {
	pub fn matches(&self, name: Option<&str>) -> bool {
		let Some(name) = name else {
			return false;
		};
		match self {
			NamePredicate::Contains(needle) => name.contains(needle.as_str()),
			NamePredicate::Prefix(prefix) => name.starts_with(prefix.as_str()),
			NamePredicate::Any => true,
		}
	}
}

impl Default for NamePredicate {
	fn default() -> Self {
		NamePredicate::Contains("Nano".to_string())
	}
}

/// Key used to replace an existing candidate when a new advertisement arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplacePolicy {
	/// Replace the entry with equal signal strength.
	#[default]
	SignalStrength,
	/// Replace the entry with the same device identifier.
	Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairingConfig {
	/// Bound for the connect and open-channel stages.
	pub stage_timeout_ms: u64,
	/// Optional bound for the application query; unbounded when absent.
	pub application_query_timeout_ms: Option<u64>,
	pub name_filter: NamePredicate,
	pub network: Network,
	pub replace_policy: ReplacePolicy,
	/// Substring of the application name reported at the device dashboard.
	pub dashboard_marker: String,
}

impl Default for PairingConfig {
	fn default() -> Self {
		Self {
			stage_timeout_ms: DEFAULT_STAGE_TIMEOUT_MS,
			application_query_timeout_ms: None,
			name_filter: NamePredicate::default(),
			network: Network::default(),
			replace_policy: ReplacePolicy::default(),
			dashboard_marker: DASHBOARD_MARKER.to_string(),
		}
	}
}

impl PairingConfig {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		if config.dashboard_marker.trim().is_empty() {
			return Err(ConfigError::Invalid {
				path: path.to_path_buf(),
				reason: "dashboardMarker must not be empty".to_string(),
			});
		}
		Ok(config)
	}

	/// Loads `path` when it exists, defaults otherwise.
	pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
		if path.exists() { Self::load(path) } else { Ok(Self::default()) }
	}

	pub fn stage_timeout(&self) -> Duration {
		Duration::from_millis(self.stage_timeout_ms)
	}

	pub fn application_query_timeout(&self) -> Option<Duration> {
		self.application_query_timeout_ms.map(Duration::from_millis)
	}

	/// Application the device must run for the configured network.
	pub fn expected_app_name(&self) -> &'static str {
		self.network.expected_app_name()
	}

	pub fn with_network(mut self, network: Network) -> Self {
		self.network = network;
		self
	}

	pub fn with_name_filter(mut self, filter: NamePredicate) -> Self {
		self.name_filter = filter;
		self
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn defaults_match_reference_behavior() {
		let config = PairingConfig::default();
		assert_eq!(config.stage_timeout(), Duration::from_secs(10));
		assert_eq!(config.application_query_timeout(), None);
		assert_eq!(config.name_filter, NamePredicate::Contains("Nano".into()));
		assert_eq!(config.replace_policy, ReplacePolicy::SignalStrength);
		assert_eq!(config.expected_app_name(), "Bitcoin");
	}

	#[test]
	fn partial_json_fills_defaults() {
		let config: PairingConfig = serde_json::from_str(r#"{"network":"testnet","nameFilter":{"prefix":"Nano X"}}"#).unwrap();
		assert_eq!(config.network, Network::Testnet);
		assert_eq!(config.expected_app_name(), "Bitcoin Test");
		assert_eq!(config.name_filter, NamePredicate::Prefix("Nano X".into()));
		assert_eq!(config.stage_timeout_ms, DEFAULT_STAGE_TIMEOUT_MS);
	}

	#[test]
	fn name_predicates() {
		assert!(NamePredicate::default().matches(Some("Nano X 1A2B")));
		assert!(!NamePredicate::default().matches(Some("Keyboard")));
		assert!(!NamePredicate::default().matches(None));
		assert!(NamePredicate::Prefix("Nano".into()).matches(Some("Nano S Plus")));
		assert!(!NamePredicate::Prefix("Nano".into()).matches(Some("Ledger Nano")));
		assert!(NamePredicate::Any.matches(Some("")));
		assert_eq!(serde_json::to_string(&NamePredicate::Any).unwrap(), "\"any\"");
	}

	#[test]
	fn load_reads_file_and_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{"stageTimeoutMs": 2500, "replacePolicy": "identifier"}}"#).unwrap();
		let config = PairingConfig::load(file.path()).unwrap();
		assert_eq!(config.stage_timeout(), Duration::from_millis(2500));
		assert_eq!(config.replace_policy, ReplacePolicy::Identifier);

		let mut broken = tempfile::NamedTempFile::new().unwrap();
		write!(broken, "{{not json").unwrap();
		assert!(matches!(PairingConfig::load(broken.path()), Err(ConfigError::Parse { .. })));
	}

	#[test]
	fn empty_dashboard_marker_is_rejected() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{"dashboardMarker": " "}}"#).unwrap();
		assert!(matches!(PairingConfig::load(file.path()), Err(ConfigError::Invalid { .. })));
	}

	#[test]
	fn missing_file_falls_back_to_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let config = PairingConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
		assert_eq!(config, PairingConfig::default());
		assert!(matches!(PairingConfig::load(&dir.path().join("absent.json")), Err(ConfigError::Io { .. })));
	}
}
