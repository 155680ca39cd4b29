//! Remembered device, persisted next to the pairing config.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use hwpair::protocol::{AuthenticatedSession, CandidateDevice, DeviceId, Network};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedDevice {
	pub identifier: DeviceId,
	pub display_name: String,
	pub network: Network,
	/// Unix seconds of the last successful login.
	pub paired_at: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairedFile {
	#[serde(default)]
	device: Option<PairedDevice>,
}

#[derive(Debug)]
pub struct PairedDeviceStore {
	path: PathBuf,
	file: PairedFile,
}

impl PairedDeviceStore {
	/// Loads the store; a missing or unreadable file starts empty.
	pub fn load(path: PathBuf) -> Self {
		let file = fs::read_to_string(&path)
			.ok()
			.and_then(|content| serde_json::from_str(&content).ok())
			.unwrap_or_default();
		Self { path, file }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn current(&self) -> Option<&PairedDevice> {
		self.file.device.as_ref()
	}

	pub fn is_current(&self, identifier: &DeviceId) -> bool {
		self.current().is_some_and(|device| &device.identifier == identifier)
	}

	pub fn remember(&mut self, candidate: &CandidateDevice, session: &AuthenticatedSession) {
		self.file.device = Some(PairedDevice {
			identifier: candidate.identifier.clone(),
			display_name: candidate.display_name.clone(),
			network: session.network,
			paired_at: if session.authenticated_at > 0 { session.authenticated_at } else { now_ts() },
		});
	}

	pub fn forget(&mut self) -> Option<PairedDevice> {
		self.file.device.take()
	}

	pub fn save(&self) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.with_context(|| format!("creating {}", parent.display()))
				.map_err(CliError::Io)?;
		}
		let json = serde_json::to_string_pretty(&self.file).context("encoding paired device")?;
		fs::write(&self.path, json)
			.with_context(|| format!("writing {}", self.path.display()))
			.map_err(CliError::Io)?;
		Ok(())
	}
}

fn now_ts() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
	use hwpair::protocol::ApplicationInfo;
	use serde_json::Value;

	use super::*;

	fn session(id: &str) -> (CandidateDevice, AuthenticatedSession) {
		let candidate = CandidateDevice {
			identifier: DeviceId::new(id),
			display_name: format!("Nano X {id}"),
			signal_strength: -50,
			is_connectable: true,
		};
		let session = AuthenticatedSession {
			device: DeviceId::new(id),
			application: ApplicationInfo::named("Bitcoin Test"),
			network: Network::Testnet,
			login_data: Value::Null,
			authenticated_at: 1_700_000_000,
		};
		(candidate, session)
	}

	#[test]
	fn remember_save_and_reload() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested/paired.json");

		let mut store = PairedDeviceStore::load(path.clone());
		assert!(store.current().is_none());

		let (candidate, session) = session("A1");
		store.remember(&candidate, &session);
		store.save().unwrap();

		let reloaded = PairedDeviceStore::load(path);
		let device = reloaded.current().unwrap();
		assert_eq!(device.display_name, "Nano X A1");
		assert_eq!(device.network, Network::Testnet);
		assert_eq!(device.paired_at, 1_700_000_000);
		assert!(reloaded.is_current(&DeviceId::new("A1")));
		assert!(!reloaded.is_current(&DeviceId::new("B2")));
	}

	#[test]
	fn corrupt_file_loads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("paired.json");
		fs::write(&path, "{oops").unwrap();

		let mut store = PairedDeviceStore::load(path);
		assert!(store.current().is_none());
		assert!(store.forget().is_none());
	}
}
