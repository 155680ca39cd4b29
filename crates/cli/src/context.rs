use std::path::{Path, PathBuf};

use hwpair::PairingConfig;
use tracing::debug;

use crate::cli::Cli;
use crate::error::Result;
use crate::store::PairedDeviceStore;

const CONFIG_FILE: &str = "config.json";
const PAIRED_FILE: &str = "paired.json";

/// Resolved configuration shared by every command.
#[derive(Debug)]
pub struct CommandContext {
	pub config: PairingConfig,
	config_dir: PathBuf,
}

impl CommandContext {
	/// Loads the config file and applies command-line overrides.
	///
	/// An explicit `--config` must exist; the default location may be absent.
	pub fn load(cli: &Cli) -> Result<Self> {
		let (mut config, config_dir) = match &cli.config {
			Some(path) => (PairingConfig::load(path)?, path.parent().map(Path::to_path_buf).unwrap_or_default()),
			None => {
				let dir = default_config_dir();
				(PairingConfig::load_or_default(&dir.join(CONFIG_FILE))?, dir)
			}
		};

		if let Some(network) = cli.network {
			config = config.with_network(network);
		}
		if let Some(timeout_ms) = cli.timeout_ms {
			config.stage_timeout_ms = timeout_ms;
		}
		if let Some(filter) = &cli.filter {
			config = config.with_name_filter(filter.clone());
		}
		debug!(target = "hwpair.cli", ?config, dir = %config_dir.display(), "config resolved");

		Ok(Self { config, config_dir })
	}

	pub fn paired_store(&self) -> PairedDeviceStore {
		PairedDeviceStore::load(self.config_dir.join(PAIRED_FILE))
	}
}

fn default_config_dir() -> PathBuf {
	dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("hwpair")
}
