use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hwpair::NamePredicate;
use hwpair::protocol::Network;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "hwpair")]
#[command(about = "Discover, connect to, and log in with a BLE hardware wallet")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	/// Pairing config file (defaults to <config dir>/hwpair/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Wallet network; selects the expected device application
	#[arg(long, global = true)]
	pub network: Option<Network>,

	/// Timeout for each connection stage (ms)
	#[arg(long, global = true, value_name = "MS")]
	pub timeout_ms: Option<u64>,

	/// Advertisement name filter: `any`, `prefix:<text>`, or a substring
	#[arg(long, global = true, value_parser = parse_name_filter)]
	pub filter: Option<NamePredicate>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Scan for candidate devices
	Scan {
		/// Simulated radio scenario (JSON)
		#[arg(long, value_name = "FILE")]
		scenario: PathBuf,
		/// How long to scan (ms)
		#[arg(long, default_value = "3000")]
		duration_ms: u64,
	},

	/// Pair with a device and log in
	Pair {
		/// Simulated radio scenario (JSON)
		#[arg(long, value_name = "FILE")]
		scenario: PathBuf,
		/// Device identifier to select (defaults to the first candidate seen)
		#[arg(long)]
		device: Option<String>,
		/// How long to wait for the device to be discovered (ms)
		#[arg(long, default_value = "5000")]
		scan_ms: u64,
	},

	/// Check whether a running application name allows login
	Gate {
		/// Application name reported by the device
		running_app: String,
	},

	/// Remembered device management
	Paired {
		#[command(subcommand)]
		action: PairedAction,
	},
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Scan { .. } => "scan",
			Commands::Pair { .. } => "pair",
			Commands::Gate { .. } => "gate",
			Commands::Paired {
				action: PairedAction::Show,
			} => "paired.show",
			Commands::Paired {
				action: PairedAction::Clear,
			} => "paired.clear",
		}
	}
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedAction {
	/// Show the remembered device
	Show,
	/// Forget the remembered device
	Clear,
}

pub fn parse_name_filter(raw: &str) -> Result<NamePredicate, String> {
	if raw.eq_ignore_ascii_case("any") {
		return Ok(NamePredicate::Any);
	}
	if let Some(prefix) = raw.strip_prefix("prefix:") {
		return Ok(NamePredicate::Prefix(prefix.to_string()));
	}
	let needle = raw.strip_prefix("contains:").unwrap_or(raw);
	if needle.is_empty() {
		return Err("filter must not be empty".to_string());
	}
	Ok(NamePredicate::Contains(needle.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_scan_with_globals() {
		let cli = Cli::try_parse_from(["hwpair", "-vv", "-f", "json", "scan", "--scenario", "s.json", "--duration-ms", "250"]).unwrap();
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.format, OutputFormat::Json);
		match cli.command {
			Commands::Scan { scenario, duration_ms } => {
				assert_eq!(scenario, PathBuf::from("s.json"));
				assert_eq!(duration_ms, 250);
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn parses_pair_overrides() {
		let cli = Cli::try_parse_from([
			"hwpair",
			"pair",
			"--scenario",
			"s.json",
			"--device",
			"A1",
			"--network",
			"testnet",
			"--timeout-ms",
			"500",
			"--filter",
			"prefix:Nano X",
		])
		.unwrap();
		assert_eq!(cli.network, Some(Network::Testnet));
		assert_eq!(cli.timeout_ms, Some(500));
		assert_eq!(cli.filter, Some(NamePredicate::Prefix("Nano X".into())));
		assert_eq!(cli.command.name(), "pair");
	}

	#[test]
	fn parses_paired_actions() {
		let cli = Cli::try_parse_from(["hwpair", "paired", "clear"]).unwrap();
		assert_eq!(cli.command.name(), "paired.clear");
		assert!(Cli::try_parse_from(["hwpair", "paired", "forget"]).is_err());
	}

	#[test]
	fn name_filter_spellings() {
		assert_eq!(parse_name_filter("ANY"), Ok(NamePredicate::Any));
		assert_eq!(parse_name_filter("Nano"), Ok(NamePredicate::Contains("Nano".into())));
		assert_eq!(parse_name_filter("contains:S Plus"), Ok(NamePredicate::Contains("S Plus".into())));
		assert!(parse_name_filter("").is_err());
	}
}
