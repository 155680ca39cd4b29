use clap::Parser;
use hwpair_cli::cli::Cli;
use hwpair_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		error!(target = "hwpair", error = %err, "command failed");
		std::process::exit(1);
	}
}
