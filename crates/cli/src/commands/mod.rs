mod gate;
mod pair;
mod paired;
mod scan;

use std::time::Instant;

use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

/// Runs one command and prints its result envelope, including on failure.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let name = cli.command.name();
	let format = cli.format;
	let started = Instant::now();

	let ctx = match CommandContext::load(&cli) {
		Ok(ctx) => ctx,
		Err(err) => return emit::<()>(name, format, started, Err(err)),
	};

	match cli.command {
		Commands::Scan { scenario, duration_ms } => emit(name, format, started, scan::execute(&ctx, &scenario, duration_ms).await),
		Commands::Pair {
			scenario,
			device,
			scan_ms,
		} => emit(name, format, started, pair::execute(&ctx, &scenario, device.as_deref(), scan_ms).await),
		Commands::Gate { running_app } => emit(name, format, started, gate::execute(&ctx, &running_app)),
		Commands::Paired { action } => emit(name, format, started, paired::execute(&ctx, action)),
	}
}

fn emit<T: Serialize>(command: &str, format: OutputFormat, started: Instant, outcome: Result<T>) -> Result<()> {
	let builder = ResultBuilder::new(command).started_at(started);
	match outcome {
		Ok(data) => {
			print_result(&builder.data(data).build(), format);
			Ok(())
		}
		Err(err) => {
			let builder = match err.details() {
				Some(details) => builder.error_with_details(err.code(), err.message(), details),
				None => builder.error(err.code(), err.message()),
			};
			print_result(&builder.build(), format);
			Err(err)
		}
	}
}
