use hwpair::protocol::ApplicationInfo;
use hwpair::{ApplicationGate, PairingError};

use crate::context::CommandContext;
use crate::error::Result;
use crate::output::GateData;

pub fn execute(ctx: &CommandContext, running_app: &str) -> Result<GateData> {
	let gate = ApplicationGate::new(&ctx.config);
	gate.check(&ApplicationInfo::named(running_app)).map_err(PairingError::from)?;
	Ok(GateData {
		running: running_app.to_string(),
		expected: gate.expected().to_string(),
		ready: true,
	})
}
