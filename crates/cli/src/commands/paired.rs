use tracing::info;

use crate::cli::PairedAction;
use crate::context::CommandContext;
use crate::error::Result;
use crate::output::PairedData;

pub fn execute(ctx: &CommandContext, action: PairedAction) -> Result<PairedData> {
	let mut store = ctx.paired_store();
	match action {
		PairedAction::Show => Ok(PairedData {
			device: store.current().cloned(),
			cleared: None,
		}),
		PairedAction::Clear => {
			let forgotten = store.forget();
			if forgotten.is_some() {
				store.save()?;
				info!(target = "hwpair.cli", path = %store.path().display(), "forgot paired device");
			}
			Ok(PairedData {
				device: None,
				cleared: forgotten.map(|device| device.identifier),
			})
		}
	}
}
