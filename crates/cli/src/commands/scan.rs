use std::path::Path;
use std::time::Duration;

use hwpair::{DiscoveryEvent, PairingError, PairingFlow};
use tracing::info;

use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CandidateView, ScanData};
use crate::scenario::Scenario;

pub async fn execute(ctx: &CommandContext, scenario: &Path, duration_ms: u64) -> Result<ScanData> {
	let world = Scenario::load(scenario)?.instantiate(ctx.config.clone());
	let store = ctx.paired_store();
	let playback = world.play();
	let mut flow = PairingFlow::new(world.context.clone());

	flow.start_discovery().await;
	let deadline = tokio::time::Instant::now() + Duration::from_millis(duration_ms);
	let mut snapshots = 0;
	let mut failure = None;

	while let Ok(event) = tokio::time::timeout_at(deadline, flow.next_discovery_event()).await {
		match event {
			Some(DiscoveryEvent::Snapshot(_)) => snapshots += 1,
			Some(DiscoveryEvent::Failed(err)) => {
				failure = Some(err);
				break;
			}
			None => break,
		}
	}

	let candidates = flow
		.candidates()
		.iter()
		.map(|device| CandidateView {
			current: store.is_current(&device.identifier),
			device: device.clone(),
		})
		.collect::<Vec<_>>();
	flow.teardown().await;
	playback.abort();

	if let Some(err) = failure {
		return Err(PairingError::from(err).into());
	}
	info!(target = "hwpair.cli", count = candidates.len(), snapshots, "scan finished");

	Ok(ScanData {
		network: ctx.config.network,
		candidates,
		snapshots,
	})
}
