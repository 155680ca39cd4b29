use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hwpair::protocol::{CandidateDevice, DeviceId};
use hwpair::{DiscoveryEvent, PairingError, PairingFlow, RecordingObserver};
use tracing::{info, warn};

use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::PairData;
use crate::scenario::Scenario;

pub async fn execute(ctx: &CommandContext, scenario: &Path, device: Option<&str>, scan_ms: u64) -> Result<PairData> {
	let world = Scenario::load(scenario)?.instantiate(ctx.config.clone());
	let recorder = RecordingObserver::new();
	let playback = world.play();
	let mut flow = PairingFlow::new(world.context.clone().with_observer(Arc::new(recorder.clone())));
	let wanted = device.map(DeviceId::new);

	flow.start_discovery().await;
	let found = wait_for_candidate(&mut flow, wanted.as_ref(), scan_ms).await;
	let candidate = match found {
		Ok(candidate) => candidate,
		Err(err) => {
			flow.teardown().await;
			playback.abort();
			return Err(err);
		}
	};
	info!(target = "hwpair.cli", device = %candidate.identifier, "selected device");

	let outcome = flow.select(candidate.clone()).await.outcome().await;
	playback.abort();
	let session = outcome?;

	let mut store = ctx.paired_store();
	store.remember(&candidate, &session);
	if let Err(err) = store.save() {
		warn!(target = "hwpair.cli", error = %err, "could not remember paired device");
	}

	Ok(PairData {
		session,
		login_state: flow.login_state(),
		events: recorder.events(),
	})
}

/// Waits for `wanted`, or for any candidate when `wanted` is `None`.
async fn wait_for_candidate(flow: &mut PairingFlow, wanted: Option<&DeviceId>, scan_ms: u64) -> Result<CandidateDevice> {
	let deadline = tokio::time::Instant::now() + Duration::from_millis(scan_ms);

	while let Ok(event) = tokio::time::timeout_at(deadline, flow.next_discovery_event()).await {
		match event {
			Some(DiscoveryEvent::Snapshot(devices)) => {
				let hit = devices.into_iter().find(|d| wanted.is_none_or(|id| &d.identifier == id));
				if let Some(candidate) = hit {
					return Ok(candidate);
				}
			}
			Some(DiscoveryEvent::Failed(err)) => return Err(PairingError::from(err).into()),
			None => break,
		}
	}
	Err(CliError::DeviceNotFound { waited_ms: scan_ms })
}
