//! Scenario files for the simulated radio backend.
//!
//! A scenario describes the adapter's initial state, the devices that can be
//! connected to, the remote session's behaviour, and a timeline of adapter
//! events replayed against wall-clock time once a command starts.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use hwpair::{PairingConfig, PairingContext};
use hwpair::protocol::{AdapterState, Advertisement, DeviceId};
use hwpair::runtime::sim::{SimAdapterBuilder, SimAdapterController, SimAppDelegate, SimDevice, SimRemotePlan, SimRemoteSession};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
	#[serde(default = "powered_on")]
	pub initial_state: AdapterState,
	#[serde(default)]
	pub devices: BTreeMap<DeviceId, SimDevice>,
	#[serde(default)]
	pub remote: SimRemotePlan,
	/// When set, the app delegate fails with this message.
	#[serde(default)]
	pub app_delegate_fault: Option<String>,
	#[serde(default)]
	pub timeline: Vec<TimedEvent>,
}

fn powered_on() -> AdapterState {
	AdapterState::PoweredOn
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEvent {
	/// Offset from the start of the command.
	pub at_ms: u64,
	#[serde(flatten)]
	pub event: ScenarioEvent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScenarioEvent {
	State { state: AdapterState },
	Advertise { advertisement: Advertisement },
	ScanFault { details: String },
}

impl Scenario {
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("reading scenario {}", path.display()))
			.map_err(CliError::Io)?;
		serde_json::from_str(&content).map_err(|err| CliError::InvalidInput(format!("scenario {}: {err}", path.display())))
	}

	/// Builds the simulated collaborators and a pairing context around them.
	pub fn instantiate(&self, config: PairingConfig) -> World {
		let builder = self
			.devices
			.iter()
			.fold(SimAdapterBuilder::new().state(self.initial_state), |builder, (id, device)| {
				builder.device(id.clone(), device.clone())
			});
		let (adapter, controller) = builder.build();
		let delegate = match &self.app_delegate_fault {
			Some(fault) => SimAppDelegate::failing(fault.clone()),
			None => SimAppDelegate::new(),
		};
		let context = PairingContext::new(
			Arc::new(adapter),
			Arc::new(SimRemoteSession::new(self.remote.clone())),
			Arc::new(delegate),
			config,
		);

		World {
			context,
			controller,
			timeline: self.timeline.clone(),
		}
	}
}

/// Simulated collaborators for one command run.
pub struct World {
	pub context: PairingContext,
	pub controller: SimAdapterController,
	timeline: Vec<TimedEvent>,
}

impl World {
	/// Replays the timeline in the background. Dropping the returned handle
	/// does not stop playback; abort it when the command finishes.
	pub fn play(&self) -> JoinHandle<()> {
		let controller = self.controller.clone();
		let mut timeline = self.timeline.clone();
		timeline.sort_by_key(|event| event.at_ms);

		tokio::spawn(async move {
			let start = tokio::time::Instant::now();
			for TimedEvent { at_ms, event } in timeline {
				tokio::time::sleep_until(start + Duration::from_millis(at_ms)).await;
				debug!(target = "hwpair.scenario", at_ms, ?event, "scenario event");
				match event {
					ScenarioEvent::State { state } => controller.set_state(state),
					ScenarioEvent::Advertise { advertisement } => controller.advertise(advertisement),
					ScenarioEvent::ScanFault { details } => controller.fail_scan(details),
				}
			}
		})
	}
}
