//! Candidate discovery over the advertisement stream.
//!
//! A discovery run waits for the adapter to report ready, starts exactly one
//! scan, and publishes a snapshot of the candidate list after every accepted
//! advertisement. The scan is owned by the run's task, so stopping the run
//! releases it.

use std::sync::Arc;

use futures_util::StreamExt;
use hwpair_protocol::{AdapterState, CandidateDevice};
use hwpair_runtime::{AdapterError, RadioAdapter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{NamePredicate, ReplacePolicy};
use crate::error::DiscoveryError;

/// Output of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
	/// Full candidate list after a change.
	Snapshot(Vec<CandidateDevice>),
	/// The run ended; no further events follow.
	Failed(DiscoveryError),
}

/// Ordered candidate list with a configurable replace key.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
	policy: ReplacePolicy,
	devices: Vec<CandidateDevice>,
}

impl CandidateList {
	pub fn new(policy: ReplacePolicy) -> Self {
		Self {
			policy,
			devices: Vec::new(),
		}
	}

	/// Removes every entry matching `candidate` under the replace policy,
	/// then appends `candidate`.
	pub fn upsert(&mut self, candidate: CandidateDevice) {
		match self.policy {
			ReplacePolicy::SignalStrength => self.devices.retain(|d| d.signal_strength != candidate.signal_strength),
			ReplacePolicy::Identifier => self.devices.retain(|d| d.identifier != candidate.identifier),
		}
		self.devices.push(candidate);
	}

	pub fn as_slice(&self) -> &[CandidateDevice] {
		&self.devices
	}

	pub fn to_vec(&self) -> Vec<CandidateDevice> {
		self.devices.clone()
	}

	pub fn len(&self) -> usize {
		self.devices.len()
	}

	pub fn is_empty(&self) -> bool {
		self.devices.is_empty()
	}

	pub fn clear(&mut self) {
		self.devices.clear();
	}
}

pub struct DeviceDiscovery {
	adapter: Arc<dyn RadioAdapter>,
	policy: ReplacePolicy,
}

impl DeviceDiscovery {
	pub fn new(adapter: Arc<dyn RadioAdapter>, policy: ReplacePolicy) -> Self {
		Self { adapter, policy }
	}

	/// Starts a new discovery run. Each call is independent.
	pub fn start(&self, filter: NamePredicate) -> DiscoveryHandle {
		let (tx, rx) = mpsc::unbounded_channel();
		let task = tokio::spawn(run(Arc::clone(&self.adapter), filter, self.policy, tx));
		DiscoveryHandle { events: rx, task: Some(task) }
	}
}

/// Handle to a running discovery. Dropping it cancels the run.
pub struct DiscoveryHandle {
	events: mpsc::UnboundedReceiver<DiscoveryEvent>,
	task: Option<JoinHandle<()>>,
}

impl DiscoveryHandle {
	/// Next event; `None` once the run has ended and every event was read.
	pub async fn next(&mut self) -> Option<DiscoveryEvent> {
		self.events.recv().await
	}

	pub fn try_next(&mut self) -> Option<DiscoveryEvent> {
		self.events.try_recv().ok()
	}

	pub fn is_running(&self) -> bool {
		self.task.as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Cancels the run and waits until its scan has been released.
	pub async fn stop(mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
			let _ = task.await;
			debug!(target = "hwpair.discovery", "discovery stopped");
		}
	}
}

impl Drop for DiscoveryHandle {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

async fn run(adapter: Arc<dyn RadioAdapter>, filter: NamePredicate, policy: ReplacePolicy, tx: mpsc::UnboundedSender<DiscoveryEvent>) {
	if let Err(err) = scan(adapter.as_ref(), &filter, policy, &tx).await {
		warn!(target = "hwpair.discovery", error = %err, "discovery failed");
		let _ = tx.send(DiscoveryEvent::Failed(err));
	}
}

async fn scan(
	adapter: &dyn RadioAdapter,
	filter: &NamePredicate,
	policy: ReplacePolicy,
	tx: &mpsc::UnboundedSender<DiscoveryEvent>,
) -> Result<(), DiscoveryError> {
	wait_until_ready(adapter).await?;

	let mut advertisements = adapter.scan().map_err(DiscoveryError::Transport)?;
	let mut states = adapter.observe_state();
	let mut candidates = CandidateList::new(policy);
	info!(target = "hwpair.discovery", ?filter, "scan started");

	loop {
		tokio::select! {
			advertisement = advertisements.next() => {
				let advertisement = match advertisement {
					Some(Ok(advertisement)) => advertisement,
					Some(Err(err)) => return Err(DiscoveryError::Transport(err)),
					None => {
						debug!(target = "hwpair.discovery", "advertisement stream ended");
						return Ok(());
					}
				};
				if !filter.matches(advertisement.display_name.as_deref()) {
					trace!(target = "hwpair.discovery", identifier = %advertisement.identifier, "advertisement filtered out");
					continue;
				}
				let Some(candidate) = CandidateDevice::from_advertisement(advertisement) else {
					continue;
				};
				debug!(
					target = "hwpair.discovery",
					identifier = %candidate.identifier,
					rssi = candidate.signal_strength,
					"candidate seen"
				);
				candidates.upsert(candidate);
				if tx.send(DiscoveryEvent::Snapshot(candidates.to_vec())).is_err() {
					return Ok(());
				}
			}
			state = states.next() => match state {
				Some(state) if state.is_ready() => {}
				Some(state) => return Err(lost(state)),
				None => return Err(DiscoveryError::AdapterGone),
			},
		}
	}
}

/// Resolves once the adapter is powered on. Defers through transient states,
/// fails on terminal ones.
async fn wait_until_ready(adapter: &dyn RadioAdapter) -> Result<(), DiscoveryError> {
	let state = adapter.state();
	if state.is_ready() {
		return Ok(());
	}
	check_waitable(state)?;

	info!(target = "hwpair.discovery", %state, "waiting for adapter");
	let mut states = adapter.observe_state();
	while let Some(state) = states.next().await {
		if state.is_ready() {
			debug!(target = "hwpair.discovery", "adapter ready");
			return Ok(());
		}
		check_waitable(state)?;
		trace!(target = "hwpair.discovery", %state, "adapter not ready");
	}
	Err(DiscoveryError::AdapterGone)
}

fn check_waitable(state: AdapterState) -> Result<(), DiscoveryError> {
	match state {
		AdapterState::Unauthorized => Err(DiscoveryError::Unauthorized),
		AdapterState::Unsupported => Err(DiscoveryError::Unsupported),
		_ => Ok(()),
	}
}

/// Error for an adapter that left the ready state mid-scan.
fn lost(state: AdapterState) -> DiscoveryError {
	match check_waitable(state) {
		Err(err) => err,
		Ok(()) => DiscoveryError::Transport(AdapterError::NotReady(state)),
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use hwpair_protocol::{Advertisement, DeviceId};
	use hwpair_runtime::sim::SimAdapterBuilder;

	use super::*;

	fn candidate(id: &str, rssi: i16) -> CandidateDevice {
		CandidateDevice {
			identifier: DeviceId::new(id),
			display_name: format!("Nano X {id}"),
			signal_strength: rssi,
			is_connectable: true,
		}
	}

	fn ad(id: &str, name: Option<&str>, rssi: i16) -> Advertisement {
		Advertisement {
			identifier: DeviceId::new(id),
			display_name: name.map(str::to_string),
			signal_strength: rssi,
			is_connectable: true,
		}
	}

	fn ids(devices: &[CandidateDevice]) -> Vec<&str> {
		devices.iter().map(|d| d.identifier.as_str()).collect()
	}

	#[test]
	fn equal_signal_strength_replaces_entry() {
		let mut list = CandidateList::new(ReplacePolicy::SignalStrength);
		list.upsert(candidate("A", -60));
		list.upsert(candidate("B", -70));
		list.upsert(candidate("C", -60));
		assert_eq!(ids(list.as_slice()), vec!["B", "C"]);

		// Same device at a new strength is a second entry.
		list.upsert(candidate("C", -65));
		assert_eq!(ids(list.as_slice()), vec!["B", "C", "C"]);
	}

	#[test]
	fn identifier_policy_keeps_one_entry_per_device() {
		let mut list = CandidateList::new(ReplacePolicy::Identifier);
		list.upsert(candidate("A", -60));
		list.upsert(candidate("B", -60));
		list.upsert(candidate("A", -50));
		assert_eq!(ids(list.as_slice()), vec!["B", "A"]);
		assert_eq!(list.as_slice()[1].signal_strength, -50);

		list.clear();
		assert!(list.is_empty());
	}

	#[tokio::test]
	async fn snapshots_follow_filtered_advertisements() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let discovery = DeviceDiscovery::new(Arc::new(adapter), ReplacePolicy::SignalStrength);
		let mut handle = discovery.start(NamePredicate::default());
		tokio::task::yield_now().await;

		controller.advertise(ad("K", Some("Keyboard"), -40));
		controller.advertise(ad("X", None, -45));
		controller.advertise(ad("A", Some("Nano X A"), -60));
		controller.advertise(ad("B", Some("Nano X B"), -60));

		match handle.next().await {
			Some(DiscoveryEvent::Snapshot(devices)) => assert_eq!(ids(&devices), vec!["A"]),
			other => panic!("unexpected event {other:?}"),
		}
		match handle.next().await {
			Some(DiscoveryEvent::Snapshot(devices)) => assert_eq!(ids(&devices), vec!["B"]),
			other => panic!("unexpected event {other:?}"),
		}
		assert_eq!(handle.try_next(), None);
	}

	#[tokio::test(start_paused = true)]
	async fn scan_starts_once_when_adapter_powers_on() {
		let (adapter, controller) = SimAdapterBuilder::new().state(AdapterState::PoweredOff).build();
		let discovery = DeviceDiscovery::new(Arc::new(adapter), ReplacePolicy::SignalStrength);
		let started = tokio::time::Instant::now();
		let mut handle = discovery.start(NamePredicate::default());

		tokio::time::sleep(Duration::from_millis(500)).await;
		controller.set_state(AdapterState::Resetting);
		tokio::time::sleep(Duration::from_millis(500)).await;
		assert_eq!(controller.scans_started(), 0);

		controller.set_state(AdapterState::PoweredOn);
		tokio::time::sleep(Duration::from_millis(10)).await;
		controller.set_state(AdapterState::PoweredOn);
		tokio::time::sleep(Duration::from_millis(10)).await;

		assert_eq!(controller.scans_started(), 1);
		assert_eq!(controller.scan_started_at(), vec![started + Duration::from_secs(1)]);

		controller.advertise(ad("A", Some("Nano S Plus"), -58));
		assert!(matches!(handle.next().await, Some(DiscoveryEvent::Snapshot(devices)) if devices.len() == 1));
	}

	#[tokio::test]
	async fn unauthorized_adapter_fails_discovery() {
		let (adapter, controller) = SimAdapterBuilder::new().state(AdapterState::Unauthorized).build();
		let discovery = DeviceDiscovery::new(Arc::new(adapter), ReplacePolicy::SignalStrength);
		let mut handle = discovery.start(NamePredicate::default());

		assert_eq!(handle.next().await, Some(DiscoveryEvent::Failed(DiscoveryError::Unauthorized)));
		assert_eq!(handle.next().await, None);
		assert_eq!(controller.scans_started(), 0);
	}

	#[tokio::test]
	async fn power_loss_mid_scan_terminates_run() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let discovery = DeviceDiscovery::new(Arc::new(adapter), ReplacePolicy::SignalStrength);
		let mut handle = discovery.start(NamePredicate::default());
		tokio::task::yield_now().await;
		assert_eq!(controller.active_scans(), 1);

		controller.set_state(AdapterState::PoweredOff);
		assert_eq!(
			handle.next().await,
			Some(DiscoveryEvent::Failed(DiscoveryError::Transport(AdapterError::NotReady(AdapterState::PoweredOff))))
		);
		assert_eq!(handle.next().await, None);
		assert_eq!(controller.active_scans(), 0);
	}

	#[tokio::test]
	async fn scan_fault_is_surfaced() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let discovery = DeviceDiscovery::new(Arc::new(adapter), ReplacePolicy::SignalStrength);
		let mut handle = discovery.start(NamePredicate::default());
		tokio::task::yield_now().await;

		controller.fail_scan("radio reset");
		assert_eq!(
			handle.next().await,
			Some(DiscoveryEvent::Failed(DiscoveryError::Transport(AdapterError::Bluetooth("radio reset".into()))))
		);
	}

	#[tokio::test]
	async fn stop_releases_scan() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let discovery = DeviceDiscovery::new(Arc::new(adapter), ReplacePolicy::SignalStrength);
		let handle = discovery.start(NamePredicate::default());
		tokio::task::yield_now().await;
		assert!(handle.is_running());
		assert_eq!(controller.active_scans(), 1);

		handle.stop().await;
		assert_eq!(controller.active_scans(), 0);

		let again = discovery.start(NamePredicate::Any);
		tokio::task::yield_now().await;
		assert_eq!(controller.scans_started(), 2);
		drop(again);
	}

	mod properties {
		use std::collections::HashSet;

		use proptest::prelude::*;

		use super::*;

		fn sightings() -> impl Strategy<Value = Vec<(u8, i16)>> {
			prop::collection::vec((0u8..6, -80i16..=-70), 1..40)
		}

		proptest! {
			#[test]
			fn signal_strengths_stay_unique(events in sightings()) {
				let mut list = CandidateList::new(ReplacePolicy::SignalStrength);
				for (id, rssi) in events {
					let latest = candidate(&format!("D{id}"), rssi);
					list.upsert(latest.clone());

					let strengths: HashSet<i16> = list.as_slice().iter().map(|d| d.signal_strength).collect();
					prop_assert_eq!(strengths.len(), list.len());
					prop_assert!(list.as_slice().contains(&latest));
				}
			}

			#[test]
			fn identifiers_stay_unique(events in sightings()) {
				let mut list = CandidateList::new(ReplacePolicy::Identifier);
				for (id, rssi) in events {
					let latest = candidate(&format!("D{id}"), rssi);
					list.upsert(latest.clone());

					let ids: HashSet<&DeviceId> = list.as_slice().iter().map(|d| &d.identifier).collect();
					prop_assert_eq!(ids.len(), list.len());
					prop_assert_eq!(list.as_slice().last(), Some(&latest));
				}
			}
		}
	}
}
