use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use hwpair_protocol::{AdapterState, Advertisement, ApplicationInfo, DeviceId, HwDevice};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, trace};

use super::step::SimStep;
use crate::error::AdapterError;
use crate::radio::{AdvertisementStream, PeripheralLink, RadioAdapter, SigningChannel, StateStream};

type ScanSender = mpsc::UnboundedSender<Result<Advertisement, AdapterError>>;

/// Scripted behaviour of one simulated signing device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimDevice {
	pub application: ApplicationInfo,
	#[serde(default)]
	pub connect: SimStep,
	#[serde(default)]
	pub open_channel: SimStep,
	#[serde(default)]
	pub query: SimStep,
	#[serde(default = "HwDevice::ledger")]
	pub hw_device: HwDevice,
}

impl SimDevice {
	/// A device that answers every stage immediately with `app` open.
	pub fn running(app: &str) -> Self {
		Self {
			application: ApplicationInfo::named(app),
			connect: SimStep::default(),
			open_channel: SimStep::default(),
			query: SimStep::default(),
			hw_device: HwDevice::ledger(),
		}
	}

	pub fn with_connect(mut self, step: SimStep) -> Self {
		self.connect = step;
		self
	}

	pub fn with_open_channel(mut self, step: SimStep) -> Self {
		self.open_channel = step;
		self
	}

	pub fn with_query(mut self, step: SimStep) -> Self {
		self.query = step;
		self
	}
}

struct Shared {
	state: watch::Sender<AdapterState>,
	devices: Mutex<HashMap<DeviceId, SimDevice>>,
	scanners: Mutex<Vec<ScanSender>>,
	scans_started: AtomicUsize,
	active_scans: AtomicUsize,
	scan_started_at: Mutex<Vec<Instant>>,
	connect_attempts: AtomicUsize,
	open_links: AtomicUsize,
	max_open_links: AtomicUsize,
}

/// Builder for a simulated adapter and its controller.
pub struct SimAdapterBuilder {
	state: AdapterState,
	devices: HashMap<DeviceId, SimDevice>,
}

impl SimAdapterBuilder {
	pub fn new() -> Self {
		Self {
			state: AdapterState::PoweredOn,
			devices: HashMap::new(),
		}
	}

	/// Initial adapter state (default: powered on).
	pub fn state(mut self, state: AdapterState) -> Self {
		self.state = state;
		self
	}

	pub fn device(mut self, identifier: impl Into<DeviceId>, device: SimDevice) -> Self {
		self.devices.insert(identifier.into(), device);
		self
	}

	/// Returns the adapter to hand to the pairing core and a controller for
	/// driving state changes and advertisements.
	pub fn build(self) -> (SimAdapter, SimAdapterController) {
		let (state, _) = watch::channel(self.state);
		let shared = Arc::new(Shared {
			state,
			devices: Mutex::new(self.devices),
			scanners: Mutex::new(Vec::new()),
			scans_started: AtomicUsize::new(0),
			active_scans: AtomicUsize::new(0),
			scan_started_at: Mutex::new(Vec::new()),
			connect_attempts: AtomicUsize::new(0),
			open_links: AtomicUsize::new(0),
			max_open_links: AtomicUsize::new(0),
		});

		(
			SimAdapter {
				shared: Arc::clone(&shared),
			},
			SimAdapterController { shared },
		)
	}
}

impl Default for SimAdapterBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Simulated radio adapter.
#[derive(Clone)]
pub struct SimAdapter {
	shared: Arc<Shared>,
}

#[async_trait]
impl RadioAdapter for SimAdapter {
	fn state(&self) -> AdapterState {
		*self.shared.state.borrow()
	}

	fn observe_state(&self) -> StateStream {
		Box::pin(WatchStream::new(self.shared.state.subscribe()))
	}

	fn scan(&self) -> Result<AdvertisementStream, AdapterError> {
		let state = self.state();
		if !state.is_ready() {
			return Err(AdapterError::NotReady(state));
		}

		let (tx, rx) = mpsc::unbounded_channel();
		self.shared.scanners.lock().push(tx);
		self.shared.scans_started.fetch_add(1, Ordering::SeqCst);
		self.shared.active_scans.fetch_add(1, Ordering::SeqCst);
		self.shared.scan_started_at.lock().push(Instant::now());
		debug!(target = "hwpair.sim", "scan started");

		Ok(Box::pin(SimScan {
			rx,
			_lease: ScanLease {
				shared: Arc::clone(&self.shared),
			},
		}))
	}

	async fn connect(&self, identifier: &DeviceId) -> Result<Box<dyn PeripheralLink>, AdapterError> {
		self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);

		let state = self.state();
		if !state.is_ready() {
			return Err(AdapterError::NotReady(state));
		}

		let device = self
			.shared
			.devices
			.lock()
			.get(identifier)
			.cloned()
			.ok_or_else(|| AdapterError::UnknownPeripheral(identifier.clone()))?;

		device.connect.run().await.map_err(AdapterError::Bluetooth)?;

		Ok(Box::new(SimLink {
			identifier: identifier.clone(),
			device,
			lease: LinkLease::acquire(&self.shared),
		}))
	}
}

/// Drives a [`SimAdapter`] and inspects its resource usage.
#[derive(Clone)]
pub struct SimAdapterController {
	shared: Arc<Shared>,
}

impl SimAdapterController {
	pub fn set_state(&self, state: AdapterState) {
		debug!(target = "hwpair.sim", %state, "adapter state change");
		self.shared.state.send_replace(state);
	}

	/// Delivers `ad` to every live scan.
	pub fn advertise(&self, ad: Advertisement) {
		trace!(target = "hwpair.sim", identifier = %ad.identifier, rssi = ad.signal_strength, "advertisement");
		self.shared.scanners.lock().retain(|tx| tx.send(Ok(ad.clone())).is_ok());
	}

	/// Terminates every live scan with a transport fault.
	pub fn fail_scan(&self, details: impl Into<String>) {
		let error = AdapterError::Bluetooth(details.into());
		for tx in self.shared.scanners.lock().drain(..) {
			let _ = tx.send(Err(error.clone()));
		}
	}

	pub fn scans_started(&self) -> usize {
		self.shared.scans_started.load(Ordering::SeqCst)
	}

	pub fn active_scans(&self) -> usize {
		self.shared.active_scans.load(Ordering::SeqCst)
	}

	pub fn scan_started_at(&self) -> Vec<Instant> {
		self.shared.scan_started_at.lock().clone()
	}

	pub fn connect_attempts(&self) -> usize {
		self.shared.connect_attempts.load(Ordering::SeqCst)
	}

	pub fn open_links(&self) -> usize {
		self.shared.open_links.load(Ordering::SeqCst)
	}

	/// Highest number of simultaneously open links observed.
	pub fn max_open_links(&self) -> usize {
		self.shared.max_open_links.load(Ordering::SeqCst)
	}
}

struct ScanLease {
	shared: Arc<Shared>,
}

impl Drop for ScanLease {
	fn drop(&mut self) {
		self.shared.active_scans.fetch_sub(1, Ordering::SeqCst);
		debug!(target = "hwpair.sim", "scan released");
	}
}

struct SimScan {
	rx: mpsc::UnboundedReceiver<Result<Advertisement, AdapterError>>,
	_lease: ScanLease,
}

impl Stream for SimScan {
	type Item = Result<Advertisement, AdapterError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.rx.poll_recv(cx)
	}
}

struct LinkLease {
	shared: Arc<Shared>,
}

impl LinkLease {
	fn acquire(shared: &Arc<Shared>) -> Self {
		let open = shared.open_links.fetch_add(1, Ordering::SeqCst) + 1;
		shared.max_open_links.fetch_max(open, Ordering::SeqCst);
		Self {
			shared: Arc::clone(shared),
		}
	}
}

impl Drop for LinkLease {
	fn drop(&mut self) {
		self.shared.open_links.fetch_sub(1, Ordering::SeqCst);
	}
}

struct SimLink {
	identifier: DeviceId,
	device: SimDevice,
	lease: LinkLease,
}

#[async_trait]
impl PeripheralLink for SimLink {
	fn identifier(&self) -> &DeviceId {
		&self.identifier
	}

	async fn open_channel(self: Box<Self>) -> Result<Box<dyn SigningChannel>, AdapterError> {
		let link = *self;
		link.device.open_channel.run().await.map_err(AdapterError::Bluetooth)?;
		Ok(Box::new(SimChannel {
			identifier: link.identifier,
			device: link.device,
			_lease: link.lease,
		}))
	}
}

struct SimChannel {
	identifier: DeviceId,
	device: SimDevice,
	_lease: LinkLease,
}

#[async_trait]
impl SigningChannel for SimChannel {
	fn identifier(&self) -> &DeviceId {
		&self.identifier
	}

	async fn running_application(&mut self) -> Result<ApplicationInfo, AdapterError> {
		self.device.query.run().await.map_err(AdapterError::Bluetooth)?;
		Ok(self.device.application.clone())
	}

	fn hw_device(&self) -> HwDevice {
		self.device.hw_device.clone()
	}
}

#[cfg(test)]
mod tests {
	use futures_util::StreamExt;

	use super::*;

	fn ad(id: &str, rssi: i16) -> Advertisement {
		Advertisement {
			identifier: DeviceId::new(id),
			display_name: Some(format!("Nano X {id}")),
			signal_strength: rssi,
			is_connectable: true,
		}
	}

	#[test]
	fn scan_requires_powered_on_adapter() {
		let (adapter, _controller) = SimAdapterBuilder::new().state(AdapterState::PoweredOff).build();
		match adapter.scan() {
			Err(AdapterError::NotReady(AdapterState::PoweredOff)) => {}
			Err(other) => panic!("unexpected error: {other}"),
			Ok(_) => panic!("scan should not start while powered off"),
		}
	}

	#[tokio::test]
	async fn dropping_scan_releases_lease() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let mut scan = adapter.scan().unwrap();
		assert_eq!(controller.active_scans(), 1);

		controller.advertise(ad("A1", -60));
		let received = scan.next().await.unwrap().unwrap();
		assert_eq!(received.identifier, DeviceId::new("A1"));

		drop(scan);
		assert_eq!(controller.active_scans(), 0);
		assert_eq!(controller.scans_started(), 1);
	}

	#[tokio::test]
	async fn failed_scan_yields_transport_error() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let mut scan = adapter.scan().unwrap();
		controller.fail_scan("radio reset");
		match scan.next().await {
			Some(Err(AdapterError::Bluetooth(details))) => assert_eq!(details, "radio reset"),
			other => panic!("expected transport error, got {other:?}"),
		}
		assert!(scan.next().await.is_none());
	}

	#[tokio::test]
	async fn channel_keeps_link_open_until_dropped() {
		let (adapter, controller) = SimAdapterBuilder::new().device("A1", SimDevice::running("Bitcoin")).build();

		let link = adapter.connect(&DeviceId::new("A1")).await.unwrap();
		assert_eq!(controller.open_links(), 1);

		let mut channel = link.open_channel().await.unwrap();
		assert_eq!(controller.open_links(), 1);
		assert_eq!(channel.running_application().await.unwrap().name, "Bitcoin");

		drop(channel);
		assert_eq!(controller.open_links(), 0);
		assert_eq!(controller.max_open_links(), 1);
	}

	#[tokio::test]
	async fn unknown_peripheral_is_reported() {
		let (adapter, controller) = SimAdapterBuilder::new().build();
		let result = adapter.connect(&DeviceId::new("missing")).await;
		assert!(matches!(result, Err(AdapterError::UnknownPeripheral(_))));
		assert_eq!(controller.connect_attempts(), 1);
		assert_eq!(controller.open_links(), 0);
	}

	#[tokio::test]
	async fn state_stream_yields_current_then_changes() {
		let (adapter, controller) = SimAdapterBuilder::new().state(AdapterState::PoweredOff).build();
		let mut states = adapter.observe_state();
		assert_eq!(states.next().await, Some(AdapterState::PoweredOff));

		controller.set_state(AdapterState::PoweredOn);
		assert_eq!(states.next().await, Some(AdapterState::PoweredOn));
		assert_eq!(adapter.state(), AdapterState::PoweredOn);
	}
}
