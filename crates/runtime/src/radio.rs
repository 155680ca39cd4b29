//! BLE stack seam.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use hwpair_protocol::{AdapterState, Advertisement, ApplicationInfo, DeviceId, HwDevice};

use crate::error::AdapterError;

/// Adapter state changes. Implementations yield the current state first.
pub type StateStream = Pin<Box<dyn Stream<Item = AdapterState> + Send>>;

/// Advertisement events of one scan.
///
/// The stream owns the scan: dropping it must stop scanning and release the
/// underlying radio resource.
pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Result<Advertisement, AdapterError>> + Send>>;

/// Process-wide radio adapter.
#[async_trait]
pub trait RadioAdapter: Send + Sync {
	fn state(&self) -> AdapterState;

	fn observe_state(&self) -> StateStream;

	/// Starts scanning. Fails when the adapter is not powered on.
	fn scan(&self) -> Result<AdvertisementStream, AdapterError>;

	/// Opens a transport connection to `identifier`.
	async fn connect(&self, identifier: &DeviceId) -> Result<Box<dyn PeripheralLink>, AdapterError>;
}

/// An open transport connection. Dropping it disconnects.
#[async_trait]
pub trait PeripheralLink: Send + Sync {
	fn identifier(&self) -> &DeviceId;

	/// Opens the signing-device channel over this link. The channel takes
	/// ownership of the link.
	async fn open_channel(self: Box<Self>) -> Result<Box<dyn SigningChannel>, AdapterError>;
}

/// Command channel to the signing device.
#[async_trait]
pub trait SigningChannel: Send + Sync {
	fn identifier(&self) -> &DeviceId;

	/// Queries the application currently open on the device.
	async fn running_application(&mut self) -> Result<ApplicationInfo, AdapterError>;

	/// Capability descriptor used as the login second factor.
	fn hw_device(&self) -> HwDevice;
}
