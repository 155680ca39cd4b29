//! Connection establishment: connect, open channel, query application.
//!
//! The two transport stages are each raced against the stage timeout; the
//! loser is dropped, which releases whatever the stage had acquired. The
//! application query runs on the opened channel and is only bounded when an
//! application-query timeout is configured.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hwpair_protocol::{ApplicationInfo, CandidateDevice, DeviceId, HwDevice};
use hwpair_runtime::{AdapterError, RadioAdapter, SigningChannel};
use tracing::{debug, info, warn};

use crate::config::PairingConfig;
use crate::error::{ConnectError, ConnectStage};

/// An open, validated-for-identity connection to a signing device.
///
/// Dropping it closes the channel and the underlying transport.
pub struct DeviceConnection {
	identifier: DeviceId,
	display_name: String,
	channel: Box<dyn SigningChannel>,
	application: ApplicationInfo,
}

impl DeviceConnection {
	pub fn identifier(&self) -> &DeviceId {
		&self.identifier
	}

	pub fn display_name(&self) -> &str {
		&self.display_name
	}

	/// Application reported when the connection was established.
	pub fn application(&self) -> &ApplicationInfo {
		&self.application
	}

	pub fn hw_device(&self) -> HwDevice {
		self.channel.hw_device()
	}
}

impl std::fmt::Debug for DeviceConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeviceConnection")
			.field("identifier", &self.identifier)
			.field("display_name", &self.display_name)
			.field("application", &self.application)
			.finish_non_exhaustive()
	}
}

pub struct ConnectionEstablisher {
	adapter: Arc<dyn RadioAdapter>,
	stage_timeout: Duration,
	query_timeout: Option<Duration>,
}

impl ConnectionEstablisher {
	pub fn new(adapter: Arc<dyn RadioAdapter>, config: &PairingConfig) -> Self {
		Self {
			adapter,
			stage_timeout: config.stage_timeout(),
			query_timeout: config.application_query_timeout(),
		}
	}

	/// Connects to `device` and reads its running application.
	///
	/// Single attempt: no retries. Cancelling the returned future drops every
	/// handle acquired so far.
	pub async fn connect(&self, device: &CandidateDevice) -> Result<DeviceConnection, ConnectError> {
		if !device.is_connectable {
			return Err(ConnectError::NotConnectable(device.identifier.clone()));
		}

		info!(
			target = "hwpair.connect",
			device = %device.identifier,
			name = %device.display_name,
			timeout_ms = self.stage_timeout.as_millis() as u64,
			"connecting"
		);

		let link = bounded(ConnectStage::Connect, self.stage_timeout, self.adapter.connect(&device.identifier)).await?;
		debug!(target = "hwpair.connect", device = %device.identifier, "transport open");

		let mut channel = bounded(ConnectStage::OpenChannel, self.stage_timeout, link.open_channel()).await?;
		debug!(target = "hwpair.connect", device = %device.identifier, "signing channel open");

		let application = match self.query_timeout {
			Some(limit) => bounded(ConnectStage::QueryApplication, limit, channel.running_application()).await?,
			None => channel
				.running_application()
				.await
				.map_err(|err| fault(ConnectStage::QueryApplication, err))?,
		};
		info!(target = "hwpair.connect", device = %device.identifier, app = %application.name, "device ready");

		Ok(DeviceConnection {
			identifier: device.identifier.clone(),
			display_name: device.display_name.clone(),
			channel,
			application,
		})
	}
}

/// Races `op` against `limit`.
async fn bounded<T, F>(stage: ConnectStage, limit: Duration, op: F) -> Result<T, ConnectError>
where
	F: Future<Output = Result<T, AdapterError>>,
{
	match tokio::time::timeout(limit, op).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(err)) => Err(fault(stage, err)),
		Err(_) => {
			warn!(target = "hwpair.connect", %stage, timeout_ms = limit.as_millis() as u64, "stage timed out");
			Err(ConnectError::Timeout { stage, after: limit })
		}
	}
}

fn fault(stage: ConnectStage, err: AdapterError) -> ConnectError {
	warn!(target = "hwpair.connect", %stage, error = %err, "transport fault");
	ConnectError::TransportFault {
		stage,
		details: err.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use hwpair_runtime::sim::{SimAdapterBuilder, SimDevice, SimStep};

	use super::*;

	fn candidate(id: &str) -> CandidateDevice {
		CandidateDevice {
			identifier: DeviceId::new(id),
			display_name: format!("Nano X {id}"),
			signal_strength: -55,
			is_connectable: true,
		}
	}

	#[tokio::test]
	async fn connect_reports_running_application() {
		let (adapter, controller) = SimAdapterBuilder::new().device("A1", SimDevice::running("Bitcoin")).build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());

		let connection = establisher.connect(&candidate("A1")).await.unwrap();
		assert_eq!(connection.identifier(), &DeviceId::new("A1"));
		assert_eq!(connection.application().name, "Bitcoin");
		assert_eq!(connection.hw_device().name, "Ledger");
		assert_eq!(controller.open_links(), 1);

		drop(connection);
		assert_eq!(controller.open_links(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn stalled_connect_times_out() {
		let (adapter, _controller) = SimAdapterBuilder::new()
			.device("A1", SimDevice::running("Bitcoin").with_connect(SimStep::Stall))
			.build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());

		let start = tokio::time::Instant::now();
		let err = establisher.connect(&candidate("A1")).await.unwrap_err();
		assert_eq!(
			err,
			ConnectError::Timeout {
				stage: ConnectStage::Connect,
				after: Duration::from_secs(10),
			}
		);
		assert_eq!(start.elapsed(), Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn stalled_channel_times_out_and_releases_link() {
		let (adapter, controller) = SimAdapterBuilder::new()
			.device("A1", SimDevice::running("Bitcoin").with_open_channel(SimStep::Stall))
			.build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());

		let err = establisher.connect(&candidate("A1")).await.unwrap_err();
		assert!(matches!(
			err,
			ConnectError::Timeout {
				stage: ConnectStage::OpenChannel,
				..
			}
		));
		assert_eq!(controller.max_open_links(), 1);
		assert_eq!(controller.open_links(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn slow_but_timely_stages_succeed() {
		let (adapter, _controller) = SimAdapterBuilder::new()
			.device(
				"A1",
				SimDevice::running("Bitcoin")
					.with_connect(SimStep::after(Duration::from_secs(9)))
					.with_open_channel(SimStep::after(Duration::from_secs(9))),
			)
			.build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());
		assert!(establisher.connect(&candidate("A1")).await.is_ok());
	}

	#[tokio::test]
	async fn transport_faults_carry_stage_and_details() {
		let (adapter, _controller) = SimAdapterBuilder::new()
			.device("A1", SimDevice::running("Bitcoin").with_query(SimStep::fail("apdu 6e00")))
			.build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());

		match establisher.connect(&candidate("A1")).await {
			Err(ConnectError::TransportFault { stage, details }) => {
				assert_eq!(stage, ConnectStage::QueryApplication);
				assert!(details.contains("apdu 6e00"));
			}
			other => panic!("expected transport fault, got {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn application_query_is_unbounded_unless_configured() {
		let device = SimDevice::running("Bitcoin").with_query(SimStep::after(Duration::from_secs(30)));
		let (adapter, _controller) = SimAdapterBuilder::new().device("A1", device.clone()).build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());
		assert!(establisher.connect(&candidate("A1")).await.is_ok());

		let (adapter, _controller) = SimAdapterBuilder::new().device("A1", device).build();
		let config = PairingConfig {
			application_query_timeout_ms: Some(5_000),
			..PairingConfig::default()
		};
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &config);
		assert!(matches!(
			establisher.connect(&candidate("A1")).await,
			Err(ConnectError::Timeout {
				stage: ConnectStage::QueryApplication,
				..
			})
		));
	}

	#[tokio::test]
	async fn non_connectable_candidate_is_rejected_without_io() {
		let (adapter, controller) = SimAdapterBuilder::new().device("A1", SimDevice::running("Bitcoin")).build();
		let establisher = ConnectionEstablisher::new(Arc::new(adapter), &PairingConfig::default());
		let mut device = candidate("A1");
		device.is_connectable = false;

		assert_eq!(
			establisher.connect(&device).await.unwrap_err(),
			ConnectError::NotConnectable(DeviceId::new("A1"))
		);
		assert_eq!(controller.connect_attempts(), 0);
	}
}
