//! In-memory simulated collaborators.
//!
//! Every seam has a simulated implementation whose behaviour is scripted up
//! front ([`SimDevice`], [`SimRemotePlan`]) or driven at runtime through a
//! controller ([`SimAdapterController`]).
//!
//! # Example
//!
//! ```ignore
//! let (adapter, controller) = SimAdapterBuilder::new()
//!     .state(AdapterState::PoweredOn)
//!     .device("A1", SimDevice::running("Bitcoin"))
//!     .build();
//!
//! let mut scan = adapter.scan()?;
//! controller.advertise(advertisement("A1", "Nano X", -60));
//! ```

mod adapter;
mod remote;
mod step;

pub use adapter::{SimAdapter, SimAdapterBuilder, SimAdapterController, SimDevice};
pub use remote::{RemoteCall, SimAppDelegate, SimCall, SimRemotePlan, SimRemoteSession};
pub use step::SimStep;
