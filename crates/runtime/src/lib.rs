//! Collaborator seams for the pairing core.
//!
//! The pairing protocol talks to three external systems: the BLE stack, the
//! remote wallet session, and the local application delegate. Each is a trait
//! here so the core never depends on a concrete radio or RPC client.
//!
//! [`sim`] provides in-memory implementations of every seam for tests and the
//! CLI's scenario runner.

pub mod error;
pub mod radio;
pub mod remote;
pub mod sim;

pub use error::{AdapterError, SessionError};
pub use radio::{AdvertisementStream, PeripheralLink, RadioAdapter, SigningChannel, StateStream};
pub use remote::{AppDelegate, LoginChallenge, RemoteSession};
