//! Hardware-wallet pairing and login.
//!
//! The pipeline, leaves first:
//!
//! * [`discovery`] filters the advertisement stream down to candidate devices.
//! * [`connect`] opens a transport and signing channel, each stage raced
//!   against a timeout, and reads the running application.
//! * [`gate`] decides whether the running application allows login.
//! * [`login`] drives the register/login challenge handshake using the
//!   device as second factor.
//! * [`session`] holds the single active device connection and session.
//!
//! [`flow::PairingFlow`] chains them the way a scan-and-connect screen does:
//! discovery, selection, connect, gate, login, and disposes any predecessor
//! attempt before starting a new one.

pub mod attempt;
pub mod config;
pub mod connect;
pub mod context;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod gate;
pub mod login;
pub mod observer;
pub mod session;

/// Default bound for each timed connection stage.
pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 10_000;

pub use config::{NamePredicate, PairingConfig, ReplacePolicy};
pub use connect::{ConnectionEstablisher, DeviceConnection};
pub use context::PairingContext;
pub use discovery::{CandidateList, DeviceDiscovery, DiscoveryEvent, DiscoveryHandle};
pub use error::{AuthError, ConfigError, ConnectError, ConnectStage, DiscoveryError, ErrorKind, GateError, LoginStep, PairingError};
pub use flow::{PairingAttempt, PairingFlow};
pub use gate::{ApplicationGate, Ready};
pub use hwpair_protocol as protocol;
pub use hwpair_runtime as runtime;
pub use login::{LoginOrchestrator, LoginState};
pub use observer::{ObserverEvent, PairingObserver, RecordingObserver, TracingObserver};
pub use session::SessionState;
