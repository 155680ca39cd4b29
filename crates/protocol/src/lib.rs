//! Data types shared by the hardware-wallet pairing stack.
//!
//! This crate contains the serde-serializable shapes exchanged between the
//! radio layer, the pairing core, and front ends:
//! * adapter states and advertisement events as reported by the BLE stack
//! * candidate devices as presented for selection
//! * the running-application report and network naming
//! * the authenticated session produced by a successful login
//!
//! Types in this crate are pure data. Behaviour lives in `hwpair`.

pub mod application;
pub mod device;
pub mod session;

pub use application::*;
pub use device::*;
pub use session::*;
