//! Process-wide session slot.
//!
//! Holds at most one device connection and one authenticated session. The
//! slot is shared by cloning the handle; by convention only the login
//! orchestrator writes a session in, and only logout or connection-loss
//! handling clears it. Everyone else reads.

use std::sync::Arc;

use hwpair_protocol::{AuthenticatedSession, DeviceId};
use parking_lot::RwLock;
use tracing::info;

use crate::connect::DeviceConnection;

#[derive(Default)]
struct Slot {
	session: Option<AuthenticatedSession>,
	device: Option<DeviceConnection>,
}

#[derive(Clone, Default)]
pub struct SessionState {
	slot: Arc<RwLock<Slot>>,
}

impl SessionState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn current(&self) -> Option<AuthenticatedSession> {
		self.slot.read().session.clone()
	}

	pub fn is_authenticated(&self) -> bool {
		self.slot.read().session.is_some()
	}

	/// Identifier of the device held by the active session.
	pub fn device_identifier(&self) -> Option<DeviceId> {
		self.slot.read().device.as_ref().map(|device| device.identifier().clone())
	}

	/// Installs `session` together with the device connection it was
	/// authenticated with, replacing any previous pair.
	pub fn set(&self, session: AuthenticatedSession, device: DeviceConnection) {
		let previous = {
			let mut slot = self.slot.write();
			slot.session = Some(session);
			slot.device.replace(device)
		};
		// Drop the old transport outside the lock.
		drop(previous);
	}

	/// Clears the slot, returning the session that was active.
	pub fn clear(&self) -> Option<AuthenticatedSession> {
		let (session, device) = {
			let mut slot = self.slot.write();
			(slot.session.take(), slot.device.take())
		};
		if let Some(session) = &session {
			info!(target = "hwpair.session", device = %session.device, "session cleared");
		}
		drop(device);
		session
	}

	/// Clears the slot when `identifier` is the active device. Returns whether
	/// anything was cleared.
	pub fn connection_lost(&self, identifier: &DeviceId) -> bool {
		if self.device_identifier().as_ref() != Some(identifier) {
			return false;
		}
		info!(target = "hwpair.session", device = %identifier, "active device lost");
		self.clear().is_some()
	}
}

impl std::fmt::Debug for SessionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let slot = self.slot.read();
		f.debug_struct("SessionState")
			.field("session", &slot.session)
			.field("device", &slot.device.as_ref().map(DeviceConnection::identifier))
			.finish()
	}
}
