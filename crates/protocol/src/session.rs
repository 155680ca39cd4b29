//! Authenticated session produced by a completed login handshake.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ApplicationInfo, DeviceId, Network};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedSession {
	/// Device used as the second factor.
	pub device: DeviceId,
	pub application: ApplicationInfo,
	pub network: Network,
	/// Result payload of the resolved login challenge.
	#[serde(default)]
	pub login_data: Value,
	/// Unix seconds.
	pub authenticated_at: u64,
}
