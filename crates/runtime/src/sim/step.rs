use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scripted outcome of one simulated I/O operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SimStep {
	/// Succeed after `delay_ms`.
	Respond {
		#[serde(default)]
		delay_ms: u64,
	},
	/// Fail with `details` after `delay_ms`.
	Fail {
		#[serde(default)]
		delay_ms: u64,
		details: String,
	},
	/// Never complete.
	Stall,
}

impl Default for SimStep {
	fn default() -> Self {
		SimStep::Respond { delay_ms: 0 }
	}
}

impl SimStep {
	pub fn after(delay: Duration) -> Self {
		SimStep::Respond {
			delay_ms: delay.as_millis() as u64,
		}
	}

	pub fn fail(details: impl Into<String>) -> Self {
		SimStep::Fail {
			delay_ms: 0,
			details: details.into(),
		}
	}

	pub(crate) async fn run(&self) -> Result<(), String> {
		match self {
			SimStep::Respond { delay_ms } => {
				pause(*delay_ms).await;
				Ok(())
			}
			SimStep::Fail { delay_ms, details } => {
				pause(*delay_ms).await;
				Err(details.clone())
			}
			SimStep::Stall => std::future::pending().await,
		}
	}
}

async fn pause(delay_ms: u64) {
	if delay_ms > 0 {
		tokio::time::sleep(Duration::from_millis(delay_ms)).await;
	}
}
