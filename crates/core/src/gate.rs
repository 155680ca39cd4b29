//! Running-application check.

use hwpair_protocol::ApplicationInfo;
use tracing::debug;

use crate::config::PairingConfig;
use crate::error::GateError;

/// The device runs the expected application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready;

/// Classifies `app_name` against `expected` using the standard dashboard
/// marker.
pub fn evaluate(app_name: &str, expected: &str) -> Result<Ready, GateError> {
	classify(app_name, expected, hwpair_protocol::DASHBOARD_MARKER)
}

fn classify(app_name: &str, expected: &str, dashboard_marker: &str) -> Result<Ready, GateError> {
	// Dashboard wins over the name comparison, even for a name that also
	// equals `expected`. An empty marker matches nothing.
	if !dashboard_marker.is_empty() && app_name.contains(dashboard_marker) {
		return Err(GateError::AtDashboard {
			expected: expected.to_string(),
		});
	}
	if app_name != expected {
		return Err(GateError::WrongApplication {
			running: app_name.to_string(),
			expected: expected.to_string(),
		});
	}
	Ok(Ready)
}

#[derive(Debug, Clone)]
pub struct ApplicationGate {
	expected: String,
	dashboard_marker: String,
}

impl ApplicationGate {
	pub fn new(config: &PairingConfig) -> Self {
		Self {
			expected: config.expected_app_name().to_string(),
			dashboard_marker: config.dashboard_marker.clone(),
		}
	}

	pub fn expected(&self) -> &str {
		&self.expected
	}

	pub fn check(&self, application: &ApplicationInfo) -> Result<Ready, GateError> {
		let verdict = classify(&application.name, &self.expected, &self.dashboard_marker);
		debug!(
			target = "hwpair.gate",
			running = %application.name,
			expected = %self.expected,
			ready = verdict.is_ok(),
			"application checked"
		);
		verdict
	}
}
