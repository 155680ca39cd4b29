use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::step::SimStep;
use crate::error::SessionError;
use crate::remote::{AppDelegate, LoginChallenge, RemoteSession};

/// Script for one remote call and its challenge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimCall {
	/// When set, issuing the call fails immediately with this message.
	#[serde(default)]
	pub issue_fault: Option<String>,
	#[serde(default)]
	pub resolve: SimStep,
	/// Payload returned by a successful resolve.
	#[serde(default)]
	pub result: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimRemotePlan {
	#[serde(default)]
	pub register: SimCall,
	#[serde(default)]
	pub login: SimCall,
}

/// Calls observed by a [`SimRemoteSession`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
	RegisterUser(Value),
	ResolveRegister,
	Login(Value),
	ResolveLogin,
}

/// Simulated remote wallet session.
#[derive(Clone)]
pub struct SimRemoteSession {
	plan: SimRemotePlan,
	calls: Arc<Mutex<Vec<RemoteCall>>>,
}

impl SimRemoteSession {
	pub fn new(plan: SimRemotePlan) -> Self {
		Self {
			plan,
			calls: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn calls(&self) -> Vec<RemoteCall> {
		self.calls.lock().clone()
	}

	fn issue(&self, call: &SimCall, issued: RemoteCall, resolved: RemoteCall) -> Result<Box<dyn LoginChallenge>, SessionError> {
		self.calls.lock().push(issued);
		if let Some(fault) = &call.issue_fault {
			return Err(SessionError::Remote(fault.clone()));
		}
		Ok(Box::new(SimChallenge {
			step: call.resolve.clone(),
			result: call.result.clone(),
			on_resolve: resolved,
			calls: Arc::clone(&self.calls),
		}))
	}
}

impl Default for SimRemoteSession {
	fn default() -> Self {
		Self::new(SimRemotePlan::default())
	}
}

#[async_trait]
impl RemoteSession for SimRemoteSession {
	async fn register_user(&self, second_factor: &Value) -> Result<Box<dyn LoginChallenge>, SessionError> {
		self.issue(&self.plan.register, RemoteCall::RegisterUser(second_factor.clone()), RemoteCall::ResolveRegister)
	}

	async fn login(&self, second_factor: &Value) -> Result<Box<dyn LoginChallenge>, SessionError> {
		self.issue(&self.plan.login, RemoteCall::Login(second_factor.clone()), RemoteCall::ResolveLogin)
	}
}

struct SimChallenge {
	step: SimStep,
	result: Value,
	on_resolve: RemoteCall,
	calls: Arc<Mutex<Vec<RemoteCall>>>,
}

#[async_trait]
impl LoginChallenge for SimChallenge {
	async fn resolve(self: Box<Self>) -> Result<Value, SessionError> {
		let challenge = *self;
		challenge.calls.lock().push(challenge.on_resolve);
		challenge.step.run().await.map_err(SessionError::Device)?;
		Ok(challenge.result)
	}
}

/// Simulated application delegate.
#[derive(Clone, Default)]
pub struct SimAppDelegate {
	fault: Option<String>,
	connects: Arc<AtomicUsize>,
}

impl SimAppDelegate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn failing(fault: impl Into<String>) -> Self {
		Self {
			fault: Some(fault.into()),
			connects: Arc::default(),
		}
	}

	pub fn connects(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AppDelegate for SimAppDelegate {
	async fn connect(&self) -> Result<(), SessionError> {
		self.connects.fetch_add(1, Ordering::SeqCst);
		match &self.fault {
			Some(fault) => Err(SessionError::Setup(fault.clone())),
			None => Ok(()),
		}
	}
}
