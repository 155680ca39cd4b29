//! Remote wallet session and app-delegate seams.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SessionError;

/// One in-flight two-factor call.
///
/// `resolve` consumes the challenge, so each challenge is driven at most
/// once. Dropping an unresolved challenge abandons it.
#[async_trait]
pub trait LoginChallenge: Send {
	async fn resolve(self: Box<Self>) -> Result<Value, SessionError>;
}

/// Remote wallet session.
#[async_trait]
pub trait RemoteSession: Send + Sync {
	async fn register_user(&self, second_factor: &Value) -> Result<Box<dyn LoginChallenge>, SessionError>;

	async fn login(&self, second_factor: &Value) -> Result<Box<dyn LoginChallenge>, SessionError>;
}

/// Local infrastructure connection the session rides on.
#[async_trait]
pub trait AppDelegate: Send + Sync {
	/// Establishes or refreshes the connection.
	async fn connect(&self) -> Result<(), SessionError>;
}
