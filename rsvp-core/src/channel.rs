//! Interfaces to the outside world.
//!
//! The core never talks HTTP itself; the binary plugs in implementations of
//! these traits and tests use in-memory fakes.

use async_trait::async_trait;

use crate::error::RsvpResult;
use crate::message::MessageBody;
use crate::state::{Credentials, WebhookDestination};

/// Posts and deletes notifications at a webhook destination.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Create one message and return its id.
    async fn send(&self, destination: &WebhookDestination, body: &MessageBody) -> RsvpResult<String>;

    async fn delete(&self, destination: &WebhookDestination, message_id: &str) -> RsvpResult<()>;
}

/// Exchanges a refresh token for fresh credentials.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, current: &Credentials) -> RsvpResult<Credentials>;
}
