//! Discord HTTP API plumbing.
//!
//! - `webhooks`: posting and deleting event messages through the channel webhook
//! - `oauth`: the `webhook.incoming` OAuth flow and token refresh
//! - `verify`: ed25519 verification of inbound interaction requests
//! - `interaction`: wire types of inbound interactions and their responses

pub mod interaction;
pub mod oauth;
pub mod verify;
pub mod webhooks;

pub const API_BASE: &str = "https://discord.com/api/v8";

/// Version reported in the User-Agent.
pub const VERSION: u32 = 1;

/// User-Agent Discord expects from bots: `DiscordBot (<url>, <version>)`.
pub fn user_agent(instance_url: &str) -> String {
    format!("DiscordBot ({instance_url}, {VERSION})")
}
