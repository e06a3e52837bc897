//! Webhook execution against the Discord API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rsvp_core::channel::DeliveryChannel;
use rsvp_core::message::MessageBody;
use rsvp_core::state::WebhookDestination;
use rsvp_core::{RsvpError, RsvpResult};
use serde::Deserialize;
use tracing::debug;

use crate::discord::{API_BASE, user_agent};

pub struct WebhookClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct CreatedMessage {
    id: String,
}

impl WebhookClient {
    pub fn new(instance_url: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&user_agent(instance_url))?);

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(WebhookClient {
            http,
            api_base: API_BASE.to_string(),
        })
    }

    fn webhook_url(&self, destination: &WebhookDestination) -> String {
        format!("{}/webhooks/{}/{}", self.api_base, destination.id, destination.token)
    }
}

/// Turn a non-2xx response into a delivery error carrying status and body.
async fn check_status(response: reqwest::Response, action: &str) -> RsvpResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(RsvpError::Delivery(format!("{action} failed ({status}): {text}")))
}

fn transport_error(action: &str, err: reqwest::Error) -> RsvpError {
    RsvpError::Delivery(format!("{action} request failed: {err}"))
}

#[async_trait]
impl DeliveryChannel for WebhookClient {
    async fn send(&self, destination: &WebhookDestination, body: &MessageBody) -> RsvpResult<String> {
        let response = self
            .http
            .post(format!("{}?wait=true", self.webhook_url(destination)))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("webhook execution", e))?;

        let response = check_status(response, "webhook execution").await?;
        let created: CreatedMessage = response
            .json()
            .await
            .map_err(|e| RsvpError::Delivery(format!("unexpected webhook response: {e}")))?;

        debug!(message_id = %created.id, "Created webhook message");
        Ok(created.id)
    }

    async fn delete(&self, destination: &WebhookDestination, message_id: &str) -> RsvpResult<()> {
        let response = self
            .http
            .delete(format!("{}/messages/{}", self.webhook_url(destination), message_id))
            .send()
            .await
            .map_err(|e| transport_error("message deletion", e))?;

        check_status(response, "message deletion").await?;
        debug!(message_id, "Deleted webhook message");
        Ok(())
    }
}
