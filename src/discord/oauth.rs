//! OAuth flow granting the `webhook.incoming` scope.
//!
//! The authorization code grant hands back a webhook for the channel the
//! installing user picked, together with credentials that are refreshed
//! periodically by the worker.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rsvp_core::channel::CredentialRefresher;
use rsvp_core::state::{Credentials, WebhookDestination};
use rsvp_core::{RsvpError, RsvpResult};
use serde::Deserialize;
use url::Url;

use crate::discord::{API_BASE, user_agent};

const AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
const SCOPE: &str = "webhook.incoming";

/// Path the platform redirects to after authorization.
pub const WEBHOOK_TOKEN_PATH: &str = "/webhook-token";

pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub webhook: Option<TokenWebhook>,
}

#[derive(Debug, Deserialize)]
pub struct TokenWebhook {
    pub id: String,
    pub token: String,
}

impl TokenResponse {
    /// Credentials expiring `expires_in` seconds after `now`.
    pub fn credentials(&self, now: DateTime<Utc>) -> RsvpResult<Credentials> {
        let expires_at = TimeDelta::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                RsvpError::Refresh(format!("token lifetime out of range: {}", self.expires_in))
            })?;

        Ok(Credentials {
            token_type: self.token_type.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: Some(expires_at),
        })
    }

    pub fn webhook(&self) -> Option<WebhookDestination> {
        self.webhook.as_ref().map(|w| WebhookDestination {
            id: w.id.clone(),
            token: w.token.clone(),
        })
    }
}

/// Random value tying a redirect back to the authorization URL we handed out.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl OAuthClient {
    pub fn new(client_id: &str, client_secret: &str, instance_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&user_agent(instance_url))?);
        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(OAuthClient {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: format!("{}{}", instance_url.trim_end_matches('/'), WEBHOOK_TOKEN_PATH),
            token_url: format!("{API_BASE}/oauth2/token"),
        })
    }

    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(AUTHORIZE_URL).context("Invalid authorize URL")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", SCOPE)
            .append_pair("state", state)
            .append_pair("redirect_uri", &self.redirect_uri);
        Ok(url.to_string())
    }

    /// Exchange an authorization code for credentials and the granted webhook.
    pub async fn request_token(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .context("sending token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("token request failed ({}): {}", status, text);
        }

        response.json().await.context("parsing token response")
    }
}

#[async_trait]
impl CredentialRefresher for OAuthClient {
    async fn refresh(&self, current: &Credentials) -> RsvpResult<Credentials> {
        let response = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await
            .map_err(|e| RsvpError::Refresh(format!("{e:#}")))?;

        let mut credentials = response.credentials(Utc::now())?;
        // Keep the old refresh token if the platform didn't rotate it
        if credentials.refresh_token.is_empty() {
            credentials.refresh_token = current.refresh_token.clone();
        }
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client() -> OAuthClient {
        OAuthClient::new("1234", "secret", "https://rsvp.example.com/").unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let url = client().authorize_url("xyz").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("client_id".into(), "1234".into())));
        assert!(pairs.contains(&("scope".into(), "webhook.incoming".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://rsvp.example.com/webhook-token".into()
        )));
    }

    #[test]
    fn test_generated_states_differ() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn test_token_response_credentials() {
        let json = r#"{
            "token_type": "Bearer",
            "access_token": "access",
            "expires_in": 604800,
            "refresh_token": "refresh",
            "scope": "webhook.incoming",
            "webhook": {"id": "55", "token": "hook", "channel_id": "9", "type": 1}
        }"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let credentials = response.credentials(now).unwrap();

        assert_eq!(credentials.token_type, "Bearer");
        assert_eq!(credentials.access_token, "access");
        assert_eq!(credentials.refresh_token, "refresh");
        assert_eq!(
            credentials.expires_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap())
        );
        assert_eq!(
            response.webhook(),
            Some(WebhookDestination {
                id: "55".into(),
                token: "hook".into()
            })
        );
    }

    #[test]
    fn test_refresh_response_without_webhook() {
        let json = r#"{"token_type": "Bearer", "access_token": "a", "expires_in": 10}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(response.webhook().is_none());
        assert!(response.refresh_token.is_empty());
    }

    #[test]
    fn test_out_of_range_lifetime_is_refresh_error() {
        let json = r#"{"token_type": "Bearer", "access_token": "a", "expires_in": 9223372036854775807}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();

        let result = response.credentials(Utc::now());

        assert!(matches!(result, Err(RsvpError::Refresh(_))));
    }
}
