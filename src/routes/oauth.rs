//! OAuth redirect target completing the webhook onboarding.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::discord::oauth::WEBHOOK_TOKEN_PATH;
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(WEBHOOK_TOKEN_PATH, get(webhook_token))
}

#[derive(Deserialize)]
pub struct RedirectParams {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
}

/// GET /webhook-token - Exchange the authorization code for credentials
async fn webhook_token(
    State(state): State<AppState>,
    Query(params): Query<RedirectParams>,
) -> Result<Response, AppError> {
    if params.state != *state.oauth_state {
        warn!("OAuth redirect with mismatching state");
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized!").into_response());
    }

    if params.code.is_empty() {
        debug!("OAuth redirect without a code, nothing to exchange");
        return Ok("Success!".into_response());
    }

    let token = state.oauth.request_token(&params.code).await?;

    state.store.set_credentials(token.credentials(Utc::now())?).await?;
    match token.webhook() {
        Some(webhook) => {
            info!(webhook_id = %webhook.id, "Webhook was authorized");
            state.store.set_webhook(webhook).await?;
        }
        None => warn!("Token response did not include a webhook"),
    }

    Ok("Success!".into_response())
}
