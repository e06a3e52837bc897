//! Interaction endpoint: signed callbacks for pings and button presses.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use rsvp_core::command::InteractionCommand;
use rsvp_core::ledger;
use tracing::{debug, warn};

use crate::discord::interaction::{
    INTERACTION_MESSAGE_COMPONENT, INTERACTION_PING, Interaction, InteractionResponse,
};
use crate::discord::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(interact))
}

/// POST / - Handle an interaction callback
async fn interact(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = header(&headers, SIGNATURE_HEADER);
    let timestamp = header(&headers, TIMESTAMP_HEADER);

    if !state.verifier.verify(signature, timestamp, &body) {
        debug!("Rejected interaction with invalid signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            warn!(error = %e, "Could not decode interaction");
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };

    match respond(interaction) {
        Some(response) => Json(response).into_response(),
        None => (StatusCode::BAD_REQUEST, "unsupported interaction").into_response(),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Work out the reply to a verified interaction.
///
/// Returns None for interactions that cannot be answered at all: unknown
/// types and component presses without the message they belong to.
pub fn respond(interaction: Interaction) -> Option<InteractionResponse> {
    match interaction.kind {
        INTERACTION_PING => Some(InteractionResponse::pong()),
        INTERACTION_MESSAGE_COMPONENT => {
            let user_id = interaction.user_id().map(str::to_string);
            let custom_id = interaction.custom_id().unwrap_or_default().to_string();

            let Some(message) = interaction.message else {
                warn!(%custom_id, "Component interaction without a message");
                return None;
            };

            let Some(user_id) = user_id else {
                warn!(%custom_id, "Component interaction without a user");
                return Some(InteractionResponse::update_message(message));
            };

            let updated = match custom_id.parse::<InteractionCommand>() {
                Ok(command) => {
                    debug!(%command, %user_id, "Applying interaction command");
                    ledger::apply(message, &command, &user_id)
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring interaction");
                    message
                }
            };
            Some(InteractionResponse::update_message(updated))
        }
        other => {
            warn!(kind = other, "Unsupported interaction type");
            None
        }
    }
}
