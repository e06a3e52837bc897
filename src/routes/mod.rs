pub mod interactions;
pub mod oauth;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(interactions::router())
        .merge(oauth::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Upstream error text stays in the log
        error!(error = %format!("{:#}", self.0), "Request failed");
        let body = Json(ErrorResponse {
            error: "internal error".to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
