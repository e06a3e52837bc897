use std::sync::Arc;

use rsvp_core::state::StateStore;

use crate::discord::oauth::OAuthClient;
use crate::discord::verify::SignatureVerifier;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub verifier: Arc<SignatureVerifier>,
    pub oauth: Arc<OAuthClient>,
    /// State token embedded in the authorization URL handed out at startup
    pub oauth_state: Arc<str>,
}

impl AppState {
    pub fn new(
        store: StateStore,
        verifier: SignatureVerifier,
        oauth: Arc<OAuthClient>,
        oauth_state: String,
    ) -> Self {
        AppState {
            store,
            verifier: Arc::new(verifier),
            oauth,
            oauth_state: oauth_state.into(),
        }
    }
}
