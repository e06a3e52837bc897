//! Persisted application state.
//!
//! The whole record is small, so every mutation rewrites the file wholesale
//! (temp file + rename) before returning. All access goes through a single
//! async mutex, so concurrent writers cannot lose each other's updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RsvpResult;
use crate::event::RsvpEvent;

/// OAuth credentials issued for the webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now,
            None => true,
        }
    }
}

/// Where notifications get delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDestination {
    pub id: String,
    pub token: String,
}

impl WebhookDestination {
    pub fn is_set(&self) -> bool {
        !self.id.is_empty() && !self.token.is_empty()
    }
}

/// The full persisted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub webhook: WebhookDestination,
    #[serde(default)]
    pub events: Vec<RsvpEvent>,
}

struct Inner {
    path: PathBuf,
    state: PersistedState,
}

impl Inner {
    fn save(&self) -> RsvpResult<()> {
        write_state(&self.path, &self.state)
    }
}

/// Shared handle to the persisted state.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<Inner>>,
}

impl StateStore {
    /// Load state from `path`.
    ///
    /// A missing or unparseable file yields empty state. Nothing is written until
    /// the first mutation.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = read_state(&path);

        StateStore {
            inner: Arc::new(Mutex::new(Inner { path, state })),
        }
    }

    pub async fn snapshot(&self) -> PersistedState {
        self.inner.lock().await.state.clone()
    }

    pub async fn credentials(&self) -> Credentials {
        self.inner.lock().await.state.credentials.clone()
    }

    pub async fn events(&self) -> Vec<RsvpEvent> {
        self.inner.lock().await.state.events.clone()
    }

    pub async fn set_credentials(&self, credentials: Credentials) -> RsvpResult<()> {
        let mut inner = self.inner.lock().await;
        inner.state.credentials = credentials;
        inner.save()
    }

    /// Forget credentials that have already expired. Returns true if they were cleared.
    pub async fn clear_expired_credentials(&self, now: DateTime<Utc>) -> RsvpResult<bool> {
        let mut inner = self.inner.lock().await;
        let credentials = &inner.state.credentials;
        if *credentials == Credentials::default() || !credentials.is_expired(now) {
            return Ok(false);
        }
        inner.state.credentials = Credentials::default();
        inner.save()?;
        Ok(true)
    }

    pub async fn set_webhook(&self, webhook: WebhookDestination) -> RsvpResult<()> {
        let mut inner = self.inner.lock().await;
        inner.state.webhook = webhook;
        inner.save()
    }

    /// Record a published occurrence. An existing record for the same
    /// `(title, starts_at)` is replaced so there is never more than one.
    pub async fn add_event(&self, event: RsvpEvent) -> RsvpResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .state
            .events
            .retain(|e| !e.is_occurrence(&event.title, event.starts_at));
        inner.state.events.push(event);
        inner.save()
    }

    /// Drop the record for `(title, starts_at)`. Returns false if there was none.
    pub async fn remove_event(&self, title: &str, starts_at: DateTime<Utc>) -> RsvpResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.state.events.len();
        inner.state.events.retain(|e| !e.is_occurrence(title, starts_at));

        if inner.state.events.len() == before {
            return Ok(false);
        }
        inner.save()?;
        Ok(true)
    }
}

fn read_state(path: &Path) -> PersistedState {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No previous state, starting empty");
            return PersistedState::default();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "State file is corrupt, starting empty");
            PersistedState::default()
        }
    }
}

fn write_state(path: &Path, state: &PersistedState) -> RsvpResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(state)?;
    let temp = path.with_extension("json.tmp");

    std::fs::write(&temp, contents)?;

    // Owner-only, the file holds OAuth tokens
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp, path)?;
    Ok(())
}
