//! Service configuration.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::{RsvpError, RsvpResult};
use crate::event::{EventDefinition, Repeat};

/// Configuration read from `config/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RsvpConfig {
    /// Hex encoded ed25519 public key of the application, used to verify interactions
    pub public_key: String,

    /// Public base URL of this instance, e.g. `https://rsvp.example.org`
    pub instance_url: String,

    pub client_id: String,
    pub client_secret: String,

    /// Activity name -> description
    #[serde(default)]
    pub activities: BTreeMap<String, String>,

    /// Event title -> schedule
    #[serde(default)]
    pub events: BTreeMap<String, EventSchedule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSchedule {
    pub first_occurrence: DateTime<FixedOffset>,
    pub repeat: Repeat,
}

impl RsvpConfig {
    pub fn load(path: &Path) -> RsvpResult<Self> {
        if !path.exists() {
            return Err(RsvpError::Config(format!(
                "Config file not found at {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            RsvpError::Config(format!("Could not read {}: {e}", path.display()))
        })?;

        Self::from_toml(&contents)
            .map_err(|e| RsvpError::Config(format!("Could not parse {}: {e}", path.display())))
    }

    pub fn from_toml(contents: &str) -> RsvpResult<Self> {
        let config: RsvpConfig =
            toml::from_str(contents).map_err(|e| RsvpError::Config(e.to_string()))?;

        if config.instance_url.is_empty() {
            return Err(RsvpError::Config("instance_url must not be empty".into()));
        }
        if let Some(name) = config.activities.keys().find(|name| name.trim().is_empty()) {
            return Err(RsvpError::Config(format!("invalid activity name '{name}'")));
        }

        Ok(config)
    }

    /// Event definitions ordered by title.
    pub fn event_definitions(&self) -> Vec<EventDefinition> {
        self.events
            .iter()
            .map(|(title, schedule)| EventDefinition {
                title: title.clone(),
                first_occurrence: schedule.first_occurrence,
                repeat: schedule.repeat,
            })
            .collect()
    }
}
