//! Event types.
//!
//! An `EventDefinition` comes from configuration and describes a recurring
//! event. Expanding it yields occurrences; each occurrence that has been
//! posted to the channel is tracked as an `RsvpEvent` in the persisted state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RsvpError;

/// How often an event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Repeat {
    Daily,
    Weekly,
    Never,
}

impl Repeat {
    /// Advance a candidate to the next occurrence, or `None` if the event does not repeat.
    pub fn advance(self, from: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        match self {
            Repeat::Daily => from.checked_add_days(Days::new(1)),
            Repeat::Weekly => from.checked_add_days(Days::new(7)),
            Repeat::Never => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
            Repeat::Never => "never",
        }
    }
}

impl FromStr for Repeat {
    type Err = RsvpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Repeat::Daily),
            "weekly" => Ok(Repeat::Weekly),
            "never" => Ok(Repeat::Never),
            other => Err(RsvpError::UnknownRepeat(other.to_string())),
        }
    }
}

impl TryFrom<String> for Repeat {
    type Error = RsvpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Repeat> for String {
    fn from(repeat: Repeat) -> Self {
        repeat.as_str().to_string()
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring event as configured. `title` is its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub title: String,
    pub first_occurrence: DateTime<FixedOffset>,
    pub repeat: Repeat,
}

/// A published occurrence, tracked until it expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsvpEvent {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub message_id: String,
    pub webhook_id: String,
    pub webhook_token: String,
}

impl RsvpEvent {
    /// Whether this record refers to the occurrence `(title, starts_at)`.
    ///
    /// Instants are compared exactly, independent of the offset they were written with.
    pub fn is_occurrence(&self, title: &str, starts_at: DateTime<Utc>) -> bool {
        self.title == title && self.starts_at == starts_at
    }
}
