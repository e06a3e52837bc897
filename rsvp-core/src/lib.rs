//! Core of discord-rsvp.
//!
//! This crate holds everything that does not speak HTTP:
//! - `recurrence` expands configured events into occurrences
//! - `scheduler` reconciles occurrences against the persisted `state`
//! - `publisher` builds and sends event messages
//! - `ledger` keeps the attendee lists inside event messages
//! - `channel` defines the traits the binary implements for delivery and OAuth

pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod message;
pub mod publisher;
pub mod recurrence;
pub mod refresh;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::{RsvpError, RsvpResult};
pub use event::{EventDefinition, Repeat, RsvpEvent};
