//! Expansion of recurring event definitions into concrete occurrences.
//!
//! Only daily, weekly and one-off repeats exist, so expansion walks forward from
//! the first occurrence one step at a time instead of going through an RRULE engine.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::event::EventDefinition;

/// How far ahead occurrences are published.
pub const LOOK_AHEAD_DAYS: i64 = 5;

pub fn default_look_ahead() -> Duration {
    Duration::days(LOOK_AHEAD_DAYS)
}

/// Expand `definition` into all occurrences inside the open window `(now, now + look_ahead)`.
///
/// Candidates before the window are skipped while iteration continues, so a first
/// occurrence in the past fast-forwards to upcoming ones. Iteration stops at the first
/// candidate at or beyond the far edge. The result is strictly increasing.
pub fn expand(
    definition: &EventDefinition,
    now: DateTime<Utc>,
    look_ahead: Duration,
) -> Vec<DateTime<FixedOffset>> {
    let window_end = now + look_ahead;
    let mut occurrences = Vec::new();
    let mut candidate = definition.first_occurrence;

    loop {
        let at = candidate.with_timezone(&Utc);

        if at >= window_end {
            break;
        }
        if at > now {
            occurrences.push(candidate);
        }

        match definition.repeat.advance(candidate) {
            Some(next) => candidate = next,
            None => break,
        }
    }

    occurrences
}
