//! Attendee bookkeeping inside an event message.
//!
//! Attendees live in the message's second embed. Each field of that embed is
//! one bucket: its name is `"<activity> (<count>)"` and its value is one user
//! mention per line. Buckets never stay empty and the embed disappears once
//! its last bucket is gone.

use indexmap::IndexSet;

use crate::command::InteractionCommand;
use crate::message::{Embed, EmbedField, MessageBody};

pub const ATTENDEES_TITLE: &str = "Attendees";
pub const ATTENDEES_COLOR: u32 = 0x3ba55d;

const ATTENDEES_EMBED_INDEX: usize = 1;
const SEPARATOR: &str = "\n";

/// Ordered set of participant ids, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendeeList(IndexSet<String>);

impl AttendeeList {
    /// Parse a bucket value. Mention decoration is stripped and empty tokens dropped.
    pub fn decode(value: &str) -> Self {
        AttendeeList(
            value
                .split(SEPARATOR)
                .map(|token| token.trim().trim_matches(|c| c == '<' || c == '>'))
                .map(|token| token.strip_prefix('@').unwrap_or(token))
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|id| mention(id))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Returns false if the participant was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        self.0.insert(id.to_string())
    }

    /// Returns false if the participant was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.shift_remove(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Bucket label: `"Chess (2)"`.
pub fn bucket_label(activity: &str, count: usize) -> String {
    format!("{activity} ({count})")
}

/// Activity name from a bucket label, without the `" (<count>)"` suffix.
pub fn activity_from_label(label: &str) -> &str {
    label
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once(" ("))
        .filter(|(_, count)| !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()))
        .map(|(activity, _)| activity)
        .unwrap_or(label)
}

/// Exact name match after dropping the count suffix. A prefix match would let
/// "Go" claim "Golf (2)".
fn is_bucket_for(field: &EmbedField, activity: &str) -> bool {
    activity_from_label(&field.name) == activity
}

/// Add `user_id` to the bucket for `activity`, creating the attendee section
/// and the bucket as needed.
pub fn add_participant(mut body: MessageBody, activity: &str, user_id: &str) -> MessageBody {
    if body.embeds.is_empty() {
        body.embeds.push(Embed::default());
    }
    if body.embeds.len() <= ATTENDEES_EMBED_INDEX {
        body.embeds.push(Embed::default());
    }

    let embed = &mut body.embeds[ATTENDEES_EMBED_INDEX];
    embed.title = Some(ATTENDEES_TITLE.to_string());
    embed.color = Some(ATTENDEES_COLOR);

    let index = match embed.fields.iter().position(|f| is_bucket_for(f, activity)) {
        Some(index) => index,
        None => {
            embed.fields.push(EmbedField {
                name: activity.to_string(),
                value: String::new(),
                inline: true,
            });
            embed.fields.len() - 1
        }
    };

    let field = &mut embed.fields[index];
    let mut attendees = AttendeeList::decode(&field.value);
    attendees.insert(user_id);

    if attendees.is_empty() {
        // Only reachable with an empty user id on a freshly created bucket
        embed.fields.remove(index);
        if embed.fields.is_empty() {
            body.embeds.truncate(ATTENDEES_EMBED_INDEX);
        }
        return body;
    }

    field.value = attendees.encode();
    field.name = bucket_label(activity, attendees.len());
    body
}

/// Remove `user_id` from every bucket. Emptied buckets are dropped, and the
/// attendee section is dropped once it has no buckets left.
pub fn remove_participant(mut body: MessageBody, user_id: &str) -> MessageBody {
    let Some(embed) = body.embeds.get_mut(ATTENDEES_EMBED_INDEX) else {
        return body;
    };

    embed.fields.retain_mut(|field| {
        let mut attendees = AttendeeList::decode(&field.value);
        if !attendees.remove(user_id) {
            return !attendees.is_empty();
        }
        if attendees.is_empty() {
            return false;
        }

        let activity = activity_from_label(&field.name).to_string();
        field.value = attendees.encode();
        field.name = bucket_label(&activity, attendees.len());
        true
    });

    if embed.fields.is_empty() {
        body.embeds.truncate(ATTENDEES_EMBED_INDEX);
    }
    body
}

/// Apply a button command on behalf of `user_id`.
pub fn apply(body: MessageBody, command: &InteractionCommand, user_id: &str) -> MessageBody {
    match command {
        InteractionCommand::AddToActivity(activity) => add_participant(body, activity, user_id),
        InteractionCommand::RemoveFromEvent => remove_participant(body, user_id),
    }
}
