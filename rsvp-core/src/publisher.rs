//! Publishing event occurrences.
//!
//! One occurrence becomes one message: an embed describing the event and its
//! activities, an "add me" button per activity and a final row holding the
//! "remove me" button.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, warn};

use crate::channel::DeliveryChannel;
use crate::command::InteractionCommand;
use crate::error::{RsvpError, RsvpResult};
use crate::event::{EventDefinition, RsvpEvent};
use crate::message::{ButtonStyle, Component, Embed, EmbedField, MAX_BUTTONS_PER_ROW, MessageBody};
use crate::state::WebhookDestination;

pub const EVENT_COLOR: u32 = 0x01579b;
pub const REMOVE_LABEL: &str = "Remove Me";

/// Build the message announcing `title` at `starts_at`.
///
/// Activities are laid out in name order, so the same configuration always
/// yields the same message.
pub fn build_event_message(
    title: &str,
    starts_at: DateTime<FixedOffset>,
    activities: &BTreeMap<String, String>,
) -> MessageBody {
    let buttons: Vec<Component> = activities
        .keys()
        .map(|name| {
            Component::button(
                name.clone(),
                ButtonStyle::Success,
                InteractionCommand::AddToActivity(name.clone()).custom_id(),
            )
        })
        .collect();

    let mut rows: Vec<Component> = buttons
        .chunks(MAX_BUTTONS_PER_ROW)
        .map(|chunk| Component::action_row(chunk.to_vec()))
        .collect();

    rows.push(Component::action_row(vec![Component::button(
        REMOVE_LABEL,
        ButtonStyle::Danger,
        InteractionCommand::RemoveFromEvent.custom_id(),
    )]));

    let fields = activities
        .iter()
        .map(|(name, description)| EmbedField {
            name: name.clone(),
            value: description.clone(),
            inline: true,
        })
        .collect();

    MessageBody {
        content: None,
        embeds: vec![Embed {
            title: Some(title.to_string()),
            description: Some(format!(
                "Event starts at {}.\nSelect the activities you want to join via the buttons below.",
                starts_at.to_rfc2822()
            )),
            color: Some(EVENT_COLOR),
            fields,
        }],
        components: rows,
    }
}

/// Send every body or none of them.
///
/// When a send fails, the messages already created by this call are deleted
/// again (best effort) before the error is returned.
pub async fn send_all_or_nothing(
    channel: &dyn DeliveryChannel,
    destination: &WebhookDestination,
    bodies: &[MessageBody],
) -> RsvpResult<Vec<String>> {
    let mut created = Vec::with_capacity(bodies.len());

    for body in bodies {
        match channel.send(destination, body).await {
            Ok(message_id) => created.push(message_id),
            Err(e) => {
                for message_id in &created {
                    if let Err(delete_err) = channel.delete(destination, message_id).await {
                        warn!(
                            message_id = %message_id,
                            error = %delete_err,
                            "Could not roll back message after failed send"
                        );
                    }
                }
                return Err(e);
            }
        }
    }

    Ok(created)
}

/// Publish one occurrence of `definition` and return the record to persist.
pub async fn publish(
    channel: &dyn DeliveryChannel,
    destination: &WebhookDestination,
    definition: &EventDefinition,
    starts_at: DateTime<FixedOffset>,
    activities: &BTreeMap<String, String>,
) -> RsvpResult<RsvpEvent> {
    let body = build_event_message(&definition.title, starts_at, activities);

    let message_id = send_all_or_nothing(channel, destination, &[body])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RsvpError::Delivery("channel returned no message id".to_string()))?;

    info!(
        title = %definition.title,
        starts_at = %starts_at,
        message_id = %message_id,
        "Published event"
    );

    Ok(RsvpEvent {
        title: definition.title.clone(),
        starts_at: starts_at.with_timezone(&Utc),
        message_id,
        webhook_id: destination.id.clone(),
        webhook_token: destination.token.clone(),
    })
}
