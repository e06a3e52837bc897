//! Inbound interaction payloads and responses.

use rsvp_core::message::MessageBody;
use serde::{Deserialize, Serialize};

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_MESSAGE_COMPONENT: u8 = 3;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_UPDATE_MESSAGE: u8 = 7;

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub message: Option<MessageBody>,
    /// Set for interactions inside a guild
    #[serde(default)]
    pub member: Option<Member>,
    /// Set for interactions in DMs
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub custom_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
}

impl Interaction {
    pub fn user_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id.as_str())
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.data.as_ref()?.custom_id.as_deref()
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageBody>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        InteractionResponse {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn update_message(message: MessageBody) -> Self {
        InteractionResponse {
            kind: RESPONSE_UPDATE_MESSAGE,
            data: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_component_interaction() {
        let json = r#"{
            "id": "1",
            "type": 3,
            "data": {"custom_id": "add_user_to_game Chess", "component_type": 2},
            "member": {"user": {"id": "42", "username": "someone"}},
            "message": {"id": "7", "embeds": [{"title": "Game Night"}]}
        }"#;

        let interaction: Interaction = serde_json::from_str(json).unwrap();

        assert_eq!(interaction.kind, INTERACTION_MESSAGE_COMPONENT);
        assert_eq!(interaction.user_id(), Some("42"));
        assert_eq!(interaction.custom_id(), Some("add_user_to_game Chess"));
        assert_eq!(interaction.message.unwrap().embeds.len(), 1);
    }

    #[test]
    fn test_user_id_falls_back_to_dm_user() {
        let json = r#"{"type": 3, "user": {"id": "9"}}"#;
        let interaction: Interaction = serde_json::from_str(json).unwrap();
        assert_eq!(interaction.user_id(), Some("9"));
    }

    #[test]
    fn test_pong_wire_format() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::pong()).unwrap(),
            serde_json::json!({"type": 1})
        );
    }
}
