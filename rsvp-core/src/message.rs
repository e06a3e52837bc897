//! Outbound message model.
//!
//! Mirrors the subset of the platform's message JSON this service reads and
//! writes: embeds with fields, and action rows holding buttons.

use serde::{Deserialize, Serialize};

/// Maximum number of buttons in one action row.
pub const MAX_BUTTONS_PER_ROW: usize = 5;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
}

/// An interactive component: an action row or a button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl Component {
    pub fn action_row(buttons: Vec<Component>) -> Self {
        Component {
            kind: COMPONENT_ACTION_ROW,
            label: None,
            style: None,
            custom_id: None,
            components: buttons,
        }
    }

    pub fn button(label: impl Into<String>, style: ButtonStyle, custom_id: impl Into<String>) -> Self {
        Component {
            kind: COMPONENT_BUTTON,
            label: Some(label.into()),
            style: Some(style as u8),
            custom_id: Some(custom_id.into()),
            components: Vec::new(),
        }
    }
}
