//! Commands carried by button `custom_id`s.
//!
//! A custom id is `<command> [argument]`: the command token, then optional free
//! text after the first space.

use std::fmt;
use std::str::FromStr;

use crate::error::RsvpError;

const ADD_USER_TO_ACTIVITY: &str = "add_user_to_game";
const REMOVE_USER_FROM_EVENT: &str = "remove_user_from_event";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionCommand {
    /// Add the pressing user to the named activity.
    AddToActivity(String),
    /// Remove the pressing user from every activity of the event.
    RemoveFromEvent,
}

impl InteractionCommand {
    pub fn custom_id(&self) -> String {
        self.to_string()
    }
}

impl FromStr for InteractionCommand {
    type Err = RsvpError;

    fn from_str(custom_id: &str) -> Result<Self, Self::Err> {
        let (command, argument) = match custom_id.split_once(' ') {
            Some((command, argument)) => (command, argument),
            None => (custom_id, ""),
        };

        match command {
            ADD_USER_TO_ACTIVITY if !argument.is_empty() => {
                Ok(InteractionCommand::AddToActivity(argument.to_string()))
            }
            ADD_USER_TO_ACTIVITY => Err(RsvpError::UnknownCommand(format!(
                "'{custom_id}' is missing the activity name"
            ))),
            REMOVE_USER_FROM_EVENT => Ok(InteractionCommand::RemoveFromEvent),
            _ => Err(RsvpError::UnknownCommand(custom_id.to_string())),
        }
    }
}

impl fmt::Display for InteractionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionCommand::AddToActivity(activity) => {
                write!(f, "{ADD_USER_TO_ACTIVITY} {activity}")
            }
            InteractionCommand::RemoveFromEvent => f.write_str(REMOVE_USER_FROM_EVENT),
        }
    }
}
