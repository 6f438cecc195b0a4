use serde::{Deserialize, Serialize};

use super::role::Role;

/// One role-tagged turn of a seat's LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// One participant slot in a match, played by one LLM agent. Seats persist,
/// dead or alive, for the lifetime of the match; the transcript only grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: u32,
    pub role: Role,
    pub alive: bool,
    /// Model identifier handed to the completion service for this seat.
    pub model: String,
    /// Witch consumables. One-shot for the whole match: each transitions
    /// true -> false at most once and is never restocked.
    pub antidote_available: bool,
    pub poison_available: bool,
    pub transcript: Vec<Turn>,
}

impl Seat {
    pub fn new(id: u32, role: Role, model: impl Into<String>) -> Self {
        let kit = role.starts_with_witch_kit();
        Seat {
            id,
            role,
            alive: true,
            model: model.into(),
            antidote_available: kit,
            poison_available: kit,
            transcript: Vec::new(),
        }
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn {
            role: TurnRole::System,
            content: content.into(),
        });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn {
            role: TurnRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn {
            role: TurnRole::Assistant,
            content: content.into(),
        });
    }
}
