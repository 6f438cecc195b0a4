use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Village,
    Wolves,
}

/// A seat's role. Behavior hangs off the variant (team, night action,
/// starting resources) so new roles are data, not string branches scattered
/// through the phase code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Werewolf,
    Villager,
    Seer,
    Witch,
    Guard,
    Custom(String),
}

impl Role {
    pub fn team(&self) -> Team {
        match self {
            Role::Werewolf => Team::Wolves,
            _ => Team::Village,
        }
    }

    pub fn has_night_action(&self) -> bool {
        matches!(self, Role::Werewolf | Role::Seer | Role::Witch | Role::Guard)
    }

    /// Whether seats of this role share a private channel: their private
    /// exchanges are visible to every living seat of the same role.
    pub fn shares_private_channel(&self) -> bool {
        matches!(self, Role::Werewolf)
    }

    pub fn starts_with_witch_kit(&self) -> bool {
        matches!(self, Role::Witch)
    }

    /// Stable key used for instruction-text lookup in configuration.
    pub fn key(&self) -> &str {
        match self {
            Role::Werewolf => "werewolf",
            Role::Villager => "villager",
            Role::Seer => "seer",
            Role::Witch => "witch",
            Role::Guard => "guard",
            Role::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
