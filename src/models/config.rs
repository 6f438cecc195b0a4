use std::collections::HashMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::role::Role;

/// Endpoint + default model for an OpenAI-compatible completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPreset {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model_name: String,
}

impl ModelPreset {
    pub fn from_env() -> Self {
        ModelPreset {
            base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            model_name: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

/// Per-role seat counts for one match. Villager count is derived from the
/// total seat count; the named roles are fixed slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoleComposition {
    pub werewolves: usize,
    pub seers: usize,
    pub witches: usize,
    pub guards: usize,
    pub villagers: usize,
}

impl RoleComposition {
    /// The standard lineup: three wolves, one of each power role, the rest
    /// villagers.
    pub fn classic(total_seats: usize) -> Result<Self> {
        let specials = 3 + 1 + 1 + 1;
        let villagers = total_seats.checked_sub(specials).ok_or_else(|| {
            EngineError::Configuration(format!(
                "classic composition needs at least {specials} seats, got {total_seats}"
            ))
        })?;
        let composition = RoleComposition {
            werewolves: 3,
            seers: 1,
            witches: 1,
            guards: 1,
            villagers,
        };
        composition.validate()?;
        Ok(composition)
    }

    pub fn total(&self) -> usize {
        self.werewolves + self.seers + self.witches + self.guards + self.villagers
    }

    pub fn validate(&self) -> Result<()> {
        if self.werewolves == 0 {
            return Err(EngineError::Configuration(
                "at least one werewolf is required".to_string(),
            ));
        }
        if self.seers > 1 || self.witches > 1 || self.guards > 1 {
            return Err(EngineError::Configuration(
                "at most one each of seer, witch and guard".to_string(),
            ));
        }
        let village = self.total() - self.werewolves;
        if village <= self.werewolves {
            return Err(EngineError::Configuration(format!(
                "the village side ({village}) must outnumber the wolves ({})",
                self.werewolves
            )));
        }
        Ok(())
    }

    /// The role pool, in a fixed order. Callers shuffle before dealing.
    pub fn pool(&self) -> Vec<Role> {
        let mut pool = Vec::with_capacity(self.total());
        pool.extend(std::iter::repeat(Role::Werewolf).take(self.werewolves));
        pool.extend(std::iter::repeat(Role::Seer).take(self.seers));
        pool.extend(std::iter::repeat(Role::Witch).take(self.witches));
        pool.extend(std::iter::repeat(Role::Guard).take(self.guards));
        pool.extend(std::iter::repeat(Role::Villager).take(self.villagers));
        pool
    }
}

/// Everything needed to construct one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_match_name")]
    pub name: String,
    pub composition: RoleComposition,
    pub preset: ModelPreset,
    /// Per-seat model overrides (seat id -> model name). The preset's model
    /// applies to every other seat.
    #[serde(default)]
    pub seat_models: HashMap<u32, String>,
    /// Per-role rules text for the system prompts, keyed by `Role::key()`.
    /// Roles without an entry fall back to the built-in texts.
    #[serde(default)]
    pub instructions: HashMap<String, String>,
    /// The narrator's opening broadcast describing the game.
    #[serde(default = "default_opening")]
    pub opening: String,
}

fn default_match_name() -> String {
    "werewolf".to_string()
}

fn default_opening() -> String {
    "Welcome to Werewolf. Seats are numbered from 1; seat 0 is the narrator. \
     Each night the guard protects, the werewolves kill, the seer checks and \
     the witch acts; each day everyone discusses and votes someone out. \
     Structured choices are given as a number in brackets, for example [3]."
        .to_string()
}

impl MatchConfig {
    pub fn from_env() -> Result<Self> {
        let seats = env::var("WEREWOLF_SEATS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(9);
        Ok(MatchConfig {
            name: env::var("WEREWOLF_MATCH_NAME").unwrap_or_else(|_| default_match_name()),
            composition: RoleComposition::classic(seats)?,
            preset: ModelPreset::from_env(),
            seat_models: HashMap::new(),
            instructions: HashMap::new(),
            opening: default_opening(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Configuration(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: MatchConfig = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Configuration(format!("bad match config: {e}")))?;
        config.composition.validate()?;
        Ok(config)
    }

    pub fn instructions_for(&self, role: &Role) -> String {
        if let Some(text) = self.instructions.get(role.key()) {
            return text.clone();
        }
        builtin_instructions(role)
    }

    pub fn model_for(&self, seat_id: u32) -> String {
        self.seat_models
            .get(&seat_id)
            .cloned()
            .unwrap_or_else(|| self.preset.model_name.clone())
    }
}

fn builtin_instructions(role: &Role) -> String {
    match role {
        Role::Werewolf => {
            "a werewolf. Each night the pack agrees on one player to kill. By day, \
             blend in: accuse, deflect and survive the vote. You win when the wolves \
             can no longer be outvoted."
        }
        Role::Villager => {
            "a villager with no night power. Listen carefully by day, reason about \
             who is lying, and vote the werewolves out."
        }
        Role::Seer => {
            "the seer. Each night you may learn one player's true role. Use what \
             you learn to steer the day vote without making yourself a target."
        }
        Role::Witch => {
            "the witch. You own one antidote and one poison for the whole match. \
             The antidote can save the night's victim once; the poison can kill one \
             player once. Spend them wisely."
        }
        Role::Guard => {
            "the guard. Each night you may protect one player from the werewolves. \
             You may also protect no one."
        }
        Role::Custom(name) => {
            return format!("playing the custom role \"{name}\". Follow the narrator's directives.");
        }
    }
    .to_string()
}
