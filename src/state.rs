use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::chat::MatchId;
use crate::models::config::MatchConfig;
use crate::models::match_state::MatchState;
use crate::services::completion::CompletionService;
use crate::services::match_service;

/// Owns every live match, keyed by its stable id, plus the shared
/// completion client. Matches are created here and handed out `&mut`;
/// the engine assumes one logical thread of control per match.
pub struct EngineState {
    matches: HashMap<MatchId, MatchState>,
    pub client: Arc<dyn CompletionService>,
}

impl EngineState {
    pub fn new(client: Arc<dyn CompletionService>) -> Self {
        EngineState {
            matches: HashMap::new(),
            client,
        }
    }

    /// Deals roles, initializes every agent's system prompt, posts the
    /// opening broadcast and registers the match. Composition problems are
    /// fatal here.
    pub fn create_match(&mut self, config: &MatchConfig) -> Result<MatchId> {
        let mut rng = rand::thread_rng();
        let mut state = MatchState::from_config(config, &mut rng)?;
        match_service::setup_match(&mut state, config);
        let id = state.id;
        self.matches.insert(id, state);
        Ok(id)
    }

    pub fn match_ref(&self, id: &MatchId) -> Option<&MatchState> {
        self.matches.get(id)
    }

    pub fn match_mut(&mut self, id: &MatchId) -> Option<&mut MatchState> {
        self.matches.get_mut(id)
    }

    pub fn remove_match(&mut self, id: &MatchId) -> Option<MatchState> {
        self.matches.remove(id)
    }
}
