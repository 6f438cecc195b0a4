mod common;

use std::sync::Arc;

use common::ScriptedService;
use werewolf_engine::models::config::{MatchConfig, ModelPreset, RoleComposition};
use werewolf_engine::models::role::Role;
use werewolf_engine::models::seat::TurnRole;
use werewolf_engine::state::EngineState;

fn test_config() -> MatchConfig {
    MatchConfig {
        name: "setup-test".to_string(),
        composition: RoleComposition::classic(9).unwrap(),
        preset: ModelPreset {
            base_url: "http://localhost".to_string(),
            api_key: String::new(),
            model_name: "test-model".to_string(),
        },
        seat_models: Default::default(),
        instructions: Default::default(),
        opening: "the game begins".to_string(),
    }
}

#[test]
fn create_match_deals_roles_and_primes_every_seat() {
    let mut engine = EngineState::new(Arc::new(ScriptedService::new(vec![])));
    let id = engine.create_match(&test_config()).unwrap();
    let state = engine.match_ref(&id).unwrap();

    assert_eq!(state.seats.len(), 9);
    assert_eq!(state.pack_ids().len(), 3);

    // Every seat opens with exactly one system turn.
    for seat in &state.seats {
        assert_eq!(seat.transcript.len(), 1);
        assert_eq!(seat.transcript[0].role, TurnRole::System);
        assert!(seat.transcript[0]
            .content
            .starts_with(&format!("You are seat {}", seat.id)));
    }

    // Werewolves know the pack; no one else does.
    let pack = state.pack_ids();
    for seat in &state.seats {
        let mentions_pack = seat.transcript[0].content.contains("packmates");
        assert_eq!(mentions_pack, seat.role == Role::Werewolf);
        if mentions_pack {
            for wolf in &pack {
                assert!(seat.transcript[0].content.contains(&wolf.to_string()));
            }
        }
    }

    // The opening broadcast reached every seat.
    for seat_id in state.all_ids() {
        assert!(state
            .log
            .visible_to(seat_id, state.id)
            .iter()
            .any(|m| m.content == "the game begins"));
    }
}

#[test]
fn invalid_composition_is_fatal_at_construction() {
    let mut config = test_config();
    config.composition.werewolves = 0;
    let mut engine = EngineState::new(Arc::new(ScriptedService::new(vec![])));
    assert!(engine.create_match(&config).is_err());
}

#[test]
fn matches_are_registered_and_removable_by_id() {
    let mut engine = EngineState::new(Arc::new(ScriptedService::new(vec![])));
    let id = engine.create_match(&test_config()).unwrap();
    assert!(engine.match_mut(&id).is_some());
    assert!(engine.remove_match(&id).is_some());
    assert!(engine.match_ref(&id).is_none());
}
