use werewolf_engine::error::EngineError;
use werewolf_engine::models::config::{MatchConfig, ModelPreset, RoleComposition};
use werewolf_engine::models::role::{Role, Team};

#[test]
fn classic_composition_fills_with_villagers() {
    let composition = RoleComposition::classic(9).unwrap();
    assert_eq!(composition.werewolves, 3);
    assert_eq!(composition.villagers, 3);
    assert_eq!(composition.total(), 9);
    assert_eq!(composition.pool().len(), 9);
}

#[test]
fn composition_needs_at_least_one_werewolf() {
    let composition = RoleComposition {
        werewolves: 0,
        seers: 1,
        witches: 1,
        guards: 1,
        villagers: 4,
    };
    assert!(matches!(
        composition.validate(),
        Err(EngineError::Configuration(_))
    ));
}

#[test]
fn village_must_strictly_outnumber_the_pack() {
    let composition = RoleComposition {
        werewolves: 3,
        seers: 1,
        witches: 1,
        guards: 1,
        villagers: 0,
    };
    assert!(matches!(
        composition.validate(),
        Err(EngineError::Configuration(_))
    ));
    assert!(RoleComposition::classic(6).is_err());
}

#[test]
fn power_roles_are_unique() {
    let composition = RoleComposition {
        werewolves: 2,
        seers: 2,
        witches: 0,
        guards: 0,
        villagers: 5,
    };
    assert!(composition.validate().is_err());
}

#[test]
fn role_capabilities_are_data_not_branches() {
    assert_eq!(Role::Werewolf.team(), Team::Wolves);
    assert_eq!(Role::Seer.team(), Team::Village);
    assert_eq!(Role::Custom("bard".to_string()).team(), Team::Village);

    assert!(Role::Guard.has_night_action());
    assert!(!Role::Villager.has_night_action());

    assert!(Role::Werewolf.shares_private_channel());
    assert!(!Role::Seer.shares_private_channel());

    assert!(Role::Witch.starts_with_witch_kit());
    assert!(!Role::Guard.starts_with_witch_kit());
    assert_eq!(Role::Custom("bard".to_string()).key(), "bard");
}

#[test]
fn per_seat_model_overrides_fall_back_to_the_preset() {
    let mut config = MatchConfig {
        name: "t".to_string(),
        composition: RoleComposition::classic(9).unwrap(),
        preset: ModelPreset {
            base_url: "http://localhost".to_string(),
            api_key: String::new(),
            model_name: "default-model".to_string(),
        },
        seat_models: Default::default(),
        instructions: Default::default(),
        opening: "welcome".to_string(),
    };
    config.seat_models.insert(3, "special-model".to_string());
    assert_eq!(config.model_for(3), "special-model");
    assert_eq!(config.model_for(1), "default-model");
}

#[test]
fn instruction_overrides_beat_the_builtin_texts() {
    let mut config = MatchConfig {
        name: "t".to_string(),
        composition: RoleComposition::classic(9).unwrap(),
        preset: ModelPreset {
            base_url: "http://localhost".to_string(),
            api_key: String::new(),
            model_name: "m".to_string(),
        },
        seat_models: Default::default(),
        instructions: Default::default(),
        opening: "welcome".to_string(),
    };
    assert!(config.instructions_for(&Role::Witch).contains("antidote"));
    config
        .instructions
        .insert("witch".to_string(), "house rules".to_string());
    assert_eq!(config.instructions_for(&Role::Witch), "house rules");
}
