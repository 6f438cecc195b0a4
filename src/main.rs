use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;

use werewolf_engine::models::config::MatchConfig;
use werewolf_engine::models::match_state::MatchResult;
use werewolf_engine::services::completion::OpenAiClient;
use werewolf_engine::services::match_service;
use werewolf_engine::state::EngineState;

fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("werewolf_engine", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logger();

    // Optional JSON config as the first argument; env vars otherwise.
    let config = match std::env::args().nth(1) {
        Some(path) => MatchConfig::from_file(&path)
            .with_context(|| format!("loading match config from {path}"))?,
        None => MatchConfig::from_env().context("building match config from environment")?,
    };

    let mut engine = EngineState::new(Arc::new(OpenAiClient::new(&config.preset)));
    let match_id = engine.create_match(&config)?;
    let client = engine.client.clone();
    let state = engine
        .match_mut(&match_id)
        .context("match vanished right after creation")?;

    log::info!("match {} started with {} seats", state.name, state.seats.len());
    let result = match_service::run_auto(state, client.as_ref()).await?;

    println!("match over at {}: {:?}", state, result);
    println!("final roster:");
    for seat in &state.seats {
        println!(
            "  seat {} ({}) - {}",
            seat.id,
            seat.role,
            if seat.alive { "alive" } else { "dead" }
        );
    }
    if result == MatchResult::InProgress {
        println!("driver stopped with no winner declared");
    }
    Ok(())
}
