#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use werewolf_engine::error::{EngineError, Result};
use werewolf_engine::models::match_state::MatchState;
use werewolf_engine::models::role::Role;
use werewolf_engine::models::seat::Turn;
use werewolf_engine::services::completion::{
    CompletionChunk, CompletionOutput, CompletionService,
};

/// One scripted turn of the fake completion service.
pub enum Script {
    Full(String),
    Chunks(Vec<CompletionChunk>),
    Fail(String),
}

/// Deterministic stand-in for the completion service: pops one scripted
/// reply per call, in order. Panics when the script runs dry, so a test
/// also asserts how many calls the engine made.
pub struct ScriptedService {
    script: Mutex<VecDeque<Script>>,
}

impl ScriptedService {
    pub fn new(items: Vec<Script>) -> Self {
        ScriptedService {
            script: Mutex::new(items.into()),
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Script::Full(t.to_string())).collect())
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(&self, _model: &str, _turns: &[Turn]) -> Result<CompletionOutput> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted service ran out of replies");
        match next {
            Script::Full(text) => Ok(CompletionOutput::Full(text)),
            Script::Chunks(chunks) => Ok(CompletionOutput::Stream(Box::pin(stream::iter(
                chunks.into_iter().map(Ok),
            )))),
            Script::Fail(reason) => Err(EngineError::CompletionFailure(reason)),
        }
    }
}

pub fn chunk(reasoning: Option<&str>, content: Option<&str>) -> CompletionChunk {
    CompletionChunk {
        reasoning: reasoning.map(str::to_string),
        content: content.map(str::to_string),
    }
}

/// Match with a fixed role layout, seat ids 1..=n, no shuffling.
pub fn match_with(roles: &[Role]) -> MatchState {
    MatchState::with_roles(
        "test",
        roles
            .iter()
            .map(|r| (r.clone(), "test-model".to_string()))
            .collect(),
    )
}
