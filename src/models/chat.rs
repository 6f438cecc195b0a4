use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

/// Stable key for one match's log partition.
pub type MatchId = Uuid;

/// The synthetic seat representing game-master broadcasts. It is in every
/// visibility set and its messages read as "narrator".
pub const NARRATOR_ID: u32 = 0;

static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think regex"));

/// Removes the `<think>...</think>` reasoning wrapper from a reply.
/// Reasoning is kept in the log for audit display, but it is never part of
/// what an agent hears back, and never parsed for directives.
pub fn strip_reasoning(text: &str) -> String {
    THINK_RE.replace_all(text, "").into_owned()
}

/// One utterance plus who may read it.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub match_id: MatchId,
    /// Phase counter at creation time.
    pub stage: u32,
    /// 0 = narrator, otherwise a seat id.
    pub source_id: u32,
    pub content: String,
    /// Always contains `source_id` and the narrator.
    pub visibility: HashSet<u32>,
    pub is_streaming: bool,
    pub is_final_chunk: bool,
}

impl Message {
    /// A streaming entry that has not been sealed may still be amended by
    /// the next chunk from the same source.
    pub fn is_open(&self) -> bool {
        self.is_streaming && !self.is_final_chunk
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut audience: Vec<u32> = self
            .visibility
            .iter()
            .copied()
            .filter(|&id| id != NARRATOR_ID)
            .collect();
        audience.sort_unstable();
        if self.source_id == NARRATOR_ID {
            write!(f, "narrator: {} (visible to {:?})", self.content, audience)
        } else {
            write!(
                f,
                "seat {}: {} (visible to {:?})",
                self.source_id, self.content, audience
            )
        }
    }
}

/// Append-only, per-match, scope-tagged message store. Partitions are
/// created lazily on first write; recording never fails.
#[derive(Debug, Default)]
pub struct VisibilityLog {
    partitions: HashMap<MatchId, Vec<Message>>,
}

impl VisibilityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. When `is_streaming` is set and the partition's last
    /// entry is an open streaming entry from the same source, the new
    /// content is concatenated onto it in place instead, so a token-by-token
    /// reply collapses into exactly one logical message no matter how many
    /// chunks the completion service emitted.
    pub fn record(
        &mut self,
        match_id: MatchId,
        stage: u32,
        source_id: u32,
        content: impl Into<String>,
        visible_ids: &[u32],
        is_streaming: bool,
        is_final_chunk: bool,
    ) -> &Message {
        let partition = self.partitions.entry(match_id).or_default();

        let mut content = content.into();
        if is_streaming {
            if let Some(last) = partition.last() {
                if last.source_id == source_id && last.is_open() {
                    content = format!("{}{}", last.content, content);
                    partition.pop();
                }
            }
        }

        let mut visibility: HashSet<u32> = visible_ids.iter().copied().collect();
        visibility.insert(source_id);
        visibility.insert(NARRATOR_ID);

        let message = Message {
            match_id,
            stage,
            source_id,
            content,
            visibility,
            is_streaming,
            is_final_chunk,
        };
        if !message.is_open() {
            log::info!("{}", message);
        }
        partition.push(message);
        partition.last().expect("just pushed")
    }

    /// Every message `seat_id` may read, in insertion order, with reasoning
    /// wrappers stripped.
    pub fn visible_to(&self, seat_id: u32, match_id: MatchId) -> Vec<Message> {
        self.partitions
            .get(&match_id)
            .into_iter()
            .flatten()
            .filter(|m| m.visibility.contains(&seat_id))
            .map(|m| Message {
                content: strip_reasoning(&m.content),
                ..m.clone()
            })
            .collect()
    }

    /// All entries tagged with `stage`, in insertion order. Raw content,
    /// reasoning included; this is the audit/UI view.
    pub fn messages_in_stage(&self, match_id: MatchId, stage: u32) -> Vec<&Message> {
        self.partitions
            .get(&match_id)
            .into_iter()
            .flatten()
            .filter(|m| m.stage == stage)
            .collect()
    }
}
