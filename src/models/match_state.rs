use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chat::{MatchId, VisibilityLog};
use crate::models::config::MatchConfig;
use crate::models::role::{Role, Team};
use crate::models::seat::Seat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    InProgress,
    VillageWin,
    WerewolfWin,
}

/// The match driver's state: seat roster, phase counter, night-action
/// buffers and the owned visibility-log partition. One logical thread of
/// control touches this at a time; there is no internal locking.
#[derive(Debug)]
pub struct MatchState {
    pub id: MatchId,
    pub name: String,
    /// Monotonically increasing phase counter. Day number is
    /// `stage / 2 + 1`; even stages are day, odd stages are night.
    pub stage: u32,
    pub seats: Vec<Seat>,
    /// Seat ids accumulated for death during the current night. Applied and
    /// cleared at dawn resolution.
    pub kill_tonight: Vec<u32>,
    /// Seat ids under guard protection for the current night.
    pub guard_tonight: Vec<u32>,
    pub log: VisibilityLog,
    pub result: MatchResult,
}

impl MatchState {
    /// Builds a match from an explicit role list, seat ids 1..=n. Dealing
    /// from a shuffled pool is the caller's job (see `from_config`).
    pub fn with_roles(name: impl Into<String>, assignments: Vec<(Role, String)>) -> Self {
        let seats = assignments
            .into_iter()
            .enumerate()
            .map(|(i, (role, model))| Seat::new(i as u32 + 1, role, model))
            .collect();
        MatchState {
            id: Uuid::new_v4(),
            name: name.into(),
            stage: 0,
            seats,
            kill_tonight: Vec::new(),
            guard_tonight: Vec::new(),
            log: VisibilityLog::new(),
            result: MatchResult::InProgress,
        }
    }

    /// Deals the configured role pool randomly across the seats.
    pub fn from_config(config: &MatchConfig, rng: &mut impl rand::Rng) -> crate::error::Result<Self> {
        config.composition.validate()?;
        let mut pool = config.composition.pool();
        pool.shuffle(rng);
        let assignments = pool
            .into_iter()
            .enumerate()
            .map(|(i, role)| (role, config.model_for(i as u32 + 1)))
            .collect();
        Ok(Self::with_roles(config.name.clone(), assignments))
    }

    pub fn day(&self) -> u32 {
        self.stage / 2 + 1
    }

    pub fn is_day(&self) -> bool {
        (self.stage + 1) % 2 == 1
    }

    pub fn seat(&self, id: u32) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn seat_mut(&mut self, id: u32) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.id == id)
    }

    pub fn all_ids(&self) -> Vec<u32> {
        self.seats.iter().map(|s| s.id).collect()
    }

    pub fn living_ids(&self) -> Vec<u32> {
        self.seats.iter().filter(|s| s.alive).map(|s| s.id).collect()
    }

    pub fn living_ids_with_role(&self, role: &Role) -> Vec<u32> {
        self.seats
            .iter()
            .filter(|s| s.alive && s.role == *role)
            .map(|s| s.id)
            .collect()
    }

    /// Who overhears a seat's private exchanges: the seat itself, plus every
    /// living same-role seat when the role shares a private channel.
    pub fn private_peers(&self, seat_id: u32) -> Vec<u32> {
        match self.seat(seat_id) {
            Some(seat) if seat.role.shares_private_channel() => {
                self.living_ids_with_role(&seat.role)
            }
            Some(seat) => vec![seat.id],
            None => Vec::new(),
        }
    }

    /// The whole pack, dead wolves included; this is what a werewolf learns
    /// at setup.
    pub fn pack_ids(&self) -> Vec<u32> {
        self.seats
            .iter()
            .filter(|s| s.role.team() == Team::Wolves)
            .map(|s| s.id)
            .collect()
    }

    pub fn living_count(&self) -> usize {
        self.seats.iter().filter(|s| s.alive).count()
    }

    /// Narrator broadcast to every seat, dead included (eliminated seats
    /// still observe).
    pub fn broadcast(&mut self, content: impl Into<String>) {
        let audience = self.all_ids();
        self.log.record(
            self.id,
            self.stage,
            crate::models::chat::NARRATOR_ID,
            content,
            &audience,
            false,
            false,
        );
    }

    /// Narrator note scoped to an explicit audience (e.g. the wolf pack or
    /// a single power role).
    pub fn narrate_to(&mut self, audience: &[u32], content: impl Into<String>) {
        self.log.record(
            self.id,
            self.stage,
            crate::models::chat::NARRATOR_ID,
            content,
            audience,
            false,
            false,
        );
    }

    /// Crosses one day/night boundary. On a night -> day crossing (except
    /// the very first), performs dawn resolution: deduplicates
    /// `kill_tonight`, marks the victims dead, broadcasts the casualty list
    /// (or a peaceful night) and clears both night buffers.
    pub fn advance_stage(&mut self) {
        self.stage += 1;
        if self.is_day() && self.day() > 1 {
            let mut seen = HashSet::new();
            let casualties: Vec<u32> = self
                .kill_tonight
                .drain(..)
                .filter(|id| seen.insert(*id))
                .collect();
            if casualties.is_empty() {
                self.broadcast("Last night was peaceful; no one was killed.");
            } else {
                for id in &casualties {
                    if let Some(seat) = self.seat_mut(*id) {
                        seat.alive = false;
                    }
                }
                self.broadcast(format!("Last night, seat(s) {casualties:?} were killed."));
            }
            self.guard_tonight.clear();
        } else {
            // Dusk: the buffers the coming night governs start empty.
            self.kill_tonight.clear();
            self.guard_tonight.clear();
        }
    }

    /// Marks a seat dead outside dawn resolution (day vote) and broadcasts
    /// the elimination.
    pub fn eliminate(&mut self, id: u32) {
        if let Some(seat) = self.seat_mut(id) {
            seat.alive = false;
        }
        self.broadcast(format!("Seat {id} was voted out."));
    }

    /// The win-condition check, run after dawn resolution and after the day
    /// vote. With `G` living non-werewolves and `W` living werewolves:
    /// wolves win when `G - 2W < 0`; the village wins when `W == 0`. The
    /// asymmetric 2:1 threshold is deliberate and must not be collapsed to
    /// a simple majority test.
    pub fn evaluate_winner(&mut self) -> MatchResult {
        if self.result != MatchResult::InProgress {
            return self.result;
        }
        let wolves = self
            .seats
            .iter()
            .filter(|s| s.alive && s.role.team() == Team::Wolves)
            .count() as i64;
        let village = self.living_count() as i64 - wolves;
        if village - 2 * wolves < 0 {
            self.result = MatchResult::WerewolfWin;
            self.broadcast("The game is over: the werewolves win.");
        } else if wolves == 0 {
            self.result = MatchResult::VillageWin;
            self.broadcast("The game is over: the village wins.");
        }
        self.result
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "day {}, {}",
            self.day(),
            if self.is_day() { "daytime" } else { "night" }
        )
    }
}
