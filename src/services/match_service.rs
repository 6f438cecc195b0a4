use crate::error::{EngineError, Result};
use crate::models::chat::{strip_reasoning, NARRATOR_ID};
use crate::models::config::MatchConfig;
use crate::models::match_state::{MatchResult, MatchState};
use crate::models::role::Role;
use crate::services::agent::{self, RespondArgs};
use crate::services::completion::CompletionService;
use crate::utils::directive::{last_bracket_number, tally_votes};

/// Initializes every seat's system prompt and posts the narrator's opening
/// broadcast. Called once, right after the roles are dealt.
pub fn setup_match(state: &mut MatchState, config: &MatchConfig) {
    let pack = state.pack_ids();
    for i in 0..state.seats.len() {
        let rules = config.instructions_for(&state.seats[i].role);
        agent::init_system_prompt(&mut state.seats[i], &rules, &pack);
    }
    state.broadcast(config.opening.clone());
}

/// One narrator directive to one seat, awaited to completion. The engine is
/// deliberately sequential: each call is a full suspension point and no two
/// seats are ever polled concurrently (vote tallies and last-bracket parsing
/// depend on the per-seat turn order).
async fn seat_respond(
    state: &mut MatchState,
    client: &dyn CompletionService,
    seat_id: u32,
    directive: &str,
    is_public: bool,
) -> Result<String> {
    let all_ids = state.all_ids();
    let peers = state.private_peers(seat_id);
    let match_id = state.id;
    let stage = state.stage;

    let MatchState { seats, log, .. } = state;
    let seat = seats
        .iter_mut()
        .find(|s| s.id == seat_id)
        .ok_or_else(|| EngineError::Configuration(format!("unknown seat {seat_id}")))?;
    agent::respond(
        seat,
        log,
        client,
        match_id,
        stage,
        RespondArgs {
            source_id: NARRATOR_ID,
            directive,
            is_public,
            all_ids: &all_ids,
            peers: &peers,
        },
    )
    .await
}

/// The target named in a reply: the last bracketed integer, if it names a
/// member of `candidates`. Reasoning text is never parsed. Anything else,
/// including an integer outside the u32 range, is a directive-parse failure
/// the caller recovers as an abstention.
fn parse_target(reply: &str, candidates: &[u32], seat: u32) -> Result<u32> {
    last_bracket_number(&strip_reasoning(reply))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|id| candidates.contains(id))
        .ok_or(EngineError::DirectiveParse { seat })
}

pub async fn guard_phase(state: &mut MatchState, client: &dyn CompletionService) -> Result<()> {
    let Some(guard_id) = state
        .living_ids_with_role(&Role::Guard)
        .into_iter()
        .next()
    else {
        return Ok(());
    };
    let reply = seat_respond(
        state,
        client,
        guard_id,
        "Who do you want to protect tonight? Wrap the seat number in brackets, for \
         example [3]; write [0] to protect no one. A short reason is fine.",
        false,
    )
    .await?;
    if last_bracket_number(&strip_reasoning(&reply)) == Some(0) {
        state.narrate_to(
            &[guard_id],
            format!("On the night of day {}, you protected no one.", state.day()),
        );
        return Ok(());
    }
    match parse_target(&reply, &state.living_ids(), guard_id) {
        Ok(target) => {
            state.guard_tonight.push(target);
            state.narrate_to(
                &[guard_id],
                format!(
                    "On the night of day {}, seat {target} is under your protection.",
                    state.day()
                ),
            );
        }
        Err(e) => {
            log::warn!("{e}; no one is protected");
            state.narrate_to(
                &[guard_id],
                "No valid protection target was named; no one is protected tonight.",
            );
        }
    }
    Ok(())
}

pub async fn werewolf_phase(state: &mut MatchState, client: &dyn CompletionService) -> Result<()> {
    let wolves = state.living_ids_with_role(&Role::Werewolf);
    if wolves.is_empty() {
        return Ok(());
    }
    for &wolf in &wolves {
        seat_respond(
            state,
            client,
            wolf,
            "Who do you want to kill tonight? This is the discussion stage; talk it \
             over with your pack.",
            false,
        )
        .await?;
    }
    let living = state.living_ids();
    let mut ballots = Vec::new();
    for &wolf in &wolves {
        let reply = seat_respond(
            state,
            client,
            wolf,
            "Cast your kill vote. Wrap the target's seat number in brackets with only \
             the number inside, for example [1]. You may explain your choice.",
            false,
        )
        .await?;
        match parse_target(&reply, &living, wolf) {
            Ok(target) => ballots.push(target),
            Err(e) => log::warn!("{e}; counted as abstention"),
        }
    }
    let marked = tally_votes(&ballots, &living);
    let pack = state.living_ids_with_role(&Role::Werewolf);
    if marked != 0 {
        state.narrate_to(
            &pack,
            format!(
                "On the night of day {}, seat {marked} was marked for the kill.",
                state.day()
            ),
        );
        // Protection cancels the kill; the pack is not told.
        if !state.guard_tonight.contains(&marked) {
            state.kill_tonight.push(marked);
        }
    } else {
        state.narrate_to(
            &pack,
            format!("On the night of day {}, the pack marked no one.", state.day()),
        );
    }
    Ok(())
}

pub async fn seer_phase(state: &mut MatchState, client: &dyn CompletionService) -> Result<()> {
    let Some(seer_id) = state.living_ids_with_role(&Role::Seer).into_iter().next() else {
        return Ok(());
    };
    let reply = seat_respond(
        state,
        client,
        seer_id,
        "Whose identity do you want to check tonight? Wrap the seat number in \
         brackets, for example \"I check seat [7]\". A short reason is fine.",
        false,
    )
    .await?;
    let target = last_bracket_number(&strip_reasoning(&reply))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&id| id != NARRATOR_ID);
    match target.and_then(|id| state.seat(id).map(|s| (id, s.role.clone()))) {
        Some((id, role)) => {
            state.narrate_to(
                &[seer_id],
                format!(
                    "On the night of day {}, you checked seat {id}: their role is {role}.",
                    state.day()
                ),
            );
        }
        None => {
            log::warn!(
                "{}; tonight's check is wasted",
                EngineError::DirectiveParse { seat: seer_id }
            );
            state.narrate_to(
                &[seer_id],
                "No valid seat was named; tonight's check is wasted.",
            );
        }
    }
    Ok(())
}

pub async fn witch_phase(state: &mut MatchState, client: &dyn CompletionService) -> Result<()> {
    let Some(witch_id) = state.living_ids_with_role(&Role::Witch).into_iter().next() else {
        return Ok(());
    };

    if let Some(&victim) = state.kill_tonight.first() {
        let antidote = state
            .seat(witch_id)
            .map(|s| s.antidote_available)
            .unwrap_or(false);
        if antidote {
            let reply = seat_respond(
                state,
                client,
                witch_id,
                &format!(
                    "Tonight seat {victim} was killed. You may spend your one antidote \
                     to save them: reply [1] to save, [0] to let it happen. A short \
                     reason is fine."
                ),
                false,
            )
            .await?;
            if last_bracket_number(&strip_reasoning(&reply)) == Some(1) {
                if let Some(seat) = state.seat_mut(witch_id) {
                    seat.antidote_available = false;
                }
                state.kill_tonight.retain(|&id| id != victim);
                state.narrate_to(
                    &[witch_id],
                    format!("You spent the antidote; seat {victim} will live."),
                );
            } else {
                state.narrate_to(&[witch_id], format!("You chose not to save seat {victim}."));
            }
        } else {
            state.narrate_to(
                &[witch_id],
                format!("Seat {victim} was killed tonight, but your antidote is already spent."),
            );
        }
    } else {
        state.narrate_to(
            &[witch_id],
            format!(
                "No one died before your turn on the night of day {}.",
                state.day()
            ),
        );
    }

    // The poison question is independent of the save decision, but a spent
    // poison is never re-offered.
    let poison = state
        .seat(witch_id)
        .map(|s| s.poison_available)
        .unwrap_or(false);
    if poison {
        let reply = seat_respond(
            state,
            client,
            witch_id,
            "You may spend your one poison to kill a player. Wrap the seat number in \
             brackets, for example [1]; write [0] to keep the poison.",
            false,
        )
        .await?;
        match parse_target(&reply, &state.living_ids(), witch_id) {
            Ok(target) => {
                if let Some(seat) = state.seat_mut(witch_id) {
                    seat.poison_available = false;
                }
                state.kill_tonight.push(target);
                state.narrate_to(&[witch_id], format!("You poisoned seat {target}."));
            }
            Err(_) => {
                state.narrate_to(&[witch_id], "You used no poison tonight.");
            }
        }
    }
    Ok(())
}

pub async fn discussion_phase(
    state: &mut MatchState,
    client: &dyn CompletionService,
) -> Result<()> {
    for seat_id in state.living_ids() {
        seat_respond(
            state,
            client,
            seat_id,
            "Please speak openly to the village. Keep it brief and explain your reasoning.",
            true,
        )
        .await?;
    }
    Ok(())
}

pub async fn vote_phase(state: &mut MatchState, client: &dyn CompletionService) -> Result<()> {
    let living = state.living_ids();
    let mut ballots = Vec::new();
    for &seat_id in &living {
        let reply = seat_respond(
            state,
            client,
            seat_id,
            "Please vote for the player to eliminate. Wrap the seat number in brackets \
             with only the number inside, for example [1]. You may briefly explain \
             your vote.",
            true,
        )
        .await?;
        match parse_target(&reply, &living, seat_id) {
            Ok(target) => ballots.push(target),
            Err(e) => log::warn!("{e}; counted as abstention"),
        }
    }
    let eliminated = tally_votes(&ballots, &living);
    if eliminated != 0 {
        state.eliminate(eliminated);
    } else {
        state.broadcast("The vote tied; no one is eliminated today.");
    }
    Ok(())
}

pub fn check_winner(state: &mut MatchState) -> MatchResult {
    state.evaluate_winner()
}

/// The four night actions in protocol order.
pub async fn run_night(state: &mut MatchState, client: &dyn CompletionService) -> Result<()> {
    guard_phase(state, client).await?;
    werewolf_phase(state, client).await?;
    seer_phase(state, client).await?;
    witch_phase(state, client).await?;
    Ok(())
}

/// Drives the full automatic loop until the win condition fires. A
/// `CompletionFailure` aborts the current phase and surfaces here untouched;
/// the caller decides whether to retry the match.
pub async fn run_auto(
    state: &mut MatchState,
    client: &dyn CompletionService,
) -> Result<MatchResult> {
    loop {
        state.advance_stage();
        log::info!("match {}: {}", state.name, state);
        run_night(state, client).await?;
        state.advance_stage();
        log::info!("match {}: {}", state.name, state);
        if check_winner(state) != MatchResult::InProgress {
            break;
        }
        discussion_phase(state, client).await?;
        vote_phase(state, client).await?;
        if check_winner(state) != MatchResult::InProgress {
            break;
        }
    }
    Ok(state.result)
}
