use futures::StreamExt;

use crate::error::{EngineError, Result};
use crate::models::chat::{MatchId, VisibilityLog, NARRATOR_ID};
use crate::models::role::Role;
use crate::models::seat::Seat;
use crate::services::completion::{CompletionOutput, CompletionService, StreamDemux};

const PUBLIC_NOTICE: &str = "Notice: you are in the public-speech stage. Everything you \
     output will be heard by every player, including any asides in parentheses, so speak \
     naturally and do not give away your intent.";

const PRIVATE_NOTICE: &str = "Notice: this is a private exchange. Only the narrator will \
     hear your output (if you are a werewolf, your packmates also see it).";

/// Pushes the seat's identity and role rules as the opening system turn.
/// Werewolves additionally learn the full pack roster; that knowledge is
/// shared at setup, before anyone has died.
pub fn init_system_prompt(seat: &mut Seat, rules: &str, pack: &[u32]) {
    let mut text = format!("You are seat {}, {}", seat.id, rules);
    if seat.role == Role::Werewolf {
        text.push_str(&format!(
            "\nThe werewolves are seats {pack:?}; they are you and your packmates."
        ));
    }
    seat.push_system(text);
}

pub struct RespondArgs<'a> {
    /// Who issued the directive (0 = narrator).
    pub source_id: u32,
    pub directive: &'a str,
    pub is_public: bool,
    /// Every seat id, dead included; eliminated seats still observe public
    /// speech.
    pub all_ids: &'a [u32],
    /// Living seats sharing this seat's role; for werewolves this is the
    /// private channel the pack shares.
    pub peers: &'a [u32],
}

fn source_label(source_id: u32) -> String {
    if source_id == NARRATOR_ID {
        "narrator".to_string()
    } else {
        format!("seat {source_id}")
    }
}

/// Turns a directive into a published, visibility-correct reply:
/// records the directive, assembles the situational prompt from everything
/// the seat may hear, calls the completion service, demuxes the streamed
/// reply (publishing chunk by chunk so the log coalesces it into one
/// logical message), and appends the final text to the seat's transcript.
///
/// The transcript keeps the bare directive, not the context-laden prompt.
/// A `CompletionFailure` propagates untouched; the phase driver decides
/// whether to skip the seat or abort.
pub async fn respond(
    seat: &mut Seat,
    log: &mut VisibilityLog,
    client: &dyn CompletionService,
    match_id: MatchId,
    stage: u32,
    args: RespondArgs<'_>,
) -> Result<String> {
    let reply_visibility: Vec<u32> = if args.is_public {
        args.all_ids.to_vec()
    } else {
        let mut v = vec![seat.id];
        v.extend(args.peers.iter().copied().filter(|&p| p != seat.id));
        v
    };
    let directive_visibility: Vec<u32> = if args.is_public {
        args.all_ids.to_vec()
    } else {
        vec![seat.id]
    };
    log.record(
        match_id,
        stage,
        args.source_id,
        args.directive,
        &directive_visibility,
        false,
        false,
    );

    let heard: Vec<String> = log
        .visible_to(seat.id, match_id)
        .iter()
        .map(|m| m.to_string())
        .collect();
    let notice = if args.is_public {
        PUBLIC_NOTICE
    } else {
        PRIVATE_NOTICE
    };
    let directive_line = format!("{}: {}", source_label(args.source_id), args.directive);
    let prompt = format!(
        "What you have heard so far (player statements and public information):\n{}\n{}\n{}",
        heard.join("\n"),
        notice,
        directive_line
    );

    seat.push_user(prompt);
    let output = client.complete(&seat.model, &seat.transcript).await;
    // The durable transcript keeps the bare directive either way; the
    // situational context is recomputed from the log on every turn.
    if let Some(last) = seat.transcript.last_mut() {
        last.content = directive_line;
    }

    let assembled =
        match publish_output(log, match_id, stage, seat.id, &reply_visibility, output).await {
            Ok(text) => text,
            Err(e) => {
                // Drop the failed turn so a retry reissues the directive
                // onto a clean transcript.
                seat.transcript.pop();
                return Err(e);
            }
        };

    seat.push_assistant(assembled.clone());
    log::debug!("seat {} replied ({} chars)", seat.id, assembled.len());
    Ok(assembled)
}

async fn publish_output(
    log: &mut VisibilityLog,
    match_id: MatchId,
    stage: u32,
    seat_id: u32,
    visibility: &[u32],
    output: Result<CompletionOutput>,
) -> Result<String> {
    match output? {
        CompletionOutput::Full(text) => {
            if text.is_empty() {
                return Err(EngineError::CompletionFailure(
                    "completion produced no output".to_string(),
                ));
            }
            log.record(match_id, stage, seat_id, text.clone(), visibility, false, false);
            Ok(text)
        }
        CompletionOutput::Stream(mut chunks) => {
            let mut demux = StreamDemux::new();
            let mut published = false;
            let mut failure = None;
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        let was_closed = demux.reasoning_closed();
                        demux.push(&chunk);
                        if !was_closed && demux.reasoning_closed() && !demux.reasoning().is_empty()
                        {
                            log.record(
                                match_id,
                                stage,
                                seat_id,
                                format!("<think>{}</think>", demux.reasoning()),
                                visibility,
                                true,
                                false,
                            );
                            published = true;
                        }
                        if let Some(content) = chunk.content.as_deref() {
                            if !content.is_empty() {
                                log.record(
                                    match_id,
                                    stage,
                                    seat_id,
                                    content,
                                    visibility,
                                    true,
                                    false,
                                );
                                published = true;
                            }
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            // A turn that carried reasoning but never opened the content
            // channel still publishes its reasoning block.
            if failure.is_none() && !demux.reasoning_closed() && !demux.reasoning().is_empty() {
                log.record(
                    match_id,
                    stage,
                    seat_id,
                    format!("<think>{}</think>", demux.reasoning()),
                    visibility,
                    true,
                    false,
                );
                published = true;
            }
            if published {
                // Seal the coalesced entry so later chunks cannot amend it.
                log.record(match_id, stage, seat_id, "", visibility, true, true);
            }
            if let Some(e) = failure {
                return Err(e);
            }
            if demux.is_empty() {
                return Err(EngineError::CompletionFailure(
                    "completion stream produced no output".to_string(),
                ));
            }
            Ok(demux.assembled())
        }
    }
}
