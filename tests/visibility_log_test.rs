use uuid::Uuid;

use werewolf_engine::models::chat::{VisibilityLog, NARRATOR_ID};

#[test]
fn source_and_narrator_are_always_in_the_visibility_set() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    let message = log.record(match_id, 0, 3, "hello", &[], false, false);
    assert!(message.visibility.contains(&3));
    assert!(message.visibility.contains(&NARRATOR_ID));
}

#[test]
fn streamed_chunks_coalesce_into_one_entry() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    log.record(match_id, 1, 2, "A", &[2], true, false);
    log.record(match_id, 1, 2, "B", &[2], true, false);
    log.record(match_id, 1, 2, "C", &[2], true, true);

    let entries = log.messages_in_stage(match_id, 1);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "ABC");
    assert!(entries[0].is_final_chunk);
}

#[test]
fn an_intervening_message_breaks_the_merge() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    log.record(match_id, 1, 2, "A", &[2], true, false);
    log.record(match_id, 1, NARRATOR_ID, "wait", &[2], false, false);
    log.record(match_id, 1, 2, "B", &[2], true, true);

    // The second chunk from seat 2 is no longer adjacent to the first.
    assert_eq!(log.messages_in_stage(match_id, 1).len(), 3);
}

#[test]
fn a_sealed_entry_is_never_amended() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    log.record(match_id, 1, 2, "A", &[2], true, true);
    log.record(match_id, 1, 2, "B", &[2], true, false);

    let entries = log.messages_in_stage(match_id, 1);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content, "A");
    assert_eq!(entries[1].content, "B");
}

#[test]
fn visible_to_filters_by_audience_and_keeps_order() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    log.record(match_id, 0, NARRATOR_ID, "public", &[1, 2, 3], false, false);
    log.record(match_id, 0, 1, "wolf whisper", &[1, 2], false, false);
    log.record(match_id, 0, NARRATOR_ID, "for seat 3", &[3], false, false);

    let seat3: Vec<String> = log
        .visible_to(3, match_id)
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(seat3, vec!["public".to_string(), "for seat 3".to_string()]);

    let seat2: Vec<String> = log
        .visible_to(2, match_id)
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(seat2, vec!["public".to_string(), "wolf whisper".to_string()]);
}

#[test]
fn reasoning_is_stripped_from_what_agents_hear_but_kept_for_audit() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    log.record(
        match_id,
        2,
        4,
        "<think>they will\nnever know</think>I vote [2]",
        &[4, 5],
        false,
        false,
    );

    let heard = log.visible_to(5, match_id);
    assert_eq!(heard[0].content, "I vote [2]");

    // The audit view keeps the wrapper.
    let audit = log.messages_in_stage(match_id, 2);
    assert!(audit[0].content.starts_with("<think>"));
}

#[test]
fn unknown_match_partition_is_created_lazily() {
    let mut log = VisibilityLog::new();
    let match_id = Uuid::new_v4();
    assert!(log.visible_to(1, match_id).is_empty());
    log.record(match_id, 0, 1, "first", &[1], false, false);
    assert_eq!(log.visible_to(1, match_id).len(), 1);
}
