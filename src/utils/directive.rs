use std::collections::BTreeMap;

/// Scans `text` left to right and collects every well-formed `[integer]`
/// occurrence. Brackets whose body does not parse as an integer are skipped.
pub fn bracket_numbers(text: &str) -> Vec<i64> {
    let mut numbers = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        let Some(len) = rest[start + 1..].find(']') else {
            break;
        };
        let body = &rest[start + 1..start + 1 + len];
        if let Ok(n) = body.trim().parse::<i64>() {
            numbers.push(n);
        }
        rest = &rest[start + 1 + len + 1..];
    }
    numbers
}

/// The decision an agent embedded in its reply: the last bracketed integer
/// wins when several occur. Returns `None` when the reply carries no
/// well-formed directive at all.
pub fn last_bracket_number(text: &str) -> Option<i64> {
    bracket_numbers(text).pop()
}

/// Strict-majority tally over `candidates`. Ballots naming anything outside
/// `candidates` are discarded. Returns the id with the unique maximum count;
/// 0 (the no-result sentinel) on a tie, an empty ballot set, or an empty
/// candidate set.
pub fn tally_votes(ballots: &[u32], candidates: &[u32]) -> u32 {
    let mut counts: BTreeMap<u32, usize> = candidates.iter().map(|&c| (c, 0)).collect();
    for ballot in ballots {
        if let Some(n) = counts.get_mut(ballot) {
            *n += 1;
        }
    }
    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return 0;
    }
    let mut winners = counts.iter().filter(|(_, &v)| v == max);
    match (winners.next(), winners.next()) {
        (Some((&id, _)), None) => id,
        _ => 0,
    }
}
