//! Judging held notes against the chord under the cursor.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::timing::TimingTable;

/// Outcome of comparing held notes with the expected chord.
///
/// A non-empty held set that differs from the expected chord in any way,
/// including a strict subset of it, is `NoMatch`. `Incomplete` means
/// nothing is held, so there is nothing to judge yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    NoMatch,
    Correct,
    Incomplete,
}

/// Compare `played` with the slot at `cursor`, as sets.
pub fn evaluate(
    played: impl IntoIterator<Item = u8>,
    table: &TimingTable,
    cursor: usize,
) -> MatchResult {
    let played: BTreeSet<u8> = played.into_iter().collect();
    if played.is_empty() {
        return MatchResult::Incomplete;
    }

    match table.expected_at(cursor) {
        Some(expected) if *expected == played => MatchResult::Correct,
        _ => MatchResult::NoMatch,
    }
}
