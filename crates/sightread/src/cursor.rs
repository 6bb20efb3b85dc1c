//! Practice position within a timing table.

use serde::Serialize;
use tracing::debug;

use crate::timing::TimingTable;

/// Index of the chord the player is expected to play next.
///
/// Always rests on a non-empty slot of the table it was last moved
/// against (or 0 for a table without any).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cursor {
    position: usize,
}

impl Cursor {
    /// A cursor on the first chord of `table`.
    pub fn new(table: &TimingTable) -> Self {
        let mut cursor = Cursor::default();
        cursor.reset(table);
        cursor
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to the first non-empty slot.
    pub fn reset(&mut self, table: &TimingTable) {
        self.position = table.first_expected().unwrap_or(0);
    }

    /// Move to the next non-empty slot.
    ///
    /// Returns false when there is none, after wrapping back to the first.
    pub fn advance(&mut self, table: &TimingTable) -> bool {
        match table.next_expected_after(self.position) {
            Some(next) => {
                debug!("cursor {} -> {}", self.position, next);
                self.position = next;
                true
            }
            None => {
                debug!("cursor {} wrapped", self.position);
                self.reset(table);
                false
            }
        }
    }

    /// Move to the previous non-empty slot, staying on the first.
    pub fn retreat(&mut self, table: &TimingTable) {
        match table.prev_expected_before(self.position) {
            Some(prev) => self.position = prev,
            None => self.reset(table),
        }
    }

    /// True when no chord follows the current one.
    pub fn at_final(&self, table: &TimingTable) -> bool {
        table.next_expected_after(self.position).is_none()
    }
}
