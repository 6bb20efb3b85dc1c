//! Time-indexed table of expected pitch sets.
//!
//! One slot per minimal time unit. A slot is either `Empty` (no chord
//! starts there) or the set of MIDI pitches that must be held at that
//! instant across both staves.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::phrase::StaffSequence;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TimingSlot {
    Empty,
    /// Never empty.
    Expected(BTreeSet<u8>),
}

impl TimingSlot {
    /// Slot for the given pitches; `Empty` if there are none.
    pub fn from_pitches(pitches: impl IntoIterator<Item = u8>) -> TimingSlot {
        let set: BTreeSet<u8> = pitches.into_iter().collect();
        if set.is_empty() {
            TimingSlot::Empty
        } else {
            TimingSlot::Expected(set)
        }
    }

    pub fn is_expected(&self) -> bool {
        matches!(self, TimingSlot::Expected(_))
    }

    pub fn pitches(&self) -> Option<&BTreeSet<u8>> {
        match self {
            TimingSlot::Expected(set) => Some(set),
            TimingSlot::Empty => None,
        }
    }

    fn merge(&mut self, pitches: impl IntoIterator<Item = u8>) {
        match self {
            TimingSlot::Expected(set) => set.extend(pitches),
            TimingSlot::Empty => *self = TimingSlot::from_pitches(pitches),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TimingTable {
    slots: Vec<TimingSlot>,
}

impl TimingTable {
    /// Build the table from both staves and stamp every chord with the
    /// slot it starts on.
    ///
    /// The top staff lays out the slots; the bottom staff is merged into
    /// them. Staves of unequal total duration are rejected with
    /// `DurationMismatch` before anything is stamped.
    pub fn build(top: &mut StaffSequence, bottom: &mut StaffSequence) -> Result<TimingTable> {
        let top_total = top.total_duration();
        let bottom_total = bottom.total_duration();
        if top_total != bottom_total {
            return Err(Error::DurationMismatch {
                top: top_total,
                bottom: bottom_total,
            });
        }

        let mut slots = Vec::with_capacity(top_total as usize);
        for chord in &mut top.chords {
            let start = slots.len();
            slots.extend(std::iter::repeat(TimingSlot::Empty).take(chord.duration as usize));
            if let Some(slot) = slots.get_mut(start) {
                *slot = TimingSlot::from_pitches(chord.midi());
            }
            chord.timing_index = Some(start);
        }

        let mut t = 0usize;
        for chord in &mut bottom.chords {
            let slot = slots.get_mut(t).ok_or(Error::DurationMismatch {
                top: top_total,
                bottom: bottom_total,
            })?;
            slot.merge(chord.midi());
            chord.timing_index = Some(t);
            t += chord.duration as usize;
        }

        let table = TimingTable { slots };
        debug!(
            "timing table: {} slots, {} expected",
            table.len(),
            table.expected_count()
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimingSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[TimingSlot] {
        &self.slots
    }

    /// Pitches expected at `index`, if a chord starts there.
    pub fn expected_at(&self, index: usize) -> Option<&BTreeSet<u8>> {
        self.slots.get(index).and_then(TimingSlot::pitches)
    }

    pub fn expected_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_expected()).count()
    }

    /// Indices of all non-empty slots, in order.
    pub fn expected_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_expected())
            .map(|(i, _)| i)
    }

    pub fn first_expected(&self) -> Option<usize> {
        self.expected_positions().next()
    }

    /// First non-empty slot strictly after `index`.
    pub fn next_expected_after(&self, index: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, s)| s.is_expected())
            .map(|(i, _)| i)
    }

    /// Last non-empty slot strictly before `index`.
    pub fn prev_expected_before(&self, index: usize) -> Option<usize> {
        let end = index.min(self.slots.len());
        self.slots[..end].iter().rposition(TimingSlot::is_expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::phrase::{Chord, Staff};
    use crate::pitch::pitch_at;
    use pretty_assertions::assert_eq;

    fn sequence(staff: Staff, chords: &[(&[i32], u32)]) -> StaffSequence {
        let key = Key::default();
        let chords = chords
            .iter()
            .map(|(indices, duration)| {
                let pitches = indices.iter().map(|&i| pitch_at(i, &key).unwrap()).collect();
                Chord::new(pitches, *duration)
            })
            .collect();
        StaffSequence::new(staff, chords)
    }

    fn set(pitches: &[u8]) -> BTreeSet<u8> {
        pitches.iter().copied().collect()
    }

    #[test]
    fn test_three_over_one() {
        let mut top = sequence(Staff::Top, &[(&[0], 12), (&[2], 12), (&[4], 12)]);
        let mut bottom = sequence(Staff::Bottom, &[(&[-7], 36)]);

        let table = TimingTable::build(&mut top, &mut bottom).unwrap();

        assert_eq!(table.len(), 36);
        assert_eq!(table.expected_positions().collect::<Vec<_>>(), vec![0, 12, 24]);
        assert_eq!(table.expected_at(0), Some(&set(&[48, 60])));
        assert_eq!(table.expected_at(12), Some(&set(&[64])));
        assert_eq!(table.expected_at(24), Some(&set(&[67])));
        assert_eq!(table.get(1), Some(&TimingSlot::Empty));

        let stamps: Vec<_> = top.chords.iter().map(|c| c.timing_index).collect();
        assert_eq!(stamps, vec![Some(0), Some(12), Some(24)]);
        assert_eq!(bottom.chords[0].timing_index, Some(0));
    }

    #[test]
    fn test_bottom_creates_slot_inside_top_note() {
        let mut top = sequence(Staff::Top, &[(&[0], 48)]);
        let mut bottom = sequence(Staff::Bottom, &[(&[-3], 24), (&[-5], 24)]);

        let table = TimingTable::build(&mut top, &mut bottom).unwrap();
        assert_eq!(table.expected_positions().collect::<Vec<_>>(), vec![0, 24]);
        assert_eq!(table.expected_at(24), Some(&set(&[52])));
        assert_eq!(bottom.chords[1].timing_index, Some(24));
    }

    #[test]
    fn test_shared_pitch_is_deduplicated() {
        let mut top = sequence(Staff::Top, &[(&[0, 2], 24)]);
        let mut bottom = sequence(Staff::Bottom, &[(&[0], 24)]);

        let table = TimingTable::build(&mut top, &mut bottom).unwrap();
        assert_eq!(table.expected_at(0), Some(&set(&[60, 64])));
    }

    #[test]
    fn test_duration_mismatch_is_integrity_violation() {
        let mut top = sequence(Staff::Top, &[(&[0], 12), (&[2], 12), (&[4], 12)]);
        let mut bottom = sequence(Staff::Bottom, &[(&[-7], 24)]);

        let err = TimingTable::build(&mut top, &mut bottom).unwrap_err();
        assert!(matches!(err, Error::DurationMismatch { top: 36, bottom: 24 }));
        assert!(err.is_integrity_violation());
        assert!(top.chords.iter().all(|c| c.timing_index.is_none()));
    }

    #[test]
    fn test_navigation_helpers() {
        let mut top = sequence(Staff::Top, &[(&[0], 12), (&[2], 12), (&[4], 24)]);
        let mut bottom = sequence(Staff::Bottom, &[(&[-7], 48)]);
        let table = TimingTable::build(&mut top, &mut bottom).unwrap();

        assert_eq!(table.first_expected(), Some(0));
        assert_eq!(table.next_expected_after(0), Some(12));
        assert_eq!(table.next_expected_after(5), Some(12));
        assert_eq!(table.next_expected_after(24), None);
        assert_eq!(table.prev_expected_before(24), Some(12));
        assert_eq!(table.prev_expected_before(0), None);
        assert_eq!(table.prev_expected_before(1000), Some(24));
    }

    #[test]
    fn test_empty_pitch_set_is_empty_slot() {
        assert_eq!(TimingSlot::from_pitches(Vec::new()), TimingSlot::Empty);
        assert!(TimingSlot::from_pitches([60, 60]).is_expected());
    }

    #[test]
    fn test_serializes_empty_as_null() {
        let mut top = sequence(Staff::Top, &[(&[0], 2)]);
        let mut bottom = sequence(Staff::Bottom, &[(&[-7], 2)]);
        let table = TimingTable::build(&mut top, &mut bottom).unwrap();
        assert_eq!(serde_json::to_string(&table).unwrap(), "[[48,60],null]");
    }
}
