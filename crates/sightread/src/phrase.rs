//! Chords and staff sequences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;
use crate::{Error, Result};

/// Minimal time units in a whole note. Written as `L:1/48`.
pub const BASE_DURATION: u32 = 48;

/// One of the two staves of the grand staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staff {
    Top,
    Bottom,
}

impl Staff {
    /// Clef name as written in a `[K: clef=...]` field.
    pub fn clef(self) -> &'static str {
        match self {
            Staff::Top => "treble",
            Staff::Bottom => "bass",
        }
    }

    /// ABC voice number.
    pub fn voice(self) -> u8 {
        match self {
            Staff::Top => 1,
            Staff::Bottom => 2,
        }
    }

    /// Hard caps on the index range a configuration may request.
    pub fn index_caps(self) -> (i32, i32) {
        match self {
            Staff::Top => (-5, 20),
            Staff::Bottom => (-20, 5),
        }
    }
}

impl fmt::Display for Staff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staff::Top => f.write_str("top"),
            Staff::Bottom => f.write_str("bottom"),
        }
    }
}

/// Note value used as a staff's duration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
}

impl NoteValue {
    /// Length in minimal time units.
    pub fn units(self) -> u32 {
        match self {
            NoteValue::Whole => BASE_DURATION,
            NoteValue::Half => BASE_DURATION / 2,
            NoteValue::Quarter => BASE_DURATION / 4,
            NoteValue::Eighth => BASE_DURATION / 8,
        }
    }
}

impl FromStr for NoteValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<NoteValue> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole" => Ok(NoteValue::Whole),
            "half" => Ok(NoteValue::Half),
            "quarter" => Ok(NoteValue::Quarter),
            "eighth" => Ok(NoteValue::Eighth),
            _ => Err(Error::UnknownNoteValue(s.to_string())),
        }
    }
}

/// One or more pitches sounding together on one staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    /// Lowest pitch first.
    pub pitches: Vec<Pitch>,
    /// Length in minimal time units.
    pub duration: u32,
    /// Slot in the timing table where this chord starts. Set when the
    /// table is built.
    pub timing_index: Option<usize>,
}

impl Chord {
    pub fn new(pitches: Vec<Pitch>, duration: u32) -> Self {
        Chord {
            pitches,
            duration,
            timing_index: None,
        }
    }

    pub fn midi(&self) -> impl Iterator<Item = u8> + '_ {
        self.pitches.iter().map(|p| p.midi)
    }

    /// ABC token for this chord: `C12` or `[CEG]12`.
    pub fn to_abc(&self) -> String {
        if self.pitches.len() == 1 {
            format!("{}{}", self.pitches[0].name, self.duration)
        } else {
            let names: String = self.pitches.iter().map(|p| p.name.as_str()).collect();
            format!("[{}]{}", names, self.duration)
        }
    }
}

/// Identity of a chord within a phrase: staff plus emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordId {
    pub staff: Staff,
    pub index: usize,
}

/// The chords of one staff, in playing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSequence {
    pub staff: Staff,
    pub chords: Vec<Chord>,
}

impl StaffSequence {
    pub fn new(staff: Staff, chords: Vec<Chord>) -> Self {
        StaffSequence { staff, chords }
    }

    /// Sum of chord durations in minimal time units.
    pub fn total_duration(&self) -> u32 {
        self.chords.iter().map(|c| c.duration).sum()
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Chords whose timing index is `slot`, with their identities.
    pub fn chords_at(&self, slot: usize) -> impl Iterator<Item = (ChordId, &Chord)> + '_ {
        let staff = self.staff;
        self.chords
            .iter()
            .enumerate()
            .filter(move |(_, chord)| chord.timing_index == Some(slot))
            .map(move |(index, chord)| (ChordId { staff, index }, chord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch(name: &str, midi: u8) -> Pitch {
        Pitch {
            name: name.to_string(),
            midi,
        }
    }

    #[test]
    fn test_note_value_units() {
        assert_eq!(NoteValue::Whole.units(), 48);
        assert_eq!(NoteValue::Half.units(), 24);
        assert_eq!(NoteValue::Quarter.units(), 12);
        assert_eq!(NoteValue::Eighth.units(), 6);
    }

    #[test]
    fn test_note_value_parse() {
        assert_eq!("Quarter".parse::<NoteValue>().unwrap(), NoteValue::Quarter);
        assert_eq!(" half ".parse::<NoteValue>().unwrap(), NoteValue::Half);
        assert!(matches!(
            "dotted".parse::<NoteValue>(),
            Err(Error::UnknownNoteValue(_))
        ));
    }

    #[test]
    fn test_chord_abc() {
        let single = Chord::new(vec![pitch("C", 60)], 12);
        assert_eq!(single.to_abc(), "C12");

        let triad = Chord::new(vec![pitch("C", 60), pitch("E", 64), pitch("G", 67)], 24);
        assert_eq!(triad.to_abc(), "[CEG]24");
    }

    #[test]
    fn test_total_duration() {
        let seq = StaffSequence::new(
            Staff::Top,
            vec![
                Chord::new(vec![pitch("C", 60)], 12),
                Chord::new(vec![pitch("D", 62)], 36),
            ],
        );
        assert_eq!(seq.total_duration(), 48);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_staff_caps() {
        assert_eq!(Staff::Top.index_caps(), (-5, 20));
        assert_eq!(Staff::Bottom.index_caps(), (-20, 5));
        assert_eq!(Staff::Bottom.clef(), "bass");
        assert_eq!(Staff::Top.to_string(), "top");
    }
}
