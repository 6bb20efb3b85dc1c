//! ABC markup for a two-staff phrase.
//!
//! The output declares two simultaneous staves and then alternates one
//! line of the top staff with one line of the bottom staff. A line holds
//! `MEASURES_PER_LINE` measures; within a measure a space closes every
//! beat so the renderer beams notes per beat. Both staves redeclare
//! their key and clef at the start of every line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use winnow::ascii::{digit1, space0};
use winnow::combinator::{alt, eof, separated_pair, terminated};
use winnow::prelude::*;

use crate::key::Key;
use crate::phrase::{Chord, Staff, StaffSequence, BASE_DURATION};
use crate::{Error, Result};

type PResult<T> = winnow::ModalResult<T>;

pub const MEASURES_PER_LINE: usize = 4;

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    pub beats: u32,
    pub beat_unit: u32,
}

impl Default for Meter {
    fn default() -> Self {
        Meter {
            beats: 4,
            beat_unit: 4,
        }
    }
}

impl Meter {
    pub fn new(beats: u32, beat_unit: u32) -> Result<Meter> {
        let valid_unit = matches!(beat_unit, 1 | 2 | 4 | 8 | 16);
        if !valid_unit || beats == 0 || beats > 32 {
            return Err(Error::InvalidMeter(format!("{}/{}", beats, beat_unit)));
        }
        Ok(Meter { beats, beat_unit })
    }

    /// Length of one measure in minimal time units.
    pub fn measure_units(&self) -> u32 {
        BASE_DURATION * self.beats / self.beat_unit
    }

    /// Length of one beat in minimal time units.
    pub fn beat_units(&self) -> u32 {
        BASE_DURATION / self.beat_unit
    }
}

impl FromStr for Meter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Meter> {
        let (beats, beat_unit) = meter_spec
            .parse(s.trim())
            .map_err(|_| Error::InvalidMeter(s.to_string()))?;
        Meter::new(beats, beat_unit)
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_unit)
    }
}

fn meter_number(input: &mut &str) -> PResult<u32> {
    digit1.parse_to().parse_next(input)
}

fn meter_spec(input: &mut &str) -> PResult<(u32, u32)> {
    terminated(
        alt((
            "C|".value((2, 2)),
            "C".value((4, 4)),
            separated_pair(meter_number, (space0, '/', space0), meter_number),
        )),
        eof,
    )
    .parse_next(input)
}

/// Header fields written once at the top of the markup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreHeader {
    pub title: String,
    pub meter: Meter,
    pub key: Key,
}

/// Serialize both staves to ABC markup.
///
/// Line blocks continue until both staves are exhausted. If one staff
/// runs out of chords first, later blocks carry only the other staff.
pub fn encode(top: &StaffSequence, bottom: &StaffSequence, header: &ScoreHeader) -> String {
    let mut result = format!("T:{}\n", header_text(&header.title));
    result.push_str(&format!("M:{}\n", header.meter));
    result.push_str(&format!("L:1/{}\n", BASE_DURATION));
    result.push_str(&format!("K:{}\n", header.key));
    result.push_str("%%staves {1 2}\n");

    let mut top_pos = 0;
    let mut bottom_pos = 0;
    while top_pos < top.len() || bottom_pos < bottom.len() {
        for (seq, pos) in [(top, &mut top_pos), (bottom, &mut bottom_pos)] {
            if *pos >= seq.len() {
                continue;
            }
            result.push_str(&staff_header(seq.staff, &header.key));
            result.push_str(&encode_line(&seq.chords, pos, &header.meter));
            result.push('\n');
        }
    }

    result
}

/// Field text confined to its header line: control characters become spaces.
fn header_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn staff_header(staff: Staff, key: &Key) -> String {
    format!("V:{}\n[K:{} clef={}]\n", staff.voice(), key, staff.clef())
}

/// Encode up to one line of measures starting at `*pos`, advancing it.
fn encode_line(chords: &[Chord], pos: &mut usize, meter: &Meter) -> String {
    let measure_units = meter.measure_units();
    let beat_units = meter.beat_units();
    let mut line = String::new();

    for _ in 0..MEASURES_PER_LINE {
        if *pos >= chords.len() {
            break;
        }

        let mut measure_time = 0;
        let mut beat_time = 0;
        while measure_time < measure_units && *pos < chords.len() {
            let chord = &chords[*pos];
            line.push_str(&chord.to_abc());
            measure_time += chord.duration;
            beat_time += chord.duration;
            if beat_time >= beat_units {
                beat_time = 0;
                line.push(' ');
            }
            *pos += 1;
        }
        line.push('|');
    }

    if *pos >= chords.len() {
        line.push(']');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::pitch_at;
    use pretty_assertions::assert_eq;

    fn sequence(staff: Staff, notes: &[(i32, u32)]) -> StaffSequence {
        let key = Key::default();
        let chords = notes
            .iter()
            .map(|&(index, duration)| Chord::new(vec![pitch_at(index, &key).unwrap()], duration))
            .collect();
        StaffSequence::new(staff, chords)
    }

    #[test]
    fn test_title_stays_on_one_line() {
        let top = sequence(Staff::Top, &[(0, 48)]);
        let bottom = sequence(Staff::Bottom, &[(-7, 48)]);
        let header = ScoreHeader {
            title: "Drill\nK:F#\r\tTwo".to_string(),
            ..ScoreHeader::default()
        };

        let abc = encode(&top, &bottom, &header);
        assert!(abc.starts_with("T:Drill K:F#  Two\nM:4/4\n"));
        assert_eq!(abc.matches("\nK:").count(), 1);
    }

    #[test]
    fn test_stretched_chord_stays_one_token() {
        let top = sequence(Staff::Top, &[(0, 48), (2, 54)]);
        let bottom = sequence(Staff::Bottom, &[(-7, 102)]);

        let abc = encode(&top, &bottom, &ScoreHeader::default());
        assert!(abc.contains("\nC48 |E54 |]\n"));
        assert!(abc.contains("\nC,102 |]\n"));
    }

    #[test]
    fn test_encode_short_phrase() {
        let top = sequence(Staff::Top, &[(0, 12), (2, 12), (4, 12)]);
        let bottom = sequence(Staff::Bottom, &[(-7, 36)]);

        let abc = encode(&top, &bottom, &ScoreHeader::default());
        let expected = "T:\n\
M:4/4\n\
L:1/48\n\
K:C\n\
%%staves {1 2}\n\
V:1\n\
[K:C clef=treble]\n\
C12 E12 G12 |]\n\
V:2\n\
[K:C clef=bass]\n\
C,36 |]\n";
        assert_eq!(abc, expected);
    }

    #[test]
    fn test_beat_grouping_for_eighths() {
        let top = sequence(Staff::Top, &[(0, 6), (1, 6), (2, 6), (3, 6), (4, 24)]);
        let bottom = sequence(Staff::Bottom, &[(-7, 48)]);

        let abc = encode(&top, &bottom, &ScoreHeader::default());
        assert!(abc.contains("\nC6D6 E6F6 G24 |]\n"), "{}", abc);
    }

    #[test]
    fn test_line_wrap_after_four_measures() {
        let notes: Vec<(i32, u32)> = (0..6).map(|i| (i, 48)).collect();
        let top = sequence(Staff::Top, &notes);
        let bass: Vec<(i32, u32)> = (0..6).map(|i| (-i, 48)).collect();
        let bottom = sequence(Staff::Bottom, &bass);

        let header = ScoreHeader {
            title: "Drill".to_string(),
            meter: Meter::default(),
            key: Key::parse("G").unwrap(),
        };
        let abc = encode(&top, &bottom, &header);
        let expected = "T:Drill\n\
M:4/4\n\
L:1/48\n\
K:G\n\
%%staves {1 2}\n\
V:1\n\
[K:G clef=treble]\n\
C48 |D48 |E48 |F48 |\n\
V:2\n\
[K:G clef=bass]\n\
C48 |B,48 |A,48 |G,48 |\n\
V:1\n\
[K:G clef=treble]\n\
G48 |A48 |]\n\
V:2\n\
[K:G clef=bass]\n\
F,48 |E,48 |]\n";
        assert_eq!(abc, expected);
    }

    #[test]
    fn test_final_barline_once_per_staff() {
        let notes: Vec<(i32, u32)> = (0..9).map(|i| (i, 24)).collect();
        let top = sequence(Staff::Top, &notes);
        let bottom = sequence(Staff::Bottom, &[(-1, 216)]);

        let abc = encode(&top, &bottom, &ScoreHeader::default());
        assert_eq!(abc.matches("|]").count(), 2);
        assert_eq!(abc.matches("V:1\n").count(), 2);
        // The bottom staff finished in the first block
        assert_eq!(abc.matches("V:2\n").count(), 1);
    }

    #[test]
    fn test_chords_emitted_in_order() {
        let mut top = sequence(Staff::Top, &[(0, 24), (4, 24)]);
        top.chords[0].pitches.push(pitch_at(2, &Key::default()).unwrap());
        let bottom = sequence(Staff::Bottom, &[(-7, 48)]);

        let abc = encode(&top, &bottom, &ScoreHeader::default());
        assert!(abc.contains("[CE]24 G24 |]"), "{}", abc);
    }

    #[test]
    fn test_meter_parse() {
        assert_eq!("4/4".parse::<Meter>().unwrap(), Meter::default());
        assert_eq!("C".parse::<Meter>().unwrap(), Meter::default());
        assert_eq!("C|".parse::<Meter>().unwrap(), Meter::new(2, 2).unwrap());
        assert_eq!(" 6 / 8 ".parse::<Meter>().unwrap(), Meter::new(6, 8).unwrap());
        assert!("3/5".parse::<Meter>().is_err());
        assert!("0/4".parse::<Meter>().is_err());
        assert!("waltz".parse::<Meter>().is_err());
    }

    #[test]
    fn test_meter_units() {
        let waltz = Meter::new(3, 4).unwrap();
        assert_eq!(waltz.measure_units(), 36);
        assert_eq!(waltz.beat_units(), 12);
        let jig = Meter::new(6, 8).unwrap();
        assert_eq!(jig.measure_units(), 36);
        assert_eq!(jig.beat_units(), 6);
    }
}
