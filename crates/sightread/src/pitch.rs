//! Staff positions to concrete pitches.
//!
//! Index 0 is the middle-C staff position (C4 before the key signature
//! is applied). Each step is one diatonic line or space, so index 2 is
//! E4 and index -7 is C3.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::{Key, Letter};
use crate::{Error, Result};

/// Lowest staff position the pitch space covers.
pub const INDEX_MIN: i32 = -20;
/// Highest staff position the pitch space covers.
pub const INDEX_MAX: i32 = 20;

/// Octave number of the index-0 staff position.
const REFERENCE_OCTAVE: i32 = 4;

/// A pitch as written on the staff and as played on the keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// ABC spelling without accidentals (the key signature supplies them).
    pub name: String,
    pub midi: u8,
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Map a staff-position index to a pitch in `key`.
///
/// Indices outside `INDEX_MIN..=INDEX_MAX` fail with `IndexOutOfRange`.
pub fn pitch_at(index: i32, key: &Key) -> Result<Pitch> {
    if !(INDEX_MIN..=INDEX_MAX).contains(&index) {
        return Err(Error::IndexOutOfRange {
            index,
            min: INDEX_MIN,
            max: INDEX_MAX,
        });
    }

    let letter = Letter::ALL[index.rem_euclid(7) as usize];
    let octave = REFERENCE_OCTAVE + index.div_euclid(7);
    let midi = 12 * (octave + 1) + letter.semitone() + key.accidental_for(letter);

    Ok(Pitch {
        name: abc_name(letter, octave),
        // The caps keep this well inside 0..=127
        midi: midi as u8,
    })
}

/// ABC pitch spelling: C = C4, c = C5, c' = C6, C, = C3.
fn abc_name(letter: Letter, octave: i32) -> String {
    let mut name = String::new();
    if octave >= REFERENCE_OCTAVE + 1 {
        name.push(letter.as_char().to_ascii_lowercase());
        for _ in 0..(octave - REFERENCE_OCTAVE - 1) {
            name.push('\'');
        }
    } else {
        name.push(letter.as_char());
        for _ in 0..(REFERENCE_OCTAVE - octave) {
            name.push(',');
        }
    }
    name
}
