//! Key signatures in ABC spelling.
//!
//! A key is parsed from the text of a `K:` field ("G", "Bb", "F#m",
//! "D dorian", "E mix") and reduced to a position on the circle of
//! fifths, which decides the accidental carried by every letter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use winnow::ascii::space0;
use winnow::combinator::{alt, eof, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::{Error, Result};

type PResult<T> = winnow::ModalResult<T>;

/// Sharps are added in this order, flats in the reverse.
const SHARP_ORDER: [Letter; 7] = [
    Letter::F,
    Letter::C,
    Letter::G,
    Letter::D,
    Letter::A,
    Letter::E,
    Letter::B,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Letters in staff order, starting from C.
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Semitone offset of the natural note above C (0-11)
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    /// Sharps in the major key built on the natural letter (F is -1).
    fn major_fifths(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => -1,
            Letter::G => 1,
            Letter::A => 3,
            Letter::B => 5,
        }
    }

    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// Accidental on the key root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootAccidental {
    Sharp,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
}

impl Mode {
    /// Parse a mode word the way ABC does: case-insensitive, first three
    /// letters significant, bare "m" for minor.
    pub fn from_abbrev(s: &str) -> Option<Mode> {
        let lower = s.to_ascii_lowercase();
        if lower.is_empty() {
            return Some(Mode::Major);
        }
        if lower == "m" {
            return Some(Mode::Minor);
        }
        match lower.get(..3)? {
            "maj" | "ion" => Some(Mode::Major),
            "min" | "aeo" => Some(Mode::Minor),
            "dor" => Some(Mode::Dorian),
            "phr" => Some(Mode::Phrygian),
            "lyd" => Some(Mode::Lydian),
            "mix" => Some(Mode::Mixolydian),
            "loc" => Some(Mode::Locrian),
            _ => None,
        }
    }

    /// Shift on the circle of fifths relative to the major key on the same tonic.
    fn fifths_shift(self) -> i32 {
        match self {
            Mode::Lydian => 1,
            Mode::Major => 0,
            Mode::Mixolydian => -1,
            Mode::Dorian => -2,
            Mode::Minor => -3,
            Mode::Phrygian => -4,
            Mode::Locrian => -5,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Mode::Major => "",
            Mode::Minor => "m",
            Mode::Dorian => " dor",
            Mode::Phrygian => " phr",
            Mode::Lydian => " lyd",
            Mode::Mixolydian => " mix",
            Mode::Locrian => " loc",
        }
    }
}

/// A key signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub root: Letter,
    pub accidental: Option<RootAccidental>,
    pub mode: Mode,
    /// Positive for sharps, negative for flats.
    fifths: i32,
}

impl Default for Key {
    fn default() -> Self {
        Key {
            root: Letter::C,
            accidental: None,
            mode: Mode::Major,
            fifths: 0,
        }
    }
}

impl Key {
    /// Build a key, rejecting signatures beyond seven sharps or flats.
    pub fn new(root: Letter, accidental: Option<RootAccidental>, mode: Mode) -> Result<Key> {
        let accidental_shift = match accidental {
            Some(RootAccidental::Sharp) => 7,
            Some(RootAccidental::Flat) => -7,
            None => 0,
        };
        let fifths = root.major_fifths() + accidental_shift + mode.fifths_shift();
        let key = Key {
            root,
            accidental,
            mode,
            fifths,
        };

        if fifths.abs() > 7 {
            return Err(Error::InvalidKey {
                key: key.to_string(),
                reason: format!("needs {} accidentals", fifths.abs()),
            });
        }
        Ok(key)
    }

    /// Parse a `K:` field value.
    pub fn parse(input: &str) -> Result<Key> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Key::default());
        }

        let (root, accidental, mode) = key_spec.parse(trimmed).map_err(|e| Error::InvalidKey {
            key: input.to_string(),
            reason: e.to_string(),
        })?;
        Key::new(root, accidental, mode)
    }

    /// Number of sharps (positive) or flats (negative) in the signature.
    pub fn fifths(&self) -> i32 {
        self.fifths
    }

    /// Semitone adjustment the signature applies to `letter`.
    pub fn accidental_for(&self, letter: Letter) -> i32 {
        let count = self.fifths.unsigned_abs() as usize;
        if self.fifths > 0 {
            i32::from(SHARP_ORDER[..count].contains(&letter))
        } else if self.fifths < 0 {
            -i32::from(SHARP_ORDER.iter().rev().take(count).any(|l| *l == letter))
        } else {
            0
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Key> {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    /// ABC spelling, suitable for a `K:` field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.as_char())?;
        match self.accidental {
            Some(RootAccidental::Sharp) => write!(f, "#")?,
            Some(RootAccidental::Flat) => write!(f, "b")?,
            None => {}
        }
        write!(f, "{}", self.mode.suffix())
    }
}

fn key_root(input: &mut &str) -> PResult<Letter> {
    one_of(|c: char| matches!(c.to_ascii_uppercase(), 'A'..='G'))
        .verify_map(Letter::from_char)
        .parse_next(input)
}

fn root_accidental(input: &mut &str) -> PResult<RootAccidental> {
    alt((
        '#'.value(RootAccidental::Sharp),
        'b'.value(RootAccidental::Flat),
    ))
    .parse_next(input)
}

fn key_mode(input: &mut &str) -> PResult<Mode> {
    space0.parse_next(input)?;
    take_while(0.., |c: char| c.is_ascii_alphabetic())
        .verify_map(Mode::from_abbrev)
        .parse_next(input)
}

fn key_spec(input: &mut &str) -> PResult<(Letter, Option<RootAccidental>, Mode)> {
    let root = key_root(input)?;
    let accidental = opt(root_accidental).parse_next(input)?;
    let mode = key_mode(input)?;
    (space0, eof).parse_next(input)?;
    Ok((root, accidental, mode))
}
