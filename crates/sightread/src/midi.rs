//! Raw MIDI messages to note events, and the set of held keys.
//!
//! Every input device feeds the same stream; nothing here tracks which
//! device a message came from.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::trace;

/// Note On, channel 1.
pub const NOTE_ON: u8 = 0x90;
/// Note Off, channel 1.
pub const NOTE_OFF: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteEvent {
    On { pitch: u8 },
    Off { pitch: u8 },
}

/// Classify a raw message as a key press or release.
///
/// Note On with velocity 0 is a release. Anything else (clock, active
/// sensing, control change, other channels, truncated messages) is noise
/// and yields `None`.
pub fn parse_note_event(data: &[u8]) -> Option<NoteEvent> {
    let (&status, rest) = data.split_first()?;
    let (&pitch, &velocity) = match rest {
        [pitch, velocity, ..] => (pitch, velocity),
        _ => {
            trace!("dropping short MIDI message {:02X?}", data);
            return None;
        }
    };
    if pitch > 127 || velocity > 127 {
        trace!("dropping malformed MIDI message {:02X?}", data);
        return None;
    }

    match status {
        NOTE_ON if velocity > 0 => Some(NoteEvent::On { pitch }),
        NOTE_ON | NOTE_OFF => Some(NoteEvent::Off { pitch }),
        _ => {
            trace!("ignoring MIDI status {:02X}", status);
            None
        }
    }
}

/// Parse a line of hex bytes such as `90 3C 64` or `0x90,0x3c,0x64`.
pub fn parse_hex_message(line: &str) -> Option<Vec<u8>> {
    let bytes = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u8::from_str_radix(digits, 16).ok()
        })
        .collect::<Option<Vec<u8>>>()?;

    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}

/// Keys currently held down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeldNotes {
    pitches: BTreeSet<u8>,
}

impl HeldNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::On { pitch } => {
                self.pitches.insert(pitch);
            }
            NoteEvent::Off { pitch } => {
                self.pitches.remove(&pitch);
            }
        }
    }

    pub fn clear(&mut self) {
        self.pitches.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn pitches(&self) -> &BTreeSet<u8> {
        &self.pitches
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.pitches.iter().copied()
    }
}
