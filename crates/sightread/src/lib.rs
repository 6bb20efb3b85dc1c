//! Sight-reading trainer engine.
//!
//! Generates short two-staff phrases, renders them as ABC notation, and
//! matches live MIDI keyboard input against the generated chords.
//!
//! # Example
//!
//! ```
//! use sightread::{ChordGenerator, GenerationConfig, Session, SessionEvent};
//!
//! let config = GenerationConfig::default();
//! let mut session = Session::with_generator(config, ChordGenerator::with_seed(7)).unwrap();
//!
//! // Markup for the notation renderer
//! assert!(session.phrase().abc.starts_with("T:"));
//!
//! // Play whatever the cursor expects
//! let expected: Vec<u8> = session.expected_midi().unwrap().iter().copied().collect();
//! let mut last = None;
//! for pitch in &expected {
//!     last = session.handle_midi(&[0x90, *pitch, 100]).unwrap();
//! }
//! assert!(matches!(
//!     last,
//!     Some(SessionEvent::Advanced { .. }) | Some(SessionEvent::Regenerated)
//! ));
//! ```

pub mod binding;
pub mod cursor;
pub mod generator;
pub mod key;
pub mod matcher;
pub mod midi;
pub mod notation;
pub mod phrase;
pub mod pitch;
pub mod session;
pub mod timing;

pub use binding::{Highlight, RenderBindings};
pub use cursor::Cursor;
pub use generator::{ChordGenerator, GenerationConfig, StaffConfig};
pub use key::{Key, Letter, Mode};
pub use matcher::{evaluate, MatchResult};
pub use midi::{parse_note_event, HeldNotes, NoteEvent};
pub use notation::{encode, Meter, ScoreHeader};
pub use phrase::{Chord, ChordId, NoteValue, Staff, StaffSequence, BASE_DURATION};
pub use pitch::{pitch_at, Pitch};
pub use session::{Phrase, Session, SessionEvent};
pub use timing::{TimingSlot, TimingTable};

/// Errors from phrase generation, timing and render binding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid key signature '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid meter '{0}'")]
    InvalidMeter(String),

    #[error("unknown note value '{0}' (expected whole, half, quarter or eighth)")]
    UnknownNoteValue(String),

    #[error("{staff} staff note count {count} outside 1..={max}")]
    InvalidNoteCount { staff: Staff, count: usize, max: usize },

    #[error("{staff} staff range {min}..={max} exceeds caps {cap_min}..={cap_max}")]
    CapViolated {
        staff: Staff,
        min: i32,
        max: i32,
        cap_min: i32,
        cap_max: i32,
    },

    #[error("{staff} staff range is empty: min index {min} > max index {max}")]
    InvalidRange { staff: Staff, min: i32, max: i32 },

    #[error("staff index {index} outside pitch space {min}..={max}")]
    IndexOutOfRange { index: i32, min: i32, max: i32 },

    #[error("staff durations differ: top {top}, bottom {bottom}")]
    DurationMismatch { top: u32, bottom: u32 },

    #[error("{staff} staff emitted {chords} chords but the renderer produced {elements} elements")]
    BindingMismatch {
        staff: Staff,
        chords: usize,
        elements: usize,
    },
}

impl Error {
    /// Bad input that was rejected before anything was generated.
    pub fn is_configuration_error(&self) -> bool {
        !self.is_integrity_violation()
    }

    /// An upstream generation, encoding or rendering bug.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Error::DurationMismatch { .. } | Error::BindingMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
