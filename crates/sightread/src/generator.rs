//! Constrained random generation of chord sequences for both staves.
//!
//! Each staff draws `note_count` distinct staff positions from its index
//! range. With harmony enabled a chord may stack one diatonic interval
//! above its root; a short memory of recent interval choices steers
//! away from repeating the same one.
//!
//! Both staves must span the same number of time units. When the
//! configured counts and note values disagree, the last chord of the
//! shorter staff is lengthened to the longer staff's total.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sightread_conf::{GenerationSettings, StaffSettings};
use tracing::debug;

use crate::key::Key;
use crate::notation::Meter;
use crate::phrase::{Chord, NoteValue, Staff, StaffSequence};
use crate::pitch::pitch_at;
use crate::{Error, Result};

/// Largest note count a staff may request.
pub const NOTE_COUNT_MAX: usize = 16;

/// Harmony intervals in staff steps above the root: third, fifth, sixth, octave.
const HARMONY_STEPS: [i32; 4] = [2, 4, 5, 7];

/// How many recent harmony choices are avoided.
const HARMONY_MEMORY: usize = 2;

/// Generation constraints for one staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffConfig {
    /// Inclusive.
    pub min_index: i32,
    /// Inclusive.
    pub max_index: i32,
    pub note_count: usize,
    pub note_value: NoteValue,
}

impl StaffConfig {
    /// Check the range against the staff caps and clamp the note count
    /// to the number of distinct positions available.
    fn validated_count(&self, staff: Staff) -> Result<usize> {
        if self.note_count == 0 || self.note_count > NOTE_COUNT_MAX {
            return Err(Error::InvalidNoteCount {
                staff,
                count: self.note_count,
                max: NOTE_COUNT_MAX,
            });
        }
        if self.min_index > self.max_index {
            return Err(Error::InvalidRange {
                staff,
                min: self.min_index,
                max: self.max_index,
            });
        }

        let (cap_min, cap_max) = staff.index_caps();
        if self.min_index < cap_min || self.max_index > cap_max {
            return Err(Error::CapViolated {
                staff,
                min: self.min_index,
                max: self.max_index,
                cap_min,
                cap_max,
            });
        }

        let positions = (self.max_index - self.min_index + 1) as usize;
        if self.note_count > positions {
            debug!(
                "{} staff: clamping note count {} to {} positions",
                staff, self.note_count, positions
            );
            Ok(positions)
        } else {
            Ok(self.note_count)
        }
    }

    fn from_settings(settings: &StaffSettings) -> Result<Self> {
        Ok(StaffConfig {
            min_index: settings.min_index,
            max_index: settings.max_index,
            note_count: settings.note_count as usize,
            note_value: settings.note_value.parse()?,
        })
    }
}

/// Everything needed to draw one phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub key: Key,
    pub harmony: bool,
    /// Clear the harmony memory before drawing.
    pub reset_harmony: bool,
    pub title: String,
    pub meter: Meter,
    pub top: StaffConfig,
    pub bottom: StaffConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            key: Key::default(),
            harmony: false,
            reset_harmony: true,
            title: String::new(),
            meter: Meter::default(),
            top: StaffConfig {
                min_index: 0,
                max_index: 11,
                note_count: 3,
                note_value: NoteValue::Quarter,
            },
            bottom: StaffConfig {
                min_index: -11,
                max_index: 0,
                note_count: 1,
                note_value: NoteValue::Half,
            },
        }
    }
}

impl GenerationConfig {
    /// Build from file settings, parsing key, meter and note values.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let config = GenerationConfig {
            key: Key::parse(&settings.key)?,
            harmony: settings.harmony,
            reset_harmony: true,
            title: settings.title.clone(),
            meter: settings.meter.parse()?,
            top: StaffConfig::from_settings(&settings.top)?,
            bottom: StaffConfig::from_settings(&settings.bottom)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on anything generation would reject.
    pub fn validate(&self) -> Result<()> {
        self.top.validated_count(Staff::Top)?;
        self.bottom.validated_count(Staff::Bottom)?;
        Ok(())
    }
}

/// Random chord source with harmony memory.
#[derive(Debug)]
pub struct ChordGenerator {
    rng: StdRng,
    harmony_memory: VecDeque<Option<i32>>,
}

impl Default for ChordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordGenerator {
    /// Generator seeded from the operating system.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        ChordGenerator {
            rng,
            harmony_memory: VecDeque::with_capacity(HARMONY_MEMORY + 1),
        }
    }

    /// Forget recent harmony choices.
    pub fn reset_harmony(&mut self) {
        self.harmony_memory.clear();
    }

    /// Draw a top and bottom staff of equal total duration.
    pub fn generate(&mut self, config: &GenerationConfig) -> Result<(StaffSequence, StaffSequence)> {
        let top_count = config.top.validated_count(Staff::Top)?;
        let bottom_count = config.bottom.validated_count(Staff::Bottom)?;

        if config.reset_harmony {
            self.reset_harmony();
        }

        let mut top = self.draw_staff(Staff::Top, &config.top, top_count, config)?;
        let mut bottom = self.draw_staff(Staff::Bottom, &config.bottom, bottom_count, config)?;

        reconcile_durations(&mut top, &mut bottom);

        Ok((top, bottom))
    }

    fn draw_staff(
        &mut self,
        staff: Staff,
        staff_config: &StaffConfig,
        count: usize,
        config: &GenerationConfig,
    ) -> Result<StaffSequence> {
        let mut positions: Vec<i32> = (staff_config.min_index..=staff_config.max_index).collect();
        positions.shuffle(&mut self.rng);
        positions.truncate(count);

        let duration = staff_config.note_value.units();
        let mut chords = Vec::with_capacity(count);
        for root in positions {
            let mut indices = vec![root];
            if config.harmony {
                if let Some(step) = self.pick_harmony(root, staff_config.max_index) {
                    indices.push(root + step);
                }
            }

            let pitches = indices
                .iter()
                .map(|&index| pitch_at(index, &config.key))
                .collect::<Result<Vec<_>>>()?;
            chords.push(Chord::new(pitches, duration));
        }

        Ok(StaffSequence::new(staff, chords))
    }

    /// Choose an interval to stack on `root`, or none.
    ///
    /// Only intervals that stay at or below `max_index` are candidates.
    /// Choices still in memory are skipped unless nothing else is left.
    fn pick_harmony(&mut self, root: i32, max_index: i32) -> Option<i32> {
        let candidates: Vec<Option<i32>> = std::iter::once(None)
            .chain(
                HARMONY_STEPS
                    .iter()
                    .filter(|&&step| root + step <= max_index)
                    .map(|&step| Some(step)),
            )
            .collect();

        let fresh: Vec<Option<i32>> = candidates
            .iter()
            .copied()
            .filter(|choice| !self.harmony_memory.contains(choice))
            .collect();
        let pool = if fresh.is_empty() { &candidates } else { &fresh };

        let choice = pool.choose(&mut self.rng).copied().flatten();
        self.harmony_memory.push_back(choice);
        while self.harmony_memory.len() > HARMONY_MEMORY {
            self.harmony_memory.pop_front();
        }

        debug!("harmony on root {}: {:?}", root, choice);
        choice
    }
}

/// Lengthen the last chord of the shorter staff so both totals agree.
///
/// The stretched length need not be a single written note value (a
/// 54-unit chord is 9/8 of a whole); it is still emitted as one token.
fn reconcile_durations(top: &mut StaffSequence, bottom: &mut StaffSequence) {
    let top_total = top.total_duration();
    let bottom_total = bottom.total_duration();

    let (shorter, gap) = if top_total < bottom_total {
        (top, bottom_total - top_total)
    } else {
        (bottom, top_total - bottom_total)
    };

    if gap == 0 {
        return;
    }
    if let Some(last) = shorter.chords.last_mut() {
        debug!(
            "{} staff: extending final chord from {} to {} units",
            shorter.staff,
            last.duration,
            last.duration + gap
        );
        last.duration += gap;
    }
}
