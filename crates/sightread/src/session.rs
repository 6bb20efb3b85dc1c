//! A practice session: the current phrase, the cursor, and held keys.
//!
//! Regeneration builds a complete new phrase before touching any state,
//! so a failed attempt leaves the previous markup, table and cursor in
//! place and they are always replaced together.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::binding::Highlight;
use crate::cursor::Cursor;
use crate::generator::{ChordGenerator, GenerationConfig};
use crate::matcher::{evaluate, MatchResult};
use crate::midi::{parse_note_event, HeldNotes, NoteEvent};
use crate::notation::{encode, ScoreHeader};
use crate::phrase::{Chord, ChordId, Staff, StaffSequence};
use crate::timing::TimingTable;
use crate::Result;

/// One generated phrase with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phrase {
    pub top: StaffSequence,
    pub bottom: StaffSequence,
    /// ABC markup for the notation renderer.
    pub abc: String,
    pub table: TimingTable,
}

impl Phrase {
    /// Generate, encode and index a new phrase.
    pub fn build(config: &GenerationConfig, generator: &mut ChordGenerator) -> Result<Phrase> {
        let (mut top, mut bottom) = generator.generate(config)?;

        let header = ScoreHeader {
            title: config.title.clone(),
            meter: config.meter,
            key: config.key.clone(),
        };
        let abc = encode(&top, &bottom, &header);
        let table = TimingTable::build(&mut top, &mut bottom)?;

        Ok(Phrase {
            top,
            bottom,
            abc,
            table,
        })
    }

    pub fn staff(&self, staff: Staff) -> &StaffSequence {
        match staff {
            Staff::Top => &self.top,
            Staff::Bottom => &self.bottom,
        }
    }

    pub fn chord(&self, id: ChordId) -> Option<&Chord> {
        self.staff(id.staff).chords.get(id.index)
    }

    /// Chords starting at `slot`, top staff first.
    pub fn chords_at(&self, slot: usize) -> impl Iterator<Item = ChordId> + '_ {
        self.top
            .chords_at(slot)
            .chain(self.bottom.chords_at(slot))
            .map(|(id, _)| id)
    }

    /// Every chord identity in emission order, top staff first.
    pub fn chord_ids(&self) -> impl Iterator<Item = ChordId> + '_ {
        let top = (0..self.top.len()).map(|index| ChordId {
            staff: Staff::Top,
            index,
        });
        let bottom = (0..self.bottom.len()).map(|index| ChordId {
            staff: Staff::Bottom,
            index,
        });
        top.chain(bottom)
    }
}

/// What a key press or release did to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Nothing held.
    Waiting,
    /// Held keys do not match the chord under the cursor.
    Wrong { held: Vec<u8>, expected: Vec<u8> },
    /// Correct chord; the cursor moved on.
    Advanced { cursor: usize },
    /// Correct final chord; a new phrase replaced the old one.
    Regenerated,
}

#[derive(Debug)]
pub struct Session {
    config: GenerationConfig,
    generator: ChordGenerator,
    phrase: Phrase,
    cursor: Cursor,
    held: HeldNotes,
    last_result: Option<MatchResult>,
}

impl Session {
    /// Start a session with an entropy-seeded generator.
    pub fn new(config: GenerationConfig) -> Result<Self> {
        Self::with_generator(config, ChordGenerator::new())
    }

    /// Start a session with the given generator and build the first phrase.
    pub fn with_generator(config: GenerationConfig, mut generator: ChordGenerator) -> Result<Self> {
        let phrase = Phrase::build(&config, &mut generator)?;
        let cursor = Cursor::new(&phrase.table);
        info!(
            "session started: {} top chords, {} bottom chords, {} slots",
            phrase.top.len(),
            phrase.bottom.len(),
            phrase.table.len()
        );

        Ok(Session {
            config,
            generator,
            phrase,
            cursor,
            held: HeldNotes::new(),
            last_result: None,
        })
    }

    /// Replace the phrase with a freshly generated one.
    pub fn regenerate(&mut self) -> Result<()> {
        let phrase = Phrase::build(&self.config, &mut self.generator).map_err(|e| {
            warn!("regeneration failed, keeping current phrase: {}", e);
            e
        })?;
        self.install(phrase);
        Ok(())
    }

    /// Switch to a new configuration and regenerate.
    ///
    /// On failure both the configuration and the phrase stay as they were.
    pub fn set_config(&mut self, config: GenerationConfig) -> Result<()> {
        config.validate()?;
        let phrase = Phrase::build(&config, &mut self.generator).map_err(|e| {
            warn!("new configuration rejected, keeping current phrase: {}", e);
            e
        })?;
        self.config = config;
        self.install(phrase);
        Ok(())
    }

    fn install(&mut self, phrase: Phrase) {
        info!(
            "new phrase: {} top chords, {} bottom chords, {} slots",
            phrase.top.len(),
            phrase.bottom.len(),
            phrase.table.len()
        );
        self.cursor = Cursor::new(&phrase.table);
        self.phrase = phrase;
        self.held.clear();
        self.last_result = None;
    }

    /// Feed one raw MIDI message. Returns `None` for messages that are
    /// not key presses or releases.
    pub fn handle_midi(&mut self, data: &[u8]) -> Result<Option<SessionEvent>> {
        match parse_note_event(data) {
            Some(event) => self.handle_note(event).map(Some),
            None => Ok(None),
        }
    }

    /// Apply a key press or release and judge the held keys.
    pub fn handle_note(&mut self, event: NoteEvent) -> Result<SessionEvent> {
        self.held.apply(event);
        let result = evaluate(self.held.iter(), &self.phrase.table, self.cursor.position());
        self.last_result = Some(result);

        match result {
            MatchResult::Incomplete => Ok(SessionEvent::Waiting),
            MatchResult::NoMatch => {
                let held: Vec<u8> = self.held.iter().collect();
                let expected: Vec<u8> = self
                    .expected_midi()
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                debug!("held {:?}, expected {:?}", held, expected);
                Ok(SessionEvent::Wrong { held, expected })
            }
            MatchResult::Correct => {
                // Keys still down from this chord must not count against the next one
                self.held.clear();
                if self.cursor.at_final(&self.phrase.table) {
                    self.regenerate()?;
                    Ok(SessionEvent::Regenerated)
                } else {
                    self.cursor.advance(&self.phrase.table);
                    self.last_result = None;
                    Ok(SessionEvent::Advanced {
                        cursor: self.cursor.position(),
                    })
                }
            }
        }
    }

    /// Move the cursor forward by hand. Returns false when it wrapped.
    pub fn advance(&mut self) -> bool {
        self.last_result = None;
        self.cursor.advance(&self.phrase.table)
    }

    /// Move the cursor back by hand.
    pub fn retreat(&mut self) {
        self.last_result = None;
        self.cursor.retreat(&self.phrase.table);
    }

    pub fn at_final(&self) -> bool {
        self.cursor.at_final(&self.phrase.table)
    }

    pub fn cursor(&self) -> usize {
        self.cursor.position()
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn held(&self) -> &HeldNotes {
        &self.held
    }

    pub fn last_result(&self) -> Option<MatchResult> {
        self.last_result
    }

    /// Pitches the player must hold for the chord under the cursor.
    pub fn expected_midi(&self) -> Option<&BTreeSet<u8>> {
        self.phrase.table.expected_at(self.cursor.position())
    }

    /// How the renderer should draw chord `id` right now.
    pub fn highlight(&self, id: ChordId) -> Highlight {
        let under_cursor = self
            .phrase
            .chord(id)
            .is_some_and(|chord| chord.timing_index == Some(self.cursor.position()));

        match (under_cursor, self.last_result) {
            (false, _) => Highlight::Default,
            (true, Some(MatchResult::NoMatch)) => Highlight::Wrong,
            (true, _) => Highlight::Selected,
        }
    }

    /// Highlight for every chord, in emission order.
    pub fn highlights(&self) -> Vec<(ChordId, Highlight)> {
        self.phrase
            .chord_ids()
            .map(|id| (id, self.highlight(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::StaffConfig;
    use crate::phrase::NoteValue;
    use crate::Error;

    fn session() -> Session {
        Session::with_generator(GenerationConfig::default(), ChordGenerator::with_seed(21)).unwrap()
    }

    fn play(session: &mut Session, pitches: &[u8]) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for &pitch in pitches {
            events.push(session.handle_note(NoteEvent::On { pitch }).unwrap());
        }
        for &pitch in pitches {
            events.push(session.handle_note(NoteEvent::Off { pitch }).unwrap());
        }
        events
    }

    #[test]
    fn test_starts_at_first_slot() {
        let session = session();
        assert_eq!(session.cursor(), 0);
        assert!(session.expected_midi().is_some());
        assert!(session.held().is_empty());
    }

    #[test]
    fn test_correct_chord_advances() {
        let mut session = session();
        let expected: Vec<u8> = session.expected_midi().unwrap().iter().copied().collect();

        let events = play(&mut session, &expected);
        assert_eq!(
            events[expected.len() - 1],
            SessionEvent::Advanced { cursor: 12 }
        );
        // Releases after a correct chord are not judged against the next one
        assert!(events[expected.len()..]
            .iter()
            .all(|e| *e == SessionEvent::Waiting));
    }

    #[test]
    fn test_wrong_note_reports_expected() {
        let mut session = session();
        let expected: Vec<u8> = session.expected_midi().unwrap().iter().copied().collect();
        let wrong = (0u8..128).find(|p| !expected.contains(p)).unwrap();

        let event = session.handle_note(NoteEvent::On { pitch: wrong }).unwrap();
        assert_eq!(
            event,
            SessionEvent::Wrong {
                held: vec![wrong],
                expected: expected.clone()
            }
        );
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.last_result(), Some(MatchResult::NoMatch));
    }

    #[test]
    fn test_highlights_follow_cursor_and_result() {
        let mut session = session();
        let first_top = ChordId {
            staff: Staff::Top,
            index: 0,
        };
        let second_top = ChordId {
            staff: Staff::Top,
            index: 1,
        };
        assert_eq!(session.highlight(first_top), Highlight::Selected);
        assert_eq!(session.highlight(second_top), Highlight::Default);

        session.handle_note(NoteEvent::On { pitch: 1 }).unwrap();
        assert_eq!(session.highlight(first_top), Highlight::Wrong);

        session.handle_note(NoteEvent::Off { pitch: 1 }).unwrap();
        session.advance();
        assert_eq!(session.highlight(first_top), Highlight::Default);
        assert_eq!(session.highlight(second_top), Highlight::Selected);
        assert_eq!(session.highlights().len(), 4);
    }

    #[test]
    fn test_final_chord_regenerates() {
        let mut session = session();
        let mut last = SessionEvent::Waiting;
        for _ in 0..session.phrase().table.expected_count() {
            let expected: Vec<u8> = session.expected_midi().unwrap().iter().copied().collect();
            let events = play(&mut session, &expected);
            last = events[expected.len() - 1].clone();
        }

        assert_eq!(last, SessionEvent::Regenerated);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.phrase().table.len(), 36);
        assert!(session.held().is_empty());
    }

    #[test]
    fn test_manual_navigation() {
        let mut session = session();
        assert!(session.advance());
        assert!(session.advance());
        assert!(session.at_final());
        assert!(!session.advance());
        assert_eq!(session.cursor(), 0);

        session.retreat();
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_rejected_config_keeps_phrase() {
        let mut session = session();
        let before = session.phrase().clone();

        let bad = GenerationConfig {
            top: StaffConfig {
                min_index: 5,
                max_index: 1,
                note_count: 2,
                note_value: NoteValue::Quarter,
            },
            ..GenerationConfig::default()
        };
        let err = session.set_config(bad).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
        assert_eq!(session.phrase(), &before);
        assert_eq!(session.config(), &GenerationConfig::default());
    }

    #[test]
    fn test_set_config_replaces_phrase() {
        let mut session = session();
        let config = GenerationConfig {
            top: StaffConfig {
                min_index: 0,
                max_index: 11,
                note_count: 4,
                note_value: NoteValue::Quarter,
            },
            ..GenerationConfig::default()
        };
        session.set_config(config).unwrap();
        assert_eq!(session.phrase().table.len(), 48);
        assert_eq!(session.phrase().top.len(), 4);
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_midi_noise_is_ignored() {
        let mut session = session();
        assert_eq!(session.handle_midi(&[0xF8]).unwrap(), None);
        assert_eq!(session.handle_midi(&[0xB0, 1, 2]).unwrap(), None);
        assert!(session.last_result().is_none());
    }
}
