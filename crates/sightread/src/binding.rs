//! Binding rendered note elements back to chords.
//!
//! The renderer produces one element per chord, per staff, in the order
//! the encoder emitted them. `RenderBindings` holds that mapping so chord
//! data stays independent of any particular renderer.

use serde::Serialize;

use crate::phrase::{ChordId, Staff};
use crate::session::Phrase;
use crate::{Error, Result};

/// How a rendered chord should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    #[default]
    Default,
    /// Under the cursor.
    Selected,
    /// Under the cursor, and the held notes are wrong.
    Wrong,
}

impl Highlight {
    /// Fill color for SVG note paths.
    pub fn color(self) -> &'static str {
        match self {
            Highlight::Default => "#000000",
            Highlight::Selected => "#00AA00",
            Highlight::Wrong => "#CC0000",
        }
    }
}

/// Renderer handles for every chord of one phrase.
#[derive(Debug, Clone)]
pub struct RenderBindings<H> {
    top: Vec<H>,
    bottom: Vec<H>,
}

impl<H> RenderBindings<H> {
    /// Zip rendered elements with the phrase's chords, index for index.
    ///
    /// A count mismatch on either staff means the markup and the render
    /// disagree, and is reported as `BindingMismatch`.
    pub fn bind(phrase: &Phrase, top: Vec<H>, bottom: Vec<H>) -> Result<Self> {
        for (staff, elements) in [(Staff::Top, top.len()), (Staff::Bottom, bottom.len())] {
            let chords = phrase.staff(staff).len();
            if chords != elements {
                return Err(Error::BindingMismatch {
                    staff,
                    chords,
                    elements,
                });
            }
        }
        Ok(RenderBindings { top, bottom })
    }

    pub fn get(&self, id: ChordId) -> Option<&H> {
        match id.staff {
            Staff::Top => self.top.get(id.index),
            Staff::Bottom => self.bottom.get(id.index),
        }
    }

    /// Handles of the chords starting at `slot`.
    pub fn handles_at<'a>(&'a self, phrase: &'a Phrase, slot: usize) -> impl Iterator<Item = &'a H> + 'a {
        phrase.chords_at(slot).filter_map(move |id| self.get(id))
    }

    /// Every handle with its chord identity, top staff first.
    pub fn iter(&self) -> impl Iterator<Item = (ChordId, &H)> + '_ {
        let top = self.top.iter().enumerate().map(|(index, h)| {
            (
                ChordId {
                    staff: Staff::Top,
                    index,
                },
                h,
            )
        });
        let bottom = self.bottom.iter().enumerate().map(|(index, h)| {
            (
                ChordId {
                    staff: Staff::Bottom,
                    index,
                },
                h,
            )
        });
        top.chain(bottom)
    }
}
