//! Which filler source is on air, and the gains that follow from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::topology::BusKind;

/// Keyword operators use to go back to the live program.
pub const LIVE_KEYWORD: &str = "live";

/// The on-air state of the blinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// The program feed is on air.
    Live,
    /// Filler source with this ordinal is on air instead of the program.
    Blinded(usize),
}

impl Selection {
    pub fn is_live(&self) -> bool {
        matches!(self, Selection::Live)
    }

    pub fn blinded_index(&self) -> Option<usize> {
        match self {
            Selection::Live => None,
            Selection::Blinded(i) => Some(*i),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Live => write!(f, "{}", LIVE_KEYWORD),
            Selection::Blinded(i) => write!(f, "blinded({})", i),
        }
    }
}

/// Operator input naming the wanted selection.
///
/// On the wire this is either the string `"live"`, a filler ordinal, or a
/// filler name. Names and ordinals are resolved against the configured
/// filler list by the switch controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChoiceRepr", into = "ChoiceRepr")]
pub enum SelectionChoice {
    Live,
    Index(usize),
    Name(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChoiceRepr {
    Index(usize),
    Name(String),
}

impl TryFrom<ChoiceRepr> for SelectionChoice {
    type Error = String;

    fn try_from(repr: ChoiceRepr) -> Result<Self, Self::Error> {
        match repr {
            ChoiceRepr::Index(i) => Ok(SelectionChoice::Index(i)),
            ChoiceRepr::Name(name) => name.parse(),
        }
    }
}

impl From<SelectionChoice> for ChoiceRepr {
    fn from(choice: SelectionChoice) -> Self {
        match choice {
            SelectionChoice::Live => ChoiceRepr::Name(LIVE_KEYWORD.to_string()),
            SelectionChoice::Index(i) => ChoiceRepr::Index(i),
            SelectionChoice::Name(name) => ChoiceRepr::Name(name),
        }
    }
}

impl FromStr for SelectionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty selection".to_string());
        }
        if s.eq_ignore_ascii_case(LIVE_KEYWORD) {
            return Ok(SelectionChoice::Live);
        }
        match s.parse::<usize>() {
            Ok(i) => Ok(SelectionChoice::Index(i)),
            Err(_) => Ok(SelectionChoice::Name(s.to_string())),
        }
    }
}

impl From<Selection> for SelectionChoice {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Live => SelectionChoice::Live,
            Selection::Blinded(i) => SelectionChoice::Index(i),
        }
    }
}

impl fmt::Display for SelectionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionChoice::Live => write!(f, "{}", LIVE_KEYWORD),
            SelectionChoice::Index(i) => write!(f, "{}", i),
            SelectionChoice::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Per-pad gains of a bus for a selection.
///
/// Video buses get `1 + filler_count` entries with exactly one set to 1.0
/// (pad 0 for live, pad `i + 1` for `Blinded(i)`). The audio bus always gets
/// two entries: the live pad and the shared filler pad, which does not care
/// which filler is selected.
pub fn gain_vector(selection: Selection, kind: BusKind, filler_count: usize) -> Vec<f64> {
    let live = if selection.is_live() { 1.0 } else { 0.0 };
    match kind {
        BusKind::Video => std::iter::once(live)
            .chain((0..filler_count).map(|i| {
                if selection == Selection::Blinded(i) {
                    1.0
                } else {
                    0.0
                }
            }))
            .collect(),
        BusKind::Audio => vec![live, 1.0 - live],
    }
}
