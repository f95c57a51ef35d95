//! Structural edits on a [`TextDocument`](crate::TextDocument): moving,
//! re-levelling, deleting and rewriting headline sections, and cycling Org
//! TODO keywords and priorities.
//!
//! Edits that find nothing to act on return [`EditOutcome::NoTarget`] with a
//! reason the host can show to the user; they are not errors.

mod headlines;
mod todo;

pub use headlines::*;
pub use todo::*;

use std::fmt;

use thiserror::Error;

use crate::document::DocumentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit happened; the caret belongs on `cursor_line`.
    Applied { cursor_line: usize },
    NoTarget(NoTarget),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTarget {
    NotOnHeadline,
    NoPreviousSibling,
    NoNextSibling,
    AlreadyTopLevel,
    AlreadyDeepest,
    OrgOnly,
}

impl fmt::Display for NoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoTarget::NotOnHeadline => "Not on a headline",
            NoTarget::NoPreviousSibling => "Already at top or no previous headline at same level",
            NoTarget::NoNextSibling => "Already at bottom or no next headline at same level",
            NoTarget::AlreadyTopLevel => "Already at top level",
            NoTarget::AlreadyDeepest => "Already at deepest level",
            NoTarget::OrgOnly => "Only available in Org documents",
        })
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Document(#[from] DocumentError),
}
