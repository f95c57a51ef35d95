//! # Renderer interface
//!
//! The host owns actual line visibility. The core asks it to fold and unfold
//! at the caret and reads visibility back through
//! [`Renderer::visible_line_ranges`]; it never assumes a request took effect.
//!
//! Calls are synchronous and return once the host has processed them. Hosts
//! that keep animating afterwards get a [`Renderer::settle`] pause after
//! each primitive; the pause lengths are configured on the adapter.

mod headless;

pub use headless::HeadlessRenderer;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Inclusive range of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

/// Folding operations a renderer offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Fold,
    Unfold,
    FoldRecursively,
    UnfoldRecursively,
    ToggleFold,
    FoldAll,
    UnfoldAll,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Primitive::Fold => "fold",
            Primitive::Unfold => "unfold",
            Primitive::FoldRecursively => "fold-recursively",
            Primitive::UnfoldRecursively => "unfold-recursively",
            Primitive::ToggleFold => "toggle-fold",
            Primitive::FoldAll => "fold-all",
            Primitive::UnfoldAll => "unfold-all",
        })
    }
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Renderer rejected {primitive}: {reason}")]
    Rejected { primitive: Primitive, reason: String },

    #[error("Renderer has no document attached")]
    Detached,
}

/// Host-side text view with folding.
///
/// Folding primitives act on the fold region at the caret. Hosts may no-op
/// when there is nothing to fold there.
pub trait Renderer {
    fn fold(&mut self) -> Result<(), RendererError>;
    fn unfold(&mut self) -> Result<(), RendererError>;
    fn fold_recursively(&mut self) -> Result<(), RendererError>;
    fn unfold_recursively(&mut self) -> Result<(), RendererError>;
    fn toggle_fold(&mut self) -> Result<(), RendererError>;
    fn fold_all(&mut self) -> Result<(), RendererError>;
    fn unfold_all(&mut self) -> Result<(), RendererError>;

    /// Currently visible lines as inclusive ranges, ascending.
    fn visible_line_ranges(&self) -> Vec<LineRange>;

    fn move_caret_to(&mut self, line: usize, column: usize);
    fn reveal_line(&mut self, line: usize);
    fn caret_line(&self) -> usize;

    fn line_text(&self, line: usize) -> Option<String>;
    fn line_count(&self) -> usize;

    /// Wait for the host to finish reacting to the last request.
    fn settle(&mut self, pause: Duration) {
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }

    /// Dispatch a primitive by name.
    fn invoke(&mut self, primitive: Primitive) -> Result<(), RendererError> {
        match primitive {
            Primitive::Fold => self.fold(),
            Primitive::Unfold => self.unfold(),
            Primitive::FoldRecursively => self.fold_recursively(),
            Primitive::UnfoldRecursively => self.unfold_recursively(),
            Primitive::ToggleFold => self.toggle_fold(),
            Primitive::FoldAll => self.fold_all(),
            Primitive::UnfoldAll => self.unfold_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_range_is_inclusive() {
        let range = LineRange::new(2, 4);

        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_rejection_message_names_primitive() {
        let error = RendererError::Rejected {
            primitive: Primitive::FoldRecursively,
            reason: "busy".to_string(),
        };

        assert_eq!(error.to_string(), "Renderer rejected fold-recursively: busy");
    }
}
