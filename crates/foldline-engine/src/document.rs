use std::fmt;
use std::path::Path;

use foldline_syntax::HeadlineSyntax;
use thiserror::Error;
use xi_rope::Rope;
use xi_rope::delta::Builder;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },
}

/// Identity of an open document, typically its path or URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An open text document held in an `xi_rope::Rope`.
///
/// Lines are 0-based and split on `\n` only, so a document ending in a
/// newline has a final empty line. `version` increases with every edit.
#[derive(Debug, Clone)]
pub struct TextDocument {
    id: DocumentId,
    syntax: HeadlineSyntax,
    buffer: Rope,
    version: u64,
}

impl TextDocument {
    pub fn new(id: impl Into<DocumentId>, syntax: HeadlineSyntax, text: &str) -> Self {
        Self {
            id: id.into(),
            syntax,
            buffer: Rope::from(text),
            version: 0,
        }
    }

    pub fn from_bytes(
        id: impl Into<DocumentId>,
        syntax: HeadlineSyntax,
        bytes: &[u8],
    ) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(id, syntax, text))
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn syntax(&self) -> HeadlineSyntax {
        self.syntax
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_of_offset(self.buffer.len()) + 1
    }

    /// Text of `line` without its terminator.
    pub fn line(&self, line: usize) -> Option<String> {
        let line_count = self.line_count();
        if line >= line_count {
            return None;
        }
        let start = self.buffer.offset_of_line(line);
        let end = self.line_end(line, line_count);
        let text = self.buffer.slice_to_cow(start..end);
        Some(text.strip_suffix('\r').unwrap_or(text.as_ref()).to_string())
    }

    /// Lines `start..=end`.
    pub fn lines(&self, start: usize, end: usize) -> Result<Vec<String>, DocumentError> {
        self.check_range(start, end)?;
        Ok((start..=end).filter_map(|line| self.line(line)).collect())
    }

    /// Replace lines `start..=end` (terminators between them included, the
    /// terminator of `end` kept) with `replacement`.
    pub fn replace_lines(
        &mut self,
        start: usize,
        end: usize,
        replacement: &str,
    ) -> Result<(), DocumentError> {
        let line_count = self.check_range(start, end)?;
        let from = self.buffer.offset_of_line(start);
        let to = self.line_end(end, line_count);
        self.apply_edit(from, to, replacement);
        Ok(())
    }

    /// Remove lines `start..=end` together with their terminators.
    pub fn delete_lines(&mut self, start: usize, end: usize) -> Result<(), DocumentError> {
        let line_count = self.check_range(start, end)?;
        let (from, to) = if end + 1 < line_count {
            (
                self.buffer.offset_of_line(start),
                self.buffer.offset_of_line(end + 1),
            )
        } else if start > 0 {
            // Last lines: eat the terminator before them instead.
            (self.line_end(start - 1, line_count), self.buffer.len())
        } else {
            (0, self.buffer.len())
        };
        self.apply_edit(from, to, "");
        Ok(())
    }

    /// Replace the whole buffer.
    pub fn set_text(&mut self, text: &str) {
        self.apply_edit(0, self.buffer.len(), text);
    }

    fn apply_edit(&mut self, from: usize, to: usize, text: &str) {
        let mut builder = Builder::new(self.buffer.len());
        builder.replace(from..to, Rope::from(text));
        let delta = builder.build();
        self.buffer = delta.apply(&self.buffer);
        self.version += 1;
    }

    /// Byte offset just before the terminator of `line`.
    fn line_end(&self, line: usize, line_count: usize) -> usize {
        if line + 1 < line_count {
            let next = self.buffer.offset_of_line(line + 1);
            let crlf = next >= 2 && self.buffer.slice_to_cow(next - 2..next) == "\r\n";
            if crlf { next - 2 } else { next - 1 }
        } else {
            self.buffer.len()
        }
    }

    fn check_range(&self, start: usize, end: usize) -> Result<usize, DocumentError> {
        let line_count = self.line_count();
        if start > end {
            return Err(DocumentError::LineOutOfRange {
                line: start,
                line_count,
            });
        }
        if end >= line_count {
            return Err(DocumentError::LineOutOfRange {
                line: end,
                line_count,
            });
        }
        Ok(line_count)
    }
}
