use crate::headline::{Checkbox, OrgHeadline};

/// A classified source line (or a line separator).
///
/// `text` is the raw line without its terminator; it is empty for
/// [`TokenKind::Newline`] and [`TokenKind::Eof`]. `line` is 0-based. A
/// newline token carries the line it terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub line: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// `* TODO [#A] Title :tags:`
    Headline(OrgHeadline<'a>),
    /// `#+NAME: value`
    Keyword { name: &'a str, value: &'a str },
    /// `#+BEGIN_SRC lang`
    CodeBegin { language: Option<&'a str> },
    /// `#+END_SRC`
    CodeEnd,
    /// `#+RESULTS:`
    Results,
    /// `:NAME:`
    DrawerBegin { name: &'a str },
    /// `:END:`
    DrawerEnd,
    /// `:key: value`
    Property { key: &'a str, value: &'a str },
    ListItem(ListItemToken<'a>),
    /// `| a | b |`
    TableRow { separator: bool },
    /// `# comment`
    Comment,
    Text,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemToken<'a> {
    /// Leading whitespace width in characters.
    pub indent: usize,
    /// `-`, `+`, `1.` or `1)`
    pub marker: &'a str,
    pub checkbox: Option<Checkbox>,
    pub text: &'a str,
}

impl Token<'_> {
    pub fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
