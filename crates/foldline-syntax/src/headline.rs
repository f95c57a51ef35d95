//! # Headlines
//!
//! Two things live here:
//!
//! - [`HeadlineSyntax`]: the two headline families a document can use
//!   (`#` for Markdown/Quarto, `*` for Org). The outline tree and the
//!   headline editing commands only care about the marker run and the title,
//!   so this is all they need.
//! - [`parse_org_headline`]: the full decomposition of an Org headline into
//!   level, TODO keyword, priority cookie, title and trailing tag block.
//!
//! The Org body is split into whitespace-delimited pieces by a small [Logos]
//! lexer. Metadata is then peeled off the ends of the piece list, and only
//! while at least one piece is left over for the title. That keeps
//! `* TODO` a headline titled `TODO` rather than an untitled task.
//!
//! [Logos]: https://docs.rs/logos

use std::ops::Range;
use std::sync::OnceLock;

use logos::Logos;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// TODO keywords recognized when no explicit set is configured.
pub const DEFAULT_TODO_KEYWORDS: &[&str] = &[
    "TODO",
    "DONE",
    "NEXT",
    "WAITING",
    "HOLD",
    "CANCELLED",
    "CANCELED",
];

static MARKDOWN_HEADLINE: OnceLock<Regex> = OnceLock::new();
static ORG_HEADLINE: OnceLock<Regex> = OnceLock::new();

fn markdown_headline_regex() -> &'static Regex {
    MARKDOWN_HEADLINE.get_or_init(|| {
        Regex::new(r"^(#{1,6})\s+(\S.*)$").expect("Invalid markdown headline regex")
    })
}

fn org_headline_regex() -> &'static Regex {
    ORG_HEADLINE
        .get_or_init(|| Regex::new(r"^(\*+)\s+(\S.*)$").expect("Invalid org headline regex"))
}

/// Headline family used by a document. One family per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadlineSyntax {
    /// `#`-style headlines, levels 1 to 6 (Markdown, Quarto).
    Markdown,
    /// `*`-style headlines, unbounded depth (Org-mode).
    Org,
}

/// A line recognized as a headline: marker count and trimmed title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlineMatch<'a> {
    pub level: usize,
    pub title: &'a str,
}

impl HeadlineSyntax {
    pub fn marker(self) -> char {
        match self {
            HeadlineSyntax::Markdown => '#',
            HeadlineSyntax::Org => '*',
        }
    }

    /// Deepest level the family can express, if it has one.
    pub fn max_level(self) -> Option<usize> {
        match self {
            HeadlineSyntax::Markdown => Some(6),
            HeadlineSyntax::Org => None,
        }
    }

    /// Match a single line (without its line terminator).
    pub fn match_line(self, line: &str) -> Option<HeadlineMatch<'_>> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let regex = match self {
            HeadlineSyntax::Markdown => markdown_headline_regex(),
            HeadlineSyntax::Org => org_headline_regex(),
        };
        let captures = regex.captures(line)?;
        let level = captures.get(1)?.as_str().len();
        let title = captures.get(2)?.as_str().trim_end();
        Some(HeadlineMatch { level, title })
    }

    pub fn is_headline(self, line: &str) -> bool {
        self.match_line(line).is_some()
    }

    pub fn level_of(self, line: &str) -> Option<usize> {
        self.match_line(line).map(|m| m.level)
    }

    /// Render a headline line in this family.
    pub fn format_headline(self, level: usize, title: &str) -> String {
        let marker = self.marker().to_string().repeat(level.max(1));
        format!("{marker} {title}")
    }

    /// Replace the marker run of an existing headline line, keeping the rest
    /// of the line byte-for-byte.
    pub fn with_level(self, line: &str, level: usize) -> Option<String> {
        let current = self.level_of(line)?;
        let rest = &line[current..];
        let marker = self.marker().to_string().repeat(level.max(1));
        Some(format!("{marker}{rest}"))
    }
}

/// Checkbox state on a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Checkbox {
    Unchecked,
    Checked,
    Partial,
}

impl Checkbox {
    pub fn from_cookie(cookie: &str) -> Option<Self> {
        match cookie {
            "[ ]" => Some(Checkbox::Unchecked),
            "[X]" | "[x]" => Some(Checkbox::Checked),
            "[-]" => Some(Checkbox::Partial),
            _ => None,
        }
    }
}

/// A decomposed Org headline line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgHeadline<'a> {
    pub level: usize,
    pub todo: Option<&'a str>,
    /// Priority cookie including brackets, e.g. `[#A]`.
    pub priority: Option<&'a str>,
    pub title: &'a str,
    pub tags: Vec<&'a str>,
}

impl OrgHeadline<'_> {
    /// Priority letter of the cookie, `A` for `[#A]`.
    pub fn priority_letter(&self) -> Option<char> {
        self.priority.and_then(|cookie| cookie.chars().nth(2))
    }
}

/// Pieces of an Org headline body.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    #[regex(r"[ \t]+")]
    Whitespace,

    /// `[#A]` priority cookie
    #[regex(r"\[#[A-Z]\]", priority = 5)]
    Priority,

    /// `:tag1:tag2:` block
    #[regex(r":([^\s:]+:)+", priority = 5)]
    Tags,

    /// Anything else up to the next blank
    #[regex(r"[^ \t]+", priority = 1)]
    Word,
}

fn lex_pieces(body: &str) -> Vec<(Piece, Range<usize>)> {
    let mut lexer = Piece::lexer(body);
    let mut pieces = Vec::new();

    while let Some(result) = lexer.next() {
        let piece = result.unwrap_or(Piece::Word);
        if piece != Piece::Whitespace {
            pieces.push((piece, lexer.span()));
        }
    }

    pieces
}

/// Decompose an Org headline line, or `None` if the line is not a headline.
///
/// `todo_keywords` is the closed set of words accepted as a TODO keyword.
pub fn parse_org_headline<'a, S: AsRef<str>>(
    line: &'a str,
    todo_keywords: &[S],
) -> Option<OrgHeadline<'a>> {
    let HeadlineMatch { level, title: body } = HeadlineSyntax::Org.match_line(line)?;
    let pieces = lex_pieces(body);
    if pieces.is_empty() {
        return None;
    }

    let mut first = 0;
    let mut last = pieces.len();
    let slice = |range: &Range<usize>| &body[range.clone()];

    let mut todo = None;
    if let Some((Piece::Word, range)) = pieces.get(first)
        && last - first > 1
        && todo_keywords.iter().any(|k| k.as_ref() == slice(range))
    {
        todo = Some(slice(range));
        first += 1;
    }

    let mut priority = None;
    if let Some((Piece::Priority, range)) = pieces.get(first)
        && last - first > 1
    {
        priority = Some(slice(range));
        first += 1;
    }

    let mut tags = Vec::new();
    if last - first > 1
        && let Some((Piece::Tags, range)) = pieces.get(last - 1)
    {
        tags = slice(range)
            .split(':')
            .filter(|tag| !tag.is_empty())
            .collect();
        last -= 1;
    }

    let title = &body[pieces[first].1.start..pieces[last - 1].1.end];

    Some(OrgHeadline {
        level,
        todo,
        priority,
        title,
        tags,
    })
}
