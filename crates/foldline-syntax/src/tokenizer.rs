//! # Tokenizer
//!
//! Line-oriented classification of Org text. Each non-blank line becomes
//! exactly one token; consecutive lines are separated by a
//! [`TokenKind::Newline`] and the stream always ends with
//! [`TokenKind::Eof`]. Blank lines produce no line token, so two newline
//! tokens in a row mark a blank line.
//!
//! Classification looks at one line at a time with a fixed precedence:
//!
//! ```text
//! headline > keyword > BEGIN_SRC > END_SRC > RESULTS > :END: > :DRAWER:
//!          > property > list item > table row > comment > text
//! ```
//!
//! Nothing spanning several lines is merged here; that is the parser's job.

use std::iter::Enumerate;
use std::str::Split;
use std::sync::OnceLock;

use regex::Regex;

use crate::headline::{Checkbox, DEFAULT_TODO_KEYWORDS, parse_org_headline};
use crate::token::{ListItemToken, Token, TokenKind};

static KEYWORD: OnceLock<Regex> = OnceLock::new();
static CODE_BEGIN: OnceLock<Regex> = OnceLock::new();
static CODE_END: OnceLock<Regex> = OnceLock::new();
static RESULTS: OnceLock<Regex> = OnceLock::new();
static DRAWER_END: OnceLock<Regex> = OnceLock::new();
static DRAWER_BEGIN: OnceLock<Regex> = OnceLock::new();
static PROPERTY: OnceLock<Regex> = OnceLock::new();
static LIST_ITEM: OnceLock<Regex> = OnceLock::new();
static TABLE_ROW: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid tokenizer regex"))
}

/// Org tokenizer with a configurable closed set of TODO keywords.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    todo_keywords: Vec<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_TODO_KEYWORDS.iter().copied())
    }
}

impl Tokenizer {
    pub fn new<I, S>(todo_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            todo_keywords: todo_keywords.into_iter().map(Into::into).collect(),
        }
    }

    pub fn todo_keywords(&self) -> &[String] {
        &self.todo_keywords
    }

    /// Lazily tokenize `text`. Each call starts a fresh stream.
    pub fn tokenize<'t, 'a>(&'t self, text: &'a str) -> Tokens<'t, 'a> {
        Tokens {
            tokenizer: self,
            lines: text.split('\n').enumerate(),
            pending: None,
            last_line: 0,
            finished: false,
        }
    }

    /// Classify one line. Returns `None` for blank lines.
    pub fn classify<'a>(&self, line_number: usize, line: &'a str) -> Option<Token<'a>> {
        if line.trim().is_empty() {
            return None;
        }
        let kind = self.classify_kind(line);
        Some(Token {
            kind,
            line: line_number,
            text: line,
        })
    }

    fn classify_kind<'a>(&self, line: &'a str) -> TokenKind<'a> {
        if let Some(headline) = parse_org_headline(line, &self.todo_keywords) {
            return TokenKind::Headline(headline);
        }

        let trimmed = line.trim_end();

        if let Some(caps) = regex(&KEYWORD, r"^#\+([A-Z_]+):\s*(.*)$").captures(trimmed)
            && let (Some(name), Some(value)) = (caps.get(1), caps.get(2))
        {
            if name.as_str() == "RESULTS" {
                return TokenKind::Results;
            }
            return TokenKind::Keyword {
                name: name.as_str(),
                value: value.as_str(),
            };
        }

        if let Some(caps) = regex(&CODE_BEGIN, r"(?i)^#\+BEGIN_SRC(?:[ \t]+(\S+).*)?$").captures(trimmed)
        {
            return TokenKind::CodeBegin {
                language: caps.get(1).map(|m| m.as_str()),
            };
        }

        if regex(&CODE_END, r"(?i)^#\+END_SRC$").is_match(trimmed) {
            return TokenKind::CodeEnd;
        }

        if regex(&RESULTS, r"(?i)^#\+RESULTS:").is_match(trimmed) {
            return TokenKind::Results;
        }

        if regex(&DRAWER_END, r"(?i)^\s*:END:$").is_match(trimmed) {
            return TokenKind::DrawerEnd;
        }

        if let Some(caps) = regex(&DRAWER_BEGIN, r"^\s*:([A-Z][A-Z_]*):$").captures(trimmed)
            && let Some(name) = caps.get(1)
        {
            return TokenKind::DrawerBegin {
                name: name.as_str(),
            };
        }

        if let Some(caps) = regex(&PROPERTY, r"^\s*:([^:\s][^:]*):\s*(.*)$").captures(trimmed)
            && let (Some(key), Some(value)) = (caps.get(1), caps.get(2))
        {
            return TokenKind::Property {
                key: key.as_str(),
                value: value.as_str(),
            };
        }

        if let Some(caps) = regex(
            &LIST_ITEM,
            r"^(\s*)([-+]|\d+[.)])\s+(\[ \]|\[[Xx]\]|\[-\])?\s*(.*)$",
        )
        .captures(trimmed)
            && let (Some(indent), Some(marker), Some(text)) = (caps.get(1), caps.get(2), caps.get(4))
        {
            return TokenKind::ListItem(ListItemToken {
                indent: indent.as_str().chars().count(),
                marker: marker.as_str(),
                checkbox: caps.get(3).and_then(|c| Checkbox::from_cookie(c.as_str())),
                text: text.as_str(),
            });
        }

        if regex(&TABLE_ROW, r"^\s*\|.*\|$").is_match(trimmed) {
            return TokenKind::TableRow {
                separator: is_separator_row(trimmed),
            };
        }

        if trimmed.starts_with('#') && !trimmed.starts_with("#+") && trimmed.len() > 1 {
            return TokenKind::Comment;
        }

        TokenKind::Text
    }
}

fn is_separator_row(row: &str) -> bool {
    let row = row.trim();
    row.contains('-') && row.chars().all(|c| matches!(c, '|' | '-' | '+' | ':' | ' '))
}

/// Tokenize with the default TODO keyword set.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    // The stream borrows the tokenizer, so collect before it goes away.
    Tokenizer::default().tokenize(text).collect()
}

/// Token stream produced by [`Tokenizer::tokenize`].
#[derive(Debug, Clone)]
pub struct Tokens<'t, 'a> {
    tokenizer: &'t Tokenizer,
    lines: Enumerate<Split<'a, char>>,
    pending: Option<Token<'a>>,
    last_line: usize,
    finished: bool,
}

impl<'a> Iterator for Tokens<'_, 'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }

        loop {
            if self.finished {
                return None;
            }

            let Some((line_number, raw)) = self.lines.next() else {
                self.finished = true;
                return Some(Token {
                    kind: TokenKind::Eof,
                    line: self.last_line,
                    text: "",
                });
            };

            self.last_line = line_number;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let token = self.tokenizer.classify(line_number, line);

            if line_number > 0 {
                self.pending = token;
                return Some(Token {
                    kind: TokenKind::Newline,
                    line: line_number - 1,
                    text: "",
                });
            }

            if token.is_some() {
                return token;
            }
        }
    }
}
