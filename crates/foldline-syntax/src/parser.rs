//! # Parser
//!
//! Recursive descent over the token stream with one token of lookahead.
//! Headline nesting follows the star count: a headline owns every following
//! deeper headline until a same-or-shallower one appears.
//!
//! The parser never fails. Tokens that make no sense where they appear (a
//! stray `#+END_SRC`, a property outside a drawer, a keyword inside a
//! section) are skipped, and unterminated blocks end at the next headline or
//! at end of input.

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{
    CodeBlock, Document, Drawer, Headline, List, ListItem, Node, Planning, Property, Table,
    TableRow, Text,
};
use crate::headline::OrgHeadline;
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

static SCHEDULED: OnceLock<Regex> = OnceLock::new();
static DEADLINE: OnceLock<Regex> = OnceLock::new();
static CLOSED: OnceLock<Regex> = OnceLock::new();

/// Parse `text` with the default TODO keyword set.
pub fn parse(text: &str) -> Document {
    parse_with(&Tokenizer::default(), text)
}

pub fn parse_with(tokenizer: &Tokenizer, text: &str) -> Document {
    Parser::new(tokenizer.tokenize(text)).parse_document()
}

/// Pull `SCHEDULED:`/`DEADLINE:`/`CLOSED:` timestamps out of a line.
pub fn parse_planning_line(line: &str) -> Planning {
    let capture = |cell: &'static OnceLock<Regex>, pattern: &str| {
        cell.get_or_init(|| Regex::new(pattern).expect("Invalid planning regex"))
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    Planning {
        scheduled: capture(&SCHEDULED, r"SCHEDULED:\s*(<[^>]+>)"),
        deadline: capture(&DEADLINE, r"DEADLINE:\s*(<[^>]+>)"),
        closed: capture(&CLOSED, r"CLOSED:\s*(\[[^\]]+\])"),
    }
}

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: impl IntoIterator<Item = Token<'a>>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<&Token<'a>> {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn at_end(&self) -> bool {
        self.current().is_none_or(Token::is_eof)
    }

    fn bump(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    fn nth_is(&self, n: usize, pred: impl Fn(&TokenKind<'a>) -> bool) -> bool {
        self.nth(n).is_some_and(|t| pred(&t.kind))
    }

    /// Last line of a section that stops at the current token.
    fn section_end(&self, start: usize) -> usize {
        match self.current() {
            Some(token) if token.is_eof() => token.line.max(start),
            Some(token) => token.line.saturating_sub(1).max(start),
            None => self.tokens.last().map_or(start, |t| t.line.max(start)),
        }
    }

    pub fn parse_document(mut self) -> Document {
        let mut children = Vec::new();

        while let Some(token) = self.current() {
            if token.is_eof() {
                break;
            }
            match &token.kind {
                TokenKind::Headline(headline) => {
                    let (headline, line) = (headline.clone(), token.line);
                    self.bump();
                    children.push(Node::Headline(self.parse_headline(headline, line)));
                }
                TokenKind::CodeBegin { .. } => children.push(Node::CodeBlock(self.parse_code_block())),
                TokenKind::TableRow { .. } => children.push(Node::Table(self.parse_table())),
                TokenKind::ListItem(_) => children.push(Node::List(self.parse_list())),
                TokenKind::DrawerBegin { .. } => children.push(Node::Drawer(self.parse_drawer())),
                TokenKind::Text => {
                    children.push(Node::Text(Text {
                        value: token.text.to_string(),
                        line: token.line,
                    }));
                    self.bump();
                }
                _ => self.bump(),
            }
        }

        Document { children }
    }

    fn parse_headline(&mut self, head: OrgHeadline<'a>, line: usize) -> Headline {
        let mut headline = Headline {
            level: head.level,
            title: head.title.to_string(),
            todo: head.todo.map(str::to_string),
            priority: head.priority.map(str::to_string),
            tags: head.tags.iter().map(|t| t.to_string()).collect(),
            planning: Planning::default(),
            line,
            end_line: line,
            children: Vec::new(),
        };

        while let Some(token) = self.current() {
            if token.is_eof() {
                break;
            }
            match &token.kind {
                TokenKind::Headline(child) if child.level > headline.level => {
                    let (child, child_line) = (child.clone(), token.line);
                    self.bump();
                    let child = self.parse_headline(child, child_line);
                    headline.children.push(Node::Headline(child));
                }
                TokenKind::Headline(_) => break,
                TokenKind::DrawerBegin { .. } => {
                    let drawer = self.parse_drawer();
                    headline.planning.merge(&drawer.planning);
                    headline.children.push(Node::Drawer(drawer));
                }
                TokenKind::CodeBegin { .. } => {
                    headline.children.push(Node::CodeBlock(self.parse_code_block()));
                }
                TokenKind::TableRow { .. } => {
                    headline.children.push(Node::Table(self.parse_table()));
                }
                TokenKind::ListItem(_) => {
                    headline.children.push(Node::List(self.parse_list()));
                }
                TokenKind::Text => {
                    headline.planning.merge(&parse_planning_line(token.text));
                    headline.children.push(Node::Text(Text {
                        value: token.text.to_string(),
                        line: token.line,
                    }));
                    self.bump();
                }
                _ => self.bump(),
            }
        }

        headline.end_line = self.section_end(line);
        headline
    }

    fn parse_code_block(&mut self) -> CodeBlock {
        let (language, line) = match self.current() {
            Some(Token {
                kind: TokenKind::CodeBegin { language },
                line,
                ..
            }) => (language.map(str::to_string), *line),
            _ => (None, 0),
        };
        self.bump();

        // A block is terminated when `#+END_SRC` comes before any other
        // `#+BEGIN_SRC`; only unterminated blocks give way to a headline.
        let terminated = self.tokens[self.pos..]
            .iter()
            .map(|token| &token.kind)
            .find(|kind| matches!(kind, TokenKind::CodeEnd | TokenKind::CodeBegin { .. }))
            .is_some_and(|kind| matches!(kind, TokenKind::CodeEnd));

        let mut content = String::new();
        let mut end_line = line;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::CodeEnd => {
                    end_line = token.line;
                    self.bump();
                    break;
                }
                TokenKind::Eof => break,
                TokenKind::Headline(_) if !terminated => break,
                TokenKind::Newline => {
                    content.push('\n');
                    self.bump();
                }
                _ => {
                    content.push_str(token.text);
                    end_line = token.line;
                    self.bump();
                }
            }
        }

        let mut block = CodeBlock {
            language,
            content: content.trim_matches('\n').to_string(),
            results: None,
            line,
            end_line,
        };

        if self.nth_is(0, |k| matches!(k, TokenKind::Newline))
            && self.nth_is(1, |k| matches!(k, TokenKind::Results))
        {
            self.bump();
            if let Some(token) = self.current() {
                block.end_line = token.line;
            }
            self.bump();
            block.results = Some(self.parse_results(&mut block.end_line));
        }

        block
    }

    /// Consecutive text lines following a `#+RESULTS:` marker.
    fn parse_results(&mut self, end_line: &mut usize) -> String {
        let mut lines = Vec::new();

        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Newline if self.nth_is(1, |k| matches!(k, TokenKind::Text)) => {
                    self.bump();
                }
                TokenKind::Text => {
                    lines.push(token.text.trim());
                    *end_line = token.line;
                    self.bump();
                }
                _ => break,
            }
        }

        lines.join("\n")
    }

    fn parse_drawer(&mut self) -> Drawer {
        let (name, line) = match self.current() {
            Some(Token {
                kind: TokenKind::DrawerBegin { name },
                line,
                ..
            }) => (name.to_string(), *line),
            _ => (String::new(), 0),
        };
        self.bump();

        let mut drawer = Drawer {
            name,
            properties: Vec::new(),
            planning: Planning::default(),
            line,
            end_line: line,
        };

        while let Some(token) = self.current() {
            match &token.kind {
                TokenKind::DrawerEnd => {
                    drawer.end_line = token.line;
                    self.bump();
                    break;
                }
                TokenKind::Eof | TokenKind::Headline(_) => break,
                TokenKind::Property { key, value } => {
                    drawer.properties.push(Property {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                    drawer.end_line = token.line;
                    self.bump();
                }
                TokenKind::Newline => self.bump(),
                _ => {
                    drawer.planning.merge(&parse_planning_line(token.text));
                    drawer.end_line = token.line;
                    self.bump();
                }
            }
        }

        drawer
    }

    fn parse_list(&mut self) -> List {
        let mut items = Vec::new();
        let mut base_indent = None;
        let line = self.current().map_or(0, |t| t.line);

        while let Some(token) = self.current() {
            let TokenKind::ListItem(item) = &token.kind else {
                break;
            };
            let base = *base_indent.get_or_insert(item.indent);
            if item.indent < base {
                break;
            }

            items.push(ListItem {
                text: item.text.to_string(),
                indent: item.indent,
                marker: item.marker.to_string(),
                checkbox: item.checkbox,
                line: token.line,
            });
            self.bump();

            if self.nth_is(0, |k| matches!(k, TokenKind::Newline))
                && self.nth_is(1, |k| matches!(k, TokenKind::ListItem(_)))
            {
                self.bump();
            } else {
                break;
            }
        }

        List { items, line }
    }

    fn parse_table(&mut self) -> Table {
        let mut rows = Vec::new();
        let line = self.current().map_or(0, |t| t.line);

        while let Some(token) = self.current() {
            let TokenKind::TableRow { separator } = token.kind else {
                break;
            };

            rows.push(if separator {
                TableRow::Separator { line: token.line }
            } else {
                TableRow::Cells {
                    cells: split_cells(token.text),
                    line: token.line,
                }
            });
            self.bump();

            if self.nth_is(0, |k| matches!(k, TokenKind::Newline))
                && self.nth_is(1, |k| matches!(k, TokenKind::TableRow { .. }))
            {
                self.bump();
            } else {
                break;
            }
        }

        Table { rows, line }
    }
}

fn split_cells(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = row.strip_suffix('|').unwrap_or(row);
    row.split('|').map(|cell| cell.trim().to_string()).collect()
}
