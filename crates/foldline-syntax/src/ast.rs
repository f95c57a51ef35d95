//! Typed syntax tree produced by the parser.
//!
//! Nodes own their strings so the tree outlives the source text. Every node
//! records its 0-based start line; sections and blocks also record where
//! they end, which is what folding ranges and symbols are built from.

use serde::Serialize;

use crate::headline::Checkbox;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Headline(Headline),
    CodeBlock(CodeBlock),
    Drawer(Drawer),
    List(List),
    Table(Table),
    Text(Text),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
    pub level: usize,
    pub title: String,
    pub todo: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub planning: Planning,
    pub line: usize,
    /// Last line of the section: the line before the next same-or-shallower
    /// headline, or the last line of the document.
    pub end_line: usize,
    pub children: Vec<Node>,
}

/// `SCHEDULED:`, `DEADLINE:` and `CLOSED:` timestamps, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Planning {
    pub scheduled: Option<String>,
    pub deadline: Option<String>,
    pub closed: Option<String>,
}

impl Planning {
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_none() && self.deadline.is_none() && self.closed.is_none()
    }

    /// Overwrite with whatever `other` has set.
    pub fn merge(&mut self, other: &Planning) {
        if other.scheduled.is_some() {
            self.scheduled.clone_from(&other.scheduled);
        }
        if other.deadline.is_some() {
            self.deadline.clone_from(&other.deadline);
        }
        if other.closed.is_some() {
            self.closed.clone_from(&other.closed);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub content: String,
    pub results: Option<String>,
    pub line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drawer {
    pub name: String,
    pub properties: Vec<Property>,
    #[serde(skip_serializing_if = "Planning::is_empty")]
    pub planning: Planning,
    pub line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct List {
    pub items: Vec<ListItem>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub text: String,
    pub indent: usize,
    pub marker: String,
    pub checkbox: Option<Checkbox>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum TableRow {
    Separator { line: usize },
    Cells { cells: Vec<String>, line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    pub value: String,
    pub line: usize,
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Node::Headline(h) => h.line,
            Node::CodeBlock(c) => c.line,
            Node::Drawer(d) => d.line,
            Node::List(l) => l.line,
            Node::Table(t) => t.line,
            Node::Text(t) => t.line,
        }
    }

    pub fn as_headline(&self) -> Option<&Headline> {
        match self {
            Node::Headline(h) => Some(h),
            _ => None,
        }
    }
}

impl Headline {
    /// Direct child headlines in document order.
    pub fn subheadlines(&self) -> impl Iterator<Item = &Headline> {
        self.children.iter().filter_map(Node::as_headline)
    }
}

impl Document {
    /// Top-level headlines in document order.
    pub fn headlines(&self) -> impl Iterator<Item = &Headline> {
        self.children.iter().filter_map(Node::as_headline)
    }

    /// Every headline, pre-order.
    pub fn all_headlines(&self) -> Vec<&Headline> {
        fn walk<'a>(headline: &'a Headline, out: &mut Vec<&'a Headline>) {
            out.push(headline);
            for child in headline.subheadlines() {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        for headline in self.headlines() {
            walk(headline, &mut out);
        }
        out
    }
}
