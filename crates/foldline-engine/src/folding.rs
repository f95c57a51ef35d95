//! Folding ranges for hosts that fold by range rather than by command.
//!
//! Two providers: one from headline lines alone (works for both syntax
//! families), one from the Org syntax tree (adds code blocks and drawers).

use foldline_syntax::{Document, HeadlineSyntax, Node};
use serde::Serialize;

use crate::outline::OutlineTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldingKind {
    Section,
    Block,
    Drawer,
}

/// Inclusive foldable line range; `start` stays visible when folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoldingRange {
    pub start: usize,
    pub end: usize,
    pub kind: FoldingKind,
}

/// One range per headline whose section extends past its own line.
pub fn headline_folding_ranges(syntax: HeadlineSyntax, text: &str) -> Vec<FoldingRange> {
    OutlineTree::from_text(syntax, text)
        .all_nodes()
        .filter(|node| node.end_line > node.line)
        .map(|node| FoldingRange {
            start: node.line,
            end: node.end_line,
            kind: FoldingKind::Section,
        })
        .collect()
}

/// Ranges for headlines, code blocks and drawers of a parsed Org document,
/// ordered by start line.
pub fn syntax_folding_ranges(document: &Document) -> Vec<FoldingRange> {
    let mut ranges = Vec::new();
    collect(&document.children, &mut ranges);
    ranges.sort_by_key(|range| (range.start, std::cmp::Reverse(range.end)));
    ranges
}

fn collect(nodes: &[Node], ranges: &mut Vec<FoldingRange>) {
    for node in nodes {
        let (start, end, kind) = match node {
            Node::Headline(headline) => {
                collect(&headline.children, ranges);
                (headline.line, headline.end_line, FoldingKind::Section)
            }
            Node::CodeBlock(block) => (block.line, block.end_line, FoldingKind::Block),
            Node::Drawer(drawer) => (drawer.line, drawer.end_line, FoldingKind::Drawer),
            _ => continue,
        };
        if end > start {
            ranges.push(FoldingRange { start, end, kind });
        }
    }
}
