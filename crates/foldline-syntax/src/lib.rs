//! # foldline-syntax
//!
//! Turns plain text into structure, in two layers:
//!
//! ```text
//! Source Text → Tokenizer → Tokens → Parser → Document
//!               (regex + Logos)       (recursive descent)
//! ```
//!
//! ### 1. Tokenizer ([`tokenizer`] module)
//!
//! One token per non-blank line, with newline separators and a final EOF.
//! Headline lines are decomposed further by a [Logos] lexer into TODO
//! keyword, priority cookie, title and tags ([`headline`] module).
//!
//! ### 2. Parser ([`parser`] module)
//!
//! Builds a typed [`Document`] tree: headlines nest by star count and own
//! their drawers, code blocks, lists, tables and text.
//!
//! The [`HeadlineSyntax`] type is shared with the outline tree in
//! `foldline-engine`, which works directly on lines and supports both `#`
//! and `*` headlines.
//!
//! ## Quick Start
//!
//! ```
//! use foldline_syntax::{parse, Node};
//!
//! let document = parse("* TODO [#A] Ship it :work:\n** Notes\n");
//!
//! let Node::Headline(headline) = &document.children[0] else { panic!() };
//! assert_eq!(headline.todo.as_deref(), Some("TODO"));
//! assert_eq!(headline.subheadlines().count(), 1);
//! ```
//!
//! [Logos]: https://docs.rs/logos

pub mod ast;
pub mod headline;
pub mod parser;
pub mod token;
pub mod tokenizer;

pub use ast::*;
pub use headline::{
    Checkbox, DEFAULT_TODO_KEYWORDS, HeadlineMatch, HeadlineSyntax, OrgHeadline,
    parse_org_headline,
};
pub use parser::{Parser, parse, parse_planning_line, parse_with};
pub use token::{ListItemToken, Token, TokenKind};
pub use tokenizer::{Tokenizer, Tokens, tokenize};

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    /// Helper to format a document for snapshot testing.
    fn format_tree(nodes: &[Node], indent: usize) -> String {
        let mut result = String::new();
        let prefix = "  ".repeat(indent);

        for node in nodes {
            match node {
                Node::Headline(h) => {
                    let todo = h.todo.as_deref().map(|t| format!("{t} ")).unwrap_or_default();
                    result.push_str(&format!(
                        "{prefix}HEADLINE@{}..{} L{} {todo}{:?} {:?}\n",
                        h.line, h.end_line, h.level, h.title, h.tags
                    ));
                    result.push_str(&format_tree(&h.children, indent + 1));
                }
                Node::CodeBlock(c) => result.push_str(&format!(
                    "{prefix}CODE@{}..{} {:?} {:?}\n",
                    c.line, c.end_line, c.language, c.content
                )),
                Node::Drawer(d) => result.push_str(&format!(
                    "{prefix}DRAWER@{}..{} {} ({} properties)\n",
                    d.line,
                    d.end_line,
                    d.name,
                    d.properties.len()
                )),
                Node::List(l) => result.push_str(&format!(
                    "{prefix}LIST@{} ({} items)\n",
                    l.line,
                    l.items.len()
                )),
                Node::Table(t) => result.push_str(&format!(
                    "{prefix}TABLE@{} ({} rows)\n",
                    t.line,
                    t.rows.len()
                )),
                Node::Text(t) => {
                    result.push_str(&format!("{prefix}TEXT@{} {:?}\n", t.line, t.value))
                }
            }
        }

        result
    }

    #[test]
    fn snapshot_complex_document() {
        let input = "\
#+TITLE: Plans
intro
* TODO Write report :work:
:PROPERTIES:
:EFFORT: 2h
:END:
DEADLINE: <2024-05-01 Wed>
** Outline
- one
- two
** DONE Data
| a | b |
|---+---|
#+BEGIN_SRC python
print(1)
#+END_SRC
* Someday
";
        let document = parse(input);
        assert_snapshot!(format_tree(&document.children, 0), @r#"
        TEXT@1 "intro"
        HEADLINE@2..15 L1 TODO "Write report" ["work"]
          DRAWER@3..5 PROPERTIES (1 properties)
          TEXT@6 "DEADLINE: <2024-05-01 Wed>"
          HEADLINE@7..9 L2 "Outline" []
            LIST@8 (2 items)
          HEADLINE@10..15 L2 DONE "Data" []
            TABLE@11 (2 rows)
            CODE@13..15 Some("python") "print(1)"
        HEADLINE@16..17 L1 "Someday" []
        "#);
    }
}
