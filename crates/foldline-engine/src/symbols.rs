use foldline_syntax::{Document, Headline};
use serde::Serialize;

/// TODO keywords that mark a task as finished.
const DONE_KEYWORDS: &[&str] = &["DONE", "CANCELLED", "CANCELED"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Section,
    Task,
    DoneTask,
}

/// Outline entry for symbol pickers and breadcrumbs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    pub end_line: usize,
    pub children: Vec<DocumentSymbol>,
}

pub fn document_symbols(document: &Document) -> Vec<DocumentSymbol> {
    document.headlines().map(symbol).collect()
}

fn symbol(headline: &Headline) -> DocumentSymbol {
    DocumentSymbol {
        name: symbol_name(headline),
        kind: match headline.todo.as_deref() {
            Some(todo) if DONE_KEYWORDS.contains(&todo) => SymbolKind::DoneTask,
            Some(_) => SymbolKind::Task,
            None => SymbolKind::Section,
        },
        line: headline.line,
        end_line: headline.end_line,
        children: headline.subheadlines().map(symbol).collect(),
    }
}

/// `[#A] TODO Title :tag1:tag2:`
fn symbol_name(headline: &Headline) -> String {
    let mut parts = Vec::new();
    parts.extend(headline.priority.as_deref());
    parts.extend(headline.todo.as_deref());
    parts.push(headline.title.as_str());

    let mut name = parts.join(" ");
    if !headline.tags.is_empty() {
        name.push_str(&format!(" :{}:", headline.tags.join(":")));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldline_syntax::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbols_nest_and_carry_metadata() {
        let document = parse("* TODO [#B] Ship :work:\n** DONE Build\n** Notes\n* Later\n");

        let symbols = document_symbols(&document);

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "[#B] TODO Ship :work:");
        assert_eq!(symbols[0].kind, SymbolKind::Task);
        assert_eq!((symbols[0].line, symbols[0].end_line), (0, 2));

        let children: Vec<(&str, SymbolKind)> = symbols[0]
            .children
            .iter()
            .map(|s| (s.name.as_str(), s.kind))
            .collect();
        assert_eq!(
            children,
            vec![
                ("DONE Build", SymbolKind::DoneTask),
                ("Notes", SymbolKind::Section)
            ]
        );
        assert_eq!(symbols[1].kind, SymbolKind::Section);
    }
}
