use log::debug;

use super::{EditError, EditOutcome, NoTarget};
use crate::document::TextDocument;
use crate::outline::{OutlineNode, OutlineTree};

fn outline(doc: &TextDocument) -> OutlineTree {
    OutlineTree::from_text(doc.syntax(), &doc.text())
}

fn no_target(reason: NoTarget) -> Result<EditOutcome, EditError> {
    debug!("edit skipped: {reason}");
    Ok(EditOutcome::NoTarget(reason))
}

/// Last line of the node's section, not counting the empty line after a
/// final newline.
fn block_end(doc: &TextDocument, node: &OutlineNode) -> usize {
    let last = doc.line_count() - 1;
    if node.end_line == last
        && node.end_line > node.line
        && doc.line(last).is_some_and(|text| text.is_empty())
    {
        node.end_line - 1
    } else {
        node.end_line
    }
}

/// Line of the headline at or above `line`. Lines inside front matter or
/// before the first headline have none.
pub fn find_current_headline(doc: &TextDocument, line: usize) -> Option<usize> {
    outline(doc).enclosing_node(line).map(|node| node.line)
}

/// Inclusive line range of the section containing `line`.
pub fn headline_range(doc: &TextDocument, line: usize) -> Option<(usize, usize)> {
    let tree = outline(doc);
    let node = tree.enclosing_node(line)?;
    Some((node.line, block_end(doc, node)))
}

/// Swap the section containing `line` with its previous sibling section.
pub fn move_headline_up(doc: &mut TextDocument, line: usize) -> Result<EditOutcome, EditError> {
    let tree = outline(doc);
    let Some(node) = tree.enclosing_node(line) else {
        return no_target(NoTarget::NotOnHeadline);
    };
    let siblings = tree.siblings(node);
    let previous = siblings
        .iter()
        .position(|sibling| sibling.handle == node.handle)
        .and_then(|index| index.checked_sub(1))
        .map(|index| siblings[index]);
    let Some(previous) = previous else {
        return no_target(NoTarget::NoPreviousSibling);
    };

    let end = block_end(doc, node);
    let moving = doc.lines(node.line, end)?;
    let displaced = doc.lines(previous.line, node.line - 1)?;
    doc.replace_lines(previous.line, end, &[moving, displaced].concat().join("\n"))?;

    Ok(EditOutcome::Applied {
        cursor_line: previous.line + (line - node.line),
    })
}

/// Swap the section containing `line` with its next sibling section.
pub fn move_headline_down(doc: &mut TextDocument, line: usize) -> Result<EditOutcome, EditError> {
    let tree = outline(doc);
    let Some(node) = tree.enclosing_node(line) else {
        return no_target(NoTarget::NotOnHeadline);
    };
    let siblings = tree.siblings(node);
    let next = siblings
        .iter()
        .position(|sibling| sibling.handle == node.handle)
        .and_then(|index| siblings.get(index + 1))
        .copied();
    let Some(next) = next else {
        return no_target(NoTarget::NoNextSibling);
    };

    let end = block_end(doc, next);
    let moving = doc.lines(node.line, next.line - 1)?;
    let displaced = doc.lines(next.line, end)?;
    let cursor_line = node.line + displaced.len() + (line - node.line);
    doc.replace_lines(node.line, end, &[displaced, moving].concat().join("\n"))?;

    Ok(EditOutcome::Applied { cursor_line })
}

/// Decrease the level of the current headline. Only the headline line
/// changes; its subheadlines keep their markers.
pub fn promote_headline(doc: &mut TextDocument, line: usize) -> Result<EditOutcome, EditError> {
    relevel(doc, line, |level| match level {
        1 => Err(NoTarget::AlreadyTopLevel),
        _ => Ok(level - 1),
    })
}

/// Increase the level of the current headline, up to the family's maximum.
pub fn demote_headline(doc: &mut TextDocument, line: usize) -> Result<EditOutcome, EditError> {
    let max_level = doc.syntax().max_level();
    relevel(doc, line, |level| match max_level {
        Some(max) if level >= max => Err(NoTarget::AlreadyDeepest),
        _ => Ok(level + 1),
    })
}

fn relevel(
    doc: &mut TextDocument,
    line: usize,
    target: impl FnOnce(usize) -> Result<usize, NoTarget>,
) -> Result<EditOutcome, EditError> {
    let syntax = doc.syntax();
    let Some((headline_line, text)) =
        find_current_headline(doc, line).and_then(|l| Some((l, doc.line(l)?)))
    else {
        return no_target(NoTarget::NotOnHeadline);
    };
    let Some(level) = syntax.level_of(&text) else {
        return no_target(NoTarget::NotOnHeadline);
    };
    let level = match target(level) {
        Ok(level) => level,
        Err(reason) => return no_target(reason),
    };
    let Some(updated) = syntax.with_level(&text, level) else {
        return no_target(NoTarget::NotOnHeadline);
    };

    doc.replace_lines(headline_line, headline_line, &updated)?;
    Ok(EditOutcome::Applied { cursor_line: line })
}

/// Remove the section containing `line`, subheadlines included.
pub fn delete_headline(doc: &mut TextDocument, line: usize) -> Result<EditOutcome, EditError> {
    let tree = outline(doc);
    let Some(node) = tree.enclosing_node(line) else {
        return no_target(NoTarget::NotOnHeadline);
    };

    let end = block_end(doc, node);
    doc.delete_lines(node.line, end)?;
    Ok(EditOutcome::Applied {
        cursor_line: node.line.min(doc.line_count() - 1),
    })
}

/// Text of the section containing `line`, subheadlines included.
pub fn copy_headline(doc: &TextDocument, line: usize) -> Option<String> {
    let (start, end) = headline_range(doc, line)?;
    doc.lines(start, end).ok().map(|lines| lines.join("\n"))
}

/// Rewrite the headline starting on `line` and its own body (the text before
/// its first child). Blank lines that close the body are kept.
pub fn save_node(
    doc: &mut TextDocument,
    line: usize,
    title: &str,
    content: &str,
) -> Result<EditOutcome, EditError> {
    let tree = outline(doc);
    let Some(node) = tree.node_at_line(line) else {
        return no_target(NoTarget::NotOnHeadline);
    };

    let mut end = tree.body_end(node);
    while end > node.line && doc.line(end).is_some_and(|text| text.trim().is_empty()) {
        end -= 1;
    }

    let mut replacement = doc.syntax().format_headline(node.level, title.trim());
    let content = content.trim();
    if !content.is_empty() {
        replacement.push('\n');
        replacement.push_str(content);
    }

    doc.replace_lines(node.line, end, &replacement)?;
    Ok(EditOutcome::Applied {
        cursor_line: node.line,
    })
}
