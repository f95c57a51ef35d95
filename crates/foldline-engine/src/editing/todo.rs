use foldline_syntax::{HeadlineSyntax, OrgHeadline, parse_org_headline};

use super::{EditError, EditOutcome, NoTarget, find_current_headline};
use crate::document::TextDocument;

const PRIORITIES: [&str; 3] = ["[#A]", "[#B]", "[#C]"];

fn render(headline: &OrgHeadline<'_>, todo: Option<&str>, priority: Option<&str>) -> String {
    let stars = "*".repeat(headline.level);
    let tags = format!(":{}:", headline.tags.join(":"));

    let mut parts = vec![stars.as_str()];
    parts.extend(todo);
    parts.extend(priority);
    if !headline.title.is_empty() {
        parts.push(headline.title);
    }
    if !headline.tags.is_empty() {
        parts.push(&tags);
    }
    if parts.len() == 1 {
        return format!("{stars} ");
    }
    parts.join(" ")
}

/// Parse with every known keyword. A headline that is nothing but a keyword
/// (`* TODO`) has that keyword as its state and an empty title.
fn parse_headline<'a, S: AsRef<str>>(
    line: &'a str,
    todo_keywords: &[S],
    cycle: &[S],
) -> Option<OrgHeadline<'a>> {
    let known: Vec<&str> = todo_keywords
        .iter()
        .chain(cycle)
        .map(|k| k.as_ref())
        .collect();
    let mut headline = parse_org_headline(line, known.as_slice())?;
    if headline.todo.is_none()
        && headline.priority.is_none()
        && headline.tags.is_empty()
        && known.contains(&headline.title)
    {
        headline.todo = Some(headline.title);
        headline.title = "";
    }
    Some(headline)
}

/// Next TODO keyword for an Org headline line: none, then each of `cycle`
/// in order, then none again. Any word of `todo_keywords` or `cycle` is read
/// as the current keyword; one missing from `cycle` moves to its first
/// entry. `None` if the line is not a headline.
pub fn cycle_todo<S: AsRef<str>>(line: &str, todo_keywords: &[S], cycle: &[S]) -> Option<String> {
    let headline = parse_headline(line, todo_keywords, cycle)?;
    let next = match headline.todo {
        None => cycle.first(),
        Some(todo) => match cycle.iter().position(|k| k.as_ref() == todo) {
            Some(index) => cycle.get(index + 1),
            None => cycle.first(),
        },
    };
    Some(render(&headline, next.map(|k| k.as_ref()), headline.priority))
}

/// Next priority cookie for an Org headline line: none, A, B, C, none.
pub fn cycle_priority<S: AsRef<str>>(line: &str, todo_keywords: &[S]) -> Option<String> {
    let headline = parse_headline(line, todo_keywords, &[])?;
    let next = match headline.priority {
        None => Some(PRIORITIES[0]),
        Some(priority) => PRIORITIES
            .iter()
            .position(|p| *p == priority)
            .and_then(|index| PRIORITIES.get(index + 1))
            .copied(),
    };
    Some(render(&headline, headline.todo, next))
}

/// [`cycle_todo`] on the headline containing `line`.
pub fn cycle_todo_at<S: AsRef<str>>(
    doc: &mut TextDocument,
    line: usize,
    todo_keywords: &[S],
    cycle: &[S],
) -> Result<EditOutcome, EditError> {
    rewrite_headline(doc, line, |text| cycle_todo(text, todo_keywords, cycle))
}

/// [`cycle_priority`] on the headline containing `line`.
pub fn cycle_priority_at<S: AsRef<str>>(
    doc: &mut TextDocument,
    line: usize,
    todo_keywords: &[S],
) -> Result<EditOutcome, EditError> {
    rewrite_headline(doc, line, |text| cycle_priority(text, todo_keywords))
}

fn rewrite_headline(
    doc: &mut TextDocument,
    line: usize,
    rewrite: impl FnOnce(&str) -> Option<String>,
) -> Result<EditOutcome, EditError> {
    if doc.syntax() != HeadlineSyntax::Org {
        return Ok(EditOutcome::NoTarget(NoTarget::OrgOnly));
    }
    let Some(headline_line) = find_current_headline(doc, line) else {
        return Ok(EditOutcome::NoTarget(NoTarget::NotOnHeadline));
    };
    let Some(updated) = doc.line(headline_line).and_then(|text| rewrite(&text)) else {
        return Ok(EditOutcome::NoTarget(NoTarget::NotOnHeadline));
    };

    doc.replace_lines(headline_line, headline_line, &updated)?;
    Ok(EditOutcome::Applied { cursor_line: line })
}
