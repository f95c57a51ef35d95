use foldline_syntax::Document;
use serde::Serialize;

/// A headline that belongs on an agenda: it has a TODO keyword or a
/// scheduled/deadline timestamp. Timestamps are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgendaItem {
    pub title: String,
    pub level: usize,
    pub line: usize,
    pub todo: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub scheduled: Option<String>,
    pub deadline: Option<String>,
}

/// Agenda items of one parsed document, in document order.
pub fn collect_agenda_items(document: &Document) -> Vec<AgendaItem> {
    document
        .all_headlines()
        .into_iter()
        .filter(|h| h.todo.is_some() || h.planning.scheduled.is_some() || h.planning.deadline.is_some())
        .map(|h| AgendaItem {
            title: h.title.clone(),
            level: h.level,
            line: h.line,
            todo: h.todo.clone(),
            priority: h.priority.clone(),
            tags: h.tags.clone(),
            scheduled: h.planning.scheduled.clone(),
            deadline: h.planning.deadline.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldline_syntax::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collects_tasks_and_dated_headlines() {
        let text = "\
* Projects
** TODO Write docs
** Meeting
SCHEDULED: <2024-06-03 Mon>
** Reference
* Bills
:PROPERTIES:
:END:
:LOGBOOK:
DEADLINE: <2024-06-30 Sun>
:END:
";
        let items = collect_agenda_items(&parse(text));

        let summary: Vec<(&str, Option<&str>, Option<&str>, Option<&str>)> = items
            .iter()
            .map(|i| {
                (
                    i.title.as_str(),
                    i.todo.as_deref(),
                    i.scheduled.as_deref(),
                    i.deadline.as_deref(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Write docs", Some("TODO"), None, None),
                ("Meeting", None, Some("<2024-06-03 Mon>"), None),
                ("Bills", None, None, Some("<2024-06-30 Sun>")),
            ]
        );
    }

    #[test]
    fn test_plain_outline_has_no_agenda() {
        assert!(collect_agenda_items(&parse("* A\n** B\ntext\n")).is_empty());
    }
}
