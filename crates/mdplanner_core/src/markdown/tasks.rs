//! Task board codec.
//!
//! ```text
//! <!-- Board -->
//! # Board
//!
//! ## Todo
//!
//! - [ ] (1) Parent {tag: [a, b]; priority: 1}
//!   extra description
//!   - [x] (2) Child
//! ```
//!
//! Nesting is decided by relative indentation: any line indented deeper
//! than a checkbox belongs to it.

use super::attrs::{lookup, parse_attrs, parse_list, AttrWriter};
use super::lexer::{Line, LineKind, TaskLine};
use super::{section_header, SectionCodec};
use crate::model::task::{Task, TaskAttributes};

/// Board columns used when the document has none yet.
pub const DEFAULT_SECTIONS: &[&str] = &["Ideas", "Todo", "In Progress", "Done"];

/// `## Section` names of the board, in document order.
pub fn board_sections(body: &[Line<'_>]) -> Vec<String> {
    let mut sections = Vec::new();
    for line in body {
        if let Some(name) = line.heading(2) {
            let name = name.to_string();
            if !sections.contains(&name) {
                sections.push(name);
            }
        }
    }
    sections
}

/// Board columns, falling back to the defaults for an empty board.
pub fn sections_or_default(body: &[Line<'_>]) -> Vec<String> {
    let sections = board_sections(body);
    if sections.is_empty() {
        DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        sections
    }
}

struct BoardParser<'l, 'a> {
    lines: &'l [Line<'a>],
    pos: usize,
}

impl<'l, 'a> BoardParser<'l, 'a> {
    fn parse(mut self) -> Vec<Task> {
        let mut tasks = Vec::new();
        let mut section = String::new();
        while let Some(line) = self.lines.get(self.pos) {
            match line.kind {
                LineKind::Heading { level: 2, text } => {
                    section = text.to_string();
                    self.pos += 1;
                }
                LineKind::Task(task_line) => {
                    self.pos += 1;
                    tasks.push(self.parse_task(task_line, line.indent, &section));
                }
                _ => self.pos += 1,
            }
        }
        tasks
    }

    fn parse_task(&mut self, line: TaskLine<'_>, indent: usize, section: &str) -> Task {
        let mut task = Task::new(line.title, section);
        task.completed = line.completed;
        task.id = line.id.unwrap_or_default().to_string();
        task.attributes = line.attrs.map(decode_attributes).unwrap_or_default();

        while let Some(next) = self.lines.get(self.pos) {
            if next.is_blank() {
                self.pos += 1;
                continue;
            }
            if next.indent <= indent {
                break;
            }
            self.pos += 1;
            match next.kind {
                LineKind::Task(child) => {
                    let child = self.parse_task(child, next.indent, section);
                    task.children.push(child);
                }
                _ => task.description.push(next.text().to_string()),
            }
        }
        task
    }
}

pub fn decode_attributes(raw: &str) -> TaskAttributes {
    let pairs = parse_attrs(raw);
    let text = |key: &str| lookup(&pairs, key).map(str::to_string);
    let number = |key: &str| lookup(&pairs, key).and_then(|v| v.parse::<i64>().ok());
    TaskAttributes {
        tag: lookup(&pairs, "tag").map(parse_list).unwrap_or_default(),
        due_date: text("due_date"),
        assignee: text("assignee"),
        priority: number("priority"),
        effort: number("effort"),
        blocked_by: lookup(&pairs, "blocked_by").map(parse_list).unwrap_or_default(),
        milestone: text("milestone"),
        planned_start: text("planned_start"),
        planned_end: text("planned_end"),
    }
}

pub fn encode_attributes(attributes: &TaskAttributes) -> AttrWriter {
    AttrWriter::new()
        .list("tag", &attributes.tag)
        .opt("due_date", attributes.due_date.as_deref())
        .opt("assignee", attributes.assignee.as_deref())
        .opt("priority", attributes.priority.map(|p| p.to_string()))
        .opt("effort", attributes.effort.map(|e| e.to_string()))
        .list("blocked_by", &attributes.blocked_by)
        .opt("milestone", attributes.milestone.as_deref())
        .opt("planned_start", attributes.planned_start.as_deref())
        .opt("planned_end", attributes.planned_end.as_deref())
}

fn render_task(out: &mut String, task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    let mark = if task.completed { 'x' } else { ' ' };
    let id = if task.id.is_empty() {
        String::new()
    } else {
        format!("({}) ", task.id)
    };
    out.push_str(&format!(
        "{indent}- [{mark}] {id}{}{}\n",
        task.title,
        encode_attributes(&task.attributes).render_suffix_after(&task.title)
    ));
    for line in &task.description {
        out.push_str(&format!("{indent}  {line}\n"));
    }
    for child in &task.children {
        render_task(out, child, depth + 1);
    }
}

/// Renders the board with the given column order; columns used by tasks
/// but missing from `sections` are appended.
pub fn render_board(sections: &[String], tasks: &[Task]) -> String {
    let mut order: Vec<String> = sections.to_vec();
    for task in tasks {
        if !order.contains(&task.section) {
            order.push(task.section.clone());
        }
    }

    let mut out = section_header("Board");
    for section in &order {
        out.push_str(&format!("## {section}\n\n"));
        let mut any = false;
        for task in tasks.iter().filter(|task| &task.section == section) {
            render_task(&mut out, task, 0);
            any = true;
        }
        if any {
            out.push('\n');
        }
    }
    out
}

impl SectionCodec for Task {
    const SECTION: &'static str = "Board";

    fn decode(body: &[Line<'_>]) -> Vec<Self> {
        let mut tasks = BoardParser {
            lines: body,
            pos: 0,
        }
        .parse();
        Task::fill_missing_ids(&mut tasks);
        Task::link_parents(&mut tasks, None);
        tasks
    }

    fn encode(items: &[Self], existing: &[Line<'_>]) -> String {
        render_board(&sections_or_default(existing), items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::lexer::tokenize;

    const BOARD: &str = "## Todo\n\n- [ ] (1) Parent {tag: [a, b]; priority: 1}\n  first line\n  - [x] (2) Child {assignee: sam}\n    - [ ] (3) Grandchild\n\n## Done\n\n- [x] (4) Finished\n";

    #[test]
    fn nested_tasks_inherit_section_and_parent() {
        let tasks = Task::decode(&tokenize(BOARD));
        assert_eq!(tasks.len(), 2);
        let parent = &tasks[0];
        assert_eq!(parent.attributes.tag, vec!["a", "b"]);
        assert_eq!(parent.attributes.priority, Some(1));
        assert_eq!(parent.description, vec!["first line"]);
        let child = &parent.children[0];
        assert!(child.completed);
        assert_eq!(child.section, "Todo");
        assert_eq!(child.parent_id.as_deref(), Some("1"));
        assert_eq!(child.children[0].parent_id.as_deref(), Some("2"));
        assert_eq!(tasks[1].section, "Done");
    }

    #[test]
    fn encode_is_stable() {
        let body = tokenize(BOARD);
        let first = Task::encode(&Task::decode(&body), &body);
        let reparsed = crate::markdown::section::SourceDocument::parse(&first);
        let second_body = reparsed.section_body("Board");
        let second = Task::encode(&Task::decode(second_body), second_body);
        assert_eq!(first, second);
        assert!(first.contains("  - [x] (2) Child {assignee: sam}\n"));
    }

    #[test]
    fn empty_board_uses_default_sections() {
        assert_eq!(sections_or_default(&[]), DEFAULT_SECTIONS);
    }

    #[test]
    fn brace_titles_and_quoted_values_survive() {
        let mut task = Task::new("Fix {bug}", "Todo");
        task.id = "7".to_string();
        let mut tagged = Task::new("Pair {review}", "Todo");
        tagged.id = "8".to_string();
        tagged.attributes.assignee = Some("ann; bob".to_string());
        tagged.attributes.tag = vec!["a, b".to_string()];
        let tasks = vec![task, tagged];

        let rendered = render_board(&["Todo".to_string()], &tasks);
        assert!(rendered.contains("- [ ] (7) Fix {bug} {}\n"));
        let doc = crate::markdown::section::SourceDocument::parse(&rendered);
        assert_eq!(Task::decode(doc.section_body("Board")), tasks);
    }

    #[test]
    fn task_without_id_renders_no_empty_parens() {
        let mut out = String::new();
        render_task(&mut out, &Task::new("Draft", "Todo"), 0);
        assert_eq!(out, "- [ ] Draft\n");
    }

    #[test]
    fn missing_ids_are_filled() {
        let tasks = Task::decode(&tokenize("## Todo\n\n- [ ] (5) A\n- [ ] B\n"));
        assert_eq!(tasks[1].id, "6");
    }
}
