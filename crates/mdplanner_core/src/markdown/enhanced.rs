//! Structured view of a note body: paragraphs plus custom sections.
//!
//! The note body stays the stored form. Structure is read from it and,
//! when edited, rendered back into it:
//!
//! ```text
//! Plain paragraph.
//!
//! <!-- Custom Section: Release -->
//! <!-- section-id: section_1, type: timeline -->
//!
//! ## Beta (success)
//! <!-- item-id: item_1, status: success, date: 2026-02-01 -->
//!
//! Shipped to ten teams.
//!
//! <!-- End Custom Section -->
//! ```
//!
//! Tabs use `### Tab: Title` with `<!-- tab-id: X -->`; split views use
//! `### Column N` with `<!-- column-index: i -->`.

use crate::model::note::{
    CustomSection, NoteParagraph, NoteTab, ParagraphKind, SectionLayout, TimelineItem,
};

const FENCE: &str = "```";
const END_MARKER: &str = "<!-- End Custom Section -->";

fn comment_inner(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("<!--")?
        .strip_suffix("-->")
        .map(str::trim)
}

fn custom_title(line: &str) -> Option<&str> {
    comment_inner(line)?
        .strip_prefix("Custom Section:")
        .map(str::trim)
}

fn is_end(line: &str) -> bool {
    comment_inner(line) == Some("End Custom Section")
}

/// `key: value, key: value` fields of a comment line.
fn comment_fields(line: &str) -> Option<Vec<(String, String)>> {
    let inner = comment_inner(line)?;
    Some(
        inner
            .split(',')
            .filter_map(|field| {
                let (key, value) = field.split_once(':')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect(),
    )
}

fn field<'f>(fields: &'f [(String, String)], key: &str) -> Option<&'f str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Splits body lines into text paragraphs (blank-line separated) and
/// fenced code paragraphs.
pub fn split_paragraphs(lines: &[&str]) -> Vec<NoteParagraph> {
    let mut out: Vec<NoteParagraph> = Vec::new();
    let mut text: Vec<&str> = Vec::new();
    let mut code: Option<(Option<String>, Vec<&str>)> = None;

    fn push(
        out: &mut Vec<NoteParagraph>,
        kind: ParagraphKind,
        content: String,
        language: Option<String>,
    ) {
        let order = out.len();
        out.push(NoteParagraph {
            id: format!("para_{}", order + 1),
            kind,
            content,
            language,
            order,
        });
    }

    fn flush(out: &mut Vec<NoteParagraph>, text: &mut Vec<&str>) {
        if !text.is_empty() {
            let content = text.join("\n").trim().to_string();
            text.clear();
            push(out, ParagraphKind::Text, content, None);
        }
    }

    for &line in lines {
        let fence = line.trim_start().strip_prefix(FENCE);
        if let Some((language, body)) = code.as_mut() {
            if fence.is_some() {
                let content = body.join("\n");
                push(&mut out, ParagraphKind::Code, content, language.take());
                code = None;
            } else {
                body.push(line);
            }
            continue;
        }
        match fence {
            Some(language) => {
                flush(&mut out, &mut text);
                let language = Some(language.trim().to_string()).filter(|l| !l.is_empty());
                code = Some((language, Vec::new()));
            }
            None if line.trim().is_empty() => flush(&mut out, &mut text),
            None => text.push(line),
        }
    }
    flush(&mut out, &mut text);
    if let Some((language, body)) = code {
        push(&mut out, ParagraphKind::Code, body.join("\n"), language);
    }
    out
}

/// One marker-headed part of a custom section.
struct Part<'a> {
    heading: &'a str,
    fields: Vec<(String, String)>,
    lines: Vec<&'a str>,
}

fn split_parts<'a>(
    lines: &[&'a str],
    marker: impl Fn(&'a str) -> Option<&'a str>,
) -> Vec<Part<'a>> {
    let mut parts: Vec<Part<'a>> = Vec::new();
    for &line in lines {
        if let Some(heading) = marker(line) {
            parts.push(Part {
                heading: heading.trim(),
                fields: Vec::new(),
                lines: Vec::new(),
            });
            continue;
        }
        let Some(part) = parts.last_mut() else {
            continue;
        };
        if part.fields.is_empty() && part.lines.iter().all(|l| l.trim().is_empty()) {
            if let Some(fields) = comment_fields(line).filter(|f| !f.is_empty()) {
                part.fields = fields;
                continue;
            }
        }
        part.lines.push(line);
    }
    parts
}

fn parse_section(title: &str, lines: &[&str], order: usize) -> CustomSection {
    let header = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .and_then(|idx| Some((idx, comment_fields(lines[idx])?)))
        .filter(|(_, fields)| {
            field(fields, "section-id").is_some() || field(fields, "type").is_some()
        });
    let (body, fields) = match header {
        Some((idx, fields)) => (&lines[idx + 1..], fields),
        None => (lines, Vec::new()),
    };
    let id = field(&fields, "section-id")
        .map(str::to_string)
        .unwrap_or_else(|| format!("section_{}", order + 1));

    let layout = match field(&fields, "type").unwrap_or("tabs") {
        "timeline" => SectionLayout::Timeline(
            split_parts(body, |line| line.trim().strip_prefix("## "))
                .into_iter()
                .enumerate()
                .map(|(n, part)| {
                    let (title, heading_status) = match part.heading.rsplit_once(" (") {
                        Some((title, status)) if status.ends_with(')') => {
                            (title.trim(), Some(status.trim_end_matches(')')))
                        }
                        _ => (part.heading, None),
                    };
                    TimelineItem {
                        id: field(&part.fields, "item-id")
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("item_{}", n + 1)),
                        title: title.to_string(),
                        status: field(&part.fields, "status")
                            .or(heading_status)
                            .unwrap_or("pending")
                            .to_string(),
                        date: field(&part.fields, "date").map(str::to_string),
                        content: split_paragraphs(&part.lines),
                    }
                })
                .collect(),
        ),
        "split-view" => SectionLayout::SplitView(
            split_parts(body, |line| line.trim().strip_prefix("### Column"))
                .into_iter()
                .map(|part| split_paragraphs(&part.lines))
                .collect(),
        ),
        _ => SectionLayout::Tabs(
            split_parts(body, |line| line.trim().strip_prefix("### Tab:"))
                .into_iter()
                .enumerate()
                .map(|(n, part)| NoteTab {
                    id: field(&part.fields, "tab-id")
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("tab_{}", n + 1)),
                    title: part.heading.to_string(),
                    content: split_paragraphs(&part.lines),
                })
                .collect(),
        ),
    };

    CustomSection {
        id,
        title: title.to_string(),
        order,
        layout,
    }
}

/// Reads paragraphs (outside custom sections) and custom sections from a
/// note body. An unterminated section runs to the end of the body.
pub fn parse_body(content: &str) -> (Vec<NoteParagraph>, Vec<CustomSection>) {
    let mut outside: Vec<&str> = Vec::new();
    let mut sections = Vec::new();
    let mut open: Option<(&str, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some((title, lines)) = open.as_mut() {
            if is_end(line) {
                sections.push(parse_section(*title, lines, sections.len()));
                open = None;
            } else {
                lines.push(line);
            }
            continue;
        }
        match custom_title(line) {
            Some(title) => open = Some((title, Vec::new())),
            None => outside.push(line),
        }
    }
    if let Some((title, lines)) = open {
        sections.push(parse_section(title, &lines, sections.len()));
    }
    (split_paragraphs(&outside), sections)
}

fn render_paragraphs(out: &mut String, paragraphs: &[NoteParagraph]) {
    for paragraph in paragraphs {
        match paragraph.kind {
            ParagraphKind::Text => {
                let text = paragraph.content.trim();
                if !text.is_empty() {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
            }
            ParagraphKind::Code => {
                out.push_str(FENCE);
                out.push_str(paragraph.language.as_deref().unwrap_or_default());
                out.push('\n');
                if !paragraph.content.is_empty() {
                    out.push_str(&paragraph.content);
                    out.push('\n');
                }
                out.push_str(FENCE);
                out.push_str("\n\n");
            }
        }
    }
}

/// Renders paragraphs, then custom sections, as a note body.
pub fn render_body(paragraphs: &[NoteParagraph], sections: &[CustomSection]) -> String {
    let mut out = String::new();
    render_paragraphs(&mut out, paragraphs);
    for section in sections {
        out.push_str(&format!(
            "<!-- Custom Section: {} -->\n<!-- section-id: {}, type: {} -->\n\n",
            section.title,
            section.id,
            section.layout.type_name()
        ));
        match &section.layout {
            SectionLayout::Tabs(tabs) => {
                for tab in tabs {
                    out.push_str(&format!(
                        "### Tab: {}\n<!-- tab-id: {} -->\n\n",
                        tab.title, tab.id
                    ));
                    render_paragraphs(&mut out, &tab.content);
                }
            }
            SectionLayout::Timeline(items) => {
                for item in items {
                    out.push_str(&format!(
                        "## {} ({})\n<!-- item-id: {}, status: {}",
                        item.title, item.status, item.id, item.status
                    ));
                    if let Some(date) = &item.date {
                        out.push_str(&format!(", date: {date}"));
                    }
                    out.push_str(" -->\n\n");
                    render_paragraphs(&mut out, &item.content);
                }
            }
            SectionLayout::SplitView(columns) => {
                for (index, column) in columns.iter().enumerate() {
                    out.push_str(&format!(
                        "### Column {}\n<!-- column-index: {index} -->\n\n",
                        index + 1
                    ));
                    render_paragraphs(&mut out, column);
                }
            }
        }
        out.push_str(END_MARKER);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "Intro line one\nline two\n\n```rust\nfn main() {}\n\nlet x = 1;\n```\n\n<!-- Custom Section: Release -->\n<!-- section-id: section_7, type: timeline -->\n\n## Beta (success)\n<!-- item-id: item_3, status: success, date: 2026-02-01 -->\n\nShipped to ten teams.\n\n## GA (pending)\n\nNot yet.\n\n<!-- End Custom Section -->\n\nClosing words.";

    #[test]
    fn paragraphs_split_on_blank_lines_and_fences() {
        let (paragraphs, _) = parse_body(BODY);
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].content, "Intro line one\nline two");
        assert_eq!(paragraphs[1].kind, ParagraphKind::Code);
        assert_eq!(paragraphs[1].language.as_deref(), Some("rust"));
        assert_eq!(paragraphs[1].content, "fn main() {}\n\nlet x = 1;");
        assert_eq!(paragraphs[2].content, "Closing words.");
        assert_eq!(paragraphs[2].order, 2);
    }

    #[test]
    fn timeline_items_read_metadata_and_fallbacks() {
        let (_, sections) = parse_body(BODY);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "section_7");
        assert_eq!(sections[0].title, "Release");
        let SectionLayout::Timeline(items) = &sections[0].layout else {
            panic!("expected a timeline, got {:?}", sections[0].layout);
        };
        assert_eq!(items[0].id, "item_3");
        assert_eq!(items[0].date.as_deref(), Some("2026-02-01"));
        assert_eq!(items[0].content[0].content, "Shipped to ten teams.");
        assert_eq!(items[1].id, "item_2");
        assert_eq!(items[1].title, "GA");
        assert_eq!(items[1].status, "pending");
    }

    #[test]
    fn rendered_structure_reads_back_identically() {
        let (paragraphs, sections) = parse_body(BODY);
        let tabs = CustomSection {
            id: "section_8".to_string(),
            title: "Options".to_string(),
            order: 1,
            layout: SectionLayout::Tabs(vec![NoteTab {
                id: "tab_1".to_string(),
                title: "Plan A".to_string(),
                content: split_paragraphs(&["Cheap."]),
            }]),
        };
        let split = CustomSection {
            id: "section_9".to_string(),
            title: "Compare".to_string(),
            order: 2,
            layout: SectionLayout::SplitView(vec![
                split_paragraphs(&["Left."]),
                split_paragraphs(&["Right."]),
            ]),
        };
        let mut all = sections;
        all.push(tabs);
        all.push(split);

        let rendered = render_body(&paragraphs, &all);
        assert_eq!(parse_body(&rendered), (paragraphs, all));
    }

    #[test]
    fn unterminated_section_runs_to_the_end() {
        let (paragraphs, sections) =
            parse_body("Before\n\n<!-- Custom Section: Notes -->\n### Tab: One\n\nInside");
        assert_eq!(paragraphs.len(), 1);
        let SectionLayout::Tabs(tabs) = &sections[0].layout else {
            panic!("expected tabs");
        };
        assert_eq!(tabs[0].id, "tab_1");
        assert_eq!(tabs[0].content[0].content, "Inside");
    }
}
