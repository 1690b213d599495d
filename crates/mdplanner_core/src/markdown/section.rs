//! Section boundaries inside the project document.
//!
//! # Responsibility
//! - Locate the line span owned by a named top-level section.
//! - Replace that span, or insert a new section, while leaving every other
//!   byte of the document untouched.
//!
//! # Invariants
//! - A section starts at `<!-- Name -->` or `# Name`.
//! - A section ends at the next known section marker or the next other
//!   top-level heading. Unknown comments (`<!-- Custom Section: X -->`,
//!   id comments) never end a section.

use super::lexer::{tokenize, Line, LineKind};

/// Closed set of section markers that bound other sections.
pub const KNOWN_SECTIONS: &[&str] = &[
    "Board",
    "Notes",
    "Goals",
    "Canvas",
    "Mindmap",
    "C4 Architecture",
    "Milestones",
    "Ideas",
    "Retrospectives",
    "Customers",
    "Companies",
    "Configurations",
    "SWOT Analysis",
    "Risk Analysis",
    "Lean Canvas",
    "Business Model",
    "Project Value Board",
    "Brief",
    "Time Tracking",
    "Capacity Planning",
    "Strategic Levels",
    "Billing",
    "Billing Rates",
    "Quotes",
    "Invoices",
    "Contacts",
    "Deals",
    "Interactions",
];

/// Line span of one section; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub start: usize,
    /// First line after the section heading.
    pub body_start: usize,
    pub end: usize,
}

/// Tokenized document with section lookup and splicing.
#[derive(Debug)]
pub struct SourceDocument<'a> {
    content: &'a str,
    lines: Vec<Line<'a>>,
}

impl<'a> SourceDocument<'a> {
    pub fn parse(content: &'a str) -> Self {
        Self {
            content,
            lines: tokenize(content),
        }
    }

    pub fn lines(&self) -> &[Line<'a>] {
        &self.lines
    }

    pub fn content(&self) -> &'a str {
        self.content
    }

    pub fn locate(&self, name: &str) -> Option<SectionSpan> {
        let start = self.lines.iter().position(|line| match line.kind {
            LineKind::Comment(inner) => inner == name,
            LineKind::Heading { level: 1, text } => text == name,
            _ => false,
        })?;

        let mut body_start = start + 1;
        if matches!(self.lines[start].kind, LineKind::Comment(_)) {
            let heading = self.lines[body_start..]
                .iter()
                .position(|line| !line.is_blank())
                .map(|offset| body_start + offset);
            if let Some(idx) = heading {
                if self.lines[idx].heading(1) == Some(name) {
                    body_start = idx + 1;
                }
            }
        }

        let end = self.lines[body_start..]
            .iter()
            .position(|line| is_boundary(line))
            .map(|offset| body_start + offset)
            .unwrap_or(self.lines.len());

        Some(SectionSpan {
            start,
            body_start,
            end,
        })
    }

    /// Lines after the heading of `name`, or an empty slice.
    pub fn section_body(&self, name: &str) -> &[Line<'a>] {
        match self.locate(name) {
            Some(span) => &self.lines[span.body_start..span.end],
            None => &[],
        }
    }

    /// Returns the document with section `name` replaced by `rendered`.
    ///
    /// A missing section is inserted before the task board, or appended
    /// when there is no board (or when it is the board itself).
    pub fn replace_section(&self, name: &str, rendered: &str) -> String {
        let rendered = rendered.trim_end_matches('\n');
        let raw: Vec<&str> = self.lines.iter().map(|line| line.raw).collect();

        let (before, after) = match self.locate(name) {
            Some(span) => (&raw[..span.start], &raw[span.end..]),
            None => {
                let board = if name == "Board" {
                    None
                } else {
                    self.locate("Board")
                };
                match board {
                    Some(span) => (&raw[..span.start], &raw[span.start..]),
                    None => (&raw[..], &raw[raw.len()..]),
                }
            }
        };

        let mut out = String::with_capacity(self.content.len() + rendered.len() + 2);
        let before = trim_trailing_blank(before);
        for line in before {
            out.push_str(line);
            out.push('\n');
        }
        if !before.is_empty() {
            out.push('\n');
        }
        out.push_str(rendered);
        out.push('\n');
        let after = trim_leading_blank(after);
        if !after.is_empty() {
            out.push('\n');
            for line in after {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

fn is_boundary(line: &Line<'_>) -> bool {
    match line.kind {
        LineKind::Comment(inner) => KNOWN_SECTIONS.contains(&inner),
        LineKind::Heading { level: 1, .. } => true,
        _ => false,
    }
}

fn trim_trailing_blank<'s, 'a>(lines: &'s [&'a str]) -> &'s [&'a str] {
    let keep = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map(|idx| idx + 1)
        .unwrap_or(0);
    &lines[..keep]
}

fn trim_leading_blank<'s, 'a>(lines: &'s [&'a str]) -> &'s [&'a str] {
    let skip = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    &lines[skip..]
}

#[cfg(test)]
mod tests {
    use super::SourceDocument;

    const DOC: &str = "# Project\n\nIntro text.\n\n<!-- Notes -->\n# Notes\n\n## Idea\n\n<!-- Custom Section: Extra -->\nbody\n\n<!-- Board -->\n# Board\n\n## Todo\n";

    #[test]
    fn custom_comment_does_not_end_section() {
        let doc = SourceDocument::parse(DOC);
        let span = doc.locate("Notes").expect("notes section");
        assert_eq!(doc.lines()[span.end].raw, "<!-- Board -->");
        assert!(doc
            .section_body("Notes")
            .iter()
            .any(|line| line.raw == "body"));
    }

    #[test]
    fn heading_only_section_is_found() {
        let doc = SourceDocument::parse("# Goals\n\n## G\n\n# Other\n");
        let span = doc.locate("Goals").expect("goals section");
        assert_eq!(span.body_start, 1);
        assert_eq!(doc.lines()[span.end].raw, "# Other");
    }

    #[test]
    fn replace_keeps_surrounding_bytes() {
        let doc = SourceDocument::parse(DOC);
        let updated = doc.replace_section("Notes", "<!-- Notes -->\n# Notes\n\n## Changed\n");
        assert!(updated.starts_with("# Project\n\nIntro text.\n\n<!-- Notes -->"));
        assert!(updated.ends_with("<!-- Board -->\n# Board\n\n## Todo\n"));
        assert!(!updated.contains("Custom Section"));
    }

    #[test]
    fn missing_section_is_inserted_before_board() {
        let doc = SourceDocument::parse(DOC);
        let updated = doc.replace_section("Goals", "<!-- Goals -->\n# Goals\n");
        let goals = updated.find("<!-- Goals -->").expect("goals inserted");
        let board = updated.find("<!-- Board -->").expect("board kept");
        assert!(goals < board);
    }
}
