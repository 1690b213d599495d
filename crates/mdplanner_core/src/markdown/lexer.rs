//! Line classification for the project document.
//!
//! Every line is kept verbatim; classification only looks at its trimmed
//! text and its indentation width.

use super::attrs::split_trailing_attrs;

/// Parsed `- [ ] (id) title {attrs}` checkbox line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLine<'a> {
    pub completed: bool,
    pub id: Option<&'a str>,
    pub title: &'a str,
    pub attrs: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// `<!-- ... -->` on a single line; carries the trimmed inner text.
    Comment(&'a str),
    Heading { level: usize, text: &'a str },
    Task(TaskLine<'a>),
    /// `- `, `* ` or `+ ` bullet that is not a checkbox.
    Bullet(&'a str),
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub raw: &'a str,
    /// Leading whitespace width; a tab counts as four columns.
    pub indent: usize,
    pub kind: LineKind<'a>,
}

impl<'a> Line<'a> {
    pub fn text(&self) -> &'a str {
        self.raw.trim()
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.kind, LineKind::Blank)
    }

    pub fn heading(&self, level: usize) -> Option<&'a str> {
        match self.kind {
            LineKind::Heading { level: l, text } if l == level => Some(text),
            _ => None,
        }
    }
}

pub fn tokenize(content: &str) -> Vec<Line<'_>> {
    content.lines().map(classify).collect()
}

pub fn classify(raw: &str) -> Line<'_> {
    let indent = raw
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    let text = raw.trim();
    Line {
        raw,
        indent,
        kind: classify_text(text),
    }
}

fn classify_text(text: &str) -> LineKind<'_> {
    if text.is_empty() {
        return LineKind::Blank;
    }
    if let Some(inner) = text
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
    {
        return LineKind::Comment(inner.trim());
    }
    if let Some(heading) = parse_heading(text) {
        return heading;
    }
    if let Some(task) = parse_task_line(text) {
        return LineKind::Task(task);
    }
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = text.strip_prefix(marker) {
            return LineKind::Bullet(rest.trim());
        }
    }
    LineKind::Text
}

fn parse_heading(text: &str) -> Option<LineKind<'_>> {
    let level = text.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &text[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some(LineKind::Heading {
        level,
        text: rest.trim(),
    })
}

fn parse_task_line(text: &str) -> Option<TaskLine<'_>> {
    let rest = text.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let completed = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix(']')?;
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    let mut rest = rest.trim();
    let mut id = None;
    if let Some(inner) = rest.strip_prefix('(') {
        if let Some(close) = inner.find(')') {
            let candidate = inner[..close].trim();
            if !candidate.is_empty() {
                id = Some(candidate);
                rest = inner[close + 1..].trim();
            }
        }
    }
    let (title, attrs) = split_trailing_attrs(rest);
    Some(TaskLine {
        completed,
        id,
        title: title.trim(),
        attrs,
    })
}
