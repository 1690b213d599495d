//! `{key: value; key: value}` attribute blocks.
//!
//! # Invariants
//! - Separators (`;` between pairs, `,` inside lists and objects) only
//!   split at bracket depth zero and outside double quotes.
//! - Scalar values holding a separator, a bracket or a quote are written
//!   as `"..."` with `\"` and `\\` escapes, and read back verbatim.
//! - A pair with an unbalanced bracket is dropped; parsing resumes at the
//!   next separator after it.

/// Characters that force a scalar value into quotes.
const RESERVED: &[char] = &[';', ',', '{', '}', '[', ']', '"'];

/// Bracket and quote state while scanning attribute text.
///
/// A `"` only opens a quoted value at the start of a token, so stray
/// inch marks in hand-written values stay literal.
#[derive(Debug, Clone, Copy)]
struct Nesting {
    depth: usize,
    quoted: bool,
    escaped: bool,
    token_start: bool,
}

impl Default for Nesting {
    fn default() -> Self {
        Self {
            depth: 0,
            quoted: false,
            escaped: false,
            token_start: true,
        }
    }
}

impl Nesting {
    /// Feeds one character; returns true when it sits at depth zero
    /// outside quotes and is not itself a bracket or quote.
    fn feed(&mut self, ch: char) -> bool {
        if self.quoted {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.quoted = false;
            }
            return false;
        }
        match ch {
            '"' if self.token_start => {
                self.quoted = true;
                self.token_start = false;
                false
            }
            '{' | '[' => {
                self.depth += 1;
                self.token_start = true;
                false
            }
            '}' | ']' => {
                self.depth = self.depth.saturating_sub(1);
                self.token_start = false;
                false
            }
            ':' | ',' | ';' => {
                self.token_start = true;
                self.depth == 0
            }
            c if c.is_whitespace() => self.depth == 0,
            _ => {
                self.token_start = false;
                self.depth == 0
            }
        }
    }

    fn balanced(&self) -> bool {
        self.depth == 0 && !self.quoted
    }
}

/// Wraps `value` in quotes when it would otherwise break the block.
pub fn quote_value(value: &str) -> String {
    if !value.contains(RESERVED) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Decodes a value that is exactly one quoted string.
pub fn unquote(value: &str) -> Option<String> {
    let inner = value.strip_prefix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => out.push(chars.next()?.1),
            '"' => return (idx + 1 == inner.len()).then_some(out),
            _ => out.push(ch),
        }
    }
    None
}

fn scalar(value: &str) -> String {
    unquote(value).unwrap_or_else(|| value.to_string())
}

/// Splits `input` on `sep` wherever `{}`/`[]` nesting depth is zero and
/// no quoted value is open.
pub fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut scan = Nesting::default();
    let mut start = 0usize;
    for (idx, ch) in input.char_indices() {
        if scan.feed(ch) && ch == sep {
            parts.push(&input[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Parses the inside of an attribute block into ordered key/value pairs.
///
/// Pairs with an empty key or empty value are skipped. Quoted scalar
/// values are unescaped; lists and objects are kept raw for
/// [`parse_list`] and [`parse_object`].
pub fn parse_attrs(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut key: Option<String> = None;
    let mut current = String::new();
    let mut scan = Nesting::default();
    let mut pair_start = 0usize;

    for (idx, ch) in input.char_indices() {
        let top = scan.feed(ch);
        match ch {
            ':' if top && key.is_none() => {
                key = Some(current.trim().to_string());
                current.clear();
            }
            ';' if top => {
                push_pair(&mut pairs, key.take(), &current);
                current.clear();
                pair_start = idx + 1;
            }
            _ => current.push(ch),
        }
    }

    if !scan.balanced() {
        let tail = &input[pair_start..];
        if let Some(pos) = tail.find(';') {
            pairs.extend(parse_attrs(&tail[pos + 1..]));
        }
        return pairs;
    }

    push_pair(&mut pairs, key, &current);
    pairs
}

fn push_pair(pairs: &mut Vec<(String, String)>, key: Option<String>, value: &str) {
    let Some(key) = key else {
        return;
    };
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return;
    }
    pairs.push((key, scalar(value)));
}

/// Returns the value for `key` (last occurrence wins).
pub fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Parses `[a, b, c]` (brackets optional) into trimmed, non-empty items.
pub fn parse_list(value: &str) -> Vec<String> {
    let inner = strip_wrapping(value.trim(), '[', ']');
    split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(scalar)
        .collect()
}

/// Parses `{x: 10, y: 20}` into ordered pairs.
pub fn parse_object(value: &str) -> Vec<(String, String)> {
    let inner = strip_wrapping(value.trim(), '{', '}');
    split_top_level(inner, ',')
        .into_iter()
        .filter_map(|field| {
            let (key, value) = field.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), scalar(value.trim())))
        })
        .collect()
}

fn strip_wrapping(value: &str, open: char, close: char) -> &str {
    value
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .unwrap_or(value)
        .trim()
}

/// Splits a trailing balanced `{...}` block off a heading or task title.
///
/// Returns the title and the block's inner text. A block is only
/// recognised when it closes the line and is preceded by the title; the
/// leftmost such block wins.
pub fn split_trailing_attrs(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return (trimmed, None);
    }
    for (start, _) in trimmed.match_indices('{') {
        let title = trimmed[..start].trim_end();
        if title.is_empty() {
            continue;
        }
        if closes_at_end(&trimmed[start..]) {
            return (title, Some(&trimmed[start + 1..trimmed.len() - 1]));
        }
    }
    (trimmed, None)
}

fn closes_at_end(block: &str) -> bool {
    let mut scan = Nesting::default();
    for (idx, ch) in block.char_indices() {
        scan.feed(ch);
        if scan.balanced() {
            return idx + ch.len_utf8() == block.len();
        }
    }
    false
}

/// Ordered builder for an attribute block.
#[derive(Debug, Default)]
pub struct AttrWriter {
    pairs: Vec<(String, String)>,
}

impl AttrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar value, quoting it when needed.
    pub fn field(self, key: &str, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return self;
        }
        self.raw(key, quote_value(value))
    }

    /// Adds an already rendered list or object.
    pub fn raw(mut self, key: &str, rendered: impl Into<String>) -> Self {
        let rendered = rendered.into();
        if !rendered.trim().is_empty() {
            self.pairs.push((key.to_string(), rendered));
        }
        self
    }

    pub fn opt(self, key: &str, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    pub fn list(self, key: &str, items: &[String]) -> Self {
        let quoted: Vec<String> = items.iter().map(|item| quote_value(item.trim())).collect();
        self.raw_list(key, &quoted)
    }

    /// List of already rendered items, such as objects.
    pub fn raw_list(self, key: &str, rendered: &[String]) -> Self {
        if rendered.is_empty() {
            return self;
        }
        self.raw(key, format!("[{}]", rendered.join(", ")))
    }

    pub fn object(self, key: &str, fields: &[(&str, String)]) -> Self {
        self.raw(key, render_object(fields))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders ` {k: v; k: v}` with a leading space, or nothing when empty.
    pub fn render_suffix(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let body = self
            .pairs
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        format!(" {{{body}}}")
    }

    /// Suffix for a line whose text is `title`.
    ///
    /// An empty ` {}` block is written when the title alone would read
    /// back as carrying attributes.
    pub fn render_suffix_after(&self, title: &str) -> String {
        if self.pairs.is_empty() && split_trailing_attrs(title).1.is_some() {
            return " {}".to_string();
        }
        self.render_suffix()
    }
}

pub fn render_object(fields: &[(&str, String)]) -> String {
    let body = fields
        .iter()
        .map(|(key, value)| format!("{key}: {}", quote_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

#[cfg(test)]
mod tests {
    use super::{
        parse_attrs, parse_list, parse_object, quote_value, split_trailing_attrs, unquote,
        AttrWriter,
    };

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn nested_braces_do_not_split_pairs() {
        let pairs = parse_attrs("position: {x: 10, y: 20}; color: yellow");
        assert_eq!(
            pairs,
            vec![pair("position", "{x: 10, y: 20}"), pair("color", "yellow")]
        );
    }

    #[test]
    fn lists_keep_commas() {
        let pairs = parse_attrs("tag: [launch, infra]; priority: 1");
        assert_eq!(pairs[0], pair("tag", "[launch, infra]"));
        assert_eq!(parse_list(&pairs[0].1), vec!["launch", "infra"]);
    }

    #[test]
    fn unbalanced_pair_is_dropped() {
        let pairs = parse_attrs("position: {x: 10; color: yellow");
        assert_eq!(pairs, vec![pair("color", "yellow")]);
    }

    #[test]
    fn empty_values_are_skipped() {
        let pairs = parse_attrs("kpi: ; status: active;");
        assert_eq!(pairs, vec![pair("status", "active")]);
    }

    #[test]
    fn object_fields_parse_in_order() {
        assert_eq!(
            parse_object("{x: 10, y: 20}"),
            vec![pair("x", "10"), pair("y", "20")]
        );
    }

    #[test]
    fn trailing_block_needs_a_title() {
        assert_eq!(
            split_trailing_attrs("Ship v1 {priority: 1; tag: [launch, infra]}"),
            ("Ship v1", Some("priority: 1; tag: [launch, infra]"))
        );
        assert_eq!(split_trailing_attrs("{only: attrs}"), ("{only: attrs}", None));
        assert_eq!(split_trailing_attrs("Plain title"), ("Plain title", None));
    }

    #[test]
    fn braces_inside_the_title_stay_in_the_title() {
        assert_eq!(split_trailing_attrs("Fix {bug} {}"), ("Fix {bug}", Some("")));
        assert_eq!(
            split_trailing_attrs("Fix {bug} {priority: 2}"),
            ("Fix {bug}", Some("priority: 2"))
        );
        assert_eq!(
            split_trailing_attrs("Note {assignee: \"a}b\"}"),
            ("Note", Some("assignee: \"a}b\""))
        );
    }

    #[test]
    fn writer_skips_empty_values() {
        let rendered = AttrWriter::new()
            .field("status", "open")
            .opt("target", None::<&str>)
            .list("tag", &[])
            .render_suffix();
        assert_eq!(rendered, " {status: open}");
    }

    #[test]
    fn reserved_characters_are_quoted_and_recovered() {
        assert_eq!(quote_value("plain"), "plain");
        assert_eq!(quote_value("ann; bob"), "\"ann; bob\"");
        assert_eq!(quote_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(unquote("\"say \\\"hi\\\"\"").as_deref(), Some("say \"hi\""));
        assert_eq!(unquote("\"a\" and \"b\""), None);

        let suffix = AttrWriter::new()
            .field("assignee", "ann; bob")
            .list("tag", &["a, b".to_string(), "[x]".to_string()])
            .field("milestone", "v{2}")
            .render_suffix();
        let line = format!("Title{suffix}");
        let (_, inner) = split_trailing_attrs(&line);
        let pairs = parse_attrs(inner.unwrap());
        assert_eq!(pairs[0], pair("assignee", "ann; bob"));
        assert_eq!(parse_list(&pairs[1].1), vec!["a, b", "[x]"]);
        assert_eq!(pairs[2], pair("milestone", "v{2}"));
    }

    #[test]
    fn stray_quote_mid_value_is_literal() {
        let pairs = parse_attrs("size: 5\" screen; color: red");
        assert_eq!(pairs, vec![pair("size", "5\" screen"), pair("color", "red")]);
    }

    #[test]
    fn empty_block_guards_brace_titles() {
        let writer = AttrWriter::new();
        assert_eq!(writer.render_suffix_after("Fix {bug}"), " {}");
        assert_eq!(writer.render_suffix_after("Plain"), "");
        assert_eq!(
            AttrWriter::new().field("status", "open").render_suffix_after("Fix {bug}"),
            " {status: open}"
        );
    }
}
