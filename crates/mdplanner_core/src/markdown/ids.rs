//! Identifier scanning over raw document text.

use crate::model::EntityKind;
use once_cell::sync::Lazy;
use regex::Regex;

static TASK_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*- \[[ xX]\] \((\d+)\)").expect("task id pattern compiles")
});

static ID_COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s*id:\s*([A-Za-z][A-Za-z0-9_]*?)_(\d+)\b")
        .expect("id comment pattern compiles")
});

/// Highest numeric id of `kind` written anywhere in `content`.
///
/// Sticky notes also count the legacy `sticky_note_N` spelling.
pub fn max_id(content: &str, kind: EntityKind) -> u64 {
    match kind.id_prefix() {
        None => TASK_ID_RE
            .captures_iter(content)
            .filter_map(|caps| caps[1].parse::<u64>().ok())
            .max()
            .unwrap_or(0),
        Some(prefix) => ID_COMMENT_RE
            .captures_iter(content)
            .filter(|caps| {
                let found = &caps[1];
                found == prefix || (kind == EntityKind::StickyNote && found == "sticky_note")
            })
            .filter_map(|caps| caps[2].parse::<u64>().ok())
            .max()
            .unwrap_or(0),
    }
}

/// Extracts the id from a `<!-- id: X -->` comment body (`id: X`).
pub fn comment_id(inner: &str) -> Option<&str> {
    let rest = inner.strip_prefix("id:")?;
    let id = rest.split('|').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
