//! Notes section codec.
//!
//! Each note is a `## Title` heading followed by a metadata comment and a
//! free markdown body:
//!
//! ```text
//! ## Title
//!
//! <!-- id: note_1 | created: <ts> | updated: <ts> | rev: 3 -->
//! body...
//! ```
//!
//! Enhanced notes append `| mode: enhanced` to the metadata comment; their
//! paragraph and section structure is read back from the body.
//!
//! Legacy notes carry only `<!-- id: note_1 -->`. A `## ` heading only
//! starts a new note when an id comment follows within a few lines and it
//! is outside a `<!-- Custom Section: X -->` ... `<!-- End Custom Section -->`
//! block, so level-two headings inside a body stay in the body.

use super::lexer::{Line, LineKind};
use super::{ids::comment_id, section_header, SectionCodec};
use crate::model::note::{Note, NoteMode};
use crate::model::{fill_missing_ids, Entity};
use once_cell::sync::Lazy;
use regex::Regex;

static META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^id:\s*(\S+)\s*\|\s*created:\s*([^|]*?)\s*\|\s*updated:\s*([^|]*?)\s*\|\s*rev:\s*(\d+)(?:\s*\|\s*mode:\s*(\w+))?$",
    )
    .expect("note metadata pattern compiles")
});

/// Lines after a heading searched for an id comment.
const ID_LOOKAHEAD: usize = 4;

#[derive(Debug, Default, PartialEq)]
struct NoteMeta {
    id: String,
    created_at: String,
    updated_at: String,
    revision: u32,
    mode: NoteMode,
}

fn parse_meta(inner: &str) -> Option<NoteMeta> {
    if let Some(caps) = META_RE.captures(inner) {
        return Some(NoteMeta {
            id: caps[1].to_string(),
            created_at: caps[2].to_string(),
            updated_at: caps[3].to_string(),
            revision: caps[4].parse().unwrap_or(1),
            mode: caps
                .get(5)
                .map(|m| NoteMode::parse(m.as_str()))
                .unwrap_or_default(),
        });
    }
    let id = comment_id(inner)?;
    Some(NoteMeta {
        id: id.to_string(),
        revision: 1,
        ..NoteMeta::default()
    })
}

fn is_note_id_comment(line: &Line<'_>) -> bool {
    match line.kind {
        LineKind::Comment(inner) => comment_id(inner)
            .map(|id| Note::KIND.numeric_suffix(id).is_some())
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether the heading at `idx` opens a new note.
fn starts_note(body: &[Line<'_>], idx: usize, first: bool) -> bool {
    if body[idx].heading(2).is_none() {
        return false;
    }
    if first {
        return true;
    }
    body[idx + 1..]
        .iter()
        .take(ID_LOOKAHEAD)
        .take_while(|line| line.heading(2).is_none())
        .any(is_note_id_comment)
}

fn decode_note(title: &str, lines: &[Line<'_>]) -> Note {
    let mut note = Note::new(title, "");
    let mut meta_line = None;
    for (idx, line) in lines.iter().enumerate() {
        if let LineKind::Comment(inner) = line.kind {
            if let Some(meta) = parse_meta(inner) {
                note.id = meta.id;
                note.created_at = meta.created_at;
                note.updated_at = meta.updated_at;
                note.revision = meta.revision;
                note.mode = meta.mode;
                meta_line = Some(idx);
                break;
            }
        }
    }
    let body: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != meta_line)
        .map(|(_, line)| line.raw)
        .collect();
    note.content = body.join("\n").trim().to_string();
    note.refresh_structure();
    note
}

impl SectionCodec for Note {
    const SECTION: &'static str = "Notes";

    fn decode(body: &[Line<'_>]) -> Vec<Self> {
        let mut starts = Vec::new();
        let mut in_custom = false;
        for (idx, line) in body.iter().enumerate() {
            if let LineKind::Comment(inner) = line.kind {
                if inner.starts_with("Custom Section:") {
                    in_custom = true;
                } else if inner == "End Custom Section" {
                    in_custom = false;
                }
            }
            if !in_custom && starts_note(body, idx, starts.is_empty()) {
                starts.push(idx);
            }
        }

        let mut notes: Vec<Note> = starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(body.len());
                let title = body[start].heading(2).unwrap_or_default();
                decode_note(title, &body[start + 1..end])
            })
            .collect();
        fill_missing_ids(&mut notes);
        notes
    }

    fn encode(items: &[Self], _existing: &[Line<'_>]) -> String {
        let mut out = section_header("Notes");
        for note in items {
            let mode = match note.mode {
                NoteMode::Enhanced => " | mode: enhanced",
                NoteMode::Simple => "",
            };
            out.push_str(&format!(
                "## {}\n\n<!-- id: {} | created: {} | updated: {} | rev: {}{} -->\n",
                note.title, note.id, note.created_at, note.updated_at, note.revision, mode
            ));
            if !note.content.is_empty() {
                out.push_str(&note.content);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::lexer::tokenize;
    use crate::model::note::SectionLayout;

    #[test]
    fn metadata_and_legacy_ids() {
        let body = tokenize(
            "## First\n\n<!-- id: note_1 | created: 2024-01-01T00:00:00Z | updated: 2024-01-02T00:00:00Z | rev: 3 -->\nHello\n\n## Second\n<!-- id: note_4 -->\nWorld\n",
        );
        let notes = Note::decode(&body);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].revision, 3);
        assert_eq!(notes[0].updated_at, "2024-01-02T00:00:00Z");
        assert_eq!(notes[0].content, "Hello");
        assert_eq!(notes[1].id, "note_4");
        assert_eq!(notes[1].revision, 1);
    }

    #[test]
    fn inner_headings_stay_in_body() {
        let body = tokenize(
            "## Design\n\n<!-- id: note_1 -->\nIntro\n\n<!-- Custom Section: Details -->\n## Details\n\nMore text\n",
        );
        let notes = Note::decode(&body);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].content.contains("## Details"));
        assert!(notes[0].content.contains("More text"));
    }

    #[test]
    fn custom_block_shields_headings_with_ids() {
        let body = tokenize(
            "## Outer\n<!-- id: note_1 -->\n<!-- Custom Section: Log -->\n## Entry\n<!-- id: note_9 -->\n<!-- End Custom Section -->\n",
        );
        let notes = Note::decode(&body);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].content.contains("## Entry"));
    }

    #[test]
    fn note_without_id_gets_next_number() {
        let notes = Note::decode(&tokenize("## A\n<!-- id: note_2 -->\n\n## B\n<!-- id: note_x -->\n"));
        assert_eq!(notes.len(), 1);
        let notes = Note::decode(&tokenize("## Only\n\ntext\n"));
        assert_eq!(notes[0].id, "note_1");
    }

    #[test]
    fn enhanced_mode_and_sections_round_trip() {
        let body = tokenize(
            "## Launch\n\n<!-- id: note_2 | created: a | updated: b | rev: 2 | mode: enhanced -->\nIntro\n\n<!-- Custom Section: Steps -->\n<!-- section-id: section_1, type: timeline -->\n\n## Beta (success)\n\nDone.\n\n<!-- End Custom Section -->\n",
        );
        let notes = Note::decode(&body);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].mode, NoteMode::Enhanced);
        assert_eq!(notes[0].paragraphs.len(), 1);
        assert_eq!(notes[0].custom_sections.len(), 1);
        match &notes[0].custom_sections[0].layout {
            SectionLayout::Timeline(items) => {
                assert_eq!(items[0].title, "Beta");
                assert_eq!(items[0].status, "success");
            }
            other => panic!("unexpected layout {other:?}"),
        }

        let encoded = Note::encode(&notes, &body);
        assert!(encoded.contains("rev: 2 | mode: enhanced -->"));
        let doc = crate::markdown::section::SourceDocument::parse(&encoded);
        assert_eq!(Note::decode(doc.section_body("Notes")), notes);
    }
}
