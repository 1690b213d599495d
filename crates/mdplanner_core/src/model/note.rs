//! Free-form note records.
//!
//! # Invariants
//! - `content` is the stored body. `paragraphs` and `custom_sections` are
//!   always the structure read from it; editing the structure re-renders
//!   `content` and switches the note to enhanced mode.

use super::{Entity, EntityKind};
use crate::markdown::enhanced;
use serde::{Deserialize, Serialize};

/// How a note is edited: as one body, or as paragraphs and sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteMode {
    #[default]
    Simple,
    Enhanced,
}

impl NoteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Enhanced => "enhanced",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "enhanced" => Self::Enhanced,
            _ => Self::Simple,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphKind {
    Text,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteParagraph {
    /// `para_N`, numbered by position.
    pub id: String,
    pub kind: ParagraphKind,
    pub content: String,
    /// Fence language of a code paragraph.
    pub language: Option<String>,
    pub order: usize,
}

impl NoteParagraph {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind: ParagraphKind::Text,
            content: content.into(),
            language: None,
            order: 0,
        }
    }

    pub fn code(language: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind: ParagraphKind::Code,
            content: content.into(),
            language: language.map(str::to_string),
            order: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTab {
    pub id: String,
    pub title: String,
    pub content: Vec<NoteParagraph>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub title: String,
    /// `success`, `failed` or `pending`.
    pub status: String,
    pub date: Option<String>,
    pub content: Vec<NoteParagraph>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "kebab-case")]
pub enum SectionLayout {
    Tabs(Vec<NoteTab>),
    Timeline(Vec<TimelineItem>),
    SplitView(Vec<Vec<NoteParagraph>>),
}

impl SectionLayout {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Tabs(_) => "tabs",
            Self::Timeline(_) => "timeline",
            Self::SplitView(_) => "split-view",
        }
    }
}

/// Block of a note body delimited by `Custom Section` comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSection {
    pub id: String,
    pub title: String,
    pub order: usize,
    #[serde(flatten)]
    pub layout: SectionLayout,
}

/// Titled markdown note with revision metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// RFC 3339 timestamp, empty when the document never recorded one.
    pub created_at: String,
    pub updated_at: String,
    /// Incremented by one on every update through the facade.
    pub revision: u32,
    pub mode: NoteMode,
    pub paragraphs: Vec<NoteParagraph>,
    pub custom_sections: Vec<CustomSection>,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut note = Self {
            id: String::new(),
            title: title.into(),
            content: content.into(),
            created_at: String::new(),
            updated_at: String::new(),
            revision: 1,
            mode: NoteMode::Simple,
            paragraphs: Vec::new(),
            custom_sections: Vec::new(),
        };
        note.refresh_structure();
        note
    }

    /// Enhanced note whose body is rendered from `paragraphs` and
    /// `sections`.
    pub fn enhanced(
        title: impl Into<String>,
        paragraphs: Vec<NoteParagraph>,
        sections: Vec<CustomSection>,
    ) -> Self {
        let mut note = Note::new(title, "");
        note.set_structure(paragraphs, sections);
        note
    }

    /// Re-reads `paragraphs` and `custom_sections` from `content`.
    pub fn refresh_structure(&mut self) {
        (self.paragraphs, self.custom_sections) = enhanced::parse_body(&self.content);
    }

    fn set_structure(&mut self, paragraphs: Vec<NoteParagraph>, sections: Vec<CustomSection>) {
        self.content = enhanced::render_body(&paragraphs, &sections);
        self.mode = NoteMode::Enhanced;
        self.refresh_structure();
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mode: Option<NoteMode>,
    /// Replacing structure re-renders the body.
    pub paragraphs: Option<Vec<NoteParagraph>>,
    pub custom_sections: Option<Vec<CustomSection>>,
}

impl Entity for Note {
    const KIND: EntityKind = EntityKind::Note;
    type Patch = NotePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
            self.refresh_structure();
        }
        if patch.paragraphs.is_some() || patch.custom_sections.is_some() {
            let paragraphs = patch.paragraphs.unwrap_or_else(|| self.paragraphs.clone());
            let sections = patch
                .custom_sections
                .unwrap_or_else(|| self.custom_sections.clone());
            self.set_structure(paragraphs, sections);
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
    }

    fn on_create(&mut self, now: &str) {
        self.created_at = now.to_string();
        self.updated_at = now.to_string();
        self.revision = 1;
    }

    fn on_update(&mut self, now: &str) {
        self.updated_at = now.to_string();
        self.revision = self.revision.saturating_add(1);
    }
}
