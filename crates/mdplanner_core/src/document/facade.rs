//! Typed access to every entity section of one project document.
//!
//! # Responsibility
//! - Provide uniform read / add / update / delete / save / generate-id
//!   operations per entity type.
//! - Keep every mutation a single locked read-modify-write so concurrent
//!   callers in the process never lose updates.
//!
//! # Invariants
//! - Only the target section is re-encoded; other bytes are preserved.
//! - Missing records are reported as `None` / `false`, never as errors.
//! - Reads that hit an IO error log it and return an empty list; mutations
//!   propagate IO errors.

use super::ids::{self as allocator, IdCounterStore};
use super::write_safety::{DocumentFile, LockState};
use super::{Clock, DocResult, DocumentError, SystemClock};
use crate::config::WriteSafetyConfig;
use crate::markdown::section::SourceDocument;
use crate::markdown::tasks::sections_or_default;
use crate::markdown::{ids as scan, SectionCodec};
use crate::model::note::{Note, NotePatch};
use crate::model::task::{Task, TaskPatch};
use crate::model::{max_numeric_id, EntityKind};
use log::{debug, error};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

pub struct ProjectDocument {
    file: DocumentFile,
    clock: Arc<dyn Clock>,
    counters: Option<Mutex<Box<dyn IdCounterStore>>>,
}

/// Decoded section plus everything needed to write it back.
struct SectionView<'c, E> {
    source: SourceDocument<'c>,
    items: Vec<E>,
}

impl<'c, E: SectionCodec> SectionView<'c, E> {
    fn load(content: &'c str) -> Self {
        let source = SourceDocument::parse(content);
        let items = E::decode(source.section_body(E::SECTION));
        Self { source, items }
    }

    fn render(&self) -> String {
        let rendered = E::encode(&self.items, self.source.section_body(E::SECTION));
        self.source.replace_section(E::SECTION, &rendered)
    }
}

/// Record `id` as it reads back from `rendered`.
fn persisted<E: SectionCodec>(rendered: &str, id: &str) -> Option<E> {
    let view = SectionView::<E>::load(rendered);
    E::find(&view.items, id).cloned()
}

impl ProjectDocument {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, WriteSafetyConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: WriteSafetyConfig) -> Self {
        Self {
            file: DocumentFile::open(path, config),
            clock: Arc::new(SystemClock),
            counters: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persists reserved ids so numbering survives restarts even after the
    /// highest record was deleted.
    pub fn with_counter_store(mut self, store: Box<dyn IdCounterStore>) -> Self {
        self.counters = Some(Mutex::new(store));
        self
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file(&self) -> &DocumentFile {
        &self.file
    }

    pub fn now(&self) -> String {
        self.clock.now_rfc3339()
    }

    pub fn read_content(&self) -> DocResult<Option<String>> {
        self.file.read()
    }

    /// All records of `E`; a missing document yields an empty list.
    pub fn try_read_all<E: SectionCodec>(&self) -> DocResult<Vec<E>> {
        let content = self.file.read()?.unwrap_or_default();
        Ok(SectionView::<E>::load(&content).items)
    }

    pub fn read_all<E: SectionCodec>(&self) -> Vec<E> {
        match self.try_read_all::<E>() {
            Ok(items) => items,
            Err(err) => {
                error!(
                    "event=doc_read module=document status=error kind={} error={}",
                    E::KIND,
                    err
                );
                Vec::new()
            }
        }
    }

    pub fn read<E: SectionCodec>(&self, id: &str) -> Option<E> {
        let items = self.read_all::<E>();
        E::find(&items, id).cloned()
    }

    /// Adds `item` under a freshly reserved id and returns the record as
    /// it reads back from the written document.
    pub fn add<E: SectionCodec>(&self, mut item: E) -> DocResult<E> {
        let now = self.now();
        self.file.locked(|doc| {
            let content = doc.read()?.unwrap_or_default();
            let mut view = SectionView::<E>::load(&content);
            let document_max = scan::max_id(&content, E::KIND).max(max_numeric_id(&view.items));
            let id = self.reserve_id(E::KIND, document_max, doc.state());
            item.set_id(id.clone());
            item.fill_nested_ids(&mut || self.reserve_id(E::KIND, document_max, doc.state()));
            item.on_create(&now);
            E::insert(&mut view.items, item);
            let rendered = view.render();
            let stored = persisted::<E>(&rendered, &id).ok_or_else(|| {
                DocumentError::InvalidRecord(format!("{} {id} missing after insert", E::KIND))
            })?;
            doc.commit(&rendered)?;
            debug!(
                "event=doc_mutate module=document status=ok op=add kind={} id={}",
                E::KIND,
                id
            );
            Ok(stored)
        })
    }

    /// Merges `patch` into record `id` and returns the record as written;
    /// `None` when it does not exist.
    pub fn update<E: SectionCodec>(&self, id: &str, patch: E::Patch) -> DocResult<Option<E>> {
        let now = self.now();
        self.file.locked(|doc| {
            let content = doc.read()?.unwrap_or_default();
            let mut view = SectionView::<E>::load(&content);
            let Some(item) = E::find_mut(&mut view.items, id) else {
                return Ok(None);
            };
            item.apply_patch(patch);
            item.on_update(&now);
            let rendered = view.render();
            let updated = persisted::<E>(&rendered, id).ok_or_else(|| {
                DocumentError::InvalidRecord(format!("{} {id} missing after update", E::KIND))
            })?;
            doc.commit(&rendered)?;
            debug!(
                "event=doc_mutate module=document status=ok op=update kind={} id={}",
                E::KIND,
                id
            );
            Ok(Some(updated))
        })
    }

    /// Removes record `id` (and, for tasks, its subtree).
    pub fn delete<E: SectionCodec>(&self, id: &str) -> DocResult<bool> {
        self.file.locked(|doc| {
            let content = doc.read()?.unwrap_or_default();
            let mut view = SectionView::<E>::load(&content);
            if !E::remove(&mut view.items, id) {
                return Ok(false);
            }
            doc.commit(&view.render())?;
            debug!(
                "event=doc_mutate module=document status=ok op=delete kind={} id={}",
                E::KIND,
                id
            );
            Ok(true)
        })
    }

    /// Replaces the whole section of `E` with `items`.
    pub fn save_all<E: SectionCodec>(&self, items: &[E]) -> DocResult<()> {
        self.file.locked(|doc| {
            let content = doc.read()?.unwrap_or_default();
            let mut view = SectionView::<E>::load(&content);
            view.items = items.to_vec();
            doc.commit(&view.render())
        })
    }

    /// Replaces record `item.id()` in place, or inserts it when absent.
    pub fn upsert<E: SectionCodec>(&self, item: &E) -> DocResult<()> {
        self.file.locked(|doc| {
            let content = doc.read()?.unwrap_or_default();
            let mut view = SectionView::<E>::load(&content);
            match E::find_mut(&mut view.items, item.id()) {
                Some(existing) => *existing = item.clone(),
                None => E::insert(&mut view.items, item.clone()),
            }
            doc.commit(&view.render())
        })
    }

    /// Peeks at the id the next `add` of `kind` would receive.
    pub fn generate_id(&self, kind: EntityKind) -> DocResult<String> {
        self.file.locked(|doc| {
            let content = doc.read()?.unwrap_or_default();
            let document_max = scan::max_id(&content, kind);
            let persisted = self
                .counters
                .as_ref()
                .and_then(|store| store.lock().load(kind))
                .unwrap_or(0);
            let next = allocator::peek(kind, document_max, doc.state(), persisted);
            Ok(kind.format_id(next))
        })
    }

    fn reserve_id(&self, kind: EntityKind, document_max: u64, state: &mut LockState) -> String {
        match &self.counters {
            Some(store) => {
                let mut store = store.lock();
                allocator::reserve(kind, document_max, state, Some(&mut **store))
            }
            None => allocator::reserve(kind, document_max, state, None),
        }
    }

    pub fn read_tasks(&self) -> Vec<Task> {
        self.read_all::<Task>()
    }

    /// Board column names in document order (defaults when absent).
    pub fn read_sections(&self) -> Vec<String> {
        match self.file.read() {
            Ok(content) => {
                let content = content.unwrap_or_default();
                let source = SourceDocument::parse(&content);
                sections_or_default(source.section_body(Task::SECTION))
            }
            Err(err) => {
                error!(
                    "event=doc_read module=document status=error kind=task error={}",
                    err
                );
                sections_or_default(&[])
            }
        }
    }

    pub fn add_task(&self, task: Task) -> DocResult<Task> {
        self.add(task)
    }

    pub fn update_task(&self, id: &str, patch: TaskPatch) -> DocResult<Option<Task>> {
        self.update::<Task>(id, patch)
    }

    pub fn delete_task(&self, id: &str) -> DocResult<bool> {
        self.delete::<Task>(id)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> DocResult<()> {
        self.save_all(tasks)
    }

    pub fn read_notes(&self) -> Vec<Note> {
        self.read_all::<Note>()
    }

    pub fn add_note(&self, title: &str, content: &str) -> DocResult<Note> {
        self.add(Note::new(title, content))
    }

    pub fn update_note(&self, id: &str, patch: NotePatch) -> DocResult<Option<Note>> {
        self.update::<Note>(id, patch)
    }

    pub fn delete_note(&self, id: &str) -> DocResult<bool> {
        self.delete::<Note>(id)
    }
}
