//! Read-through / write-through view of one entity section.
//!
//! # Invariants
//! - Writes reach the document first; the store is updated only after the
//!   document write succeeded.
//! - A store failure after a document write marks the view `Stale` and the
//!   call still succeeds.
//! - Reads are served from the store only while it is `Populated` and
//!   non-empty; otherwise the document is read and mirrored.

use super::mapping::CachedEntity;
use super::rows;
use super::CacheResult;
use crate::document::facade::ProjectDocument;
use crate::document::DocResult;
use log::{info, warn};
use rusqlite::Connection;
use std::marker::PhantomData;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing is known about the store contents yet.
    Unknown,
    /// The store mirrors the document section.
    Populated,
    /// A mirror step failed; the next read repopulates from the document.
    Stale,
}

pub struct CachedSection<'a, E: CachedEntity> {
    document: &'a ProjectDocument,
    conn: &'a Connection,
    state: CacheState,
    _entity: PhantomData<E>,
}

impl<'a, E: CachedEntity> CachedSection<'a, E> {
    pub fn new(document: &'a ProjectDocument, conn: &'a Connection) -> Self {
        Self {
            document,
            conn,
            state: CacheState::Unknown,
            _entity: PhantomData,
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn read_all(&mut self) -> CacheResult<Vec<E>> {
        if self.state == CacheState::Populated {
            match self.read_store() {
                Ok(Some(items)) => return Ok(items),
                Ok(None) => {}
                Err(err) => self.mark_stale("read", &err.to_string()),
            }
        }
        let items = self.document.try_read_all::<E>()?;
        self.populate(&items);
        Ok(items)
    }

    pub fn read(&mut self, id: &str) -> CacheResult<Option<E>> {
        if self.state == CacheState::Populated {
            match rows::select_one::<E>(self.conn, id) {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => {}
                Err(err) => self.mark_stale("read", &err.to_string()),
            }
        }
        let items = self.read_all()?;
        Ok(E::find(&items, id).cloned())
    }

    /// Creates `item` with a fresh id in the document, then mirrors it.
    pub fn add(&mut self, item: E) -> CacheResult<E> {
        let stored = self.document.add(item)?;
        self.mirror(|conn| rows::upsert_record(conn, &stored));
        Ok(stored)
    }

    /// Replaces (or inserts) `item` in the document, then mirrors it.
    pub fn write(&mut self, item: &E) -> CacheResult<()> {
        self.document.upsert(item)?;
        self.mirror(|conn| rows::upsert_record(conn, item));
        Ok(())
    }

    pub fn update(&mut self, id: &str, patch: E::Patch) -> CacheResult<Option<E>> {
        let Some(updated) = self.document.update::<E>(id, patch)? else {
            return Ok(None);
        };
        self.mirror(|conn| rows::upsert_record(conn, &updated));
        Ok(Some(updated))
    }

    pub fn delete(&mut self, id: &str) -> CacheResult<bool> {
        if !self.document.delete::<E>(id)? {
            return Ok(false);
        }
        self.mirror(|conn| rows::delete_record(conn, E::table(), id).map(|_| ()));
        Ok(true)
    }

    /// Replaces the whole section in the document and the store.
    pub fn save_all(&mut self, items: &[E]) -> CacheResult<()> {
        self.document.save_all(items)?;
        self.mirror(|conn| {
            let tx = conn.unchecked_transaction()?;
            rows::replace_all(&tx, E::table(), &E::flatten(items))?;
            tx.commit()?;
            Ok(())
        });
        Ok(())
    }

    pub fn generate_id(&self) -> DocResult<String> {
        self.document.generate_id(E::KIND)
    }

    /// Empties this entity's table; the next read goes to the document.
    pub fn invalidate(&mut self) {
        self.state = CacheState::Unknown;
        let cleared = self
            .conn
            .execute(&format!("DELETE FROM {}", E::table().name), []);
        if let Err(err) = cleared {
            self.mark_stale("invalidate", &err.to_string());
        }
    }

    /// Re-reads the document and rewrites this entity's table.
    pub fn rebuild(&mut self) -> CacheResult<usize> {
        let items = self.document.try_read_all::<E>()?;
        let count = self.replace_store(&items)?;
        self.state = CacheState::Populated;
        Ok(count)
    }

    fn read_store(&self) -> CacheResult<Option<Vec<E>>> {
        if rows::count_rows(self.conn, E::table().name)? == 0 {
            return Ok(None);
        }
        Ok(Some(rows::select_all::<E>(self.conn)?))
    }

    fn replace_store(&self, items: &[E]) -> CacheResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let count = rows::replace_all(&tx, E::table(), &E::flatten(items))?;
        tx.commit()?;
        Ok(count)
    }

    fn populate(&mut self, items: &[E]) {
        let started = Instant::now();
        match self.replace_store(items) {
            Ok(count) => {
                self.state = CacheState::Populated;
                info!(
                    "event=cache_populate module=cache status=ok table={} rows={} duration_ms={}",
                    E::table().name,
                    count,
                    started.elapsed().as_millis()
                );
            }
            Err(err) => self.mark_stale("populate", &err.to_string()),
        }
    }

    fn mirror(&mut self, op: impl FnOnce(&Connection) -> CacheResult<()>) {
        if let Err(err) = op(self.conn) {
            self.mark_stale("mirror", &err.to_string());
        }
    }

    fn mark_stale(&mut self, step: &str, error: &str) {
        self.state = CacheState::Stale;
        warn!(
            "event=cache_mirror module=cache status=error table={} step={} error={}",
            E::table().name,
            step,
            error
        );
    }
}
