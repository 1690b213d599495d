//! Full synchronization of the query store from the project document.
//!
//! # Responsibility
//! - Create the store schema.
//! - Replace every (or selected) entity table from the document inside one
//!   transaction, recording the sync time in the same transaction.
//! - Drop and recreate the store on demand.
//!
//! # Invariants
//! - A failed sync leaves every table exactly as it was before.
//! - `last_sync` only changes when a sync commits.

use super::mapping::CachedEntity;
use super::{rows, CacheError, CacheResult};
use crate::db::schema::{self, ENTITY_TABLES};
use crate::document::facade::ProjectDocument;
use crate::model::billing::{Invoice, Quote, Rate, TimeEntry};
use crate::model::canvas::{
    Brief, BusinessModel, CapacityPlan, LeanCanvas, ProjectValue, RiskAnalysis, StrategicBuilder,
    Swot,
};
use crate::model::crm::{Contact, Deal, Interaction};
use crate::model::note::Note;
use crate::model::records::{
    C4Component, Company, Customer, Goal, Idea, Milestone, Mindmap, Retrospective, StickyNote,
};
use crate::model::task::Task;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::time::Instant;

pub use crate::db::migrations::META_LAST_SYNC;

pub const META_INITIALIZED: &str = "initialized";

/// Outcome of a full sync; errors are reported here, not returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub tables: usize,
    pub items: usize,
    pub duration_ms: u128,
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

type TableSyncer = fn(&Connection, &ProjectDocument) -> CacheResult<usize>;

fn sync_table<E: CachedEntity>(conn: &Connection, document: &ProjectDocument) -> CacheResult<usize> {
    let items = document.try_read_all::<E>()?;
    rows::replace_all(conn, E::table(), &E::flatten(&items))
}

fn syncer(table: &str) -> Option<TableSyncer> {
    let syncer: TableSyncer = match table {
        "tasks" => sync_table::<Task>,
        "notes" => sync_table::<Note>,
        "goals" => sync_table::<Goal>,
        "milestones" => sync_table::<Milestone>,
        "ideas" => sync_table::<Idea>,
        "retrospectives" => sync_table::<Retrospective>,
        "sticky_notes" => sync_table::<StickyNote>,
        "mindmaps" => sync_table::<Mindmap>,
        "c4_components" => sync_table::<C4Component>,
        "swot" => sync_table::<Swot>,
        "risk" => sync_table::<RiskAnalysis>,
        "lean_canvas" => sync_table::<LeanCanvas>,
        "business_model" => sync_table::<BusinessModel>,
        "project_value" => sync_table::<ProjectValue>,
        "brief" => sync_table::<Brief>,
        "capacity_plans" => sync_table::<CapacityPlan>,
        "strategic_builders" => sync_table::<StrategicBuilder>,
        "customers" => sync_table::<Customer>,
        "rates" => sync_table::<Rate>,
        "quotes" => sync_table::<Quote>,
        "invoices" => sync_table::<Invoice>,
        "companies" => sync_table::<Company>,
        "contacts" => sync_table::<Contact>,
        "deals" => sync_table::<Deal>,
        "interactions" => sync_table::<Interaction>,
        "time_entries" => sync_table::<TimeEntry>,
        _ => return None,
    };
    Some(syncer)
}

pub struct CacheSync<'a> {
    document: &'a ProjectDocument,
    conn: &'a mut Connection,
}

impl<'a> CacheSync<'a> {
    pub fn new(document: &'a ProjectDocument, conn: &'a mut Connection) -> Self {
        Self { document, conn }
    }

    /// Creates every entity table and marks the store initialized.
    pub fn init(&mut self) -> CacheResult<()> {
        schema::init_schema(self.conn)?;
        set_meta(self.conn, META_INITIALIZED, "true", &self.document.now())?;
        Ok(())
    }

    /// Replaces `tables` (all entity tables when `None`) from the document.
    pub fn full_sync(&mut self, tables: Option<&[&str]>) -> SyncResult {
        let started = Instant::now();
        let names: Vec<&str> = match tables {
            Some(names) => names.to_vec(),
            None => ENTITY_TABLES.iter().map(|def| def.name).collect(),
        };

        let mut result = SyncResult::default();
        match self.sync_in_transaction(&names) {
            Ok(items) => {
                result.tables = names.len();
                result.items = items;
            }
            Err(err) => result.errors.push(err.to_string()),
        }
        result.duration_ms = started.elapsed().as_millis();

        if result.is_ok() {
            info!(
                "event=full_sync module=cache status=ok tables={} items={} duration_ms={}",
                result.tables, result.items, result.duration_ms
            );
        } else {
            error!(
                "event=full_sync module=cache status=error duration_ms={} errors={}",
                result.duration_ms,
                result.errors.join("; ")
            );
        }
        result
    }

    fn sync_in_transaction(&mut self, names: &[&str]) -> CacheResult<usize> {
        let now = self.document.now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut items = 0;
        for name in names {
            let sync = syncer(name).ok_or_else(|| CacheError::UnknownTable(name.to_string()))?;
            match sync(&tx, self.document) {
                Ok(count) => items += count,
                Err(err) => {
                    error!(
                        "event=full_sync module=cache status=error table={} error={}",
                        name, err
                    );
                    return Err(err);
                }
            }
        }
        set_meta(&tx, META_LAST_SYNC, &now, &now)?;
        tx.commit()?;
        Ok(items)
    }

    /// Drops and recreates the entity tables, then runs a full sync.
    pub fn rebuild(&mut self) -> SyncResult {
        let reset = schema::drop_schema(self.conn)
            .and_then(|()| schema::init_schema(self.conn))
            .map_err(CacheError::from)
            .and_then(|()| delete_meta(self.conn, META_LAST_SYNC));
        if let Err(err) = reset {
            error!("event=cache_rebuild module=cache status=error error={}", err);
            return SyncResult {
                errors: vec![err.to_string()],
                ..SyncResult::default()
            };
        }
        self.full_sync(None)
    }

    /// True until a full sync has committed.
    pub fn needs_sync(&self) -> bool {
        match self.last_sync_time() {
            Ok(last) => last.is_none(),
            Err(_) => true,
        }
    }

    pub fn last_sync_time(&self) -> CacheResult<Option<String>> {
        get_meta(self.conn, META_LAST_SYNC)
    }
}

pub fn get_meta(conn: &Connection, key: &str) -> CacheResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM cache_meta WHERE key = ?1",
            params![key],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(value.flatten())
}

fn set_meta(conn: &Connection, key: &str, value: &str, now: &str) -> CacheResult<()> {
    conn.execute(
        "INSERT INTO cache_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )?;
    Ok(())
}

fn delete_meta(conn: &Connection, key: &str) -> CacheResult<()> {
    conn.execute("DELETE FROM cache_meta WHERE key = ?1", params![key])?;
    Ok(())
}
