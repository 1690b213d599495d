//! Id counters persisted in the store's `id_counters` table.

use crate::db::{open_db, DbResult};
use crate::document::ids::IdCounterStore;
use crate::model::EntityKind;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// [`IdCounterStore`] backed by its own store connection.
pub struct SqliteIdCounters {
    conn: Connection,
}

impl SqliteIdCounters {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn get(&self, kind: EntityKind) -> rusqlite::Result<Option<u64>> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM id_counters WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map(|v| v.max(0) as u64))
    }

    /// Raises the counter to `value`; a higher stored value is kept.
    pub fn raise(&self, kind: EntityKind, value: u64) -> rusqlite::Result<()> {
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        self.conn.execute(
            "INSERT INTO id_counters (kind, value) VALUES (?1, ?2)
             ON CONFLICT(kind) DO UPDATE SET value = MAX(value, excluded.value)",
            params![kind.as_str(), value],
        )?;
        Ok(())
    }
}

impl IdCounterStore for SqliteIdCounters {
    fn load(&mut self, kind: EntityKind) -> Option<u64> {
        match self.get(kind) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=id_counter_load module=cache status=error kind={} error={}",
                    kind, err
                );
                None
            }
        }
    }

    fn store(&mut self, kind: EntityKind, value: u64) {
        if let Err(err) = self.raise(kind, value) {
            warn!(
                "event=id_counter_store module=cache status=error kind={} error={}",
                kind, err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;

    #[test]
    fn counters_only_move_forward() {
        let mut counters = SqliteIdCounters::new(open_db_in_memory().expect("open store"));
        assert_eq!(counters.load(EntityKind::Goal), None);
        counters.store(EntityKind::Goal, 7);
        counters.store(EntityKind::Goal, 3);
        assert_eq!(counters.load(EntityKind::Goal), Some(7));
    }
}
