//! Store migrations in two layers.
//!
//! Bookkeeping tables (sync metadata, id counters) follow numbered SQL
//! steps tracked in `PRAGMA user_version`, and survive every rebuild.
//!
//! Entity tables follow the schema registry instead. A hash of the
//! registry DDL is kept in `cache_meta`; when the registry changes the
//! entity tables are dropped, recreated empty, and the store is marked
//! as never synced so the next sync refills it from the document.

use super::schema::{create_sql, drop_schema, init_schema, ENTITY_TABLES};
use crate::db::{DbError, DbResult};
use crate::document::write_safety::content_hash;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

pub const META_SCHEMA_HASH: &str = "schema_hash";
pub const META_LAST_SYNC: &str = "last_sync";

/// `(user_version, sql)` in ascending order.
const STEPS: &[(u32, &str)] = &[
    (1, include_str!("0001_cache_meta.sql")),
    (2, include_str!("0002_id_counters.sql")),
];

pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _)| *version)
}

/// Runs the bookkeeping steps newer than the store's `user_version`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let pending: Vec<&(u32, &str)> = STEPS
        .iter()
        .filter(|(version, _)| *version > found)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", *version)?;
    }
    tx.commit()?;
    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        found, latest
    );
    Ok(())
}

/// Hash of the DDL every entity table is created from.
pub fn schema_hash() -> String {
    let ddl: String = ENTITY_TABLES.iter().map(|def| create_sql(def)).collect();
    content_hash(&ddl)
}

/// Creates the entity tables, rebuilding them when the registry changed
/// since this store was last opened. Returns true when tables were rebuilt.
pub fn ensure_entity_schema(conn: &mut Connection) -> DbResult<bool> {
    let expected = schema_hash();
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM cache_meta WHERE key = ?1",
            params![META_SCHEMA_HASH],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();
    if stored.as_deref() == Some(expected.as_str()) {
        init_schema(conn)?;
        return Ok(false);
    }

    let tx = conn.transaction()?;
    drop_schema(&tx)?;
    init_schema(&tx)?;
    tx.execute(
        "DELETE FROM cache_meta WHERE key = ?1",
        params![META_LAST_SYNC],
    )?;
    tx.execute(
        "INSERT INTO cache_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        params![META_SCHEMA_HASH, expected],
    )?;
    tx.commit()?;
    info!(
        "event=schema_rebuild module=db status=ok tables={} first_open={}",
        ENTITY_TABLES.len(),
        stored.is_none()
    );
    Ok(true)
}
