//! Row-level statements shared by the decorator and the sync engine.
//!
//! # Invariants
//! - Reads return rows in insertion (rowid) order, which is document order
//!   after a sync.
//! - Upserts keep the existing rowid of a record.
//! - Deleting a record of a tree table removes its whole subtree.

use super::mapping::CachedEntity;
use super::{CacheError, CacheResult};
use crate::db::schema::TableDef;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn insert_sql(def: &TableDef) -> String {
    let names = def.column_names();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        def.name,
        names.join(", "),
        placeholders(names.len())
    )
}

pub(crate) fn upsert_sql(def: &TableDef) -> String {
    let names = def.column_names();
    let updates = names
        .iter()
        .skip(1)
        .map(|name| format!("{name} = excluded.{name}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ON CONFLICT(id) DO UPDATE SET {updates}", insert_sql(def))
}

fn check_width(def: &TableDef, row: &[Value]) -> CacheResult<()> {
    if row.len() != def.columns.len() {
        return Err(CacheError::InvalidRow(format!(
            "{} expects {} columns, got {}",
            def.name,
            def.columns.len(),
            row.len()
        )));
    }
    Ok(())
}

/// Every record of `E`, reassembled into document shape.
pub fn select_all<E: CachedEntity>(conn: &Connection) -> CacheResult<Vec<E>> {
    let def = E::table();
    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        def.column_names().join(", "),
        def.name
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| E::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(E::assemble(rows))
}

pub fn select_one<E: CachedEntity>(conn: &Connection, id: &str) -> CacheResult<Option<E>> {
    let def = E::table();
    if def.parent_column.is_some() {
        let items = select_all::<E>(conn)?;
        return Ok(E::find(&items, id).cloned());
    }
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        def.column_names().join(", "),
        def.name
    );
    let item = conn
        .query_row(&sql, params![id], |row| E::from_row(row))
        .optional()?;
    Ok(item)
}

pub fn count_rows(conn: &Connection, table: &str) -> CacheResult<i64> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Replaces every row of `def` with `rows`; returns the number inserted.
pub fn replace_all(conn: &Connection, def: &TableDef, rows: &[Vec<Value>]) -> CacheResult<usize> {
    conn.execute(&format!("DELETE FROM {}", def.name), [])?;
    let mut stmt = conn.prepare(&insert_sql(def))?;
    for row in rows {
        check_width(def, row)?;
        stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(rows.len())
}

/// Writes `item` (and, for trees, its current subtree) into the store.
pub fn upsert_record<E: CachedEntity>(conn: &Connection, item: &E) -> CacheResult<()> {
    let def = E::table();
    let rows = E::flatten(std::slice::from_ref(item));
    if let Some(parent_column) = def.parent_column {
        let keep: HashSet<&str> = rows
            .iter()
            .filter_map(|row| match row.first() {
                Some(Value::Text(id)) => Some(id.as_str()),
                _ => None,
            })
            .collect();
        for stale in descendant_ids(conn, def, parent_column, item.id())? {
            if !keep.contains(stale.as_str()) {
                conn.execute(&format!("DELETE FROM {} WHERE id = ?1", def.name), params![stale])?;
            }
        }
    }
    let mut stmt = conn.prepare(&upsert_sql(def))?;
    for row in &rows {
        check_width(def, row)?;
        stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(())
}

/// Deletes record `id`; tree tables drop the whole subtree.
pub fn delete_record(conn: &Connection, def: &TableDef, id: &str) -> CacheResult<bool> {
    let removed = match def.parent_column {
        Some(parent_column) => conn.execute(
            &format!(
                "WITH RECURSIVE subtree(id) AS (
                    SELECT ?1
                    UNION ALL
                    SELECT t.id FROM {table} t JOIN subtree s ON t.{parent_column} = s.id
                 )
                 DELETE FROM {table} WHERE id IN (SELECT id FROM subtree)",
                table = def.name
            ),
            params![id],
        )?,
        None => conn.execute(&format!("DELETE FROM {} WHERE id = ?1", def.name), params![id])?,
    };
    Ok(removed > 0)
}

fn descendant_ids(
    conn: &Connection,
    def: &TableDef,
    parent_column: &str,
    id: &str,
) -> CacheResult<Vec<String>> {
    let sql = format!(
        "WITH RECURSIVE subtree(id) AS (
            SELECT id FROM {table} WHERE {parent_column} = ?1
            UNION ALL
            SELECT t.id FROM {table} t JOIN subtree s ON t.{parent_column} = s.id
         )
         SELECT id FROM subtree",
        table = def.name
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
