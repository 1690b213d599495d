//! Ranked full-text search across every searchable entity table.
//!
//! # Responsibility
//! - Turn free text into a safe FTS5 prefix query.
//! - Query each entity's FTS table, merge and rank the hits.
//!
//! # Invariants
//! - Search never fails: a table that errors contributes no hits and is
//!   logged.
//! - Lower score is better; title matches weigh more than body matches.
//! - Pagination is applied after merging across tables.

use crate::db::schema::{TableDef, ENTITY_TABLES};
use crate::model::EntityKind;
use log::warn;
use rusqlite::{params, Connection};
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: usize = 50;

const TITLE_WEIGHT: f64 = 10.0;
const BODY_WEIGHT: f64 = 1.0;
const SNIPPET_TOKENS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: usize,
    pub offset: usize,
    /// Restricts the search to these kinds; `None` searches everything.
    pub types: Option<Vec<EntityKind>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            types: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
    /// Body excerpt with matches wrapped in `<mark>` / `</mark>`.
    pub snippet: String,
    /// BM25 rank; lower is better.
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// `(table, rows)` for every searchable table.
    pub tables: Vec<(String, i64)>,
    pub total: i64,
}

pub struct SearchEngine<'a> {
    conn: &'a Connection,
}

impl<'a> SearchEngine<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns an empty list for blank queries.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let Some(match_expr) = build_match_expression(query) else {
            return Vec::new();
        };
        if options.limit == 0 {
            return Vec::new();
        }
        let fetch = options.offset.saturating_add(options.limit);

        let mut hits = Vec::new();
        for def in searchable_tables(options.types.as_deref()) {
            match self.search_table(def, &match_expr, fetch) {
                Ok(table_hits) => hits.extend(table_hits),
                Err(err) => warn!(
                    "event=search_type_failed module=search status=degraded table={} error={}",
                    def.name, err
                ),
            }
        }

        hits.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect()
    }

    fn search_table(
        &self,
        def: &TableDef,
        match_expr: &str,
        fetch: usize,
    ) -> rusqlite::Result<Vec<SearchHit>> {
        let Some(fts) = def.fts else {
            return Ok(Vec::new());
        };
        let fts_table = def.fts_table();
        let sql = format!(
            "SELECT t.id AS id,
                    t.{title} AS title,
                    snippet({fts_table}, 2, '<mark>', '</mark>', '...', {SNIPPET_TOKENS}) AS snippet,
                    bm25({fts_table}, 0.0, {TITLE_WEIGHT:.1}, {BODY_WEIGHT:.1}) AS score
             FROM {fts_table}
             JOIN {table} t ON t.rowid = {fts_table}.rowid
             WHERE {fts_table} MATCH ?1
             ORDER BY score ASC, t.rowid ASC
             LIMIT ?2",
            title = fts.title_column,
            table = def.name,
        );
        let limit = i64::try_from(fetch).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let hits = stmt
            .query_map(params![match_expr, limit], |row| {
                Ok(SearchHit {
                    kind: def.kind,
                    id: row.get("id")?,
                    title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
                    snippet: row.get::<_, Option<String>>("snippet")?.unwrap_or_default(),
                    score: row.get("score")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    /// Row counts of every searchable table.
    pub fn get_stats(&self) -> SearchStats {
        let mut stats = SearchStats::default();
        for def in searchable_tables(None) {
            let count = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", def.name),
                [],
                |row| row.get::<_, i64>(0),
            );
            match count {
                Ok(count) => {
                    stats.total += count;
                    stats.tables.push((def.name.to_string(), count));
                }
                Err(err) => warn!(
                    "event=search_stats module=search status=degraded table={} error={}",
                    def.name, err
                ),
            }
        }
        stats
    }
}

fn searchable_tables(types: Option<&[EntityKind]>) -> impl Iterator<Item = &'static TableDef> + '_ {
    ENTITY_TABLES
        .iter()
        .copied()
        .filter(|def| def.fts.is_some())
        .filter(move |def| types.map_or(true, |kinds| kinds.contains(&def.kind)))
}

/// Builds `"tok"* OR "tok"*` from whitespace-separated terms.
fn build_match_expression(query: &str) -> Option<String> {
    let terms = query
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" OR "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"*")
}
