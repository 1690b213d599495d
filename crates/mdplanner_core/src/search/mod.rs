//! Full-text search over the query store.
//!
//! # Responsibility
//! - Expose ranked, paginated search backed by the per-entity FTS5 tables.
//! - Report per-table row statistics.

pub mod fts;
