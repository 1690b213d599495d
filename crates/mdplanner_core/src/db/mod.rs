//! SQLite query store bootstrap, migrations and entity schema.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the query store.
//! - Apply bookkeeping migrations in deterministic order.
//! - Create and drop the per-entity tables, FTS indexes and triggers from
//!   one declarative registry.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - The store is a derived mirror of the document; dropping it loses
//!   nothing that a full sync cannot rebuild.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};
pub use schema::{drop_schema, init_schema, table_def, ColumnDef, FtsDef, TableDef, ENTITY_TABLES};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
