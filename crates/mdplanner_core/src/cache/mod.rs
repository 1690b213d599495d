//! Query-store mirror of the project document.
//!
//! # Responsibility
//! - Map entity records to store rows and back.
//! - Offer a read-through / write-through view per entity section.
//! - Rebuild the whole mirror from the document in one transaction.
//!
//! # Invariants
//! - The document is written first; the store only ever follows it.
//! - Store failures after a committed document write never fail the call.
//!
//! # See also
//! - `db::schema` for the table registry.

pub mod caching;
pub mod counters;
pub mod mapping;
pub mod rows;
pub mod sync;

use crate::db::DbError;
use crate::document::DocumentError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    Document(DocumentError),
    UnknownTable(String),
    InvalidRow(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "{err}"),
            Self::UnknownTable(name) => write!(f, "unknown cache table `{name}`"),
            Self::InvalidRow(message) => write!(f, "invalid cache row: {message}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::UnknownTable(_) | Self::InvalidRow(_) => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<DocumentError> for CacheError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}
