//! Project document access: safe writes, id allocation and the typed
//! facade over every entity section.
//!
//! # Invariants
//! - The markdown file is the source of truth; nothing here caches records
//!   across calls.
//! - Every mutation is a read-modify-write performed under the per-path
//!   write lock.

pub mod facade;
pub mod ids;
pub mod write_safety;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub type DocResult<T> = Result<T, DocumentError>;

#[derive(Debug)]
pub enum DocumentError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidRecord(String),
}

impl DocumentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "document io error at `{}`: {source}", path.display())
            }
            Self::InvalidRecord(message) => write!(f, "invalid record: {message}"),
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidRecord(_) => None,
        }
    }
}

/// Source of record timestamps.
pub trait Clock: Send + Sync {
    /// Current instant as an RFC 3339 string.
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        now_rfc3339()
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
