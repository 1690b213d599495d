//! Store connections.
//!
//! Files and in-memory stores share one bootstrap: connection pragmas,
//! bookkeeping migrations, then the entity schema check. File stores ask
//! for WAL; when the filesystem refuses it the store keeps its journal
//! mode, logs a degraded open and stays usable.

use super::migrations::{apply_migrations, ensure_entity_schema};
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    File,
    Memory,
}

impl StoreMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens (creating when absent) the store file at `path`.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(StoreMode::File, || Connection::open(path))
}

pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(StoreMode::Memory, Connection::open_in_memory)
}

fn open_with(
    mode: StoreMode,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started = Instant::now();
    let opened = connect().map_err(DbError::from).and_then(|mut conn| {
        bootstrap(&mut conn, mode)?;
        Ok(conn)
    });
    let duration_ms = started.elapsed().as_millis();
    match &opened {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode.as_str(),
            duration_ms
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode.as_str(),
            duration_ms,
            err
        ),
    }
    opened
}

fn bootstrap(conn: &mut Connection, mode: StoreMode) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if mode == StoreMode::File {
        request_wal(conn);
    }
    apply_migrations(conn)?;
    ensure_entity_schema(conn)?;
    Ok(())
}

/// Switches to WAL, keeping whatever journal mode SQLite settles on.
fn request_wal(conn: &Connection) {
    let outcome = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    });
    match outcome {
        Ok(mode) if mode.eq_ignore_ascii_case("wal") => {}
        Ok(mode) => warn!(
            "event=db_open module=db status=degraded journal_mode={}",
            mode
        ),
        Err(err) => warn!(
            "event=db_open module=db status=degraded journal_mode=unchanged error={}",
            err
        ),
    }
}
