use mdplanner_core::db::migrations::{latest_version, schema_hash, META_SCHEMA_HASH};
use mdplanner_core::db::{open_db, open_db_in_memory, DbError, ENTITY_TABLES};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cache_meta");
    assert_table_exists(&conn, "id_counters");
}

#[test]
fn open_db_creates_every_entity_table_and_index() {
    let conn = open_db_in_memory().unwrap();

    for def in ENTITY_TABLES {
        assert_table_exists(&conn, def.name);
        if def.fts.is_some() {
            assert_table_exists(&conn, &def.fts_table());
        }
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute(
            "INSERT INTO id_counters (kind, value) VALUES ('note', 7)",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let value: i64 = conn_second
        .query_row(
            "SELECT value FROM id_counters WHERE kind = 'note'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, 7);
}

#[test]
fn file_database_uses_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("planner.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
}

#[test]
fn counters_reject_negative_values() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO id_counters (kind, value) VALUES ('goal', -1)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn changed_entity_schema_rebuilds_tables_and_clears_last_sync() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");

    let conn = open_db(&path).unwrap();
    let stored: String = conn
        .query_row(
            "SELECT value FROM cache_meta WHERE key = ?1",
            [META_SCHEMA_HASH],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, schema_hash());
    conn.execute_batch(
        "INSERT INTO notes (id, title) VALUES ('note_1', 'Kept?');
         INSERT INTO cache_meta (key, value) VALUES ('last_sync', '2026-01-01T00:00:00Z');
         INSERT INTO id_counters (kind, value) VALUES ('note', 3);
         UPDATE cache_meta SET value = 'stale' WHERE key = 'schema_hash';",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let notes: i64 = conn
        .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
        .unwrap();
    assert_eq!(notes, 0);
    let last_sync: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM cache_meta WHERE key = 'last_sync'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(last_sync, 0);
    let counter: i64 = conn
        .query_row("SELECT value FROM id_counters WHERE kind = 'note'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(counter, 3);
}

#[test]
fn unchanged_entity_schema_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");

    let conn = open_db(&path).unwrap();
    conn.execute("INSERT INTO notes (id, title) VALUES ('note_1', 'Kept')", [])
        .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let title: String = conn
        .query_row("SELECT title FROM notes WHERE id = 'note_1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(title, "Kept");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
