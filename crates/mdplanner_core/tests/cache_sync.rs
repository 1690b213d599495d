use mdplanner_core::db::ENTITY_TABLES;
use mdplanner_core::{
    open_db, open_db_in_memory, CacheSync, Contact, Goal, Invoice, Note, ProjectDocument, Task,
    TaskAttributes, WriteSafetyConfig,
};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

const PROJECT: &str = "<!-- Notes -->
# Notes

## Kickoff

<!-- id: note_1 | created: 2026-01-01T00:00:00Z | updated: 2026-01-01T00:00:00Z | rev: 1 -->
Agenda.

<!-- Goals -->
# Goals

## Revenue {type: enterprise; status: active}

<!-- id: goal_3 -->

## Hiring

<!-- id: goal_4 -->

<!-- Board -->
# Board

## Todo

- [ ] (1) Ship v1 {tag: [launch]; priority: 1}
  - [ ] (2) Freeze scope
- [ ] (5) Announce
";

fn write_project(dir: &Path) -> ProjectDocument {
    let path = dir.join("project.md");
    fs::write(&path, PROJECT).unwrap();
    ProjectDocument::with_config(path, WriteSafetyConfig::without_backups())
}

fn ids(conn: &Connection, table: &str) -> Vec<String> {
    conn.prepare(&format!("SELECT id FROM {table} ORDER BY id"))
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn dump_tasks(conn: &Connection) -> Vec<(String, String, String, Option<String>)> {
    conn.prepare("SELECT id, title, section, parent_id FROM tasks ORDER BY rowid")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

type TableDump = (String, Vec<Vec<Value>>);

/// Every row of every entity table except `skip`, plus the sync metadata.
fn dump_store(conn: &Connection, skip: &str) -> Vec<TableDump> {
    let mut tables: Vec<&str> = ENTITY_TABLES
        .iter()
        .map(|def| def.name)
        .filter(|name| *name != skip)
        .collect();
    tables.push("cache_meta");
    tables
        .into_iter()
        .map(|table| {
            let mut stmt = conn
                .prepare(&format!("SELECT * FROM {table} ORDER BY rowid"))
                .unwrap();
            let width = stmt.column_count();
            let rows = stmt
                .query_map([], |row| {
                    (0..width)
                        .map(|idx| row.get::<_, Value>(idx))
                        .collect::<Result<Vec<_>, _>>()
                })
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            (table.to_string(), rows)
        })
        .collect()
}

fn sorted_task_ids(tasks: &[Task]) -> Vec<String> {
    let mut out = Vec::new();
    Task::walk(tasks, &mut |task| out.push(task.id.clone()));
    out.sort();
    out
}

#[test]
fn full_sync_mirrors_every_document_id() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());
    let mut conn = open_db_in_memory().unwrap();
    let mut sync = CacheSync::new(&doc, &mut conn);
    sync.init().unwrap();
    assert!(sync.needs_sync());

    let result = sync.full_sync(None);
    assert!(result.is_ok(), "errors: {:?}", result.errors);
    assert_eq!(result.tables, ENTITY_TABLES.len());
    assert_eq!(result.tables, 26);
    assert_eq!(result.items, 6);
    assert!(!sync.needs_sync());
    assert!(sync.last_sync_time().unwrap().is_some());
    drop(sync);

    assert_eq!(ids(&conn, "tasks"), sorted_task_ids(&doc.read_tasks()));
    let mut note_ids: Vec<String> = doc.read_all::<Note>().into_iter().map(|n| n.id).collect();
    note_ids.sort();
    assert_eq!(ids(&conn, "notes"), note_ids);
    assert_eq!(ids(&conn, "goals"), vec!["goal_3", "goal_4"]);
    let parent: Option<String> = conn
        .query_row("SELECT parent_id FROM tasks WHERE id = '2'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(parent.as_deref(), Some("1"));
}

#[test]
fn selected_tables_only() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());
    let mut conn = open_db_in_memory().unwrap();
    let mut sync = CacheSync::new(&doc, &mut conn);

    let result = sync.full_sync(Some(&["goals"]));
    assert!(result.is_ok());
    assert_eq!(result.tables, 1);
    assert_eq!(result.items, 2);
    drop(sync);

    assert!(ids(&conn, "tasks").is_empty());
}

#[test]
fn unknown_table_rolls_back_everything() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());
    let mut conn = open_db_in_memory().unwrap();
    let first_sync = {
        let mut sync = CacheSync::new(&doc, &mut conn);
        assert!(sync.full_sync(None).is_ok());
        sync.last_sync_time().unwrap()
    };
    let before = dump_tasks(&conn);

    doc.add_task(Task::new("Late addition", "Todo")).unwrap();
    let mut sync = CacheSync::new(&doc, &mut conn);
    let result = sync.full_sync(Some(&["tasks", "no_such_table"]));
    assert!(!result.is_ok());
    assert!(result.errors[0].contains("no_such_table"));
    assert_eq!(sync.last_sync_time().unwrap(), first_sync);
    drop(sync);

    assert_eq!(dump_tasks(&conn), before);
}

#[test]
fn failing_table_leaves_earlier_tables_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());
    let mut conn = open_db_in_memory().unwrap();
    assert!(CacheSync::new(&doc, &mut conn).full_sync(None).is_ok());

    let last = ENTITY_TABLES[ENTITY_TABLES.len() - 1].name;
    conn.execute_batch(&format!("DROP TABLE {last};")).unwrap();
    let before = dump_store(&conn, last);

    doc.add_task(Task::new("Late addition", "Todo")).unwrap();
    doc.add_note("Late note", "Body").unwrap();
    let result = CacheSync::new(&doc, &mut conn).full_sync(None);

    assert!(!result.is_ok());
    assert_eq!(result.items, 0);
    assert_eq!(dump_store(&conn, last), before);
}

#[test]
fn ship_v1_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let doc = ProjectDocument::with_config(
        dir.path().join("project.md"),
        WriteSafetyConfig::without_backups(),
    );
    let mut conn = open_db_in_memory().unwrap();

    let mut task = Task::new("Ship v1", "Todo");
    task.attributes = TaskAttributes {
        priority: Some(1),
        tag: vec!["launch".to_string(), "infra".to_string()],
        ..TaskAttributes::default()
    };
    let added = doc.add_task(task).unwrap();
    let content = fs::read_to_string(doc.path()).unwrap();
    assert!(content.contains(&format!("- [ ] ({}) Ship v1 {{", added.id)));

    let listed = doc.read_tasks();
    let found = listed.iter().find(|task| task.id == added.id).unwrap();
    assert_eq!(found.attributes.priority, Some(1));
    assert_eq!(found.attributes.tag, vec!["launch", "infra"]);

    assert!(CacheSync::new(&doc, &mut conn).full_sync(None).is_ok());
    assert_eq!(ids(&conn, "tasks"), vec![added.id.clone()]);

    assert!(doc.delete_task(&added.id).unwrap());
    assert!(doc.read_tasks().iter().all(|task| task.id != added.id));
    let result = CacheSync::new(&doc, &mut conn).full_sync(None);
    assert!(result.is_ok(), "errors: {:?}", result.errors);
    assert!(!ids(&conn, "tasks").contains(&added.id));
}

#[test]
fn billing_and_contact_tables_sync() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.md");
    fs::write(
        &path,
        "<!-- Invoices -->
# Invoices

## INV-7 {customer: customer_1; status: sent; paid: 50}

<!-- id: invoice_7 -->
### Line Items

- Audit {qty: 2; rate: 100}

<!-- Contacts -->
# Contacts

## Ann Lee {company: company_1; primary: true}

<!-- id: contact_2 -->
Prefers email.
",
    )
    .unwrap();
    let doc = ProjectDocument::with_config(path, WriteSafetyConfig::without_backups());
    let mut conn = open_db_in_memory().unwrap();

    let result = CacheSync::new(&doc, &mut conn).full_sync(Some(&["invoices", "contacts"]));
    assert!(result.is_ok(), "errors: {:?}", result.errors);
    assert_eq!(result.items, 2);

    let (total, paid): (f64, f64) = conn
        .query_row(
            "SELECT total, paid_amount FROM invoices WHERE id = 'invoice_7'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((total, paid), (200.0, 50.0));
    let hit: String = conn
        .query_row(
            "SELECT id FROM contacts_fts WHERE contacts_fts MATCH 'email'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(hit, "contact_2");

    let invoices: Vec<Invoice> = doc.read_all();
    assert_eq!(invoices[0].balance(), 150.0);
    let contacts: Vec<Contact> = doc.read_all();
    assert!(contacts[0].is_primary);
}

#[test]
fn rebuild_recreates_a_damaged_store() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE goals;").unwrap();

    let mut sync = CacheSync::new(&doc, &mut conn);
    assert!(!sync.full_sync(None).is_ok());
    assert!(sync.needs_sync());

    let result = sync.rebuild();
    assert!(result.is_ok(), "errors: {:?}", result.errors);
    assert!(!sync.needs_sync());
    drop(sync);

    assert_eq!(ids(&conn, "goals"), vec!["goal_3", "goal_4"]);
    let goals: Vec<Goal> = doc.read_all();
    assert_eq!(goals[0].goal_type, "enterprise");
}

#[test]
fn sync_state_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());
    let db_path = dir.path().join("store.db");

    {
        let mut conn = open_db(&db_path).unwrap();
        let mut sync = CacheSync::new(&doc, &mut conn);
        assert!(sync.needs_sync());
        assert!(sync.full_sync(None).is_ok());
    }

    let mut conn = open_db(&db_path).unwrap();
    let sync = CacheSync::new(&doc, &mut conn);
    assert!(!sync.needs_sync());
    drop(sync);
    assert_eq!(ids(&conn, "notes"), vec!["note_1"]);
}
