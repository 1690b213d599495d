use mdplanner_core::{
    Clock, CustomSection, EntityKind, Goal, GoalPatch, IdCounterStore, Note, NoteMode,
    NoteParagraph, NotePatch, NoteTab, ProjectDocument, SectionLayout, Task, TaskAttributes,
    TaskPatch, WriteSafetyConfig,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

struct FixedClock(&'static str);

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Clone, Default)]
struct SharedCounters(Arc<Mutex<HashMap<EntityKind, u64>>>);

impl IdCounterStore for SharedCounters {
    fn load(&mut self, kind: EntityKind) -> Option<u64> {
        self.0.lock().unwrap().get(&kind).copied()
    }

    fn store(&mut self, kind: EntityKind, value: u64) {
        self.0.lock().unwrap().insert(kind, value);
    }
}

fn open(dir: &Path) -> ProjectDocument {
    ProjectDocument::with_config(dir.join("project.md"), WriteSafetyConfig::without_backups())
}

#[test]
fn ship_v1_task_parses_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.md");
    fs::write(
        &path,
        "<!-- Board -->\n# Board\n\n## Todo\n\n- [ ] (7) Ship v1 {priority: 1; tag: [launch, infra]}\n",
    )
    .unwrap();
    let doc = ProjectDocument::with_config(&path, WriteSafetyConfig::without_backups());

    let task = doc.read::<Task>("7").unwrap();
    assert_eq!(task.title, "Ship v1");
    assert!(!task.completed);
    assert_eq!(task.section, "Todo");
    assert_eq!(task.attributes.priority, Some(1));
    assert_eq!(task.attributes.tag, vec!["launch", "infra"]);
}

#[test]
fn add_update_delete_task() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());

    let task = Task::new("Write docs", "Todo").with_attributes(TaskAttributes {
        assignee: Some("sam".to_string()),
        ..TaskAttributes::default()
    });
    let created = doc.add_task(task).unwrap();
    assert_eq!(created.id, "1");
    let child = doc
        .add_task(Task::new("Outline", "Done").with_parent("1"))
        .unwrap();
    assert_eq!(child.section, "Todo");
    assert_eq!(child.parent_id.as_deref(), Some("1"));

    let updated = doc
        .update_task(
            "1",
            TaskPatch {
                completed: Some(true),
                section: Some("Done".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap()
        .unwrap();
    assert!(updated.completed);
    assert_eq!(updated.children[0].section, "Done");

    let tasks = doc.read_tasks();
    assert_eq!(tasks[0].section, "Done");
    assert_eq!(tasks[0].attributes.assignee.as_deref(), Some("sam"));

    assert!(doc.delete_task("1").unwrap());
    assert!(doc.read_tasks().is_empty());
    assert!(!doc.delete_task("1").unwrap());
}

#[test]
fn missing_records_are_none_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());

    assert!(doc.read::<Goal>("goal_9").is_none());
    assert!(doc
        .update::<Goal>("goal_9", GoalPatch::default())
        .unwrap()
        .is_none());
    assert!(!doc.delete::<Goal>("goal_9").unwrap());
    assert!(doc.read_content().unwrap().is_none());
}

#[test]
fn ids_are_not_reused_after_delete() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());

    let first = doc.add(Goal::new("One")).unwrap();
    let second = doc.add(Goal::new("Two")).unwrap();
    assert_eq!(first.id, "goal_1");
    assert_eq!(second.id, "goal_2");

    assert!(doc.delete::<Goal>("goal_2").unwrap());
    assert_eq!(doc.generate_id(EntityKind::Goal).unwrap(), "goal_3");
    let third = doc.add(Goal::new("Three")).unwrap();
    assert_eq!(third.id, "goal_3");
}

#[test]
fn persisted_counters_outlive_deleted_records() {
    let dir = tempfile::tempdir().unwrap();
    let counters = SharedCounters::default();

    let doc = ProjectDocument::with_config(
        dir.path().join("first.md"),
        WriteSafetyConfig::without_backups(),
    )
    .with_counter_store(Box::new(counters.clone()));
    doc.add(Goal::new("One")).unwrap();
    doc.add(Goal::new("Two")).unwrap();
    doc.delete::<Goal>("goal_2").unwrap();
    drop(doc);

    let path = dir.path().join("second.md");
    fs::write(&path, "<!-- Goals -->\n# Goals\n\n## One\n\n<!-- id: goal_1 -->\n").unwrap();
    let reopened = ProjectDocument::with_config(&path, WriteSafetyConfig::without_backups())
        .with_counter_store(Box::new(counters));
    assert_eq!(reopened.generate_id(EntityKind::Goal).unwrap(), "goal_3");
    assert_eq!(reopened.add(Goal::new("Three")).unwrap().id, "goal_3");
}

#[test]
fn note_revision_and_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path()).with_clock(Arc::new(FixedClock("2026-05-01T12:00:00Z")));

    let note = doc.add_note("Standup", "Yesterday: docs").unwrap();
    assert_eq!(note.id, "note_1");
    assert_eq!(note.revision, 1);
    assert_eq!(note.created_at, "2026-05-01T12:00:00Z");

    let updated = doc
        .update_note(
            "note_1",
            NotePatch {
                content: Some("Yesterday: docs\nToday: tests".to_string()),
                ..NotePatch::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.revision, 2);
    assert_eq!(updated.title, "Standup");

    let stored: Note = doc.read("note_1").unwrap();
    assert_eq!(stored.revision, 2);
    assert_eq!(stored.content, "Yesterday: docs\nToday: tests");
    assert!(doc.delete_note("note_1").unwrap());
}

#[test]
fn goal_patch_changes_only_named_fields() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());
    let mut goal = Goal::new("Grow");
    goal.kpi = Some("ARR".to_string());
    let created = doc.add(goal).unwrap();

    let updated = doc
        .update::<Goal>(
            &created.id,
            GoalPatch {
                status: Some("active".to_string()),
                ..GoalPatch::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "active");
    assert_eq!(updated.kpi.as_deref(), Some("ARR"));
    assert_eq!(doc.read::<Goal>(&created.id), Some(updated));
}

#[test]
fn concurrent_adds_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.md");

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let doc = ProjectDocument::with_config(&path, WriteSafetyConfig::without_backups());
                for n in 0..5 {
                    doc.add_note(&format!("note {worker}-{n}"), "body").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let doc = open(dir.path());
    let notes = doc.read_notes();
    assert_eq!(notes.len(), 40);
    let mut ids: Vec<&str> = notes.iter().map(|note| note.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
}

#[test]
fn read_sections_defaults_for_new_board() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());

    assert_eq!(doc.read_sections(), vec!["Ideas", "Todo", "In Progress", "Done"]);
    doc.add_task(Task::new("Triage", "Backlog")).unwrap();
    assert_eq!(
        doc.read_sections(),
        vec!["Ideas", "Todo", "In Progress", "Done", "Backlog"]
    );
}

#[test]
fn nested_children_get_fresh_ids_on_add() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());

    let mut release = Task::new("Release", "Todo");
    let mut changelog = Task::new("Changelog", "Todo");
    changelog.children.push(Task::new("Collect PRs", "Todo"));
    release.children.push(changelog);
    let added = doc.add_task(release).unwrap();

    assert_eq!(added.id, "1");
    assert_eq!(added.children[0].id, "2");
    assert_eq!(added.children[0].parent_id.as_deref(), Some("1"));
    assert_eq!(added.children[0].children[0].id, "3");

    let content = fs::read_to_string(doc.path()).unwrap();
    assert!(!content.contains("()"));
    assert!(content.contains("  - [ ] (2) Changelog\n"));
    let tasks = doc.read_tasks();
    assert_eq!(tasks[0].children[0].title, "Changelog");
    assert_eq!(tasks[0].children[0].children[0].title, "Collect PRs");
    assert_eq!(doc.add_task(Task::new("Next", "Todo")).unwrap().id, "4");
}

#[test]
fn subtask_section_patch_returns_what_the_document_holds() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());
    doc.add_task(Task::new("Parent", "Todo")).unwrap();
    let child = doc
        .add_task(Task::new("Child", "Todo").with_parent("1"))
        .unwrap();

    let returned = doc
        .update_task(
            &child.id,
            TaskPatch {
                section: Some("Done".to_string()),
                title: Some("Child renamed".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap()
        .unwrap();
    let reread = doc.read::<Task>(&child.id).unwrap();

    assert_eq!(returned, reread);
    assert_eq!(reread.section, "Todo");
    assert_eq!(reread.title, "Child renamed");
    assert_eq!(reread.parent_id.as_deref(), Some("1"));
}

#[test]
fn note_structure_patch_rewrites_the_body() {
    let dir = tempfile::tempdir().unwrap();
    let doc = open(dir.path());
    doc.add_note("Options", "Plain start").unwrap();

    let tabs = CustomSection {
        id: "section_1".to_string(),
        title: "Plans".to_string(),
        order: 0,
        layout: SectionLayout::Tabs(vec![NoteTab {
            id: "tab_1".to_string(),
            title: "Plan A".to_string(),
            content: vec![NoteParagraph::text("Cheap and slow.")],
        }]),
    };
    let updated = doc
        .update_note(
            "note_1",
            NotePatch {
                custom_sections: Some(vec![tabs]),
                ..NotePatch::default()
            },
        )
        .unwrap()
        .unwrap();

    assert_eq!(updated.mode, NoteMode::Enhanced);
    assert_eq!(updated.paragraphs[0].content, "Plain start");
    let content = fs::read_to_string(doc.path()).unwrap();
    assert!(content.contains("| mode: enhanced -->"));
    assert!(content.contains("<!-- Custom Section: Plans -->"));
    assert!(content.contains("### Tab: Plan A"));
    let stored: Note = doc.read("note_1").unwrap();
    assert_eq!(stored, updated);
}
