use mdplanner_core::{
    C4Component, Company, Customer, Goal, Idea, Milestone, Mindmap, Note, ProjectDocument,
    Retrospective, StickyNote, Task, WriteSafetyConfig,
};
use std::fs;
use std::path::Path;

const PROJECT: &str = "# Launch Plan

Shared planning document.

<!-- Notes -->
# Notes

## Kickoff

<!-- id: note_1 | created: 2026-01-01T00:00:00Z | updated: 2026-01-02T00:00:00Z | rev: 2 -->
Agenda for the kickoff.

## Scope

<!-- id: note_2 -->
<!-- Custom Section: Risks -->
## Vendor delay
Mitigate with a second supplier.
<!-- End Custom Section -->

<!-- Goals -->
# Goals

## Grow revenue {type: enterprise; kpi: ARR; start: 2026-01-01; end: 2026-12-31; status: active}

<!-- id: goal_1 -->
Double annual recurring revenue.

<!-- Milestones -->
# Milestones

## Beta {target: 2026-03-01; status: open}

<!-- id: milestone_1 -->
Public beta.

<!-- Ideas -->
# Ideas

## Dark mode {status: new; category: ui; links: [idea_2]}

<!-- id: idea_1 -->
Users keep asking.

<!-- Retrospectives -->
# Retrospectives

## Sprint 1 {date: 2026-02-01; status: open}

<!-- id: retro_1 -->
### Continue

- pairing

### Stop

- late merges

### Start

- demos

<!-- Canvas -->
# Canvas

## Sticky note {color: blue; position: {x: 10, y: 20}; size: {width: 200, height: 150}}

<!-- id: sticky_1 -->
Remember the budget.

<!-- Mindmap -->
# Mindmap

## Product

<!-- id: mindmap_1 -->
- Product
  - Web
    - Editor
  - Mobile

<!-- C4 Architecture -->
# C4 Architecture

## Planner {level: context; type: system; technology: Rust; position: {x: 1, y: 2}; connections: [{target: c4_component_2, label: reads}]}

<!-- id: c4_component_1 -->
Core planning system.

<!-- Customers -->
# Customers

## Acme {email: ops@acme.test; phone: 555-0100}

<!-- id: customer_1 -->
Key account.

<!-- Companies -->
# Companies

## Globex {industry: energy; website: globex.test}

<!-- id: company_1 -->
Partner.

<!-- SWOT Analysis -->
# SWOT Analysis

Strengths stay exactly as written   with odd spacing.

<!-- Board -->
# Board

## Todo

- [ ] (1) Ship v1 {tag: [launch, infra]; priority: 1}
  Cut the release branch.
  - [x] (2) Write changelog

## Done

- [x] (3) Pick a name
";

fn write_project(dir: &Path) -> ProjectDocument {
    let path = dir.join("project.md");
    fs::write(&path, PROJECT).unwrap();
    ProjectDocument::with_config(path, WriteSafetyConfig::without_backups())
}

#[test]
fn every_section_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());

    let notes = doc.read_notes();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].revision, 2);
    assert!(notes[1].content.contains("## Vendor delay"));

    let goals: Vec<Goal> = doc.read_all();
    assert_eq!(goals[0].goal_type, "enterprise");
    assert_eq!(goals[0].kpi.as_deref(), Some("ARR"));

    let milestones: Vec<Milestone> = doc.read_all();
    assert_eq!(milestones[0].target.as_deref(), Some("2026-03-01"));

    let ideas: Vec<Idea> = doc.read_all();
    assert_eq!(ideas[0].links, vec!["idea_2"]);

    let retros: Vec<Retrospective> = doc.read_all();
    assert_eq!(retros[0].continue_items, vec!["pairing"]);
    assert_eq!(retros[0].stop_items, vec!["late merges"]);
    assert_eq!(retros[0].start_items, vec!["demos"]);

    let stickies: Vec<StickyNote> = doc.read_all();
    assert_eq!(stickies[0].position.x, 10);
    assert_eq!(stickies[0].size.map(|s| s.height), Some(150));

    let maps: Vec<Mindmap> = doc.read_all();
    assert_eq!(maps[0].nodes.len(), 4);
    assert_eq!(maps[0].nodes[2].level, 2);
    assert_eq!(maps[0].nodes[3].parent.as_deref(), Some("mindmap_1_node_1"));

    let components: Vec<C4Component> = doc.read_all();
    assert_eq!(components[0].connections[0].label, "reads");

    let customers: Vec<Customer> = doc.read_all();
    assert_eq!(customers[0].email.as_deref(), Some("ops@acme.test"));

    let companies: Vec<Company> = doc.read_all();
    assert_eq!(companies[0].industry.as_deref(), Some("energy"));

    let tasks = doc.read_tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].children[0].id, "2");
    assert_eq!(doc.read_sections(), vec!["Todo", "Done"]);
}

#[test]
fn saving_unchanged_records_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());

    resave_everything(&doc);
    let first = doc.read_content().unwrap().unwrap();
    resave_everything(&doc);
    let second = doc.read_content().unwrap().unwrap();

    assert_eq!(first, second);
    assert!(first.starts_with("# Launch Plan\n\nShared planning document.\n"));
    assert!(first.contains("- [ ] (1) Ship v1 {tag: [launch, infra]; priority: 1}\n"));
    assert!(first.contains("## Sticky note {color: blue; position: {x: 10, y: 20}; size: {width: 200, height: 150}}"));
}

#[test]
fn unknown_sections_and_custom_blocks_survive_writes() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_project(dir.path());

    doc.add(Goal::new("Hire two engineers")).unwrap();
    doc.add_note("Retro notes", "Went well.").unwrap();

    let content = doc.read_content().unwrap().unwrap();
    assert!(content.contains(
        "<!-- SWOT Analysis -->\n# SWOT Analysis\n\nStrengths stay exactly as written   with odd spacing.\n"
    ));
    assert!(content.contains(
        "<!-- Custom Section: Risks -->\n## Vendor delay\nMitigate with a second supplier.\n<!-- End Custom Section -->"
    ));
    assert_eq!(doc.read_notes().len(), 3);
}

#[test]
fn first_write_to_empty_document_creates_section() {
    let dir = tempfile::tempdir().unwrap();
    let doc = ProjectDocument::with_config(
        dir.path().join("fresh.md"),
        WriteSafetyConfig::without_backups(),
    );

    let created = doc.add(Customer::new("Initech")).unwrap();
    assert_eq!(created.id, "customer_1");

    let content = doc.read_content().unwrap().unwrap();
    assert!(content.starts_with("<!-- Customers -->\n# Customers\n\n## Initech\n"));
    let tasks: Vec<Task> = doc.read_all();
    assert!(tasks.is_empty());
    let notes: Vec<Note> = doc.read_all();
    assert!(notes.is_empty());
}

fn resave_everything(doc: &ProjectDocument) {
    doc.save_tasks(&doc.read_tasks()).unwrap();
    doc.save_all(&doc.read_notes()).unwrap();
    doc.save_all(&doc.read_all::<Goal>()).unwrap();
    doc.save_all(&doc.read_all::<Milestone>()).unwrap();
    doc.save_all(&doc.read_all::<Idea>()).unwrap();
    doc.save_all(&doc.read_all::<Retrospective>()).unwrap();
    doc.save_all(&doc.read_all::<StickyNote>()).unwrap();
    doc.save_all(&doc.read_all::<Mindmap>()).unwrap();
    doc.save_all(&doc.read_all::<C4Component>()).unwrap();
    doc.save_all(&doc.read_all::<Customer>()).unwrap();
    doc.save_all(&doc.read_all::<Company>()).unwrap();
}
