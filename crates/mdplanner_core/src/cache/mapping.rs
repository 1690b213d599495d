//! Record <-> row mapping for every cached entity.
//!
//! Nested fields (lists, attribute blocks, mindmap nodes, connections) are
//! stored as JSON text. Searchable list records also get a derived
//! `content` column with one item per line.

mod boards;
mod ledger;

use crate::db::schema::{self, TableDef};
use crate::markdown::SectionCodec;
use crate::model::note::{Note, NoteMode};
use crate::model::records::{
    C4Component, Company, Customer, Goal, Idea, Milestone, Mindmap, Position, Retrospective,
    Size, StickyNote,
};
use crate::model::task::{Task, TaskAttributes};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Entity that can be mirrored into its store table.
pub trait CachedEntity: SectionCodec {
    fn table() -> &'static TableDef;

    /// Column values in `table().columns` order.
    fn to_row(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Rows for `items`; tree entities emit parents before children.
    fn flatten(items: &[Self]) -> Vec<Vec<Value>> {
        items.iter().map(Self::to_row).collect()
    }

    /// Rebuilds records from rows read in insertion order.
    fn assemble(rows: Vec<Self>) -> Vec<Self> {
        rows
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn json<T: Serialize>(value: &T) -> Value {
    serde_json::to_string(value)
        .map(Value::Text)
        .unwrap_or(Value::Null)
}

fn from_json<T: DeserializeOwned + Default>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: Option<String> = row.get(column)?;
    Ok(raw
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default())
}

/// Searchable text of a set of lists, one item per line.
fn joined<'a>(lists: impl IntoIterator<Item = &'a Vec<String>>) -> Value {
    let lines: Vec<&str> = lists
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    Value::Text(lines.join("\n"))
}

fn string_or_default(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(column)?.unwrap_or_default())
}

impl CachedEntity for Task {
    fn table() -> &'static TableDef {
        &schema::TASKS
    }

    fn to_row(&self) -> Vec<Value> {
        let attrs = &self.attributes;
        vec![
            text(&self.id),
            text(&self.title),
            Value::Integer(i64::from(self.completed)),
            text(&self.section),
            text(&self.description.join("\n")),
            json(&attrs.tag),
            opt_text(&attrs.due_date),
            opt_text(&attrs.assignee),
            attrs.priority.map(Value::Integer).unwrap_or(Value::Null),
            attrs.effort.map(Value::Integer).unwrap_or(Value::Null),
            opt_text(&attrs.milestone),
            json(&attrs.blocked_by),
            opt_text(&attrs.planned_start),
            opt_text(&attrs.planned_end),
            opt_text(&self.parent_id),
            json(attrs),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let description = string_or_default(row, "description")?;
        let attributes: TaskAttributes = from_json(row, "config")?;
        Ok(Task {
            id: row.get("id")?,
            title: row.get("title")?,
            completed: row.get::<_, i64>("completed")? != 0,
            section: row.get("section")?,
            attributes,
            description: if description.is_empty() {
                Vec::new()
            } else {
                description.lines().map(str::to_string).collect()
            },
            children: Vec::new(),
            parent_id: row.get("parent_id")?,
        })
    }

    fn flatten(items: &[Self]) -> Vec<Vec<Value>> {
        let mut rows = Vec::new();
        Task::walk(items, &mut |task| rows.push(task.to_row()));
        rows
    }

    /// Builds the task forest from rows in rowid order.
    ///
    /// A parent may have a higher rowid than its children after an upsert
    /// re-parents a row. Rows caught in a parent cycle become roots.
    fn assemble(rows: Vec<Self>) -> Vec<Self> {
        let order: HashMap<String, usize> = rows
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.id.clone(), idx))
            .collect();
        let mut pending: HashMap<String, Vec<Task>> = HashMap::new();
        let mut roots = Vec::new();
        for task in rows {
            let parent = task
                .parent_id
                .clone()
                .filter(|parent| *parent != task.id && order.contains_key(parent));
            match parent {
                Some(parent) => pending.entry(parent).or_default().push(task),
                None => roots.push(task),
            }
        }
        for root in &mut roots {
            attach_children(root, &mut pending);
        }
        while let Some(mut orphan) = take_earliest(&mut pending, &order) {
            log::warn!(
                "event=cache_assemble module=cache status=orphan table=tasks id={}",
                orphan.id
            );
            orphan.parent_id = None;
            attach_children(&mut orphan, &mut pending);
            roots.push(orphan);
        }
        roots.sort_by_key(|task| order.get(&task.id).copied().unwrap_or(usize::MAX));
        roots
    }
}

fn attach_children(task: &mut Task, pending: &mut HashMap<String, Vec<Task>>) {
    if let Some(mut children) = pending.remove(&task.id) {
        for child in &mut children {
            attach_children(child, pending);
        }
        task.children = children;
    }
}

/// Removes the pending task with the lowest rowid.
fn take_earliest(
    pending: &mut HashMap<String, Vec<Task>>,
    order: &HashMap<String, usize>,
) -> Option<Task> {
    let (parent, pos) = pending
        .iter()
        .flat_map(|(parent, tasks)| {
            tasks.iter().enumerate().map(move |(pos, task)| {
                let rank = order.get(&task.id).copied().unwrap_or(usize::MAX);
                (rank, parent, pos)
            })
        })
        .min_by_key(|(rank, _, _)| *rank)
        .map(|(_, parent, pos)| (parent.clone(), pos))?;
    let tasks = pending.get_mut(&parent)?;
    let task = tasks.remove(pos);
    if tasks.is_empty() {
        pending.remove(&parent);
    }
    Some(task)
}

impl CachedEntity for Note {
    fn table() -> &'static TableDef {
        &schema::NOTES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            text(&self.content),
            Value::Integer(i64::from(self.revision)),
            text(&self.created_at),
            text(&self.updated_at),
            text(self.mode.as_str()),
            json(&self.paragraphs),
            json(&self.custom_sections),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Note {
            id: row.get("id")?,
            title: row.get("title")?,
            content: string_or_default(row, "content")?,
            revision: row.get("revision")?,
            created_at: string_or_default(row, "created_at")?,
            updated_at: string_or_default(row, "updated_at")?,
            mode: NoteMode::parse(&string_or_default(row, "mode")?),
            paragraphs: from_json(row, "paragraphs")?,
            custom_sections: from_json(row, "custom_sections")?,
        })
    }
}

impl CachedEntity for Goal {
    fn table() -> &'static TableDef {
        &schema::GOALS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            text(&self.description),
            text(&self.goal_type),
            opt_text(&self.kpi),
            opt_text(&self.start_date),
            opt_text(&self.end_date),
            text(&self.status),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Goal {
            id: row.get("id")?,
            title: row.get("title")?,
            description: string_or_default(row, "description")?,
            goal_type: string_or_default(row, "type")?,
            kpi: row.get("kpi")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            status: string_or_default(row, "status")?,
        })
    }
}

impl CachedEntity for Milestone {
    fn table() -> &'static TableDef {
        &schema::MILESTONES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.name),
            opt_text(&self.target),
            text(&self.status),
            text(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Milestone {
            id: row.get("id")?,
            name: row.get("name")?,
            target: row.get("target")?,
            status: string_or_default(row, "status")?,
            description: string_or_default(row, "description")?,
        })
    }
}

impl CachedEntity for Idea {
    fn table() -> &'static TableDef {
        &schema::IDEAS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            text(&self.status),
            opt_text(&self.category),
            opt_text(&self.created),
            json(&self.links),
            text(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Idea {
            id: row.get("id")?,
            title: row.get("title")?,
            status: string_or_default(row, "status")?,
            category: row.get("category")?,
            created: row.get("created")?,
            links: from_json(row, "links")?,
            description: string_or_default(row, "description")?,
        })
    }
}

impl CachedEntity for Retrospective {
    fn table() -> &'static TableDef {
        &schema::RETROSPECTIVES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            opt_text(&self.date),
            text(&self.status),
            json(&self.continue_items),
            json(&self.stop_items),
            json(&self.start_items),
            joined([&self.continue_items, &self.stop_items, &self.start_items]),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Retrospective {
            id: row.get("id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            status: string_or_default(row, "status")?,
            continue_items: from_json(row, "continue_items")?,
            stop_items: from_json(row, "stop_items")?,
            start_items: from_json(row, "start_items")?,
        })
    }
}

impl CachedEntity for StickyNote {
    fn table() -> &'static TableDef {
        &schema::STICKY_NOTES
    }

    fn to_row(&self) -> Vec<Value> {
        let (width, height) = match self.size {
            Some(size) => (Value::Integer(size.width), Value::Integer(size.height)),
            None => (Value::Null, Value::Null),
        };
        vec![
            text(&self.id),
            text(&self.content),
            text(&self.color),
            Value::Integer(self.position.x),
            Value::Integer(self.position.y),
            width,
            height,
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let width: Option<i64> = row.get("width")?;
        let height: Option<i64> = row.get("height")?;
        Ok(StickyNote {
            id: row.get("id")?,
            content: string_or_default(row, "content")?,
            color: string_or_default(row, "color")?,
            position: Position {
                x: row.get::<_, Option<i64>>("position_x")?.unwrap_or(0),
                y: row.get::<_, Option<i64>>("position_y")?.unwrap_or(0),
            },
            size: width.zip(height).map(|(width, height)| Size { width, height }),
        })
    }
}

impl CachedEntity for Mindmap {
    fn table() -> &'static TableDef {
        &schema::MINDMAPS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![text(&self.id), text(&self.title), json(&self.nodes)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Mindmap {
            id: row.get("id")?,
            title: row.get("title")?,
            nodes: from_json(row, "nodes")?,
        })
    }
}

impl CachedEntity for C4Component {
    fn table() -> &'static TableDef {
        &schema::C4_COMPONENTS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.name),
            text(&self.level),
            text(&self.component_type),
            opt_text(&self.technology),
            text(&self.description),
            Value::Integer(self.position.x),
            Value::Integer(self.position.y),
            json(&self.connections),
            json(&self.children),
            opt_text(&self.parent),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(C4Component {
            id: row.get("id")?,
            name: row.get("name")?,
            level: string_or_default(row, "level")?,
            component_type: string_or_default(row, "type")?,
            technology: row.get("technology")?,
            description: string_or_default(row, "description")?,
            position: Position {
                x: row.get::<_, Option<i64>>("position_x")?.unwrap_or(0),
                y: row.get::<_, Option<i64>>("position_y")?.unwrap_or(0),
            },
            connections: from_json(row, "connections")?,
            children: from_json(row, "children")?,
            parent: row.get("parent")?,
        })
    }
}

impl CachedEntity for Customer {
    fn table() -> &'static TableDef {
        &schema::CUSTOMERS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.name),
            opt_text(&self.email),
            opt_text(&self.phone),
            opt_text(&self.address),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Customer {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            address: row.get("address")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}

impl CachedEntity for Company {
    fn table() -> &'static TableDef {
        &schema::COMPANIES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.name),
            opt_text(&self.industry),
            opt_text(&self.website),
            opt_text(&self.phone),
            opt_text(&self.address),
            opt_text(&self.created),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Company {
            id: row.get("id")?,
            name: row.get("name")?,
            industry: row.get("industry")?,
            website: row.get("website")?,
            phone: row.get("phone")?,
            address: row.get("address")?,
            created: row.get("created")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}
