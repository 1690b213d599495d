//! Task board records.
//!
//! # Invariants
//! - A child task always carries its parent's section.
//! - `parent_id` mirrors the tree shape and is `None` for root tasks.

use super::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// Structured `{key: value; ...}` attributes of a task line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAttributes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<String>,
}

impl TaskAttributes {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Checkbox item on the task board, possibly with nested subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub section: String,
    pub attributes: TaskAttributes,
    /// Indented free-text lines below the checkbox line.
    pub description: Vec<String>,
    pub children: Vec<Task>,
    pub parent_id: Option<String>,
}

impl Task {
    /// Creates an open root task in `section`; the id is assigned on add.
    pub fn new(title: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            completed: false,
            section: section.into(),
            attributes: TaskAttributes::default(),
            description: Vec::new(),
            children: Vec::new(),
            parent_id: None,
        }
    }

    pub fn with_attributes(mut self, attributes: TaskAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Makes this task a subtask of `parent_id` when added.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets `section` on this task and every descendant.
    pub fn relabel_section(&mut self, section: &str) {
        self.section = section.to_string();
        for child in &mut self.children {
            child.relabel_section(section);
        }
    }

    /// Recomputes `parent_id` for `tasks` and their descendants.
    pub fn link_parents(tasks: &mut [Task], parent: Option<&str>) {
        for task in tasks {
            task.parent_id = parent.map(str::to_string);
            let id = task.id.clone();
            Task::link_parents(&mut task.children, Some(&id));
        }
    }

    /// Visits tasks in pre-order.
    pub fn walk<'a>(tasks: &'a [Task], visit: &mut dyn FnMut(&'a Task)) {
        for task in tasks {
            visit(task);
            Task::walk(&task.children, visit);
        }
    }

    fn walk_mut(tasks: &mut [Task], visit: &mut dyn FnMut(&mut Task)) {
        for task in tasks {
            visit(task);
            Task::walk_mut(&mut task.children, visit);
        }
    }

    /// Assigns ids above the current maximum to every task lacking one.
    pub fn fill_missing_ids(tasks: &mut [Task]) {
        let mut next = super::max_numeric_id(tasks);
        Task::walk_mut(tasks, &mut |task| {
            if task.id.trim().is_empty() {
                next += 1;
                task.id = next.to_string();
            }
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    /// Moving a task moves its whole subtree. Ignored for subtasks,
    /// which always live in their parent's section.
    pub section: Option<String>,
    pub attributes: Option<TaskAttributes>,
    pub description: Option<Vec<String>>,
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;
    type Patch = TaskPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
        let id = self.id.clone();
        for child in &mut self.children {
            child.parent_id = Some(id.clone());
        }
    }

    fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(section) = patch.section {
            if self.parent_id.is_none() {
                self.relabel_section(&section);
            } else {
                log::warn!(
                    "event=task_patch module=model status=ignored id={} field=section reason=subtask_follows_parent",
                    self.id
                );
            }
        }
        if let Some(attributes) = patch.attributes {
            self.attributes = attributes;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }

    fn find<'a>(items: &'a [Self], id: &str) -> Option<&'a Self> {
        for task in items {
            if task.id == id {
                return Some(task);
            }
            if let Some(found) = Task::find(&task.children, id) {
                return Some(found);
            }
        }
        None
    }

    fn find_mut<'a>(items: &'a mut [Self], id: &str) -> Option<&'a mut Self> {
        for task in items.iter_mut() {
            if task.id == id {
                return Some(task);
            }
            if let Some(found) = Task::find_mut(&mut task.children, id) {
                return Some(found);
            }
        }
        None
    }

    fn fill_nested_ids(&mut self, reserve: &mut dyn FnMut() -> String) {
        Task::walk_mut(&mut self.children, &mut |child| {
            if child.id.trim().is_empty() {
                child.id = reserve();
            }
        });
        let id = self.id.clone();
        Task::link_parents(&mut self.children, Some(&id));
    }

    /// Attaches `item` below its parent when the parent exists, otherwise
    /// appends it as a root task.
    fn insert(items: &mut Vec<Self>, mut item: Self) {
        if let Some(parent_id) = item.parent_id.clone() {
            if let Some(parent) = Task::find_mut(items, &parent_id) {
                item.relabel_section(&parent.section.clone());
                parent.children.push(item);
                return;
            }
            log::warn!(
                "event=task_insert module=model status=degraded parent_id={} reason=parent_missing",
                parent_id
            );
            item.parent_id = None;
        }
        items.push(item);
    }

    fn remove(items: &mut Vec<Self>, id: &str) -> bool {
        let before = items.len();
        items.retain(|task| task.id != id);
        if items.len() != before {
            return true;
        }
        items.iter_mut().any(|task| Task::remove(&mut task.children, id))
    }

    fn collect_ids(items: &[Self], out: &mut Vec<String>) {
        Task::walk(items, &mut |task| out.push(task.id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskPatch};
    use crate::model::{all_ids, Entity};

    fn tree() -> Vec<Task> {
        let mut parent = Task::new("Parent", "Todo");
        parent.id = "1".to_string();
        let mut child = Task::new("Child", "Todo");
        child.id = "2".to_string();
        parent.children.push(child);
        let mut tasks = vec![parent];
        Task::link_parents(&mut tasks, None);
        tasks
    }

    #[test]
    fn section_change_moves_subtree() {
        let mut tasks = tree();
        let parent = Task::find_mut(&mut tasks, "1").expect("parent exists");
        parent.apply_patch(TaskPatch {
            section: Some("Done".to_string()),
            ..TaskPatch::default()
        });
        assert_eq!(tasks[0].children[0].section, "Done");
    }

    #[test]
    fn section_patch_on_subtask_is_ignored() {
        let mut tasks = tree();
        let child = Task::find_mut(&mut tasks, "2").expect("child exists");
        child.apply_patch(TaskPatch {
            section: Some("Done".to_string()),
            title: Some("Renamed".to_string()),
            ..TaskPatch::default()
        });
        assert_eq!(tasks[0].children[0].section, "Todo");
        assert_eq!(tasks[0].children[0].title, "Renamed");
    }

    #[test]
    fn nested_ids_come_from_the_reserver() {
        let mut parent = Task::new("Parent", "Todo");
        parent.id = "10".to_string();
        let mut child = Task::new("Child", "Todo");
        child.children.push(Task::new("Grandchild", "Todo"));
        parent.children.push(child);

        let mut next = 10;
        parent.fill_nested_ids(&mut || {
            next += 1;
            next.to_string()
        });
        assert_eq!(parent.children[0].id, "11");
        assert_eq!(parent.children[0].parent_id.as_deref(), Some("10"));
        assert_eq!(parent.children[0].children[0].id, "12");
        assert_eq!(parent.children[0].children[0].parent_id.as_deref(), Some("11"));
    }

    #[test]
    fn insert_with_unknown_parent_becomes_root() {
        let mut tasks = tree();
        let mut orphan = Task::new("Orphan", "Todo").with_parent("99");
        orphan.id = "3".to_string();
        Task::insert(&mut tasks, orphan);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].parent_id, None);
    }

    #[test]
    fn remove_reaches_nested_tasks() {
        let mut tasks = tree();
        assert!(Task::remove(&mut tasks, "2"));
        assert_eq!(all_ids(&tasks), vec!["1".to_string()]);
        assert!(!Task::remove(&mut tasks, "2"));
    }

    #[test]
    fn fill_missing_ids_continues_after_max() {
        let mut tasks = tree();
        tasks.push(Task::new("Fresh", "Todo"));
        Task::fill_missing_ids(&mut tasks);
        assert_eq!(tasks[1].id, "3");
    }
}
