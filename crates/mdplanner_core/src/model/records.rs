//! Flat records stored as `## Title {attrs}` blocks in their own sections.
//!
//! # Invariants
//! - Absent optional attributes are `None` (or empty collections) and are
//!   not written back to the document.

use super::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    /// `enterprise` or `project`.
    pub goal_type: String,
    pub kpi: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String,
}

impl Goal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            goal_type: "project".to_string(),
            kpi: None,
            start_date: None,
            end_date: None,
            status: "planning".to_string(),
        }
    }
}

record_entity!(Goal, GoalPatch, EntityKind::Goal, {
    title: String,
    description: String,
    goal_type: String,
    kpi: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    status: String,
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub target: Option<String>,
    pub status: String,
    pub description: String,
}

impl Milestone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            target: None,
            status: "open".to_string(),
            description: String::new(),
        }
    }
}

record_entity!(Milestone, MilestonePatch, EntityKind::Milestone, {
    name: String,
    target: Option<String>,
    status: String,
    description: String,
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub status: String,
    pub category: Option<String>,
    pub created: Option<String>,
    /// Ids of related ideas.
    pub links: Vec<String>,
    pub description: String,
}

impl Idea {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            status: "new".to_string(),
            category: None,
            created: None,
            links: Vec::new(),
            description: String::new(),
        }
    }
}

record_entity!(Idea, IdeaPatch, EntityKind::Idea, {
    title: String,
    status: String,
    category: Option<String>,
    created: Option<String>,
    links: Vec<String>,
    description: String,
});

/// Continue / stop / start retrospective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retrospective {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub status: String,
    pub continue_items: Vec<String>,
    pub stop_items: Vec<String>,
    pub start_items: Vec<String>,
}

impl Retrospective {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            date: None,
            status: "open".to_string(),
            continue_items: Vec::new(),
            stop_items: Vec::new(),
            start_items: Vec::new(),
        }
    }
}

record_entity!(Retrospective, RetrospectivePatch, EntityKind::Retrospective, {
    title: String,
    date: Option<String>,
    status: String,
    continue_items: Vec<String>,
    stop_items: Vec<String>,
    start_items: Vec<String>,
});

/// Canvas sticky note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickyNote {
    pub id: String,
    pub content: String,
    pub color: String,
    pub position: Position,
    pub size: Option<Size>,
}

impl StickyNote {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            color: "yellow".to_string(),
            position: Position::default(),
            size: None,
        }
    }
}

record_entity!(StickyNote, StickyNotePatch, EntityKind::StickyNote, {
    content: String,
    color: String,
    position: Position,
    size: Option<Size>,
});

/// One bullet of a mindmap; ids are derived from the mindmap id and the
/// node's position, so they are not stored in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindmapNode {
    pub id: String,
    pub text: String,
    /// Zero for root bullets.
    pub level: usize,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mindmap {
    pub id: String,
    pub title: String,
    pub nodes: Vec<MindmapNode>,
}

impl Mindmap {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            nodes: Vec::new(),
        }
    }

    pub fn node_id(mindmap_id: &str, index: usize) -> String {
        format!("{mindmap_id}_node_{}", index + 1)
    }

    /// Rewrites node ids and parent links for the current mindmap id.
    fn renumber_nodes(&mut self) {
        let old_ids: Vec<String> = self.nodes.iter().map(|node| node.id.clone()).collect();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.id = Mindmap::node_id(&self.id, index);
        }
        let new_ids: Vec<String> = self.nodes.iter().map(|node| node.id.clone()).collect();
        for node in &mut self.nodes {
            if let Some(parent) = node.parent.as_mut() {
                if let Some(pos) = old_ids.iter().position(|old| old == parent) {
                    *parent = new_ids[pos].clone();
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MindmapPatch {
    pub title: Option<String>,
    pub nodes: Option<Vec<MindmapNode>>,
}

impl Entity for Mindmap {
    const KIND: EntityKind = EntityKind::Mindmap;
    type Patch = MindmapPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
        self.renumber_nodes();
    }

    fn apply_patch(&mut self, patch: MindmapPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(nodes) = patch.nodes {
            self.nodes = nodes;
            self.renumber_nodes();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct C4Connection {
    pub target: String,
    pub label: String,
}

/// Architecture element on the C4 canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct C4Component {
    pub id: String,
    pub name: String,
    /// `context`, `container`, `component` or `code`.
    pub level: String,
    pub component_type: String,
    pub technology: Option<String>,
    pub description: String,
    pub position: Position,
    pub connections: Vec<C4Connection>,
    pub children: Vec<String>,
    pub parent: Option<String>,
}

impl C4Component {
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            level: level.into(),
            component_type: "system".to_string(),
            technology: None,
            description: String::new(),
            position: Position::default(),
            connections: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

record_entity!(C4Component, C4ComponentPatch, EntityKind::C4Component, {
    name: String,
    level: String,
    component_type: String,
    technology: Option<String>,
    description: String,
    position: Position,
    connections: Vec<C4Connection>,
    children: Vec<String>,
    parent: Option<String>,
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: String,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            notes: String::new(),
        }
    }
}

record_entity!(Customer, CustomerPatch, EntityKind::Customer, {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    notes: String,
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created: Option<String>,
    pub notes: String,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            industry: None,
            website: None,
            phone: None,
            address: None,
            created: None,
            notes: String::new(),
        }
    }
}

record_entity!(Company, CompanyPatch, EntityKind::Company, {
    name: String,
    industry: Option<String>,
    website: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created: Option<String>,
    notes: String,
});

#[cfg(test)]
mod tests {
    use super::{Goal, GoalPatch, Mindmap, MindmapNode};
    use crate::model::Entity;

    #[test]
    fn patch_preserves_unset_fields() {
        let mut goal = Goal::new("Grow");
        goal.kpi = Some("ARR".to_string());
        goal.apply_patch(GoalPatch {
            status: Some("active".to_string()),
            ..GoalPatch::default()
        });
        assert_eq!(goal.status, "active");
        assert_eq!(goal.kpi.as_deref(), Some("ARR"));
    }

    #[test]
    fn mindmap_set_id_renumbers_nodes() {
        let mut map = Mindmap::new("Plan");
        map.nodes = vec![
            MindmapNode {
                id: "a".to_string(),
                text: "Root".to_string(),
                level: 0,
                parent: None,
            },
            MindmapNode {
                id: "b".to_string(),
                text: "Leaf".to_string(),
                level: 1,
                parent: Some("a".to_string()),
            },
        ];
        map.set_id("mindmap_4".to_string());
        assert_eq!(map.nodes[0].id, "mindmap_4_node_1");
        assert_eq!(map.nodes[1].parent.as_deref(), Some("mindmap_4_node_1"));
    }
}
