//! Typed project-management records persisted in the project document.
//!
//! # Responsibility
//! - Define one record type per entity section of the document.
//! - Provide the shared [`Entity`] contract used by the document facade,
//!   the store mapping and the read-through cache.
//!
//! # Invariants
//! - Every record carries a stable id inside its entity's own namespace.
//! - Task ids are unique document-wide; a child task is reachable only via
//!   its parent's child list.
//! - Deletion is plain removal; there are no tombstones.

/// Implements [`Entity`] for a flat record and declares its patch type.
macro_rules! record_entity {
    ($ty:ident, $patch:ident, $kind:expr, { $($field:ident : $fty:ty),* $(,)? }) => {
        #[derive(Debug, Clone, Default)]
        pub struct $patch {
            $(pub $field: Option<$fty>,)*
        }

        impl $crate::model::Entity for $ty {
            const KIND: $crate::model::EntityKind = $kind;
            type Patch = $patch;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn apply_patch(&mut self, patch: $patch) {
                $(
                    if let Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            }
        }
    };
}

pub mod billing;
pub mod canvas;
pub mod crm;
pub mod note;
pub mod records;
pub mod task;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Addressable record type with its own id namespace and document section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Note,
    Goal,
    Milestone,
    Idea,
    Retrospective,
    StickyNote,
    Mindmap,
    C4Component,
    Customer,
    Company,
    Swot,
    RiskAnalysis,
    LeanCanvas,
    BusinessModel,
    ProjectValue,
    Brief,
    CapacityPlan,
    StrategicBuilder,
    Rate,
    Quote,
    Invoice,
    Contact,
    Deal,
    Interaction,
    TimeEntry,
}

impl EntityKind {
    pub const ALL: [EntityKind; 26] = [
        EntityKind::Task,
        EntityKind::Note,
        EntityKind::Goal,
        EntityKind::Milestone,
        EntityKind::Idea,
        EntityKind::Retrospective,
        EntityKind::StickyNote,
        EntityKind::Mindmap,
        EntityKind::C4Component,
        EntityKind::Customer,
        EntityKind::Company,
        EntityKind::Swot,
        EntityKind::RiskAnalysis,
        EntityKind::LeanCanvas,
        EntityKind::BusinessModel,
        EntityKind::ProjectValue,
        EntityKind::Brief,
        EntityKind::CapacityPlan,
        EntityKind::StrategicBuilder,
        EntityKind::Rate,
        EntityKind::Quote,
        EntityKind::Invoice,
        EntityKind::Contact,
        EntityKind::Deal,
        EntityKind::Interaction,
        EntityKind::TimeEntry,
    ];

    /// Identifier prefix written in `<!-- id: prefix_N -->` comments.
    ///
    /// Tasks use bare integers and therefore have no prefix.
    pub fn id_prefix(self) -> Option<&'static str> {
        match self {
            Self::Task => None,
            Self::Note => Some("note"),
            Self::Goal => Some("goal"),
            Self::Milestone => Some("milestone"),
            Self::Idea => Some("idea"),
            Self::Retrospective => Some("retro"),
            Self::StickyNote => Some("sticky"),
            Self::Mindmap => Some("mindmap"),
            Self::C4Component => Some("c4_component"),
            Self::Customer => Some("customer"),
            Self::Company => Some("company"),
            Self::Swot => Some("swot"),
            Self::RiskAnalysis => Some("risk"),
            Self::LeanCanvas => Some("lean_canvas"),
            Self::BusinessModel => Some("business_model"),
            Self::ProjectValue => Some("project_value"),
            Self::Brief => Some("brief"),
            Self::CapacityPlan => Some("capacity"),
            Self::StrategicBuilder => Some("strategic"),
            Self::Rate => Some("rate"),
            Self::Quote => Some("quote"),
            Self::Invoice => Some("invoice"),
            Self::Contact => Some("contact"),
            Self::Deal => Some("deal"),
            Self::Interaction => Some("interaction"),
            Self::TimeEntry => Some("time_entry"),
        }
    }

    /// Stable lowercase name used in logs, counters and search hits.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Note => "note",
            Self::Goal => "goal",
            Self::Milestone => "milestone",
            Self::Idea => "idea",
            Self::Retrospective => "retrospective",
            Self::StickyNote => "sticky_note",
            Self::Mindmap => "mindmap",
            Self::C4Component => "c4_component",
            Self::Customer => "customer",
            Self::Company => "company",
            Self::Swot => "swot",
            Self::RiskAnalysis => "risk_analysis",
            Self::LeanCanvas => "lean_canvas",
            Self::BusinessModel => "business_model",
            Self::ProjectValue => "project_value",
            Self::Brief => "brief",
            Self::CapacityPlan => "capacity_plan",
            Self::StrategicBuilder => "strategic_builder",
            Self::Rate => "rate",
            Self::Quote => "quote",
            Self::Invoice => "invoice",
            Self::Contact => "contact",
            Self::Deal => "deal",
            Self::Interaction => "interaction",
            Self::TimeEntry => "time_entry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Formats the `n`-th identifier of this kind.
    pub fn format_id(self, n: u64) -> String {
        match self.id_prefix() {
            Some(prefix) => format!("{prefix}_{n}"),
            None => n.to_string(),
        }
    }

    /// Returns the numeric suffix of an identifier of this kind.
    pub fn numeric_suffix(self, id: &str) -> Option<u64> {
        match self.id_prefix() {
            None => id.trim().parse().ok(),
            Some(prefix) => id
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|digits| digits.parse().ok()),
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared contract for every record type held by the document.
///
/// Collection helpers default to a flat list; tree-shaped entities
/// (tasks) override them to recurse into owned children.
pub trait Entity: Clone + std::fmt::Debug + PartialEq + Sized {
    const KIND: EntityKind;

    /// Partial update; `None` fields are preserved, never nulled.
    type Patch: Default + Clone + std::fmt::Debug;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Hook run once when the facade creates the record.
    fn on_create(&mut self, _now: &str) {}

    /// Hook run after a patch has been merged.
    fn on_update(&mut self, _now: &str) {}

    /// Gives nested records without an id one from `reserve`.
    fn fill_nested_ids(&mut self, _reserve: &mut dyn FnMut() -> String) {}

    fn find<'a>(items: &'a [Self], id: &str) -> Option<&'a Self> {
        items.iter().find(|item| item.id() == id)
    }

    fn find_mut<'a>(items: &'a mut [Self], id: &str) -> Option<&'a mut Self> {
        items.iter_mut().find(|item| item.id() == id)
    }

    fn insert(items: &mut Vec<Self>, item: Self) {
        items.push(item);
    }

    /// Removes the record with `id`; returns whether anything was removed.
    fn remove(items: &mut Vec<Self>, id: &str) -> bool {
        let before = items.len();
        items.retain(|item| item.id() != id);
        items.len() != before
    }

    fn collect_ids(items: &[Self], out: &mut Vec<String>) {
        out.extend(items.iter().map(|item| item.id().to_string()));
    }
}

/// Returns every id held by `items`, including nested records.
pub fn all_ids<E: Entity>(items: &[E]) -> Vec<String> {
    let mut ids = Vec::new();
    E::collect_ids(items, &mut ids);
    ids
}

/// Highest numeric id suffix present in `items`.
pub fn max_numeric_id<E: Entity>(items: &[E]) -> u64 {
    all_ids(items)
        .iter()
        .filter_map(|id| E::KIND.numeric_suffix(id))
        .max()
        .unwrap_or(0)
}

/// Assigns fresh ids above the current maximum to records without one.
pub fn fill_missing_ids<E: Entity>(items: &mut [E]) {
    let mut next = max_numeric_id(items);
    for item in items.iter_mut() {
        if item.id().trim().is_empty() {
            next += 1;
            item.set_id(E::KIND.format_id(next));
        }
    }
}
