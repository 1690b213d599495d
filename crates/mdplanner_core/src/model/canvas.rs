//! Planning boards: SWOT, risk matrix, canvas-style boards, strategic
//! level trees and capacity plans.
//!
//! Canvas-style boards (lean canvas, business model, project value,
//! brief) share one shape: a fixed, ordered set of headed lists.

use super::EntityKind;
use serde::{Deserialize, Serialize};

/// Bulleted list under one `###` heading of a board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlock {
    pub heading: String,
    pub items: Vec<String>,
}

/// One empty block per heading, in order.
pub fn empty_blocks(headings: &[&str]) -> Vec<ListBlock> {
    headings
        .iter()
        .map(|heading| ListBlock {
            heading: heading.to_string(),
            items: Vec::new(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swot {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

impl Swot {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            date: None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            opportunities: Vec::new(),
            threats: Vec::new(),
        }
    }
}

record_entity!(Swot, SwotPatch, EntityKind::Swot, {
    title: String,
    date: Option<String>,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    opportunities: Vec<String>,
    threats: Vec<String>,
});

/// Impact / probability risk matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub high_impact_high_prob: Vec<String>,
    pub high_impact_low_prob: Vec<String>,
    pub low_impact_high_prob: Vec<String>,
    pub low_impact_low_prob: Vec<String>,
}

impl RiskAnalysis {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            date: None,
            high_impact_high_prob: Vec::new(),
            high_impact_low_prob: Vec::new(),
            low_impact_high_prob: Vec::new(),
            low_impact_low_prob: Vec::new(),
        }
    }
}

record_entity!(RiskAnalysis, RiskAnalysisPatch, EntityKind::RiskAnalysis, {
    title: String,
    date: Option<String>,
    high_impact_high_prob: Vec<String>,
    high_impact_low_prob: Vec<String>,
    low_impact_high_prob: Vec<String>,
    low_impact_low_prob: Vec<String>,
});

/// Declares a board made of the given headed lists.
macro_rules! block_board {
    ($(#[$meta:meta])* $ty:ident, $patch:ident, $kind:expr, [$($heading:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $ty {
            pub id: String,
            pub title: String,
            pub date: Option<String>,
            /// Known headings first, in [`Self::HEADINGS`] order.
            pub blocks: Vec<ListBlock>,
        }

        impl $ty {
            pub const HEADINGS: &'static [&'static str] = &[$($heading),+];

            pub fn new(title: impl Into<String>) -> Self {
                Self {
                    id: String::new(),
                    title: title.into(),
                    date: None,
                    blocks: empty_blocks(Self::HEADINGS),
                }
            }

            pub fn items(&self, heading: &str) -> &[String] {
                self.blocks
                    .iter()
                    .find(|block| block.heading == heading)
                    .map(|block| block.items.as_slice())
                    .unwrap_or_default()
            }

            pub fn set_items(&mut self, heading: &str, items: Vec<String>) {
                match self.blocks.iter_mut().find(|block| block.heading == heading) {
                    Some(block) => block.items = items,
                    None => self.blocks.push(ListBlock {
                        heading: heading.to_string(),
                        items,
                    }),
                }
            }
        }

        record_entity!($ty, $patch, $kind, {
            title: String,
            date: Option<String>,
            blocks: Vec<ListBlock>,
        });
    };
}

block_board!(
    LeanCanvas,
    LeanCanvasPatch,
    EntityKind::LeanCanvas,
    [
        "Problem",
        "Solution",
        "Unique Value Proposition",
        "Unfair Advantage",
        "Customer Segments",
        "Existing Alternatives",
        "Key Metrics",
        "High-Level Concept",
        "Channels",
        "Early Adopters",
        "Cost Structure",
        "Revenue Streams",
    ]
);

block_board!(
    BusinessModel,
    BusinessModelPatch,
    EntityKind::BusinessModel,
    [
        "Key Partners",
        "Key Activities",
        "Key Resources",
        "Value Propositions",
        "Customer Relationships",
        "Channels",
        "Customer Segments",
        "Cost Structure",
        "Revenue Streams",
    ]
);

block_board!(
    ProjectValue,
    ProjectValuePatch,
    EntityKind::ProjectValue,
    ["Customer Segments", "Problem", "Solution", "Benefit"]
);

block_board!(
    /// Project brief with RACI roles and guardrails.
    Brief,
    BriefPatch,
    EntityKind::Brief,
    [
        "Summary",
        "Mission",
        "Responsible",
        "Accountable",
        "Consulted",
        "Informed",
        "High Level Budget",
        "High Level Timeline",
        "Culture",
        "Change Capacity",
        "Guiding Principles",
    ]
);

/// Layers of a strategic level tree, top-down.
pub const STRATEGIC_LEVELS: &[(&str, &str)] = &[
    ("vision", "Vision"),
    ("mission", "Mission"),
    ("goals", "Goals"),
    ("objectives", "Objectives"),
    ("strategies", "Strategies"),
    ("tactics", "Tactics"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicLevel {
    /// Unique within its builder.
    pub id: String,
    pub title: String,
    /// One of the keys of [`STRATEGIC_LEVELS`].
    pub level: String,
    pub parent: Option<String>,
    pub description: String,
    pub linked_tasks: Vec<String>,
    pub linked_milestones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicBuilder {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub levels: Vec<StrategicLevel>,
}

impl StrategicBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            date: None,
            levels: Vec::new(),
        }
    }

    /// Levels whose parent is missing from the builder.
    pub fn orphans(&self) -> Vec<&StrategicLevel> {
        self.levels
            .iter()
            .filter(|level| {
                level
                    .parent
                    .as_deref()
                    .is_some_and(|parent| !self.levels.iter().any(|other| other.id == parent))
            })
            .collect()
    }
}

record_entity!(StrategicBuilder, StrategicBuilderPatch, EntityKind::StrategicBuilder, {
    title: String,
    date: Option<String>,
    levels: Vec<StrategicLevel>,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: Option<String>,
    pub hours_per_day: f64,
    pub working_days: Vec<String>,
}

/// Hours booked for one member in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Monday of the week, `YYYY-MM-DD`.
    pub week: String,
    pub member_id: String,
    pub hours: f64,
    /// `project`, `task` or `milestone`.
    pub target_type: String,
    pub target_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub budget_hours: Option<f64>,
    pub team_members: Vec<TeamMember>,
    pub allocations: Vec<Allocation>,
}

impl CapacityPlan {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            date: None,
            budget_hours: None,
            team_members: Vec::new(),
            allocations: Vec::new(),
        }
    }

    /// Allocated hours of `member_id` in `week`.
    pub fn allocated(&self, member_id: &str, week: &str) -> f64 {
        self.allocations
            .iter()
            .filter(|a| a.member_id == member_id && a.week == week)
            .map(|a| a.hours)
            .sum()
    }

    /// Weekly capacity of a member: daily hours times working days.
    pub fn weekly_capacity(&self, member_id: &str) -> f64 {
        self.team_members
            .iter()
            .find(|member| member.id == member_id)
            .map(|member| member.hours_per_day * member.working_days.len() as f64)
            .unwrap_or(0.0)
    }
}

record_entity!(CapacityPlan, CapacityPlanPatch, EntityKind::CapacityPlan, {
    title: String,
    date: Option<String>,
    budget_hours: Option<f64>,
    team_members: Vec<TeamMember>,
    allocations: Vec<Allocation>,
});
