//! Codecs for planning boards.
//!
//! Boards are records whose body is a run of `###` subsections:
//!
//! ```text
//! ## Market entry {date: 2026-01-05}
//!
//! <!-- id: swot_1 -->
//! ### Strengths
//!
//! - Fast team
//!
//! ### Threats
//!
//! - Incumbents
//! ```
//!
//! Strategic levels and capacity rows are bullets with their own
//! attribute blocks, e.g. `- Grow {id: level_2; parent: level_1}`.

use super::attrs::{lookup, parse_list, AttrWriter};
use super::lexer::LineKind;
use super::records::{
    attr_bullet, bullet_attrs, bullets_under, fill_local_ids, parse_f64, render_lists,
    subsections, RawRecord, RecordCodec,
};
use crate::model::canvas::{
    Allocation, Brief, BusinessModel, CapacityPlan, LeanCanvas, ProjectValue, RiskAnalysis,
    StrategicBuilder, StrategicLevel, Swot, TeamMember, STRATEGIC_LEVELS,
};

const RISK_HEADINGS: [&str; 4] = [
    "High Impact / High Probability",
    "High Impact / Low Probability",
    "Low Impact / High Probability",
    "Low Impact / Low Probability",
];

fn dated(date: Option<&str>) -> AttrWriter {
    AttrWriter::new().opt("date", date)
}

impl RecordCodec for Swot {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut swot = Swot::new(record.title);
        swot.date = record.attr_string("date");
        let parts = subsections(&record.body);
        swot.strengths = bullets_under(&parts, "Strengths");
        swot.weaknesses = bullets_under(&parts, "Weaknesses");
        swot.opportunities = bullets_under(&parts, "Opportunities");
        swot.threats = bullets_under(&parts, "Threats");
        swot
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        dated(self.date.as_deref())
    }

    fn body(&self) -> String {
        render_lists(&[
            ("Strengths", &self.strengths),
            ("Weaknesses", &self.weaknesses),
            ("Opportunities", &self.opportunities),
            ("Threats", &self.threats),
        ])
    }
}

impl RecordCodec for RiskAnalysis {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut risk = RiskAnalysis::new(record.title);
        risk.date = record.attr_string("date");
        let parts = subsections(&record.body);
        risk.high_impact_high_prob = bullets_under(&parts, RISK_HEADINGS[0]);
        risk.high_impact_low_prob = bullets_under(&parts, RISK_HEADINGS[1]);
        risk.low_impact_high_prob = bullets_under(&parts, RISK_HEADINGS[2]);
        risk.low_impact_low_prob = bullets_under(&parts, RISK_HEADINGS[3]);
        risk
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        dated(self.date.as_deref())
    }

    fn body(&self) -> String {
        render_lists(&[
            (RISK_HEADINGS[0], &self.high_impact_high_prob),
            (RISK_HEADINGS[1], &self.high_impact_low_prob),
            (RISK_HEADINGS[2], &self.low_impact_high_prob),
            (RISK_HEADINGS[3], &self.low_impact_low_prob),
        ])
    }
}

/// Codec for a board of headed lists; unknown headings are kept after
/// the known ones.
macro_rules! block_board_codec {
    ($ty:ident, $section:literal) => {
        impl RecordCodec for $ty {
            fn from_record(record: &RawRecord<'_>) -> Self {
                let mut board = $ty::new(record.title);
                board.date = record.attr_string("date");
                for part in subsections(&record.body) {
                    if let Some(heading) = part.heading {
                        let mut items = board.items(heading).to_vec();
                        items.extend(part.bullets());
                        board.set_items(heading, items);
                    }
                }
                board
            }

            fn title(&self) -> String {
                self.title.clone()
            }

            fn attrs(&self) -> AttrWriter {
                dated(self.date.as_deref())
            }

            fn body(&self) -> String {
                let lists: Vec<(&str, &Vec<String>)> = self
                    .blocks
                    .iter()
                    .map(|block| (block.heading.as_str(), &block.items))
                    .collect();
                render_lists(&lists)
            }
        }

        record_section!($ty, $section);
    };
}

block_board_codec!(LeanCanvas, "Lean Canvas");
block_board_codec!(BusinessModel, "Business Model");
block_board_codec!(ProjectValue, "Project Value Board");
block_board_codec!(Brief, "Brief");

record_section!(Swot, "SWOT Analysis");
record_section!(RiskAnalysis, "Risk Analysis");
record_section!(StrategicBuilder, "Strategic Levels");
record_section!(CapacityPlan, "Capacity Planning");

fn level_key(heading: &str) -> String {
    STRATEGIC_LEVELS
        .iter()
        .find(|(_, label)| *label == heading)
        .map(|(key, _)| key.to_string())
        .unwrap_or_else(|| heading.to_lowercase())
}

impl RecordCodec for StrategicBuilder {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut builder = StrategicBuilder::new(record.title);
        builder.date = record.attr_string("date");
        for part in subsections(&record.body) {
            let Some(heading) = part.heading else {
                continue;
            };
            let key = level_key(heading);
            for line in &part.lines {
                match line.kind {
                    LineKind::Bullet(item) if line.indent == 0 => {
                        let (title, attrs) = bullet_attrs(item);
                        builder.levels.push(StrategicLevel {
                            id: lookup(&attrs, "id").unwrap_or_default().to_string(),
                            title: title.to_string(),
                            level: key.clone(),
                            parent: lookup(&attrs, "parent").map(str::to_string),
                            description: String::new(),
                            linked_tasks: lookup(&attrs, "tasks").map(parse_list).unwrap_or_default(),
                            linked_milestones: lookup(&attrs, "milestones")
                                .map(parse_list)
                                .unwrap_or_default(),
                        });
                    }
                    LineKind::Blank => {}
                    _ => {
                        if let Some(level) = builder.levels.last_mut() {
                            if !level.description.is_empty() {
                                level.description.push('\n');
                            }
                            level.description.push_str(line.text());
                        }
                    }
                }
            }
        }
        fill_local_ids(
            builder.levels.iter_mut().map(|level| &mut level.id).collect(),
            "level",
        );
        builder
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        dated(self.date.as_deref())
    }

    fn body(&self) -> String {
        let mut groups: Vec<(String, String)> = STRATEGIC_LEVELS
            .iter()
            .map(|(key, label)| (key.to_string(), label.to_string()))
            .collect();
        for level in &self.levels {
            if !groups.iter().any(|(key, _)| *key == level.level) {
                groups.push((level.level.clone(), level.level.clone()));
            }
        }

        let mut out = String::new();
        for (key, label) in &groups {
            let levels: Vec<&StrategicLevel> =
                self.levels.iter().filter(|level| level.level == *key).collect();
            if levels.is_empty() {
                continue;
            }
            out.push_str(&format!("### {label}\n\n"));
            for level in levels {
                let attrs = AttrWriter::new()
                    .field("id", &level.id)
                    .opt("parent", level.parent.as_deref())
                    .list("tasks", &level.linked_tasks)
                    .list("milestones", &level.linked_milestones);
                out.push_str(&attr_bullet("", &level.title, attrs));
                for line in level.description.lines().filter(|line| !line.trim().is_empty()) {
                    out.push_str(&format!("  {}\n", line.trim()));
                }
            }
            out.push('\n');
        }
        out
    }
}

impl RecordCodec for CapacityPlan {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut plan = CapacityPlan::new(record.title);
        plan.date = record.attr_string("date");
        plan.budget_hours = parse_f64(record.attr("budget"));
        let parts = subsections(&record.body);
        for item in bullets_under(&parts, "Team Members") {
            let (name, attrs) = bullet_attrs(&item);
            plan.team_members.push(TeamMember {
                id: lookup(&attrs, "id").unwrap_or_default().to_string(),
                name: name.to_string(),
                role: lookup(&attrs, "role").map(str::to_string),
                hours_per_day: parse_f64(lookup(&attrs, "hours")).unwrap_or(8.0),
                working_days: lookup(&attrs, "days").map(parse_list).unwrap_or_default(),
            });
        }
        for item in bullets_under(&parts, "Allocations") {
            let (week, attrs) = bullet_attrs(&item);
            let Some(member_id) = lookup(&attrs, "member") else {
                continue;
            };
            plan.allocations.push(Allocation {
                week: week.to_string(),
                member_id: member_id.to_string(),
                hours: parse_f64(lookup(&attrs, "hours")).unwrap_or(0.0),
                target_type: lookup(&attrs, "type").unwrap_or("project").to_string(),
                target_id: lookup(&attrs, "target").map(str::to_string),
                notes: lookup(&attrs, "notes").map(str::to_string),
            });
        }
        fill_local_ids(
            plan.team_members.iter_mut().map(|member| &mut member.id).collect(),
            "member",
        );
        plan
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        dated(self.date.as_deref()).opt("budget", self.budget_hours.map(|h| h.to_string()))
    }

    fn body(&self) -> String {
        let mut out = String::from("### Team Members\n\n");
        for member in &self.team_members {
            let attrs = AttrWriter::new()
                .field("id", &member.id)
                .opt("role", member.role.as_deref())
                .field("hours", member.hours_per_day.to_string())
                .list("days", &member.working_days);
            out.push_str(&attr_bullet("", &member.name, attrs));
        }
        if !self.team_members.is_empty() {
            out.push('\n');
        }
        out.push_str("### Allocations\n\n");
        for allocation in &self.allocations {
            let attrs = AttrWriter::new()
                .field("member", &allocation.member_id)
                .field("hours", allocation.hours.to_string())
                .field("type", &allocation.target_type)
                .opt("target", allocation.target_id.as_deref())
                .opt("notes", allocation.notes.as_deref());
            out.push_str(&attr_bullet("", &allocation.week, attrs));
        }
        out
    }
}
