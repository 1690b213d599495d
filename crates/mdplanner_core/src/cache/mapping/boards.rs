//! Row mapping for planning boards.

use super::{from_json, joined, json, opt_text, text, CachedEntity};
use crate::db::schema::{self, TableDef};
use crate::model::canvas::{
    empty_blocks, Brief, BusinessModel, CapacityPlan, LeanCanvas, ListBlock, ProjectValue,
    RiskAnalysis, StrategicBuilder, Swot,
};
use rusqlite::types::Value;
use rusqlite::Row;

impl CachedEntity for Swot {
    fn table() -> &'static TableDef {
        &schema::SWOT
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            opt_text(&self.date),
            json(&self.strengths),
            json(&self.weaknesses),
            json(&self.opportunities),
            json(&self.threats),
            joined([
                &self.strengths,
                &self.weaknesses,
                &self.opportunities,
                &self.threats,
            ]),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Swot {
            id: row.get("id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            strengths: from_json(row, "strengths")?,
            weaknesses: from_json(row, "weaknesses")?,
            opportunities: from_json(row, "opportunities")?,
            threats: from_json(row, "threats")?,
        })
    }
}

impl CachedEntity for RiskAnalysis {
    fn table() -> &'static TableDef {
        &schema::RISK
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            opt_text(&self.date),
            json(&self.high_impact_high_prob),
            json(&self.high_impact_low_prob),
            json(&self.low_impact_high_prob),
            json(&self.low_impact_low_prob),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RiskAnalysis {
            id: row.get("id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            high_impact_high_prob: from_json(row, "high_impact_high_prob")?,
            high_impact_low_prob: from_json(row, "high_impact_low_prob")?,
            low_impact_high_prob: from_json(row, "low_impact_high_prob")?,
            low_impact_low_prob: from_json(row, "low_impact_low_prob")?,
        })
    }
}

fn board_blocks(row: &Row<'_>, headings: &[&str]) -> rusqlite::Result<Vec<ListBlock>> {
    let blocks: Vec<ListBlock> = from_json(row, "blocks")?;
    if blocks.is_empty() {
        return Ok(empty_blocks(headings));
    }
    Ok(blocks)
}

macro_rules! board_mapping {
    ($ty:ident, $table:path) => {
        impl CachedEntity for $ty {
            fn table() -> &'static TableDef {
                &$table
            }

            fn to_row(&self) -> Vec<Value> {
                vec![
                    text(&self.id),
                    text(&self.title),
                    opt_text(&self.date),
                    json(&self.blocks),
                ]
            }

            fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
                Ok($ty {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    date: row.get("date")?,
                    blocks: board_blocks(row, $ty::HEADINGS)?,
                })
            }
        }
    };
}

board_mapping!(LeanCanvas, schema::LEAN_CANVAS);
board_mapping!(BusinessModel, schema::BUSINESS_MODEL);
board_mapping!(ProjectValue, schema::PROJECT_VALUE);

impl CachedEntity for Brief {
    fn table() -> &'static TableDef {
        &schema::BRIEF
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            opt_text(&self.date),
            json(&self.blocks),
            joined(self.blocks.iter().map(|block| &block.items)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Brief {
            id: row.get("id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            blocks: board_blocks(row, Brief::HEADINGS)?,
        })
    }
}

impl CachedEntity for CapacityPlan {
    fn table() -> &'static TableDef {
        &schema::CAPACITY_PLANS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            opt_text(&self.date),
            self.budget_hours.map(Value::Real).unwrap_or(Value::Null),
            json(&self.team_members),
            json(&self.allocations),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CapacityPlan {
            id: row.get("id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            budget_hours: row.get("budget_hours")?,
            team_members: from_json(row, "team_members")?,
            allocations: from_json(row, "allocations")?,
        })
    }
}

impl CachedEntity for StrategicBuilder {
    fn table() -> &'static TableDef {
        &schema::STRATEGIC_BUILDERS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.title),
            opt_text(&self.date),
            json(&self.levels),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StrategicBuilder {
            id: row.get("id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            levels: from_json(row, "levels")?,
        })
    }
}
