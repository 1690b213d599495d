//! Declarative registry of the per-entity store tables.
//!
//! Each [`TableDef`] yields the table, its secondary indexes and, when it
//! is searchable, an external-content FTS5 table kept current by
//! insert/update/delete triggers.

use super::DbResult;
use crate::model::EntityKind;
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef { name, sql_type }
}

/// Full-text index over one title column and one body column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtsDef {
    pub title_column: &'static str,
    pub content_column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub kind: EntityKind,
    /// First column is always `id TEXT PRIMARY KEY`.
    pub columns: &'static [ColumnDef],
    pub fts: Option<FtsDef>,
    pub indexes: &'static [&'static str],
    /// Self-referencing column for tree-shaped entities.
    pub parent_column: Option<&'static str>,
}

impl TableDef {
    pub fn fts_table(&self) -> String {
        format!("{}_fts", self.name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }
}

const ID: ColumnDef = col("id", "TEXT PRIMARY KEY");

pub const TASKS: TableDef = TableDef {
    name: "tasks",
    kind: EntityKind::Task,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("completed", "INTEGER NOT NULL DEFAULT 0"),
        col("section", "TEXT NOT NULL"),
        col("description", "TEXT"),
        col("tags", "TEXT"),
        col("due_date", "TEXT"),
        col("assignee", "TEXT"),
        col("priority", "INTEGER"),
        col("effort", "INTEGER"),
        col("milestone", "TEXT"),
        col("blocked_by", "TEXT"),
        col("planned_start", "TEXT"),
        col("planned_end", "TEXT"),
        col("parent_id", "TEXT"),
        col("config", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "description",
    }),
    indexes: &["section", "assignee", "milestone", "completed", "due_date", "parent_id"],
    parent_column: Some("parent_id"),
};

pub const NOTES: TableDef = TableDef {
    name: "notes",
    kind: EntityKind::Note,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("content", "TEXT"),
        col("revision", "INTEGER NOT NULL DEFAULT 1"),
        col("created_at", "TEXT"),
        col("updated_at", "TEXT"),
        col("mode", "TEXT NOT NULL DEFAULT 'simple'"),
        col("paragraphs", "TEXT"),
        col("custom_sections", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "content",
    }),
    indexes: &["updated_at"],
    parent_column: None,
};

pub const GOALS: TableDef = TableDef {
    name: "goals",
    kind: EntityKind::Goal,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("description", "TEXT"),
        col("type", "TEXT"),
        col("kpi", "TEXT"),
        col("start_date", "TEXT"),
        col("end_date", "TEXT"),
        col("status", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "description",
    }),
    indexes: &["status", "type"],
    parent_column: None,
};

pub const MILESTONES: TableDef = TableDef {
    name: "milestones",
    kind: EntityKind::Milestone,
    columns: &[
        ID,
        col("name", "TEXT NOT NULL"),
        col("target", "TEXT"),
        col("status", "TEXT"),
        col("description", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "name",
        content_column: "description",
    }),
    indexes: &["status"],
    parent_column: None,
};

pub const IDEAS: TableDef = TableDef {
    name: "ideas",
    kind: EntityKind::Idea,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("status", "TEXT"),
        col("category", "TEXT"),
        col("created", "TEXT"),
        col("links", "TEXT"),
        col("description", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "description",
    }),
    indexes: &["status", "category"],
    parent_column: None,
};

pub const RETROSPECTIVES: TableDef = TableDef {
    name: "retrospectives",
    kind: EntityKind::Retrospective,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("status", "TEXT"),
        col("continue_items", "TEXT"),
        col("stop_items", "TEXT"),
        col("start_items", "TEXT"),
        col("content", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "content",
    }),
    indexes: &["status"],
    parent_column: None,
};

pub const STICKY_NOTES: TableDef = TableDef {
    name: "sticky_notes",
    kind: EntityKind::StickyNote,
    columns: &[
        ID,
        col("content", "TEXT"),
        col("color", "TEXT"),
        col("position_x", "INTEGER"),
        col("position_y", "INTEGER"),
        col("width", "INTEGER"),
        col("height", "INTEGER"),
    ],
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const MINDMAPS: TableDef = TableDef {
    name: "mindmaps",
    kind: EntityKind::Mindmap,
    columns: &[ID, col("title", "TEXT NOT NULL"), col("nodes", "TEXT")],
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const C4_COMPONENTS: TableDef = TableDef {
    name: "c4_components",
    kind: EntityKind::C4Component,
    columns: &[
        ID,
        col("name", "TEXT NOT NULL"),
        col("level", "TEXT"),
        col("type", "TEXT"),
        col("technology", "TEXT"),
        col("description", "TEXT"),
        col("position_x", "INTEGER"),
        col("position_y", "INTEGER"),
        col("connections", "TEXT"),
        col("children", "TEXT"),
        col("parent", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "name",
        content_column: "description",
    }),
    indexes: &["level", "parent"],
    parent_column: None,
};

pub const SWOT: TableDef = TableDef {
    name: "swot",
    kind: EntityKind::Swot,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("strengths", "TEXT"),
        col("weaknesses", "TEXT"),
        col("opportunities", "TEXT"),
        col("threats", "TEXT"),
        col("content", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "content",
    }),
    indexes: &["date"],
    parent_column: None,
};

pub const RISK: TableDef = TableDef {
    name: "risk",
    kind: EntityKind::RiskAnalysis,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("high_impact_high_prob", "TEXT"),
        col("high_impact_low_prob", "TEXT"),
        col("low_impact_high_prob", "TEXT"),
        col("low_impact_low_prob", "TEXT"),
    ],
    fts: None,
    indexes: &["date"],
    parent_column: None,
};

const BOARD_COLUMNS: &[ColumnDef] = &[
    ID,
    col("title", "TEXT NOT NULL"),
    col("date", "TEXT"),
    col("blocks", "TEXT"),
];

pub const LEAN_CANVAS: TableDef = TableDef {
    name: "lean_canvas",
    kind: EntityKind::LeanCanvas,
    columns: BOARD_COLUMNS,
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const BUSINESS_MODEL: TableDef = TableDef {
    name: "business_model",
    kind: EntityKind::BusinessModel,
    columns: BOARD_COLUMNS,
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const PROJECT_VALUE: TableDef = TableDef {
    name: "project_value",
    kind: EntityKind::ProjectValue,
    columns: BOARD_COLUMNS,
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const BRIEF: TableDef = TableDef {
    name: "brief",
    kind: EntityKind::Brief,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("blocks", "TEXT"),
        col("content", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "title",
        content_column: "content",
    }),
    indexes: &[],
    parent_column: None,
};

pub const CAPACITY_PLANS: TableDef = TableDef {
    name: "capacity_plans",
    kind: EntityKind::CapacityPlan,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("budget_hours", "REAL"),
        col("team_members", "TEXT"),
        col("allocations", "TEXT"),
    ],
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const STRATEGIC_BUILDERS: TableDef = TableDef {
    name: "strategic_builders",
    kind: EntityKind::StrategicBuilder,
    columns: &[
        ID,
        col("title", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("levels", "TEXT"),
    ],
    fts: None,
    indexes: &[],
    parent_column: None,
};

pub const CUSTOMERS: TableDef = TableDef {
    name: "customers",
    kind: EntityKind::Customer,
    columns: &[
        ID,
        col("name", "TEXT NOT NULL"),
        col("email", "TEXT"),
        col("phone", "TEXT"),
        col("address", "TEXT"),
        col("notes", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "name",
        content_column: "notes",
    }),
    indexes: &["email"],
    parent_column: None,
};

pub const COMPANIES: TableDef = TableDef {
    name: "companies",
    kind: EntityKind::Company,
    columns: &[
        ID,
        col("name", "TEXT NOT NULL"),
        col("industry", "TEXT"),
        col("website", "TEXT"),
        col("phone", "TEXT"),
        col("address", "TEXT"),
        col("created", "TEXT"),
        col("notes", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "name",
        content_column: "notes",
    }),
    indexes: &["industry"],
    parent_column: None,
};

pub const RATES: TableDef = TableDef {
    name: "rates",
    kind: EntityKind::Rate,
    columns: &[
        ID,
        col("name", "TEXT NOT NULL"),
        col("hourly_rate", "REAL NOT NULL DEFAULT 0"),
        col("assignee", "TEXT"),
        col("is_default", "INTEGER NOT NULL DEFAULT 0"),
    ],
    fts: None,
    indexes: &["assignee"],
    parent_column: None,
};

pub const QUOTES: TableDef = TableDef {
    name: "quotes",
    kind: EntityKind::Quote,
    columns: &[
        ID,
        col("number", "TEXT NOT NULL"),
        col("customer_id", "TEXT"),
        col("status", "TEXT"),
        col("date", "TEXT"),
        col("valid_until", "TEXT"),
        col("line_items", "TEXT"),
        col("total", "REAL"),
        col("notes", "TEXT"),
    ],
    fts: None,
    indexes: &["customer_id", "status"],
    parent_column: None,
};

pub const INVOICES: TableDef = TableDef {
    name: "invoices",
    kind: EntityKind::Invoice,
    columns: &[
        ID,
        col("number", "TEXT NOT NULL"),
        col("customer_id", "TEXT"),
        col("quote_id", "TEXT"),
        col("status", "TEXT"),
        col("date", "TEXT"),
        col("due_date", "TEXT"),
        col("paid_amount", "REAL NOT NULL DEFAULT 0"),
        col("line_items", "TEXT"),
        col("total", "REAL"),
        col("notes", "TEXT"),
    ],
    fts: None,
    indexes: &["customer_id", "status", "due_date"],
    parent_column: None,
};

pub const CONTACTS: TableDef = TableDef {
    name: "contacts",
    kind: EntityKind::Contact,
    columns: &[
        ID,
        col("company_id", "TEXT"),
        col("first_name", "TEXT NOT NULL"),
        col("last_name", "TEXT"),
        col("full_name", "TEXT"),
        col("email", "TEXT"),
        col("phone", "TEXT"),
        col("title", "TEXT"),
        col("is_primary", "INTEGER NOT NULL DEFAULT 0"),
        col("created", "TEXT"),
        col("notes", "TEXT"),
    ],
    fts: Some(FtsDef {
        title_column: "full_name",
        content_column: "notes",
    }),
    indexes: &["company_id", "email"],
    parent_column: None,
};

pub const DEALS: TableDef = TableDef {
    name: "deals",
    kind: EntityKind::Deal,
    columns: &[
        ID,
        col("company_id", "TEXT"),
        col("contact_id", "TEXT"),
        col("title", "TEXT NOT NULL"),
        col("value", "REAL NOT NULL DEFAULT 0"),
        col("stage", "TEXT"),
        col("probability", "INTEGER NOT NULL DEFAULT 0"),
        col("expected_close", "TEXT"),
        col("closed_at", "TEXT"),
        col("created", "TEXT"),
        col("notes", "TEXT"),
    ],
    fts: None,
    indexes: &["company_id", "contact_id", "stage"],
    parent_column: None,
};

pub const INTERACTIONS: TableDef = TableDef {
    name: "interactions",
    kind: EntityKind::Interaction,
    columns: &[
        ID,
        col("company_id", "TEXT"),
        col("contact_id", "TEXT"),
        col("deal_id", "TEXT"),
        col("type", "TEXT"),
        col("summary", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("duration", "INTEGER"),
        col("next_follow_up", "TEXT"),
        col("notes", "TEXT"),
    ],
    fts: None,
    indexes: &["company_id", "contact_id", "deal_id", "date"],
    parent_column: None,
};

pub const TIME_ENTRIES: TableDef = TableDef {
    name: "time_entries",
    kind: EntityKind::TimeEntry,
    columns: &[
        ID,
        col("task_id", "TEXT NOT NULL"),
        col("date", "TEXT"),
        col("hours", "REAL NOT NULL DEFAULT 0"),
        col("person", "TEXT"),
        col("description", "TEXT"),
    ],
    fts: None,
    indexes: &["task_id", "date"],
    parent_column: None,
};

pub const ENTITY_TABLES: &[&TableDef] = &[
    &TASKS,
    &NOTES,
    &GOALS,
    &MILESTONES,
    &IDEAS,
    &RETROSPECTIVES,
    &STICKY_NOTES,
    &MINDMAPS,
    &C4_COMPONENTS,
    &SWOT,
    &RISK,
    &LEAN_CANVAS,
    &BUSINESS_MODEL,
    &PROJECT_VALUE,
    &BRIEF,
    &CAPACITY_PLANS,
    &STRATEGIC_BUILDERS,
    &CUSTOMERS,
    &RATES,
    &QUOTES,
    &INVOICES,
    &COMPANIES,
    &CONTACTS,
    &DEALS,
    &INTERACTIONS,
    &TIME_ENTRIES,
];

pub fn table_def(name: &str) -> Option<&'static TableDef> {
    ENTITY_TABLES.iter().copied().find(|def| def.name == name)
}

pub fn table_for_kind(kind: EntityKind) -> Option<&'static TableDef> {
    ENTITY_TABLES.iter().copied().find(|def| def.kind == kind)
}

/// Creates every entity table, index, FTS table and trigger (idempotent).
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    for def in ENTITY_TABLES {
        conn.execute_batch(&create_sql(def))?;
    }
    Ok(())
}

/// Drops every entity table together with its FTS table and triggers.
pub fn drop_schema(conn: &Connection) -> DbResult<()> {
    for def in ENTITY_TABLES {
        conn.execute_batch(&drop_sql(def))?;
    }
    info!(
        "event=schema_drop module=db status=ok tables={}",
        ENTITY_TABLES.len()
    );
    Ok(())
}

pub fn create_sql(def: &TableDef) -> String {
    let columns = def
        .columns
        .iter()
        .map(|column| format!("    {} {}", column.name, column.sql_type))
        .collect::<Vec<_>>()
        .join(",\n");
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n{columns}\n);\n", def.name);

    for column in def.indexes {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});\n",
            table = def.name
        ));
    }

    if let Some(fts) = def.fts {
        sql.push_str(&fts_sql(def, fts));
    }
    sql
}

fn fts_sql(def: &TableDef, fts: FtsDef) -> String {
    let table = def.name;
    let fts_table = def.fts_table();
    let title = fts.title_column;
    let content = fts.content_column;
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {fts_table} USING fts5(
    id UNINDEXED,
    {title},
    {content},
    content='{table}',
    content_rowid='rowid'
);
CREATE TRIGGER IF NOT EXISTS {table}_ai AFTER INSERT ON {table} BEGIN
    INSERT INTO {fts_table}(rowid, id, {title}, {content})
    VALUES (new.rowid, new.id, new.{title}, new.{content});
END;
CREATE TRIGGER IF NOT EXISTS {table}_ad AFTER DELETE ON {table} BEGIN
    INSERT INTO {fts_table}({fts_table}, rowid, id, {title}, {content})
    VALUES ('delete', old.rowid, old.id, old.{title}, old.{content});
END;
CREATE TRIGGER IF NOT EXISTS {table}_au AFTER UPDATE ON {table} BEGIN
    INSERT INTO {fts_table}({fts_table}, rowid, id, {title}, {content})
    VALUES ('delete', old.rowid, old.id, old.{title}, old.{content});
    INSERT INTO {fts_table}(rowid, id, {title}, {content})
    VALUES (new.rowid, new.id, new.{title}, new.{content});
END;
"
    )
}

fn drop_sql(def: &TableDef) -> String {
    let table = def.name;
    let mut sql = String::new();
    if def.fts.is_some() {
        sql.push_str(&format!(
            "DROP TRIGGER IF EXISTS {table}_ai;\nDROP TRIGGER IF EXISTS {table}_ad;\nDROP TRIGGER IF EXISTS {table}_au;\nDROP TABLE IF EXISTS {};\n",
            def.fts_table()
        ));
    }
    sql.push_str(&format!("DROP TABLE IF EXISTS {table};\n"));
    sql
}
