//! Core of MD Planner: a markdown project document as the source of truth,
//! with a rebuildable SQLite query store and full-text search beside it.
//!
//! Layers, bottom-up:
//! - [`markdown`]: lossless section grammar and per-entity codecs.
//! - [`document`]: write safety, id allocation and the typed facade.
//! - [`db`]: store bootstrap, migrations and the entity schema registry.
//! - [`cache`]: record/row mapping, read-through view and full sync.
//! - [`search`]: ranked FTS5 search.

pub mod cache;
pub mod config;
pub mod db;
pub mod document;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod search;

pub use cache::caching::{CacheState, CachedSection};
pub use cache::counters::SqliteIdCounters;
pub use cache::mapping::CachedEntity;
pub use cache::sync::{CacheSync, SyncResult};
pub use cache::{CacheError, CacheResult};
pub use config::{CoreConfig, StoreConfig, WriteSafetyConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use document::facade::ProjectDocument;
pub use document::ids::IdCounterStore;
pub use document::write_safety::DocumentFile;
pub use document::{Clock, DocResult, DocumentError, SystemClock};
pub use logging::{default_log_level, init_logging, init_logging_with_config, logging_status};
pub use markdown::SectionCodec;
pub use model::billing::{
    Invoice, InvoicePatch, LineItem, Quote, QuotePatch, Rate, RatePatch, TimeEntry,
    TimeEntryPatch,
};
pub use model::canvas::{
    Allocation, Brief, BriefPatch, BusinessModel, BusinessModelPatch, CapacityPlan,
    CapacityPlanPatch, LeanCanvas, LeanCanvasPatch, ListBlock, ProjectValue, ProjectValuePatch,
    RiskAnalysis, RiskAnalysisPatch, StrategicBuilder, StrategicBuilderPatch, StrategicLevel,
    Swot, SwotPatch, TeamMember,
};
pub use model::crm::{Contact, ContactPatch, Deal, DealPatch, Interaction, InteractionPatch};
pub use model::note::{
    CustomSection, Note, NoteMode, NoteParagraph, NotePatch, NoteTab, ParagraphKind,
    SectionLayout, TimelineItem,
};
pub use model::records::{
    C4Component, C4ComponentPatch, C4Connection, Company, CompanyPatch, Customer, CustomerPatch,
    Goal, GoalPatch, Idea, IdeaPatch, Milestone, MilestonePatch, Mindmap, MindmapNode,
    MindmapPatch, Position, Retrospective, RetrospectivePatch, Size, StickyNote, StickyNotePatch,
};
pub use model::task::{Task, TaskAttributes, TaskPatch};
pub use model::{Entity, EntityKind};
pub use search::fts::{SearchEngine, SearchHit, SearchOptions, SearchStats};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
