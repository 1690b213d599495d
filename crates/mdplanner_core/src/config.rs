//! Runtime configuration for documents, backups and the query store.
//!
//! # Invariants
//! - Every field has a usable default; environment overrides are optional.
//! - Malformed environment values fall back to the default and are logged.

use log::warn;
use std::path::{Path, PathBuf};

pub const ENV_BACKUP_DIR: &str = "MD_PLANNER_BACKUP_DIR";
pub const ENV_MAX_BACKUPS: &str = "MD_PLANNER_MAX_BACKUPS";
pub const ENV_DB_PATH: &str = "MD_PLANNER_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MD_PLANNER_LOG_LEVEL";

const DEFAULT_MAX_BACKUPS: usize = 10;
const BACKUP_DIR_NAME: &str = "backups";
const STORE_FILE_NAME: &str = ".mdplanner.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSafetyConfig {
    /// Defaults to `<document dir>/backups`.
    pub backup_dir: Option<PathBuf>,
    pub max_backups: usize,
    pub backups_enabled: bool,
}

impl Default for WriteSafetyConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            max_backups: DEFAULT_MAX_BACKUPS,
            backups_enabled: true,
        }
    }
}

impl WriteSafetyConfig {
    pub fn without_backups() -> Self {
        Self {
            backups_enabled: false,
            ..Self::default()
        }
    }

    /// Resolves the backup directory for `document`.
    pub fn backup_dir_for(&self, document: &Path) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => document
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(BACKUP_DIR_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    /// Store file next to `document`.
    pub fn beside(document: &Path) -> Self {
        let dir = document.parent().unwrap_or_else(|| Path::new("."));
        Self {
            path: dir.join(STORE_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub write_safety: WriteSafetyConfig,
    pub store: StoreConfig,
    pub log_level: Option<String>,
}

impl CoreConfig {
    pub fn for_document(document: &Path) -> Self {
        Self {
            write_safety: WriteSafetyConfig::default(),
            store: StoreConfig::beside(document),
            log_level: None,
        }
    }

    /// Builds the configuration for `document` with `MD_PLANNER_*` overrides.
    pub fn from_env(document: &Path) -> Self {
        Self::from_lookup(document, |key| std::env::var(key).ok())
    }

    fn from_lookup(document: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::for_document(document);
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = value(ENV_BACKUP_DIR) {
            config.write_safety.backup_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = value(ENV_MAX_BACKUPS) {
            match raw.parse::<usize>() {
                Ok(max) => config.write_safety.max_backups = max,
                Err(_) => warn!(
                    "event=config_load module=config status=degraded key={} reason=not_a_number",
                    ENV_MAX_BACKUPS
                ),
            }
        }
        if let Some(path) = value(ENV_DB_PATH) {
            config.store.path = PathBuf::from(path);
        }
        config.log_level = value(ENV_LOG_LEVEL);
        config
    }
}
