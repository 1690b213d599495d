//! Crash- and race-safe replacement of the project document.
//!
//! # Responsibility
//! - Serialize writers of one document path inside the process.
//! - Snapshot the previous content before each write, with retention.
//! - Replace the file atomically (temp file + rename).
//!
//! # Invariants
//! - Writers to one canonical path are mutually exclusive and are handed
//!   the lock in arrival order (fair unlock).
//! - A snapshot is skipped when the content hash equals the last snapshot.
//! - Snapshot failures never block the write; they are logged.
//! - A failed write leaves the previous document intact.

use super::{DocResult, DocumentError};
use crate::config::WriteSafetyConfig;
use crate::model::EntityKind;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

static LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<DocumentLock>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// State shared by every handle on one document path.
#[derive(Debug, Default)]
pub struct LockState {
    last_backup_hash: Option<String>,
    counters: HashMap<EntityKind, u64>,
}

impl LockState {
    pub(crate) fn counter(&self, kind: EntityKind) -> u64 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    pub(crate) fn set_counter(&mut self, kind: EntityKind, value: u64) {
        self.counters.insert(kind, value);
    }
}

#[derive(Debug, Default)]
struct DocumentLock {
    state: Mutex<LockState>,
}

/// Returns the process-wide lock for `key`, creating it on first use.
fn lock_for(key: &Path) -> Arc<DocumentLock> {
    let mut locks = LOCKS.lock();
    locks.entry(key.to_path_buf()).or_default().clone()
}

/// Canonical form of `path`, also for files that do not exist yet.
pub fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// Handle on one project document file.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
    config: WriteSafetyConfig,
    lock: Arc<DocumentLock>,
}

/// Exclusive access to the document while the write lock is held.
pub struct LockedDocument<'a> {
    file: &'a DocumentFile,
    state: &'a mut LockState,
}

impl DocumentFile {
    pub fn open(path: impl AsRef<Path>, config: WriteSafetyConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock = lock_for(&canonical_key(&path));
        Self { path, config, lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &WriteSafetyConfig {
        &self.config
    }

    /// Reads the document; `None` when it does not exist.
    pub fn read(&self) -> DocResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                error!(
                    "event=doc_read module=document status=error path={} error={}",
                    self.path.display(),
                    err
                );
                Err(DocumentError::io(&self.path, err))
            }
        }
    }

    /// Runs `op` while holding the write lock for this path.
    pub fn locked<R>(&self, op: impl FnOnce(&mut LockedDocument<'_>) -> DocResult<R>) -> DocResult<R> {
        let mut guard = self.lock.state.lock();
        let result = op(&mut LockedDocument {
            file: self,
            state: &mut guard,
        });
        MutexGuard::unlock_fair(guard);
        result
    }

    /// Replaces the document with `content` (lock, snapshot, atomic write).
    pub fn write(&self, content: &str) -> DocResult<()> {
        self.locked(|doc| doc.commit(content))
    }

    /// Read-modify-write under the lock; `op` returns the new content, or
    /// `None` to leave the file untouched. A missing document reads as "".
    pub fn modify(&self, op: impl FnOnce(&str) -> DocResult<Option<String>>) -> DocResult<bool> {
        self.locked(|doc| {
            let current = doc.read()?.unwrap_or_default();
            match op(&current)? {
                Some(next) => {
                    doc.commit(&next)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn snapshot(&self, state: &mut LockState) {
        if !self.config.backups_enabled {
            return;
        }
        if let Err(err) = self.try_snapshot(state) {
            warn!(
                "event=backup_create module=document status=error path={} error={}",
                self.path.display(),
                err
            );
        }
    }

    fn try_snapshot(&self, state: &mut LockState) -> std::io::Result<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };
        let hash = content_hash(&content);
        if state.last_backup_hash.as_deref() == Some(hash.as_str()) {
            debug!(
                "event=backup_create module=document status=skipped reason=unchanged path={}",
                self.path.display()
            );
            return Ok(());
        }

        let dir = self.config.backup_dir_for(&self.path);
        fs::create_dir_all(&dir)?;
        let stem = self.backup_stem();
        let target = dir.join(format!("{stem}_backup_{}.md", backup_stamp()));
        fs::write(&target, &content)?;
        state.last_backup_hash = Some(hash);
        info!(
            "event=backup_create module=document status=ok file={}",
            target.display()
        );

        if let Err(err) = prune_backups(&dir, &stem, self.config.max_backups) {
            warn!(
                "event=backup_prune module=document status=error dir={} error={}",
                dir.display(),
                err
            );
        }
        Ok(())
    }

    fn backup_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    fn atomic_write(&self, content: &str) -> std::io::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.md".to_string());
        let temp = dir.join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&temp, content)?;
        if let Err(err) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(err);
        }
        Ok(())
    }
}

impl LockedDocument<'_> {
    pub fn read(&self) -> DocResult<Option<String>> {
        self.file.read()
    }

    /// Snapshots the current file and atomically replaces it.
    pub fn commit(&mut self, content: &str) -> DocResult<()> {
        let started = Instant::now();
        self.file.snapshot(self.state);
        if let Err(err) = self.file.atomic_write(content) {
            error!(
                "event=doc_write module=document status=error path={} error={}",
                self.file.path.display(),
                err
            );
            return Err(DocumentError::io(&self.file.path, err));
        }
        info!(
            "event=doc_write module=document status=ok bytes={} duration_ms={}",
            content.len(),
            started.elapsed().as_millis()
        );
        Ok(())
    }

    pub(crate) fn state(&mut self) -> &mut LockState {
        self.state
    }
}

pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// RFC 3339 instant with `:` and `.` replaced so it is a valid file name.
fn backup_stamp() -> String {
    let now = OffsetDateTime::now_utc();
    let formatted = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp_nanos().to_string());
    formatted.replace([':', '.'], "-")
}

/// Deletes the oldest `{stem}_backup_*.md` files beyond `max`.
fn prune_backups(dir: &Path, stem: &str, max: usize) -> std::io::Result<usize> {
    let prefix = format!("{stem}_backup_");
    let mut backups: Vec<(SystemTime, String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) || !name.ends_with(".md") {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        backups.push((modified, name, entry.path()));
    }
    if backups.len() <= max {
        return Ok(0);
    }
    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    let mut removed = 0;
    for (_, _, path) in backups.into_iter().skip(max) {
        fs::remove_file(&path)?;
        removed += 1;
    }
    info!(
        "event=backup_prune module=document status=ok removed={} kept={}",
        removed, max
    );
    Ok(removed)
}
