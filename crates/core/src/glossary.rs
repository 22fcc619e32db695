//! Phonetic Correction Glossary
//!
//! A read-mostly cache over a JSON file that maps each canonical term to the
//! variants speech recognition tends to produce for it. The file is re-parsed
//! only when its modification time changes, so sessions can call [`load`]
//! freely. One cache instance is shared by all sessions.
//!
//! [`load`]: GlossaryCache::load

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::SystemTime,
};
use tracing::{debug, info, warn};

/// Canonical term -> misheard variants.
pub type Glossary = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum GlossaryError {
    #[error("glossary I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("glossary serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Cached {
    mtime: Option<SystemTime>,
    entries: Glossary,
}

/// Shared, mtime-invalidated view of the glossary file.
#[derive(Debug)]
pub struct GlossaryCache {
    path: PathBuf,
    cached: RwLock<Cached>,
}

impl GlossaryCache {
    /// Creates a cache for `path`. No I/O happens until the first [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(Cached::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file (and its parent directories) with [`default_glossary`]
    /// if it does not exist yet. An existing file is left untouched.
    pub fn ensure_seeded(&self) -> Result<(), GlossaryError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let seed = default_glossary();
        info!(path = %self.path.display(), terms = seed.len(), "Seeding glossary file.");
        self.save(seed)
    }

    /// Returns the current glossary, re-reading the file only if it changed.
    ///
    /// A missing or unreadable file yields the last good entries (empty if
    /// none). A file that fails to parse is logged and its mtime remembered,
    /// so it is not parsed again until it is modified.
    pub fn load(&self) -> Glossary {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Glossary file not readable; using cached entries.");
                return self.read().entries.clone();
            }
        };

        {
            let cached = self.read();
            if cached.mtime == Some(mtime) {
                return cached.entries.clone();
            }
        }

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        // Another reader may have refreshed while we waited for the write lock.
        self.refresh_locked(&mut cached, mtime);
        cached.entries.clone()
    }

    /// Renders the glossary as correction rules for the system instruction.
    pub fn formatted_rules(&self) -> String {
        format_rules(&self.load())
    }

    /// Replaces the whole glossary.
    pub fn save(&self, data: Glossary) -> Result<(), GlossaryError> {
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        self.write_locked(&mut cached, data)
    }

    /// Adds or replaces one term and returns the resulting glossary.
    pub fn add_term(&self, term: &str, variations: Vec<String>) -> Result<Glossary, GlossaryError> {
        self.modify(|entries| {
            entries.insert(term.to_string(), variations);
        })
    }

    /// Removes one term (a no-op if absent) and returns the resulting glossary.
    pub fn remove_term(&self, term: &str) -> Result<Glossary, GlossaryError> {
        self.modify(|entries| {
            entries.remove(term);
        })
    }

    /// Read-modify-write under the write lock, so concurrent edits never
    /// overwrite each other.
    fn modify(&self, f: impl FnOnce(&mut Glossary)) -> Result<Glossary, GlossaryError> {
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        if let Ok(mtime) = fs::metadata(&self.path).and_then(|m| m.modified()) {
            self.refresh_locked(&mut cached, mtime);
        }
        let mut entries = cached.entries.clone();
        f(&mut entries);
        self.write_locked(&mut cached, entries.clone())?;
        Ok(entries)
    }

    /// Re-reads the file into `cached` unless `mtime` is already cached.
    fn refresh_locked(&self, cached: &mut Cached, mtime: SystemTime) {
        if cached.mtime == Some(mtime) {
            return;
        }
        match self.read_file() {
            Ok(entries) => {
                debug!(terms = entries.len(), "Glossary reloaded from disk.");
                cached.entries = entries;
            }
            Err(e) => warn!(error = %e, "Failed to load glossary; keeping previous entries."),
        }
        cached.mtime = Some(mtime);
    }

    fn write_locked(&self, cached: &mut Cached, data: Glossary) -> Result<(), GlossaryError> {
        let json = serde_json::to_string_pretty(&data)?;
        fs::write(&self.path, json).map_err(|source| self.io_error(source))?;
        cached.mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        cached.entries = data;
        Ok(())
    }

    fn read_file(&self) -> Result<Glossary, GlossaryError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Cached> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: std::io::Error) -> GlossaryError {
        GlossaryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Terms written to a fresh glossary file.
pub fn default_glossary() -> Glossary {
    let seed: [(&str, &[&str]); 7] = [
        ("Hankell", &["Rankel", "Ranquel", "Hanke", "Rank", "Hankel", "Hanquel"]),
        ("Cenize", &["Senize", "Semize", "Zenize"]),
        ("Roquelina", &["Rock", "Roque", "Roc", "Hock"]),
        ("APN", &["PN", "A pena", "Apn", "A.P.N."]),
        ("Intelbras", &["Inteoubras", "Intel", "Inteobras"]),
        ("Datatem", &["Data tem", "Dataten", "Data ten"]),
        ("Odoo", &["Odo", "Hoodoo", "Odum"]),
    ];
    seed.into_iter()
        .map(|(term, variants)| {
            (
                term.to_string(),
                variants.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

/// One `- Se ouvir: <variants> -> Escreva: <term>` line per term.
pub fn format_rules(glossary: &Glossary) -> String {
    glossary
        .iter()
        .map(|(term, variants)| format!("- Se ouvir: {} -> Escreva: {}", variants.join(", "), term))
        .collect::<Vec<_>>()
        .join("\n")
}
