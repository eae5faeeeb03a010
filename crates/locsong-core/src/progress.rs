//! Bounded, expiring watch history.
//!
//! The whole history is one JSON object under a single key, mapping slug to
//! entry. Every operation re-reads the blob before writing it back. Backend
//! failures and corrupt blobs are logged and treated as "no history"; they
//! never reach the caller.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ProgressConfig;
use crate::error::LocsongError;

pub const STORAGE_KEY: &str = "watch_progress";
pub const DEFAULT_MAX_ENTRIES: usize = 50;
pub const DEFAULT_EXPIRE_DAYS: u32 = 30;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Where the viewer left off in one title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchProgressEntry {
    pub slug: String,
    #[serde(rename = "serverIdx")]
    pub server_index: usize,
    #[serde(rename = "epIdx")]
    pub episode_index: usize,
    #[serde(rename = "epName")]
    pub episode_name: String,
    #[serde(rename = "serverName")]
    pub server_name: String,
    /// Epoch milliseconds.
    #[serde(rename = "savedAt")]
    pub saved_at: i64,
}

/// A position to record. The store stamps the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPosition {
    pub slug: String,
    pub server_index: usize,
    pub episode_index: usize,
    pub episode_name: String,
    pub server_name: String,
}

impl WatchPosition {
    fn stamped(self, saved_at: i64) -> WatchProgressEntry {
        WatchProgressEntry {
            slug: self.slug,
            server_index: self.server_index,
            episode_index: self.episode_index,
            episode_name: self.episode_name,
            server_name: self.server_name,
            saved_at,
        }
    }
}

// ── Backends ─────────────────────────────────────────────────────

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, LocsongError>;
    fn write(&self, key: &str, value: &str) -> Result<(), LocsongError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, LocsongError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LocsongError> {
        (**self).write(key, value)
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, LocsongError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LocsongError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, LocsongError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LocsongError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────

pub struct WatchProgressStore<S> {
    backend: S,
    max_entries: usize,
    expire_ms: i64,
}

impl<S: KeyValueStore> WatchProgressStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            max_entries: DEFAULT_MAX_ENTRIES,
            expire_ms: i64::from(DEFAULT_EXPIRE_DAYS) * DAY_MS,
        }
    }

    pub fn with_config(backend: S, config: &ProgressConfig) -> Self {
        Self {
            backend,
            max_entries: config.max_entries.max(1),
            expire_ms: i64::from(config.expire_days) * DAY_MS,
        }
    }

    fn read_all(&self) -> HashMap<String, WatchProgressEntry> {
        let raw = match self.backend.read(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read watch history");
                return HashMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "watch history is corrupt, starting fresh");
            HashMap::new()
        })
    }

    fn write_all(&self, all: &HashMap<String, WatchProgressEntry>) {
        let result = serde_json::to_string(all)
            .map_err(LocsongError::from)
            .and_then(|json| self.backend.write(STORAGE_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write watch history");
        }
    }

    fn is_expired(&self, entry: &WatchProgressEntry, now_ms: i64) -> bool {
        now_ms - entry.saved_at > self.expire_ms
    }

    /// Saved position for `slug`. An expired entry is deleted and reported
    /// as missing.
    pub fn get(&self, slug: &str) -> Option<WatchProgressEntry> {
        self.get_at(slug, now_ms())
    }

    pub fn get_at(&self, slug: &str, now_ms: i64) -> Option<WatchProgressEntry> {
        let mut all = self.read_all();
        let entry = all.get(slug)?;
        if self.is_expired(entry, now_ms) {
            tracing::debug!(slug, "watch progress expired");
            all.remove(slug);
            self.write_all(&all);
            return None;
        }
        Some(entry.clone())
    }

    /// Record a position, stamping it with the current time.
    ///
    /// Adding a new slug to a full history first evicts the entry with the
    /// oldest `saved_at`. Overwriting an existing slug never evicts.
    pub fn save(&self, position: WatchPosition) -> WatchProgressEntry {
        self.save_at(position, now_ms())
    }

    pub fn save_at(&self, position: WatchPosition, now_ms: i64) -> WatchProgressEntry {
        let mut all = self.read_all();

        if !all.contains_key(&position.slug) {
            while all.len() >= self.max_entries {
                let Some(oldest) = all
                    .iter()
                    .min_by_key(|(_, e)| e.saved_at)
                    .map(|(slug, _)| slug.clone())
                else {
                    break;
                };
                tracing::debug!(slug = %oldest, "evicting oldest watch progress");
                all.remove(&oldest);
            }
        }

        let entry = position.stamped(now_ms);
        all.insert(entry.slug.clone(), entry.clone());
        self.write_all(&all);
        entry
    }

    pub fn clear(&self, slug: &str) {
        let mut all = self.read_all();
        if all.remove(slug).is_some() {
            self.write_all(&all);
        }
    }

    /// Unexpired entries, most recent first.
    pub fn recent(&self) -> Vec<WatchProgressEntry> {
        self.recent_at(now_ms())
    }

    pub fn recent_at(&self, now_ms: i64) -> Vec<WatchProgressEntry> {
        let mut entries: Vec<_> = self
            .read_all()
            .into_values()
            .filter(|e| !self.is_expired(e, now_ms))
            .collect();
        entries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| a.slug.cmp(&b.slug)));
        entries
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
