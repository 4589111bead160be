// src/cache.rs

//! Freshness-validated result cache.
//!
//! Content-addressable key/value store with two invalidation axes: a TTL
//! and the modification times of the source files recorded at store time.
//! Entries also carry a schema version tag; anything written under an older
//! schema reads as a miss and is deleted on the spot.
//!
//! The store is shareable across pool instances (`&self` API, internal
//! mutex). Writes are atomic per key; concurrent writers to the same key
//! resolve last-write-wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use blake3::Hasher;
use tracing::debug;

/// Bumped whenever the entry layout changes; older entries become misses.
const CACHE_SCHEMA_VERSION: u32 = 1;

/// One cached result.
#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: Instant,
    expires_at: Instant,
    /// Modification times of the source files at store time.
    file_mtimes: HashMap<PathBuf, SystemTime>,
    version: u32,
    payload: String,
}

/// In-memory result cache with TTL and source-file mtime validation.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `key`, validating freshness against `files`.
    ///
    /// An entry is valid iff its schema version matches, its TTL has not
    /// expired, every file recorded at store time still exists with an
    /// unchanged mtime, and every path in `files` was present in the
    /// recorded set (a new tracked file invalidates — superset check).
    /// Invalid entries are deleted on the spot and read as misses.
    pub fn lookup(&self, key: &str, files: &[PathBuf]) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();

        let entry = entries.get(key)?;
        if Self::is_valid(entry, files) {
            debug!(key = %key, age = ?entry.created_at.elapsed(), "cache hit");
            return Some(entry.payload.clone());
        }

        debug!(key = %key, "stale cache entry removed on lookup");
        entries.remove(key);
        None
    }

    /// Store `payload` under `key`, recording the current mtimes of
    /// `files`.
    ///
    /// A file that cannot be statted right now is simply not recorded,
    /// which makes any later lookup that still tracks it a miss — cache
    /// problems always fail open to re-execution.
    pub fn store(&self, key: &str, files: &[PathBuf], payload: String, ttl: Duration) {
        let now = Instant::now();
        let mut file_mtimes = HashMap::new();

        for path in files {
            if let Some(mtime) = mtime_of(path) {
                file_mtimes.insert(path.clone(), mtime);
            } else {
                debug!(path = ?path, "source file not statable; leaving it out of the entry");
            }
        }

        let entry = CacheEntry {
            created_at: now,
            expires_at: now + ttl,
            file_mtimes,
            version: CACHE_SCHEMA_VERSION,
            payload,
        };

        debug!(key = %key, files = files.len(), "stored cache entry");
        self.entries.lock().unwrap().insert(key.to_string(), entry);
    }

    /// Delete one entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.entries.lock().unwrap().remove(key).is_some();
        if removed {
            debug!(key = %key, "cache entry invalidated");
        }
        removed
    }

    /// Delete everything.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        let count = entries.len();
        entries.clear();
        if count > 0 {
            debug!(removed = count, "cache cleared");
        }
    }

    /// Eagerly sweep out entries that are expired or whose recorded files
    /// have changed. Returns how many were removed.
    pub fn purge_invalid(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| Self::is_valid_against_recorded(entry));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "purged invalid cache entries");
        }
        removed
    }

    /// Number of live entries (stale ones included until next lookup).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn is_valid(entry: &CacheEntry, files: &[PathBuf]) -> bool {
        if !Self::is_valid_against_recorded(entry) {
            return false;
        }

        // Superset check: a file tracked now but absent from the recorded
        // set means the inputs grew since the entry was written.
        files
            .iter()
            .all(|path| entry.file_mtimes.contains_key(path))
    }

    fn is_valid_against_recorded(entry: &CacheEntry) -> bool {
        if entry.version != CACHE_SCHEMA_VERSION {
            return false;
        }

        if Instant::now() >= entry.expires_at {
            return false;
        }

        entry
            .file_mtimes
            .iter()
            .all(|(path, recorded)| mtime_of(path).is_some_and(|current| current == *recorded))
    }
}

/// Derive a stable cache key from a template, its variables and the input
/// file set.
///
/// Variables and paths are sorted before hashing so the key is independent
/// of iteration order.
pub fn derive_cache_key(
    template: &str,
    variables: &[(String, String)],
    files: &[PathBuf],
) -> String {
    let mut hasher = Hasher::new();
    hasher.update(template.as_bytes());

    let mut variables: Vec<&(String, String)> = variables.iter().collect();
    variables.sort();
    for (name, value) in variables {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }

    let mut paths: Vec<&PathBuf> = files.iter().collect();
    paths.sort();
    for path in paths {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\n");
    }

    hasher.finalize().to_hex().to_string()
}

fn mtime_of(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
