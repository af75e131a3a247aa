//! # Threat-Intel Cache
//!
//! A single JSON document of `{hash, result, cachedAt, expiresAt}`
//! entries, loaded once and rewritten whole on every mutation. Grounded
//! on `sentinel-registry/src/storage.rs`'s persistence-layer shape
//! (open/get/set API, doc-comment structure), swapped from Sled trees to
//! a flat JSON file since the cache here is small, single-writer, and
//! doesn't need transactional semantics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::wire::{CheckResponse, FeedEntry, HashType};

pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    hash: String,
    result: CheckResponse,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// An on-disk, whole-file-rewrite cache of threat-intel lookups.
///
/// Not safe for concurrent access from multiple processes; within one
/// process, callers must serialize mutations (see the crate root for the
/// concurrency model this assumes).
pub struct Cache {
    path: PathBuf,
    ttl: Duration,
    entries: HashMap<String, CacheRecord>,
}

impl Cache {
    /// Loads the cache from `path`, dropping expired entries. Missing
    /// file is treated as an empty cache.
    pub fn open(path: impl Into<PathBuf>, ttl_hours: i64) -> Result<Self> {
        let path = path.into();
        let mut cache = Cache { path, ttl: Duration::hours(ttl_hours), entries: HashMap::new() };
        cache.load()?;
        Ok(cache)
    }

    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(());
        }
        let records: Vec<CacheRecord> = serde_json::from_str(&contents)?;
        let now = Utc::now();
        self.entries = records
            .into_iter()
            .filter(|r| r.expires_at > now)
            .map(|r| (r.hash.clone(), r))
            .collect();
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let records: Vec<&CacheRecord> = self.entries.values().collect();
        let serialized = serde_json::to_string_pretty(&records)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }

    /// Returns the cached result for `hash`, or `None` if absent or
    /// expired (an expired entry found here was already dropped at load
    /// time, so this only reflects entries inserted this session).
    pub fn get(&self, hash: &str) -> Option<CheckResponse> {
        self.entries.get(hash).filter(|r| r.expires_at > Utc::now()).map(|r| r.result.clone())
    }

    /// Inserts or replaces the cached result for `hash` and rewrites the
    /// file.
    pub fn set(&mut self, hash: &str, result: CheckResponse) -> Result<()> {
        let now = Utc::now();
        self.entries.insert(
            hash.to_string(),
            CacheRecord { hash: hash.to_string(), result, cached_at: now, expires_at: now + self.ttl },
        );
        self.save()
    }

    /// Inserts one `known:true` cache record per feed entry, then
    /// rewrites the file once.
    pub fn import_feed(&mut self, entries: &[FeedEntry]) -> Result<()> {
        for entry in entries {
            let result = CheckResponse {
                known: true,
                confidence: entry.confidence,
                report_count: entry.report_count,
                first_seen: None,
                last_seen: Some(entry.updated_at),
                category: entry.category.clone(),
            };
            let hash = match entry.hash_type {
                HashType::Content | HashType::Structural => entry.hash.clone(),
            };
            let now = Utc::now();
            self.entries.insert(
                hash.clone(),
                CacheRecord { hash, result, cached_at: now, expires_at: now + self.ttl },
            );
        }
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
