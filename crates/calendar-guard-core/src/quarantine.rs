//! # Quarantine Store
//!
//! File-per-event JSON archive of original field contents for
//! `Redact`/`Block` outcomes, so a human can later recover what was
//! stripped. Grounded on `sentinel-registry/src/storage.rs`'s
//! persistence-layer doc-comment style and open/get API shape, adapted
//! from Sled trees to one JSON file per event (the access pattern here is
//! "look up by event id" and "list recent", not range scans).

use std::path::{Path, PathBuf};

use calendar_guard_firewall::{Detection, RiskLevel, SecurityAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_TTL_DAYS: i64 = 7;

/// Sanitizes an event id into a safe filename: any character outside
/// `[A-Za-z0-9_-]` becomes `_`.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub event_id: String,
    pub calendar_id: Option<String>,
    pub quarantined_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub organizer_email: Option<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub action: SecurityAction,
    pub original_fields: Vec<(String, String)>,
    pub detections: Vec<Detection>,
}

/// Options for [`QuarantineStore::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub min_risk_level: Option<RiskLevel>,
}

/// File-per-event quarantine archive. Every method swallows write
/// failures (quarantine is supplementary, never load-bearing for the
/// scan path) but surfaces read failures that would otherwise silently
/// hide a corrupt store.
pub struct QuarantineStore {
    dir: PathBuf,
    ttl_days: i64,
}

impl QuarantineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        QuarantineStore { dir: dir.into(), ttl_days: DEFAULT_TTL_DAYS }
    }

    pub fn with_ttl_days(dir: impl Into<PathBuf>, ttl_days: i64) -> Self {
        QuarantineStore { dir: dir.into(), ttl_days }
    }

    fn path_for(&self, event_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_id(event_id)))
    }

    /// Writes a quarantine entry for `event_id`. Failures (disk full,
    /// permissions) are swallowed.
    pub fn put(
        &self,
        event_id: &str,
        calendar_id: Option<String>,
        organizer_email: Option<String>,
        risk_score: f64,
        risk_level: RiskLevel,
        action: SecurityAction,
        original_fields: Vec<(String, String)>,
        detections: Vec<Detection>,
    ) {
        let now = Utc::now();
        let entry = QuarantineEntry {
            event_id: event_id.to_string(),
            calendar_id,
            quarantined_at: now,
            expires_at: now + chrono::Duration::days(self.ttl_days),
            organizer_email,
            risk_score,
            risk_level,
            action,
            original_fields,
            detections,
        };

        let Ok(serialized) = serde_json::to_string_pretty(&entry) else { return };
        if std::fs::create_dir_all(&self.dir).is_err() {
            return;
        }
        let _ = std::fs::write(self.path_for(event_id), serialized);
    }

    /// Returns the entry for `event_id`, or `None` if missing or expired
    /// (an expired entry's file is deleted as a side effect).
    pub fn get(&self, event_id: &str) -> Option<QuarantineEntry> {
        let path = self.path_for(event_id);
        let contents = std::fs::read_to_string(&path).ok()?;
        let entry: QuarantineEntry = serde_json::from_str(&contents).ok()?;
        if entry.expires_at <= Utc::now() {
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(entry)
    }

    /// Lists non-expired entries (expired ones are unlinked as a side
    /// effect), filtered by `min_risk_level`, newest first.
    pub fn list(&self, options: ListOptions) -> Vec<QuarantineEntry> {
        let mut entries = Vec::new();
        let Ok(dir) = std::fs::read_dir(&self.dir) else { return entries };

        for item in dir.flatten() {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else { continue };
            let Ok(entry) = serde_json::from_str::<QuarantineEntry>(&contents) else { continue };

            if entry.expires_at <= Utc::now() {
                let _ = std::fs::remove_file(&path);
                continue;
            }
            if let Some(min) = options.min_risk_level {
                if entry.risk_level < min {
                    continue;
                }
            }
            entries.push(entry);
        }

        entries.sort_by(|a, b| b.quarantined_at.cmp(&a.quarantined_at));
        entries
    }

    /// Removes expired entries and returns how many were deleted.
    pub fn cleanup(&self) -> usize {
        let Ok(dir) = std::fs::read_dir(&self.dir) else { return 0 };
        let mut removed = 0;
        for item in dir.flatten() {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else { continue };
            let Ok(entry) = serde_json::from_str::<QuarantineEntry>(&contents) else { continue };
            if entry.expires_at <= Utc::now() && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_args() -> (Option<String>, Option<String>, f64, RiskLevel, SecurityAction, Vec<(String, String)>, Vec<Detection>) {
        (None, Some("attacker@evil.example".into()), 0.9, RiskLevel::Dangerous, SecurityAction::Redact, vec![("description".into(), "original text".into())], vec![])
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        let (cal, org, score, level, action, fields, dets) = entry_args();
        store.put("evt-1", cal, org, score, level, action, fields, dets);

        let entry = store.get("evt-1").unwrap();
        assert_eq!(entry.event_id, "evt-1");
        assert_eq!(entry.risk_level, RiskLevel::Dangerous);
    }

    #[test]
    fn get_missing_event_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn expired_entry_is_deleted_on_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::with_ttl_days(dir.path(), -1);
        let (cal, org, score, level, action, fields, dets) = entry_args();
        store.put("evt-expired", cal, org, score, level, action, fields, dets);

        assert!(store.get("evt-expired").is_none());
        assert!(!dir.path().join("evt-expired.json").exists());
    }

    #[test]
    fn list_filters_by_min_risk_level_and_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        let (cal, org, _, _, action, fields, dets) = entry_args();
        store.put("low", cal.clone(), org.clone(), 0.3, RiskLevel::Suspicious, action, fields.clone(), dets.clone());
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.put("high", cal, org, 0.9, RiskLevel::Critical, action, fields, dets);

        let all = store.list(ListOptions::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_id, "high");

        let filtered = store.list(ListOptions { min_risk_level: Some(RiskLevel::Dangerous) });
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].event_id, "high");
    }

    #[test]
    fn sanitize_id_strips_unsafe_characters() {
        assert_eq!(sanitize_id("../../etc/passwd"), "______etc_passwd");
    }

    #[test]
    fn cleanup_removes_only_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let expired_store = QuarantineStore::with_ttl_days(dir.path(), -1);
        let (cal, org, score, level, action, fields, dets) = entry_args();
        expired_store.put("expired-evt", cal, org, score, level, action, fields, dets);

        let fresh_store = QuarantineStore::new(dir.path());
        let (cal, org, score, level, action, fields, dets) = entry_args();
        fresh_store.put("fresh-evt", cal, org, score, level, action, fields, dets);

        assert_eq!(fresh_store.cleanup(), 1);
        assert!(fresh_store.get("fresh-evt").is_some());
    }
}
