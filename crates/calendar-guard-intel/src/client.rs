//! # Threat-Intel Client
//!
//! Cache-first lookups with an optional cloud backend. Grounded on the
//! async `reqwest::Client` pattern in `analyzer-groq`'s lib.rs (client
//! held behind `Arc`, JSON request/response, per-request timeout), with
//! the cache-first short-circuit and fire-and-forget reporting layered
//! on top for this crate's needs.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::wire::{CheckResponse, FeedResponse, ReportRequest, ReportedFingerprint};

const CHECK_REPORT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
const FEED_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Configuration for the cloud threat-intel backend.
///
/// `sync_interval_hours` is stored as hours rather than `chrono::Duration`
/// so this type stays plainly `Serialize`/`Deserialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    pub api_base_url: String,
    pub cloud_enabled: bool,
    pub sync_interval_hours: i64,
    pub state_dir: PathBuf,
    pub cache_ttl_hours: i64,
}

impl IntelConfig {
    /// Cloud disabled, local cache only. Used when no API URL is
    /// configured; `check`/`report`/`sync_feed` then become pure
    /// cache/no-op operations.
    pub fn local_only(state_dir: impl Into<PathBuf>) -> Self {
        IntelConfig {
            api_base_url: String::new(),
            cloud_enabled: false,
            sync_interval_hours: 6,
            state_dir: state_dir.into(),
            cache_ttl_hours: crate::cache::DEFAULT_TTL_HOURS,
        }
    }

    fn sync_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sync_interval_hours)
    }
}

impl Default for IntelConfig {
    fn default() -> Self {
        IntelConfig::local_only(PathBuf::from("./calendar-guard-state"))
    }
}

/// Cache-first, cloud-backed threat-intel client.
pub struct IntelClient {
    config: IntelConfig,
    http: reqwest::Client,
    cache: Cache,
    client_id: String,
    last_sync: Option<DateTime<Utc>>,
}

impl IntelClient {
    pub fn new(config: IntelConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.state_dir)?;
        let cache = Cache::open(config.state_dir.join("cache.json"), config.cache_ttl_hours)?;
        let client_id = load_or_create_client_id(&config.state_dir)?;
        Ok(IntelClient {
            http: reqwest::Client::new(),
            cache,
            client_id,
            last_sync: None,
            config,
        })
    }

    /// Cache-first check for a fingerprint. Consults the content hash,
    /// then the structural hash. Falls through to the cloud only if
    /// neither is cached locally and cloud access is enabled; any
    /// network failure degrades to a negative result.
    pub async fn check(&mut self, fp: &Fingerprint) -> CheckResponse {
        if let Some(hit) = self.cache.get(&fp.content_hash) {
            return hit;
        }
        if let Some(hit) = self.cache.get(&fp.structural_hash) {
            return hit;
        }
        if !self.config.cloud_enabled {
            return CheckResponse::negative();
        }

        for hash in [&fp.content_hash, &fp.structural_hash] {
            match self.check_remote(hash).await {
                Ok(resp) => {
                    let _ = self.cache.set(hash, resp.clone());
                    if resp.known {
                        return resp;
                    }
                }
                Err(_) => continue,
            }
        }
        CheckResponse::negative()
    }

    async fn check_remote(&self, hash: &str) -> Result<CheckResponse> {
        let url = format!("{}/api/v1/check/{hash}", self.config.api_base_url);
        let resp = self.http.get(url).timeout(CHECK_REPORT_TIMEOUT).send().await?;
        let body: CheckResponse = resp.json().await?;
        Ok(body)
    }

    /// Fire-and-forget report of a fingerprint. No-op when cloud access
    /// is disabled; errors are swallowed.
    pub async fn report(&self, fp: &Fingerprint, risk_score: f64, organizer_domain: Option<String>) {
        if !self.config.cloud_enabled {
            return;
        }
        let mut reported: ReportedFingerprint = fp.clone().into();
        reported.risk_score = risk_score;
        reported.organizer_domain = organizer_domain;

        let request = ReportRequest { client_id: self.client_id.clone(), fingerprint: reported, reported_at: Utc::now() };
        let url = format!("{}/api/v1/report", self.config.api_base_url);
        let _ = self.http.post(url).json(&request).timeout(CHECK_REPORT_TIMEOUT).send().await;
    }

    /// Pulls new feed entries into the local cache if the sync interval
    /// has elapsed. Returns the number of entries imported; 0 on any
    /// error, disabled cloud, or too-recent prior sync.
    pub async fn sync_feed(&mut self) -> usize {
        if !self.config.cloud_enabled {
            return 0;
        }
        let now = Utc::now();
        if let Some(last) = self.last_sync {
            if now - last < self.config.sync_interval() {
                return 0;
            }
        }

        let since = self.last_sync.unwrap_or(now - chrono::Duration::hours(24));
        let url = format!("{}/api/v1/feed?since={}", self.config.api_base_url, since.to_rfc3339());
        let result = self.http.get(url).timeout(FEED_TIMEOUT).send().await.and_then(|r| r.error_for_status());
        let response = match result {
            Ok(resp) => resp.json::<FeedResponse>().await,
            Err(_) => return 0,
        };

        match response {
            Ok(feed) => {
                let count = feed.entries.len();
                if self.cache.import_feed(&feed.entries).is_err() {
                    return 0;
                }
                self.last_sync = Some(now);
                count
            }
            Err(_) => 0,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Seeds the local cache directly, bypassing the network. Only
    /// exposed to other crates' test code, for exercising detection
    /// construction against a known-positive result without a live cloud
    /// backend.
    #[cfg(test)]
    pub fn seed_cache_for_test(&mut self, hash: &str, response: CheckResponse) {
        let _ = self.cache.set(hash, response);
    }
}

fn load_or_create_client_id(state_dir: &std::path::Path) -> Result<String> {
    let path = state_dir.join("client-id");
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let id = Uuid::new_v4().to_string();
    std::fs::write(&path, &id)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cloud_disabled_check_is_negative_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntelConfig::local_only(dir.path());
        let mut client = IntelClient::new(config).unwrap();
        let fp = Fingerprint { content_hash: "a".repeat(64), structural_hash: "b".repeat(64) };
        let result = client.check(&fp).await;
        assert!(!result.known);
    }

    #[tokio::test]
    async fn cloud_disabled_report_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntelConfig::local_only(dir.path());
        let client = IntelClient::new(config).unwrap();
        let fp = Fingerprint { content_hash: "a".repeat(64), structural_hash: "b".repeat(64) };
        client.report(&fp, 0.9, None).await;
    }

    #[tokio::test]
    async fn cloud_disabled_sync_feed_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntelConfig::local_only(dir.path());
        let mut client = IntelClient::new(config).unwrap();
        assert_eq!(client.sync_feed().await, 0);
    }

    #[tokio::test]
    async fn client_id_persists_across_instantiations() {
        let dir = tempfile::tempdir().unwrap();
        let first = IntelClient::new(IntelConfig::local_only(dir.path())).unwrap();
        let id = first.client_id().to_string();
        drop(first);
        let second = IntelClient::new(IntelConfig::local_only(dir.path())).unwrap();
        assert_eq!(second.client_id(), id);
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_before_any_cloud_access() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = IntelConfig::local_only(dir.path());
        config.cloud_enabled = true;
        config.api_base_url = "http://127.0.0.1:1".to_string();
        let mut client = IntelClient::new(config).unwrap();
        let fp = Fingerprint { content_hash: "c".repeat(64), structural_hash: "d".repeat(64) };
        client
            .cache
            .set(&fp.content_hash, CheckResponse { known: true, confidence: 0.7, report_count: 2, first_seen: None, last_seen: None, category: None })
            .unwrap();
        let result = client.check(&fp).await;
        assert!(result.known);
    }
}
