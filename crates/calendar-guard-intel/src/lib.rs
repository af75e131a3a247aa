//! # calendar-guard-intel
//!
//! Threat-intel tier support: fingerprinting, the local TTL cache, the
//! cloud client, and the `THREAT-001` detection this tier contributes to
//! a field's detection list.
//!
//! This crate is the one place in the workspace that suspends on network
//! or file I/O; `calendar-guard-firewall`'s structural/contextual tiers
//! and scorer stay synchronous.

pub mod cache;
pub mod client;
pub mod error;
pub mod fingerprint;
pub mod wire;

use calendar_guard_firewall::{Detection, Tier};
use fingerprint::Fingerprint;

pub use cache::Cache;
pub use client::{IntelClient, IntelConfig};
pub use error::{IntelError, Result};
pub use fingerprint::fingerprint as compute_fingerprint;

/// Runs the threat-intel tier for one field: fingerprints the text, asks
/// the client, and emits `THREAT-001` if the fingerprint is known.
/// Severity is `min(1.0, confidence + min(0.02 * report_count, 0.15))`.
/// Any client error degrades silently to an empty detection list.
pub async fn analyze(text: &str, client: &mut IntelClient) -> Vec<Detection> {
    let fp: Fingerprint = compute_fingerprint(text);
    let result = client.check(&fp).await;
    if !result.known {
        return Vec::new();
    }

    let severity = (result.confidence + (0.02 * result.report_count as f64).min(0.15)).min(1.0);
    let mut metadata = serde_json::Map::new();
    metadata.insert("content_hash".into(), serde_json::Value::String(fp.content_hash));
    metadata.insert("structural_hash".into(), serde_json::Value::String(fp.structural_hash));
    metadata.insert("report_count".into(), serde_json::Value::from(result.report_count));
    if let Some(category) = &result.category {
        metadata.insert("category".into(), serde_json::Value::String(category.clone()));
    }

    vec![Detection {
        tier: Tier::ThreatIntel,
        rule_id: "THREAT-001".into(),
        rule_name: "Known malicious fingerprint".into(),
        severity,
        matched_content: "community-reported fingerprint match".into(),
        match_offset: 0,
        match_length: 0,
        confidence: result.confidence,
        metadata,
    }
    .clamped()]
}
