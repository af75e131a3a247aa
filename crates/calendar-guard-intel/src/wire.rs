//! # Cloud Threat-Intel Wire Protocol
//!
//! Request/response types for the stable HTTP surface: `POST
//! /api/v1/report`, `GET /api/v1/check/{hash}`, `GET /api/v1/feed`.
//! Grounded on the `Indicator`/`IocType`/`Confidence`/`Severity` wire
//! types in the SASE-SDWAN threat-intel crate (field naming style,
//! `serde(rename_all = "camelCase")` convention).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedFingerprint {
    pub content_hash: String,
    pub structural_hash: String,
    #[serde(default)]
    pub pattern_ids: Vec<String>,
    pub risk_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_domain: Option<String>,
}

impl From<Fingerprint> for ReportedFingerprint {
    fn from(fp: Fingerprint) -> Self {
        ReportedFingerprint {
            content_hash: fp.content_hash,
            structural_hash: fp.structural_hash,
            pattern_ids: Vec::new(),
            risk_score: 0.0,
            organizer_domain: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub client_id: String,
    pub fingerprint: ReportedFingerprint,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub accepted: bool,
    #[serde(default)]
    pub content_hash: Option<ReportAck>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAck {
    pub report_count: u64,
    pub confidence: f64,
}

/// Response to `GET /api/v1/check/{hash}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub known: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub report_count: u64,
    #[serde(default)]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
}

impl CheckResponse {
    pub fn negative() -> Self {
        CheckResponse {
            known: false,
            confidence: 0.0,
            report_count: 0,
            first_seen: None,
            last_seen: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    Content,
    Structural,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub hash: String,
    pub hash_type: HashType,
    pub confidence: f64,
    pub report_count: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub entries: Vec<FeedEntry>,
    pub count: usize,
    pub synced_at: DateTime<Utc>,
}
