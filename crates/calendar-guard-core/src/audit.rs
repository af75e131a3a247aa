//! # Audit Logger
//!
//! Append-only JSON-per-line log of every scanned event, one file per UTC
//! day. Grounded on `sentinel-core`'s `audit_logging` config flag and
//! general append-only-log idiom in the teacher workspace; no single
//! teacher file implements this (the teacher never persisted an audit
//! trail to disk), so this is new domain logic in the teacher's error-
//! handling style (failures swallowed, matching `GlobalConfig::fail_closed`
//! never applying to logging itself).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use calendar_guard_firewall::{EventScanResult, RiskLevel, SecurityAction, Tier};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FlatDetection {
    rule_id: String,
    rule_name: String,
    tier: Tier,
    severity: f64,
    field_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditRecord {
    timestamp: DateTime<Utc>,
    event_id: String,
    calendar_id: Option<String>,
    organizer_email: Option<String>,
    is_external_organizer: bool,
    overall_risk_score: f64,
    overall_risk_level: RiskLevel,
    overall_action: SecurityAction,
    detections: Vec<FlatDetection>,
    scan_duration_ms: u64,
    scanned_field_count: usize,
}

/// Append-only audit log writer. One JSONL file per UTC day; the caller
/// is responsible for serializing concurrent appends within one process
/// (see the crate root's concurrency notes).
pub struct AuditLogger {
    log_dir: PathBuf,
}

impl AuditLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        AuditLogger { log_dir: log_dir.into() }
    }

    fn path_for(&self, date: DateTime<Utc>) -> PathBuf {
        self.log_dir.join(format!("audit-{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Appends one record for `result`. Never propagates a failure: a
    /// broken audit log must not stop the scan it's logging.
    pub fn record(&self, result: &EventScanResult) {
        let now = Utc::now();
        let record = AuditRecord {
            timestamp: now,
            event_id: result.event_id.clone(),
            calendar_id: result.calendar_id.clone(),
            organizer_email: result.organizer_email.clone(),
            is_external_organizer: result.is_external_organizer,
            overall_risk_score: result.overall_risk_score,
            overall_risk_level: result.overall_risk_level,
            overall_action: result.overall_action,
            detections: result
                .field_results
                .iter()
                .flat_map(|f| {
                    f.detections.iter().map(move |d| FlatDetection {
                        rule_id: d.rule_id.clone(),
                        rule_name: d.rule_name.clone(),
                        tier: d.tier,
                        severity: d.severity,
                        field_name: f.field_name.clone(),
                    })
                })
                .collect(),
            scan_duration_ms: result.scan_duration_ms,
            scanned_field_count: result.field_results.len(),
        };

        let Ok(line) = serde_json::to_string(&record) else { return };
        if std::fs::create_dir_all(&self.log_dir).is_err() {
            tracing::warn!("audit log directory could not be created");
            return;
        }
        let path = self.path_for(now);
        let file = OpenOptions::new().create(true).append(true).open(&path);
        match file {
            Ok(mut file) => {
                if writeln!(file, "{line}").is_err() {
                    tracing::warn!("audit log append failed for {:?}", path);
                }
            }
            Err(err) => tracing::warn!("audit log open failed: {err}"),
        }
    }

    pub fn log_dir(&self) -> &PathBuf {
        &self.log_dir
    }
}
