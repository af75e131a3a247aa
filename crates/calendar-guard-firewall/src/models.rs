//! # Core Types for Calendar Event Sanitization
//!
//! This module defines the data types shared by the detection tiers, the
//! risk scorer, the redactor, and the annotator: the event shape coming in
//! from the calendar source, the per-field scan context, detections, and
//! the field/event scan results.
//!
//! ## Threat Model
//!
//! The type system encodes a rule-based taxonomy of indirect prompt
//! injection (IPI) markers, split across three independent tiers:
//!
//! - **Structural** — technical markers (invisible characters, encoded
//!   payloads, dangerous markup, dangerous URI schemes).
//! - **Contextual** — semantic patterns (instruction overrides, fake
//!   tool-call syntax, role assumption, urgency/authority framing).
//! - **Threat-intel** — community-reported fingerprints (see
//!   `calendar-guard-intel`).
//!
//! ## Design Principles
//!
//! 1. **Exhaustive classification** — every detection carries a stable
//!    `rule_id` from a fixed namespace (`STRUCT-001..009`, `CTX-001..009`,
//!    `THREAT-001`, `ENGINE-TIMEOUT`).
//! 2. **Confidence calibration** — every detection carries `severity` and
//!    `confidence` in `[0.0, 1.0]`.
//! 3. **Actionable results** — [`SecurityAction`] gives a clear
//!    pass/flag/redact/block decision.
//! 4. **Serializable** — all types derive Serde traits for audit logs and
//!    quarantine entries.

use serde::{Deserialize, Serialize};

/// Ordered risk level assigned to a field or an event.
///
/// The ordering is load-bearing: `Safe < Suspicious < Dangerous < Critical`
/// is used directly by the scorer's threshold comparisons and by
/// quarantine listing's `min_risk_level` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Dangerous,
    Critical,
}

impl RiskLevel {
    /// The action this risk level maps to. The mapping is 1-to-1 and fixed.
    pub fn action(&self) -> SecurityAction {
        match self {
            RiskLevel::Safe => SecurityAction::Pass,
            RiskLevel::Suspicious => SecurityAction::Flag,
            RiskLevel::Dangerous => SecurityAction::Redact,
            RiskLevel::Critical => SecurityAction::Block,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Suspicious => "SUSPICIOUS",
            RiskLevel::Dangerous => "DANGEROUS",
            RiskLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// The action the engine takes on a field or event.
///
/// In 1-to-1 correspondence with [`RiskLevel`]; never constructed except
/// via `RiskLevel::action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityAction {
    /// No threats found; pass the field through unmodified.
    Pass,
    /// Suspicious but below the redaction threshold; annotate only.
    Flag,
    /// Splice out the dangerous ranges, keep the rest.
    Redact,
    /// Replace the entire field with a quarantine notice.
    Block,
}

/// Which tier produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Structural,
    Contextual,
    ThreatIntel,
}

/// The kind of field a piece of text came from.
///
/// Contextual weighting (see `calendar-guard-firewall::contextual`) reads
/// this to scale severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Title,
    Description,
    Location,
    AttendeeName,
    Attachment,
}

/// Per-field scan inputs that aren't part of the text itself.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub field_name: String,
    pub field_type: FieldType,
    pub organizer_email: Option<String>,
    pub is_external_organizer: bool,
    pub owner_domain: Option<String>,
}

/// One finding from one rule, in one tier, over one field.
///
/// `match_offset`/`match_length` index into the (possibly truncated)
/// scanned text in bytes. `match_length == 0` marks a whole-field finding
/// (e.g. "12 zero-width characters") with no single splice point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub tier: Tier,
    pub rule_id: String,
    pub rule_name: String,
    pub severity: f64,
    pub matched_content: String,
    pub match_offset: usize,
    pub match_length: usize,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Detection {
    /// Clamp severity and confidence into `[0, 1]`. Rule implementations
    /// call this once at construction so a bad severity arithmetic slip
    /// can never leak an out-of-range score into the composite.
    pub fn clamped(mut self) -> Self {
        self.severity = self.severity.clamp(0.0, 1.0);
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// Scan result for a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldScanResult {
    pub field_name: String,
    pub original_length: usize,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub action: SecurityAction,
    pub detections: Vec<Detection>,
    pub sanitized_content: Option<String>,
}

/// Scan result for a whole event (aggregate of its field results).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventScanResult {
    pub event_id: String,
    pub calendar_id: Option<String>,
    pub organizer_email: Option<String>,
    pub is_external_organizer: bool,
    pub overall_risk_score: f64,
    pub overall_risk_level: RiskLevel,
    pub overall_action: SecurityAction,
    pub field_results: Vec<FieldScanResult>,
    pub scan_duration_ms: u64,
    pub scanned_at: chrono::DateTime<chrono::Utc>,
}

/// A calendar attendee as surfaced by the upstream tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attendee {
    #[serde(default)]
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// A calendar attachment as surfaced by the upstream tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub title: Option<String>,
}

/// The event organizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organizer {
    pub email: Option<String>,
}

/// A calendar event as read from the upstream calendar tool.
///
/// Every text field is optional; absent or empty fields are simply not
/// scanned (they never appear in `EventScanResult::field_results`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub organizer: Option<Organizer>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Maximum number of characters scanned in a single field; text beyond
/// this is truncated before any tier runs. Truncation is silent — no
/// synthetic detection is emitted for it.
pub const MAX_FIELD_LENGTH: usize = 50_000;

/// Maximum number of events accepted in a single batch scan.
pub const MAX_BATCH_EVENTS: usize = 100;

/// Maximum number of detections retained per field; tiers may find more,
/// but only the first `MAX_DETECTIONS_PER_FIELD` (in emission order) are
/// kept on the field result.
pub const MAX_DETECTIONS_PER_FIELD: usize = 50;
