//! # calendar-guard-firewall
//!
//! Detection, scoring, redaction, and annotation for indirect
//! prompt-injection content embedded in calendar event fields.
//!
//! ```text
//! text ──▶ structural::analyze ──┐
//!      └─▶ contextual::analyze ──┼──▶ scorer::score_field ──▶ redactor::redact
//!                                │                                  │
//!               (threat-intel, calendar-guard-intel) ───────────────┘
//! ```
//!
//! This crate has no async runtime dependency and no I/O: the structural
//! and contextual tiers and the scorer are pure functions over `&str`.
//! Threat-intel detections are produced out-of-crate (by
//! `calendar-guard-intel`) and merged into the same `Detection` list
//! before scoring.

pub mod annotator;
pub mod contextual;
pub mod models;
pub mod redactor;
pub mod scorer;
pub mod structural;

pub use models::{
    Attachment, Attendee, Detection, Event, EventScanResult, FieldScanResult, FieldType, Organizer, RiskLevel,
    ScanContext, SecurityAction, Tier, MAX_BATCH_EVENTS, MAX_DETECTIONS_PER_FIELD, MAX_FIELD_LENGTH,
};

/// Runs both in-crate tiers (structural, contextual) over one field's
/// text and returns the combined, rule-id/offset-sorted detection list.
/// Threat-intel detections are the caller's responsibility to append
/// before scoring (see `calendar-guard-core::engine`).
pub fn analyze_field(text: &str, ctx: &ScanContext) -> Vec<Detection> {
    let mut detections = structural::analyze(text);
    detections.extend(contextual::analyze(text, ctx));
    detections.sort_by(|a, b| a.rule_id.cmp(&b.rule_id).then(a.match_offset.cmp(&b.match_offset)));
    detections.truncate(MAX_DETECTIONS_PER_FIELD);
    detections
}
