//! # Redactor
//!
//! Applies a [`SecurityAction`] to a field's original text, producing the
//! `sanitized_content` stored on [`FieldScanResult`]. Grounded on
//! `sentinel-firewall/src/cdr.rs`'s splice-and-rebuild approach to text
//! sanitization (there, ANSI/control-character stripping; here, detection
//! range redaction), generalized from a single stripping pass to
//! redaction driven by a detection list.

use crate::models::{Detection, SecurityAction};

/// Splices `[REDACTED:<rule_id>]` over each non-zero-length detection
/// range, processed in descending offset order so earlier splices don't
/// shift the byte offsets of ranges still to be processed.
fn splice_redactions(original: &str, detections: &[Detection]) -> String {
    let mut ranges: Vec<&Detection> = detections.iter().filter(|d| d.match_length > 0).collect();
    ranges.sort_by(|a, b| b.match_offset.cmp(&a.match_offset));

    let mut text = original.to_string();
    for d in ranges {
        let start = d.match_offset.min(text.len());
        let end = (d.match_offset + d.match_length).min(text.len());
        if start >= end || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }
        let marker = format!("[REDACTED:{}]", d.rule_id);
        text.replace_range(start..end, &marker);
    }
    text
}

/// Produces the sanitized text for a field given the action the scorer
/// decided on. `Pass`/`Flag` return the original text unchanged — the
/// annotator is what surfaces those findings, not the redactor.
pub fn redact(original: &str, action: SecurityAction, detections: &[Detection]) -> String {
    match action {
        SecurityAction::Pass | SecurityAction::Flag => original.to_string(),
        SecurityAction::Redact => splice_redactions(original, detections),
        SecurityAction::Block => format!(
            "[CONTENT BLOCKED: {} matching pattern(s) detected; see the quarantine store for the original]",
            detections.len()
        ),
    }
}
