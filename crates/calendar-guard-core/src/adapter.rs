//! # Proxy Adapter
//!
//! The upstream tool call returns an opaque result containing structured
//! text; this module parses it into [`Event`]s by trying three shapes in
//! order — a bare JSON event array, a `{"events": [...]}` object, or
//! line-structured plaintext — and returns zero events if none apply.
//! Grounded on SPEC_FULL.md section 9's "Heterogeneous MCP tool results"
//! redesign note; no teacher file covers this (the teacher's MCP tooling
//! deals in schemas, not calendar events), so the parsing strategy itself
//! (try-each-shape-in-order) is new, built in the spirit of the teacher's
//! fail-soft error handling (a shape that doesn't parse is not an error,
//! just a miss).

use calendar_guard_firewall::{Event, EventScanResult, MAX_BATCH_EVENTS};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EventsWrapper {
    events: Vec<Event>,
}

/// Parses a raw MCP tool result into events, trying each shape in order.
/// Returns an empty vec if no shape applies. Caps the result at
/// [`MAX_BATCH_EVENTS`]; a larger batch is truncated rather than
/// rejected, since the upstream tool call has already happened by the
/// time this adapter sees the result.
pub fn parse_tool_result(raw: &str) -> Vec<Event> {
    let mut events = parse_any_shape(raw);
    if events.len() > MAX_BATCH_EVENTS {
        tracing::warn!(total = events.len(), kept = MAX_BATCH_EVENTS, "tool result exceeded batch cap, truncating");
        events.truncate(MAX_BATCH_EVENTS);
    }
    events
}

fn parse_any_shape(raw: &str) -> Vec<Event> {
    if let Ok(events) = serde_json::from_str::<Vec<Event>>(raw) {
        return events;
    }
    if let Ok(wrapper) = serde_json::from_str::<EventsWrapper>(raw) {
        return wrapper.events;
    }
    parse_line_structured(raw)
}

/// Treats each non-blank line as the description of a synthetic event.
/// Used for plaintext tool results with no JSON structure at all.
fn parse_line_structured(raw: &str) -> Vec<Event> {
    raw.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(Event {
                id: format!("line-{i}"),
                description: Some(trimmed.to_string()),
                ..Default::default()
            })
        })
        .collect()
}

/// Re-emits a tool response for the downstream consumer: the annotator's
/// warning block (if any events were flagged), followed by the sanitized
/// events as JSON.
pub fn render_tool_response(results: &[EventScanResult], sanitized_events: &[Event]) -> String {
    let mut out = String::new();
    if let Some(notice) = calendar_guard_firewall::annotator::annotate(results) {
        out.push_str(&notice);
        out.push('\n');
    }
    match serde_json::to_string_pretty(sanitized_events) {
        Ok(json) => out.push_str(&json),
        Err(_) => out.push_str("[]"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_array() {
        let raw = r#"[{"id": "evt-1", "summary": "Sync"}]"#;
        let events = parse_tool_result(raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "evt-1");
    }

    #[test]
    fn parses_events_wrapper_object() {
        let raw = r#"{"events": [{"id": "evt-1"}, {"id": "evt-2"}]}"#;
        let events = parse_tool_result(raw);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn batch_larger_than_cap_is_truncated() {
        let events: Vec<Event> = (0..(MAX_BATCH_EVENTS + 10)).map(|i| Event { id: format!("evt-{i}"), ..Default::default() }).collect();
        let raw = serde_json::to_string(&events).unwrap();
        let parsed = parse_tool_result(&raw);
        assert_eq!(parsed.len(), MAX_BATCH_EVENTS);
    }

    #[test]
    fn falls_back_to_line_structured_plaintext() {
        let raw = "Meeting with vendor\nDiscuss Q3 roadmap\n\n";
        let events = parse_tool_result(raw);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].description.as_deref(), Some("Meeting with vendor"));
    }

    #[test]
    fn empty_input_yields_zero_events() {
        assert!(parse_tool_result("").is_empty());
    }

    #[test]
    fn render_response_prepends_notice_when_present() {
        let event = Event { id: "e1".into(), ..Default::default() };
        let results = vec![];
        let rendered = render_tool_response(&results, std::slice::from_ref(&event));
        assert!(rendered.contains("\"id\": \"e1\""));
        assert!(!rendered.starts_with("[SECURITY NOTICE]"));
    }
}
