//! # calendar-guard-core
//!
//! Orchestrates the calendar IPI guard: the engine runs an event through
//! every detection tier and the scorer, the quarantine store archives
//! dangerous originals, the audit logger records every scan, and the
//! adapter turns a raw MCP tool result into events and back into a tool
//! response.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  CALENDAR GUARD CORE                      │
//! ├───────────────────────────────────────────────────────────┤
//! │                     ┌──────────────┐                      │
//! │                     │    Engine    │ ← scan_event()        │
//! │                     └──────┬───────┘                      │
//! │         ┌───────────────────┼───────────────────┐          │
//! │         ▼                   ▼                   ▼          │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │  │  firewall    │    │    intel    │    │  scorer/     │    │
//! │  │ (struct/ctx) │    │ (threat-    │    │  redactor    │    │
//! │  │              │    │  intel)     │    │              │    │
//! │  └─────────────┘    └─────────────┘    └─────────────┘    │
//! │                                                             │
//! │  Side effects on Redact/Block outcomes: quarantine, audit. │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use calendar_guard_core::{Engine, GuardConfig};
//! use calendar_guard_intel::IntelClient;
//!
//! let config = GuardConfig::default();
//! let intel = IntelClient::new(config.intel.clone())?;
//! let mut engine = Engine::new(intel);
//! let (result, sanitized) = engine.scan_event(&event, Some("mycompany.example")).await;
//! ```

mod adapter;
mod audit;
mod config;
mod engine;
mod quarantine;

pub use adapter::{parse_tool_result, render_tool_response};
pub use audit::AuditLogger;
pub use config::{AuditConfig, GuardConfig, QuarantineConfig, ScorerConfig};
pub use engine::Engine;
pub use quarantine::{ListOptions, QuarantineEntry, QuarantineStore};

// Re-export the detection/scoring/event types consumers need without a
// direct dependency on `calendar-guard-firewall`.
pub use calendar_guard_firewall::{Detection, Event, EventScanResult, FieldScanResult, RiskLevel, SecurityAction};
