//! Calendar Guard CLI - command-line interface for the calendar IPI
//! sanitization engine.
//!
//! Thin shell: it wires flags to [`calendar_guard_core::Engine`] and
//! prints results. No config-file schema validation of its own — flags
//! map directly onto [`calendar_guard_intel::IntelConfig`] and the
//! quarantine/audit directories.

use std::path::PathBuf;

use anyhow::{Context, Result};
use calendar_guard_core::{AuditLogger, Engine, ListOptions, QuarantineStore};
use calendar_guard_firewall::RiskLevel;
use calendar_guard_intel::{IntelClient, IntelConfig};
use clap::Parser;

#[derive(Parser)]
#[command(name = "calendar-guard")]
#[command(about = "Active defense against indirect prompt injection in calendar events")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Scan a JSON file of calendar events (or a raw MCP tool result) and
    /// print the sanitized tool response.
    Scan {
        /// Path to the tool result: a bare event array, a
        /// `{"events": [...]}` object, or line-structured plaintext.
        input: PathBuf,
        /// The calendar owner's domain, for external-organizer detection.
        #[arg(long)]
        owner_domain: Option<String>,
        /// Directory for threat-intel cache and client-id state.
        #[arg(long, default_value = "./calendar-guard-state")]
        state_dir: PathBuf,
        /// Directory for quarantined originals.
        #[arg(long, default_value = "./calendar-guard-quarantine")]
        quarantine_dir: PathBuf,
        /// Directory for the append-only audit log.
        #[arg(long, default_value = "./calendar-guard-audit")]
        audit_dir: PathBuf,
        /// Enable the cloud threat-intel backend.
        #[arg(long)]
        cloud_enabled: bool,
        /// Cloud threat-intel API base URL (only used with --cloud-enabled).
        #[arg(long, default_value = "")]
        api_base_url: String,
    },
    /// Inspect the quarantine store.
    Quarantine {
        #[command(subcommand)]
        action: QuarantineAction,
    },
    /// Inspect the audit log.
    Audit {
        /// Directory holding the `audit-YYYY-MM-DD.jsonl` files.
        #[arg(long, default_value = "./calendar-guard-audit")]
        dir: PathBuf,
        /// UTC date to show, as `YYYY-MM-DD`; defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Show build and default-configuration information.
    Status,
}

#[derive(clap::Subcommand)]
enum QuarantineAction {
    /// List quarantined events, newest first.
    List {
        #[arg(long, default_value = "./calendar-guard-quarantine")]
        dir: PathBuf,
        /// Only show entries at or above this risk level (safe, suspicious, dangerous, critical).
        #[arg(long)]
        min_risk_level: Option<String>,
    },
    /// Show one quarantined event by id.
    Get {
        #[arg(long, default_value = "./calendar-guard-quarantine")]
        dir: PathBuf,
        event_id: String,
    },
    /// Delete expired quarantine entries.
    Cleanup {
        #[arg(long, default_value = "./calendar-guard-quarantine")]
        dir: PathBuf,
    },
}

fn parse_risk_level(s: &str) -> Result<RiskLevel> {
    match s.to_ascii_lowercase().as_str() {
        "safe" => Ok(RiskLevel::Safe),
        "suspicious" => Ok(RiskLevel::Suspicious),
        "dangerous" => Ok(RiskLevel::Dangerous),
        "critical" => Ok(RiskLevel::Critical),
        other => anyhow::bail!("unrecognized risk level: {other}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scan { input, owner_domain, state_dir, quarantine_dir, audit_dir, cloud_enabled, api_base_url }) => {
            scan(input, owner_domain, state_dir, quarantine_dir, audit_dir, cloud_enabled, api_base_url).await
        }
        Some(Commands::Quarantine { action }) => quarantine(action),
        Some(Commands::Audit { dir, date }) => audit(dir, date),
        Some(Commands::Status) => {
            status();
            Ok(())
        }
        None => {
            println!("calendar-guard v{} - use --help for commands", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn scan(
    input: PathBuf,
    owner_domain: Option<String>,
    state_dir: PathBuf,
    quarantine_dir: PathBuf,
    audit_dir: PathBuf,
    cloud_enabled: bool,
    api_base_url: String,
) -> Result<()> {
    let raw = std::fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
    let events = calendar_guard_core::parse_tool_result(&raw);
    tracing::info!(count = events.len(), "parsed events from tool result");

    let mut intel_config = IntelConfig::local_only(&state_dir);
    intel_config.cloud_enabled = cloud_enabled;
    if !api_base_url.is_empty() {
        intel_config.api_base_url = api_base_url;
    }
    let intel = IntelClient::new(intel_config).context("initializing threat-intel client")?;
    let mut engine = Engine::new(intel);

    let quarantine = QuarantineStore::new(&quarantine_dir);
    let audit_logger = AuditLogger::new(&audit_dir);

    let mut results = Vec::with_capacity(events.len());
    let mut sanitized_events = Vec::with_capacity(events.len());

    for event in &events {
        let (result, sanitized) = engine.scan_event(event, owner_domain.as_deref()).await;

        if matches!(result.overall_action, calendar_guard_firewall::SecurityAction::Redact | calendar_guard_firewall::SecurityAction::Block) {
            let original_fields: Vec<(String, String)> = result
                .field_results
                .iter()
                .filter(|f| f.sanitized_content.is_some())
                .filter_map(|f| original_field_text(event, &f.field_name).map(|text| (f.field_name.clone(), text)))
                .collect();
            quarantine.put(
                &result.event_id,
                result.calendar_id.clone(),
                result.organizer_email.clone(),
                result.overall_risk_score,
                result.overall_risk_level,
                result.overall_action,
                original_fields,
                result.field_results.iter().flat_map(|f| f.detections.clone()).collect(),
            );
        }

        audit_logger.record(&result);
        results.push(result);
        sanitized_events.push(sanitized);
    }

    println!("{}", calendar_guard_core::render_tool_response(&results, &sanitized_events));
    Ok(())
}

/// Original text for the three fields the engine ever rewrites
/// (`summary`/`description`/`location`); attendee/attachment subfields
/// are never rewritten, so they never need a quarantine copy.
fn original_field_text(event: &calendar_guard_firewall::Event, field_name: &str) -> Option<String> {
    match field_name {
        "summary" => event.summary.clone(),
        "description" => event.description.clone(),
        "location" => event.location.clone(),
        _ => None,
    }
}

fn quarantine(action: QuarantineAction) -> Result<()> {
    match action {
        QuarantineAction::List { dir, min_risk_level } => {
            let min_risk_level = min_risk_level.as_deref().map(parse_risk_level).transpose()?;
            let store = QuarantineStore::new(dir);
            let entries = store.list(ListOptions { min_risk_level });
            if entries.is_empty() {
                println!("no quarantined events");
                return Ok(());
            }
            for entry in entries {
                println!(
                    "{}  {}  {:>10.2}  organizer={}",
                    entry.quarantined_at.to_rfc3339(),
                    entry.event_id,
                    entry.risk_score,
                    entry.organizer_email.as_deref().unwrap_or("-"),
                );
            }
        }
        QuarantineAction::Get { dir, event_id } => {
            let store = QuarantineStore::new(dir);
            match store.get(&event_id) {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => println!("no such quarantine entry (missing or expired): {event_id}"),
            }
        }
        QuarantineAction::Cleanup { dir } => {
            let store = QuarantineStore::new(dir);
            let removed = store.cleanup();
            println!("removed {removed} expired entries");
        }
    }
    Ok(())
}

fn audit(dir: PathBuf, date: Option<String>) -> Result<()> {
    let date = date.unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());
    let path = dir.join(format!("audit-{date}.jsonl"));
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let count = contents.lines().count();
            println!("{} ({count} records)", path.display());
            print!("{contents}");
        }
        Err(_) => println!("no audit log for {date} at {}", path.display()),
    }
    Ok(())
}

fn status() {
    let config = calendar_guard_core::GuardConfig::default();
    println!("calendar-guard v{}", env!("CARGO_PKG_VERSION"));
    println!("thresholds: suspicious={:.2} dangerous={:.2} critical={:.2}",
        config.scorer.suspicious_threshold, config.scorer.dangerous_threshold, config.scorer.critical_threshold);
    println!("cloud threat-intel: {}", if config.intel.cloud_enabled { "enabled" } else { "disabled (local cache only)" });
    println!("quarantine ttl: {} days", config.quarantine.ttl_days);
}
