//! Configuration types for the calendar IPI guard.
//!
//! Grounded on `sentinel-core/src/config.rs`'s nested
//! `SentinelConfig`/`RegistryConfig`/`MonitorConfig`/`GlobalConfig` shape:
//! one top-level config struct composed of per-subsystem structs, each
//! with its own `Default`. Loading this from a file or environment is out
//! of scope; only the struct and its defaults are provided.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for [`crate::engine::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    pub scorer: ScorerConfig,
    pub intel: calendar_guard_intel::IntelConfig,
    pub quarantine: QuarantineConfig,
    pub audit: AuditConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerConfig::default(),
            intel: calendar_guard_intel::IntelConfig::default(),
            quarantine: QuarantineConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Risk thresholds used by the scorer to map a composite score to a
/// [`calendar_guard_firewall::RiskLevel`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub suspicious_threshold: f64,
    pub dangerous_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            suspicious_threshold: 0.30,
            dangerous_threshold: 0.60,
            critical_threshold: 0.85,
        }
    }
}

/// Quarantine store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineConfig {
    pub store_dir: PathBuf,
    pub ttl_days: i64,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("./calendar-guard-quarantine"),
            ttl_days: 7,
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub log_dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./calendar-guard-audit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_constants() {
        let config = GuardConfig::default();
        assert_eq!(config.scorer.dangerous_threshold, 0.60);
        assert_eq!(config.quarantine.ttl_days, 7);
        assert!(!config.intel.cloud_enabled);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = GuardConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GuardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scorer.critical_threshold, config.scorer.critical_threshold);
    }
}
