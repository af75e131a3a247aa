//! # Risk Scorer
//!
//! Combines structural, contextual, and threat-intel detections into a
//! single field-level risk score and [`RiskLevel`], then rolls field
//! results up into an event-level score.
//!
//! Grounded on `sentinel-firewall/src/firewall.rs`'s `calculate_risk_score`
//! (weighted-sum-of-matches approach), generalized to per-tier caps and a
//! multi-tier corroboration bonus the teacher's single-tier model had no
//! use for.

use crate::models::{Detection, RiskLevel, Tier};

const WEIGHT_STRUCTURAL: f64 = 0.40;
const WEIGHT_CONTEXTUAL: f64 = 0.45;
const WEIGHT_THREAT_INTEL: f64 = 0.15;

const THRESHOLD_SUSPICIOUS: f64 = 0.30;
const THRESHOLD_DANGEROUS: f64 = 0.60;
const THRESHOLD_CRITICAL: f64 = 0.85;

/// Per-tier contribution: highest single severity in the tier, plus a
/// small per-extra-detection bump (capped so five weak hits can't outwork
/// one strong one).
fn tier_score(detections: &[Detection], tier: Tier) -> f64 {
    let tier_detections: Vec<&Detection> = detections.iter().filter(|d| d.tier == tier).collect();
    if tier_detections.is_empty() {
        return 0.0;
    }
    let max_severity = tier_detections.iter().map(|d| d.severity).fold(0.0_f64, f64::max);
    let count_bonus = (0.05 * (tier_detections.len() as f64 - 1.0)).min(0.15);
    (max_severity + count_bonus).min(1.0)
}

/// Weighted combination of the three tiers, with a corroboration bonus
/// when two or more tiers fire on the same field (independent detection
/// paths agreeing is stronger evidence than one tier alone).
pub fn score_field(detections: &[Detection]) -> f64 {
    let structural = tier_score(detections, Tier::Structural);
    let contextual = tier_score(detections, Tier::Contextual);
    let threat_intel = tier_score(detections, Tier::ThreatIntel);

    let weighted =
        structural * WEIGHT_STRUCTURAL + contextual * WEIGHT_CONTEXTUAL + threat_intel * WEIGHT_THREAT_INTEL;

    let tiers_firing = [structural, contextual, threat_intel].iter().filter(|s| **s > 0.0).count();
    let corroboration = match tiers_firing {
        0 | 1 => 1.0,
        2 => 1.15,
        _ => 1.15 * 1.10,
    };

    (weighted * corroboration).min(1.0)
}

/// Maps a composite score to a [`RiskLevel`] via fixed thresholds.
pub fn risk_level(score: f64) -> RiskLevel {
    if score >= THRESHOLD_CRITICAL {
        RiskLevel::Critical
    } else if score >= THRESHOLD_DANGEROUS {
        RiskLevel::Dangerous
    } else if score >= THRESHOLD_SUSPICIOUS {
        RiskLevel::Suspicious
    } else {
        RiskLevel::Safe
    }
}

/// Event-level score is the maximum of its field scores: one dangerous
/// field makes the whole event dangerous, regardless of how many clean
/// fields surround it.
pub fn score_event(field_scores: &[f64]) -> f64 {
    field_scores.iter().copied().fold(0.0_f64, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Detection;

    fn det(tier: Tier, severity: f64) -> Detection {
        Detection {
            tier,
            rule_id: "TEST-000".into(),
            rule_name: "test".into(),
            severity,
            matched_content: String::new(),
            match_offset: 0,
            match_length: 0,
            confidence: 0.9,
            metadata: serde_json::Map::new(),
        }
        .clamped()
    }

    #[test]
    fn no_detections_scores_zero_and_safe() {
        assert_eq!(score_field(&[]), 0.0);
        assert_eq!(risk_level(0.0), RiskLevel::Safe);
    }

    #[test]
    fn single_weak_structural_hit_stays_safe_or_suspicious() {
        let score = score_field(&[det(Tier::Structural, 0.3)]);
        assert!(score < THRESHOLD_DANGEROUS);
    }

    #[test]
    fn strong_contextual_hit_alone_reaches_only_suspicious() {
        // A single tier is capped by its own weight (contextual = 0.45),
        // which is above suspicious (0.30) but below dangerous (0.60):
        // reaching Dangerous or above requires corroboration.
        let score = score_field(&[det(Tier::Contextual, 0.9)]);
        assert_eq!(risk_level(score), RiskLevel::Suspicious);
    }

    #[test]
    fn corroboration_across_tiers_outranks_single_tier() {
        let single = score_field(&[det(Tier::Structural, 0.7)]);
        let multi = score_field(&[det(Tier::Structural, 0.7), det(Tier::Contextual, 0.7)]);
        assert!(multi > single);
        assert_eq!(risk_level(multi), RiskLevel::Dangerous);
    }

    #[test]
    fn event_score_is_max_of_field_scores() {
        assert_eq!(score_event(&[0.1, 0.9, 0.4]), 0.9);
    }

    #[test]
    fn three_tier_corroboration_compounds_further() {
        let two = score_field(&[det(Tier::Structural, 0.5), det(Tier::Contextual, 0.5)]);
        let three =
            score_field(&[det(Tier::Structural, 0.5), det(Tier::Contextual, 0.5), det(Tier::ThreatIntel, 0.5)]);
        assert!(three > two);
    }
}
