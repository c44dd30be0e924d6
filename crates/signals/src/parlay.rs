//! Parlay-level verdict from per-leg ensemble results.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ensemble::{ConsensusBucket, EnsembleResult};

/// A leg whose score is below this counts as fading.
const FADING_SCORE: f64 = -15.0;

/// Four-tier risk for the whole ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParlayRisk {
    Low,
    Medium,
    High,
    Extreme,
}

impl ParlayRisk {
    #[must_use]
    pub fn assess(fading_legs: usize, weakest_score: f64) -> Self {
        if fading_legs >= 2 || weakest_score <= -40.0 {
            Self::Extreme
        } else if fading_legs == 1 || weakest_score < 0.0 {
            Self::High
        } else if weakest_score < 15.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegScore {
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayEnsembleResult {
    pub leg_count: usize,
    /// Confidence-weighted mean of leg scores.
    pub overall_score: f64,
    pub consensus: ConsensusBucket,
    pub average_confidence: f64,
    pub weakest_leg: Option<LegScore>,
    pub strongest_leg: Option<LegScore>,
    pub fading_legs: usize,
    pub risk: ParlayRisk,
    pub recommendation: String,
}

impl ParlayEnsembleResult {
    #[must_use]
    pub fn insufficient_data() -> Self {
        Self {
            leg_count: 0,
            overall_score: 0.0,
            consensus: ConsensusBucket::Neutral,
            average_confidence: 0.0,
            weakest_leg: None,
            strongest_leg: None,
            fading_legs: 0,
            risk: ParlayRisk::High,
            recommendation: "Insufficient data: no legs to evaluate".to_string(),
        }
    }
}

/// Rolls per-leg ensemble results into one parlay verdict.
///
/// Leg scores are averaged weighted by each leg's confidence; when every leg
/// has zero confidence the plain mean is used. Weakest and strongest legs
/// are picked by raw score, earliest leg first on ties.
#[must_use]
pub fn aggregate_parlay_ensemble(legs: &[EnsembleResult]) -> ParlayEnsembleResult {
    if legs.is_empty() {
        debug!("Parlay ensemble called with no legs");
        return ParlayEnsembleResult::insufficient_data();
    }

    let n = legs.len() as f64;
    let total_confidence: f64 = legs.iter().map(|l| l.weighted_confidence).sum();
    let overall_score = if total_confidence > f64::EPSILON {
        legs.iter()
            .map(|l| l.weighted_confidence * l.consensus_score)
            .sum::<f64>()
            / total_confidence
    } else {
        legs.iter().map(|l| l.consensus_score).sum::<f64>() / n
    };

    let mut weakest = LegScore {
        index: 0,
        score: legs[0].consensus_score,
    };
    let mut strongest = weakest;
    for (index, leg) in legs.iter().enumerate().skip(1) {
        if leg.consensus_score < weakest.score {
            weakest = LegScore {
                index,
                score: leg.consensus_score,
            };
        }
        if leg.consensus_score > strongest.score {
            strongest = LegScore {
                index,
                score: leg.consensus_score,
            };
        }
    }

    let fading_legs = legs
        .iter()
        .filter(|l| l.consensus_score < FADING_SCORE)
        .count();
    let risk = ParlayRisk::assess(fading_legs, weakest.score);
    let consensus = ConsensusBucket::from_score(overall_score);

    let recommendation = match risk {
        ParlayRisk::Extreme => format!(
            "Avoid: {fading_legs} leg(s) fading, weakest is leg {} at {:+.1}",
            weakest.index + 1,
            weakest.score
        ),
        ParlayRisk::High => format!(
            "High risk: leg {} ({:+.1}) works against the ticket, consider dropping it",
            weakest.index + 1,
            weakest.score
        ),
        ParlayRisk::Medium => format!(
            "Playable with caution: weakest leg {} has little support ({:+.1})",
            weakest.index + 1,
            weakest.score
        ),
        ParlayRisk::Low => format!("Every leg is supported, overall {overall_score:+.1}"),
    };

    ParlayEnsembleResult {
        leg_count: legs.len(),
        overall_score,
        consensus,
        average_confidence: total_confidence / n,
        weakest_leg: Some(weakest),
        strongest_leg: Some(strongest),
        fading_legs,
        risk,
        recommendation,
    }
}
