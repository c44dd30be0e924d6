//! Weighted consensus over engine signals for a single leg.
//!
//! Each signal's weight combines the engine's base importance with how much
//! its track record can be trusted:
//!
//! ```text
//! weight = base × accuracy_multiplier × sample_confidence × accuracy_factor
//! sample_confidence = min(1, (sample_size / threshold) × 0.5 + 0.5)
//! accuracy_factor   = 0.5 + clamp((historical_accuracy − 0.4) / 0.3, 0, 1)
//! ```
//!
//! Signals without both accuracy and sample data fall back to
//! `base × no_data_factor`. The consensus score is the weighted mean of
//! signed confidences, scaled to [-100, 100].

use parlay_risk_core::{EngineKind, EngineSignal, EngineWeights, Recommendation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Number of signals reported as top contributors.
const TOP_CONTRIBUTORS: usize = 3;

/// Consensus bucket derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusBucket {
    StrongPick,
    LeanPick,
    Neutral,
    LeanFade,
    StrongFade,
}

impl ConsensusBucket {
    /// Buckets a score: ≥40 strong pick, ≥15 lean pick, ≤-40 strong fade,
    /// ≤-15 lean fade, otherwise neutral.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 40.0 {
            Self::StrongPick
        } else if score >= 15.0 {
            Self::LeanPick
        } else if score <= -40.0 {
            Self::StrongFade
        } else if score <= -15.0 {
            Self::LeanFade
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongPick => "strong_pick",
            Self::LeanPick => "lean_pick",
            Self::Neutral => "neutral",
            Self::LeanFade => "lean_fade",
            Self::StrongFade => "strong_fade",
        }
    }

    /// Direction this bucket points in.
    #[must_use]
    pub const fn direction(self) -> Recommendation {
        match self {
            Self::StrongPick | Self::LeanPick => Recommendation::Pick,
            Self::Neutral => Recommendation::Neutral,
            Self::LeanFade | Self::StrongFade => Recommendation::Fade,
        }
    }
}

impl fmt::Display for ConsensusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Low when most signals agree on a clear score, high when neither holds.
    #[must_use]
    pub fn assess(agreement_percent: f64, score: f64) -> Self {
        let magnitude = score.abs();
        if agreement_percent >= 70.0 && magnitude >= 30.0 {
            Self::Low
        } else if agreement_percent >= 50.0 || magnitude >= 20.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// One signal's share of the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub engine: EngineKind,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub weight: f64,
    /// Signed confidence.
    pub score: f64,
    /// `weight × score`.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub consensus: ConsensusBucket,
    /// Weighted signed confidence in [-100, 100].
    pub consensus_score: f64,
    /// Weighted mean confidence in [0, 1].
    pub weighted_confidence: f64,
    /// Share of signals on the majority side, 0 to 100.
    pub agreement_percent: f64,
    pub risk_level: RiskLevel,
    pub signal_count: usize,
    pub top_contributors: Vec<EngineKind>,
    /// Engines whose direction opposes the consensus sign.
    pub conflicting_signals: Vec<EngineKind>,
    pub contributions: Vec<SignalContribution>,
    pub recommendation: String,
}

impl EnsembleResult {
    /// Neutral verdict for an empty signal list.
    #[must_use]
    pub fn insufficient_data() -> Self {
        Self {
            consensus: ConsensusBucket::Neutral,
            consensus_score: 0.0,
            weighted_confidence: 0.0,
            agreement_percent: 0.0,
            risk_level: RiskLevel::High,
            signal_count: 0,
            top_contributors: Vec::new(),
            conflicting_signals: Vec::new(),
            contributions: Vec::new(),
            recommendation: "Insufficient data: no signals to aggregate".to_string(),
        }
    }
}

/// Weight of one signal under `weights`.
#[must_use]
pub fn signal_weight(signal: &EngineSignal, weights: &EngineWeights) -> f64 {
    let engine = weights.weight_for(&signal.engine);

    match (signal.historical_accuracy, signal.sample_size) {
        (Some(accuracy), Some(sample_size)) => {
            let sample_confidence = if weights.sample_threshold > 0.0 {
                (f64::from(sample_size) / weights.sample_threshold * 0.5 + 0.5).min(1.0)
            } else {
                1.0
            };
            let accuracy_factor = 0.5 + ((accuracy - 0.4) / 0.3).clamp(0.0, 1.0);
            engine.base * engine.accuracy_multiplier * sample_confidence * accuracy_factor
        }
        _ => engine.base * weights.no_data_factor,
    }
}

/// Fuses signals about one leg into a consensus.
///
/// Never fails: an empty list returns [`EnsembleResult::insufficient_data`].
#[must_use]
pub fn run_ensemble(signals: &[EngineSignal], weights: &EngineWeights) -> EnsembleResult {
    if signals.is_empty() {
        debug!("Ensemble called with no signals");
        return EnsembleResult::insufficient_data();
    }

    let contributions: Vec<SignalContribution> = signals
        .iter()
        .map(|signal| {
            let weight = signal_weight(signal, weights).max(0.0);
            let score = signal.score();
            SignalContribution {
                engine: signal.engine.clone(),
                recommendation: signal.recommendation,
                confidence: signal.confidence,
                weight,
                score,
                contribution: weight * score,
            }
        })
        .collect();

    let total_weight: f64 = contributions.iter().map(|c| c.weight).sum();
    let (consensus_score, weighted_confidence) = if total_weight > f64::EPSILON {
        let score = contributions.iter().map(|c| c.contribution).sum::<f64>() / total_weight;
        let confidence =
            contributions.iter().map(|c| c.weight * c.confidence).sum::<f64>() / total_weight;
        ((score * 100.0).clamp(-100.0, 100.0), confidence)
    } else {
        (0.0, 0.0)
    };

    let picks = signals
        .iter()
        .filter(|s| s.recommendation == Recommendation::Pick)
        .count();
    let fades = signals
        .iter()
        .filter(|s| s.recommendation == Recommendation::Fade)
        .count();
    // Ties favor pick
    let majority = picks.max(fades);
    let agreement_percent = majority as f64 / signals.len() as f64 * 100.0;

    let consensus = ConsensusBucket::from_score(consensus_score);
    let risk_level = RiskLevel::assess(agreement_percent, consensus_score);

    let mut ranked: Vec<&SignalContribution> = contributions
        .iter()
        .filter(|c| c.contribution.abs() > f64::EPSILON)
        .collect();
    ranked.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
    let top_contributors = ranked
        .iter()
        .take(TOP_CONTRIBUTORS)
        .map(|c| c.engine.clone())
        .collect();

    let opposing = if consensus_score > 0.0 {
        Some(Recommendation::Fade)
    } else if consensus_score < 0.0 {
        Some(Recommendation::Pick)
    } else {
        None
    };
    let conflicting_signals = contributions
        .iter()
        .filter(|c| Some(c.recommendation) == opposing)
        .map(|c| c.engine.clone())
        .collect();

    let recommendation = describe(consensus, consensus_score, agreement_percent, risk_level);

    EnsembleResult {
        consensus,
        consensus_score,
        weighted_confidence,
        agreement_percent,
        risk_level,
        signal_count: signals.len(),
        top_contributors,
        conflicting_signals,
        contributions,
        recommendation,
    }
}

fn describe(bucket: ConsensusBucket, score: f64, agreement: f64, risk: RiskLevel) -> String {
    let headline = match bucket {
        ConsensusBucket::StrongPick => "Strong pick",
        ConsensusBucket::LeanPick => "Lean pick",
        ConsensusBucket::Neutral => "No clear edge",
        ConsensusBucket::LeanFade => "Lean fade",
        ConsensusBucket::StrongFade => "Strong fade",
    };
    let caution = match risk {
        RiskLevel::Low => "signals broadly agree",
        RiskLevel::Medium => "signals partly agree",
        RiskLevel::High => "signals disagree, size down or pass",
    };
    format!("{headline} (score {score:+.1}, {agreement:.0}% agreement): {caution}")
}
