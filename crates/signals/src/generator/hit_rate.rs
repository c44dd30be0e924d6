//! Historical hit rate signal.

use parlay_risk_core::{EngineKind, EngineSignal, Recommendation, Result, RiskError};
use serde::{Deserialize, Serialize};

use super::SignalGenerator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRateConfig {
    /// Minimum gap between observed and implied rate (0.05 = 5 points).
    pub min_edge: f64,
    /// Gap at which the margin term saturates.
    pub full_edge: f64,
    /// Attempts at which the sample term reaches one half.
    pub half_sample: f64,
    pub max_confidence: f64,
}

impl Default for HitRateConfig {
    fn default() -> Self {
        Self {
            min_edge: 0.05,
            full_edge: 0.25,
            half_sample: 20.0,
            max_confidence: 0.95,
        }
    }
}

/// How often a proposition has hit against how often its price says it should.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRateRecord {
    pub hits: u32,
    pub attempts: u32,
    pub implied_probability: f64,
    #[serde(default)]
    pub config: HitRateConfig,
}

impl HitRateRecord {
    #[must_use]
    pub fn new(hits: u32, attempts: u32, implied_probability: f64) -> Self {
        Self {
            hits,
            attempts,
            implied_probability,
            config: HitRateConfig::default(),
        }
    }
}

impl SignalGenerator for HitRateRecord {
    fn engine(&self) -> EngineKind {
        EngineKind::HitRate
    }

    fn generate(&self) -> Result<EngineSignal> {
        if !(0.0..=1.0).contains(&self.implied_probability) {
            return Err(RiskError::InvalidProbability {
                name: "implied_probability",
                value: self.implied_probability,
            });
        }
        if self.hits > self.attempts {
            return Err(RiskError::InvalidParameter {
                name: "hits",
                reason: format!("{} hits out of {} attempts", self.hits, self.attempts),
            });
        }

        let mut neutral = EngineSignal::neutral(self.engine());
        if self.attempts == 0 {
            return Ok(neutral.with_reasoning("No history"));
        }

        let attempts = f64::from(self.attempts);
        let observed = f64::from(self.hits) / attempts;
        let edge = observed - self.implied_probability;
        let cfg = &self.config;

        let summary = format!(
            "Hit {}/{} ({:.1}%) vs {:.1}% implied",
            self.hits,
            self.attempts,
            observed * 100.0,
            self.implied_probability * 100.0
        );

        if edge.abs() < cfg.min_edge {
            neutral.sample_size = Some(self.attempts);
            return Ok(neutral.with_reasoning(summary));
        }

        let margin = (edge.abs() / cfg.full_edge).min(1.0);
        let sample = attempts / (attempts + cfg.half_sample);
        let confidence = (0.4 + 0.55 * margin * sample).min(cfg.max_confidence);
        let recommendation = if edge > 0.0 {
            Recommendation::Pick
        } else {
            Recommendation::Fade
        };

        let mut signal = EngineSignal::new(self.engine(), recommendation, confidence)?;
        signal.sample_size = Some(self.attempts);
        Ok(signal.with_reasoning(summary))
    }
}

/// Hit rate signal with the default thresholds.
///
/// # Errors
/// Returns error if `implied` is outside [0, 1] or `hits > attempts`.
pub fn hit_rate_signal(hits: u32, attempts: u32, implied: f64) -> Result<EngineSignal> {
    HitRateRecord::new(hits, attempts, implied).generate()
}
