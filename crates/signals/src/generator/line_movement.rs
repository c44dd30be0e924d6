//! Line movement signal.
//!
//! A price that shortens between open and now means money came in on the
//! leg; a price that drifts means money went the other way.

use parlay_risk_core::{
    american_to_implied, EngineKind, EngineSignal, Recommendation, Result, RiskError,
};
use serde::{Deserialize, Serialize};

use super::SignalGenerator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMovementConfig {
    /// Minimum implied-probability move to take a side (0.02 = 2 points).
    pub min_move: f64,
    /// Confidence at exactly `min_move`.
    pub base_confidence: f64,
    /// Extra confidence per point of implied probability beyond `min_move`.
    pub confidence_per_point: f64,
    pub max_confidence: f64,
}

impl Default for LineMovementConfig {
    fn default() -> Self {
        Self {
            min_move: 0.02,
            base_confidence: 0.5,
            confidence_per_point: 0.05,
            max_confidence: 0.95,
        }
    }
}

/// Opening and current American prices for a leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMovementRecord {
    pub opening_odds: i32,
    pub current_odds: i32,
    #[serde(default)]
    pub config: LineMovementConfig,
}

impl LineMovementRecord {
    #[must_use]
    pub fn new(opening_odds: i32, current_odds: i32) -> Self {
        Self {
            opening_odds,
            current_odds,
            config: LineMovementConfig::default(),
        }
    }

    /// Change in implied probability from open to now. Positive means the
    /// leg got shorter.
    #[must_use]
    pub fn implied_move(&self) -> f64 {
        american_to_implied(self.current_odds) - american_to_implied(self.opening_odds)
    }
}

impl SignalGenerator for LineMovementRecord {
    fn engine(&self) -> EngineKind {
        EngineKind::LineMovement
    }

    fn generate(&self) -> Result<EngineSignal> {
        for odds in [self.opening_odds, self.current_odds] {
            if odds > -100 && odds < 100 {
                return Err(RiskError::InvalidOdds(odds));
            }
        }

        let delta = self.implied_move();
        let magnitude = delta.abs();
        let cfg = &self.config;

        if magnitude < cfg.min_move {
            return Ok(EngineSignal::neutral(self.engine()).with_reasoning(format!(
                "Line steady: {:+} to {:+} ({:+.1} pts)",
                self.opening_odds,
                self.current_odds,
                delta * 100.0
            )));
        }

        let recommendation = if delta > 0.0 {
            Recommendation::Pick
        } else {
            Recommendation::Fade
        };
        let excess_points = (magnitude - cfg.min_move) * 100.0;
        let confidence = (cfg.base_confidence + excess_points * cfg.confidence_per_point)
            .min(cfg.max_confidence)
            .clamp(0.0, 1.0);
        let verb = if delta > 0.0 { "shortened" } else { "drifted" };

        Ok(EngineSignal::new(self.engine(), recommendation, confidence)?.with_reasoning(format!(
            "Line {verb} from {:+} to {:+} ({:+.1} pts implied)",
            self.opening_odds,
            self.current_odds,
            delta * 100.0
        )))
    }
}

/// Line movement signal with the default thresholds.
///
/// # Errors
/// Returns error if either price is between -100 and +100.
pub fn line_movement_signal(opening_odds: i32, current_odds: i32) -> Result<EngineSignal> {
    LineMovementRecord::new(opening_odds, current_odds).generate()
}
