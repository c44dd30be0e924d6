//! Upset-factor probability adjustment.

use parlay_risk_core::{american_to_implied, clamp_probability, Leg, UpsetFactors};
use serde::{Deserialize, Serialize};

/// Per-leg probabilities used by the trial loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedLeg {
    /// Odds-implied probability, clamped to the simulation bounds.
    pub implied: f64,
    /// Adjusted probability on a normal trial.
    pub adjusted: f64,
    /// Adjusted probability on a chaos day.
    pub chaos_adjusted: f64,
}

impl AdjustedLeg {
    #[must_use]
    pub fn threshold(&self, chaos_day: bool) -> f64 {
        if chaos_day {
            self.chaos_adjusted
        } else {
            self.adjusted
        }
    }
}

/// Adjusts each leg's odds-implied probability by its odds band.
///
/// Adjustments are computed once per simulation, not per trial.
#[derive(Debug, Clone)]
pub struct LegAdjuster {
    legs: Vec<AdjustedLeg>,
}

impl LegAdjuster {
    #[must_use]
    pub fn new(legs: &[Leg], factors: &UpsetFactors) -> Self {
        let legs = legs.iter().map(|leg| adjust_leg(leg, factors)).collect();
        Self { legs }
    }

    #[must_use]
    pub fn legs(&self) -> &[AdjustedLeg] {
        &self.legs
    }

    /// Product of implied probabilities: the naive independent win rate.
    #[must_use]
    pub fn theoretical_win_rate(&self) -> f64 {
        self.legs.iter().map(|l| l.implied).product()
    }

    /// Product of normal-trial adjusted probabilities.
    #[must_use]
    pub fn adjusted_win_rate(&self) -> f64 {
        self.legs.iter().map(|l| l.adjusted).product()
    }
}

fn adjust_leg(leg: &Leg, factors: &UpsetFactors) -> AdjustedLeg {
    let base = american_to_implied(leg.american_odds);
    let implied = clamp_probability(base);
    let boosted = base + factors.adjustment_for(leg.american_odds);
    let chaos_boosted = if leg.american_odds > 0 {
        boosted * factors.chaos_multiplier
    } else {
        boosted
    };

    AdjustedLeg {
        implied,
        adjusted: clamp_probability(boosted),
        chaos_adjusted: clamp_probability(chaos_boosted),
    }
}
