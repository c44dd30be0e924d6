use serde::{Deserialize, Serialize};

use crate::signal::EngineKind;

/// Root configuration. Every section falls back to the shipped preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub monte_carlo: MonteCarloSettings,
    pub upset: UpsetFactors,
    pub correlation: CorrelationConfig,
    pub ensemble: EngineWeights,
    pub bankroll: BankrollSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSettings {
    pub iterations: usize,
    pub seed: Option<u64>,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            iterations: 100_000,
            seed: None,
        }
    }
}

/// Probability adjustments applied to each leg before a trial draw.
///
/// Boosts are additive on the implied probability. The chaos multiplier
/// applies on top of the boost for every plus-money leg on a chaos day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsetFactors {
    /// Odds >= +500
    pub heavy_underdog_boost: f64,
    /// Odds +200 to +499
    pub moderate_underdog_boost: f64,
    /// Odds +100 to +199
    pub slight_underdog_boost: f64,
    /// Odds <= -300 (applied as a negative adjustment)
    pub heavy_favorite_penalty: f64,
    /// Odds -299 to -200 (applied as a negative adjustment)
    pub moderate_favorite_penalty: f64,
    pub chaos_day_probability: f64,
    pub chaos_multiplier: f64,
}

impl Default for UpsetFactors {
    fn default() -> Self {
        Self {
            heavy_underdog_boost: 0.03,
            moderate_underdog_boost: 0.02,
            slight_underdog_boost: 0.01,
            heavy_favorite_penalty: 0.03,
            moderate_favorite_penalty: 0.015,
            chaos_day_probability: 0.05,
            chaos_multiplier: 1.25,
        }
    }
}

impl UpsetFactors {
    /// No adjustments and no chaos days: trials use pure implied probability
    /// (still clamped to the simulation bounds).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            heavy_underdog_boost: 0.0,
            moderate_underdog_boost: 0.0,
            slight_underdog_boost: 0.0,
            heavy_favorite_penalty: 0.0,
            moderate_favorite_penalty: 0.0,
            chaos_day_probability: 0.0,
            chaos_multiplier: 1.0,
        }
    }

    /// Additive adjustment for a price, before any chaos multiplier.
    #[must_use]
    pub fn adjustment_for(&self, american_odds: i32) -> f64 {
        match american_odds {
            o if o >= 500 => self.heavy_underdog_boost,
            o if o >= 200 => self.moderate_underdog_boost,
            o if o >= 100 => self.slight_underdog_boost,
            o if o <= -300 => -self.heavy_favorite_penalty,
            o if o <= -200 => -self.moderate_favorite_penalty,
            _ => 0.0,
        }
    }
}

/// Heuristic pairwise coefficients for the correlation engine.
///
/// These are calibration inputs, not derived values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub same_player: f64,
    pub game_outcome: f64,
    pub linked_stats: f64,
    pub same_game: f64,
    pub unrelated: f64,
    /// A matrix "has high correlation" when any |off-diagonal| exceeds this.
    pub high_correlation_threshold: f64,
    /// Diagonal shrinkage added per failed decomposition attempt.
    pub ridge_step: f64,
    pub max_ridge_attempts: u32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            same_player: 0.50,
            game_outcome: 0.80,
            linked_stats: 0.35,
            same_game: 0.15,
            unrelated: 0.0,
            high_correlation_threshold: 0.30,
            ridge_step: 0.05,
            max_ridge_attempts: 10,
        }
    }
}

/// Base importance and accuracy multiplier for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineWeight {
    pub base: f64,
    pub accuracy_multiplier: f64,
}

impl EngineWeight {
    #[must_use]
    pub const fn new(base: f64, accuracy_multiplier: f64) -> Self {
        Self {
            base,
            accuracy_multiplier,
        }
    }
}

/// Weight table for the signal ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineWeights {
    pub line_movement: EngineWeight,
    pub sharp_money: EngineWeight,
    pub hit_rate: EngineWeight,
    pub matchup: EngineWeight,
    pub trend: EngineWeight,
    pub injury: EngineWeight,
    pub public_fade: EngineWeight,
    pub weather: EngineWeight,
    pub model: EngineWeight,
    /// Used for any engine name not in the table.
    pub unknown: EngineWeight,
    /// Sample size at which sample confidence reaches 1.0.
    pub sample_threshold: f64,
    /// Multiplier on the base weight when accuracy or sample data is missing.
    pub no_data_factor: f64,
}

impl Default for EngineWeights {
    fn default() -> Self {
        Self {
            line_movement: EngineWeight::new(1.2, 1.1),
            sharp_money: EngineWeight::new(1.3, 1.2),
            hit_rate: EngineWeight::new(1.0, 1.0),
            matchup: EngineWeight::new(0.9, 1.0),
            trend: EngineWeight::new(0.8, 0.9),
            injury: EngineWeight::new(1.1, 1.0),
            public_fade: EngineWeight::new(0.7, 0.9),
            weather: EngineWeight::new(0.6, 0.8),
            model: EngineWeight::new(1.2, 1.1),
            unknown: EngineWeight::new(0.5, 1.0),
            sample_threshold: 100.0,
            no_data_factor: 0.7,
        }
    }
}

impl EngineWeights {
    /// Every engine weighted equally at 1.0, useful for isolating the
    /// accuracy and sample terms.
    #[must_use]
    pub fn uniform() -> Self {
        let one = EngineWeight::new(1.0, 1.0);
        Self {
            line_movement: one,
            sharp_money: one,
            hit_rate: one,
            matchup: one,
            trend: one,
            injury: one,
            public_fade: one,
            weather: one,
            model: one,
            unknown: one,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn weight_for(&self, engine: &EngineKind) -> EngineWeight {
        match engine {
            EngineKind::LineMovement => self.line_movement,
            EngineKind::SharpMoney => self.sharp_money,
            EngineKind::HitRate => self.hit_rate,
            EngineKind::Matchup => self.matchup,
            EngineKind::Trend => self.trend,
            EngineKind::Injury => self.injury,
            EngineKind::PublicFade => self.public_fade,
            EngineKind::Weather => self.weather,
            EngineKind::Model => self.model,
            EngineKind::Unknown(_) => self.unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankrollSettings {
    pub iterations: usize,
    /// Fraction of the starting bankroll at or below which a path is ruined.
    pub ruin_threshold: f64,
    pub seed: Option<u64>,
}

impl Default for BankrollSettings {
    fn default() -> Self {
        Self {
            iterations: 1_000,
            ruin_threshold: 0.10,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upset_adjustment_by_odds_band() {
        let factors = UpsetFactors::default();

        assert!((factors.adjustment_for(650) - 0.03).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(500) - 0.03).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(499) - 0.02).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(200) - 0.02).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(150) - 0.01).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(100) - 0.01).abs() < f64::EPSILON);
        assert!(factors.adjustment_for(-110).abs() < f64::EPSILON);
        assert!(factors.adjustment_for(-199).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(-200) + 0.015).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(-299) + 0.015).abs() < f64::EPSILON);
        assert!((factors.adjustment_for(-300) + 0.03).abs() < f64::EPSILON);
    }

    #[test]
    fn disabled_upsets_are_zero() {
        let factors = UpsetFactors::disabled();
        for odds in [-500, -250, -110, 100, 250, 900] {
            assert!(factors.adjustment_for(odds).abs() < f64::EPSILON);
        }
        assert!(factors.chaos_day_probability.abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_engine_gets_fallback_weight() {
        let weights = EngineWeights::default();
        let w = weights.weight_for(&EngineKind::Unknown("astrology".into()));
        assert!((w.base - 0.5).abs() < f64::EPSILON);
        assert!((weights.weight_for(&EngineKind::SharpMoney).base - 1.3).abs() < f64::EPSILON);
    }

    #[test]
    fn config_defaults() {
        let config = RiskConfig::default();
        assert_eq!(config.monte_carlo.iterations, 100_000);
        assert_eq!(config.bankroll.iterations, 1_000);
        assert!((config.correlation.high_correlation_threshold - 0.3).abs() < f64::EPSILON);
    }
}
