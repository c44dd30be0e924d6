//! Monte Carlo simulation of parlay outcomes.
//!
//! Each trial draws one threshold per leg and marks the leg hit when the
//! draw is at or below the leg's adjusted probability. The parlay wins the
//! trial only if every leg hits. Draws are independent, or correlated
//! through a [`CholeskyFactor`] when a correlation matrix is supplied.
//!
//! # Example
//!
//! ```
//! use parlay_risk_core::{Leg, ParlaySimulation, UpsetFactors};
//! use parlay_risk_simulation::monte_carlo::{MonteCarloConfig, MonteCarloSimulator};
//! use rust_decimal_macros::dec;
//!
//! let legs = vec![Leg::new("A", 150).unwrap(), Leg::new("B", -110).unwrap()];
//! let parlay = ParlaySimulation::new(legs, dec!(10)).unwrap();
//!
//! let config = MonteCarloConfig::new(10_000)
//!     .with_upset_factors(UpsetFactors::disabled())
//!     .with_seed(42);
//! let result = MonteCarloSimulator::new(config).run(&parlay).unwrap();
//! assert_eq!(result.wins + result.losses, 10_000);
//! ```

use parlay_risk_core::{
    mean_std, percentile_linear, wilson_ci, CorrelationConfig, ParlaySimulation, Result,
    RiskConfig, RiskError, UpsetFactors,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlation::{
    build_correlation_matrix, cholesky_decomposition, CholeskyFactor, CorrelationMatrix,
};
use crate::upset::LegAdjuster;

/// Default trial count.
pub const DEFAULT_ITERATIONS: usize = 100_000;

/// Z-score for the 95% Wilson interval on the win rate.
const WIN_RATE_Z: f64 = 1.96;

/// Configuration for parlay Monte Carlo runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Trials per run.
    pub iterations: usize,
    pub upset_factors: UpsetFactors,
    /// Used when the caller does not supply a correlation matrix.
    pub correlation: CorrelationConfig,
    /// Optional seed for reproducible results.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            upset_factors: UpsetFactors::default(),
            correlation: CorrelationConfig::default(),
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    #[must_use]
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }

    /// Builds a configuration from the loaded settings.
    #[must_use]
    pub fn from_risk_config(config: &RiskConfig) -> Self {
        Self {
            iterations: config.monte_carlo.iterations,
            upset_factors: config.upset.clone(),
            correlation: config.correlation.clone(),
            seed: config.monte_carlo.seed,
        }
    }

    #[must_use]
    pub fn with_upset_factors(mut self, factors: UpsetFactors) -> Self {
        self.upset_factors = factors;
        self
    }

    #[must_use]
    pub fn with_correlation(mut self, correlation: CorrelationConfig) -> Self {
        self.correlation = correlation;
        self
    }

    /// Sets a seed for reproducible simulations.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub(crate) fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Which side of the parlay a histogram bucket counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketOutcome {
    Loss,
    Win,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub outcome: BucketOutcome,
    pub label: String,
    /// Payout or profit recorded for every trial in this bucket.
    pub value: Decimal,
    pub count: usize,
    /// Share of trials, 0 to 100.
    pub percentage: f64,
}

/// Profit at the 5/25/50/75/95 marks of the sorted trial outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitPercentiles {
    pub p5: Decimal,
    pub p25: Decimal,
    pub p50: Decimal,
    pub p75: Decimal,
    pub p95: Decimal,
}

impl ProfitPercentiles {
    fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p5: to_money(percentile_linear(sorted, 0.05)),
            p25: to_money(percentile_linear(sorted, 0.25)),
            p50: to_money(percentile_linear(sorted, 0.50)),
            p75: to_money(percentile_linear(sorted, 0.75)),
            p95: to_money(percentile_linear(sorted, 0.95)),
        }
    }
}

/// How much of the win rate came from upset adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsetStats {
    pub chaos_days: usize,
    /// Wins that happened on a chaos day.
    pub chaos_wins: usize,
    /// Wins where at least one leg would have missed at its implied probability.
    pub upset_wins: usize,
    /// Trials where every leg would have hit at its implied probability.
    pub pure_odds_wins: usize,
    pub pure_odds_win_rate: f64,
    /// `win_rate − pure_odds_win_rate`, in percentage points.
    pub upset_boost: f64,
}

/// Output of one parlay simulation. Every statistic comes from the same trial set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub iterations: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Wilson 95% interval on `win_rate`.
    pub win_rate_ci: (f64, f64),
    /// Product of odds-implied probabilities.
    pub theoretical_win_rate: f64,
    /// Product of adjusted probabilities on a normal (non-chaos) trial.
    pub adjusted_win_rate: f64,
    pub stake: Decimal,
    pub potential_payout: Decimal,
    /// Mean trial profit.
    pub expected_profit: Decimal,
    /// Expected profit as a percentage of the stake.
    pub expected_roi: f64,
    pub profit_percentiles: ProfitPercentiles,
    pub payout_histogram: Vec<HistogramBucket>,
    pub profit_histogram: Vec<HistogramBucket>,
    /// Fraction of trials in which each leg hit, in leg order.
    pub leg_hit_rates: Vec<f64>,
    pub upset_stats: UpsetStats,
}

impl MonteCarloResult {
    /// Neutral result for an empty parlay or zero iterations. The simulator
    /// fills in the ticket's stake and payout on that path.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            iterations: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            win_rate_ci: (0.0, 0.0),
            theoretical_win_rate: 0.0,
            adjusted_win_rate: 0.0,
            stake: Decimal::ZERO,
            potential_payout: Decimal::ZERO,
            expected_profit: Decimal::ZERO,
            expected_roi: 0.0,
            profit_percentiles: ProfitPercentiles::default(),
            payout_histogram: Vec::new(),
            profit_histogram: Vec::new(),
            leg_hit_rates: Vec::new(),
            upset_stats: UpsetStats::default(),
        }
    }

    /// True when no trials were run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations == 0
    }
}

/// Correlated run alongside an equally sized independent run on the same parlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedMonteCarloResult {
    #[serde(flatten)]
    pub result: MonteCarloResult,
    pub independent_win_rate: f64,
    /// `correlated − independent` win rate.
    pub correlation_impact: f64,
    /// Impact relative to the independent win rate, in percent.
    pub correlation_impact_percent: f64,
    pub correlation_matrix: CorrelationMatrix,
    /// Diagonal shrinkage applied before decomposition.
    pub ridge_applied: f64,
    /// True when the matrix could not be decomposed and legs ran independently.
    pub used_independent_fallback: bool,
}

/// Parlay Monte Carlo simulator.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    #[must_use]
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(MonteCarloConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Runs independent-leg trials with a generator seeded from the config.
    ///
    /// # Errors
    /// Returns error if the parlay carries an invalid price, probability or stake.
    pub fn run(&self, parlay: &ParlaySimulation) -> Result<MonteCarloResult> {
        let mut rng = self.config.rng();
        self.run_with_rng(parlay, &mut rng)
    }

    /// Runs independent-leg trials drawing from `rng`.
    ///
    /// # Errors
    /// Returns error if the parlay carries an invalid price, probability or stake.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        parlay: &ParlaySimulation,
        rng: &mut R,
    ) -> Result<MonteCarloResult> {
        let parlay = priced_parlay(parlay)?;
        Ok(self.simulate_trials(&parlay, None, rng))
    }

    /// Runs correlated trials and an independent baseline of equal size.
    ///
    /// When `matrix` is `None` one is built from the legs' metadata.
    ///
    /// # Errors
    /// Returns error if the parlay is invalid or the matrix size does not
    /// match the leg count.
    pub fn run_correlated(
        &self,
        parlay: &ParlaySimulation,
        matrix: Option<&CorrelationMatrix>,
    ) -> Result<CorrelatedMonteCarloResult> {
        let mut rng = self.config.rng();
        self.run_correlated_with_rng(parlay, matrix, &mut rng)
    }

    /// Correlated run drawing from `rng`. The correlated trials consume the
    /// stream first, then the independent baseline.
    ///
    /// # Errors
    /// Returns error if the parlay is invalid or the matrix size does not
    /// match the leg count.
    pub fn run_correlated_with_rng<R: Rng + ?Sized>(
        &self,
        parlay: &ParlaySimulation,
        matrix: Option<&CorrelationMatrix>,
        rng: &mut R,
    ) -> Result<CorrelatedMonteCarloResult> {
        let parlay = &priced_parlay(parlay)?;

        let matrix = match matrix {
            Some(m) if m.size() != parlay.legs.len() => {
                return Err(RiskError::InvalidParameter {
                    name: "correlation_matrix",
                    reason: format!(
                        "matrix is {}x{} but parlay has {} legs",
                        m.size(),
                        m.size(),
                        parlay.legs.len()
                    ),
                });
            }
            Some(m) => m.clone(),
            None => build_correlation_matrix(&parlay.legs, &self.config.correlation),
        };

        let factor = cholesky_decomposition(&matrix, &self.config.correlation);
        let correlated = self.simulate_trials(parlay, Some(&factor), rng);
        let independent = self.simulate_trials(parlay, None, rng);

        let correlation_impact = correlated.win_rate - independent.win_rate;
        let correlation_impact_percent = if independent.win_rate > 0.0 {
            correlation_impact / independent.win_rate * 100.0
        } else {
            0.0
        };

        debug!(
            correlated = correlated.win_rate,
            independent = independent.win_rate,
            ridge = factor.ridge,
            fallback = factor.is_fallback,
            "Correlated simulation complete"
        );

        Ok(CorrelatedMonteCarloResult {
            independent_win_rate: independent.win_rate,
            result: correlated,
            correlation_impact,
            correlation_impact_percent,
            correlation_matrix: matrix,
            ridge_applied: factor.ridge,
            used_independent_fallback: factor.is_fallback,
        })
    }

    /// Runs trials on a parlay already passed through [`priced_parlay`].
    pub(crate) fn simulate_trials<R: Rng + ?Sized>(
        &self,
        parlay: &ParlaySimulation,
        factor: Option<&CholeskyFactor>,
        rng: &mut R,
    ) -> MonteCarloResult {
        let iterations = self.config.iterations;
        if iterations == 0 || parlay.legs.is_empty() {
            debug!(
                iterations,
                legs = parlay.legs.len(),
                "Degenerate simulation input, returning empty result"
            );
            return MonteCarloResult {
                stake: parlay.stake,
                potential_payout: parlay.potential_payout,
                ..MonteCarloResult::empty()
            };
        }

        let factors = &self.config.upset_factors;
        let adjuster = LegAdjuster::new(&parlay.legs, factors);
        let legs = adjuster.legs();
        let leg_count = legs.len();

        let stake = parlay.stake.to_f64().unwrap_or(0.0);
        let win_profit = parlay.profit_if_won().to_f64().unwrap_or(0.0);
        let chaos_probability = factors.chaos_day_probability;

        debug!(
            iterations,
            legs = leg_count,
            correlated = factor.is_some(),
            "Starting parlay simulation"
        );

        let mut draws = vec![0.0; leg_count];
        let mut normals = vec![0.0; leg_count];
        let mut leg_hits = vec![0usize; leg_count];
        let mut outcomes = Vec::with_capacity(iterations);
        let mut wins = 0usize;
        let mut stats = UpsetStats::default();

        for _ in 0..iterations {
            let chaos_day = chaos_probability > 0.0 && rng.gen::<f64>() < chaos_probability;

            match factor {
                Some(f) => f.fill_uniforms(rng, &mut normals, &mut draws),
                None => draws.iter_mut().for_each(|d| *d = rng.gen()),
            }

            let mut all_hit = true;
            let mut all_hit_at_implied = true;
            for ((leg, &draw), hits) in legs.iter().zip(&draws).zip(leg_hits.iter_mut()) {
                if draw <= leg.threshold(chaos_day) {
                    *hits += 1;
                } else {
                    all_hit = false;
                }
                if draw > leg.implied {
                    all_hit_at_implied = false;
                }
            }

            if chaos_day {
                stats.chaos_days += 1;
            }
            if all_hit_at_implied {
                stats.pure_odds_wins += 1;
            }
            if all_hit {
                wins += 1;
                outcomes.push(win_profit);
                if chaos_day {
                    stats.chaos_wins += 1;
                }
                if !all_hit_at_implied {
                    stats.upset_wins += 1;
                }
            } else {
                outcomes.push(-stake);
            }
        }

        outcomes.sort_by(f64::total_cmp);
        let (mean_profit, _) = mean_std(&outcomes);

        let n = iterations as f64;
        let losses = iterations - wins;
        let win_rate = wins as f64 / n;
        stats.pure_odds_win_rate = stats.pure_odds_wins as f64 / n;
        stats.upset_boost = (win_rate - stats.pure_odds_win_rate) * 100.0;

        let expected_roi = if stake > 0.0 {
            mean_profit / stake * 100.0
        } else {
            0.0
        };

        let result = MonteCarloResult {
            iterations,
            wins,
            losses,
            win_rate,
            win_rate_ci: wilson_ci(wins, iterations, WIN_RATE_Z),
            theoretical_win_rate: adjuster.theoretical_win_rate(),
            adjusted_win_rate: adjuster.adjusted_win_rate(),
            stake: parlay.stake,
            potential_payout: parlay.potential_payout,
            expected_profit: to_money(mean_profit),
            expected_roi,
            profit_percentiles: ProfitPercentiles::from_sorted(&outcomes),
            payout_histogram: histogram(
                wins,
                losses,
                Decimal::ZERO,
                parlay.potential_payout,
                "Payout",
            ),
            profit_histogram: histogram(
                wins,
                losses,
                -parlay.stake,
                parlay.profit_if_won(),
                "Profit",
            ),
            leg_hit_rates: leg_hits.iter().map(|&h| h as f64 / n).collect(),
            upset_stats: stats,
        };

        debug!(
            iterations,
            win_rate = result.win_rate,
            expected_profit = %result.expected_profit,
            "Parlay simulation complete"
        );

        result
    }
}

fn histogram(
    wins: usize,
    losses: usize,
    loss_value: Decimal,
    win_value: Decimal,
    kind: &str,
) -> Vec<HistogramBucket> {
    let total = (wins + losses).max(1) as f64;
    vec![
        HistogramBucket {
            outcome: BucketOutcome::Loss,
            label: format!("Loss ({kind} {loss_value})"),
            value: loss_value,
            count: losses,
            percentage: losses as f64 / total * 100.0,
        },
        HistogramBucket {
            outcome: BucketOutcome::Win,
            label: format!("Win ({kind} {win_value})"),
            value: win_value,
            count: wins,
            percentage: wins as f64 / total * 100.0,
        },
    ]
}

/// Rebuilds a parlay from its prices and stake.
///
/// Stored implied probabilities and the payout are public and may have been
/// edited or deserialized, so trials always use values derived from the
/// American odds.
pub(crate) fn priced_parlay(parlay: &ParlaySimulation) -> Result<ParlaySimulation> {
    parlay.clone().normalized()
}

pub(crate) fn to_money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(2)
}

/// Independent-leg simulation seeded from entropy.
///
/// `upset_factors` of `None` uses the shipped preset; pass
/// [`UpsetFactors::disabled`] for pure odds-implied trials.
///
/// # Errors
/// Returns error if the parlay carries an invalid price, probability or stake.
pub fn run_monte_carlo_simulation(
    parlay: &ParlaySimulation,
    iterations: usize,
    upset_factors: Option<&UpsetFactors>,
) -> Result<MonteCarloResult> {
    let config = MonteCarloConfig::new(iterations)
        .with_upset_factors(upset_factors.cloned().unwrap_or_default());
    MonteCarloSimulator::new(config).run(parlay)
}

/// Correlated simulation seeded from entropy.
///
/// # Errors
/// Returns error if the parlay is invalid or the matrix size does not match
/// the leg count.
pub fn run_correlated_monte_carlo_simulation(
    parlay: &ParlaySimulation,
    iterations: usize,
    upset_factors: Option<&UpsetFactors>,
    matrix: Option<&CorrelationMatrix>,
) -> Result<CorrelatedMonteCarloResult> {
    let config = MonteCarloConfig::new(iterations)
        .with_upset_factors(upset_factors.cloned().unwrap_or_default());
    MonteCarloSimulator::new(config).run_correlated(parlay, matrix)
}
