//! Side-by-side simulation of several candidate parlays.

use parlay_risk_core::{ParlaySimulation, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::monte_carlo::{priced_parlay, MonteCarloConfig, MonteCarloResult, MonteCarloSimulator};

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub index: usize,
    pub label: String,
    pub legs: usize,
    pub win_rate: f64,
    pub expected_profit: Decimal,
    pub median_profit: Decimal,
    pub p5_profit: Decimal,
    pub p95_profit: Decimal,
    /// Upset boost in percentage points.
    pub upset_boost: f64,
}

/// The leg most likely to bust its parlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakLeg {
    pub parlay_index: usize,
    pub leg_index: usize,
    pub description: String,
    pub american_odds: i32,
    /// Fraction of trials the leg hit.
    pub hit_rate: f64,
    /// Fraction of the parlay's losing trials in which this leg missed.
    pub bust_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeResult {
    /// One result per input parlay, in input order.
    pub results: Vec<MonteCarloResult>,
    pub comparison_data: Vec<ComparisonRow>,
    pub best_by_win_rate: Option<usize>,
    pub best_by_expected_profit: Option<usize>,
    /// Weakest leg of each non-empty parlay, lowest hit rate first.
    pub weakest_legs: Vec<WeakLeg>,
}

impl ComparativeResult {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            comparison_data: Vec::new(),
            best_by_win_rate: None,
            best_by_expected_profit: None,
            weakest_legs: Vec::new(),
        }
    }
}

impl MonteCarloSimulator {
    /// Simulates every parlay with the configured trial count.
    ///
    /// # Errors
    /// Returns error if any parlay is invalid; nothing is simulated in that case.
    pub fn run_comparative(&self, parlays: &[ParlaySimulation]) -> Result<ComparativeResult> {
        let mut rng = self.config().rng();
        self.run_comparative_with_rng(parlays, &mut rng)
    }

    /// Parlays run in parallel, each on its own generator seeded from `rng`
    /// in input order, so a seeded caller gets the same output regardless of
    /// thread scheduling.
    ///
    /// # Errors
    /// Returns error if any parlay is invalid; nothing is simulated in that case.
    pub fn run_comparative_with_rng<R: Rng + ?Sized>(
        &self,
        parlays: &[ParlaySimulation],
        rng: &mut R,
    ) -> Result<ComparativeResult> {
        if parlays.is_empty() {
            debug!("No parlays to compare");
            return Ok(ComparativeResult::empty());
        }
        let priced = parlays
            .iter()
            .map(priced_parlay)
            .collect::<Result<Vec<_>>>()?;
        let parlays = priced.as_slice();

        let seeds: Vec<u64> = parlays.iter().map(|_| rng.gen()).collect();
        let results: Vec<MonteCarloResult> = parlays
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(parlay, &seed)| {
                let mut parlay_rng = ChaCha8Rng::seed_from_u64(seed);
                self.simulate_trials(parlay, None, &mut parlay_rng)
            })
            .collect();

        let comparison_data: Vec<ComparisonRow> = parlays
            .iter()
            .zip(&results)
            .enumerate()
            .map(|(index, (parlay, result))| ComparisonRow {
                index,
                label: parlay.display_label(),
                legs: parlay.legs.len(),
                win_rate: result.win_rate,
                expected_profit: result.expected_profit,
                median_profit: result.profit_percentiles.p50,
                p5_profit: result.profit_percentiles.p5,
                p95_profit: result.profit_percentiles.p95,
                upset_boost: result.upset_stats.upset_boost,
            })
            .collect();

        let best_by_win_rate = best_index(&results, |r| r.win_rate);
        let best_by_expected_profit = best_index(&results, |r| r.expected_profit);
        let weakest_legs = weakest_legs(parlays, &results);

        debug!(
            parlays = parlays.len(),
            ?best_by_win_rate,
            ?best_by_expected_profit,
            "Comparative simulation complete"
        );

        Ok(ComparativeResult {
            results,
            comparison_data,
            best_by_win_rate,
            best_by_expected_profit,
            weakest_legs,
        })
    }
}

/// Index of the highest key among non-empty results; ties keep the earliest.
fn best_index<K: PartialOrd>(
    results: &[MonteCarloResult],
    key: impl Fn(&MonteCarloResult) -> K,
) -> Option<usize> {
    let mut best: Option<(usize, K)> = None;
    for (i, result) in results.iter().enumerate().filter(|(_, r)| !r.is_empty()) {
        let value = key(result);
        let replace = match &best {
            Some((_, current)) => value > *current,
            None => true,
        };
        if replace {
            best = Some((i, value));
        }
    }
    best.map(|(i, _)| i)
}

fn weakest_legs(parlays: &[ParlaySimulation], results: &[MonteCarloResult]) -> Vec<WeakLeg> {
    let mut weakest: Vec<WeakLeg> = parlays
        .iter()
        .zip(results)
        .enumerate()
        .filter_map(|(parlay_index, (parlay, result))| {
            let (leg_index, &hit_rate) = result
                .leg_hit_rates
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))?;
            let leg = &parlay.legs[leg_index];
            // Every miss is a losing trial, so misses / losses is the bust share
            let misses = (1.0 - hit_rate) * result.iterations as f64;
            let bust_share = if result.losses > 0 {
                (misses / result.losses as f64).min(1.0)
            } else {
                0.0
            };
            Some(WeakLeg {
                parlay_index,
                leg_index,
                description: leg.description.clone(),
                american_odds: leg.american_odds,
                hit_rate,
                bust_share,
            })
        })
        .collect();

    weakest.sort_by(|a, b| a.hit_rate.total_cmp(&b.hit_rate));
    weakest
}

/// Comparative simulation seeded from entropy, using the shipped upset preset.
///
/// # Errors
/// Returns error if any parlay is invalid.
pub fn run_comparative_simulation(
    parlays: &[ParlaySimulation],
    iterations: usize,
) -> Result<ComparativeResult> {
    MonteCarloSimulator::new(MonteCarloConfig::new(iterations)).run_comparative(parlays)
}
