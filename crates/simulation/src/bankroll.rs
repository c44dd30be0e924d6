//! Bankroll growth projection under repeated fractional-Kelly betting.
//!
//! Every path starts from the same bankroll and places `days × bets_per_day`
//! sequential bets, each staking `bankroll × f* × kelly_multiplier`. A path
//! that falls to the ruin threshold stops betting and stays frozen there.

use parlay_risk_core::{
    kelly_fraction, mean_std, percentile_linear, BankrollSettings, BetDecision, KellySizer,
    Result, RiskError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::monte_carlo::to_money;

const TRADING_DAYS_PER_YEAR: f64 = 365.0;

/// Inputs for one bankroll projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub starting_bankroll: Decimal,
    pub win_probability: f64,
    /// Total return per unit staked (2.0 = even money).
    pub decimal_odds: f64,
    /// 1.0 = full Kelly, 0.5 = half Kelly, 0.0 = never bet.
    pub kelly_multiplier: f64,
    pub days: u32,
    pub bets_per_day: u32,
    /// Number of independent paths.
    pub iterations: usize,
    /// Fraction of the starting bankroll at or below which a path is ruined.
    pub ruin_threshold: f64,
    pub seed: Option<u64>,
}

impl SimulationParams {
    #[must_use]
    pub fn new(starting_bankroll: Decimal, win_probability: f64, decimal_odds: f64) -> Self {
        let settings = BankrollSettings::default();
        Self {
            starting_bankroll,
            win_probability,
            decimal_odds,
            kelly_multiplier: 1.0,
            days: 30,
            bets_per_day: 3,
            iterations: settings.iterations,
            ruin_threshold: settings.ruin_threshold,
            seed: settings.seed,
        }
    }

    /// Applies path count, ruin threshold and seed from loaded settings.
    #[must_use]
    pub fn with_settings(mut self, settings: &BankrollSettings) -> Self {
        self.iterations = settings.iterations;
        self.ruin_threshold = settings.ruin_threshold;
        self.seed = settings.seed;
        self
    }

    #[must_use]
    pub fn with_kelly_multiplier(mut self, multiplier: f64) -> Self {
        self.kelly_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_schedule(mut self, days: u32, bets_per_day: u32) -> Self {
        self.days = days;
        self.bets_per_day = bets_per_day;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Errors
    /// Returns error on a non-positive bankroll, a probability outside [0, 1],
    /// decimal odds at or below 1.0, a negative multiplier, or a ruin
    /// threshold outside [0, 1).
    pub fn validate(&self) -> Result<()> {
        if self.starting_bankroll <= Decimal::ZERO {
            return Err(RiskError::InvalidStake {
                name: "starting_bankroll",
                value: self.starting_bankroll.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.win_probability) {
            return Err(RiskError::InvalidProbability {
                name: "win_probability",
                value: self.win_probability,
            });
        }
        if !self.decimal_odds.is_finite() || self.decimal_odds <= 1.0 {
            return Err(RiskError::InvalidDecimalOdds(self.decimal_odds));
        }
        if !self.kelly_multiplier.is_finite() || self.kelly_multiplier < 0.0 {
            return Err(RiskError::InvalidParameter {
                name: "kelly_multiplier",
                reason: format!("must be a finite value >= 0, got {}", self.kelly_multiplier),
            });
        }
        if !(0.0..1.0).contains(&self.ruin_threshold) {
            return Err(RiskError::InvalidParameter {
                name: "ruin_threshold",
                reason: format!("must be in [0, 1), got {}", self.ruin_threshold),
            });
        }
        Ok(())
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Bankroll at the 5/25/50/75/95 marks across paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankrollPercentiles {
    pub p5: Decimal,
    pub p25: Decimal,
    pub p50: Decimal,
    pub p75: Decimal,
    pub p95: Decimal,
}

impl BankrollPercentiles {
    fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p5: to_money(percentile_linear(sorted, 0.05)),
            p25: to_money(percentile_linear(sorted, 0.25)),
            p50: to_money(percentile_linear(sorted, 0.50)),
            p75: to_money(percentile_linear(sorted, 0.75)),
            p95: to_money(percentile_linear(sorted, 0.95)),
        }
    }

    fn flat(value: Decimal) -> Self {
        Self {
            p5: value,
            p25: value,
            p50: value,
            p75: value,
            p95: value,
        }
    }
}

/// Percentile band at the end of one day (day 0 is the starting bankroll).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPercentiles {
    pub day: u32,
    #[serde(flatten)]
    pub bankroll: BankrollPercentiles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub kelly_multiplier: f64,
    pub full_kelly_fraction: f64,
    /// Fraction of the bankroll actually staked per bet.
    pub applied_fraction: f64,
    /// Sizing of the first bet against the starting bankroll.
    pub opening_bet: BetDecision,
    pub iterations: usize,
    pub days: u32,
    pub bets_per_day: u32,
    pub starting_bankroll: Decimal,
    /// `days + 1` rows.
    pub trajectory: Vec<DayPercentiles>,
    pub final_bankroll: BankrollPercentiles,
    pub mean_final_bankroll: Decimal,
    /// Median final bankroll relative to the start, in percent.
    pub growth_percent: f64,
    pub probability_of_profit: f64,
    pub probability_of_ruin: f64,
    pub ruined_paths: usize,
    /// Mean of each path's worst peak-to-trough drop, in percent.
    pub average_max_drawdown: f64,
    /// Annualized from per-path total returns.
    pub sharpe_ratio: f64,
}

/// One simulated bankroll path.
struct PathOutcome {
    /// Bankroll at the end of each day, starting with day 0.
    daily: Vec<f64>,
    max_drawdown: f64,
    ruined: bool,
}

fn simulate_path<R: Rng + ?Sized>(
    params: &SimulationParams,
    start: f64,
    stake_fraction: f64,
    rng: &mut R,
) -> PathOutcome {
    let mut bankroll = start;
    let mut peak = start;
    let mut max_drawdown: f64 = 0.0;
    let mut ruined = false;
    let ruin_level = start * params.ruin_threshold;
    let net_odds = params.decimal_odds - 1.0;

    let mut daily = Vec::with_capacity(params.days as usize + 1);
    daily.push(bankroll);

    for _ in 0..params.days {
        if !ruined && stake_fraction > 0.0 {
            for _ in 0..params.bets_per_day {
                let stake = bankroll * stake_fraction;
                if rng.gen::<f64>() < params.win_probability {
                    bankroll += stake * net_odds;
                } else {
                    bankroll -= stake;
                }

                peak = peak.max(bankroll);
                if peak > 0.0 {
                    max_drawdown = max_drawdown.max((peak - bankroll) / peak);
                }

                if bankroll <= ruin_level {
                    ruined = true;
                    break;
                }
            }
        }
        // Ruined paths repeat their frozen value
        daily.push(bankroll);
    }

    PathOutcome {
        daily,
        max_drawdown,
        ruined,
    }
}

/// Projects bankroll paths with a generator seeded from `params.seed`.
///
/// # Errors
/// Returns error if `params` fails validation.
pub fn simulate_bankroll_growth(params: &SimulationParams) -> Result<ProjectionResult> {
    let mut rng = params.rng();
    simulate_bankroll_growth_with_rng(params, &mut rng)
}

/// Projects bankroll paths drawing from `rng`.
///
/// # Errors
/// Returns error if `params` fails validation.
pub fn simulate_bankroll_growth_with_rng<R: Rng + ?Sized>(
    params: &SimulationParams,
    rng: &mut R,
) -> Result<ProjectionResult> {
    params.validate()?;

    let start = params.starting_bankroll.to_f64().unwrap_or(0.0);
    let full_kelly = kelly_fraction(params.win_probability, params.decimal_odds);
    let applied = (full_kelly * params.kelly_multiplier).min(1.0);

    if applied <= 0.0 {
        debug!(
            win_probability = params.win_probability,
            decimal_odds = params.decimal_odds,
            multiplier = params.kelly_multiplier,
            "No stake at this edge and multiplier, bankroll stays flat"
        );
    }

    if params.iterations == 0 {
        debug!("Zero iterations requested, returning flat projection");
        return Ok(flat_projection(params, full_kelly, applied));
    }

    let paths: Vec<PathOutcome> = (0..params.iterations)
        .map(|_| simulate_path(params, start, applied, rng))
        .collect();

    let n = paths.len() as f64;
    let trajectory: Vec<DayPercentiles> = (0..=params.days)
        .map(|day| {
            let mut column: Vec<f64> = paths.iter().map(|p| p.daily[day as usize]).collect();
            column.sort_by(f64::total_cmp);
            DayPercentiles {
                day,
                bankroll: BankrollPercentiles::from_sorted(&column),
            }
        })
        .collect();

    let mut finals: Vec<f64> = paths
        .iter()
        .map(|p| p.daily.last().copied().unwrap_or(start))
        .collect();
    finals.sort_by(f64::total_cmp);
    let (mean_final, _) = mean_std(&finals);

    let ruined_paths = paths.iter().filter(|p| p.ruined).count();
    let profitable = finals.iter().filter(|&&f| f > start).count();
    let (mean_drawdown, _) = mean_std(&paths.iter().map(|p| p.max_drawdown).collect::<Vec<_>>());

    let returns: Vec<f64> = finals.iter().map(|f| f / start - 1.0).collect();
    let (mean_return, std_return) = mean_std(&returns);
    let sharpe_ratio = if std_return > 0.0 && params.days > 0 {
        mean_return / std_return * (TRADING_DAYS_PER_YEAR / f64::from(params.days)).sqrt()
    } else {
        0.0
    };

    let median_final = percentile_linear(&finals, 0.5);

    let result = ProjectionResult {
        kelly_multiplier: params.kelly_multiplier,
        full_kelly_fraction: full_kelly,
        applied_fraction: applied,
        opening_bet: opening_bet(params),
        iterations: params.iterations,
        days: params.days,
        bets_per_day: params.bets_per_day,
        starting_bankroll: params.starting_bankroll,
        trajectory,
        final_bankroll: BankrollPercentiles::from_sorted(&finals),
        mean_final_bankroll: to_money(mean_final),
        growth_percent: (median_final / start - 1.0) * 100.0,
        probability_of_profit: profitable as f64 / n,
        probability_of_ruin: ruined_paths as f64 / n,
        ruined_paths,
        average_max_drawdown: mean_drawdown * 100.0,
        sharpe_ratio,
    };

    debug!(
        multiplier = params.kelly_multiplier,
        ruin = result.probability_of_ruin,
        median_final = %result.final_bankroll.p50,
        "Bankroll projection complete"
    );

    Ok(result)
}

/// First stake at the multiplier, capped at the whole bankroll.
fn opening_bet(params: &SimulationParams) -> BetDecision {
    let fraction = Decimal::from_f64(params.kelly_multiplier).unwrap_or(Decimal::ZERO);
    KellySizer::new(fraction, params.starting_bankroll, Decimal::ZERO).size(
        params.win_probability,
        params.decimal_odds,
        params.starting_bankroll,
    )
}

fn flat_projection(params: &SimulationParams, full_kelly: f64, applied: f64) -> ProjectionResult {
    let start = params.starting_bankroll;
    ProjectionResult {
        kelly_multiplier: params.kelly_multiplier,
        full_kelly_fraction: full_kelly,
        applied_fraction: applied,
        opening_bet: opening_bet(params),
        iterations: 0,
        days: params.days,
        bets_per_day: params.bets_per_day,
        starting_bankroll: start,
        trajectory: (0..=params.days)
            .map(|day| DayPercentiles {
                day,
                bankroll: BankrollPercentiles::flat(start),
            })
            .collect(),
        final_bankroll: BankrollPercentiles::flat(start),
        mean_final_bankroll: start,
        growth_percent: 0.0,
        probability_of_profit: 0.0,
        probability_of_ruin: 0.0,
        ruined_paths: 0,
        average_max_drawdown: 0.0,
        sharpe_ratio: 0.0,
    }
}

/// One row of the full/half/quarter Kelly chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfPoint {
    pub day: u32,
    pub full_p5: Decimal,
    pub full_p50: Decimal,
    pub full_p95: Decimal,
    pub half_p5: Decimal,
    pub half_p50: Decimal,
    pub half_p95: Decimal,
    pub quarter_p5: Decimal,
    pub quarter_p50: Decimal,
    pub quarter_p95: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfResults {
    pub full_kelly: ProjectionResult,
    pub half_kelly: ProjectionResult,
    pub quarter_kelly: ProjectionResult,
    pub chart: Vec<WhatIfPoint>,
}

/// Runs the same projection at full, half and quarter Kelly.
///
/// All three runs share one seed (`params.seed`, or a single entropy draw),
/// so they see identical win/loss sequences and differ only in stake size.
/// `params.kelly_multiplier` is ignored.
///
/// # Errors
/// Returns error if `params` fails validation.
pub fn run_what_if_comparison(params: &SimulationParams) -> Result<WhatIfResults> {
    params.validate()?;
    let seed = params.seed.unwrap_or_else(rand::random);
    let run = |multiplier: f64| {
        let p = params.clone().with_kelly_multiplier(multiplier).with_seed(seed);
        simulate_bankroll_growth(&p)
    };

    let (full, (half, quarter)) = rayon::join(|| run(1.0), || rayon::join(|| run(0.5), || run(0.25)));
    let (full_kelly, half_kelly, quarter_kelly) = (full?, half?, quarter?);

    let chart = full_kelly
        .trajectory
        .iter()
        .zip(&half_kelly.trajectory)
        .zip(&quarter_kelly.trajectory)
        .map(|((f, h), q)| WhatIfPoint {
            day: f.day,
            full_p5: f.bankroll.p5,
            full_p50: f.bankroll.p50,
            full_p95: f.bankroll.p95,
            half_p5: h.bankroll.p5,
            half_p50: h.bankroll.p50,
            half_p95: h.bankroll.p95,
            quarter_p5: q.bankroll.p5,
            quarter_p50: q.bankroll.p50,
            quarter_p95: q.bankroll.p95,
        })
        .collect();

    Ok(WhatIfResults {
        full_kelly,
        half_kelly,
        quarter_kelly,
        chart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlay_risk_core::BetReason;
    use rust_decimal_macros::dec;

    // ============================================
    // Test Helpers
    // ============================================

    fn params() -> SimulationParams {
        SimulationParams::new(dec!(1000), 0.55, 2.0)
            .with_iterations(500)
            .with_seed(42)
    }

    // ============================================
    // SimulationParams Tests
    // ============================================

    #[test]
    fn params_defaults() {
        let p = SimulationParams::new(dec!(1000), 0.55, 2.0);
        assert!((p.kelly_multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(p.days, 30);
        assert_eq!(p.bets_per_day, 3);
        assert_eq!(p.iterations, 1_000);
        assert!((p.ruin_threshold - 0.10).abs() < f64::EPSILON);
    }

    #[test]
    fn params_validation() {
        assert!(params().validate().is_ok());
        assert!(SimulationParams::new(dec!(0), 0.55, 2.0).validate().is_err());
        assert!(SimulationParams::new(dec!(100), 1.5, 2.0).validate().is_err());
        assert!(SimulationParams::new(dec!(100), f64::NAN, 2.0).validate().is_err());
        assert!(SimulationParams::new(dec!(100), 0.5, 1.0).validate().is_err());
        assert!(params().with_kelly_multiplier(-1.0).validate().is_err());
    }

    // ============================================
    // Path Tests
    // ============================================

    #[test]
    fn path_has_one_entry_per_day_plus_start() {
        let p = params().with_schedule(10, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let path = simulate_path(&p, 1000.0, 0.1, &mut rng);
        assert_eq!(path.daily.len(), 11);
        assert!((path.daily[0] - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ruined_path_is_frozen() {
        // Always lose half: 1000 -> 500 -> 250 -> 125 -> 62.5 (ruined)
        let p = SimulationParams::new(dec!(1000), 0.0, 2.0).with_schedule(5, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let path = simulate_path(&p, 1000.0, 0.5, &mut rng);

        assert!(path.ruined);
        assert!((path.daily[1] - 250.0).abs() < 1e-9);
        assert!((path.daily[2] - 62.5).abs() < 1e-9);
        assert!(path.daily[2..].iter().all(|&b| (b - 62.5).abs() < 1e-9));
        assert!((path.max_drawdown - 0.9375).abs() < 1e-9);
    }

    #[test]
    fn zero_fraction_path_is_flat() {
        let p = params();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let path = simulate_path(&p, 1000.0, 0.0, &mut rng);
        assert!(path.daily.iter().all(|&b| (b - 1000.0).abs() < f64::EPSILON));
        assert!(path.max_drawdown.abs() < f64::EPSILON);
    }

    // ============================================
    // Projection Tests
    // ============================================

    #[test]
    fn zero_multiplier_is_flat_at_every_percentile() {
        let result = simulate_bankroll_growth(&params().with_kelly_multiplier(0.0)).unwrap();

        assert_eq!(result.trajectory.len(), 31);
        for row in &result.trajectory {
            assert_eq!(row.bankroll, BankrollPercentiles::flat(dec!(1000)));
        }
        assert!(result.probability_of_ruin.abs() < f64::EPSILON);
        assert!(result.probability_of_profit.abs() < f64::EPSILON);
        assert!(result.sharpe_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn negative_edge_never_bets() {
        let p = SimulationParams::new(dec!(1000), 0.45, 2.0)
            .with_iterations(100)
            .with_seed(3);
        let result = simulate_bankroll_growth(&p).unwrap();
        assert!(result.full_kelly_fraction.abs() < f64::EPSILON);
        assert_eq!(result.final_bankroll.p5, dec!(1000));
        assert_eq!(result.final_bankroll.p95, dec!(1000));
        assert!(!result.opening_bet.should_bet);
        assert_eq!(result.opening_bet.reason, BetReason::NegativeEv);
    }

    #[test]
    fn opening_bet_matches_applied_fraction() {
        let result = simulate_bankroll_growth(&params().with_kelly_multiplier(0.5)).unwrap();
        let bet = &result.opening_bet;
        assert!(bet.should_bet);
        assert_eq!(bet.reason, BetReason::PositiveEdge);
        // 1000 × 0.10 × 0.5
        assert_eq!(bet.stake, dec!(50));
        assert!((bet.expected_value - 0.10).abs() < 1e-12);
    }

    #[test]
    fn opening_bet_never_exceeds_bankroll() {
        let p = SimulationParams::new(dec!(200), 0.9, 3.0)
            .with_kelly_multiplier(2.0)
            .with_iterations(10)
            .with_seed(1);
        let result = simulate_bankroll_growth(&p).unwrap();
        assert_eq!(result.opening_bet.stake, dec!(200));
    }

    #[test]
    fn positive_edge_grows_median() {
        let result = simulate_bankroll_growth(&params().with_kelly_multiplier(0.5)).unwrap();

        assert!((result.full_kelly_fraction - 0.10).abs() < 1e-12);
        assert!((result.applied_fraction - 0.05).abs() < 1e-12);
        assert!(result.final_bankroll.p50 > dec!(1000));
        assert!(result.sharpe_ratio > 0.0);
        assert!(result.average_max_drawdown > 0.0);
        assert!(result.probability_of_profit > 0.5);
    }

    #[test]
    fn trajectory_bands_are_ordered() {
        let result = simulate_bankroll_growth(&params()).unwrap();
        for row in &result.trajectory {
            let b = &row.bankroll;
            assert!(b.p5 <= b.p25 && b.p25 <= b.p50 && b.p50 <= b.p75 && b.p75 <= b.p95);
        }
        assert_eq!(result.trajectory.last().unwrap().bankroll, result.final_bankroll);
    }

    #[test]
    fn zero_iterations_returns_flat_projection() {
        let result = simulate_bankroll_growth(&params().with_iterations(0)).unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.trajectory.len(), 31);
        assert_eq!(result.mean_final_bankroll, dec!(1000));
    }

    #[test]
    fn seeded_projection_is_reproducible() {
        let a = simulate_bankroll_growth(&params()).unwrap();
        let b = simulate_bankroll_growth(&params()).unwrap();
        assert_eq!(a, b);
    }

    // ============================================
    // What-If Tests
    // ============================================

    #[test]
    fn what_if_runs_three_multipliers() {
        let results = run_what_if_comparison(&params()).unwrap();

        assert!((results.full_kelly.kelly_multiplier - 1.0).abs() < f64::EPSILON);
        assert!((results.half_kelly.kelly_multiplier - 0.5).abs() < f64::EPSILON);
        assert!((results.quarter_kelly.kelly_multiplier - 0.25).abs() < f64::EPSILON);
        assert_eq!(results.chart.len(), 31);
        assert_eq!(results.chart[0].full_p50, dec!(1000));
        // Smaller stakes give a tighter final band
        let spread = |r: &ProjectionResult| r.final_bankroll.p95 - r.final_bankroll.p5;
        assert!(spread(&results.quarter_kelly) < spread(&results.full_kelly));
    }

    #[test]
    fn what_if_reuses_seed_across_runs() {
        let results = run_what_if_comparison(&params()).unwrap();
        let full = simulate_bankroll_growth(&params().with_kelly_multiplier(1.0)).unwrap();
        assert_eq!(results.full_kelly, full);
    }
}
