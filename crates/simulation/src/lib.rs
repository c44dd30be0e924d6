//! Probabilistic risk engine for multi-leg parlays.
//!
//! The pipeline is explicit: build a [`CorrelationMatrix`] for a leg set once,
//! hold on to it, and pass it into as many Monte Carlo runs as needed.
//! Nothing here caches between calls.

pub mod bankroll;
pub mod comparative;
pub mod correlation;
pub mod monte_carlo;
pub mod upset;

pub use bankroll::{
    run_what_if_comparison, simulate_bankroll_growth, simulate_bankroll_growth_with_rng,
    BankrollPercentiles, DayPercentiles, ProjectionResult, SimulationParams, WhatIfPoint,
    WhatIfResults,
};
pub use comparative::{run_comparative_simulation, ComparativeResult, ComparisonRow, WeakLeg};
pub use correlation::{
    build_correlation_matrix, cholesky_decomposition, generate_correlated_uniform,
    CholeskyFactor, CorrelationMatrix, CorrelationPair, CorrelationType,
};
pub use monte_carlo::{
    run_correlated_monte_carlo_simulation, run_monte_carlo_simulation, BucketOutcome,
    CorrelatedMonteCarloResult, HistogramBucket, MonteCarloConfig, MonteCarloResult,
    MonteCarloSimulator, ProfitPercentiles, UpsetStats,
};
pub use upset::{AdjustedLeg, LegAdjuster};
