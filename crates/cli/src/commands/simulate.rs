//! Monte Carlo commands: single, correlated, comparative, and matrix inspection.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use parlay_risk_core::{ParlaySimulation, RiskConfig, UpsetFactors};
use parlay_risk_simulation::{
    build_correlation_matrix, ComparativeResult, CorrelatedMonteCarloResult, CorrelationMatrix,
    MonteCarloConfig, MonteCarloResult, MonteCarloSimulator,
};
use tracing::info;

use super::input::{load_parlay, load_parlays, read_json};
use super::output::{emit, header, pct, OutputFormat};

/// Trial settings shared by every simulation command.
#[derive(Args, Debug, Clone, Default)]
pub struct SimulationOptions {
    /// Trials per simulation (defaults to the configured value)
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use pure odds-implied probabilities (no upset factors or chaos days)
    #[arg(long)]
    pub no_upsets: bool,
}

impl SimulationOptions {
    fn simulator(&self, config: &RiskConfig) -> MonteCarloSimulator {
        let mut mc = MonteCarloConfig::from_risk_config(config);
        if let Some(iterations) = self.iterations {
            mc = mc.with_iterations(iterations);
        }
        if let Some(seed) = self.seed {
            mc = mc.with_seed(seed);
        }
        if self.no_upsets {
            mc = mc.with_upset_factors(UpsetFactors::disabled());
        }
        MonteCarloSimulator::new(mc)
    }
}

/// Arguments for the simulate command.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Parlay JSON file
    #[arg(short, long)]
    pub parlay: PathBuf,

    #[command(flatten)]
    pub options: SimulationOptions,
}

/// Arguments for the correlated command.
#[derive(Args, Debug, Clone)]
pub struct CorrelatedArgs {
    /// Parlay JSON file
    #[arg(short, long)]
    pub parlay: PathBuf,

    /// Optional JSON matrix (array of rows); built from leg metadata when omitted
    #[arg(short, long)]
    pub matrix: Option<PathBuf>,

    #[command(flatten)]
    pub options: SimulationOptions,
}

/// Arguments for the compare command.
#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// JSON file holding an array of parlays
    #[arg(short, long)]
    pub parlays: PathBuf,

    #[command(flatten)]
    pub options: SimulationOptions,
}

/// Arguments for the correlation command.
#[derive(Args, Debug, Clone)]
pub struct CorrelationArgs {
    /// Parlay JSON file
    #[arg(short, long)]
    pub parlay: PathBuf,
}

pub async fn run_simulate(args: SimulateArgs, config: RiskConfig, format: OutputFormat) -> Result<()> {
    let parlay = load_parlay(&args.parlay)?;
    let simulator = args.options.simulator(&config);
    info!(
        legs = parlay.legs.len(),
        iterations = simulator.config().iterations,
        "Running parlay simulation"
    );

    let sim_parlay = parlay.clone();
    let result = tokio::task::spawn_blocking(move || simulator.run(&sim_parlay))
        .await
        .context("Simulation task failed")??;

    emit(format, &result, |r| format_simulation_report(&parlay, r))
}

pub async fn run_correlated(
    args: CorrelatedArgs,
    config: RiskConfig,
    format: OutputFormat,
) -> Result<()> {
    let parlay = load_parlay(&args.parlay)?;
    let matrix = match &args.matrix {
        Some(path) => {
            let rows: Vec<Vec<f64>> = read_json(path)?;
            Some(CorrelationMatrix::from_rows(
                &rows,
                config.correlation.high_correlation_threshold,
            ))
        }
        None => None,
    };
    let simulator = args.options.simulator(&config);
    info!(legs = parlay.legs.len(), "Running correlated simulation");

    let sim_parlay = parlay.clone();
    let result = tokio::task::spawn_blocking(move || {
        simulator.run_correlated(&sim_parlay, matrix.as_ref())
    })
    .await
    .context("Simulation task failed")??;

    emit(format, &result, |r| format_correlated_report(&parlay, r))
}

pub async fn run_compare(args: CompareArgs, config: RiskConfig, format: OutputFormat) -> Result<()> {
    let parlays = load_parlays(&args.parlays)?;
    let simulator = args.options.simulator(&config);
    info!(parlays = parlays.len(), "Running comparative simulation");

    let result = tokio::task::spawn_blocking(move || simulator.run_comparative(&parlays))
        .await
        .context("Simulation task failed")??;

    emit(format, &result, format_comparison_report)
}

pub async fn run_correlation(
    args: CorrelationArgs,
    config: RiskConfig,
    format: OutputFormat,
) -> Result<()> {
    let parlay = load_parlay(&args.parlay)?;
    let matrix = build_correlation_matrix(&parlay.legs, &config.correlation);
    emit(format, &matrix, |m| format_matrix_report(&parlay, m))
}

fn write_result_body(out: &mut String, result: &MonteCarloResult) {
    if result.is_empty() {
        let _ = writeln!(out, "No trials run (empty parlay or zero iterations)");
        return;
    }
    let p = &result.profit_percentiles;
    let u = &result.upset_stats;
    let _ = writeln!(out, "Trials:              {}", result.iterations);
    let _ = writeln!(
        out,
        "Win rate:            {} (95% CI {} - {})",
        pct(result.win_rate),
        pct(result.win_rate_ci.0),
        pct(result.win_rate_ci.1)
    );
    let _ = writeln!(out, "Implied win rate:    {}", pct(result.theoretical_win_rate));
    let _ = writeln!(out, "Adjusted win rate:   {}", pct(result.adjusted_win_rate));
    let _ = writeln!(
        out,
        "Expected profit:     ${} ({:+.1}% ROI)",
        result.expected_profit, result.expected_roi
    );
    let _ = writeln!(
        out,
        "Profit p5/p25/p50/p75/p95: {} / {} / {} / {} / {}",
        p.p5, p.p25, p.p50, p.p75, p.p95
    );
    let _ = writeln!(
        out,
        "Upsets: {} chaos days, {} upset wins, boost {:+.2} pts",
        u.chaos_days, u.upset_wins, u.upset_boost
    );
    for (i, rate) in result.leg_hit_rates.iter().enumerate() {
        let _ = writeln!(out, "  Leg {} hit rate: {}", i + 1, pct(*rate));
    }
}

pub fn format_simulation_report(parlay: &ParlaySimulation, result: &MonteCarloResult) -> String {
    let mut out = header("PARLAY SIMULATION");
    let _ = writeln!(out, "Parlay: {}", parlay.display_label());
    let _ = writeln!(
        out,
        "Stake ${} to win ${}\n",
        parlay.stake, parlay.potential_payout
    );
    write_result_body(&mut out, result);
    out
}

pub fn format_correlated_report(
    parlay: &ParlaySimulation,
    result: &CorrelatedMonteCarloResult,
) -> String {
    let mut out = header("CORRELATED PARLAY SIMULATION");
    let _ = writeln!(out, "Parlay: {}\n", parlay.display_label());
    write_result_body(&mut out, &result.result);
    let _ = writeln!(out);
    let _ = writeln!(out, "Independent win rate: {}", pct(result.independent_win_rate));
    let _ = writeln!(
        out,
        "Correlation impact:   {:+.2} pts ({:+.1}%)",
        result.correlation_impact * 100.0,
        result.correlation_impact_percent
    );
    let _ = writeln!(
        out,
        "Average correlation:  {:.3}",
        result.correlation_matrix.average_correlation
    );
    if result.ridge_applied > 0.0 {
        let _ = writeln!(out, "Matrix regularized (ridge {:.2})", result.ridge_applied);
    }
    if result.used_independent_fallback {
        let _ = writeln!(out, "WARNING: matrix unusable, legs simulated independently");
    }
    out
}

pub fn format_comparison_report(result: &ComparativeResult) -> String {
    let mut out = header("PARLAY COMPARISON");
    if result.results.is_empty() {
        let _ = writeln!(out, "No parlays to compare");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<4} {:<30} {:>5} {:>9} {:>12} {:>10}",
        "#", "Parlay", "Legs", "Win %", "Exp. profit", "Median"
    );
    let _ = writeln!(out, "{}", "-".repeat(75));
    for row in &result.comparison_data {
        let label: String = row.label.chars().take(30).collect();
        let _ = writeln!(
            out,
            "{:<4} {:<30} {:>5} {:>9} {:>12} {:>10}",
            row.index + 1,
            label,
            row.legs,
            pct(row.win_rate),
            row.expected_profit.to_string(),
            row.median_profit.to_string()
        );
    }

    let _ = writeln!(out);
    if let Some(i) = result.best_by_win_rate {
        let _ = writeln!(out, "Best win rate:        #{}", i + 1);
    }
    if let Some(i) = result.best_by_expected_profit {
        let _ = writeln!(out, "Best expected profit: #{}", i + 1);
    }
    if !result.weakest_legs.is_empty() {
        let _ = writeln!(out, "\nWeakest legs:");
        for leg in &result.weakest_legs {
            let _ = writeln!(
                out,
                "  #{} {} ({:+}): hits {}, blamed for {} of losses",
                leg.parlay_index + 1,
                leg.description,
                leg.american_odds,
                pct(leg.hit_rate),
                pct(leg.bust_share)
            );
        }
    }
    out
}

pub fn format_matrix_report(parlay: &ParlaySimulation, matrix: &CorrelationMatrix) -> String {
    let mut out = header("CORRELATION MATRIX");
    for (i, leg) in parlay.legs.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}", i + 1, leg.description);
    }
    let _ = writeln!(out);
    for row in matrix.rows() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>6.2}")).collect();
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    let _ = writeln!(out);
    for pair in &matrix.pairs {
        if pair.coefficient.abs() > f64::EPSILON {
            let _ = writeln!(
                out,
                "  [{}]-[{}] {:?} {:.2}",
                pair.i + 1,
                pair.j + 1,
                pair.kind,
                pair.coefficient
            );
        }
    }
    let _ = writeln!(out, "Average correlation: {:.3}", matrix.average_correlation);
    if matrix.has_high_correlation {
        let _ = writeln!(out, "High correlation present: the independent model will misprice this ticket");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlay_risk_core::Leg;
    use rust_decimal_macros::dec;

    fn parlay() -> ParlaySimulation {
        ParlaySimulation::new(
            vec![Leg::new("A", 150).unwrap(), Leg::new("B", -110).unwrap()],
            dec!(10),
        )
        .unwrap()
    }

    #[test]
    fn options_override_config() {
        let options = SimulationOptions {
            iterations: Some(123),
            seed: Some(5),
            no_upsets: true,
        };
        let simulator = options.simulator(&RiskConfig::default());
        assert_eq!(simulator.config().iterations, 123);
        assert_eq!(simulator.config().seed, Some(5));
        assert_eq!(simulator.config().upset_factors, UpsetFactors::disabled());
    }

    #[test]
    fn options_fall_back_to_config() {
        let simulator = SimulationOptions::default().simulator(&RiskConfig::default());
        assert_eq!(simulator.config().iterations, 100_000);
    }

    #[test]
    fn simulation_report_lists_legs() {
        let p = parlay();
        let options = SimulationOptions {
            iterations: Some(1_000),
            seed: Some(1),
            no_upsets: true,
        };
        let result = options.simulator(&RiskConfig::default()).run(&p).unwrap();
        let report = format_simulation_report(&p, &result);
        assert!(report.contains("A + B"));
        assert!(report.contains("Leg 2 hit rate"));
    }

    #[test]
    fn empty_comparison_report() {
        let report = format_comparison_report(&ComparativeResult::empty());
        assert!(report.contains("No parlays"));
    }
}
