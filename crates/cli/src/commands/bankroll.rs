//! Kelly bankroll projection and full/half/quarter comparison.

use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use csv::Writer;
use parlay_risk_core::RiskConfig;
use parlay_risk_simulation::{
    run_what_if_comparison, simulate_bankroll_growth, ProjectionResult, SimulationParams,
    WhatIfPoint, WhatIfResults,
};
use rust_decimal::Decimal;
use tracing::info;

use super::output::{emit, header, pct, OutputFormat};

/// Bet profile and schedule shared by both bankroll commands.
#[derive(Args, Debug, Clone)]
pub struct BankrollOptions {
    /// Starting bankroll in dollars
    #[arg(short, long, default_value = "1000")]
    pub bankroll: Decimal,

    /// Probability of winning each bet (0-1)
    #[arg(long)]
    pub win_prob: f64,

    /// Decimal odds paid on each bet
    #[arg(long)]
    pub odds: f64,

    #[arg(long, default_value_t = 30)]
    pub days: u32,

    #[arg(long, default_value_t = 3)]
    pub bets_per_day: u32,

    /// Paths to simulate (defaults to the configured value)
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl BankrollOptions {
    fn params(&self, config: &RiskConfig) -> SimulationParams {
        let mut params = SimulationParams::new(self.bankroll, self.win_prob, self.odds)
            .with_settings(&config.bankroll)
            .with_schedule(self.days, self.bets_per_day);
        if let Some(iterations) = self.iterations {
            params = params.with_iterations(iterations);
        }
        if let Some(seed) = self.seed {
            params = params.with_seed(seed);
        }
        params
    }
}

/// Arguments for the project command.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub options: BankrollOptions,

    /// Kelly multiplier (1.0 = full Kelly, 0.5 = half Kelly)
    #[arg(short, long, default_value_t = 1.0)]
    pub kelly: f64,
}

/// Arguments for the what-if command.
#[derive(Args, Debug, Clone)]
pub struct WhatIfArgs {
    #[command(flatten)]
    pub options: BankrollOptions,

    /// Also write the day-by-day chart to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub async fn run_project(args: ProjectArgs, config: RiskConfig, format: OutputFormat) -> Result<()> {
    let params = args.options.params(&config).with_kelly_multiplier(args.kelly);
    info!(
        kelly = params.kelly_multiplier,
        iterations = params.iterations,
        days = params.days,
        "Running bankroll projection"
    );

    let result = tokio::task::spawn_blocking(move || simulate_bankroll_growth(&params))
        .await
        .context("Projection task failed")??;

    emit(format, &result, format_projection_report)
}

pub async fn run_what_if(args: WhatIfArgs, config: RiskConfig, format: OutputFormat) -> Result<()> {
    let params = args.options.params(&config);
    info!(iterations = params.iterations, "Running Kelly what-if comparison");

    let results = tokio::task::spawn_blocking(move || run_what_if_comparison(&params))
        .await
        .context("What-if task failed")??;

    if let Some(path) = &args.csv {
        write_chart_csv(path, &results.chart)?;
        info!(path = %path.display(), rows = results.chart.len(), "Wrote what-if chart");
    }

    emit(format, &results, format_what_if_report)
}

/// Writes the what-if chart, one row per day.
///
/// Format: day,full_p5,full_p50,full_p95,half_p5,half_p50,half_p95,quarter_p5,quarter_p50,quarter_p95
///
/// # Errors
/// Returns error if the file cannot be created or writing fails
pub fn write_chart_csv(path: &Path, chart: &[WhatIfPoint]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "day",
        "full_p5",
        "full_p50",
        "full_p95",
        "half_p5",
        "half_p50",
        "half_p95",
        "quarter_p5",
        "quarter_p50",
        "quarter_p95",
    ])?;

    for point in chart {
        writer.write_record(&[
            point.day.to_string(),
            point.full_p5.to_string(),
            point.full_p50.to_string(),
            point.full_p95.to_string(),
            point.half_p5.to_string(),
            point.half_p50.to_string(),
            point.half_p95.to_string(),
            point.quarter_p5.to_string(),
            point.quarter_p50.to_string(),
            point.quarter_p95.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_projection_body(out: &mut String, result: &ProjectionResult) {
    let f = &result.final_bankroll;
    let _ = writeln!(
        out,
        "Kelly fraction:      {} full, {} applied ({}x)",
        pct(result.full_kelly_fraction),
        pct(result.applied_fraction),
        result.kelly_multiplier
    );
    let _ = writeln!(
        out,
        "Final bankroll p5/p50/p95: ${} / ${} / ${}",
        f.p5, f.p50, f.p95
    );
    let _ = writeln!(out, "Median growth:       {:+.1}%", result.growth_percent);
    let _ = writeln!(out, "P(profit):           {}", pct(result.probability_of_profit));
    let _ = writeln!(
        out,
        "P(ruin):             {} ({} paths)",
        pct(result.probability_of_ruin),
        result.ruined_paths
    );
    let _ = writeln!(out, "Avg max drawdown:    {:.1}%", result.average_max_drawdown);
    let _ = writeln!(out, "Sharpe (annualized): {:.2}", result.sharpe_ratio);
}

pub fn format_projection_report(result: &ProjectionResult) -> String {
    let mut out = header("KELLY BANKROLL PROJECTION");
    let _ = writeln!(
        out,
        "${} over {} days x {} bets, {} paths\n",
        result.starting_bankroll, result.days, result.bets_per_day, result.iterations
    );
    if result.applied_fraction <= 0.0 {
        let _ = writeln!(out, "No edge at these odds: Kelly stakes nothing\n");
    }
    let bet = &result.opening_bet;
    if bet.should_bet {
        let _ = writeln!(
            out,
            "Opening stake:       ${} (EV {:+.1}% per dollar)",
            bet.stake,
            bet.expected_value * 100.0
        );
    }
    write_projection_body(&mut out, result);
    out
}

pub fn format_what_if_report(results: &WhatIfResults) -> String {
    let mut out = header("KELLY WHAT-IF");
    for (name, result) in [
        ("Full Kelly", &results.full_kelly),
        ("Half Kelly", &results.half_kelly),
        ("Quarter Kelly", &results.quarter_kelly),
    ] {
        let _ = writeln!(out, "--- {name} ---");
        write_projection_body(&mut out, result);
        let _ = writeln!(out);
    }
    out
}
