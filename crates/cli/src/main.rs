use anyhow::Context;
use clap::{Parser, Subcommand};
use parlay_risk_core::ConfigLoader;

mod commands;

use commands::{
    CompareArgs, CorrelatedArgs, CorrelationArgs, EnsembleArgs, OutputFormat, ProjectArgs,
    SimulateArgs, WhatIfArgs,
};

#[derive(Parser)]
#[command(name = "parlay-risk")]
#[command(about = "Monte Carlo risk analysis for multi-leg parlays", long_about = None)]
struct Cli {
    /// Config profile overlay (loads config/Config.{profile}.toml)
    #[arg(long, global = true, env = "PARLAY_PROFILE")]
    config_profile: Option<String>,

    /// Output format (json, text)
    #[arg(short, long, global = true, default_value = "json")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one parlay with independent legs
    Simulate(SimulateArgs),
    /// Simulate one parlay with correlated legs and compare to independence
    Correlated(CorrelatedArgs),
    /// Simulate several parlays and rank them
    Compare(CompareArgs),
    /// Print the correlation matrix the engine builds for a parlay
    Correlation(CorrelationArgs),
    /// Aggregate engine signals into a consensus verdict
    Ensemble(EnsembleArgs),
    /// Project bankroll growth under Kelly sizing
    Project(ProjectArgs),
    /// Compare full, half and quarter Kelly on identical outcomes
    WhatIf(WhatIfArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::parse(&cli.format)?;
    let config = match &cli.config_profile {
        Some(profile) => ConfigLoader::load_with_profile(profile),
        None => ConfigLoader::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Simulate(args) => commands::run_simulate(args, config, format).await?,
        Commands::Correlated(args) => commands::run_correlated(args, config, format).await?,
        Commands::Compare(args) => commands::run_compare(args, config, format).await?,
        Commands::Correlation(args) => commands::run_correlation(args, config, format).await?,
        Commands::Ensemble(args) => commands::run_ensemble_command(args, config, format).await?,
        Commands::Project(args) => commands::run_project(args, config, format).await?,
        Commands::WhatIf(args) => commands::run_what_if(args, config, format).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_with_options() {
        let cli = Cli::try_parse_from([
            "parlay-risk",
            "simulate",
            "--parlay",
            "ticket.json",
            "-n",
            "5000",
            "--seed",
            "7",
            "--no-upsets",
        ])
        .unwrap();
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.options.iterations, Some(5000));
                assert_eq!(args.options.seed, Some(7));
                assert!(args.options.no_upsets);
            }
            _ => panic!("expected simulate"),
        }
        assert_eq!(cli.format, "json");
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parlay-risk",
            "correlation",
            "--parlay",
            "ticket.json",
            "--format",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.format, "text");
    }

    #[test]
    fn parses_project() {
        let cli = Cli::try_parse_from([
            "parlay-risk",
            "project",
            "--win-prob",
            "0.55",
            "--odds",
            "2.0",
            "--kelly",
            "0.5",
            "--bankroll",
            "2500.50",
        ])
        .unwrap();
        match cli.command {
            Commands::Project(args) => {
                assert!((args.kelly - 0.5).abs() < f64::EPSILON);
                assert_eq!(args.options.bankroll.to_string(), "2500.50");
                assert_eq!(args.options.days, 30);
                assert_eq!(args.options.bets_per_day, 3);
            }
            _ => panic!("expected project"),
        }
    }

    #[test]
    fn what_if_rejects_kelly_flag() {
        let result = Cli::try_parse_from([
            "parlay-risk",
            "what-if",
            "--win-prob",
            "0.55",
            "--odds",
            "2.0",
            "--kelly",
            "0.5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn ensemble_sources_conflict() {
        let result = Cli::try_parse_from([
            "parlay-risk",
            "ensemble",
            "--signals",
            "a.json",
            "--parlay-signals",
            "b.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn simulate_requires_parlay() {
        assert!(Cli::try_parse_from(["parlay-risk", "simulate"]).is_err());
    }
}
