//! Signal ensemble command for a single leg or a whole parlay.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use parlay_risk_core::RiskConfig;
use parlay_risk_signals::{
    aggregate_parlay_ensemble, run_ensemble, EngineSignal, EnsembleResult, ParlayEnsembleResult,
};
use serde::Serialize;
use tracing::{info, warn};

use super::input::read_json;
use super::output::{emit, header, OutputFormat};

/// Arguments for the ensemble command.
#[derive(Args, Debug, Clone)]
pub struct EnsembleArgs {
    /// JSON array of engine signals for one leg
    #[arg(short, long, conflicts_with = "parlay_signals")]
    pub signals: Option<PathBuf>,

    /// JSON array of per-leg signal arrays; adds a parlay verdict
    #[arg(long)]
    pub parlay_signals: Option<PathBuf>,
}

/// Per-leg ensembles plus the combined verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ParlayEnsembleReport {
    pub legs: Vec<EnsembleResult>,
    pub parlay: ParlayEnsembleResult,
}

pub async fn run_ensemble_command(
    args: EnsembleArgs,
    config: RiskConfig,
    format: OutputFormat,
) -> Result<()> {
    match (&args.signals, &args.parlay_signals) {
        (Some(path), None) => {
            let signals = validated(read_json::<Vec<EngineSignal>>(path)?);
            info!(signals = signals.len(), "Running signal ensemble");
            let result = run_ensemble(&signals, &config.ensemble);
            emit(format, &result, format_ensemble_report)
        }
        (None, Some(path)) => {
            let legs: Vec<Vec<EngineSignal>> = read_json(path)?;
            info!(legs = legs.len(), "Running parlay signal ensemble");
            let report = build_parlay_report(legs, &config);
            emit(format, &report, format_parlay_report)
        }
        _ => bail!("Provide exactly one of --signals or --parlay-signals"),
    }
}

fn build_parlay_report(legs: Vec<Vec<EngineSignal>>, config: &RiskConfig) -> ParlayEnsembleReport {
    let legs: Vec<EnsembleResult> = legs
        .into_iter()
        .map(|signals| run_ensemble(&validated(signals), &config.ensemble))
        .collect();
    let parlay = aggregate_parlay_ensemble(&legs);
    ParlayEnsembleReport { legs, parlay }
}

/// Drops signals that fail validation (hand-edited files can carry bad confidences).
fn validated(signals: Vec<EngineSignal>) -> Vec<EngineSignal> {
    signals
        .into_iter()
        .filter_map(|signal| {
            let engine = signal.engine.clone();
            match signal.validated() {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(engine = %engine.as_str(), error = %e, "Skipping invalid signal");
                    None
                }
            }
        })
        .collect()
}

fn write_ensemble_body(out: &mut String, result: &EnsembleResult) {
    let _ = writeln!(
        out,
        "Consensus:   {} (score {:+.1})",
        result.consensus, result.consensus_score
    );
    let _ = writeln!(out, "Confidence:  {:.1}%", result.weighted_confidence * 100.0);
    let _ = writeln!(out, "Agreement:   {:.1}%", result.agreement_percent);
    let _ = writeln!(out, "Risk:        {:?}", result.risk_level);
    for c in &result.contributions {
        let _ = writeln!(
            out,
            "  {:<14} {:<8} conf {:.2} weight {:.2} -> {:+.1}",
            c.engine.as_str(),
            format!("{:?}", c.recommendation),
            c.confidence,
            c.weight,
            c.contribution
        );
    }
    if !result.conflicting_signals.is_empty() {
        let names: Vec<&str> = result.conflicting_signals.iter().map(|e| e.as_str()).collect();
        let _ = writeln!(out, "  Conflicting: {}", names.join(", "));
    }
    let _ = writeln!(out, "{}", result.recommendation);
}

pub fn format_ensemble_report(result: &EnsembleResult) -> String {
    let mut out = header("SIGNAL ENSEMBLE");
    write_ensemble_body(&mut out, result);
    out
}

pub fn format_parlay_report(report: &ParlayEnsembleReport) -> String {
    let mut out = header("PARLAY SIGNAL ENSEMBLE");
    for (i, leg) in report.legs.iter().enumerate() {
        let _ = writeln!(out, "--- Leg {} ---", i + 1);
        write_ensemble_body(&mut out, leg);
        let _ = writeln!(out);
    }

    let p = &report.parlay;
    let _ = writeln!(out, "Overall:     {} (score {:+.1})", p.consensus, p.overall_score);
    let _ = writeln!(out, "Fading legs: {}", p.fading_legs);
    if let Some(weakest) = p.weakest_leg {
        let _ = writeln!(out, "Weakest:     leg {} ({:+.1})", weakest.index + 1, weakest.score);
    }
    let _ = writeln!(out, "Risk:        {:?}", p.risk);
    let _ = writeln!(out, "{}", p.recommendation);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlay_risk_signals::{EngineKind, ParlayRisk, Recommendation};

    #[test]
    fn invalid_signals_are_dropped() {
        let mut bad = EngineSignal::new(EngineKind::Trend, Recommendation::Pick, 0.5).unwrap();
        bad.confidence = 1.7;
        let good = EngineSignal::new(EngineKind::Trend, Recommendation::Pick, 0.5).unwrap();
        assert_eq!(validated(vec![bad, good]).len(), 1);
    }

    #[test]
    fn parlay_report_flags_fading_leg() {
        let legs = vec![
            vec![EngineSignal::new(EngineKind::Model, Recommendation::Pick, 0.8).unwrap()],
            vec![EngineSignal::new(EngineKind::Injury, Recommendation::Fade, 0.3).unwrap()],
        ];
        let report = build_parlay_report(legs, &RiskConfig::default());

        assert_eq!(report.legs.len(), 2);
        assert_eq!(report.parlay.risk, ParlayRisk::High);
        let text = format_parlay_report(&report);
        assert!(text.contains("Leg 2"));
        assert!(text.contains("Fading legs: 1"));
    }

    #[test]
    fn empty_ensemble_report_mentions_insufficient_data() {
        let result = run_ensemble(&[], &RiskConfig::default().ensemble);
        let text = format_ensemble_report(&result).to_lowercase();
        assert!(text.contains("insufficient data"));
    }
}
