//! Signal ensemble for parlay legs.
//!
//! Independent analysis engines each emit an [`EngineSignal`]. This crate
//! weights them by engine importance and track record, fuses them into one
//! consensus per leg, and rolls per-leg consensuses up into a parlay verdict.

pub mod ensemble;
pub mod generator;
pub mod parlay;

pub use ensemble::{
    run_ensemble, signal_weight, ConsensusBucket, EnsembleResult, RiskLevel, SignalContribution,
};
pub use generator::{
    collect_signals, hit_rate_signal, line_movement_signal, HitRateConfig, HitRateRecord,
    LineMovementConfig, LineMovementRecord, SignalGenerator,
};
pub use parlay::{aggregate_parlay_ensemble, LegScore, ParlayEnsembleResult, ParlayRisk};

// Engine identifiers and the weight preset live in core so the config layer can load them
pub use parlay_risk_core::{EngineKind, EngineSignal, EngineWeight, EngineWeights, Recommendation};
