//! CLI commands for the parlay risk engine.

pub mod bankroll;
pub mod ensemble;
pub mod input;
pub mod output;
pub mod simulate;

pub use bankroll::{run_project, run_what_if, ProjectArgs, WhatIfArgs};
pub use ensemble::{run_ensemble_command, EnsembleArgs};
pub use output::OutputFormat;
pub use simulate::{
    run_compare, run_correlated, run_correlation, run_simulate, CompareArgs, CorrelatedArgs,
    CorrelationArgs, SimulateArgs,
};
