//! Signal generators that turn raw leg records into engine signals.

mod hit_rate;
mod line_movement;

use parlay_risk_core::{EngineKind, EngineSignal, Result};

pub use hit_rate::{hit_rate_signal, HitRateConfig, HitRateRecord};
pub use line_movement::{line_movement_signal, LineMovementConfig, LineMovementRecord};

/// A record that can produce one engine's opinion on a leg.
pub trait SignalGenerator {
    /// Engine this generator speaks for.
    fn engine(&self) -> EngineKind;

    /// Builds the signal.
    ///
    /// # Errors
    /// Returns error if the record holds values that cannot be scored.
    fn generate(&self) -> Result<EngineSignal>;
}

/// Runs every generator, keeping the signals that could be built.
///
/// Records that fail validation are logged and skipped so one bad record
/// does not discard the rest of a leg's evidence.
pub fn collect_signals(generators: &[&dyn SignalGenerator]) -> Vec<EngineSignal> {
    generators
        .iter()
        .filter_map(|g| match g.generate() {
            Ok(signal) => Some(signal),
            Err(e) => {
                tracing::warn!(engine = %g.engine(), error = %e, "Skipping invalid signal record");
                None
            }
        })
        .collect()
}
