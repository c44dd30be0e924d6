pub mod config;
pub mod config_loader;
pub mod error;
pub mod kelly;
pub mod odds;
pub mod signal;
pub mod stats;

pub use config::{
    BankrollSettings, CorrelationConfig, EngineWeight, EngineWeights, MonteCarloSettings,
    RiskConfig, UpsetFactors,
};
pub use config_loader::ConfigLoader;
pub use error::{Result, RiskError};
pub use kelly::{kelly_fraction, BetDecision, BetReason, KellySizer};
pub use odds::{
    american_to_decimal, american_to_implied, decimal_to_american, Leg, MarketCategory,
    ParlaySimulation, MAX_PROBABILITY, MIN_PROBABILITY,
};
pub use signal::{EngineKind, EngineSignal, Recommendation};
pub use stats::{clamp_probability, mean_std, percentile_linear, standard_normal_cdf, wilson_ci};
