use thiserror::Error;

/// Errors raised when caller-supplied inputs cannot be simulated.
///
/// Degenerate sizes (no legs, no signals, zero iterations) are not errors;
/// they produce neutral results. These variants cover values that would
/// otherwise push NaN or nonsense through the trial statistics.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("invalid American odds {0}: must be <= -100 or >= +100")]
    InvalidOdds(i32),

    #[error("invalid decimal odds {0}: must be finite and greater than 1.0")]
    InvalidDecimalOdds(f64),

    #[error("{name} must be a finite probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    InvalidStake { name: &'static str, value: String },

    #[error("confidence must be in [0.0, 1.0], got {0}")]
    InvalidConfidence(f64),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

pub type Result<T> = std::result::Result<T, RiskError>;

impl From<figment::Error> for RiskError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
