//! Directional opinions produced by independent analysis engines.
//!
//! Each engine looks at one slice of domain data (line movement, hit rates,
//! sharp money, ...) and emits an [`EngineSignal`] saying whether a leg
//! should be picked or faded. The ensemble crate fuses these into a consensus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RiskError};

/// Direction of an engine's opinion on a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Back the leg.
    Pick,
    /// Bet against (or avoid) the leg.
    Fade,
    /// No directional bias.
    Neutral,
}

impl Recommendation {
    /// Signed unit score: pick = +1, fade = -1, neutral = 0.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Pick => 1.0,
            Self::Fade => -1.0,
            Self::Neutral => 0.0,
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Pick => Self::Fade,
            Self::Fade => Self::Pick,
            Self::Neutral => Self::Neutral,
        }
    }

    /// Returns true if this recommendation has a directional bias.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        !matches!(self, Self::Neutral)
    }
}

/// Known analysis engines.
///
/// Names that do not match a known engine parse to [`EngineKind::Unknown`],
/// which carries the original name and is weighted with the unknown-source
/// fallback rather than silently dropping to zero weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineKind {
    LineMovement,
    SharpMoney,
    HitRate,
    Matchup,
    Trend,
    Injury,
    PublicFade,
    Weather,
    Model,
    Unknown(String),
}

impl EngineKind {
    /// All known engines, in display order.
    pub const KNOWN: [EngineKind; 9] = [
        Self::LineMovement,
        Self::SharpMoney,
        Self::HitRate,
        Self::Matchup,
        Self::Trend,
        Self::Injury,
        Self::PublicFade,
        Self::Weather,
        Self::Model,
    ];

    /// Canonical snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LineMovement => "line_movement",
            Self::SharpMoney => "sharp_money",
            Self::HitRate => "hit_rate",
            Self::Matchup => "matchup",
            Self::Trend => "trend",
            Self::Injury => "injury",
            Self::PublicFade => "public_fade",
            Self::Weather => "weather",
            Self::Model => "model",
            Self::Unknown(name) => name.as_str(),
        }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl FromStr for EngineKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let kind = Self::KNOWN
            .iter()
            .find(|k| k.as_str() == normalized)
            .cloned()
            .unwrap_or_else(|| Self::Unknown(s.trim().to_string()));
        Ok(kind)
    }
}

impl From<String> for EngineKind {
    fn from(name: String) -> Self {
        match name.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<EngineKind> for String {
    fn from(kind: EngineKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One engine's opinion on a leg or event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSignal {
    pub engine: EngineKind,
    pub recommendation: Recommendation,
    /// Confidence from 0.0 to 1.0
    pub confidence: f64,
    /// Fraction of past calls this engine got right, if tracked.
    #[serde(default)]
    pub historical_accuracy: Option<f64>,
    /// Number of past calls backing `historical_accuracy`.
    #[serde(default)]
    pub sample_size: Option<u32>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl EngineSignal {
    /// Creates a new signal with validation.
    ///
    /// # Errors
    /// Returns error if confidence is NaN or outside [0.0, 1.0].
    pub fn new(engine: EngineKind, recommendation: Recommendation, confidence: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RiskError::InvalidConfidence(confidence));
        }
        Ok(Self {
            engine,
            recommendation,
            confidence,
            historical_accuracy: None,
            sample_size: None,
            reasoning: None,
        })
    }

    /// Creates a neutral signal with zero confidence.
    #[must_use]
    pub fn neutral(engine: EngineKind) -> Self {
        Self {
            engine,
            recommendation: Recommendation::Neutral,
            confidence: 0.0,
            historical_accuracy: None,
            sample_size: None,
            reasoning: None,
        }
    }

    /// Attaches the engine's track record.
    ///
    /// # Errors
    /// Returns error if accuracy is NaN or outside [0.0, 1.0].
    pub fn with_track_record(mut self, accuracy: f64, sample_size: u32) -> Result<Self> {
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(RiskError::InvalidProbability {
                name: "historical_accuracy",
                value: accuracy,
            });
        }
        self.historical_accuracy = Some(accuracy);
        self.sample_size = Some(sample_size);
        Ok(self)
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Re-checks a signal that arrived through deserialization.
    ///
    /// # Errors
    /// Returns error if confidence or accuracy is NaN or out of range.
    pub fn validated(self) -> Result<Self> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(RiskError::InvalidConfidence(self.confidence));
        }
        if let Some(accuracy) = self.historical_accuracy {
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(RiskError::InvalidProbability {
                    name: "historical_accuracy",
                    value: accuracy,
                });
            }
        }
        Ok(self)
    }

    /// Signed score: `+confidence` for pick, `-confidence` for fade, 0 for neutral.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.recommendation.sign() * self.confidence
    }
}
