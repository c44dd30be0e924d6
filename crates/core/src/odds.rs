//! American odds conversion and the parlay value objects.
//!
//! A [`Leg`] is immutable once built: its implied probability is derived from
//! the American price at construction, and [`Leg::with_odds`] returns a new
//! leg rather than mutating the old one.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Lower bound applied to every simulated probability.
pub const MIN_PROBABILITY: f64 = 0.01;
/// Upper bound applied to every simulated probability.
pub const MAX_PROBABILITY: f64 = 0.95;

/// Converts American odds to the break-even (implied) probability.
///
/// `+150` → `100 / 250 = 0.40`, `-200` → `200 / 300 = 0.667`.
#[must_use]
pub fn american_to_implied(odds: i32) -> f64 {
    let odds = f64::from(odds);
    if odds > 0.0 {
        100.0 / (odds + 100.0)
    } else {
        let abs = odds.abs();
        abs / (abs + 100.0)
    }
}

/// Converts American odds to decimal odds (total return per unit staked).
#[must_use]
pub fn american_to_decimal(odds: i32) -> f64 {
    let odds = f64::from(odds);
    if odds > 0.0 {
        1.0 + odds / 100.0
    } else {
        1.0 + 100.0 / odds.abs()
    }
}

/// Converts decimal odds back to the nearest American price.
///
/// # Errors
/// Returns error if `decimal` is not finite or not greater than 1.0.
pub fn decimal_to_american(decimal: f64) -> Result<i32> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return Err(RiskError::InvalidDecimalOdds(decimal));
    }
    let american = if decimal >= 2.0 {
        (decimal - 1.0) * 100.0
    } else {
        -100.0 / (decimal - 1.0)
    };
    Ok(american.round() as i32)
}

fn validate_american(odds: i32) -> Result<()> {
    if odds > -100 && odds < 100 {
        return Err(RiskError::InvalidOdds(odds));
    }
    Ok(())
}

/// Market a leg is priced on. Used only to classify correlation between legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    Moneyline,
    Spread,
    Total,
    PlayerPoints,
    PlayerRebounds,
    PlayerAssists,
    PlayerThrees,
    PlayerPassingYards,
    PlayerRushingYards,
    PlayerReceivingYards,
    PlayerTouchdowns,
    Other,
}

impl MarketCategory {
    /// Returns true for player propositions that depend on points being scored.
    #[must_use]
    pub const fn is_scoring_prop(self) -> bool {
        matches!(
            self,
            Self::PlayerPoints
                | Self::PlayerThrees
                | Self::PlayerTouchdowns
                | Self::PlayerPassingYards
                | Self::PlayerRushingYards
                | Self::PlayerReceivingYards
        )
    }

    /// Returns true for game-level markets (moneyline, spread).
    #[must_use]
    pub const fn is_game_result(self) -> bool {
        matches!(self, Self::Moneyline | Self::Spread)
    }
}

/// One proposition within a parlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub description: String,
    pub american_odds: i32,
    pub implied_probability: f64,
    /// Game or event identifier shared by legs on the same contest.
    #[serde(default)]
    pub event: Option<String>,
    /// Player the proposition is about, if any.
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub category: Option<MarketCategory>,
}

impl Leg {
    /// Creates a leg from an American price.
    ///
    /// # Errors
    /// Returns error if `american_odds` lies strictly between -100 and +100.
    pub fn new(description: impl Into<String>, american_odds: i32) -> Result<Self> {
        validate_american(american_odds)?;
        Ok(Self {
            description: description.into(),
            american_odds,
            implied_probability: american_to_implied(american_odds),
            event: None,
            player: None,
            category: None,
        })
    }

    /// Creates a leg from a decimal price, rounding to the nearest American price.
    ///
    /// # Errors
    /// Returns error if `decimal_odds` is not finite or not greater than 1.0.
    pub fn from_decimal(description: impl Into<String>, decimal_odds: f64) -> Result<Self> {
        let american = decimal_to_american(decimal_odds)?;
        // decimal_to_american never lands strictly inside (-100, 100)
        Self::new(description, american)
    }

    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    #[must_use]
    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: MarketCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Returns a copy of this leg re-priced at `american_odds`.
    ///
    /// # Errors
    /// Returns error if the new price is invalid.
    pub fn with_odds(&self, american_odds: i32) -> Result<Self> {
        validate_american(american_odds)?;
        Ok(Self {
            american_odds,
            implied_probability: american_to_implied(american_odds),
            ..self.clone()
        })
    }

    /// Re-checks a leg that arrived through deserialization.
    ///
    /// Deserialized legs may carry a stale or hand-edited implied probability,
    /// so the probability is recomputed from the price.
    ///
    /// # Errors
    /// Returns error if the price is invalid.
    pub fn normalized(self) -> Result<Self> {
        validate_american(self.american_odds)?;
        Ok(Self {
            implied_probability: american_to_implied(self.american_odds),
            ..self
        })
    }

    #[must_use]
    pub fn decimal_odds(&self) -> f64 {
        american_to_decimal(self.american_odds)
    }

    #[must_use]
    pub const fn is_underdog(&self) -> bool {
        self.american_odds > 0
    }
}

/// An ordered set of legs with a stake, consumed once per simulation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlaySimulation {
    #[serde(default)]
    pub label: Option<String>,
    pub legs: Vec<Leg>,
    pub stake: Decimal,
    pub potential_payout: Decimal,
}

impl ParlaySimulation {
    /// Builds a parlay and prices its payout as `stake × Π decimal odds`.
    ///
    /// An empty leg list is accepted; it simulates to an empty result.
    ///
    /// # Errors
    /// Returns error if `stake` is not positive.
    pub fn new(legs: Vec<Leg>, stake: Decimal) -> Result<Self> {
        if stake <= Decimal::ZERO {
            return Err(RiskError::InvalidStake {
                name: "stake",
                value: stake.to_string(),
            });
        }
        let potential_payout = Self::price_payout(&legs, stake);
        Ok(Self {
            label: None,
            legs,
            stake,
            potential_payout,
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Re-checks a parlay that arrived through deserialization and reprices it.
    ///
    /// # Errors
    /// Returns error if any leg's price or the stake is invalid.
    pub fn normalized(self) -> Result<Self> {
        let legs = self
            .legs
            .into_iter()
            .map(Leg::normalized)
            .collect::<Result<Vec<_>>>()?;
        let parlay = Self::new(legs, self.stake)?;
        Ok(Self {
            label: self.label,
            ..parlay
        })
    }

    /// Combined decimal odds across all legs (1.0 for an empty parlay).
    #[must_use]
    pub fn combined_decimal_odds(&self) -> f64 {
        self.legs.iter().map(Leg::decimal_odds).product()
    }

    /// Profit if every leg hits.
    #[must_use]
    pub fn profit_if_won(&self) -> Decimal {
        self.potential_payout - self.stake
    }

    /// Product of implied probabilities, assuming independent legs.
    #[must_use]
    pub fn implied_win_probability(&self) -> f64 {
        self.legs.iter().map(|l| l.implied_probability).product()
    }

    /// Display label, falling back to the joined leg descriptions.
    #[must_use]
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self
                .legs
                .iter()
                .map(|l| l.description.as_str())
                .collect::<Vec<_>>()
                .join(" + "),
        }
    }

    fn price_payout(legs: &[Leg], stake: Decimal) -> Decimal {
        let combined: f64 = legs.iter().map(Leg::decimal_odds).product();
        let stake_f = stake.to_f64().unwrap_or(0.0);
        Decimal::from_f64(stake_f * combined)
            .unwrap_or(stake)
            .round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // ============================================
    // Conversion Tests
    // ============================================

    #[test]
    fn implied_from_plus_odds() {
        assert!((american_to_implied(150) - 0.40).abs() < 1e-12);
        assert!((american_to_implied(100) - 0.50).abs() < 1e-12);
    }

    #[test]
    fn implied_from_minus_odds() {
        assert!((american_to_implied(-200) - 2.0 / 3.0).abs() < 1e-12);
        assert!((american_to_implied(-110) - 110.0 / 210.0).abs() < 1e-12);
    }

    #[test]
    fn decimal_from_american() {
        assert!((american_to_decimal(150) - 2.5).abs() < 1e-12);
        assert!((american_to_decimal(-200) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn decimal_to_american_both_sides() {
        assert_eq!(decimal_to_american(2.5).unwrap(), 150);
        assert_eq!(decimal_to_american(1.5).unwrap(), -200);
        assert!(decimal_to_american(1.0).is_err());
        assert!(decimal_to_american(f64::NAN).is_err());
    }

    // ============================================
    // Leg Tests
    // ============================================

    #[test]
    fn leg_rejects_odds_inside_gap() {
        assert!(matches!(Leg::new("bad", 50), Err(RiskError::InvalidOdds(50))));
        assert!(Leg::new("bad", 0).is_err());
        assert!(Leg::new("bad", -99).is_err());
        assert!(Leg::new("ok", -100).is_ok());
    }

    #[test]
    fn leg_with_odds_recomputes_probability() {
        let leg = Leg::new("Lakers ML", 150).unwrap();
        let repriced = leg.with_odds(-150).unwrap();

        assert!((leg.implied_probability - 0.40).abs() < 1e-12);
        assert!((repriced.implied_probability - 0.60).abs() < 1e-12);
        assert_eq!(repriced.description, "Lakers ML");
    }

    #[test]
    fn leg_normalized_discards_stale_probability() {
        let mut leg = Leg::new("x", 150).unwrap();
        leg.implied_probability = 0.99;

        let fixed = leg.normalized().unwrap();
        assert!((fixed.implied_probability - 0.40).abs() < 1e-12);
    }

    #[test]
    fn leg_from_decimal_rounds_to_american() {
        let leg = Leg::from_decimal("x", 3.0).unwrap();
        assert_eq!(leg.american_odds, 200);
    }

    // ============================================
    // ParlaySimulation Tests
    // ============================================

    #[test]
    fn parlay_payout_is_stake_times_combined_odds() {
        let legs = vec![
            Leg::new("a", 150).unwrap(),
            Leg::new("b", 150).unwrap(),
            Leg::new("c", 150).unwrap(),
        ];
        let parlay = ParlaySimulation::new(legs, dec!(10)).unwrap();

        // 2.5^3 = 15.625
        assert_eq!(parlay.potential_payout, dec!(156.25));
        assert_eq!(parlay.profit_if_won(), dec!(146.25));
        assert!((parlay.implied_win_probability() - 0.064).abs() < 1e-9);
    }

    #[test]
    fn parlay_rejects_non_positive_stake() {
        assert!(ParlaySimulation::new(vec![], dec!(0)).is_err());
        assert!(ParlaySimulation::new(vec![], dec!(-5)).is_err());
    }

    #[test]
    fn empty_parlay_pays_stake_back() {
        let parlay = ParlaySimulation::new(vec![], dec!(25)).unwrap();
        assert_eq!(parlay.potential_payout, dec!(25));
    }

    #[test]
    fn display_label_joins_descriptions() {
        let legs = vec![Leg::new("A", 120).unwrap(), Leg::new("B", -130).unwrap()];
        let parlay = ParlaySimulation::new(legs, dec!(10)).unwrap();
        assert_eq!(parlay.display_label(), "A + B");
        assert_eq!(parlay.with_label("Sunday").display_label(), "Sunday");
    }

    #[test]
    fn parlay_deserializes_and_normalizes() {
        let json = r#"{
            "legs": [
                {"description": "Over 220.5", "american_odds": -110, "implied_probability": 0.0,
                 "event": "LAL@BOS", "category": "total"}
            ],
            "stake": "10",
            "potential_payout": "0"
        }"#;
        let parlay: ParlaySimulation = serde_json::from_str(json).unwrap();
        let parlay = parlay.normalized().unwrap();

        assert_eq!(parlay.legs[0].category, Some(MarketCategory::Total));
        assert!(parlay.legs[0].implied_probability > 0.5);
        assert_eq!(parlay.potential_payout, dec!(19.09));
    }
}
