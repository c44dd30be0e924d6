//! Kelly Criterion implementation for decimal-odds bet sizing.
//!
//! Provides optimal stake sizing for a single wager with known payout using
//! the Kelly Criterion with fractional Kelly and safety constraints.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Full Kelly fraction for a wager at `decimal_odds` won with probability `win_prob`.
///
/// ```text
/// f* = (b·p − q) / b
/// where b = decimal_odds − 1 (net odds), q = 1 − p
/// ```
///
/// Floored at 0: a proposition without positive edge is never staked.
/// Returns 0 for non-finite inputs or odds at or below 1.0.
#[must_use]
pub fn kelly_fraction(win_prob: f64, decimal_odds: f64) -> f64 {
    if !win_prob.is_finite() || !decimal_odds.is_finite() || decimal_odds <= 1.0 {
        return 0.0;
    }
    let p = win_prob.clamp(0.0, 1.0);
    let b = decimal_odds - 1.0;
    let q = 1.0 - p;
    ((b * p - q) / b).max(0.0)
}

/// Kelly Criterion stake sizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellySizer {
    /// Fraction of Kelly to use (0.25 = quarter Kelly)
    pub fraction: Decimal,
    /// Maximum stake in absolute terms
    pub max_bet: Decimal,
    /// Minimum expected value per unit staked required to bet
    pub min_edge: Decimal,
}

impl Default for KellySizer {
    fn default() -> Self {
        Self {
            fraction: Decimal::new(25, 2),  // 0.25 (quarter Kelly)
            max_bet: Decimal::new(1000, 0), // $1000
            min_edge: Decimal::new(1, 2),   // 0.01 (1% minimum edge)
        }
    }
}

/// Result of Kelly stake sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetDecision {
    /// Whether to place a bet
    pub should_bet: bool,
    /// Recommended stake amount
    pub stake: Decimal,
    /// Full Kelly fraction (before applying fractional Kelly)
    pub full_kelly_fraction: f64,
    /// Expected profit per unit staked
    pub expected_value: f64,
    /// Reason for the decision
    pub reason: BetReason,
}

/// Reason for a bet decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetReason {
    /// Bet placed - positive edge found
    PositiveEdge,
    /// No bet - edge below minimum threshold
    InsufficientEdge,
    /// No bet - expected value is zero or negative
    NegativeEv,
    /// No bet - invalid inputs
    InvalidInputs,
}

impl BetDecision {
    fn no_bet(reason: BetReason, full_kelly_fraction: f64, expected_value: f64) -> Self {
        Self {
            should_bet: false,
            stake: Decimal::ZERO,
            full_kelly_fraction,
            expected_value,
            reason,
        }
    }
}

impl KellySizer {
    /// Creates a new KellySizer with custom parameters.
    #[must_use]
    pub fn new(fraction: Decimal, max_bet: Decimal, min_edge: Decimal) -> Self {
        Self {
            fraction,
            max_bet,
            min_edge,
        }
    }

    /// Calculates the stake using fractional Kelly.
    ///
    /// # Arguments
    /// * `win_prob` - Estimated probability of winning (0 to 1)
    /// * `decimal_odds` - Total return per unit staked (2.0 = even money)
    /// * `bankroll` - Current bankroll to size the bet against
    ///
    /// # Examples
    /// ```
    /// use parlay_risk_core::kelly::KellySizer;
    /// use rust_decimal_macros::dec;
    ///
    /// let sizer = KellySizer::default();
    /// let decision = sizer.size(0.6, 2.0, dec!(10000));
    ///
    /// // 60% at even money = positive edge
    /// assert!(decision.should_bet);
    /// assert!(decision.stake > dec!(0));
    /// ```
    #[must_use]
    pub fn size(&self, win_prob: f64, decimal_odds: f64, bankroll: Decimal) -> BetDecision {
        if !(0.0..=1.0).contains(&win_prob)
            || !decimal_odds.is_finite()
            || decimal_odds <= 1.0
            || bankroll <= Decimal::ZERO
        {
            return BetDecision::no_bet(BetReason::InvalidInputs, 0.0, 0.0);
        }

        let ev = Self::expected_value(win_prob, decimal_odds);
        if ev <= 0.0 {
            return BetDecision::no_bet(BetReason::NegativeEv, 0.0, ev);
        }

        let full_kelly = kelly_fraction(win_prob, decimal_odds);
        let min_edge = self.min_edge.to_f64().unwrap_or(0.0);
        // Small tolerance so an edge exactly at the threshold still bets
        if ev + 1e-12 < min_edge {
            return BetDecision::no_bet(BetReason::InsufficientEdge, full_kelly, ev);
        }

        let fractional = Decimal::from_f64(full_kelly).unwrap_or(Decimal::ZERO) * self.fraction;
        let stake = (bankroll * fractional)
            .min(self.max_bet)
            .max(Decimal::ZERO)
            .round_dp(2);

        BetDecision {
            should_bet: stake > Decimal::ZERO,
            stake,
            full_kelly_fraction: full_kelly,
            expected_value: ev,
            reason: BetReason::PositiveEdge,
        }
    }

    /// Expected profit per unit staked.
    ///
    /// EV = p · (d − 1) − (1 − p)
    #[must_use]
    pub fn expected_value(win_prob: f64, decimal_odds: f64) -> f64 {
        if !decimal_odds.is_finite() || decimal_odds <= 1.0 {
            return 0.0;
        }
        win_prob * (decimal_odds - 1.0) - (1.0 - win_prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // ============================================
    // kelly_fraction Tests
    // ============================================

    #[test]
    fn kelly_fraction_even_money_edge() {
        // b = 1, p = 0.55: f* = (0.55 - 0.45) / 1 = 0.10
        assert!((kelly_fraction(0.55, 2.0) - 0.10).abs() < 1e-12);
    }

    #[test]
    fn kelly_fraction_plus_odds() {
        // b = 1.5, p = 0.5: f* = (0.75 - 0.5) / 1.5 = 0.1667
        assert!((kelly_fraction(0.5, 2.5) - 0.25 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn kelly_fraction_zero_without_edge() {
        assert!(kelly_fraction(0.5, 2.0).abs() < f64::EPSILON);
        assert!(kelly_fraction(0.4, 2.0).abs() < f64::EPSILON);
        // b·p = 0.5 * 0.9 = 0.45 < q = 0.5
        assert!(kelly_fraction(0.5, 1.9).abs() < f64::EPSILON);
    }

    #[test]
    fn kelly_fraction_zero_on_bad_inputs() {
        assert!(kelly_fraction(f64::NAN, 2.0).abs() < f64::EPSILON);
        assert!(kelly_fraction(0.6, 1.0).abs() < f64::EPSILON);
        assert!(kelly_fraction(0.6, f64::INFINITY).abs() < f64::EPSILON);
    }

    // ============================================
    // KellySizer Tests
    // ============================================

    #[test]
    fn sizer_positive_bet_full_kelly() {
        let sizer = KellySizer::new(dec!(1.0), dec!(10000), dec!(0.01));
        let decision = sizer.size(0.6, 2.0, dec!(10000));

        // f* = 0.2, stake = 2000
        assert!(decision.should_bet);
        assert_eq!(decision.reason, BetReason::PositiveEdge);
        assert!((decision.full_kelly_fraction - 0.2).abs() < 1e-9);
        assert!((decision.stake - dec!(2000)).abs() < dec!(0.01));
    }

    #[test]
    fn sizer_quarter_fraction_reduces_bet() {
        let full = KellySizer::new(dec!(1.0), dec!(100000), dec!(0.01));
        let quarter = KellySizer::new(dec!(0.25), dec!(100000), dec!(0.01));

        let full_decision = full.size(0.7, 2.0, dec!(10000));
        let quarter_decision = quarter.size(0.7, 2.0, dec!(10000));

        assert!((quarter_decision.stake - full_decision.stake * dec!(0.25)).abs() < dec!(0.01));
    }

    #[test]
    fn sizer_respects_max_bet_cap() {
        let sizer = KellySizer::new(dec!(1.0), dec!(500), dec!(0.01));
        let decision = sizer.size(0.7, 2.0, dec!(10000));

        assert_eq!(decision.stake, dec!(500));
    }

    #[test]
    fn sizer_no_bet_on_negative_ev() {
        let sizer = KellySizer::default();
        let decision = sizer.size(0.4, 2.0, dec!(10000));

        assert!(!decision.should_bet);
        assert_eq!(decision.reason, BetReason::NegativeEv);
        assert!(decision.expected_value < 0.0);
    }

    #[test]
    fn sizer_no_bet_below_min_edge() {
        let sizer = KellySizer::new(dec!(0.25), dec!(1000), dec!(0.05));
        // EV = 0.51 - 0.49 = 0.02
        let decision = sizer.size(0.51, 2.0, dec!(10000));

        assert!(!decision.should_bet);
        assert_eq!(decision.reason, BetReason::InsufficientEdge);
    }

    #[test]
    fn sizer_invalid_inputs() {
        let sizer = KellySizer::default();
        assert_eq!(sizer.size(1.1, 2.0, dec!(100)).reason, BetReason::InvalidInputs);
        assert_eq!(sizer.size(f64::NAN, 2.0, dec!(100)).reason, BetReason::InvalidInputs);
        assert_eq!(sizer.size(0.6, 0.9, dec!(100)).reason, BetReason::InvalidInputs);
        assert_eq!(sizer.size(0.6, 2.0, dec!(0)).reason, BetReason::InvalidInputs);
    }

    #[test]
    fn expected_value_matches_formula() {
        // p=0.6, d=2.0: 0.6 - 0.4 = 0.2
        assert!((KellySizer::expected_value(0.6, 2.0) - 0.2).abs() < 1e-12);
        // p=0.4, d=2.5: 0.6 - 0.6 = 0
        assert!(KellySizer::expected_value(0.4, 2.5).abs() < 1e-12);
    }

    #[test]
    fn kelly_default_has_quarter_fraction() {
        let sizer = KellySizer::default();
        assert_eq!(sizer.fraction, dec!(0.25));
        assert_eq!(sizer.max_bet, dec!(1000));
    }
}
