//! Pairwise leg correlation and correlated sampling.
//!
//! Legs on the same game or the same player do not resolve independently.
//! This module classifies each leg pair, assigns a heuristic coefficient from
//! [`CorrelationConfig`], and turns the resulting matrix into a Cholesky
//! factor that maps independent normals onto correlated uniforms.

use parlay_risk_core::{standard_normal_cdf, CorrelationConfig, Leg, MarketCategory};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Pivots at or below this are treated as a failed decomposition.
const PIVOT_EPSILON: f64 = 1e-10;

/// Relationship between two legs that drives their coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    /// Multiple props on the same player.
    SamePlayer,
    /// Moneyline and spread on the same game.
    GameOutcome,
    /// Same game, statistically linked markets (total with a scoring prop,
    /// passing yards with receiving yards).
    LinkedStats,
    /// Same game, no specific linkage.
    SameGame,
    Unrelated,
}

impl CorrelationType {
    /// Classifies a leg pair from its event, player and market metadata.
    #[must_use]
    pub fn classify(a: &Leg, b: &Leg) -> Self {
        let same_event = matches_ignore_case(a.event.as_deref(), b.event.as_deref());
        let same_player = matches_ignore_case(a.player.as_deref(), b.player.as_deref());
        let event_unknown = a.event.is_none() || b.event.is_none();

        if same_player && (same_event || event_unknown) {
            return Self::SamePlayer;
        }
        if !same_event {
            return Self::Unrelated;
        }

        match (a.category, b.category) {
            (Some(x), Some(y)) if x.is_game_result() && y.is_game_result() && x != y => {
                Self::GameOutcome
            }
            (Some(MarketCategory::Total), Some(y)) | (Some(y), Some(MarketCategory::Total))
                if y.is_scoring_prop() =>
            {
                Self::LinkedStats
            }
            (Some(MarketCategory::PlayerPassingYards), Some(MarketCategory::PlayerReceivingYards))
            | (Some(MarketCategory::PlayerReceivingYards), Some(MarketCategory::PlayerPassingYards)) => {
                Self::LinkedStats
            }
            _ => Self::SameGame,
        }
    }

    #[must_use]
    pub fn coefficient(self, config: &CorrelationConfig) -> f64 {
        let value = match self {
            Self::SamePlayer => config.same_player,
            Self::GameOutcome => config.game_outcome,
            Self::LinkedStats => config.linked_stats,
            Self::SameGame => config.same_game,
            Self::Unrelated => config.unrelated,
        };
        value.clamp(-1.0, 1.0)
    }
}

fn matches_ignore_case(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    }
}

/// One classified off-diagonal entry (upper triangle, `i < j`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub i: usize,
    pub j: usize,
    pub kind: CorrelationType,
    pub coefficient: f64,
}

/// Symmetric correlation matrix with unit diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    values: Vec<Vec<f64>>,
    /// Mean of the upper-triangle entries (0.0 with fewer than two legs).
    pub average_correlation: f64,
    /// True if any |off-diagonal| exceeds the configured threshold.
    pub has_high_correlation: bool,
    /// Classification behind each entry; empty for caller-supplied matrices.
    pub pairs: Vec<CorrelationPair>,
}

impl CorrelationMatrix {
    /// Identity matrix: every leg independent.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        let values = (0..size)
            .map(|i| (0..size).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self {
            values,
            average_correlation: 0.0,
            has_high_correlation: false,
            pairs: Vec::new(),
        }
    }

    /// Builds a matrix from caller-supplied rows.
    ///
    /// The upper triangle is authoritative: it is mirrored into the lower
    /// triangle, values are clamped to [-1, 1], non-finite entries become 0,
    /// and the diagonal is forced to exactly 1. Missing entries in short
    /// rows are treated as 0.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>], high_threshold: f64) -> Self {
        let size = rows.len();
        let mut matrix = Self::identity(size);
        for i in 0..size {
            for j in (i + 1)..size {
                let raw = rows[i].get(j).copied().unwrap_or(0.0);
                let value = if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 };
                matrix.values[i][j] = value;
                matrix.values[j][i] = value;
            }
        }
        matrix.refresh_summary(high_threshold);
        matrix
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// True when every off-diagonal entry is zero.
    #[must_use]
    pub fn is_independent(&self) -> bool {
        self.upper_triangle().all(|v| v.abs() < f64::EPSILON)
    }

    fn upper_triangle(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.size();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| self.values[i][j]))
    }

    fn refresh_summary(&mut self, high_threshold: f64) {
        let n = self.size();
        let pair_count = n * n.saturating_sub(1) / 2;
        let sum: f64 = self.upper_triangle().sum();
        let high = self.upper_triangle().any(|v| v.abs() > high_threshold);
        self.average_correlation = if pair_count == 0 { 0.0 } else { sum / pair_count as f64 };
        self.has_high_correlation = high;
    }
}

/// Estimates the pairwise correlation matrix for a leg set.
///
/// Deterministic: the same legs and config always give the same matrix.
#[must_use]
pub fn build_correlation_matrix(legs: &[Leg], config: &CorrelationConfig) -> CorrelationMatrix {
    let mut matrix = CorrelationMatrix::identity(legs.len());

    for i in 0..legs.len() {
        for j in (i + 1)..legs.len() {
            let kind = CorrelationType::classify(&legs[i], &legs[j]);
            let coefficient = kind.coefficient(config);
            matrix.values[i][j] = coefficient;
            matrix.values[j][i] = coefficient;
            matrix.pairs.push(CorrelationPair {
                i,
                j,
                kind,
                coefficient,
            });
        }
    }

    matrix.refresh_summary(config.high_correlation_threshold);
    debug!(
        legs = legs.len(),
        average = matrix.average_correlation,
        high = matrix.has_high_correlation,
        "Built correlation matrix"
    );
    matrix
}

/// Lower-triangular factor `L` with `L·Lᵀ` equal to the (possibly shrunk)
/// correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CholeskyFactor {
    lower: Vec<Vec<f64>>,
    /// Shrinkage λ that made the decomposition succeed (0.0 if none was needed).
    pub ridge: f64,
    /// True when every attempt failed and the factor is the identity.
    pub is_fallback: bool,
}

impl CholeskyFactor {
    #[must_use]
    pub fn identity(size: usize) -> Self {
        let lower = (0..size)
            .map(|i| (0..size).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self {
            lower,
            ridge: 0.0,
            is_fallback: false,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.lower.len()
    }

    #[must_use]
    pub fn lower(&self) -> &[Vec<f64>] {
        &self.lower
    }

    /// Fills `out` with correlated uniforms, using `normals` as scratch space.
    ///
    /// Both buffers must already be sized to the factor.
    pub fn fill_uniforms<R: Rng + ?Sized>(&self, rng: &mut R, normals: &mut [f64], out: &mut [f64]) {
        for z in normals.iter_mut() {
            *z = rng.sample(StandardNormal);
        }
        for (i, row) in self.lower.iter().enumerate() {
            let correlated: f64 = row[..=i]
                .iter()
                .zip(normals.iter())
                .map(|(l, z)| l * z)
                .sum();
            out[i] = standard_normal_cdf(correlated);
        }
    }
}

/// Plain Cholesky on `(R + λI) / (1 + λ)`. Returns `None` on a non-positive pivot.
fn try_cholesky(matrix: &CorrelationMatrix, ridge: f64) -> Option<Vec<Vec<f64>>> {
    let n = matrix.size();
    let scale = 1.0 / (1.0 + ridge);
    let entry = |i: usize, j: usize| {
        if i == j {
            1.0
        } else {
            matrix.get(i, j) * scale
        }
    };

    let mut lower = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let partial: f64 = (0..j).map(|k| lower[i][k] * lower[j][k]).sum();
            let value = entry(i, j) - partial;
            if i == j {
                if value <= PIVOT_EPSILON || !value.is_finite() {
                    return None;
                }
                lower[i][i] = value.sqrt();
            } else {
                lower[i][j] = value / lower[j][j];
            }
        }
    }
    Some(lower)
}

/// Decomposes a correlation matrix for correlated sampling. Never fails.
///
/// A matrix that is not positive definite (common when heuristic pairwise
/// coefficients are mutually inconsistent) is shrunk toward the identity,
/// `(R + λI) / (1 + λ)`, with λ growing by `ridge_step` per attempt. The unit
/// diagonal is preserved so marginal hit rates are unchanged. After
/// `max_ridge_attempts` failures the identity factor is returned and legs
/// are sampled independently.
#[must_use]
pub fn cholesky_decomposition(
    matrix: &CorrelationMatrix,
    config: &CorrelationConfig,
) -> CholeskyFactor {
    if let Some(lower) = try_cholesky(matrix, 0.0) {
        return CholeskyFactor {
            lower,
            ridge: 0.0,
            is_fallback: false,
        };
    }

    for attempt in 1..=config.max_ridge_attempts {
        let ridge = config.ridge_step * f64::from(attempt);
        debug!(attempt, ridge, "Correlation matrix not positive definite, regularizing");
        if let Some(lower) = try_cholesky(matrix, ridge) {
            return CholeskyFactor {
                lower,
                ridge,
                is_fallback: false,
            };
        }
    }

    warn!(
        legs = matrix.size(),
        attempts = config.max_ridge_attempts,
        "Correlation matrix could not be regularized, sampling legs independently"
    );
    CholeskyFactor {
        is_fallback: true,
        ..CholeskyFactor::identity(matrix.size())
    }
}

/// Draws one vector of correlated uniforms in [0, 1], one per leg.
#[must_use]
pub fn generate_correlated_uniform<R: Rng + ?Sized>(factor: &CholeskyFactor, rng: &mut R) -> Vec<f64> {
    let n = factor.size();
    let mut normals = vec![0.0; n];
    let mut out = vec![0.0; n];
    factor.fill_uniforms(rng, &mut normals, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn leg(odds: i32) -> Leg {
        Leg::new("leg", odds).unwrap()
    }

    fn game_leg(event: &str, category: MarketCategory) -> Leg {
        leg(-110).with_event(event).with_category(category)
    }

    fn player_leg(event: &str, player: &str, category: MarketCategory) -> Leg {
        game_leg(event, category).with_player(player)
    }

    // ============================================================
    // Classification Tests
    // ============================================================

    #[test]
    fn classify_unrelated_without_metadata() {
        assert_eq!(CorrelationType::classify(&leg(150), &leg(-120)), CorrelationType::Unrelated);
    }

    #[test]
    fn classify_same_player_props() {
        let a = player_leg("LAL@BOS", "LeBron James", MarketCategory::PlayerPoints);
        let b = player_leg("lal@bos", "lebron james", MarketCategory::PlayerAssists);
        assert_eq!(CorrelationType::classify(&a, &b), CorrelationType::SamePlayer);
    }

    #[test]
    fn classify_same_player_different_games_is_unrelated() {
        let a = player_leg("LAL@BOS", "LeBron James", MarketCategory::PlayerPoints);
        let b = player_leg("LAL@NYK", "LeBron James", MarketCategory::PlayerPoints);
        assert_eq!(CorrelationType::classify(&a, &b), CorrelationType::Unrelated);
    }

    #[test]
    fn classify_moneyline_and_spread_as_game_outcome() {
        let a = game_leg("KC@BUF", MarketCategory::Moneyline);
        let b = game_leg("KC@BUF", MarketCategory::Spread);
        assert_eq!(CorrelationType::classify(&a, &b), CorrelationType::GameOutcome);
    }

    #[test]
    fn classify_total_with_scoring_prop_as_linked() {
        let a = game_leg("KC@BUF", MarketCategory::Total);
        let b = player_leg("KC@BUF", "Josh Allen", MarketCategory::PlayerPassingYards);
        assert_eq!(CorrelationType::classify(&a, &b), CorrelationType::LinkedStats);
        assert_eq!(CorrelationType::classify(&b, &a), CorrelationType::LinkedStats);
    }

    #[test]
    fn classify_qb_and_receiver_yards_as_linked() {
        let a = player_leg("KC@BUF", "Mahomes", MarketCategory::PlayerPassingYards);
        let b = player_leg("KC@BUF", "Kelce", MarketCategory::PlayerReceivingYards);
        assert_eq!(CorrelationType::classify(&a, &b), CorrelationType::LinkedStats);
    }

    #[test]
    fn classify_other_same_game_pairs() {
        let a = game_leg("KC@BUF", MarketCategory::Moneyline);
        let b = player_leg("KC@BUF", "Kelce", MarketCategory::PlayerRebounds);
        assert_eq!(CorrelationType::classify(&a, &b), CorrelationType::SameGame);
    }

    // ============================================================
    // build_correlation_matrix Tests
    // ============================================================

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let legs = vec![
            game_leg("KC@BUF", MarketCategory::Moneyline),
            game_leg("KC@BUF", MarketCategory::Spread),
            game_leg("KC@BUF", MarketCategory::Total),
            leg(200),
        ];
        let matrix = build_correlation_matrix(&legs, &CorrelationConfig::default());

        assert_eq!(matrix.size(), 4);
        for i in 0..4 {
            assert!((matrix.get(i, i) - 1.0).abs() < f64::EPSILON);
            for j in 0..4 {
                assert!((matrix.get(i, j) - matrix.get(j, i)).abs() < f64::EPSILON);
            }
        }
        assert!((matrix.get(0, 1) - 0.80).abs() < f64::EPSILON);
        assert!((matrix.get(0, 2) - 0.15).abs() < f64::EPSILON);
        assert!(matrix.get(0, 3).abs() < f64::EPSILON);
        assert_eq!(matrix.pairs.len(), 6);
    }

    #[test]
    fn matrix_summary_stats() {
        let legs = vec![
            game_leg("KC@BUF", MarketCategory::Moneyline),
            game_leg("KC@BUF", MarketCategory::Spread),
            leg(200),
        ];
        let matrix = build_correlation_matrix(&legs, &CorrelationConfig::default());

        // pairs: 0.8, 0.0, 0.0
        assert!((matrix.average_correlation - 0.8 / 3.0).abs() < 1e-12);
        assert!(matrix.has_high_correlation);
    }

    #[test]
    fn matrix_without_links_is_not_high() {
        let matrix = build_correlation_matrix(&[leg(150), leg(150)], &CorrelationConfig::default());
        assert!(!matrix.has_high_correlation);
        assert!(matrix.is_independent());
    }

    #[test]
    fn matrix_degenerate_sizes() {
        let config = CorrelationConfig::default();
        assert_eq!(build_correlation_matrix(&[], &config).size(), 0);
        let single = build_correlation_matrix(&[leg(100)], &config);
        assert_eq!(single.size(), 1);
        assert!(single.average_correlation.abs() < f64::EPSILON);
    }

    #[test]
    fn from_rows_symmetrizes_and_fixes_diagonal() {
        let rows = vec![vec![0.3, 0.5], vec![0.9, 7.0]];
        let matrix = CorrelationMatrix::from_rows(&rows, 0.3);

        assert!((matrix.get(0, 0) - 1.0).abs() < f64::EPSILON);
        assert!((matrix.get(1, 1) - 1.0).abs() < f64::EPSILON);
        assert!((matrix.get(1, 0) - 0.5).abs() < f64::EPSILON);
        assert!(matrix.has_high_correlation);
    }

    #[test]
    fn from_rows_clamps_and_drops_nan() {
        let rows = vec![vec![1.0, 1.7, f64::NAN], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        let matrix = CorrelationMatrix::from_rows(&rows, 0.3);
        assert!((matrix.get(0, 1) - 1.0).abs() < f64::EPSILON);
        assert!(matrix.get(0, 2).abs() < f64::EPSILON);
    }

    // ============================================================
    // cholesky_decomposition Tests
    // ============================================================

    fn reconstruct(factor: &CholeskyFactor) -> Vec<Vec<f64>> {
        let l = factor.lower();
        let n = l.len();
        (0..n)
            .map(|i| (0..n).map(|j| (0..n).map(|k| l[i][k] * l[j][k]).sum()).collect())
            .collect()
    }

    #[test]
    fn cholesky_reconstructs_positive_definite_matrix() {
        let rows = vec![vec![1.0, 0.5, 0.2], vec![0.5, 1.0, 0.3], vec![0.2, 0.3, 1.0]];
        let matrix = CorrelationMatrix::from_rows(&rows, 0.3);
        let factor = cholesky_decomposition(&matrix, &CorrelationConfig::default());

        assert!(factor.ridge.abs() < f64::EPSILON);
        assert!(!factor.is_fallback);
        let product = reconstruct(&factor);
        for i in 0..3 {
            for j in 0..3 {
                assert!((product[i][j] - rows[i][j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn cholesky_factor_is_lower_triangular() {
        let rows = vec![vec![1.0, 0.4], vec![0.4, 1.0]];
        let factor =
            cholesky_decomposition(&CorrelationMatrix::from_rows(&rows, 0.3), &CorrelationConfig::default());
        assert!(factor.lower()[0][1].abs() < f64::EPSILON);
    }

    #[test]
    fn cholesky_regularizes_inconsistent_matrix() {
        // A~B and B~C strongly, A and C independent: not positive definite
        let rows = vec![vec![1.0, 0.8, 0.0], vec![0.8, 1.0, 0.8], vec![0.0, 0.8, 1.0]];
        let matrix = CorrelationMatrix::from_rows(&rows, 0.3);
        let factor = cholesky_decomposition(&matrix, &CorrelationConfig::default());

        assert!(factor.ridge > 0.0);
        assert!(!factor.is_fallback);
        // Unit diagonal survives shrinkage
        let product = reconstruct(&factor);
        for (i, row) in product.iter().enumerate() {
            assert!((row[i] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn cholesky_handles_perfect_correlation() {
        let rows = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let factor =
            cholesky_decomposition(&CorrelationMatrix::from_rows(&rows, 0.3), &CorrelationConfig::default());
        assert!(factor.ridge > 0.0);
    }

    #[test]
    fn cholesky_falls_back_to_identity_without_retries() {
        let rows = vec![vec![1.0, 0.8, 0.0], vec![0.8, 1.0, 0.8], vec![0.0, 0.8, 1.0]];
        let config = CorrelationConfig {
            max_ridge_attempts: 0,
            ..CorrelationConfig::default()
        };
        let factor = cholesky_decomposition(&CorrelationMatrix::from_rows(&rows, 0.3), &config);

        assert!(factor.is_fallback);
        assert_eq!(factor.lower(), CholeskyFactor::identity(3).lower());
    }

    // ============================================================
    // generate_correlated_uniform Tests
    // ============================================================

    #[test]
    fn correlated_uniforms_are_in_unit_interval() {
        let rows = vec![vec![1.0, 0.6], vec![0.6, 1.0]];
        let factor =
            cholesky_decomposition(&CorrelationMatrix::from_rows(&rows, 0.3), &CorrelationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..1_000 {
            let draws = generate_correlated_uniform(&factor, &mut rng);
            assert_eq!(draws.len(), 2);
            assert!(draws.iter().all(|u| (0.0..=1.0).contains(u)));
        }
    }

    #[test]
    fn correlated_uniforms_move_together() {
        let rows = vec![vec![1.0, 0.8], vec![0.8, 1.0]];
        let factor =
            cholesky_decomposition(&CorrelationMatrix::from_rows(&rows, 0.3), &CorrelationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let n = 20_000;
        let mut both_low = 0;
        for _ in 0..n {
            let u = generate_correlated_uniform(&factor, &mut rng);
            if u[0] < 0.5 && u[1] < 0.5 {
                both_low += 1;
            }
        }
        // Independent would be 0.25; rho = 0.8 gives about 0.40
        let rate = f64::from(both_low) / f64::from(n);
        assert!(rate > 0.35, "joint rate was {rate}");
    }

    #[test]
    fn identity_factor_gives_uniform_marginals() {
        let factor = CholeskyFactor::identity(1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 20_000;
        let below = (0..n)
            .filter(|_| generate_correlated_uniform(&factor, &mut rng)[0] < 0.3)
            .count();
        let rate = below as f64 / n as f64;
        assert!((rate - 0.3).abs() < 0.02, "rate was {rate}");
    }
}
