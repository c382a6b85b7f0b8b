//! Linear system for team strengths
//!
//! Each team's strength equals its adjusted per-game margin plus the
//! average strength of the opponents it played:
//!
//! ```text
//! (I - N) x = b
//! b = points + c_r * rushing + c_h * home_field + carried_opponent / games
//! ```
//!
//! ## Design notes
//!
//! * The exact solve uses LU decomposition.
//! * A singular or ill-conditioned `I - N` (for example once every team's row
//!   of `N` sums to one) switches to the minimum-norm least-squares solution
//!   from the SVD instead of failing.
//! * Mature weeks are singular by construction, so the fallback only warns
//!   when the least-squares solution leaves a residual.

use nalgebra::{DMatrix, DVector};

use crate::features::Features;
use crate::EngineConfig;

/// Relative residual above which a least-squares solution is reported
const CONSISTENCY_TOLERANCE: f64 = 1e-6;

/// How a strength vector was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    Exact,
    LeastSquares,
}

/// Solved strengths
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub strengths: DVector<f64>,
    pub method: SolveMethod,
    /// Largest absolute entry of `a x - b`
    pub residual: f64,
}

/// Assembles and solves the rating equations
#[derive(Debug, Clone)]
pub struct RatingSolver {
    rushing_coefficient: f64,
    home_field_coefficient: f64,
    singular_tolerance: f64,
}

impl Default for RatingSolver {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl RatingSolver {
    pub fn new(config: &EngineConfig) -> Self {
        RatingSolver {
            rushing_coefficient: config.rushing_coefficient,
            home_field_coefficient: config.home_field_coefficient,
            singular_tolerance: config.singular_tolerance,
        }
    }

    /// Right-hand side `b` of the system
    pub fn right_hand_side(&self, features: &Features) -> DVector<f64> {
        let carried = features
            .carried_opponent_strength
            .zip_map(&features.games_played, |strength, games| strength / games.max(1.0));

        &features.points_margin
            + &features.rushing_margin * self.rushing_coefficient
            + &features.home_field_correction * self.home_field_coefficient
            + carried
    }

    /// Solve `(I - coupling) x = b` for the strength vector
    pub fn solve(&self, features: &Features, coupling: &DMatrix<f64>) -> Solution {
        let n = features.len();
        let a = DMatrix::<f64>::identity(n, n) - coupling;
        let b = self.right_hand_side(features);
        solve_system(a, &b, self.singular_tolerance)
    }
}

/// Solve `a x = b` exactly when `a` is well conditioned, otherwise in the
/// least-squares sense with the minimum-norm solution
pub fn solve_system(a: DMatrix<f64>, b: &DVector<f64>, tolerance: f64) -> Solution {
    let n = a.nrows();
    if n == 0 {
        return Solution {
            strengths: DVector::zeros(0),
            method: SolveMethod::Exact,
            residual: 0.0,
        };
    }

    let svd = a.clone().svd(true, true);
    let (max_sv, min_sv) = svd
        .singular_values
        .iter()
        .fold((0.0f64, f64::INFINITY), |(hi, lo), &s| (hi.max(s), lo.min(s)));
    let rcond = if max_sv > 0.0 { min_sv / max_sv } else { 0.0 };

    if rcond > tolerance {
        if let Some(x) = a.clone().lu().solve(b) {
            if x.iter().all(|v| v.is_finite()) {
                let residual = (&a * &x - b).amax();
                return Solution {
                    strengths: x,
                    method: SolveMethod::Exact,
                    residual,
                };
            }
        }
    }

    // U and V were requested and eps is non-negative, so this cannot fail
    let strengths = svd
        .solve(b, max_sv * tolerance)
        .unwrap_or_else(|_| DVector::zeros(n));
    let residual = (&a * &strengths - b).amax();

    if residual > CONSISTENCY_TOLERANCE * (1.0 + b.amax()) {
        log::warn!(
            "Rating system is inconsistent (rcond {:.3e}, residual {:.3e}), using least-squares solution",
            rcond,
            residual
        );
    } else {
        log::debug!("Rating system is singular (rcond {:.3e}), using minimum-norm solution", rcond);
    }

    Solution {
        strengths,
        method: SolveMethod::LeastSquares,
        residual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SeasonPhase;
    use approx::assert_relative_eq;

    fn features(points: Vec<f64>, games: Vec<f64>) -> Features {
        let n = points.len();
        Features {
            phase: SeasonPhase::Mature,
            games_played: DVector::from_vec(games),
            points_margin: DVector::from_vec(points),
            rushing_margin: DVector::zeros(n),
            home_field_correction: DVector::zeros(n),
            carried_opponent_strength: DVector::zeros(n),
        }
    }

    #[test]
    fn test_right_hand_side_weights() {
        let solver = RatingSolver::default();
        let mut f = features(vec![7.0, -7.0], vec![2.0, 0.0]);
        f.rushing_margin = DVector::from_vec(vec![100.0, -100.0]);
        f.home_field_correction = DVector::from_vec(vec![-0.5, 0.5]);
        f.carried_opponent_strength = DVector::from_vec(vec![3.0, 3.0]);

        let b = solver.right_hand_side(&f);
        assert_relative_eq!(b[0], 7.0 + 8.37058862488956 - 2.0 + 1.5, epsilon = 1e-12);
        // Zero games divides the carried term by one
        assert_relative_eq!(b[1], -7.0 - 8.37058862488956 + 2.0 + 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_coupling_returns_rhs() {
        let solver = RatingSolver::default();
        let f = features(vec![12.5, -4.25], vec![0.0, 0.0]);

        let solution = solver.solve(&f, &DMatrix::zeros(2, 2));

        assert_eq!(solution.method, SolveMethod::Exact);
        assert_relative_eq!(solution.strengths[0], 12.5, epsilon = 1e-12);
        assert_relative_eq!(solution.strengths[1], -4.25, epsilon = 1e-12);
    }

    #[test]
    fn test_three_team_system_satisfies_equations() {
        // A beat B by 10 at A, B beat C by 3 at C; each team carries one
        // virtual prior-season game, so games played are 2, 3 and 2.
        let coupling = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.0, 1.0 / 2.0, 0.0, //
                1.0 / 3.0, 0.0, 1.0 / 3.0, //
                0.0, 1.0 / 2.0, 0.0,
            ],
        );
        let f = features(vec![10.0, -7.0, -3.0], vec![2.0, 3.0, 2.0]);
        let solver = RatingSolver::default();

        let solution = solver.solve(&f, &coupling);
        assert_eq!(solution.method, SolveMethod::Exact);

        let a = DMatrix::<f64>::identity(3, 3) - &coupling;
        let residual = &a * &solution.strengths - &f.points_margin;
        assert!(residual.amax() < 1e-9, "residual {}", residual);
        assert!(solution.residual < 1e-9);
        assert!(solution.strengths[0] > solution.strengths[2]);
    }

    #[test]
    fn test_singular_system_falls_back_to_least_squares() {
        // Two teams that only played each other: rows of I - N are dependent
        let coupling = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let f = features(vec![3.0, -3.0], vec![1.0, 1.0]);

        let solution = RatingSolver::default().solve(&f, &coupling);

        assert_eq!(solution.method, SolveMethod::LeastSquares);
        assert!(solution.strengths.iter().all(|x| x.is_finite()));
        assert_relative_eq!(solution.strengths[0], 1.5, epsilon = 1e-9);
        assert_relative_eq!(solution.strengths[1], -1.5, epsilon = 1e-9);
        // Singular but consistent: the equations still hold
        assert!(solution.residual < 1e-9);
    }

    #[test]
    fn test_inconsistent_singular_system_is_finite() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 3.0]);

        let solution = solve_system(a, &b, 1e-10);

        assert_eq!(solution.method, SolveMethod::LeastSquares);
        // Minimum-norm solution of x0 + x1 = 2
        assert_relative_eq!(solution.strengths[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(solution.strengths[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(solution.residual, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_all_zero_system() {
        let solution = solve_system(DMatrix::zeros(2, 2), &DVector::from_vec(vec![1.0, 2.0]), 1e-10);
        assert_eq!(solution.method, SolveMethod::LeastSquares);
        assert_eq!(solution.strengths, DVector::zeros(2));
    }

    #[test]
    fn test_empty_league() {
        let solution = solve_system(DMatrix::zeros(0, 0), &DVector::zeros(0), 1e-10);
        assert!(solution.strengths.is_empty());
    }
}
