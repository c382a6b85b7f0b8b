//! Schedule coupling matrix
//!
//! Row `i` holds, for every game team `i` played against `j`, a weight of
//! `1 / games_played(i)` at column `j`. Repeat meetings accumulate.

use nalgebra::{DMatrix, DVector};

use crate::data::snapshot::Snapshot;
use crate::features::index::TeamIndex;
use crate::Result;

/// Build the coupling matrix; without a snapshot (preseason) it is all zeros
pub fn coupling_matrix(
    snapshot: Option<&Snapshot>,
    games_played: &DVector<f64>,
    teams: &TeamIndex,
) -> Result<DMatrix<f64>> {
    let n = teams.len();
    let mut matrix = DMatrix::zeros(n, n);

    let Some(snapshot) = snapshot else {
        return Ok(matrix);
    };

    for (i, team) in teams.keys().iter().enumerate() {
        let Some(stats) = snapshot.get(team) else {
            continue;
        };
        let weight = 1.0 / games_played[i].max(1.0);
        for entry in &stats.schedule {
            let j = teams.require(&entry.opponent)?;
            matrix[(i, j)] += weight;
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameResult, RatingError, TeamKey};
    use approx::assert_relative_eq;

    fn game(week: u32, home: &str, away: &str) -> GameResult {
        GameResult {
            year: 2023,
            week,
            date: None,
            home: home.into(),
            away: away.into(),
            home_points: 20,
            away_points: 10,
            home_rushing_yards: 0,
            away_rushing_yards: 0,
            neutral_site: false,
        }
    }

    fn index(keys: &[&str]) -> TeamIndex {
        TeamIndex::new(keys.iter().map(|k| TeamKey::from(*k)).collect())
    }

    #[test]
    fn test_preseason_matrix_is_zero() {
        let teams = index(&["A", "B"]);
        let matrix = coupling_matrix(None, &DVector::from_element(2, 1.0), &teams).unwrap();
        assert_eq!(matrix, DMatrix::zeros(2, 2));
    }

    #[test]
    fn test_weights_normalized_by_games_played() {
        let snapshot = Snapshot::from_games(2023, 3, &[game(1, "A", "B"), game(2, "B", "C")]);
        let teams = index(&["A", "B", "C"]);
        let games_played = DVector::from_vec(vec![1.0, 2.0, 1.0]);

        let matrix = coupling_matrix(Some(&snapshot), &games_played, &teams).unwrap();

        assert_relative_eq!(matrix[(0, 1)], 1.0);
        assert_relative_eq!(matrix[(1, 0)], 0.5);
        assert_relative_eq!(matrix[(1, 2)], 0.5);
        assert_relative_eq!(matrix[(2, 1)], 1.0);
        assert_eq!(matrix[(0, 2)], 0.0);
        assert_eq!(matrix[(0, 0)], 0.0);
    }

    #[test]
    fn test_repeat_meetings_accumulate() {
        let snapshot = Snapshot::from_games(2023, 14, &[game(3, "A", "B"), game(14, "B", "A")]);
        let teams = index(&["A", "B"]);
        let games_played = DVector::from_vec(vec![3.0, 2.0]);

        let matrix = coupling_matrix(Some(&snapshot), &games_played, &teams).unwrap();

        assert_relative_eq!(matrix[(0, 1)], 2.0 / 3.0);
        assert_relative_eq!(matrix[(1, 0)], 1.0);
    }

    #[test]
    fn test_row_order_follows_index() {
        let snapshot = Snapshot::from_games(2023, 1, &[game(1, "A", "B")]);
        let teams = index(&["B", "A"]);
        let games_played = DVector::from_vec(vec![2.0, 1.0]);

        let matrix = coupling_matrix(Some(&snapshot), &games_played, &teams).unwrap();

        assert_relative_eq!(matrix[(0, 1)], 0.5);
        assert_relative_eq!(matrix[(1, 0)], 1.0);
    }

    #[test]
    fn test_unregistered_opponent_is_an_error() {
        let snapshot = Snapshot::from_games(2023, 1, &[game(1, "A", "X")]);
        let teams = index(&["A"]);
        let result = coupling_matrix(Some(&snapshot), &DVector::from_element(1, 1.0), &teams);
        assert!(matches!(result, Err(RatingError::UnknownTeam(t)) if t == "X"));
    }
}
