//! Per-team feature vectors for the rating equations
//!
//! Turns season-to-date totals into per-game margins, folding in one virtual
//! game from the previous season while the current season is young.

use nalgebra::DVector;

use crate::data::snapshot::{Snapshot, TeamSeasonStats};
use crate::features::index::TeamIndex;
use crate::features::phase::SeasonPhase;
use crate::{RatingSet, ReplacementLevel, TeamKey};

/// Divide a season total by games played, treating zero games as one
fn per_game(total: f64, games: f64) -> f64 {
    total / games.max(1.0)
}

/// The previous season's terminal statistics and ratings
#[derive(Debug, Clone, Copy)]
pub struct Carryover<'a> {
    pub stats: &'a Snapshot,
    pub ratings: &'a RatingSet,
}

impl Carryover<'_> {
    /// Per-game profile of a team that played in the previous season
    ///
    /// Returns None for teams with no prior-season games (new entrants).
    pub fn profile(&self, team: &TeamKey) -> Option<PriorProfile> {
        let stats = self.stats.get(team).filter(|s| s.games_played > 0)?;
        Some(PriorProfile::from_season(stats, self.ratings.get(team)))
    }
}

/// One team's previous-season contribution, expressed per game
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriorProfile {
    pub points_margin: f64,
    pub rushing_margin: f64,
    pub home_field_correction: f64,
    pub avg_opponent_strength: f64,
}

impl PriorProfile {
    pub fn from_season(stats: &TeamSeasonStats, record: Option<&crate::RatingRecord>) -> Self {
        let games = stats.games_played as f64;
        PriorProfile {
            points_margin: per_game(stats.points_margin(), games),
            rushing_margin: per_game(stats.rushing_margin(), games),
            // Stored corrections are already per game
            home_field_correction: record
                .map(|r| r.home_field_correction)
                .unwrap_or_else(|| per_game(stats.home_field_total(), games)),
            avg_opponent_strength: record.map(|r| r.avg_opponent_strength).unwrap_or(0.0),
        }
    }

    pub fn replacement(level: &ReplacementLevel) -> Self {
        PriorProfile {
            points_margin: level.points_margin,
            rushing_margin: level.rushing_margin,
            home_field_correction: level.home_field_correction,
            avg_opponent_strength: level.avg_opponent_strength,
        }
    }
}

/// Inputs required by each season phase
#[derive(Debug, Clone, Copy)]
pub enum PhaseInput<'a> {
    Preseason {
        prior: Carryover<'a>,
    },
    Blended {
        current: &'a Snapshot,
        prior: Carryover<'a>,
    },
    Mature {
        current: &'a Snapshot,
    },
}

impl PhaseInput<'_> {
    /// Current-season snapshot, absent in the preseason
    pub fn current(&self) -> Option<&Snapshot> {
        match *self {
            PhaseInput::Preseason { .. } => None,
            PhaseInput::Blended { current, .. } | PhaseInput::Mature { current } => Some(current),
        }
    }
}

/// Feature vectors, all indexed like the [`TeamIndex`] they were built from
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub phase: SeasonPhase,
    pub games_played: DVector<f64>,
    pub points_margin: DVector<f64>,
    pub rushing_margin: DVector<f64>,
    pub home_field_correction: DVector<f64>,
    /// Previous season's average opponent strength (zero in the mature phase)
    pub carried_opponent_strength: DVector<f64>,
}

impl Features {
    fn zeros(phase: SeasonPhase, n: usize) -> Self {
        Features {
            phase,
            games_played: DVector::zeros(n),
            points_margin: DVector::zeros(n),
            rushing_margin: DVector::zeros(n),
            home_field_correction: DVector::zeros(n),
            carried_opponent_strength: DVector::zeros(n),
        }
    }

    pub fn len(&self) -> usize {
        self.games_played.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games_played.is_empty()
    }
}

/// Builds [`Features`] for one (year, week)
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    replacement: ReplacementLevel,
}

impl FeatureExtractor {
    pub fn new(replacement: ReplacementLevel) -> Self {
        FeatureExtractor { replacement }
    }

    pub fn extract(&self, teams: &TeamIndex, input: PhaseInput<'_>) -> Features {
        match input {
            PhaseInput::Preseason { prior } => self.preseason(teams, prior),
            PhaseInput::Blended { current, prior } => self.blended(teams, current, prior),
            PhaseInput::Mature { current } => self.mature(teams, current),
        }
    }

    /// Previous season's per-game averages; replacement level for new teams
    fn preseason(&self, teams: &TeamIndex, prior: Carryover<'_>) -> Features {
        let mut features = Features::zeros(SeasonPhase::Preseason, teams.len());

        for (i, team) in teams.keys().iter().enumerate() {
            let profile = prior.profile(team).unwrap_or_else(|| {
                log::debug!("{} has no prior season, using replacement level", team);
                PriorProfile::replacement(&self.replacement)
            });

            features.games_played[i] = 1.0;
            features.points_margin[i] = profile.points_margin;
            features.rushing_margin[i] = profile.rushing_margin;
            features.home_field_correction[i] = profile.home_field_correction;
            features.carried_opponent_strength[i] = profile.avg_opponent_strength;
        }

        features
    }

    /// Season to date plus one virtual game from the previous season
    ///
    /// A team without a previous season repeats its own current per-game
    /// average as the virtual game.
    fn blended(&self, teams: &TeamIndex, current: &Snapshot, prior: Carryover<'_>) -> Features {
        let mut features = Features::zeros(SeasonPhase::Blended, teams.len());

        for (i, team) in teams.keys().iter().enumerate() {
            let stats = current.get_or_default(team);
            let played = stats.games_played as f64;
            let games = played + 1.0;

            let points = stats.points_margin();
            let rushing = stats.rushing_margin();
            let home_field = stats.home_field_total();

            let virtual_game = match prior.profile(team) {
                Some(profile) => profile,
                None => {
                    log::debug!("{} has no prior season, repeating its current average", team);
                    PriorProfile {
                        points_margin: per_game(points, played),
                        rushing_margin: per_game(rushing, played),
                        home_field_correction: per_game(home_field, played),
                        avg_opponent_strength: 0.0,
                    }
                }
            };

            features.games_played[i] = games;
            features.points_margin[i] = per_game(points + virtual_game.points_margin, games);
            features.rushing_margin[i] = per_game(rushing + virtual_game.rushing_margin, games);
            features.home_field_correction[i] =
                per_game(home_field + virtual_game.home_field_correction, games);
            features.carried_opponent_strength[i] = virtual_game.avg_opponent_strength;
        }

        features
    }

    fn mature(&self, teams: &TeamIndex, current: &Snapshot) -> Features {
        let mut features = Features::zeros(SeasonPhase::Mature, teams.len());

        for (i, team) in teams.keys().iter().enumerate() {
            let stats = current.get_or_default(team);
            let games = stats.games_played as f64;

            features.games_played[i] = games;
            features.points_margin[i] = per_game(stats.points_margin(), games);
            features.rushing_margin[i] = per_game(stats.rushing_margin(), games);
            features.home_field_correction[i] = per_game(stats.home_field_total(), games);
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameResult, RatingRecord};
    use approx::assert_relative_eq;

    fn game(year: i32, week: u32, home: &str, away: &str, hp: u32, ap: u32, hr: i32, ar: i32) -> GameResult {
        GameResult {
            year,
            week,
            date: None,
            home: home.into(),
            away: away.into(),
            home_points: hp,
            away_points: ap,
            home_rushing_yards: hr,
            away_rushing_yards: ar,
            neutral_site: false,
        }
    }

    fn prior_season() -> (Snapshot, RatingSet) {
        // A: +14 and +6 over two games, B: -14 and -6
        let games = vec![
            game(2022, 1, "A", "B", 28, 14, 200, 100),
            game(2022, 2, "B", "A", 10, 16, 80, 120),
        ];
        let stats = Snapshot::from_games(2022, 3, &games);
        let ratings: RatingSet = vec![
            (
                TeamKey::from("A"),
                RatingRecord {
                    home_field_correction: 0.5,
                    avg_opponent_strength: -3.0,
                    ..Default::default()
                },
            ),
            (
                TeamKey::from("B"),
                RatingRecord {
                    home_field_correction: -0.5,
                    avg_opponent_strength: 3.0,
                    ..Default::default()
                },
            ),
        ]
        .into_iter()
        .collect();
        (stats, ratings)
    }

    fn index(keys: &[&str]) -> TeamIndex {
        TeamIndex::new(keys.iter().map(|k| TeamKey::from(*k)).collect())
    }

    #[test]
    fn test_prior_profile_per_game() {
        let (stats, ratings) = prior_season();
        let prior = Carryover { stats: &stats, ratings: &ratings };

        let a = prior.profile(&"A".into()).unwrap();
        assert_relative_eq!(a.points_margin, 10.0);
        assert_relative_eq!(a.rushing_margin, 70.0);
        assert_relative_eq!(a.home_field_correction, 0.5);
        assert_relative_eq!(a.avg_opponent_strength, -3.0);
        assert!(prior.profile(&"D".into()).is_none());
    }

    #[test]
    fn test_preseason_uses_prior_and_replacement() {
        let (stats, ratings) = prior_season();
        let replacement = ReplacementLevel {
            points_margin: -20.0,
            rushing_margin: -50.0,
            home_field_correction: 1.0,
            avg_opponent_strength: 2.0,
        };
        let extractor = FeatureExtractor::new(replacement);
        let teams = index(&["A", "D"]);

        let features = extractor.extract(
            &teams,
            PhaseInput::Preseason {
                prior: Carryover { stats: &stats, ratings: &ratings },
            },
        );

        assert_eq!(features.phase, SeasonPhase::Preseason);
        assert_eq!(features.games_played.as_slice(), &[1.0, 1.0]);
        assert_relative_eq!(features.points_margin[0], 10.0);
        assert_relative_eq!(features.points_margin[1], -20.0);
        assert_relative_eq!(features.rushing_margin[1], -50.0);
        assert_relative_eq!(features.home_field_correction[1], 1.0);
        assert_relative_eq!(features.carried_opponent_strength[1], 2.0);
    }

    #[test]
    fn test_blended_adds_one_virtual_game() {
        let (stats, ratings) = prior_season();
        let current = Snapshot::from_games(
            2023,
            1,
            &[game(2023, 1, "A", "C", 21, 14, 150, 130)],
        );
        let extractor = FeatureExtractor::default();
        let teams = index(&["A", "C"]);

        let features = extractor.extract(
            &teams,
            PhaseInput::Blended {
                current: &current,
                prior: Carryover { stats: &stats, ratings: &ratings },
            },
        );

        assert_eq!(features.games_played.as_slice(), &[2.0, 2.0]);
        // A: (7 + 10) / 2
        assert_relative_eq!(features.points_margin[0], 8.5);
        // A: (20 + 70) / 2
        assert_relative_eq!(features.rushing_margin[0], 45.0);
        // A: (-1 home + 0.5 carried) / 2
        assert_relative_eq!(features.home_field_correction[0], -0.25);
        assert_relative_eq!(features.carried_opponent_strength[0], -3.0);

        // C is new: its own -7 per game counts twice
        assert_relative_eq!(features.points_margin[1], -7.0);
        assert_relative_eq!(features.rushing_margin[1], -20.0);
        assert_relative_eq!(features.home_field_correction[1], 1.0);
        assert_relative_eq!(features.carried_opponent_strength[1], 0.0);
    }

    #[test]
    fn test_blended_team_without_games() {
        let (stats, ratings) = prior_season();
        let current = Snapshot::new(2023, 1);
        let features = FeatureExtractor::default().extract(
            &index(&["E"]),
            PhaseInput::Blended {
                current: &current,
                prior: Carryover { stats: &stats, ratings: &ratings },
            },
        );

        assert_eq!(features.games_played[0], 1.0);
        assert_eq!(features.points_margin[0], 0.0);
        assert_eq!(features.home_field_correction[0], 0.0);
    }

    #[test]
    fn test_mature_is_plain_per_game() {
        let current = Snapshot::from_games(
            2023,
            10,
            &[
                game(2023, 1, "A", "B", 30, 10, 200, 100),
                game(2023, 2, "C", "A", 17, 7, 90, 110),
            ],
        );
        let features = FeatureExtractor::default()
            .extract(&index(&["A", "B", "Z"]), PhaseInput::Mature { current: &current });

        assert_eq!(features.games_played.as_slice(), &[2.0, 1.0, 0.0]);
        assert_relative_eq!(features.points_margin[0], 5.0);
        assert_relative_eq!(features.rushing_margin[0], 60.0);
        assert_relative_eq!(features.home_field_correction[0], 0.0);
        assert_relative_eq!(features.home_field_correction[1], 1.0);
        // A team that has not played gets zeros, not NaN
        assert_eq!(features.points_margin[2], 0.0);
        assert!(features.carried_opponent_strength.iter().all(|&x| x == 0.0));
    }
}
