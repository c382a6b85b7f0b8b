//! Cumulative team statistics through a week cutoff

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{GameResult, ScheduleEntry, TeamKey};

/// Season-to-date totals for one team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: u32,
    pub points_against: u32,
    pub rushing_for: i64,
    pub rushing_against: i64,
    /// Played games in week order
    pub schedule: Vec<ScheduleEntry>,
}

impl TeamSeasonStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update totals with one game the team played in
    pub fn update(&mut self, game: &GameResult, team: &TeamKey) {
        let Some(site) = game.site_for(team) else {
            return;
        };
        let is_home = &game.home == team;

        let (points_for, points_against) = if is_home {
            (game.home_points, game.away_points)
        } else {
            (game.away_points, game.home_points)
        };
        let (rushing_for, rushing_against) = if is_home {
            (game.home_rushing_yards, game.away_rushing_yards)
        } else {
            (game.away_rushing_yards, game.home_rushing_yards)
        };

        self.games_played += 1;
        self.points_for += points_for;
        self.points_against += points_against;
        self.rushing_for += rushing_for as i64;
        self.rushing_against += rushing_against as i64;

        match points_for.cmp(&points_against) {
            std::cmp::Ordering::Greater => self.wins += 1,
            std::cmp::Ordering::Less => self.losses += 1,
            std::cmp::Ordering::Equal => self.ties += 1,
        }

        let opponent = if is_home { &game.away } else { &game.home };
        self.schedule.push(ScheduleEntry {
            opponent: opponent.clone(),
            site,
            week: game.week,
        });
    }

    /// Total points margin (for minus against)
    pub fn points_margin(&self) -> f64 {
        self.points_for as f64 - self.points_against as f64
    }

    /// Total rushing-yards margin (for minus against)
    pub fn rushing_margin(&self) -> f64 {
        (self.rushing_for - self.rushing_against) as f64
    }

    /// Sum of per-game home-field corrections over the schedule
    pub fn home_field_total(&self) -> f64 {
        self.schedule.iter().map(|entry| entry.site.correction()).sum()
    }
}

/// Statistics of every team that has played as of a (year, week) cutoff
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub year: i32,
    pub week: u32,
    teams: HashMap<TeamKey, TeamSeasonStats>,
}

impl Snapshot {
    pub fn new(year: i32, week: u32) -> Self {
        Snapshot {
            year,
            week,
            teams: HashMap::new(),
        }
    }

    /// Aggregate every game of `year` played in or before `week`
    pub fn from_games(year: i32, week: u32, games: &[GameResult]) -> Self {
        let mut snapshot = Snapshot::new(year, week);
        let mut ordered: Vec<&GameResult> = games
            .iter()
            .filter(|g| g.year == year && g.week <= week)
            .collect();
        ordered.sort_by_key(|g| g.week);

        for game in ordered {
            snapshot.add_game(game);
        }
        snapshot
    }

    /// Fold one game into both teams' totals
    pub fn add_game(&mut self, game: &GameResult) {
        self.teams
            .entry(game.home.clone())
            .or_default()
            .update(game, &game.home);
        self.teams
            .entry(game.away.clone())
            .or_default()
            .update(game, &game.away);
    }

    pub fn get(&self, team: &TeamKey) -> Option<&TeamSeasonStats> {
        self.teams.get(team)
    }

    /// Statistics for a team, or empty totals if it has not played
    pub fn get_or_default(&self, team: &TeamKey) -> TeamSeasonStats {
        self.teams.get(team).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Site;

    fn game(week: u32, home: &str, away: &str, hp: u32, ap: u32) -> GameResult {
        GameResult {
            year: 2023,
            week,
            date: None,
            home: home.into(),
            away: away.into(),
            home_points: hp,
            away_points: ap,
            home_rushing_yards: 150,
            away_rushing_yards: 90,
            neutral_site: false,
        }
    }

    #[test]
    fn test_team_season_stats() {
        let mut stats = TeamSeasonStats::new();
        let a = TeamKey::from("A");

        // Home win
        stats.update(&game(1, "A", "B", 30, 20), &a);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.points_for, 30);
        assert_eq!(stats.rushing_margin(), 60.0);

        // Away loss
        stats.update(&game(2, "C", "A", 25, 15), &a);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.points_margin(), 0.0);
        assert_eq!(stats.schedule[1].site, Site::Away);
        assert_eq!(stats.home_field_total(), 0.0);
    }

    #[test]
    fn test_update_ignores_other_teams() {
        let mut stats = TeamSeasonStats::new();
        stats.update(&game(1, "A", "B", 30, 20), &"Z".into());
        assert_eq!(stats.games_played, 0);
    }

    #[test]
    fn test_snapshot_respects_week_cutoff() {
        let games = vec![
            game(1, "A", "B", 30, 20),
            game(2, "B", "C", 10, 13),
            game(3, "A", "C", 7, 3),
        ];
        let snapshot = Snapshot::from_games(2023, 2, &games);

        assert_eq!(snapshot.get(&"A".into()).unwrap().games_played, 1);
        assert_eq!(snapshot.get(&"B".into()).unwrap().games_played, 2);
        assert_eq!(snapshot.get(&"C".into()).unwrap().wins, 1);
        assert!(snapshot.get(&"D".into()).is_none());
        assert_eq!(snapshot.get_or_default(&"D".into()).games_played, 0);
    }
}
