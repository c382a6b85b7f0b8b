//! Season files: a season's registry and results as JSON

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::Database;
use crate::{Fixture, GameResult, RatingError, Result, Team, TeamKey};

/// One season as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonFile {
    pub year: i32,
    pub number_of_weeks: u32,
    pub teams: Vec<Team>,
    #[serde(default)]
    pub games: Vec<GameResult>,
    /// Upcoming games, predicted before their results are known
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
}

impl SeasonFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let season: SeasonFile = serde_json::from_str(&content)?;
        season.validate()?;
        Ok(season)
    }

    /// Check team keys, and that every game belongs to this season and
    /// involves registered teams
    pub fn validate(&self) -> Result<()> {
        for team in &self.teams {
            team.key.validate()?;
        }

        let games = self.games.iter().map(|g| (g.year, g.week, &g.home, &g.away));
        let fixtures = self.fixtures.iter().map(|f| (f.year, f.week, &f.home, &f.away));
        for (year, week, home, away) in games.chain(fixtures) {
            self.check_game(year, week, home, away)?;
        }
        Ok(())
    }

    fn check_game(&self, year: i32, week: u32, home: &TeamKey, away: &TeamKey) -> Result<()> {
        if year != self.year {
            return Err(RatingError::Parse(format!(
                "Game {} vs {} is from {}, not {}",
                home, away, year, self.year
            )));
        }
        if week > self.number_of_weeks + 1 {
            return Err(RatingError::InvalidWeek {
                week,
                number_of_weeks: self.number_of_weeks,
            });
        }
        for side in [home, away] {
            if !self.teams.iter().any(|t| &t.key == side) {
                return Err(RatingError::UnknownTeam(side.to_string()));
            }
        }
        Ok(())
    }

    /// Store the season in the database, returning the number of games written
    pub fn store(&self, db: &Database) -> Result<usize> {
        db.upsert_season(self.year, self.number_of_weeks)?;
        for team in &self.teams {
            db.upsert_team(self.year, team)?;
        }
        let count = db.upsert_games(&self.games)?;
        let scheduled = db.upsert_fixtures(&self.fixtures)?;
        log::info!(
            "Imported {} teams, {} games and {} fixtures for {}",
            self.teams.len(),
            count,
            scheduled,
            self.year
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeasonData;

    const SEASON_JSON: &str = r#"{
        "year": 2023,
        "number_of_weeks": 2,
        "teams": [
            {"key": "A", "conference": "North"},
            {"key": "B", "conference": "North", "division": "West"}
        ],
        "games": [
            {"year": 2023, "week": 1, "home": "A", "away": "B",
             "home_points": 24, "away_points": 17,
             "home_rushing_yards": 160, "away_rushing_yards": 95}
        ],
        "fixtures": [
            {"year": 2023, "week": 2, "home": "B", "away": "A", "neutral_site": true}
        ]
    }"#;

    #[test]
    fn test_parse_and_store_season() {
        let season: SeasonFile = serde_json::from_str(SEASON_JSON).unwrap();
        season.validate().unwrap();
        assert_eq!(season.teams[1].division.as_deref(), Some("West"));
        assert!(!season.games[0].neutral_site);

        let db = Database::in_memory().unwrap();
        assert_eq!(season.store(&db).unwrap(), 1);
        assert_eq!(db.teams(2023).unwrap().len(), 2);
        assert_eq!(db.number_of_weeks(2023).unwrap(), 2);
        assert_eq!(db.scheduled_games(2023, 2).unwrap(), season.fixtures);
    }

    #[test]
    fn test_validate_rejects_unknown_team() {
        let mut season: SeasonFile = serde_json::from_str(SEASON_JSON).unwrap();
        season.games[0].away = "Z".into();
        assert!(matches!(season.validate(), Err(RatingError::UnknownTeam(t)) if t == "Z"));

        let mut season: SeasonFile = serde_json::from_str(SEASON_JSON).unwrap();
        season.fixtures[0].week = 4;
        assert!(matches!(
            season.validate(),
            Err(RatingError::InvalidWeek { week: 4, number_of_weeks: 2 })
        ));
    }

    #[test]
    fn test_validate_rejects_keys_that_break_csv() {
        let mut season: SeasonFile = serde_json::from_str(SEASON_JSON).unwrap();
        season.teams[0].key = "Army, West Point".into();
        assert!(matches!(season.validate(), Err(RatingError::Parse(_))));
    }
}
