//! Data access traits used by the rating engine, plus an in-memory store

use std::cell::RefCell;
use std::collections::HashMap;

use crate::data::snapshot::Snapshot;
use crate::{Fixture, GameResult, RatingError, RatingSet, Result, Team};

/// Read access to season statistics and persisted ratings
pub trait SeasonData {
    /// Number of regular-season weeks; the bowl week is one past this
    fn number_of_weeks(&self, year: i32) -> Result<u32>;

    /// Team registry for a season, in a stable order
    fn teams(&self, year: i32) -> Result<Vec<Team>>;

    /// Latest week with at least one recorded game, None before any results
    fn last_played_week(&self, year: i32) -> Result<Option<u32>>;

    /// Statistics through `week`
    ///
    /// None if the season is unknown or `week` is past the last played week.
    fn stats(&self, year: i32, week: u32) -> Result<Option<Snapshot>>;

    /// Persisted ratings for (year, week), if computed
    fn rating_records(&self, year: i32, week: u32) -> Result<Option<RatingSet>>;

    /// Completed games of a single week
    fn games_in_week(&self, year: i32, week: u32) -> Result<Vec<GameResult>>;

    /// Games scheduled for a week, whether or not they have been played
    fn scheduled_games(&self, year: i32, week: u32) -> Result<Vec<Fixture>>;
}

/// Write access for computed ratings
pub trait RatingStore {
    fn save_rating_records(&self, year: i32, week: u32, ratings: &RatingSet) -> Result<()>;
}

#[derive(Debug, Clone)]
struct SeasonEntry {
    number_of_weeks: u32,
    teams: Vec<Team>,
    games: Vec<GameResult>,
    fixtures: Vec<Fixture>,
}

/// In-memory season data, mainly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    seasons: HashMap<i32, SeasonEntry>,
    ratings: RefCell<HashMap<(i32, u32), RatingSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a season's weeks, teams and games (replacing any previous entry)
    pub fn add_season(
        &mut self,
        year: i32,
        number_of_weeks: u32,
        teams: Vec<Team>,
        games: Vec<GameResult>,
    ) {
        self.seasons.insert(
            year,
            SeasonEntry {
                number_of_weeks,
                teams,
                games,
                fixtures: Vec::new(),
            },
        );
    }

    /// Add scheduled games to a registered season
    pub fn add_fixtures(&mut self, year: i32, fixtures: Vec<Fixture>) -> Result<()> {
        self.seasons
            .get_mut(&year)
            .ok_or(RatingError::MissingSeason(year))?
            .fixtures
            .extend(fixtures);
        Ok(())
    }
}

impl SeasonData for MemoryStore {
    fn number_of_weeks(&self, year: i32) -> Result<u32> {
        self.seasons
            .get(&year)
            .map(|s| s.number_of_weeks)
            .ok_or(RatingError::MissingSeason(year))
    }

    fn teams(&self, year: i32) -> Result<Vec<Team>> {
        self.seasons
            .get(&year)
            .map(|s| s.teams.clone())
            .ok_or(RatingError::MissingTeams(year))
    }

    fn last_played_week(&self, year: i32) -> Result<Option<u32>> {
        Ok(self
            .seasons
            .get(&year)
            .and_then(|s| s.games.iter().map(|g| g.week).max()))
    }

    fn stats(&self, year: i32, week: u32) -> Result<Option<Snapshot>> {
        let Some(season) = self.seasons.get(&year) else {
            return Ok(None);
        };
        let last_played = self.last_played_week(year)?.unwrap_or(0);
        if week > season.number_of_weeks + 1 || week > last_played {
            return Ok(None);
        }
        Ok(Some(Snapshot::from_games(year, week, &season.games)))
    }

    fn rating_records(&self, year: i32, week: u32) -> Result<Option<RatingSet>> {
        Ok(self.ratings.borrow().get(&(year, week)).cloned())
    }

    fn games_in_week(&self, year: i32, week: u32) -> Result<Vec<GameResult>> {
        Ok(self
            .seasons
            .get(&year)
            .map(|s| s.games.iter().filter(|g| g.week == week).cloned().collect())
            .unwrap_or_default())
    }

    fn scheduled_games(&self, year: i32, week: u32) -> Result<Vec<Fixture>> {
        Ok(self
            .seasons
            .get(&year)
            .map(|s| s.fixtures.iter().filter(|f| f.week == week).cloned().collect())
            .unwrap_or_default())
    }
}

impl RatingStore for MemoryStore {
    fn save_rating_records(&self, year: i32, week: u32, ratings: &RatingSet) -> Result<()> {
        self.ratings.borrow_mut().insert((year, week), ratings.clone());
        Ok(())
    }
}
