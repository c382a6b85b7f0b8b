//! SQLite storage for seasons, games and computed ratings

use crate::data::snapshot::Snapshot;
use crate::data::store::{RatingStore, SeasonData};
use crate::{Fixture, GameResult, RatingError, RatingRecord, RatingSet, Result, Team, TeamKey};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS seasons (
                year INTEGER PRIMARY KEY,
                number_of_weeks INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS teams (
                year INTEGER NOT NULL REFERENCES seasons(year),
                key TEXT NOT NULL,
                conference TEXT NOT NULL,
                division TEXT,
                PRIMARY KEY (year, key)
            );

            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER NOT NULL,
                week INTEGER NOT NULL,
                date TEXT,
                home TEXT NOT NULL,
                away TEXT NOT NULL,
                home_points INTEGER NOT NULL,
                away_points INTEGER NOT NULL,
                home_rushing_yards INTEGER NOT NULL DEFAULT 0,
                away_rushing_yards INTEGER NOT NULL DEFAULT 0,
                neutral_site INTEGER NOT NULL DEFAULT 0,
                UNIQUE(year, week, home, away)
            );

            CREATE TABLE IF NOT EXISTS fixtures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER NOT NULL,
                week INTEGER NOT NULL,
                date TEXT,
                home TEXT NOT NULL,
                away TEXT NOT NULL,
                neutral_site INTEGER NOT NULL DEFAULT 0,
                UNIQUE(year, week, home, away)
            );

            CREATE TABLE IF NOT EXISTS ratings (
                year INTEGER NOT NULL,
                week INTEGER NOT NULL,
                position INTEGER NOT NULL,
                team TEXT NOT NULL,
                strength REAL NOT NULL,
                volatility REAL NOT NULL,
                points_margin REAL NOT NULL,
                avg_opponent_strength REAL NOT NULL,
                rushing_margin REAL NOT NULL,
                home_field_correction REAL NOT NULL,
                games_played REAL NOT NULL,
                PRIMARY KEY (year, week, team)
            );

            CREATE INDEX IF NOT EXISTS idx_games_year_week ON games(year, week);
            "#,
        )?;
        Ok(())
    }

    // ==================== Season Operations ====================

    /// Insert or update a season's week count
    pub fn upsert_season(&self, year: i32, number_of_weeks: u32) -> Result<()> {
        self.conn.execute(
            "INSERT INTO seasons (year, number_of_weeks) VALUES (?1, ?2)
             ON CONFLICT(year) DO UPDATE SET number_of_weeks = excluded.number_of_weeks",
            params![year, number_of_weeks],
        )?;
        Ok(())
    }

    /// Insert or update a team in a season's registry
    pub fn upsert_team(&self, year: i32, team: &Team) -> Result<()> {
        self.conn.execute(
            "INSERT INTO teams (year, key, conference, division) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(year, key) DO UPDATE SET
                conference = excluded.conference,
                division = excluded.division",
            params![year, team.key.as_str(), team.conference, team.division],
        )?;
        Ok(())
    }

    // ==================== Game Operations ====================

    /// Insert or update a game result
    pub fn upsert_game(&self, game: &GameResult) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO games (year, week, date, home, away, home_points, away_points,
                               home_rushing_yards, away_rushing_yards, neutral_site)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(year, week, home, away) DO UPDATE SET
                date = COALESCE(excluded.date, date),
                home_points = excluded.home_points,
                away_points = excluded.away_points,
                home_rushing_yards = excluded.home_rushing_yards,
                away_rushing_yards = excluded.away_rushing_yards,
                neutral_site = excluded.neutral_site
            "#,
            params![
                game.year,
                game.week,
                game.date.map(|d| d.format("%Y-%m-%d").to_string()),
                game.home.as_str(),
                game.away.as_str(),
                game.home_points,
                game.away_points,
                game.home_rushing_yards,
                game.away_rushing_yards,
                game.neutral_site,
            ],
        )?;
        Ok(())
    }

    /// Insert multiple game results
    pub fn upsert_games(&self, games: &[GameResult]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        for game in games {
            self.upsert_game(game)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    /// Games of a season up to and including `week`
    pub fn get_games_through(&self, year: i32, week: u32) -> Result<Vec<GameResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, week, date, home, away, home_points, away_points,
                    home_rushing_yards, away_rushing_yards, neutral_site
             FROM games
             WHERE year = ?1 AND week <= ?2
             ORDER BY week, id",
        )?;

        let games = stmt
            .query_map(params![year, week], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(games)
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameResult> {
        let date: Option<String> = row.get(2)?;
        Ok(GameResult {
            year: row.get(0)?,
            week: row.get(1)?,
            date: date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            home: TeamKey(row.get(3)?),
            away: TeamKey(row.get(4)?),
            home_points: row.get(5)?,
            away_points: row.get(6)?,
            home_rushing_yards: row.get(7)?,
            away_rushing_yards: row.get(8)?,
            neutral_site: row.get(9)?,
        })
    }

    // ==================== Fixture Operations ====================

    /// Insert or update a scheduled game
    pub fn upsert_fixture(&self, fixture: &Fixture) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO fixtures (year, week, date, home, away, neutral_site)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(year, week, home, away) DO UPDATE SET
                date = COALESCE(excluded.date, date),
                neutral_site = excluded.neutral_site
            "#,
            params![
                fixture.year,
                fixture.week,
                fixture.date.map(|d| d.format("%Y-%m-%d").to_string()),
                fixture.home.as_str(),
                fixture.away.as_str(),
                fixture.neutral_site,
            ],
        )?;
        Ok(())
    }

    /// Insert multiple scheduled games
    pub fn upsert_fixtures(&self, fixtures: &[Fixture]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for fixture in fixtures {
            self.upsert_fixture(fixture)?;
        }
        tx.commit()?;
        Ok(fixtures.len())
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let season_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seasons", [], |row| row.get(0))?;

        let team_count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT key) FROM teams", [], |row| row.get(0))?;

        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        let rating_set_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT year, week FROM ratings)",
            [],
            |row| row.get(0),
        )?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            season_count: season_count as usize,
            team_count: team_count as usize,
            game_count: game_count as usize,
            rating_set_count: rating_set_count as usize,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

impl SeasonData for Database {
    fn number_of_weeks(&self, year: i32) -> Result<u32> {
        self.conn
            .query_row(
                "SELECT number_of_weeks FROM seasons WHERE year = ?1",
                params![year],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RatingError::MissingSeason(year))
    }

    fn teams(&self, year: i32) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, conference, division FROM teams WHERE year = ?1 ORDER BY key")?;

        let teams = stmt
            .query_map(params![year], |row| {
                Ok(Team {
                    key: TeamKey(row.get(0)?),
                    conference: row.get(1)?,
                    division: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if teams.is_empty() {
            return Err(RatingError::MissingTeams(year));
        }
        Ok(teams)
    }

    fn last_played_week(&self, year: i32) -> Result<Option<u32>> {
        let week = self.conn.query_row(
            "SELECT MAX(week) FROM games WHERE year = ?1",
            params![year],
            |row| row.get(0),
        )?;
        Ok(week)
    }

    fn stats(&self, year: i32, week: u32) -> Result<Option<Snapshot>> {
        let number_of_weeks = match self.number_of_weeks(year) {
            Ok(n) => n,
            Err(RatingError::MissingSeason(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let last_played = self.last_played_week(year)?.unwrap_or(0);
        if week > number_of_weeks + 1 || week > last_played {
            return Ok(None);
        }

        let games = self.get_games_through(year, week)?;
        Ok(Some(Snapshot::from_games(year, week, &games)))
    }

    fn rating_records(&self, year: i32, week: u32) -> Result<Option<RatingSet>> {
        let mut stmt = self.conn.prepare(
            "SELECT team, strength, volatility, points_margin, avg_opponent_strength,
                    rushing_margin, home_field_correction, games_played
             FROM ratings
             WHERE year = ?1 AND week = ?2
             ORDER BY position",
        )?;

        let rows = stmt
            .query_map(params![year, week], |row| {
                Ok((
                    TeamKey(row.get(0)?),
                    RatingRecord {
                        strength: row.get(1)?,
                        volatility: row.get(2)?,
                        points_margin: row.get(3)?,
                        avg_opponent_strength: row.get(4)?,
                        rushing_margin: row.get(5)?,
                        home_field_correction: row.get(6)?,
                        games_played: row.get(7)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().collect()))
    }

    fn games_in_week(&self, year: i32, week: u32) -> Result<Vec<GameResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, week, date, home, away, home_points, away_points,
                    home_rushing_yards, away_rushing_yards, neutral_site
             FROM games
             WHERE year = ?1 AND week = ?2
             ORDER BY id",
        )?;

        let games = stmt
            .query_map(params![year, week], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(games)
    }

    fn scheduled_games(&self, year: i32, week: u32) -> Result<Vec<Fixture>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, week, date, home, away, neutral_site
             FROM fixtures
             WHERE year = ?1 AND week = ?2
             ORDER BY id",
        )?;

        let fixtures = stmt
            .query_map(params![year, week], |row| {
                let date: Option<String> = row.get(2)?;
                Ok(Fixture {
                    year: row.get(0)?,
                    week: row.get(1)?,
                    date: date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
                    home: TeamKey(row.get(3)?),
                    away: TeamKey(row.get(4)?),
                    neutral_site: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(fixtures)
    }
}

impl RatingStore for Database {
    fn save_rating_records(&self, year: i32, week: u32, ratings: &RatingSet) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM ratings WHERE year = ?1 AND week = ?2",
            params![year, week],
        )?;
        for (position, (team, record)) in ratings.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO ratings (year, week, position, team, strength, volatility,
                                     points_margin, avg_opponent_strength, rushing_margin,
                                     home_field_correction, games_played)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    year,
                    week,
                    position as i64,
                    team.as_str(),
                    record.strength,
                    record.volatility,
                    record.points_margin,
                    record.avg_opponent_strength,
                    record.rushing_margin,
                    record.home_field_correction,
                    record.games_played,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub season_count: usize,
    pub team_count: usize,
    pub game_count: usize,
    pub rating_set_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}
