//! League strength ratings
//!
//! Solves a schedule-coupled system of linear equations for every team's
//! strength each week, and derives rankings, predictions and accuracy
//! reports from the resulting ratings.

pub mod data;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod predict;
pub mod ranking;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique key for a team (its standard name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamKey(pub String);

impl TeamKey {
    pub fn new(key: impl Into<String>) -> Self {
        TeamKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject keys that cannot be written as a plain CSV field
    pub fn validate(&self) -> Result<()> {
        let key = self.as_str();
        if key.is_empty()
            || key.trim() != key
            || key.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r'))
        {
            return Err(RatingError::Parse(format!("Invalid team key {:?}", key)));
        }
        Ok(())
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamKey {
    fn from(key: &str) -> Self {
        TeamKey(key.to_string())
    }
}

/// Where a game was played, from one team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Home,
    Away,
    Neutral,
}

impl Site {
    /// Contribution of one game to the home-field correction
    pub fn correction(&self) -> f64 {
        match self {
            Site::Home => -1.0,
            Site::Away => 1.0,
            Site::Neutral => 0.0,
        }
    }
}

/// A team in one season's registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub key: TeamKey,
    pub conference: String,
    #[serde(default)]
    pub division: Option<String>,
}

/// One played game from a team's schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub opponent: TeamKey,
    pub site: Site,
    pub week: u32,
}

/// A completed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub year: i32,
    pub week: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub home: TeamKey,
    pub away: TeamKey,
    pub home_points: u32,
    pub away_points: u32,
    #[serde(default)]
    pub home_rushing_yards: i32,
    #[serde(default)]
    pub away_rushing_yards: i32,
    #[serde(default)]
    pub neutral_site: bool,
}

impl GameResult {
    /// Returns the winning team, or None for a tie
    pub fn winner(&self) -> Option<&TeamKey> {
        match self.home_points.cmp(&self.away_points) {
            std::cmp::Ordering::Greater => Some(&self.home),
            std::cmp::Ordering::Less => Some(&self.away),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Score margin (positive = home win)
    pub fn margin(&self) -> i64 {
        self.home_points as i64 - self.away_points as i64
    }

    /// The game without its result
    pub fn fixture(&self) -> Fixture {
        Fixture {
            year: self.year,
            week: self.week,
            date: self.date,
            home: self.home.clone(),
            away: self.away.clone(),
            neutral_site: self.neutral_site,
        }
    }

    /// Site of the game for the given team
    pub fn site_for(&self, team: &TeamKey) -> Option<Site> {
        if self.neutral_site && (team == &self.home || team == &self.away) {
            Some(Site::Neutral)
        } else if team == &self.home {
            Some(Site::Home)
        } else if team == &self.away {
            Some(Site::Away)
        } else {
            None
        }
    }
}

/// A scheduled game, played or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub year: i32,
    pub week: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub home: TeamKey,
    pub away: TeamKey,
    #[serde(default)]
    pub neutral_site: bool,
}

/// A week argument: a regular-season week number or the terminal bowl week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Week {
    Regular(u32),
    Bowl,
}

impl Week {
    /// Resolve to a week index; the bowl week is `number_of_weeks + 1`
    pub fn resolve(&self, number_of_weeks: u32) -> Result<u32> {
        match *self {
            Week::Bowl => Ok(number_of_weeks + 1),
            Week::Regular(week) if week > number_of_weeks => Err(RatingError::InvalidWeek {
                week,
                number_of_weeks,
            }),
            Week::Regular(week) => Ok(week),
        }
    }
}

impl FromStr for Week {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("bowl") {
            return Ok(Week::Bowl);
        }
        s.parse::<u32>()
            .map(Week::Regular)
            .map_err(|_| RatingError::Parse(format!("Invalid week '{}': expected a number or 'bowl'", s)))
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Week::Regular(week) => write!(f, "{:02}", week),
            Week::Bowl => write!(f, "bowl"),
        }
    }
}

/// Rating of one team for one (year, week)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingRecord {
    pub strength: f64,
    pub volatility: f64,
    pub points_margin: f64,
    pub avg_opponent_strength: f64,
    pub rushing_margin: f64,
    pub home_field_correction: f64,
    pub games_played: f64,
}

/// Ratings of every team for one (year, week), in registry order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingSet {
    entries: Vec<(TeamKey, RatingRecord)>,
    index: HashMap<TeamKey, usize>,
}

impl RatingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the record for a team
    pub fn insert(&mut self, team: TeamKey, record: RatingRecord) {
        match self.index.get(&team) {
            Some(&i) => self.entries[i].1 = record,
            None => {
                self.index.insert(team.clone(), self.entries.len());
                self.entries.push((team, record));
            }
        }
    }

    pub fn get(&self, team: &TeamKey) -> Option<&RatingRecord> {
        self.index.get(team).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TeamKey, &RatingRecord)> {
        self.entries.iter().map(|(team, record)| (team, record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(TeamKey, RatingRecord)> for RatingSet {
    fn from_iter<I: IntoIterator<Item = (TeamKey, RatingRecord)>>(iter: I) -> Self {
        let mut set = RatingSet::new();
        for (team, record) in iter {
            set.insert(team, record);
        }
        set
    }
}

/// Predicted outcome of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub home: TeamKey,
    pub away: TeamKey,
    pub winner: TeamKey,
    /// Predicted margin of victory for the winner (never negative)
    pub margin: f64,
    pub neutral_site: bool,
}

impl Prediction {
    pub fn home_favored(&self) -> bool {
        self.winner == self.home
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("No statistics available for {year} week {week}")]
    MissingStats { year: i32, week: u32 },

    #[error("No ratings available for {year} week {week}")]
    MissingRatings { year: i32, week: u32 },

    #[error("No team registry for {0}")]
    MissingTeams(i32),

    #[error("No season information for {0}")]
    MissingSeason(i32),

    #[error("Week {week} exceeds the {number_of_weeks} regular weeks of the season. Did you mean 'bowl'?")]
    InvalidWeek { week: u32, number_of_weeks: u32 },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Ratings for {year} week {week} already exist")]
    RatingsExist { year: i32, week: u32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, RatingError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub replacement: ReplacementLevel,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// First week that ignores the previous season entirely
    pub season_boundary_week: u32,
    /// Weight of the rushing-yards margin in the right-hand side
    pub rushing_coefficient: f64,
    /// Weight of the home-field correction in the right-hand side
    pub home_field_coefficient: f64,
    /// Reciprocal condition number below which the exact solve is skipped
    pub singular_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            season_boundary_week: 9,
            rushing_coefficient: 0.0837058862488956,
            home_field_coefficient: 4.0,
            singular_tolerance: 1e-10,
        }
    }
}

/// Per-game profile assumed for a team with no prior-season data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplacementLevel {
    pub points_margin: f64,
    pub rushing_margin: f64,
    pub home_field_correction: f64,
    pub avg_opponent_strength: f64,
}

impl Default for ReplacementLevel {
    fn default() -> Self {
        ReplacementLevel {
            points_margin: -24.0,
            rushing_margin: -110.0,
            // Replacement-level opponents nearly always travel
            home_field_correction: 1.0,
            avg_opponent_strength: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Points added to the home team's strength at a true home game
    pub home_field_advantage: f64,
    /// Key of the pooled lower-division team, if the league uses one
    pub replacement_team: Option<String>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            home_field_advantage: 4.0,
            replacement_team: Some("FCS".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub output_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/gridrank.db".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RatingError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| RatingError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RatingError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_parse_and_resolve() {
        assert_eq!("bowl".parse::<Week>().unwrap(), Week::Bowl);
        assert_eq!("BOWL".parse::<Week>().unwrap(), Week::Bowl);
        assert_eq!("7".parse::<Week>().unwrap(), Week::Regular(7));
        assert!("seven".parse::<Week>().is_err());

        assert_eq!(Week::Bowl.resolve(14).unwrap(), 15);
        assert_eq!(Week::Regular(14).resolve(14).unwrap(), 14);
        assert!(matches!(
            Week::Regular(15).resolve(14),
            Err(RatingError::InvalidWeek { week: 15, number_of_weeks: 14 })
        ));
    }

    #[test]
    fn test_team_key_validation() {
        assert!(TeamKey::from("Texas A&M").validate().is_ok());
        assert!(TeamKey::from("Miami (OH)").validate().is_ok());
        for bad in ["", " Navy", "Army, West Point", "\"Navy\"", "Air\nForce"] {
            assert!(TeamKey::from(bad).validate().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_site_for_neutral_game() {
        let game = GameResult {
            year: 2023,
            week: 15,
            date: None,
            home: "A".into(),
            away: "B".into(),
            home_points: 21,
            away_points: 24,
            home_rushing_yards: 100,
            away_rushing_yards: 140,
            neutral_site: true,
        };
        assert_eq!(game.site_for(&"A".into()), Some(Site::Neutral));
        assert_eq!(game.site_for(&"C".into()), None);
        assert_eq!(game.winner(), Some(&TeamKey::from("B")));
        assert_eq!(game.margin(), -3);
    }

    #[test]
    fn test_rating_set_keeps_insertion_order() {
        let mut set = RatingSet::new();
        set.insert("B".into(), RatingRecord { strength: 2.0, ..Default::default() });
        set.insert("A".into(), RatingRecord { strength: 1.0, ..Default::default() });
        set.insert("B".into(), RatingRecord { strength: 3.0, ..Default::default() });

        let keys: Vec<_> = set.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert_eq!(set.get(&"B".into()).unwrap().strength, 3.0);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.engine.season_boundary_week, 9);
        assert_eq!(parsed.prediction.replacement_team.as_deref(), Some("FCS"));
    }
}
