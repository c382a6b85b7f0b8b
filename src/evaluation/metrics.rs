//! Prediction accuracy over past seasons

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::data::store::SeasonData;
use crate::predict::{pregame_ratings, Predictor};
use crate::{GameResult, PredictionConfig, RatingError, Result, TeamKey};

/// Correct picks out of games predicted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub games: usize,
    pub correct: usize,
}

impl Bucket {
    pub fn record(&mut self, correct: bool) {
        self.games += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Percentage correct, None for an empty bucket
    pub fn accuracy(&self) -> Option<f64> {
        if self.games == 0 {
            None
        } else {
            Some(self.correct as f64 / self.games as f64 * 100.0)
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy() {
            Some(acc) => write!(f, "{:.2}% ({}/{})", acc, self.correct, self.games),
            None => write!(f, "n/a (0 games)"),
        }
    }
}

/// Accuracy broken down by game type, year and week
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    pub all: Bucket,
    pub conference: Bucket,
    pub non_conference: Bucket,
    pub championship: Bucket,
    pub replacement: Bucket,
    pub bowl: Bucket,
    pub by_year: BTreeMap<i32, Bucket>,
    /// Regular weeks only; bowl games are counted under `bowl`
    pub by_week: BTreeMap<u32, Bucket>,
}

/// Where a game falls for bucketing
struct GameKind {
    conference: bool,
    non_conference: bool,
    championship: bool,
    replacement: bool,
    bowl: bool,
}

impl GameKind {
    fn classify(
        game: &GameResult,
        conferences: &HashMap<TeamKey, String>,
        number_of_weeks: u32,
        replacement_team: Option<&TeamKey>,
    ) -> Self {
        let home = conferences.get(&game.home);
        let away = conferences.get(&game.away);
        let same_conference = matches!((home, away), (Some(h), Some(a)) if h == a);
        let replacement = replacement_team
            .map(|r| &game.home == r || &game.away == r)
            .unwrap_or(false);
        if game.week == number_of_weeks + 1 {
            return GameKind {
                conference: false,
                non_conference: false,
                championship: false,
                replacement: false,
                bowl: true,
            };
        }

        GameKind {
            conference: same_conference,
            non_conference: !same_conference && !replacement,
            championship: same_conference && game.week + 1 == number_of_weeks,
            replacement,
            bowl: false,
        }
    }
}

impl EvaluationReport {
    fn record(&mut self, year: i32, week: u32, kind: &GameKind, correct: bool) {
        self.all.record(correct);
        if kind.conference {
            self.conference.record(correct);
        }
        if kind.non_conference {
            self.non_conference.record(correct);
        }
        if kind.championship {
            self.championship.record(correct);
        }
        if kind.replacement {
            self.replacement.record(correct);
        }
        if kind.bowl {
            self.bowl.record(correct);
        }
        self.by_year.entry(year).or_default().record(correct);
        if !kind.bowl {
            self.by_week.entry(week).or_default().record(correct);
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "All games:       {}", self.all)?;
        writeln!(f, "Conference:      {}", self.conference)?;
        writeln!(f, "Non-conference:  {}", self.non_conference)?;
        writeln!(f, "Championship:    {}", self.championship)?;
        writeln!(f, "Replacement:     {}", self.replacement)?;
        writeln!(f, "Bowl:            {}", self.bowl)?;
        for (year, bucket) in &self.by_year {
            writeln!(f, "  {}: {}", year, bucket)?;
        }
        for (week, bucket) in &self.by_week {
            writeln!(f, "  Week {:>2}: {}", week, bucket)?;
        }
        Ok(())
    }
}

/// Replay predictions for every decided game from `start` through `end`
pub fn evaluate<D: SeasonData>(
    data: &D,
    start: i32,
    end: i32,
    config: &PredictionConfig,
) -> Result<EvaluationReport> {
    let replacement_team = config.replacement_team.as_deref().map(TeamKey::from);
    let mut report = EvaluationReport::default();

    for year in start..=end {
        let number_of_weeks = data.number_of_weeks(year)?;
        let conferences: HashMap<TeamKey, String> = data
            .teams(year)?
            .into_iter()
            .map(|t| (t.key, t.conference))
            .collect();

        for week in 1..=number_of_weeks + 1 {
            let ratings = match pregame_ratings(data, year, week) {
                Ok(ratings) => ratings,
                Err(RatingError::MissingRatings { .. }) => {
                    log::warn!("No ratings before {} week {}, skipping", year, week);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let predictor = Predictor::new(&ratings, config.home_field_advantage);
            let bowl_week = week == number_of_weeks + 1;

            for game in data.games_in_week(year, week)? {
                let Some(actual) = game.winner() else {
                    continue;
                };
                let prediction = match predictor.predict_fixture(&game.fixture(), bowl_week) {
                    Ok(p) => p,
                    Err(RatingError::UnknownTeam(team)) => {
                        log::debug!("{} {} vs {}: no rating for {}", year, game.home, game.away, team);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let kind = GameKind::classify(
                    &game,
                    &conferences,
                    number_of_weeks,
                    replacement_team.as_ref(),
                );
                report.record(year, week, &kind, &prediction.winner == actual);
            }
        }
        log::info!(
            "{}: {}",
            year,
            report.by_year.get(&year).copied().unwrap_or_default()
        );
    }

    Ok(report)
}
