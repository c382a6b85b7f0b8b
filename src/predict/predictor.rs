//! Game predictions from team strengths

use crate::data::store::SeasonData;
use crate::{Fixture, Prediction, PredictionConfig, RatingError, RatingSet, Result, TeamKey};

/// Picks winners by comparing strengths, with a home-field bonus
pub struct Predictor<'a> {
    ratings: &'a RatingSet,
    home_field_advantage: f64,
}

impl<'a> Predictor<'a> {
    pub fn new(ratings: &'a RatingSet, home_field_advantage: f64) -> Self {
        Predictor {
            ratings,
            home_field_advantage,
        }
    }

    fn strength(&self, team: &TeamKey) -> Result<f64> {
        self.ratings
            .get(team)
            .map(|r| r.strength)
            .ok_or_else(|| RatingError::UnknownTeam(team.to_string()))
    }

    /// Predict a game; neutral-site games get no home-field bonus
    pub fn predict(&self, home: &TeamKey, away: &TeamKey, neutral_site: bool) -> Result<Prediction> {
        let bonus = if neutral_site {
            0.0
        } else {
            self.home_field_advantage
        };
        let home_strength = self.strength(home)? + bonus;
        let away_strength = self.strength(away)?;

        let winner = if home_strength >= away_strength {
            home.clone()
        } else {
            away.clone()
        };

        Ok(Prediction {
            home: home.clone(),
            away: away.clone(),
            winner,
            margin: (home_strength - away_strength).abs(),
            neutral_site,
        })
    }

    /// Predict a scheduled game; every bowl game is treated as neutral
    pub fn predict_fixture(&self, fixture: &Fixture, bowl_week: bool) -> Result<Prediction> {
        self.predict(&fixture.home, &fixture.away, fixture.neutral_site || bowl_week)
    }
}

/// Ratings available before the games of `week` are played (those of `week - 1`)
pub fn pregame_ratings<D: SeasonData>(data: &D, year: i32, week: u32) -> Result<RatingSet> {
    let previous = week.saturating_sub(1);
    if week == 0 {
        return Err(RatingError::MissingRatings { year, week: previous });
    }
    data.rating_records(year, previous)?
        .ok_or(RatingError::MissingRatings { year, week: previous })
}

/// Every game of a week: scheduled games first, then results with no
/// matching schedule entry
pub fn week_slate<D: SeasonData>(data: &D, year: i32, week: u32) -> Result<Vec<Fixture>> {
    let mut slate = data.scheduled_games(year, week)?;
    for game in data.games_in_week(year, week)? {
        let listed = slate
            .iter()
            .any(|f| f.home == game.home && f.away == game.away);
        if !listed {
            slate.push(game.fixture());
        }
    }
    Ok(slate)
}

/// Predict every game of a week from the ratings of the week before
pub fn predict_week<D: SeasonData>(
    data: &D,
    year: i32,
    week: u32,
    config: &PredictionConfig,
) -> Result<Vec<Prediction>> {
    let bowl_week = week == data.number_of_weeks(year)? + 1;
    let ratings = pregame_ratings(data, year, week)?;
    let predictor = Predictor::new(&ratings, config.home_field_advantage);

    let predictions = week_slate(data, year, week)?
        .iter()
        .map(|fixture| predictor.predict_fixture(fixture, bowl_week))
        .collect::<Result<Vec<_>>>()?;

    log::info!("Predicted {} games for {} week {}", predictions.len(), year, week);
    Ok(predictions)
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction) -> String {
    let separator = if pred.neutral_site { "vs" } else { "@" };
    format!(
        "{} {} {}: Predicted Winner: {}, Predicted MoV: {:.1}",
        pred.away, separator, pred.home, pred.winner, pred.margin
    )
}
