//! Rating engine: one (year, week) computation from statistics to ratings

use nalgebra::{DMatrix, DVector};

use crate::data::snapshot::Snapshot;
use crate::data::store::{RatingStore, SeasonData};
use crate::features::{
    coupling_matrix, Carryover, FeatureExtractor, Features, PhaseInput, SeasonPhase, TeamIndex,
};
use crate::model::solver::{RatingSolver, Solution, SolveMethod};
use crate::model::volatility;
use crate::{Config, EngineConfig, RatingError, RatingRecord, RatingSet, Result};

/// Ratings for one (year, week)
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub year: i32,
    pub week: u32,
    pub phase: SeasonPhase,
    pub method: SolveMethod,
    /// Records in team registry order
    pub ratings: RatingSet,
    pub strengths: DVector<f64>,
    pub volatilities: DVector<f64>,
}

/// Everything solved for a week before volatility is attached
#[derive(Debug, Clone)]
pub struct WeekSolution {
    pub features: Features,
    pub coupling: DMatrix<f64>,
    pub solution: Solution,
}

impl WeekSolution {
    /// Strength-weighted average of each team's opponents
    pub fn avg_opponent_strengths(&self) -> DVector<f64> {
        &self.coupling * &self.solution.strengths
    }
}

/// Season statistics and the previous season's carryover, loaded for one week
struct WeekInputs {
    current: Option<Snapshot>,
    prior: Option<(Snapshot, RatingSet)>,
}

/// Computes ratings from a [`SeasonData`] source
pub struct RatingEngine<'a, D> {
    data: &'a D,
    config: EngineConfig,
    extractor: FeatureExtractor,
    solver: RatingSolver,
}

impl<'a, D: SeasonData> RatingEngine<'a, D> {
    pub fn new(data: &'a D, config: &Config) -> Self {
        RatingEngine {
            data,
            config: config.engine.clone(),
            extractor: FeatureExtractor::new(config.replacement),
            solver: RatingSolver::new(&config.engine),
        }
    }

    pub fn phase(&self, week: u32) -> SeasonPhase {
        SeasonPhase::for_week(week, self.config.season_boundary_week)
    }

    /// Compute ratings and volatilities for (year, week)
    ///
    /// `week` is a resolved week index: `0` is the preseason and
    /// `number_of_weeks + 1` the final bowl week.
    pub fn compute(&self, year: i32, week: u32) -> Result<ModelOutput> {
        self.check_week(year, week)?;
        let teams = TeamIndex::from_teams(&self.data.teams(year)?);

        let solved = self.solve_week(year, week, &teams)?;
        let volatilities =
            volatility::estimate(week, teams.len(), |w| self.historical_strengths(year, w, &teams))?;
        let avg_opponent = solved.avg_opponent_strengths();

        let features = &solved.features;
        let strengths = solved.solution.strengths.clone();
        let ratings: RatingSet = teams
            .keys()
            .iter()
            .enumerate()
            .map(|(i, team)| {
                (
                    team.clone(),
                    RatingRecord {
                        strength: strengths[i],
                        volatility: volatilities[i],
                        points_margin: features.points_margin[i],
                        avg_opponent_strength: avg_opponent[i],
                        rushing_margin: features.rushing_margin[i],
                        home_field_correction: features.home_field_correction[i],
                        // A team that has not played still counts one game
                        games_played: features.games_played[i].max(1.0),
                    },
                )
            })
            .collect();

        log::info!(
            "Rated {} teams for {} week {} ({}, {:?} solve)",
            teams.len(),
            year,
            week,
            features.phase,
            solved.solution.method
        );

        Ok(ModelOutput {
            year,
            week,
            phase: features.phase,
            method: solved.solution.method,
            ratings,
            strengths,
            volatilities,
        })
    }

    /// Features, coupling and strengths for a week, without volatility
    pub fn solve_week(&self, year: i32, week: u32, teams: &TeamIndex) -> Result<WeekSolution> {
        let phase = self.phase(week);
        let inputs = self.load_inputs(year, week, phase)?;

        let input = match (phase, &inputs.current, &inputs.prior) {
            (SeasonPhase::Preseason, _, Some((stats, ratings))) => PhaseInput::Preseason {
                prior: Carryover { stats, ratings },
            },
            (SeasonPhase::Blended, Some(current), Some((stats, ratings))) => PhaseInput::Blended {
                current,
                prior: Carryover { stats, ratings },
            },
            (SeasonPhase::Mature, Some(current), _) => PhaseInput::Mature { current },
            _ => return Err(RatingError::MissingStats { year, week }),
        };

        let features = self.extractor.extract(teams, input);
        let coupling = coupling_matrix(input.current(), &features.games_played, teams)?;
        let solution = self.solver.solve(&features, &coupling);

        Ok(WeekSolution {
            features,
            coupling,
            solution,
        })
    }

    fn check_week(&self, year: i32, week: u32) -> Result<()> {
        let number_of_weeks = self.data.number_of_weeks(year)?;
        if week > number_of_weeks + 1 {
            return Err(RatingError::InvalidWeek {
                week,
                number_of_weeks,
            });
        }
        Ok(())
    }

    fn load_inputs(&self, year: i32, week: u32, phase: SeasonPhase) -> Result<WeekInputs> {
        let current = match phase {
            SeasonPhase::Preseason => None,
            _ => Some(
                self.data
                    .stats(year, week)?
                    .ok_or(RatingError::MissingStats { year, week })?,
            ),
        };

        let prior = if phase.uses_carryover() {
            let prior_year = year - 1;
            let prior_week = self.data.number_of_weeks(prior_year)? + 1;
            let ratings = self
                .data
                .rating_records(prior_year, prior_week)?
                .ok_or(RatingError::MissingRatings {
                    year: prior_year,
                    week: prior_week,
                })?;
            let stats = self
                .data
                .stats(prior_year, prior_week)?
                .ok_or(RatingError::MissingStats {
                    year: prior_year,
                    week: prior_week,
                })?;
            Some((stats, ratings))
        } else {
            None
        };

        Ok(WeekInputs { current, prior })
    }

    /// Strengths of an earlier week, from persisted ratings when complete
    fn historical_strengths(&self, year: i32, week: u32, teams: &TeamIndex) -> Result<DVector<f64>> {
        if let Some(stored) = self.data.rating_records(year, week)? {
            let strengths: Option<Vec<f64>> = teams
                .keys()
                .iter()
                .map(|team| stored.get(team).map(|r| r.strength))
                .collect();
            if let Some(strengths) = strengths {
                return Ok(DVector::from_vec(strengths));
            }
            log::debug!("Stored ratings for {} week {} miss teams, recomputing", year, week);
        }

        Ok(self.solve_week(year, week, teams)?.solution.strengths)
    }
}

impl<'a, D: SeasonData + RatingStore> RatingEngine<'a, D> {
    /// Compute and persist ratings for (year, week)
    ///
    /// Persisted ratings are never replaced unless `force` is set.
    pub fn compute_and_store(&self, year: i32, week: u32, force: bool) -> Result<ModelOutput> {
        if !force && self.data.rating_records(year, week)?.is_some() {
            return Err(RatingError::RatingsExist { year, week });
        }

        let output = self.compute(year, week)?;
        self.data.save_rating_records(year, week, &output.ratings)?;
        Ok(output)
    }

    /// Compute every played week of a season in order, from preseason
    /// through the bowl week or the last week with results
    ///
    /// Weeks that already have ratings are kept unless `force` is set.
    /// Returns the number of weeks computed.
    pub fn compute_season(&self, year: i32, force: bool) -> Result<usize> {
        let number_of_weeks = self.data.number_of_weeks(year)?;
        let last_played = self.data.last_played_week(year)?.unwrap_or(0);
        let last_week = last_played.min(number_of_weeks + 1);
        if last_week < number_of_weeks + 1 {
            log::info!("{} has results through week {} only", year, last_week);
        }
        let mut computed = 0;

        for week in 0..=last_week {
            if !force && self.data.rating_records(year, week)?.is_some() {
                log::debug!("Keeping stored ratings for {} week {}", year, week);
                continue;
            }
            self.compute_and_store(year, week, true)?;
            computed += 1;
        }

        log::info!("Computed {} weeks of {}", computed, year);
        Ok(computed)
    }
}
