//! CSV export of rating sets and weekly predictions
//!
//! Team keys are written as plain fields; keys that would need quoting are
//! rejected with [`TeamKey::validate`].

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{Prediction, RatingError, RatingRecord, RatingSet, Result, TeamKey};

pub const RATING_HEADER: &str = "Team,Strength,Volatility,PointsMargin,AverageOpponentStrength,RushingMargin,HomeFieldCorrection,GamesPlayed";

pub const PREDICTION_HEADER: &str = "AwayTeam,HomeTeam,PredictedWinner,PredictedMoV,NeutralSite";

/// File name for a rating set, e.g. `ratings-2023-07.csv`
pub fn rating_file_name(year: i32, week: u32) -> String {
    format!("ratings-{}-{:02}.csv", year, week)
}

/// Write a rating set as CSV with a header row
///
/// Floats use Rust's shortest round-trip formatting, so reading the file back
/// reproduces identical values.
pub fn write_ratings<W: Write>(mut out: W, ratings: &RatingSet) -> Result<()> {
    writeln!(out, "{}", RATING_HEADER)?;
    for (team, r) in ratings.iter() {
        team.validate()?;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            team,
            r.strength,
            r.volatility,
            r.points_margin,
            r.avg_opponent_strength,
            r.rushing_margin,
            r.home_field_correction,
            r.games_played
        )?;
    }
    Ok(())
}

/// Data rows of a CSV file with the given header, split into `width` fields
fn read_rows<R: BufRead>(input: R, header: &str, width: usize) -> Result<Vec<(usize, Vec<String>)>> {
    let mut lines = input.lines();
    let first = lines.next().transpose()?;
    if first.as_deref().map(str::trim) != Some(header) {
        return Err(RatingError::Parse(format!("Missing header row: {}", header)));
    }

    let mut rows = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(',').map(str::to_string).collect();
        if fields.len() != width {
            return Err(RatingError::Parse(format!(
                "Line {}: expected {} fields, found {}",
                i + 2,
                width,
                fields.len()
            )));
        }
        rows.push((i + 2, fields));
    }
    Ok(rows)
}

fn parse_field<T: std::str::FromStr>(line_no: usize, field: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    field
        .parse::<T>()
        .map_err(|e| RatingError::Parse(format!("Line {}: bad value '{}': {}", line_no, field, e)))
}

/// Read a rating set written by [`write_ratings`]
pub fn read_ratings<R: BufRead>(input: R) -> Result<RatingSet> {
    let mut ratings = RatingSet::new();
    for (line_no, fields) in read_rows(input, RATING_HEADER, 8)? {
        let value = |i: usize| parse_field::<f64>(line_no, &fields[i]);
        ratings.insert(
            TeamKey::new(fields[0].as_str()),
            RatingRecord {
                strength: value(1)?,
                volatility: value(2)?,
                points_margin: value(3)?,
                avg_opponent_strength: value(4)?,
                rushing_margin: value(5)?,
                home_field_correction: value(6)?,
                games_played: value(7)?,
            },
        );
    }
    Ok(ratings)
}

/// Write a rating set to `<dir>/<year>/ratings-<year>-<week>.csv`
pub fn save_ratings_csv<P: AsRef<Path>>(dir: P, year: i32, week: u32, ratings: &RatingSet) -> Result<PathBuf> {
    let path = prepare_path(dir.as_ref(), year, &rating_file_name(year, week))?;
    let mut out = BufWriter::new(File::create(&path)?);
    write_ratings(&mut out, ratings)?;
    out.flush()?;
    Ok(path)
}

pub fn load_ratings_csv<P: AsRef<Path>>(path: P) -> Result<RatingSet> {
    let file = File::open(path)?;
    read_ratings(BufReader::new(file))
}

fn prepare_path(dir: &Path, year: i32, file_name: &str) -> Result<PathBuf> {
    let dir = dir.join(year.to_string());
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(file_name))
}

/// File name for a week's predictions, e.g. `predictions-2023-07.csv`
pub fn prediction_file_name(year: i32, week: u32) -> String {
    format!("predictions-{}-{:02}.csv", year, week)
}

/// Write predictions as CSV, away team first
pub fn write_predictions<W: Write>(mut out: W, predictions: &[Prediction]) -> Result<()> {
    writeln!(out, "{}", PREDICTION_HEADER)?;
    for p in predictions {
        p.away.validate()?;
        p.home.validate()?;
        writeln!(
            out,
            "{},{},{},{},{}",
            p.away, p.home, p.winner, p.margin, p.neutral_site
        )?;
    }
    Ok(())
}

/// Read predictions written by [`write_predictions`]
pub fn read_predictions<R: BufRead>(input: R) -> Result<Vec<Prediction>> {
    read_rows(input, PREDICTION_HEADER, 5)?
        .into_iter()
        .map(|(line_no, fields)| {
            let prediction = Prediction {
                away: TeamKey::new(fields[0].as_str()),
                home: TeamKey::new(fields[1].as_str()),
                winner: TeamKey::new(fields[2].as_str()),
                margin: parse_field(line_no, &fields[3])?,
                neutral_site: parse_field(line_no, &fields[4])?,
            };
            if prediction.winner != prediction.home && prediction.winner != prediction.away {
                return Err(RatingError::Parse(format!(
                    "Line {}: winner {} did not play",
                    line_no, prediction.winner
                )));
            }
            Ok(prediction)
        })
        .collect()
}

/// Write predictions to `<dir>/<year>/predictions-<year>-<week>.csv`
pub fn save_predictions_csv<P: AsRef<Path>>(
    dir: P,
    year: i32,
    week: u32,
    predictions: &[Prediction],
) -> Result<PathBuf> {
    let path = prepare_path(dir.as_ref(), year, &prediction_file_name(year, week))?;
    let mut out = BufWriter::new(File::create(&path)?);
    write_predictions(&mut out, predictions)?;
    out.flush()?;
    Ok(path)
}

pub fn load_predictions_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Prediction>> {
    let file = File::open(path)?;
    read_predictions(BufReader::new(file))
}
