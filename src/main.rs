//! Gridrank CLI
//!
//! Weekly strength ratings, rankings and predictions for a league.

use clap::{Parser, Subcommand};
use gridrank::{Config, Result};

#[derive(Parser)]
#[command(name = "gridrank")]
#[command(about = "League strength ratings from season-to-date results", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Compute ratings for one week
    Model {
        year: i32,
        /// Week number, 0 for preseason, or "bowl"
        week: String,
        /// Replace ratings already stored for this week
        #[arg(long)]
        force: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Compute ratings for every week of a season
    Season {
        year: i32,
        /// Recompute weeks that already have ratings
        #[arg(long)]
        force: bool,
    },
    /// Show team, conference and division rankings
    Rank {
        year: i32,
        /// Week number, 0 for preseason, or "bowl"
        week: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict every game of a week, or one game given both teams
    Predict {
        year: i32,
        /// Week the games are played in, or "bowl"
        week: String,
        /// Home team key
        home: Option<String>,
        /// Away team key
        away: Option<String>,
        /// Single game is at a neutral site
        #[arg(long)]
        neutral: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Measure prediction accuracy over a range of seasons
    Evaluate {
        start: i32,
        end: i32,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import a season file (JSON)
    Import {
        /// Path to the season file
        file: String,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Import { file } => commands::data_import(&config, &file),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Model {
            year,
            week,
            force,
            format,
        } => commands::model(&config, year, &week, force, format),
        Commands::Season { year, force } => commands::season(&config, year, force),
        Commands::Rank { year, week, format } => commands::rank(&config, year, &week, format),
        Commands::Predict {
            year,
            week,
            home,
            away,
            neutral,
            format,
        } => match (home, away) {
            (Some(home), Some(away)) => {
                commands::predict(&config, year, &week, &home, &away, neutral, format)
            }
            (None, None) => commands::predict_week(&config, year, &week, format),
            _ => Err(gridrank::RatingError::Parse(
                "Give both home and away teams, or neither".to_string(),
            )),
        },
        Commands::Evaluate { start, end, format } => {
            commands::evaluate(&config, start, end, format)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridrank::data::export::{save_predictions_csv, save_ratings_csv, write_predictions};
    use gridrank::data::{Database, SeasonData, SeasonFile};
    use gridrank::evaluation::evaluate as run_evaluation;
    use gridrank::model::RatingEngine;
    use gridrank::predict::{format_prediction, pregame_ratings, predict_week as run_predictions, Predictor};
    use gridrank::ranking::{format_rankings, GroupRanking, Rankings};
    use gridrank::{RatingError, Week};

    fn open(config: &Config) -> Result<Database> {
        Database::open(&config.data.database_path)
    }

    fn resolve_week(db: &Database, year: i32, week: &str) -> Result<u32> {
        let week: Week = week.parse()?;
        week.resolve(db.number_of_weeks(year)?)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.output_dir)?;
        println!("Created data/ and {}/ directories", config.data.output_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'gridrank data import <season.json>' to load a season");
        println!("  3. Run 'gridrank season <year>' to compute ratings");
        println!("  4. Run 'gridrank rank <year> <week>' to view rankings");

        Ok(())
    }

    pub fn data_import(config: &Config, file: &str) -> Result<()> {
        let db = open(config)?;
        let season = SeasonFile::load(file)?;
        season.validate()?;
        let count = season.store(&db)?;
        println!("Stored {} games for {}", count, season.year);
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = open(config)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Seasons:  {}", stats.season_count);
        println!("  Teams:    {}", stats.team_count);
        println!("  Games:    {}", stats.game_count);
        println!("  Ratings:  {} weeks", stats.rating_set_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn model(
        config: &Config,
        year: i32,
        week: &str,
        force: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let db = open(config)?;
        let week = resolve_week(&db, year, week)?;
        let engine = RatingEngine::new(&db, config);

        let output = engine.compute_and_store(year, week, force)?;
        let path = save_ratings_csv(&config.data.output_dir, year, week, &output.ratings)?;
        log::info!("Wrote {}", path.display());

        match format {
            OutputFormat::Table => {
                println!(
                    "{} week {} ({} phase, {:?} solve)",
                    year, week, output.phase, output.method
                );
                println!("───────────────────────────────");
                let mut rows: Vec<_> = output.ratings.iter().collect();
                rows.sort_by(|a, b| b.1.strength.total_cmp(&a.1.strength));
                for (team, r) in rows {
                    println!(
                        "  {:<24} {:>7.2}  ±{:.2}  ({} games)",
                        team.as_str(),
                        r.strength,
                        r.volatility,
                        r.games_played
                    );
                }
            }
            OutputFormat::Json => {
                let teams: Vec<_> = output
                    .ratings
                    .iter()
                    .map(|(team, r)| serde_json::json!({ "team": team, "rating": r }))
                    .collect();
                let json = serde_json::json!({
                    "year": year,
                    "week": week,
                    "phase": output.phase.to_string(),
                    "teams": teams,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                gridrank::data::export::write_ratings(std::io::stdout().lock(), &output.ratings)?;
            }
        }

        Ok(())
    }

    pub fn season(config: &Config, year: i32, force: bool) -> Result<()> {
        let db = open(config)?;
        let engine = RatingEngine::new(&db, config);
        let computed = engine.compute_season(year, force)?;

        let number_of_weeks = db.number_of_weeks(year)?;
        for week in 0..=number_of_weeks + 1 {
            if let Some(ratings) = db.rating_records(year, week)? {
                save_ratings_csv(&config.data.output_dir, year, week, &ratings)?;
            }
        }

        println!("Computed {} weeks for {}", computed, year);
        Ok(())
    }

    pub fn rank(config: &Config, year: i32, week: &str, format: OutputFormat) -> Result<()> {
        let db = open(config)?;
        let week = resolve_week(&db, year, week)?;

        let ratings = db
            .rating_records(year, week)?
            .ok_or(RatingError::MissingRatings { year, week })?;
        let record = if week == 0 {
            None
        } else {
            db.stats(year, week)?
        };
        let previous = match week.checked_sub(1) {
            Some(prev) => match db.rating_records(year, prev)? {
                Some(prev_ratings) => {
                    let prev_record = if prev == 0 { None } else { db.stats(year, prev)? };
                    Some(Rankings::compose(&prev_ratings, prev_record.as_ref(), None))
                }
                None => None,
            },
            None => None,
        };

        let rankings = Rankings::compose(&ratings, record.as_ref(), previous.as_ref());
        let teams = db.teams(year)?;
        let conferences = rankings.conferences(&teams);
        let divisions = rankings.divisions(&teams);

        match format {
            OutputFormat::Table => {
                println!("{} week {} rankings", year, week);
                println!("───────────────────────────────");
                print!("{}", format_rankings(&rankings));
                print_groups("Conferences", &conferences);
                print_groups("Divisions", &divisions);
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "year": year,
                    "week": week,
                    "teams": rankings.teams,
                    "conferences": conferences,
                    "divisions": divisions,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                rankings.write_csv(std::io::stdout().lock())?;
            }
        }

        Ok(())
    }

    fn print_groups(title: &str, groups: &[GroupRanking]) {
        if groups.is_empty() {
            return;
        }
        println!("\n{}", title);
        for (i, g) in groups.iter().enumerate() {
            println!("{:>3}: {}, Score: {:.2}", i + 1, g.group, g.score);
        }
    }

    pub fn predict(
        config: &Config,
        year: i32,
        week: &str,
        home: &str,
        away: &str,
        neutral: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let db = open(config)?;
        let number_of_weeks = db.number_of_weeks(year)?;
        let week = week.parse::<Week>()?.resolve(number_of_weeks)?;
        let bowl_week = week == number_of_weeks + 1;

        let ratings = pregame_ratings(&db, year, week)?;
        let predictor = Predictor::new(&ratings, config.prediction.home_field_advantage);
        let prediction = predictor.predict(&home.into(), &away.into(), neutral || bowl_week)?;

        match format {
            OutputFormat::Table => println!("{}", format_prediction(&prediction)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
            OutputFormat::Csv => write_predictions(std::io::stdout().lock(), &[prediction])?,
        }

        Ok(())
    }

    pub fn predict_week(config: &Config, year: i32, week: &str, format: OutputFormat) -> Result<()> {
        let db = open(config)?;
        let week = resolve_week(&db, year, week)?;

        let predictions = run_predictions(&db, year, week, &config.prediction)?;
        let path = save_predictions_csv(&config.data.output_dir, year, week, &predictions)?;
        log::info!("Wrote {}", path.display());

        match format {
            OutputFormat::Table => {
                println!("{} week {} predictions", year, week);
                println!("───────────────────────────────");
                for prediction in &predictions {
                    println!("{}", format_prediction(prediction));
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&predictions)?),
            OutputFormat::Csv => write_predictions(std::io::stdout().lock(), &predictions)?,
        }

        Ok(())
    }

    pub fn evaluate(config: &Config, start: i32, end: i32, format: OutputFormat) -> Result<()> {
        if start > end {
            return Err(RatingError::Parse(format!(
                "Start year {} is after end year {}",
                start, end
            )));
        }
        let db = open(config)?;
        let report = run_evaluation(&db, start, end, &config.prediction)?;

        match format {
            OutputFormat::Table => {
                println!("Prediction accuracy {}-{}", start, end);
                println!("───────────────────────────────");
                print!("{}", report);
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Csv => {
                println!("bucket,games,correct,accuracy");
                let fixed = [
                    ("all", &report.all),
                    ("conference", &report.conference),
                    ("non_conference", &report.non_conference),
                    ("championship", &report.championship),
                    ("replacement", &report.replacement),
                    ("bowl", &report.bowl),
                ];
                for (name, bucket) in fixed {
                    println!(
                        "{},{},{},{}",
                        name,
                        bucket.games,
                        bucket.correct,
                        bucket.accuracy().map(|a| format!("{:.2}", a)).unwrap_or_default()
                    );
                }
            }
        }

        Ok(())
    }
}
