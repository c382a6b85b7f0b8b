//! Rating model
//!
//! Solver, volatility estimate and the engine that runs them per (year, week).

pub mod engine;
pub mod solver;
pub mod volatility;

pub use engine::{ModelOutput, RatingEngine, WeekSolution};
pub use solver::{RatingSolver, Solution, SolveMethod};
