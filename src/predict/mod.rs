//! Predictions
//!
//! Pick winners and margins from stored team strengths.

pub mod predictor;

pub use predictor::{format_prediction, predict_week, pregame_ratings, week_slate, Predictor};
