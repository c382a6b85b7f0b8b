//! Backtesting of predictions against recorded results

pub mod metrics;

pub use metrics::{evaluate, Bucket, EvaluationReport};
