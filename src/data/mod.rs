//! Data ingestion and storage
//!
//! Season files, SQLite storage, season-to-date snapshots and rating exports.

pub mod database;
pub mod export;
pub mod import;
pub mod snapshot;
pub mod store;

pub use database::Database;
pub use import::SeasonFile;
pub use snapshot::{Snapshot, TeamSeasonStats};
pub use store::{MemoryStore, RatingStore, SeasonData};
