//! Feature extraction
//!
//! Converts season statistics into the vectors and coupling matrix of the
//! rating equations.

pub mod coupling;
pub mod extractor;
pub mod index;
pub mod phase;

pub use coupling::coupling_matrix;
pub use extractor::{Carryover, FeatureExtractor, Features, PhaseInput, PriorProfile};
pub use index::TeamIndex;
pub use phase::SeasonPhase;
