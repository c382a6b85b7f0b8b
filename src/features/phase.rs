//! Season phases relative to the carryover boundary week

use std::fmt;

/// Which formulas apply to a week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonPhase {
    /// Week 0: prior season only, no coupling
    Preseason,
    /// Weeks before the boundary: current season blended with one prior-season game
    Blended,
    /// Boundary week onwards: current season only
    Mature,
}

impl SeasonPhase {
    pub fn for_week(week: u32, boundary_week: u32) -> Self {
        if week == 0 {
            SeasonPhase::Preseason
        } else if week < boundary_week {
            SeasonPhase::Blended
        } else {
            SeasonPhase::Mature
        }
    }

    /// Whether the previous season's terminal ratings feed this week
    pub fn uses_carryover(&self) -> bool {
        !matches!(self, SeasonPhase::Mature)
    }
}

impl fmt::Display for SeasonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonPhase::Preseason => write!(f, "preseason"),
            SeasonPhase::Blended => write!(f, "blended"),
            SeasonPhase::Mature => write!(f, "mature"),
        }
    }
}
