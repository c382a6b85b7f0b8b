//! Stable team-to-position mapping shared by every vector and matrix of one computation

use std::collections::HashMap;

use crate::{RatingError, Result, Team, TeamKey};

/// Ordered team keys with reverse lookup
#[derive(Debug, Clone, Default)]
pub struct TeamIndex {
    keys: Vec<TeamKey>,
    positions: HashMap<TeamKey, usize>,
}

impl TeamIndex {
    pub fn new(keys: Vec<TeamKey>) -> Self {
        let positions = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i))
            .collect();
        TeamIndex { keys, positions }
    }

    pub fn from_teams(teams: &[Team]) -> Self {
        Self::new(teams.iter().map(|t| t.key.clone()).collect())
    }

    pub fn position(&self, team: &TeamKey) -> Option<usize> {
        self.positions.get(team).copied()
    }

    /// Position of a team, failing for keys outside the registry
    pub fn require(&self, team: &TeamKey) -> Result<usize> {
        self.position(team)
            .ok_or_else(|| RatingError::UnknownTeam(team.to_string()))
    }

    pub fn keys(&self) -> &[TeamKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_follow_input_order() {
        let index = TeamIndex::new(vec!["C".into(), "A".into(), "B".into()]);
        assert_eq!(index.position(&"C".into()), Some(0));
        assert_eq!(index.position(&"B".into()), Some(2));
        assert!(index.require(&"Z".into()).is_err());
        assert_eq!(index.len(), 3);
    }
}
