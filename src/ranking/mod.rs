//! Team, conference and division rankings
//!
//! Blends normalized strength with the win/loss record.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::data::snapshot::Snapshot;
use crate::{RatingSet, Result, Team, TeamKey};

pub const RANKING_HEADER: &str = "Team,Rank,PrevRank,DeltaRank,TeamScore,Strength,Volatility";

/// One team's place in the weekly ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRanking {
    pub team: TeamKey,
    pub rank: usize,
    /// Rank the previous week, 0 when unranked
    pub previous_rank: usize,
    /// Places gained since the previous week
    pub delta_rank: i64,
    pub team_score: f64,
    pub strength: f64,
    pub volatility: f64,
}

/// Mean team score of a conference or division
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRanking {
    pub group: String,
    pub score: f64,
}

/// Rankings sorted best first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rankings {
    pub teams: Vec<TeamRanking>,
}

impl Rankings {
    /// Rank teams for a week
    ///
    /// `record` is the season-to-date snapshot (None in the preseason, where
    /// the score is half the normalized strength). `previous` supplies last
    /// week's ranks.
    pub fn compose(
        ratings: &RatingSet,
        record: Option<&Snapshot>,
        previous: Option<&Rankings>,
    ) -> Self {
        let min_strength = ratings
            .iter()
            .map(|(_, r)| r.strength)
            .fold(f64::INFINITY, f64::min);

        let mut scored: Vec<(TeamKey, f64, f64, f64)> = ratings
            .iter()
            .map(|(team, r)| {
                let normalized = r.strength - min_strength;
                let score = match record {
                    None => normalized * 0.5,
                    Some(snapshot) => {
                        let stats = snapshot.get_or_default(team);
                        normalized * (stats.wins as f64 + 2.0) / (stats.games_played as f64 + 4.0)
                    }
                };
                (team.clone(), score, r.strength, r.volatility)
            })
            .collect();

        // Stable sort keeps registry order for equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let teams = scored
            .into_iter()
            .enumerate()
            .map(|(i, (team, team_score, strength, volatility))| {
                let rank = i + 1;
                let previous_rank = previous.and_then(|p| p.rank_of(&team)).unwrap_or(0);
                TeamRanking {
                    team,
                    rank,
                    previous_rank,
                    delta_rank: previous_rank as i64 - rank as i64,
                    team_score,
                    strength,
                    volatility,
                }
            })
            .collect();

        Rankings { teams }
    }

    pub fn rank_of(&self, team: &TeamKey) -> Option<usize> {
        self.teams.iter().find(|t| &t.team == team).map(|t| t.rank)
    }

    pub fn get(&self, team: &TeamKey) -> Option<&TeamRanking> {
        self.teams.iter().find(|t| &t.team == team)
    }

    /// Conferences ordered by mean team score
    pub fn conferences(&self, registry: &[Team]) -> Vec<GroupRanking> {
        self.group_by(registry, |t| Some(t.conference.clone()))
    }

    /// Divisions ordered by mean team score; teams without a division are skipped
    pub fn divisions(&self, registry: &[Team]) -> Vec<GroupRanking> {
        self.group_by(registry, |t| t.division.clone())
    }

    fn group_by<F>(&self, registry: &[Team], label: F) -> Vec<GroupRanking>
    where
        F: Fn(&Team) -> Option<String>,
    {
        let mut groups: Vec<String> = Vec::new();
        let mut scores: HashMap<String, Vec<f64>> = HashMap::new();

        for team in registry {
            let (Some(group), Some(ranking)) = (label(team), self.get(&team.key)) else {
                continue;
            };
            if !scores.contains_key(&group) {
                groups.push(group.clone());
            }
            scores.entry(group).or_default().push(ranking.team_score);
        }

        let mut ranked: Vec<GroupRanking> = groups
            .into_iter()
            .map(|group| {
                let values = &scores[&group];
                let score = values.iter().sum::<f64>() / values.len() as f64;
                GroupRanking { group, score }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Write the team ranking as CSV in rank order
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", RANKING_HEADER)?;
        for t in &self.teams {
            writeln!(
                out,
                "{},{},{},{},{},{},{}",
                t.team, t.rank, t.previous_rank, t.delta_rank, t.team_score, t.strength, t.volatility
            )?;
        }
        Ok(())
    }
}

/// Format rankings for the console
pub fn format_rankings(rankings: &Rankings) -> String {
    rankings
        .teams
        .iter()
        .map(|t| {
            format!(
                "{:>3} ({:+}): {}, Team Score: {:.1}, Strength: {:.1}, Volatility: {:.1}\n",
                t.rank, t.delta_rank, t.team, t.team_score, t.strength, t.volatility
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameResult, RatingRecord};
    use approx::assert_relative_eq;

    fn ratings(values: &[(&str, f64)]) -> RatingSet {
        values
            .iter()
            .map(|&(key, strength)| {
                (
                    TeamKey::from(key),
                    RatingRecord {
                        strength,
                        volatility: 1.0,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    fn team(key: &str, conference: &str, division: Option<&str>) -> Team {
        Team {
            key: key.into(),
            conference: conference.to_string(),
            division: division.map(str::to_string),
        }
    }

    #[test]
    fn test_preseason_scores_are_half_normalized_strength() {
        let set = ratings(&[("A", 5.0), ("B", -5.0), ("C", 15.0)]);
        let rankings = Rankings::compose(&set, None, None);

        let order: Vec<_> = rankings.teams.iter().map(|t| t.team.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        assert_relative_eq!(rankings.teams[0].team_score, 10.0);
        assert_relative_eq!(rankings.teams[2].team_score, 0.0);
        assert_eq!(rankings.teams[0].previous_rank, 0);
        assert_eq!(rankings.teams[0].delta_rank, -1);
    }

    #[test]
    fn test_record_weighting_and_rank_delta() {
        let set = ratings(&[("A", 10.0), ("B", 9.0), ("C", 0.0)]);
        let games = vec![
            GameResult {
                year: 2023,
                week: 1,
                date: None,
                home: "B".into(),
                away: "A".into(),
                home_points: 21,
                away_points: 20,
                home_rushing_yards: 0,
                away_rushing_yards: 0,
                neutral_site: false,
            },
            GameResult {
                year: 2023,
                week: 2,
                date: None,
                home: "B".into(),
                away: "C".into(),
                home_points: 30,
                away_points: 0,
                home_rushing_yards: 0,
                away_rushing_yards: 0,
                neutral_site: false,
            },
        ];
        let snapshot = Snapshot::from_games(2023, 2, &games);
        let previous = Rankings::compose(&set, None, None);

        let rankings = Rankings::compose(&set, Some(&snapshot), Some(&previous));

        // B: 9 * (2 + 2) / (2 + 4) = 6; A: 10 * 2 / 5 = 4
        assert_eq!(rankings.rank_of(&"B".into()), Some(1));
        assert_relative_eq!(rankings.get(&"B".into()).unwrap().team_score, 6.0);
        assert_relative_eq!(rankings.get(&"A".into()).unwrap().team_score, 4.0);
        let b = rankings.get(&"B".into()).unwrap();
        assert_eq!(b.previous_rank, 2);
        assert_eq!(b.delta_rank, 1);
    }

    #[test]
    fn test_group_rankings() {
        let set = ratings(&[("A", 10.0), ("B", 0.0), ("C", 6.0), ("D", 6.0)]);
        let rankings = Rankings::compose(&set, None, None);
        let registry = vec![
            team("A", "North", Some("East")),
            team("B", "North", Some("West")),
            team("C", "South", Some("East")),
            team("D", "South", None),
        ];

        let conferences = rankings.conferences(&registry);
        assert_eq!(conferences[0].group, "South");
        assert_relative_eq!(conferences[0].score, 3.0);
        assert_relative_eq!(conferences[1].score, 2.5);

        let divisions = rankings.divisions(&registry);
        assert_eq!(divisions.len(), 2);
        assert_eq!(divisions[0].group, "East");
        assert_relative_eq!(divisions[0].score, 4.0);
    }

    #[test]
    fn test_csv_output() {
        let rankings = Rankings::compose(&ratings(&[("A", 2.0), ("B", 0.0)]), None, None);
        let mut buf = Vec::new();
        rankings.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], RANKING_HEADER);
        assert_eq!(lines[1], "A,1,0,-1,1,2,1");
        assert!(format_rankings(&rankings).contains("A, Team Score: 1.0"));
    }
}
