//! Record types shared by the providers, the cache and the aggregator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Game result from the tracked entity's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Parse the `W` / `L` column used by the NBA stats endpoints
    pub fn from_wl(value: &str) -> Option<Self> {
        match value.trim() {
            "W" => Some(Outcome::Win),
            "L" => Some(Outcome::Loss),
            "D" => Some(Outcome::Draw),
            _ => None,
        }
    }

    /// Outcome for a side scoring `own` against `other`
    pub fn from_scores(own: u32, other: u32) -> Self {
        match own.cmp(&other) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Less => Outcome::Loss,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "W"),
            Outcome::Loss => write!(f, "L"),
            Outcome::Draw => write!(f, "D"),
        }
    }
}

/// One game played by a player or team.
///
/// Statistics live in an ordered map keyed by the provider's column name
/// (`PTS`, `REB`, `GF`, ...). Composite values are stored in the same map
/// under their label, e.g. `P+R+A`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub opponent: String,
    #[serde(default)]
    pub matchup: String,
    /// Roster member the row belongs to (team-wide logs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

impl GameRecord {
    pub fn new(date: NaiveDate, opponent: impl Into<String>) -> Self {
        Self {
            date,
            opponent: opponent.into(),
            matchup: String::new(),
            player: None,
            outcome: None,
            score: None,
            stats: BTreeMap::new(),
        }
    }

    /// Look up a statistic by name
    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }

    pub fn with_stat(mut self, name: impl Into<String>, value: f64) -> Self {
        self.stats.insert(name.into(), value);
        self
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_matchup(mut self, matchup: impl Into<String>) -> Self {
        self.matchup = matchup.into();
        self
    }

    pub fn with_score(mut self, score: impl Into<String>) -> Self {
        self.score = Some(score.into());
        self
    }
}

/// A fetched record collection for one entity, newest game first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    pub entity_id: u64,
    pub label: String,
    pub records: Vec<GameRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl GameLog {
    pub fn new(
        entity_id: u64,
        label: impl Into<String>,
        records: Vec<GameRecord>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id,
            label: label.into(),
            records,
            fetched_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Player listed on a team roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: u64,
    pub name: String,
}

/// Sport a team query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nba,
    Soccer,
}

impl std::str::FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nba" | "basketball" => Ok(Sport::Nba),
            "soccer" | "football" => Ok(Sport::Soccer),
            other => Err(format!("unknown sport: {}", other)),
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Nba => write!(f, "NBA"),
            Sport::Soccer => write!(f, "Soccer"),
        }
    }
}

/// Query parameters forwarded to a provider.
///
/// Part of the cache key, so two calls differing only in season or count
/// never share an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchParams {
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub league: Option<u32>,
    #[serde(default)]
    pub last_n: Option<u32>,
}

impl FetchParams {
    pub fn season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn league(mut self, league: u32) -> Self {
        self.league = Some(league);
        self
    }

    pub fn last_n(mut self, n: u32) -> Self {
        self.last_n = Some(n);
        self
    }
}

/// Start year of an NBA season label (`2025-26` -> 2025)
pub fn season_start_year(season: &str) -> Option<i32> {
    season.split('-').next()?.trim().parse().ok()
}

/// Single priced outcome within a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub name: String,
    /// American odds (e.g. -150, +130)
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
}

/// Market prices (`h2h`, `spreads`, `totals`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrices {
    pub key: String,
    pub outcomes: Vec<Price>,
}

/// Point-in-time prices for one upcoming event from one bookmaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub event_id: String,
    pub sport_key: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub bookmaker: String,
    pub bookmaker_title: String,
    pub markets: Vec<MarketPrices>,
}

impl OddsSnapshot {
    /// Whether either side's name contains `team` (case-insensitive)
    pub fn involves(&self, team: &str) -> bool {
        let needle = team.to_lowercase();
        self.home_team.to_lowercase().contains(&needle)
            || self.away_team.to_lowercase().contains(&needle)
    }

    /// Moneyline price for the side whose name contains `team`
    pub fn moneyline(&self, team: &str) -> Option<f64> {
        let needle = team.to_lowercase();
        self.markets
            .iter()
            .find(|m| m.key == "h2h")?
            .outcomes
            .iter()
            .find(|o| o.name.to_lowercase().contains(&needle))
            .map(|o| o.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> OddsSnapshot {
        OddsSnapshot {
            event_id: "e1".to_string(),
            sport_key: "basketball_nba".to_string(),
            commence_time: "2025-10-22T23:30:00Z".parse().unwrap(),
            home_team: "Los Angeles Lakers".to_string(),
            away_team: "Golden State Warriors".to_string(),
            bookmaker: "fanduel".to_string(),
            bookmaker_title: "FanDuel".to_string(),
            markets: vec![MarketPrices {
                key: "h2h".to_string(),
                outcomes: vec![
                    Price {
                        name: "Los Angeles Lakers".to_string(),
                        price: -150.0,
                        point: None,
                    },
                    Price {
                        name: "Golden State Warriors".to_string(),
                        price: 130.0,
                        point: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_outcome_from_wl() {
        assert_eq!(Outcome::from_wl("W"), Some(Outcome::Win));
        assert_eq!(Outcome::from_wl("L"), Some(Outcome::Loss));
        assert_eq!(Outcome::from_wl(""), None);
    }

    #[test]
    fn test_outcome_from_scores() {
        assert_eq!(Outcome::from_scores(110, 98), Outcome::Win);
        assert_eq!(Outcome::from_scores(1, 2), Outcome::Loss);
        assert_eq!(Outcome::from_scores(2, 2), Outcome::Draw);
    }

    #[test]
    fn test_season_start_year() {
        assert_eq!(season_start_year("2025-26"), Some(2025));
        assert_eq!(season_start_year("2024"), Some(2024));
        assert_eq!(season_start_year("latest"), None);
    }

    #[test]
    fn test_sport_parse() {
        assert_eq!("NBA".parse::<Sport>(), Ok(Sport::Nba));
        assert_eq!("football".parse::<Sport>(), Ok(Sport::Soccer));
        assert!("cricket".parse::<Sport>().is_err());
    }

    #[test]
    fn test_snapshot_moneyline() {
        let snap = snapshot();
        assert!(snap.involves("lakers"));
        assert!(!snap.involves("celtics"));
        assert_eq!(snap.moneyline("Lakers"), Some(-150.0));
        assert_eq!(snap.moneyline("warriors"), Some(130.0));
        assert_eq!(snap.moneyline("Celtics"), None);
    }
}
