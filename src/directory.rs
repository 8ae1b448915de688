//! Free-text name resolution over the static team and player catalogs.
//!
//! Each directory lowercases its names once at construction; lookups are an
//! exact-name hash probe followed by a substring scan in catalog order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::StatsError;

/// Something the directory can look up by name
pub trait Named {
    /// Human label used in "not found" messages
    const KIND: &'static str;

    fn id(&self) -> u64;
    fn name(&self) -> &str;

    /// Id on a second provider, also accepted by numeric lookup
    fn alt_id(&self) -> Option<u64> {
        None
    }

    fn is_active(&self) -> bool {
        true
    }
}

/// Indexed name lookup, built once
#[derive(Debug, Clone)]
pub struct EntityDirectory<T> {
    entries: Vec<T>,
    /// (lowercased name, entry index) for active entries, catalog order
    names: Vec<(String, usize)>,
    exact: HashMap<String, usize>,
    by_id: HashMap<u64, usize>,
}

impl<T: Named> EntityDirectory<T> {
    pub fn new(entries: Vec<T>) -> Self {
        let mut names = Vec::with_capacity(entries.len());
        let mut exact = HashMap::new();
        let mut by_id = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            if !entry.is_active() {
                continue;
            }
            let lowered = entry.name().to_lowercase();
            exact.entry(lowered.clone()).or_insert(i);
            by_id.entry(entry.id()).or_insert(i);
            names.push((lowered, i));
        }
        // Primary ids win over a colliding alternate id
        for (i, entry) in entries.iter().enumerate() {
            if let Some(alt) = entry.alt_id().filter(|_| entry.is_active()) {
                by_id.entry(alt).or_insert(i);
            }
        }

        Self {
            entries,
            names,
            exact,
            by_id,
        }
    }

    /// Resolve a free-text query or a numeric id.
    ///
    /// Exact (case-insensitive) names win; otherwise the first active entry
    /// whose name contains the query.
    pub fn resolve(&self, query: &str) -> Result<&T, StatsError> {
        let needle = query.trim().to_lowercase();
        let not_found = || StatsError::NotFound {
            kind: T::KIND,
            query: query.to_string(),
        };
        if needle.is_empty() {
            return Err(not_found());
        }

        if let Some(&i) = self.exact.get(&needle) {
            return Ok(&self.entries[i]);
        }
        if let Ok(id) = needle.parse::<u64>() {
            if let Some(&i) = self.by_id.get(&id) {
                return Ok(&self.entries[i]);
            }
        }
        self.names
            .iter()
            .find(|(name, _)| name.contains(&needle))
            .map(|&(_, i)| &self.entries[i])
            .ok_or_else(not_found)
    }

    /// All active entries whose name contains the query
    pub fn matches(&self, query: &str) -> Vec<&T> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.names
            .iter()
            .filter(|(name, _)| name.contains(&needle))
            .map(|&(_, i)| &self.entries[i])
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// NBA player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Named for Player {
    const KIND: &'static str = "Player";

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// NBA team with its id on each provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbaTeam {
    /// stats.nba.com team id
    pub id: u64,
    /// balldontlie team id
    pub balldontlie_id: u64,
    pub name: String,
    pub abbreviation: String,
}

impl Named for NbaTeam {
    const KIND: &'static str = "Team";

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn alt_id(&self) -> Option<u64> {
        Some(self.balldontlie_id)
    }
}

/// Soccer league (API-Football id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: u32,
    pub name: String,
    /// The Odds API sport key
    pub odds_key: String,
}

impl Named for League {
    const KIND: &'static str = "League";

    fn id(&self) -> u64 {
        u64::from(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Soccer club (API-Football id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoccerTeam {
    pub id: u64,
    pub name: String,
    pub league_id: u32,
}

impl Named for SoccerTeam {
    const KIND: &'static str = "Team";

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

const NBA_TEAMS: [(u64, u64, &str, &str); 30] = [
    (1610612737, 1, "Atlanta Hawks", "ATL"),
    (1610612738, 2, "Boston Celtics", "BOS"),
    (1610612751, 3, "Brooklyn Nets", "BKN"),
    (1610612766, 4, "Charlotte Hornets", "CHA"),
    (1610612741, 5, "Chicago Bulls", "CHI"),
    (1610612739, 6, "Cleveland Cavaliers", "CLE"),
    (1610612742, 7, "Dallas Mavericks", "DAL"),
    (1610612743, 8, "Denver Nuggets", "DEN"),
    (1610612765, 9, "Detroit Pistons", "DET"),
    (1610612744, 10, "Golden State Warriors", "GSW"),
    (1610612745, 11, "Houston Rockets", "HOU"),
    (1610612754, 12, "Indiana Pacers", "IND"),
    (1610612746, 13, "LA Clippers", "LAC"),
    (1610612747, 14, "Los Angeles Lakers", "LAL"),
    (1610612763, 15, "Memphis Grizzlies", "MEM"),
    (1610612748, 16, "Miami Heat", "MIA"),
    (1610612749, 17, "Milwaukee Bucks", "MIL"),
    (1610612750, 18, "Minnesota Timberwolves", "MIN"),
    (1610612740, 19, "New Orleans Pelicans", "NOP"),
    (1610612752, 20, "New York Knicks", "NYK"),
    (1610612760, 21, "Oklahoma City Thunder", "OKC"),
    (1610612753, 22, "Orlando Magic", "ORL"),
    (1610612755, 23, "Philadelphia 76ers", "PHI"),
    (1610612756, 24, "Phoenix Suns", "PHX"),
    (1610612757, 25, "Portland Trail Blazers", "POR"),
    (1610612758, 26, "Sacramento Kings", "SAC"),
    (1610612759, 27, "San Antonio Spurs", "SAS"),
    (1610612761, 28, "Toronto Raptors", "TOR"),
    (1610612762, 29, "Utah Jazz", "UTA"),
    (1610612764, 30, "Washington Wizards", "WAS"),
];

const NBA_PLAYERS: [(u64, &str, bool); 13] = [
    (2544, "LeBron James", true),
    (1629029, "Luka Doncic", true),
    (202681, "Kyrie Irving", true),
    (201939, "Stephen Curry", true),
    (201142, "Kevin Durant", true),
    (203507, "Giannis Antetokounmpo", true),
    (203999, "Nikola Jokic", true),
    (1628369, "Jayson Tatum", true),
    (203076, "Anthony Davis", true),
    (203954, "Joel Embiid", true),
    (1628983, "Shai Gilgeous-Alexander", true),
    (1630162, "Anthony Edwards", true),
    (977, "Kobe Bryant", false),
];

const LEAGUES: [(u32, &str, &str); 3] = [
    (39, "Premier League", "soccer_epl"),
    (140, "La Liga", "soccer_spain_la_liga"),
    (78, "Bundesliga", "soccer_germany_bundesliga"),
];

const SOCCER_TEAMS: [(u64, &str, u32); 11] = [
    (33, "Manchester United", 39),
    (40, "Liverpool", 39),
    (42, "Arsenal", 39),
    (47, "Tottenham", 39),
    (49, "Chelsea", 39),
    (50, "Manchester City", 39),
    (541, "Real Madrid", 140),
    (529, "Barcelona", 140),
    (530, "Atletico Madrid", 140),
    (157, "Bayern Munich", 78),
    (165, "Borussia Dortmund", 78),
];

pub fn nba_teams() -> EntityDirectory<NbaTeam> {
    EntityDirectory::new(
        NBA_TEAMS
            .iter()
            .map(|&(id, balldontlie_id, name, abbreviation)| NbaTeam {
                id,
                balldontlie_id,
                name: name.to_string(),
                abbreviation: abbreviation.to_string(),
            })
            .collect(),
    )
}

fn seed_players() -> Vec<Player> {
    NBA_PLAYERS
        .iter()
        .map(|&(id, name, active)| Player {
            id,
            name: name.to_string(),
            active,
        })
        .collect()
}

pub fn nba_players() -> EntityDirectory<Player> {
    EntityDirectory::new(seed_players())
}

/// Seed players plus those listed in a JSON file (`[{"id", "name", "active"}]`).
///
/// File entries come first so they win substring ties.
pub fn nba_players_with_file(path: impl AsRef<Path>) -> Result<EntityDirectory<Player>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read players file {}", path.display()))?;
    let mut players: Vec<Player> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse players file {}", path.display()))?;
    players.extend(seed_players());
    Ok(EntityDirectory::new(players))
}

pub fn leagues() -> EntityDirectory<League> {
    EntityDirectory::new(
        LEAGUES
            .iter()
            .map(|&(id, name, odds_key)| League {
                id,
                name: name.to_string(),
                odds_key: odds_key.to_string(),
            })
            .collect(),
    )
}

pub fn soccer_teams() -> EntityDirectory<SoccerTeam> {
    EntityDirectory::new(
        SOCCER_TEAMS
            .iter()
            .map(|&(id, name, league_id)| SoccerTeam {
                id,
                name: name.to_string(),
                league_id,
            })
            .collect(),
    )
}

/// The Odds API sport key for NBA games or a soccer league
pub fn odds_sport_key(league: Option<&League>) -> &str {
    match league {
        Some(league) => &league.odds_key,
        None => "basketball_nba",
    }
}
