//! API-Football client: soccer fixtures and head-to-head.

use serde::Deserialize;
use tracing::info;

use super::{get_json, parse_iso_date, sort_newest_first};
use crate::error::ProviderError;
use crate::types::{FetchParams, GameRecord, Outcome};

const PROVIDER: &str = "api-football";

const DEFAULT_LAST_N: u32 = 5;

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    response: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    fixture: Fixture,
    teams: Teams,
    goals: Goals,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    date: String,
}

#[derive(Debug, Deserialize)]
struct Teams {
    home: TeamRef,
    away: TeamRef,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Goals {
    home: Option<u32>,
    away: Option<u32>,
}

/// Client for v3.football.api-sports.io (`x-apisports-key` header auth)
#[derive(Debug, Clone)]
pub struct ApiFootballClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiFootballClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: super::base_url(base_url),
            api_key,
        }
    }

    fn get(&self, endpoint: &str) -> Result<reqwest::RequestBuilder, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey(PROVIDER))?;
        Ok(self
            .http
            .get(format!("{}/{}", self.base_url, endpoint))
            .header("x-apisports-key", key))
    }

    /// Last N fixtures of a team, optionally restricted to a league
    pub async fn fixtures(
        &self,
        team_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        info!("Fetching fixtures for team {}", team_id);
        let mut query = vec![
            ("team", team_id.to_string()),
            ("last", params.last_n.unwrap_or(DEFAULT_LAST_N).to_string()),
        ];
        if let Some(league) = params.league {
            query.push(("league", league.to_string()));
        }

        let request = self.get("fixtures")?.query(&query);
        let response: FixturesResponse = get_json(PROVIDER, request).await?;
        Ok(to_records(response, team_id))
    }

    /// Last N meetings between two clubs
    pub async fn head_to_head(
        &self,
        team_id: u64,
        opponent_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        info!("Fetching head-to-head {} vs {}", team_id, opponent_id);
        let query = [
            ("h2h", format!("{}-{}", team_id, opponent_id)),
            ("last", params.last_n.unwrap_or(DEFAULT_LAST_N).to_string()),
        ];

        let request = self.get("fixtures/headtohead")?.query(&query);
        let response: FixturesResponse = get_json(PROVIDER, request).await?;
        Ok(to_records(response, team_id))
    }
}

fn to_records(response: FixturesResponse, team_id: u64) -> Vec<GameRecord> {
    let mut records: Vec<GameRecord> = response
        .response
        .into_iter()
        .filter_map(|entry| to_record(entry, team_id))
        .collect();
    sort_newest_first(&mut records);
    records
}

/// `None` for fixtures not yet played or not involving the team
fn to_record(entry: FixtureEntry, team_id: u64) -> Option<GameRecord> {
    let (home_goals, away_goals) = (entry.goals.home?, entry.goals.away?);
    let date = parse_iso_date(&entry.fixture.date)?;
    let Teams { home, away } = entry.teams;

    let (own, other, opponent) = if home.id == team_id {
        (home_goals, away_goals, away.name.clone())
    } else if away.id == team_id {
        (away_goals, home_goals, home.name.clone())
    } else {
        return None;
    };

    Some(
        GameRecord::new(date, opponent)
            .with_matchup(format!("{} vs {}", home.name, away.name))
            .with_outcome(Outcome::from_scores(own, other))
            .with_score(format!("{}-{}", home_goals, away_goals))
            .with_stat("GF", f64::from(own))
            .with_stat("GA", f64::from(other)),
    )
}
