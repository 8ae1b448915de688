//! balldontlie client: NBA team results and head-to-head.

use serde::Deserialize;
use tracing::info;

use super::{get_json, parse_iso_date, sort_newest_first};
use crate::error::ProviderError;
use crate::types::{season_start_year, FetchParams, GameRecord, Outcome};

const PROVIDER: &str = "balldontlie";

const DEFAULT_LAST_N: u32 = 5;

#[derive(Debug, Deserialize)]
struct GamesResponse {
    data: Vec<Game>,
}

#[derive(Debug, Deserialize)]
struct Game {
    date: String,
    home_team: Team,
    visitor_team: Team,
    #[serde(default)]
    home_team_score: u32,
    #[serde(default)]
    visitor_team_score: u32,
}

#[derive(Debug, Deserialize)]
struct Team {
    id: u64,
    full_name: String,
}

/// Client for api.balldontlie.io (`Authorization` header auth)
#[derive(Debug, Clone)]
pub struct BallDontLieClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BallDontLieClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: super::base_url(base_url),
            api_key,
        }
    }

    fn games_request(
        &self,
        team_ids: &[u64],
        params: &FetchParams,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey(PROVIDER))?;

        let mut query: Vec<(&str, String)> = team_ids
            .iter()
            .map(|id| ("team_ids[]", id.to_string()))
            .collect();
        query.push((
            "per_page",
            params.last_n.unwrap_or(DEFAULT_LAST_N).to_string(),
        ));
        if let Some(year) = params.season.as_deref().and_then(season_start_year) {
            query.push(("seasons[]", year.to_string()));
        }

        Ok(self
            .http
            .get(format!("{}/games", self.base_url))
            .header(reqwest::header::AUTHORIZATION, key)
            .query(&query))
    }

    /// Recent results for one team
    pub async fn team_games(
        &self,
        team_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        info!("Fetching balldontlie games for team {}", team_id);
        let request = self.games_request(&[team_id], params)?;
        let response: GamesResponse = get_json(PROVIDER, request).await?;
        Ok(to_records(response, team_id, None))
    }

    /// Games in which both teams played, from `team_id`'s side
    pub async fn head_to_head(
        &self,
        team_id: u64,
        opponent_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        info!(
            "Fetching balldontlie head-to-head {} vs {}",
            team_id, opponent_id
        );
        let request = self.games_request(&[team_id, opponent_id], params)?;
        let response: GamesResponse = get_json(PROVIDER, request).await?;
        Ok(to_records(response, team_id, Some(opponent_id)))
    }
}

fn to_records(response: GamesResponse, team_id: u64, opponent_id: Option<u64>) -> Vec<GameRecord> {
    let mut records: Vec<GameRecord> = response
        .data
        .into_iter()
        .filter(|game| {
            opponent_id.map_or(true, |id| {
                game.home_team.id == id || game.visitor_team.id == id
            })
        })
        .filter_map(|game| to_record(game, team_id))
        .collect();
    sort_newest_first(&mut records);
    records
}

/// `None` for unplayed games, unparseable dates or games the team was not in
fn to_record(game: Game, team_id: u64) -> Option<GameRecord> {
    if game.home_team_score == 0 && game.visitor_team_score == 0 {
        return None;
    }
    let date = parse_iso_date(&game.date)?;

    let (own, other, opponent, matchup) = if game.home_team.id == team_id {
        (
            game.home_team_score,
            game.visitor_team_score,
            &game.visitor_team,
            format!("{} vs. {}", game.home_team.full_name, game.visitor_team.full_name),
        )
    } else if game.visitor_team.id == team_id {
        (
            game.visitor_team_score,
            game.home_team_score,
            &game.home_team,
            format!("{} @ {}", game.visitor_team.full_name, game.home_team.full_name),
        )
    } else {
        return None;
    };

    Some(
        GameRecord::new(date, opponent.full_name.clone())
            .with_matchup(matchup)
            .with_outcome(Outcome::from_scores(own, other))
            .with_score(format!(
                "{}-{}",
                game.home_team_score, game.visitor_team_score
            ))
            .with_stat("PTS", f64::from(own))
            .with_stat("OPP_PTS", f64::from(other)),
    )
}
