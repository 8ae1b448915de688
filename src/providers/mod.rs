//! HTTP clients for the external stats and odds providers.
//!
//! Each provider has its own auth scheme and response schema; all of them
//! come back as [`GameRecord`]s, [`RosterEntry`]s or [`OddsSnapshot`]s, or a
//! [`ProviderError`]. Clients issue exactly one request per call and never
//! retry; that is the service's job.

pub mod api_football;
pub mod balldontlie;
pub mod nba_stats;
pub mod odds_api;

pub use api_football::ApiFootballClient;
pub use balldontlie::BallDontLieClient;
pub use nba_stats::NbaStatsClient;
pub use odds_api::OddsApiClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::types::{FetchParams, GameRecord, OddsSnapshot, RosterEntry, Sport};

/// Longest error body kept in a [`ProviderError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Uniform view over every provider
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Per-game box scores for one NBA player
    async fn player_game_log(
        &self,
        player_id: u64,
        season: &str,
    ) -> Result<Vec<GameRecord>, ProviderError>;

    /// Current roster of an NBA team (stats.nba.com team id)
    async fn team_roster(
        &self,
        team_id: u64,
        season: &str,
    ) -> Result<Vec<RosterEntry>, ProviderError>;

    /// Recent results for a team (balldontlie id for NBA, API-Football id for soccer)
    async fn team_results(
        &self,
        sport: Sport,
        team_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError>;

    /// Recent meetings between two teams, from `team_id`'s point of view
    async fn head_to_head(
        &self,
        sport: Sport,
        team_id: u64,
        opponent_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError>;

    /// Upcoming events with bookmaker prices
    async fn odds(&self, sport_key: &str) -> Result<Vec<OddsSnapshot>, ProviderError>;
}

/// All four providers behind one [`StatsSource`]
#[derive(Debug, Clone)]
pub struct HttpStatsClient {
    nba: NbaStatsClient,
    balldontlie: BallDontLieClient,
    football: ApiFootballClient,
    odds: OddsApiClient,
}

impl HttpStatsClient {
    pub fn new(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            nba: NbaStatsClient::new(http.clone(), &config.nba_stats_url),
            balldontlie: BallDontLieClient::new(
                http.clone(),
                &config.balldontlie_url,
                config.balldontlie_key.clone(),
            ),
            football: ApiFootballClient::new(
                http.clone(),
                &config.api_football_url,
                config.api_football_key.clone(),
            ),
            odds: OddsApiClient::new(http, config),
        })
    }
}

#[async_trait]
impl StatsSource for HttpStatsClient {
    async fn player_game_log(
        &self,
        player_id: u64,
        season: &str,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        self.nba.player_game_log(player_id, season).await
    }

    async fn team_roster(
        &self,
        team_id: u64,
        season: &str,
    ) -> Result<Vec<RosterEntry>, ProviderError> {
        self.nba.team_roster(team_id, season).await
    }

    async fn team_results(
        &self,
        sport: Sport,
        team_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        match sport {
            Sport::Nba => self.balldontlie.team_games(team_id, params).await,
            Sport::Soccer => self.football.fixtures(team_id, params).await,
        }
    }

    async fn head_to_head(
        &self,
        sport: Sport,
        team_id: u64,
        opponent_id: u64,
        params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        match sport {
            Sport::Nba => {
                self.balldontlie
                    .head_to_head(team_id, opponent_id, params)
                    .await
            }
            Sport::Soccer => {
                self.football
                    .head_to_head(team_id, opponent_id, params)
                    .await
            }
        }
    }

    async fn odds(&self, sport_key: &str) -> Result<Vec<OddsSnapshot>, ProviderError> {
        self.odds.odds(sport_key).await
    }
}

/// Send a GET and decode a JSON body.
///
/// Non-2xx responses become [`ProviderError::Status`] with the (truncated)
/// body; undecodable bodies become [`ProviderError::Malformed`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let mut body = body;
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ProviderError::malformed(provider, e.to_string()))
}

/// Parse the leading `YYYY-MM-DD` of a date or timestamp
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let head = value.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Newest game first
pub(crate) fn sort_newest_first(records: &mut [GameRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date));
}

pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 10, 22);
        assert_eq!(parse_iso_date("2024-10-22"), expected);
        assert_eq!(parse_iso_date("2024-10-22T00:00:00.000Z"), expected);
        assert_eq!(parse_iso_date("2024-10-22T19:00:00+00:00"), expected);
        assert_eq!(parse_iso_date("Oct 22"), None);
    }

    #[test]
    fn test_base_url_trims_slash() {
        assert_eq!(base_url("https://a.test/v1/"), "https://a.test/v1");
        assert_eq!(base_url("https://a.test/v1"), "https://a.test/v1");
    }

    #[test]
    fn test_client_builds_from_default_config() {
        assert!(HttpStatsClient::new(&ProvidersConfig::default()).is_ok());
    }
}
