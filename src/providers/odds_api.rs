//! The Odds API client (`apiKey` query-string auth).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use super::get_json;
use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::types::{MarketPrices, OddsSnapshot, Price};

const PROVIDER: &str = "the-odds-api";

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    sport_key: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize)]
struct Bookmaker {
    key: String,
    title: String,
    #[serde(default)]
    markets: Vec<Market>,
}

#[derive(Debug, Deserialize)]
struct Market {
    key: String,
    outcomes: Vec<Price>,
}

/// Client for api.the-odds-api.com
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    regions: String,
    markets: String,
    bookmakers: String,
}

impl OddsApiClient {
    pub fn new(http: reqwest::Client, config: &ProvidersConfig) -> Self {
        Self {
            http,
            base_url: super::base_url(&config.odds_api_url),
            api_key: config.odds_api_key.clone(),
            regions: config.regions.clone(),
            markets: config.markets.clone(),
            bookmakers: config.bookmakers.clone(),
        }
    }

    /// Upcoming events for a sport key, one snapshot per bookmaker
    pub async fn odds(&self, sport_key: &str) -> Result<Vec<OddsSnapshot>, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey(PROVIDER))?;

        info!("Fetching odds for {}", sport_key);
        let request = self
            .http
            .get(format!("{}/sports/{}/odds", self.base_url, sport_key))
            .query(&[
                ("apiKey", key),
                ("regions", self.regions.as_str()),
                ("markets", self.markets.as_str()),
                ("bookmakers", self.bookmakers.as_str()),
                ("oddsFormat", "american"),
            ]);

        let events: Vec<Event> = get_json(PROVIDER, request).await?;
        Ok(to_snapshots(events))
    }
}

fn to_snapshots(events: Vec<Event>) -> Vec<OddsSnapshot> {
    let mut snapshots = Vec::new();
    for event in events {
        for bookmaker in event.bookmakers {
            snapshots.push(OddsSnapshot {
                event_id: event.id.clone(),
                sport_key: event.sport_key.clone(),
                commence_time: event.commence_time,
                home_team: event.home_team.clone(),
                away_team: event.away_team.clone(),
                bookmaker: bookmaker.key,
                bookmaker_title: bookmaker.title,
                markets: bookmaker
                    .markets
                    .into_iter()
                    .map(|m| MarketPrices {
                        key: m.key,
                        outcomes: m.outcomes,
                    })
                    .collect(),
            });
        }
    }
    snapshots
}
