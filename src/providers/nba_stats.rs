//! stats.nba.com client: player game logs and team rosters.
//!
//! The endpoint wants browser-like headers and answers with tabular
//! `resultSets` (`headers` + `rowSet`) rather than objects.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::get_json;
use crate::error::ProviderError;
use crate::types::{GameRecord, Outcome, RosterEntry};

const PROVIDER: &str = "stats.nba.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Columns that are identifiers, not statistics
const NON_STAT_COLUMNS: [&str; 4] = ["SEASON_ID", "Player_ID", "Game_ID", "VIDEO_AVAILABLE"];

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    fn column(&self, name: &str) -> Result<usize, ProviderError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, format!("missing column {}", name)))
    }
}

/// Client for stats.nba.com
#[derive(Debug, Clone)]
pub struct NbaStatsClient {
    http: reqwest::Client,
    base_url: String,
}

impl NbaStatsClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: super::base_url(base_url),
        }
    }

    fn get(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/{}", self.base_url, endpoint))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(reqwest::header::REFERER, "https://stats.nba.com/")
            .header(reqwest::header::ORIGIN, "https://stats.nba.com")
    }

    /// Fetch a player's regular-season game log
    pub async fn player_game_log(
        &self,
        player_id: u64,
        season: &str,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        info!("Fetching game log for player {} ({})", player_id, season);
        let request = self.get("playergamelog").query(&[
            ("PlayerID", player_id.to_string().as_str()),
            ("Season", season),
            ("SeasonType", "Regular Season"),
        ]);
        let response: StatsResponse = get_json(PROVIDER, request).await?;
        parse_game_log(response)
    }

    /// Fetch a team's roster
    pub async fn team_roster(
        &self,
        team_id: u64,
        season: &str,
    ) -> Result<Vec<RosterEntry>, ProviderError> {
        info!("Fetching roster for team {} ({})", team_id, season);
        let request = self.get("commonteamroster").query(&[
            ("TeamID", team_id.to_string().as_str()),
            ("Season", season),
        ]);
        let response: StatsResponse = get_json(PROVIDER, request).await?;
        parse_roster(response)
    }
}

fn first_set(response: StatsResponse) -> Result<ResultSet, ProviderError> {
    response
        .result_sets
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "no result sets"))
}

fn parse_game_log(response: StatsResponse) -> Result<Vec<GameRecord>, ProviderError> {
    let set = first_set(response)?;
    let date_col = set.column("GAME_DATE")?;
    let matchup_col = set.column("MATCHUP")?;
    let wl_col = set.column("WL").ok();

    let mut records = Vec::with_capacity(set.row_set.len());
    for row in &set.row_set {
        let date_text = row.get(date_col).and_then(Value::as_str).unwrap_or_default();
        let date = parse_game_date(date_text).ok_or_else(|| {
            ProviderError::malformed(PROVIDER, format!("bad GAME_DATE {:?}", date_text))
        })?;
        let matchup = row
            .get(matchup_col)
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut record = GameRecord::new(date, opponent_from_matchup(matchup)).with_matchup(matchup);
        if let Some(outcome) = wl_col
            .and_then(|c| row.get(c))
            .and_then(Value::as_str)
            .and_then(Outcome::from_wl)
        {
            record = record.with_outcome(outcome);
        }

        for (header, value) in set.headers.iter().zip(row) {
            if NON_STAT_COLUMNS.contains(&header.as_str()) {
                continue;
            }
            if let Some(number) = value.as_f64() {
                record.stats.insert(header.clone(), number);
            }
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_roster(response: StatsResponse) -> Result<Vec<RosterEntry>, ProviderError> {
    let set = first_set(response)?;
    let id_col = set.column("PLAYER_ID")?;
    let name_col = set.column("PLAYER")?;

    Ok(set
        .row_set
        .iter()
        .filter_map(|row| {
            let player_id = row.get(id_col)?.as_u64()?;
            let name = row.get(name_col)?.as_str()?.to_string();
            Some(RosterEntry { player_id, name })
        })
        .collect())
}

/// `APR 13, 2025` (what the endpoint sends) or ISO `2025-04-13`
fn parse_game_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%b %d, %Y")
        .ok()
        .or_else(|| super::parse_iso_date(value))
}

/// `LAL vs. DAL` and `LAL @ DAL` both give `DAL`
fn opponent_from_matchup(matchup: &str) -> String {
    matchup
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME_LOG_JSON: &str = r#"{
        "resource": "playergamelog",
        "resultSets": [{
            "name": "PlayerGameLog",
            "headers": ["SEASON_ID", "Player_ID", "Game_ID", "GAME_DATE", "MATCHUP", "WL",
                        "MIN", "PTS", "REB", "AST", "PLUS_MINUS", "VIDEO_AVAILABLE"],
            "rowSet": [
                ["22024", 2544, "0022401185", "APR 13, 2025", "LAL vs. HOU", "L", 34, 28, 8, 9, -4, 1],
                ["22024", 2544, "0022401170", "APR 11, 2025", "LAL @ POR", "W", 31, 20, 10, 5, null, 1]
            ]
        }]
    }"#;

    const ROSTER_JSON: &str = r#"{
        "resultSets": [{
            "name": "CommonTeamRoster",
            "headers": ["TeamID", "SEASON", "PLAYER", "NUM", "POSITION", "PLAYER_ID"],
            "rowSet": [
                [1610612747, "2025", "LeBron James", "23", "F", 2544],
                [1610612747, "2025", "Luka Doncic", "77", "G", 1629029],
                [1610612747, "2025", null, "0", "G", 1]
            ]
        }]
    }"#;

    #[test]
    fn test_parse_game_log() {
        let response: StatsResponse = serde_json::from_str(GAME_LOG_JSON).unwrap();
        let records = parse_game_log(response).unwrap();

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 4, 13).unwrap());
        assert_eq!(first.opponent, "HOU");
        assert_eq!(first.matchup, "LAL vs. HOU");
        assert_eq!(first.outcome, Some(Outcome::Loss));
        assert_eq!(first.stat("PTS"), Some(28.0));
        assert_eq!(first.stat("REB"), Some(8.0));
        assert_eq!(first.stat("AST"), Some(9.0));
        assert_eq!(first.stat("Player_ID"), None);
        assert_eq!(first.stat("VIDEO_AVAILABLE"), None);

        let second = &records[1];
        assert_eq!(second.opponent, "POR");
        assert_eq!(second.outcome, Some(Outcome::Win));
        // null cells are left out
        assert_eq!(second.stat("PLUS_MINUS"), None);
    }

    #[test]
    fn test_parse_game_log_missing_column() {
        let json = r#"{"resultSets": [{"headers": ["PTS"], "rowSet": [[10]]}]}"#;
        let response: StatsResponse = serde_json::from_str(json).unwrap();
        let err = parse_game_log(response).unwrap_err();
        assert!(err.to_string().contains("GAME_DATE"));
    }

    #[test]
    fn test_parse_empty_game_log() {
        let json = r#"{"resultSets": [{"headers": ["GAME_DATE", "MATCHUP"], "rowSet": []}]}"#;
        let response: StatsResponse = serde_json::from_str(json).unwrap();
        assert!(parse_game_log(response).unwrap().is_empty());
    }

    #[test]
    fn test_parse_roster_skips_incomplete_rows() {
        let response: StatsResponse = serde_json::from_str(ROSTER_JSON).unwrap();
        let roster = parse_roster(response).unwrap();
        assert_eq!(
            roster,
            vec![
                RosterEntry {
                    player_id: 2544,
                    name: "LeBron James".to_string()
                },
                RosterEntry {
                    player_id: 1629029,
                    name: "Luka Doncic".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_game_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 13);
        assert_eq!(parse_game_date("APR 13, 2025"), expected);
        assert_eq!(parse_game_date("Apr 13, 2025"), expected);
        assert_eq!(parse_game_date("2025-04-13"), expected);
        assert_eq!(parse_game_date("yesterday"), None);
    }

    #[test]
    fn test_opponent_from_matchup() {
        assert_eq!(opponent_from_matchup("LAL vs. DAL"), "DAL");
        assert_eq!(opponent_from_matchup("LAL @ DAL"), "DAL");
        assert_eq!(opponent_from_matchup(""), "");
    }
}
