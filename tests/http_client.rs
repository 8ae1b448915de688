//! HttpStatsClient against a loopback server standing in for the providers.

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;

use stats_tracker::config::ProvidersConfig;
use stats_tracker::types::Outcome;
use stats_tracker::{FetchParams, HttpStatsClient, ProviderError, Sport, StatsSource};

type Params = Query<HashMap<String, String>>;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn player_game_log(headers: HeaderMap, Query(params): Params) -> impl IntoResponse {
    if !header(&headers, "user-agent").starts_with("Mozilla")
        || header(&headers, "referer") != "https://stats.nba.com/"
    {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "blocked"})));
    }
    if params.get("PlayerID").map(String::as_str) != Some("2544") {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "unknown player"})));
    }
    let season = params.get("Season").cloned().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "parameters": {"Season": season},
            "resultSets": [{
                "headers": ["Game_ID", "GAME_DATE", "MATCHUP", "WL", "PTS", "REB", "AST"],
                "rowSet": [
                    ["0022401185", "APR 13, 2025", "LAL vs. HOU", "W", 28, 8, 9]
                ]
            }]
        })),
    )
}

async fn bdl_games(headers: HeaderMap, Query(params): Params) -> impl IntoResponse {
    if header(&headers, "authorization") != "bdl-key" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    if params.get("seasons[]").map(String::as_str) != Some("2025") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "season"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": [
                {"date": "2025-10-22", "home_team": {"id": 14, "full_name": "Los Angeles Lakers"},
                 "visitor_team": {"id": 10, "full_name": "Golden State Warriors"},
                 "home_team_score": 109, "visitor_team_score": 119}
            ]
        })),
    )
}

async fn football_fixtures(headers: HeaderMap, Query(params): Params) -> impl IntoResponse {
    if header(&headers, "x-apisports-key") != "fb-key" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    let league = params.get("league").cloned().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "parameters": {"league": league},
            "response": [
                {"fixture": {"date": "2025-08-17T15:30:00+00:00"},
                 "teams": {"home": {"id": 42, "name": "Arsenal"}, "away": {"id": 33, "name": "Manchester United"}},
                 "goals": {"home": 1, "away": 1}}
            ]
        })),
    )
}

async fn odds(Path(sport): Path<String>, Query(params): Params) -> impl IntoResponse {
    if params.get("apiKey").map(String::as_str) != Some("odds-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad key"})));
    }
    if params.get("oddsFormat").map(String::as_str) != Some("american") {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "format"})));
    }
    (
        StatusCode::OK,
        Json(json!([
            {"id": "e1", "sport_key": sport, "commence_time": "2025-10-22T23:30:00Z",
             "home_team": "Los Angeles Lakers", "away_team": "Golden State Warriors",
             "bookmakers": [{"key": "fanduel", "title": "FanDuel", "markets": [
                {"key": "h2h", "outcomes": [
                    {"name": "Los Angeles Lakers", "price": -120},
                    {"name": "Golden State Warriors", "price": 100}
                ]}
             ]}]}
        ])),
    )
}

async fn rate_limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn garbage() -> impl IntoResponse {
    (StatusCode::OK, "<html>not json</html>")
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/stats/playergamelog", get(player_game_log))
        .route("/bdl/games", get(bdl_games))
        .route("/football/fixtures", get(football_fixtures))
        .route("/odds/sports/:sport/odds", get(odds))
        .route("/limited/games", get(rate_limited))
        .route("/garbage/commonteamroster", get(garbage));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr) -> ProvidersConfig {
    ProvidersConfig {
        nba_stats_url: format!("http://{}/stats", addr),
        balldontlie_url: format!("http://{}/bdl/", addr),
        balldontlie_key: Some("bdl-key".to_string()),
        api_football_url: format!("http://{}/football", addr),
        api_football_key: Some("fb-key".to_string()),
        odds_api_url: format!("http://{}/odds", addr),
        odds_api_key: Some("odds-key".to_string()),
        timeout_secs: 5,
        ..ProvidersConfig::default()
    }
}

#[tokio::test]
async fn test_player_game_log_sends_browser_headers() {
    let addr = spawn_server().await;
    let client = HttpStatsClient::new(&config(addr)).unwrap();

    let records = client.player_game_log(2544, "2024-25").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].opponent, "HOU");
    assert_eq!(records[0].outcome, Some(Outcome::Win));
    assert_eq!(records[0].stat("PTS"), Some(28.0));
}

#[tokio::test]
async fn test_unknown_player_is_non_transient_status() {
    let addr = spawn_server().await;
    let client = HttpStatsClient::new(&config(addr)).unwrap();

    let err = client.player_game_log(1, "2024-25").await.unwrap_err();
    match &err {
        ProviderError::Status {
            provider, status, ..
        } => {
            assert_eq!(*provider, "stats.nba.com");
            assert_eq!(*status, 404);
        }
        other => panic!("expected Status, got {:?}", other),
    }
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_balldontlie_authorization_header() {
    let addr = spawn_server().await;
    let client = HttpStatsClient::new(&config(addr)).unwrap();

    let params = FetchParams::default().season("2025-26");
    let records = client.team_results(Sport::Nba, 14, &params).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].opponent, "Golden State Warriors");
    assert_eq!(records[0].outcome, Some(Outcome::Loss));
}

#[tokio::test]
async fn test_api_football_key_header() {
    let addr = spawn_server().await;
    let client = HttpStatsClient::new(&config(addr)).unwrap();

    let params = FetchParams::default().league(39);
    let records = client.team_results(Sport::Soccer, 42, &params).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, Some(Outcome::Draw));
    assert_eq!(records[0].stat("GF"), Some(1.0));
}

#[tokio::test]
async fn test_odds_api_key_query_parameter() {
    let addr = spawn_server().await;
    let client = HttpStatsClient::new(&config(addr)).unwrap();

    let snapshots = client.odds("basketball_nba").await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].sport_key, "basketball_nba");
    assert_eq!(snapshots[0].moneyline("Lakers"), Some(-120.0));
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let addr = spawn_server().await;
    let mut config = config(addr);
    config.balldontlie_url = format!("http://{}/limited", addr);
    let client = HttpStatsClient::new(&config).unwrap();

    let err = client
        .team_results(Sport::Nba, 14, &FetchParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unparseable_body_is_malformed() {
    let addr = spawn_server().await;
    let mut config = config(addr);
    config.nba_stats_url = format!("http://{}/garbage", addr);
    let client = HttpStatsClient::new(&config).unwrap();

    let err = client.team_roster(1610612747, "2025-26").await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Malformed {
            provider: "stats.nba.com",
            ..
        }
    ));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpStatsClient::new(&config(addr)).unwrap();
    let err = client.player_game_log(2544, "2025-26").await.unwrap_err();
    assert!(matches!(err, ProviderError::Http(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let addr = spawn_server().await;
    let mut config = config(addr);
    config.odds_api_key = None;
    let client = HttpStatsClient::new(&config).unwrap();

    let err = client.odds("soccer_epl").await.unwrap_err();
    assert!(matches!(err, ProviderError::MissingApiKey("the-odds-api")));
}
