//! API route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::StatsError;
use crate::providers::StatsSource;
use crate::service::{PlayerSummary, RecordRequest, StatsService, TeamLeaders, TeamRecord};
use crate::types::{FetchParams, OddsSnapshot, Sport};

const DEFAULT_LAST: usize = 10;
const DEFAULT_STAT: &str = "P+R+A";
const DEFAULT_WINDOW: usize = 5;
const DEFAULT_TOP: usize = 10;

/// Application state shared across handlers.
pub type AppState<S> = Arc<StatsService<S>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: msg.into(),
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        let status = match err {
            StatsError::NotFound { .. } | StatsError::EmptyResult(_) => StatusCode::NOT_FOUND,
            StatsError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            code: err.code(),
            message: err.advisory(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.code.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Build the API router
pub fn router<S: StatsSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/players/:name/games", get(player_games::<S>))
        .route("/teams/:name/leaders", get(team_leaders::<S>))
        .route("/teams/:name/record", get(team_record::<S>))
        .route("/odds/:sport", get(odds::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct GamesQuery {
    pub last: Option<usize>,
    pub season: Option<String>,
    pub stat: Option<String>,
    pub line: Option<f64>,
}

/// Recent games for a player, with an optional betting line summary.
pub async fn player_games<S: StatsSource>(
    State(service): State<AppState<S>>,
    Path(name): Path<String>,
    Query(query): Query<GamesQuery>,
) -> Result<Json<PlayerSummary>, ApiError> {
    let params = match query.season {
        Some(season) => FetchParams::default().season(season),
        None => FetchParams::default(),
    };
    let log = service.player_games(&name, &params).await?;
    Ok(Json(PlayerSummary::from_log(
        &log,
        query.last.unwrap_or(DEFAULT_LAST),
        query.stat.as_deref().unwrap_or(DEFAULT_STAT),
        query.line,
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadersQuery {
    pub stat: Option<String>,
    pub window: Option<usize>,
    pub top: Option<usize>,
}

/// Roster leaders by mean of a statistic.
pub async fn team_leaders<S: StatsSource>(
    State(service): State<AppState<S>>,
    Path(name): Path<String>,
    Query(query): Query<LeadersQuery>,
) -> Result<Json<TeamLeaders>, ApiError> {
    let window = query.window.unwrap_or(DEFAULT_WINDOW);
    let top = query.top.unwrap_or(DEFAULT_TOP);
    if window == 0 || top == 0 {
        return Err(ApiError::bad_request("window and top must be at least 1"));
    }

    let stat = query.stat.as_deref().unwrap_or(DEFAULT_STAT);
    let leaders = service.team_leaders(&name, stat, window, top).await?;
    Ok(Json(leaders))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub sport: Option<String>,
    pub opponent: Option<String>,
    pub league: Option<String>,
    pub last: Option<u32>,
    #[serde(default)]
    pub odds: bool,
}

/// Recent results or head-to-head with a bet suggestion.
pub async fn team_record<S: StatsSource>(
    State(service): State<AppState<S>>,
    Path(name): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<TeamRecord>, ApiError> {
    let sport = parse_sport(query.sport.as_deref().unwrap_or("nba"))?;

    let mut request = RecordRequest::new(sport, name).with_odds(query.odds);
    if let Some(opponent) = query.opponent {
        request = request.opponent(opponent);
    }
    if let Some(league) = query.league {
        request = request.league(league);
    }
    if let Some(last) = query.last {
        request = request.last_n(last);
    }

    let record = service.team_record(&request).await?;
    Ok(Json(record))
}

#[derive(Debug, Default, Deserialize)]
pub struct OddsQuery {
    pub league: Option<String>,
    pub team: Option<String>,
}

/// Upcoming events and prices for NBA or a soccer league.
pub async fn odds<S: StatsSource>(
    State(service): State<AppState<S>>,
    Path(sport): Path<String>,
    Query(query): Query<OddsQuery>,
) -> Result<Json<Vec<OddsSnapshot>>, ApiError> {
    let sport = parse_sport(&sport)?;
    let sport_key = service.odds_sport_key(sport, query.league.as_deref())?;

    let mut snapshots = service.odds(&sport_key).await?;
    if let Some(team) = query.team.as_deref() {
        snapshots.retain(|s| s.involves(team));
    }
    Ok(Json(snapshots))
}

fn parse_sport(value: &str) -> Result<Sport, ApiError> {
    value.parse().map_err(ApiError::bad_request)
}
