//! Stats service: the entry points the CLI and the API call.
//!
//! Every provider call goes through [`retry_if`] with the transient-error
//! classifier, and every game log through the [`ResultCache`]. Calls for one
//! action are awaited one after another; nothing fans out.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::aggregate::{self, Composite, Leader, LineSummary, RecordSummary, StatTable};
use crate::betting::{self, BetSuggestion};
use crate::cache::{CacheCategory, CacheTtls, Clock, ResultCache};
use crate::config::{AppConfig, BettingConfig};
use crate::directory::{self, EntityDirectory, League, NbaTeam, Player, SoccerTeam};
use crate::error::{ProviderError, StatsError};
use crate::providers::StatsSource;
use crate::retry::{retry_if, RetryPolicy};
use crate::types::{FetchParams, GameLog, GameRecord, OddsSnapshot, Sport};

/// Premier League, used when a soccer query names no league
const DEFAULT_LEAGUE: &str = "39";

/// A cacheable provider query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsQuery {
    /// Box scores for one NBA player (stats.nba.com id)
    PlayerGameLog { player_id: u64 },
    /// Box scores for every player on an NBA roster (stats.nba.com team id)
    TeamRosterLogs { team_id: u64 },
    /// Recent results for a team (balldontlie or API-Football id)
    TeamResults { sport: Sport, team_id: u64 },
    HeadToHead {
        sport: Sport,
        team_id: u64,
        opponent_id: u64,
    },
}

impl StatsQuery {
    pub fn category(&self) -> CacheCategory {
        match self {
            StatsQuery::PlayerGameLog { .. } => CacheCategory::PlayerLog,
            StatsQuery::TeamRosterLogs { .. } => CacheCategory::TeamLogs,
            StatsQuery::TeamResults { .. } => CacheCategory::TeamResults,
            StatsQuery::HeadToHead { .. } => CacheCategory::HeadToHead,
        }
    }

    pub fn entity_id(&self) -> u64 {
        match *self {
            StatsQuery::PlayerGameLog { player_id } => player_id,
            StatsQuery::TeamRosterLogs { team_id }
            | StatsQuery::TeamResults { team_id, .. }
            | StatsQuery::HeadToHead { team_id, .. } => team_id,
        }
    }
}

impl fmt::Display for StatsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsQuery::PlayerGameLog { player_id } => write!(f, "player game log {}", player_id),
            StatsQuery::TeamRosterLogs { team_id } => write!(f, "team roster logs {}", team_id),
            StatsQuery::TeamResults { sport, team_id } => {
                write!(f, "{} team results {}", sport, team_id)
            }
            StatsQuery::HeadToHead {
                sport,
                team_id,
                opponent_id,
            } => write!(f, "{} head-to-head {} vs {}", sport, team_id, opponent_id),
        }
    }
}

/// Cache key: the query plus every parameter sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: StatsQuery,
    pub params: FetchParams,
}

/// A player's recent games reduced to one statistic
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub player: String,
    pub stat: String,
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineSummary>,
    pub games: Vec<GameRecord>,
}

impl PlayerSummary {
    /// Last `n` games of `log`, with `stat` derived when it is a composite
    pub fn from_log(log: &GameLog, n: usize, stat: &str, line: Option<f64>) -> Self {
        let mut games = aggregate::recent(&log.records, n).to_vec();
        let stat = aggregate::ensure_stat(&mut games, stat);
        Self {
            player: log.label.clone(),
            average: aggregate::mean(&games, &stat),
            line: line.map(|line| aggregate::line_summary(&games, &stat, line)),
            stat,
            games,
        }
    }
}

/// Top players of a roster and their per-game values
#[derive(Debug, Clone, Serialize)]
pub struct TeamLeaders {
    pub team: String,
    pub stat: String,
    pub window: usize,
    pub leaders: Vec<Leader>,
    /// Leaders x trailing dates
    pub table: StatTable,
}

/// Team record lookup, optionally against one opponent
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub sport: Sport,
    pub team: String,
    pub opponent: Option<String>,
    /// Soccer league name or id; defaults to the team's own league
    pub league: Option<String>,
    pub last_n: Option<u32>,
    /// Look up the bookmaker's moneyline for a favored side
    pub with_odds: bool,
}

impl RecordRequest {
    pub fn new(sport: Sport, team: impl Into<String>) -> Self {
        Self {
            sport,
            team: team.into(),
            opponent: None,
            league: None,
            last_n: None,
            with_odds: false,
        }
    }

    pub fn opponent(mut self, opponent: impl Into<String>) -> Self {
        self.opponent = Some(opponent.into());
        self
    }

    pub fn league(mut self, league: impl Into<String>) -> Self {
        self.league = Some(league.into());
        self
    }

    pub fn last_n(mut self, n: u32) -> Self {
        self.last_n = Some(n);
        self
    }

    pub fn with_odds(mut self, enabled: bool) -> Self {
        self.with_odds = enabled;
        self
    }
}

/// Recent results and the suggestion derived from them
#[derive(Debug, Clone, Serialize)]
pub struct TeamRecord {
    pub team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    pub summary: RecordSummary,
    pub win_rate: Option<f64>,
    pub suggestion: BetSuggestion,
    pub message: String,
    pub games: Vec<GameRecord>,
}

/// Resolved sides of a team query
struct Matchup {
    team_id: u64,
    team: String,
    opponent: Option<(u64, String)>,
    params: FetchParams,
    odds_key: String,
}

/// Owns the provider client, the cache and the lookup catalogs
pub struct StatsService<S> {
    source: S,
    cache: ResultCache<CacheKey, GameLog>,
    clock: Arc<dyn Clock>,
    ttls: CacheTtls,
    policy: RetryPolicy,
    season: String,
    roster_delay: Duration,
    roster_size: usize,
    betting: BettingConfig,
    composite: Composite,
    players: EntityDirectory<Player>,
    nba_teams: EntityDirectory<NbaTeam>,
    soccer_teams: EntityDirectory<SoccerTeam>,
    leagues: EntityDirectory<League>,
}

impl<S: StatsSource> StatsService<S> {
    pub fn new(source: S, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache: ResultCache::new(clock.clone())
                .serve_stale_on_failure(config.cache.serve_stale_on_failure),
            clock,
            ttls: CacheTtls::from_config(&config.cache),
            policy: RetryPolicy::from_config(&config.fetch),
            season: config.providers.season.clone(),
            roster_delay: config.fetch.roster_delay(),
            roster_size: config.fetch.roster_size,
            betting: config.betting.clone(),
            composite: Composite::pra(),
            players: directory::nba_players(),
            nba_teams: directory::nba_teams(),
            soccer_teams: directory::soccer_teams(),
            leagues: directory::leagues(),
        }
    }

    /// Replace the player catalog (e.g. one extended from a file)
    pub fn with_players(mut self, players: EntityDirectory<Player>) -> Self {
        self.players = players;
        self
    }

    pub fn players(&self) -> &EntityDirectory<Player> {
        &self.players
    }

    /// Fetch a game log, from the cache when fresh.
    ///
    /// Provider failures come back as [`StatsError::Unavailable`] and are
    /// never cached; an empty collection is [`StatsError::EmptyResult`].
    pub async fn fetch_stats(
        &self,
        query: &StatsQuery,
        params: &FetchParams,
    ) -> Result<GameLog, StatsError> {
        self.fetch_labeled(query, params, &query.to_string()).await
    }

    /// Win-rate suggestion for `side` using the configured threshold
    pub fn suggest_bet(&self, records: &[GameRecord], side: &str) -> BetSuggestion {
        betting::suggest_bet(records, side, &self.betting)
    }

    /// Game log for a player looked up by name or id
    pub async fn player_games(
        &self,
        name: &str,
        params: &FetchParams,
    ) -> Result<GameLog, StatsError> {
        let player = self.players.resolve(name)?;
        let query = StatsQuery::PlayerGameLog {
            player_id: player.id,
        };
        self.fetch_labeled(&query, params, &player.name).await
    }

    /// Game logs for several players, fetched in order
    pub async fn compare_players(
        &self,
        names: &[String],
        params: &FetchParams,
    ) -> Result<Vec<GameLog>, StatsError> {
        let mut logs = Vec::with_capacity(names.len());
        for name in names {
            logs.push(self.player_games(name, params).await?);
        }
        Ok(logs)
    }

    /// Top `k` roster players by mean `stat` over the last `window` game dates
    pub async fn team_leaders(
        &self,
        team: &str,
        stat: &str,
        window: usize,
        k: usize,
    ) -> Result<TeamLeaders, StatsError> {
        let team = self.nba_teams.resolve(team)?;
        let query = StatsQuery::TeamRosterLogs { team_id: team.id };
        let log = self
            .fetch_labeled(&query, &FetchParams::default(), &team.name)
            .await?;

        let mut records = log.records;
        let column = aggregate::ensure_stat(&mut records, stat);
        let leaders = aggregate::top_k_by_mean(&records, &column, window, k);

        let top: Vec<GameRecord> = aggregate::within_trailing_dates(&records, window)
            .into_iter()
            .filter(|r| {
                r.player
                    .as_ref()
                    .map_or(false, |p| leaders.iter().any(|l| &l.player == p))
            })
            .collect();
        let table = aggregate::pivot(&top, &column);

        Ok(TeamLeaders {
            team: team.name.clone(),
            stat: column,
            window,
            leaders,
            table,
        })
    }

    /// Recent results (or head-to-head) with a bet suggestion.
    ///
    /// No games is not an error here: the suggestion is `NoData`.
    pub async fn team_record(&self, request: &RecordRequest) -> Result<TeamRecord, StatsError> {
        let matchup = self.resolve_matchup(request)?;
        let (query, label) = match &matchup.opponent {
            Some((opponent_id, opponent)) => (
                StatsQuery::HeadToHead {
                    sport: request.sport,
                    team_id: matchup.team_id,
                    opponent_id: *opponent_id,
                },
                format!("{} vs {}", matchup.team, opponent),
            ),
            None => (
                StatsQuery::TeamResults {
                    sport: request.sport,
                    team_id: matchup.team_id,
                },
                matchup.team.clone(),
            ),
        };

        let games = match self.fetch_labeled(&query, &matchup.params, &label).await {
            Ok(log) => log.records,
            Err(StatsError::EmptyResult(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let summary = aggregate::record_summary(&games);
        let mut suggestion = self.suggest_bet(&games, &matchup.team);
        if request.with_odds && suggestion.is_favor() {
            match self.odds(&matchup.odds_key).await {
                Ok(snapshots) => suggestion = suggestion.with_price(&snapshots),
                Err(e) => warn!("Odds lookup failed, suggesting without price: {}", e),
            }
        }

        Ok(TeamRecord {
            team: matchup.team,
            opponent: matchup.opponent.map(|(_, name)| name),
            summary,
            win_rate: summary.win_rate(),
            message: suggestion.to_string(),
            suggestion,
            games,
        })
    }

    /// Current odds for a sport key; never cached
    pub async fn odds(&self, sport_key: &str) -> Result<Vec<OddsSnapshot>, StatsError> {
        let operation = format!("odds {}", sport_key);
        self.with_retry(&operation, || self.source.odds(sport_key))
            .await
    }

    /// The Odds API sport key for NBA or a soccer league
    pub fn odds_sport_key(&self, sport: Sport, league: Option<&str>) -> Result<String, StatsError> {
        match sport {
            Sport::Nba => Ok(directory::odds_sport_key(None).to_string()),
            Sport::Soccer => {
                let league = self.leagues.resolve(league.unwrap_or(DEFAULT_LEAGUE))?;
                Ok(directory::odds_sport_key(Some(league)).to_string())
            }
        }
    }

    /// Drop expired cache entries
    pub async fn purge_cache(&self) -> usize {
        let purged = self.cache.purge_expired().await;
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }
        purged
    }

    fn resolve_matchup(&self, request: &RecordRequest) -> Result<Matchup, StatsError> {
        let mut params = FetchParams {
            last_n: request.last_n,
            ..FetchParams::default()
        };

        match request.sport {
            Sport::Nba => {
                let team = self.nba_teams.resolve(&request.team)?;
                let opponent = match request.opponent.as_deref() {
                    Some(name) => {
                        let opponent = self.nba_teams.resolve(name)?;
                        Some((opponent.balldontlie_id, opponent.name.clone()))
                    }
                    None => None,
                };
                params.season = Some(self.season.clone());
                Ok(Matchup {
                    team_id: team.balldontlie_id,
                    team: team.name.clone(),
                    opponent,
                    params,
                    odds_key: directory::odds_sport_key(None).to_string(),
                })
            }
            Sport::Soccer => {
                let team = self.soccer_teams.resolve(&request.team)?;
                let opponent = match request.opponent.as_deref() {
                    Some(name) => {
                        let opponent = self.soccer_teams.resolve(name)?;
                        Some((opponent.id, opponent.name.clone()))
                    }
                    None => None,
                };
                let league = match request.league.as_deref() {
                    Some(league) => self.leagues.resolve(league)?,
                    None => self.leagues.resolve(&team.league_id.to_string())?,
                };
                params.league = Some(league.id);
                Ok(Matchup {
                    team_id: team.id,
                    team: team.name.clone(),
                    opponent,
                    params,
                    odds_key: directory::odds_sport_key(Some(league)).to_string(),
                })
            }
        }
    }

    async fn fetch_labeled(
        &self,
        query: &StatsQuery,
        params: &FetchParams,
        label: &str,
    ) -> Result<GameLog, StatsError> {
        let key = CacheKey {
            query: *query,
            params: params.clone(),
        };
        let ttl = self.ttls.ttl(query.category());
        let mut log = self
            .cache
            .get_or_fetch(key, ttl, || self.fetch_uncached(query, params, label))
            .await?;
        log.label = label.to_string();
        Ok(log)
    }

    async fn fetch_uncached(
        &self,
        query: &StatsQuery,
        params: &FetchParams,
        label: &str,
    ) -> Result<GameLog, StatsError> {
        let operation = query.to_string();
        let season = params.season.as_deref().unwrap_or(&self.season);

        let records = match *query {
            StatsQuery::PlayerGameLog { player_id } => {
                let records = self
                    .with_retry(&operation, || {
                        self.source.player_game_log(player_id, season)
                    })
                    .await?;
                aggregate::with_composite(&records, &self.composite)
            }
            StatsQuery::TeamRosterLogs { team_id } => {
                self.roster_logs(team_id, season, &operation).await?
            }
            StatsQuery::TeamResults { sport, team_id } => {
                self.with_retry(&operation, || {
                    self.source.team_results(sport, team_id, params)
                })
                .await?
            }
            StatsQuery::HeadToHead {
                sport,
                team_id,
                opponent_id,
            } => {
                self.with_retry(&operation, || {
                    self.source.head_to_head(sport, team_id, opponent_id, params)
                })
                .await?
            }
        };

        if records.is_empty() {
            return Err(StatsError::EmptyResult(label.to_string()));
        }
        info!("Fetched {} records for {}", records.len(), label);
        Ok(GameLog::new(
            query.entity_id(),
            label,
            records,
            self.clock.now(),
        ))
    }

    /// Every roster player's log, tagged with the player's name.
    ///
    /// One exhausted player fails the whole roster so a partial table is
    /// never cached. Players without games are skipped.
    async fn roster_logs(
        &self,
        team_id: u64,
        season: &str,
        operation: &str,
    ) -> Result<Vec<GameRecord>, StatsError> {
        let roster = self
            .with_retry(operation, || self.source.team_roster(team_id, season))
            .await?;

        let mut records = Vec::new();
        for (i, entry) in roster.iter().take(self.roster_size).enumerate() {
            if i > 0 && !self.roster_delay.is_zero() {
                sleep(self.roster_delay).await;
            }
            let player_operation = format!("player game log {} ({})", entry.player_id, entry.name);
            let log = self
                .with_retry(&player_operation, || {
                    self.source.player_game_log(entry.player_id, season)
                })
                .await?;
            if log.is_empty() {
                debug!("No games for {}", entry.name);
                continue;
            }
            records.extend(log.into_iter().map(|r| r.with_player(entry.name.clone())));
        }

        Ok(aggregate::with_composite(&records, &self.composite))
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, fetch: F) -> Result<T, StatsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        retry_if(&self.policy, operation, fetch, ProviderError::is_transient).await
    }
}
