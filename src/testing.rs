//! Scripted [`StatsSource`] for unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::providers::StatsSource;
use crate::types::{FetchParams, GameRecord, OddsSnapshot, Outcome, RosterEntry, Sport};

/// Returns canned data and counts every call.
///
/// `failing(n, status)` makes the first `n` calls fail with that HTTP status;
/// `failing_after(n, status)` makes every call after the first `n` fail.
#[derive(Default)]
pub(crate) struct FakeSource {
    logs: HashMap<u64, Vec<GameRecord>>,
    roster: Vec<RosterEntry>,
    results: Vec<GameRecord>,
    odds: Vec<OddsSnapshot>,
    failures: AtomicU32,
    failure_status: u16,
    succeed_until: Option<u32>,
    calls: AtomicU32,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, player_id: u64, records: Vec<GameRecord>) -> Self {
        self.logs.insert(player_id, records);
        self
    }

    pub fn with_roster(mut self, roster: &[(u64, &str)]) -> Self {
        self.roster = roster
            .iter()
            .map(|&(player_id, name)| RosterEntry {
                player_id,
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn with_results(mut self, records: Vec<GameRecord>) -> Self {
        self.results = records;
        self
    }

    pub fn with_odds(mut self, odds: Vec<OddsSnapshot>) -> Self {
        self.odds = odds;
        self
    }

    pub fn failing(mut self, times: u32, status: u16) -> Self {
        self.failures = AtomicU32::new(times);
        self.failure_status = status;
        self
    }

    pub fn failing_after(mut self, successes: u32, status: u16) -> Self {
        self.succeed_until = Some(successes);
        self.failure_status = status;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn call(&self) -> Result<(), ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let remaining = self.failures.load(Ordering::SeqCst);
        let fail = if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            true
        } else {
            self.succeed_until.map_or(false, |limit| n > limit)
        };
        if fail {
            return Err(ProviderError::Status {
                provider: "fake",
                status: self.failure_status,
                body: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StatsSource for FakeSource {
    async fn player_game_log(
        &self,
        player_id: u64,
        _season: &str,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        self.call()?;
        Ok(self.logs.get(&player_id).cloned().unwrap_or_default())
    }

    async fn team_roster(
        &self,
        _team_id: u64,
        _season: &str,
    ) -> Result<Vec<RosterEntry>, ProviderError> {
        self.call()?;
        Ok(self.roster.clone())
    }

    async fn team_results(
        &self,
        _sport: Sport,
        _team_id: u64,
        _params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        self.call()?;
        Ok(self.results.clone())
    }

    async fn head_to_head(
        &self,
        _sport: Sport,
        _team_id: u64,
        _opponent_id: u64,
        _params: &FetchParams,
    ) -> Result<Vec<GameRecord>, ProviderError> {
        self.call()?;
        Ok(self.results.clone())
    }

    async fn odds(&self, _sport_key: &str) -> Result<Vec<OddsSnapshot>, ProviderError> {
        self.call()?;
        Ok(self.odds.clone())
    }
}

/// Config with no pacing, backoff or roster delay
pub(crate) fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.fetch.pacing_ms = 0;
    config.fetch.backoff_ms = 0;
    config.fetch.roster_delay_ms = 0;
    config
}

/// NBA box score row
pub(crate) fn box_score(day: &str, pts: f64, reb: f64, ast: f64) -> GameRecord {
    let date: NaiveDate = day.parse().unwrap();
    GameRecord::new(date, "BOS")
        .with_matchup("LAL vs. BOS")
        .with_stat("PTS", pts)
        .with_stat("REB", reb)
        .with_stat("AST", ast)
}

/// Team result row
pub(crate) fn result(day: &str, opponent: &str, outcome: Outcome) -> GameRecord {
    let date: NaiveDate = day.parse().unwrap();
    GameRecord::new(date, opponent).with_outcome(outcome)
}
