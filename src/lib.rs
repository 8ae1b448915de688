//! Sports stats tracker.
//!
//! Fetches NBA and soccer game logs and odds from external APIs with bounded
//! retry and a TTL cache, derives leaderboards and win rates, and suggests a
//! side to bet on.

pub mod aggregate;
pub mod betting;
pub mod cache;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod providers;
pub mod retry;
pub mod routes;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use betting::BetSuggestion;
pub use cache::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{ProviderError, StatsError};
pub use providers::{HttpStatsClient, StatsSource};
pub use service::{StatsQuery, StatsService};
pub use types::{FetchParams, GameLog, GameRecord, Sport};
