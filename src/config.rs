//! Configuration for the stats tracker.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Provider endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_nba_stats_url")]
    pub nba_stats_url: String,
    #[serde(default = "default_balldontlie_url")]
    pub balldontlie_url: String,
    #[serde(default)]
    pub balldontlie_key: Option<String>,
    #[serde(default = "default_api_football_url")]
    pub api_football_url: String,
    #[serde(default)]
    pub api_football_key: Option<String>,
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,
    #[serde(default)]
    pub odds_api_key: Option<String>,
    /// NBA season label, e.g. `2025-26`
    #[serde(default = "default_season")]
    pub season: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_regions")]
    pub regions: String,
    #[serde(default = "default_markets")]
    pub markets: String,
    #[serde(default = "default_bookmakers")]
    pub bookmakers: String,
}

fn default_nba_stats_url() -> String {
    "https://stats.nba.com/stats".to_string()
}

fn default_balldontlie_url() -> String {
    "https://api.balldontlie.io/v1".to_string()
}

fn default_api_football_url() -> String {
    "https://v3.football.api-sports.io".to_string()
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_season() -> String {
    "2025-26".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_regions() -> String {
    "us".to_string()
}

fn default_markets() -> String {
    "h2h,spreads,totals".to_string()
}

fn default_bookmakers() -> String {
    "fanduel".to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            nba_stats_url: default_nba_stats_url(),
            balldontlie_url: default_balldontlie_url(),
            balldontlie_key: None,
            api_football_url: default_api_football_url(),
            api_football_key: None,
            odds_api_url: default_odds_api_url(),
            odds_api_key: None,
            season: default_season(),
            timeout_secs: default_timeout_secs(),
            regions: default_regions(),
            markets: default_markets(),
            bookmakers: default_bookmakers(),
        }
    }
}

/// Retry and pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before every provider call
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Delay after a failed attempt
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Delay between per-player calls while walking a roster
    #[serde(default = "default_roster_delay_ms")]
    pub roster_delay_ms: u64,
    #[serde(default = "default_roster_size")]
    pub roster_size: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_pacing_ms() -> u64 {
    1200
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_roster_delay_ms() -> u64 {
    100
}

fn default_roster_size() -> usize {
    12
}

impl FetchConfig {
    pub fn roster_delay(&self) -> Duration {
        Duration::from_millis(self.roster_delay_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            pacing_ms: default_pacing_ms(),
            backoff_ms: default_backoff_ms(),
            roster_delay_ms: default_roster_delay_ms(),
            roster_size: default_roster_size(),
        }
    }
}

/// Cache TTLs in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_player_ttl_secs")]
    pub player_ttl_secs: i64,
    #[serde(default = "default_team_ttl_secs")]
    pub team_ttl_secs: i64,
    #[serde(default = "default_team_ttl_secs")]
    pub results_ttl_secs: i64,
    /// Return an expired entry when the refetch fails
    #[serde(default)]
    pub serve_stale_on_failure: bool,
}

fn default_player_ttl_secs() -> i64 {
    300
}

fn default_team_ttl_secs() -> i64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            player_ttl_secs: default_player_ttl_secs(),
            team_ttl_secs: default_team_ttl_secs(),
            results_ttl_secs: default_team_ttl_secs(),
            serve_stale_on_failure: false,
        }
    }
}

/// Bet suggestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingConfig {
    #[serde(default = "default_win_rate_threshold")]
    pub win_rate_threshold: f64,
    #[serde(default = "default_bookmaker")]
    pub bookmaker: String,
}

fn default_win_rate_threshold() -> f64 {
    0.6
}

fn default_bookmaker() -> String {
    "fanduel".to_string()
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            win_rate_threshold: default_win_rate_threshold(),
            bookmaker: default_bookmaker(),
        }
    }
}

/// Entity directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Optional JSON file of `{id, name, active}` players merged into the seed list
    #[serde(default)]
    pub players_file: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and the environment
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`AppConfig::load`], reading `path` instead of `./config.*`
    pub fn load_from(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(file)
            // Override with environment variables (STATS_SERVER__PORT, STATS_PROVIDERS__ODDS_API_KEY, etc.)
            .add_source(
                config::Environment::with_prefix("STATS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Conventional key names
            .set_override_option("providers.balldontlie_key", std::env::var("NBA_STATS_API_KEY").ok())?
            .set_override_option(
                "providers.api_football_key",
                std::env::var("SOCCER_STATS_API_KEY").ok(),
            )?
            .set_override_option("providers.odds_api_key", std::env::var("ODDS_API_KEY").ok())?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
