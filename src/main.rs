//! stats-tracker
//!
//! CLI and REST API over NBA and soccer stats providers.

use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stats_tracker::cli::{self, Cli, Commands};
use stats_tracker::{directory, routes};
use stats_tracker::{AppConfig, HttpStatsClient, StatsError, StatsService, SystemClock};

/// How often the server drops expired cache entries
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stats_tracker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;
    tracing::debug!("Configuration loaded");

    let service = build_service(&config)?;

    let result = match cli.command {
        Commands::Serve { host, port } => run_server(config, service, host, port).await,
        Commands::Player {
            name,
            last,
            season,
            stat,
            line,
            format,
        } => cli::run_player(&service, &name, last, season, &stat, line, &format).await,
        Commands::Compare {
            names,
            last,
            stat,
            format,
        } => cli::run_compare(&service, &names, last, &stat, &format).await,
        Commands::Team {
            name,
            stat,
            window,
            top,
            format,
        } => cli::run_team(&service, &name, &stat, window, top, &format).await,
        Commands::Record {
            team,
            sport,
            opponent,
            league,
            last,
            odds,
            format,
        } => {
            cli::run_record(
                &service, &team, &sport, opponent, league, last, odds, &format,
            )
            .await
        }
        Commands::Odds {
            sport,
            league,
            team,
            format,
        } => cli::run_odds(&service, &sport, league, team, &format).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<StatsError>() {
            Some(stats_error) => {
                tracing::debug!("{}", stats_error);
                eprintln!("{}", stats_error.advisory());
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}

fn build_service(config: &AppConfig) -> anyhow::Result<StatsService<HttpStatsClient>> {
    let client = HttpStatsClient::new(&config.providers)?;
    let mut service = StatsService::new(client, config, Arc::new(SystemClock));

    if let Some(ref path) = config.directory.players_file {
        tracing::info!("Loading players from: {}", path);
        service = service.with_players(directory::nba_players_with_file(path)?);
    }
    tracing::debug!("{} players in directory", service.players().len());

    Ok(service)
}

/// Run the API server.
async fn run_server(
    mut config: AppConfig,
    service: StatsService<HttpStatsClient>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    let service = Arc::new(service);

    // Expired entries are otherwise only replaced on the next fetch
    let purger = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            purger.purge_cache().await;
        }
    });

    let app = routes::router(service);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
