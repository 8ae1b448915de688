//! CLI commands for stats-tracker.
//!
//! One-shot lookups print a table or JSON; `serve` starts the API server.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::aggregate::{self, StatTable};
use crate::providers::StatsSource;
use crate::service::{PlayerSummary, RecordRequest, StatsService, TeamLeaders, TeamRecord};
use crate::types::{FetchParams, GameRecord, OddsSnapshot, Sport};

#[derive(Parser)]
#[command(name = "stats-tracker")]
#[command(version, about = "Sports stats tracker: game logs, team trends and bet suggestions", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./config.{toml,yaml,json} when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Recent games for an NBA player
    Player {
        /// Player name (substring) or stats.nba.com id
        name: String,

        /// Number of recent games
        #[arg(short, long, default_value_t = 10)]
        last: usize,

        /// Season label, e.g. 2024-25
        #[arg(long)]
        season: Option<String>,

        /// Statistic or composite (PTS, P+R+A, PTS+AST, ...)
        #[arg(short, long, default_value = "P+R+A")]
        stat: String,

        /// Betting line to compare against
        #[arg(long)]
        line: Option<f64>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Compare several NBA players game by game
    Compare {
        /// Player names
        #[arg(required = true, num_args = 2..)]
        names: Vec<String>,

        /// Number of recent games per player
        #[arg(short, long, default_value_t = 10)]
        last: usize,

        /// Statistic or composite
        #[arg(short, long, default_value = "P+R+A")]
        stat: String,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Top players of an NBA roster
    Team {
        /// Team name (substring) or stats.nba.com id
        name: String,

        /// Statistic or composite
        #[arg(short, long, default_value = "P+R+A")]
        stat: String,

        /// Trailing distinct game dates to average over
        #[arg(short, long, default_value_t = 5)]
        window: usize,

        /// Number of leaders
        #[arg(short, long, default_value_t = 10)]
        top: usize,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Recent results or head-to-head with a bet suggestion
    Record {
        /// Team name, or id (stats.nba.com or balldontlie for NBA)
        team: String,

        /// Sport (nba, soccer)
        #[arg(long, default_value = "nba")]
        sport: String,

        /// Opponent for a head-to-head record
        #[arg(short, long)]
        opponent: Option<String>,

        /// Soccer league (name or id)
        #[arg(long)]
        league: Option<String>,

        /// Number of recent games
        #[arg(short, long)]
        last: Option<u32>,

        /// Include the bookmaker's current price
        #[arg(long)]
        odds: bool,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Upcoming events and bookmaker prices
    Odds {
        /// Sport (nba, soccer)
        sport: String,

        /// Soccer league (name or id)
        #[arg(long)]
        league: Option<String>,

        /// Only events involving this team
        #[arg(short, long)]
        team: Option<String>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

/// Print a player's recent games
pub async fn run_player<S: StatsSource>(
    service: &StatsService<S>,
    name: &str,
    last: usize,
    season: Option<String>,
    stat: &str,
    line: Option<f64>,
    format: &str,
) -> anyhow::Result<()> {
    let params = match season {
        Some(season) => FetchParams::default().season(season),
        None => FetchParams::default(),
    };
    let log = service.player_games(name, &params).await?;
    let summary = PlayerSummary::from_log(&log, last, stat, line);

    output(format, &summary, print_player_table)
}

/// Print several players side by side
pub async fn run_compare<S: StatsSource>(
    service: &StatsService<S>,
    names: &[String],
    last: usize,
    stat: &str,
    format: &str,
) -> anyhow::Result<()> {
    let logs = service
        .compare_players(names, &FetchParams::default())
        .await?;
    let summaries: Vec<PlayerSummary> = logs
        .iter()
        .map(|log| PlayerSummary::from_log(log, last, stat, None))
        .collect();

    output(format, &summaries, |summaries| {
        println!("=== {} over last {} games ===", stat, last);
        for summary in summaries {
            println!(
                "  {:<26} avg {:>6}  ({} games)",
                summary.player,
                fmt_value(summary.average),
                summary.games.len()
            );
        }
        println!();

        let tagged: Vec<GameRecord> = summaries
            .iter()
            .flat_map(|s| {
                s.games
                    .iter()
                    .map(move |g| g.clone().with_player(s.player.clone()))
            })
            .collect();
        let column = summaries.first().map_or(stat, |s| s.stat.as_str());
        print_stat_table(&aggregate::pivot(&tagged, column));
    })
}

/// Print a roster leaderboard
pub async fn run_team<S: StatsSource>(
    service: &StatsService<S>,
    name: &str,
    stat: &str,
    window: usize,
    top: usize,
    format: &str,
) -> anyhow::Result<()> {
    if window == 0 || top == 0 {
        anyhow::bail!("--window and --top must be at least 1");
    }
    let leaders = service.team_leaders(name, stat, window, top).await?;
    output(format, &leaders, print_leaders_table)
}

/// Print a team's record and suggestion
#[allow(clippy::too_many_arguments)]
pub async fn run_record<S: StatsSource>(
    service: &StatsService<S>,
    team: &str,
    sport: &str,
    opponent: Option<String>,
    league: Option<String>,
    last: Option<u32>,
    odds: bool,
    format: &str,
) -> anyhow::Result<()> {
    let sport: Sport = sport.parse().map_err(anyhow::Error::msg)?;

    let mut request = RecordRequest::new(sport, team).with_odds(odds);
    if let Some(opponent) = opponent {
        request = request.opponent(opponent);
    }
    if let Some(league) = league {
        request = request.league(league);
    }
    if let Some(last) = last {
        request = request.last_n(last);
    }

    let record = service.team_record(&request).await?;
    output(format, &record, print_record_table)
}

/// Print upcoming events
pub async fn run_odds<S: StatsSource>(
    service: &StatsService<S>,
    sport: &str,
    league: Option<String>,
    team: Option<String>,
    format: &str,
) -> anyhow::Result<()> {
    let sport: Sport = sport.parse().map_err(anyhow::Error::msg)?;
    let sport_key = service.odds_sport_key(sport, league.as_deref())?;

    let mut snapshots = service.odds(&sport_key).await?;
    if let Some(team) = team.as_deref() {
        snapshots.retain(|s| s.involves(team));
    }
    output(format, &snapshots, |snapshots| print_odds_table(&sport_key, snapshots))
}

/// Print as JSON or through the table printer
fn output<T: Serialize + ?Sized>(
    format: &str,
    value: &T,
    print_table: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        "table" => print_table(value),
        _ => {
            eprintln!("Unknown format: {}. Using JSON.", format);
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

/// Print a player's games in table format.
fn print_player_table(summary: &PlayerSummary) {
    println!("=== {} (last {} games) ===", summary.player, summary.games.len());

    let mut columns: Vec<&str> = vec!["PTS", "REB", "AST"];
    if !columns.contains(&summary.stat.as_str()) {
        columns.push(&summary.stat);
    }

    print!("  {:<10}  {:<14}  {:>3}", "Date", "Matchup", "W/L");
    for column in &columns {
        print!("  {:>7}", column);
    }
    println!();

    for game in &summary.games {
        let outcome = game.outcome.map(|o| o.to_string()).unwrap_or_default();
        print!(
            "  {:<10}  {:<14}  {:>3}",
            game.date.to_string(),
            game.matchup,
            outcome
        );
        for column in &columns {
            print!("  {:>7}", fmt_value(game.stat(column)));
        }
        println!();
    }
    println!();

    println!("Average {}: {}", summary.stat, fmt_value(summary.average));
    if let Some(line) = &summary.line {
        println!(
            "Line {}: over {} / under {} / push {} ({} over)",
            line.line,
            line.over,
            line.under,
            line.push,
            fmt_pct(line.over_rate())
        );
    }
}

fn print_leaders_table(leaders: &TeamLeaders) {
    println!(
        "=== {} leaders: {} (last {} game dates) ===",
        leaders.team, leaders.stat, leaders.window
    );
    for (i, leader) in leaders.leaders.iter().enumerate() {
        println!(
            "  {:2}. {:<26} {:>6.1}  ({} games)",
            i + 1,
            leader.player,
            leader.mean,
            leader.games
        );
    }
    println!();
    print_stat_table(&leaders.table);
}

fn print_record_table(record: &TeamRecord) {
    match &record.opponent {
        Some(opponent) => println!("=== {} vs {} ===", record.team, opponent),
        None => println!("=== {} ===", record.team),
    }
    for game in &record.games {
        let outcome = game.outcome.map(|o| o.to_string()).unwrap_or_default();
        println!(
            "  {:<10}  {:>1}  {:<8}  {}",
            game.date.to_string(),
            outcome,
            game.score.as_deref().unwrap_or(""),
            game.opponent
        );
    }
    println!();

    let summary = &record.summary;
    print!("Record: {}-{}", summary.wins, summary.losses);
    if summary.draws > 0 {
        print!("-{}", summary.draws);
    }
    println!(" (win rate {})", fmt_pct(record.win_rate));
    println!("{}", record.message);
}

fn print_odds_table(sport_key: &str, snapshots: &[OddsSnapshot]) {
    println!("=== Odds: {} ===", sport_key);
    if snapshots.is_empty() {
        println!("  No upcoming events.");
        return;
    }
    for snap in snapshots {
        println!(
            "  {}  {} @ {}  [{}]",
            snap.commence_time.format("%Y-%m-%d %H:%M"),
            snap.away_team,
            snap.home_team,
            snap.bookmaker_title
        );
        for market in &snap.markets {
            let prices: Vec<String> = market
                .outcomes
                .iter()
                .map(|o| match o.point {
                    Some(point) => format!("{} {:+} ({:+.0})", o.name, point, o.price),
                    None => format!("{} {:+.0}", o.name, o.price),
                })
                .collect();
            println!("      {:<8} {}", market.key, prices.join(", "));
        }
    }
}

/// Player x date grid
fn print_stat_table(table: &StatTable) {
    if table.rows.is_empty() {
        return;
    }
    print!("  {:<26}", table.stat);
    for date in &table.dates {
        print!("  {:>5}", date.format("%m/%d").to_string());
    }
    println!();
    for row in &table.rows {
        print!("  {:<26}", row.player);
        for value in &row.values {
            print!("  {:>5}", fmt_value(Some(*value)));
        }
        println!();
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{:.0}", v),
        Some(v) => format!("{:.1}", v),
        None => "-".to_string(),
    }
}

fn fmt_pct(rate: Option<f64>) -> String {
    rate.map(|r| format!("{:.0}%", r * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record_command() {
        let cli = Cli::parse_from([
            "stats-tracker",
            "record",
            "arsenal",
            "--sport",
            "soccer",
            "--opponent",
            "chelsea",
            "--odds",
        ]);
        match cli.command {
            Commands::Record {
                team,
                sport,
                opponent,
                odds,
                format,
                ..
            } => {
                assert_eq!(team, "arsenal");
                assert_eq!(sport, "soccer");
                assert_eq!(opponent.as_deref(), Some("chelsea"));
                assert!(odds);
                assert_eq!(format, "table");
            }
            _ => panic!("expected record command"),
        }
    }

    #[test]
    fn test_team_defaults() {
        let cli = Cli::parse_from(["stats-tracker", "team", "lakers"]);
        match cli.command {
            Commands::Team {
                stat, window, top, ..
            } => {
                assert_eq!(stat, "P+R+A");
                assert_eq!(window, 5);
                assert_eq!(top, 10);
            }
            _ => panic!("expected team command"),
        }
    }

    #[test]
    fn test_compare_needs_two_players() {
        assert!(Cli::try_parse_from(["stats-tracker", "compare", "lebron"]).is_err());
        assert!(Cli::try_parse_from(["stats-tracker", "compare", "lebron", "curry"]).is_ok());
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(Some(35.0)), "35");
        assert_eq!(fmt_value(Some(27.34)), "27.3");
        assert_eq!(fmt_value(None), "-");
        assert_eq!(fmt_pct(Some(0.6)), "60%");
        assert_eq!(fmt_pct(None), "n/a");
    }
}
