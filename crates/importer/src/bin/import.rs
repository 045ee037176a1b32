use std::time::Duration;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use importer::daily::default_stats_date;
use importer::eligibility::{DEFAULT_MIN_HRS, import_eligibility};
use importer::sources::mlb::DEFAULT_BASE_URL;
use importer::{DailyStatsIngestor, MlbClient, MlbDailyIngestor};
use storage::models::LeaderboardScope;
use storage::services::leaderboard::{calculate_leaderboard, scope_for_date};

#[derive(Parser)]
#[command(name = "import")]
#[command(about = "Home run contest stats importer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "MLB_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    api_base_url: String,

    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one day of home runs (defaults to yesterday in the feed's timezone)
    UpdateStats {
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, env = "SEASON_YEAR")]
        season_year: Option<i32>,

        #[arg(long, env = "FEED_UTC_OFFSET_HOURS", default_value_t = -4, allow_hyphen_values = true)]
        utc_offset_hours: i32,

        /// Rebuild the overall and monthly leaderboards when rows changed
        #[arg(long)]
        rebuild: bool,
    },
    /// Import a season's home run leaders as the eligible player pool
    Eligibility {
        #[arg(long)]
        season: Option<i32>,

        #[arg(long, default_value_t = DEFAULT_MIN_HRS)]
        min_hrs: i32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("import={log_level},importer={log_level},storage={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await
        .context("Failed to connect to database")?;

    let client = MlbClient::new(&cli.api_base_url, Duration::from_secs(cli.timeout_secs))
        .context("Failed to build MLB API client")?;

    match cli.command {
        Commands::UpdateStats {
            date,
            season_year,
            utc_offset_hours,
            rebuild,
        } => {
            let date = date.unwrap_or_else(|| default_stats_date(Utc::now(), utc_offset_hours));
            let season_year = season_year.unwrap_or(date.year());
            tracing::info!(%date, season_year, "Updating stats");

            let ingestor = MlbDailyIngestor::new(client, pool.clone());
            let summary = ingestor.ingest(season_year, date).await?;

            println!("Date:      {date}");
            println!("Season:    {season_year}");
            println!("Games:     {}", summary.games);
            println!("Created:   {}", summary.created);
            println!("Updated:   {}", summary.updated);
            println!("Unchanged: {}", summary.unchanged);
            println!("Skipped:   {}", summary.skipped);
            println!("Errors:    {}", summary.errors);

            if rebuild && summary.changed() {
                for scope in [LeaderboardScope::Overall, scope_for_date(date)] {
                    let run = calculate_leaderboard(&pool, season_year, scope).await?;
                    println!("Rebuilt {scope} leaderboard: {} teams", run.teams_ranked);
                }
            }

            if summary.errors > 0 {
                anyhow::bail!("{} row(s) failed to write", summary.errors);
            }
        }
        Commands::Eligibility { season, min_hrs } => {
            let season = season.unwrap_or(Utc::now().year() - 1);
            let summary = import_eligibility(&pool, &client, season, min_hrs).await?;

            println!("Season:   {season}");
            println!("Fetched:  {}", summary.fetched);
            println!("Eligible: {} (>= {min_hrs} HR)", summary.eligible);
            println!("Created:  {}", summary.players_created);
            println!("Updated:  {}", summary.players_updated);
            println!("Errors:   {}", summary.errors);

            if summary.errors > 0 {
                anyhow::bail!("{} player(s) failed to import", summary.errors);
            }
        }
    }

    Ok(())
}
