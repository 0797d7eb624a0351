mod scheduler;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use laxsched_ingest::ScrapeCoordinator;

#[derive(Debug, Parser)]
#[command(name = "laxsched")]
#[command(about = "College lacrosse schedule and rankings ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an ingestion now and print the outcome.
    Scrape {
        #[arg(value_enum, default_value_t = Target::All)]
        target: Target,
    },
    /// Print the schedule, from cache unless `--force` is given.
    Games {
        #[arg(long)]
        force: bool,
    },
    /// Print the cached polls.
    Rankings,
    /// Fetch (or read from cache) one game's detail page.
    Detail { url: String },
    /// Print the scrape status record and cache backend summary.
    Status,
    /// Remove every ingestion key from the cache.
    ClearCache,
    /// Run ingestion on a cron schedule until interrupted.
    Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Games,
    Rankings,
    All,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    scrape: laxsched_core::ScrapeStatus,
    cache: laxsched_cache::CacheStatus,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = laxsched_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let coordinator = ScrapeCoordinator::from_config(&config)?;
    tracing::debug!(env = %config.env, "coordinator ready");

    match cli.command {
        Commands::Scrape { target: Target::Games } => {
            print_json(&coordinator.scrape_games().await)?;
        }
        Commands::Scrape {
            target: Target::Rankings,
        } => {
            print_json(&coordinator.scrape_rankings().await)?;
        }
        Commands::Scrape { target: Target::All } => {
            let (games, rankings) =
                tokio::join!(coordinator.scrape_games(), coordinator.scrape_rankings());
            print_json(&serde_json::json!({ "games": games, "rankings": rankings }))?;
        }
        Commands::Games { force } => print_json(&coordinator.get_games(force).await)?,
        Commands::Rankings => print_json(&coordinator.cached_rankings().await?)?,
        Commands::Detail { url } => print_json(&coordinator.game_detail(&url).await?)?,
        Commands::Status => {
            let report = StatusReport {
                scrape: coordinator.scrape_status().await?,
                cache: coordinator.cache_status().await?,
            };
            print_json(&report)?;
        }
        Commands::ClearCache => {
            let removed = coordinator.clear_cache().await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Schedule => scheduler::run(coordinator).await?,
    }

    Ok(())
}
