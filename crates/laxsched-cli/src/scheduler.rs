//! Cron-driven ingestion.
//!
//! Games refresh every 12 hours and rankings daily at midnight UTC. After
//! each run, and once at start-up, the next planned run times are written to
//! the status record.

use std::fmt;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use laxsched_ingest::ScrapeCoordinator;

pub const GAMES_CRON: &str = "0 0 */12 * * *";
pub const RANKINGS_CRON: &str = "0 0 0 * * *";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Games,
    Rankings,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Domain::Games => "games",
            Domain::Rankings => "rankings",
        })
    }
}

impl Domain {
    fn cron(self) -> &'static str {
        match self {
            Domain::Games => GAMES_CRON,
            Domain::Rankings => RANKINGS_CRON,
        }
    }

    /// Returns whether the run ended stale.
    async fn run(self, coordinator: &ScrapeCoordinator) -> bool {
        match self {
            Domain::Games => coordinator.scrape_games().await.stale,
            Domain::Rankings => coordinator.scrape_rankings().await.stale,
        }
    }
}

async fn record_next_run(
    coordinator: &ScrapeCoordinator,
    domain: Domain,
    next: Option<chrono::DateTime<chrono::Utc>>,
) {
    let (games, rankings) = match domain {
        Domain::Games => (next, None),
        Domain::Rankings => (None, next),
    };
    if let Err(e) = coordinator.record_next_runs(games, rankings).await {
        tracing::warn!(domain = %domain, error = %e, "scheduler: failed to record next run");
    }
}

fn build_job(domain: Domain, coordinator: ScrapeCoordinator) -> Result<Job, JobSchedulerError> {
    Job::new_async(domain.cron(), move |uuid, mut lock| {
        let coordinator = coordinator.clone();
        Box::pin(async move {
            tracing::info!(domain = %domain, "scheduler: starting run");
            let stale = domain.run(&coordinator).await;
            tracing::info!(domain = %domain, stale, "scheduler: run complete");
            let next = lock.next_tick_for_job(uuid).await.ok().flatten();
            record_next_run(&coordinator, domain, next).await;
        })
    })
}

/// Start both jobs and block until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the scheduler cannot be started or a job cannot be
/// registered.
pub async fn run(coordinator: ScrapeCoordinator) -> anyhow::Result<()> {
    let mut scheduler = JobScheduler::new().await?;
    let mut job_ids = Vec::new();
    for domain in [Domain::Games, Domain::Rankings] {
        let id = scheduler.add(build_job(domain, coordinator.clone())?).await?;
        tracing::info!(domain = %domain, cron = domain.cron(), "scheduler: registered job");
        job_ids.push((domain, id));
    }
    scheduler.start().await?;

    for (domain, id) in job_ids {
        let next = scheduler.next_tick_for_job(id).await?;
        record_next_run(&coordinator, domain, next).await;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, stopping scheduler");
    scheduler.shutdown().await?;
    Ok(())
}
