use crate::config::RunConfig;
use crate::dispatch::Dispatcher;
use crate::job::DownloadJob;
use crate::links::LinkList;
use crate::preflight;
use crate::scheduler::Scheduler;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Check the toolchain, load the link list and hand off to the scheduler.
///
/// Returns once the single cycle is done in run-once mode; otherwise runs
/// until the process is killed.
pub async fn run(config: RunConfig) -> Result<()> {
    preflight::check(&config)
        .await
        .context("Preflight check failed")?;

    let links = LinkList::load(&config.input)
        .with_context(|| format!("Failed to load links from {}", config.input.display()))?;
    info!("Loaded {} links", links.len());

    let config = Arc::new(config);
    let runner = Arc::new(DownloadJob::new(Arc::clone(&config)));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(links), config.list_mode, runner));

    Scheduler::new(dispatcher, config.run_once, config.ticker)
        .run()
        .await;

    Ok(())
}
