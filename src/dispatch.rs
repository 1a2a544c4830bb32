use crate::config::ListMode;
use crate::job::{self, JobError, JobRunner, ProgressMode};
use crate::links::LinkList;
use async_trait::async_trait;
use console::style;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Tally of one cycle, used for the summary log line only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl CycleReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Styled one-line summary for the end of a cycle.
    pub fn summary(&self) -> String {
        format!(
            "Cycle finished: {} succeeded, {} failed",
            style(self.succeeded).green(),
            if self.failed > 0 {
                style(self.failed).red().bold()
            } else {
                style(self.failed).dim()
            }
        )
    }
}

/// Something the scheduler can run once per tick.
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run_cycle(&self) -> CycleReport;
}

/// Runs every link of the list exactly once per cycle.
pub struct Dispatcher {
    links: Arc<LinkList>,
    mode: ListMode,
    runner: Arc<dyn JobRunner>,
}

impl Dispatcher {
    pub fn new(links: Arc<LinkList>, mode: ListMode, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            links,
            mode,
            runner,
        }
    }

    async fn run_serial(&self, progress: ProgressMode) -> CycleReport {
        let mut report = CycleReport::default();
        for link in self.links.iter() {
            let ok = job::run_logged(self.runner.as_ref(), link, progress).await;
            report.record(ok);
        }
        report
    }

    async fn run_parallel(&self, progress: ProgressMode) -> CycleReport {
        let mut tasks = JoinSet::new();
        for link in self.links.iter() {
            let runner = Arc::clone(&self.runner);
            let link = link.clone();
            tasks.spawn(async move { job::run_logged(runner.as_ref(), &link, progress).await });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(ok) => report.record(ok),
                Err(e) => {
                    error!("Download task failed: {}", JobError::Aborted(e.to_string()));
                    report.record(false);
                }
            }
        }
        report
    }
}

#[async_trait]
impl Cycle for Dispatcher {
    async fn run_cycle(&self) -> CycleReport {
        let progress = ProgressMode::for_cycle(self.mode, self.links.len());
        info!("Starting {} cycle over {} links", self.mode, self.links.len());

        let report = match self.mode {
            ListMode::Serial => self.run_serial(progress).await,
            ListMode::Parallel => self.run_parallel(progress).await,
        };

        info!("{}", report.summary());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobOutcome;
    use crate::links::Link;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Start(String),
        End(String),
    }

    /// Records start/end of every job; links starting with "fail" fail.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
        progress: Mutex<Vec<ProgressMode>>,
    }

    #[async_trait]
    impl JobRunner for Recorder {
        async fn run(&self, link: &Link, progress: ProgressMode) -> JobOutcome {
            self.events
                .lock()
                .unwrap()
                .push(Event::Start(link.to_string()));
            self.progress.lock().unwrap().push(progress);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.events.lock().unwrap().push(Event::End(link.to_string()));

            if link.as_str().starts_with("fail") {
                Err(JobError::Aborted("simulated".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn links(items: &[&str]) -> Arc<LinkList> {
        Arc::new(items.iter().map(|s| Link::new(*s)).collect())
    }

    #[tokio::test]
    async fn test_serial_runs_in_order() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(links(&["a", "fail-b", "c"]), ListMode::Serial, recorder.clone());

        let report = dispatcher.run_cycle().await;
        assert_eq!(report, CycleReport { succeeded: 2, failed: 1 });

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                Event::Start("a".into()),
                Event::End("a".into()),
                Event::Start("fail-b".into()),
                Event::End("fail-b".into()),
                Event::Start("c".into()),
                Event::End("c".into()),
            ]
        );
        assert!(recorder
            .progress
            .lock()
            .unwrap()
            .iter()
            .all(|p| *p == ProgressMode::Show));
    }

    #[tokio::test]
    async fn test_parallel_waits_for_all() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(
            links(&["a", "fail-b", "c", "d"]),
            ListMode::Parallel,
            recorder.clone(),
        );

        let report = dispatcher.run_cycle().await;
        assert_eq!(report, CycleReport { succeeded: 3, failed: 1 });

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events.len(), 8);

        // Every job started before any of them finished.
        let first_end = events
            .iter()
            .position(|e| matches!(e, Event::End(_)))
            .unwrap();
        assert_eq!(first_end, 4);
        assert!(recorder
            .progress
            .lock()
            .unwrap()
            .iter()
            .all(|p| *p == ProgressMode::Hide));
    }

    #[tokio::test]
    async fn test_parallel_single_link_shows_progress() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(links(&["only"]), ListMode::Parallel, recorder.clone());

        dispatcher.run_cycle().await;
        assert_eq!(*recorder.progress.lock().unwrap(), vec![ProgressMode::Show]);
    }

    #[test]
    fn test_summary_mentions_counts() {
        console::set_colors_enabled(false);
        let report = CycleReport { succeeded: 4, failed: 2 };
        assert_eq!(report.summary(), "Cycle finished: 4 succeeded, 2 failed");
    }

    #[tokio::test]
    async fn test_empty_list() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(links(&[]), ListMode::Parallel, recorder.clone());

        let report = dispatcher.run_cycle().await;
        assert_eq!(report.total(), 0);
        assert!(recorder.events.lock().unwrap().is_empty());
    }
}
