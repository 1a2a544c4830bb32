use crate::dispatch::Cycle;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

/// Drives cycles either once or on a fixed interval.
///
/// In periodic mode a cycle is started on every tick whether or not the
/// previous one has finished, so long cycles may overlap.
pub struct Scheduler {
    cycle: Arc<dyn Cycle>,
    run_once: bool,
    ticker: Duration,
}

impl Scheduler {
    pub fn new(cycle: Arc<dyn Cycle>, run_once: bool, ticker: Duration) -> Self {
        Self {
            cycle,
            run_once,
            ticker,
        }
    }

    /// Run until the process is terminated, or for one cycle in run-once mode.
    pub async fn run(&self) -> u64 {
        self.run_cycles(None).await
    }

    /// Run at most `max_cycles` cycles and wait for all of them to finish.
    /// Returns the number of cycles started.
    pub async fn run_cycles(&self, max_cycles: Option<u64>) -> u64 {
        if self.run_once {
            self.cycle.run_cycle().await;
            return 1;
        }

        let mut interval = time::interval(self.ticker);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = JoinSet::new();
        let mut started = 0u64;

        while max_cycles.is_none_or(|max| started < max) {
            interval.tick().await;
            started += 1;
            info!("Starting cycle {} (next in {:?})", started, self.ticker);

            let cycle = Arc::clone(&self.cycle);
            in_flight.spawn(async move { cycle.run_cycle().await });

            while let Some(finished) = in_flight.try_join_next() {
                if let Err(e) = finished {
                    error!("Cycle task failed: {}", e);
                }
            }
        }

        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!("Cycle task failed: {}", e);
            }
        }
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::CycleReport;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct Timed {
        starts: Mutex<Vec<Instant>>,
        ends: Mutex<Vec<Instant>>,
        takes: Duration,
    }

    impl Timed {
        fn new(takes: Duration) -> Arc<Self> {
            Arc::new(Self {
                starts: Mutex::new(Vec::new()),
                ends: Mutex::new(Vec::new()),
                takes,
            })
        }
    }

    #[async_trait]
    impl Cycle for Timed {
        async fn run_cycle(&self) -> CycleReport {
            self.starts.lock().unwrap().push(Instant::now());
            time::sleep(self.takes).await;
            self.ends.lock().unwrap().push(Instant::now());
            CycleReport::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_runs_single_cycle() {
        let cycle = Timed::new(Duration::from_secs(5));
        let scheduler = Scheduler::new(cycle.clone(), true, Duration::from_secs(60));

        assert_eq!(scheduler.run().await, 1);
        assert_eq!(cycle.starts.lock().unwrap().len(), 1);
        assert_eq!(cycle.ends.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_follow_ticker() {
        let ticker = Duration::from_secs(600);
        let cycle = Timed::new(Duration::from_secs(30));
        let scheduler = Scheduler::new(cycle.clone(), false, ticker);

        assert_eq!(scheduler.run_cycles(Some(3)).await, 3);

        let starts = cycle.starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= ticker);
        }
        assert_eq!(cycle.ends.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_cycles_overlap() {
        let ticker = Duration::from_secs(60);
        let cycle = Timed::new(Duration::from_secs(150));
        let scheduler = Scheduler::new(cycle.clone(), false, ticker);

        scheduler.run_cycles(Some(2)).await;

        let starts = cycle.starts.lock().unwrap().clone();
        let ends = cycle.ends.lock().unwrap().clone();
        assert_eq!(starts.len(), 2);
        assert_eq!(ends.len(), 2);
        // The second cycle started while the first was still running.
        assert!(starts[1] < ends[0]);
        assert!(starts[1] - starts[0] >= ticker);
    }
}
