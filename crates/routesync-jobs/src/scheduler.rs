//! Recurring-job scheduler.
//!
//! Owns the background execution of every job in the pipeline. Each job
//! gets its own timer loop and two guarantees the trigger primitive does
//! not provide by itself:
//!
//! - **At most one concurrent run per job.** Every job carries a run-lock;
//!   a firing that finds the previous run of the same job still holding it
//!   is skipped entirely, never queued. Distinct jobs run concurrently.
//! - **Coalescing.** The next firing is always computed from the current
//!   wall clock after the previous tick was handled, so firings missed
//!   while the process was busy or suspended collapse into a single
//!   catch-up run.
//!
//! Shutdown is cooperative: the handle signals every loop, each loop stops
//! taking new firings and waits for its in-flight run to finish its unit of
//! work.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use cron::Schedule;
use futures::future::BoxFuture;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{error, info, warn};

use routesync_core::{Error, Result};

/// When a job should fire.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Fire on a cron schedule (UTC).
    Cron(Box<Schedule>),
    /// Fire at a fixed interval.
    Interval(Duration),
}

impl Trigger {
    /// Parse a cron expression.
    ///
    /// Accepts both the 5-field crontab form (`*/10 * * * *`) and the
    /// 6/7-field form with seconds; the 5-field form fires at second zero.
    pub fn cron(expr: &str) -> Result<Self> {
        let normalized = if expr.split_whitespace().count() == 5 {
            format!("0 {expr}")
        } else {
            expr.to_string()
        };

        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| Error::InvalidInput(format!("Bad cron expression {expr:?}: {e}")))?;
        Ok(Trigger::Cron(Box::new(schedule)))
    }

    /// Fixed interval in seconds.
    pub fn interval_secs(secs: u64) -> Self {
        Trigger::Interval(Duration::from_secs(secs))
    }

    /// The next firing strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron(schedule) => schedule.after(&after).next(),
            Trigger::Interval(interval) => {
                Some(after + chrono::Duration::from_std(*interval).ok()?)
            }
        }
    }
}

/// Boxed async entry point of a job.
pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One entry of the static job table.
#[derive(Clone)]
pub struct JobSpec {
    /// Stable job identifier, used in logs.
    pub id: &'static str,
    /// When the job fires.
    pub trigger: Trigger,
    run: JobFn,
}

impl JobSpec {
    /// Create a job spec from an async closure.
    pub fn new<F, Fut>(id: &'static str, trigger: Trigger, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            id,
            trigger,
            run: Arc::new(move || Box::pin(run())),
        }
    }
}

/// Scheduler holding the job table before it is started.
///
/// An explicit, passed-around object rather than process globals, so test
/// harnesses and multiple schedulers can coexist.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<JobSpec>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job to the table.
    pub fn with_job(mut self, spec: JobSpec) -> Self {
        self.jobs.push(spec);
        self
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawn every job loop and return a handle for shutdown.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, _) = watch::channel(false);

        let tasks = self
            .jobs
            .into_iter()
            .map(|spec| {
                let shutdown_rx = shutdown_tx.subscribe();
                tokio::spawn(run_job_loop(spec, shutdown_rx))
            })
            .collect::<Vec<_>>();

        info!(jobs = tasks.len(), "Scheduler started");
        SchedulerHandle { shutdown_tx, tasks }
    }
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Request a graceful shutdown and wait for in-flight runs to finish.
    pub async fn shutdown(self) {
        info!("Scheduler shutting down; waiting for in-flight runs");
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = ?e, "Job loop task panicked");
            }
        }
        info!("Scheduler stopped");
    }
}

/// Timer loop for one job.
async fn run_job_loop(spec: JobSpec, mut shutdown: watch::Receiver<bool>) {
    info!(job = spec.id, trigger = ?spec.trigger, "Job registered");

    let run_lock = Arc::new(Mutex::new(()));
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        let now = Utc::now();
        let Some(next) = spec.trigger.next_fire(now) else {
            warn!(job = spec.id, "Trigger yields no further firings; job loop exits");
            break;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = sleep(delay) => {}
        }

        // Reap runs that have finished since the last tick.
        while in_flight.try_join_next().is_some() {}

        match run_lock.clone().try_lock_owned() {
            Ok(guard) => {
                let id = spec.id;
                let run = spec.run.clone();
                in_flight.spawn(async move {
                    let _guard = guard;
                    let start = Instant::now();
                    match run().await {
                        Ok(()) => info!(
                            job = id,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Job run completed"
                        ),
                        Err(e) => error!(
                            job = id,
                            duration_ms = start.elapsed().as_millis() as u64,
                            error = %e,
                            "Job run failed"
                        ),
                    }
                });
            }
            Err(_) => {
                info!(job = spec.id, "Previous run still in progress; skipping this firing");
            }
        }
    }

    // Cooperative shutdown: in-flight runs finish their unit of work.
    while in_flight.join_next().await.is_some() {}
    info!(job = spec.id, "Job loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cron_accepts_five_field_crontab() {
        let trigger = Trigger::cron("*/10 * * * *").unwrap();
        let next = trigger.next_fire(Utc::now()).unwrap();
        assert!(next > Utc::now() - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_cron_accepts_six_field_expression() {
        assert!(Trigger::cron("0 */5 * * * *").is_ok());
    }

    #[test]
    fn test_cron_rejects_garbage() {
        assert!(Trigger::cron("not a cron line").is_err());
    }

    #[test]
    fn test_interval_next_fire() {
        let trigger = Trigger::interval_secs(60);
        let now = Utc::now();
        let next = trigger.next_fire(now).unwrap();
        assert_eq!(next - now, chrono::Duration::seconds(60));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_same_job_runs_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let spec = {
            let active = active.clone();
            let overlaps = overlaps.clone();
            let runs = runs.clone();
            JobSpec::new(
                "overlap_probe",
                Trigger::Interval(Duration::from_millis(50)),
                move || {
                    let active = active.clone();
                    let overlaps = overlaps.clone();
                    let runs = runs.clone();
                    async move {
                        if active.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        runs.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(120)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )
        };

        let handle = Scheduler::new().with_job(spec).start();
        sleep(Duration::from_millis(600)).await;
        handle.shutdown().await;

        assert!(runs.load(Ordering::SeqCst) >= 2, "expected repeated runs");
        assert_eq!(overlaps.load(Ordering::SeqCst), 0, "runs overlapped");
        assert_eq!(active.load(Ordering::SeqCst), 0, "shutdown left a run in flight");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missed_firings_collapse_into_one_catchup_run() {
        // A 150ms run spans several 40ms ticks. With coalescing, the ticks
        // missed while it was running collapse into a single catch-up run,
        // so run starts stay at least a run apart and never burst
        // back-to-back.
        let starts = Arc::new(std::sync::Mutex::new(Vec::<Instant>::new()));

        let spec = {
            let starts = starts.clone();
            JobSpec::new(
                "slow_ticker",
                Trigger::Interval(Duration::from_millis(40)),
                move || {
                    let starts = starts.clone();
                    async move {
                        starts.lock().unwrap().push(Instant::now());
                        sleep(Duration::from_millis(150)).await;
                        Ok(())
                    }
                },
            )
        };

        let handle = Scheduler::new().with_job(spec).start();
        sleep(Duration::from_millis(600)).await;
        handle.shutdown().await;

        let starts = starts.lock().unwrap();
        assert!(starts.len() >= 2, "expected repeated runs");
        for pair in starts.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap >= Duration::from_millis(100),
                "catch-up runs fired back-to-back ({gap:?} apart)"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_waits_for_in_flight_run() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let spec = {
            let started = started.clone();
            let finished = finished.clone();
            JobSpec::new(
                "slow_job",
                Trigger::Interval(Duration::from_millis(20)),
                move || {
                    let started = started.clone();
                    let finished = finished.clone();
                    async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(200)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )
        };

        let handle = Scheduler::new().with_job(spec).start();
        // Let at least one run start.
        sleep(Duration::from_millis(80)).await;
        handle.shutdown().await;

        assert!(started.load(Ordering::SeqCst) >= 1);
        assert_eq!(
            started.load(Ordering::SeqCst),
            finished.load(Ordering::SeqCst),
            "shutdown returned before an in-flight run finished"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_jobs_run_concurrently() {
        let both_active = Arc::new(AtomicUsize::new(0));
        let concurrent_seen = Arc::new(AtomicUsize::new(0));

        let make = |id: &'static str,
                    both_active: Arc<AtomicUsize>,
                    concurrent_seen: Arc<AtomicUsize>| {
            JobSpec::new(id, Trigger::Interval(Duration::from_millis(30)), move || {
                let both_active = both_active.clone();
                let concurrent_seen = concurrent_seen.clone();
                async move {
                    if both_active.fetch_add(1, Ordering::SeqCst) > 0 {
                        concurrent_seen.fetch_add(1, Ordering::SeqCst);
                    }
                    sleep(Duration::from_millis(100)).await;
                    both_active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };

        let handle = Scheduler::new()
            .with_job(make("job_a", both_active.clone(), concurrent_seen.clone()))
            .with_job(make("job_b", both_active.clone(), concurrent_seen.clone()))
            .start();
        sleep(Duration::from_millis(400)).await;
        handle.shutdown().await;

        assert!(
            concurrent_seen.load(Ordering::SeqCst) > 0,
            "distinct jobs never ran at the same time"
        );
    }
}
