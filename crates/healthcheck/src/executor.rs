//! Concurrent probe execution with per-probe timeout and fault isolation.

use crate::probe::Probe;
use crate::types::Outcome;
use futures::future::join_all;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs batches of probes.
///
/// Every probe gets its own task, so an error, panic or hang in one
/// never reaches its siblings. Results come back in input order.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    limiter: Option<Arc<Semaphore>>,
}

impl Executor {
    /// Executor without a concurrency bound
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that runs at most `max_concurrency` probes at once.
    ///
    /// A probe's timeout starts when it is admitted, not while it queues.
    pub fn bounded(max_concurrency: usize) -> Self {
        Self {
            limiter: Some(Arc::new(Semaphore::new(max_concurrency.max(1)))),
        }
    }

    /// Run every probe and collect one outcome per probe, in input order.
    ///
    /// `default_timeout` applies to probes that do not set their own.
    pub async fn run(&self, probes: &[Arc<dyn Probe>], default_timeout: Duration) -> Vec<Outcome> {
        let runs = probes.iter().map(|probe| {
            let limit = probe.timeout().unwrap_or(default_timeout);
            self.supervise(probe.clone(), limit)
        });

        join_all(runs).await
    }

    /// Admit one probe, spawn it and hold it to its deadline from outside.
    ///
    /// The deadline is enforced on the join handle rather than only inside
    /// the task, so a `check` that blocks its worker thread still yields a
    /// timeout outcome on schedule. On a current-thread runtime such a probe
    /// blocks the caller too; `run_one` then reports the overrun as a
    /// timeout once it returns.
    async fn supervise(&self, probe: Arc<dyn Probe>, limit: Duration) -> Outcome {
        // Held until the probe finishes or is abandoned on timeout
        let _permit = match &self.limiter {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };

        let name = probe.name().to_string();
        let start = Instant::now();
        let mut handle = tokio::spawn(Self::run_one(probe, limit));

        match timeout(limit, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => Self::join_failure(&name, e, start.elapsed()),
            Err(_) => {
                handle.abort();
                Self::timed_out(&name, limit, start.elapsed())
            }
        }
    }

    /// Invoke a single probe under its timeout.
    async fn run_one(probe: Arc<dyn Probe>, limit: Duration) -> Outcome {
        let name = probe.name();
        let start = Instant::now();

        match timeout(limit, probe.check()).await {
            Ok(Ok(_)) if start.elapsed() > limit => Self::timed_out(name, limit, start.elapsed()),
            Ok(Ok(report)) => {
                let duration = start.elapsed();
                debug!(
                    probe = name,
                    status = %report.status,
                    duration_ms = duration.as_millis(),
                    "Probe completed"
                );
                Outcome::new(name, report, duration)
            }
            Ok(Err(e)) => {
                let duration = start.elapsed();
                warn!(probe = name, error = %e, "Probe failed");
                Outcome::error(name, format!("{:#}", e), duration)
            }
            Err(_) => Self::timed_out(name, limit, start.elapsed()),
        }
    }

    fn timed_out(name: &str, limit: Duration, duration: Duration) -> Outcome {
        warn!(
            probe = name,
            timeout_ms = limit.as_millis(),
            "Probe timed out"
        );
        Outcome::timeout(name, limit, duration)
    }

    /// Outcome for a probe task that died instead of returning.
    fn join_failure(name: &str, err: JoinError, duration: Duration) -> Outcome {
        if err.is_panic() {
            let message = panic_message(err.into_panic());
            warn!(probe = name, panic = %message, "Probe panicked");
            Outcome::error(name, format!("panicked: {}", message), duration)
        } else {
            warn!(probe = name, "Probe task cancelled");
            Outcome::error(name, "cancelled", duration)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{BlockingProbe, FnProbe};
    use crate::types::{Category, Report, Status};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn delayed(name: &str, delay: Duration, up: bool) -> Arc<dyn Probe> {
        Arc::new(FnProbe::new(name, Category::Readiness, move || async move {
            sleep(delay).await;
            Ok(Report::from_bool(up))
        }))
    }

    #[tokio::test]
    async fn test_order_follows_input_not_completion() {
        let probes = vec![
            delayed("slow", Duration::from_millis(80), true),
            delayed("fast", Duration::from_millis(1), false),
            delayed("medium", Duration::from_millis(30), true),
        ];

        let outcomes = Executor::new().run(&probes, Duration::from_secs(1)).await;

        let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast", "medium"]);
        assert_eq!(outcomes[1].status, Status::Down);
        assert!(outcomes[1].reason().is_none());
    }

    #[tokio::test]
    async fn test_error_is_isolated() {
        let failing: Arc<dyn Probe> = Arc::new(FnProbe::new("b", Category::Readiness, || async {
            Err(anyhow::anyhow!("connection refused"))
        }));
        let probes = vec![
            delayed("a", Duration::from_millis(5), true),
            failing,
            delayed("c", Duration::from_millis(5), true),
        ];

        let outcomes = Executor::new().run(&probes, Duration::from_secs(1)).await;

        assert_eq!(outcomes[0].status, Status::Up);
        assert_eq!(outcomes[1].status, Status::Down);
        assert_eq!(outcomes[1].reason(), Some("error: connection refused"));
        assert_eq!(outcomes[2].status, Status::Up);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let panicking: Arc<dyn Probe> =
            Arc::new(FnProbe::new("boom", Category::Liveness, || async {
                if true {
                    panic!("probe exploded");
                }
                Ok(Report::up())
            }));
        let blocking_panic: Arc<dyn Probe> =
            Arc::new(BlockingProbe::new("boom-sync", Category::Liveness, || {
                panic!("sync probe exploded")
            }));
        let probes = vec![
            panicking,
            delayed("ok", Duration::from_millis(1), true),
            blocking_panic,
        ];

        let outcomes = Executor::new().run(&probes, Duration::from_secs(1)).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, Status::Down);
        assert_eq!(outcomes[0].reason(), Some("error: panicked: probe exploded"));
        assert_eq!(outcomes[1].status, Status::Up);
        assert_eq!(
            outcomes[2].reason(),
            Some("error: panicked: sync probe exploded")
        );
    }

    #[tokio::test]
    async fn test_timeouts_run_in_parallel() {
        let probes = vec![
            delayed("hang-1", Duration::from_secs(10), true),
            delayed("hang-2", Duration::from_secs(10), true),
            delayed("hang-3", Duration::from_secs(10), true),
            delayed("ok", Duration::from_millis(1), true),
        ];

        let start = Instant::now();
        let outcomes = Executor::new()
            .run(&probes, Duration::from_millis(100))
            .await;
        let elapsed = start.elapsed();

        // Bounded by the longest timeout, not the sum
        assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);
        assert!(outcomes[..3].iter().all(|o| o.reason() == Some("timeout")));
        assert_eq!(outcomes[3].status, Status::Up);
    }

    #[tokio::test]
    async fn test_probe_timeout_overrides_default() {
        let probe: Arc<dyn Probe> = Arc::new(
            FnProbe::new("short", Category::Readiness, || async {
                sleep(Duration::from_millis(200)).await;
                Ok(Report::up())
            })
            .with_timeout(Duration::from_millis(20)),
        );

        let outcomes = Executor::new().run(&[probe], Duration::from_secs(5)).await;
        assert_eq!(outcomes[0].reason(), Some("timeout"));
        assert_eq!(outcomes[0].data["timeout_ms"], 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_probe_does_not_stall_siblings() {
        let stuck: Arc<dyn Probe> = Arc::new(BlockingProbe::new("stuck", Category::Readiness, || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Report::up())
        }));
        let probes = vec![stuck, delayed("ok", Duration::from_millis(1), true)];

        let start = Instant::now();
        let outcomes = Executor::new().run(&probes, Duration::from_millis(50)).await;

        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(outcomes[0].reason(), Some("timeout"));
        assert_eq!(outcomes[1].status, Status::Up);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_thread_blocking_check_still_times_out() {
        let jdbc_like: Arc<dyn Probe> = Arc::new(
            FnProbe::new("jdbc-like", Category::Readiness, || async {
                std::thread::sleep(Duration::from_secs(2));
                Ok(Report::up())
            })
            .with_timeout(Duration::from_millis(100)),
        );

        let start = Instant::now();
        let outcomes = Executor::new().run(&[jdbc_like], Duration::from_secs(5)).await;
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
        assert_eq!(outcomes[0].status, Status::Down);
        assert_eq!(outcomes[0].reason(), Some("timeout"));
        assert_eq!(outcomes[0].data["timeout_ms"], 100);
    }

    #[tokio::test]
    async fn test_overrun_on_single_thread_is_not_up() {
        let overrun: Arc<dyn Probe> = Arc::new(
            FnProbe::new("overrun", Category::Liveness, || async {
                std::thread::sleep(Duration::from_millis(150));
                Ok(Report::up())
            })
            .with_timeout(Duration::from_millis(20)),
        );

        let outcomes = Executor::new().run(&[overrun], Duration::from_secs(5)).await;

        assert_eq!(outcomes[0].status, Status::Down);
        assert_eq!(outcomes[0].reason(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_bounded_concurrency() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let probes: Vec<Arc<dyn Probe>> = (0..6)
            .map(|i| {
                let running = running.clone();
                let peak = peak.clone();
                Arc::new(FnProbe::new(
                    format!("p{}", i),
                    Category::Readiness,
                    move || {
                        let running = running.clone();
                        let peak = peak.clone();
                        async move {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            sleep(Duration::from_millis(20)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok(Report::up())
                        }
                    },
                )) as Arc<dyn Probe>
            })
            .collect();

        let outcomes = Executor::bounded(2)
            .run(&probes, Duration::from_secs(1))
            .await;

        assert!(outcomes.iter().all(Outcome::is_up));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = Executor::new().run(&[], Duration::from_secs(1)).await;
        assert!(outcomes.is_empty());
    }
}
