//! The probe contract and adapters for plain functions.

use crate::types::{Category, Report};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A named, categorized diagnostic check supplied by the embedding application.
///
/// Returning `Err` (or panicking) is not fatal: the executor records the
/// probe as DOWN with the error message and carries on with its siblings.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Name of this probe, unique within its category
    fn name(&self) -> &str;

    /// Category the probe reports into
    fn category(&self) -> Category;

    /// Per-probe timeout, overriding the category default
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Perform the check
    async fn check(&self) -> anyhow::Result<Report>;
}

/// Probe backed by an async closure.
pub struct FnProbe<F> {
    name: String,
    category: Category,
    timeout: Option<Duration>,
    f: F,
}

impl<F, Fut> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Report>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, category: Category, f: F) -> Self {
        Self {
            name: name.into(),
            category,
            timeout: None,
            f,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Report>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn check(&self) -> anyhow::Result<Report> {
        (self.f)().await
    }
}

/// Probe backed by a synchronous, possibly blocking closure.
///
/// Runs on tokio's blocking pool so a probe stuck in blocking I/O cannot
/// starve the async workers evaluating its siblings. If it overruns its
/// timeout it is abandoned, not killed: the closure keeps its blocking-pool
/// thread until it returns.
///
/// At most one invocation runs at a time. While an abandoned call is still
/// in progress, further checks fail fast with an error instead of parking
/// another thread behind it, so a hung closure holds one thread no matter
/// how often it is polled.
pub struct BlockingProbe<F> {
    name: String,
    category: Category,
    timeout: Option<Duration>,
    f: Arc<F>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the blocking call ends, panics included.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<F> BlockingProbe<F>
where
    F: Fn() -> anyhow::Result<Report> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, category: Category, f: F) -> Self {
        Self {
            name: name.into(),
            category,
            timeout: None,
            f: Arc::new(f),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Blocking probe that is UP whenever `predicate` returns true.
pub fn predicate<P>(
    name: impl Into<String>,
    category: Category,
    check: P,
) -> BlockingProbe<impl Fn() -> anyhow::Result<Report> + Send + Sync + 'static>
where
    P: Fn() -> bool + Send + Sync + 'static,
{
    BlockingProbe::new(name, category, move || Ok(Report::from_bool(check())))
}

#[async_trait]
impl<F> Probe for BlockingProbe<F>
where
    F: Fn() -> anyhow::Result<Report> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn check(&self) -> anyhow::Result<Report> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            anyhow::bail!("previous invocation still running");
        }

        let guard = InFlight(self.in_flight.clone());
        let f = self.f.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            (*f)()
        });
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(anyhow::anyhow!("blocking probe cancelled: {}", e)),
        }
    }
}
