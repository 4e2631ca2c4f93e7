//! Shared worker shape: `{running, stop, task-handle, stats}` with `start()` /
//! `stop_now()` / `step_once()`. `start` is idempotent. The loop runs `step_once`,
//! updates stats, then sleeps for the configured interval in bounded 250ms slices
//! so a `stop_now()` is observed within at most one slice.

use parking_lot::Mutex as SyncMutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

const SLEEP_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkerStats {
    pub steps: u64,
    pub errors: u64,
    pub last_ts: Option<String>,
    pub last_error: Option<String>,
}

pub type StepFn = dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync;

pub struct Supervisor {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: SyncMutex<Option<JoinHandle<()>>>,
    stats: Arc<SyncMutex<WorkerStats>>,
}

impl Supervisor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Arc::new(AtomicBool::new(false)),
            handle: SyncMutex::new(None),
            stats: Arc::new(SyncMutex::new(WorkerStats::default())),
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Idempotent: a second call while already running is a no-op.
    pub fn start(&self, interval: Duration, step: Arc<StepFn>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let running = self.running.clone();
        let stats = self.stats.clone();
        let name = self.name;

        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match step().await {
                    Ok(()) => {
                        let mut s = stats.lock();
                        s.steps += 1;
                        s.last_ts = Some(crate::clock::utc_now_iso());
                        s.last_error = None;
                    }
                    Err(e) => {
                        error!(worker = name, error = %e, "worker step failed");
                        let mut s = stats.lock();
                        s.errors += 1;
                        s.last_error = Some(e.to_string());
                    }
                }

                let mut slept = Duration::ZERO;
                while slept < interval && running.load(Ordering::SeqCst) {
                    let slice = SLEEP_SLICE.min(interval - slept);
                    tokio::time::sleep(slice).await;
                    slept += slice;
                }
            }
        });

        *self.handle.lock() = Some(task);
        info!(worker = name, "worker started");
    }

    pub fn stop_now(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
        info!(worker = self.name, "worker stop signaled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn runs_step_and_stops_within_one_slice() {
        let supervisor = Supervisor::new("test");
        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = counter.clone();
        supervisor.start(
            Duration::from_millis(50),
            Arc::new(move || -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> {
                let counter = counter2.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );
        tokio::time::sleep(Duration::from_millis(120)).await;
        supervisor.stop_now();
        assert!(counter.load(Ordering::SeqCst) >= 1);
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let supervisor = Supervisor::new("test2");
        let step: Arc<StepFn> =
            Arc::new(|| -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> { Box::pin(async { Ok(()) }) });
        supervisor.start(Duration::from_secs(60), step.clone());
        supervisor.start(Duration::from_secs(60), step);
        supervisor.stop_now();
    }
}
