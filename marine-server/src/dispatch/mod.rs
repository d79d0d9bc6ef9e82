//! Detached background jobs
//!
//! Work that outlives a request runs through a [`Dispatcher`]: a bounded
//! number of jobs execute at once, the rest wait inside their own task, and a
//! panicking job is logged without affecting the process or sibling jobs.

pub mod fanout;

pub use fanout::DispatchFanout;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Spawner for fault-isolated background jobs.
#[derive(Clone)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl Dispatcher {
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Number of jobs currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Spawn `job` without waiting for a slot.
    ///
    /// The returned handle always resolves to `()`; failures stay inside the
    /// job and are only logged.
    pub fn spawn<F>(&self, name: &'static str, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!(job = name, "Dispatcher closed, job dropped");
                    return;
                }
            };

            let start = Instant::now();
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(()) => tracing::debug!(
                    job = name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Background job finished"
                ),
                Err(panic) => tracing::error!(
                    job = name,
                    panic = %panic_message(panic.as_ref()),
                    "Background job panicked"
                ),
            }
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_panicking_job_is_contained() {
        let dispatcher = Dispatcher::new(4);
        let ran = Arc::new(AtomicUsize::new(0));

        let bad = dispatcher.spawn("panics", async {
            panic!("matching exploded");
        });
        let counter = ran.clone();
        let good = dispatcher.spawn("sibling", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Both handles resolve normally.
        bad.await.unwrap();
        good.await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_spawn_never_blocks_when_saturated() {
        let dispatcher = Dispatcher::new(1);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let blocker = dispatcher.spawn("blocker", async move {
            let _ = release_rx.await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dispatcher.in_flight(), 1);

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        // Returns immediately even though no slot is free.
        let queued = dispatcher.spawn("queued", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        release_tx.send(()).unwrap();
        blocker.await.unwrap();
        queued.await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(Dispatcher::new(0).max_in_flight, 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
    }
}
