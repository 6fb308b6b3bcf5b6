//! Bounded concurrency for generation jobs.
//!
//! Each inbound prompt runs as its own Tokio task, but never more than
//! the configured number at once. Beyond the limit the caller is told
//! the bot is busy and replies accordingly, instead of queueing unbounded
//! work behind an unmanaged thread per request.

use std::sync::Arc;

use tokio::sync::Semaphore;

/// Returned when all generation slots are taken.
#[derive(Debug, PartialEq, Eq)]
pub struct Busy;

/// Caps the number of concurrently running generation tasks.
#[derive(Clone)]
pub struct JobLimiter {
    permits: Arc<Semaphore>,
}

impl JobLimiter {
    /// Create a limiter allowing up to `max_concurrent` tasks.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Number of free generation slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Spawn `task` if a slot is free, holding the slot until the task
    /// finishes. Returns [`Busy`] without spawning when the limit is
    /// reached.
    ///
    /// The task itself is responsible for reporting its own outcome; the
    /// limiter only logs the lifecycle.
    pub fn try_spawn<F>(&self, label: &str, task: F) -> Result<(), Busy>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(label, "Generation rejected: all slots busy");
                return Err(Busy);
            }
        };

        let label = label.to_string();
        tokio::spawn(async move {
            tracing::debug!(%label, "Generation task started");
            task.await;
            tracing::debug!(%label, "Generation task finished");
            drop(permit);
        });

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn rejects_when_all_slots_are_taken() {
        let limiter = JobLimiter::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        limiter
            .try_spawn("first", async move {
                let _ = release_rx.await;
            })
            .unwrap();
        assert_eq!(limiter.available(), 0);

        // Second spawn is rejected while the first still holds the slot.
        assert_eq!(limiter.try_spawn("second", async {}), Err(Busy));

        release_tx.send(()).unwrap();
        // Let the first task finish and release its permit.
        tokio::task::yield_now().await;
        for _ in 0..10 {
            if limiter.available() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert!(limiter.try_spawn("third", async {}).is_ok());
    }

    #[tokio::test]
    async fn runs_tasks_up_to_the_limit() {
        let limiter = JobLimiter::new(2);
        let (tx1, rx1) = oneshot::channel::<()>();
        let (tx2, rx2) = oneshot::channel::<()>();

        limiter
            .try_spawn("a", async move {
                let _ = rx1.await;
            })
            .unwrap();
        limiter
            .try_spawn("b", async move {
                let _ = rx2.await;
            })
            .unwrap();

        assert_eq!(limiter.try_spawn("c", async {}), Err(Busy));

        let _ = tx1.send(());
        let _ = tx2.send(());
    }

    #[tokio::test]
    async fn spawned_task_actually_runs() {
        let limiter = JobLimiter::new(1);
        let (done_tx, done_rx) = oneshot::channel();

        limiter
            .try_spawn("job", async move {
                let _ = done_tx.send(42);
            })
            .unwrap();

        assert_eq!(done_rx.await.unwrap(), 42);
    }
}
