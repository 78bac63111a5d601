//! Parallel dispatch of per-entity work.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Runs one task per id and folds each outcome as it completes.
///
/// Tasks share nothing mutable: each returns its own output through the
/// join set, and only the fold callback touches the accumulator. The fold
/// runs on the calling task, one outcome at a time, in completion order.
///
/// With a `max_concurrency` bound, at most that many tasks do work at once;
/// without one every task starts immediately.
#[derive(Clone, Debug, Default)]
pub struct FanOut {
    limiter: Option<Arc<Semaphore>>,
}

impl FanOut {
    pub fn new(max_concurrency: Option<NonZeroUsize>) -> Self {
        FanOut {
            limiter: max_concurrency.map(|limit| Arc::new(Semaphore::new(limit.get()))),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Spawns `task(id)` for every id, waits for all of them and passes each
    /// outcome to `fold`. A task that panicked is reported as `Err` against
    /// the id it was spawned for.
    pub async fn run<I, T, F, Fut, G>(&self, ids: I, task: F, mut fold: G)
    where
        I: IntoIterator<Item = i64>,
        F: Fn(i64) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        G: FnMut(i64, Result<T, JoinError>),
    {
        let mut join_set = JoinSet::new();
        let mut task_ids = HashMap::new();

        for id in ids {
            let limiter = self.limiter.clone();
            let work = task(id);

            let abort_handle = join_set.spawn(async move {
                // The semaphore is never closed, so acquiring only waits.
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                (id, work.await)
            });

            task_ids.insert(abort_handle.id(), id);
        }

        while let Some(join_result) = join_set.join_next_with_id().await {
            match join_result {
                Ok((task_id, (id, output))) => {
                    task_ids.remove(&task_id);
                    fold(id, Ok(output));
                }
                Err(e) => match task_ids.remove(&e.id()) {
                    Some(id) => {
                        tracing::error!(id, "Task failed: {e}");
                        fold(id, Err(e));
                    }
                    None => tracing::error!("Task failed with no tracked id: {e}"),
                },
            }
        }

        tracing::debug!("All tasks completed");
    }
}
