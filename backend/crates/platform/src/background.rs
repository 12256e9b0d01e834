//! Background Tasks
//!
//! Fire-and-forget work that must still finish before the process exits,
//! such as writing a response into the cache after it has been returned.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;

/// Tracks spawned background tasks so shutdown can wait for them
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` without awaiting it
    ///
    /// Finished tasks are reaped on each call so the set stays small.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
        tasks.spawn(future);
        tracing::trace!(task = name, pending = tasks.len(), "Spawned background task");
    }

    /// Number of tasks not yet reaped
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every outstanding task, including ones spawned while draining
    pub async fn drain(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            while let Some(result) = batch.join_next().await {
                log_join_result(result);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Background task failed");
    }
}
