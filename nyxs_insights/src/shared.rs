//! Serialized access to one model from async code
//!
//! Each model sits behind its own async mutex. A call waits for the lock
//! without blocking the runtime, then runs the numeric work on the blocking
//! thread pool while holding it. Calls against one model therefore run one
//! at a time; calls against different models run concurrently.

use crate::error::{InsightsError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A model owned by the orchestrator and shared across its calls
pub struct SharedModel<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for SharedModel<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Send + 'static> SharedModel<M> {
    pub fn new(model: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    /// Run `f` with exclusive access to the model on the blocking pool.
    ///
    /// The lock is held until `f` returns, even if the caller stops
    /// awaiting the returned future.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut M) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = Arc::clone(&self.inner).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *guard))
            .await
            .map_err(|err| InsightsError::TaskFailed(err.to_string()))
    }

    /// Read from the model without leaving the async context; for cheap accessors only
    pub async fn inspect<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&M) -> T,
    {
        let guard = self.inner.lock().await;
        f(&*guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_mutates_model() {
        let shared = SharedModel::new(Vec::<u32>::new());

        shared.run(|v| v.push(1)).await.unwrap();
        shared.run(|v| v.push(2)).await.unwrap();

        assert_eq!(shared.inspect(|v| v.clone()).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_panicking_call_surfaces_as_task_failure() {
        let shared = SharedModel::new(0u32);

        let result = shared.run(|_| -> u32 { panic!("boom") }).await;
        assert!(matches!(result, Err(InsightsError::TaskFailed(_))));
    }
}
