//! Trailing-edge debouncer keyed by request signature.
//!
//! Scheduling a task for a key that already has a pending timer cancels that
//! timer; the caller waiting on it gets [`AssistError::Superseded`]. Only the
//! last task scheduled inside the idle window runs. Once a task has started
//! it is never cancelled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{AssistError, Result};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

struct Pending {
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    next_generation: u64,
    pending: HashMap<String, Pending>,
}

pub struct Debouncer<T> {
    state: Arc<Mutex<State>>,
    delay: Duration,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for Debouncer<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl<T> Debouncer<T>
where
    T: Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            delay,
            _marker: std::marker::PhantomData,
        }
    }

    /// Keys with a timer that has not fired yet
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Run `task` after the idle delay unless another call for `key` replaces it first.
    pub async fn schedule<F>(&self, key: impl Into<String>, task: F) -> Result<T>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T>> + Send + 'static,
    {
        let key = key.into();
        let (tx, rx) = oneshot::channel();

        {
            // The timer claims its slot under this lock, so it cannot observe
            // the map before its own entry is inserted.
            let mut state = lock(&self.state);
            state.next_generation += 1;
            let generation = state.next_generation;

            let shared = Arc::clone(&self.state);
            let delay = self.delay;
            let timer_key = key.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                {
                    let mut state = lock(&shared);
                    let current = state.pending.get(&timer_key).map(|p| p.generation);
                    if current != Some(generation) {
                        return;
                    }
                    state.pending.remove(&timer_key);
                }
                debug!(key = %timer_key, generation, "Debounce window elapsed, executing");
                let outcome = task().await;
                let _ = tx.send(outcome);
            });

            if let Some(previous) = state.pending.insert(key.clone(), Pending { generation, timer }) {
                debug!(key = %key, superseded = previous.generation, "Superseding pending call");
                previous.timer.abort();
            }
        }

        // A dropped sender means the timer was aborted before it ran.
        rx.await.unwrap_or(Err(AssistError::Superseded))
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        for (_, pending) in lock(&self.state).pending.drain() {
            pending.timer.abort();
        }
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
