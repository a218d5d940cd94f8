//! Focus-scoped refresh for list screens.
//!
//! A [`FocusScope`] owns at most one in-flight fetch. Refocusing, blurring
//! or dropping the scope cancels it, and a cancelled fetch can never
//! publish: every result is tagged with the generation that started it and
//! is only applied while that generation is still current.

use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle of the scoped data.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshStatus<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

/// Published state of a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh<T> {
    pub generation: u64,
    pub status: RefreshStatus<T>,
}

pub struct FocusScope<T> {
    state: Arc<watch::Sender<Refresh<T>>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<T> Default for FocusScope<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FocusScope<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (state, _) = watch::channel(Refresh {
            generation: 0,
            status: RefreshStatus::Idle,
        });
        Self {
            state: Arc::new(state),
            in_flight: None,
        }
    }

    /// Receiver for the screen to render from.
    pub fn watch(&self) -> watch::Receiver<Refresh<T>> {
        self.state.subscribe()
    }

    /// Current status (cloned).
    pub fn status(&self) -> RefreshStatus<T>
    where
        T: Clone,
    {
        self.state.borrow().status.clone()
    }

    /// Screen gained focus: cancel any in-flight fetch and start `fetch`.
    pub fn focus<F>(&mut self, fetch: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        self.cancel_in_flight();

        let mut generation = 0;
        self.state.send_modify(|r| {
            r.generation += 1;
            r.status = RefreshStatus::Loading;
            generation = r.generation;
        });

        let state = self.state.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let status = match fetch.await {
                Ok(value) => RefreshStatus::Loaded(value),
                Err(e) => {
                    tracing::warn!(error = %e, generation, "Scoped refresh failed");
                    RefreshStatus::Failed(e.to_string())
                }
            };
            // Checked under the channel lock, so a concurrent blur wins.
            let published = state.send_if_modified(|r| {
                if r.generation != generation {
                    return false;
                }
                r.status = status;
                true
            });
            if !published {
                tracing::debug!(generation, "Discarding stale refresh result");
            }
        }));
    }

    /// Screen lost focus: cancel the in-flight fetch, keep the last result.
    pub fn blur(&mut self) {
        if self.cancel_in_flight() {
            tracing::debug!("Cancelled in-flight refresh on blur");
        }
        self.state.send_modify(|r| {
            r.generation += 1;
            if matches!(r.status, RefreshStatus::Loading) {
                r.status = RefreshStatus::Idle;
            }
        });
    }

    fn cancel_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }
}

impl<T> Drop for FocusScope<T> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
