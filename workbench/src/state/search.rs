use std::{
    future::Future,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use ts_rs::TS;

use crate::model::Annotation;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Default, Clone, Debug, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct SearchState {
    pub term: String,
    pub results: Vec<Annotation>,
}

/// Coalesces bursts of calls: each call restarts the delay and only the
/// last one runs. Work that already started is never cancelled.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn pending_guard(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn call<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending_guard().replace(token.clone()) {
            previous.cancel();
            trace!("debounced call superseded");
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => work.await,
            }
        });
    }

    /// Drops the pending call, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.pending_guard().take() {
            token.cancel();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_after_quiet_period() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for term in ["c", "co", "con"] {
            let fired = fired.clone();
            debouncer.call(async move {
                fired.lock().unwrap().push(term);
            });
            tokio::time::advance(Duration::from_millis(300)).await;
        }
        settle().await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_millis(1500)).await;
        settle().await;
        assert_eq!(*fired.lock().unwrap(), vec!["con"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        debouncer.call(async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
