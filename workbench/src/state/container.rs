use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, bail};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    #[default]
    Created,
    Initialized,
    TornDown,
}

/// Shared, subscribable state with an explicit lifecycle.
///
/// Reads are allowed at any point. Updates are only accepted between
/// [`initialize`](Self::initialize) and [`teardown`](Self::teardown); teardown
/// resets the value to `T::default()` and wakes subscribers.
pub struct StateContainer<T> {
    tx: watch::Sender<T>,
    status: Mutex<ContainerStatus>,
}

impl<T> StateContainer<T>
where
    T: Default + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(T::default());
        Self {
            tx,
            status: Mutex::new(ContainerStatus::Created),
        }
    }

    fn status_guard(&self) -> MutexGuard<'_, ContainerStatus> {
        match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn status(&self) -> ContainerStatus {
        *self.status_guard()
    }

    pub fn initialize(&self, initial: T) {
        let mut status = self.status_guard();
        self.tx.send_replace(initial);
        *status = ContainerStatus::Initialized;
        debug!("state container initialized");
    }

    pub fn teardown(&self) {
        let mut status = self.status_guard();
        self.tx.send_replace(T::default());
        *status = ContainerStatus::TornDown;
        debug!("state container torn down");
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn snapshot(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Mutates the value in place and notifies subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let status = self.status_guard();
        if *status != ContainerStatus::Initialized {
            bail!("state container is not initialized ({:?})", *status);
        }

        let mut out = None;
        self.tx.send_modify(|value| out = Some(f(value)));
        drop(status);

        match out {
            Some(out) => Ok(out),
            None => bail!("state update did not run"),
        }
    }
}

impl<T> Default for StateContainer<T>
where
    T: Default + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_requires_initialize() {
        let container: StateContainer<Vec<u32>> = StateContainer::new();
        assert!(container.update(|v| v.push(1)).is_err());

        container.initialize(vec![7]);
        container.update(|v| v.push(1)).unwrap();
        assert_eq!(container.snapshot(), vec![7, 1]);
    }

    #[test]
    fn teardown_resets_and_blocks_updates() {
        let container: StateContainer<Vec<u32>> = StateContainer::new();
        container.initialize(vec![1, 2]);
        container.teardown();

        assert_eq!(container.status(), ContainerStatus::TornDown);
        assert!(container.snapshot().is_empty());
        assert!(container.update(|v| v.push(3)).is_err());

        container.initialize(Vec::new());
        assert!(container.update(|v| v.push(3)).is_ok());
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let container: StateContainer<u32> = StateContainer::new();
        container.initialize(0);
        let mut rx = container.subscribe();

        container.update(|v| *v = 42).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 42);

        let doubled = container.update(|v| {
            *v *= 2;
            *v
        });
        assert_eq!(doubled.unwrap(), 84);
        assert_eq!(container.read(|v| *v), 84);
    }
}
