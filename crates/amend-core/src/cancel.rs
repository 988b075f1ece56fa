//! Run cancellation
//!
//! A [`CancelHandle`] owns the sending side of a watch channel; any number
//! of [`CancelSignal`]s observe it. Dropping the handle without cancelling
//! leaves its signals un-cancelled forever.

use tokio::sync::watch;

/// Trigger for cancelling runs
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Create an un-cancelled handle
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Signal observing this handle
    #[must_use]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Cancel every run holding a signal from this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`cancel`](Self::cancel) was called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a [`CancelHandle`]
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires
    #[must_use]
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        let Some(rx) = self.rx.as_ref() else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn signal_reflects_handle() {
        let handle = CancelHandle::new();
        let signal = handle.signal();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_waiter() {
        let handle = CancelHandle::new();
        let signal = handle.signal();
        let waiter = tokio::spawn(async move { signal.cancelled().await });
        tokio::task::yield_now().await;
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn never_stays_pending() {
        let signal = CancelSignal::never();
        assert!(!signal.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let signal = CancelHandle::new().signal();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }
}
