//! Fixed-interval refresh tasks.
//!
//! A [`Poller`] runs a refresh closure on a `tokio::time::interval` until it
//! is stopped or dropped. The first refresh happens immediately. Refreshes
//! are not coordinated with the live channel: whichever source writes last
//! wins.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::ViewError;

/// How often sensor history is refetched.
pub const HISTORY_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How often the latest-per-bin snapshot is refetched.
pub const LATEST_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Handle to a running refresh loop.
///
/// Failed refreshes are published as the current error (the banner) and
/// the loop keeps going; the next successful refresh clears it. An expired
/// session stops the loop, since retrying cannot succeed.
pub struct Poller {
    name: &'static str,
    cancel: CancellationToken,
    errors: watch::Receiver<Option<ViewError>>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<F, Fut>(name: &'static str, every: Duration, mut refresh: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ViewError>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (tx, errors) = watch::channel(None);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::info!(poller = name, interval_ms = every.as_millis() as u64, "Poller started");
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!(poller = name, "Poller stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        match refresh().await {
                            Ok(()) => {
                                tx.send_if_modified(|current| current.take().is_some());
                            }
                            Err(ViewError::SessionExpired) => {
                                tracing::warn!(poller = name, "Session expired; poller stopping");
                                tx.send_replace(Some(ViewError::SessionExpired));
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(poller = name, error = %e, "Refresh failed");
                                tx.send_replace(Some(e));
                            }
                        }
                    }
                }
            }
        });

        Self {
            name,
            cancel,
            errors,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The error from the most recent refresh, if it failed.
    pub fn last_error(&self) -> Option<ViewError> {
        self.errors.borrow().clone()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<ViewError>> {
        self.errors.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the loop to stop. An in-flight refresh runs to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(poller = self.name, error = %e, "Poller task panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    const TICK: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn refreshes_immediately_and_repeatedly() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let poller = Poller::spawn("test", TICK, move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        tokio::time::sleep(TICK * 4).await;
        poller.shutdown().await;

        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several refreshes, got {seen}");

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn failure_sets_banner_and_success_clears_it() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let poller = Poller::spawn("flaky", TICK, move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ViewError::Fetch("Failed to load bins".into()))
                } else {
                    Ok(())
                }
            }
        });

        let mut errors = poller.watch_errors();
        errors.changed().await.unwrap();
        assert_eq!(
            *errors.borrow_and_update(),
            Some(ViewError::Fetch("Failed to load bins".into()))
        );
        errors.changed().await.unwrap();
        assert_eq!(*errors.borrow(), None);
        assert!(poller.is_running());
    }

    #[tokio::test]
    async fn expired_session_stops_the_loop() {
        let poller = Poller::spawn("guarded", TICK, || async { Err(ViewError::SessionExpired) });

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(poller.last_error(), Some(ViewError::SessionExpired));
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let poller = Poller::spawn("dropped", TICK, move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });
        tokio::time::sleep(TICK).await;
        drop(poller);

        tokio::time::sleep(TICK * 2).await;
        let settled = count.load(Ordering::SeqCst);
        tokio::time::sleep(TICK * 3).await;
        assert_eq!(count.load(Ordering::SeqCst), settled);
    }
}
