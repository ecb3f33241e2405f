//! Token threaded through cancellable pipelines.

use crate::errors::Cancelled;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

/// Callback run once when a token is cancelled.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    callbacks: Mutex<Vec<CancelCallback>>,
    notify: Notify,
}

/// Shared cancellation flag with a reason.
///
/// Cloning a token yields a handle to the same state, so a token handed to
/// a compiled pipeline can be cancelled from anywhere. Cancellation is
/// idempotent and only the first reason is kept.
///
/// Nothing in the framework aborts a pipeline between steps: each step
/// decides whether to observe the token and how to stop.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled with `reason`.
    ///
    /// Callbacks run immediately on the calling thread and are then
    /// dropped. A panicking callback is logged and does not stop the rest.
    pub fn cancel(&self, reason: impl Into<String>) {
        // Readers that see the flag block on this lock until the reason is in.
        let mut slot = self.state.reason.write();
        if self
            .state
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        *slot = Some(reason.into());
        drop(slot);

        let callbacks = std::mem::take(&mut *self.state.callbacks.lock());
        for callback in &callbacks {
            run_callback(callback);
        }

        self.state.notify.notify_waiters();
    }

    /// Runs `callback` on cancellation, or right away if already cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut callbacks = self.state.callbacks.lock();
        if self.is_cancelled() {
            drop(callbacks);
            run_callback(&callback);
        } else {
            callbacks.push(Box::new(callback));
        }
    }

    /// Returns true once the token is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the first recorded reason.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.reason.read().clone()
    }

    /// Returns `Err(Cancelled)` once cancellation has been requested.
    ///
    /// Lets step bodies whose outcome is a `Result` stop with `?`.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled::new(self.reason().unwrap_or_default()))
        } else {
            Ok(())
        }
    }

    /// Waits until cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

fn run_callback(callback: &(dyn Fn() + Send + Sync)) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!(panic = ?e, "Cancel callback panicked");
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_callback(token: &CancellationToken) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        token.on_cancel(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn test_fresh_token_passes_check() {
        let fresh = CancellationToken::new();
        assert!(!fresh.is_cancelled());
        assert_eq!(fresh.reason(), None);
        assert_eq!(fresh.check(), Ok(()));
    }

    #[test]
    fn test_first_reason_is_kept() {
        let shared = CancellationToken::new();
        let handed_to_step = shared.clone();

        handed_to_step.cancel("deadline");
        shared.cancel("shutdown");

        assert!(shared.is_cancelled());
        assert_eq!(shared.reason().as_deref(), Some("deadline"));
        assert_eq!(shared.check(), Err(Cancelled::new("deadline")));
    }

    #[test]
    fn test_check_stops_a_step_with_question_mark() {
        fn step(token: &CancellationToken, x: i32) -> Result<i32, Cancelled> {
            token.check()?;
            Ok(x + 1)
        }

        let stop = CancellationToken::new();
        assert_eq!(step(&stop, 1), Ok(2));
        stop.cancel("stop");
        assert!(step(&stop, 1).is_err());
    }

    #[test]
    fn test_callbacks_fire_once() {
        let stop = CancellationToken::new();
        let calls = counting_callback(&stop);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        stop.cancel("one");
        stop.cancel("two");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let late = counting_callback(&stop);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_callback_does_not_block_others() {
        let stop = CancellationToken::new();
        stop.on_cancel(|| panic!("callback failure"));
        let calls = counting_callback(&stop);

        stop.cancel("stop");
        assert!(stop.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let stop = CancellationToken::new();
        let waiter = stop.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.reason()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.cancel("stop");

        let reason = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
        assert_eq!(reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_cancelled() {
        let stop = CancellationToken::new();
        stop.cancel("done");
        stop.cancelled().await;
    }
}
