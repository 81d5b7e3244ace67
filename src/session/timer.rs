//! Cancellable one-shot refresh timer

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A pending deferred refresh.
///
/// Dropping or cancelling the timer aborts the sleeping task, so replacing
/// the stored timer is enough to keep at most one pending.
#[derive(Debug)]
pub struct RefreshTimer {
    handle: JoinHandle<()>,
    due_at: i64,
}

impl RefreshTimer {
    /// Run `fire` after `delay`.
    ///
    /// `fire` runs on the timer task itself; it must hand long-running work
    /// off to its own task since the timer may be aborted by whatever it
    /// triggers.
    pub fn arm<F>(delay: Duration, due_at: i64, fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire.await;
        });

        Self { handle, due_at }
    }

    /// Unix time the timer fires at
    pub const fn due_at(&self) -> i64 {
        self.due_at
    }

    /// Whether the timer has not fired yet
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel without firing
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
