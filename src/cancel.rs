//! Cooperative cancellation and pausing for long-running walks and searches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
struct State {
    cancelled: AtomicBool,
    paused: Mutex<bool>,
    resumed: Condvar,
}

/// Shared flag polled by workers between units of work.
///
/// Clones share state. Cancelling also releases anyone blocked in
/// [`wait_while_paused`](Self::wait_while_paused).
///
/// ```rust
/// use devpath::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker = token.clone();
/// token.cancel();
/// assert!(worker.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<State>,
}

impl CancellationToken {
    /// A fresh, running token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.state.paused.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.resumed.notify_all();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Pause or resume workers.
    pub fn set_paused(&self, paused: bool) {
        let mut guard = self.state.paused.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = paused;
        if !paused {
            self.state.resumed.notify_all();
        }
    }

    /// Returns `true` while paused.
    pub fn is_paused(&self) -> bool {
        *self.state.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while paused. Returns `false` if the token was cancelled.
    pub fn wait_while_paused(&self) -> bool {
        let guard = self.state.paused.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .state
            .resumed
            .wait_while(guard, |paused| *paused && !self.is_cancelled())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn running_token_does_not_block() {
        assert!(CancellationToken::new().wait_while_paused());
    }

    #[test]
    fn resume_releases_waiter() {
        let token = CancellationToken::new();
        token.set_paused(true);
        let waiter = token.clone();
        let handle = std::thread::spawn(move || waiter.wait_while_paused());
        std::thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());
        token.set_paused(false);
        assert!(handle.join().unwrap());
    }

    #[test]
    fn cancel_releases_paused_waiter() {
        let token = CancellationToken::new();
        token.set_paused(true);
        let waiter = token.clone();
        let handle = std::thread::spawn(move || waiter.wait_while_paused());
        token.cancel();
        assert!(!handle.join().unwrap());
    }
}
