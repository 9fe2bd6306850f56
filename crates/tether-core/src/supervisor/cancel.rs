use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Cooperative cancellation signal for one supervisor run.
///
/// `stop()` cancels it; main loops and auxiliary workers poll
/// [`is_cancelled`](Self::is_cancelled) or block in
/// [`wait_timeout`](Self::wait_timeout) between units of work. Clones share
/// the same signal. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<State>,
}

#[derive(Debug, Default)]
struct State {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.state.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.state.cond.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.cancelled.lock()
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let mut cancelled = self.state.cancelled.lock();
        while !*cancelled {
            self.state.cond.wait(&mut cancelled);
        }
    }

    /// Block until cancelled or `timeout` elapses. Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.state.cancelled.lock();
        while !*cancelled {
            if self.state.cond.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}
