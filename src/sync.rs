//! Re-armable completion objects
//!
//! A [`Completion`] is a one-shot rendezvous point: one side calls
//! [`Completion::complete`], the other blocks in [`Completion::wait_timeout`]
//! with a bound. A successful wait does NOT consume the completion; the
//! waiter must call [`Completion::reinit`] before the next cycle.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Reason a bounded wait returned without the completion being signalled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The bound expired
    Timeout,
    /// [`Completion::interrupt`] was called while waiting
    Interrupted,
}

#[derive(Debug, Default)]
struct CompletionState {
    done: u32,
    interrupted: bool,
}

/// One-shot signal with explicit re-arm
#[derive(Debug, Default)]
pub struct Completion {
    state: Mutex<CompletionState>,
    cond: Condvar,
}

impl Completion {
    /// Create an unsignalled completion
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the completion and wake every waiter
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.done = state.done.saturating_add(1);
        self.cond.notify_all();
    }

    /// Wake every waiter with [`WaitError::Interrupted`]
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupted = true;
        self.cond.notify_all();
    }

    /// Re-arm after a consumed signal
    pub fn reinit(&self) {
        let mut state = self.state.lock();
        state.done = 0;
        state.interrupted = false;
    }

    /// Whether the completion is currently signalled
    pub fn is_done(&self) -> bool {
        self.state.lock().done > 0
    }

    /// Block until signalled, interrupted, or `timeout` elapses.
    ///
    /// Returns the time left on success, like the kernel's
    /// interruptible timeout wait.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Duration, WaitError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.done > 0 {
                return Ok(deadline.saturating_duration_since(Instant::now()));
            }
            if state.interrupted {
                state.interrupted = false;
                return Err(WaitError::Interrupted);
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                if state.done > 0 {
                    return Ok(Duration::ZERO);
                }
                return Err(WaitError::Timeout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_after_complete_returns_immediately() {
        let c = Completion::new();
        c.complete();
        assert!(c.wait_timeout(Duration::from_millis(1)).is_ok());
        // not consumed by the wait
        assert!(c.is_done());
        c.reinit();
        assert!(!c.is_done());
    }

    #[test]
    fn test_wait_times_out() {
        let c = Completion::new();
        assert_eq!(c.wait_timeout(Duration::from_millis(5)), Err(WaitError::Timeout));
    }

    #[test]
    fn test_cross_thread_complete() {
        let c = Arc::new(Completion::new());
        let signaller = Arc::clone(&c);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            signaller.complete();
        });
        assert!(c.wait_timeout(Duration::from_secs(2)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_interrupt() {
        let c = Arc::new(Completion::new());
        let other = Arc::clone(&c);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            other.interrupt();
        });
        assert_eq!(c.wait_timeout(Duration::from_secs(2)), Err(WaitError::Interrupted));
        handle.join().unwrap();
    }
}
