/*!
 * Wait Token
 *
 * One-shot wake flag guarded by a parking_lot mutex and condvar.
 *
 * # Design
 *
 * The flag is only read and written under the token's own mutex, and the
 * waiter tests it before sleeping. A `fire()` that lands before `wait()`
 * starts therefore leaves the flag set and the wait returns at once.
 *
 * Tokens cross the engine boundary as `Arc` payloads: the engine holds one
 * strong reference between registration and dispatch, the waiting thread
 * holds another.
 */

use parking_lot::{Condvar, Mutex};
use std::ffi::c_void;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The token was fired
    Fired,
    /// The deadline passed without a fire
    TimedOut,
}

impl WaitOutcome {
    #[inline(always)]
    pub fn is_fired(&self) -> bool {
        matches!(self, WaitOutcome::Fired)
    }
}

/// Single-waiter wake token
#[derive(Debug, Default)]
pub struct WaitToken {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl WaitToken {
    pub fn new() -> Self {
        Self {
            fired: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Allocate a shareable token with the flag cleared
    pub fn allocate() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Clear the flag for a new wait cycle
    #[inline]
    pub fn reset(&self) {
        *self.fired.lock() = false;
    }

    /// Set the flag and wake the waiter, if any
    ///
    /// Safe to call from any thread, before or during `wait()`.
    #[inline]
    pub fn fire(&self) {
        let mut fired = self.fired.lock();
        *fired = true;
        self.cond.notify_one();
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        *self.fired.lock()
    }

    /// Block until fired
    pub fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.cond.wait(&mut fired);
        }
    }

    /// Block until fired or until `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now().checked_add(timeout);
        let mut fired = self.fired.lock();

        while !*fired {
            let Some(deadline) = deadline else {
                // Timeout too large to represent: same as forever
                self.cond.wait(&mut fired);
                continue;
            };
            if self.cond.wait_until(&mut fired, deadline).timed_out() {
                break;
            }
        }

        if *fired {
            WaitOutcome::Fired
        } else {
            WaitOutcome::TimedOut
        }
    }

    /// Wait with an optional bound
    #[inline]
    pub fn wait_for(&self, timeout: Option<Duration>) -> WaitOutcome {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => {
                self.wait();
                WaitOutcome::Fired
            }
        }
    }

    /// Hand one strong reference to the engine as an opaque payload
    ///
    /// Must be balanced by exactly one `from_payload` (dispatch or reclaim),
    /// otherwise the token leaks.
    #[inline]
    pub fn into_payload(token: Arc<Self>) -> *mut c_void {
        Arc::into_raw(token) as *mut c_void
    }

    /// Take back a reference produced by `into_payload`
    ///
    /// # Safety
    ///
    /// `payload` must come from `into_payload` and must not have been
    /// converted back already.
    #[inline]
    pub unsafe fn from_payload(payload: *mut c_void) -> Arc<Self> {
        Arc::from_raw(payload as *const Self)
    }
}
