/*!
 * Retry Loop Integration Tests
 *
 * Drives the loop against a scripted engine that fires from its own thread
 */

use libsqlite3_sys as ffi;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sqlite_unlock_notify::{
    run_until_unlocked, ErrorCode, NotifyConfig, NotifyEngine, NotifyError, RetryLoop,
    UnlockCallback, WaitToken,
};
use std::ffi::c_void;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Engine that fires registrations from a background thread after `delay`
///
/// Dispatch happens under the slot lock, so a cancel either removes the
/// payload first or waits for the dispatch to finish.
struct ThreadedEngine {
    slot: Arc<Mutex<Option<(UnlockCallback, usize)>>>,
    delay: Option<Duration>,
    registrations: AtomicU32,
    cancels: AtomicU32,
    result: c_int,
}

impl ThreadedEngine {
    fn firing_after(delay: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            delay: Some(delay),
            registrations: AtomicU32::new(0),
            cancels: AtomicU32::new(0),
            result: ffi::SQLITE_OK,
        }
    }

    fn never_firing() -> Self {
        Self {
            delay: None,
            ..Self::firing_after(Duration::ZERO)
        }
    }

    fn failing(result: c_int) -> Self {
        Self {
            result,
            ..Self::never_firing()
        }
    }
}

impl NotifyEngine for ThreadedEngine {
    unsafe fn register(&self, callback: UnlockCallback, payload: *mut c_void) -> c_int {
        if self.result != ffi::SQLITE_OK {
            return self.result;
        }
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock() = Some((callback, payload as usize));

        if let Some(delay) = self.delay {
            let slot = self.slot.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                let mut slot = slot.lock();
                if let Some((callback, payload)) = slot.take() {
                    let mut args = [payload as *mut c_void];
                    unsafe { callback(args.as_mut_ptr(), 1) };
                }
            });
        }
        ffi::SQLITE_OK
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.slot.lock().take();
    }
}

fn busy() -> ErrorCode {
    ErrorCode::new(ffi::SQLITE_LOCKED_SHAREDCACHE)
}

#[test]
fn test_retry_until_success() {
    let engine = ThreadedEngine::firing_after(Duration::from_millis(10));
    let mut remaining = 3;
    let mut attempts = 0;

    let (result, stats) = RetryLoop::new(&engine).run_with_stats(|| {
        attempts += 1;
        if remaining > 0 {
            remaining -= 1;
            Err(busy())
        } else {
            Ok(attempts)
        }
    });

    assert_eq!(result.unwrap(), 4);
    assert_eq!(stats.attempts, 4);
    assert_eq!(stats.wait_cycles, 3);
    assert_eq!(stats.immediate_unlocks, 0);
    assert!(stats.waited >= Duration::from_millis(30));
    assert_eq!(engine.registrations.load(Ordering::SeqCst), 3);
    assert_eq!(engine.cancels.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_lock_error_no_wait() {
    let engine = ThreadedEngine::firing_after(Duration::from_millis(10));
    let mut attempts = 0;

    let result = run_until_unlocked(&engine, || -> Result<(), ErrorCode> {
        attempts += 1;
        Err(ErrorCode::new(ffi::SQLITE_IOERR))
    });

    assert_eq!(
        result.unwrap_err().into_operation(),
        Some(ErrorCode::new(ffi::SQLITE_IOERR))
    );
    assert_eq!(attempts, 1);
    assert_eq!(engine.registrations.load(Ordering::SeqCst), 0);
}

#[test]
fn test_registration_failure_surfaces() {
    let engine = ThreadedEngine::failing(ffi::SQLITE_LOCKED);

    let result = run_until_unlocked(&engine, || -> Result<(), ErrorCode> { Err(busy()) });

    assert_eq!(result.unwrap_err().notify(), Some(&NotifyError::Deadlock));
}

#[test]
fn test_timeout_is_distinct_and_cancels() {
    let engine = ThreadedEngine::never_firing();
    let token = WaitToken::allocate();
    let config = NotifyConfig::bounded(Duration::from_millis(30));

    let retry = RetryLoop::with_token(&engine, token.clone()).with_config(config);
    let (result, stats) = retry.run_with_stats(|| -> Result<(), ErrorCode> { Err(busy()) });

    let err = result.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.operation().is_none());
    assert_eq!(stats.attempts, 1);
    assert_eq!(engine.cancels.load(Ordering::SeqCst), 1);
    assert!(engine.slot.lock().is_none());
    // The engine's reference was reclaimed on cancel
    assert_eq!(Arc::strong_count(&token), 2);
}

#[test]
fn test_bounded_wait_succeeds_when_fired_in_time() {
    let engine = ThreadedEngine::firing_after(Duration::from_millis(10));
    let config = NotifyConfig::bounded(Duration::from_secs(2));
    let mut first = true;

    let result = RetryLoop::new(&engine).with_config(config).run(|| {
        if std::mem::take(&mut first) {
            Err(busy())
        } else {
            Ok(())
        }
    });

    assert!(result.is_ok());
    assert_eq!(engine.cancels.load(Ordering::SeqCst), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_k_conflicts_take_k_plus_one_attempts(k in 0u32..6) {
        let engine = ThreadedEngine::firing_after(Duration::from_millis(1));
        let mut remaining = k;

        let (result, stats) = RetryLoop::new(&engine).run_with_stats(|| {
            if remaining > 0 {
                remaining -= 1;
                Err(busy())
            } else {
                Ok(())
            }
        });

        prop_assert!(result.is_ok());
        prop_assert_eq!(stats.attempts, k + 1);
        prop_assert_eq!(stats.wait_cycles, k);
    }
}
