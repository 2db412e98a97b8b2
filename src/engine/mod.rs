/*!
 * Storage Engine Boundary
 *
 * The engine side of unlock notification:
 * - `NotifyEngine`: arm / cancel a one-shot unlock callback
 * - `dispatch_unlock`: the fixed-signature callback the engine invokes
 * - `SqliteHandle`: `NotifyEngine` over a raw `sqlite3*`
 */

mod dispatcher;
mod sqlite;

pub use dispatcher::{dispatch_unlock, UnlockCallback};
pub use sqlite::SqliteHandle;

use std::ffi::c_void;
use std::os::raw::c_int;

/// Registration facility of a storage engine
///
/// # Contract
///
/// - A successful `register` arms at most one pending callback per engine
///   handle; arming again replaces the previous registration.
/// - The callback receives the payload exactly once, possibly batched with
///   payloads of other handles, possibly on another thread, possibly before
///   `register` returns (the lock was already clear).
/// - After `cancel` returns, a cancelled registration's callback neither runs
///   nor is still running.
pub trait NotifyEngine {
    /// Arm a one-shot unlock notification carrying `payload`
    ///
    /// Returns the engine's result code; anything but `SQLITE_OK` means the
    /// callback was not armed and will not run.
    ///
    /// # Safety
    ///
    /// `payload` must stay valid until `callback` has run with it or the
    /// registration has been cancelled.
    unsafe fn register(&self, callback: UnlockCallback, payload: *mut c_void) -> c_int;

    /// Withdraw any outstanding registration
    fn cancel(&self);
}

impl<E: NotifyEngine + ?Sized> NotifyEngine for &E {
    #[inline]
    unsafe fn register(&self, callback: UnlockCallback, payload: *mut c_void) -> c_int {
        (**self).register(callback, payload)
    }

    #[inline]
    fn cancel(&self) {
        (**self).cancel()
    }
}
