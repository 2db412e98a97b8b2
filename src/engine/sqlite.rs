/*!
 * SQLite Unlock-Notify Registration
 *
 * `sqlite3_unlock_notify` needs the library built with
 * SQLITE_ENABLE_UNLOCK_NOTIFY (the `unlock_notify` feature of libsqlite3-sys).
 */

use super::{NotifyEngine, UnlockCallback};
use libsqlite3_sys as ffi;
use std::ffi::c_void;
use std::os::raw::c_int;

/// Borrowed raw database handle
///
/// Does not own or close the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteHandle {
    db: *mut ffi::sqlite3,
}

impl SqliteHandle {
    /// Wrap a raw handle
    ///
    /// # Safety
    ///
    /// `db` must be a non-null open connection that outlives every use of
    /// the returned handle.
    pub unsafe fn from_raw(db: *mut ffi::sqlite3) -> Self {
        debug_assert!(!db.is_null());
        Self { db }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut ffi::sqlite3 {
        self.db
    }
}

impl NotifyEngine for SqliteHandle {
    unsafe fn register(&self, callback: UnlockCallback, payload: *mut c_void) -> c_int {
        // If the blocking connection has already finished, SQLite invokes the
        // callback before returning. A deadlock is reported as SQLITE_LOCKED
        // with nothing armed.
        ffi::sqlite3_unlock_notify(self.db, Some(callback), payload)
    }

    fn cancel(&self) {
        // A NULL callback drops the pending registration. SQLite serializes
        // this against dispatch, so no callback is in flight afterwards.
        unsafe {
            ffi::sqlite3_unlock_notify(self.db, None, std::ptr::null_mut());
        }
    }
}
