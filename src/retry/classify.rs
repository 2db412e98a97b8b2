/*!
 * Lock Classification
 *
 * Decides which failures the retry loop may absorb. Only a lock held by
 * another connection of the same shared cache qualifies; a plain
 * SQLITE_LOCKED can mean the waiter itself holds what it waits for, and
 * waiting there deadlocks.
 */

use crate::core::errors::{ErrorCode, NotifyError, RetryError};
use libsqlite3_sys as ffi;

/// Errors that may report a shared-cache lock conflict
pub trait Contended {
    /// True when the operation should wait for an unlock and be retried
    fn is_contended(&self) -> bool;
}

impl Contended for ErrorCode {
    #[inline]
    fn is_contended(&self) -> bool {
        self.is_locked_sharedcache()
    }
}

impl Contended for rusqlite::Error {
    fn is_contended(&self) -> bool {
        match self {
            rusqlite::Error::SqliteFailure(err, _) => {
                err.extended_code == ffi::SQLITE_LOCKED_SHAREDCACHE
            }
            _ => false,
        }
    }
}

impl Contended for NotifyError {
    #[inline]
    fn is_contended(&self) -> bool {
        false
    }
}

impl<E> Contended for RetryError<E> {
    #[inline]
    fn is_contended(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn test_error_code() {
        assert!(ErrorCode::new(ffi::SQLITE_LOCKED_SHAREDCACHE).is_contended());
        assert!(!ErrorCode::new(ffi::SQLITE_LOCKED).is_contended());
        assert!(!ErrorCode::new(ffi::SQLITE_BUSY).is_contended());
    }

    #[test]
    fn test_rusqlite_error() {
        assert!(sqlite_failure(ffi::SQLITE_LOCKED_SHAREDCACHE).is_contended());
        assert!(!sqlite_failure(ffi::SQLITE_LOCKED).is_contended());
        assert!(!rusqlite::Error::QueryReturnedNoRows.is_contended());
    }

    #[test]
    fn test_retry_errors_never_contended() {
        let err: RetryError<ErrorCode> =
            RetryError::Operation(ErrorCode::new(ffi::SQLITE_LOCKED_SHAREDCACHE));
        assert!(!err.is_contended());
        assert!(!NotifyError::Deadlock.is_contended());
    }
}
