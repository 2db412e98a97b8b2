/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use libsqlite3_sys as ffi;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_int;
use std::time::Duration;
use thiserror::Error;

/// Result type for unlock-notify operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Raw storage engine result code
///
/// Keeps the full extended code. The primary class is the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(c_int);

impl ErrorCode {
    pub const OK: Self = Self(ffi::SQLITE_OK);

    #[inline]
    pub const fn new(code: c_int) -> Self {
        Self(code)
    }

    #[inline]
    pub const fn raw(self) -> c_int {
        self.0
    }

    /// Primary result code (extended bits stripped)
    #[inline]
    pub const fn primary(self) -> c_int {
        self.0 & 0xff
    }

    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 == ffi::SQLITE_OK
    }

    /// Lock held by another connection sharing the same cache
    #[inline]
    pub const fn is_locked_sharedcache(self) -> bool {
        self.0 == ffi::SQLITE_LOCKED_SHAREDCACHE
    }

    /// Convert a result code into `Ok(())` or the error it carries
    #[inline]
    pub fn check(code: c_int) -> Result<(), ErrorCode> {
        if code == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(Self(code))
        }
    }

    /// English description supplied by the engine
    pub fn description(self) -> &'static str {
        // SAFETY: sqlite3_errstr returns a pointer to a static string table entry
        // (or a static "unknown error") and never NULL.
        unsafe {
            let ptr = ffi::sqlite3_errstr(self.0);
            if ptr.is_null() {
                return "unknown error";
            }
            CStr::from_ptr(ptr).to_str().unwrap_or("unknown error")
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.0)
    }
}

impl std::error::Error for ErrorCode {}

impl Diagnostic for ErrorCode {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("sqlite::{}", self.primary())))
    }
}

impl From<c_int> for ErrorCode {
    fn from(code: c_int) -> Self {
        Self(code)
    }
}

/// Failures of the wait/notify machinery itself
///
/// Lock-busy never shows up here: it is absorbed by the retry loop.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum NotifyError {
    #[error("Unlock notification could not be registered: {0}")]
    #[diagnostic(
        code(notify::registration_failed),
        help("The engine refused to arm the callback. The connection may be misused or closed.")
    )]
    RegistrationFailed(ErrorCode),

    #[error("Waiting for the lock to clear would deadlock")]
    #[diagnostic(
        code(notify::deadlock),
        help("The blocking connection is itself waiting on this one. Roll back and retry the transaction.")
    )]
    Deadlock,

    #[error("Out of memory while arming unlock notification")]
    #[diagnostic(
        code(notify::out_of_memory),
        help("System may be low on memory. Consider freeing resources.")
    )]
    OutOfMemory,

    #[error("Timed out after {waited:?} waiting for the shared-cache lock to clear")]
    #[diagnostic(
        code(notify::timeout),
        help("Another connection is holding its transaction open. Raise the wait timeout or abandon the operation.")
    )]
    Timeout { waited: Duration },

    #[error("Gave up after {cycles} wait cycles")]
    #[diagnostic(
        code(notify::wait_cycles_exhausted),
        help("The lock kept being re-acquired by other connections. Raise max_wait_cycles or retry later.")
    )]
    WaitCyclesExhausted { cycles: u32 },
}

impl NotifyError {
    /// Classify a failed registration result code
    pub fn from_registration(code: ErrorCode) -> Self {
        match code.primary() {
            ffi::SQLITE_LOCKED => NotifyError::Deadlock,
            ffi::SQLITE_NOMEM => NotifyError::OutOfMemory,
            _ => NotifyError::RegistrationFailed(code),
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, NotifyError::Timeout { .. })
    }
}

/// Outcome of a retried operation that did not succeed
///
/// Operation errors are passed through untouched.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error(transparent)]
    Operation(E),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl<E> RetryError<E> {
    /// The operation's own error, if that is what ended the loop
    pub fn operation(&self) -> Option<&E> {
        match self {
            RetryError::Operation(e) => Some(e),
            RetryError::Notify(_) => None,
        }
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            RetryError::Notify(_) => None,
        }
    }

    pub fn notify(&self) -> Option<&NotifyError> {
        match self {
            RetryError::Notify(e) => Some(e),
            RetryError::Operation(_) => None,
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Notify(e) if e.is_timeout())
    }
}
