/*!
 * Prepared Statements
 *
 * Thin statement wrapper whose `step` and `reset` wait out shared-cache
 * conflicts. Bind failures are held back and reported by the next `step`,
 * so binds can be chained without checking each one.
 */

use super::{Conn, StepResult};
use crate::core::errors::{ErrorCode, RetryError};
use libsqlite3_sys as ffi;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;

/// Prepared statement attached to a `Conn`
///
/// Finalized on drop.
pub struct Stmt<'c> {
    conn: &'c Conn,
    raw: NonNull<ffi::sqlite3_stmt>,
    bind_err: Option<ErrorCode>,
    last_has_row: bool,
}

impl<'c> Stmt<'c> {
    pub(super) fn new(conn: &'c Conn, raw: NonNull<ffi::sqlite3_stmt>) -> Self {
        Self {
            conn,
            raw,
            bind_err: None,
            last_has_row: false,
        }
    }

    #[inline]
    fn ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.raw.as_ptr()
    }

    /// Advance to the next row
    ///
    /// Returns `true` when a row is available and `false` once the statement
    /// is done. A shared-cache conflict blocks until the other connection
    /// releases its lock, then the statement is reset and stepped again.
    /// On error the statement has been reset.
    pub fn step(&mut self) -> StepResult<bool> {
        if let Some(err) = self.bind_err.take() {
            let _ = self.reset();
            return Err(RetryError::Operation(err));
        }

        let raw = self.ptr();
        let result = self.conn.with_retry("step", |retry| {
            let mut needs_reset = false;
            retry.run(|| {
                // SAFETY: raw is a live statement owned by self.
                unsafe {
                    if needs_reset {
                        ffi::sqlite3_reset(raw);
                        needs_reset = false;
                    }
                    match ffi::sqlite3_step(raw) {
                        ffi::SQLITE_ROW => Ok(true),
                        ffi::SQLITE_DONE => Ok(false),
                        rc => {
                            let code = ErrorCode::new(rc);
                            needs_reset = code.is_locked_sharedcache();
                            Err(code)
                        }
                    }
                }
            })
        });

        if result.is_err() {
            // SAFETY: raw is live.
            unsafe { ffi::sqlite3_reset(raw) };
        }

        self.last_has_row = matches!(result, Ok(true));
        result
    }

    /// Reset so the statement can run again; bindings are kept
    pub fn reset(&mut self) -> StepResult<()> {
        self.last_has_row = false;
        let raw = self.ptr();
        self.conn.with_retry("reset", |retry| {
            // SAFETY: raw is live.
            retry.run(|| ErrorCode::check(unsafe { ffi::sqlite3_reset(raw) }))
        })
    }

    /// The last `step` produced a row
    #[inline]
    pub fn has_row(&self) -> bool {
        self.last_has_row
    }

    pub fn clear_bindings(&mut self) -> Result<(), ErrorCode> {
        ErrorCode::check(unsafe { ffi::sqlite3_clear_bindings(self.ptr()) })
    }

    fn record_bind(&mut self, rc: c_int) {
        if rc != ffi::SQLITE_OK && self.bind_err.is_none() {
            self.bind_err = Some(ErrorCode::new(rc));
        }
    }

    /// Bind an integer to a 1-based parameter
    pub fn bind_i64(&mut self, index: c_int, value: i64) -> &mut Self {
        let rc = unsafe { ffi::sqlite3_bind_int64(self.ptr(), index, value) };
        self.record_bind(rc);
        self
    }

    /// Bind text to a 1-based parameter; SQLite copies the value
    pub fn bind_text(&mut self, index: c_int, value: &str) -> &mut Self {
        let rc = match c_int::try_from(value.len()) {
            Ok(len) => unsafe {
                ffi::sqlite3_bind_text(
                    self.ptr(),
                    index,
                    value.as_ptr() as *const c_char,
                    len,
                    ffi::SQLITE_TRANSIENT(),
                )
            },
            Err(_) => ffi::SQLITE_TOOBIG,
        };
        self.record_bind(rc);
        self
    }

    pub fn bind_null(&mut self, index: c_int) -> &mut Self {
        let rc = unsafe { ffi::sqlite3_bind_null(self.ptr(), index) };
        self.record_bind(rc);
        self
    }

    /// Index of a named parameter such as `:id` or `$name`
    ///
    /// An unknown name yields 0 and fails the next `step` with SQLITE_ERROR.
    pub fn param_index(&mut self, name: &str) -> c_int {
        let index = match CString::new(name) {
            Ok(c_name) => unsafe { ffi::sqlite3_bind_parameter_index(self.ptr(), c_name.as_ptr()) },
            Err(_) => 0,
        };
        if index == 0 && self.bind_err.is_none() {
            self.bind_err = Some(ErrorCode::new(ffi::SQLITE_ERROR));
        }
        index
    }

    pub fn set_i64(&mut self, name: &str, value: i64) -> &mut Self {
        let index = self.param_index(name);
        self.bind_i64(index, value)
    }

    pub fn set_text(&mut self, name: &str, value: &str) -> &mut Self {
        let index = self.param_index(name);
        self.bind_text(index, value)
    }

    /// Number of columns in the result set
    pub fn column_count(&self) -> c_int {
        unsafe { ffi::sqlite3_column_count(self.ptr()) }
    }

    /// Number of columns in the current row (0 when no row is available)
    pub fn data_count(&self) -> c_int {
        unsafe { ffi::sqlite3_data_count(self.ptr()) }
    }

    pub fn column_name(&self, col: c_int) -> Option<String> {
        unsafe {
            let name = ffi::sqlite3_column_name(self.ptr(), col);
            if name.is_null() {
                None
            } else {
                Some(CStr::from_ptr(name).to_string_lossy().into_owned())
            }
        }
    }

    pub fn column_is_null(&self, col: c_int) -> bool {
        unsafe { ffi::sqlite3_column_type(self.ptr(), col) == ffi::SQLITE_NULL }
    }

    pub fn column_i64(&self, col: c_int) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.ptr(), col) }
    }

    /// Text value of a column, `None` for NULL
    pub fn column_text(&self, col: c_int) -> Option<String> {
        unsafe {
            let text = ffi::sqlite3_column_text(self.ptr(), col);
            if text.is_null() {
                return None;
            }
            let len = ffi::sqlite3_column_bytes(self.ptr(), col).max(0) as usize;
            let bytes = std::slice::from_raw_parts(text, len);
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    /// Finalize, reporting the engine's result
    pub fn finalize(self) -> Result<(), ErrorCode> {
        let raw = self.ptr();
        std::mem::forget(self);
        ErrorCode::check(unsafe { ffi::sqlite3_finalize(raw) })
    }
}

impl Drop for Stmt<'_> {
    fn drop(&mut self) {
        unsafe {
            ffi::sqlite3_finalize(self.ptr());
        }
    }
}
