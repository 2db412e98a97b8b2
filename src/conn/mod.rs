/*!
 * Shared-Cache Connections
 *
 * `Conn` wraps a rusqlite connection opened in shared-cache mode and routes
 * statement preparation, stepping and arbitrary closures through the
 * unlock-notify retry loop.
 *
 * Without the shared cache SQLite busy-waits for the write lock. With it,
 * SQLITE_LOCKED_SHAREDCACHE comes back immediately whenever another
 * connection in this process holds the table. `Conn` blocks instead, until
 * that connection's transaction ends, so a step can take as long as the
 * other transaction does.
 *
 * A `Conn` is used by one thread at a time.
 */

mod stmt;

pub use stmt::Stmt;

use crate::core::errors::{ErrorCode, RetryError};
use crate::core::sync::{NotifyConfig, WaitToken};
use crate::engine::SqliteHandle;
use crate::retry::{Contended, RetryLoop, RetryStats};
use libsqlite3_sys as ffi;
use rusqlite::{Connection, OpenFlags};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use tracing::debug;

/// Result of statement-level calls
pub type StepResult<T> = Result<T, RetryError<ErrorCode>>;

/// Connection with a reusable unlock-notify token
pub struct Conn {
    inner: Connection,
    token: Arc<WaitToken>,
    config: NotifyConfig,
}

impl Conn {
    /// Open `path` (plain path or `file:` URI) with the shared cache enabled
    pub fn open_shared<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_SHARED_CACHE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let inner = Connection::open_with_flags(path.as_ref(), flags)?;
        debug!(path = %path.as_ref().display(), "Opened shared-cache connection");
        Ok(Self::from_connection(inner, NotifyConfig::from_env()))
    }

    /// Wrap an already open connection
    pub fn from_connection(inner: Connection, config: NotifyConfig) -> Self {
        Self {
            inner,
            token: WaitToken::allocate(),
            config,
        }
    }

    pub fn with_config(mut self, config: NotifyConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// The underlying rusqlite connection
    #[inline]
    pub fn connection(&self) -> &Connection {
        &self.inner
    }

    pub fn into_inner(self) -> Connection {
        self.inner
    }

    #[inline]
    pub(crate) fn handle(&self) -> SqliteHandle {
        // SAFETY: an open rusqlite connection always has a valid handle, and
        // it lives as long as `self`.
        unsafe { SqliteHandle::from_raw(self.inner.handle()) }
    }

    pub(crate) fn with_retry<R>(
        &self,
        label: &'static str,
        f: impl FnOnce(&RetryLoop<'_, SqliteHandle>) -> R,
    ) -> R {
        let handle = self.handle();
        let retry = RetryLoop::with_token(&handle, Arc::clone(&self.token))
            .with_config(self.config)
            .with_label(label);
        f(&retry)
    }

    /// Execute until not lock-busy
    ///
    /// `op` is run again after every shared-cache conflict; other errors
    /// are returned unchanged.
    pub fn run<T, E, F>(&self, op: F) -> Result<T, RetryError<E>>
    where
        E: Contended,
        F: FnMut() -> Result<T, E>,
    {
        self.with_retry("run", |retry| retry.run(op))
    }

    pub fn run_with_stats<T, E, F>(&self, op: F) -> (Result<T, RetryError<E>>, RetryStats)
    where
        E: Contended,
        F: FnMut() -> Result<T, E>,
    {
        self.with_retry("run", |retry| retry.run_with_stats(op))
    }

    /// Compile a single SQL statement
    ///
    /// Empty SQL (only whitespace or comments) is rejected with SQLITE_MISUSE.
    pub fn prepare(&self, sql: &str) -> StepResult<Stmt<'_>> {
        let len = c_int::try_from(sql.len())
            .map_err(|_| RetryError::Operation(ErrorCode::new(ffi::SQLITE_TOOBIG)))?;
        let db = self.handle();

        let raw = self.with_retry("prepare", |retry| {
            retry.run(|| {
                let mut stmt = ptr::null_mut();
                // SAFETY: sql is valid for len bytes; db is open.
                let rc = unsafe {
                    ffi::sqlite3_prepare_v2(
                        db.as_ptr(),
                        sql.as_ptr() as *const c_char,
                        len,
                        &mut stmt,
                        ptr::null_mut(),
                    )
                };
                ErrorCode::check(rc)?;
                NonNull::new(stmt).ok_or(ErrorCode::new(ffi::SQLITE_MISUSE))
            })
        })?;

        Ok(Stmt::new(self, raw))
    }

    /// Run one statement to completion, returning the number of changed rows
    pub fn execute(&self, sql: &str) -> StepResult<usize> {
        let mut stmt = self.prepare(sql)?;
        while stmt.step()? {}
        stmt.finalize().map_err(RetryError::Operation)?;
        Ok(self.changes())
    }

    /// Rows changed by the most recent statement
    pub fn changes(&self) -> usize {
        // SAFETY: handle is open for the lifetime of self.
        unsafe { ffi::sqlite3_changes(self.handle().as_ptr()) as usize }
    }

    #[inline]
    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.last_insert_rowid()
    }
}
