/*!
 * SQLite Unlock-Notify Bridge
 * Blocking retry of shared-cache operations on top of sqlite3_unlock_notify
 */

pub mod conn;
pub mod core;
pub mod engine;
pub mod monitoring;
pub mod retry;

// Re-exports
pub use conn::{Conn, StepResult, Stmt};
pub use crate::core::errors::{ErrorCode, NotifyError, NotifyResult, RetryError};
pub use crate::core::guard::Registration;
pub use crate::core::sync::{NotifyConfig, WaitOutcome, WaitToken};
pub use engine::{dispatch_unlock, NotifyEngine, SqliteHandle, UnlockCallback};
pub use monitoring::init_tracing;
pub use retry::{run_until_unlocked, Contended, RetryLoop, RetryStats};
