/*!
 * RAII Resource Guards
 *
 * Guards for resources that are shared with the storage engine and must be
 * released before their owner goes away.
 *
 * ## Guard Types
 *
 * - **Registration**: An armed unlock notification. Consumed by waiting,
 *   cancelled on drop.
 *
 * ## Example
 *
 * ```ignore
 * let token = WaitToken::allocate();
 * let registration = Registration::arm(&handle, &token)?;
 * // Either wait for the engine to fire the token...
 * registration.wait(None)?;
 * // ...or drop the guard, which cancels the notification.
 * ```
 */

mod registration;
mod traits;

pub use registration::Registration;
pub use traits::Guard;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> std::time::Duration {
        self.creation_time.elapsed()
    }
}
