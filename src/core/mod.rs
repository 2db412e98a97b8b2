/*!
 * Core Module
 * Error handling, limits, wait primitives and resource guards
 */

pub mod errors;
pub mod guard;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use guard::{Guard, GuardError, GuardMetadata, GuardResult, Registration};
pub use sync::{NotifyConfig, WaitOutcome, WaitToken};
