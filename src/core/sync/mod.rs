/*!
 * Synchronization Primitives
 *
 * Wait/notify building blocks for blocking on a shared-cache lock:
 * - `WaitToken`: one-shot flag + condvar, fired from any thread
 * - `NotifyConfig`: opt-in bounds on waiting
 *
 * # Use Cases
 *
 * - **Unlock notification**: Sleep until the engine reports the lock clear
 * - **Batched wakeups**: One commit releasing many waiting connections
 */

mod config;
mod token;

pub use config::NotifyConfig;
pub use token::{WaitOutcome, WaitToken};
