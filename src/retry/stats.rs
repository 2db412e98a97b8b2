/*!
 * Retry Statistics
 */

use serde::Serialize;
use std::time::Duration;

/// Counters for one retry loop run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryStats {
    /// Times the operation was executed
    pub attempts: u32,
    /// Unlock notifications armed
    pub wait_cycles: u32,
    /// Cycles where the lock was already clear when armed
    pub immediate_unlocks: u32,
    /// Total time spent blocked
    pub waited: Duration,
}

impl RetryStats {
    /// The operation ran more than once
    #[inline]
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
