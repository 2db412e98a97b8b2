/*!
 * Wait Configuration
 *
 * Runtime configuration for how long and how often the retry loop may wait
 */

use crate::core::limits::{DEFAULT_BOUNDED_WAIT, ENV_MAX_WAIT_CYCLES, ENV_WAIT_TIMEOUT_MS};
use std::time::Duration;
use tracing::warn;

/// Retry loop configuration
///
/// The default waits forever and retries without limit, matching the
/// engine's own unlock-notify contract. Both bounds are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifyConfig {
    /// Upper bound on a single wait cycle
    pub wait_timeout: Option<Duration>,
    /// Upper bound on the number of wait cycles per operation
    pub max_wait_cycles: Option<u32>,
}

impl NotifyConfig {
    /// Wait forever, retry forever
    pub const fn unbounded() -> Self {
        Self {
            wait_timeout: None,
            max_wait_cycles: None,
        }
    }

    /// Give up on a wait cycle after `timeout`
    pub const fn bounded(timeout: Duration) -> Self {
        Self {
            wait_timeout: Some(timeout),
            max_wait_cycles: None,
        }
    }

    /// Bounded with the crate's default timeout
    pub const fn bounded_default() -> Self {
        Self::bounded(DEFAULT_BOUNDED_WAIT)
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub const fn with_max_wait_cycles(mut self, cycles: u32) -> Self {
        self.max_wait_cycles = Some(cycles);
        self
    }

    /// Build from environment variables, falling back to defaults
    ///
    /// - `UNLOCK_NOTIFY_TIMEOUT_MS`: per-cycle timeout in milliseconds
    /// - `UNLOCK_NOTIFY_MAX_WAITS`: maximum wait cycles
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_WAIT_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.wait_timeout = Some(Duration::from_millis(ms)),
                Err(e) => warn!(var = ENV_WAIT_TIMEOUT_MS, value = %raw, error = %e, "Ignoring invalid wait timeout"),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_WAIT_CYCLES) {
            match raw.trim().parse::<u32>() {
                Ok(cycles) => config.max_wait_cycles = Some(cycles),
                Err(e) => warn!(var = ENV_MAX_WAIT_CYCLES, value = %raw, error = %e, "Ignoring invalid wait cycle limit"),
            }
        }

        config
    }
}
