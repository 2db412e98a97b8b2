/*!
 * Limits and Constants
 *
 * Environment variable names, thresholds and default durations used across
 * the crate.
 */

use std::time::Duration;

// =============================================================================
// CONFIGURATION ENVIRONMENT
// =============================================================================

/// Per-cycle wait timeout in milliseconds (unset = wait forever)
pub const ENV_WAIT_TIMEOUT_MS: &str = "UNLOCK_NOTIFY_TIMEOUT_MS";

/// Maximum number of wait cycles per operation (unset = unbounded)
pub const ENV_MAX_WAIT_CYCLES: &str = "UNLOCK_NOTIFY_MAX_WAITS";

/// Enable JSON trace output when "1" or "true"
pub const ENV_TRACE_JSON: &str = "UNLOCK_NOTIFY_TRACE_JSON";

// =============================================================================
// WAIT DEFAULTS
// =============================================================================

/// Timeout used by `NotifyConfig::bounded_default()`
/// Long enough for a typical write transaction to commit
pub const DEFAULT_BOUNDED_WAIT: Duration = Duration::from_secs(30);

// =============================================================================
// OBSERVABILITY THRESHOLDS
// =============================================================================

/// Retry runs slower than this are reported at warn level
pub const SLOW_RETRY_THRESHOLD: Duration = Duration::from_millis(100);
