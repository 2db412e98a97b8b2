/*!
 * Structured Tracing
 * Tracing setup and retry spans using the tracing crate
 *
 * Features:
 * - Trace ID per contended retry run for correlation across threads
 * - JSON-formatted logs for structured parsing
 * - Slow-wait warnings
 */

use crate::core::limits::{ENV_TRACE_JSON, SLOW_RETRY_THRESHOLD};
use crate::retry::RetryStats;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - UNLOCK_NOTIFY_TRACE_JSON: Enable JSON output (default: false)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        let installed = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok();
        if installed {
            info!("Structured tracing initialized with JSON output");
        }
    } else {
        let installed = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
            .is_ok();
        if installed {
            info!("Structured tracing initialized");
        }
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one contended retry run
pub struct RetrySpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
}

impl RetrySpan {
    pub fn new(operation: &'static str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "unlock_retry",
            trace_id = %trace_id,
            operation = operation,
            attempts = tracing::field::Empty,
            wait_cycles = tracing::field::Empty,
            waited_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_stats(&self, stats: &RetryStats) {
        self.span.record("attempts", stats.attempts);
        self.span.record("wait_cycles", stats.wait_cycles);
        self.span.record("waited_us", stats.waited.as_micros() as u64);
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for RetrySpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration > SLOW_RETRY_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lock wait"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                duration_us = duration.as_micros() as u64,
                "lock wait completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn init_test_tracing() {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("debug"))
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init();
    }

    #[test]
    fn test_retry_span_records() {
        init_test_tracing();

        let span = RetrySpan::new("test_op");
        assert_eq!(span.trace_id().len(), 36);
        span.record_stats(&RetryStats {
            attempts: 2,
            wait_cycles: 1,
            immediate_unlocks: 0,
            waited: Duration::from_micros(250),
        });
        span.record_result(true);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
