/*!
 * Retry Loop
 *
 * Runs an operation until it stops reporting a shared-cache lock conflict.
 *
 * # State Machine
 *
 * ```text
 * Executing -> (success)     Done
 *           -> (lock-busy)   Waiting -> Executing
 *           -> (other error) Failed
 * ```
 *
 * A lock-busy result arms an unlock notification and sleeps on the token
 * until the engine fires it; the operation is then run again. Any other
 * error ends the loop and is returned unchanged.
 */

mod classify;
mod stats;

pub use classify::Contended;
pub use stats::RetryStats;

use crate::core::errors::{NotifyError, NotifyResult, RetryError};
use crate::core::guard::Registration;
use crate::core::sync::{NotifyConfig, WaitToken};
use crate::engine::NotifyEngine;
use crate::monitoring::RetrySpan;
use std::sync::Arc;
use tracing::{debug, trace};

/// Retry driver bound to one engine handle
///
/// Reuses a single token across cycles; each cycle resets it before arming.
pub struct RetryLoop<'e, E: NotifyEngine + ?Sized> {
    engine: &'e E,
    token: Arc<WaitToken>,
    config: NotifyConfig,
    label: &'static str,
}

impl<'e, E: NotifyEngine + ?Sized> RetryLoop<'e, E> {
    /// Create a loop with a fresh token and the default (unbounded) config
    pub fn new(engine: &'e E) -> Self {
        Self::with_token(engine, WaitToken::allocate())
    }

    /// Create a loop that reuses an existing token
    pub fn with_token(engine: &'e E, token: Arc<WaitToken>) -> Self {
        Self {
            engine,
            token,
            config: NotifyConfig::default(),
            label: "operation",
        }
    }

    pub fn with_config(mut self, config: NotifyConfig) -> Self {
        self.config = config;
        self
    }

    /// Name reported in traces
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    #[inline]
    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// Run `op` until it succeeds or fails with something other than lock-busy
    pub fn run<T, Err, F>(&self, op: F) -> Result<T, RetryError<Err>>
    where
        Err: Contended,
        F: FnMut() -> Result<T, Err>,
    {
        self.run_with_stats(op).0
    }

    /// Like `run`, also reporting what the loop did
    pub fn run_with_stats<T, Err, F>(&self, mut op: F) -> (Result<T, RetryError<Err>>, RetryStats)
    where
        Err: Contended,
        F: FnMut() -> Result<T, Err>,
    {
        let mut stats = RetryStats::default();
        // Only contended runs get a span
        let mut span: Option<RetrySpan> = None;

        let result = loop {
            stats.attempts += 1;

            match op() {
                Ok(value) => break Ok(value),
                Err(err) if err.is_contended() => {
                    let span = span.get_or_insert_with(|| RetrySpan::new(self.label));
                    let _entered = span.enter();

                    if let Some(max) = self.config.max_wait_cycles {
                        if stats.wait_cycles >= max {
                            break Err(NotifyError::WaitCyclesExhausted {
                                cycles: stats.wait_cycles,
                            }
                            .into());
                        }
                    }

                    trace!(attempt = stats.attempts, "Shared-cache lock busy, waiting for unlock");
                    if let Err(err) = self.wait_for_unlock(&mut stats) {
                        break Err(err.into());
                    }
                }
                Err(err) => break Err(RetryError::Operation(err)),
            }
        };

        if let Some(span) = span {
            span.record_stats(&stats);
            span.record_result(result.is_ok());
        }

        (result, stats)
    }

    /// One Waiting state: arm, sleep, account
    fn wait_for_unlock(&self, stats: &mut RetryStats) -> NotifyResult<()> {
        let registration = Registration::arm(self.engine, &self.token)?;
        stats.wait_cycles += 1;

        if registration.is_unlocked() {
            stats.immediate_unlocks += 1;
        }

        let waited = registration.wait(self.config.wait_timeout)?;
        stats.waited += waited;

        debug!(
            cycle = stats.wait_cycles,
            waited_us = waited.as_micros() as u64,
            "Unlock notification received"
        );
        Ok(())
    }
}

/// Execute `op` against `engine`, waiting out shared-cache lock conflicts
///
/// Waits forever per cycle and retries without bound.
pub fn run_until_unlocked<E, T, Err, F>(engine: &E, op: F) -> Result<T, RetryError<Err>>
where
    E: NotifyEngine + ?Sized,
    Err: Contended,
    F: FnMut() -> Result<T, Err>,
{
    RetryLoop::new(engine).run(op)
}
