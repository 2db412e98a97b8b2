/*!
 * Monitoring
 * Structured tracing for retry loops
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, RetrySpan};
