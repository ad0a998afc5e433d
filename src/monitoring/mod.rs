/*!
 * Monitoring
 * Tracing setup and handler spans
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, HandlerSpan};
