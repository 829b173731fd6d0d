/*!
 * Monitoring Module
 * Tracing setup
 */

mod tracer;

pub use tracer::init_tracing;
