//! Observability: structured logging spans and metrics.
//!
//! Logging uses the `tracing` facade throughout the crate; metrics go
//! through the `metrics` facade so any recorder can be installed by the
//! embedding application. Neither requires setup to be safe — without a
//! subscriber or recorder, both are no-ops.

mod metrics;
mod tracing_support;

pub use metrics::{
    init_metrics, record_component_linked, record_notification, record_reconnect_attempt,
    record_reconnect_success, record_watchdog_timeout,
};
pub use tracing_support::{init_tracing, span_graph, span_source, span_supervision};
