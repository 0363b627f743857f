//! Tracing integration for structured logging and spans.

use tracing::{span, Level, Span};

/// Create a span for a graph operation.
///
/// # Example
///
/// ```rust,ignore
/// use headwater::observability::span_graph;
///
/// let span = span_graph("main");
/// let _guard = span.enter();
/// // Graph mutation here...
/// ```
#[inline]
pub fn span_graph(name: &str) -> Span {
    span!(Level::INFO, "graph", name = %name)
}

/// Create a span for a source component's scope.
#[inline]
pub fn span_source(name: &str) -> Span {
    span!(Level::DEBUG, "source", name = %name)
}

/// Create a span for one health-supervision cycle.
#[inline]
pub fn span_supervision(source: &str) -> Span {
    span!(Level::DEBUG, "supervision", source = %source)
}

/// Install a stderr subscriber honoring `RUST_LOG`.
///
/// Intended for binaries and integration tests; safe to call more than once
/// (later calls are no-ops).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
