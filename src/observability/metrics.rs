//! Metrics collection using metrics-rs.

use metrics::{counter, Unit};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metric descriptions have been registered.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const WATCHDOG_TIMEOUTS: &str = "headwater_watchdog_timeouts";
const RECONNECT_ATTEMPTS: &str = "headwater_reconnect_attempts";
const RECONNECT_SUCCESSES: &str = "headwater_reconnect_successes";
const NOTIFICATIONS_DELIVERED: &str = "headwater_notifications_delivered";
const COMPONENTS_LINKED: &str = "headwater_components_linked";

/// Register metric descriptions.
///
/// Call once at application startup before using any metrics. Safe to call
/// multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        WATCHDOG_TIMEOUTS,
        Unit::Count,
        "Stalls detected by stream watchdogs"
    );
    metrics::describe_counter!(
        RECONNECT_ATTEMPTS,
        Unit::Count,
        "Reconnection attempts started"
    );
    metrics::describe_counter!(
        RECONNECT_SUCCESSES,
        Unit::Count,
        "Reconnection cycles that reached Playing"
    );
    metrics::describe_counter!(
        NOTIFICATIONS_DELIVERED,
        Unit::Count,
        "State transitions delivered to listeners"
    );
    metrics::describe_counter!(
        COMPONENTS_LINKED,
        Unit::Count,
        "Components linked by graphs"
    );
}

/// Record a watchdog-detected stall.
pub fn record_watchdog_timeout() {
    counter!(WATCHDOG_TIMEOUTS).increment(1);
}

/// Record the start of a reconnection attempt.
pub fn record_reconnect_attempt() {
    counter!(RECONNECT_ATTEMPTS).increment(1);
}

/// Record a reconnection cycle reaching Playing.
pub fn record_reconnect_success() {
    counter!(RECONNECT_SUCCESSES).increment(1);
}

/// Record a state transition delivered to `listeners` registrants.
pub fn record_notification(listeners: usize) {
    counter!(NOTIFICATIONS_DELIVERED).increment(listeners as u64);
}

/// Record a component being linked.
pub fn record_component_linked() {
    counter!(COMPONENTS_LINKED).increment(1);
}
