//! Stream watchdog: periodic stall detection for network sources.
//!
//! The watchdog is a fast poll-and-decide tick. It never blocks and never
//! touches the graph; everything it needs lives behind the source's own
//! health lock. When it detects a stall it marks the cycle in flight,
//! stamps the statistics, and hands off to the reconnection task over the
//! command channel.

use crate::health::reconnect::Command;
use crate::health::state::{SharedHealth, StreamState};
use kanal::AsyncSender;
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Outcome of a single watchdog tick. Factored out of the task loop so the
/// decision table is testable without timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Watchdog disabled, wrong state, cycle already active, or no buffer
    /// seen yet.
    Skip,
    /// Data is flowing within the threshold.
    Healthy,
    /// Stall detected; a reconnection cycle was marked in flight.
    Stalled,
}

/// Evaluate one tick against the health state.
///
/// On a stall this mutates the state: sets `is_reconnecting`, increments
/// `attempt_count`, stamps `last_disconnected`. The caller owns the
/// hand-off to the reconnection task.
pub(crate) fn evaluate_tick(state: &SharedHealth, now: Instant) -> TickOutcome {
    let mut guard = state.lock().unwrap();

    let timeout = guard.buffer_timeout();
    if timeout.is_zero() || guard.current() != StreamState::Playing {
        return TickOutcome::Skip;
    }
    // A cycle is already active; never start a second one.
    if guard.connection().is_reconnecting {
        return TickOutcome::Skip;
    }
    // No buffer yet: the stream is still coming up, not stalled.
    let Some(last_buffer) = guard.last_buffer() else {
        return TickOutcome::Skip;
    };

    if now.duration_since(last_buffer) > timeout {
        let conn = guard.connection_mut();
        conn.is_reconnecting = true;
        conn.attempt_count += 1;
        conn.last_disconnected = Some(SystemTime::now());
        TickOutcome::Stalled
    } else {
        TickOutcome::Healthy
    }
}

/// Spawn the watchdog task for one source.
///
/// `tick` is the poll period; the owning supervisor uses the source's
/// buffer timeout, one poll per timeout window. Must be called from within
/// a Tokio runtime.
pub(crate) fn spawn_watchdog(
    source: String,
    state: SharedHealth,
    cmd_tx: AsyncSender<Command>,
    tick: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately; skip it so the
        // first real check happens one period in.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match evaluate_tick(&state, Instant::now()) {
                TickOutcome::Skip | TickOutcome::Healthy => {}
                TickOutcome::Stalled => {
                    warn!(source = %source, "stream stalled; starting reconnection cycle");
                    crate::observability::record_watchdog_timeout();
                    if cmd_tx.send(Command::Begin).await.is_err() {
                        debug!(source = %source, "reconnection task gone; watchdog exiting");
                        return;
                    }
                }
            }
        }
    })
}
