//! Connection-health supervision for network stream sources.
//!
//! Three cooperating pieces, one set per supervised source:
//!
//! - [`watchdog`]: a periodic tick that detects stalled buffer arrival
//! - [`reconnect`]: the stop→restart retry cycle behind a command channel
//! - [`notify`]: asynchronous, ordered delivery of state transitions to
//!   registered client callbacks
//!
//! [`HealthSupervisor`] ties them together: it is armed while the owning
//! source sits in a graph targeted at `Playing`, and disarmed on stop or
//! removal. Dropping a supervisor aborts any remaining timer tasks, so a
//! component can never be destroyed with live timers behind it.
//!
//! Supervision tasks take only the per-source health lock. The control
//! plane's coarse lock lives a layer above this crate and is never touched
//! from a timer task.

mod notify;
mod reconnect;
mod state;
mod watchdog;

pub use notify::{ListenerNotifier, StateListener};
pub use reconnect::StreamDriver;
pub use state::{
    shared_health, ConnectionData, HealthState, ReconnectionParams, SharedHealth, StateTransition,
    StreamState, MIN_RECONNECTION_PARAM,
};

pub(crate) use reconnect::{apply_state, send_command, spawn_manager, Command};
pub(crate) use watchdog::spawn_watchdog;

use crate::error::{Error, Result};
use crate::events::EventSender;
use kanal::AsyncSender;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Owns the watchdog and reconnection tasks for one network source.
pub struct HealthSupervisor {
    source: String,
    state: SharedHealth,
    notifier: ListenerNotifier,
    cmd_tx: Option<AsyncSender<Command>>,
    manager: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
}

impl HealthSupervisor {
    /// Create an unarmed supervisor over the given health state.
    pub fn new(source: impl Into<String>, state: SharedHealth, notifier: ListenerNotifier) -> Self {
        Self {
            source: source.into(),
            state,
            notifier,
            cmd_tx: None,
            manager: None,
            watchdog: None,
        }
    }

    /// Whether the supervision tasks are running.
    pub fn is_armed(&self) -> bool {
        self.manager.is_some()
    }

    /// Start the reconnection task and, if a buffer timeout is configured,
    /// the watchdog.
    ///
    /// Must be called from within a Tokio runtime. Arming twice is a
    /// lifecycle bug and fails with `InternalFault`.
    pub fn arm(&mut self, driver: Arc<dyn StreamDriver>, events: EventSender) -> Result<()> {
        if self.is_armed() {
            return Err(Error::InternalFault(format!(
                "supervision for '{}' is already armed",
                self.source
            )));
        }

        let (tx, manager) = spawn_manager(
            self.source.clone(),
            self.state.clone(),
            driver,
            self.notifier.clone(),
            events,
        );

        let timeout = self.state.lock().unwrap().buffer_timeout();
        if !timeout.is_zero() {
            self.watchdog = Some(spawn_watchdog(
                self.source.clone(),
                self.state.clone(),
                tx.clone(),
                timeout,
            ));
        }

        self.cmd_tx = Some(tx);
        self.manager = Some(manager);
        debug!(source = %self.source, ?timeout, "health supervision armed");
        Ok(())
    }

    /// Restart the watchdog after the buffer timeout changed. A no-op while
    /// unarmed; a zero timeout leaves the watchdog stopped.
    pub fn refresh_watchdog(&mut self) {
        if let Some(old) = self.watchdog.take() {
            old.abort();
        }
        let Some(tx) = &self.cmd_tx else { return };

        let timeout = self.state.lock().unwrap().buffer_timeout();
        if !timeout.is_zero() {
            self.watchdog = Some(spawn_watchdog(
                self.source.clone(),
                self.state.clone(),
                tx.clone(),
                timeout,
            ));
        }
    }

    /// Tell an in-flight reconnection cycle that its parameters changed.
    pub fn notify_params_changed(&self) {
        if let Some(tx) = &self.cmd_tx {
            let _ = send_command(tx, Command::ParamsChanged);
        }
    }

    /// Stop both tasks. Idempotent; safe to call while unarmed.
    pub fn disarm(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        if let Some(tx) = self.cmd_tx.take() {
            let _ = send_command(&tx, Command::Shutdown);
        }
        if let Some(manager) = self.manager.take() {
            // The shutdown command ends the task at its next select point;
            // abort covers a task parked before its first recv.
            manager.abort();
        }
        debug!(source = %self.source, "health supervision disarmed");
    }
}

impl Drop for HealthSupervisor {
    fn drop(&mut self) {
        if self.is_armed() {
            // Teardown without an explicit disarm is a lifecycle bug in the
            // caller; the abort keeps the timers from outliving the source.
            warn!(
                source = %self.source,
                "supervisor dropped while armed; aborting timer tasks"
            );
        }
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::ReconnectionParams;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct FlakyDriver {
        starts: AtomicU32,
        state: StdMutex<StreamState>,
    }

    impl FlakyDriver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                starts: AtomicU32::new(0),
                state: StdMutex::new(StreamState::Playing),
            })
        }
    }

    impl StreamDriver for FlakyDriver {
        fn shut_down(&self) {
            *self.state.lock().unwrap() = StreamState::Null;
        }

        fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            *self.state.lock().unwrap() = StreamState::Playing;
        }

        fn state(&self) -> StreamState {
            *self.state.lock().unwrap()
        }
    }

    fn supervised_state() -> (SharedHealth, ListenerNotifier) {
        let state = shared_health();
        {
            let mut guard = state.lock().unwrap();
            guard.set_buffer_timeout(Duration::from_secs(2));
            guard
                .set_params(
                    ReconnectionParams::new(Duration::from_millis(100), Duration::from_secs(1))
                        .unwrap(),
                )
                .unwrap();
            guard.set_state(StreamState::Playing);
            guard.record_buffer();
        }
        (state, ListenerNotifier::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_drives_exactly_one_cycle() {
        let (state, notifier) = supervised_state();
        let driver = FlakyDriver::new();
        let mut supervisor = HealthSupervisor::new("cam", state.clone(), notifier);
        supervisor.arm(driver.clone(), EventSender::new(16)).unwrap();

        // No stall while buffers keep arriving.
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            state.lock().unwrap().record_buffer();
        }
        assert_eq!(state.lock().unwrap().connection().attempt_count, 0);

        // Stop feeding buffers: one watchdog fire, one cycle, recovery.
        tokio::time::advance(Duration::from_secs(4)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        supervisor.disarm();

        let conn = state.lock().unwrap().connection();
        assert_eq!(conn.attempt_count, 1);
        assert!(!conn.is_reconnecting);
        assert_eq!(driver.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_arm_fails() {
        let (state, notifier) = supervised_state();
        let mut supervisor = HealthSupervisor::new("cam", state, notifier);
        supervisor
            .arm(FlakyDriver::new(), EventSender::new(16))
            .unwrap();
        assert!(matches!(
            supervisor.arm(FlakyDriver::new(), EventSender::new(16)),
            Err(Error::InternalFault(_))
        ));
        supervisor.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_the_watchdog() {
        let (state, notifier) = supervised_state();
        let mut supervisor = HealthSupervisor::new("cam", state.clone(), notifier);
        supervisor
            .arm(FlakyDriver::new(), EventSender::new(16))
            .unwrap();

        supervisor.disarm();
        assert!(!supervisor.is_armed());

        // Long silence after disarm: nothing may fire.
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(state.lock().unwrap().connection().attempt_count, 0);

        // Disarm is idempotent.
        supervisor.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_armed_tasks() {
        let (state, notifier) = supervised_state();
        let mut supervisor = HealthSupervisor::new("cam", state.clone(), notifier);
        supervisor
            .arm(FlakyDriver::new(), EventSender::new(16))
            .unwrap();

        drop(supervisor);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(state.lock().unwrap().connection().attempt_count, 0);
    }
}
