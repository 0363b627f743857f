//! Per-source connection health state.
//!
//! One [`HealthState`] exists per network stream source, behind its own
//! mutex. The watchdog and reconnection tasks only ever take this per-source
//! lock — never the control-plane lock above the graph — so health
//! supervision cannot stall unrelated graph operations.
//!
//! All durations inside the health machinery use `tokio::time`, which keeps
//! the whole state machine testable under paused time.

use crate::error::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Floor below which reconnection sleep/timeout values are rejected.
pub const MIN_RECONNECTION_PARAM: Duration = Duration::from_millis(10);

/// Stream state of a network source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamState {
    /// Torn down; no resources held.
    #[default]
    Null,
    /// Resources allocated, not yet streaming.
    Ready,
    /// Streaming suspended.
    Paused,
    /// Buffers flowing.
    Playing,
}

/// A single observed state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// The state before the change.
    pub previous: StreamState,
    /// The state after the change.
    pub current: StreamState,
}

/// Running connection statistics for one network source.
///
/// Counters are monotonic; only an explicit client clear resets them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionData {
    /// Wall-clock time of the first successful connection.
    pub first_connected: Option<SystemTime>,
    /// Wall-clock time of the most recent successful connection.
    pub last_connected: Option<SystemTime>,
    /// Wall-clock time of the most recent detected disconnection.
    pub last_disconnected: Option<SystemTime>,
    /// Number of reconnection cycles started by the watchdog.
    pub attempt_count: u64,
    /// Failed attempts within the current cycle; zeroed on success.
    pub retries: u64,
    /// Whether a reconnection cycle is in flight.
    pub is_reconnecting: bool,
}

/// Timing parameters for the reconnection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectionParams {
    /// Delay between failed attempts.
    pub sleep: Duration,
    /// Bound on each attempt's wait for `Playing`.
    pub timeout: Duration,
    /// Optional bound on retries within one cycle. `None` retries forever,
    /// which is the inherited default policy.
    pub max_retries: Option<u64>,
}

impl Default for ReconnectionParams {
    fn default() -> Self {
        Self {
            sleep: Duration::from_secs(4),
            timeout: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl ReconnectionParams {
    /// Create parameters, validating both values against the 10 ms floor.
    pub fn new(sleep: Duration, timeout: Duration) -> Result<Self> {
        let params = Self {
            sleep,
            timeout,
            max_retries: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check both values against the 10 ms floor.
    pub fn validate(&self) -> Result<()> {
        if self.sleep <= MIN_RECONNECTION_PARAM {
            return Err(Error::invalid(format!(
                "reconnection sleep must exceed {MIN_RECONNECTION_PARAM:?}, got {:?}",
                self.sleep
            )));
        }
        if self.timeout <= MIN_RECONNECTION_PARAM {
            return Err(Error::invalid(format!(
                "reconnection timeout must exceed {MIN_RECONNECTION_PARAM:?}, got {:?}",
                self.timeout
            )));
        }
        Ok(())
    }
}

/// The complete health state of one network source.
#[derive(Debug)]
pub struct HealthState {
    current: StreamState,
    previous: StreamState,
    /// Zero disables the watchdog.
    buffer_timeout: Duration,
    /// When the data path last reported a buffer; `None` before the first
    /// frame.
    last_buffer: Option<Instant>,
    connection: ConnectionData,
    params: ReconnectionParams,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            current: StreamState::Null,
            previous: StreamState::Null,
            buffer_timeout: Duration::ZERO,
            last_buffer: None,
            connection: ConnectionData::default(),
            params: ReconnectionParams::default(),
        }
    }
}

impl HealthState {
    /// Current stream state.
    pub fn current(&self) -> StreamState {
        self.current
    }

    /// Previous stream state.
    pub fn previous(&self) -> StreamState {
        self.previous
    }

    /// Apply a state change, returning the transition if it was not a no-op.
    ///
    /// The `(previous, current)` pair always updates; a notification is only
    /// warranted when the state actually changed.
    pub fn set_state(&mut self, new: StreamState) -> Option<StateTransition> {
        let changed = new != self.current;
        self.previous = self.current;
        self.current = new;
        changed.then_some(StateTransition {
            previous: self.previous,
            current: self.current,
        })
    }

    /// The configured stall threshold; zero disables the watchdog.
    pub fn buffer_timeout(&self) -> Duration {
        self.buffer_timeout
    }

    /// Set the stall threshold.
    pub fn set_buffer_timeout(&mut self, timeout: Duration) {
        self.buffer_timeout = timeout;
    }

    /// Record a buffer arrival from the data path.
    pub fn record_buffer(&mut self) {
        self.last_buffer = Some(Instant::now());
    }

    /// When the last buffer arrived, if any has.
    pub fn last_buffer(&self) -> Option<Instant> {
        self.last_buffer
    }

    /// Current connection statistics snapshot.
    pub fn connection(&self) -> ConnectionData {
        self.connection
    }

    /// Mutable access for the watchdog/reconnection tasks.
    pub(crate) fn connection_mut(&mut self) -> &mut ConnectionData {
        &mut self.connection
    }

    /// Reset all connection statistics. Client-initiated only.
    pub fn clear_connection(&mut self) {
        let is_reconnecting = self.connection.is_reconnecting;
        self.connection = ConnectionData {
            // An in-flight cycle stays in flight across a stats clear.
            is_reconnecting,
            ..ConnectionData::default()
        };
    }

    /// Current reconnection parameters.
    pub fn params(&self) -> ReconnectionParams {
        self.params
    }

    /// Replace the reconnection parameters after validation.
    ///
    /// Rejection leaves the prior values intact.
    pub fn set_params(&mut self, params: ReconnectionParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }
}

/// Shared handle to one source's health state.
pub type SharedHealth = Arc<Mutex<HealthState>>;

/// Create a fresh shared health state.
pub fn shared_health() -> SharedHealth {
    Arc::new(Mutex::new(HealthState::default()))
}
