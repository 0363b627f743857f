//! Decoded network stream source with connection-health supervision.

use crate::buffer::Buffer;
use crate::component::{Chain, FrameRateQueryable, Linkable, NetworkHealthManaged};
use crate::error::{Error, Result};
use crate::events::EventSender;
use crate::health::{
    apply_state, shared_health, ConnectionData, HealthSupervisor, ListenerNotifier,
    ReconnectionParams, SharedHealth, StateListener, StreamDriver, StreamState,
};
use crate::source::{SourceComponent, SourceCore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use url::Url;

/// Stand-in stream driver used until the decode layer installs the real
/// one: it reaches `Playing` as soon as it is started.
#[derive(Debug, Default)]
pub struct LoopbackDriver {
    state: Mutex<StreamState>,
}

impl StreamDriver for LoopbackDriver {
    fn shut_down(&self) {
        *self.state.lock().unwrap() = StreamState::Null;
    }

    fn start(&self) {
        *self.state.lock().unwrap() = StreamState::Playing;
    }

    fn state(&self) -> StreamState {
        *self.state.lock().unwrap()
    }
}

/// Cloneable handle the data path uses to report buffer arrivals.
///
/// Only the per-source health lock is touched; the data path never contends
/// with graph operations.
#[derive(Clone)]
pub struct DataPathHandle {
    state: SharedHealth,
}

impl DataPathHandle {
    /// Record the arrival of a buffer.
    pub fn record_buffer(&self, _buffer: &Buffer) {
        self.record_arrival();
    }

    /// Record an arrival without the buffer itself.
    pub fn record_arrival(&self) {
        self.state.lock().unwrap().record_buffer();
    }
}

/// A live source decoding a network stream, supervised for connection
/// health.
///
/// The source owns the full supervision stack for its stream: the shared
/// health state, the listener notifier, and the (normally disarmed)
/// supervisor whose tasks run while the owning graph targets `Playing`.
pub struct NetworkSource {
    core: SourceCore,
    chain: Chain,
    uri: Url,
    latency: Duration,
    state: SharedHealth,
    notifier: ListenerNotifier,
    supervisor: HealthSupervisor,
    driver: Arc<dyn StreamDriver>,
    events: EventSender,
}

impl std::fmt::Debug for NetworkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSource")
            .field("core", &self.core)
            .field("chain", &self.chain)
            .field("uri", &self.uri)
            .field("latency", &self.latency)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl NetworkSource {
    /// Create a network source for the given stream URI.
    ///
    /// Fails with `InvalidParameter` when the URI does not parse.
    pub fn new(name: impl Into<String>, uri: &str) -> Result<Self> {
        let name = name.into();
        let uri = Url::parse(uri)
            .map_err(|e| Error::invalid(format!("stream uri '{uri}': {e}")))?;

        let state = shared_health();
        let notifier = ListenerNotifier::new();
        let supervisor = HealthSupervisor::new(name.clone(), state.clone(), notifier.clone());
        info!(source = %name, uri = %uri, "network source created");

        Ok(Self {
            core: SourceCore::new(name, true),
            chain: Chain::from_names(["netsrc", "depay", "parse", "decode"]),
            uri,
            latency: Duration::from_millis(100),
            state,
            notifier,
            supervisor,
            driver: Arc::new(LoopbackDriver::default()),
            events: EventSender::default(),
        })
    }

    /// The stream URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Jitter-buffer latency.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Set the jitter-buffer latency.
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Install the real stream driver. Only valid while supervision is
    /// disarmed.
    pub fn set_driver(&mut self, driver: Arc<dyn StreamDriver>) -> Result<()> {
        if self.supervisor.is_armed() {
            return Err(Error::AlreadyLinked(format!(
                "source '{}' is under supervision",
                self.core.name()
            )));
        }
        self.driver = driver;
        Ok(())
    }

    /// A handle for the data path to report buffer arrivals through.
    pub fn data_path(&self) -> DataPathHandle {
        DataPathHandle {
            state: self.state.clone(),
        }
    }

    /// Current stream state.
    pub fn current_state(&self) -> StreamState {
        self.state.lock().unwrap().current()
    }

    /// Previous stream state.
    pub fn previous_state(&self) -> StreamState {
        self.state.lock().unwrap().previous()
    }

    /// Apply a state change.
    ///
    /// The `(previous, current)` pair always updates; listeners are
    /// notified only when the state actually changed. Must be called from
    /// within a Tokio runtime.
    pub fn set_state(&self, new: StreamState) {
        apply_state(&self.state, &self.notifier, &self.events, self.core.name(), new);
    }

    /// Current reconnection parameters.
    pub fn reconnection_params(&self) -> ReconnectionParams {
        self.state.lock().unwrap().params()
    }

    /// Replace the reconnection parameters.
    ///
    /// Values at or below the 10 ms floor are rejected and the prior
    /// values stay in effect. An in-flight reconnection cycle restarts
    /// immediately with the new values.
    pub fn set_reconnection_params(&mut self, params: ReconnectionParams) -> Result<()> {
        self.state.lock().unwrap().set_params(params)?;
        self.supervisor.notify_params_changed();
        Ok(())
    }

    /// Connection statistics snapshot.
    pub fn connection_data(&self) -> ConnectionData {
        self.state.lock().unwrap().connection()
    }

    /// Reset the connection statistics.
    pub fn clear_connection_data(&self) {
        self.state.lock().unwrap().clear_connection();
    }

    /// Register a state-change listener.
    ///
    /// Fails with `AlreadyRegistered` for a callback already present.
    pub fn add_state_listener(&self, listener: StateListener) -> Result<()> {
        self.notifier.add_listener(listener)
    }

    /// Unregister a state-change listener.
    ///
    /// Fails with `NotFound` for a callback that is not registered.
    pub fn remove_state_listener(&self, listener: &StateListener) -> Result<()> {
        self.notifier.remove_listener(listener)
    }

    /// Start supervision: the reconnection task plus, when a buffer
    /// timeout is configured, the watchdog. Called by the owning graph as
    /// it targets `Playing`.
    pub(crate) fn arm_supervision(&mut self, events: &EventSender) -> Result<()> {
        self.events = events.clone();
        self.supervisor.arm(self.driver.clone(), events.clone())?;
        self.driver.start();
        self.set_state(StreamState::Playing);
        Ok(())
    }

    /// Resume after a pause: restart the stall window and report
    /// `Playing`.
    pub(crate) fn resume_stream(&self) {
        self.state.lock().unwrap().record_buffer();
        self.set_state(StreamState::Playing);
    }

    /// Stop supervision and force the stream down. Idempotent.
    pub(crate) fn disarm_supervision(&mut self) {
        self.supervisor.disarm();
        self.driver.shut_down();
        self.set_state(StreamState::Null);
    }

    /// Whether supervision is currently armed.
    pub fn is_supervised(&self) -> bool {
        self.supervisor.is_armed()
    }
}

impl Linkable for NetworkSource {
    fn link(&mut self) -> Result<()> {
        self.core.link_with(&mut self.chain)
    }

    fn unlink(&mut self) {
        // Unlinking while supervised would leave timers running against a
        // torn-down chain.
        self.disarm_supervision();
        self.core.unlink_with(&mut self.chain);
    }

    fn is_linked(&self) -> bool {
        self.core.component().is_linked()
    }
}

impl FrameRateQueryable for NetworkSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl NetworkHealthManaged for NetworkSource {
    fn buffer_timeout(&self) -> Duration {
        self.state.lock().unwrap().buffer_timeout()
    }

    fn set_buffer_timeout(&mut self, timeout: Duration) {
        self.state.lock().unwrap().set_buffer_timeout(timeout);
        // A changed threshold means a changed watchdog cadence.
        self.supervisor.refresh_watchdog();
    }

    fn is_reconnecting(&self) -> bool {
        self.state.lock().unwrap().connection().is_reconnecting
    }
}

impl SourceComponent for NetworkSource {
    fn source_core(&self) -> &SourceCore {
        &self.core
    }

    fn source_core_mut(&mut self) -> &mut SourceCore {
        &mut self.core
    }
}
