//! Reconnection cycle for network stream sources.
//!
//! After the watchdog declares a stall, the reconnection manager drives a
//! stop→restart cycle against the source's stream driver: force the driver
//! to `Null`, restart it, and wait — bounded by the configured timeout — for
//! it to report `Playing`. Failed attempts sleep and retry, by default
//! forever; success clears the in-flight flag and the retry counter.
//!
//! The manager runs as one task per source, fed by a bounded command
//! channel. Parameter changes and teardown arrive as commands, so an
//! in-flight wait or sleep is abandoned at the next select point rather
//! than interrupted by force.

use crate::error::Result;
use crate::events::{EventSender, GraphEvent};
use crate::health::notify::ListenerNotifier;
use crate::health::state::{SharedHealth, StreamState};
use kanal::{bounded_async, AsyncReceiver, AsyncSender};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// How often the cycle re-checks the driver while waiting for `Playing`.
const STATE_POLL: Duration = Duration::from_millis(50);

/// Boundary to the actual connection machinery of a network source.
///
/// The transport and decode wiring live below this crate; supervision only
/// needs to stop the stream, start it, and observe what state it reached.
/// Implementations must be cheap to call and must not block.
pub trait StreamDriver: Send + Sync {
    /// Force the stream down to `Null`, releasing the connection.
    fn shut_down(&self);

    /// Begin (re)connecting. Completion is observed via [`state`].
    ///
    /// [`state`]: StreamDriver::state
    fn start(&self);

    /// The state the driver has currently reached.
    fn state(&self) -> StreamState;
}

/// Commands accepted by the reconnection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Start a reconnection cycle (sent by the watchdog).
    Begin,
    /// Reconnection parameters changed; abort the current wait and restart
    /// the cycle with the new values.
    ParamsChanged,
    /// Tear the task down.
    Shutdown,
}

enum CycleEnd {
    /// Driver reached `Playing` (or the retry bound ended the cycle).
    Done,
    /// A shutdown command arrived mid-cycle.
    Shutdown,
}

/// Spawn the reconnection task for one source.
///
/// Returns the command sender and the task handle. Must be called from
/// within a Tokio runtime.
pub(crate) fn spawn_manager(
    source: String,
    state: SharedHealth,
    driver: Arc<dyn StreamDriver>,
    notifier: ListenerNotifier,
    events: EventSender,
) -> (AsyncSender<Command>, JoinHandle<()>) {
    let (tx, rx) = bounded_async(8);
    let handle = tokio::spawn(run(source, state, driver, notifier, events, rx));
    (tx, handle)
}

async fn run(
    source: String,
    state: SharedHealth,
    driver: Arc<dyn StreamDriver>,
    notifier: ListenerNotifier,
    events: EventSender,
    rx: AsyncReceiver<Command>,
) {
    loop {
        match rx.recv().await {
            Ok(Command::Begin) => {
                let end = run_cycle(&source, &state, &driver, &notifier, &events, &rx).await;
                if matches!(end, CycleEnd::Shutdown) {
                    return;
                }
            }
            // No cycle in flight; new parameters apply on the next Begin.
            Ok(Command::ParamsChanged) => {}
            Ok(Command::Shutdown) | Err(_) => return,
        }
    }
}

/// One reconnection cycle: stop, restart, bounded wait, retry on failure.
async fn run_cycle(
    source: &str,
    state: &SharedHealth,
    driver: &Arc<dyn StreamDriver>,
    notifier: &ListenerNotifier,
    events: &EventSender,
    rx: &AsyncReceiver<Command>,
) -> CycleEnd {
    loop {
        let params = state.lock().unwrap().params();

        debug!(source, ?params, "reconnection attempt starting");
        crate::observability::record_reconnect_attempt();

        // Step 1: forced stop.
        driver.shut_down();
        apply_state(state, notifier, events, source, StreamState::Null);
        let attempt_started = Instant::now();

        // Step 2: restart, bounded by `timeout` from cycle start.
        driver.start();
        let reached_playing = async {
            loop {
                if driver.state() == StreamState::Playing {
                    return;
                }
                sleep(STATE_POLL).await;
            }
        };

        let waited = tokio::select! {
            outcome = timeout(params.timeout, reached_playing) => Some(outcome.is_ok()),
            cmd = rx.recv() => match cmd {
                // New parameters: abandon this wait, restart the cycle.
                Ok(Command::ParamsChanged) => None,
                Ok(Command::Shutdown) | Err(_) => return CycleEnd::Shutdown,
                // A Begin while already cycling is the watchdog re-firing;
                // the re-entrancy guard upstream makes this unreachable,
                // but swallowing it is harmless.
                Ok(Command::Begin) => None,
            },
        };

        match waited {
            // Step 3: success.
            Some(true) => {
                let transition = {
                    let mut guard = state.lock().unwrap();
                    let now = SystemTime::now();
                    let conn = guard.connection_mut();
                    conn.is_reconnecting = false;
                    conn.retries = 0;
                    conn.last_connected = Some(now);
                    conn.first_connected.get_or_insert(now);
                    guard.record_buffer();
                    guard.set_state(StreamState::Playing)
                };
                dispatch(transition, notifier, events, source);
                crate::observability::record_reconnect_success();
                debug!(
                    source,
                    elapsed = ?attempt_started.elapsed(),
                    "reconnection succeeded"
                );
                return CycleEnd::Done;
            }

            // Step 4: timeout elapsed without reaching Playing.
            Some(false) => {
                let (retries, bound_hit) = {
                    let mut guard = state.lock().unwrap();
                    let max = guard.params().max_retries;
                    let conn = guard.connection_mut();
                    conn.retries += 1;
                    let bound_hit = max.is_some_and(|m| conn.retries >= m);
                    if bound_hit {
                        conn.is_reconnecting = false;
                    }
                    (conn.retries, bound_hit)
                };

                if bound_hit {
                    warn!(source, retries, "reconnection retry bound reached; giving up");
                    events.send(GraphEvent::Warning {
                        message: format!("reconnection abandoned after {retries} retries"),
                        component: Some(source.to_string()),
                    });
                    return CycleEnd::Done;
                }

                warn!(source, retries, "reconnection attempt timed out; retrying");

                // Inter-attempt sleep, also abandoned on command arrival.
                tokio::select! {
                    _ = sleep(params.sleep) => {}
                    cmd = rx.recv() => match cmd {
                        Ok(Command::ParamsChanged) | Ok(Command::Begin) => {}
                        Ok(Command::Shutdown) | Err(_) => return CycleEnd::Shutdown,
                    },
                }
            }

            // Step 5: parameters changed mid-wait; restart immediately.
            None => {
                debug!(source, "reconnection parameters changed; restarting cycle");
            }
        }
    }
}

/// Apply a state change and fan out the transition if it was not a no-op.
pub(crate) fn apply_state(
    state: &SharedHealth,
    notifier: &ListenerNotifier,
    events: &EventSender,
    source: &str,
    new: StreamState,
) {
    let transition = state.lock().unwrap().set_state(new);
    dispatch(transition, notifier, events, source);
}

fn dispatch(
    transition: Option<crate::health::state::StateTransition>,
    notifier: &ListenerNotifier,
    events: &EventSender,
    source: &str,
) {
    if let Some(t) = transition {
        notifier.enqueue(t);
        events.send(GraphEvent::StateChanged {
            source: source.to_string(),
            from: t.previous,
            to: t.current,
        });
    }
}

/// Best-effort command push from synchronous control-plane code.
pub(crate) fn send_command(tx: &AsyncSender<Command>, cmd: Command) -> Result<()> {
    // The channel is bounded but shallow traffic; a full queue only means
    // the task already has work pending, which is equivalent for our
    // commands.
    let _ = tx.as_sync().try_send(cmd);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::{shared_health, ReconnectionParams};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Driver that reaches Playing after a configurable number of starts.
    struct ScriptedDriver {
        starts: AtomicU32,
        succeed_on: u32,
        state: StdMutex<StreamState>,
    }

    impl ScriptedDriver {
        fn succeeding_after(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                starts: AtomicU32::new(0),
                succeed_on: failures + 1,
                state: StdMutex::new(StreamState::Null),
            })
        }
    }

    impl StreamDriver for ScriptedDriver {
        fn shut_down(&self) {
            *self.state.lock().unwrap() = StreamState::Null;
        }

        fn start(&self) {
            let n = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                *self.state.lock().unwrap() = StreamState::Playing;
            }
        }

        fn state(&self) -> StreamState {
            *self.state.lock().unwrap()
        }
    }

    fn fast_params() -> ReconnectionParams {
        ReconnectionParams {
            sleep: Duration::from_millis(100),
            timeout: Duration::from_millis(500),
            max_retries: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_succeeds_first_attempt() {
        let state = shared_health();
        state.lock().unwrap().set_params(fast_params()).unwrap();
        state.lock().unwrap().connection_mut().is_reconnecting = true;

        let driver = ScriptedDriver::succeeding_after(0);
        let notifier = ListenerNotifier::new();
        let events = EventSender::new(16);
        let (tx, handle) =
            spawn_manager("cam".into(), state.clone(), driver, notifier, events);

        tx.send(Command::Begin).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        {
            let guard = state.lock().unwrap();
            let conn = guard.connection();
            assert!(!conn.is_reconnecting);
            assert_eq!(conn.retries, 0);
            assert!(conn.last_connected.is_some());
            assert!(conn.first_connected.is_some());
            assert_eq!(guard.current(), StreamState::Playing);
        }

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_retries_until_success() {
        let state = shared_health();
        state.lock().unwrap().set_params(fast_params()).unwrap();
        state.lock().unwrap().connection_mut().is_reconnecting = true;

        let driver = ScriptedDriver::succeeding_after(3);
        let notifier = ListenerNotifier::new();
        let events = EventSender::new(16);
        let (tx, handle) = spawn_manager(
            "cam".into(),
            state.clone(),
            driver.clone(),
            notifier,
            events,
        );

        tx.send(Command::Begin).await.unwrap();
        // Three failed attempts (timeout + sleep each), then success.
        tokio::time::sleep(Duration::from_secs(5)).await;

        {
            let guard = state.lock().unwrap();
            assert_eq!(guard.current(), StreamState::Playing);
            let conn = guard.connection();
            assert!(!conn.is_reconnecting);
            assert_eq!(conn.retries, 0, "retries reset on success");
        }
        assert_eq!(driver.starts.load(Ordering::SeqCst), 4);

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_ends_cycle() {
        let state = shared_health();
        state
            .lock()
            .unwrap()
            .set_params(ReconnectionParams {
                max_retries: Some(2),
                ..fast_params()
            })
            .unwrap();
        state.lock().unwrap().connection_mut().is_reconnecting = true;

        let driver = ScriptedDriver::succeeding_after(100); // never succeeds
        let notifier = ListenerNotifier::new();
        let events = EventSender::new(16);
        let mut warnings = events.subscribe();
        let (tx, handle) =
            spawn_manager("cam".into(), state.clone(), driver, notifier, events);

        tx.send(Command::Begin).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        {
            let guard = state.lock().unwrap();
            let conn = guard.connection();
            assert!(!conn.is_reconnecting, "bound clears the in-flight flag");
            assert_eq!(conn.retries, 2);
            assert_eq!(guard.current(), StreamState::Null);
        }

        // A warning event marks the abandonment.
        let mut saw_warning = false;
        while let Ok(event) = warnings.try_recv() {
            if matches!(event, GraphEvent::Warning { .. }) {
                saw_warning = true;
            }
        }
        assert!(saw_warning);

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_params_change_restarts_in_flight_cycle() {
        let state = shared_health();
        state
            .lock()
            .unwrap()
            .set_params(ReconnectionParams {
                sleep: Duration::from_secs(30),
                timeout: Duration::from_secs(3600), // wedge the first wait
                max_retries: None,
            })
            .unwrap();
        state.lock().unwrap().connection_mut().is_reconnecting = true;

        // Succeeds on the second start, which only happens if the cycle
        // restarts.
        let driver = ScriptedDriver::succeeding_after(1);
        let notifier = ListenerNotifier::new();
        let events = EventSender::new(16);
        let (tx, handle) = spawn_manager(
            "cam".into(),
            state.clone(),
            driver.clone(),
            notifier,
            events,
        );

        tx.send(Command::Begin).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(driver.starts.load(Ordering::SeqCst), 1);
        assert_eq!(state.lock().unwrap().current(), StreamState::Null);

        // Shorten the params mid-wait; the cycle must restart immediately.
        state.lock().unwrap().set_params(fast_params()).unwrap();
        tx.send(Command::ParamsChanged).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(driver.starts.load(Ordering::SeqCst), 2);
        assert_eq!(state.lock().unwrap().current(), StreamState::Playing);

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_notifies_listeners() {
        let state = shared_health();
        state.lock().unwrap().set_params(fast_params()).unwrap();
        state.lock().unwrap().connection_mut().is_reconnecting = true;

        let notifier = ListenerNotifier::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = seen.clone();
        notifier
            .add_listener(Arc::new(move |t| {
                if t.current == StreamState::Playing {
                    seen_in.fetch_add(1, Ordering::SeqCst);
                }
            }))
            .unwrap();

        let driver = ScriptedDriver::succeeding_after(0);
        let events = EventSender::new(16);
        let (tx, handle) = spawn_manager(
            "cam".into(),
            state.clone(),
            driver,
            notifier.clone(),
            events,
        );

        tx.send(Command::Begin).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }
}
