//! Asynchronous state-change listener notification.
//!
//! Clients register callbacks against a network source; every state
//! transition is delivered to each registrant exactly once, in transition
//! order, by a one-shot drain task. At most one drain task is in flight per
//! source, so notifications for one source never overlap. The task snapshots
//! the registrant set before invoking anyone, which makes concurrent
//! add/remove safe by construction.

use crate::error::{Error, Result};
use crate::health::state::StateTransition;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// A client state-change callback.
///
/// Identity (the `Arc` pointer) is the registration key: registering two
/// clones of the same `Arc` fails, two separately built closures are two
/// registrations. Client context travels as closure capture.
pub type StateListener = Arc<dyn Fn(StateTransition) + Send + Sync>;

#[derive(Default)]
struct NotifierInner {
    listeners: Vec<StateListener>,
    queue: VecDeque<StateTransition>,
    /// True while a drain task is alive. Guarded by the same lock as the
    /// queue so the "queue empty, task exits" decision is atomic.
    draining: bool,
}

/// Queues state transitions and asynchronously invokes registered listeners.
#[derive(Clone, Default)]
pub struct ListenerNotifier {
    inner: Arc<Mutex<NotifierInner>>,
}

impl ListenerNotifier {
    /// Create a notifier with no registrants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    ///
    /// Fails with `AlreadyRegistered` when the identical callback (same
    /// `Arc`) is already present.
    pub fn add_listener(&self, listener: StateListener) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return Err(Error::AlreadyRegistered);
        }
        inner.listeners.push(listener);
        Ok(())
    }

    /// Unregister a listener.
    ///
    /// Fails with `NotFound` when the callback is not registered.
    pub fn remove_listener(&self, listener: &StateListener) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let idx = inner
            .listeners
            .iter()
            .position(|l| Arc::ptr_eq(l, listener))
            .ok_or_else(|| Error::not_found("state-change listener"))?;
        inner.listeners.remove(idx);
        Ok(())
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().unwrap().listeners.len()
    }

    /// Queue a transition for delivery and make sure a drain task is
    /// running.
    ///
    /// Inside a Tokio runtime delivery is asynchronous; without one (e.g.
    /// teardown from synchronous control code) the queue drains inline.
    pub fn enqueue(&self, transition: StateTransition) {
        let spawn_drain = {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.push_back(transition);
            if inner.draining {
                false
            } else {
                inner.draining = true;
                true
            }
        };

        if spawn_drain {
            let notifier = self.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        notifier.drain();
                    });
                }
                Err(_) => notifier.drain(),
            }
        }
    }

    /// Deliver queued transitions until the queue is empty.
    ///
    /// Each transition is delivered to a snapshot of the registrant set,
    /// taken under the lock but invoked outside it.
    fn drain(&self) {
        loop {
            let (transition, snapshot) = {
                let mut inner = self.inner.lock().unwrap();
                match inner.queue.pop_front() {
                    Some(t) => (t, inner.listeners.clone()),
                    None => {
                        // Queue drained; the task retires under the lock so
                        // a concurrent enqueue either sees the flag still
                        // set or spawns a fresh task.
                        inner.draining = false;
                        return;
                    }
                }
            };

            trace!(
                from = ?transition.previous,
                to = ?transition.current,
                listeners = snapshot.len(),
                "delivering state transition"
            );
            crate::observability::record_notification(snapshot.len());

            for listener in &snapshot {
                listener(transition);
            }
        }
    }

    /// Pending (undelivered) transition count. Test and diagnostic use.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::StreamState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    fn transition(previous: StreamState, current: StreamState) -> StateTransition {
        StateTransition { previous, current }
    }

    fn counting_listener(hits: Arc<AtomicUsize>) -> StateListener {
        Arc::new(move |_t| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let notifier = ListenerNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(hits);

        notifier.add_listener(listener.clone()).unwrap();
        assert!(matches!(
            notifier.add_listener(listener.clone()),
            Err(Error::AlreadyRegistered)
        ));
        assert_eq!(notifier.listener_count(), 1);

        notifier.remove_listener(&listener).unwrap();
        assert!(matches!(
            notifier.remove_listener(&listener),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_distinct_closures_are_distinct_registrations() {
        let notifier = ListenerNotifier::new();
        let a: StateListener = Arc::new(|_t| {});
        let b: StateListener = Arc::new(|_t| {});
        notifier.add_listener(a).unwrap();
        notifier.add_listener(b).unwrap();
        assert_eq!(notifier.listener_count(), 2);
    }

    #[tokio::test]
    async fn test_each_transition_delivered_once_per_listener() {
        let notifier = ListenerNotifier::new();
        let hits_a = Arc::new(AtomicUsize::new(0));
        let hits_b = Arc::new(AtomicUsize::new(0));
        notifier.add_listener(counting_listener(hits_a.clone())).unwrap();
        notifier.add_listener(counting_listener(hits_b.clone())).unwrap();

        notifier.enqueue(transition(StreamState::Null, StreamState::Ready));
        notifier.enqueue(transition(StreamState::Ready, StreamState::Playing));

        // Let the drain task run.
        while notifier.pending() > 0 {
            sleep(Duration::from_millis(1)).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(hits_a.load(Ordering::SeqCst), 2);
        assert_eq!(hits_b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delivery_preserves_order() {
        let notifier = ListenerNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = seen.clone();
        notifier
            .add_listener(Arc::new(move |t| {
                seen_in.lock().unwrap().push(t.current);
            }))
            .unwrap();

        notifier.enqueue(transition(StreamState::Null, StreamState::Ready));
        notifier.enqueue(transition(StreamState::Ready, StreamState::Paused));
        notifier.enqueue(transition(StreamState::Paused, StreamState::Playing));

        while notifier.pending() > 0 {
            sleep(Duration::from_millis(1)).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![StreamState::Ready, StreamState::Paused, StreamState::Playing]
        );
    }

    #[tokio::test]
    async fn test_mutation_during_delivery_is_safe() {
        let notifier = ListenerNotifier::new();

        // This listener removes itself when invoked; the snapshot rule
        // means the in-flight delivery still completes.
        let notifier_in = notifier.clone();
        let slot: Arc<Mutex<Option<StateListener>>> = Arc::new(Mutex::new(None));
        let slot_in = slot.clone();
        let listener: StateListener = Arc::new(move |_t| {
            if let Some(me) = slot_in.lock().unwrap().take() {
                let _ = notifier_in.remove_listener(&me);
            }
        });
        *slot.lock().unwrap() = Some(listener.clone());
        notifier.add_listener(listener).unwrap();

        notifier.enqueue(transition(StreamState::Null, StreamState::Playing));

        while notifier.pending() > 0 {
            sleep(Duration::from_millis(1)).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(notifier.listener_count(), 0);
    }
}
