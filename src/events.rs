//! Graph event channel.
//!
//! Events are emitted by the graph during lifecycle operations and can be
//! received asynchronously by the caller.

use crate::health::StreamState;
use std::fmt;
use tokio::sync::broadcast;

/// Events emitted by a component graph.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// A component was added to the graph.
    ComponentAdded {
        /// The component's name.
        name: String,
    },

    /// A component was removed from the graph.
    ComponentRemoved {
        /// The component's name.
        name: String,
    },

    /// The graph finished linking all components.
    Linked,

    /// The graph was unlinked.
    Unlinked,

    /// A source's stream state changed.
    StateChanged {
        /// The source whose state changed.
        source: String,
        /// Previous state.
        from: StreamState,
        /// New state.
        to: StreamState,
    },

    /// A source reached end-of-stream.
    Eos {
        /// The source that ended.
        source: String,
    },

    /// Warning (non-fatal issue).
    Warning {
        /// The warning message.
        message: String,
        /// The component that emitted the warning, if known.
        component: Option<String>,
    },
}

impl fmt::Display for GraphEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphEvent::ComponentAdded { name } => write!(f, "component {name} added"),
            GraphEvent::ComponentRemoved { name } => write!(f, "component {name} removed"),
            GraphEvent::Linked => write!(f, "graph linked"),
            GraphEvent::Unlinked => write!(f, "graph unlinked"),
            GraphEvent::StateChanged { source, from, to } => {
                write!(f, "{source}: {from:?} -> {to:?}")
            }
            GraphEvent::Eos { source } => write!(f, "{source}: EOS"),
            GraphEvent::Warning { message, component } => match component {
                Some(c) => write!(f, "warning in {c}: {message}"),
                None => write!(f, "warning: {message}"),
            },
        }
    }
}

/// Sender side of the graph event channel.
///
/// Held by the graph and cloned into timer tasks that need to report.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<GraphEvent>,
}

/// Receiver side of the graph event channel.
pub type EventReceiver = broadcast::Receiver<GraphEvent>;

impl EventSender {
    /// Create a new event sender with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event.
    ///
    /// Returns the number of receivers that saw it; zero receivers is fine.
    pub fn send(&self, event: GraphEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(64)
    }
}
