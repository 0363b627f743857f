//! # Headwater
//!
//! Source-graph orchestration and stream-health supervision for media
//! pipelines.
//!
//! Headwater composes independent, swappable source components (camera,
//! file, network, interprocess, image, application-fed, custom, duplicate)
//! into a runnable [`ComponentGraph`], and supervises network stream
//! sources for connection health: a per-source watchdog detects stalled
//! buffer arrival, a reconnection manager drives the stop→restart retry
//! cycle, and registered client listeners are notified asynchronously of
//! every state transition.
//!
//! ## Features
//!
//! - **Uniform linking**: every source variant exposes one outbound
//!   boundary port, so the graph links them all the same way
//! - **Structural safety**: singleton components and illegal combinations
//!   are rejected at add time, before any mutation
//! - **Health supervision**: watchdog + reconnection per network source,
//!   on per-source locks that never contend with graph operations
//! - **Ordered notification**: state transitions reach listeners exactly
//!   once each, in order, with no overlap per source
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use headwater::prelude::*;
//!
//! let mut graph = ComponentGraph::new("main");
//! graph.add(ComponentSlot::Network(NetworkSource::new(
//!     "rtsp-0",
//!     "rtsp://camera.local/stream",
//! )?))?;
//! graph.link_all()?;
//! graph.play()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod component;
pub mod error;
pub mod events;
pub mod graph;
pub mod health;
pub mod ident;
pub mod observability;
pub mod source;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::{Buffer, Metadata};
    pub use crate::component::{ComponentClass, FrameRateQueryable, Linkable};
    pub use crate::error::{Error, Result};
    pub use crate::graph::{ComponentGraph, ComponentSlot, GraphState, LinkOrder};
    pub use crate::health::{ReconnectionParams, StateTransition, StreamState};
    pub use crate::ident::IdentifierAllocator;
    pub use crate::source::{
        AppSource, CaptureSource, CustomSource, DuplicateSource, ImageSource, InterpipeSource,
        NetworkSource, ResourceSource, SourceComponent,
    };
}

pub use error::{Error, Result};
