//! Component system for Headwater graphs.
//!
//! This module defines what every graph component shares:
//!
//! - [`ComponentCore`]: name, parent back-reference, linked flag, ports
//! - [`BoundaryPort`] / [`PortSet`]: the external connection points
//! - [`Chain`] / [`Stage`]: the private processing chain wired on link
//! - [`Linkable`], [`FrameRateQueryable`], [`NetworkHealthManaged`]:
//!   capability traits the graph dispatches through
//! - [`ComponentClass`]: structural classification and singleton rules
//!
//! # Design
//!
//! A component's internals stay private; the graph only sees the boundary
//! ports and the capability traits. Variant dispatch is a closed enum match
//! or a trait call — there are no runtime downcasts anywhere in the crate.

mod base;
mod chain;
mod port;
mod singletons;
mod traits;

pub use base::ComponentCore;
pub use chain::{Chain, Stage};
pub use port::{BoundaryPort, PortDirection, PortSet};
pub use singletons::{FrameDemux, Overlay, Tiler};
pub use traits::{ComponentClass, FrameRateQueryable, Linkable, NetworkHealthManaged};
