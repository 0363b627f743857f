//! Singleton-class graph components: tiler, overlay, frame demultiplexer.
//!
//! These are structural participants in the graph — the media work inside
//! them belongs to the layer below. What matters here is that each carries a
//! real core, chain, and port shape so the graph can link them uniformly,
//! and that their classes enforce the at-most-one and tiler-vs-demuxer
//! rules.

use crate::component::base::ComponentCore;
use crate::component::chain::Chain;
use crate::component::port::{BoundaryPort, PortDirection, PortSet};
use crate::component::traits::{ComponentClass, Linkable};
use crate::error::Result;

/// Video tiler: composes all source streams into one tiled frame.
#[derive(Debug)]
pub struct Tiler {
    core: ComponentCore,
    chain: Chain,
    rows: u32,
    columns: u32,
}

impl Tiler {
    /// Create a tiler with the given grid shape.
    pub fn new(name: impl Into<String>, rows: u32, columns: u32) -> Self {
        Self {
            core: ComponentCore::new(name, PortSet::pass_through()),
            chain: Chain::from_names(["queue", "tiler"]),
            rows,
            columns,
        }
    }

    /// The grid shape as `(rows, columns)`.
    pub fn grid(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    /// Shared component state.
    pub fn core(&self) -> &ComponentCore {
        &self.core
    }

    /// Mutable shared component state.
    pub fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    /// Structural class of this component.
    pub fn class(&self) -> ComponentClass {
        ComponentClass::Tiler
    }
}

impl Linkable for Tiler {
    fn link(&mut self) -> Result<()> {
        self.core.require_unlinked()?;
        self.chain.link()?;
        self.core.mark_linked()
    }

    fn unlink(&mut self) {
        self.chain.unlink();
        self.core.mark_unlinked();
    }

    fn is_linked(&self) -> bool {
        self.core.is_linked()
    }
}

/// On-screen overlay: draws labels and shapes onto the composed frame.
#[derive(Debug)]
pub struct Overlay {
    core: ComponentCore,
    chain: Chain,
    clock_enabled: bool,
}

impl Overlay {
    /// Create an overlay component.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ComponentCore::new(name, PortSet::pass_through()),
            chain: Chain::from_names(["queue", "convert", "overlay"]),
            clock_enabled: false,
        }
    }

    /// Whether the clock readout is drawn.
    pub fn clock_enabled(&self) -> bool {
        self.clock_enabled
    }

    /// Enable or disable the clock readout.
    pub fn set_clock_enabled(&mut self, enabled: bool) {
        self.clock_enabled = enabled;
    }

    /// Shared component state.
    pub fn core(&self) -> &ComponentCore {
        &self.core
    }

    /// Mutable shared component state.
    pub fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    /// Structural class of this component.
    pub fn class(&self) -> ComponentClass {
        ComponentClass::Overlay
    }
}

impl Linkable for Overlay {
    fn link(&mut self) -> Result<()> {
        self.core.require_unlinked()?;
        self.chain.link()?;
        self.core.mark_linked()
    }

    fn unlink(&mut self) {
        self.chain.unlink();
        self.core.mark_unlinked();
    }

    fn is_linked(&self) -> bool {
        self.core.is_linked()
    }
}

/// Frame demultiplexer: splits the batched stream back into one outbound
/// port per source (a fan-out component with a named port set).
#[derive(Debug)]
pub struct FrameDemux {
    core: ComponentCore,
    chain: Chain,
    branches: u32,
}

impl FrameDemux {
    /// Create a demultiplexer with `branches` outbound ports.
    pub fn new(name: impl Into<String>, branches: u32) -> Self {
        let mut ports = PortSet::new();
        ports.add(BoundaryPort::inbound());
        for i in 0..branches {
            ports.add(BoundaryPort::new(
                format!("out_{i}"),
                PortDirection::Outbound,
            ));
        }

        Self {
            core: ComponentCore::new(name, ports),
            chain: Chain::from_names(["queue", "demux"]),
            branches,
        }
    }

    /// Number of outbound branches.
    pub fn branches(&self) -> u32 {
        self.branches
    }

    /// Shared component state.
    pub fn core(&self) -> &ComponentCore {
        &self.core
    }

    /// Mutable shared component state.
    pub fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    /// Structural class of this component.
    pub fn class(&self) -> ComponentClass {
        ComponentClass::Demuxer
    }
}

impl Linkable for FrameDemux {
    fn link(&mut self) -> Result<()> {
        self.core.require_unlinked()?;
        self.chain.link()?;
        self.core.mark_linked()
    }

    fn unlink(&mut self) {
        self.chain.unlink();
        self.core.mark_unlinked();
    }

    fn is_linked(&self) -> bool {
        self.core.is_linked()
    }
}
