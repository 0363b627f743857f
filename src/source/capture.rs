//! Local capture source: a camera at a fixed hardware index.

use crate::component::{Chain, FrameRateQueryable, Linkable};
use crate::error::Result;
use crate::ident::{IdentifierAllocator, SENSOR_POOL};
use crate::source::{SourceComponent, SourceCore};
use std::sync::Arc;
use tracing::debug;

/// A live capture source bound to a local sensor.
///
/// Construction allocates the lowest free sensor id from the shared
/// allocator pool; the id is released when the source is dropped, making it
/// available for the next capture source.
#[derive(Debug)]
pub struct CaptureSource {
    core: SourceCore,
    chain: Chain,
    device_index: u32,
    sensor_id: usize,
    allocator: Arc<IdentifierAllocator>,
}

impl CaptureSource {
    /// Create a capture source on the given hardware index.
    ///
    /// Fails with `NameNotUnique` if a capture source of this name already
    /// holds a sensor id.
    pub fn new(
        name: impl Into<String>,
        device_index: u32,
        allocator: Arc<IdentifierAllocator>,
    ) -> Result<Self> {
        let name = name.into();
        let sensor_id = allocator.allocate(SENSOR_POOL, &name)?;
        debug!(source = %name, sensor_id, device_index, "capture source created");

        let mut core = SourceCore::new(name, true);
        // Sensible camera defaults until the caller configures otherwise.
        core.set_geometry(1280, 720, 30, 1)?;

        Ok(Self {
            core,
            chain: Chain::from_names(["capture", "caps", "convert"]),
            device_index,
            sensor_id,
            allocator,
        })
    }

    /// The fixed hardware index this source captures from.
    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    /// The allocated sensor id.
    pub fn sensor_id(&self) -> usize {
        self.sensor_id
    }

    /// Re-bind this source to an explicit sensor id.
    ///
    /// Fails with `NameNotUnique` if the id is held by another source; the
    /// current binding is untouched on failure.
    pub fn set_sensor_id(&mut self, id: usize) -> Result<()> {
        self.allocator
            .set_explicit(SENSOR_POOL, self.core.name(), id)?;
        self.sensor_id = id;
        Ok(())
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        // The binding may already be gone if the allocator outlived a
        // manual free; nothing to do then.
        let _ = self.allocator.free(SENSOR_POOL, self.core.name());
    }
}

impl Linkable for CaptureSource {
    fn link(&mut self) -> Result<()> {
        self.core.link_with(&mut self.chain)
    }

    fn unlink(&mut self) {
        self.core.unlink_with(&mut self.chain);
    }

    fn is_linked(&self) -> bool {
        self.core.component().is_linked()
    }
}

impl FrameRateQueryable for CaptureSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl SourceComponent for CaptureSource {
    fn source_core(&self) -> &SourceCore {
        &self.core
    }

    fn source_core_mut(&mut self) -> &mut SourceCore {
        &mut self.core
    }
}
