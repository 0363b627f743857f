//! Duplicate source: shares a named original source's live feed.

use crate::component::{Chain, FrameRateQueryable, Linkable};
use crate::error::Result;
use crate::source::{SourceComponent, SourceCore};

/// A source mirroring the live data of another source in the same graph.
///
/// Many duplicates may reference one original. The original is resolved by
/// name when the graph links; an unset name leaves the duplicate
/// unlinkable.
#[derive(Debug)]
pub struct DuplicateSource {
    core: SourceCore,
    chain: Chain,
    original: String,
}

impl DuplicateSource {
    /// Create a duplicate of the named original source.
    pub fn new(name: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            core: SourceCore::new(name, true),
            chain: Chain::from_names(["mirror", "queue"]),
            original: original.into(),
        }
    }

    /// The original source this duplicate mirrors.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Re-point the duplicate at a different original. Only valid while
    /// unlinked.
    pub fn set_original(&mut self, original: impl Into<String>) -> Result<()> {
        self.core.component().require_unlinked()?;
        self.original = original.into();
        Ok(())
    }
}

impl Linkable for DuplicateSource {
    fn link(&mut self) -> Result<()> {
        self.core.link_with(&mut self.chain)
    }

    fn unlink(&mut self) {
        self.core.unlink_with(&mut self.chain);
    }

    fn is_linked(&self) -> bool {
        self.core.component().is_linked()
    }

    fn is_linkable(&self) -> bool {
        !self.original.is_empty()
    }
}

impl FrameRateQueryable for DuplicateSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl SourceComponent for DuplicateSource {
    fn source_core(&self) -> &SourceCore {
        &self.core
    }

    fn source_core_mut(&mut self) -> &mut SourceCore {
        &mut self.core
    }
}
