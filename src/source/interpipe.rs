//! Interprocess source: consumes a named producer's stream.

use crate::component::{Chain, FrameRateQueryable, Linkable};
use crate::error::Result;
use crate::source::{SourceComponent, SourceCore};

/// A live source fed by a named interprocess producer.
///
/// The producer link can be re-targeted while playing; the flags control
/// whether end-of-stream and other events propagate across the link.
#[derive(Debug)]
pub struct InterpipeSource {
    core: SourceCore,
    chain: Chain,
    listen_to: String,
    accept_eos: bool,
    accept_events: bool,
}

impl InterpipeSource {
    /// Create an interpipe source listening to the named producer.
    pub fn new(name: impl Into<String>, listen_to: impl Into<String>) -> Self {
        Self {
            core: SourceCore::new(name, true),
            chain: Chain::from_names(["ipcrecv", "caps"]),
            listen_to: listen_to.into(),
            accept_eos: true,
            accept_events: true,
        }
    }

    /// The producer this source listens to.
    pub fn listen_to(&self) -> &str {
        &self.listen_to
    }

    /// Re-target the producer link. Allowed at any time, including while
    /// playing.
    pub fn set_listen_to(&mut self, producer: impl Into<String>) {
        self.listen_to = producer.into();
    }

    /// Whether end-of-stream propagates from the producer.
    pub fn accept_eos(&self) -> bool {
        self.accept_eos
    }

    /// Control end-of-stream propagation.
    pub fn set_accept_eos(&mut self, accept: bool) {
        self.accept_eos = accept;
    }

    /// Whether other events propagate from the producer.
    pub fn accept_events(&self) -> bool {
        self.accept_events
    }

    /// Control event propagation.
    pub fn set_accept_events(&mut self, accept: bool) {
        self.accept_events = accept;
    }
}

impl Linkable for InterpipeSource {
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

impl FrameRateQueryable for InterpipeSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl SourceComponent for InterpipeSource {
    fn source_core(&self) -> &SourceCore {
        &self.core
    }

    fn source_core_mut(&mut self) -> &mut SourceCore {
        &mut self.core
    }
}
