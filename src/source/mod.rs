//! The source-component family.
//!
//! Eight variants share one contract: each assembles a private stage chain
//! but exposes exactly one outbound boundary port (and no inbound port) to
//! the graph, so the graph links every variant the same way.
//!
//! - [`CaptureSource`]: local camera at a fixed hardware index
//! - [`ResourceSource`]: file/URI playback, optional looping
//! - [`NetworkSource`]: decoded network stream with health supervision
//! - [`InterpipeSource`]: named interprocess producer link
//! - [`ImageSource`]: still image or indexed image sequence
//! - [`AppSource`]: application-fed buffer injection with back-pressure
//! - [`CustomSource`]: user-assembled stage chain
//! - [`DuplicateSource`]: shares a named original source's live feed
//!
//! Shared state lives in [`SourceCore`]; the variants add their own
//! configuration on top.

mod app;
mod attach;
mod capture;
mod custom;
mod duplicate;
mod image;
mod interpipe;
mod network;
mod resource;

pub use app::{AppSource, AppSourceHandle, AppSourceStats};
pub use attach::{Dewarper, RecordContainer, RecordTap};
pub use capture::CaptureSource;
pub use custom::CustomSource;
pub use duplicate::DuplicateSource;
pub use image::ImageSource;
pub use interpipe::InterpipeSource;
pub use network::{DataPathHandle, LoopbackDriver, NetworkSource};
pub use resource::ResourceSource;

use crate::component::{ComponentCore, FrameRateQueryable, Linkable, PortSet};
use crate::error::{Error, Result};

/// State common to every source variant.
#[derive(Debug)]
pub struct SourceCore {
    core: ComponentCore,
    is_live: bool,
    width: u32,
    height: u32,
    fps_n: u32,
    fps_d: u32,
    dewarper: Option<Dewarper>,
    tap: Option<RecordTap>,
}

impl SourceCore {
    /// Create a source core. Dimensions and frame rate start at zero
    /// ("not yet known"); variants with fixed geometry set them after.
    pub fn new(name: impl Into<String>, is_live: bool) -> Self {
        Self {
            core: ComponentCore::new(name, PortSet::source()),
            is_live,
            width: 0,
            height: 0,
            fps_n: 0,
            fps_d: 0,
            dewarper: None,
            tap: None,
        }
    }

    /// The component's unique name.
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Whether the source produces live (non-seekable) data.
    pub fn is_live(&self) -> bool {
        self.is_live
    }

    /// Output dimensions as `(width, height)`; `(0, 0)` until known.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frame rate as `(numerator, denominator)`; `(0, 0)` until known.
    pub fn frame_rate(&self) -> (u32, u32) {
        (self.fps_n, self.fps_d)
    }

    /// Set the configured geometry. Only valid while unlinked.
    pub fn set_geometry(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> Result<()> {
        self.core.require_unlinked()?;
        self.set_negotiated_geometry(width, height, fps_n, fps_d);
        Ok(())
    }

    /// Record geometry reported by the stream itself (negotiation), which
    /// may happen at any time.
    pub(crate) fn set_negotiated_geometry(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) {
        self.width = width;
        self.height = height;
        self.fps_n = fps_n;
        self.fps_d = fps_d;
    }

    /// Attach a lens-correction dewarper.
    ///
    /// Fails with `AlreadyLinked` while linked and with
    /// `StructuralConflict` if one is already attached.
    pub fn attach_dewarper(&mut self, dewarper: Dewarper) -> Result<()> {
        self.core.require_unlinked()?;
        if self.dewarper.is_some() {
            return Err(Error::StructuralConflict(format!(
                "source '{}' already has a lens-correction attachment",
                self.name()
            )));
        }
        self.dewarper = Some(dewarper);
        Ok(())
    }

    /// Detach the dewarper. Fails with `NotFound` when none is attached and
    /// `AlreadyLinked` while linked.
    pub fn detach_dewarper(&mut self) -> Result<Dewarper> {
        self.core.require_unlinked()?;
        self.dewarper
            .take()
            .ok_or_else(|| Error::not_found(format!("dewarper on source '{}'", self.name())))
    }

    /// The attached dewarper, if any.
    pub fn dewarper(&self) -> Option<&Dewarper> {
        self.dewarper.as_ref()
    }

    /// Attach a recording tap, with the same rules as the dewarper.
    pub fn attach_tap(&mut self, tap: RecordTap) -> Result<()> {
        self.core.require_unlinked()?;
        if self.tap.is_some() {
            return Err(Error::StructuralConflict(format!(
                "source '{}' already has a recording tap",
                self.name()
            )));
        }
        self.tap = Some(tap);
        Ok(())
    }

    /// Detach the recording tap.
    pub fn detach_tap(&mut self) -> Result<RecordTap> {
        self.core.require_unlinked()?;
        self.tap
            .take()
            .ok_or_else(|| Error::not_found(format!("recording tap on source '{}'", self.name())))
    }

    /// The attached recording tap, if any.
    pub fn tap(&self) -> Option<&RecordTap> {
        self.tap.as_ref()
    }

    /// Shared component state.
    pub fn component(&self) -> &ComponentCore {
        &self.core
    }

    /// Mutable shared component state.
    pub fn component_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    /// Link the variant's chain plus any attachments, then mark linked.
    ///
    /// Unwinds the pieces already wired if a later one fails, so the core
    /// never ends up half-linked.
    pub(crate) fn link_with(&mut self, chain: &mut crate::component::Chain) -> Result<()> {
        self.core.require_unlinked()?;
        chain.link()?;

        if let Some(dewarper) = &mut self.dewarper {
            if let Err(e) = dewarper.link() {
                chain.unlink();
                return Err(e);
            }
        }
        if let Some(tap) = &mut self.tap {
            if let Err(e) = tap.link() {
                if let Some(dewarper) = &mut self.dewarper {
                    dewarper.unlink();
                }
                chain.unlink();
                return Err(e);
            }
        }

        self.core.mark_linked()?;
        crate::observability::record_component_linked();
        Ok(())
    }

    /// Unlink the chain and attachments. Idempotent.
    pub(crate) fn unlink_with(&mut self, chain: &mut crate::component::Chain) {
        if let Some(tap) = &mut self.tap {
            tap.unlink();
        }
        if let Some(dewarper) = &mut self.dewarper {
            dewarper.unlink();
        }
        chain.unlink();
        self.core.mark_unlinked();
    }
}

/// The shared capability set of the source family.
///
/// Everything a graph needs from a source beyond [`Linkable`]: its
/// identity, liveness, and geometry.
pub trait SourceComponent: Linkable + FrameRateQueryable {
    /// Shared source state.
    fn source_core(&self) -> &SourceCore;

    /// Mutable shared source state.
    fn source_core_mut(&mut self) -> &mut SourceCore;

    /// The component's unique name.
    fn name(&self) -> &str {
        self.source_core().name()
    }

    /// Whether the source produces live data.
    fn is_live(&self) -> bool {
        self.source_core().is_live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachments_single_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = SourceCore::new("cam-0", true);

        core.attach_tap(RecordTap::new(dir.path(), RecordContainer::Mp4).unwrap())
            .unwrap();
        let err = core
            .attach_tap(RecordTap::new(dir.path(), RecordContainer::Mp4).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::StructuralConflict(_)));

        core.detach_tap().unwrap();
        assert!(matches!(core.detach_tap(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_attachments_rejected_while_linked() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = SourceCore::new("cam-0", true);
        let mut chain = crate::component::Chain::from_names(["capture", "convert"]);

        core.link_with(&mut chain).unwrap();
        let err = core
            .attach_tap(RecordTap::new(dir.path(), RecordContainer::Mp4).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyLinked(_)));

        core.unlink_with(&mut chain);
        core.attach_tap(RecordTap::new(dir.path(), RecordContainer::Mp4).unwrap())
            .unwrap();
    }

    #[test]
    fn test_geometry_guarded_while_linked() {
        let mut core = SourceCore::new("cam-0", true);
        let mut chain = crate::component::Chain::from_names(["capture"]);

        core.set_geometry(1920, 1080, 30, 1).unwrap();
        assert_eq!(core.dimensions(), (1920, 1080));

        core.link_with(&mut chain).unwrap();
        assert!(core.set_geometry(640, 480, 15, 1).is_err());

        // Negotiation updates are always allowed.
        core.set_negotiated_geometry(640, 480, 15, 1);
        assert_eq!(core.frame_rate(), (15, 1));
    }
}
