//! Resource-backed source: file or URI playback.

use crate::component::{Chain, FrameRateQueryable, Linkable};
use crate::error::{Error, Result};
use crate::source::{SourceComponent, SourceCore};
use std::path::{Path, PathBuf};

/// A non-live source playing back a local media file.
///
/// The backing file must exist when set; until a path is configured the
/// source reports itself unlinkable and the graph refuses to link it.
#[derive(Debug)]
pub struct ResourceSource {
    core: SourceCore,
    chain: Chain,
    path: Option<PathBuf>,
    loop_enabled: bool,
}

impl ResourceSource {
    /// Create a resource source backed by `path`.
    ///
    /// Fails with `ResourceUnavailable` if the file does not exist.
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let mut source = Self::unconfigured(name);
        source.set_path(path)?;
        Ok(source)
    }

    /// Create a resource source with no backing file yet.
    ///
    /// The source is not linkable until [`set_path`] succeeds.
    ///
    /// [`set_path`]: ResourceSource::set_path
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            core: SourceCore::new(name, false),
            chain: Chain::from_names(["filesrc", "parse", "decode"]),
            path: None,
            loop_enabled: false,
        }
    }

    /// The configured media file, if set.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Point the source at a different media file.
    ///
    /// Fails with `ResourceUnavailable` when the file is missing (the prior
    /// path stays configured) and `AlreadyLinked` while linked.
    pub fn set_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.core.component().require_unlinked()?;
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::ResourceUnavailable(format!(
                "media file '{}' does not exist",
                path.display()
            )));
        }
        self.path = Some(path);
        Ok(())
    }

    /// Whether playback restarts from the beginning at end-of-stream.
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Enable or disable looping playback.
    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }
}

impl Linkable for ResourceSource {
    fn link(&mut self) -> Result<()> {
        if !self.is_linkable() {
            return Err(Error::ResourceUnavailable(format!(
                "source '{}' has no media file configured",
                self.core.name()
            )));
        }
        self.core.link_with(&mut self.chain)
    }

    fn unlink(&mut self) {
        self.core.unlink_with(&mut self.chain);
    }

    fn is_linked(&self) -> bool {
        self.core.component().is_linked()
    }

    fn is_linkable(&self) -> bool {
        self.path.is_some()
    }
}

impl FrameRateQueryable for ResourceSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl SourceComponent for ResourceSource {
    fn source_core(&self) -> &SourceCore {
        &self.core
    }

    fn source_core_mut(&mut self) -> &mut SourceCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_construction() {
        let err = ResourceSource::new("file-0", "/nonexistent/clip.mp4").unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable(_)));
    }

    #[test]
    fn test_valid_file_links() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut src = ResourceSource::new("file-0", file.path()).unwrap();

        assert!(src.is_linkable());
        assert!(!src.is_live());
        src.link().unwrap();
        assert!(src.is_linked());

        src.unlink();
        assert!(!src.is_linked());
        src.unlink(); // no-op
    }

    #[test]
    fn test_unconfigured_is_not_linkable() {
        let mut src = ResourceSource::unconfigured("file-0");
        assert!(!src.is_linkable());
        assert!(matches!(src.link(), Err(Error::ResourceUnavailable(_))));
    }

    #[test]
    fn test_failed_set_path_keeps_prior() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut src = ResourceSource::new("file-0", file.path()).unwrap();

        assert!(src.set_path("/nonexistent/other.mp4").is_err());
        assert_eq!(src.path(), Some(file.path()));
    }

    #[test]
    fn test_set_path_rejected_while_linked() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let other = tempfile::NamedTempFile::new().unwrap();
        let mut src = ResourceSource::new("file-0", file.path()).unwrap();

        src.link().unwrap();
        assert!(matches!(
            src.set_path(other.path()),
            Err(Error::AlreadyLinked(_))
        ));
    }

    #[test]
    fn test_loop_flag() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut src = ResourceSource::new("file-0", file.path()).unwrap();
        assert!(!src.loop_enabled());
        src.set_loop_enabled(true);
        assert!(src.loop_enabled());
    }
}
