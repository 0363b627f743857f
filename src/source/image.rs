//! Still-image and image-sequence source.

use crate::component::{Chain, FrameRateQueryable, Linkable};
use crate::error::{Error, Result};
use crate::events::{EventSender, GraphEvent};
use crate::source::{SourceComponent, SourceCore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// A source playing a single still image or an indexed image sequence.
///
/// An optional display timeout self-triggers end-of-stream: a one-shot
/// timer armed when the graph starts playing emits an EOS event after the
/// configured duration.
#[derive(Debug)]
pub struct ImageSource {
    core: SourceCore,
    chain: Chain,
    path: Option<PathBuf>,
    loop_enabled: bool,
    start_index: Option<u32>,
    stop_index: Option<u32>,
    display_timeout: Option<Duration>,
    eos_timer: Option<JoinHandle<()>>,
}

impl ImageSource {
    /// Create an image source backed by `path` (a file, or a printf-style
    /// pattern for sequences).
    ///
    /// A plain path must exist; a pattern (containing `%`) is resolved by
    /// the decode layer and is accepted as-is.
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let mut source = Self::unconfigured(name);
        source.set_path(path)?;
        Ok(source)
    }

    /// Create an image source with no backing path yet.
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            core: SourceCore::new(name, false),
            chain: Chain::from_names(["imgsrc", "decode", "convert"]),
            path: None,
            loop_enabled: false,
            start_index: None,
            stop_index: None,
            display_timeout: None,
            eos_timer: None,
        }
    }

    /// The configured image path or pattern.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Point the source at a different image or sequence pattern.
    pub fn set_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.core.component().require_unlinked()?;
        let path = path.as_ref().to_path_buf();
        let is_pattern = path.to_string_lossy().contains('%');
        if !is_pattern && !path.is_file() {
            return Err(Error::ResourceUnavailable(format!(
                "image '{}' does not exist",
                path.display()
            )));
        }
        self.path = Some(path);
        Ok(())
    }

    /// Whether the sequence restarts at its end.
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Enable or disable sequence looping.
    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// The sequence index window as `(start, stop)`, if set.
    pub fn index_window(&self) -> (Option<u32>, Option<u32>) {
        (self.start_index, self.stop_index)
    }

    /// Restrict an image sequence to an index window.
    ///
    /// Fails with `InvalidParameter` when `start > stop`.
    pub fn set_index_window(&mut self, start: Option<u32>, stop: Option<u32>) -> Result<()> {
        if let (Some(start), Some(stop)) = (start, stop) {
            if start > stop {
                return Err(Error::invalid(format!(
                    "sequence window start {start} exceeds stop {stop}"
                )));
            }
        }
        self.start_index = start;
        self.stop_index = stop;
        Ok(())
    }

    /// The per-image display timeout, if set.
    pub fn display_timeout(&self) -> Option<Duration> {
        self.display_timeout
    }

    /// Set or clear the display timeout. Takes effect at the next play.
    pub fn set_display_timeout(&mut self, timeout: Option<Duration>) {
        self.display_timeout = timeout;
    }

    /// Arm the end-of-stream one-shot if a display timeout is configured.
    /// Called by the owning graph as it targets `Playing`.
    pub(crate) fn arm_eos_timer(&mut self, events: &EventSender) {
        self.cancel_eos_timer();
        let Some(timeout) = self.display_timeout else {
            return;
        };

        let source = self.core.name().to_string();
        let events = events.clone();
        debug!(source = %source, ?timeout, "display timeout armed");
        self.eos_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            events.send(GraphEvent::Eos { source });
        }));
    }

    /// Cancel a pending end-of-stream timer. Idempotent.
    pub(crate) fn cancel_eos_timer(&mut self) {
        if let Some(timer) = self.eos_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for ImageSource {
    fn drop(&mut self) {
        self.cancel_eos_timer();
    }
}

impl Linkable for ImageSource {
    fn link(&mut self) -> Result<()> {
        if !self.is_linkable() {
            return Err(Error::ResourceUnavailable(format!(
                "source '{}' has no image configured",
                self.core.name()
            )));
        }
        self.core.link_with(&mut self.chain)
    }

    fn unlink(&mut self) {
        self.cancel_eos_timer();
        self.core.unlink_with(&mut self.chain);
    }

    fn is_linked(&self) -> bool {
        self.core.component().is_linked()
    }

    fn is_linkable(&self) -> bool {
        self.path.is_some()
    }
}

impl FrameRateQueryable for ImageSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl SourceComponent for ImageSource {
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
    fn test_plain_path_must_exist() {
        assert!(matches!(
            ImageSource::new("img-0", "/nonexistent/frame.jpg"),
            Err(Error::ResourceUnavailable(_))
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        let src = ImageSource::new("img-0", file.path()).unwrap();
        assert!(src.is_linkable());
    }

    #[test]
    fn test_pattern_path_accepted() {
        let src = ImageSource::new("seq-0", "/frames/img.%04d.jpg").unwrap();
        assert!(src.is_linkable());
    }

    #[test]
    fn test_index_window_validation() {
        let mut src = ImageSource::unconfigured("seq-0");
        src.set_index_window(Some(3), Some(9)).unwrap();
        assert_eq!(src.index_window(), (Some(3), Some(9)));

        assert!(matches!(
            src.set_index_window(Some(9), Some(3)),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(src.index_window(), (Some(3), Some(9)));

        // Half-open windows are fine.
        src.set_index_window(Some(5), None).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_timeout_triggers_eos() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut src = ImageSource::new("img-0", file.path()).unwrap();
        src.set_display_timeout(Some(Duration::from_secs(5)));

        let events = EventSender::new(8);
        let mut rx = events.subscribe();
        src.arm_eos_timer(&events);

        tokio::time::advance(Duration::from_secs(6)).await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, GraphEvent::Eos { source } if source == "img-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_stays_silent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut src = ImageSource::new("img-0", file.path()).unwrap();
        src.set_display_timeout(Some(Duration::from_secs(5)));

        let events = EventSender::new(8);
        let mut rx = events.subscribe();
        src.arm_eos_timer(&events);
        src.cancel_eos_timer();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
