//! Optional per-source attachments: lens correction and recording tap.
//!
//! A source carries at most one of each, and both may only be attached or
//! detached while the source is unlinked — their stages splice into the
//! source's chain at link time.

use crate::component::Chain;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Lens-correction attachment (dewarper).
#[derive(Debug)]
pub struct Dewarper {
    config_file: PathBuf,
    chain: Chain,
    /// Number of output surfaces per frame.
    num_surfaces: u32,
}

impl Dewarper {
    /// Create a dewarper from its configuration file.
    ///
    /// The file must exist; a missing path fails with
    /// `ResourceUnavailable`.
    pub fn new(config_file: impl AsRef<Path>) -> Result<Self> {
        let config_file = config_file.as_ref().to_path_buf();
        if !config_file.is_file() {
            return Err(Error::ResourceUnavailable(format!(
                "dewarper config '{}' does not exist",
                config_file.display()
            )));
        }
        Ok(Self {
            config_file,
            chain: Chain::from_names(["queue", "dewarp"]),
            num_surfaces: 1,
        })
    }

    /// The configuration file backing this dewarper.
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Output surfaces per frame.
    pub fn num_surfaces(&self) -> u32 {
        self.num_surfaces
    }

    /// Set the number of output surfaces per frame.
    pub fn set_num_surfaces(&mut self, surfaces: u32) {
        self.num_surfaces = surfaces;
    }

    pub(crate) fn link(&mut self) -> Result<()> {
        self.chain.link()
    }

    pub(crate) fn unlink(&mut self) {
        self.chain.unlink();
    }
}

/// Container format for a recording tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordContainer {
    /// MP4 container.
    #[default]
    Mp4,
    /// Matroska container.
    Mkv,
}

/// Recording branch tapped off a source's output.
#[derive(Debug)]
pub struct RecordTap {
    outdir: PathBuf,
    container: RecordContainer,
    chain: Chain,
}

impl RecordTap {
    /// Create a recording tap writing into `outdir`.
    ///
    /// The directory must exist; a missing path fails with
    /// `ResourceUnavailable`.
    pub fn new(outdir: impl AsRef<Path>, container: RecordContainer) -> Result<Self> {
        let outdir = outdir.as_ref().to_path_buf();
        if !outdir.is_dir() {
            return Err(Error::ResourceUnavailable(format!(
                "record directory '{}' does not exist",
                outdir.display()
            )));
        }
        Ok(Self {
            outdir,
            container,
            chain: Chain::from_names(["tee", "queue", "mux", "filesink"]),
        })
    }

    /// The directory recordings are written to.
    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// The configured container format.
    pub fn container(&self) -> RecordContainer {
        self.container
    }

    pub(crate) fn link(&mut self) -> Result<()> {
        self.chain.link()
    }

    pub(crate) fn unlink(&mut self) {
        self.chain.unlink();
    }
}
