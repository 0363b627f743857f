//! Private stage chains.
//!
//! Every component assembles an internal chain of processing stages (capture,
//! depay, decode, convert, ...) that is wired together when the component
//! links and torn down when it unlinks. The concrete media work inside each
//! stage belongs to the layer below; what this layer owns is the wiring
//! protocol and the invariant that `linked == true` means every adjacent
//! stage pair is connected.

use crate::error::{Error, Result};

/// One stage of a component's internal chain.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    /// Name of the next stage this one is wired to, if any.
    downstream: Option<String>,
}

impl Stage {
    /// Create an unwired stage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            downstream: None,
        }
    }

    /// The stage's name, unique within its chain.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The downstream stage this one feeds, if wired.
    pub fn downstream(&self) -> Option<&str> {
        self.downstream.as_deref()
    }
}

/// An ordered chain of stages wired sequentially on link.
#[derive(Debug, Default)]
pub struct Chain {
    stages: Vec<Stage>,
    linked: bool,
}

impl Chain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain from stage names, in upstream-to-downstream order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stages: names.into_iter().map(Stage::new).collect(),
            linked: false,
        }
    }

    /// Append a stage to the tail of the chain.
    ///
    /// Fails with `AlreadyLinked` while the chain is linked and with
    /// `NameNotUnique` if a stage of that name already exists.
    pub fn push(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.linked {
            return Err(Error::AlreadyLinked(format!(
                "cannot add stage '{name}' to a linked chain"
            )));
        }
        if self.stages.iter().any(|s| s.name == name) {
            return Err(Error::NameNotUnique(name));
        }
        self.stages.push(Stage::new(name));
        Ok(())
    }

    /// Wire every adjacent stage pair.
    ///
    /// Fails with `InvalidParameter` on an empty chain and `AlreadyLinked`
    /// when already linked.
    pub fn link(&mut self) -> Result<()> {
        if self.linked {
            return Err(Error::AlreadyLinked("stage chain".into()));
        }
        if self.stages.is_empty() {
            return Err(Error::invalid("cannot link an empty stage chain"));
        }

        for i in 0..self.stages.len().saturating_sub(1) {
            let next = self.stages[i + 1].name.clone();
            self.stages[i].downstream = Some(next);
        }
        self.linked = true;
        Ok(())
    }

    /// Unwire every stage. A no-op when already unlinked.
    pub fn unlink(&mut self) {
        for stage in &mut self.stages {
            stage.downstream = None;
        }
        self.linked = false;
    }

    /// Whether the chain is currently wired.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// The stage whose output is the component's outbound boundary port.
    pub fn tail(&self) -> Option<&Stage> {
        self.stages.last()
    }

    /// The stage the component's inbound boundary port feeds.
    pub fn head(&self) -> Option<&Stage> {
        self.stages.first()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterate the stages in upstream-to-downstream order.
    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }
}
