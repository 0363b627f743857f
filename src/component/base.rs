//! Common component state shared by every variant.

use crate::component::port::PortSet;
use crate::error::{Error, Result};

/// State every graph component carries: its unique name, a non-owning
/// back-reference to the owning graph, its boundary ports, and the linked
/// flag.
///
/// Ownership flows strictly graph → component → stages; the parent link is
/// just the graph's name, checked on removal.
#[derive(Debug)]
pub struct ComponentCore {
    name: String,
    /// Name of the graph this component was added to, if any.
    parent: Option<String>,
    /// Optional explicit link position; `None` falls back to insertion
    /// order.
    position: Option<u32>,
    linked: bool,
    ports: PortSet,
}

impl ComponentCore {
    /// Create a core with the given name and port shape.
    pub fn new(name: impl Into<String>, ports: PortSet) -> Self {
        Self {
            name: name.into(),
            parent: None,
            position: None,
            linked: false,
            ports,
        }
    }

    /// The component's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning graph's name, if the component is in a graph.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Record membership in a graph. Fails if already owned elsewhere.
    pub fn set_parent(&mut self, graph: impl Into<String>) -> Result<()> {
        let graph = graph.into();
        if let Some(current) = &self.parent {
            return Err(Error::InternalFault(format!(
                "component '{}' already belongs to graph '{current}'",
                self.name
            )));
        }
        self.parent = Some(graph);
        Ok(())
    }

    /// Clear membership after verifying the caller is the actual parent.
    ///
    /// Fails with `NotChild` when the component belongs to a different graph
    /// (or to none).
    pub fn clear_parent(&mut self, graph: &str) -> Result<()> {
        match self.parent.as_deref() {
            Some(current) if current == graph => {
                self.parent = None;
                Ok(())
            }
            _ => Err(Error::NotChild {
                component: self.name.clone(),
                parent: graph.to_string(),
            }),
        }
    }

    /// Explicit link position, if one was declared.
    pub fn position(&self) -> Option<u32> {
        self.position
    }

    /// Declare an explicit link position.
    pub fn set_position(&mut self, position: u32) {
        self.position = Some(position);
    }

    /// Whether the component's internal chain is wired.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Mark the component linked. Fails with `AlreadyLinked` if it is.
    pub fn mark_linked(&mut self) -> Result<()> {
        if self.linked {
            return Err(Error::AlreadyLinked(self.name.clone()));
        }
        self.linked = true;
        Ok(())
    }

    /// Mark the component unlinked and unwire its ports. Idempotent.
    pub fn mark_unlinked(&mut self) {
        self.linked = false;
        self.ports.unwire_all();
    }

    /// Guard for operations only valid while unlinked.
    pub fn require_unlinked(&self) -> Result<()> {
        if self.linked {
            return Err(Error::AlreadyLinked(self.name.clone()));
        }
        Ok(())
    }

    /// The component's boundary ports.
    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    /// Mutable access to the boundary ports.
    pub fn ports_mut(&mut self) -> &mut PortSet {
        &mut self.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_round_trip() {
        let mut core = ComponentCore::new("cam-0", PortSet::source());
        assert_eq!(core.parent(), None);

        core.set_parent("main").unwrap();
        assert_eq!(core.parent(), Some("main"));

        // A second graph cannot claim it.
        assert!(core.set_parent("other").is_err());

        // The wrong parent cannot release it.
        assert!(matches!(
            core.clear_parent("other"),
            Err(Error::NotChild { .. })
        ));

        core.clear_parent("main").unwrap();
        assert_eq!(core.parent(), None);

        // Releasing an orphan also fails.
        assert!(matches!(
            core.clear_parent("main"),
            Err(Error::NotChild { .. })
        ));
    }

    #[test]
    fn test_linked_flag_transitions() {
        let mut core = ComponentCore::new("cam-0", PortSet::source());
        assert!(!core.is_linked());

        core.mark_linked().unwrap();
        assert!(core.is_linked());
        assert!(matches!(core.mark_linked(), Err(Error::AlreadyLinked(_))));

        core.mark_unlinked();
        assert!(!core.is_linked());
        core.mark_unlinked(); // idempotent
    }

    #[test]
    fn test_unlink_unwires_ports() {
        let mut core = ComponentCore::new("cam-0", PortSet::source());
        core.ports_mut().get_mut("out").unwrap().wire("tiler");
        core.mark_linked().unwrap();

        core.mark_unlinked();
        assert!(!core.ports().get("out").unwrap().is_wired());
    }
}
