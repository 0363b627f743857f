//! Boundary ports for graph components.
//!
//! A boundary port is the single externally visible connection point through
//! which a component's private stage chain attaches to its siblings. Ordinary
//! components expose at most one inbound and one outbound port; fan-out
//! components (the frame demultiplexer) expose a named outbound set.

use smallvec::SmallVec;

/// Direction of a boundary port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Receives data from an upstream sibling.
    Inbound,
    /// Delivers data to a downstream sibling.
    Outbound,
}

/// A boundary port instance on a component.
#[derive(Debug, Clone)]
pub struct BoundaryPort {
    name: String,
    direction: PortDirection,
    /// Name of the peer component this port is wired to, if any.
    peer: Option<String>,
}

impl BoundaryPort {
    /// Create a new unwired port.
    pub fn new(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            peer: None,
        }
    }

    /// Create the standard inbound port, named "in".
    pub fn inbound() -> Self {
        Self::new("in", PortDirection::Inbound)
    }

    /// Create the standard outbound port, named "out".
    pub fn outbound() -> Self {
        Self::new("out", PortDirection::Outbound)
    }

    /// The port's name, unique within its component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The port's direction.
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Whether this is an inbound port.
    pub fn is_inbound(&self) -> bool {
        self.direction == PortDirection::Inbound
    }

    /// Whether this is an outbound port.
    pub fn is_outbound(&self) -> bool {
        self.direction == PortDirection::Outbound
    }

    /// The peer component this port is wired to, if any.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Whether the port is wired to a peer.
    pub fn is_wired(&self) -> bool {
        self.peer.is_some()
    }

    /// Wire this port to a peer component.
    pub fn wire(&mut self, peer: impl Into<String>) {
        self.peer = Some(peer.into());
    }

    /// Unwire this port. A no-op when already unwired.
    pub fn unwire(&mut self) {
        self.peer = None;
    }
}

/// The set of boundary ports a component exposes.
///
/// Most components hold one or two ports, so the backing store is inline.
#[derive(Debug, Default)]
pub struct PortSet {
    ports: SmallVec<[BoundaryPort; 2]>,
}

impl PortSet {
    /// Create an empty port set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard source-component shape: one outbound port, no inbound.
    pub fn source() -> Self {
        let mut set = Self::new();
        set.add(BoundaryPort::outbound());
        set
    }

    /// The standard pass-through shape: one inbound, one outbound.
    pub fn pass_through() -> Self {
        let mut set = Self::new();
        set.add(BoundaryPort::inbound());
        set.add(BoundaryPort::outbound());
        set
    }

    /// Add a port to the set.
    pub fn add(&mut self, port: BoundaryPort) {
        self.ports.push(port);
    }

    /// Get a port by name.
    pub fn get(&self, name: &str) -> Option<&BoundaryPort> {
        self.ports.iter().find(|p| p.name() == name)
    }

    /// Get a mutable port by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut BoundaryPort> {
        self.ports.iter_mut().find(|p| p.name() == name)
    }

    /// The single inbound port, if present.
    pub fn inbound(&self) -> Option<&BoundaryPort> {
        self.ports.iter().find(|p| p.is_inbound())
    }

    /// The first outbound port, if present.
    pub fn outbound(&self) -> Option<&BoundaryPort> {
        self.ports.iter().find(|p| p.is_outbound())
    }

    /// All outbound ports, in declaration order.
    pub fn outbounds(&self) -> impl Iterator<Item = &BoundaryPort> {
        self.ports.iter().filter(|p| p.is_outbound())
    }

    /// Unwire every port. Idempotent.
    pub fn unwire_all(&mut self) {
        for port in self.ports.iter_mut() {
            port.unwire();
        }
    }

    /// Number of ports in the set.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_directions() {
        let inbound = BoundaryPort::inbound();
        assert_eq!(inbound.name(), "in");
        assert!(inbound.is_inbound());
        assert!(!inbound.is_outbound());

        let outbound = BoundaryPort::outbound();
        assert_eq!(outbound.name(), "out");
        assert!(outbound.is_outbound());
    }

    #[test]
    fn test_wiring() {
        let mut port = BoundaryPort::outbound();
        assert!(!port.is_wired());

        port.wire("tiler");
        assert_eq!(port.peer(), Some("tiler"));

        port.unwire();
        assert!(!port.is_wired());
        port.unwire(); // idempotent
    }

    #[test]
    fn test_source_shape() {
        let set = PortSet::source();
        assert!(set.inbound().is_none());
        assert!(set.outbound().is_some());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_fan_out_set() {
        let mut set = PortSet::new();
        set.add(BoundaryPort::inbound());
        for i in 0..4 {
            set.add(BoundaryPort::new(
                format!("out_{i}"),
                PortDirection::Outbound,
            ));
        }

        assert_eq!(set.outbounds().count(), 4);
        assert!(set.get("out_2").is_some());
        assert!(set.get("out_9").is_none());
    }

    #[test]
    fn test_unwire_all() {
        let mut set = PortSet::pass_through();
        set.get_mut("in").unwrap().wire("upstream");
        set.get_mut("out").unwrap().wire("downstream");

        set.unwire_all();
        assert!(!set.get("in").unwrap().is_wired());
        assert!(!set.get("out").unwrap().is_wired());
    }
}
