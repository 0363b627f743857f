//! The component graph: ownership, uniqueness, and the linking protocol.
//!
//! A graph owns a name→component map over the closed set of component
//! kinds. It enforces name uniqueness and structural constraints at add
//! time, links every child in a selectable order with atomic failure
//! semantics, and drives the play/pause/stop lifecycle that arms and
//! disarms network-source supervision.
//!
//! Graph operations are synchronous `&mut self` calls; the single
//! control-plane mutex (when one is needed) belongs to the service layer
//! above this crate. Health-supervision tasks never touch the graph.

use crate::component::{
    ComponentClass, ComponentCore, FrameDemux, Linkable, Overlay, Tiler,
};
use crate::error::{Error, Result};
use crate::events::{EventReceiver, EventSender, GraphEvent};
use crate::ident::{IdentifierAllocator, SOURCE_POOL};
use crate::source::{
    AppSource, CaptureSource, CustomSource, DuplicateSource, ImageSource, InterpipeSource,
    NetworkSource, ResourceSource, SourceComponent,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Order in which a graph links its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkOrder {
    /// Link in the order components were added.
    #[default]
    Insertion,
    /// Link by declared position; components without one follow, in
    /// insertion order.
    Position,
}

/// Lifecycle state of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphState {
    /// Not playing.
    #[default]
    Stopped,
    /// Sources are live; network supervision is armed.
    Playing,
    /// Playback suspended.
    Paused,
}

/// The closed set of component kinds a graph can hold.
///
/// Dispatch is explicit matching on this enum or a capability-trait call;
/// typed access goes through the `as_*` accessors, which fail with
/// `WrongType` instead of downcasting.
pub enum ComponentSlot {
    /// Local camera capture.
    Capture(CaptureSource),
    /// File/URI playback.
    Resource(ResourceSource),
    /// Decoded network stream.
    Network(NetworkSource),
    /// Interprocess producer link.
    Interpipe(InterpipeSource),
    /// Still image or image sequence.
    Image(ImageSource),
    /// Application-fed buffers.
    App(AppSource),
    /// User-assembled chain.
    Custom(CustomSource),
    /// Mirror of another source.
    Duplicate(DuplicateSource),
    /// Video tiler (singleton).
    Tiler(Tiler),
    /// On-screen overlay (singleton).
    Overlay(Overlay),
    /// Frame demultiplexer (singleton).
    Demux(FrameDemux),
}

impl ComponentSlot {
    /// The component's unique name.
    pub fn name(&self) -> &str {
        self.core().name()
    }

    /// The component's structural class.
    pub fn class(&self) -> ComponentClass {
        match self {
            Self::Capture(_)
            | Self::Resource(_)
            | Self::Network(_)
            | Self::Interpipe(_)
            | Self::Image(_)
            | Self::App(_)
            | Self::Custom(_)
            | Self::Duplicate(_) => ComponentClass::Source,
            Self::Tiler(_) => ComponentClass::Tiler,
            Self::Overlay(_) => ComponentClass::Overlay,
            Self::Demux(_) => ComponentClass::Demuxer,
        }
    }

    /// The variant label used in diagnostics and `WrongType` errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Capture(_) => "capture-source",
            Self::Resource(_) => "resource-source",
            Self::Network(_) => "network-source",
            Self::Interpipe(_) => "interpipe-source",
            Self::Image(_) => "image-source",
            Self::App(_) => "app-source",
            Self::Custom(_) => "custom-source",
            Self::Duplicate(_) => "duplicate-source",
            Self::Tiler(_) => "tiler",
            Self::Overlay(_) => "overlay",
            Self::Demux(_) => "demuxer",
        }
    }

    /// Shared component state.
    pub fn core(&self) -> &ComponentCore {
        match self {
            Self::Capture(c) => c.source_core().component(),
            Self::Resource(c) => c.source_core().component(),
            Self::Network(c) => c.source_core().component(),
            Self::Interpipe(c) => c.source_core().component(),
            Self::Image(c) => c.source_core().component(),
            Self::App(c) => c.source_core().component(),
            Self::Custom(c) => c.source_core().component(),
            Self::Duplicate(c) => c.source_core().component(),
            Self::Tiler(c) => c.core(),
            Self::Overlay(c) => c.core(),
            Self::Demux(c) => c.core(),
        }
    }

    /// Mutable shared component state.
    pub fn core_mut(&mut self) -> &mut ComponentCore {
        match self {
            Self::Capture(c) => c.source_core_mut().component_mut(),
            Self::Resource(c) => c.source_core_mut().component_mut(),
            Self::Network(c) => c.source_core_mut().component_mut(),
            Self::Interpipe(c) => c.source_core_mut().component_mut(),
            Self::Image(c) => c.source_core_mut().component_mut(),
            Self::App(c) => c.source_core_mut().component_mut(),
            Self::Custom(c) => c.source_core_mut().component_mut(),
            Self::Duplicate(c) => c.source_core_mut().component_mut(),
            Self::Tiler(c) => c.core_mut(),
            Self::Overlay(c) => c.core_mut(),
            Self::Demux(c) => c.core_mut(),
        }
    }

    /// The component's linking capability.
    pub fn as_linkable(&mut self) -> &mut dyn Linkable {
        match self {
            Self::Capture(c) => c,
            Self::Resource(c) => c,
            Self::Network(c) => c,
            Self::Interpipe(c) => c,
            Self::Image(c) => c,
            Self::App(c) => c,
            Self::Custom(c) => c,
            Self::Duplicate(c) => c,
            Self::Tiler(c) => c,
            Self::Overlay(c) => c,
            Self::Demux(c) => c,
        }
    }

    /// Whether the component reports itself ready to link.
    pub fn is_linkable(&self) -> bool {
        match self {
            Self::Capture(c) => c.is_linkable(),
            Self::Resource(c) => c.is_linkable(),
            Self::Network(c) => c.is_linkable(),
            Self::Interpipe(c) => c.is_linkable(),
            Self::Image(c) => c.is_linkable(),
            Self::App(c) => c.is_linkable(),
            Self::Custom(c) => c.is_linkable(),
            Self::Duplicate(c) => c.is_linkable(),
            Self::Tiler(c) => c.is_linkable(),
            Self::Overlay(c) => c.is_linkable(),
            Self::Demux(c) => c.is_linkable(),
        }
    }

    /// Typed access to a network source.
    pub fn as_network(&self) -> Result<&NetworkSource> {
        match self {
            Self::Network(c) => Ok(c),
            other => Err(Error::WrongType {
                expected: "network-source",
                actual: other.kind(),
            }),
        }
    }

    /// Typed mutable access to a network source.
    pub fn as_network_mut(&mut self) -> Result<&mut NetworkSource> {
        match self {
            Self::Network(c) => Ok(c),
            other => Err(Error::WrongType {
                expected: "network-source",
                actual: other.kind(),
            }),
        }
    }

    /// Typed mutable access to a capture source.
    pub fn as_capture_mut(&mut self) -> Result<&mut CaptureSource> {
        match self {
            Self::Capture(c) => Ok(c),
            other => Err(Error::WrongType {
                expected: "capture-source",
                actual: other.kind(),
            }),
        }
    }

    /// Typed mutable access to a resource source.
    pub fn as_resource_mut(&mut self) -> Result<&mut ResourceSource> {
        match self {
            Self::Resource(c) => Ok(c),
            other => Err(Error::WrongType {
                expected: "resource-source",
                actual: other.kind(),
            }),
        }
    }

    /// Readiness check run by the graph before any link mutation.
    fn check_ready(&self, graph: &ComponentGraph) -> Result<()> {
        match self {
            Self::Resource(c) => {
                if !c.is_linkable() {
                    return Err(Error::ResourceUnavailable(format!(
                        "source '{}' has no media file configured",
                        c.name()
                    )));
                }
            }
            Self::Image(c) => {
                if !c.is_linkable() {
                    return Err(Error::ResourceUnavailable(format!(
                        "source '{}' has no image configured",
                        SourceComponent::name(c)
                    )));
                }
            }
            Self::Custom(c) => {
                if !c.is_linkable() {
                    return Err(Error::invalid(format!(
                        "custom source '{}' has no stages",
                        SourceComponent::name(c)
                    )));
                }
            }
            Self::Duplicate(c) => {
                if !c.is_linkable() {
                    return Err(Error::ResourceUnavailable(format!(
                        "duplicate source '{}' names no original",
                        SourceComponent::name(c)
                    )));
                }
                let original = graph.components.get(c.original()).ok_or_else(|| {
                    Error::not_found(format!(
                        "original source '{}' for duplicate '{}'",
                        c.original(),
                        SourceComponent::name(c)
                    ))
                })?;
                if original.class() != ComponentClass::Source {
                    return Err(Error::WrongType {
                        expected: "a source component",
                        actual: original.kind(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// A named graph of media components.
pub struct ComponentGraph {
    name: String,
    components: HashMap<String, ComponentSlot>,
    /// Insertion order of component names.
    order: Vec<String>,
    link_order: LinkOrder,
    linked: bool,
    state: GraphState,
    events: EventSender,
    allocator: Arc<IdentifierAllocator>,
}

impl ComponentGraph {
    /// Create an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: HashMap::new(),
            order: Vec::new(),
            link_order: LinkOrder::default(),
            linked: false,
            state: GraphState::Stopped,
            events: EventSender::default(),
            allocator: IdentifierAllocator::shared(),
        }
    }

    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The graph's identifier allocator, shared with component
    /// constructors that need an id.
    pub fn allocator(&self) -> Arc<IdentifierAllocator> {
        self.allocator.clone()
    }

    /// Subscribe to graph events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// The configured link order.
    pub fn link_order(&self) -> LinkOrder {
        self.link_order
    }

    /// Select the link order. Only valid while unlinked.
    pub fn set_link_order(&mut self, order: LinkOrder) -> Result<()> {
        if self.linked {
            return Err(Error::AlreadyLinked(self.name.clone()));
        }
        self.link_order = order;
        Ok(())
    }

    /// Whether every child is linked.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Number of components in the graph.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Get a component by name.
    pub fn get(&self, name: &str) -> Option<&ComponentSlot> {
        self.components.get(name)
    }

    /// Get a mutable component by name, failing with `NotFound`.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut ComponentSlot> {
        self.components
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("component '{name}'")))
    }

    /// Add a component to the graph.
    ///
    /// Fails with `NameNotUnique` on a duplicate name and with
    /// `StructuralConflict` on a second singleton-class component or a
    /// tiler/demuxer combination. All checks run before any mutation.
    pub fn add(&mut self, mut slot: ComponentSlot) -> Result<()> {
        let name = slot.name().to_string();
        if self.components.contains_key(&name) {
            return Err(Error::NameNotUnique(name));
        }

        let class = slot.class();
        for existing in self.components.values() {
            let other = existing.class();
            if class.is_singleton() && class == other {
                return Err(Error::StructuralConflict(format!(
                    "graph '{}' already has a {}",
                    self.name,
                    class.label()
                )));
            }
            if class.conflicts_with(other) {
                return Err(Error::StructuralConflict(format!(
                    "a {} cannot share graph '{}' with a {}",
                    class.label(),
                    self.name,
                    other.label()
                )));
            }
        }

        if class == ComponentClass::Source {
            // Graph-scoped source id; freed again on removal.
            self.allocator.allocate(SOURCE_POOL, &name)?;
        }
        if let Err(e) = slot.core_mut().set_parent(&self.name) {
            if class == ComponentClass::Source {
                let _ = self.allocator.free(SOURCE_POOL, &name);
            }
            return Err(e);
        }

        debug!(graph = %self.name, component = %name, kind = slot.kind(), "component added");
        self.components.insert(name.clone(), slot);
        self.order.push(name.clone());
        self.events.send(GraphEvent::ComponentAdded { name });
        Ok(())
    }

    /// Remove a component, returning ownership to the caller.
    ///
    /// Fails with `NotFound` when absent and `AlreadyLinked` while the
    /// graph is linked. Removal disarms any health supervision on the
    /// component.
    pub fn remove(&mut self, name: &str) -> Result<ComponentSlot> {
        if !self.components.contains_key(name) {
            return Err(Error::not_found(format!("component '{name}'")));
        }
        if self.linked {
            return Err(Error::AlreadyLinked(format!(
                "graph '{}' must be unlinked before removing '{name}'",
                self.name
            )));
        }

        let mut slot = self.components.remove(name).expect("presence checked");
        self.order.retain(|n| n != name);
        slot.core_mut().clear_parent(&self.name)?;

        if let ComponentSlot::Network(src) = &mut slot {
            src.disarm_supervision();
        }
        if slot.class() == ComponentClass::Source {
            let _ = self.allocator.free(SOURCE_POOL, name);
        }

        debug!(graph = %self.name, component = %name, "component removed");
        self.events.send(GraphEvent::ComponentRemoved {
            name: name.to_string(),
        });
        Ok(slot)
    }

    /// The component names in link order.
    fn link_sequence(&self) -> Vec<String> {
        match self.link_order {
            LinkOrder::Insertion => self.order.clone(),
            LinkOrder::Position => {
                let mut indexed: Vec<(u32, usize, &String)> = self
                    .order
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let position = self.components[name].core().position();
                        (position.unwrap_or(u32::MAX), i, name)
                    })
                    .collect();
                indexed.sort_by_key(|&(position, insertion, _)| (position, insertion));
                indexed.into_iter().map(|(_, _, n)| n.clone()).collect()
            }
        }
    }

    /// Link every component in graph order.
    ///
    /// Fails with `AlreadyLinked` when linked. Every readiness check runs
    /// before the first mutation; if a link fails mid-pass anyway, the
    /// components already linked are unlinked before returning.
    pub fn link_all(&mut self) -> Result<()> {
        let span = crate::observability::span_graph(&self.name);
        let _guard = span.enter();

        if self.linked {
            return Err(Error::AlreadyLinked(self.name.clone()));
        }

        let sequence = self.link_sequence();
        for name in &sequence {
            self.components[name].check_ready(self)?;
        }

        let mut done: Vec<&str> = Vec::with_capacity(sequence.len());
        for name in &sequence {
            let slot = self.components.get_mut(name).expect("sequence from map");
            if let Err(e) = slot.as_linkable().link() {
                warn!(graph = %self.name, component = %name, error = %e, "link failed; unwinding");
                for prior in done.into_iter().rev() {
                    self.components
                        .get_mut(prior)
                        .expect("sequence from map")
                        .as_linkable()
                        .unlink();
                }
                return Err(e);
            }
            done.push(name);
        }

        self.linked = true;
        info!(graph = %self.name, components = sequence.len(), "graph linked");
        self.events.send(GraphEvent::Linked);
        Ok(())
    }

    /// Unlink every component, in reverse link order. A no-op while
    /// unlinked.
    pub fn unlink_all(&mut self) {
        if !self.linked {
            debug!(graph = %self.name, "unlink on an unlinked graph; nothing to do");
            return;
        }
        self.stop();

        for name in self.link_sequence().iter().rev() {
            self.components
                .get_mut(name)
                .expect("sequence from map")
                .as_linkable()
                .unlink();
        }
        self.linked = false;
        info!(graph = %self.name, "graph unlinked");
        self.events.send(GraphEvent::Unlinked);
    }

    /// Start playback: arm network supervision and image EOS timers.
    ///
    /// Fails with `NotLinked` on an unlinked graph. Must be called from
    /// within a Tokio runtime.
    pub fn play(&mut self) -> Result<()> {
        if !self.linked {
            return Err(Error::NotLinked(self.name.clone()));
        }
        match self.state {
            GraphState::Playing => return Ok(()),
            // Supervision stayed armed across the pause.
            GraphState::Paused => return self.resume(),
            GraphState::Stopped => {}
        }

        let events = self.events.clone();
        for name in &self.order {
            match self.components.get_mut(name).expect("order from map") {
                ComponentSlot::Network(src) => src.arm_supervision(&events)?,
                ComponentSlot::Image(src) => src.arm_eos_timer(&events),
                _ => {}
            }
        }
        self.state = GraphState::Playing;
        info!(graph = %self.name, "graph playing");
        Ok(())
    }

    /// Suspend playback. Network sources report `Paused`; supervision
    /// stays armed but the watchdog stands down outside `Playing`.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != GraphState::Playing {
            return Err(Error::NotLinked(format!(
                "graph '{}' is not playing",
                self.name
            )));
        }
        for name in &self.order {
            if let ComponentSlot::Network(src) = self.components.get_mut(name).expect("order") {
                src.set_state(crate::health::StreamState::Paused);
            }
        }
        self.state = GraphState::Paused;
        Ok(())
    }

    /// Resume playback after a pause.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != GraphState::Paused {
            return Err(Error::NotLinked(format!(
                "graph '{}' is not paused",
                self.name
            )));
        }
        for name in &self.order {
            if let ComponentSlot::Network(src) = self.components.get_mut(name).expect("order") {
                src.resume_stream();
            }
        }
        self.state = GraphState::Playing;
        Ok(())
    }

    /// Stop playback: disarm supervision and timers. Idempotent.
    pub fn stop(&mut self) {
        if self.state == GraphState::Stopped {
            return;
        }
        for name in &self.order {
            match self.components.get_mut(name).expect("order from map") {
                ComponentSlot::Network(src) => src.disarm_supervision(),
                ComponentSlot::Image(src) => src.cancel_eos_timer(),
                _ => {}
            }
        }
        self.state = GraphState::Stopped;
        info!(graph = %self.name, "graph stopped");
    }
}

impl Drop for ComponentGraph {
    fn drop(&mut self) {
        // Timers must never outlive the graph that armed them.
        self.stop();
    }
}

impl std::fmt::Debug for ComponentGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentGraph")
            .field("name", &self.name)
            .field("components", &self.order)
            .field("linked", &self.linked)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(graph: &ComponentGraph, name: &str, index: u32) -> ComponentSlot {
        ComponentSlot::Capture(CaptureSource::new(name, index, graph.allocator()).unwrap())
    }

    #[test]
    fn test_add_enforces_unique_names() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();
        let err = graph.add(capture(&graph, "cam-0", 1)).unwrap_err();
        assert!(matches!(err, Error::NameNotUnique(_)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_singleton_collision() {
        let mut graph = ComponentGraph::new("main");
        graph.add(ComponentSlot::Demux(FrameDemux::new("demux-0", 2))).unwrap();
        let err = graph
            .add(ComponentSlot::Demux(FrameDemux::new("demux-1", 2)))
            .unwrap_err();
        assert!(matches!(err, Error::StructuralConflict(_)));
    }

    #[test]
    fn test_tiler_demuxer_mutual_exclusion() {
        let mut graph = ComponentGraph::new("main");
        graph.add(ComponentSlot::Demux(FrameDemux::new("demux", 2))).unwrap();
        let err = graph
            .add(ComponentSlot::Tiler(Tiler::new("tiler", 2, 2)))
            .unwrap_err();
        assert!(matches!(err, Error::StructuralConflict(_)));

        // And the other way round.
        let mut graph = ComponentGraph::new("other");
        graph.add(ComponentSlot::Tiler(Tiler::new("tiler", 2, 2))).unwrap();
        let err = graph
            .add(ComponentSlot::Demux(FrameDemux::new("demux", 2)))
            .unwrap_err();
        assert!(matches!(err, Error::StructuralConflict(_)));
    }

    #[test]
    fn test_remove_not_found() {
        let mut graph = ComponentGraph::new("main");
        assert!(matches!(graph.remove("ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_remove_requires_unlinked() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();
        graph.link_all().unwrap();

        assert!(matches!(
            graph.remove("cam-0"),
            Err(Error::AlreadyLinked(_))
        ));

        graph.unlink_all();
        let slot = graph.remove("cam-0").unwrap();
        assert_eq!(slot.core().parent(), None);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_link_all_twice_fails() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();

        graph.link_all().unwrap();
        assert!(graph.is_linked());
        assert!(matches!(graph.link_all(), Err(Error::AlreadyLinked(_))));

        graph.unlink_all();
        assert!(!graph.is_linked());
        graph.unlink_all(); // no-op
    }

    #[test]
    fn test_link_all_rejects_unready_component() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();
        graph
            .add(ComponentSlot::Resource(ResourceSource::unconfigured("file-0")))
            .unwrap();

        let err = graph.link_all().unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable(_)));

        // Validation ran before mutation: nothing got linked.
        assert!(!graph.is_linked());
        assert!(!graph.get("cam-0").unwrap().core().is_linked());
    }

    #[test]
    fn test_link_failure_unwinds_already_linked() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();

        // A custom source with stages passes the readiness check; link it
        // once outside the graph pass so the graph's own link call fails.
        let mut custom = CustomSource::new("custom-0", false);
        custom.add_stage("gen").unwrap();
        custom.link().unwrap();
        graph.add(ComponentSlot::Custom(custom)).unwrap();

        let err = graph.link_all().unwrap_err();
        assert!(matches!(err, Error::AlreadyLinked(_)));

        // The capture source that linked first was unwound.
        assert!(!graph.get("cam-0").unwrap().core().is_linked());
        assert!(!graph.is_linked());
    }

    #[test]
    fn test_duplicate_requires_original_in_graph() {
        let mut graph = ComponentGraph::new("main");
        graph
            .add(ComponentSlot::Duplicate(DuplicateSource::new("dup-0", "cam-0")))
            .unwrap();

        assert!(matches!(graph.link_all(), Err(Error::NotFound(_))));

        graph.add(capture(&graph, "cam-0", 0)).unwrap();
        graph.link_all().unwrap();
        assert!(graph.is_linked());
    }

    #[test]
    fn test_position_link_order() {
        let mut graph = ComponentGraph::new("main");
        graph.set_link_order(LinkOrder::Position).unwrap();

        graph.add(capture(&graph, "cam-a", 0)).unwrap();
        graph.add(capture(&graph, "cam-b", 1)).unwrap();
        graph.add(capture(&graph, "cam-c", 2)).unwrap();

        graph.get_mut("cam-c").unwrap().core_mut().set_position(0);
        graph.get_mut("cam-a").unwrap().core_mut().set_position(5);

        // cam-c (0), cam-b (undeclared, insertion), cam-a (5)? No:
        // undeclared positions sort after declared ones.
        assert_eq!(
            graph.link_sequence(),
            vec!["cam-c".to_string(), "cam-a".to_string(), "cam-b".to_string()]
        );
    }

    #[test]
    fn test_typed_access() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();

        assert!(matches!(
            graph.get_mut("cam-0").unwrap().as_network_mut(),
            Err(Error::WrongType { .. })
        ));
        assert!(graph.get_mut("cam-0").unwrap().as_capture_mut().is_ok());
        assert!(matches!(graph.get_mut("ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_source_ids_assigned_and_recycled() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();
        graph.add(capture(&graph, "cam-1", 1)).unwrap();

        let alloc = graph.allocator();
        assert_eq!(alloc.id_of(SOURCE_POOL, "cam-0"), Some(0));
        assert_eq!(alloc.id_of(SOURCE_POOL, "cam-1"), Some(1));

        graph.remove("cam-0").unwrap();
        assert_eq!(alloc.id_of(SOURCE_POOL, "cam-0"), None);

        graph.add(capture(&graph, "cam-2", 2)).unwrap();
        assert_eq!(alloc.id_of(SOURCE_POOL, "cam-2"), Some(0));
    }

    #[tokio::test]
    async fn test_play_requires_linked() {
        let mut graph = ComponentGraph::new("main");
        graph.add(capture(&graph, "cam-0", 0)).unwrap();
        assert!(matches!(graph.play(), Err(Error::NotLinked(_))));

        graph.link_all().unwrap();
        graph.play().unwrap();
        assert_eq!(graph.state(), GraphState::Playing);

        graph.stop();
        assert_eq!(graph.state(), GraphState::Stopped);
    }

    #[tokio::test]
    async fn test_play_arms_network_supervision() {
        let mut graph = ComponentGraph::new("main");
        let src = NetworkSource::new("rtsp-0", "rtsp://example.com/stream").unwrap();
        graph.add(ComponentSlot::Network(src)).unwrap();

        graph.link_all().unwrap();
        graph.play().unwrap();
        assert!(graph
            .get("rtsp-0")
            .unwrap()
            .as_network()
            .unwrap()
            .is_supervised());

        graph.stop();
        assert!(!graph
            .get("rtsp-0")
            .unwrap()
            .as_network()
            .unwrap()
            .is_supervised());
    }

    #[tokio::test]
    async fn test_unlink_stops_playback_first() {
        let mut graph = ComponentGraph::new("main");
        let src = NetworkSource::new("rtsp-0", "rtsp://example.com/stream").unwrap();
        graph.add(ComponentSlot::Network(src)).unwrap();

        graph.link_all().unwrap();
        graph.play().unwrap();

        graph.unlink_all();
        assert_eq!(graph.state(), GraphState::Stopped);
        assert!(!graph.get("rtsp-0").unwrap().core().is_linked());
    }
}
