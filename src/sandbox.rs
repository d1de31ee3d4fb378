//! # Wiring Sandbox
//!
//! [`Sandbox`] wires the board, the matcher and the clock together and is
//! the surface a front-end talks to. Every operation here maps to one user
//! intent. After each mutation the completion map is brought up to date, the
//! clock is re-gated, and the changed state is written through to the
//! persistence collaborator.
//!
//! Completion policy: a new wire is matched incrementally; anything that can
//! take satisfaction away (wire removal, node removal) or bring a dangling
//! wire back to life (node addition) triggers a full recompute.

use crate::board::{is_valid_node_id, Board, BoardEvent, Node, Position, SubscriptionId, Wire, WireEnd};
use crate::catalog::Catalog;
use crate::clock::{ClockState, SimulationClock, StartRejected};
use crate::connection::{ChecklistItem, CompletionMap, Matcher};
use crate::persistence::{
    load_snapshot, save_snapshot, NullPersistence, Persistence, COMPLETION_KEY, NODES_KEY,
    WIRES_KEY,
};
use std::collections::HashSet;
use std::time::Instant;

/// Result of selecting a pin while drawing a wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinSelection {
    /// First end chosen, waiting for the second.
    Pending(WireEnd),
    /// The same pin was selected twice; the pending end is dropped.
    Cancelled,
    Connected(Wire),
    /// The pair was refused (self-loop, duplicate or unknown pin).
    Rejected,
}

/// Discrete front-end intents.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    PlaceNode {
        component_type: String,
        position: Position,
    },
    DropAt {
        node: String,
        position: Position,
    },
    RemoveNode(String),
    SelectPin {
        node: String,
        pin: usize,
    },
    RemoveWire(String),
    RequestStart,
    RequestPause,
    RequestReset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    Placed(Option<String>),
    Moved(bool),
    NodeRemoved(bool),
    Selection(PinSelection),
    WireRemoved(bool),
    Started(Result<(), StartRejected>),
    Paused,
    Reset,
}

pub struct Sandbox {
    catalog: Catalog,
    board: Board,
    matcher: Matcher,
    clock: SimulationClock,
    persistence: Box<dyn Persistence>,
    pending: Option<WireEnd>,
}

impl Sandbox {
    /// Build a sandbox, restoring persisted nodes and wires when they are
    /// usable and falling back to the catalog defaults otherwise.
    pub fn new(catalog: Catalog, persistence: Box<dyn Persistence>, clock: SimulationClock) -> Self {
        let nodes = Self::load_nodes(&catalog, persistence.as_ref());
        let wires = Self::load_wires(&nodes, persistence.as_ref());
        let board = Board::with_wires(nodes, wires);
        let mut matcher = Matcher::new(catalog.requirements().to_vec());
        matcher.recompute(&board);

        if let Some(stored) = load_snapshot::<CompletionMap>(persistence.as_ref(), COMPLETION_KEY) {
            if &stored != matcher.completion() {
                log::debug!("Persisted completion map was stale, recomputed from wires");
            }
        }

        log::info!(
            "Sandbox '{}' ready: {} nodes, {} wires, {}/{} connections",
            catalog.name(),
            board.nodes().len(),
            board.wires().len(),
            matcher.satisfied_count(),
            matcher.requirements().len()
        );

        Sandbox {
            catalog,
            board,
            matcher,
            clock,
            persistence,
            pending: None,
        }
    }

    /// No persistence and an entropy-seeded clock.
    pub fn in_memory(catalog: Catalog) -> Self {
        Self::new(catalog, Box::new(NullPersistence), SimulationClock::default())
    }

    fn load_nodes(catalog: &Catalog, persistence: &dyn Persistence) -> Vec<Node> {
        let Some(nodes) = load_snapshot::<Vec<Node>>(persistence, NODES_KEY) else {
            return catalog.default_nodes();
        };
        let mut ids = HashSet::new();
        for node in &nodes {
            if !is_valid_node_id(&node.id) || !ids.insert(node.id.as_str()) || !catalog.conforms(node) {
                log::warn!("Persisted node '{}' is invalid, using catalog defaults", node.id);
                return catalog.default_nodes();
            }
        }
        nodes
    }

    fn load_wires(nodes: &[Node], persistence: &dyn Persistence) -> Vec<Wire> {
        let Some(wires) = load_snapshot::<Vec<Wire>>(persistence, WIRES_KEY) else {
            return Vec::new();
        };
        let pin_count = |id: &str| nodes.iter().find(|n| n.id == id).map(|n| n.pins.len());
        for (i, wire) in wires.iter().enumerate() {
            let self_loop = wire.from.node == wire.to.node;
            let bad_id = wire.id != Wire::id_for(&wire.from, &wire.to);
            // Ends on missing nodes are dangling and allowed; ends on live
            // nodes must name a real pin.
            let bad_pin = [&wire.from, &wire.to]
                .iter()
                .any(|end| matches!(pin_count(end.node.as_str()), Some(count) if end.pin >= count));
            let duplicate = wires[..i].iter().any(|w| w.joins(&wire.from, &wire.to));
            if self_loop || bad_id || bad_pin || duplicate {
                log::warn!("Persisted wire '{}' is invalid, dropping all wires", wire.id);
                return Vec::new();
            }
        }
        wires
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn completion(&self) -> &CompletionMap {
        self.matcher.completion()
    }

    pub fn all_satisfied(&self) -> bool {
        self.matcher.all_satisfied()
    }

    pub fn checklist(&self) -> Vec<ChecklistItem> {
        self.matcher.checklist()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn pending_selection(&self) -> Option<&WireEnd> {
        self.pending.as_ref()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&BoardEvent) + 'static) -> SubscriptionId {
        self.board.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.board.unsubscribe(id)
    }

    pub fn add_node(&mut self, node: Node) -> bool {
        if !self.board.add_node(node) {
            return false;
        }
        self.recompute();
        self.persist_nodes();
        self.persist_completion();
        true
    }

    /// Place a fresh node of a catalog type and return its generated id.
    pub fn place_node(&mut self, component_type: &str, position: Position) -> Option<String> {
        let id = self.board.next_node_id(component_type);
        let node = self.catalog.instantiate(component_type, id.clone(), position)?;
        self.add_node(node).then_some(id)
    }

    pub fn update_node_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        if !self.board.update_node_position(id, Position::new(x, y)) {
            return false;
        }
        self.persist_nodes();
        true
    }

    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let node = self.board.remove_node(id)?;
        if self.pending.as_ref().is_some_and(|end| end.node == id) {
            self.pending = None;
        }
        self.recompute();
        self.persist_nodes();
        self.persist_completion();
        Some(node)
    }

    pub fn add_wire(
        &mut self,
        from_node: &str,
        from_pin: usize,
        to_node: &str,
        to_pin: usize,
    ) -> Option<Wire> {
        let wire = self.board.add_wire(from_node, from_pin, to_node, to_pin)?;
        self.matcher.on_wire_added(&self.board, &wire);
        self.persist_wires();
        Some(wire)
    }

    pub fn remove_wire(&mut self, id: &str) -> Option<Wire> {
        let wire = self.board.remove_wire(id)?;
        self.recompute();
        self.persist_wires();
        Some(wire)
    }

    /// Two selections make a wire. Selecting the pending pin again cancels.
    pub fn select_pin(&mut self, node: &str, pin: usize) -> PinSelection {
        let end = WireEnd::new(node, pin);
        match self.pending.take() {
            None => {
                if self.board.resolve(&end).is_none() {
                    return PinSelection::Rejected;
                }
                self.pending = Some(end.clone());
                PinSelection::Pending(end)
            }
            Some(first) if first == end => PinSelection::Cancelled,
            Some(first) => match self.add_wire(&first.node, first.pin, &end.node, end.pin) {
                Some(wire) => PinSelection::Connected(wire),
                None => PinSelection::Rejected,
            },
        }
    }

    /// Catalog defaults, no wires, nothing satisfied, clock stopped.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.pending = None;
        self.board.reset(self.catalog.default_nodes());
        self.matcher.clear();
        log::info!("Board reset to catalog defaults");
        self.persist_nodes();
        self.persist_wires();
    }

    pub fn request_start(&mut self) -> Result<(), StartRejected> {
        self.request_start_at(Instant::now())
    }

    pub fn request_start_at(&mut self, now: Instant) -> Result<(), StartRejected> {
        self.clock.request_start(&self.matcher, now)
    }

    pub fn request_pause(&mut self) {
        self.clock.pause();
    }

    /// Run one tick now, bypassing the deadline. Only acts while Running.
    pub fn tick(&mut self) -> bool {
        let ticked = self.clock.tick(&mut self.board);
        if ticked {
            self.persist_nodes();
        }
        ticked
    }

    /// Tick if the clock's deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let ticked = self.clock.poll(&mut self.board, now);
        if ticked {
            self.persist_nodes();
        }
        ticked
    }

    pub fn dispatch(&mut self, intent: Intent) -> IntentOutcome {
        match intent {
            Intent::PlaceNode {
                component_type,
                position,
            } => IntentOutcome::Placed(self.place_node(&component_type, position)),
            Intent::DropAt { node, position } => {
                IntentOutcome::Moved(self.update_node_position(&node, position.x, position.y))
            }
            Intent::RemoveNode(id) => IntentOutcome::NodeRemoved(self.remove_node(&id).is_some()),
            Intent::SelectPin { node, pin } => IntentOutcome::Selection(self.select_pin(&node, pin)),
            Intent::RemoveWire(id) => IntentOutcome::WireRemoved(self.remove_wire(&id).is_some()),
            Intent::RequestStart => IntentOutcome::Started(self.request_start()),
            Intent::RequestPause => {
                self.request_pause();
                IntentOutcome::Paused
            }
            Intent::RequestReset => {
                self.reset();
                IntentOutcome::Reset
            }
        }
    }

    /// Full recompute, then stop the clock if the wiring is no longer complete.
    fn recompute(&mut self) {
        self.matcher.recompute(&self.board);
        if self.clock.is_running() && !self.matcher.all_satisfied() {
            log::info!("Wiring no longer complete, stopping simulation");
            self.clock.pause();
        }
    }

    fn persist_nodes(&mut self) {
        save_snapshot(self.persistence.as_mut(), NODES_KEY, &self.board.nodes());
    }

    fn persist_wires(&mut self) {
        save_snapshot(self.persistence.as_mut(), WIRES_KEY, &self.board.wires());
        self.persist_completion();
    }

    fn persist_completion(&mut self) {
        save_snapshot(self.persistence.as_mut(), COMPLETION_KEY, self.matcher.completion());
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("catalog", &self.catalog.name())
            .field("board", &self.board)
            .field("completion", self.matcher.completion())
            .field("clock", &self.clock)
            .field("pending", &self.pending)
            .finish()
    }
}
