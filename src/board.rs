//! # Node/Wire Store
//!
//! [`Board`] owns every placed node and every wire. It is the single source
//! of truth the matcher and the clock read from; neither of them mutates a
//! node or wire directly; they go through the board's operations.
//!
//! Wires that point at a removed node are kept. Such a wire is "dangling"
//! and every derived computation ignores it.

use crate::pin::{PinKey, PinSpec, PinValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Display colors handed out to new wires in turn.
pub const WIRE_PALETTE: [&str; 6] = ["red", "black", "yellow", "green", "blue", "orange"];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// A placed component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub position: Position,
    pub pins: Vec<PinSpec>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Node {
    pub fn pin(&self, index: usize) -> Option<&PinSpec> {
        self.pins.get(index)
    }

    pub fn pin_index(&self, name: &str) -> Option<usize> {
        self.pins.iter().position(|p| p.name == name)
    }

    pub fn levels(&self) -> Vec<PinValue> {
        self.pins.iter().map(|p| p.level).collect()
    }
}

/// One end of a wire: a node id plus a pin index on that node.
/// Node ids appear inside wire ids and console commands, so they must be
/// non-empty and free of `:` and whitespace.
pub fn is_valid_node_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(|c| c == ':' || c.is_whitespace())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireEnd {
    pub node: String,
    pub pin: usize,
}

impl WireEnd {
    pub fn new(node: impl Into<String>, pin: usize) -> Self {
        WireEnd {
            node: node.into(),
            pin,
        }
    }
}

impl fmt::Display for WireEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.pin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub id: String,
    pub from: WireEnd,
    pub to: WireEnd,
    pub color: String,
}

impl Wire {
    /// Id derived from the ordered endpoint pair.
    pub fn id_for(from: &WireEnd, to: &WireEnd) -> String {
        format!("{}->{}", from, to)
    }

    /// Same unordered endpoint pair.
    pub fn joins(&self, a: &WireEnd, b: &WireEnd) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.color)
    }
}

/// Change notifications delivered to board observers after the change is visible.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    NodeAdded(String),
    NodeMoved { id: String, position: Position },
    NodeRemoved(String),
    WireAdded(Wire),
    WireRemoved(Wire),
    PinsUpdated(String),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&BoardEvent)>;

pub struct Board {
    nodes: Vec<Node>,
    wires: Vec<Wire>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    next_color: usize,
}

impl Board {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self::with_wires(nodes, Vec::new())
    }

    pub fn with_wires(nodes: Vec<Node>, wires: Vec<Wire>) -> Self {
        Board {
            next_color: wires.len(),
            nodes,
            wires,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn wire(&self, id: &str) -> Option<&Wire> {
        self.wires.iter().find(|w| w.id == id)
    }

    /// Append a node. A duplicate or malformed id is a caller bug; it is
    /// refused and logged.
    pub fn add_node(&mut self, node: Node) -> bool {
        if !is_valid_node_id(&node.id) {
            log::warn!("Refusing node with malformed id '{}'", node.id);
            return false;
        }
        if self.node(&node.id).is_some() {
            log::warn!("Refusing node with duplicate id '{}'", node.id);
            return false;
        }
        let id = node.id.clone();
        self.nodes.push(node);
        self.notify(&BoardEvent::NodeAdded(id));
        true
    }

    pub fn update_node_position(&mut self, id: &str, position: Position) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.position = position;
        self.notify(&BoardEvent::NodeMoved {
            id: id.to_string(),
            position,
        });
        true
    }

    /// Remove a node. Wires attached to it are left in place, dangling.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);
        self.notify(&BoardEvent::NodeRemoved(node.id.clone()));
        Some(node)
    }

    pub fn add_wire(
        &mut self,
        from_node: &str,
        from_pin: usize,
        to_node: &str,
        to_pin: usize,
    ) -> Option<Wire> {
        let color = WIRE_PALETTE[self.next_color % WIRE_PALETTE.len()];
        self.add_wire_with_color(from_node, from_pin, to_node, to_pin, color)
    }

    /// Create a wire, or `None` when it is a self-loop, duplicates an existing
    /// wire in either direction, or names a pin that does not exist.
    pub fn add_wire_with_color(
        &mut self,
        from_node: &str,
        from_pin: usize,
        to_node: &str,
        to_pin: usize,
        color: &str,
    ) -> Option<Wire> {
        let from = WireEnd::new(from_node, from_pin);
        let to = WireEnd::new(to_node, to_pin);

        if from.node == to.node {
            log::debug!("Rejected self-loop wire on '{}'", from.node);
            return None;
        }
        if self.resolve(&from).is_none() || self.resolve(&to).is_none() {
            log::debug!("Rejected wire {} -> {}: unknown pin", from, to);
            return None;
        }
        if self.wires.iter().any(|w| w.joins(&from, &to)) {
            log::debug!("Rejected duplicate wire {} -> {}", from, to);
            return None;
        }

        let wire = Wire {
            id: Wire::id_for(&from, &to),
            from,
            to,
            color: color.to_string(),
        };
        self.next_color += 1;
        self.wires.push(wire.clone());
        self.notify(&BoardEvent::WireAdded(wire.clone()));
        Some(wire)
    }

    pub fn remove_wire(&mut self, id: &str) -> Option<Wire> {
        let index = self.wires.iter().position(|w| w.id == id)?;
        let wire = self.wires.remove(index);
        self.notify(&BoardEvent::WireRemoved(wire.clone()));
        Some(wire)
    }

    /// Replace every node and drop every wire.
    pub fn reset(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        self.wires.clear();
        self.next_color = 0;
        self.notify(&BoardEvent::Reset);
    }

    /// Overwrite a node's pin levels. The pin list shape never changes, so a
    /// length mismatch is refused.
    pub fn set_pin_levels(&mut self, id: &str, levels: &[PinValue]) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if node.pins.len() != levels.len() {
            log::warn!(
                "Ignoring {} levels for node '{}' with {} pins",
                levels.len(),
                id,
                node.pins.len()
            );
            return false;
        }
        let mut changed = false;
        for (pin, level) in node.pins.iter_mut().zip(levels) {
            if pin.level != *level {
                pin.level = *level;
                changed = true;
            }
        }
        if changed {
            self.notify(&BoardEvent::PinsUpdated(id.to_string()));
        }
        true
    }

    /// Node id and interned pin name at a wire end, if the node is live and
    /// the index is in range.
    pub fn resolve(&self, end: &WireEnd) -> Option<(&str, PinKey)> {
        let node = self.node(&end.node)?;
        let pin = node.pin(end.pin)?;
        Some((node.id.as_str(), pin.key))
    }

    pub fn is_dangling(&self, wire: &Wire) -> bool {
        self.resolve(&wire.from).is_none() || self.resolve(&wire.to).is_none()
    }

    pub fn dangling_wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter(|w| self.is_dangling(w))
    }

    /// Smallest `"{type}-{n}"` id, starting at 1, that no live node uses and
    /// no wire still points at. A wire left dangling by a removed node must
    /// not come back to life on a newly placed one.
    pub fn next_node_id(&self, component_type: &str) -> String {
        (1..)
            .map(|n| format!("{}-{}", component_type, n))
            .find(|candidate| self.node(candidate).is_none() && !self.is_referenced(candidate))
            .unwrap_or_else(|| component_type.to_string())
    }

    fn is_referenced(&self, id: &str) -> bool {
        self.wires
            .iter()
            .any(|w| w.from.node == id || w.to.node == id)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&BoardEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &BoardEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("nodes", &self.nodes)
            .field("wires", &self.wires)
            .field("observers", &self.observers.len())
            .finish()
    }
}
