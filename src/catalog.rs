//! # Component Catalog
//!
//! Static reference data for a wiring lab: the component types that can be
//! placed, the nodes placed on a fresh board, and the answer key the user's
//! wiring is checked against.
//!
//! Catalogs are described in JSON and validated once at load time. Pin names
//! are interned into [`PinKey`]s while loading, so the matcher compares plain
//! values instead of looking names up on every wire.
//!
//! ## Catalog File Format
//!
//! ```json
//! {
//!   "name": "BlinkAndButton",
//!   "description": "Blink an LED",
//!   "components": [
//!     { "type": "led", "pins": [{ "name": "anode", "role": "input" }, { "name": "cathode" }] }
//!   ],
//!   "nodes": [
//!     { "id": "led1", "type": "led", "position": { "x": 10.0, "y": 20.0 } }
//!   ],
//!   "requirements": [
//!     {
//!       "id": "led-gnd",
//!       "label": "LED cathode to ground",
//!       "from": { "node": "led1", "pin": "cathode" },
//!       "to": { "node": "uno", "pin": "GND" }
//!     }
//!   ]
//! }
//! ```

use crate::board::{is_valid_node_id, Node, Position};
use crate::error::{LabError, Result};
use crate::pin::{PinKey, PinRole, PinSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../catalogs/blink_button.json");

/// JSON catalog structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub components: Vec<ComponentTypeConfig>,
    pub nodes: Vec<PlacementConfig>,
    #[serde(default)]
    pub requirements: Vec<RequirementConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTypeConfig {
    #[serde(rename = "type")]
    pub component_type: String,
    pub pins: Vec<PinConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    pub name: String,
    #[serde(default)]
    pub role: PinRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub from: PinReference,
    pub to: PinReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinReference {
    pub node: String,
    pub pin: String,
}

/// Interning table for pin names.
#[derive(Debug, Clone, Default)]
pub struct PinSymbols {
    names: Vec<String>,
    index: HashMap<String, PinKey>,
}

impl PinSymbols {
    pub fn intern(&mut self, name: &str) -> Result<PinKey> {
        if let Some(key) = self.index.get(name) {
            return Ok(*key);
        }
        let raw = u16::try_from(self.names.len()).map_err(|_| LabError::TooManyPinNames {
            limit: u16::MAX as usize,
        })?;
        let key = PinKey(raw);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), key);
        Ok(key)
    }

    pub fn lookup(&self, name: &str) -> Option<PinKey> {
        self.index.get(name).copied()
    }

    pub fn name(&self, key: PinKey) -> Option<&str> {
        self.names.get(key.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A placeable component type with its ordered, interned pin list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentType {
    pub name: String,
    pub pins: Vec<PinSpec>,
}

/// A node placed on a fresh board.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: String,
    pub component_type: String,
    pub position: Position,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// One end of a required connection, resolved to an interned pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub node: String,
    pub pin: PinKey,
    pub pin_name: String,
}

impl PinRef {
    pub fn is(&self, node: &str, pin: PinKey) -> bool {
        self.node == node && self.pin == pin
    }
}

/// One entry of the answer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredConnection {
    pub id: String,
    pub label: String,
    pub from: PinRef,
    pub to: PinRef,
}

impl RequiredConnection {
    /// True when the pin pair `a`, `b` is this requirement, drawn in either direction.
    pub fn matches(&self, a: (&str, PinKey), b: (&str, PinKey)) -> bool {
        let forward = self.from.is(a.0, a.1) && self.to.is(b.0, b.1);
        let reverse = self.from.is(b.0, b.1) && self.to.is(a.0, a.1);
        forward || reverse
    }
}

/// Validated catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    description: String,
    metadata: BTreeMap<String, serde_json::Value>,
    symbols: PinSymbols,
    types: Vec<ComponentType>,
    placements: Vec<Placement>,
    requirements: Vec<RequiredConnection>,
}

impl Catalog {
    /// The bundled "blink and button" lab.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LabError::file_read(path.display().to_string(), e))?;
        let config: CatalogConfig = serde_json::from_str(&content)
            .map_err(|e| LabError::json(path.display().to_string(), e))?;
        Self::from_config(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CatalogConfig =
            serde_json::from_str(json).map_err(|e| LabError::json("catalog", e))?;
        Self::from_config(config)
    }

    pub fn from_config(config: CatalogConfig) -> Result<Self> {
        let mut symbols = PinSymbols::default();
        let types = Self::build_types(&config.components, &mut symbols)?;
        let placements = Self::build_placements(&config.nodes, &types)?;
        let requirements =
            Self::build_requirements(&config.requirements, &placements, &types, &symbols)?;

        log::debug!(
            "Loaded catalog '{}': {} types, {} nodes, {} requirements, {} pin names",
            config.name,
            types.len(),
            placements.len(),
            requirements.len(),
            symbols.len()
        );

        Ok(Catalog {
            name: config.name,
            description: config.description,
            metadata: config.metadata,
            symbols,
            types,
            placements,
            requirements,
        })
    }

    fn build_types(
        configs: &[ComponentTypeConfig],
        symbols: &mut PinSymbols,
    ) -> Result<Vec<ComponentType>> {
        let mut types: Vec<ComponentType> = Vec::with_capacity(configs.len());
        for config in configs {
            if types.iter().any(|t| t.name == config.component_type) {
                return Err(LabError::DuplicateComponentType {
                    component_type: config.component_type.clone(),
                });
            }

            let mut seen = HashSet::new();
            let mut pins = Vec::with_capacity(config.pins.len());
            for pin in &config.pins {
                if !seen.insert(pin.name.as_str()) {
                    return Err(LabError::DuplicatePin {
                        component_type: config.component_type.clone(),
                        pin: pin.name.clone(),
                    });
                }
                let key = symbols.intern(&pin.name)?;
                pins.push(PinSpec::new(pin.name.clone(), key, pin.role));
            }

            types.push(ComponentType {
                name: config.component_type.clone(),
                pins,
            });
        }
        Ok(types)
    }

    fn build_placements(
        configs: &[PlacementConfig],
        types: &[ComponentType],
    ) -> Result<Vec<Placement>> {
        let mut placements: Vec<Placement> = Vec::with_capacity(configs.len());
        for config in configs {
            if !is_valid_node_id(&config.id) {
                return Err(LabError::InvalidNodeId {
                    id: config.id.clone(),
                });
            }
            if placements.iter().any(|p| p.id == config.id) {
                return Err(LabError::DuplicateNodeId {
                    id: config.id.clone(),
                });
            }
            if !types.iter().any(|t| t.name == config.component_type) {
                return Err(LabError::UnknownComponentType {
                    node: config.id.clone(),
                    component_type: config.component_type.clone(),
                });
            }
            placements.push(Placement {
                id: config.id.clone(),
                component_type: config.component_type.clone(),
                position: config.position,
                metadata: config.metadata.clone(),
            });
        }
        Ok(placements)
    }

    fn build_requirements(
        configs: &[RequirementConfig],
        placements: &[Placement],
        types: &[ComponentType],
        symbols: &PinSymbols,
    ) -> Result<Vec<RequiredConnection>> {
        let mut requirements: Vec<RequiredConnection> = Vec::with_capacity(configs.len());
        for config in configs {
            if requirements.iter().any(|r| r.id == config.id) {
                return Err(LabError::DuplicateRequirement {
                    id: config.id.clone(),
                });
            }
            if config.from.node == config.to.node {
                return Err(LabError::SelfLoopRequirement {
                    id: config.id.clone(),
                    node: config.from.node.clone(),
                });
            }
            let from = Self::resolve_reference(&config.id, &config.from, placements, types, symbols)?;
            let to = Self::resolve_reference(&config.id, &config.to, placements, types, symbols)?;
            requirements.push(RequiredConnection {
                id: config.id.clone(),
                label: config.label.clone(),
                from,
                to,
            });
        }
        Ok(requirements)
    }

    fn resolve_reference(
        requirement: &str,
        reference: &PinReference,
        placements: &[Placement],
        types: &[ComponentType],
        symbols: &PinSymbols,
    ) -> Result<PinRef> {
        let placement = placements
            .iter()
            .find(|p| p.id == reference.node)
            .ok_or_else(|| LabError::UnknownNode {
                requirement: requirement.to_string(),
                node: reference.node.clone(),
            })?;

        let unknown_pin = || LabError::UnknownPin {
            requirement: requirement.to_string(),
            node: reference.node.clone(),
            pin: reference.pin.clone(),
        };

        let component_type = types
            .iter()
            .find(|t| t.name == placement.component_type)
            .ok_or_else(unknown_pin)?;
        let key = symbols.lookup(&reference.pin).ok_or_else(unknown_pin)?;
        if !component_type.pins.iter().any(|p| p.key == key) {
            return Err(unknown_pin());
        }

        Ok(PinRef {
            node: reference.node.clone(),
            pin: key,
            pin_name: reference.pin.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn symbols(&self) -> &PinSymbols {
        &self.symbols
    }

    pub fn component_types(&self) -> &[ComponentType] {
        &self.types
    }

    pub fn component_type(&self, name: &str) -> Option<&ComponentType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn requirements(&self) -> &[RequiredConnection] {
        &self.requirements
    }

    /// Build a fresh node of `component_type`. Pins are deep copies of the
    /// type's pin list, so mutating the node never touches the catalog.
    pub fn instantiate(
        &self,
        component_type: &str,
        id: impl Into<String>,
        position: Position,
    ) -> Option<Node> {
        let definition = self.component_type(component_type)?;
        Some(Node {
            id: id.into(),
            component_type: definition.name.clone(),
            position,
            pins: definition.pins.clone(),
            metadata: BTreeMap::new(),
        })
    }

    /// Nodes of a freshly reset board, in catalog order.
    pub fn default_nodes(&self) -> Vec<Node> {
        self.placements
            .iter()
            .filter_map(|placement| {
                let mut node =
                    self.instantiate(&placement.component_type, placement.id.clone(), placement.position)?;
                node.metadata = placement.metadata.clone();
                Some(node)
            })
            .collect()
    }

    /// True when `node` has exactly the pin shape its catalog type declares.
    pub fn conforms(&self, node: &Node) -> bool {
        match self.component_type(&node.component_type) {
            Some(definition) => {
                definition.pins.len() == node.pins.len()
                    && definition
                        .pins
                        .iter()
                        .zip(&node.pins)
                        .all(|(expected, actual)| expected.same_shape(actual))
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PinValue;

    fn two_node_config() -> CatalogConfig {
        serde_json::from_str(
            r#"{
                "name": "Pair",
                "components": [
                    { "type": "a_part", "pins": [{ "name": "P1", "role": "output" }, { "name": "P2" }] },
                    { "type": "b_part", "pins": [{ "name": "Q1", "role": "input" }, { "name": "Q2" }] }
                ],
                "nodes": [
                    { "id": "A", "type": "a_part", "position": { "x": 0.0, "y": 0.0 } },
                    { "id": "B", "type": "b_part", "position": { "x": 100.0, "y": 0.0 } }
                ],
                "requirements": [
                    { "id": "req1", "label": "A.P1 to B.Q1",
                      "from": { "node": "A", "pin": "P1" }, "to": { "node": "B", "pin": "Q1" } }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.name(), "BlinkAndButton");
        assert_eq!(catalog.component_types().len(), 4);
        assert_eq!(catalog.placements().len(), 4);
        assert_eq!(catalog.requirements().len(), 5);
    }

    #[test]
    fn test_requirements_resolve_to_interned_keys() {
        let catalog = Catalog::from_config(two_node_config()).unwrap();
        let req = &catalog.requirements()[0];
        assert_eq!(Some(req.from.pin), catalog.symbols().lookup("P1"));
        assert_eq!(Some(req.to.pin), catalog.symbols().lookup("Q1"));
        assert_eq!(catalog.symbols().name(req.to.pin), Some("Q1"));
    }

    #[test]
    fn test_requirement_matches_both_directions() {
        let catalog = Catalog::from_config(two_node_config()).unwrap();
        let req = &catalog.requirements()[0];
        let p1 = catalog.symbols().lookup("P1").unwrap();
        let q1 = catalog.symbols().lookup("Q1").unwrap();
        let q2 = catalog.symbols().lookup("Q2").unwrap();

        assert!(req.matches(("A", p1), ("B", q1)));
        assert!(req.matches(("B", q1), ("A", p1)));
        assert!(!req.matches(("A", p1), ("B", q2)));
        assert!(!req.matches(("B", p1), ("A", q1)));
    }

    #[test]
    fn test_default_nodes_are_deep_copies() {
        let catalog = Catalog::from_config(two_node_config()).unwrap();
        let mut nodes = catalog.default_nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "A");
        assert_eq!(nodes[1].position, Position::new(100.0, 0.0));

        nodes[0].pins[0].level = PinValue::High;
        assert_eq!(catalog.default_nodes()[0].pins[0].level, PinValue::Low);
        assert!(catalog.conforms(&nodes[0]));
    }

    #[test]
    fn test_conforms_rejects_reshaped_node() {
        let catalog = Catalog::from_config(two_node_config()).unwrap();
        let mut node = catalog.default_nodes().remove(0);
        node.pins.pop();
        assert!(!catalog.conforms(&node));

        node.component_type = "missing".to_string();
        assert!(!catalog.conforms(&node));
    }

    #[test]
    fn test_unknown_pin_in_requirement() {
        let mut config = two_node_config();
        config.requirements[0].to.pin = "Q9".to_string();
        let err = Catalog::from_config(config).unwrap_err();
        assert!(matches!(err, LabError::UnknownPin { .. }));
    }

    #[test]
    fn test_pin_of_other_type_is_unknown() {
        // Q1 exists in the symbol table, but not on A's type
        let mut config = two_node_config();
        config.requirements[0].from.pin = "Q1".to_string();
        let err = Catalog::from_config(config).unwrap_err();
        assert!(matches!(err, LabError::UnknownPin { .. }));
    }

    #[test]
    fn test_duplicate_node_id() {
        let mut config = two_node_config();
        config.nodes[1].id = "A".to_string();
        let err = Catalog::from_config(config).unwrap_err();
        assert!(matches!(err, LabError::DuplicateNodeId { .. }));
    }

    #[test]
    fn test_node_id_with_separator_rejected() {
        let mut config = two_node_config();
        config.nodes[1].id = "B:1->C".to_string();
        let err = Catalog::from_config(config).unwrap_err();
        assert!(matches!(err, LabError::InvalidNodeId { ref id } if id == "B:1->C"));

        let mut config = two_node_config();
        config.nodes[0].id = "my led".to_string();
        assert!(matches!(
            Catalog::from_config(config).unwrap_err(),
            LabError::InvalidNodeId { .. }
        ));
    }

    #[test]
    fn test_requirement_on_one_node_rejected() {
        let mut config = two_node_config();
        config.requirements[0].to.node = "A".to_string();
        config.requirements[0].to.pin = "P2".to_string();
        let err = Catalog::from_config(config).unwrap_err();
        assert!(matches!(err, LabError::SelfLoopRequirement { ref node, .. } if node == "A"));
    }

    #[test]
    fn test_unknown_type_and_node() {
        let mut config = two_node_config();
        config.nodes[1].component_type = "c_part".to_string();
        assert!(matches!(
            Catalog::from_config(config).unwrap_err(),
            LabError::UnknownComponentType { .. }
        ));

        let mut config = two_node_config();
        config.requirements[0].to.node = "C".to_string();
        assert!(matches!(
            Catalog::from_config(config).unwrap_err(),
            LabError::UnknownNode { .. }
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = Catalog::from_json_str("{\"name\": ").unwrap_err();
        assert!(matches!(err, LabError::JsonError { .. }));
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog
            .instantiate("flux_capacitor", "fc-1", Position::default())
            .is_none());
        let led = catalog
            .instantiate("led", "led-2", Position::new(5.0, 5.0))
            .unwrap();
        assert_eq!(led.pins.len(), 2);
        assert_eq!(led.pins[0].name, "anode");
    }
}
