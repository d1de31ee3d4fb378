//! Error types for the wiring lab.
//!
//! Only load-time failures (catalog and configuration) are errors. Rejected
//! wiring operations, unknown ids and corrupt persisted state are handled
//! with sentinel returns or silent fallbacks and never show up here.

use thiserror::Error;

/// Result type alias using [`LabError`].
pub type Result<T> = std::result::Result<T, LabError>;

#[derive(Error, Debug)]
pub enum LabError {
    // ============ Catalog Errors ============
    /// Two default placements share an id
    #[error("Duplicate node id '{id}' in catalog")]
    DuplicateNodeId { id: String },

    /// A placement id that cannot appear in a wire id
    #[error("Invalid node id '{id}': ids must be non-empty without ':' or whitespace")]
    InvalidNodeId { id: String },

    /// Two component types share a name
    #[error("Duplicate component type '{component_type}' in catalog")]
    DuplicateComponentType { component_type: String },

    /// A placement references a type the catalog does not define
    #[error("Node '{node}' uses unknown component type '{component_type}'")]
    UnknownComponentType { node: String, component_type: String },

    /// An answer-key entry references a node that is not placed by default
    #[error("Requirement '{requirement}' references unknown node '{node}'")]
    UnknownNode { requirement: String, node: String },

    /// An answer-key entry references a pin the node's type does not have
    #[error("Requirement '{requirement}' references unknown pin '{node}.{pin}'")]
    UnknownPin {
        requirement: String,
        node: String,
        pin: String,
    },

    /// An answer-key entry joins two pins of the same node, which no wire can do
    #[error("Requirement '{id}' connects node '{node}' to itself")]
    SelfLoopRequirement { id: String, node: String },

    /// Two answer-key entries share an id
    #[error("Duplicate requirement id '{id}'")]
    DuplicateRequirement { id: String },

    /// A component type declares the same pin name twice
    #[error("Component type '{component_type}' declares pin '{pin}' more than once")]
    DuplicatePin { component_type: String, pin: String },

    /// More distinct pin names than the symbol table can address
    #[error("Too many distinct pin names (limit {limit})")]
    TooManyPinNames { limit: usize },

    // ============ I/O Errors ============
    /// Error reading a catalog or configuration file
    #[error("Failed to read '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON in a catalog or configuration file
    #[error("Failed to parse JSON '{what}': {source}")]
    JsonError {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LabError {
    pub fn file_read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileReadError {
            path: path.into(),
            source,
        }
    }

    pub fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            what: what.into(),
            source,
        }
    }
}
