use serde::{Deserialize, Serialize};
use std::fmt;

/// Logic level carried by a pin. The sandbox only models two levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinValue {
    #[default]
    Low,
    High,
}

impl PinValue {
    /// Level every pin returns to on reset.
    pub const INACTIVE: PinValue = PinValue::Low;

    pub fn to_str(&self) -> &'static str {
        match self {
            PinValue::Low => "Low",
            PinValue::High => "High",
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            PinValue::Low => '0',
            PinValue::High => '1',
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            PinValue::High
        } else {
            PinValue::Low
        }
    }

    pub fn to_bool(&self) -> bool {
        matches!(self, PinValue::High)
    }

    pub fn toggled(&self) -> Self {
        match self {
            PinValue::Low => PinValue::High,
            PinValue::High => PinValue::Low,
        }
    }
}

/// Electrical role of a pin, used by the clock to decide how the pin changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinRole {
    Input,
    Output,
    Power,
    Ground,
    #[default]
    Passive,
}

impl PinRole {
    pub fn to_str(&self) -> &'static str {
        match self {
            PinRole::Input => "input",
            PinRole::Output => "output",
            PinRole::Power => "power",
            PinRole::Ground => "ground",
            PinRole::Passive => "passive",
        }
    }
}

/// Interned pin name. Keys are handed out by the catalog's symbol table, so
/// two pins compare equal for matching purposes iff their names are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinKey(pub u16);

/// A pin on a placed node. Its position in the node's pin list is its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSpec {
    pub name: String,
    pub key: PinKey,
    pub role: PinRole,
    #[serde(default)]
    pub level: PinValue,
}

impl PinSpec {
    pub fn new(name: impl Into<String>, key: PinKey, role: PinRole) -> Self {
        PinSpec {
            name: name.into(),
            key,
            role,
            level: PinValue::INACTIVE,
        }
    }

    /// Same name, key and role. Levels are ignored.
    pub fn same_shape(&self, other: &PinSpec) -> bool {
        self.name == other.name && self.key == other.key && self.role == other.role
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl fmt::Display for PinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.role, self.level)
    }
}
