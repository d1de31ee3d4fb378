//! # Wiring Lab
//!
//! An educational circuit-wiring sandbox. Users place components, connect
//! their pins with wires, and the lab checks the wiring against an answer
//! key before unlocking a mock simulation that animates pin levels.
//!
//! This library provides:
//! - A JSON-described component catalog with an answer key of required connections
//! - A node/wire store with change notifications
//! - A matcher that tracks which required connections the current wires satisfy
//! - A simulation clock that only runs once every connection is made
//! - Pluggable persistence and a terminal front-end

pub mod board;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod persistence;
pub mod pin;
pub mod sandbox;

// Re-export commonly used items for easier importing
pub use board::{Board, BoardEvent, Node, Position, Wire, WireEnd};
pub use catalog::{Catalog, RequiredConnection};
pub use clock::{ClockState, PinStateStrategy, SimulationClock, StartRejected};
pub use config::LabConfig;
pub use connection::{CompletionMap, Matcher};
pub use error::{LabError, Result};
pub use pin::{PinKey, PinRole, PinSpec, PinValue};
pub use sandbox::{Intent, IntentOutcome, PinSelection, Sandbox};
