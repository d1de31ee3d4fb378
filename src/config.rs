//! Lab configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "tick_period_ms": 250,
//!   "seed": 7,
//!   "state_dir": ".wiring-lab",
//!   "catalog_path": "catalogs/blink_button.json",
//!   "console": { "refresh_rate_ms": 100 }
//! }
//! ```

use crate::catalog::Catalog;
use crate::clock::{MockLogicStrategy, SimulationClock, DEFAULT_TICK_PERIOD};
use crate::console::ConsoleConfig;
use crate::error::{LabError, Result};
use crate::persistence::{JsonFilePersistence, NullPersistence, Persistence};
use crate::sandbox::Sandbox;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub tick_period_ms: u64,
    /// Seed for the mock input levels. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Directory for persisted board state. `None` disables persistence.
    pub state_dir: Option<PathBuf>,
    /// Catalog JSON file. `None` uses the bundled lab.
    pub catalog_path: Option<PathBuf>,
    pub console: ConsoleConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD.as_millis() as u64,
            seed: None,
            state_dir: None,
            catalog_path: None,
            console: ConsoleConfig::default(),
        }
    }
}

impl LabConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LabError::file_read(path.display().to_string(), e))?;
        Self::from_json_str(&content).map_err(|e| match e {
            LabError::JsonError { source, .. } => LabError::json(path.display().to_string(), source),
            other => other,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LabError::json("config", e))
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::from_json_file(path),
            None => Catalog::builtin(),
        }
    }

    pub fn build_clock(&self) -> SimulationClock {
        let strategy = match self.seed {
            Some(seed) => MockLogicStrategy::seeded(seed),
            None => MockLogicStrategy::from_entropy(),
        };
        SimulationClock::new(self.tick_period(), Box::new(strategy))
    }

    pub fn build_persistence(&self) -> Box<dyn Persistence> {
        match &self.state_dir {
            Some(dir) => Box::new(JsonFilePersistence::new(dir)),
            None => Box::new(NullPersistence),
        }
    }

    pub fn build_sandbox(&self) -> Result<Sandbox> {
        let catalog = self.load_catalog()?;
        Ok(Sandbox::new(
            catalog,
            self.build_persistence(),
            self.build_clock(),
        ))
    }
}
