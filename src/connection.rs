use crate::board::{Board, Wire};
use crate::catalog::RequiredConnection;
use crate::pin::PinKey;
use std::collections::BTreeMap;

/// Requirement id -> satisfied. Always derived from the board's wires.
pub type CompletionMap = BTreeMap<String, bool>;

/// A single checklist row for progress display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    pub satisfied: bool,
}

/// Checks wires against the answer key and tracks which requirements hold.
#[derive(Debug, Clone)]
pub struct Matcher {
    requirements: Vec<RequiredConnection>,
    completion: CompletionMap,
}

impl Matcher {
    pub fn new(requirements: Vec<RequiredConnection>) -> Self {
        let completion = requirements
            .iter()
            .map(|r| (r.id.clone(), false))
            .collect();
        Matcher {
            requirements,
            completion,
        }
    }

    pub fn requirements(&self) -> &[RequiredConnection] {
        &self.requirements
    }

    pub fn completion(&self) -> &CompletionMap {
        &self.completion
    }

    pub fn is_satisfied(&self, id: &str) -> bool {
        self.completion.get(id).copied().unwrap_or(false)
    }

    /// Every requirement holds. Vacuously true for an empty answer key.
    pub fn all_satisfied(&self) -> bool {
        self.completion.values().all(|done| *done)
    }

    pub fn satisfied_count(&self) -> usize {
        self.completion.values().filter(|done| **done).count()
    }

    pub fn remaining(&self) -> usize {
        self.completion.len() - self.satisfied_count()
    }

    /// Incremental update for one newly created wire. Marks at most one
    /// outstanding requirement and returns its id.
    pub fn on_wire_added(&mut self, board: &Board, wire: &Wire) -> Option<String> {
        let (a, b) = resolve_wire(board, wire)?;
        let requirement = self
            .requirements
            .iter()
            .filter(|r| !self.completion.get(&r.id).copied().unwrap_or(false))
            .find(|r| r.matches(a, b))?;

        let id = requirement.id.clone();
        self.completion.insert(id.clone(), true);
        log::debug!("Wire {} satisfies requirement '{}'", wire.id, id);
        Some(id)
    }

    /// Rebuild the map from every live wire on the board. Returns whether
    /// any entry changed.
    pub fn recompute(&mut self, board: &Board) -> bool {
        let resolved: Vec<_> = board
            .wires()
            .iter()
            .filter_map(|w| resolve_wire(board, w))
            .collect();

        let mut changed = false;
        for requirement in &self.requirements {
            let satisfied = resolved.iter().any(|(a, b)| requirement.matches(*a, *b));
            let previous = self.completion.insert(requirement.id.clone(), satisfied);
            if previous != Some(satisfied) {
                changed = true;
            }
        }
        if changed {
            log::debug!(
                "Completion recomputed: {}/{} satisfied",
                self.satisfied_count(),
                self.completion.len()
            );
        }
        changed
    }

    pub fn clear(&mut self) {
        for done in self.completion.values_mut() {
            *done = false;
        }
    }

    /// Requirements in answer-key order with their current state.
    pub fn checklist(&self) -> Vec<ChecklistItem> {
        self.requirements
            .iter()
            .map(|r| ChecklistItem {
                id: r.id.clone(),
                label: r.label.clone(),
                satisfied: self.is_satisfied(&r.id),
            })
            .collect()
    }
}

/// Both ends of a wire as `(node id, pin key)`, or `None` for a dangling wire.
fn resolve_wire<'a>(board: &'a Board, wire: &Wire) -> Option<((&'a str, PinKey), (&'a str, PinKey))> {
    let from = board.resolve(&wire.from)?;
    let to = board.resolve(&wire.to)?;
    Some((from, to))
}
