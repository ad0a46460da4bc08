//! Client-side accumulation of disposal entries
//!
//! Operators itemize waste disposal line by line; the tracker keeps the
//! running total against the batch's rejected mass so the terminal can show
//! the outstanding delta before the commit is attempted. The actual commit
//! validation lives in the lifecycle engine.

use crate::core::weight;
use crate::entities::disposal::{DisposalEntry, DisposalMethod};

/// Accumulates `(method, mass)` entries against a rejected mass
#[derive(Debug, Clone)]
pub struct DisposalTracker {
    rejected_mass: f64,
    tolerance: f64,
    entries: Vec<DisposalEntry>,
}

impl DisposalTracker {
    pub fn new(rejected_mass: f64, tolerance: f64) -> Self {
        Self {
            rejected_mass,
            tolerance,
            entries: Vec::new(),
        }
    }

    /// Add one entry to the running set
    pub fn add(&mut self, method: DisposalMethod, mass: f64) {
        self.entries.push(DisposalEntry::new(method, mass));
    }

    /// Remove the most recently added entry
    pub fn undo(&mut self) -> Option<DisposalEntry> {
        self.entries.pop()
    }

    /// Sum of all entries so far (kg)
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.mass).sum()
    }

    /// Mass still unaccounted for (kg); negative when over-entered
    pub fn outstanding(&self) -> f64 {
        self.rejected_mass - self.total()
    }

    /// Whether the running total reconciles within tolerance
    pub fn balanced(&self) -> bool {
        weight::within_tolerance(self.rejected_mass, self.total(), self.tolerance)
    }

    pub fn rejected_mass(&self) -> f64 {
        self.rejected_mass
    }

    pub fn entries(&self) -> &[DisposalEntry] {
        &self.entries
    }

    /// Hand the accumulated entries to the commit path
    pub fn into_entries(self) -> Vec<DisposalEntry> {
        self.entries
    }
}
