//! Batch lifecycle state machine
//!
//! Drives a batch through intake → inspection → grading → (disposal |
//! cleaning) → ready-for-packaging, forking a rejection sibling when an
//! inspection splits a batch. Every operation validates against the current
//! state and returns a structured error on failure without mutating
//! anything; persistence and concurrency control live in the store layer.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::core::config::{Config, Tolerances};
use crate::core::identity::{BatchId, DerivedKind};
use crate::core::weight;
use crate::entities::batch::{
    Batch, BatchState, ChecklistItem, Grade, InspectionRecord, PackagingStatus,
};
use crate::entities::disposal::DisposalEntry;

/// Errors raised by lifecycle operations
///
/// Mass-mismatch variants carry both totals so the caller can render an
/// inline correction prompt; none of these are retried automatically.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid state transition: {from} → {to}")]
    InvalidTransition { from: BatchState, to: BatchState },

    #[error("batch {id} is not in {expected} (current: {current})")]
    WrongState {
        id: BatchId,
        expected: BatchState,
        current: BatchState,
    },

    #[error("mass must be positive (got {mass:.3} kg)")]
    NonPositiveMass { mass: f64 },

    #[error("rejected mass must not be negative (got {rejected:.3} kg)")]
    NegativeRejectedMass { rejected: f64 },

    #[error("rejected mass {rejected:.3} kg exceeds batch mass {actual:.3} kg")]
    RejectedExceedsActual { rejected: f64, actual: f64 },

    #[error("grade {grade} mass must not be negative (got {mass:.3} kg)")]
    NegativeGradeMass { grade: Grade, mass: f64 },

    #[error(
        "graded masses sum to {graded_total:.3} kg but accepted mass is \
         {accepted:.3} kg (tolerance {tolerance:.3} kg)"
    )]
    GradeMassMismatch {
        graded_total: f64,
        accepted: f64,
        tolerance: f64,
    },

    #[error("disposal requires at least one entry")]
    NoDisposalEntries,

    #[error(
        "disposal entries sum to {entry_total:.3} kg but rejected mass is \
         {rejected:.3} kg (tolerance {tolerance:.3} kg)"
    )]
    DisposalMassMismatch {
        entry_total: f64,
        rejected: f64,
        tolerance: f64,
    },

    #[error("cleaning must be explicitly confirmed before release")]
    CleaningNotConfirmed,
}

/// Result of an inspection: the updated batch and, when mass was split,
/// the new sibling carrying the rejected portion
#[derive(Debug)]
pub struct InspectionOutcome {
    pub batch: Batch,
    pub rejected_sibling: Option<Batch>,
}

/// The batch lifecycle engine
pub struct LifecycleEngine {
    tolerances: Tolerances,
    inspection_window: Duration,
    packaging_window: Duration,
}

impl LifecycleEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            tolerances: config.tolerances.clone(),
            inspection_window: Duration::hours(config.schedule.inspection_window_hours),
            packaging_window: Duration::hours(config.schedule.packaging_window_hours),
        }
    }

    /// Check if a state transition is valid
    pub fn is_valid_transition(from: BatchState, to: BatchState) -> bool {
        matches!(
            (from, to),
            // Normal forward transitions
            (BatchState::Inspection, BatchState::Grading)
                | (BatchState::Inspection, BatchState::Disposal)
                | (BatchState::Grading, BatchState::Cleaning)
                | (BatchState::Disposal, BatchState::Disposed)
                | (BatchState::Cleaning, BatchState::ReadyForPackaging)
                | (BatchState::ReadyForPackaging, BatchState::Completed)
                // Operator correction path
                | (BatchState::Disposal, BatchState::Inspection)
        )
    }

    /// Get allowed transitions from the current state
    pub fn allowed_transitions(current: BatchState) -> Vec<BatchState> {
        match current {
            BatchState::Inspection => vec![BatchState::Grading, BatchState::Disposal],
            BatchState::Grading => vec![BatchState::Cleaning],
            BatchState::Disposal => vec![BatchState::Disposed, BatchState::Inspection],
            BatchState::Cleaning => vec![BatchState::ReadyForPackaging],
            BatchState::ReadyForPackaging => vec![BatchState::Completed],
            BatchState::Completed | BatchState::Disposed => vec![],
        }
    }

    /// Register an intake delivery, creating a batch in `Inspection`
    ///
    /// The inspection deadline is set from the intake time.
    pub fn intake(
        &self,
        variety: String,
        origin: String,
        stated_mass: f64,
        actual_mass: f64,
    ) -> Result<Batch, LifecycleError> {
        if stated_mass <= 0.0 {
            return Err(LifecycleError::NonPositiveMass { mass: stated_mass });
        }
        if actual_mass <= 0.0 {
            return Err(LifecycleError::NonPositiveMass { mass: actual_mass });
        }
        let due_at = Utc::now() + self.inspection_window;
        Ok(Batch::new(variety, origin, stated_mass, actual_mass, due_at))
    }

    /// Record a quality inspection
    ///
    /// Splits the batch when part of the mass is rejected: the original
    /// carries the accepted mass forward into `Grading` while a new `-REJ`
    /// sibling carries the rejected mass into `Disposal`. The two masses
    /// always sum to the mass the batch carried before the inspection.
    pub fn inspect(
        &self,
        batch: &Batch,
        rejected_mass: f64,
        checklist: Vec<ChecklistItem>,
        inspector: &str,
    ) -> Result<InspectionOutcome, LifecycleError> {
        self.expect_state(batch, BatchState::Inspection)?;

        if rejected_mass < 0.0 {
            return Err(LifecycleError::NegativeRejectedMass {
                rejected: rejected_mass,
            });
        }
        let eps = self.tolerances.mass_epsilon_kg;
        if rejected_mass > batch.actual_mass + eps {
            return Err(LifecycleError::RejectedExceedsActual {
                rejected: rejected_mass,
                actual: batch.actual_mass,
            });
        }

        let accepted = batch.actual_mass - rejected_mass;
        let mut updated = batch.clone();

        if accepted <= eps {
            // Nothing usable survives; the whole batch heads for disposal.
            updated.inspection = Some(InspectionRecord {
                accepted_mass: 0.0,
                rejected_mass: batch.actual_mass,
                checklist,
                inspector: inspector.to_string(),
                timestamp: Utc::now(),
            });
            updated.state = BatchState::Disposal;
            return Ok(InspectionOutcome {
                batch: updated,
                rejected_sibling: None,
            });
        }

        updated.inspection = Some(InspectionRecord {
            accepted_mass: accepted,
            rejected_mass,
            checklist,
            inspector: inspector.to_string(),
            timestamp: Utc::now(),
        });
        updated.state = BatchState::Grading;

        if rejected_mass <= eps {
            return Ok(InspectionOutcome {
                batch: updated,
                rejected_sibling: None,
            });
        }

        updated.actual_mass = accepted;
        let sibling = fork_rejection(batch, rejected_mass);
        Ok(InspectionOutcome {
            batch: updated,
            rejected_sibling: Some(sibling),
        })
    }

    /// Shortcut for marking an entire batch rejected without per-field entry
    pub fn reject_all(
        &self,
        batch: &Batch,
        checklist: Vec<ChecklistItem>,
        inspector: &str,
    ) -> Result<InspectionOutcome, LifecycleError> {
        self.inspect(batch, batch.actual_mass, checklist, inspector)
    }

    /// Return a batch awaiting disposal to `Inspection` (operator correction)
    pub fn reopen(&self, batch: &Batch) -> Result<Batch, LifecycleError> {
        self.expect_state(batch, BatchState::Disposal)?;

        let mut updated = batch.clone();
        updated.inspection = None;
        updated.disposal.clear();
        updated.state = BatchState::Inspection;
        Ok(updated)
    }

    /// Record grading results, allocating the accepted mass across grades
    pub fn grade(
        &self,
        batch: &Batch,
        allocation: BTreeMap<Grade, f64>,
        grader: &str,
    ) -> Result<Batch, LifecycleError> {
        self.expect_state(batch, BatchState::Grading)?;

        for (grade, mass) in &allocation {
            if *mass < 0.0 {
                return Err(LifecycleError::NegativeGradeMass {
                    grade: *grade,
                    mass: *mass,
                });
            }
        }

        let graded_total: f64 = allocation.values().sum();
        let accepted = batch.accepted_mass().unwrap_or(batch.actual_mass);

        weight::reconcile(accepted, graded_total, self.tolerances.grading_kg).map_err(|m| {
            LifecycleError::GradeMassMismatch {
                graded_total: m.actual,
                accepted: m.expected,
                tolerance: m.tolerance,
            }
        })?;

        let mut updated = batch.clone();
        updated.grade_allocation = allocation
            .into_iter()
            .filter(|(_, mass)| *mass > 0.0)
            .collect();
        updated.graded_by = Some(grader.to_string());
        updated.graded_at = Some(Utc::now());
        updated.state = BatchState::Cleaning;
        Ok(updated)
    }

    /// Commit itemized disposal entries, closing the batch as `Disposed`
    pub fn dispose(
        &self,
        batch: &Batch,
        entries: Vec<DisposalEntry>,
    ) -> Result<Batch, LifecycleError> {
        self.expect_state(batch, BatchState::Disposal)?;

        if entries.is_empty() {
            return Err(LifecycleError::NoDisposalEntries);
        }
        for entry in &entries {
            if entry.mass <= 0.0 {
                return Err(LifecycleError::NonPositiveMass { mass: entry.mass });
            }
        }

        let entry_total: f64 = entries.iter().map(|e| e.mass).sum();
        weight::reconcile(batch.rejected_mass(), entry_total, self.tolerances.disposal_kg)
            .map_err(|m| LifecycleError::DisposalMassMismatch {
                entry_total: m.actual,
                rejected: m.expected,
                tolerance: m.tolerance,
            })?;

        let mut updated = batch.clone();
        updated.disposal = entries;
        updated.state = BatchState::Disposed;
        Ok(updated)
    }

    /// Confirm cleaning, releasing the batch for packaging
    ///
    /// The packaging deadline extends from the previous deadline rather than
    /// from the confirmation time, so the SLA accumulates across the whole
    /// pipeline regardless of when each stage actually ran.
    pub fn clean(
        &self,
        batch: &Batch,
        confirmed: bool,
        operator: &str,
    ) -> Result<Batch, LifecycleError> {
        self.expect_state(batch, BatchState::Cleaning)?;

        if !confirmed {
            return Err(LifecycleError::CleaningNotConfirmed);
        }

        let mut updated = batch.clone();
        updated.packaging_state = Grade::ALL
            .iter()
            .map(|g| {
                let status = if updated.allocation(*g) > 0.0 {
                    PackagingStatus::Pending
                } else {
                    PackagingStatus::Skipped
                };
                (*g, status)
            })
            .collect();
        updated.cleaned_by = Some(operator.to_string());
        updated.cleaned_at = Some(Utc::now());
        updated.due_at = batch.due_at + self.packaging_window;
        updated.state = BatchState::ReadyForPackaging;
        Ok(updated)
    }

    fn expect_state(&self, batch: &Batch, expected: BatchState) -> Result<(), LifecycleError> {
        if batch.state != expected {
            return Err(LifecycleError::WrongState {
                id: batch.id.clone(),
                expected,
                current: batch.state,
            });
        }
        Ok(())
    }
}

/// Build the `-REJ` sibling carrying the rejected portion of a batch
fn fork_rejection(parent: &Batch, rejected_mass: f64) -> Batch {
    Batch {
        id: parent.id.derived(DerivedKind::Rejection),
        parent_id: Some(parent.id.clone()),
        variety: parent.variety.clone(),
        origin: parent.origin.clone(),
        stated_mass: rejected_mass,
        actual_mass: rejected_mass,
        state: BatchState::Disposal,
        inspection: None,
        grade_allocation: BTreeMap::new(),
        graded_by: None,
        graded_at: None,
        cleaned_by: None,
        cleaned_at: None,
        packaging_state: BTreeMap::new(),
        disposal: Vec::new(),
        due_at: parent.due_at,
        created_at: Utc::now(),
        revision: 1,
    }
}
