//! Cross-batch packaging consolidation
//!
//! Pools ready batches that share a variety and grade and turns the pooled
//! mass into fixed-size sellable units, consuming the oldest material first.
//! Mass deduction is exact; only the per-batch unit attribution rounds.
//!
//! Planning is pure: [`Consolidator::plan`] reads the contributing batches
//! and produces a [`PackPlan`] describing every mutation, which the store
//! then commits as a single all-or-nothing transaction.

use std::collections::BTreeSet;

use chrono::Utc;
use thiserror::Error;
use tracing::error;

use crate::core::config::Config;
use crate::core::identity::{new_run_id, BatchId, DerivedKind};
use crate::entities::batch::{Batch, BatchState, Grade, PackagingStatus};
use crate::entities::packaging::PackingRecord;

/// Errors raised while planning a packaging run
///
/// All of these occur before any mutation; a rejected run leaves every
/// batch untouched.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("label and weight verification must be confirmed before a packaging run")]
    ComplianceNotConfirmed,

    #[error("no contributing batches supplied")]
    NoContributors,

    #[error("batch {id} listed twice in the same run")]
    DuplicateContributor { id: BatchId },

    #[error("batch {id} is '{batch_variety}' but the run packs '{run_variety}'")]
    VarietyMismatch {
        id: BatchId,
        batch_variety: String,
        run_variety: String,
    },

    #[error("batch {id} is not eligible for grade {grade} packing ({reason})")]
    IneligibleBatch {
        id: BatchId,
        grade: Grade,
        reason: String,
    },

    #[error("requested unit count must be positive")]
    ZeroUnits,

    #[error(
        "insufficient pooled mass: {units} units need {needed:.3} kg but only \
         {available:.3} kg is pooled"
    )]
    InsufficientMass {
        units: u64,
        needed: f64,
        available: f64,
    },

    // Programming defect, never an operator error. Logged loudly and never
    // clamped away.
    #[error("mass accounting invariant violated: {0}")]
    Invariant(String),
}

/// Planned mutations for one packaging run
#[derive(Debug)]
pub struct PackPlan {
    pub run_id: String,
    pub variety: String,
    pub grade: Grade,
    pub operator: String,

    /// Units the run will produce
    pub units: u64,

    /// Mass of one unit (kg)
    pub unit_mass: f64,

    /// Exact mass the run consumes: `units * unit_mass`
    pub mass_needed: f64,

    /// One audit record per batch actually touched
    pub records: Vec<PackingRecord>,

    /// Contributing batches with deductions applied; revisions are the
    /// loaded ones, for the store's compare-and-swap commit
    pub updates: Vec<Batch>,

    /// Remainder batch to insert, when the last touched batch was only
    /// partially consumed
    pub remainder: Option<Batch>,
}

/// The packaging consolidator
pub struct Consolidator {
    unit_mass: f64,
    mass_epsilon: f64,
}

impl Consolidator {
    pub fn new(config: &Config) -> Self {
        Self {
            unit_mass: config.packaging.unit_mass_kg,
            mass_epsilon: config.tolerances.mass_epsilon_kg,
        }
    }

    /// Most units the pooled mass can produce
    pub fn max_units(&self, pooled_mass: f64) -> u64 {
        if pooled_mass <= 0.0 {
            return 0;
        }
        ((pooled_mass / self.unit_mass) + 1e-9).floor() as u64
    }

    /// Plan a packaging run over the given contributing batches
    ///
    /// `units_requested` defaults to everything the pooled mass allows; the
    /// operator may request fewer units, never more.
    pub fn plan(
        &self,
        variety: &str,
        grade: Grade,
        contributing: Vec<Batch>,
        units_requested: Option<u64>,
        operator: &str,
        verified: bool,
    ) -> Result<PackPlan, PackagingError> {
        if !verified {
            return Err(PackagingError::ComplianceNotConfirmed);
        }
        if contributing.is_empty() {
            return Err(PackagingError::NoContributors);
        }

        let mut seen: BTreeSet<BatchId> = BTreeSet::new();
        for batch in &contributing {
            if !seen.insert(batch.id.clone()) {
                return Err(PackagingError::DuplicateContributor {
                    id: batch.id.clone(),
                });
            }
            if !batch.variety.eq_ignore_ascii_case(variety) {
                return Err(PackagingError::VarietyMismatch {
                    id: batch.id.clone(),
                    batch_variety: batch.variety.clone(),
                    run_variety: variety.to_string(),
                });
            }
            if !batch.is_eligible_for(grade) {
                return Err(PackagingError::IneligibleBatch {
                    id: batch.id.clone(),
                    grade,
                    reason: ineligibility_reason(batch, grade),
                });
            }
        }

        let pooled: f64 = contributing.iter().map(|b| b.allocation(grade)).sum();
        let units = units_requested.unwrap_or_else(|| self.max_units(pooled));
        if units == 0 {
            return Err(PackagingError::ZeroUnits);
        }

        let mass_needed = units as f64 * self.unit_mass;
        if mass_needed > pooled + self.mass_epsilon {
            return Err(PackagingError::InsufficientMass {
                units,
                needed: mass_needed,
                available: pooled,
            });
        }

        // Oldest material first; id as a deterministic tie-break.
        let mut sorted = contributing;
        sorted.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let run_id = new_run_id();
        let timestamp = Utc::now();
        let mut records = Vec::new();
        let mut updates = Vec::new();
        let mut remainder: Option<Batch> = None;
        let mut remaining = mass_needed;

        for batch in sorted {
            if remaining <= self.mass_epsilon {
                // Run already satisfied; later batches stay untouched.
                break;
            }

            let available = batch.allocation(grade);
            let deduct = available.min(remaining);
            let left = available - deduct;
            remaining -= deduct;

            if left < -self.mass_epsilon || deduct <= 0.0 {
                error!(
                    batch = %batch.id,
                    available,
                    deduct,
                    "negative mass computed during packaging walk"
                );
                return Err(PackagingError::Invariant(format!(
                    "batch {} produced a negative deduction ({:.3} kg available, {:.3} kg deducted)",
                    batch.id, available, deduct
                )));
            }

            let units_attributed =
                (deduct / mass_needed * units as f64).round() as u64;
            records.push(PackingRecord {
                run_id: run_id.clone(),
                batch_id: batch.id.clone(),
                variety: batch.variety.clone(),
                grade,
                mass_consumed: deduct,
                units_attributed,
                remaining_mass: left,
                operator: operator.to_string(),
                timestamp,
            });

            let mut updated = batch.clone();
            updated.grade_allocation.insert(grade, 0.0);
            updated.packaging_state.insert(grade, PackagingStatus::Completed);

            if left <= self.mass_epsilon {
                // Allocation fully consumed; the batch closes only once every
                // grade is settled.
                if updated.all_grades_settled() {
                    updated.state = BatchState::Completed;
                }
            } else {
                // The run was satisfied before exhausting this batch. The
                // original closes with zero residual; the leftover (and any
                // other live grades) continue as a remainder sibling.
                let sibling = fork_remainder(&batch, grade, left);
                for (g, _) in sibling.grade_allocation.iter() {
                    updated.grade_allocation.insert(*g, 0.0);
                }
                updated.state = BatchState::Completed;
                remainder = Some(sibling);
            }
            updates.push(updated);
        }

        if remaining > self.mass_epsilon {
            error!(
                run = %run_id,
                remaining,
                "packaging walk ended with mass still to deduct"
            );
            return Err(PackagingError::Invariant(format!(
                "run {} left {:.3} kg undeducted despite a sufficient pool",
                run_id, remaining
            )));
        }

        Ok(PackPlan {
            run_id,
            variety: variety.to_lowercase(),
            grade,
            operator: operator.to_string(),
            units,
            unit_mass: self.unit_mass,
            mass_needed,
            records,
            updates,
            remainder,
        })
    }
}

/// Build the `-REM` sibling carrying mass left over after a partial deduction
///
/// Besides the leftover of the packed grade, the sibling takes over every
/// other grade allocation still live on the original, so the closed original
/// retains zero residual mass.
fn fork_remainder(parent: &Batch, grade: Grade, left: f64) -> Batch {
    let mut allocation = std::collections::BTreeMap::new();
    let mut packaging_state = std::collections::BTreeMap::new();

    allocation.insert(grade, left);
    packaging_state.insert(grade, PackagingStatus::Pending);

    for g in Grade::ALL {
        if g == grade {
            continue;
        }
        let mass = parent.allocation(g);
        if mass > 0.0 {
            allocation.insert(g, mass);
            packaging_state.insert(
                g,
                parent.packaging_status(g).unwrap_or(PackagingStatus::Pending),
            );
        } else {
            packaging_state.insert(g, PackagingStatus::Skipped);
        }
    }

    let carried: f64 = allocation.values().sum();

    Batch {
        id: parent.id.derived(DerivedKind::Remainder),
        parent_id: Some(parent.id.clone()),
        variety: parent.variety.clone(),
        origin: parent.origin.clone(),
        stated_mass: carried,
        actual_mass: carried,
        state: BatchState::ReadyForPackaging,
        inspection: None,
        grade_allocation: allocation,
        graded_by: parent.graded_by.clone(),
        graded_at: parent.graded_at,
        cleaned_by: parent.cleaned_by.clone(),
        cleaned_at: parent.cleaned_at,
        packaging_state,
        disposal: Vec::new(),
        // The leftover is still the oldest material on the floor: inherit the
        // parent's position in the first-in-first-out order and its deadline.
        due_at: parent.due_at,
        created_at: parent.created_at,
        revision: 1,
    }
}

fn ineligibility_reason(batch: &Batch, grade: Grade) -> String {
    if batch.state != BatchState::ReadyForPackaging {
        return format!("state is {}", batch.state);
    }
    match batch.packaging_status(grade) {
        Some(PackagingStatus::Pending) => format!("no mass allocated to grade {}", grade),
        Some(status) => format!("grade {} already {}", grade, status),
        None => "cleaning has not run".to_string(),
    }
}
