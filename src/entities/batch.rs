//! Batch entity - the unit of traceability for a quantity of material

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::BatchId;
use crate::entities::disposal::DisposalEntry;

/// Quality tier assigned during grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    A,
    B,
    C,
}

impl Grade {
    /// All grade tiers, in allocation order
    pub const ALL: [Grade; 3] = [Grade::A, Grade::B, Grade::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "a",
            Grade::B => "b",
            Grade::C => "c",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(Grade::A),
            "b" => Ok(Grade::B),
            "c" => Ok(Grade::C),
            _ => Err(format!("Unknown grade: {}", s)),
        }
    }
}

/// Lifecycle state of a batch
///
/// `Completed` and `Disposed` are the two terminal (closed) states; a closed
/// batch is never deleted, closure is a flag rather than a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum BatchState {
    #[default]
    Inspection,
    Grading,
    Disposal,
    Cleaning,
    ReadyForPackaging,
    Completed,
    Disposed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Disposed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Inspection => "inspection",
            BatchState::Grading => "grading",
            BatchState::Disposal => "disposal",
            BatchState::Cleaning => "cleaning",
            BatchState::ReadyForPackaging => "ready_for_packaging",
            BatchState::Completed => "completed",
            BatchState::Disposed => "disposed",
        }
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BatchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inspection" => Ok(BatchState::Inspection),
            "grading" => Ok(BatchState::Grading),
            "disposal" => Ok(BatchState::Disposal),
            "cleaning" => Ok(BatchState::Cleaning),
            "ready_for_packaging" => Ok(BatchState::ReadyForPackaging),
            "completed" => Ok(BatchState::Completed),
            "disposed" => Ok(BatchState::Disposed),
            _ => Err(format!("Unknown batch state: {}", s)),
        }
    }
}

/// Coarse outcome derived from the lifecycle state, for display and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    ReadyForPackaging,
    Completed,
    Disposed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::InProgress => write!(f, "in_progress"),
            Outcome::ReadyForPackaging => write!(f, "ready_for_packaging"),
            Outcome::Completed => write!(f, "completed"),
            Outcome::Disposed => write!(f, "disposed"),
        }
    }
}

/// Per-grade packaging progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingStatus {
    Pending,
    Completed,
    Skipped,
}

impl std::fmt::Display for PackagingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackagingStatus::Pending => write!(f, "pending"),
            PackagingStatus::Completed => write!(f, "completed"),
            PackagingStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A single inspection checklist result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub label: String,
    pub passed: bool,
}

/// Outcome of the quality inspection step, stored on the batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionRecord {
    /// Mass that passed inspection (kg)
    pub accepted_mass: f64,

    /// Mass that failed inspection (kg)
    pub rejected_mass: f64,

    /// Checklist results recorded by the inspector
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ChecklistItem>,

    /// Inspector identity (opaque string supplied by the operator)
    pub inspector: String,

    /// When the inspection was recorded
    pub timestamp: DateTime<Utc>,
}

/// A traceable quantity of material at some stage of processing
///
/// Derived batches (rejection siblings, packaging remainders) are full peers
/// with their own lifecycle; `parent_id` is the structural lineage reference,
/// the `-REJ`/`-REM` id suffixes exist only for human audit legibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier
    pub id: BatchId,

    /// Batch this one was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BatchId>,

    /// Produce variety (e.g. "strawberry")
    pub variety: String,

    /// Source origin (grower, field, or supplier reference)
    pub origin: String,

    /// Mass stated on the delivery paperwork (kg)
    pub stated_mass: f64,

    /// Mass this batch is responsible for carrying from this point forward (kg)
    pub actual_mass: f64,

    /// Current lifecycle state
    #[serde(default)]
    pub state: BatchState,

    /// Inspection results, populated by the inspection step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<InspectionRecord>,

    /// Mass allocated per grade (kg), set at grading; mutated only by
    /// packaging runs thereafter
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub grade_allocation: BTreeMap<Grade, f64>,

    /// Who recorded the grading and when
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<DateTime<Utc>>,

    /// Who confirmed the cleaning and when
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_at: Option<DateTime<Utc>>,

    /// Per-grade packaging progress, set at cleaning
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packaging_state: BTreeMap<Grade, PackagingStatus>,

    /// Itemized waste-disposal entries, set at disposal commit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disposal: Vec<DisposalEntry>,

    /// Service-level deadline for the next pipeline stage
    pub due_at: DateTime<Utc>,

    /// Creation timestamp; the tie-break ordering key for consolidation
    pub created_at: DateTime<Utc>,

    /// Optimistic-concurrency version, bumped on every committed write
    #[serde(default = "default_revision")]
    pub revision: u64,
}

fn default_revision() -> u64 {
    1
}

impl Batch {
    /// Create a new batch in the `Inspection` state
    pub fn new(
        variety: String,
        origin: String,
        stated_mass: f64,
        actual_mass: f64,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BatchId::generate(),
            parent_id: None,
            variety,
            origin,
            stated_mass,
            actual_mass,
            state: BatchState::Inspection,
            inspection: None,
            grade_allocation: BTreeMap::new(),
            graded_by: None,
            graded_at: None,
            cleaned_by: None,
            cleaned_at: None,
            packaging_state: BTreeMap::new(),
            disposal: Vec::new(),
            due_at,
            created_at: Utc::now(),
            revision: 1,
        }
    }

    /// Coarse outcome for display and filtering
    pub fn outcome(&self) -> Outcome {
        match self.state {
            BatchState::Completed => Outcome::Completed,
            BatchState::Disposed => Outcome::Disposed,
            BatchState::ReadyForPackaging => Outcome::ReadyForPackaging,
            _ => Outcome::InProgress,
        }
    }

    /// Mass that passed inspection, if the batch has been inspected
    pub fn accepted_mass(&self) -> Option<f64> {
        self.inspection.as_ref().map(|i| i.accepted_mass)
    }

    /// Mass awaiting (or recorded as) disposal
    ///
    /// A whole-batch rejection records the full mass on the inspection block;
    /// a forked rejection sibling carries the rejected portion as its own
    /// `actual_mass` and has no inspection block of its own.
    pub fn rejected_mass(&self) -> f64 {
        self.inspection
            .as_ref()
            .map(|i| i.rejected_mass)
            .unwrap_or(self.actual_mass)
    }

    /// Unconsumed mass allocated to a grade (kg)
    pub fn allocation(&self, grade: Grade) -> f64 {
        self.grade_allocation.get(&grade).copied().unwrap_or(0.0)
    }

    /// Total unconsumed mass across all grade allocations (kg)
    pub fn allocated_total(&self) -> f64 {
        self.grade_allocation.values().sum()
    }

    /// Packaging progress for a grade, if cleaning has run
    pub fn packaging_status(&self, grade: Grade) -> Option<PackagingStatus> {
        self.packaging_state.get(&grade).copied()
    }

    /// Whether this batch can contribute to a packaging run for `grade`
    pub fn is_eligible_for(&self, grade: Grade) -> bool {
        self.state == BatchState::ReadyForPackaging
            && self.packaging_status(grade) == Some(PackagingStatus::Pending)
            && self.allocation(grade) > 0.0
    }

    /// Whether every grade is settled (completed or skipped)
    pub fn all_grades_settled(&self) -> bool {
        Grade::ALL.iter().all(|g| {
            matches!(
                self.packaging_status(*g),
                Some(PackagingStatus::Completed) | Some(PackagingStatus::Skipped)
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> Batch {
        Batch::new(
            "strawberry".to_string(),
            "field-7".to_string(),
            100.0,
            99.5,
            Utc::now(),
        )
    }

    #[test]
    fn test_batch_roundtrip() {
        let batch = sample_batch();

        let yaml = serde_yml::to_string(&batch).unwrap();
        let parsed: Batch = serde_yml::from_str(&yaml).unwrap();

        assert_eq!(batch.id, parsed.id);
        assert_eq!(batch.variety, parsed.variety);
        assert_eq!(parsed.state, BatchState::Inspection);
        assert_eq!(parsed.revision, 1);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let mut batch = sample_batch();
        batch.state = BatchState::ReadyForPackaging;

        let yaml = serde_yml::to_string(&batch).unwrap();
        assert!(yaml.contains("state: ready_for_packaging"));
    }

    #[test]
    fn test_outcome_derivation() {
        let mut batch = sample_batch();
        assert_eq!(batch.outcome(), Outcome::InProgress);

        batch.state = BatchState::ReadyForPackaging;
        assert_eq!(batch.outcome(), Outcome::ReadyForPackaging);

        batch.state = BatchState::Completed;
        assert_eq!(batch.outcome(), Outcome::Completed);

        batch.state = BatchState::Disposed;
        assert_eq!(batch.outcome(), Outcome::Disposed);
    }

    #[test]
    fn test_eligibility_requires_pending_grade_with_mass() {
        let mut batch = sample_batch();
        batch.state = BatchState::ReadyForPackaging;
        batch.grade_allocation.insert(Grade::A, 30.0);
        batch.packaging_state.insert(Grade::A, PackagingStatus::Pending);
        batch.packaging_state.insert(Grade::B, PackagingStatus::Skipped);
        batch.packaging_state.insert(Grade::C, PackagingStatus::Skipped);

        assert!(batch.is_eligible_for(Grade::A));
        assert!(!batch.is_eligible_for(Grade::B));

        batch.packaging_state.insert(Grade::A, PackagingStatus::Completed);
        assert!(!batch.is_eligible_for(Grade::A));
    }

    #[test]
    fn test_all_grades_settled() {
        let mut batch = sample_batch();
        assert!(!batch.all_grades_settled());

        for g in Grade::ALL {
            batch.packaging_state.insert(g, PackagingStatus::Skipped);
        }
        assert!(batch.all_grades_settled());

        batch.packaging_state.insert(Grade::B, PackagingStatus::Pending);
        assert!(!batch.all_grades_settled());
    }

    #[test]
    fn test_grade_parses_case_insensitive() {
        assert_eq!("A".parse::<Grade>().unwrap(), Grade::A);
        assert_eq!("b".parse::<Grade>().unwrap(), Grade::B);
        assert!("d".parse::<Grade>().is_err());
    }
}
