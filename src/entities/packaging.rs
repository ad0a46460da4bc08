//! Packaging audit records and inventory-side types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::BatchId;
use crate::entities::batch::Grade;

/// Durable audit record of one batch's contribution to a packaging run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingRecord {
    /// Packaging run this record belongs to
    pub run_id: String,

    /// Contributing batch
    pub batch_id: BatchId,

    pub variety: String,
    pub grade: Grade,

    /// Mass deducted from this batch's grade allocation (kg); exact, no
    /// rounding slack
    pub mass_consumed: f64,

    /// Units attributed to this batch for audit purposes; proportional and
    /// rounded, so the sum across a run may differ from the requested count
    /// by a unit or two
    pub units_attributed: u64,

    /// Mass left in this batch's grade allocation after the deduction (kg)
    pub remaining_mass: f64,

    pub operator: String,
    pub timestamp: DateTime<Utc>,
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    In,
    Out,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            _ => Err(format!("Unknown movement kind: {}", s)),
        }
    }
}

/// One entry in the append-only stock-movement ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub kind: MovementKind,
    pub variety: String,
    pub grade: Grade,

    /// Moved mass (kg)
    pub mass: f64,

    /// Reference to the operation that caused the movement (e.g. a run id)
    pub reference: String,

    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate inventory level for one (variety, grade) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    pub variety: String,
    pub grade: Grade,

    /// Accumulated mass (kg)
    pub mass: f64,
}

/// Product key used by the downstream sellable-unit counter
pub fn product_key(variety: &str, grade: Grade) -> String {
    format!("{}-{}", variety.to_lowercase(), grade)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_kind_roundtrip() {
        assert_eq!("in".parse::<MovementKind>().unwrap(), MovementKind::In);
        assert_eq!("out".parse::<MovementKind>().unwrap(), MovementKind::Out);
        assert!("sideways".parse::<MovementKind>().is_err());
    }

    #[test]
    fn test_product_key_is_lowercase() {
        assert_eq!(product_key("Strawberry", Grade::A), "strawberry-a");
    }
}
