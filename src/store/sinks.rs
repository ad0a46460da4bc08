//! Boundary sink contracts
//!
//! The pipeline core emits deltas into three external collaborators: the
//! aggregate inventory store, the append-only stock-movement ledger, and a
//! downstream sellable-unit counter. The reference implementations here are
//! backed by the same SQLite store; within a packaging run the inventory and
//! ledger writes happen inside the run's transaction (see
//! [`SqliteStore::commit_pack`](super::SqliteStore::commit_pack)), so a sink
//! failure rolls the whole run back. The unit counter is best-effort by
//! contract: callers log a failed increment and move on.

use crate::entities::batch::Grade;
use crate::entities::packaging::StockMovement;

use super::sqlite::{append_movement, bump_counter, upsert_inventory, SqliteStore};
use super::StoreError;

/// Aggregate inventory store: one net increment per committed packaging run
///
/// Idempotency across retries is the sink's responsibility; the core only
/// guarantees exactly one call per committed run with the correct net mass.
pub trait InventorySink {
    fn increment(&mut self, variety: &str, grade: Grade, mass_delta: f64)
        -> Result<(), StoreError>;
}

/// Append-only stock-movement ledger
pub trait MovementLedger {
    fn append(&mut self, movement: &StockMovement) -> Result<(), StoreError>;
}

/// Downstream sellable-unit counter, tolerant of missing keys
pub trait UnitCounter {
    fn increment_by(&mut self, product_key: &str, units: u64) -> Result<(), StoreError>;
}

impl InventorySink for SqliteStore {
    fn increment(
        &mut self,
        variety: &str,
        grade: Grade,
        mass_delta: f64,
    ) -> Result<(), StoreError> {
        upsert_inventory(self.connection(), variety, grade, mass_delta)
    }
}

impl MovementLedger for SqliteStore {
    fn append(&mut self, movement: &StockMovement) -> Result<(), StoreError> {
        append_movement(self.connection(), movement)
    }
}

impl UnitCounter for SqliteStore {
    fn increment_by(&mut self, product_key: &str, units: u64) -> Result<(), StoreError> {
        bump_counter(self.connection(), product_key, units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::entities::packaging::MovementKind;

    #[test]
    fn test_sink_impls_share_the_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        store.increment("strawberry", Grade::A, 12.0).unwrap();
        store
            .append(&StockMovement {
                kind: MovementKind::Out,
                variety: "strawberry".to_string(),
                grade: Grade::A,
                mass: 2.0,
                reference: "DISPATCH-1".to_string(),
                actor: "warehouse".to_string(),
                timestamp: Utc::now(),
            })
            .unwrap();
        store.increment_by("strawberry-a", 60).unwrap();

        assert_eq!(store.stock_levels().unwrap().len(), 1);
        assert_eq!(store.movements(10).unwrap().len(), 1);
        assert_eq!(store.unit_count("strawberry-a").unwrap(), 60);
    }
}
