//! Entity type definitions

pub mod batch;
pub mod disposal;
pub mod packaging;

pub use batch::{
    Batch, BatchState, ChecklistItem, Grade, InspectionRecord, Outcome, PackagingStatus,
};
pub use disposal::{DisposalEntry, DisposalMethod};
pub use packaging::{MovementKind, PackingRecord, StockLevel, StockMovement};
