//! Core module - lifecycle engine, consolidation, and supporting types

pub mod config;
pub mod disposal;
pub mod identity;
pub mod lifecycle;
pub mod packaging;
pub mod project;
pub mod weight;

pub use config::Config;
pub use disposal::DisposalTracker;
pub use identity::{new_run_id, BatchId, DerivedKind, IdParseError};
pub use lifecycle::{InspectionOutcome, LifecycleEngine, LifecycleError};
pub use packaging::{Consolidator, PackPlan, PackagingError};
pub use project::{Project, ProjectError};
pub use weight::{reconcile, within_tolerance, MassMismatch};
