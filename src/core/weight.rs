//! Mass reconciliation helpers
//!
//! Two masses that are expected to match rarely match bit-for-bit: grading
//! and disposal figures are typed in from scale readings, while packaging
//! deductions are machine-computed. The stage tolerances reflect that
//! difference and are configurable per project.

use thiserror::Error;

/// Default tolerance for grading reconciliation (kg)
pub const GRADING_TOLERANCE_KG: f64 = 0.05;

/// Default tolerance for disposal reconciliation (kg)
pub const DISPOSAL_TOLERANCE_KG: f64 = 0.05;

/// Epsilon for machine-computed packaging mass accounting (kg)
pub const MASS_EPSILON_KG: f64 = 0.001;

/// Structured mismatch between an expected and an actual mass
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected:.3} kg, got {actual:.3} kg (tolerance {tolerance:.3} kg)")]
pub struct MassMismatch {
    pub expected: f64,
    pub actual: f64,
    pub tolerance: f64,
}

impl MassMismatch {
    /// Signed discrepancy (actual minus expected, kg)
    pub fn delta(&self) -> f64 {
        self.actual - self.expected
    }
}

/// Whether two masses agree within `eps` kilograms
pub fn within_tolerance(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Check an actual mass against an expected one, returning a structured
/// mismatch carrying both totals on failure
pub fn reconcile(expected: f64, actual: f64, tolerance: f64) -> Result<(), MassMismatch> {
    if within_tolerance(expected, actual, tolerance) {
        Ok(())
    } else {
        Err(MassMismatch {
            expected,
            actual,
            tolerance,
        })
    }
}
