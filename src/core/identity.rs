//! Batch and run identifiers
//!
//! Batch ids are `BAT-<ULID>`. Derived batches append a human-legible
//! suffix to the parent code (`-REJ` for rejection siblings, `-REM` for
//! packaging remainders, numbered on collision). The suffix exists for audit
//! legibility only; lineage is carried by the batch's explicit `parent_id`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// Prefix for all batch ids
pub const BATCH_PREFIX: &str = "BAT";

/// Prefix for packaging-run references
pub const RUN_PREFIX: &str = "RUN";

/// Kind of derived batch, determining the id suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    /// Sibling carrying mass that failed inspection
    Rejection,
    /// Sibling carrying mass left over after a partial packaging deduction
    Remainder,
}

impl DerivedKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            DerivedKind::Rejection => "REJ",
            DerivedKind::Remainder => "REM",
        }
    }
}

/// Error parsing a batch id
#[derive(Debug, Clone, Error)]
#[error("invalid batch id '{input}': expected BAT-<ULID> with optional -REJ/-REM suffixes")]
pub struct IdParseError {
    pub input: String,
}

/// Opaque batch identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// Generate a fresh id for an intake batch
    pub fn generate() -> Self {
        Self(format!("{}-{}", BATCH_PREFIX, Ulid::new()))
    }

    /// Derive the id for a sibling batch forked from this one
    pub fn derived(&self, kind: DerivedKind) -> Self {
        Self(format!("{}-{}", self.0, kind.suffix()))
    }

    /// Bump the trailing derivation suffix to the next free number
    /// (`-REJ` → `-REJ2` → `-REJ3`, same for `-REM`)
    ///
    /// Returns `None` when the id carries no derivation suffix.
    pub fn bump_suffix(&self) -> Option<Self> {
        let (stem, last) = self.0.rsplit_once('-')?;
        for kind in [DerivedKind::Rejection, DerivedKind::Remainder] {
            let tag = kind.suffix();
            if last == tag {
                return Some(Self(format!("{}-{}2", stem, tag)));
            }
            if let Some(n) = last.strip_prefix(tag) {
                if let Ok(n) = n.parse::<u32>() {
                    return Some(Self(format!("{}-{}{}", stem, tag, n + 1)));
                }
            }
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("BAT-").ok_or_else(|| IdParseError {
            input: s.to_string(),
        })?;
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(IdParseError {
                input: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }
}

/// Generate a fresh packaging-run reference
pub fn new_run_id() -> String {
    format!("{}-{}", RUN_PREFIX, Ulid::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_prefix() {
        let id = BatchId::generate();
        assert!(id.as_str().starts_with("BAT-"));
    }

    #[test]
    fn test_derived_suffixes() {
        let id: BatchId = "BAT-01J123".parse().unwrap();
        assert_eq!(id.derived(DerivedKind::Rejection).as_str(), "BAT-01J123-REJ");
        assert_eq!(id.derived(DerivedKind::Remainder).as_str(), "BAT-01J123-REM");
    }

    #[test]
    fn test_bump_suffix_numbers_collisions() {
        let rej: BatchId = "BAT-01J123-REJ".parse().unwrap();
        assert_eq!(rej.bump_suffix().unwrap().as_str(), "BAT-01J123-REJ2");

        let rej2: BatchId = "BAT-01J123-REJ2".parse().unwrap();
        assert_eq!(rej2.bump_suffix().unwrap().as_str(), "BAT-01J123-REJ3");

        let rem: BatchId = "BAT-01J123-REM9".parse().unwrap();
        assert_eq!(rem.bump_suffix().unwrap().as_str(), "BAT-01J123-REM10");
    }

    #[test]
    fn test_bump_suffix_requires_derivation() {
        let plain = BatchId::generate();
        assert!(plain.bump_suffix().is_none());
    }

    #[test]
    fn test_parse_rejects_foreign_prefixes() {
        assert!("LOT-01J123".parse::<BatchId>().is_err());
        assert!("BAT-".parse::<BatchId>().is_err());
        assert!("BAT-01J123".parse::<BatchId>().is_ok());
        assert!("BAT-01J123-REJ".parse::<BatchId>().is_ok());
    }

    #[test]
    fn test_nested_derivation() {
        let id: BatchId = "BAT-01J123-REM".parse().unwrap();
        assert_eq!(
            id.derived(DerivedKind::Remainder).as_str(),
            "BAT-01J123-REM-REM"
        );
    }
}
