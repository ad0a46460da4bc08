//! Waste-disposal entry types

use serde::{Deserialize, Serialize};

/// How a portion of rejected mass was disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalMethod {
    Composting,
    Incineration,
    AnimalFeed,
    Landfill,
}

impl DisposalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisposalMethod::Composting => "composting",
            DisposalMethod::Incineration => "incineration",
            DisposalMethod::AnimalFeed => "animal_feed",
            DisposalMethod::Landfill => "landfill",
        }
    }
}

impl std::fmt::Display for DisposalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DisposalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "composting" => Ok(DisposalMethod::Composting),
            "incineration" => Ok(DisposalMethod::Incineration),
            "animal_feed" => Ok(DisposalMethod::AnimalFeed),
            "landfill" => Ok(DisposalMethod::Landfill),
            _ => Err(format!("Unknown disposal method: {}", s)),
        }
    }
}

/// One itemized disposal line against a batch's rejected mass
///
/// The set of entries for a batch must sum to that batch's rejected mass
/// within the disposal tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalEntry {
    pub method: DisposalMethod,

    /// Disposed mass (kg)
    pub mass: f64,
}

impl DisposalEntry {
    pub fn new(method: DisposalMethod, mass: f64) -> Self {
        Self { method, mass }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_roundtrip() {
        for method in [
            DisposalMethod::Composting,
            DisposalMethod::Incineration,
            DisposalMethod::AnimalFeed,
            DisposalMethod::Landfill,
        ] {
            let parsed: DisposalMethod = method.to_string().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn test_method_accepts_dashes() {
        assert_eq!(
            "animal-feed".parse::<DisposalMethod>().unwrap(),
            DisposalMethod::AnimalFeed
        );
    }

    #[test]
    fn test_entry_serializes_method_snake_case() {
        let entry = DisposalEntry::new(DisposalMethod::AnimalFeed, 4.5);
        let yaml = serde_yml::to_string(&entry).unwrap();
        assert!(yaml.contains("method: animal_feed"));
    }
}
