//! Project configuration
//!
//! Loaded from `.fpt/config.yaml`, falling back to a user-level
//! `config.yaml` (via the platform config directory) and finally to
//! defaults. Every knob the pipeline validates against lives here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::project::Project;
use crate::core::weight;

/// Mass tolerances per reconciliation stage (kg)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Grading reconciliation (human-entered scale readings)
    pub grading_kg: f64,

    /// Disposal reconciliation (human-entered scale readings)
    pub disposal_kg: f64,

    /// Packaging mass accounting (machine-computed deductions)
    pub mass_epsilon_kg: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            grading_kg: weight::GRADING_TOLERANCE_KG,
            disposal_kg: weight::DISPOSAL_TOLERANCE_KG,
            mass_epsilon_kg: weight::MASS_EPSILON_KG,
        }
    }
}

/// Packaging parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Packaging {
    /// Mass of one sellable pack (kg)
    pub unit_mass_kg: f64,
}

impl Default for Packaging {
    fn default() -> Self {
        Self { unit_mass_kg: 0.2 }
    }
}

/// Service-level windows driving batch due times
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    /// Hours from intake to the inspection deadline
    pub inspection_window_hours: i64,

    /// Hours added to the previous deadline when a batch is released for
    /// packaging (cumulative SLA across the pipeline)
    pub packaging_window_hours: i64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            inspection_window_hours: 24,
            packaging_window_hours: 48,
        }
    }
}

/// Project configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tolerances: Tolerances,
    pub packaging: Packaging,
    pub schedule: Schedule,

    /// Default operator identity recorded on mutating operations when no
    /// `--operator` flag or `FPT_OPERATOR` variable is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<String>,
}

impl Config {
    /// Load configuration for a project
    ///
    /// Order: project `.fpt/config.yaml`, then the user-level config file,
    /// then built-in defaults. Unreadable files fall through rather than
    /// aborting read-only commands.
    pub fn load(project: &Project) -> Self {
        if let Some(config) = Self::read_from(&project.config_path()) {
            return config;
        }
        if let Some(path) = Self::user_config_path() {
            if let Some(config) = Self::read_from(&path) {
                return config;
            }
        }
        Self::default()
    }

    /// Write this configuration to the project's config file
    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let yaml = serde_yml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(project.config_path(), yaml)
    }

    /// Resolve the operator identity for a mutating operation
    pub fn operator(&self, flag: Option<&str>) -> String {
        flag.map(String::from)
            .or_else(|| self.default_operator.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn read_from(path: &std::path::Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_yml::from_str(&content).ok()
    }

    fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "fpt")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tolerances.grading_kg, 0.05);
        assert_eq!(config.tolerances.disposal_kg, 0.05);
        assert_eq!(config.tolerances.mass_epsilon_kg, 0.001);
        assert_eq!(config.packaging.unit_mass_kg, 0.2);
        assert_eq!(config.schedule.inspection_window_hours, 24);
        assert_eq!(config.schedule.packaging_window_hours, 48);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let mut config = Config::default();
        config.packaging.unit_mass_kg = 0.25;
        config.default_operator = Some("sorter-3".to_string());
        config.save(&project).unwrap();

        let loaded = Config::load(&project);
        assert_eq!(loaded.packaging.unit_mass_kg, 0.25);
        assert_eq!(loaded.default_operator.as_deref(), Some("sorter-3"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(project.config_path(), "packaging:\n  unit_mass_kg: 0.5\n").unwrap();

        let loaded = Config::load(&project);
        assert_eq!(loaded.packaging.unit_mass_kg, 0.5);
        assert_eq!(loaded.tolerances.grading_kg, 0.05);
    }

    #[test]
    fn test_operator_resolution_order() {
        let mut config = Config::default();
        assert_eq!(config.operator(None), "unknown");

        config.default_operator = Some("line-lead".to_string());
        assert_eq!(config.operator(None), "line-lead");
        assert_eq!(config.operator(Some("inspector-2")), "inspector-2");
    }
}
