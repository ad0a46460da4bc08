//! Intake drop-file import
//!
//! Delivery terminals write one YAML file per intake into a drop directory;
//! `fpt batch import` scans it and registers a batch per file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::yaml::parser::{parse_yaml_file, YamlError};

/// One intake delivery supplied by the intake source
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeRecord {
    pub variety: String,
    pub origin: String,

    /// Mass stated on the delivery paperwork (kg)
    pub stated_mass_kg: f64,

    /// Mass measured at the door (kg)
    pub actual_mass_kg: f64,

    /// Delivery timestamp, when the source records one
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Scan a drop directory for intake YAML files
///
/// Files that fail to parse are returned as errors alongside the successes
/// so a single malformed delivery does not block the rest of the import.
pub fn scan_intake_dir(
    dir: &Path,
) -> std::io::Result<(Vec<(PathBuf, IntakeRecord)>, Vec<(PathBuf, YamlError)>)> {
    let mut records = Vec::new();
    let mut failures = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
    {
        let path = entry.path().to_path_buf();
        match parse_yaml_file::<IntakeRecord>(&path) {
            Ok(record) => records.push((path, record)),
            Err(err) => failures.push((path, err)),
        }
    }

    records.sort_by(|a, b| a.0.cmp(&b.0));
    Ok((records, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_parses_good_files_and_reports_bad_ones() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("delivery-1.yaml"),
            "variety: strawberry\norigin: field-7\nstated_mass_kg: 100\nactual_mass_kg: 99.5\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("broken.yaml"), "variety: [unclosed\n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "not yaml\n").unwrap();

        let (records, failures) = scan_intake_dir(tmp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.variety, "strawberry");
        assert_eq!(records[0].1.actual_mass_kg, 99.5);
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_scan_recurses_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("2026-08-08");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            nested.join("delivery-2.yml"),
            "variety: raspberry\norigin: coop-12\nstated_mass_kg: 40\nactual_mass_kg: 40.2\n",
        )
        .unwrap();

        let (records, failures) = scan_intake_dir(tmp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(failures.is_empty());
    }
}
