//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use crate::entities::batch::{ChecklistItem, Grade};
use crate::entities::disposal::DisposalMethod;

/// Format a string ID for display, truncating if too long
///
/// IDs longer than 20 characters are truncated to 17 chars with "..." suffix.
pub fn format_short_id_str(id: &str) -> String {
    if id.len() > 20 {
        format!("{}...", &id[..17])
    } else {
        id.to_string()
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Format a mass in kilograms for display
pub fn fmt_kg(mass: f64) -> String {
    format!("{:.3}", mass)
}

/// Parse a `grade=mass` spec, e.g. "a=50" or "B=19.9"
pub fn parse_grade_spec(spec: &str) -> Result<(Grade, f64), String> {
    let (grade, mass) = split_spec(spec)?;
    let grade: Grade = grade.parse()?;
    let mass = parse_mass(mass)?;
    Ok((grade, mass))
}

/// Parse a `method=mass` disposal spec, e.g. "composting=12"
pub fn parse_entry_spec(spec: &str) -> Result<(DisposalMethod, f64), String> {
    let (method, mass) = split_spec(spec)?;
    let method: DisposalMethod = method.parse()?;
    let mass = parse_mass(mass)?;
    Ok((method, mass))
}

/// Parse a `label=pass|fail` checklist spec, e.g. "mold=pass"
pub fn parse_check_spec(spec: &str) -> Result<ChecklistItem, String> {
    let (label, result) = split_spec(spec)?;
    let passed = match result.to_lowercase().as_str() {
        "pass" | "ok" | "yes" => true,
        "fail" | "no" => false,
        other => return Err(format!("Expected pass or fail, got '{}'", other)),
    };
    Ok(ChecklistItem {
        label: label.to_string(),
        passed,
    })
}

fn split_spec(spec: &str) -> Result<(&str, &str), String> {
    spec.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| format!("Expected key=value, got '{}'", spec))
}

fn parse_mass(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("Invalid mass '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_short_id_str() {
        assert_eq!(format_short_id_str("SHORT"), "SHORT");
        let long = "BAT-01J123456789ABCDEF123456";
        let formatted = format_short_id_str(long);
        assert_eq!(formatted.len(), 20);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn test_parse_grade_spec() {
        assert_eq!(parse_grade_spec("a=50").unwrap(), (Grade::A, 50.0));
        assert_eq!(parse_grade_spec("B = 19.9").unwrap(), (Grade::B, 19.9));
        assert!(parse_grade_spec("d=10").is_err());
        assert!(parse_grade_spec("a:10").is_err());
    }

    #[test]
    fn test_parse_entry_spec() {
        assert_eq!(
            parse_entry_spec("composting=12").unwrap(),
            (DisposalMethod::Composting, 12.0)
        );
        assert!(parse_entry_spec("burial=5").is_err());
        assert!(parse_entry_spec("composting=lots").is_err());
    }

    #[test]
    fn test_parse_check_spec() {
        let item = parse_check_spec("mold=pass").unwrap();
        assert_eq!(item.label, "mold");
        assert!(item.passed);

        let item = parse_check_spec("bruising=fail").unwrap();
        assert!(!item.passed);

        assert!(parse_check_spec("mold=maybe").is_err());
    }
}
