//! YAML parsing and intake import

pub mod intake;
pub mod parser;

pub use intake::{scan_intake_dir, IntakeRecord};
pub use parser::{parse_yaml, parse_yaml_file, YamlError};
