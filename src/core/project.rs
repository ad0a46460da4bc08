//! Project discovery and layout
//!
//! An fpt project is any directory containing a `.fpt/` data directory,
//! discovered by walking up from the current working directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name of the project data directory
pub const PROJECT_DIR: &str = ".fpt";

/// Errors locating or creating a project
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no fpt project found (run 'fpt init' in your working directory first)")]
    NotFound,

    #[error("a project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A located fpt project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Discover the project by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let cwd = std::env::current_dir()?;
        Self::discover_from(&cwd)
    }

    /// Discover the project by walking up from `start`
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut dir = start.to_path_buf();
        loop {
            if dir.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: dir });
            }
            if !dir.pop() {
                return Err(ProjectError::NotFound);
            }
        }
    }

    /// Create a new project at `path`
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let data_dir = path.join(PROJECT_DIR);
        if data_dir.exists() {
            return Err(ProjectError::AlreadyExists(data_dir));
        }
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.yaml")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("pipeline.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_discover() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        assert!(project.data_dir().is_dir());

        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let found = Project::discover_from(&nested).unwrap();
        assert_eq!(found.root(), tmp.path());
    }

    #[test]
    fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        Project::init(tmp.path()).unwrap();
        assert!(matches!(
            Project::init(tmp.path()),
            Err(ProjectError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_discover_outside_project_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Project::discover_from(tmp.path()),
            Err(ProjectError::NotFound)
        ));
    }
}
