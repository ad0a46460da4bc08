//! Command implementations

pub mod batch;
pub mod clean;
pub mod completions;
pub mod dispose;
pub mod grade;
pub mod init;
pub mod inspect;
pub mod pack;
pub mod stock;

use miette::Result;

use crate::core::config::Config;
use crate::core::project::Project;
use crate::store::SqliteStore;

/// Discover the project and open its config and store
pub(crate) fn open_project() -> Result<(Project, Config, SqliteStore)> {
    let project = Project::discover().map_err(|e| miette::miette!("{}", e))?;
    let config = Config::load(&project);
    let store = SqliteStore::open(&project.db_path()).map_err(|e| miette::miette!("{}", e))?;
    Ok((project, config, store))
}
