//! `fpt init` command - project initialization

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::config::Config;
use crate::core::project::Project;
use crate::store::SqliteStore;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    #[arg(long, short = 'd')]
    pub dir: Option<std::path::PathBuf>,
}

pub fn run(args: InitArgs) -> Result<()> {
    let target = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir).into_diagnostic()?;
            dir
        }
        None => std::env::current_dir().into_diagnostic()?,
    };

    let project = Project::init(&target).map_err(|e| miette::miette!("{}", e))?;

    let config = Config::default();
    config.save(&project).into_diagnostic()?;

    // Creating the store up front initializes the schema.
    SqliteStore::open(&project.db_path()).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} fpt project in {}",
        style("Initialized").green().bold(),
        project.data_dir().display()
    );
    println!(
        "Edit {} to adjust tolerances, pack size, and schedule windows.",
        style(project.config_path().display()).cyan()
    );
    Ok(())
}
