//! `fpt batch` command - intake and batch records

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::open_project;
use crate::cli::helpers::{fmt_kg, truncate_str};
use crate::cli::output::effective_format;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::BatchId;
use crate::core::lifecycle::LifecycleEngine;
use crate::entities::batch::{Batch, BatchState};
use crate::store::{BatchFilter, BatchRepository};
use crate::yaml::intake::scan_intake_dir;

#[derive(Subcommand, Debug)]
pub enum BatchCommands {
    /// Register an intake delivery as a new batch
    Intake(IntakeArgs),

    /// Import intake YAML files from a drop directory
    Import(ImportArgs),

    /// List batches with filtering
    List(ListArgs),

    /// Show a batch's full record
    Show(ShowArgs),

    /// Return a batch awaiting disposal to inspection (operator correction)
    Reopen(ReopenArgs),
}

/// Batch state filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateFilter {
    Inspection,
    Grading,
    Disposal,
    Cleaning,
    Ready,
    Completed,
    Disposed,
    All,
}

impl StateFilter {
    fn as_state(self) -> Option<BatchState> {
        match self {
            StateFilter::Inspection => Some(BatchState::Inspection),
            StateFilter::Grading => Some(BatchState::Grading),
            StateFilter::Disposal => Some(BatchState::Disposal),
            StateFilter::Cleaning => Some(BatchState::Cleaning),
            StateFilter::Ready => Some(BatchState::ReadyForPackaging),
            StateFilter::Completed => Some(BatchState::Completed),
            StateFilter::Disposed => Some(BatchState::Disposed),
            StateFilter::All => None,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct IntakeArgs {
    /// Produce variety
    #[arg(long, short = 'v')]
    pub variety: String,

    /// Source origin (grower, field, or supplier reference)
    #[arg(long, short = 'o')]
    pub origin: String,

    /// Mass stated on the delivery paperwork (kg)
    #[arg(long, short = 's')]
    pub stated: f64,

    /// Mass measured at the door (kg)
    #[arg(long, short = 'a')]
    pub actual: f64,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Drop directory containing intake YAML files
    pub dir: std::path::PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by lifecycle state
    #[arg(long, short = 's', default_value = "all")]
    pub state: StateFilter,

    /// Filter by variety
    #[arg(long, short = 'v')]
    pub variety: Option<String>,

    /// Show only open batches (exclude completed and disposed)
    #[arg(long)]
    pub active: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Batch ID
    pub id: String,

    /// Include this batch's packaging audit records
    #[arg(long, short = 'r')]
    pub records: bool,
}

#[derive(clap::Args, Debug)]
pub struct ReopenArgs {
    /// Batch ID
    pub id: String,
}

/// Run a batch subcommand
pub fn run(cmd: BatchCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BatchCommands::Intake(args) => run_intake(args),
        BatchCommands::Import(args) => run_import(args),
        BatchCommands::List(args) => run_list(args, global),
        BatchCommands::Show(args) => run_show(args, global),
        BatchCommands::Reopen(args) => run_reopen(args),
    }
}

fn run_intake(args: IntakeArgs) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);

    let batch = engine
        .intake(args.variety, args.origin, args.stated, args.actual)
        .map_err(|e| miette::miette!("{}", e))?;
    store.insert(&batch).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} {} ({} kg {}, inspection due {})",
        style("Created").green().bold(),
        style(&batch.id).cyan(),
        fmt_kg(batch.actual_mass),
        batch.variety,
        batch.due_at.format("%Y-%m-%d %H:%M"),
    );
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);

    let (records, failures) = scan_intake_dir(&args.dir).into_diagnostic()?;

    let mut created = 0usize;
    for (path, record) in records {
        match engine.intake(
            record.variety,
            record.origin,
            record.stated_mass_kg,
            record.actual_mass_kg,
        ) {
            Ok(batch) => {
                store.insert(&batch).map_err(|e| miette::miette!("{}", e))?;
                println!("{}  {}", style(&batch.id).cyan(), path.display());
                created += 1;
            }
            Err(e) => {
                println!(
                    "{}  {}: {}",
                    style("skipped").yellow(),
                    path.display(),
                    e
                );
            }
        }
    }
    for (path, err) in &failures {
        println!("{}  {}: {}", style("skipped").yellow(), path.display(), err);
    }

    println!(
        "{} batch(es) created, {} file(s) skipped.",
        style(created).cyan(),
        failures.len()
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_, _, store) = open_project()?;

    let filter = BatchFilter {
        state: args.state.as_state(),
        variety: args.variety.clone(),
        active: args.active,
    };
    let mut batches = store.list(&filter).map_err(|e| miette::miette!("{}", e))?;

    if let Some(limit) = args.limit {
        batches.truncate(limit);
    }

    if args.count {
        println!("{}", batches.len());
        return Ok(());
    }
    if batches.is_empty() {
        println!("No batches found.");
        return Ok(());
    }

    match effective_format(global.format, true) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&batches).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&batches).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for batch in &batches {
                println!("{}", batch.id);
            }
        }
        OutputFormat::Table | OutputFormat::Auto => print_table(&batches),
    }
    Ok(())
}

fn print_table(batches: &[Batch]) {
    println!(
        "{:<34} {:<14} {:<20} {:>10} {:<17}",
        style("ID").bold(),
        style("VARIETY").bold(),
        style("STATE").bold(),
        style("MASS").bold(),
        style("DUE").bold(),
    );
    println!("{}", "-".repeat(98));

    for batch in batches {
        let state_styled = match batch.state {
            BatchState::Inspection | BatchState::Grading | BatchState::Cleaning => {
                style(batch.state.to_string()).yellow()
            }
            BatchState::ReadyForPackaging => style(batch.state.to_string()).green(),
            BatchState::Completed => style(batch.state.to_string()).cyan(),
            BatchState::Disposal | BatchState::Disposed => style(batch.state.to_string()).red(),
        };
        let mass = if batch.grade_allocation.is_empty() {
            batch.actual_mass
        } else {
            batch.allocated_total()
        };
        println!(
            "{:<34} {:<14} {:<20} {:>10} {:<17}",
            batch.id,
            truncate_str(&batch.variety, 12),
            state_styled,
            fmt_kg(mass),
            batch.due_at.format("%Y-%m-%d %H:%M"),
        );
    }

    println!();
    println!("{} batch(es) found.", style(batches.len()).cyan());
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_, _, store) = open_project()?;
    let id: BatchId = args.id.parse().map_err(|e| miette::miette!("{}", e))?;
    let batch = store.get(&id).map_err(|e| miette::miette!("{}", e))?;

    match effective_format(global.format, false) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&batch).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => println!("{}", batch.id),
        _ => {
            let yaml = serde_yml::to_string(&batch).into_diagnostic()?;
            print!("{}", yaml);
        }
    }

    if args.records {
        let records = store
            .packing_records(Some(&id))
            .map_err(|e| miette::miette!("{}", e))?;
        if !records.is_empty() {
            println!("{}", style("packing_records:").bold());
            let yaml = serde_yml::to_string(&records).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

fn run_reopen(args: ReopenArgs) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);

    let id: BatchId = args.id.parse().map_err(|e| miette::miette!("{}", e))?;
    let batch = store.get(&id).map_err(|e| miette::miette!("{}", e))?;
    let expected = batch.revision;

    let mut reopened = engine.reopen(&batch).map_err(|e| miette::miette!("{}", e))?;
    store
        .update(&mut reopened, expected)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} {} back to inspection ({} kg to re-inspect)",
        style("Reopened").green().bold(),
        style(&reopened.id).cyan(),
        fmt_kg(reopened.actual_mass),
    );
    Ok(())
}
