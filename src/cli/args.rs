//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{batch, clean, completions, dispose, grade, init, inspect, pack, stock};

/// Fresh Produce Toolkit - batch traceability from intake to packaging
#[derive(Parser, Debug)]
#[command(name = "fpt", version, about, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared by all commands
#[derive(clap::Args, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Operator identity recorded on mutating operations
    #[arg(long, short = 'O', global = true, env = "FPT_OPERATOR")]
    pub operator: Option<String>,
}

/// Output format for list/show commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table for lists, YAML for single records
    Auto,
    Table,
    Json,
    Yaml,
    /// Bare ids, one per line (for piping)
    Id,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new fpt project in the current directory
    Init(init::InitArgs),

    /// Batch intake and records
    #[command(subcommand)]
    Batch(batch::BatchCommands),

    /// Record a quality inspection for a batch
    Inspect(inspect::InspectArgs),

    /// Record grading results for a batch
    Grade(grade::GradeArgs),

    /// Record itemized waste disposal for a rejected batch
    Dispose(dispose::DisposeArgs),

    /// Confirm cleaning and release a batch for packaging
    Clean(clean::CleanArgs),

    /// Packaging runs
    #[command(subcommand)]
    Pack(pack::PackCommands),

    /// Inventory levels and stock movements
    #[command(subcommand)]
    Stock(stock::StockCommands),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
