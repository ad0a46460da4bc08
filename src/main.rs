use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

use fpt::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    // Diagnostics go to stderr so piped output stays clean; level via FPT_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FPT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => fpt::cli::commands::init::run(args),
        Commands::Batch(cmd) => fpt::cli::commands::batch::run(cmd, &cli.global),
        Commands::Inspect(args) => fpt::cli::commands::inspect::run(args, &cli.global),
        Commands::Grade(args) => fpt::cli::commands::grade::run(args, &cli.global),
        Commands::Dispose(args) => fpt::cli::commands::dispose::run(args),
        Commands::Clean(args) => fpt::cli::commands::clean::run(args, &cli.global),
        Commands::Pack(cmd) => fpt::cli::commands::pack::run(cmd, &cli.global),
        Commands::Stock(cmd) => fpt::cli::commands::stock::run(cmd, &cli.global),
        Commands::Completions(args) => fpt::cli::commands::completions::run(args),
    }
}
