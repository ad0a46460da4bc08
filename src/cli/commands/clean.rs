//! `fpt clean` command - cleaning confirmation and packaging release

use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::open_project;
use crate::cli::helpers::fmt_kg;
use crate::cli::GlobalOpts;
use crate::core::identity::BatchId;
use crate::core::lifecycle::LifecycleEngine;
use crate::entities::batch::PackagingStatus;
use crate::store::BatchRepository;

#[derive(clap::Args, Debug)]
pub struct CleanArgs {
    /// Batch ID
    pub id: String,

    /// Confirm without prompting
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(args: CleanArgs, global: &GlobalOpts) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);
    let operator = config.operator(global.operator.as_deref());

    let id: BatchId = args.id.parse().map_err(|e| miette::miette!("{}", e))?;
    let batch = store.get(&id).map_err(|e| miette::miette!("{}", e))?;
    let expected = batch.revision;

    let confirmed = if args.yes {
        true
    } else {
        Confirm::new()
            .with_prompt(format!(
                "Confirm cleaning completed for {} ({} kg)?",
                batch.id,
                fmt_kg(batch.allocated_total()),
            ))
            .default(false)
            .interact()
            .into_diagnostic()?
    };

    let mut ready = engine
        .clean(&batch, confirmed, &operator)
        .map_err(|e| miette::miette!("{}", e))?;
    store
        .update(&mut ready, expected)
        .map_err(|e| miette::miette!("{}", e))?;

    let pending: Vec<String> = ready
        .packaging_state
        .iter()
        .filter(|(_, s)| **s == PackagingStatus::Pending)
        .map(|(g, _)| format!("{}={} kg", g, fmt_kg(ready.allocation(*g))))
        .collect();
    println!(
        "{} {}: ready for packaging ({}), due {}",
        style("Released").green().bold(),
        style(&ready.id).cyan(),
        pending.join(", "),
        ready.due_at.format("%Y-%m-%d %H:%M"),
    );
    Ok(())
}
