//! `fpt dispose` command - itemized waste disposal
//!
//! Entries can be given up front with `--entry method=mass`, or accumulated
//! interactively with a running total against the batch's rejected mass.

use console::style;
use dialoguer::{Input, Select};
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::open_project;
use crate::cli::helpers::{fmt_kg, parse_entry_spec};
use crate::core::disposal::DisposalTracker;
use crate::core::identity::BatchId;
use crate::core::lifecycle::LifecycleEngine;
use crate::entities::batch::Batch;
use crate::entities::disposal::{DisposalEntry, DisposalMethod};
use crate::store::BatchRepository;

#[derive(clap::Args, Debug)]
pub struct DisposeArgs {
    /// Batch ID
    pub id: String,

    /// Disposal entry, method=mass in kg (repeatable),
    /// e.g. -e composting=12 -e incineration=8
    #[arg(long = "entry", short = 'e', conflicts_with = "interactive")]
    pub entries: Vec<String>,

    /// Accumulate entries interactively with a running total
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

const METHODS: [DisposalMethod; 4] = [
    DisposalMethod::Composting,
    DisposalMethod::Incineration,
    DisposalMethod::AnimalFeed,
    DisposalMethod::Landfill,
];

pub fn run(args: DisposeArgs) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);

    let id: BatchId = args.id.parse().map_err(|e| miette::miette!("{}", e))?;
    let batch = store.get(&id).map_err(|e| miette::miette!("{}", e))?;
    let expected = batch.revision;

    let entries = if args.interactive {
        match collect_interactive(&batch, config.tolerances.disposal_kg)? {
            Some(entries) => entries,
            None => {
                println!("Aborted; nothing committed.");
                return Ok(());
            }
        }
    } else {
        args.entries
            .iter()
            .map(|spec| {
                parse_entry_spec(spec).map(|(method, mass)| DisposalEntry::new(method, mass))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| miette::miette!("{}", e))?
    };

    let mut disposed = engine
        .dispose(&batch, entries)
        .map_err(|e| miette::miette!("{}", e))?;
    store
        .update(&mut disposed, expected)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} {}: {} kg across {} entr(ies), batch closed",
        style("Disposed").green().bold(),
        style(&disposed.id).cyan(),
        fmt_kg(disposed.disposal.iter().map(|e| e.mass).sum::<f64>()),
        disposed.disposal.len(),
    );
    Ok(())
}

/// Accumulate entries against the rejected mass; `None` means aborted
fn collect_interactive(batch: &Batch, tolerance: f64) -> Result<Option<Vec<DisposalEntry>>> {
    let mut tracker = DisposalTracker::new(batch.rejected_mass(), tolerance);
    let method_labels: Vec<String> = METHODS.iter().map(|m| m.to_string()).collect();

    loop {
        let status = if tracker.balanced() {
            style("balanced").green().to_string()
        } else {
            style(format!("{} kg outstanding", fmt_kg(tracker.outstanding()))).yellow().to_string()
        };
        println!(
            "{} kg entered of {} kg rejected ({})",
            fmt_kg(tracker.total()),
            fmt_kg(tracker.rejected_mass()),
            status,
        );

        let action = Select::new()
            .with_prompt("Action")
            .items(&["Add entry", "Undo last", "Commit", "Abort"])
            .default(0)
            .interact()
            .into_diagnostic()?;

        match action {
            0 => {
                let method_idx = Select::new()
                    .with_prompt("Disposal method")
                    .items(&method_labels)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                let mass: f64 = Input::new()
                    .with_prompt("Mass (kg)")
                    .interact_text()
                    .into_diagnostic()?;
                tracker.add(METHODS[method_idx], mass);
            }
            1 => {
                if let Some(undone) = tracker.undo() {
                    println!("Removed {} ({} kg)", undone.method, fmt_kg(undone.mass));
                }
            }
            2 => {
                if tracker.balanced() {
                    return Ok(Some(tracker.into_entries()));
                }
                println!(
                    "{} entries sum to {} kg, rejected mass is {} kg",
                    style("Not balanced:").red(),
                    fmt_kg(tracker.total()),
                    fmt_kg(tracker.rejected_mass()),
                );
            }
            _ => return Ok(None),
        }
    }
}
