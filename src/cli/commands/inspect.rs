//! `fpt inspect` command - quality inspection

use console::style;
use miette::Result;

use crate::cli::commands::open_project;
use crate::cli::helpers::{fmt_kg, parse_check_spec};
use crate::cli::GlobalOpts;
use crate::core::identity::BatchId;
use crate::core::lifecycle::LifecycleEngine;
use crate::entities::batch::BatchState;
use crate::store::BatchRepository;

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Batch ID
    pub id: String,

    /// Rejected mass in kg (defaults to 0)
    #[arg(long, short = 'r', conflicts_with = "reject_all")]
    pub rejected: Option<f64>,

    /// Mark the entire batch rejected without per-field entry
    #[arg(long)]
    pub reject_all: bool,

    /// Checklist result, label=pass|fail (repeatable)
    #[arg(long = "check", short = 'c')]
    pub checks: Vec<String>,

    /// Inspector identity (defaults to the operator)
    #[arg(long, short = 'i')]
    pub inspector: Option<String>,
}

pub fn run(args: InspectArgs, global: &GlobalOpts) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);

    let id: BatchId = args.id.parse().map_err(|e| miette::miette!("{}", e))?;
    let batch = store.get(&id).map_err(|e| miette::miette!("{}", e))?;
    let expected = batch.revision;

    let checklist = args
        .checks
        .iter()
        .map(|spec| parse_check_spec(spec))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| miette::miette!("{}", e))?;

    let inspector = args
        .inspector
        .unwrap_or_else(|| config.operator(global.operator.as_deref()));

    let outcome = if args.reject_all {
        engine.reject_all(&batch, checklist, &inspector)
    } else {
        engine.inspect(&batch, args.rejected.unwrap_or(0.0), checklist, &inspector)
    }
    .map_err(|e| miette::miette!("{}", e))?;

    let mut updated = outcome.batch;
    let mut sibling = outcome.rejected_sibling;
    store
        .commit_inspection(&mut updated, expected, sibling.as_mut())
        .map_err(|e| miette::miette!("{}", e))?;

    let record = updated.inspection.as_ref().ok_or_else(|| {
        miette::miette!("inspection record missing after commit (this is a bug)")
    })?;

    match updated.state {
        BatchState::Disposal => {
            println!(
                "{} {}: whole batch rejected, {} kg awaiting disposal",
                style("Inspected").green().bold(),
                style(&updated.id).cyan(),
                fmt_kg(record.rejected_mass),
            );
        }
        _ => {
            println!(
                "{} {}: {} kg accepted into grading, {} kg rejected",
                style("Inspected").green().bold(),
                style(&updated.id).cyan(),
                fmt_kg(record.accepted_mass),
                fmt_kg(record.rejected_mass),
            );
        }
    }
    if let Some(sibling) = sibling {
        println!(
            "  rejected mass forked to {} ({} kg, awaiting disposal)",
            style(&sibling.id).cyan(),
            fmt_kg(sibling.actual_mass),
        );
    }
    Ok(())
}
