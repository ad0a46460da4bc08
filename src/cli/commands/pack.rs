//! `fpt pack` command - packaging runs

use clap::Subcommand;
use console::style;
use miette::Result;
use tracing::warn;

use crate::cli::commands::open_project;
use crate::cli::helpers::fmt_kg;
use crate::cli::GlobalOpts;
use crate::core::identity::BatchId;
use crate::core::packaging::Consolidator;
use crate::entities::batch::Grade;
use crate::entities::packaging::product_key;
use crate::store::{BatchRepository, UnitCounter};

#[derive(Subcommand, Debug)]
pub enum PackCommands {
    /// Consolidate ready batches into fixed-size packs
    Run(RunArgs),

    /// List batches eligible to contribute to a run
    Eligible(EligibleArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Produce variety to pack
    #[arg(long, short = 'v')]
    pub variety: String,

    /// Grade to pack
    #[arg(long, short = 'g')]
    pub grade: Grade,

    /// Contributing batch IDs (defaults to every eligible batch)
    #[arg(long = "batch", short = 'b')]
    pub batches: Vec<String>,

    /// Units to produce (defaults to everything the pooled mass allows;
    /// may be reduced, never increased)
    #[arg(long, short = 'u')]
    pub units: Option<u64>,

    /// Assert that label and weight verification was performed
    #[arg(long)]
    pub verified: bool,
}

#[derive(clap::Args, Debug)]
pub struct EligibleArgs {
    /// Produce variety
    #[arg(long, short = 'v')]
    pub variety: String,

    /// Grade
    #[arg(long, short = 'g')]
    pub grade: Grade,
}

pub fn run(cmd: PackCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PackCommands::Run(args) => run_pack(args, global),
        PackCommands::Eligible(args) => run_eligible(args),
    }
}

fn run_pack(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let consolidator = Consolidator::new(&config);
    let operator = config.operator(global.operator.as_deref());

    let contributing = if args.batches.is_empty() {
        store
            .ready_batches(&args.variety, args.grade)
            .map_err(|e| miette::miette!("{}", e))?
    } else {
        let mut batches = Vec::new();
        for raw in &args.batches {
            let id: BatchId = raw.parse().map_err(|e| miette::miette!("{}", e))?;
            batches.push(store.get(&id).map_err(|e| miette::miette!("{}", e))?);
        }
        batches
    };

    let mut plan = consolidator
        .plan(
            &args.variety,
            args.grade,
            contributing,
            args.units,
            &operator,
            args.verified,
        )
        .map_err(|e| miette::miette!("{}", e))?;

    store
        .commit_pack(&mut plan)
        .map_err(|e| miette::miette!("{}", e))?;

    // The sellable-unit counter is best-effort by contract: log and move on.
    let key = product_key(&plan.variety, plan.grade);
    if let Err(err) = store.increment_by(&key, plan.units) {
        warn!(
            product_key = %key,
            units = plan.units,
            error = %err,
            "sellable-unit counter increment failed; left for reconciliation"
        );
    }

    println!(
        "{} {}: {} x {} kg packs ({} kg {} grade {})",
        style("Packed").green().bold(),
        style(&plan.run_id).cyan(),
        plan.units,
        fmt_kg(plan.unit_mass),
        fmt_kg(plan.mass_needed),
        plan.variety,
        plan.grade,
    );
    for record in &plan.records {
        println!(
            "  {} contributed {} kg ({} units attributed, {} kg left)",
            style(&record.batch_id).cyan(),
            fmt_kg(record.mass_consumed),
            record.units_attributed,
            fmt_kg(record.remaining_mass),
        );
    }
    if let Some(remainder) = &plan.remainder {
        println!(
            "  leftover continues as {} ({} kg, ready for packaging)",
            style(&remainder.id).cyan(),
            fmt_kg(remainder.allocated_total()),
        );
    }
    Ok(())
}

fn run_eligible(args: EligibleArgs) -> Result<()> {
    let (_, config, store) = open_project()?;
    let consolidator = Consolidator::new(&config);

    let batches = store
        .ready_batches(&args.variety, args.grade)
        .map_err(|e| miette::miette!("{}", e))?;
    if batches.is_empty() {
        println!("No eligible batches.");
        return Ok(());
    }

    let mut pooled = 0.0;
    for batch in &batches {
        let allocation = batch.allocation(args.grade);
        pooled += allocation;
        println!(
            "{}  {} kg  (intake {})",
            style(&batch.id).cyan(),
            fmt_kg(allocation),
            batch.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    println!(
        "{} kg pooled, up to {} x {} kg packs.",
        style(fmt_kg(pooled)).cyan(),
        consolidator.max_units(pooled),
        fmt_kg(config.packaging.unit_mass_kg),
    );
    Ok(())
}
