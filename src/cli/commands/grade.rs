//! `fpt grade` command - grading results

use std::collections::BTreeMap;

use console::style;
use miette::Result;

use crate::cli::commands::open_project;
use crate::cli::helpers::{fmt_kg, parse_grade_spec};
use crate::cli::GlobalOpts;
use crate::core::identity::BatchId;
use crate::core::lifecycle::LifecycleEngine;
use crate::store::BatchRepository;

#[derive(clap::Args, Debug)]
pub struct GradeArgs {
    /// Batch ID
    pub id: String,

    /// Grade allocation, grade=mass in kg (repeatable), e.g. -g a=50 -g b=20
    #[arg(long = "grade", short = 'g', required = true)]
    pub grades: Vec<String>,
}

pub fn run(args: GradeArgs, global: &GlobalOpts) -> Result<()> {
    let (_, config, mut store) = open_project()?;
    let engine = LifecycleEngine::new(&config);
    let operator = config.operator(global.operator.as_deref());

    let id: BatchId = args.id.parse().map_err(|e| miette::miette!("{}", e))?;
    let batch = store.get(&id).map_err(|e| miette::miette!("{}", e))?;
    let expected = batch.revision;

    let mut allocation = BTreeMap::new();
    for spec in &args.grades {
        let (grade, mass) = parse_grade_spec(spec).map_err(|e| miette::miette!("{}", e))?;
        if allocation.insert(grade, mass).is_some() {
            return Err(miette::miette!("grade {} given more than once", grade));
        }
    }

    let mut graded = engine
        .grade(&batch, allocation, &operator)
        .map_err(|e| miette::miette!("{}", e))?;
    store
        .update(&mut graded, expected)
        .map_err(|e| miette::miette!("{}", e))?;

    let summary = graded
        .grade_allocation
        .iter()
        .map(|(g, m)| format!("{}={} kg", g, fmt_kg(*m)))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{} {}: {} (awaiting cleaning)",
        style("Graded").green().bold(),
        style(&graded.id).cyan(),
        summary,
    );
    Ok(())
}
