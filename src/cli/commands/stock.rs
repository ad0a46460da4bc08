//! `fpt stock` command - inventory levels and movement ledger views

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use tabled::{settings::Style, Table, Tabled};

use crate::cli::commands::open_project;
use crate::cli::helpers::fmt_kg;
use crate::cli::output::effective_format;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum StockCommands {
    /// Aggregate inventory per variety and grade
    Levels,

    /// Recent stock movements, newest first
    Movements(MovementsArgs),
}

#[derive(clap::Args, Debug)]
pub struct MovementsArgs {
    /// Number of movements to show
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,
}

#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "VARIETY")]
    variety: String,
    #[tabled(rename = "GRADE")]
    grade: String,
    #[tabled(rename = "MASS (KG)")]
    mass: String,
}

#[derive(Tabled)]
struct MovementRow {
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "VARIETY")]
    variety: String,
    #[tabled(rename = "GRADE")]
    grade: String,
    #[tabled(rename = "MASS (KG)")]
    mass: String,
    #[tabled(rename = "REFERENCE")]
    reference: String,
    #[tabled(rename = "ACTOR")]
    actor: String,
    #[tabled(rename = "AT")]
    at: String,
}

pub fn run(cmd: StockCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        StockCommands::Levels => run_levels(global),
        StockCommands::Movements(args) => run_movements(args, global),
    }
}

fn run_levels(global: &GlobalOpts) -> Result<()> {
    let (_, _, store) = open_project()?;
    let levels = store.stock_levels().map_err(|e| miette::miette!("{}", e))?;

    if levels.is_empty() {
        println!("No stock recorded.");
        return Ok(());
    }

    match effective_format(global.format, true) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&levels).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&levels).into_diagnostic()?);
        }
        _ => {
            let rows: Vec<LevelRow> = levels
                .iter()
                .map(|l| LevelRow {
                    variety: l.variety.clone(),
                    grade: l.grade.to_string(),
                    mass: fmt_kg(l.mass),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
        }
    }
    Ok(())
}

fn run_movements(args: MovementsArgs, global: &GlobalOpts) -> Result<()> {
    let (_, _, store) = open_project()?;
    let movements = store
        .movements(args.limit)
        .map_err(|e| miette::miette!("{}", e))?;

    if movements.is_empty() {
        println!("No movements recorded.");
        return Ok(());
    }

    match effective_format(global.format, true) {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&movements).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&movements).into_diagnostic()?);
        }
        _ => {
            let rows: Vec<MovementRow> = movements
                .iter()
                .map(|m| MovementRow {
                    kind: m.kind.to_string(),
                    variety: m.variety.clone(),
                    grade: m.grade.to_string(),
                    mass: fmt_kg(m.mass),
                    reference: m.reference.clone(),
                    actor: m.actor.clone(),
                    at: m.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
        }
    }
    Ok(())
}
