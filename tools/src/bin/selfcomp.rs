//! # selfcomp
//!
//! Writes the k-fold self-composition of an annotated DIMACS formula. The
//! copies share the maximization variables, all other variables are renamed
//! apart.
//!
//! Usage: selfcomp [OPTIONS] <K> <IN_PATH> [OUT_PATH]

use std::{fmt, io, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use maxcount::{
    instances::Formula,
    selfcomp::{Compose, SelfComposition},
    types::Var,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The number of copies
    k: usize,
    /// The path to the input formula
    in_path: PathBuf,
    /// The optional output path. If no path is given, will write to `stdout`.
    out_path: Option<PathBuf>,
    /// The variables to declare in the `c ind` line of the output
    #[arg(long, default_value_t = Projection::default())]
    projection: Projection,
    #[command(flatten)]
    color: concolor_clap::Color,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
enum Projection {
    /// The shared maximization variables, as used for sampling witnesses
    #[default]
    Max,
    /// The counting variables of all copies
    Counting,
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Max => write!(f, "max"),
            Projection::Counting => write!(f, "counting"),
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let formula = Formula::from_dimacs_path(&args.in_path)
        .with_context(|| format!("could not read formula {}", args.in_path.display()))?;
    let composed = SelfComposition
        .compose(&formula, args.k)
        .context("could not build self-composition")?;
    let projection: Vec<Var> = match args.projection {
        Projection::Max => composed.max_vars().to_vec(),
        Projection::Counting => composed.counting_vars().iter().copied().collect(),
    };
    if let Some(path) = &args.out_path {
        composed
            .write_dimacs_path(path, &projection)
            .with_context(|| format!("could not write {}", path.display()))?;
    } else {
        composed.write_dimacs(&mut io::stdout().lock(), &projection)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let printer = maxcount_tools::Printer::new(&args.color);
    if let Err(err) = run(&args) {
        printer.error(&err)?;
        std::process::exit(1);
    }
    Ok(())
}
