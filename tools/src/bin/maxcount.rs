//! # maxcount
//!
//! Approximately solves a Max#SAT problem: finds an assignment to the
//! maximization variables of a formula under which (approximately) the most
//! assignments to the counting variables satisfy the formula, and bounds this
//! maximum.
//!
//! Usage: maxcount [OPTIONS] <FORMULA> <K>

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use maxcount::{approx::ScalMc, instances::Formula, params::Options, MaxCount};
use maxcount_tools::{Printer, Solver};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The Max#SAT problem to solve, in DIMACS CNF with `c max` and `c ind`
    /// annotations. May be compressed with `.gz`, `.bz2` or `.xz`.
    formula: PathBuf,
    /// The number of copies of the formula in the self-composition. With 0,
    /// witnesses are drawn by fair coin flips.
    k: usize,
    /// The random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Information to output: 0 = max-count estimate and witness; 1 = also
    /// max-count bounds; 2 = everything
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
    verbosity: u8,
    /// Also log oracle statistics
    #[arg(long)]
    debug: bool,
    /// The path to the `scalmc` binary
    #[arg(long, default_value = "./scalmc")]
    scalmc: PathBuf,
    /// The number of samples to generate from the self-composition
    #[arg(long, default_value_t = 20)]
    samples: usize,
    /// The kappa parameter of the sampler, determining the sampling tolerance
    /// (kappa = 0.5782 corresponds to epsilon = 16)
    #[arg(long, default_value_t = 0.5782)]
    sampling_kappa: f64,
    /// Return multiple samples from each sampler call
    #[arg(long)]
    multisample: bool,
    /// The counting tolerance
    #[arg(long, default_value_t = 1.)]
    counting_tolerance: f64,
    /// The minimum confidence of the upper bound
    #[arg(long, default_value_t = 0.6)]
    upper_bound_confidence: f64,
    /// The minimum confidence of the lower bound
    #[arg(long, default_value_t = 0.8)]
    lower_bound_confidence: f64,
    /// The number of Monte Carlo samples for counting
    #[arg(long, default_value_t = 2000)]
    monte_carlo_samples: usize,
    /// The maximum number of solutions to enumerate for exact counting
    #[arg(long, default_value_t = 256)]
    enumeration_threshold: usize,
    /// Refine the count of the best witness
    #[arg(long)]
    refine: bool,
    /// The counting tolerance for refinement
    #[arg(long, default_value_t = 0.4142)]
    refinement_tolerance: f64,
    /// The number of Monte Carlo samples for refinement
    #[arg(long, default_value_t = 20000)]
    refinement_mc_samples: usize,
    /// The maximum number of solutions to enumerate for exact refinement
    #[arg(long, default_value_t = 1024)]
    refinement_enum_threshold: usize,
    /// Also write the full result as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
    #[command(flatten)]
    color: concolor_clap::Color,
}

impl Args {
    fn options(&self) -> Options {
        Options {
            seed: self.seed,
            samples: self.samples,
            kappa: self.sampling_kappa,
            multisample: self.multisample,
            count_epsilon: self.counting_tolerance,
            upper_conf: self.upper_bound_confidence,
            lower_conf: self.lower_bound_confidence,
            mc_samples: self.monte_carlo_samples,
            enum_threshold: self.enumeration_threshold,
            refine: self.refine,
            refine_epsilon: self.refinement_tolerance,
            refine_mc_samples: self.refinement_mc_samples,
            refine_enum_threshold: self.refinement_enum_threshold,
        }
    }
}

fn run(args: &Args, printer: &Printer) -> anyhow::Result<()> {
    let start = Instant::now();
    let params = args
        .options()
        .validate(args.k)
        .context("invalid arguments")?;
    let formula = Formula::from_dimacs_path(&args.formula)
        .with_context(|| format!("could not read formula {}", args.formula.display()))?;
    if formula.max_vars().is_empty() {
        printer.warning("formula declares no maximization variables")?;
    }
    if formula.counting_vars().is_empty() {
        printer.warning("formula declares no counting variables")?;
    }

    let mut maxcount = MaxCount::<Solver, _>::new(params, ScalMc::new(&args.scalmc));
    let report = maxcount.run(&formula)?;

    let mut stdout = io::stdout().lock();
    report.write(&mut stdout, args.verbosity)?;
    if args.verbosity >= 2 {
        writeln!(stdout, "c Total runtime {} s", start.elapsed().as_secs())?;
    }
    stdout.flush()?;

    if let Some(path) = &args.json {
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("could not create {}", path.display()))?,
        );
        serde_json::to_writer_pretty(writer, &report).context("could not write JSON report")?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let printer = Printer::new(&args.color);
    maxcount_tools::init_logger(args.verbosity, args.debug, &args.color)?;

    if let Err(err) = run(&args, &printer) {
        printer.error(&err)?;
        std::process::exit(1);
    }
    Ok(())
}
