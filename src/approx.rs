//! # Approximate Counting and Sampling
//!
//! Hashing-based approximate model counting and approximately uniform
//! sampling are delegated to an external tool behind the [`ApproxCount`]
//! trait. [`ScalMc`] drives a `scalmc` (ApproxMC/UniGen) executable via
//! temporary files and parses its textual output.
//!
//! ## References
//!
//! - Supratik Chakraborty, Daniel J. Fremont, Kuldeep S. Meel, Sanjit A.
//!   Seshia and Moshe Y. Vardi: _On Parallel Scalable Uniform SAT Witness
//!   Generation_, TACAS 2015.

use std::{
    fs,
    io::{self, BufRead, BufWriter},
    path::{Path, PathBuf},
    process::{Command, Output},
};

use nom::{
    bytes::complete::tag,
    character::complete::{space0, u32, u64},
    combinator::all_consuming,
    error::Error as NomError,
    sequence::{preceded, separated_pair, terminated},
};

use crate::{
    instances::Formula,
    types::{Lit, RsHashSet, Var},
    Error,
};

/// Line the tool prints for unsatisfiable inputs
pub const UNSAT_LINE: &str = "The input formula is unsatisfiable.";
/// Prefix of the line reporting the approximate count
pub const COUNT_PREFIX: &str = "Number of solutions is: ";

/// A request for an approximate count of the projection of a formula onto
/// `projection`
#[derive(Clone, Copy, Debug)]
pub struct CountRequest<'a> {
    /// The formula to count
    pub formula: &'a Formula,
    /// The variables to count over
    pub projection: &'a [Var],
    /// Random seed of the tool
    pub seed: u64,
    /// Cell size threshold
    pub pivot: u32,
    /// Number of counting iterations
    pub iterations: u32,
}

/// Result of an approximate count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountOutcome {
    /// The formula is unsatisfiable
    Unsat,
    /// The count is `cell_count x 2^hash_count`
    Count {
        /// Solutions in the final cell
        cell_count: u64,
        /// Number of hash constraints used
        hash_count: u32,
    },
}

/// A request for approximately uniform samples over `support`, each reported
/// restricted to `projection`
#[derive(Clone, Copy, Debug)]
pub struct SampleRequest<'a> {
    /// The formula to sample from
    pub formula: &'a Formula,
    /// The variables the samples are uniform over, declared as independent
    /// support of the formula
    pub support: &'a [Var],
    /// The variables each sample is restricted to, a subset of `support`
    pub projection: &'a [Var],
    /// Random seed of the tool
    pub seed: u64,
    /// Sampling tolerance parameter
    pub kappa: f64,
    /// Whether multiple samples are drawn per cell
    pub multisample: bool,
    /// Cell size threshold
    pub pivot: u32,
    /// Number of counting iterations
    pub iterations: u32,
    /// Number of samples to draw
    pub n_samples: usize,
}

/// Result of a sampling call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The formula is unsatisfiable
    Unsat,
    /// Samples, each with one literal per projection variable in order
    Samples(Vec<Vec<Lit>>),
}

/// Trait for approximate counters and samplers
pub trait ApproxCount {
    /// Approximately counts the models of a formula
    ///
    /// # Errors
    ///
    /// [`Error::Counting`] if the tool fails or its output cannot be parsed
    fn count(&mut self, request: &CountRequest<'_>) -> Result<CountOutcome, Error>;
    /// Draws approximately uniform samples of a formula
    ///
    /// # Errors
    ///
    /// [`Error::Sampling`] if the tool fails or its output cannot be parsed
    fn sample(&mut self, request: &SampleRequest<'_>) -> Result<SampleOutcome, Error>;
}

/// Driver for the `scalmc` executable
#[derive(Debug, Clone)]
pub struct ScalMc {
    path: PathBuf,
}

impl ScalMc {
    /// Creates a driver calling the executable at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ScalMc {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn command(&self, workdir: &Path, seed: u64, pivot: u32, iterations: u32) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg(format!(
            "--cuspLogFile={}",
            workdir.join("cusp.log").display()
        ))
        .arg(format!("--random={seed}"))
        .arg(format!("--pivotAC={pivot}"))
        .arg(format!("--tApproxMC={iterations}"));
        cmd
    }
}

/// Writes the formula into the working directory and returns its path
fn write_input(workdir: &Path, formula: &Formula, projection: &[Var]) -> io::Result<PathBuf> {
    let path = workdir.join("input.cnf");
    let mut writer = BufWriter::new(fs::File::create(&path)?);
    formula.write_dimacs(&mut writer, projection)?;
    Ok(path)
}

fn run(mut cmd: Command) -> io::Result<Output> {
    log::debug!("calling {cmd:?}");
    let output = cmd.output()?;
    if !output.status.success() {
        log::debug!("external tool exited with {}", output.status);
    }
    Ok(output)
}

impl ApproxCount for ScalMc {
    fn count(&mut self, request: &CountRequest<'_>) -> Result<CountOutcome, Error> {
        let workdir = tempfile::tempdir()?;
        let input = write_input(workdir.path(), request.formula, request.projection)?;
        let mut cmd = self.command(
            workdir.path(),
            request.seed,
            request.pivot,
            request.iterations,
        );
        cmd.arg(input);
        let output = run(cmd)
            .map_err(|e| Error::Counting(format!("could not call {}: {e}", self.path.display())))?;
        let res = parse_count_output(io::Cursor::new(output.stdout));
        workdir.close()?;
        res
    }

    fn sample(&mut self, request: &SampleRequest<'_>) -> Result<SampleOutcome, Error> {
        let workdir = tempfile::tempdir()?;
        let input = write_input(workdir.path(), request.formula, request.support)?;
        let sample_path = workdir.path().join("samples.txt");
        let mut cmd = self.command(
            workdir.path(),
            request.seed,
            request.pivot,
            request.iterations,
        );
        cmd.arg(format!("--multisample={}", u8::from(request.multisample)))
            .arg(format!("--kappa={}", request.kappa))
            .arg(format!("--samples={}", request.n_samples))
            .arg(format!("--sampleFile={}", sample_path.display()))
            .arg(input);
        let output = run(cmd)
            .map_err(|e| Error::Sampling(format!("could not call {}: {e}", self.path.display())))?;
        if reports_unsat(io::Cursor::new(output.stdout))? {
            return Ok(SampleOutcome::Unsat);
        }
        let file = fs::File::open(&sample_path)
            .map_err(|_| Error::Sampling("sampling did not complete successfully".into()))?;
        let samples = parse_samples(io::BufReader::new(file), request.projection)?;
        workdir.close()?;
        Ok(SampleOutcome::Samples(samples))
    }
}

/// Checks whether the tool output reports an unsatisfiable input
fn reports_unsat<R: BufRead>(reader: R) -> Result<bool, Error> {
    for line in reader.lines() {
        if line?.trim_end() == UNSAT_LINE {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Parses the output of an approximate counting call
///
/// # Errors
///
/// [`Error::Counting`] if no result or more than one result is reported or the
/// result line is malformed
pub fn parse_count_output<R: BufRead>(reader: R) -> Result<CountOutcome, Error> {
    let mut outcome = None;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        let this = if let Some(count) = line.strip_prefix(COUNT_PREFIX) {
            let (_, (cell_count, hash_count)) = all_consuming(separated_pair(
                terminated(u64, space0),
                tag("x"),
                preceded(space0, preceded(tag("2^"), terminated(u32, space0))),
            ))(count)
            .map_err(|_: nom::Err<NomError<&str>>| {
                Error::Counting(format!("malformed count line: {line}"))
            })?;
            CountOutcome::Count {
                cell_count,
                hash_count,
            }
        } else if line == UNSAT_LINE {
            CountOutcome::Unsat
        } else {
            continue;
        };
        if outcome.is_some() {
            return Err(Error::Counting("counter reported more than one result".into()));
        }
        outcome = Some(this);
    }
    outcome.ok_or_else(|| Error::Counting("counter did not complete successfully".into()))
}

/// Parses a sample file, projecting every sample onto `projection`
///
/// Each line holds one sample: a one-character tag, the literals of the
/// sample terminated by `0`, and optionally `:` followed by a multiplicity.
///
/// # Errors
///
/// [`Error::Sampling`] if a line is malformed or a sample does not assign
/// exactly one polarity to each projection variable
pub fn parse_samples<R: BufRead>(reader: R, projection: &[Var]) -> Result<Vec<Vec<Lit>>, Error> {
    let mut samples = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let body = line.get(1..).unwrap_or_default();
        let body = body.split(':').next().unwrap_or_default();
        let fields: Vec<&str> = body.split_whitespace().collect();
        let Some((&"0", lits)) = fields.split_last() else {
            return Err(Error::Sampling(format!("malformed sample line: {line}")));
        };
        let lits = lits
            .iter()
            .map(|field| {
                field
                    .parse::<i32>()
                    .ok()
                    .and_then(|val| Lit::from_dimacs(val).ok())
                    .ok_or_else(|| Error::Sampling(format!("invalid literal in sample: {field}")))
            })
            .collect::<Result<RsHashSet<Lit>, Error>>()?;
        let sample = projection
            .iter()
            .map(|var| {
                match (lits.contains(&var.pos_lit()), lits.contains(&var.neg_lit())) {
                    (true, false) => Ok(var.pos_lit()),
                    (false, true) => Ok(var.neg_lit()),
                    (true, true) => Err(Error::Sampling(format!(
                        "sample assigns both polarities to variable {}",
                        var.to_dimacs()
                    ))),
                    (false, false) => Err(Error::Sampling(format!(
                        "incomplete sample, variable {} missing",
                        var.to_dimacs()
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        samples.push(sample);
    }
    Ok(samples)
}
