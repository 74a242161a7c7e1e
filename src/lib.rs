//! # maxcount - Approximate Max#SAT Solving
//!
//! `maxcount` estimates the max-count of a propositional formula: the maximum,
//! over all assignments to a set of maximization variables, of the number of
//! satisfying assignments to a disjoint set of counting variables. Besides the
//! witness assignment that attains (approximately) the maximum, it reports an
//! upper and a lower bound that hold with configurable probability.
//!
//! ## Approach
//!
//! 1. A bounded number of candidate witnesses is drawn, either by fair coin
//!    flips or with an approximately uniform sampler on a self-composition of
//!    the formula (see [`sample`] and [`selfcomp`]).
//! 2. The count of every witness is estimated with a cascade of strategies
//!    (see [`estimate`]).
//! 3. The per-witness errors and confidences are combined into bounds on the
//!    max-count (see [`bounds`]), optionally after recounting the best
//!    witness more precisely (see [`refine`]).
//!
//! ## Input Format
//!
//! Formulas are DIMACS CNF files in which comment lines of the form
//! `c max v1 v2 ... 0` declare maximization variables and lines of the form
//! `c ind v1 v2 ... 0` declare counting variables (see
//! [`instances::fio::dimacs`]).
//!
//! ## Collaborators
//!
//! The satisfiability oracle ([`solvers::SolveIncremental`]), the approximate
//! counter and sampler ([`approx::ApproxCount`]) and the self-composition
//! ([`selfcomp::Compose`]) are traits. An in-process BatSat oracle is
//! provided by the `maxcount-batsat` crate, and [`approx::ScalMc`] drives an
//! external `scalmc` executable.
//!
//! ## Crate Features
//!
//! - `compression`: Reading and writing compressed input files
//! - `fxhash`: Use the faster firefox hash function from `rustc-hash`
//! - `serde`: Serialization of parameters and results
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! Currently, the MSRV is 1.76.0.

#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::{io, marker::PhantomData};

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub mod approx;
pub mod bounds;
pub mod count;
pub mod estimate;
pub mod instances;
pub mod params;
pub mod refine;
pub mod report;
pub mod sample;
pub mod selfcomp;
pub mod solvers;
pub mod types;
pub mod utils;

use approx::ApproxCount;
use bounds::BoundState;
use estimate::{CountSettings, Estimator};
use instances::{fio::dimacs::LineError, Formula};
use params::Params;
use report::Report;
use selfcomp::{Compose, SelfComposition};
use solvers::{SolveIncremental, SolveStats};

/// Errors of the estimation pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input formula
    #[error("format error on line {line}: {source}")]
    Format {
        /// The offending (1-based) line number
        line: usize,
        /// What is wrong with the line
        source: instances::fio::dimacs::Error,
    },
    /// Invalid parameters
    #[error("invalid parameter: {0}")]
    Validation(String),
    /// The sampler failed or produced unusable output
    #[error("sampling failed: {0}")]
    Sampling(String),
    /// The approximate counter failed or produced unusable output
    #[error("counting failed: {0}")]
    Counting(String),
    /// An internal consistency check failed
    #[error("internal error: {0}")]
    Invariant(String),
    /// Error reported by a satisfiability oracle
    #[error("oracle error: {0}")]
    Oracle(#[from] anyhow::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<LineError> for Error {
    fn from(value: LineError) -> Self {
        match value {
            LineError::Io(err) => Error::Io(err),
            LineError::Format { line, error } => Error::Format {
                line,
                source: error,
            },
        }
    }
}

/// The estimation pipeline
///
/// `S` is the satisfiability oracle, a fresh instance of which is created
/// for every oracle-based count. `A` is the approximate counter and sampler
/// and `C` the self-composition.
pub struct MaxCount<S, A, C = SelfComposition> {
    params: Params,
    approx: A,
    composer: C,
    solver: PhantomData<S>,
}

impl<S, A> MaxCount<S, A, SelfComposition> {
    /// Creates a pipeline with the in-process self-composition
    pub fn new(params: Params, approx: A) -> Self {
        Self::with_composer(params, approx, SelfComposition)
    }
}

impl<S, A, C> MaxCount<S, A, C> {
    /// Creates a pipeline with a custom self-composition
    pub fn with_composer(params: Params, approx: A, composer: C) -> Self {
        MaxCount {
            params,
            approx,
            composer,
            solver: PhantomData,
        }
    }

    /// Gets the parameters
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Gets the approximate counter
    pub fn approx(&self) -> &A {
        &self.approx
    }

    /// Consumes the pipeline and returns the approximate counter
    pub fn into_approx(self) -> A {
        self.approx
    }
}

impl<S, A, C> MaxCount<S, A, C>
where
    S: SolveIncremental + SolveStats + Default,
    A: ApproxCount,
    C: Compose,
{
    /// Estimates the max-count of `formula`. Randomness is derived from the
    /// configured seed only, so runs are reproducible.
    ///
    /// # Errors
    ///
    /// If sampling, counting or an oracle call fails, or if the counts do not
    /// reach the confidence required for the bounds
    pub fn run(&mut self, formula: &Formula) -> Result<Report, Error> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.opts.seed);
        let witnesses = sample::sample_witnesses(
            formula,
            &self.params,
            &mut rng,
            &mut self.approx,
            &self.composer,
        )?;
        if witnesses.is_empty() {
            info!("no witnesses, formula is unsatisfiable");
            return Ok(Report::unsat());
        }

        let n_counting = formula.counting_vars().len();
        let mut estimator =
            Estimator::<S, A>::new(formula, &self.params, &mut self.approx, &mut rng);
        let mut state = BoundState::new();
        let settings = CountSettings::counting(&self.params);
        for (idx, witness) in witnesses.iter().enumerate() {
            let label = format!("witness {}", idx + 1);
            let estimate = estimator.count(witness, &settings, &label)?;
            if state.record(estimate, witness) {
                info!("{label} is the new best witness");
            }
        }
        state.check(self.params.count_conf)?;
        info!(
            "counts hold jointly with probability >= {}",
            state.count_conf()
        );

        let (best, witness) = state
            .best()
            .cloned()
            .ok_or_else(|| Error::Invariant("no witness was counted".into()))?;
        let refined = if self.params.opts.refine {
            Some(refine::refine(
                &mut estimator,
                &witness,
                &best,
                state.count_conf(),
                &self.params,
                n_counting,
            )?)
        } else {
            None
        };

        let upper = bounds::upper_bound(
            &state,
            &self.params,
            formula.max_vars().len(),
            n_counting,
        )?;
        let lower = match refined {
            Some(refined) => bounds::lower_bound(&refined.estimate, refined.confidence),
            None => bounds::lower_bound(&best, state.count_conf()),
        };

        Ok(Report {
            witness: Some(witness),
            estimate: upper.estimate,
            best: Some(best),
            refined,
            upper: upper.bound,
            lower,
            quality: Some(upper.quality),
            n_witnesses: witnesses.len(),
        })
    }
}
