//! # Interfaces to SAT Solvers
//!
//! This module holds the traits the estimation engine uses to talk to its
//! satisfiability oracle. The main element is the [`Solve`] trait that every
//! oracle implements. Counting only needs incremental solving under
//! assumptions, provided by [`SolveIncremental`].
//!
//! ## Available Solvers
//!
//! Solvers are available through separate crates.
//!
//! ### BatSat
//!
//! [BatSat](https://github.com/c-cube/batsat) is an incremental SAT solver
//! fully implemented in Rust. It is available through the `maxcount-batsat`
//! crate in this workspace.

use std::{fmt, time::Duration};

use crate::types::{Clause, Lit, TernaryVal, Var};

/// A satisfiability oracle. The estimator builds a fresh oracle per witness
/// via [`Default`], loads the formula and the witness units, and then only
/// queries it.
pub trait Solve {
    /// Gets a signature of the solver implementation
    fn signature(&self) -> &'static str;
    /// Reserves memory in the solver until a maximum variables, if the solver
    /// supports it
    ///
    /// # Errors
    ///
    /// A specific implementation might return errors
    fn reserve(&mut self, _max_var: Var) -> anyhow::Result<()> {
        Ok(())
    }
    /// Solves the internal CNF formula without any assumptions.
    ///
    /// # Errors
    ///
    /// A specific implementation might return errors
    fn solve(&mut self) -> anyhow::Result<SolverResult>;
    /// Same as [`Solve::lit_val`], but for variables.
    ///
    /// # Errors
    ///
    /// See [`Solve::lit_val`]
    fn var_val(&self, var: Var) -> anyhow::Result<TernaryVal> {
        self.lit_val(var.pos_lit())
    }
    /// Gets an assignment of a variable in the solver.
    ///
    /// # Errors
    ///
    /// - If the solver is not in the satisfied state
    /// - A specific implementation might return other errors
    fn lit_val(&self, lit: Lit) -> anyhow::Result<TernaryVal>;
    /// Adds a clause to the solver
    ///
    /// # Errors
    ///
    /// A specific implementation might return errors
    fn add_clause(&mut self, clause: Clause) -> anyhow::Result<()>;
    /// Like [`Solve::add_clause`] but for unit clauses (clauses with one literal).
    ///
    /// # Errors
    ///
    /// See [`Solve::add_clause`]
    fn add_unit(&mut self, lit: Lit) -> anyhow::Result<()> {
        self.add_clause(Clause::from(vec![lit]))
    }
}

/// Trait for all SAT solvers that can solve under assumptions.
pub trait SolveIncremental: Solve {
    /// Solves the internal CNF formula under assumptions.
    ///
    /// # Errors
    ///
    /// A specific implementation might return errors
    fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult>;
}

/// Solver statistics
#[derive(Clone, PartialEq, Default, Debug)]
pub struct SolverStats {
    /// The number of satisfiable queries executed
    pub n_sat: usize,
    /// The number of unsatisfiable queries executed
    pub n_unsat: usize,
    /// The number of terminated queries executed
    pub n_terminated: usize,
    /// The number of clauses in the solver
    pub n_clauses: usize,
    /// The highest variable in the solver
    pub max_var: Option<Var>,
    /// The average length of the clauses added to the solver
    pub avg_clause_len: f32,
    /// The total CPU time spent solving
    pub cpu_solve_time: Duration,
}

/// Trait for solvers that track certain statistics. Statistics are only
/// logged, never used for decisions.
pub trait SolveStats {
    /// Gets the available statistics from the solver
    fn stats(&self) -> SolverStats;
    /// Gets the total number of queries executed.
    fn n_solves(&self) -> usize {
        let stats = self.stats();
        stats.n_sat + stats.n_unsat + stats.n_terminated
    }
    /// Gets the variable with the highest index in the solver, if any.
    fn max_var(&self) -> Option<Var> {
        self.stats().max_var
    }
}

/// Return value for solving queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverResult {
    /// The query was found satisfiable.
    Sat,
    /// The query was found unsatisfiable.
    Unsat,
    /// The query was prematurely interrupted.
    Interrupted,
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverResult::Sat => write!(f, "SAT"),
            SolverResult::Unsat => write!(f, "UNSAT"),
            SolverResult::Interrupted => write!(f, "Interrupted"),
        }
    }
}
