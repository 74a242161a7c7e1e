//! # maxcount-batsat - BatSat Oracle for maxcount
//!
//! Interface to the [BatSat](https://github.com/c-cube/batsat) incremental SAT
//! solver to be used as the satisfiability oracle of the
//! [maxcount](../maxcount) estimator.
//!
//! BatSat is fully implemented in Rust, so no external solver needs to be
//! built or installed.
//!
//! # BatSat Version
//!
//! The version of BatSat in this crate is Version 0.6.0.

#![warn(clippy::pedantic)]
#![warn(missing_docs)]

use std::time::Duration;

use batsat::{intmap::AsIndex, lbool, Callbacks, SolverInterface};
use cpu_time::ProcessTime;
use maxcount::{
    solvers::{Solve, SolveIncremental, SolveStats, SolverResult, SolverStats},
    types::{Clause, Lit, TernaryVal, Var},
};

/// maxcount wrapper for [`batsat::BasicSolver`]
pub type BasicSolver = Solver<batsat::BasicCallbacks>;

/// maxcount wrapper for a [`batsat::Solver`] Solver from BatSat
#[derive(Default)]
pub struct Solver<Cb: Callbacks> {
    internal: batsat::Solver<Cb>,
    n_sat: usize,
    n_unsat: usize,
    n_terminated: usize,
    avg_clause_len: f32,
    cpu_time: Duration,
}

impl<Cb: Callbacks> Solver<Cb> {
    /// Gets a reference to the internal [`BasicSolver`]
    #[must_use]
    pub fn batsat_ref(&self) -> &batsat::Solver<Cb> {
        &self.internal
    }

    fn n_clauses(&self) -> usize {
        usize::try_from(self.internal.num_clauses()).unwrap_or(usize::MAX)
    }

    #[allow(clippy::cast_precision_loss)]
    #[inline]
    fn update_avg_clause_len(&mut self, clause: &Clause) {
        self.avg_clause_len = (self.avg_clause_len * ((self.n_clauses()) as f32)
            + clause.len() as f32)
            / (self.n_clauses() + 1) as f32;
    }

    fn lit(&mut self, lit: Lit) -> batsat::Lit {
        batsat::Lit::new(self.internal.var_of_int(lit.vidx32() + 1), lit.is_pos())
    }

    fn solve_track_stats(&mut self, assumps: &[Lit]) -> SolverResult {
        let a = assumps.iter().map(|&l| self.lit(l)).collect::<Vec<_>>();

        let start = ProcessTime::now();
        let ret = match self.internal.solve_limited(&a) {
            x if x == lbool::TRUE => {
                self.n_sat += 1;
                SolverResult::Sat
            }
            x if x == lbool::FALSE => {
                self.n_unsat += 1;
                SolverResult::Unsat
            }
            _ => {
                self.n_terminated += 1;
                SolverResult::Interrupted
            }
        };
        self.cpu_time += start.elapsed();
        ret
    }
}

impl<Cb: Callbacks> Solve for Solver<Cb> {
    fn signature(&self) -> &'static str {
        "BatSat 0.6.0"
    }

    fn reserve(&mut self, max_var: Var) -> anyhow::Result<()> {
        self.internal.var_of_int(max_var.idx32() + 1);
        Ok(())
    }

    fn solve(&mut self) -> anyhow::Result<SolverResult> {
        Ok(self.solve_track_stats(&[]))
    }

    fn lit_val(&self, lit: Lit) -> anyhow::Result<TernaryVal> {
        if !self.max_var().is_some_and(|max| lit.var() <= max) {
            anyhow::bail!("variable {} is unknown to the solver", lit.var());
        }
        let l = batsat::Lit::new(batsat::Var::from_index(lit.vidx() + 1), lit.is_pos());

        match self.internal.value_lit(l) {
            x if x == lbool::TRUE => Ok(TernaryVal::True),
            x if x == lbool::FALSE => Ok(TernaryVal::False),
            _ => Ok(TernaryVal::DontCare),
        }
    }

    fn add_clause(&mut self, clause: Clause) -> anyhow::Result<()> {
        self.update_avg_clause_len(&clause);

        let mut c: Vec<_> = clause.into_iter().map(|l| self.lit(l)).collect();

        self.internal.add_clause_reuse(&mut c);

        Ok(())
    }
}

impl<Cb: Callbacks> SolveIncremental for Solver<Cb> {
    fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult> {
        Ok(self.solve_track_stats(assumps))
    }
}

impl<Cb: Callbacks> SolveStats for Solver<Cb> {
    fn stats(&self) -> SolverStats {
        SolverStats {
            n_sat: self.n_sat,
            n_unsat: self.n_unsat,
            n_terminated: self.n_terminated,
            n_clauses: self.n_clauses(),
            max_var: self.max_var(),
            avg_clause_len: self.avg_clause_len,
            cpu_solve_time: self.cpu_time,
        }
    }

    fn max_var(&self) -> Option<Var> {
        let num = self.internal.num_vars();
        if num > 1 {
            // BatSat returns a value that is off by one
            Some(Var::new(num - 2))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use maxcount::{
        clause, lit,
        solvers::{Solve, SolveIncremental, SolveStats, SolverResult},
        types::TernaryVal,
        var,
    };

    use super::BasicSolver;

    #[test]
    fn build_destroy() {
        let _solver = BasicSolver::default();
    }

    #[test]
    fn tiny_instance_sat() {
        let mut solver = BasicSolver::default();
        solver.add_clause(clause![lit![0], !lit![1]]).unwrap();
        solver.add_clause(clause![lit![1], !lit![2]]).unwrap();
        solver.add_clause(clause![lit![2], !lit![3]]).unwrap();
        solver.add_clause(clause![lit![3], !lit![4]]).unwrap();
        solver.add_clause(clause![lit![4], !lit![5]]).unwrap();
        solver.add_clause(clause![lit![5], !lit![6]]).unwrap();
        solver.add_clause(clause![lit![6], !lit![7]]).unwrap();
        solver.add_clause(clause![lit![7], !lit![0]]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
    }

    #[test]
    fn tiny_instance_unsat() {
        let mut solver = BasicSolver::default();
        solver.add_clause(clause![!lit![0], !lit![1]]).unwrap();
        solver.add_clause(clause![lit![1], !lit![2]]).unwrap();
        solver.add_unit(lit![0]).unwrap();
        solver.add_unit(lit![2]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Unsat);
    }

    #[test]
    fn assumptions() {
        let mut solver = BasicSolver::default();
        solver.add_clause(clause![lit![0], lit![1]]).unwrap();
        assert_eq!(
            solver.solve_assumps(&[!lit![0], !lit![1]]).unwrap(),
            SolverResult::Unsat
        );
        assert_eq!(solver.solve_assumps(&[!lit![0]]).unwrap(), SolverResult::Sat);
        assert_eq!(solver.lit_val(lit![1]).unwrap(), TernaryVal::True);
        assert_eq!(solver.var_val(var![0]).unwrap(), TernaryVal::False);
        // assumptions do not persist
        assert_eq!(solver.solve_assumps(&[!lit![1]]).unwrap(), SolverResult::Sat);
        assert_eq!(solver.lit_val(lit![0]).unwrap(), TernaryVal::True);
    }

    #[test]
    fn reserve_unused_vars() {
        let mut solver = BasicSolver::default();
        solver.reserve(var![4]).unwrap();
        assert_eq!(solver.max_var(), Some(var![4]));
        solver.add_unit(lit![0]).unwrap();
        assert_eq!(solver.solve_assumps(&[lit![4]]).unwrap(), SolverResult::Sat);
        assert_eq!(solver.lit_val(lit![4]).unwrap(), TernaryVal::True);
        assert!(solver.lit_val(lit![5]).is_err());
    }

    #[test]
    fn stats() {
        let mut solver = BasicSolver::default();
        solver.add_clause(clause![lit![0], lit![1]]).unwrap();
        solver.add_clause(clause![!lit![0]]).unwrap();
        solver.solve().unwrap();
        solver.solve_assumps(&[!lit![1]]).unwrap();
        let stats = solver.stats();
        assert_eq!(stats.n_sat, 1);
        assert_eq!(stats.n_unsat, 1);
        assert_eq!(solver.n_solves(), 2);
        assert!((stats.avg_clause_len - 1.5).abs() < 1e-6);
    }
}
