//! # Self-Composition
//!
//! The `k`-fold self-composition of a formula conjoins `k` copies of the
//! formula that share the maximization variables while all other variables
//! are renamed apart. A model of the composition corresponds to one
//! assignment to the maximization variables together with `k` independent
//! completions, so sampling it uniformly favours witnesses with many
//! completions.

use crate::{
    instances::{Cnf, Formula},
    types::{Clause, Lit, RsHashSet, Var},
    Error,
};

/// Trait for self-composition transforms
pub trait Compose {
    /// Builds the `k`-fold self-composition of `formula`
    ///
    /// # Errors
    ///
    /// If the composition cannot be built
    fn compose(&self, formula: &Formula, k: usize) -> Result<Formula, Error>;
}

/// In-process self-composition by shifting variable indices
///
/// Variable `v` of copy `i` (counting from 0) that is not a maximization
/// variable becomes `v + i * n`, where `n` is the number of variables of the
/// input formula. Copy 0 is the input formula itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfComposition;

impl SelfComposition {
    fn shift(lit: Lit, offset: u32, shared: &RsHashSet<Var>) -> Result<Lit, Error> {
        if offset == 0 || shared.contains(&lit.var()) {
            return Ok(lit);
        }
        lit.vidx32()
            .checked_add(offset)
            .and_then(|idx| Lit::new_with_error(idx, lit.is_neg()).ok())
            .ok_or_else(|| Error::Validation("self-composition exceeds variable limit".into()))
    }
}

impl Compose for SelfComposition {
    fn compose(&self, formula: &Formula, k: usize) -> Result<Formula, Error> {
        let n_vars = formula.n_vars();
        let shared: RsHashSet<Var> = formula.max_vars().iter().copied().collect();
        let k = u32::try_from(k)
            .map_err(|_| Error::Validation("number of copies too large".into()))?;
        let mut cnf = Cnf::new();
        let mut counting_vars = Vec::new();
        for copy in 0..k {
            let offset = copy
                .checked_mul(n_vars)
                .ok_or_else(|| Error::Validation("self-composition exceeds variable limit".into()))?;
            for clause in formula.cnf() {
                let clause = clause
                    .iter()
                    .map(|&l| Self::shift(l, offset, &shared))
                    .collect::<Result<Clause, _>>()?;
                cnf.add_clause(clause);
            }
            for &var in formula.counting_vars() {
                counting_vars.push(Self::shift(var.pos_lit(), offset, &shared)?.var());
            }
        }
        Ok(Formula::new(
            cnf,
            formula.max_vars().iter().copied(),
            counting_vars,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{Compose, SelfComposition};
    use crate::{
        clause, dimacs_lit,
        instances::{Cnf, Formula},
        var,
    };

    fn formula() -> Formula {
        // max var 1, counting vars 2 and 3
        let cnf: Cnf = [
            clause![dimacs_lit![1], dimacs_lit![2]],
            clause![dimacs_lit![-2], dimacs_lit![-3]],
        ]
        .into_iter()
        .collect();
        Formula::new(cnf, [var![0]], [var![1], var![2]])
    }

    #[test]
    fn one_fold_is_identity() {
        let form = formula();
        let comp = SelfComposition.compose(&form, 1).unwrap();
        assert_eq!(comp, form);
    }

    #[test]
    fn two_fold_shares_max_vars() {
        let comp = SelfComposition.compose(&formula(), 2).unwrap();
        assert_eq!(comp.cnf().len(), 4);
        assert_eq!(comp.max_vars(), &[var![0]]);
        assert_eq!(
            comp.cnf()[2],
            clause![dimacs_lit![1], dimacs_lit![5]]
        );
        assert_eq!(
            comp.cnf()[3],
            clause![dimacs_lit![-5], dimacs_lit![-6]]
        );
        assert_eq!(
            comp.counting_vars().iter().copied().collect::<Vec<_>>(),
            vec![var![1], var![2], var![4], var![5]]
        );
        assert_eq!(comp.n_vars(), 6);
    }

    #[test]
    fn zero_fold_is_empty() {
        let comp = SelfComposition.compose(&formula(), 0).unwrap();
        assert!(comp.cnf().is_empty());
    }
}
