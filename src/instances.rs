//! # Max#SAT Instance Representations
//!
//! A Max#SAT instance is a CNF formula together with a list of maximization
//! variables and a set of counting variables. The instance is parsed once and
//! is read-only afterwards.

use std::{
    collections::BTreeSet,
    io::{self, BufRead, BufReader, Write},
    ops::Index,
    path::Path,
};

use crate::{
    types::{Clause, Lit, RsHashSet, Var},
    Error,
};

pub mod fio;

/// Simple type representing a CNF formula
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Cnf {
    clauses: Vec<Clause>,
}

impl Cnf {
    /// Creates a new [`Cnf`]
    #[must_use]
    pub fn new() -> Cnf {
        Cnf::default()
    }

    /// Checks if the CNF is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the number of clauses
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Adds a clause to the CNF
    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Adds a unit clause to the CNF
    pub fn add_unit(&mut self, unit: Lit) {
        self.add_clause(Clause::from(vec![unit]));
    }

    /// Gets an iterator over the clauses
    pub fn iter(&self) -> std::slice::Iter<'_, Clause> {
        self.clauses.iter()
    }

    /// Gets the highest variable appearing in any clause
    #[must_use]
    pub fn max_var(&self) -> Option<Var> {
        self.iter().flat_map(Clause::iter).map(Lit::var).max()
    }
}

impl IntoIterator for Cnf {
    type Item = Clause;
    type IntoIter = std::vec::IntoIter<Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.into_iter()
    }
}

impl<'a> IntoIterator for &'a Cnf {
    type Item = &'a Clause;
    type IntoIter = std::slice::Iter<'a, Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}

impl FromIterator<Clause> for Cnf {
    fn from_iter<T: IntoIterator<Item = Clause>>(iter: T) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}

impl Extend<Clause> for Cnf {
    fn extend<T: IntoIterator<Item = Clause>>(&mut self, iter: T) {
        self.clauses.extend(iter);
    }
}

impl Index<usize> for Cnf {
    type Output = Clause;

    fn index(&self, index: usize) -> &Self::Output {
        &self.clauses[index]
    }
}

/// A Max#SAT formula: clauses, maximization variables and counting variables
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    cnf: Cnf,
    max_vars: Vec<Var>,
    counting_vars: BTreeSet<Var>,
}

impl Formula {
    /// Creates a new formula. Maximization variables keep the order of their
    /// first appearance, later duplicates are dropped.
    pub fn new<M, C>(cnf: Cnf, max_vars: M, counting_vars: C) -> Formula
    where
        M: IntoIterator<Item = Var>,
        C: IntoIterator<Item = Var>,
    {
        let mut seen = RsHashSet::default();
        let max_vars = max_vars.into_iter().filter(|v| seen.insert(*v)).collect();
        Formula {
            cnf,
            max_vars,
            counting_vars: counting_vars.into_iter().collect(),
        }
    }

    /// Parses an annotated DIMACS formula from a reader
    ///
    /// # Errors
    ///
    /// [`Error::Format`] naming the offending line, or [`Error::Io`]
    pub fn from_dimacs<R: BufRead>(reader: R) -> Result<Formula, Error> {
        fio::dimacs::parse_formula(reader).map_err(Error::from)
    }

    /// Parses an annotated DIMACS formula from a file path. With feature
    /// `compression` supports bzip2, gzip and xz compression, detected by
    /// the file extension.
    ///
    /// # Errors
    ///
    /// If the file cannot be opened or parsing fails
    pub fn from_dimacs_path<P: AsRef<Path>>(path: P) -> Result<Formula, Error> {
        let reader = BufReader::new(fio::open_compressed_uncompressed_read(path)?);
        Formula::from_dimacs(reader)
    }

    /// Writes the formula in DIMACS with `projection` declared as independent
    /// support
    ///
    /// # Errors
    ///
    /// If writing fails
    pub fn write_dimacs<W: Write>(&self, writer: &mut W, projection: &[Var]) -> io::Result<()> {
        fio::dimacs::write_formula(writer, &self.cnf, projection, self.max_var())
    }

    /// Writes the formula to a DIMACS file, see [`Formula::write_dimacs`]. With
    /// feature `compression` supports bzip2, gzip and xz compression.
    ///
    /// # Errors
    ///
    /// If the file cannot be created or writing fails
    pub fn write_dimacs_path<P: AsRef<Path>>(&self, path: P, projection: &[Var]) -> io::Result<()> {
        let mut writer = fio::open_compressed_uncompressed_write(path)?;
        self.write_dimacs(&mut writer, projection)
    }

    /// Gets the clauses
    #[must_use]
    pub fn cnf(&self) -> &Cnf {
        &self.cnf
    }

    /// Gets the maximization variables in order
    #[must_use]
    pub fn max_vars(&self) -> &[Var] {
        &self.max_vars
    }

    /// Gets the counting variables
    #[must_use]
    pub fn counting_vars(&self) -> &BTreeSet<Var> {
        &self.counting_vars
    }

    /// Gets the highest variable mentioned anywhere in the formula
    #[must_use]
    pub fn max_var(&self) -> Option<Var> {
        let annotated = self
            .max_vars
            .iter()
            .copied()
            .max()
            .max(self.counting_vars.last().copied());
        self.cnf.max_var().max(annotated)
    }

    /// The number of variables in the formula
    #[must_use]
    pub fn n_vars(&self) -> u32 {
        self.max_var().map_or(0, |v| v.idx32() + 1)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{Cnf, Formula};
    use crate::{clause, lit, var, Error};

    #[test]
    fn max_vars_dedup_keeps_order() {
        let form = Formula::new(Cnf::new(), [var![3], var![1], var![3], var![0]], []);
        assert_eq!(form.max_vars(), &[var![3], var![1], var![0]]);
    }

    #[test]
    fn max_var_includes_annotations() {
        let cnf: Cnf = [clause![lit![0], !lit![2]]].into_iter().collect();
        let form = Formula::new(cnf, [var![1]], [var![5]]);
        assert_eq!(form.max_var(), Some(var![5]));
        assert_eq!(form.n_vars(), 6);
        assert_eq!(Formula::new(Cnf::new(), [], []).n_vars(), 0);
    }

    #[test]
    fn format_error_carries_line() {
        let res = Formula::from_dimacs(Cursor::new("c max 1 2 0\nc ind 3 a 0\n"));
        assert!(matches!(res, Err(Error::Format { line: 2, .. })));
    }
}
