//! # Result Reporting
//!
//! The outcome of a run and its textual rendering. Lines are printed
//! depending on the verbosity level:
//!
//! - `0`: the witness (`v` line) and the estimated max-count
//! - `1`: additionally the upper and lower bounds
//! - `2`: additionally the witness quality

use std::{fmt, io};

use crate::{
    bounds::{Bound, Quality},
    count::{Count, CountEstimate},
    refine::Refined,
    sample::Witness,
    utils::Sig6,
};

/// Highest supported verbosity level
pub const MAX_VERBOSITY: u8 = 2;

/// The outcome of estimating the max-count of a formula
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    /// The best witness, `None` if the formula is unsatisfiable
    pub witness: Option<Witness>,
    /// The estimated max-count, clamped to `2^counting variables`
    pub estimate: Count,
    /// The estimate of the best witness before refinement
    pub best: Option<CountEstimate>,
    /// The outcome of refinement, if it was performed
    pub refined: Option<Refined>,
    /// Upper bound on the max-count
    pub upper: Bound,
    /// Lower bound on the max-count
    pub lower: Bound,
    /// Lower bound on the quality of the witness
    pub quality: Option<Quality>,
    /// The number of distinct witnesses that were counted
    pub n_witnesses: usize,
}

impl Report {
    /// The report for a formula without any witness
    #[must_use]
    pub fn unsat() -> Self {
        let certain = Bound {
            count: Count::ZERO,
            confidence: 1.,
            trivial: false,
        };
        Report {
            witness: None,
            estimate: Count::ZERO,
            best: None,
            refined: None,
            upper: certain,
            lower: certain,
            quality: None,
            n_witnesses: 0,
        }
    }

    /// Whether the formula was found unsatisfiable
    #[must_use]
    pub fn is_unsat(&self) -> bool {
        self.witness.is_none()
    }

    /// Writes the report at the given verbosity level
    ///
    /// # Errors
    ///
    /// If writing fails
    pub fn write<W: io::Write>(&self, writer: &mut W, verbosity: u8) -> io::Result<()> {
        write!(writer, "{}", self.display(verbosity))
    }

    /// Gets a displayable rendering of the report at the given verbosity
    /// level
    #[must_use]
    pub fn display(&self, verbosity: u8) -> Display<'_> {
        Display {
            report: self,
            verbosity,
        }
    }
}

/// Displays a [`Report`] at a verbosity level
pub struct Display<'a> {
    report: &'a Report,
    verbosity: u8,
}

impl fmt::Display for Display<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let Some(witness) = &report.witness else {
            writeln!(f, "c Formula is UNSAT")?;
            writeln!(f, "c Estimated max-count: {}", report.estimate)?;
            if self.verbosity >= 1 {
                writeln!(f, "c Max-count is <= {}", report.upper)?;
                writeln!(f, "c Max-count is >= {}", report.lower)?;
            }
            return Ok(());
        };
        write!(f, "v ")?;
        for lit in witness {
            write!(f, "{lit} ")?;
        }
        writeln!(f, "0")?;
        if self.verbosity >= 2 {
            if let Some(quality) = report.quality {
                writeln!(
                    f,
                    "c Witness quality (exact count / max-count) >= {} with probability >= {}",
                    Sig6(quality.ratio),
                    Sig6(quality.confidence)
                )?;
            }
        }
        writeln!(f, "c Estimated max-count: {}", report.estimate)?;
        if self.verbosity >= 1 {
            writeln!(f, "c Max-count is <= {}", report.upper)?;
            writeln!(f, "c Max-count is >= {}", report.lower)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Report;
    use crate::{
        bounds::{Bound, Quality},
        count::Count,
        lit,
    };

    #[test]
    fn unsat_report() {
        let report = Report::unsat();
        assert!(report.is_unsat());
        assert_eq!(
            format!("{}", report.display(1)),
            "c Formula is UNSAT\n\
             c Estimated max-count: 0 x 2^0\n\
             c Max-count is <= 0 x 2^0 with probability >= 1\n\
             c Max-count is >= 0 x 2^0 with probability >= 1\n"
        );
        assert_eq!(
            format!("{}", report.display(0)),
            "c Formula is UNSAT\nc Estimated max-count: 0 x 2^0\n"
        );
    }

    fn report() -> Report {
        Report {
            witness: Some(vec![lit![0], !lit![1]]),
            estimate: Count::pow2(3),
            best: None,
            refined: None,
            upper: Bound::trivial(Count::pow2(3)),
            lower: Bound {
                count: Count::new(1.5, 2),
                confidence: 0.8,
                trivial: false,
            },
            quality: Some(Quality {
                ratio: 0.25,
                confidence: 0.8,
            }),
            n_witnesses: 2,
        }
    }

    #[test]
    fn verbosity_levels() {
        let report = report();
        assert_eq!(
            format!("{}", report.display(0)),
            "v 1 -2 0\nc Estimated max-count: 1 x 2^3\n"
        );
        assert_eq!(
            format!("{}", report.display(1)),
            "v 1 -2 0\n\
             c Estimated max-count: 1 x 2^3\n\
             c Max-count is <= 1 x 2^3 with probability >= 1 (trivial bound)\n\
             c Max-count is >= 1.5 x 2^2 with probability >= 0.8\n"
        );
        let full = format!("{}", report.display(2));
        assert!(full.contains(
            "c Witness quality (exact count / max-count) >= 0.25 with probability >= 0.8\n"
        ));
    }

    #[test]
    fn write_matches_display() {
        let report = report();
        let mut buf = Vec::new();
        report.write(&mut buf, 1).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), format!("{}", report.display(1)));
    }
}
