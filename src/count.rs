//! # Counts and Count Estimates
//!
//! Model counts easily exceed the range of any integer type, so they are
//! represented as `mantissa x 2^exponent` with the mantissa normalized to
//! `[1,2)`, or the count being exactly `0 x 2^0`.

use std::{cmp::Ordering, fmt};

use crate::utils::Sig6;

/// Exponent gap beyond which densities are treated as zero
pub(crate) const DENSITY_CUTOFF: i64 = 1000;

/// A normalized count `mantissa x 2^exponent`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Count {
    mantissa: f64,
    exponent: i64,
}

impl Count {
    /// The zero count
    pub const ZERO: Count = Count {
        mantissa: 0.,
        exponent: 0,
    };

    /// Creates a new normalized count. A non-finite mantissa is kept as is.
    #[must_use]
    pub fn new(mantissa: f64, exponent: i64) -> Count {
        if mantissa <= 0. {
            return Count::ZERO;
        }
        let mut count = Count { mantissa, exponent };
        if mantissa.is_finite() {
            while count.mantissa >= 2. {
                count.mantissa /= 2.;
                count.exponent += 1;
            }
            while count.mantissa < 1. {
                count.mantissa *= 2.;
                count.exponent -= 1;
            }
        }
        count
    }

    /// Creates an exact count from a number of models
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_models(n_models: u64) -> Count {
        Count::new(n_models as f64, 0)
    }

    /// Creates the count `2^exponent`
    #[must_use]
    pub fn pow2(exponent: i64) -> Count {
        Count {
            mantissa: 1.,
            exponent,
        }
    }

    /// Gets the mantissa, in `[1,2)` or 0
    #[must_use]
    pub fn mantissa(&self) -> f64 {
        self.mantissa
    }

    /// Gets the exponent
    #[must_use]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Checks whether the count is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.mantissa == 0.
    }

    /// Multiplies the count by a non-negative factor
    #[must_use]
    pub fn scale(self, factor: f64) -> Count {
        Count::new(self.mantissa * factor, self.exponent)
    }

    /// Base-2 logarithm of the count, negative infinity for zero
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn log2(&self) -> f64 {
        self.mantissa.log2() + self.exponent as f64
    }

    /// The fraction of `2^n_vars` assignments that this count represents.
    /// Counts more than [`DENSITY_CUTOFF`] orders of magnitude below are
    /// treated as density 0.
    #[must_use]
    pub fn density(&self, n_vars: usize) -> f64 {
        let n_vars = i64::try_from(n_vars).unwrap_or(i64::MAX);
        let diff = n_vars.saturating_sub(self.exponent);
        if diff > DENSITY_CUTOFF {
            return 0.;
        }
        #[allow(clippy::cast_possible_truncation)]
        let diff = diff.max(-DENSITY_CUTOFF) as i32;
        self.mantissa / 2f64.powi(diff)
    }
}

impl Default for Count {
    fn default() -> Self {
        Count::ZERO
    }
}

/// Counts are ordered by exponent first, then by mantissa. Zero is smaller
/// than all positive counts.
impl PartialOrd for Count {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => match self.exponent.cmp(&other.exponent) {
                Ordering::Equal => self.mantissa.partial_cmp(&other.mantissa),
                ord => Some(ord),
            },
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x 2^{}", Sig6(self.mantissa), self.exponent)
    }
}

/// The counting strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// Checking every assignment to the counting variables
    BruteForce,
    /// Density estimation from random assignments
    MonteCarlo,
    /// Model enumeration with blocking clauses
    Enumeration,
    /// Approximate hashing-based counting
    Hashing,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::BruteForce => write!(f, "brute force"),
            Strategy::MonteCarlo => write!(f, "Monte Carlo"),
            Strategy::Enumeration => write!(f, "enumeration"),
            Strategy::Hashing => write!(f, "hashing"),
        }
    }
}

/// An estimated count with its accuracy guarantee
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CountEstimate {
    /// The estimated count
    pub count: Count,
    /// Whether the count is exact
    pub exact: bool,
    /// Factor by which the true count may deviate, at least 1
    pub mult_error: f64,
    /// Probability with which the error guarantee holds
    pub confidence: f64,
    /// The strategy that produced the estimate
    pub strategy: Strategy,
}

impl CountEstimate {
    /// Creates an exact estimate
    #[must_use]
    pub fn exact(count: Count, strategy: Strategy) -> CountEstimate {
        CountEstimate {
            count,
            exact: true,
            mult_error: 1.,
            confidence: 1.,
            strategy,
        }
    }

    /// Creates an approximate estimate
    #[must_use]
    pub fn approximate(
        count: Count,
        mult_error: f64,
        confidence: f64,
        strategy: Strategy,
    ) -> CountEstimate {
        CountEstimate {
            count,
            exact: false,
            mult_error,
            confidence,
            strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Count;

    #[test]
    fn normalize() {
        let c = Count::new(12., 0);
        assert_eq!((c.mantissa(), c.exponent()), (1.5, 3));
        let c = Count::new(0.375, 5);
        assert_eq!((c.mantissa(), c.exponent()), (1.5, 3));
        let c = Count::new(0., 17);
        assert_eq!(c, Count::ZERO);
        assert_eq!(Count::from_models(8), Count::pow2(3));
    }

    #[test]
    fn normalize_idempotent() {
        for (m, e) in [(3.7, 2), (0.01, 10), (1., 0), (1.999, -3), (0., 0)] {
            let once = Count::new(m, e);
            let twice = Count::new(once.mantissa(), once.exponent());
            assert_eq!(once, twice);
            assert!(once.is_zero() || (1. ..2.).contains(&once.mantissa()));
        }
    }

    #[test]
    fn ordering() {
        assert!(Count::new(1., 3) > Count::new(1.9, 2));
        assert!(Count::new(1.5, 3) > Count::new(1.2, 3));
        assert!(Count::ZERO < Count::new(1., -2));
        assert!(Count::ZERO >= Count::ZERO);
    }

    #[test]
    fn density() {
        assert!((Count::new(1., 3).density(5) - 0.25).abs() < 1e-12);
        assert_eq!(Count::new(1., 0).density(2000), 0.);
        assert_eq!(Count::ZERO.density(3), 0.);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Count::pow2(3)), "1 x 2^3");
        assert_eq!(format!("{}", Count::new(3., 0)), "1.5 x 2^1");
        assert_eq!(format!("{}", Count::ZERO), "0 x 2^0");
    }
}
