//! # Library-Internal Utilities

use std::fmt;

/// Bisection on `[0, start]` for the smallest value accepted by a monotone
/// predicate
///
/// `accept` must be monotone: if it holds for some value, it holds for all
/// larger values. The search keeps an accepted upper end (initially `start`,
/// assumed to be accepted) and a rejected lower end (initially 0) and stops
/// once they are closer than `width`. The returned value is the midpoint
/// examined last, which is not necessarily accepted.
#[must_use]
pub fn bisect<F>(start: f64, width: f64, mut accept: F) -> f64
where
    F: FnMut(f64) -> bool,
{
    let mut best = start;
    let mut worst = 0.;
    let mut current = (worst + best) / 2.;
    while best - worst >= width {
        if accept(current) {
            best = current;
            current = (worst + current) / 2.;
        } else {
            worst = current;
            current = (current + best) / 2.;
        }
    }
    current
}

/// Formats a floating point number with six significant digits, choosing
/// between fixed and scientific notation by magnitude and dropping trailing
/// zeros (the behaviour of C's `%g`)
#[derive(Clone, Copy, Debug)]
pub struct Sig6(pub f64);

impl fmt::Display for Sig6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PRECISION: i32 = 6;
        let val = self.0;
        if val == 0. {
            return write!(f, "0");
        }
        if !val.is_finite() {
            return write!(f, "{val}");
        }
        // exponent after rounding to the target precision
        let sci = format!("{:.*e}", (PRECISION - 1) as usize, val);
        let (sci_mant, sci_exp) = sci.split_once('e').unwrap_or((&sci, "0"));
        let exp: i32 = sci_exp.parse().unwrap_or(0);
        if exp < -4 || exp >= PRECISION {
            let sign = if exp < 0 { '-' } else { '+' };
            write!(
                f,
                "{}e{sign}{:02}",
                trim_zeros(sci_mant),
                exp.unsigned_abs()
            )
        } else {
            let decimals = usize::try_from(PRECISION - 1 - exp).unwrap_or(0);
            write!(f, "{}", trim_zeros(&format!("{val:.decimals$}")))
        }
    }
}

fn trim_zeros(num: &str) -> &str {
    if num.contains('.') {
        num.trim_end_matches('0').trim_end_matches('.')
    } else {
        num
    }
}

#[cfg(test)]
mod tests {
    use super::{bisect, Sig6};

    #[test]
    fn bisect_threshold() {
        let res = bisect(1., 1e-6, |x| x >= 0.3);
        assert!((res - 0.3).abs() < 1e-5);
    }

    #[test]
    fn bisect_all_accepted() {
        let res = bisect(2., 1e-6, |_| true);
        assert!(res < 1e-5);
    }

    #[test]
    fn sig6_fixed() {
        assert_eq!(format!("{}", Sig6(1.)), "1");
        assert_eq!(format!("{}", Sig6(1.5)), "1.5");
        assert_eq!(format!("{}", Sig6(0.6)), "0.6");
        assert_eq!(format!("{}", Sig6(1.234_567_8)), "1.23457");
        assert_eq!(format!("{}", Sig6(0.)), "0");
        assert_eq!(format!("{}", Sig6(123_456.)), "123456");
    }

    #[test]
    fn sig6_scientific() {
        assert_eq!(format!("{}", Sig6(1_234_567.)), "1.23457e+06");
        assert_eq!(format!("{}", Sig6(0.000_012_5)), "1.25e-05");
        assert_eq!(format!("{}", Sig6(0.999_999_9)), "1");
    }
}
