//! # Confidence Composition and Bounds
//!
//! Combines the per-witness estimates into a best witness and derives
//! probabilistic upper and lower bounds on the max-count.
//!
//! The upper bound argues that, with enough samples drawn from the
//! self-composition, at least one sampled witness has a count within a
//! factor of the true maximum. For coin-flip sampling this only works if the
//! maximizer itself was likely hit.

use std::fmt;

use crate::{
    count::{Count, CountEstimate},
    params::Params,
    sample::Witness,
    types::Lit,
    utils::Sig6,
    Error,
};

/// Intermediate base-2 exponents above which only the trivial bound is used
const EXPONENT_CUTOFF: f64 = 1000.;

/// Running state over all counted witnesses
#[derive(Clone, Debug, PartialEq)]
pub struct BoundState {
    best: Option<(CountEstimate, Witness)>,
    count_conf: f64,
    worst_mult_error: f64,
}

impl Default for BoundState {
    fn default() -> Self {
        BoundState {
            best: None,
            count_conf: 1.,
            worst_mult_error: 1.,
        }
    }
}

impl BoundState {
    /// Creates a state without witnesses
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the estimate of a witness. Returns `true` if the witness is
    /// the new best one.
    pub fn record(&mut self, estimate: CountEstimate, witness: &[Lit]) -> bool {
        if !estimate.exact {
            self.count_conf *= estimate.confidence;
        }
        if estimate.mult_error > self.worst_mult_error {
            self.worst_mult_error = estimate.mult_error;
        }
        let better = match &self.best {
            None => true,
            Some((best, _)) => estimate.count > best.count,
        };
        if better {
            self.best = Some((estimate, witness.to_vec()));
        }
        better
    }

    /// The best witness with its estimate
    #[must_use]
    pub fn best(&self) -> Option<&(CountEstimate, Witness)> {
        self.best.as_ref()
    }

    /// Product of the confidences of all non-exact estimates
    #[must_use]
    pub fn count_conf(&self) -> f64 {
        self.count_conf
    }

    /// Largest multiplicative error of any estimate
    #[must_use]
    pub fn worst_mult_error(&self) -> f64 {
        self.worst_mult_error
    }

    /// Checks that the counts jointly hold with at least `target` confidence
    ///
    /// # Errors
    ///
    /// [`Error::Invariant`] if the accumulated confidence is too low
    pub fn check(&self, target: f64) -> Result<(), Error> {
        if self.count_conf < target {
            return Err(Error::Invariant(format!(
                "count confidence {} below target {target}",
                self.count_conf
            )));
        }
        Ok(())
    }
}

/// A probabilistic bound on the max-count
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bound {
    /// The bounding count
    pub count: Count,
    /// Probability with which the bound holds
    pub confidence: f64,
    /// Whether this is the bound that holds regardless of the estimates
    pub trivial: bool,
}

impl Bound {
    /// A bound that holds with certainty
    #[must_use]
    pub fn trivial(count: Count) -> Self {
        Bound {
            count,
            confidence: 1.,
            trivial: true,
        }
    }
}

/// Lower bound on `exact count of the witness / max-count`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quality {
    /// The ratio
    pub ratio: f64,
    /// Probability with which the ratio holds
    pub confidence: f64,
}

/// Upper bound together with the quantities derived alongside it
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpperBound {
    /// The bound
    pub bound: Bound,
    /// Best estimate clamped to `2^counting variables`
    pub estimate: Count,
    /// Quality of the best witness
    pub quality: Quality,
    /// Factor by which the max-count may exceed the best witness count,
    /// `None` if no such factor could be established
    pub factor: Option<f64>,
}

/// Factor by which the max-count may exceed the count of the best sampled
/// witness with `params.opts.upper_conf` confidence, given that all counts are
/// correct with `count_conf`. `None` if only the trivial bound holds.
#[must_use]
pub fn upper_mult_error(params: &Params, count_conf: f64, n_max_vars: usize) -> Option<f64> {
    #[allow(clippy::cast_precision_loss)]
    let n_samples = params.opts.samples as f64;
    #[allow(clippy::cast_precision_loss)]
    let n_max = n_max_vars as f64;

    let required = params.opts.upper_conf / count_conf;
    let delta = 1. - required;
    let f = (1. - delta.powf(1. / n_samples)) * (1. + params.sample_epsilon);
    if f >= 1. {
        return None;
    }
    if params.k == 0 {
        // probability of hitting the maximizer by chance
        let hit = 1. - (1. - (-n_max).exp2()).powf(n_samples);
        return (hit >= required).then_some(1.);
    }
    #[allow(clippy::cast_precision_loss)]
    let k = params.k as f64;
    let krat = n_max / k;
    if f == 0. {
        // underflow, use series expansion of the logarithm
        let log_fail =
            (-delta.ln()).log2() - n_samples.log2() + delta.log2() / (2. * n_samples);
        let log_factor = (n_max - log_fail + (1. + params.sample_epsilon).log2()) / k;
        return (log_factor <= EXPONENT_CUTOFF).then(|| log_factor.exp2());
    }
    let recip = 1. / f;
    if krat > EXPONENT_CUTOFF || krat - (recip - 1.).log2() / k > EXPONENT_CUTOFF {
        return None;
    }
    Some(krat.exp2() / (recip - 1.).powf(1. / k))
}

/// Derives the upper bound from the best witness
///
/// # Errors
///
/// [`Error::Invariant`] if no witness was recorded
pub fn upper_bound(
    state: &BoundState,
    params: &Params,
    n_max_vars: usize,
    n_counting: usize,
) -> Result<UpperBound, Error> {
    let (best, _) = state
        .best()
        .ok_or_else(|| Error::Invariant("no witness was counted".into()))?;
    #[allow(clippy::cast_precision_loss)]
    let n_count_f = n_counting as f64;
    let n_count_i = i64::try_from(n_counting).unwrap_or(i64::MAX);

    let factor = upper_mult_error(params, state.count_conf(), n_max_vars);
    let mut trivial = factor.is_none();
    let mut sample_bound_trivial = false;
    let mut upper = None;
    if let Some(factor) = factor {
        let mut mantissa = best.count.mantissa() * factor;
        if !best.exact {
            mantissa *= best.mult_error;
        }
        upper = Some((mantissa, best.count.exponent()));
        if best.mult_error.log2() + state.worst_mult_error().log2() + factor.log2() >= n_count_f {
            sample_bound_trivial = true;
        }
    }

    let estimate = if !best.count.is_zero() && best.count.exponent() >= n_count_i {
        trivial = true;
        Count::pow2(n_count_i)
    } else {
        best.count
    };

    let quality = match factor {
        Some(factor) if !trivial && !sample_bound_trivial => Quality {
            ratio: 1. / (best.mult_error * state.worst_mult_error() * factor),
            confidence: params.opts.upper_conf,
        },
        _ => Quality {
            ratio: estimate.density(n_counting) / best.mult_error,
            confidence: state.count_conf(),
        },
    };

    #[allow(clippy::cast_precision_loss)]
    let exceeds_all = |mantissa: f64, exponent: i64| {
        mantissa > 0. && mantissa.log2() + exponent as f64 >= n_count_f
    };
    let bound = match upper {
        Some((mantissa, exponent)) if !trivial && !exceeds_all(mantissa, exponent) => Bound {
            count: Count::new(mantissa, exponent),
            confidence: params.opts.upper_conf,
            trivial: false,
        },
        _ => Bound::trivial(Count::pow2(n_count_i)),
    };

    Ok(UpperBound {
        bound,
        estimate,
        quality,
        factor,
    })
}

/// Derives the lower bound from the (possibly refined) best estimate that
/// holds with `confidence` unless it is exact
#[must_use]
pub fn lower_bound(best: &CountEstimate, confidence: f64) -> Bound {
    let (mantissa, confidence) = if best.exact {
        (best.count.mantissa(), 1.)
    } else {
        (best.count.mantissa() / best.mult_error, confidence)
    };
    let count = Count::new(mantissa, best.count.exponent());
    if count.is_zero() {
        return Bound::trivial(Count::ZERO);
    }
    Bound {
        count,
        confidence,
        trivial: false,
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with probability >= {}",
            self.count,
            Sig6(self.confidence)
        )?;
        if self.trivial {
            write!(f, " (trivial bound)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{lower_bound, upper_bound, upper_mult_error, BoundState};
    use crate::{
        count::{Count, CountEstimate, Strategy},
        lit,
        params::Options,
        Error,
    };

    fn approx(mant: f64, exp: i64, err: f64, conf: f64) -> CountEstimate {
        CountEstimate::approximate(Count::new(mant, exp), err, conf, Strategy::Hashing)
    }

    #[test]
    fn state_accumulates() {
        let mut state = BoundState::new();
        assert!(state.record(approx(1.5, 3, 2., 0.9), &[lit![0]]));
        assert!(!state.record(
            CountEstimate::exact(Count::new(1., 2), Strategy::Enumeration),
            &[!lit![0]]
        ));
        assert!(state.record(approx(1.2, 4, 1.5, 0.8), &[lit![1]]));
        assert!((state.count_conf() - 0.72).abs() < 1e-12);
        assert_eq!(state.worst_mult_error(), 2.);
        assert_eq!(state.best().unwrap().1, vec![lit![1]]);
        assert!(state.check(0.7).is_ok());
        assert!(matches!(state.check(0.75), Err(Error::Invariant(_))));
    }

    #[test]
    fn zero_is_replaced() {
        let mut state = BoundState::new();
        state.record(
            CountEstimate::exact(Count::ZERO, Strategy::BruteForce),
            &[lit![0]],
        );
        assert!(state.record(
            CountEstimate::exact(Count::new(1., 0), Strategy::BruteForce),
            &[!lit![0]]
        ));
    }

    #[test]
    fn coin_flip_factor() {
        // 20 samples hit one of 4 witnesses almost surely, one of 1024 hardly
        let params = Options::default().validate(0).unwrap();
        assert_eq!(upper_mult_error(&params, 1., 2), Some(1.));
        assert_eq!(upper_mult_error(&params, 1., 10), None);
        // too few samples to overcome the sampling tolerance
        let params = Options {
            samples: 4,
            ..Options::default()
        }
        .validate(0)
        .unwrap();
        assert_eq!(upper_mult_error(&params, 1., 2), None);
    }

    #[test]
    fn self_composition_factor() {
        let params = Options::default().validate(2).unwrap();
        let factor = upper_mult_error(&params, 0.99, 4).unwrap();
        assert!(factor > 1.);
        // more copies give a tighter factor
        let params = Options::default().validate(8).unwrap();
        assert!(upper_mult_error(&params, 0.99, 4).unwrap() < factor);
        // nothing can be established with a single sample
        let params = Options {
            samples: 1,
            ..Options::default()
        }
        .validate(2)
        .unwrap();
        assert_eq!(upper_mult_error(&params, 0.99, 4), None);
    }

    #[test]
    fn exact_tautology_bounds() {
        let params = Options {
            samples: 4,
            ..Options::default()
        }
        .validate(0)
        .unwrap();
        let mut state = BoundState::new();
        let est = CountEstimate::exact(Count::pow2(3), Strategy::BruteForce);
        state.record(est, &[lit![0], lit![1]]);
        let upper = upper_bound(&state, &params, 2, 3).unwrap();
        assert!(upper.bound.trivial);
        assert_eq!(upper.bound.count, Count::pow2(3));
        assert_eq!(upper.estimate, Count::pow2(3));
        let lower = lower_bound(&est, state.count_conf());
        assert_eq!(lower.count, Count::pow2(3));
        assert_eq!(lower.confidence, 1.);
        assert!(!lower.trivial);
    }

    #[test]
    fn upper_at_least_lower() {
        let params = Options::default().validate(0).unwrap();
        let mut state = BoundState::new();
        let est = approx(1.5, 5, 2., 0.99);
        state.record(est, &[lit![0]]);
        let upper = upper_bound(&state, &params, 1, 20).unwrap();
        assert!(!upper.bound.trivial);
        // 1.5 * 2 = 3 = 1.5 x 2^6
        assert_eq!(upper.bound.count, Count::new(1.5, 6));
        let lower = lower_bound(&est, state.count_conf());
        assert!(upper.bound.count > lower.count);
        assert_eq!(lower.count, Count::new(1.5, 4));
        assert!((upper.quality.ratio - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_lower_is_trivial() {
        let est = CountEstimate::exact(Count::ZERO, Strategy::Enumeration);
        let lower = lower_bound(&est, 0.9);
        assert!(lower.trivial);
        assert_eq!(format!("{lower}"), "0 x 2^0 with probability >= 1 (trivial bound)");
    }
}
