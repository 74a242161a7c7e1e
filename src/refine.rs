//! # Refinement
//!
//! Recounts the best witness with a tighter tolerance and larger budgets.
//! The refined estimate replaces the first one only if it is not smaller.

use log::info;

use crate::{
    approx::ApproxCount,
    count::CountEstimate,
    estimate::{CountSettings, Estimator},
    params::Params,
    solvers::{SolveIncremental, SolveStats},
    types::Lit,
    Error,
};

/// Outcome of the refinement stage
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Refined {
    /// The estimate to derive the lower bound from
    pub estimate: CountEstimate,
    /// Confidence of the lower bound derived from `estimate`
    pub confidence: f64,
    /// Whether the refined estimate was accepted
    pub accepted: bool,
}

impl Refined {
    /// Keeps the unrefined estimate
    #[must_use]
    pub fn unchanged(estimate: CountEstimate, count_conf: f64) -> Self {
        Refined {
            estimate,
            confidence: count_conf,
            accepted: false,
        }
    }
}

/// Recounts `witness`, whose current estimate is `best`. The counts so far
/// hold jointly with `count_conf`.
///
/// The confidence of an accepted refinement is combined with the union
/// bound `count_conf + refined - 1`. This is a heuristic since the refined
/// count is not independent of the selection of the witness.
///
/// # Errors
///
/// If counting fails
pub fn refine<S, A>(
    estimator: &mut Estimator<'_, S, A>,
    witness: &[Lit],
    best: &CountEstimate,
    count_conf: f64,
    params: &Params,
    n_counting: usize,
) -> Result<Refined, Error>
where
    S: SolveIncremental + SolveStats + Default,
    A: ApproxCount,
{
    if best.exact {
        return Ok(Refined::unchanged(*best, count_conf));
    }
    let settings = CountSettings::refinement(params, best.count.density(n_counting));
    info!(
        "refining best witness with tolerance (1+{}) and confidence {}",
        settings.epsilon, settings.confidence
    );
    let refined = estimator.count(witness, &settings, "best witness")?;
    if refined.count < best.count {
        info!(
            "discarding refined count {} below {}",
            refined.count, best.count
        );
        return Ok(Refined::unchanged(*best, count_conf));
    }
    let confidence = if refined.exact {
        1.
    } else {
        count_conf + refined.confidence - 1.
    };
    Ok(Refined {
        estimate: refined,
        confidence,
        accepted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::Refined;
    use crate::count::{Count, CountEstimate, Strategy};

    #[test]
    fn unchanged_keeps_confidence() {
        let est = CountEstimate::approximate(Count::new(1.5, 4), 2., 0.9, Strategy::Hashing);
        let refined = Refined::unchanged(est, 0.85);
        assert!(!refined.accepted);
        assert_eq!(refined.estimate, est);
        assert_eq!(refined.confidence, 0.85);
    }
}
