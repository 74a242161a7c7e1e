//! # Count Estimation
//!
//! Estimates the number of assignments to the counting variables that are
//! consistent with the formula under a fixed witness. The strategies are
//! tried in order of cost:
//!
//! 1. brute force over all assignments, if there are fewer of them than
//!    Monte Carlo samples,
//! 2. Monte Carlo density estimation,
//! 3. model enumeration with blocking clauses, if the count is plausibly
//!    small,
//! 4. approximate hashing-based counting with an external tool.
//!
//! A fresh oracle is used for every strategy that calls one, so blocking
//! clauses never leak between witnesses.

use std::marker::PhantomData;

use log::{debug, info};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
    approx::{ApproxCount, CountOutcome, CountRequest},
    count::{Count, CountEstimate, Strategy},
    instances::Formula,
    params::Params,
    solvers::{SolveIncremental, SolveStats, SolverResult},
    types::{Clause, Lit, Var},
    utils, Error,
};

/// Width at which the tolerance bisection stops
const EPSILON_RESOLUTION: f64 = 1e-6;

/// Chernoff-style bound on the probability that the density estimated from
/// `n_samples` Monte Carlo samples deviates from `density` by more than a
/// factor of `1 + epsilon` in either direction
#[must_use]
pub fn mc_failure_bound(density: f64, epsilon: f64, n_samples: usize) -> f64 {
    if density == 0. {
        return 1.;
    }
    let mult_error = 1. + epsilon;
    let dme = density * mult_error;
    let upper = if dme < 1. {
        ((1. - density) / (1. - dme)).powf(1. - dme) / mult_error.powf(dme)
    } else if dme == 1. {
        density
    } else {
        0.
    };
    let dde = density / mult_error;
    let lower = if dde > 0. {
        (density / dde).powf(dde) * ((1. - density) / (1. - dde)).powf(1. - dde)
    } else {
        1. - density
    };
    #[allow(clippy::cast_precision_loss)]
    let n = n_samples as f64;
    upper.powf(n) + lower.powf(n)
}

/// The smallest tolerance in `[0, ceiling]` that a Monte Carlo estimate from
/// `n_samples` samples at `density` achieves with probability `confidence`,
/// or infinity if `ceiling` is not achievable
#[must_use]
pub fn mc_epsilon(density: f64, n_samples: usize, confidence: f64, ceiling: f64) -> f64 {
    if density == 0. || mc_failure_bound(density, ceiling, n_samples) >= 1. - confidence {
        return f64::INFINITY;
    }
    utils::bisect(ceiling, EPSILON_RESOLUTION, |eps| {
        mc_failure_bound(density, eps, n_samples) < 1. - confidence
    })
}

/// Budgets and accuracy targets of one count
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CountSettings {
    /// Requested tolerance
    pub epsilon: f64,
    /// Requested confidence
    pub confidence: f64,
    /// Monte Carlo samples
    pub mc_samples: usize,
    /// Maximum number of models to enumerate
    pub enum_threshold: usize,
    /// Prior density estimate of the witness
    pub density: Option<f64>,
}

impl CountSettings {
    /// Settings for counting a sampled witness
    #[must_use]
    pub fn counting(params: &Params) -> Self {
        CountSettings {
            epsilon: params.opts.count_epsilon,
            confidence: params.per_sample_conf,
            mc_samples: params.opts.mc_samples,
            enum_threshold: params.opts.enum_threshold,
            density: None,
        }
    }

    /// Settings for refining the count of a witness with known density
    #[must_use]
    pub fn refinement(params: &Params, density: f64) -> Self {
        CountSettings {
            epsilon: params.opts.refine_epsilon,
            confidence: params.refine_conf,
            mc_samples: params.opts.refine_mc_samples,
            enum_threshold: params.opts.refine_enum_threshold,
            density: Some(density),
        }
    }
}

/// Estimates witness counts with oracles of type `S` and the approximate
/// counter `A`
pub struct Estimator<'a, S, A> {
    formula: &'a Formula,
    counting_vars: Vec<Var>,
    params: &'a Params,
    approx: &'a mut A,
    rng: &'a mut ChaCha8Rng,
    solver: PhantomData<S>,
}

impl<'a, S, A> Estimator<'a, S, A>
where
    S: SolveIncremental + SolveStats + Default,
    A: ApproxCount,
{
    /// Creates a new estimator
    pub fn new(
        formula: &'a Formula,
        params: &'a Params,
        approx: &'a mut A,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Estimator {
            formula,
            counting_vars: formula.counting_vars().iter().copied().collect(),
            params,
            approx,
            rng,
            solver: PhantomData,
        }
    }

    fn n_counting(&self) -> usize {
        self.counting_vars.len()
    }

    /// Tolerance achieved by a Monte Carlo estimate at `density`
    fn mc_epsilon(&self, density: f64, n_samples: usize) -> f64 {
        mc_epsilon(
            density,
            n_samples,
            self.params.mc_count_conf,
            self.params.opts.count_epsilon,
        )
    }

    /// Estimates the count of `witness`. `label` names the witness in log
    /// messages.
    ///
    /// # Errors
    ///
    /// If an oracle call fails or the approximate counter fails
    pub fn count(
        &mut self,
        witness: &[Lit],
        settings: &CountSettings,
        label: &str,
    ) -> Result<CountEstimate, Error> {
        let mut too_small = if settings.mc_samples == 0 {
            true
        } else if let Some(density) = settings.density {
            self.mc_epsilon(density, settings.mc_samples) > settings.epsilon
        } else {
            false
        };

        let mut monte_carlo = None;
        if !too_small {
            #[allow(clippy::cast_precision_loss)]
            let brute_force_cheaper =
                (settings.mc_samples as f64).log2() >= self.n_counting() as f64;
            if brute_force_cheaper {
                let est = self.brute_force(witness)?;
                info!("counting {label} by brute force: {}", est.count);
                return Ok(est);
            }
            let est = self.monte_carlo(witness, settings.mc_samples)?;
            info!("counting {label} with Monte Carlo: {}", est.count);
            if est.exact {
                return Ok(est);
            }
            let density =
                est.count.density(self.n_counting()) - self.params.granularity(settings.mc_samples);
            if density > 0. {
                let achieved = self.mc_epsilon(density, settings.mc_samples);
                too_small = achieved > settings.epsilon;
                monte_carlo = Some(CountEstimate::approximate(
                    est.count,
                    1. + achieved,
                    settings.confidence,
                    Strategy::MonteCarlo,
                ));
            } else {
                too_small = true;
                monte_carlo = Some(est);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let plausibly_small = monte_carlo.is_some_and(|est| {
            est.count.exponent() as f64 <= (settings.enum_threshold as f64).log2()
        });
        if settings.enum_threshold > 0 && (too_small || plausibly_small) {
            if let Some(est) = self.enumerate(witness, settings.enum_threshold)? {
                info!("counting {label} with enumeration: {}", est.count);
                return Ok(est);
            }
            info!("counting {label} with enumeration: threshold exceeded");
        }

        if let (false, Some(est)) = (too_small, monte_carlo) {
            return Ok(est);
        }

        let est = self.hashing(witness, settings.epsilon, settings.confidence)?;
        info!("counting {label} with hashing: {}", est.count);
        Ok(est)
    }

    /// Creates an oracle holding the formula and the witness
    fn oracle(&self, witness: &[Lit]) -> Result<S, Error> {
        let mut solver = S::default();
        if let Some(max_var) = self.formula.max_var() {
            solver.reserve(max_var)?;
        }
        self.formula
            .cnf()
            .iter()
            .try_for_each(|cl| solver.add_clause(cl.clone()))?;
        witness.iter().try_for_each(|&l| solver.add_unit(l))?;
        Ok(solver)
    }

    fn check(solver: &mut S, assumps: &[Lit]) -> Result<bool, Error> {
        match solver.solve_assumps(assumps)? {
            SolverResult::Sat => Ok(true),
            SolverResult::Unsat => Ok(false),
            SolverResult::Interrupted => Err(Error::Oracle(anyhow::anyhow!(
                "oracle call was interrupted"
            ))),
        }
    }

    fn log_stats(solver: &S) {
        let stats = solver.stats();
        debug!(
            "oracle: {} SAT, {} UNSAT queries in {:?}",
            stats.n_sat, stats.n_unsat, stats.cpu_solve_time
        );
    }

    /// Checks every assignment to the counting variables
    fn brute_force(&mut self, witness: &[Lit]) -> Result<CountEstimate, Error> {
        let mut solver = self.oracle(witness)?;
        if !Self::check(&mut solver, &[])? {
            return Ok(CountEstimate::exact(Count::ZERO, Strategy::BruteForce));
        }
        let mut n_models = 0;
        let mut assumps = Vec::with_capacity(self.n_counting());
        for bits in 0..(1u64 << self.n_counting()) {
            assumps.clear();
            assumps.extend(
                self.counting_vars
                    .iter()
                    .enumerate()
                    .map(|(idx, var)| var.lit((bits >> idx) & 1 == 1)),
            );
            if Self::check(&mut solver, &assumps)? {
                n_models += 1;
            }
        }
        Self::log_stats(&solver);
        Ok(CountEstimate::exact(
            Count::from_models(n_models),
            Strategy::BruteForce,
        ))
    }

    /// Estimates the density from uniformly random assignments. The returned
    /// estimate carries no error bound yet, unless it is exact.
    fn monte_carlo(&mut self, witness: &[Lit], n_samples: usize) -> Result<CountEstimate, Error> {
        let mut solver = self.oracle(witness)?;
        if !Self::check(&mut solver, &[])? {
            return Ok(CountEstimate::exact(Count::ZERO, Strategy::MonteCarlo));
        }
        let mut positive = 0usize;
        let mut assumps = Vec::with_capacity(self.n_counting());
        for _ in 0..n_samples {
            assumps.clear();
            for var in &self.counting_vars {
                assumps.push(var.lit(self.rng.random::<f64>() < 0.5));
            }
            if Self::check(&mut solver, &assumps)? {
                positive += 1;
            }
        }
        Self::log_stats(&solver);
        #[allow(clippy::cast_precision_loss)]
        let fraction = positive as f64 / n_samples as f64;
        let n_counting = i64::try_from(self.n_counting()).unwrap_or(i64::MAX);
        Ok(CountEstimate::approximate(
            Count::new(fraction, n_counting),
            f64::INFINITY,
            0.,
            Strategy::MonteCarlo,
        ))
    }

    /// Enumerates models until none are left or more than `threshold` were
    /// found. Returns `None` in the latter case.
    fn enumerate(
        &mut self,
        witness: &[Lit],
        threshold: usize,
    ) -> Result<Option<CountEstimate>, Error> {
        let mut solver = self.oracle(witness)?;
        let mut n_models = 0;
        while Self::check(&mut solver, &[])? {
            n_models += 1;
            if n_models > threshold {
                Self::log_stats(&solver);
                return Ok(None);
            }
            let block = self
                .counting_vars
                .iter()
                .map(|&var| -> Result<Lit, Error> {
                    Ok(var.lit(!solver.var_val(var)?.to_bool_with_def(false)))
                })
                .collect::<Result<Clause, Error>>()?;
            solver.add_clause(block)?;
        }
        Self::log_stats(&solver);
        Ok(Some(CountEstimate::exact(
            Count::from_models(n_models as u64),
            Strategy::Enumeration,
        )))
    }

    /// Approximately counts with the external tool. Without counting
    /// variables the count is exact and decided by the oracle.
    fn hashing(
        &mut self,
        witness: &[Lit],
        epsilon: f64,
        confidence: f64,
    ) -> Result<CountEstimate, Error> {
        if self.counting_vars.is_empty() {
            // a count over no variables is 1 or 0, the oracle decides it
            let mut solver = self.oracle(witness)?;
            let count = if Self::check(&mut solver, &[])? {
                Count::pow2(0)
            } else {
                Count::ZERO
            };
            return Ok(CountEstimate::exact(count, Strategy::Hashing));
        }
        let mut cnf = self.formula.cnf().clone();
        witness.iter().for_each(|&l| cnf.add_unit(l));
        let formula = Formula::new(
            cnf,
            self.formula.max_vars().iter().copied(),
            self.counting_vars.iter().copied(),
        );
        let request = CountRequest {
            formula: &formula,
            projection: &self.counting_vars,
            seed: self.params.opts.seed,
            pivot: hashing_pivot(epsilon),
            iterations: hashing_iterations(confidence),
        };
        match self.approx.count(&request)? {
            CountOutcome::Unsat => Ok(CountEstimate::exact(Count::ZERO, Strategy::Hashing)),
            CountOutcome::Count {
                cell_count,
                hash_count: 0,
            } => Ok(CountEstimate::exact(
                Count::from_models(cell_count),
                Strategy::Hashing,
            )),
            CountOutcome::Count {
                cell_count,
                hash_count,
            } => {
                #[allow(clippy::cast_precision_loss)]
                let count = Count::new(cell_count as f64, i64::from(hash_count));
                Ok(CountEstimate::approximate(
                    count,
                    1. + epsilon,
                    confidence,
                    Strategy::Hashing,
                ))
            }
        }
    }
}

/// Cell size threshold realizing tolerance `epsilon`
#[must_use]
pub fn hashing_pivot(epsilon: f64) -> u32 {
    let inv = 1. + 1. / epsilon;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pivot = (9.84 * (1. + epsilon / (1. + epsilon)) * inv * inv).ceil() as u32;
    pivot
}

/// Number of counting iterations realizing `confidence`
#[must_use]
pub fn hashing_iterations(confidence: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let iters = (17. * (3. / (1. - confidence)).log2()).ceil() as u32;
    iters
}

#[cfg(test)]
mod tests {
    use super::{hashing_iterations, hashing_pivot, mc_epsilon, mc_failure_bound};

    #[test]
    fn failure_bound_zero_density() {
        assert_eq!(mc_failure_bound(0., 1., 100), 1.);
    }

    #[test]
    fn failure_bound_decreases_with_samples() {
        let few = mc_failure_bound(0.5, 0.5, 10);
        let many = mc_failure_bound(0.5, 0.5, 1000);
        assert!(many < few);
        assert!(many < 1e-10);
    }

    #[test]
    fn failure_bound_full_density() {
        assert_eq!(mc_failure_bound(1., 1., 1), 0.);
    }

    #[test]
    fn epsilon_infinite_cases() {
        assert_eq!(mc_epsilon(0., 2000, 0.9, 1.), f64::INFINITY);
        // far too few samples for a tiny density
        assert_eq!(mc_epsilon(1e-6, 10, 0.99, 1.), f64::INFINITY);
    }

    #[test]
    fn epsilon_meets_confidence() {
        let eps = mc_epsilon(0.5, 2000, 0.99, 1.);
        assert!(eps > 0. && eps < 1.);
        assert!(mc_failure_bound(0.5, eps + 1e-5, 2000) < 0.01);
        assert!(mc_failure_bound(0.5, eps - 1e-5, 2000) >= 0.01);
        // more samples give a tighter tolerance
        assert!(mc_epsilon(0.5, 20000, 0.99, 1.) < eps);
    }

    #[test]
    fn hashing_parameters() {
        // 9.84 * 1.5 * 4 = 59.04
        assert_eq!(hashing_pivot(1.), 60);
        // 17 * log2(300) = 139.89
        assert_eq!(hashing_iterations(0.99), 140);
    }
}
