//! # Witness Sampling
//!
//! Candidate witnesses (assignments to the maximization variables) are drawn
//! either by independent fair coin flips or, for a `k`-fold self-composition,
//! with an approximately uniform sampler.

use log::info;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
    approx::{ApproxCount, SampleOutcome, SampleRequest},
    instances::Formula,
    params::{Params, SAMPLING_PIVOT, SAMPLING_T_APPROX_MC},
    selfcomp::Compose,
    types::{Lit, RsHashSet, Var},
    Error,
};

/// An assignment to the maximization variables, one literal per variable in
/// the order of [`Formula::max_vars`]
pub type Witness = Vec<Lit>;

/// A deduplicated collection of witnesses that iterates in insertion order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WitnessSet {
    witnesses: Vec<Witness>,
    seen: RsHashSet<Witness>,
}

impl WitnessSet {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a witness, returns `false` if it was already contained
    pub fn insert(&mut self, witness: Witness) -> bool {
        if self.seen.contains(&witness) {
            return false;
        }
        self.seen.insert(witness.clone());
        self.witnesses.push(witness);
        true
    }

    /// The number of distinct witnesses
    #[must_use]
    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    /// Checks whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }

    /// Iterates over the witnesses in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Witness> {
        self.witnesses.iter()
    }
}

impl FromIterator<Witness> for WitnessSet {
    fn from_iter<T: IntoIterator<Item = Witness>>(iter: T) -> Self {
        let mut set = WitnessSet::new();
        iter.into_iter().for_each(|w| {
            set.insert(w);
        });
        set
    }
}

impl<'a> IntoIterator for &'a WitnessSet {
    type Item = &'a Witness;
    type IntoIter = std::slice::Iter<'a, Witness>;

    fn into_iter(self) -> Self::IntoIter {
        self.witnesses.iter()
    }
}

/// Draws `n_samples` witnesses by flipping a fair coin for every maximization
/// variable
pub fn coin_flips(formula: &Formula, n_samples: usize, rng: &mut ChaCha8Rng) -> WitnessSet {
    (0..n_samples)
        .map(|_| {
            formula
                .max_vars()
                .iter()
                .map(|var| var.lit(rng.random::<f64>() < 0.5))
                .collect::<Witness>()
        })
        .collect()
}

/// The maximization variables followed by the counting variables of all
/// copies of a self-composition
#[must_use]
pub fn sampling_support(composed: &Formula) -> Vec<Var> {
    let mut seen = RsHashSet::default();
    composed
        .max_vars()
        .iter()
        .chain(composed.counting_vars())
        .copied()
        .filter(|var| seen.insert(*var))
        .collect()
}

/// Draws witnesses from the `k`-fold self-composition of the formula with an
/// approximately uniform sampler. An unsatisfiable composition yields no
/// witnesses.
///
/// # Errors
///
/// [`Error::Sampling`] if the sampler fails, or errors from the composition
pub fn from_self_composition<A, C>(
    formula: &Formula,
    params: &Params,
    approx: &mut A,
    composer: &C,
) -> Result<WitnessSet, Error>
where
    A: ApproxCount,
    C: Compose + ?Sized,
{
    let composed = composer.compose(formula, params.k)?;
    // uniform over witnesses together with all k completions
    let support = sampling_support(&composed);
    info!(
        "sampling from {}-fold self-composition with tolerance (1+{})",
        params.k, params.sample_epsilon
    );
    let request = SampleRequest {
        formula: &composed,
        support: &support,
        projection: formula.max_vars(),
        seed: params.opts.seed,
        kappa: params.opts.kappa,
        multisample: params.opts.multisample,
        pivot: SAMPLING_PIVOT,
        iterations: SAMPLING_T_APPROX_MC,
        n_samples: params.sampler_samples,
    };
    match approx.sample(&request)? {
        SampleOutcome::Unsat => Ok(WitnessSet::new()),
        SampleOutcome::Samples(samples) => {
            if let Some(bad) = samples
                .iter()
                .find(|s| s.len() != formula.max_vars().len())
            {
                return Err(Error::Sampling(format!(
                    "sample of length {} does not match {} maximization variables",
                    bad.len(),
                    formula.max_vars().len()
                )));
            }
            Ok(samples.into_iter().collect())
        }
    }
}

/// Draws the witnesses as configured by `params`
///
/// # Errors
///
/// See [`from_self_composition`]
pub fn sample_witnesses<A, C>(
    formula: &Formula,
    params: &Params,
    rng: &mut ChaCha8Rng,
    approx: &mut A,
    composer: &C,
) -> Result<WitnessSet, Error>
where
    A: ApproxCount,
    C: Compose + ?Sized,
{
    info!(
        "generating {} independent samples from {}-fold self-composition",
        params.opts.samples, params.k
    );
    if params.opts.multisample && params.k > 0 {
        info!("using multisampling: {} total samples", params.sampler_samples);
    }
    let witnesses = if params.k == 0 {
        coin_flips(formula, params.opts.samples, rng)
    } else {
        from_self_composition(formula, params, approx, composer)?
    };
    info!(
        "obtained {} distinct assignments to maximization variables",
        witnesses.len()
    );
    Ok(witnesses)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{coin_flips, sampling_support, WitnessSet};
    use crate::{
        instances::{Cnf, Formula},
        clause, lit,
        selfcomp::{Compose, SelfComposition},
        var,
    };

    #[test]
    fn witness_set_dedup_keeps_order() {
        let set: WitnessSet = [
            vec![lit![0], !lit![1]],
            vec![!lit![0], lit![1]],
            vec![lit![0], !lit![1]],
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        let order: Vec<_> = set.iter().cloned().collect();
        assert_eq!(order, vec![vec![lit![0], !lit![1]], vec![!lit![0], lit![1]]]);
    }

    #[test]
    fn coin_flips_shape() {
        let form = Formula::new(Cnf::new(), [var![3], var![1]], [var![0]]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let set = coin_flips(&form, 50, &mut rng);
        assert!(!set.is_empty() && set.len() <= 4);
        for w in &set {
            assert_eq!(w.len(), 2);
            assert_eq!(w[0].var(), var![3]);
            assert_eq!(w[1].var(), var![1]);
        }
    }

    #[test]
    fn coin_flips_reproducible() {
        let form = Formula::new(Cnf::new(), (0..10).map(|i| var![i]), []);
        let a = coin_flips(&form, 5, &mut ChaCha8Rng::seed_from_u64(7));
        let b = coin_flips(&form, 5, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn no_max_vars_single_witness() {
        let form = Formula::new(Cnf::new(), [], [var![0]]);
        let set = coin_flips(&form, 20, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(set.len(), 1);
        assert!(set.iter().next().unwrap().is_empty());
    }

    #[test]
    fn support_covers_all_copies() {
        let cnf: Cnf = [clause![lit![0], lit![1]], clause![!lit![1], !lit![2]]]
            .into_iter()
            .collect();
        let form = Formula::new(cnf, [var![0]], [var![1], var![2]]);
        let composed = SelfComposition.compose(&form, 3).unwrap();
        assert_eq!(
            sampling_support(&composed),
            vec![
                var![0],
                var![1],
                var![2],
                var![4],
                var![5],
                var![7],
                var![8]
            ]
        );
    }

    #[test]
    fn support_without_duplicates() {
        let form = Formula::new(Cnf::new(), [var![1], var![0]], [var![0], var![2]]);
        assert_eq!(sampling_support(&form), vec![var![1], var![0], var![2]]);
    }
}
