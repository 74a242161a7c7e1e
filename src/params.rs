//! # Configuration
//!
//! User-tunable [`Options`] and the validated [`Params`] derived from them.
//! All probabilistic parameters are validated once here and not checked
//! again later.

use crate::Error;

/// Pivot passed to the sampler, determines together with
/// [`SAMPLING_T_APPROX_MC`] the sampling tolerance
pub const SAMPLING_PIVOT: u32 = 73;
/// Number of approximate counting iterations the sampler runs
pub const SAMPLING_T_APPROX_MC: u32 = 1;

/// User-tunable options, the defaults are the recommended values
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Seed of the random number generator and the external tool
    pub seed: u64,
    /// Number of witnesses to sample
    pub samples: usize,
    /// Sampling tolerance parameter of the external sampler, in `(0,1)`
    pub kappa: f64,
    /// Whether to draw multiple samples per sampler call
    pub multisample: bool,
    /// Counting tolerance
    pub count_epsilon: f64,
    /// Minimum confidence of the upper bound
    pub upper_conf: f64,
    /// Minimum confidence of the lower bound
    pub lower_conf: f64,
    /// Number of Monte Carlo samples for counting
    pub mc_samples: usize,
    /// Maximum number of models to enumerate
    pub enum_threshold: usize,
    /// Whether to refine the count of the best witness
    pub refine: bool,
    /// Counting tolerance for refinement
    pub refine_epsilon: f64,
    /// Number of Monte Carlo samples for refinement
    pub refine_mc_samples: usize,
    /// Maximum number of models to enumerate in refinement
    pub refine_enum_threshold: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            seed: 0,
            samples: 20,
            kappa: 0.5782,
            multisample: false,
            count_epsilon: 1.,
            upper_conf: 0.6,
            lower_conf: 0.8,
            mc_samples: 2000,
            enum_threshold: 256,
            refine: false,
            refine_epsilon: 0.4142,
            refine_mc_samples: 20000,
            refine_enum_threshold: 1024,
        }
    }
}

impl Options {
    /// Validates the options for a `k`-fold self-composition and derives all
    /// dependent parameters
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if a parameter is out of range
    pub fn validate(self, k: usize) -> Result<Params, Error> {
        if self.samples < 1 {
            return Err(Error::Validation(
                "number of samples must be positive".into(),
            ));
        }
        check_probability("kappa", self.kappa)?;
        check_probability("upper bound confidence", self.upper_conf)?;
        check_probability("lower bound confidence", self.lower_conf)?;
        if self.count_epsilon <= 0. || self.count_epsilon.is_nan() {
            return Err(Error::Validation(
                "counting tolerance must be positive".into(),
            ));
        }
        if self.refine && (self.refine_epsilon <= 0. || self.refine_epsilon.is_nan()) {
            return Err(Error::Validation(
                "refinement tolerance must be positive".into(),
            ));
        }

        // The upper bound relies on the counts, so their confidence has to be
        // strictly larger. Otherwise a heuristic target is used.
        let count_conf = if self.upper_conf >= self.lower_conf {
            1. - (1. - self.upper_conf) / 2.
        } else {
            self.lower_conf
        };

        let kappa = self.kappa;
        let sample_epsilon = (1. + kappa) * (8.227 + 0.453 / ((1. - kappa) * (1. - kappa))) - 1.;
        let sampler_samples = if self.multisample {
            let pivot = (4.03 * (1. + 1. / kappa) * (1. + 1. / kappa)).ceil();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lo_thresh = (pivot / (1.41 * (1. + kappa))) as usize;
            self.samples * lo_thresh
        } else {
            self.samples
        };

        #[allow(clippy::cast_precision_loss)]
        let n_witnesses = sampler_samples as f64;
        let refine_failure = (1. - count_conf) / (n_witnesses + 1.);
        let refine_conf = 1. - refine_failure;
        let per_sample_failure = if self.refine {
            ((1. - count_conf) - refine_failure) / n_witnesses
        } else {
            (1. - count_conf) / n_witnesses
        };
        if per_sample_failure <= 0. {
            return Err(Error::Validation(
                "refinement confidence must be greater than count confidence".into(),
            ));
        }
        let per_sample_conf = 1. - per_sample_failure;
        let mc_density_conf = 1. - per_sample_failure / 2.;
        if mc_density_conf <= per_sample_conf {
            return Err(Error::Validation(
                "Monte Carlo density confidence must be strictly greater than per-sample counting confidence".into(),
            ));
        }
        let mc_count_conf = per_sample_conf / mc_density_conf;

        Ok(Params {
            k,
            count_conf,
            sample_epsilon,
            sampler_samples,
            refine_conf,
            per_sample_conf,
            mc_density_conf,
            mc_count_conf,
            opts: self,
        })
    }
}

fn check_probability(name: &str, val: f64) -> Result<(), Error> {
    if val > 0. && val < 1. {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "{name} must be strictly between 0 and 1"
    )))
}

/// Validated options together with the derived parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    /// The validated options
    pub opts: Options,
    /// Number of copies in the self-composition, 0 for coin-flip sampling
    pub k: usize,
    /// Target confidence that all counts are within their error
    pub count_conf: f64,
    /// Tolerance of the approximately uniform sampler
    pub sample_epsilon: f64,
    /// Number of samples requested from the sampler
    pub sampler_samples: usize,
    /// Confidence of the refinement count
    pub refine_conf: f64,
    /// Confidence of each witness count
    pub per_sample_conf: f64,
    /// Confidence that a Monte Carlo density is within its granularity
    pub mc_density_conf: f64,
    /// Confidence of the Monte Carlo tolerance given the density
    pub mc_count_conf: f64,
}

impl Params {
    /// Resolution of a Monte Carlo density estimate from `mc_samples` samples
    #[must_use]
    pub fn granularity(&self, mc_samples: usize) -> f64 {
        if mc_samples == 0 {
            return 0.;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = mc_samples as f64;
        (-(1. - self.mc_density_conf).ln() / (2. * n)).sqrt()
    }
}
