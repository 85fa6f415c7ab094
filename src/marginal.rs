//! The base `Marginal`: validated element parameters plus the scalar observables derivable from
//! them without enumerating a single configuration.

use crate::config::unnormalized_log_prob;
use crate::error::{Error, Result};
use crate::mode;
use crate::numerics::{ln_abundance, ln_factorial, ln_gamma, MAX_ATOM_COUNT};
use std::f64::consts::PI;

/// Validated parameters of a single element's isotope distribution, together with the
/// precomputed quantities (log-probabilities, mode, `ln(n!)`) every specialized enumerator needs.
///
/// A `Marginal` is constructed once from raw `(masses, probs, n)` and then typically consumed —
/// moved by value — into a [`crate::trek::Trek`], [`crate::precalc::Precalculated`], or
/// [`crate::layered::Layered`] enumerator. Because Rust moves transfer ownership outright, there
/// is no risk of two owners freeing the same backing arrays; the specialization's fields simply
/// absorb these ones.
#[derive(Clone, Debug)]
pub struct Marginal {
    pub(crate) masses: Vec<f64>,
    pub(crate) probs: Vec<f64>,
    pub(crate) atom_log_probs: Vec<f64>,
    pub(crate) n: u32,
    pub(crate) loggamma_nominator: f64,
    pub(crate) mode_configuration: Vec<u32>,
}

impl Marginal {
    /// Validates `(masses, probs, n)` and builds a `Marginal`, computing log-probabilities and
    /// locating the mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIsotopeProbability`] if any `probs[i]` is outside `(0, 1]`, or
    /// [`Error::AtomCountTooLarge`] if `n >= MAX_ATOM_COUNT`.
    ///
    /// # Panics
    ///
    /// Panics if `masses.len() != probs.len()` or either is empty; these are programmer errors,
    /// not recoverable input conditions (`k >= 1` is an invariant of every call site in this
    /// crate, not something a caller can legitimately fail to honor).
    pub fn new(masses: &[f64], probs: &[f64], n: u32) -> Result<Self> {
        assert_eq!(masses.len(), probs.len(), "masses and probs must have equal length");
        assert!(!masses.is_empty(), "an element must have at least one isotope");

        for (index, &p) in probs.iter().enumerate() {
            if !(p > 0.0 && p <= 1.0) {
                return Err(Error::InvalidIsotopeProbability { index, value: p });
            }
        }
        if u64::from(n) >= MAX_ATOM_COUNT {
            return Err(Error::AtomCountTooLarge {
                n: u64::from(n),
                max: MAX_ATOM_COUNT,
            });
        }

        let atom_log_probs: Vec<f64> = probs.iter().map(|&p| ln_abundance(p)).collect();
        let loggamma_nominator = ln_factorial(n);
        let mode_configuration = mode::find(n, probs, &atom_log_probs);

        Ok(Self {
            masses: masses.to_vec(),
            probs: probs.to_vec(),
            atom_log_probs,
            n,
            loggamma_nominator,
            mode_configuration,
        })
    }

    /// Number of isotopes (`k`).
    #[must_use]
    pub fn isotope_count(&self) -> usize {
        self.masses.len()
    }

    /// Number of atoms (`n`).
    #[must_use]
    pub const fn atom_count(&self) -> u32 {
        self.n
    }

    /// The isotope masses, in dalton.
    #[must_use]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// The isotope natural abundances.
    #[must_use]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// `ln(p_i)` for each isotope, upward-rounded (or a precomputed bit-exact constant).
    #[must_use]
    pub fn atom_log_probs(&self) -> &[f64] {
        &self.atom_log_probs
    }

    /// `ln(n!)`, upward-rounded.
    #[must_use]
    pub const fn loggamma_nominator(&self) -> f64 {
        self.loggamma_nominator
    }

    /// The configuration achieving the maximum multinomial log-density.
    #[must_use]
    pub fn mode_configuration(&self) -> &[u32] {
        &self.mode_configuration
    }

    /// `logP(mode)`, the largest log-probability any configuration of this marginal can attain.
    #[must_use]
    pub fn mode_log_prob(&self) -> f64 {
        self.loggamma_nominator
            + unnormalized_log_prob(&self.atom_log_probs, &self.mode_configuration)
    }

    /// Mass of the lightest possible isotopologue: every atom takes the lightest isotope.
    #[must_use]
    pub fn lightest_mass(&self) -> f64 {
        let min_mass = self.masses.iter().copied().fold(f64::INFINITY, f64::min);
        f64::from(self.n) * min_mass
    }

    /// Mass of the heaviest possible isotopologue: every atom takes the heaviest isotope.
    #[must_use]
    pub fn heaviest_mass(&self) -> f64 {
        let max_mass = self.masses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        f64::from(self.n) * max_mass
    }

    /// Mass if every atom takes the single most abundant isotope.
    #[must_use]
    pub fn monoisotopic_mass(&self) -> f64 {
        let (_, &mass) = self
            .probs
            .iter()
            .zip(self.masses.iter())
            .enumerate()
            .max_by(|(_, (p1, _)), (_, (p2, _))| p1.partial_cmp(p2).expect("probs are finite"))
            .map(|(i, (_, m))| (i, m))
            .expect("k >= 1");
        f64::from(self.n) * mass
    }

    /// Average mass of a single atom of this element, weighted by natural abundance.
    #[must_use]
    pub fn atom_avg_mass(&self) -> f64 {
        self.probs
            .iter()
            .zip(self.masses.iter())
            .map(|(&p, &m)| p * m)
            .sum()
    }

    /// `n * atom_avg_mass()`, the expected mass of a randomly chosen isotopologue.
    #[must_use]
    pub fn theoretical_avg_mass(&self) -> f64 {
        f64::from(self.n) * self.atom_avg_mass()
    }

    /// Variance of a single isotopologue's mass, scaled by `n` (variances of i.i.d. atoms add).
    #[must_use]
    pub fn variance(&self) -> f64 {
        let avg = self.atom_avg_mass();
        let per_atom: f64 = self
            .probs
            .iter()
            .zip(self.masses.iter())
            .map(|(&p, &m)| p * (m - avg).powi(2))
            .sum();
        f64::from(self.n) * per_atom
    }

    /// `n * min_i ln(p_i)`, a lower bound on any configuration's log-probability.
    #[must_use]
    pub fn smallest_lprob(&self) -> f64 {
        let min_lp = self
            .atom_log_probs
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        f64::from(self.n) * min_lp
    }

    /// Estimates `ln |{c : logP(c) >= logP(mode) - r}|` via a closed-form simplex/ellipsoid
    /// volume ratio, without enumerating any configuration.
    ///
    /// Returns `-inf` when `k <= 1`, since a single-isotope marginal has exactly one
    /// configuration regardless of `r`.
    #[must_use]
    pub fn log_size_estimate(&self, r: f64) -> f64 {
        let k = self.isotope_count();
        if k <= 1 {
            return f64::NEG_INFINITY;
        }

        let k_f64 = k as f64;
        let n_f64 = f64::from(self.n);
        let ln_n = n_f64.ln();

        let log_v_simplex = (k_f64 - 1.0) * ln_n - ln_gamma(k_f64);
        let log_n_simplex = ln_gamma(n_f64 + k_f64) - ln_gamma(n_f64 + 1.0) - ln_gamma(k_f64);
        let sum_ln_p: f64 = self.atom_log_probs.iter().sum();
        let log_v_ellipsoid = 0.5_f64.mul_add(
            (k_f64 - 1.0).mul_add(ln_n + PI.ln() + r, sum_ln_p),
            -ln_gamma((k_f64 + 1.0) / 2.0),
        );

        log_n_simplex + log_v_ellipsoid - log_v_simplex
    }
}
