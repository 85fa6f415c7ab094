//! Free functions over raw `[u32]` configuration slices: log-probability, mass, and the unit
//! transfer that defines the neighborhood graph on the simplex.
//!
//! These are kept as free functions rather than methods on a `Configuration` newtype because
//! every caller already has a `&[u32]` borrowed from an [`crate::arena::Arena`] or a scratch
//! buffer, and wrapping it would only add an indirection.

use crate::numerics::mlf;

/// The *unnormalized* multinomial log-probability `sum_i (c_i * ln(p_i) - ln(c_i!))`.
///
/// Combine with the marginal's `loggamma_nominator = ln(n!)` to get the full `logP(c)`.
#[must_use]
pub fn unnormalized_log_prob(atom_log_probs: &[f64], config: &[u32]) -> f64 {
    atom_log_probs
        .iter()
        .zip(config)
        .map(|(&lp, &c)| f64::from(c) * lp + mlf(c))
        .sum()
}

/// The full multinomial log-probability `ln(n!) + sum_i (c_i * ln(p_i) - ln(c_i!))`.
#[must_use]
pub fn log_prob(loggamma_nominator: f64, atom_log_probs: &[f64], config: &[u32]) -> f64 {
    loggamma_nominator + unnormalized_log_prob(atom_log_probs, config)
}

/// `sum_i c_i * masses[i]`.
#[must_use]
pub fn mass(masses: &[f64], config: &[u32]) -> f64 {
    masses
        .iter()
        .zip(config)
        .map(|(&m, &c)| m * f64::from(c))
        .sum()
}

/// Writes the unit transfer `recipient += 1, donor -= 1` of `config` into `scratch`.
///
/// # Panics
///
/// Panics (via subtraction overflow, in debug builds) if `config[donor] == 0`; callers must
/// check this themselves, since it is cheaper to check once than to always subtract and inspect.
pub fn write_transfer(config: &[u32], scratch: &mut [u32], recipient: usize, donor: usize) {
    scratch.copy_from_slice(config);
    scratch[recipient] += 1;
    scratch[donor] -= 1;
}

/// Whether the transfer `recipient += 1, donor -= 1` should be accepted given the resulting
/// (`new_log_prob`) and prior (`old_log_prob`) unnormalized log-probabilities.
///
/// Ties are broken by preferring the move with the larger donor index: `recipient > donor`. This
/// single rule keeps mode-climbing, precalculated BFS expansion, and layered fringe extension
/// all deterministic, and in particular keeps mode-climbing from ping-ponging forever between two
/// equally-probable configurations.
#[must_use]
pub fn accept_transfer(new_log_prob: f64, old_log_prob: f64, recipient: usize, donor: usize) -> bool {
    new_log_prob > old_log_prob || (new_log_prob == old_log_prob && recipient > donor)
}
