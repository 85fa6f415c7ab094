//! Locating a mode of the multinomial distribution without enumerating the simplex.
//!
//! A mean-seeded hill climb: start near `n * p_i` for every isotope, then repeatedly walk to a
//! strictly better neighbor (a single unit transfer) until no improving move remains. The
//! multinomial log-density is unimodal on the simplex, so this always finds a true mode, not
//! merely a local optimum.

use crate::config::{accept_transfer, unnormalized_log_prob, write_transfer};
use itertools::Itertools;

/// Builds the mean-seeded starting configuration for [`climb`].
///
/// `c_i = floor(n * p_i) + 1`, then the surplus or deficit against `n` is repaired starting from
/// index 0: a deficit is dumped entirely onto `c_0`; a surplus is peeled off index by index
/// (each index gives up as much as it can without going negative) until exhausted.
#[must_use]
pub fn seed(n: u32, probs: &[f64]) -> Vec<u32> {
    let n_f64 = f64::from(n);
    let n_i64 = i64::from(n);
    let mut c: Vec<i64> = probs
        .iter()
        .map(|&p| (n_f64 * p).floor() as i64 + 1)
        .collect();

    let s: i64 = c.iter().sum();
    if s < n_i64 {
        c[0] += n_i64 - s;
    } else if s > n_i64 {
        let mut excess = s - n_i64;
        for value in &mut c {
            if excess == 0 {
                break;
            }
            let take = excess.min(*value);
            *value -= take;
            excess -= take;
        }
    }

    c.into_iter().map(|v| v as u32).collect()
}

/// Hill-climbs `config` to a local (and, by unimodality, global) maximum of the unnormalized
/// multinomial log-density, scanning all ordered donor/recipient pairs in each sweep and
/// repeating sweeps until one produces no accepted transfer.
#[must_use]
pub fn climb(atom_log_probs: &[f64], mut config: Vec<u32>) -> Vec<u32> {
    let k = config.len();
    let mut scratch = vec![0_u32; k];
    let mut current_lp = unnormalized_log_prob(atom_log_probs, &config);

    loop {
        let mut improved = false;
        for (recipient, donor) in (0..k).cartesian_product(0..k) {
            if recipient == donor || config[donor] == 0 {
                continue;
            }
            write_transfer(&config, &mut scratch, recipient, donor);
            let new_lp = unnormalized_log_prob(atom_log_probs, &scratch);
            if accept_transfer(new_lp, current_lp, recipient, donor) {
                config.copy_from_slice(&scratch);
                current_lp = new_lp;
                improved = true;
            }
        }
        if !improved {
            break;
        }
    }

    config
}

/// Convenience wrapper: seed then climb.
#[must_use]
pub fn find(n: u32, probs: &[f64], atom_log_probs: &[f64]) -> Vec<u32> {
    climb(atom_log_probs, seed(n, probs))
}
