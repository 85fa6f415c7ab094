//! Eager enumeration of every configuration whose log-probability meets a fixed cutoff.

use crate::arena::{Arena, ConfigId, DEFAULT_BLOCK_CAPACITY};
use crate::config::{log_prob, mass, write_transfer};
use crate::marginal::Marginal;
use crate::visited::{derive_seed, VisitedSet};
use itertools::Itertools;

/// All configurations with `logP(c) >= lcutoff`, enumerated by breadth-first search outward from
/// the mode (the feasible set is connected, since the multinomial log-density is unimodal on the
/// simplex).
pub struct Precalculated {
    masses: Vec<f64>,
    arena: Arena,
    confs: Vec<ConfigId>,
    /// Length `count() + 1`: a `-inf` sentinel follows the last real entry, so consumers can
    /// compare against `log_prob(count())` without a bounds-check branch.
    log_probs: Vec<f64>,
    emitted_masses: Vec<f64>,
}

impl Precalculated {
    /// Consumes a [`Marginal`] and enumerates every configuration with `logP(c) >= lcutoff`.
    ///
    /// When `sort` is `true`, the result is ordered by descending log-probability, with ties
    /// broken by BFS discovery order (itself deterministic for a fixed input).
    #[must_use]
    pub fn from_marginal(marginal: Marginal, lcutoff: f64, sort: bool) -> Self {
        Self::with_capacity(marginal, lcutoff, sort, DEFAULT_BLOCK_CAPACITY, 0)
    }

    /// Like [`Self::from_marginal`], but with explicit tuning of the backing [`Arena`]'s block
    /// size and the [`VisitedSet`]'s initial bucket capacity.
    #[must_use]
    pub fn with_capacity(
        marginal: Marginal,
        lcutoff: f64,
        sort: bool,
        block_capacity: usize,
        visited_capacity: usize,
    ) -> Self {
        let k = marginal.isotope_count();
        let seed = derive_seed(&marginal.masses, &marginal.probs, marginal.n);
        let mut arena = Arena::with_block_capacity(k, block_capacity);
        let mut visited = VisitedSet::with_capacity(seed, visited_capacity);
        let mut confs: Vec<ConfigId> = Vec::new();
        let mut raw_log_probs: Vec<f64> = Vec::new();
        let mut scratch = vec![0_u32; k];

        let mode_lp = log_prob(
            marginal.loggamma_nominator,
            &marginal.atom_log_probs,
            &marginal.mode_configuration,
        );
        if mode_lp >= lcutoff {
            let mode_id = arena.alloc(&marginal.mode_configuration);
            visited.insert(&marginal.mode_configuration, mode_id);
            confs.push(mode_id);
            raw_log_probs.push(mode_lp);
        }

        let mut head = 0;
        while head < confs.len() {
            let config = arena.get(confs[head]).to_vec();
            head += 1;

            for (recipient, donor) in (0..k).cartesian_product(0..k) {
                if recipient == donor || config[donor] == 0 {
                    continue;
                }
                write_transfer(&config, &mut scratch, recipient, donor);
                if visited.find(&arena, &scratch).is_some() {
                    continue;
                }
                let lp = log_prob(marginal.loggamma_nominator, &marginal.atom_log_probs, &scratch);
                if lp < lcutoff {
                    continue;
                }
                let id = arena.alloc(&scratch);
                visited.insert(&scratch, id);
                confs.push(id);
                raw_log_probs.push(lp);
            }
        }

        if sort {
            let mut order: Vec<usize> = (0..confs.len()).collect();
            order.sort_by(|&a, &b| {
                raw_log_probs[b]
                    .partial_cmp(&raw_log_probs[a])
                    .expect("log-probabilities are never NaN")
                    .then(a.cmp(&b))
            });
            confs = order.iter().map(|&i| confs[i]).collect();
            raw_log_probs = order.iter().map(|&i| raw_log_probs[i]).collect();
        }

        let emitted_masses: Vec<f64> = confs
            .iter()
            .map(|&id| mass(&marginal.masses, arena.get(id)))
            .collect();

        let mut log_probs = raw_log_probs;
        log_probs.push(f64::NEG_INFINITY);

        Self {
            masses: marginal.masses,
            arena,
            confs,
            log_probs,
            emitted_masses,
        }
    }

    /// Number of configurations with `logP(c) >= lcutoff`.
    #[must_use]
    pub fn count(&self) -> usize {
        self.confs.len()
    }

    /// `logP` of the `i`-th configuration, or `-inf` for `i == count()` (the guard sentinel).
    #[must_use]
    pub fn log_prob(&self, i: usize) -> f64 {
        self.log_probs[i]
    }

    /// Probability of the `i`-th configuration.
    #[must_use]
    pub fn prob(&self, i: usize) -> f64 {
        self.log_probs[i].exp()
    }

    /// Mass of the `i`-th configuration.
    #[must_use]
    pub fn mass(&self, i: usize) -> f64 {
        self.emitted_masses[i]
    }

    /// The `i`-th configuration.
    #[must_use]
    pub fn configuration(&self, i: usize) -> &[u32] {
        self.arena.get(self.confs[i])
    }

    /// The isotope masses this precalculated set was built from.
    #[must_use]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }
}
