//! Incrementally extendable threshold enumeration: the cutoff may be lowered repeatedly, each
//! extension reusing the fringe left over from the previous one instead of starting from scratch.

use crate::arena::{Arena, ConfigId, DEFAULT_BLOCK_CAPACITY};
use crate::config::{log_prob, mass, write_transfer};
use crate::marginal::Marginal;
use crate::visited::{derive_seed, VisitedSet};
use itertools::Itertools;

/// Extendable threshold enumerator.
///
/// Configurations accepted by earlier, higher-threshold calls to [`Self::extend`] are never
/// revisited or re-derived by later ones: the **fringe** — configurations that were neighbors of
/// an accepted configuration but fell below the threshold at the time — carries exactly the
/// boundary information the next, lower-threshold extension needs.
pub struct Layered {
    masses: Vec<f64>,
    atom_log_probs: Vec<f64>,
    loggamma_nominator: f64,
    k: usize,
    arena: Arena,
    seed: u64,
    visited_capacity: usize,
    fringe: Vec<ConfigId>,
    confs: Vec<ConfigId>,
    /// Accepted configurations' log-probabilities, descending, with a trailing `-inf` guardian.
    log_probs: Vec<f64>,
    emitted_masses: Vec<f64>,
    current_threshold: f64,
    sorted_up_to_idx: usize,
}

impl Layered {
    /// Consumes a [`Marginal`], seeding the fringe with just the mode and setting
    /// `current_threshold` to `+inf` (no layer has been accepted yet).
    #[must_use]
    pub fn from_marginal(marginal: Marginal) -> Self {
        Self::with_capacity(marginal, DEFAULT_BLOCK_CAPACITY, 0)
    }

    /// Like [`Self::from_marginal`], but with explicit tuning of the backing [`Arena`]'s block
    /// size and of the bucket capacity each per-extension [`VisitedSet`] is pre-sized with.
    #[must_use]
    pub fn with_capacity(marginal: Marginal, block_capacity: usize, visited_capacity: usize) -> Self {
        let k = marginal.isotope_count();
        let seed = derive_seed(&marginal.masses, &marginal.probs, marginal.n);
        let mut arena = Arena::with_block_capacity(k, block_capacity);
        let mode_id = arena.alloc(&marginal.mode_configuration);

        Self {
            masses: marginal.masses,
            atom_log_probs: marginal.atom_log_probs,
            loggamma_nominator: marginal.loggamma_nominator,
            k,
            arena,
            seed,
            visited_capacity,
            fringe: vec![mode_id],
            confs: Vec::new(),
            log_probs: vec![f64::NEG_INFINITY],
            emitted_masses: Vec::new(),
            current_threshold: f64::INFINITY,
            sorted_up_to_idx: 0,
        }
    }

    /// Lowers the threshold to `new_threshold`, accepting every fringe configuration that now
    /// qualifies (and everything newly discovered beyond it that also qualifies) and leaving a
    /// fresh fringe for the next call. Returns `false` without doing anything if the fringe is
    /// already empty (meaning every configuration of the marginal has already been accepted).
    ///
    /// `new_threshold` need not be only slightly below `current_threshold`: configurations
    /// discovered while draining the fringe that themselves already qualify for `new_threshold`
    /// are expanded further within the same call, so an arbitrarily large drop still finds every
    /// newly-qualifying configuration, not just the immediate neighbors of the old fringe.
    pub fn extend(&mut self, new_threshold: f64) -> bool {
        if self.fringe.is_empty() {
            return false;
        }

        let mut visited = VisitedSet::with_capacity(self.seed, self.visited_capacity);
        for &id in &self.fringe {
            let content = self.arena.get(id).to_vec();
            visited.insert(&content, id);
        }

        // The work queue starts as the old fringe and grows as newly-accepted configurations
        // that still need their own neighbors explored are appended to its tail.
        let mut queue: Vec<ConfigId> = std::mem::take(&mut self.fringe);
        let mut head = 0;
        let mut new_fringe: Vec<ConfigId> = Vec::new();
        let mut newly_accepted: Vec<(ConfigId, f64)> = Vec::new();
        let mut scratch = vec![0_u32; self.k];

        while head < queue.len() {
            let id = queue[head];
            head += 1;

            let config = self.arena.get(id).to_vec();
            let opc = log_prob(self.loggamma_nominator, &self.atom_log_probs, &config);

            if opc < new_threshold {
                new_fringe.push(id);
                continue;
            }
            newly_accepted.push((id, opc));

            for (recipient, donor) in (0..self.k).cartesian_product(0..self.k) {
                if recipient == donor || config[donor] == 0 {
                    continue;
                }
                write_transfer(&config, &mut scratch, recipient, donor);
                if visited.find(&self.arena, &scratch).is_some() {
                    continue;
                }
                let lpc = log_prob(self.loggamma_nominator, &self.atom_log_probs, &scratch);
                if lpc >= self.current_threshold {
                    // already accepted in a strictly earlier layer
                    continue;
                }
                // Climb-direction tiebreak: only explore c' through the parent that is its
                // better (or, on a tie, higher-donor-index) neighbor, so no configuration is
                // ever discovered twice via two different parents on a plateau.
                let accept = opc > lpc || (opc == lpc && recipient > donor);
                if !accept {
                    continue;
                }
                let new_id = self.arena.alloc(&scratch);
                visited.insert(&scratch, new_id);
                if lpc >= new_threshold {
                    queue.push(new_id);
                } else {
                    new_fringe.push(new_id);
                }
            }
        }

        self.fringe = new_fringe;
        self.current_threshold = new_threshold;

        let mut order: Vec<usize> = (0..newly_accepted.len()).collect();
        order.sort_by(|&a, &b| {
            newly_accepted[b]
                .1
                .partial_cmp(&newly_accepted[a].1)
                .expect("log-probabilities are never NaN")
                .then(a.cmp(&b))
        });

        // Drop the trailing sentinel, append this layer's sorted entries, restore the sentinel.
        self.log_probs.pop();
        for i in order {
            let (id, lp) = newly_accepted[i];
            let m = mass(&self.masses, self.arena.get(id));
            self.confs.push(id);
            self.log_probs.push(lp);
            self.emitted_masses.push(m);
        }
        self.log_probs.push(f64::NEG_INFINITY);
        self.sorted_up_to_idx = self.confs.len();

        true
    }

    /// Number of accepted configurations so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.confs.len()
    }

    /// The current acceptance threshold (a log-probability); `+inf` before the first call to
    /// [`Self::extend`].
    #[must_use]
    pub const fn current_threshold(&self) -> f64 {
        self.current_threshold
    }

    /// `logP` of the `i`-th accepted configuration. A guarded read at `i == -1` returns `+inf`;
    /// `i == count() as isize` returns `-inf` (the trailing sentinel), enabling branch-free
    /// boundary comparisons.
    #[must_use]
    pub fn log_prob(&self, i: isize) -> f64 {
        if i < 0 {
            f64::INFINITY
        } else {
            self.log_probs[i as usize]
        }
    }

    /// Probability of the `i`-th accepted configuration.
    #[must_use]
    pub fn prob(&self, i: isize) -> f64 {
        self.log_prob(i).exp()
    }

    /// Mass of the `i`-th accepted configuration.
    #[must_use]
    pub fn mass(&self, i: usize) -> f64 {
        self.emitted_masses[i]
    }

    /// The `i`-th accepted configuration.
    #[must_use]
    pub fn configuration(&self, i: usize) -> &[u32] {
        self.arena.get(self.confs[i])
    }

    /// Number of leading, stably-sorted entries (monotonically non-decreasing across calls).
    #[must_use]
    pub const fn sorted_up_to_idx(&self) -> usize {
        self.sorted_up_to_idx
    }
}
