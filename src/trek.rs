//! Lazy, best-first enumeration of configurations in strictly decreasing log-probability order.

use crate::arena::{Arena, ConfigId, DEFAULT_BLOCK_CAPACITY};
use crate::config::{log_prob, mass, write_transfer};
use crate::marginal::Marginal;
use crate::numerics::CompensatedSum;
use crate::visited::{derive_seed, VisitedSet};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A heap entry: primarily ordered by log-probability (via [`OrderedFloat`], since no `NaN` can
/// arise from a validated [`Marginal`]), with a monotonic insertion sequence as a tiebreak so
/// iteration order is fully deterministic rather than depending on the heap's internal layout.
struct HeapEntry {
    log_prob: OrderedFloat<f64>,
    sequence: u64,
    id: ConfigId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.log_prob == other.log_prob && self.sequence == other.sequence
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.log_prob
            .cmp(&other.log_prob)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Lazy best-first enumerator: expands one configuration at a time, always the highest
/// log-probability configuration not yet emitted.
pub struct Trek {
    masses: Vec<f64>,
    atom_log_probs: Vec<f64>,
    loggamma_nominator: f64,
    k: usize,
    arena: Arena,
    visited: VisitedSet,
    heap: BinaryHeap<HeapEntry>,
    next_sequence: u64,
    confs: Vec<ConfigId>,
    log_probs: Vec<f64>,
    emitted_masses: Vec<f64>,
    total_prob: CompensatedSum,
    scratch: Vec<u32>,
}

impl Trek {
    /// Consumes a [`Marginal`], seeding the enumerator with its mode and performing one
    /// expansion step so that index `0` is already populated with the mode itself.
    #[must_use]
    pub fn from_marginal(marginal: Marginal) -> Self {
        Self::with_capacity(marginal, DEFAULT_BLOCK_CAPACITY, 0)
    }

    /// Like [`Self::from_marginal`], but with explicit tuning of the backing [`Arena`]'s block
    /// size and the [`VisitedSet`]'s initial bucket capacity, for callers who can estimate the
    /// eventual size of the enumeration in advance.
    #[must_use]
    pub fn with_capacity(marginal: Marginal, block_capacity: usize, visited_capacity: usize) -> Self {
        let k = marginal.isotope_count();
        let seed = derive_seed(&marginal.masses, &marginal.probs, marginal.n);
        let mut arena = Arena::with_block_capacity(k, block_capacity);
        let mut visited = VisitedSet::with_capacity(seed, visited_capacity);

        let mode_config = marginal.mode_configuration.clone();
        let mode_id = arena.alloc(&mode_config);
        visited.insert(&mode_config, mode_id);
        let mode_lp = log_prob(marginal.loggamma_nominator, &marginal.atom_log_probs, &mode_config);

        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry {
            log_prob: OrderedFloat(mode_lp),
            sequence: 0,
            id: mode_id,
        });

        let mut trek = Self {
            masses: marginal.masses,
            atom_log_probs: marginal.atom_log_probs,
            loggamma_nominator: marginal.loggamma_nominator,
            k,
            arena,
            visited,
            heap,
            next_sequence: 1,
            confs: Vec::new(),
            log_probs: Vec::new(),
            emitted_masses: Vec::new(),
            total_prob: CompensatedSum::new(),
            scratch: vec![0_u32; k],
        };
        trek.advance();
        trek
    }

    /// Pops the highest log-probability not-yet-emitted configuration, emits it, and pushes its
    /// unvisited neighbors onto the heap. Returns `false` if the heap was already empty, meaning
    /// every configuration of the marginal has been emitted.
    pub fn advance(&mut self) -> bool {
        let Some(top) = self.heap.pop() else {
            return false;
        };

        let config = self.arena.get(top.id).to_vec();
        let lp = top.log_prob.into_inner();
        let m = mass(&self.masses, &config);

        self.confs.push(top.id);
        self.log_probs.push(lp);
        self.emitted_masses.push(m);
        self.total_prob.add(lp.exp());

        for (recipient, donor) in (0..self.k).cartesian_product(0..self.k) {
            if recipient == donor || config[donor] == 0 {
                continue;
            }
            write_transfer(&config, &mut self.scratch, recipient, donor);
            if self.visited.find(&self.arena, &self.scratch).is_some() {
                continue;
            }
            let new_id = self.arena.alloc(&self.scratch);
            self.visited.insert(&self.scratch, new_id);
            let new_lp = log_prob(self.loggamma_nominator, &self.atom_log_probs, &self.scratch);
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            self.heap.push(HeapEntry {
                log_prob: OrderedFloat(new_lp),
                sequence,
                id: new_id,
            });
        }

        true
    }

    /// Expands until at least `idx + 1` configurations have been emitted, or the heap empties.
    /// Returns whether `idx` is now a valid index.
    pub fn ensure_index(&mut self, idx: usize) -> bool {
        while self.confs.len() <= idx {
            if !self.advance() {
                return false;
            }
        }
        true
    }

    /// Expands until the compensated running sum of emitted probabilities reaches `threshold`,
    /// or the heap empties, returning the number of configurations emitted once that happens.
    ///
    /// Re-scans already-emitted log-probabilities with a fresh compensated sum first, so repeated
    /// calls with varying thresholds are consistent regardless of the internal running total kept
    /// by [`Self::advance`].
    pub fn process_until_cutoff(&mut self, threshold: f64) -> usize {
        let mut sum = CompensatedSum::new();
        for (i, &lp) in self.log_probs.iter().enumerate() {
            sum.add(lp.exp());
            if sum.value() >= threshold {
                return i + 1;
            }
        }
        loop {
            if !self.advance() {
                return self.log_probs.len();
            }
            let lp = *self.log_probs.last().expect("advance just pushed an entry");
            sum.add(lp.exp());
            if sum.value() >= threshold {
                return self.log_probs.len();
            }
        }
    }

    /// Number of configurations emitted so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.confs.len()
    }

    /// `logP` of the `i`-th emitted configuration.
    #[must_use]
    pub fn log_prob(&self, i: usize) -> f64 {
        self.log_probs[i]
    }

    /// Probability of the `i`-th emitted configuration.
    #[must_use]
    pub fn prob(&self, i: usize) -> f64 {
        self.log_probs[i].exp()
    }

    /// Mass of the `i`-th emitted configuration.
    #[must_use]
    pub fn mass(&self, i: usize) -> f64 {
        self.emitted_masses[i]
    }

    /// The `i`-th emitted configuration.
    #[must_use]
    pub fn configuration(&self, i: usize) -> &[u32] {
        self.arena.get(self.confs[i])
    }

    /// The compensated sum of probabilities emitted so far.
    #[must_use]
    pub fn total_prob(&self) -> f64 {
        self.total_prob.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use rand::Rng;
    use rand_pcg::Pcg64;

    fn marginal(masses: &[f64], probs: &[f64], n: u32) -> Marginal {
        Marginal::new(masses, probs, n).unwrap()
    }

    #[test]
    fn degenerate_single_isotope_emits_one_configuration() {
        let mut trek = Trek::from_marginal(marginal(&[12.0], &[1.0], 10));
        assert_eq!(trek.count(), 1);
        assert_eq!(trek.configuration(0), [10]);
        assert!(approx_eq!(f64, trek.log_prob(0), 0.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, trek.mass(0), 120.0, epsilon = 1e-9));
        assert!(!trek.advance());
    }

    #[test]
    fn binary_symmetric_order_matches_tiebreak_rule() {
        let mut trek = Trek::from_marginal(marginal(&[1.0, 2.0], &[0.5, 0.5], 4));
        trek.ensure_index(4);
        let confs: Vec<Vec<u32>> = (0..5).map(|i| trek.configuration(i).to_vec()).collect();
        assert_eq!(confs[0], vec![2, 2]);
        assert_eq!(confs[1], vec![1, 3]);
        assert_eq!(confs[2], vec![3, 1]);
        // the last two are tied at equal probability; only membership, not order, is asserted
        let mut tail = vec![confs[3].clone(), confs[4].clone()];
        tail.sort();
        assert_eq!(tail, vec![vec![0, 4], vec![4, 0]]);
        assert!(!trek.advance());
    }

    #[test]
    fn emitted_log_probs_are_non_increasing() {
        let mut rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
        let k = 4;
        let probs: Vec<f64> = {
            let raw: Vec<f64> = (0..k).map(|_| 0.1 + rng.gen::<f64>() * 0.9).collect();
            let sum: f64 = raw.iter().sum();
            raw.into_iter().map(|v| v / sum).collect()
        };
        let masses: Vec<f64> = (0..k).map(|i| 1.0 + f64::from(i as u32)).collect();
        let mut trek = Trek::from_marginal(marginal(&masses, &probs, 15));

        let mut previous = f64::INFINITY;
        for _ in 0..50 {
            if !trek.advance() {
                break;
            }
            let last = trek.log_prob(trek.count() - 1);
            assert!(last <= previous, "log-probabilities must be non-increasing");
            previous = last;
        }
    }

    #[test]
    fn no_configuration_emitted_twice() {
        let mut trek = Trek::from_marginal(marginal(&[1.0, 2.0], &[0.5, 0.5], 4));
        while trek.advance() {}
        assert_eq!(trek.count(), 5);
        let mut seen = std::collections::HashSet::new();
        for i in 0..trek.count() {
            assert!(seen.insert(trek.configuration(i).to_vec()));
        }
    }

    #[test]
    fn total_probability_converges_to_one() {
        let mut trek = Trek::from_marginal(marginal(&[1.0, 2.0], &[0.5, 0.5], 4));
        while trek.advance() {}
        assert!(approx_eq!(f64, trek.total_prob(), 1.0, epsilon = 1e-9));
    }

    #[test]
    fn process_until_cutoff_reaches_threshold() {
        let mut trek = Trek::from_marginal(marginal(&[1.0, 2.0], &[0.5, 0.5], 4));
        let count = trek.process_until_cutoff(0.9);
        assert!(count >= 3);
        let sum: f64 = (0..count).map(|i| trek.prob(i)).sum();
        assert!(sum >= 0.9 - 1e-9);
    }
}
