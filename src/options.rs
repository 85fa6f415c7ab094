//! Typed construction options for the enumerators, replacing long positional argument lists.

use crate::arena::DEFAULT_BLOCK_CAPACITY;
use crate::layered::Layered;
use crate::marginal::Marginal;
use crate::precalc::Precalculated;
use crate::trek::Trek;

/// Builder for the tuning knobs shared by [`Trek`], [`Precalculated`], and [`Layered`]: the
/// acceptance cutoff (where applicable), output order, and the capacity hints passed down to the
/// backing arena and visited set.
///
/// Defaults match what each enumerator's `from_marginal` constructor already does: no cutoff
/// (`-inf`), descending sort, and the arena/visited-set defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnumeratorOptions {
    lcutoff: f64,
    sort: bool,
    block_capacity: usize,
    visited_capacity: usize,
}

impl Default for EnumeratorOptions {
    fn default() -> Self {
        Self {
            lcutoff: f64::NEG_INFINITY,
            sort: true,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            visited_capacity: 0,
        }
    }
}

impl EnumeratorOptions {
    /// Starts from the defaults: no cutoff, descending sort, default capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log-probability cutoff used by [`Self::build_precalculated`]. Ignored by
    /// [`Self::build_trek`] and [`Self::build_layered`], which have no fixed cutoff.
    #[must_use]
    pub const fn lcutoff(mut self, lcutoff: f64) -> Self {
        self.lcutoff = lcutoff;
        self
    }

    /// Whether [`Self::build_precalculated`] should sort its output by descending log-probability.
    #[must_use]
    pub const fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Number of configuration slots packed into a single arena block.
    #[must_use]
    pub const fn block_capacity(mut self, block_capacity: usize) -> Self {
        self.block_capacity = block_capacity;
        self
    }

    /// Initial bucket capacity reserved in the visited set.
    #[must_use]
    pub const fn visited_capacity(mut self, visited_capacity: usize) -> Self {
        self.visited_capacity = visited_capacity;
        self
    }

    /// Builds a [`Trek`] with these capacity settings; `lcutoff` and `sort` are not applicable.
    #[must_use]
    pub fn build_trek(self, marginal: Marginal) -> Trek {
        Trek::with_capacity(marginal, self.block_capacity, self.visited_capacity)
    }

    /// Builds a [`Precalculated`] with these settings.
    #[must_use]
    pub fn build_precalculated(self, marginal: Marginal) -> Precalculated {
        Precalculated::with_capacity(
            marginal,
            self.lcutoff,
            self.sort,
            self.block_capacity,
            self.visited_capacity,
        )
    }

    /// Builds a [`Layered`] with these capacity settings; `lcutoff` and `sort` are not
    /// applicable (the threshold is instead supplied incrementally via [`Layered::extend`]).
    #[must_use]
    pub fn build_layered(self, marginal: Marginal) -> Layered {
        Layered::with_capacity(marginal, self.block_capacity, self.visited_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marginal() -> Marginal {
        Marginal::new(&[1.0, 2.0], &[0.5, 0.5], 4).unwrap()
    }

    #[test]
    fn defaults_match_from_marginal_constructors() {
        let opts = EnumeratorOptions::new();
        assert_eq!(opts.lcutoff, f64::NEG_INFINITY);
        assert!(opts.sort);
        assert_eq!(opts.block_capacity, DEFAULT_BLOCK_CAPACITY);
    }

    #[test]
    fn builder_chain_produces_a_working_precalculated() {
        let opts = EnumeratorOptions::new()
            .lcutoff(f64::NEG_INFINITY)
            .sort(true)
            .block_capacity(8)
            .visited_capacity(16);
        let precalc = opts.build_precalculated(marginal());
        assert_eq!(precalc.count(), 5);
    }

    #[test]
    fn builder_produces_a_working_trek_and_layered() {
        let trek = EnumeratorOptions::new().build_trek(marginal());
        assert_eq!(trek.count(), 1);

        let mut layered = EnumeratorOptions::new().build_layered(marginal());
        layered.extend(f64::NEG_INFINITY);
        assert_eq!(layered.count(), 5);
    }
}
