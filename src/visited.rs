//! Content-addressed visited set over [`Arena`]-stored configurations.
//!
//! A naive visited set would store a clone of every configuration's contents, doubling the
//! memory the arena was introduced to save. Instead we hash a candidate configuration's content
//! and look up the (small) bucket of previously-seen [`ConfigId`]s sharing that hash, confirming
//! an exact match by re-reading the arena. The hash is salted per-marginal so that two
//! independently-constructed marginals don't necessarily collide the same way, while remaining
//! fully deterministic for a single run.

use crate::arena::{Arena, ConfigId};
use rustc_hash::FxHashMap;

/// Folds a configuration's entries into a single, order-sensitive `u64` hash, salted by `seed`.
///
/// The hash is permutation-sensitive: swapping two entries changes the result, since each term
/// is folded in after being multiplied by a position-independent constant but combined via a
/// running multiply-then-xor chain that depends on arrival order.
#[must_use]
pub fn hash_configuration(seed: u64, config: &[u32]) -> u64 {
    // FNV-1a-style accumulation, seeded.
    let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
    for &value in config {
        hash ^= u64::from(value);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Derives a deterministic per-marginal salt from its construction parameters.
///
/// Using a fixed function of the inputs (rather than a random nonce) keeps construction
/// reproducible (testable property 11: identical inputs produce identical outputs) while still
/// giving distinct marginals distinct salts, so two elements sharing an unlucky hash function
/// don't also share a worst-case collision pattern.
#[must_use]
pub fn derive_seed(masses: &[f64], probs: &[f64], n: u32) -> u64 {
    let mut hash = 0xd6e8_feb8_6659_fd93_u64 ^ u64::from(n);
    for &m in masses {
        hash ^= m.to_bits();
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    for &p in probs {
        hash ^= p.to_bits();
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// A content-addressed set of configurations, keyed by arena handle but compared by content.
#[derive(Default)]
pub struct VisitedSet {
    seed: u64,
    buckets: FxHashMap<u64, Vec<ConfigId>>,
}

impl VisitedSet {
    /// Creates an empty visited set salted with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            buckets: FxHashMap::default(),
        }
    }

    /// Creates an empty visited set salted with `seed`, pre-sized for `capacity` entries.
    #[must_use]
    pub fn with_capacity(seed: u64, capacity: usize) -> Self {
        let mut buckets = FxHashMap::default();
        buckets.reserve(capacity);
        Self { seed, buckets }
    }

    /// The salt used to hash configurations in this set.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the handle of a previously-inserted configuration with the same content as
    /// `candidate`, if any.
    #[must_use]
    pub fn find(&self, arena: &Arena, candidate: &[u32]) -> Option<ConfigId> {
        let hash = hash_configuration(self.seed, candidate);
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&id| arena.get(id) == candidate)
    }

    /// Records `id` (whose content is `content`) as visited.
    pub fn insert(&mut self, content: &[u32], id: ConfigId) {
        let hash = hash_configuration(self.seed, content);
        self.buckets.entry(hash).or_default().push(id);
    }

    /// Number of configurations recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
