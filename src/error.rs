//! Crate-wide error taxonomy.

use thiserror::Error;

/// Errors that can occur while constructing a [`crate::marginal::Marginal`] or one of its
/// specializations.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum Error {
    /// An isotope probability was outside the half-open interval `(0, 1]`.
    #[error("isotope probability at index {index} is {value}, expected a value in (0, 1]")]
    InvalidIsotopeProbability {
        /// Index of the offending isotope within `probs`.
        index: usize,
        /// The offending probability.
        value: f64,
    },
    /// The requested atom count is too large for the factorial table.
    #[error("atom count {n} is too large; the factorial table only covers 0..{max}")]
    AtomCountTooLarge {
        /// The requested atom count.
        n: u64,
        /// The largest atom count the factorial table supports (exclusive upper bound).
        max: u64,
    },
}

/// Convenience alias for results returned by this crate's constructors.
pub type Result<T> = std::result::Result<T, Error>;
