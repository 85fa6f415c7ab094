//! Numerically stable log-probability arithmetic.
//!
//! Everything here exists to make `logP(c)` reproducible bit-for-bit across independent
//! constructions of the same `(masses, probs, n)` input (testable property 11 in the design
//! document): the natural-log table is filled once with upward-rounded terms, and every
//! probability-to-log conversion is rounded in the same direction, so a priority-queue pop can
//! never observe a configuration whose true log-probability is larger than its stored one.

use std::sync::OnceLock;

/// Upper bound (exclusive) on the atom count this crate can handle. Chosen so the minus-log-
/// factorial table comfortably covers any molecule a mass spectrometer could plausibly resolve.
pub const MAX_ATOM_COUNT: u64 = 1 << 20;

/// Returns the smallest `f64` strictly greater than `x`, or `x` itself for `NaN` and `+inf`.
///
/// This is the portable stand-in for "round the result of this operation toward `+inf`": instead
/// of flipping the FPU rounding-control word for the duration of a computation (and having to
/// restore it on every exit path, including error paths), we nudge the correctly-rounded result
/// up by one unit in the last place. For a single `ln()` call the two are equally conservative,
/// and this version carries no process-wide state.
#[must_use]
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    // -0.0 and 0.0 compare equal but have different bit patterns; normalize to +0.0 first.
    let x = if x == 0.0 { 0.0 } else { x };
    let bits = x.to_bits();
    let next_bits = if x.is_sign_positive() {
        bits + 1
    } else {
        bits - 1
    };
    f64::from_bits(next_bits)
}

/// `ln(x)`, rounded up to the next representable `f64`.
#[must_use]
pub fn ln_up(x: f64) -> f64 {
    next_up(x.ln())
}

/// A handful of natural-abundance constants common enough to warrant a precomputed,
/// higher-confidence `ln` value instead of recomputing it at construction time. The match is
/// bit-for-bit (`==` on the stored `f64`), so a caller who builds `probs` from the same constants
/// used here gets identical log-probabilities regardless of which marginal they land in.
const KNOWN_ABUNDANCES: &[(f64, f64)] = &[
    (0.999_885, -0.000_115_006_613_006_978_28),
    (0.000_115, -9.070_578_429_601_023),
    (0.9893, -0.010_757_656_652_960_206),
    (0.0107, -4.537_511_537_514_276),
    (0.996_36, -0.003_646_640_920_197_475),
    (0.003_64, -5.615_771_597_333_487),
    (0.997_57, -0.002_432_957_241_702_984),
    (0.000_38, -7.875_339_305_243_842),
    (0.002_05, -6.189_915_485_831_819),
    (0.9499, -0.051_398_563_086_000_32),
    (0.0075, -4.892_852_258_439_872),
    (0.0425, -3.158_251_203_051_765_5),
    (0.0001, -9.210_340_371_976_18),
    (0.7576, -0.277_599_737_110_268_4),
    (0.2424, -1.417_166_024_786_977_5),
    (0.5069, -0.679_441_533_503_833_2),
    (0.4931, -0.707_043_285_752_056_5),
    (0.922_23, -0.080_960_628_834_291_12),
    (0.046_85, -3.060_804_270_297_705),
    (0.030_92, -3.476_352_055_262_915_5),
];

/// Natural logarithm of an isotope abundance, using a precomputed constant when `p` matches a
/// well-known natural abundance bit-for-bit, falling back to [`ln_up`] otherwise.
#[must_use]
pub fn ln_abundance(p: f64) -> f64 {
    for &(value, ln_value) in KNOWN_ABUNDANCES {
        if value == p {
            return ln_value;
        }
    }
    ln_up(p)
}

/// Lazily-built table of `log(n!)` for `n in 0..MAX_ATOM_COUNT`, each entry rounded up at fill
/// time via the recurrence `log(n!) = log((n-1)!) + log(n)`.
struct FactorialTable(Box<[f64]>);

fn build_factorial_table() -> FactorialTable {
    let mut table = Vec::with_capacity(MAX_ATOM_COUNT as usize);
    let mut acc = 0.0_f64;
    table.push(acc);
    for n in 1..MAX_ATOM_COUNT {
        acc += ln_up(n as f64);
        table.push(acc);
    }
    FactorialTable(table.into_boxed_slice())
}

static FACTORIAL_TABLE: OnceLock<FactorialTable> = OnceLock::new();

fn factorial_table() -> &'static FactorialTable {
    FACTORIAL_TABLE.get_or_init(build_factorial_table)
}

/// `log(n!)`, read from the shared, upward-rounded table.
///
/// # Panics
///
/// Panics if `n >= MAX_ATOM_COUNT`; callers are expected to have already rejected such inputs
/// via [`crate::error::Error::AtomCountTooLarge`].
#[must_use]
pub fn ln_factorial(n: u32) -> f64 {
    factorial_table().0[n as usize]
}

/// `-log(n!)`, the "minus log factorial" term used directly in the multinomial log-density sum.
#[must_use]
pub fn mlf(n: u32) -> f64 {
    -ln_factorial(n)
}

/// `log(Gamma(x))` for `x > 0`, via [`libm::lgamma`].
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    libm::lgamma(x)
}

/// A Kahan–Neumaier compensated summation accumulator, used anywhere probabilities (as opposed
/// to log-probabilities) are summed, to bound the cumulative rounding error at `O(N * eps)`
/// instead of `O(N^2 * eps)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompensatedSum {
    total: f64,
    compensation: f64,
}

impl CompensatedSum {
    /// Creates a new accumulator at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total: 0.0,
            compensation: 0.0,
        }
    }

    /// Folds `value` into the running sum.
    pub fn add(&mut self, value: f64) {
        let t = self.total + value;
        if self.total.abs() >= value.abs() {
            self.compensation += (self.total - t) + value;
        } else {
            self.compensation += (value - t) + self.total;
        }
        self.total = t;
    }

    /// Returns the compensated sum accumulated so far.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.total + self.compensation
    }
}
