//! Pipeline configuration and fixed-width two's-complement helpers
//!
//! These parameters mirror the generics of the hardware design: grid
//! dimension `N`, activation/weight width `Dw`, accumulator width `Rw`.

use serde::{Deserialize, Serialize};

/// Configuration for one pipeline instance, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystolicConfig {
    /// Size of the NxN grid (e.g., 4 for a 4x4 array)
    pub array_size: usize,
    /// Bit width of activations and weights
    pub data_width: usize,
    /// Bit width of accumulators/results
    pub acc_width: usize,
}

impl SystolicConfig {
    pub fn new(array_size: usize, data_width: usize, acc_width: usize) -> Self {
        Self {
            array_size,
            data_width,
            acc_width,
        }
    }

    /// Default configuration matching the reference testbenches
    pub fn default_4x4() -> Self {
        Self::new(4, 8, 32)
    }

    /// Largest representable activation/weight value
    pub fn max_value(&self) -> i64 {
        (1i64 << (self.data_width - 1)) - 1
    }

    /// Smallest representable activation/weight value
    pub fn min_value(&self) -> i64 {
        -(1i64 << (self.data_width - 1))
    }

    /// Ticks from the first activation beat consumed to the first product
    /// row leaving the output skew buffer: one extra input-skew stage, N-1
    /// grid hops, and the realignment chain.
    pub fn fill_latency(&self) -> usize {
        2 * self.array_size
    }

    /// Ticks until grid column `col` carries its first product element at
    /// the south edge, counted from the first skewed activation.
    pub fn grid_latency(&self, col: usize) -> usize {
        col + self.array_size
    }

    /// Wrap a value to the activation/weight width.
    pub fn wrap_sample(&self, value: i64) -> i64 {
        wrap_signed(value, self.data_width)
    }

    /// Wrap a value to the accumulator width.
    pub fn wrap_acc(&self, value: i64) -> i64 {
        wrap_signed(value, self.acc_width)
    }
}

impl Default for SystolicConfig {
    fn default() -> Self {
        Self::default_4x4()
    }
}

/// Truncate `value` to `bits` and sign-extend back to i64, i.e. the value a
/// `bits`-wide two's-complement register would hold.
pub fn wrap_signed(value: i64, bits: usize) -> i64 {
    debug_assert!(bits >= 1 && bits <= 64, "register width out of range");
    if bits >= 64 {
        return value;
    }
    let mask = (1u64 << bits) - 1;
    let masked = (value as u64) & mask;
    if masked & (1u64 << (bits - 1)) != 0 {
        (masked | !mask) as i64
    } else {
        masked as i64
    }
}
