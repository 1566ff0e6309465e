//! Stimulus schedules, beat packing, and the reference product
//!
//! These are the helpers a testbench needs around the pipeline: the skewed
//! activation schedule the grid expects, the reversed-column weight beats,
//! the natural row-beat stream for the wrapper, little-endian lane packing,
//! and a golden matmul with the same wrapping arithmetic as the PEs.

use crate::config::{wrap_signed, SystolicConfig};
use crate::error::{PipelineError, PipelineResult};

/// Grid-level skewed activation schedule: at tick t, row r carries
/// `a[t-r][r]` (column r of A delayed by r ticks), zero outside range.
/// Length is `rows + n - 1`.
pub fn skew_activations(a: &[Vec<i64>], n: usize) -> Vec<Vec<i64>> {
    let rows = a.len();
    (0..rows + n - 1)
        .map(|t| {
            (0..n)
                .map(|r| {
                    t.checked_sub(r)
                        .filter(|&src| src < rows)
                        .map(|src| a[src][r])
                        .unwrap_or(0)
                })
                .collect()
        })
        .collect()
}

/// Weight-load beats: the columns of B in reverse order, one beat per tick,
/// lane r carrying `b[r][col]`. Presenting columns back-to-front compensates
/// for the one-hop-per-tick eastward propagation during the load phase.
pub fn weight_load_beats(b: &[Vec<i64>]) -> Vec<Vec<i64>> {
    let n = b.len();
    (0..n)
        .rev()
        .map(|col| (0..n).map(|r| b[r][col]).collect())
        .collect()
}

/// Natural activation beats for the stream wrapper: beat t is row t of A
/// (lane r = `a[t][r]`), followed by `flush` all-zero beats that push the
/// last product rows through the pipeline.
pub fn activation_beats(a: &[Vec<i64>], n: usize, flush: usize) -> Vec<Vec<i64>> {
    let mut beats: Vec<Vec<i64>> = a.iter().map(|row| row.clone()).collect();
    beats.extend(std::iter::repeat(vec![0; n]).take(flush));
    beats
}

/// Pack N lanes into one bus value, lane 0 least significant, each lane
/// truncated to `width` bits. The packed presentation requires the beat to
/// fit in 128 bits.
pub fn pack_lanes(lanes: &[i64], width: usize) -> u128 {
    assert!(
        lanes.len() * width <= 128,
        "packed beat exceeds 128 bits ({} lanes x {} bits)",
        lanes.len(),
        width
    );
    let mask = if width == 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    lanes.iter().enumerate().fold(0u128, |acc, (i, &lane)| {
        acc | ((lane as u128) & mask) << (i * width)
    })
}

/// Unpack a bus value into N sign-extended lanes, inverse of [`pack_lanes`].
pub fn unpack_lanes(packed: u128, n: usize, width: usize) -> Vec<i64> {
    assert!(n * width <= 128 && width <= 64);
    let mask = (1u128 << width) - 1;
    (0..n)
        .map(|i| wrap_signed(((packed >> (i * width)) & mask) as i64, width))
        .collect()
}

/// Golden product with the pipeline's arithmetic: accumulation wraps to the
/// accumulator width at every step, exactly as the PE column chain does.
pub fn reference_matmul(
    a: &[Vec<i64>],
    b: &[Vec<i64>],
    config: &SystolicConfig,
) -> PipelineResult<Vec<Vec<i64>>> {
    let m = a.len();
    let k = b.len();
    let n = b.first().map_or(0, |row| row.len());
    if m == 0 || k == 0 || n == 0 {
        return Err(PipelineError::shape("non-empty matrices", "empty operand"));
    }
    if a.iter().any(|row| row.len() != k) {
        return Err(PipelineError::shape(
            format!("A with {} columns", k),
            "ragged or mismatched A",
        ));
    }
    if b.iter().any(|row| row.len() != n) {
        return Err(PipelineError::shape(
            format!("B with {} columns", n),
            "ragged B",
        ));
    }
    let product = (0..m)
        .map(|i| {
            (0..n)
                .map(|j| {
                    (0..k).fold(0i64, |acc, r| {
                        let term = config
                            .wrap_sample(a[i][r])
                            .wrapping_mul(config.wrap_sample(b[r][j]));
                        config.wrap_acc(acc.wrapping_add(term))
                    })
                })
                .collect()
        })
        .collect();
    Ok(product)
}
