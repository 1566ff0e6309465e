//! Input skew buffer: per-row delay chains feeding the grid's west edge
//!
//! Row r delays its lane by r+1 ticks: a triangular bank of shift stages
//! (stage < row) plus one output register per row. The output register is
//! the authoritative "+1" — the verified property is that row r's output at
//! tick t equals the value driven at tick t-(r+1).

use crate::config::wrap_signed;

/// Control lines shared by both skew buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkewControl {
    pub reset: bool,
    pub enable: bool,
}

impl SkewControl {
    pub fn run() -> Self {
        Self {
            reset: false,
            enable: true,
        }
    }

    pub fn reset() -> Self {
        Self {
            reset: true,
            enable: true,
        }
    }
}

/// Per-row delay bank converting a natural row stream into the skewed
/// schedule the grid expects.
#[derive(Debug, Clone)]
pub struct InputSkewBuffer {
    n: usize,
    data_width: usize,
    /// Rectangular N x N storage; slot (row, stage) is live when stage < row.
    regs: Vec<Vec<i64>>,
    /// Per-row output register.
    out: Vec<i64>,
}

impl InputSkewBuffer {
    pub fn new(n: usize, data_width: usize) -> Self {
        Self {
            n,
            data_width,
            regs: vec![vec![0; n]; n],
            out: vec![0; n],
        }
    }

    /// Current skewed outputs, one lane per grid row.
    pub fn outputs(&self) -> &[i64] {
        &self.out
    }

    /// Debug view of the triangular bank; `None` outside `stage < row`.
    pub fn slot(&self, row: usize, stage: usize) -> Option<i64> {
        (row < self.n && stage < row).then(|| self.regs[row][stage])
    }

    /// Advance one clock edge with the natural per-row inputs.
    pub fn tick(&mut self, input: &[i64], ctrl: SkewControl) {
        if ctrl.reset {
            for row in self.regs.iter_mut() {
                row.fill(0);
            }
            self.out.fill(0);
            return;
        }
        if !ctrl.enable {
            return;
        }
        debug_assert_eq!(input.len(), self.n);
        for r in 0..self.n {
            let sample = wrap_signed(input[r], self.data_width);
            if r == 0 {
                // Row 0 has no bank stages, just the output register.
                self.out[0] = sample;
            } else {
                self.out[r] = self.regs[r][r - 1];
                for s in (1..r).rev() {
                    self.regs[r][s] = self.regs[r][s - 1];
                }
                self.regs[r][0] = sample;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const N: usize = 4;

    #[test]
    fn test_skew_property() {
        // Row i output matches row i input from (i+1) cycles ago.
        let mut buf = InputSkewBuffer::new(N, 8);
        let mut rng = StdRng::seed_from_u64(7);
        let mut history: Vec<Vec<i64>> = Vec::new();

        for t in 0..50 {
            let sampled = buf.outputs().to_vec();
            for r in 0..N {
                if t >= r + 1 {
                    assert_eq!(
                        sampled[r],
                        history[t - (r + 1)][r],
                        "row {} at tick {}",
                        r,
                        t
                    );
                } else {
                    assert_eq!(sampled[r], 0, "row {} before first arrival", r);
                }
            }
            let input: Vec<i64> = (0..N).map(|_| rng.gen_range(-128..=127)).collect();
            buf.tick(&input, SkewControl::run());
            history.push(input);
        }
    }

    #[test]
    fn test_disable_freezes_bank() {
        let mut buf = InputSkewBuffer::new(N, 8);
        for v in 1..=6 {
            buf.tick(&vec![v; N], SkewControl::run());
        }
        let held_out = buf.outputs().to_vec();
        let held_slots: Vec<_> = (0..N)
            .flat_map(|r| (0..r).map(move |s| (r, s)))
            .map(|(r, s)| buf.slot(r, s))
            .collect();

        // Garbage inputs while disabled must not leak in.
        let frozen = SkewControl {
            enable: false,
            ..SkewControl::run()
        };
        for _ in 0..5 {
            buf.tick(&vec![0xAA; N], frozen);
        }

        assert_eq!(buf.outputs(), held_out.as_slice());
        let slots_now: Vec<_> = (0..N)
            .flat_map(|r| (0..r).map(move |s| (r, s)))
            .map(|(r, s)| buf.slot(r, s))
            .collect();
        assert_eq!(slots_now, held_slots);

        // Re-enabling resumes exactly where the shift left off.
        buf.tick(&vec![9; N], SkewControl::run());
        assert_eq!(buf.outputs()[1], held_slots[0].unwrap());
    }

    #[test]
    fn test_reset_clears_regardless_of_enable() {
        let mut buf = InputSkewBuffer::new(N, 8);
        for v in 1..=4 {
            buf.tick(&vec![v; N], SkewControl::run());
        }
        buf.tick(
            &vec![0x55; N],
            SkewControl {
                reset: true,
                enable: false,
            },
        );
        assert!(buf.outputs().iter().all(|&v| v == 0));
        for r in 0..N {
            for s in 0..r {
                assert_eq!(buf.slot(r, s), Some(0));
            }
        }
    }

    #[test]
    fn test_slot_validity_predicate() {
        let buf = InputSkewBuffer::new(N, 8);
        assert_eq!(buf.slot(0, 0), None);
        assert_eq!(buf.slot(3, 2), Some(0));
        assert_eq!(buf.slot(3, 3), None);
        assert_eq!(buf.slot(N, 0), None);
    }

    #[test]
    fn test_inputs_wrap_to_data_width() {
        let mut buf = InputSkewBuffer::new(N, 8);
        buf.tick(&vec![0xFF; N], SkewControl::run());
        assert_eq!(buf.outputs()[0], -1);
    }
}
