//! Output skew buffer: per-lane delay chains realigning the grid's south edge
//!
//! Lane 0 is a pure combinational pass-through; lane i adds i register
//! stages. The pipeline routes grid column c through lane N-1-c, because a
//! later grid column is already the more delayed one and needs the shorter
//! realignment chain. Lanes are Rw wide.

use crate::config::wrap_signed;
use crate::input_skew::SkewControl;

/// Per-lane delay bank undoing the grid's column stagger.
#[derive(Debug, Clone)]
pub struct OutputSkewBuffer {
    n: usize,
    acc_width: usize,
    /// Rectangular N x N storage; slot (lane, stage) is live when stage < lane.
    regs: Vec<Vec<i64>>,
}

impl OutputSkewBuffer {
    pub fn new(n: usize, acc_width: usize) -> Self {
        Self {
            n,
            acc_width,
            regs: vec![vec![0; n]; n],
        }
    }

    /// Current realigned outputs. Lane 0 passes `input[0]` through
    /// combinationally; lane i exposes the tail of its i-stage chain.
    pub fn outputs(&self, input: &[i64]) -> Vec<i64> {
        debug_assert_eq!(input.len(), self.n);
        (0..self.n)
            .map(|lane| {
                if lane == 0 {
                    wrap_signed(input[0], self.acc_width)
                } else {
                    self.regs[lane][lane - 1]
                }
            })
            .collect()
    }

    /// Debug view of the triangular bank; `None` outside `stage < lane`.
    pub fn slot(&self, lane: usize, stage: usize) -> Option<i64> {
        (lane < self.n && stage < lane).then(|| self.regs[lane][stage])
    }

    /// Advance one clock edge with the per-lane inputs.
    pub fn tick(&mut self, input: &[i64], ctrl: SkewControl) {
        if ctrl.reset {
            for lane in self.regs.iter_mut() {
                lane.fill(0);
            }
            return;
        }
        if !ctrl.enable {
            return;
        }
        debug_assert_eq!(input.len(), self.n);
        for lane in 1..self.n {
            for s in (1..lane).rev() {
                self.regs[lane][s] = self.regs[lane][s - 1];
            }
            self.regs[lane][0] = wrap_signed(input[lane], self.acc_width);
        }
    }
}
