//! N x N weight-stationary grid of processing elements
//!
//! Wiring: activations enter at the west edge and hop one PE per tick
//! eastward; partial sums start at zero on the north edge and accumulate one
//! PE per tick southward. Every PE shares one control word and every
//! register in the grid advances on the same edge.
//!
//! Weight load contract: driving the west edge with the columns of B in
//! reverse order (column N-1 first) for N load ticks lands B[r][c] in
//! PE[r][c] on the final tick, because a value entering row r takes c ticks
//! to reach column c. Forward order produces a shifted weight matrix.

use crate::config::SystolicConfig;
use crate::pe::{PeControl, ProcessingElement};

/// The systolic mesh itself; skew buffers and handshaking live outside.
#[derive(Debug, Clone)]
pub struct Grid {
    n: usize,
    pes: Vec<Vec<ProcessingElement>>,
}

impl Grid {
    pub fn new(config: &SystolicConfig) -> Self {
        let n = config.array_size;
        let pes = (0..n)
            .map(|_| {
                (0..n)
                    .map(|_| ProcessingElement::new(config.data_width, config.acc_width))
                    .collect()
            })
            .collect();
        Self { n, pes }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    /// Advance one clock edge with the west-edge activations.
    ///
    /// Neighbor outputs are registers, so each PE must see its neighbors'
    /// pre-tick state. Updating east-to-west and south-to-north guarantees
    /// that without a snapshot: PE (r, c) reads (r, c-1) and (r-1, c), both
    /// still untouched this tick.
    pub fn tick(&mut self, west: &[i64], ctrl: PeControl) {
        debug_assert_eq!(west.len(), self.n);
        for r in (0..self.n).rev() {
            for c in (0..self.n).rev() {
                let activ_in = if c == 0 {
                    west[r]
                } else {
                    self.pes[r][c - 1].activ_out()
                };
                let top_sum_in = if r == 0 { 0 } else { self.pes[r - 1][c].sum_out() };
                self.pes[r][c].tick(activ_in, top_sum_in, ctrl);
            }
        }
    }

    /// South-edge partial sums, one per column.
    pub fn south_outputs(&self) -> Vec<i64> {
        (0..self.n)
            .map(|c| self.pes[self.n - 1][c].sum_out())
            .collect()
    }

    /// Debug access to one PE.
    pub fn pe(&self, row: usize, col: usize) -> &ProcessingElement {
        &self.pes[row][col]
    }

    /// Snapshot of the held weight matrix.
    pub fn weights(&self) -> Vec<Vec<i64>> {
        self.pes
            .iter()
            .map(|row| row.iter().map(|pe| pe.weight()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{reference_matmul, skew_activations, weight_load_beats};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn config(n: usize) -> SystolicConfig {
        SystolicConfig::new(n, 8, 32)
    }

    fn load_weights(grid: &mut Grid, beats: &[Vec<i64>]) {
        for beat in beats {
            grid.tick(beat, PeControl::load());
        }
    }

    /// Drive the skewed activation schedule and capture column c starting at
    /// tick c+N, sampling before each tick.
    fn stream_and_capture(grid: &mut Grid, a: &[Vec<i64>], n: usize) -> Vec<Vec<i64>> {
        let schedule = skew_activations(a, n);
        let rows = a.len();
        let mut captured: Vec<Vec<i64>> = vec![Vec::new(); n];
        let total = schedule.len() + 2 * n;
        for t in 0..total {
            let south = grid.south_outputs();
            for c in 0..n {
                if t >= c + n && captured[c].len() < rows {
                    captured[c].push(south[c]);
                }
            }
            let west = schedule.get(t).cloned().unwrap_or_else(|| vec![0; n]);
            grid.tick(&west, PeControl::run());
        }
        captured
    }

    #[test]
    fn test_reversed_column_load_lands_weights() {
        let cfg = config(3);
        let mut grid = Grid::new(&cfg);
        let b = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
        load_weights(&mut grid, &weight_load_beats(&b));
        assert_eq!(grid.weights(), b);
    }

    #[test]
    fn test_matmul_fixed_with_latency() {
        // A rows all [1,2,3,4], B all 2: every product entry is 20, and
        // column c's first element surfaces exactly c+4 ticks in.
        let cfg = config(4);
        let mut grid = Grid::new(&cfg);
        let a = vec![vec![1, 2, 3, 4]; 4];
        let b = vec![vec![2; 4]; 4];
        load_weights(&mut grid, &weight_load_beats(&b));

        // Capturing column c from exactly tick c+4 must yield the product
        // rows in order; starting any earlier would pick up the stale
        // load-phase products still flushing out of the mesh.
        let captured = stream_and_capture(&mut grid, &a, 4);
        for c in 0..4 {
            assert_eq!(captured[c], vec![20; 4], "column {}", c);
        }
    }

    #[test]
    fn test_matmul_random_signed() {
        let cfg = config(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut grid = Grid::new(&cfg);
        let a: Vec<Vec<i64>> = (0..4)
            .map(|_| (0..4).map(|_| rng.gen_range(-20..=20)).collect())
            .collect();
        let b: Vec<Vec<i64>> = (0..4)
            .map(|_| (0..4).map(|_| rng.gen_range(-20..=20)).collect())
            .collect();
        load_weights(&mut grid, &weight_load_beats(&b));

        let captured = stream_and_capture(&mut grid, &a, 4);
        let expected = reference_matmul(&a, &b, &cfg).unwrap();
        for c in 0..4 {
            for i in 0..4 {
                assert_eq!(captured[c][i], expected[i][c], "C[{}][{}]", i, c);
            }
        }
    }

    #[test]
    fn test_forward_column_load_breaks_product() {
        // Negative test: the reversed-column order is load-bearing.
        let cfg = config(4);
        let mut grid = Grid::new(&cfg);
        let a = vec![
            vec![1, 2, 3, 4],
            vec![5, 6, 7, 8],
            vec![9, 10, 11, 12],
            vec![13, 14, 15, 16],
        ];
        let b = vec![
            vec![1, 0, 2, 0],
            vec![0, 3, 0, 4],
            vec![5, 0, 6, 0],
            vec![0, 7, 0, 8],
        ];
        // Columns in forward order instead of reversed.
        for col in 0..4 {
            let beat: Vec<i64> = (0..4).map(|r| b[r][col]).collect();
            grid.tick(&beat, PeControl::load());
        }
        let captured = stream_and_capture(&mut grid, &a, 4);
        let expected = reference_matmul(&a, &b, &cfg).unwrap();
        let matches = (0..4).all(|c| (0..4).all(|i| captured[c][i] == expected[i][c]));
        assert!(!matches, "forward-order load must not reproduce A*B");
    }

    #[test]
    fn test_reset_mid_stream_zeroes_registers() {
        let cfg = config(4);
        let mut grid = Grid::new(&cfg);
        let b = vec![vec![2; 4]; 4];
        load_weights(&mut grid, &weight_load_beats(&b));
        for t in 0..6 {
            grid.tick(&vec![t + 1; 4], PeControl::run());
        }
        grid.tick(&vec![7; 4], PeControl::reset());
        for r in 0..4 {
            for c in 0..4 {
                assert_eq!(grid.pe(r, c).activ_out(), 0);
                assert_eq!(grid.pe(r, c).sum_out(), 0);
                assert_eq!(grid.pe(r, c).weight(), 0);
            }
        }
    }
}
