//! Cycle-accurate model of a weight-stationary systolic matmul pipeline
//!
//! The model mirrors the register structure of the hardware: an N x N grid
//! of multiply-accumulate elements, an input skew buffer that staggers a
//! natural row stream into the diagonal schedule the grid expects, an
//! output skew buffer that realigns the south-edge partial sums, and a
//! valid/ready stream wrapper around the whole pipeline. Every component
//! advances one clock edge per `tick` call, and outputs are sampled before
//! the edge, so the simulated waveforms match the RTL cycle for cycle.
//!
//! The quickest way in is the harness, which drives one load-then-stream
//! matrix product end to end:
//!
//! ```
//! use systolic_stream::config::SystolicConfig;
//! use systolic_stream::harness::verify_matmul;
//!
//! let config = SystolicConfig::default_4x4();
//! let a = vec![vec![1, 2, 3, 4]; 4];
//! let b = vec![vec![2; 4]; 4];
//! let run = verify_matmul(&config, &a, &b, &mut |_| true).unwrap();
//! assert_eq!(run.product[0], vec![20; 4]);
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod harness;
pub mod input_skew;
pub mod output_skew;
pub mod pe;
pub mod schedule;
pub mod stream;

pub use config::SystolicConfig;
pub use error::{PipelineError, PipelineResult};
pub use grid::Grid;
pub use harness::{run_matmul, verify_matmul, MatmulRun};
pub use pe::{PeControl, ProcessingElement};
pub use stream::{PipelineControl, StreamWrapper, TickReport};
