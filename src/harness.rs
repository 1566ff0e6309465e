//! End-to-end driver and monitor for one load-then-stream matmul
//!
//! [`run_matmul`] drives the wrapper with the reversed-column weight beats
//! followed by the row-beat activation stream, applies caller-supplied
//! egress backpressure, and checks the handshake protocol while collecting
//! the product rows. [`verify_matmul`] additionally compares the collected
//! product against the wrapped-arithmetic reference.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SystolicConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::schedule::{activation_beats, reference_matmul, weight_load_beats};
use crate::stream::{PipelineControl, StreamWrapper};

/// Outcome of one complete run: the collected product and how long it took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatmulRun {
    pub config: SystolicConfig,
    pub product: Vec<Vec<i64>>,
    pub ticks: usize,
}

/// Stream `a * b` through a fresh pipeline and collect the product rows.
///
/// `ready` is sampled once per tick with the tick index and models the
/// downstream consumer. The run fails with [`PipelineError::Timeout`] if the
/// product has not fully drained within a budget proportional to the beat
/// count, and with [`PipelineError::ProtocolViolation`] if the egress side
/// ever retracts or mutates a beat that has not been accepted, or asserts
/// valid while weight beats are still being loaded.
pub fn run_matmul(
    config: &SystolicConfig,
    a: &[Vec<i64>],
    b: &[Vec<i64>],
    ready: &mut dyn FnMut(usize) -> bool,
) -> PipelineResult<MatmulRun> {
    let n = config.array_size;
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(PipelineError::shape(
            format!("{0} x {0} activation matrix", n),
            format!("{} rows", a.len()),
        ));
    }
    if b.len() != n || b.iter().any(|row| row.len() != n) {
        return Err(PipelineError::shape(
            format!("{0} x {0} weight matrix", n),
            format!("{} rows", b.len()),
        ));
    }

    let mut beats: Vec<(Vec<i64>, bool)> = weight_load_beats(b)
        .into_iter()
        .map(|lanes| (lanes, true))
        .collect();
    beats.extend(
        activation_beats(a, n, config.fill_latency())
            .into_iter()
            .map(|lanes| (lanes, false)),
    );

    let mut wrapper = StreamWrapper::new(config.clone());
    let budget = 8 * beats.len() + 64;
    let mut idx = 0;
    let mut rows: Vec<Vec<i64>> = Vec::with_capacity(n);
    let mut prev_valid = false;
    let mut prev_fired = false;
    let mut prev_data: Option<Vec<i64>> = None;
    let mut tick = 0usize;

    while rows.len() < n {
        if tick >= budget {
            return Err(PipelineError::Timeout { ticks: budget });
        }
        let cur_valid = wrapper.egress_valid();
        let cur_data = wrapper.egress_data().map(<[i64]>::to_vec);
        if prev_valid && !prev_fired {
            if !cur_valid {
                return Err(PipelineError::protocol(
                    tick,
                    "egress valid deasserted before the beat was accepted",
                ));
            }
            if cur_data != prev_data {
                return Err(PipelineError::protocol(
                    tick,
                    "egress data changed while a beat was stalled",
                ));
            }
        }
        if idx < n && cur_valid {
            return Err(PipelineError::protocol(
                tick,
                "egress valid during the weight load phase",
            ));
        }

        let (data, load) = match beats.get(idx) {
            Some((lanes, load)) => (lanes.clone(), *load),
            None => (vec![0; n], false),
        };
        let accept = ready(tick);
        let ctrl = PipelineControl {
            load_weight: load,
            ..PipelineControl::run()
        };
        let report = wrapper.tick(idx < beats.len(), &data, accept, ctrl);
        if report.ingress_fired {
            idx += 1;
        }
        if report.egress_fired {
            if let Some(row) = cur_data.clone() {
                rows.push(row);
            }
        }
        prev_valid = cur_valid;
        prev_fired = report.egress_fired;
        prev_data = cur_data;
        tick += 1;
    }

    debug!(ticks = tick, rows = rows.len(), "matmul stream drained");
    Ok(MatmulRun {
        config: config.clone(),
        product: rows,
        ticks: tick,
    })
}

/// Run the pipeline and compare every product entry against the reference.
pub fn verify_matmul(
    config: &SystolicConfig,
    a: &[Vec<i64>],
    b: &[Vec<i64>],
    ready: &mut dyn FnMut(usize) -> bool,
) -> PipelineResult<MatmulRun> {
    let run = run_matmul(config, a, b, ready)?;
    let expected = reference_matmul(a, b, config)?;
    for (beat, (got_row, exp_row)) in run.product.iter().zip(expected.iter()).enumerate() {
        for (lane, (&actual, &expected)) in got_row.iter().zip(exp_row.iter()).enumerate() {
            if actual != expected {
                return Err(PipelineError::Mismatch {
                    beat,
                    lane,
                    expected,
                    actual,
                });
            }
        }
    }
    info!(
        n = config.array_size,
        ticks = run.ticks,
        "product verified against reference"
    );
    Ok(run)
}
