//! Streaming wrapper: valid/ready ingress and egress around the grid pipeline
//!
//! Both channels follow the same rule: a beat transfers on a tick where
//! valid and ready are both sampled high. The wrapper holds at most one beat
//! per direction. Backpressure on either side freezes the whole pipeline in
//! place rather than dropping or reordering anything: the core (skew
//! buffers plus grid) advances only on ticks where an ingress beat is
//! waiting and the egress hold is free.
//!
//! `load_weight` is sampled when a beat is accepted and travels with it, so
//! a load phase is exactly the N beats accepted while the line is high.
//! Load beats drive the grid's west edge directly; activation beats go
//! through the input skew buffer. The first product row reaches the egress
//! hold `2N` enabled ticks after the first activation beat is consumed, one
//! row per enabled tick after that.

use tracing::{debug, trace};

use crate::config::SystolicConfig;
use crate::grid::Grid;
use crate::input_skew::{InputSkewBuffer, SkewControl};
use crate::output_skew::OutputSkewBuffer;
use crate::pe::PeControl;
use crate::schedule::pack_lanes;

/// External control lines of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineControl {
    pub reset: bool,
    pub enable: bool,
    pub load_weight: bool,
}

impl PipelineControl {
    pub fn run() -> Self {
        Self {
            reset: false,
            enable: true,
            load_weight: false,
        }
    }

    pub fn load() -> Self {
        Self {
            load_weight: true,
            ..Self::run()
        }
    }

    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::run()
        }
    }
}

/// What happened on one tick, as seen at the two handshake boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// An ingress beat was accepted this tick.
    pub ingress_fired: bool,
    /// The held egress beat was accepted downstream this tick.
    pub egress_fired: bool,
}

#[derive(Debug, Clone)]
struct HeldBeat {
    lanes: Vec<i64>,
    load: bool,
}

/// The full streaming pipeline: ingress hold, input skew, grid, output
/// skew, egress hold.
#[derive(Debug)]
pub struct StreamWrapper {
    config: SystolicConfig,
    input_skew: InputSkewBuffer,
    grid: Grid,
    output_skew: OutputSkewBuffer,
    in_hold: Option<HeldBeat>,
    out_hold: Option<Vec<i64>>,
    /// Load beats consumed in the current load phase.
    load_beats: usize,
    /// Enabled activation ticks since the last load beat.
    warmup: usize,
}

impl StreamWrapper {
    pub fn new(config: SystolicConfig) -> Self {
        let n = config.array_size;
        Self {
            input_skew: InputSkewBuffer::new(n, config.data_width),
            grid: Grid::new(&config),
            output_skew: OutputSkewBuffer::new(n, config.acc_width),
            config,
            in_hold: None,
            out_hold: None,
            load_beats: 0,
            warmup: 0,
        }
    }

    pub fn config(&self) -> &SystolicConfig {
        &self.config
    }

    /// Whether the ingress hold is free. A transfer can additionally
    /// complete on a tick that consumes the held beat, since ready is freed
    /// on the consuming tick itself.
    pub fn ingress_ready(&self) -> bool {
        self.in_hold.is_none()
    }

    /// Whether a produced beat is waiting on the egress side.
    pub fn egress_valid(&self) -> bool {
        self.out_hold.is_some()
    }

    /// The held egress beat as lanes, lane index = product column.
    pub fn egress_data(&self) -> Option<&[i64]> {
        self.out_hold.as_deref()
    }

    /// The held egress beat on the packed bus presentation, lane 0 least
    /// significant. Requires `N * Rw <= 128`.
    pub fn egress_data_packed(&self) -> Option<u128> {
        self.out_hold
            .as_ref()
            .map(|lanes| pack_lanes(lanes, self.config.acc_width))
    }

    /// Debug access for verification.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn input_skew(&self) -> &InputSkewBuffer {
        &self.input_skew
    }

    pub fn output_skew(&self) -> &OutputSkewBuffer {
        &self.output_skew
    }

    /// Advance one clock edge.
    ///
    /// Synchronous reset takes precedence over everything; `enable = 0`
    /// freezes every register uniformly, handshake holds included, so a
    /// frozen tick is a non-event at both boundaries.
    pub fn tick(
        &mut self,
        ingress_valid: bool,
        ingress_data: &[i64],
        egress_ready: bool,
        ctrl: PipelineControl,
    ) -> TickReport {
        let n = self.config.array_size;
        if ctrl.reset {
            self.in_hold = None;
            self.out_hold = None;
            self.load_beats = 0;
            self.warmup = 0;
            let zeros = vec![0i64; n];
            self.input_skew.tick(&zeros, SkewControl::reset());
            self.grid.tick(&zeros, PeControl::reset());
            self.output_skew.tick(&zeros, SkewControl::reset());
            return TickReport::default();
        }
        if !ctrl.enable {
            return TickReport::default();
        }

        let mut report = TickReport::default();

        // Egress retirement first: the hold is cleared on the tick the beat
        // is accepted, which also unblocks the core below.
        if self.out_hold.is_some() && egress_ready {
            self.out_hold = None;
            report.egress_fired = true;
            trace!("egress beat retired");
        }

        let advance = self.in_hold.is_some() && self.out_hold.is_none();
        // Ready is freed on the very tick the held beat is consumed.
        let in_ready = self.in_hold.is_none() || advance;

        if advance {
            if let Some(beat) = self.in_hold.take() {
                self.step_core(&beat);
            }
        }

        if in_ready && ingress_valid {
            debug_assert_eq!(ingress_data.len(), n);
            self.in_hold = Some(HeldBeat {
                lanes: ingress_data.to_vec(),
                load: ctrl.load_weight,
            });
            report.ingress_fired = true;
            trace!(load = ctrl.load_weight, "ingress beat accepted");
        }
        report
    }

    /// One enabled tick of the skew buffers and the grid, consuming `beat`.
    fn step_core(&mut self, beat: &HeldBeat) {
        let n = self.config.array_size;
        let south = self.grid.south_outputs();
        // Later grid columns emerge later, so they take the shorter
        // realignment chain: column c goes through lane n-1-c.
        let realign_in: Vec<i64> = (0..n).map(|lane| south[n - 1 - lane]).collect();

        if beat.load {
            // Load beats hit the west edge directly: staggered arrival
            // through the skew bank would shift the reversed-column
            // schedule by one tick per row.
            let zeros = vec![0i64; n];
            self.input_skew.tick(&zeros, SkewControl::run());
            self.grid.tick(&beat.lanes, PeControl::load());
            self.output_skew.tick(&realign_in, SkewControl::run());
            self.load_beats += 1;
            self.warmup = 0;
            if self.load_beats == n {
                debug!(beats = n, "weight load phase complete");
            }
            return;
        }

        self.load_beats = 0;
        if self.warmup >= self.config.fill_latency() {
            let aligned = self.output_skew.outputs(&realign_in);
            // Undo the lane mirror so that egress lane c is product column c.
            let row: Vec<i64> = (0..n).map(|c| aligned[n - 1 - c]).collect();
            trace!(
                beat = self.warmup - self.config.fill_latency(),
                "egress beat produced"
            );
            self.out_hold = Some(row);
        }
        let west = self.input_skew.outputs().to_vec();
        self.input_skew.tick(&beat.lanes, SkewControl::run());
        self.grid.tick(&west, PeControl::run());
        self.output_skew.tick(&realign_in, SkewControl::run());
        self.warmup += 1;
    }
}
