//! Processing element: one weight-stationary multiply-accumulate cell
//!
//! All three outputs are registers; a tick samples the inputs present at the
//! edge and nothing is visible combinationally. Reset is synchronous and
//! takes precedence over both `enable` and `load_weight`.

use crate::config::wrap_signed;

/// Control lines shared by every PE in a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeControl {
    pub reset: bool,
    pub enable: bool,
    pub load_weight: bool,
}

impl PeControl {
    /// Normal streaming: enabled, not resetting, not loading.
    pub fn run() -> Self {
        Self {
            reset: false,
            enable: true,
            load_weight: false,
        }
    }

    /// Weight load phase.
    pub fn load() -> Self {
        Self {
            load_weight: true,
            ..Self::run()
        }
    }

    /// Synchronous reset.
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::run()
        }
    }
}

/// One MAC cell holding a stationary weight.
#[derive(Debug, Clone)]
pub struct ProcessingElement {
    data_width: usize,
    acc_width: usize,
    weight: i64,
    activ_out: i64,
    sum_out: i64,
}

impl ProcessingElement {
    pub fn new(data_width: usize, acc_width: usize) -> Self {
        Self {
            data_width,
            acc_width,
            weight: 0,
            activ_out: 0,
            sum_out: 0,
        }
    }

    /// Advance one clock edge.
    ///
    /// Priority: reset, then enable gating, then weight load, then MAC.
    /// During a load tick the weight and the activation pass-through update
    /// while the sum register holds.
    pub fn tick(&mut self, activ_in: i64, top_sum_in: i64, ctrl: PeControl) {
        if ctrl.reset {
            self.weight = 0;
            self.activ_out = 0;
            self.sum_out = 0;
            return;
        }
        if !ctrl.enable {
            return;
        }
        let activ = wrap_signed(activ_in, self.data_width);
        if ctrl.load_weight {
            self.weight = activ;
            self.activ_out = activ;
            return;
        }
        self.sum_out = wrap_signed(
            top_sum_in.wrapping_add(activ.wrapping_mul(self.weight)),
            self.acc_width,
        );
        self.activ_out = activ;
    }

    /// Held weight.
    pub fn weight(&self) -> i64 {
        self.weight
    }

    /// Registered activation heading to the east neighbor.
    pub fn activ_out(&self) -> i64 {
        self.activ_out
    }

    /// Registered partial sum heading to the south neighbor.
    pub fn sum_out(&self) -> i64 {
        self.sum_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pe() -> ProcessingElement {
        ProcessingElement::new(8, 32)
    }

    #[test]
    fn test_reset_clears_outputs() {
        let mut pe = pe();
        // Garbage on every input while resetting
        pe.tick(0xFF, 0xFFFF, PeControl::reset());
        assert_eq!(pe.activ_out(), 0);
        assert_eq!(pe.sum_out(), 0);
        assert_eq!(pe.weight(), 0);
    }

    #[test]
    fn test_weight_load_passes_through() {
        let mut pe = pe();
        pe.tick(5, 0, PeControl::load());
        assert_eq!(pe.weight(), 5);
        assert_eq!(pe.activ_out(), 5);
    }

    #[test]
    fn test_basic_mac() {
        let mut pe = pe();
        pe.tick(5, 0, PeControl::load());
        pe.tick(3, 10, PeControl::run());
        // 10 + 3 * 5
        assert_eq!(pe.sum_out(), 25);
        assert_eq!(pe.activ_out(), 3);
    }

    #[test]
    fn test_signed_mac() {
        let mut pe = pe();
        pe.tick(5, 0, PeControl::load());
        pe.tick(-2, 50, PeControl::run());
        // 50 + (-2 * 5)
        assert_eq!(pe.sum_out(), 40);
        assert_eq!(pe.activ_out(), -2);
    }

    #[test]
    fn test_disable_holds_state() {
        let mut pe = pe();
        pe.tick(5, 0, PeControl::load());
        pe.tick(3, 10, PeControl::run());
        let held_sum = pe.sum_out();
        let held_activ = pe.activ_out();
        let frozen = PeControl {
            enable: false,
            ..PeControl::run()
        };
        for _ in 0..4 {
            pe.tick(100, 1000, frozen);
        }
        assert_eq!(pe.sum_out(), held_sum);
        assert_eq!(pe.activ_out(), held_activ);
    }

    #[test]
    fn test_sum_holds_during_load() {
        let mut pe = pe();
        pe.tick(5, 0, PeControl::load());
        pe.tick(3, 10, PeControl::run());
        let held_sum = pe.sum_out();
        pe.tick(7, 999, PeControl::load());
        assert_eq!(pe.sum_out(), held_sum);
        assert_eq!(pe.weight(), 7);
    }

    #[test]
    fn test_accumulator_wraps() {
        let mut pe = pe();
        pe.tick(1, 0, PeControl::load());
        pe.tick(1, i32::MAX as i64, PeControl::run());
        // i32::MAX + 1 wraps, no saturation
        assert_eq!(pe.sum_out(), i32::MIN as i64);
    }

    #[test]
    fn test_narrow_activation_wraps() {
        let mut pe = pe();
        pe.tick(0xFF, 0, PeControl::load());
        // 0xFF reads as -1 in an 8-bit register
        assert_eq!(pe.weight(), -1);
    }
}
