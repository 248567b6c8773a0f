//! Functional Unit Pool.
//!
//! Every core owns one pool shared by all of its hardware threads. Each unit
//! class has a fixed number of instances, an operation latency (cycles until
//! the result is available), and an issue latency (cycles until the instance
//! accepts another operation). Reservation is a single check-and-reserve with
//! no queueing: a refused micro-op simply stays in its issue queue.

use serde::{Deserialize, Serialize};

use crate::common::constants::FU_RES_MAX;
use crate::config::FunctionalUnitsConfig;
use crate::core::uop::Uop;

/// Functional unit classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FuClass {
    /// Integer adder.
    IntAdd,
    /// Integer multiplier.
    IntMult,
    /// Integer divider.
    IntDiv,
    /// Address generation unit.
    EffAddr,
    /// Integer logic unit.
    Logic,
    /// Simple floating-point operations (moves, sign, rounding).
    FpSimple,
    /// Floating-point adder.
    FpAdd,
    /// Floating-point comparator.
    FpComp,
    /// Floating-point multiplier.
    FpMult,
    /// Floating-point divider.
    FpDiv,
    /// Transcendental and square-root unit.
    FpComplex,
    /// Vector integer adder.
    XmmIntAdd,
    /// Vector integer multiplier.
    XmmIntMult,
    /// Vector integer divider.
    XmmIntDiv,
    /// Vector logic unit.
    XmmLogic,
    /// Vector floating-point adder.
    XmmFpAdd,
    /// Vector floating-point comparator.
    XmmFpComp,
    /// Vector floating-point multiplier.
    XmmFpMult,
    /// Vector floating-point divider.
    XmmFpDiv,
    /// Vector conversion unit.
    XmmFpConv,
    /// Vector square-root unit.
    XmmFpComplex,
}

impl FuClass {
    /// All classes, in reporting order.
    pub const ALL: [Self; 21] = [
        Self::IntAdd,
        Self::IntMult,
        Self::IntDiv,
        Self::EffAddr,
        Self::Logic,
        Self::FpSimple,
        Self::FpAdd,
        Self::FpComp,
        Self::FpMult,
        Self::FpDiv,
        Self::FpComplex,
        Self::XmmIntAdd,
        Self::XmmIntMult,
        Self::XmmIntDiv,
        Self::XmmLogic,
        Self::XmmFpAdd,
        Self::XmmFpComp,
        Self::XmmFpMult,
        Self::XmmFpDiv,
        Self::XmmFpConv,
        Self::XmmFpComplex,
    ];

    /// Number of classes.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of the class.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Built-in parameters used when the configuration does not override a class.
    pub const fn default_params(self) -> FuParams {
        let (count, op_lat, issue_lat) = match self {
            Self::IntAdd | Self::EffAddr => (4, 2, 1),
            Self::IntMult => (1, 3, 1),
            Self::IntDiv => (1, 20, 19),
            Self::Logic => (4, 1, 1),
            Self::FpSimple => (2, 2, 2),
            Self::FpAdd | Self::FpComp => (2, 5, 5),
            Self::FpMult => (1, 10, 10),
            Self::FpDiv => (1, 20, 20),
            Self::FpComplex => (1, 40, 40),
            Self::XmmIntAdd => (1, 2, 1),
            Self::XmmIntMult => (1, 3, 1),
            Self::XmmIntDiv => (1, 20, 20),
            Self::XmmLogic => (1, 1, 1),
            Self::XmmFpAdd | Self::XmmFpComp | Self::XmmFpConv => (1, 4, 1),
            Self::XmmFpMult => (1, 5, 1),
            Self::XmmFpDiv => (1, 12, 6),
            Self::XmmFpComplex => (1, 20, 10),
        };
        FuParams {
            count,
            op_lat,
            issue_lat,
        }
    }
}

/// Instance count and timing of one functional unit class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuParams {
    /// Number of instances, at most `FU_RES_MAX`.
    pub count: usize,
    /// Cycles from issue until the result is written back.
    pub op_lat: u64,
    /// Cycles an instance stays busy after accepting an operation.
    pub issue_lat: u64,
}

/// Per-class usage counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FuClassStats {
    /// Successful reservations.
    pub accesses: u64,
    /// Refused reservations.
    pub denied: u64,
    /// Cycles between first request and successful reservation, summed.
    pub waiting_time: u64,
}

/// Per-core pool of functional units.
#[derive(Debug, Clone)]
pub struct FunctionalUnitPool {
    params: [FuParams; FuClass::COUNT],
    cycle_when_free: [[u64; FU_RES_MAX]; FuClass::COUNT],
    stats: [FuClassStats; FuClass::COUNT],
}

impl FunctionalUnitPool {
    /// Builds a pool from the (validated) configuration.
    pub fn new(config: &FunctionalUnitsConfig) -> Self {
        Self {
            params: FuClass::ALL.map(|class| config.params(class)),
            cycle_when_free: [[0; FU_RES_MAX]; FuClass::COUNT],
            stats: [FuClassStats::default(); FuClass::COUNT],
        }
    }

    /// Parameters in effect for a class.
    pub const fn params(&self, class: FuClass) -> FuParams {
        self.params[class.index()]
    }

    /// Usage counters of a class.
    pub const fn stats(&self, class: FuClass) -> FuClassStats {
        self.stats[class.index()]
    }

    /// Tries to reserve a unit for `uop` at cycle `now`.
    ///
    /// Returns the operation latency on success, `Some(1)` for opcodes that
    /// need no unit, and `None` if every instance of the class is busy. The
    /// first request cycle is recorded on the micro-op to account waiting time.
    pub fn reserve(&mut self, uop: &mut Uop, now: u64) -> Option<u64> {
        let Some(class) = uop.opcode().fu_class() else {
            return Some(1);
        };
        let first_try = *uop.issue_try_when.get_or_insert(now);

        let idx = class.index();
        let params = self.params[idx];
        let slots = &mut self.cycle_when_free[idx][..params.count];
        if let Some(slot) = slots.iter_mut().find(|free_at| **free_at <= now) {
            *slot = now + params.issue_lat;
            let stats = &mut self.stats[idx];
            stats.accesses += 1;
            stats.waiting_time += now - first_try;
            Some(params.op_lat)
        } else {
            self.stats[idx].denied += 1;
            None
        }
    }

    /// Frees every instance immediately.
    ///
    /// Used when recovery happens at commit: nothing younger than the
    /// committing branch survives, so no reservation is still meaningful.
    pub fn release_all(&mut self) {
        for class in &mut self.cycle_when_free {
            class.fill(0);
        }
    }
}
