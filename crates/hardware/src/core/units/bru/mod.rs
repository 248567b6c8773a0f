//! Branch prediction unit (BRU).
//!
//! Every hardware thread owns one [`BranchUnit`]; predictor state is never
//! shared between threads. The unit combines:
//! 1. **BTB:** Set-associative target storage consulted first at fetch.
//! 2. **RAS:** Return addresses pushed by calls and popped by returns.
//! 3. **Direction:** One of the static, bimodal, two-level, or combined predictors.
//!
//! Tables are consulted at fetch and trained only when a non-speculative
//! control micro-op commits.

pub use self::branch_predictor::DirectionPredictor;

/// Bimodal (2-bit counter) direction predictor.
pub mod bimodal;

/// Direction predictor trait and shared counter logic.
pub mod branch_predictor;

/// Branch Target Buffer for storing predicted branch targets.
pub mod btb;

/// Combined bimodal/two-level predictor with a choice table.
pub mod combined;

/// Return Address Stack for predicting return addresses.
pub mod ras;

/// Static branch predictor (always taken or always not-taken).
pub mod static_bp;

/// Two-level adaptive branch predictor.
pub mod two_level;

use self::{
    bimodal::BimodalPredictor, btb::Btb, combined::CombinedPredictor, ras::Ras,
    static_bp::StaticPredictor, two_level::TwoLevelPredictor,
};
use crate::config::{BranchPredictorConfig, BranchPredictorKind};
use crate::core::uop::{Opcode, Uop};

/// Table entries and component outcomes recorded when a branch is predicted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PredictionInfo {
    /// Final direction prediction.
    pub taken: bool,
    /// Bimodal counter index.
    pub bimod_index: usize,
    /// Bimodal component prediction.
    pub bimod_pred: bool,
    /// Two-level BHT index.
    pub twolevel_bht_index: usize,
    /// Two-level PHT row (history value at prediction time).
    pub twolevel_pht_row: usize,
    /// Two-level PHT column.
    pub twolevel_pht_col: usize,
    /// Two-level component prediction.
    pub twolevel_pred: bool,
    /// Choice counter index.
    pub choice_index: usize,
    /// True if the choice table selected the two-level component.
    pub choice_pred: bool,
}

/// Enum wrapper for static dispatch of direction predictors.
/// This avoids vtable lookups in the critical fetch loop.
#[derive(Clone, Debug)]
pub enum DirectionPredictorWrapper {
    /// Fixed direction.
    Static(StaticPredictor),
    /// Bimodal counters.
    Bimodal(BimodalPredictor),
    /// Two-level adaptive.
    TwoLevel(TwoLevelPredictor),
    /// Bimodal and two-level with a choice table.
    Combined(CombinedPredictor),
}

impl DirectionPredictorWrapper {
    /// Builds the direction predictor selected by the configuration.
    pub fn new(config: &BranchPredictorConfig) -> Self {
        let bimodal = || BimodalPredictor::new(config.bimod_size);
        let two_level = || {
            TwoLevelPredictor::new(
                config.twolevel_l1_size,
                config.twolevel_l2_size,
                config.twolevel_history_size,
            )
        };
        match config.kind {
            BranchPredictorKind::Perfect | BranchPredictorKind::Taken => {
                Self::Static(StaticPredictor::new(true))
            }
            BranchPredictorKind::NotTaken => Self::Static(StaticPredictor::new(false)),
            BranchPredictorKind::Bimodal => Self::Bimodal(bimodal()),
            BranchPredictorKind::TwoLevel => Self::TwoLevel(two_level()),
            BranchPredictorKind::Combined => Self::Combined(CombinedPredictor::new(
                bimodal(),
                two_level(),
                config.choice_size,
            )),
        }
    }
}

impl DirectionPredictor for DirectionPredictorWrapper {
    #[inline(always)]
    fn predict(&self, eip: u64, info: &mut PredictionInfo) -> bool {
        match self {
            Self::Static(bp) => bp.predict(eip, info),
            Self::Bimodal(bp) => bp.predict(eip, info),
            Self::TwoLevel(bp) => bp.predict(eip, info),
            Self::Combined(bp) => bp.predict(eip, info),
        }
    }

    #[inline(always)]
    fn update(&mut self, info: &PredictionInfo, taken: bool) {
        match self {
            Self::Static(bp) => bp.update(info, taken),
            Self::Bimodal(bp) => bp.update(info, taken),
            Self::TwoLevel(bp) => bp.update(info, taken),
            Self::Combined(bp) => bp.update(info, taken),
        }
    }
}

/// Per-thread branch prediction unit.
#[derive(Clone, Debug)]
pub struct BranchUnit {
    kind: BranchPredictorKind,
    btb: Btb,
    ras: Ras,
    direction: DirectionPredictorWrapper,
}

impl BranchUnit {
    /// Creates a branch unit from the (validated) configuration.
    pub fn new(config: &BranchPredictorConfig) -> Self {
        Self {
            kind: config.kind,
            btb: Btb::new(config.btb_sets, config.btb_assoc),
            ras: Ras::new(config.ras_size),
            direction: DirectionPredictorWrapper::new(config),
        }
    }

    /// Branch target buffer, for inspection.
    pub const fn btb(&self) -> &Btb {
        &self.btb
    }

    /// Predicts the target of the control micro-op `uop` at fetch.
    ///
    /// A BTB hit on a call pushes the return address, and a hit on a return
    /// replaces the target with the popped RAS entry. The RAS is only touched
    /// by non-speculative micro-ops so that recovery never has to repair it.
    pub fn btb_lookup(&mut self, uop: &Uop) -> Option<u64> {
        if self.kind == BranchPredictorKind::Perfect {
            return Some(if uop.taken() { uop.neip } else { uop.target_neip });
        }

        let mut target = self.btb.lookup(uop.eip)?;
        if !uop.specmode {
            match uop.opcode() {
                Opcode::Call => self.ras.push(uop.eip + u64::from(uop.mop_size)),
                Opcode::Ret => target = self.ras.pop(),
                _ => {}
            }
        }
        Some(target)
    }

    /// Predicts the direction of the control micro-op `uop` at fetch.
    ///
    /// Unconditional transfers are always predicted taken. The consulted
    /// table entries are recorded in `uop.prediction` for training at commit.
    pub fn lookup(&self, uop: &mut Uop) -> bool {
        let taken = if uop.opcode().is_uncond() {
            true
        } else {
            match self.kind {
                BranchPredictorKind::Perfect => uop.taken(),
                _ => self.direction.predict(uop.eip, &mut uop.prediction),
            }
        };
        uop.prediction.taken = taken;
        taken
    }

    /// Trains the direction tables with the outcome of a committed branch.
    pub fn update(&mut self, uop: &Uop) {
        debug_assert!(!uop.specmode, "training with a speculative branch");
        if uop.opcode().is_cond() && self.kind != BranchPredictorKind::Perfect {
            self.direction.update(&uop.prediction, uop.taken());
        }
    }

    /// Records the target of a committed control micro-op in the BTB.
    ///
    /// Taken transfers store the address actually reached; not-taken branches
    /// store their decoded target so a later taken instance can hit.
    pub fn btb_update(&mut self, uop: &Uop) {
        debug_assert!(!uop.specmode, "training with a speculative branch");
        let target = if uop.taken() {
            uop.neip
        } else {
            uop.target_neip
        };
        if target != 0 {
            self.btb.update(uop.eip, target);
        }
    }
}
