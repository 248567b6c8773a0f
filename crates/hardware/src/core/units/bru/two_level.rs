//! Two-Level Adaptive Branch Predictor.
//!
//! The first level is a branch history table (BHT) of per-address shift
//! registers holding the last `history_size` outcomes. The history selects a row
//! of the second-level pattern history table (PHT); the branch address selects
//! the column. With a first level of size 1 this degenerates to a global-history
//! predictor (GAp); larger first levels give per-address histories (PAp).

use super::branch_predictor::train_counter;
use super::{DirectionPredictor, PredictionInfo};

/// Two-level adaptive predictor structure.
#[derive(Clone, Debug)]
pub struct TwoLevelPredictor {
    /// Level 1: history shift registers.
    bht: Vec<u32>,
    /// Level 2: 2-bit counters, `1 << history_size` rows of `l2_size` columns.
    pht: Vec<u8>,
    /// Number of PHT columns.
    l2_size: usize,
    /// Bits of history kept per BHT entry.
    history_size: u32,
}

impl TwoLevelPredictor {
    /// Creates a two-level predictor.
    ///
    /// # Arguments
    ///
    /// * `l1_size` - Number of BHT entries. Must be a power of 2.
    /// * `l2_size` - Number of PHT columns. Must be a power of 2.
    /// * `history_size` - History bits per BHT entry.
    pub fn new(l1_size: usize, l2_size: usize, history_size: u32) -> Self {
        Self {
            bht: vec![0; l1_size],
            pht: vec![1; l2_size << history_size],
            l2_size,
            history_size,
        }
    }

    /// History register at `index`, for inspection.
    pub fn history(&self, index: usize) -> u32 {
        self.bht[index]
    }
}

impl DirectionPredictor for TwoLevelPredictor {
    fn predict(&self, eip: u64, info: &mut PredictionInfo) -> bool {
        info.twolevel_bht_index = eip as usize & (self.bht.len() - 1);
        info.twolevel_pht_row = self.bht[info.twolevel_bht_index] as usize;
        info.twolevel_pht_col = eip as usize & (self.l2_size - 1);
        let idx = info.twolevel_pht_row * self.l2_size + info.twolevel_pht_col;
        info.twolevel_pred = self.pht[idx] > 1;
        info.twolevel_pred
    }

    fn update(&mut self, info: &PredictionInfo, taken: bool) {
        let mask = (1u32 << self.history_size) - 1;
        let history = &mut self.bht[info.twolevel_bht_index];
        *history = ((*history << 1) | u32::from(taken)) & mask;

        let idx = info.twolevel_pht_row * self.l2_size + info.twolevel_pht_col;
        train_counter(&mut self.pht[idx], taken);
    }
}
