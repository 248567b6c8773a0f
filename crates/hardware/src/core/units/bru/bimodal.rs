//! Bimodal Branch Predictor.
//!
//! A table of 2-bit saturating counters indexed by the low bits of the branch
//! address. Counters above 1 predict taken.

use super::branch_predictor::train_counter;
use super::{DirectionPredictor, PredictionInfo};

/// Bimodal predictor structure.
#[derive(Clone, Debug)]
pub struct BimodalPredictor {
    /// 2-bit counters.
    table: Vec<u8>,
}

impl BimodalPredictor {
    /// Creates a predictor with `size` counters, all weakly not-taken.
    ///
    /// `size` must be a power of 2.
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![1; size],
        }
    }

    /// Counter value at `index`, for inspection.
    pub fn counter(&self, index: usize) -> u8 {
        self.table[index]
    }
}

impl DirectionPredictor for BimodalPredictor {
    fn predict(&self, eip: u64, info: &mut PredictionInfo) -> bool {
        info.bimod_index = eip as usize & (self.table.len() - 1);
        info.bimod_pred = self.table[info.bimod_index] > 1;
        info.bimod_pred
    }

    fn update(&mut self, info: &PredictionInfo, taken: bool) {
        train_counter(&mut self.table[info.bimod_index], taken);
    }
}
