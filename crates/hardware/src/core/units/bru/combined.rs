//! Combined Branch Predictor.
//!
//! A hybrid predictor that employs a choice table of 2-bit counters to select
//! between a bimodal and a two-level component. The choice counter only moves
//! when the components disagree, towards whichever one was right.

use super::bimodal::BimodalPredictor;
use super::branch_predictor::train_counter;
use super::two_level::TwoLevelPredictor;
use super::{DirectionPredictor, PredictionInfo};

/// Combined predictor structure.
#[derive(Clone, Debug)]
pub struct CombinedPredictor {
    /// Bimodal component.
    bimodal: BimodalPredictor,
    /// Two-level component.
    two_level: TwoLevelPredictor,
    /// Choice counters; above 1 selects the two-level component.
    choice: Vec<u8>,
}

impl CombinedPredictor {
    /// Creates a combined predictor from its components and a choice table size.
    pub fn new(bimodal: BimodalPredictor, two_level: TwoLevelPredictor, choice_size: usize) -> Self {
        Self {
            bimodal,
            two_level,
            choice: vec![1; choice_size],
        }
    }
}

impl DirectionPredictor for CombinedPredictor {
    fn predict(&self, eip: u64, info: &mut PredictionInfo) -> bool {
        let bimod = self.bimodal.predict(eip, info);
        let two_level = self.two_level.predict(eip, info);
        info.choice_index = eip as usize & (self.choice.len() - 1);
        info.choice_pred = self.choice[info.choice_index] > 1;
        if info.choice_pred { two_level } else { bimod }
    }

    fn update(&mut self, info: &PredictionInfo, taken: bool) {
        self.bimodal.update(info, taken);
        self.two_level.update(info, taken);
        if info.bimod_pred != info.twolevel_pred {
            train_counter(&mut self.choice[info.choice_index], info.twolevel_pred == taken);
        }
    }
}
