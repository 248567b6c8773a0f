//! Static Branch Predictor.
//!
//! Predicts every conditional branch in one fixed direction and never learns.

use super::{DirectionPredictor, PredictionInfo};

/// Static direction predictor.
#[derive(Clone, Copy, Debug)]
pub struct StaticPredictor {
    /// Direction returned for every branch.
    taken: bool,
}

impl StaticPredictor {
    /// Creates a predictor that always answers `taken`.
    pub const fn new(taken: bool) -> Self {
        Self { taken }
    }
}

impl DirectionPredictor for StaticPredictor {
    fn predict(&self, _eip: u64, _info: &mut PredictionInfo) -> bool {
        self.taken
    }

    fn update(&mut self, _info: &PredictionInfo, _taken: bool) {}
}
