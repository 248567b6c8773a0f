//! Direction Predictor Interface.
//!
//! This module defines the `DirectionPredictor` trait that every direction
//! predictor implements. Prediction records which table entries it consulted in
//! a [`PredictionInfo`] carried by the micro-op, so that training at commit
//! updates exactly the entries used at fetch even if the tables moved on.

use super::PredictionInfo;

/// Trait for branch direction prediction algorithms.
pub trait DirectionPredictor {
    /// Predicts whether the conditional branch at `eip` is taken.
    ///
    /// # Arguments
    ///
    /// * `eip` - Address of the branch instruction.
    /// * `info` - Receives the indices and component predictions consulted.
    fn predict(&self, eip: u64, info: &mut PredictionInfo) -> bool;

    /// Trains the entries recorded in `info` with the resolved direction.
    ///
    /// Called only for non-speculative branches, at commit.
    fn update(&mut self, info: &PredictionInfo, taken: bool);
}

/// Moves a 2-bit saturating counter towards the resolved direction.
#[inline]
pub(super) fn train_counter(counter: &mut u8, taken: bool) {
    if taken {
        if *counter < 3 {
            *counter += 1;
        }
    } else if *counter > 0 {
        *counter -= 1;
    }
}
