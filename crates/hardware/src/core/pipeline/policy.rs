//! Thread selection for pipeline stages.
//!
//! A stage that serves several hardware threads describes its per-thread work
//! through [`StageWorker`]; [`SharingPolicy::run`] decides which threads are
//! served this cycle and with how much of the stage width.
//!
//! * **Shared:** the width is pulled from all threads round-robin, starting
//!   after the last serviced thread. Each turn serves at most `turn` items.
//!   The loop ends when the width is used up or every thread in a row
//!   yielded nothing.
//! * **TimeSlice:** one thread receives the full width. Selection advances
//!   round-robin past threads that are not eligible or consume nothing.

use crate::config::SharingPolicy;

/// Per-thread work of one pipeline stage.
pub trait StageWorker {
    /// Returns true if `thread` has work the stage could attempt.
    fn eligible(&self, thread: usize) -> bool;

    /// Serves up to `quota` items of `thread`; returns how many were consumed.
    fn service(&mut self, thread: usize, quota: usize) -> usize;
}

impl SharingPolicy {
    /// Runs one cycle of a stage of `width` over `threads` threads.
    ///
    /// `current` is the last serviced thread and is updated in place. Returns
    /// the number of items consumed.
    pub fn run<W: StageWorker + ?Sized>(
        self,
        current: &mut usize,
        threads: usize,
        width: usize,
        turn: usize,
        worker: &mut W,
    ) -> usize {
        if threads == 0 {
            return 0;
        }
        match self {
            Self::Shared => {
                let mut quantum = width;
                let mut skip = threads;
                while quantum > 0 && skip > 0 {
                    *current = (*current + 1) % threads;
                    let done = if worker.eligible(*current) {
                        worker.service(*current, quantum.min(turn.max(1)))
                    } else {
                        0
                    };
                    if done > 0 {
                        quantum -= done.min(quantum);
                        skip = threads;
                    } else {
                        skip -= 1;
                    }
                }
                width - quantum
            }
            Self::TimeSlice => {
                for _ in 0..threads {
                    *current = (*current + 1) % threads;
                    if worker.eligible(*current) {
                        let done = worker.service(*current, width);
                        if done > 0 {
                            return done;
                        }
                    }
                }
                0
            }
        }
    }
}
