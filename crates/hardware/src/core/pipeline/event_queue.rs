//! Completion event queue.
//!
//! Issued register micro-ops wait here until their functional unit latency has
//! elapsed. Events are ordered by completion cycle, then by program order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::core::uop::UopHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Event {
    when: u64,
    id: u64,
    uop: UopHandle,
}

/// Per-core queue of scheduled completions.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `uop` (program-order `id`) to complete at cycle `when`.
    pub fn insert(&mut self, when: u64, id: u64, uop: UopHandle) {
        self.heap.push(Reverse(Event { when, id, uop }));
    }

    /// Pops the next micro-op whose completion cycle is not after `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<UopHandle> {
        match self.heap.peek() {
            Some(Reverse(event)) if event.when <= now => {
                self.heap.pop().map(|Reverse(event)| event.uop)
            }
            _ => None,
        }
    }

    /// Drops every event whose micro-op fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(UopHandle) -> bool) {
        self.heap.retain(|Reverse(event)| keep(event.uop));
    }

    /// Number of scheduled completions.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Scheduled micro-ops, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = UopHandle> + '_ {
        self.heap.iter().map(|Reverse(event)| event.uop)
    }
}
