//! Return Address Stack (RAS).
//!
//! The RAS is a specialized predictor for function return addresses. It is a
//! circular buffer: pushes past capacity overwrite the oldest entry, and pops
//! on an empty stack wrap around and return whatever the slot holds.

/// Return Address Stack structure.
#[derive(Clone, Debug)]
pub struct Ras {
    /// The stack storage.
    stack: Vec<u64>,
    /// Index of the next slot to write.
    index: usize,
}

impl Ras {
    /// Creates a new Return Address Stack with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            stack: vec![0; capacity],
            index: 0,
        }
    }

    /// Pushes a return address, overwriting the oldest entry when full.
    ///
    /// # Arguments
    ///
    /// * `addr` - The return address to push.
    pub fn push(&mut self, addr: u64) {
        self.stack[self.index] = addr;
        self.index = (self.index + 1) % self.stack.len();
    }

    /// Pops the most recently pushed return address.
    ///
    /// # Returns
    ///
    /// The address in the popped slot; zero if that slot was never written.
    pub fn pop(&mut self) -> u64 {
        self.index = (self.index + self.stack.len() - 1) % self.stack.len();
        self.stack[self.index]
    }

    /// Peeks at the most recently pushed return address.
    pub fn top(&self) -> u64 {
        self.stack[(self.index + self.stack.len() - 1) % self.stack.len()]
    }
}
