//! Trace-driven functional model.
//!
//! A [`TraceWorkload`] replays, for every context, the correct-path sequence
//! of macro-instructions recorded in a JSON document:
//!
//! ```json
//! {
//!   "contexts": [
//!     {
//!       "id": 0,
//!       "affinity": [0],
//!       "insts": [
//!         { "addr": 4096, "size": 3, "next_addr": 4099,
//!           "uinsts": [{ "opcode": "Add", "idep": [{ "Int": 0 }], "odep": [{ "Int": 0 }] }] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Fetching at the address the trace continues at consumes the next recorded
//! instruction. Fetching anywhere else enters speculative mode: until
//! recovery the context replays the instruction recorded at the requested
//! address, or a one-micro-op filler if the trace never visits it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{ArchLayout, SimError};
use crate::core::uop::{MacroInst, Opcode, Uinst};
use crate::sim::traits::{ContextStatus, FunctionalModel};

/// Encoded size of the filler instruction returned on unknown wrong paths.
pub const FILLER_SIZE: u32 = 4;

/// Recorded execution of one context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTrace {
    /// Context id, unique within the document.
    pub id: usize,
    /// Nodes the context may run on; all nodes when absent.
    #[serde(default)]
    pub affinity: Option<Vec<usize>>,
    /// Correct-path macro-instructions in execution order.
    pub insts: Vec<MacroInst>,
}

/// Top-level trace document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDocument {
    /// Contexts of the workload.
    pub contexts: Vec<ContextTrace>,
}

#[derive(Clone, Debug)]
struct ContextState {
    trace: ContextTrace,
    statics: HashMap<u64, usize>,
    pos: usize,
    spec: bool,
    spec_executed: u64,
}

impl ContextState {
    fn new(trace: ContextTrace) -> Self {
        let mut statics = HashMap::new();
        for (i, inst) in trace.insts.iter().enumerate() {
            let _ = statics.entry(inst.addr).or_insert(i);
        }
        Self {
            trace,
            statics,
            pos: 0,
            spec: false,
            spec_executed: 0,
        }
    }

    fn next_addr(&self) -> u64 {
        match self.trace.insts.get(self.pos) {
            Some(inst) => inst.addr,
            None => self.trace.insts.last().map_or(0, |inst| inst.next_addr),
        }
    }

    fn wrong_path(&self, addr: u64) -> MacroInst {
        match self.statics.get(&addr) {
            Some(&i) => self.trace.insts[i].clone(),
            None => MacroInst {
                addr,
                size: FILLER_SIZE,
                uinsts: vec![Uinst::new(Opcode::Nop)],
                next_addr: addr + u64::from(FILLER_SIZE),
                target_addr: 0,
            },
        }
    }
}

/// Functional model replaying recorded correct-path traces.
#[derive(Clone, Debug, Default)]
pub struct TraceWorkload {
    contexts: BTreeMap<usize, ContextState>,
}

impl TraceWorkload {
    /// Builds a workload from a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Trace`] for duplicate context ids, zero-sized
    /// instructions, or a recorded path that does not continue where the
    /// previous instruction said it would.
    pub fn new(document: TraceDocument) -> Result<Self, SimError> {
        let mut contexts = BTreeMap::new();
        for trace in document.contexts {
            for pair in trace.insts.windows(2) {
                if pair[0].next_addr != pair[1].addr {
                    return Err(SimError::Trace(format!(
                        "context {}: instruction at {:#x} continues at {:#x}, trace resumes at {:#x}",
                        trace.id, pair[0].addr, pair[0].next_addr, pair[1].addr
                    )));
                }
            }
            if let Some(inst) = trace.insts.iter().find(|inst| inst.size == 0) {
                return Err(SimError::Trace(format!(
                    "context {}: zero-sized instruction at {:#x}",
                    trace.id, inst.addr
                )));
            }
            let id = trace.id;
            if contexts.insert(id, ContextState::new(trace)).is_some() {
                return Err(SimError::Trace(format!("duplicate context id {id}")));
            }
        }
        Ok(Self { contexts })
    }

    /// Parses a JSON trace document.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TraceParse`] for malformed JSON and any error of
    /// [`TraceWorkload::new`].
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let document: TraceDocument = serde_json::from_str(json).map_err(SimError::TraceParse)?;
        Self::new(document)
    }

    /// Reads and parses a JSON trace file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Io`] if the file cannot be read and any error of
    /// [`TraceWorkload::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks every register operand against the architectural layout.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Trace`] naming the first operand outside `layout`.
    pub fn check_operands(&self, layout: &ArchLayout) -> Result<(), SimError> {
        for (&id, ctx) in &self.contexts {
            for inst in &ctx.trace.insts {
                let deps = inst
                    .uinsts
                    .iter()
                    .flat_map(|u| u.inputs().chain(u.outputs()));
                if let Some(dep) = deps.into_iter().find(|&dep| !layout.contains(dep)) {
                    return Err(SimError::Trace(format!(
                        "context {id}: operand {dep} of instruction at {:#x} is outside the register layout",
                        inst.addr
                    )));
                }
            }
        }
        Ok(())
    }

    /// Correct-path instructions of `ctx` executed so far.
    pub fn executed(&self, ctx: usize) -> usize {
        self.contexts.get(&ctx).map_or(0, |c| c.pos)
    }

    /// Wrong-path instructions of `ctx` executed so far.
    pub fn spec_executed(&self, ctx: usize) -> u64 {
        self.contexts.get(&ctx).map_or(0, |c| c.spec_executed)
    }

    /// Recorded correct-path length of `ctx`.
    pub fn trace_len(&self, ctx: usize) -> usize {
        self.contexts.get(&ctx).map_or(0, |c| c.trace.insts.len())
    }
}

impl FunctionalModel for TraceWorkload {
    fn contexts(&self) -> Vec<usize> {
        self.contexts.keys().copied().collect()
    }

    fn status(&self, ctx: usize) -> ContextStatus {
        match self.contexts.get(&ctx) {
            Some(c) if c.pos < c.trace.insts.len() => ContextStatus::Running,
            _ => ContextStatus::Finished,
        }
    }

    fn affinity(&self, ctx: usize) -> Option<Vec<usize>> {
        self.contexts.get(&ctx).and_then(|c| c.trace.affinity.clone())
    }

    fn execute(&mut self, ctx: usize, addr: u64) -> Option<MacroInst> {
        let c = self.contexts.get_mut(&ctx)?;
        if !c.spec && addr == c.next_addr() {
            let inst = c.trace.insts.get(c.pos)?.clone();
            c.pos += 1;
            return Some(inst);
        }
        if !c.spec {
            tracing::trace!(ctx, addr = format_args!("{addr:#x}"), "entering speculative mode");
        }
        c.spec = true;
        c.spec_executed += 1;
        Some(c.wrong_path(addr))
    }

    fn in_spec_mode(&self, ctx: usize) -> bool {
        self.contexts.get(&ctx).is_some_and(|c| c.spec)
    }

    fn recover(&mut self, ctx: usize) {
        if let Some(c) = self.contexts.get_mut(&ctx) {
            c.spec = false;
        }
    }

    fn next_addr(&self, ctx: usize) -> u64 {
        self.contexts.get(&ctx).map_or(0, ContextState::next_addr)
    }
}
