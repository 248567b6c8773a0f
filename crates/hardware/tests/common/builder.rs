use o3sim_core::common::Dep;
use o3sim_core::core::uop::{MacroInst, Opcode, Uinst};
use o3sim_core::sim::trace::{ContextTrace, TraceDocument, TraceWorkload};

/// Builds the correct-path instruction stream of one context.
///
/// Instructions are laid out back to back from the start address unless a
/// control transfer redirects the stream.
pub struct TraceBuilder {
    id: usize,
    affinity: Option<Vec<usize>>,
    pc: u64,
    insts: Vec<MacroInst>,
}

impl TraceBuilder {
    pub fn new(id: usize, start: u64) -> Self {
        Self {
            id,
            affinity: None,
            pc: start,
            insts: Vec::new(),
        }
    }

    pub fn affinity(mut self, nodes: &[usize]) -> Self {
        self.affinity = Some(nodes.to_vec());
        self
    }

    /// Appends a macro-instruction that falls through.
    pub fn inst(mut self, size: u32, uinsts: Vec<Uinst>) -> Self {
        let addr = self.pc;
        self.pc += u64::from(size);
        self.insts.push(MacroInst {
            addr,
            size,
            uinsts,
            next_addr: self.pc,
            target_addr: 0,
        });
        self
    }

    /// Appends `dst = dst + src` with flag output.
    pub fn add(self, dst: u8, src: u8) -> Self {
        self.inst(
            3,
            vec![
                Uinst::new(Opcode::Add)
                    .with_idep(Dep::Int(dst))
                    .with_idep(Dep::Int(src))
                    .with_odep(Dep::Int(dst))
                    .with_odep(Dep::Flag(0)),
            ],
        )
    }

    /// Appends a load of `dst` from `addr`.
    pub fn load(self, dst: u8, base: u8, addr: u64) -> Self {
        self.inst(
            4,
            vec![
                Uinst::new(Opcode::EffAddr)
                    .with_idep(Dep::Int(base))
                    .with_odep(Dep::Int(16)),
                Uinst::new(Opcode::Load)
                    .with_idep(Dep::Int(16))
                    .with_odep(Dep::Int(dst))
                    .with_address(addr, 4),
            ],
        )
    }

    /// Appends a store of `src` to `addr`.
    pub fn store(self, src: u8, addr: u64) -> Self {
        self.inst(
            4,
            vec![
                Uinst::new(Opcode::Store)
                    .with_idep(Dep::Int(src))
                    .with_address(addr, 4),
            ],
        )
    }

    /// Appends a taken jump to `target`.
    pub fn jump(mut self, target: u64) -> Self {
        let addr = self.pc;
        self.insts.push(MacroInst {
            addr,
            size: 2,
            uinsts: vec![Uinst::new(Opcode::Jump)],
            next_addr: target,
            target_addr: target,
        });
        self.pc = target;
        self
    }

    pub fn build(self) -> ContextTrace {
        ContextTrace {
            id: self.id,
            affinity: self.affinity,
            insts: self.insts,
        }
    }
}

/// Builds a workload from several context traces.
pub fn workload(contexts: Vec<ContextTrace>) -> TraceWorkload {
    TraceWorkload::new(TraceDocument { contexts }).unwrap()
}
