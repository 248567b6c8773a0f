//! Physical Register File and Register Alias Table.
//!
//! Each hardware thread owns one `RegFile` holding three independent pools
//! (integer, floating-point, XMM). Every pool has:
//! 1. **Physical registers:** A `busy` reference count and a `pending` bit.
//! 2. **Free list:** A stack of registers whose `busy` count is zero.
//! 3. **RAT:** One physical register per logical register of the class.
//!
//! Condition flags are renamed inside the integer pool, and all flag outputs
//! of one micro-op share a single physical register: the register of the
//! first integer output, or a fresh one when the micro-op writes no integer
//! register. Floating-point operands are stack-relative and are translated
//! through the rotating top-of-stack before every RAT access.
//!
//! Admission (whether a micro-op may be renamed) is decided by the owning core,
//! which knows whether pools are private or shared; allocation itself never
//! fails under that protocol.

use serde::Serialize;

use crate::common::{ArchLayout, Dep, MAX_ODEPS, RegClass};
use crate::core::uop::{Opcode, RegDemand, Uinst, Uop};

/// State of one physical register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhysReg {
    /// Number of logical names (RAT entries and in-flight old mappings) aliasing it.
    pub busy: u32,
    /// A producer has been renamed onto it and has not written back yet.
    pub pending: bool,
}

/// Access counters of one register class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegClassStats {
    /// RAT lookups for input operands.
    pub rat_reads: u64,
    /// RAT updates for output operands.
    pub rat_writes: u64,
    /// Physical register reads at issue.
    pub reads: u64,
    /// Physical register writes at writeback.
    pub writes: u64,
}

#[derive(Clone, Debug)]
struct ClassFile {
    class: RegClass,
    regs: Vec<PhysReg>,
    free: Vec<usize>,
    rat: Vec<usize>,
}

impl ClassFile {
    fn new(class: RegClass, size: usize, logical: usize) -> Self {
        Self {
            class,
            regs: vec![PhysReg::default(); size],
            // Reversed so that register 0 is handed out first.
            free: (0..size).rev().collect(),
            rat: vec![0; logical],
        }
    }

    fn allocate(&mut self) -> usize {
        let Some(reg) = self.free.pop() else {
            panic!(
                "{} free list empty: rename attempted without admission",
                self.class
            );
        };
        let state = self.regs[reg];
        assert!(
            state.busy == 0 && !state.pending,
            "{} p{reg} on free list while in use",
            self.class
        );
        reg
    }

    fn release_ref(&mut self, reg: usize) {
        let class = self.class;
        let capacity = self.regs.len();
        let state = &mut self.regs[reg];
        assert!(state.busy > 0, "{class} p{reg} released while not busy");
        state.busy -= 1;
        if state.busy == 0 {
            assert!(!state.pending, "{class} p{reg} freed with a pending write");
            assert!(self.free.len() < capacity, "{class} free list overflow");
            self.free.push(reg);
        }
    }
}

/// Per-thread physical register file with its rename tables.
#[derive(Clone, Debug)]
pub struct RegFile {
    layout: ArchLayout,
    files: [ClassFile; 3],
    fp_top: usize,
    stats: [RegClassStats; 3],
}

impl RegFile {
    /// Creates a register file with `sizes[class.index()]` physical registers
    /// per class and the initial one-to-one mapping of logical registers.
    ///
    /// Every flag maps to the first integer register allocated, whose `busy`
    /// count is incremented once per flag.
    ///
    /// # Panics
    ///
    /// Panics if a pool is smaller than its logical register count.
    pub fn new(layout: ArchLayout, sizes: [usize; 3]) -> Self {
        let mut files = RegClass::ALL.map(|class| {
            ClassFile::new(
                class,
                sizes[class.index()],
                layout.logical_count(class),
            )
        });

        let int = &mut files[RegClass::Int.index()];
        let mut first = None;
        for slot in 0..layout.int_regs {
            let reg = int.allocate();
            int.regs[reg].busy += 1;
            int.rat[slot] = reg;
            let _ = first.get_or_insert(reg);
        }
        if layout.flag_regs > 0 {
            let host = first.unwrap_or_else(|| int.allocate());
            for slot in layout.int_regs..layout.int_regs + layout.flag_regs {
                int.regs[host].busy += 1;
                int.rat[slot] = host;
            }
        }

        for class in [RegClass::Fp, RegClass::Xmm] {
            let file = &mut files[class.index()];
            for slot in 0..layout.logical_count(class) {
                let reg = file.allocate();
                file.regs[reg].busy += 1;
                file.rat[slot] = reg;
            }
        }

        Self {
            layout,
            files,
            fp_top: 0,
            stats: [RegClassStats::default(); 3],
        }
    }

    /// Physical registers needed to rename a micro-instruction, per class.
    ///
    /// Flags add one integer register only when there is no integer output
    /// for them to share.
    pub fn demand(uinst: &Uinst) -> RegDemand {
        let mut demand = RegDemand::default();
        let mut flags = false;
        for dep in uinst.outputs() {
            match dep {
                Dep::Int(_) => demand.int += 1,
                Dep::Flag(_) => flags = true,
                Dep::Fp(_) => demand.fp += 1,
                Dep::Xmm(_) => demand.xmm += 1,
            }
        }
        if flags && demand.int == 0 {
            demand.int = 1;
        }
        demand
    }

    /// Architectural layout the RAT is sized for.
    pub const fn layout(&self) -> &ArchLayout {
        &self.layout
    }

    /// Total physical registers of a class.
    pub fn size(&self, class: RegClass) -> usize {
        self.files[class.index()].regs.len()
    }

    /// Registers of a class currently off the free list.
    pub fn allocated(&self, class: RegClass) -> usize {
        let file = &self.files[class.index()];
        file.regs.len() - file.free.len()
    }

    /// Registers of a class on the free list.
    pub fn free_count(&self, class: RegClass) -> usize {
        self.files[class.index()].free.len()
    }

    /// State of one physical register.
    pub fn phys(&self, class: RegClass, reg: usize) -> PhysReg {
        self.files[class.index()].regs[reg]
    }

    /// Returns true if `reg` is on the free list of `class`.
    pub fn is_free(&self, class: RegClass, reg: usize) -> bool {
        self.files[class.index()].free.contains(&reg)
    }

    /// Current physical mapping of a logical operand.
    pub fn mapping(&self, dep: Dep) -> usize {
        self.files[dep.class().index()].rat[self.slot(dep)]
    }

    /// Current floating-point top-of-stack index.
    pub const fn fp_top(&self) -> usize {
        self.fp_top
    }

    /// Access counters of a class.
    pub const fn stats(&self, class: RegClass) -> RegClassStats {
        self.stats[class.index()]
    }

    /// Applies a push or pop of the floating-point stack.
    fn rotate(&mut self, uinst: &Uinst, undo: bool) {
        let depth = self.layout.fp_stack_depth;
        if depth == 0 {
            return;
        }
        let pop = match uinst.opcode {
            Opcode::FpPop => true,
            Opcode::FpPush => false,
            _ => return,
        };
        self.fp_top = if pop != undo {
            (self.fp_top + 1) % depth
        } else {
            (self.fp_top + depth - 1) % depth
        };
    }

    /// RAT index of a logical operand.
    fn slot(&self, dep: Dep) -> usize {
        match dep {
            Dep::Int(i) | Dep::Xmm(i) => usize::from(i),
            Dep::Flag(i) => self.layout.int_regs + usize::from(i),
            Dep::Fp(i) => (usize::from(i) + self.fp_top) % self.layout.fp_stack_depth,
        }
    }

    /// Renames `uop`: records input mappings and allocates its outputs.
    ///
    /// Each non-flag output gets a fresh register (busy 1, pending) and the
    /// previous mapping is saved in `ph_oodep`. Flag outputs all alias one
    /// register, whose `busy` count grows by one per flag.
    pub fn rename(&mut self, uop: &mut Uop) {
        self.rotate(&uop.uinst, false);

        for (i, dep) in uop.uinst.idep.iter().enumerate() {
            uop.ph_idep[i] = None;
            if let Some(dep) = *dep {
                self.stats[dep.class().index()].rat_reads += 1;
                uop.ph_idep[i] = Some(self.mapping(dep));
            }
        }

        let mut flag_host = None;
        for i in 0..MAX_ODEPS {
            let Some(dep) = uop.uinst.odep[i] else {
                uop.ph_odep[i] = None;
                uop.ph_oodep[i] = None;
                continue;
            };
            if dep.is_flag() {
                continue;
            }
            let class = dep.class();
            let slot = self.slot(dep);
            let file = &mut self.files[class.index()];
            let reg = file.allocate();
            file.regs[reg].busy += 1;
            file.regs[reg].pending = true;
            uop.ph_oodep[i] = Some(file.rat[slot]);
            uop.ph_odep[i] = Some(reg);
            file.rat[slot] = reg;
            self.stats[class.index()].rat_writes += 1;
            if class == RegClass::Int && flag_host.is_none() {
                flag_host = Some(reg);
            }
        }

        if uop.uinst.outputs().any(Dep::is_flag) {
            let int = RegClass::Int.index();
            let host = match flag_host {
                Some(reg) => reg,
                None => self.files[int].allocate(),
            };
            for i in 0..MAX_ODEPS {
                let Some(dep) = uop.uinst.odep[i].filter(|d| d.is_flag()) else {
                    continue;
                };
                let slot = self.slot(dep);
                let file = &mut self.files[int];
                file.regs[host].busy += 1;
                file.regs[host].pending = true;
                uop.ph_oodep[i] = Some(file.rat[slot]);
                uop.ph_odep[i] = Some(host);
                file.rat[slot] = host;
                self.stats[int].rat_writes += 1;
            }
        }
    }

    /// Returns true if no input of `uop` waits on a pending register.
    pub fn is_ready(&self, uop: &Uop) -> bool {
        uop.uinst
            .idep
            .iter()
            .zip(uop.ph_idep)
            .all(|(dep, phys)| match (dep, phys) {
                (Some(dep), Some(reg)) => !self.files[dep.class().index()].regs[reg].pending,
                _ => true,
            })
    }

    /// Counts the physical register reads of an issuing micro-op.
    pub fn record_reads(&mut self, uop: &Uop) {
        for dep in uop.uinst.inputs() {
            self.stats[dep.class().index()].reads += 1;
        }
    }

    /// Marks the outputs of `uop` as produced.
    pub fn write(&mut self, uop: &Uop) {
        for (dep, phys) in uop.uinst.odep.iter().zip(uop.ph_odep) {
            if let (Some(dep), Some(reg)) = (dep, phys) {
                let class = dep.class().index();
                self.files[class].regs[reg].pending = false;
                self.stats[class].writes += 1;
            }
        }
    }

    /// Reverts the renaming of a speculative micro-op.
    ///
    /// Outputs are walked in reverse so that a logical register written twice
    /// by the same micro-op ends up at its original mapping.
    ///
    /// # Panics
    ///
    /// Panics if `uop` is not speculative or still has a pending output.
    pub fn undo(&mut self, uop: &Uop) {
        assert!(uop.specmode, "undo of non-speculative uop {}", uop.id);
        for i in (0..MAX_ODEPS).rev() {
            let Some(dep) = uop.uinst.odep[i] else {
                continue;
            };
            let (Some(reg), Some(old)) = (uop.ph_odep[i], uop.ph_oodep[i]) else {
                panic!("undo of unrenamed uop {}", uop.id);
            };
            let slot = self.slot(dep);
            let file = &mut self.files[dep.class().index()];
            assert!(
                !file.regs[reg].pending,
                "undo of uop {} before its writeback",
                uop.id
            );
            file.release_ref(reg);
            file.rat[slot] = old;
            assert!(file.regs[old].busy > 0, "restored mapping p{old} is free");
        }
        self.rotate(&uop.uinst, true);
    }

    /// Releases the mappings a committing micro-op made obsolete.
    ///
    /// The new mappings stay busy: they are the architectural state now.
    ///
    /// # Panics
    ///
    /// Panics if `uop` is speculative.
    pub fn commit(&mut self, uop: &Uop) {
        assert!(!uop.specmode, "commit of speculative uop {}", uop.id);
        for (dep, old) in uop.uinst.odep.iter().zip(uop.ph_oodep) {
            if let (Some(dep), Some(old)) = (dep, old) {
                self.files[dep.class().index()].release_ref(old);
            }
        }
    }

    /// Checks the structural invariants against the renamed, uncommitted
    /// micro-ops of this thread.
    ///
    /// # Panics
    ///
    /// Panics on the first violation: a free register that is busy or
    /// pending, a RAT entry or in-flight mapping pointing at a free register,
    /// or a reference total that differs from RAT entries plus in-flight outputs.
    pub fn check_integrity<'a>(&self, in_flight: impl IntoIterator<Item = &'a Uop>) {
        let mut outputs = [0u64; 3];
        for uop in in_flight {
            for ((dep, new), old) in uop.uinst.odep.iter().zip(uop.ph_odep).zip(uop.ph_oodep) {
                let (Some(dep), Some(new), Some(old)) = (dep, new, old) else {
                    continue;
                };
                let file = &self.files[dep.class().index()];
                assert!(file.regs[new].busy > 0, "uop {} maps to free p{new}", uop.id);
                assert!(file.regs[old].busy > 0, "uop {} holds free p{old}", uop.id);
                outputs[dep.class().index()] += 1;
            }
        }

        for file in &self.files {
            let class = file.class;
            for &reg in &file.free {
                let state = file.regs[reg];
                assert!(
                    state.busy == 0 && !state.pending,
                    "{class} p{reg} free but busy={} pending={}",
                    state.busy,
                    state.pending
                );
            }
            for (slot, &reg) in file.rat.iter().enumerate() {
                assert!(
                    file.regs[reg].busy > 0,
                    "{class} logical {slot} maps to free p{reg}"
                );
            }
            let in_use = file.regs.iter().filter(|r| r.busy > 0).count();
            assert_eq!(
                in_use + file.free.len(),
                file.regs.len(),
                "{class} registers lost"
            );
            let references: u64 = file.regs.iter().map(|r| u64::from(r.busy)).sum();
            assert_eq!(
                references,
                file.rat.len() as u64 + outputs[class.index()],
                "{class} reference count mismatch"
            );
        }
    }
}
