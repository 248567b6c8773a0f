//! Micro-operations.
//!
//! This module defines the unit of work that flows through the pipeline. It provides:
//! 1. **Opcodes:** The micro-instruction classes and their memory/control flags.
//! 2. **Descriptors:** `Uinst`, the static operand description produced by decode,
//!    and `MacroInst`, one decoded instruction as returned by the functional model.
//! 3. **Instances:** `Uop`, the dynamic record carrying physical operands, lifecycle
//!    flags, container membership, and timestamps.
//! 4. **Storage:** `UopArena`, per-core fixed slots with an explicit free-slot stack.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::common::{AccessId, Dep, MAX_IDEPS, MAX_ODEPS, RegClass};
use crate::core::units::bru::PredictionInfo;
use crate::core::units::fu::FuClass;

/// Micro-instruction opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// No operation.
    Nop,
    /// Register move.
    Move,
    /// Integer add.
    Add,
    /// Integer subtract.
    Sub,
    /// Integer multiply.
    Mult,
    /// Integer divide.
    Div,
    /// Effective address computation.
    EffAddr,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Bitwise not.
    Not,
    /// Shift or rotate.
    Shift,
    /// Sign extension.
    Sign,
    /// Floating-point move.
    FpMove,
    /// Floating-point sign manipulation.
    FpSign,
    /// Floating-point rounding.
    FpRound,
    /// Floating-point add.
    FpAdd,
    /// Floating-point subtract.
    FpSub,
    /// Floating-point compare.
    FpComp,
    /// Floating-point multiply.
    FpMult,
    /// Floating-point divide.
    FpDiv,
    /// Floating-point exponential.
    FpExp,
    /// Floating-point logarithm.
    FpLog,
    /// Floating-point sine.
    FpSin,
    /// Floating-point cosine.
    FpCos,
    /// Floating-point combined sine and cosine.
    FpSinCos,
    /// Floating-point tangent.
    FpTan,
    /// Floating-point arctangent.
    FpAtan,
    /// Floating-point square root.
    FpSqrt,
    /// Push onto the floating-point stack.
    FpPush,
    /// Pop from the floating-point stack.
    FpPop,
    /// Vector bitwise and.
    XmmAnd,
    /// Vector bitwise or.
    XmmOr,
    /// Vector bitwise xor.
    XmmXor,
    /// Vector bitwise not.
    XmmNot,
    /// Vector bitwise nand.
    XmmNand,
    /// Vector shift.
    XmmShift,
    /// Vector sign manipulation.
    XmmSign,
    /// Vector integer add.
    XmmAdd,
    /// Vector integer subtract.
    XmmSub,
    /// Vector integer compare.
    XmmComp,
    /// Vector integer multiply.
    XmmMult,
    /// Vector integer divide.
    XmmDiv,
    /// Vector floating-point add.
    XmmFpAdd,
    /// Vector floating-point subtract.
    XmmFpSub,
    /// Vector floating-point compare.
    XmmFpComp,
    /// Vector floating-point multiply.
    XmmFpMult,
    /// Vector floating-point divide.
    XmmFpDiv,
    /// Vector floating-point square root.
    XmmFpSqrt,
    /// Vector move.
    XmmMove,
    /// Vector shuffle.
    XmmShuf,
    /// Vector conversion.
    XmmConv,
    /// Memory load.
    Load,
    /// Memory store.
    Store,
    /// Memory prefetch hint.
    Prefetch,
    /// Procedure call.
    Call,
    /// Procedure return.
    Ret,
    /// Unconditional direct jump.
    Jump,
    /// Conditional branch.
    Branch,
    /// Conditional indirect branch.
    IBranch,
    /// System call.
    Syscall,
}

impl Opcode {
    /// Returns true for loads, stores, and prefetches.
    #[inline]
    pub const fn is_mem(self) -> bool {
        matches!(self, Self::Load | Self::Store | Self::Prefetch)
    }

    /// Returns true for control-flow micro-ops.
    #[inline]
    pub const fn is_ctrl(self) -> bool {
        matches!(
            self,
            Self::Call | Self::Ret | Self::Jump | Self::Branch | Self::IBranch
        )
    }

    /// Returns true for control-flow micro-ops that are always taken.
    #[inline]
    pub const fn is_uncond(self) -> bool {
        matches!(self, Self::Call | Self::Ret | Self::Jump)
    }

    /// Returns true for conditional control-flow micro-ops.
    #[inline]
    pub const fn is_cond(self) -> bool {
        matches!(self, Self::Branch | Self::IBranch)
    }

    /// Functional unit class required to execute this opcode.
    ///
    /// `None` means the operation needs no unit and completes in one cycle.
    pub const fn fu_class(self) -> Option<FuClass> {
        match self {
            Self::Add | Self::Sub => Some(FuClass::IntAdd),
            Self::Mult => Some(FuClass::IntMult),
            Self::Div => Some(FuClass::IntDiv),
            Self::EffAddr => Some(FuClass::EffAddr),
            Self::And | Self::Or | Self::Xor | Self::Not | Self::Shift | Self::Sign => {
                Some(FuClass::Logic)
            }
            Self::FpMove | Self::FpSign | Self::FpRound => Some(FuClass::FpSimple),
            Self::FpAdd | Self::FpSub => Some(FuClass::FpAdd),
            Self::FpComp => Some(FuClass::FpComp),
            Self::FpMult => Some(FuClass::FpMult),
            Self::FpDiv => Some(FuClass::FpDiv),
            Self::FpExp
            | Self::FpLog
            | Self::FpSin
            | Self::FpCos
            | Self::FpSinCos
            | Self::FpTan
            | Self::FpAtan
            | Self::FpSqrt => Some(FuClass::FpComplex),
            Self::XmmAnd
            | Self::XmmOr
            | Self::XmmXor
            | Self::XmmNot
            | Self::XmmNand
            | Self::XmmShift
            | Self::XmmSign
            | Self::XmmMove
            | Self::XmmShuf => Some(FuClass::XmmLogic),
            Self::XmmAdd | Self::XmmSub | Self::XmmComp => Some(FuClass::XmmIntAdd),
            Self::XmmMult => Some(FuClass::XmmIntMult),
            Self::XmmDiv => Some(FuClass::XmmIntDiv),
            Self::XmmFpAdd | Self::XmmFpSub => Some(FuClass::XmmFpAdd),
            Self::XmmFpComp => Some(FuClass::XmmFpComp),
            Self::XmmFpMult => Some(FuClass::XmmFpMult),
            Self::XmmFpDiv => Some(FuClass::XmmFpDiv),
            Self::XmmFpSqrt => Some(FuClass::XmmFpComplex),
            Self::XmmConv => Some(FuClass::XmmFpConv),
            Self::Nop
            | Self::Move
            | Self::FpPush
            | Self::FpPop
            | Self::Load
            | Self::Store
            | Self::Prefetch
            | Self::Call
            | Self::Ret
            | Self::Jump
            | Self::Branch
            | Self::IBranch
            | Self::Syscall => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static descriptor of a micro-instruction, as produced by decode.
///
/// Operand slots are filled from the front; a `None` terminates nothing and is
/// simply skipped, so descriptors built by hand may leave gaps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UinstRepr", into = "UinstRepr")]
pub struct Uinst {
    /// Operation class.
    pub opcode: Opcode,
    /// Logical input operands.
    pub idep: [Option<Dep>; MAX_IDEPS],
    /// Logical output operands.
    pub odep: [Option<Dep>; MAX_ODEPS],
    /// Physical address accessed by memory micro-ops.
    pub address: u64,
    /// Access size in bytes for memory micro-ops.
    pub size: u32,
}

impl Uinst {
    /// Creates a descriptor with no operands.
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            idep: [None; MAX_IDEPS],
            odep: [None; MAX_ODEPS],
            address: 0,
            size: 0,
        }
    }

    /// Appends a logical input operand.
    ///
    /// # Panics
    ///
    /// Panics if all `MAX_IDEPS` input slots are taken.
    #[must_use]
    pub fn with_idep(mut self, dep: Dep) -> Self {
        let slot = self.idep.iter_mut().find(|d| d.is_none());
        match slot {
            Some(slot) => *slot = Some(dep),
            None => panic!("micro-instruction has more than {MAX_IDEPS} inputs"),
        }
        self
    }

    /// Appends a logical output operand.
    ///
    /// # Panics
    ///
    /// Panics if all `MAX_ODEPS` output slots are taken.
    #[must_use]
    pub fn with_odep(mut self, dep: Dep) -> Self {
        let slot = self.odep.iter_mut().find(|d| d.is_none());
        match slot {
            Some(slot) => *slot = Some(dep),
            None => panic!("micro-instruction has more than {MAX_ODEPS} outputs"),
        }
        self
    }

    /// Sets the memory address and access size.
    #[must_use]
    pub const fn with_address(mut self, address: u64, size: u32) -> Self {
        self.address = address;
        self.size = size;
        self
    }

    /// Iterates over the present input operands.
    pub fn inputs(&self) -> impl Iterator<Item = Dep> + '_ {
        self.idep.iter().flatten().copied()
    }

    /// Iterates over the present output operands.
    pub fn outputs(&self) -> impl Iterator<Item = Dep> + '_ {
        self.odep.iter().flatten().copied()
    }
}

/// Serialized form of [`Uinst`]: operands as plain lists.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct UinstRepr {
    opcode: Opcode,
    #[serde(default)]
    idep: Vec<Dep>,
    #[serde(default)]
    odep: Vec<Dep>,
    #[serde(default)]
    address: u64,
    #[serde(default)]
    size: u32,
}

impl TryFrom<UinstRepr> for Uinst {
    type Error = String;

    fn try_from(repr: UinstRepr) -> Result<Self, Self::Error> {
        if repr.idep.len() > MAX_IDEPS {
            return Err(format!(
                "{} has {} inputs, at most {MAX_IDEPS} allowed",
                repr.opcode,
                repr.idep.len()
            ));
        }
        if repr.odep.len() > MAX_ODEPS {
            return Err(format!(
                "{} has {} outputs, at most {MAX_ODEPS} allowed",
                repr.opcode,
                repr.odep.len()
            ));
        }
        let mut uinst = Self::new(repr.opcode).with_address(repr.address, repr.size);
        for (slot, dep) in uinst.idep.iter_mut().zip(repr.idep) {
            *slot = Some(dep);
        }
        for (slot, dep) in uinst.odep.iter_mut().zip(repr.odep) {
            *slot = Some(dep);
        }
        Ok(uinst)
    }
}

impl From<Uinst> for UinstRepr {
    fn from(uinst: Uinst) -> Self {
        Self {
            opcode: uinst.opcode,
            idep: uinst.inputs().collect(),
            odep: uinst.outputs().collect(),
            address: uinst.address,
            size: uinst.size,
        }
    }
}

/// One decoded macro-instruction returned by the functional model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroInst {
    /// Address the instruction was fetched from.
    pub addr: u64,
    /// Encoded size in bytes.
    pub size: u32,
    /// Micro-instructions in program order.
    pub uinsts: Vec<Uinst>,
    /// Address actually executed next by the functional model.
    pub next_addr: u64,
    /// Target address if the instruction is a taken-capable control transfer.
    #[serde(default)]
    pub target_addr: u64,
}

/// Containers a micro-op currently belongs to.
///
/// The flags mirror actual container membership; a slot is only released
/// once every flag is clear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Membership {
    /// Waiting in the per-thread fetch queue.
    pub fetch_queue: bool,
    /// Waiting in the per-thread decoded micro-op queue.
    pub uop_queue: bool,
    /// Waiting in the instruction queue.
    pub iq: bool,
    /// Waiting in the load queue.
    pub lq: bool,
    /// Waiting in the store queue.
    pub sq: bool,
    /// Waiting in the prefetch queue.
    pub pq: bool,
    /// Scheduled for completion, or in flight in the memory system.
    pub event_queue: bool,
    /// Holding a reorder buffer entry.
    pub rob: bool,
}

impl Membership {
    /// Returns true if the micro-op is referenced by any container.
    #[inline]
    pub const fn any(&self) -> bool {
        self.fetch_queue
            || self.uop_queue
            || self.iq
            || self.lq
            || self.sq
            || self.pq
            || self.event_queue
            || self.rob
    }

    /// Number of issue-side containers holding the micro-op.
    ///
    /// The ROB is tracked alongside exactly one of these while in flight, so
    /// this never exceeds one.
    pub const fn stage_count(&self) -> usize {
        self.fetch_queue as usize
            + self.uop_queue as usize
            + self.iq as usize
            + self.lq as usize
            + self.sq as usize
            + self.pq as usize
            + self.event_queue as usize
    }
}

/// Number of physical registers a micro-op allocates per class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegDemand {
    /// Integer registers, including the one hosting flags.
    pub int: usize,
    /// Floating-point registers.
    pub fp: usize,
    /// XMM registers.
    pub xmm: usize,
}

impl RegDemand {
    /// Demand of one class.
    #[inline]
    pub const fn get(&self, class: RegClass) -> usize {
        match class {
            RegClass::Int => self.int,
            RegClass::Fp => self.fp,
            RegClass::Xmm => self.xmm,
        }
    }
}

/// Dynamic micro-op record.
#[derive(Clone, Debug)]
pub struct Uop {
    /// Static descriptor.
    pub uinst: Uinst,
    /// Program-order id, unique and increasing per CPU.
    pub id: u64,
    /// Hardware thread that fetched the micro-op.
    pub thread: usize,
    /// Software context the micro-op belongs to.
    pub context: usize,

    /// Address of the parent macro-instruction.
    pub eip: u64,
    /// Address actually executed after the parent macro-instruction.
    pub neip: u64,
    /// Address fetch continued at after the parent macro-instruction.
    pub pred_neip: u64,
    /// Branch target of the parent macro-instruction.
    pub target_neip: u64,
    /// Size of the parent macro-instruction in bytes.
    pub mop_size: u32,
    /// Position within the parent macro-instruction.
    pub mop_index: usize,
    /// Number of micro-ops in the parent macro-instruction.
    pub mop_count: usize,
    /// Instruction fetch access that brought in the parent block.
    pub fetch_access: Option<AccessId>,
    /// Physical data address of a memory micro-op.
    pub phy_addr: u64,

    /// Fetched down a not-yet-confirmed path.
    pub specmode: bool,
    /// Physical registers this micro-op will allocate at rename.
    pub demand: RegDemand,
    /// Physical register read per input slot.
    pub ph_idep: [Option<usize>; MAX_IDEPS],
    /// Physical register written per output slot.
    pub ph_odep: [Option<usize>; MAX_ODEPS],
    /// Previous mapping of each output's logical register.
    pub ph_oodep: [Option<usize>; MAX_ODEPS],

    /// Container membership flags.
    pub membership: Membership,
    /// Inputs observed ready; cached to avoid rescanning the register file.
    pub ready: bool,
    /// Sent to a functional unit or the memory system.
    pub issued: bool,
    /// Result produced.
    pub completed: bool,
    /// Removed by recovery while a memory access was in flight.
    pub squashed: bool,

    /// Cycle the micro-op entered the ROB.
    pub dispatch_when: u64,
    /// First cycle a functional unit was requested.
    pub issue_try_when: Option<u64>,
    /// Cycle the micro-op issued.
    pub issue_when: u64,
    /// Completion cycle for register operations.
    pub when: u64,

    /// Branch predictor bookkeeping for control micro-ops.
    pub prediction: PredictionInfo,
}

impl Uop {
    /// Creates an unrenamed micro-op for `uinst`.
    pub fn new(uinst: Uinst, id: u64, thread: usize, context: usize) -> Self {
        Self {
            uinst,
            id,
            thread,
            context,
            eip: 0,
            neip: 0,
            pred_neip: 0,
            target_neip: 0,
            mop_size: 0,
            mop_index: 0,
            mop_count: 1,
            fetch_access: None,
            phy_addr: 0,
            specmode: false,
            demand: RegDemand::default(),
            ph_idep: [None; MAX_IDEPS],
            ph_odep: [None; MAX_ODEPS],
            ph_oodep: [None; MAX_ODEPS],
            membership: Membership::default(),
            ready: false,
            issued: false,
            completed: false,
            squashed: false,
            dispatch_when: 0,
            issue_try_when: None,
            issue_when: 0,
            when: 0,
            prediction: PredictionInfo::default(),
        }
    }

    /// Opcode of the descriptor.
    #[inline]
    pub const fn opcode(&self) -> Opcode {
        self.uinst.opcode
    }

    /// Returns true if the resolved path differs from the path fetch followed.
    #[inline]
    pub const fn mispredicted(&self) -> bool {
        self.opcode().is_ctrl() && self.neip != self.pred_neip
    }

    /// Returns true if the parent macro-instruction actually branched.
    #[inline]
    pub const fn taken(&self) -> bool {
        self.neip != self.eip + self.mop_size as u64
    }
}

/// Handle to a micro-op slot in a [`UopArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UopHandle(u32);

impl UopHandle {
    /// Slot index of the handle.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-slot storage for the micro-ops of one core.
///
/// Released slots go on a free stack and are reused before the arena grows.
#[derive(Debug, Default)]
pub struct UopArena {
    slots: Vec<Option<Uop>>,
    free: Vec<u32>,
    live: usize,
}

impl UopArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a micro-op and returns its handle.
    pub fn insert(&mut self, uop: Uop) -> UopHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(uop);
            UopHandle(index)
        } else {
            self.slots.push(Some(uop));
            UopHandle((self.slots.len() - 1) as u32)
        }
    }

    /// Returns the micro-op behind `handle`, if its slot is still live.
    pub fn get(&self, handle: UopHandle) -> Option<&Uop> {
        self.slots.get(handle.index()).and_then(Option::as_ref)
    }

    /// Releases the slot if no container references the micro-op any more.
    ///
    /// Returns true if the slot was released.
    pub fn release_if_unqueued(&mut self, handle: UopHandle) -> bool {
        let unqueued = self.get(handle).is_some_and(|uop| !uop.membership.any());
        if unqueued {
            self.slots[handle.index()] = None;
            self.free.push(handle.0);
            self.live -= 1;
        }
        unqueued
    }

    /// Number of live micro-ops.
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no micro-op is live.
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live micro-ops.
    pub fn iter(&self) -> impl Iterator<Item = (UopHandle, &Uop)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|uop| (UopHandle(i as u32), uop)))
    }
}

impl Index<UopHandle> for UopArena {
    type Output = Uop;

    fn index(&self, handle: UopHandle) -> &Uop {
        match self.slots.get(handle.index()) {
            Some(Some(uop)) => uop,
            _ => panic!("stale micro-op handle {}", handle.0),
        }
    }
}

impl IndexMut<UopHandle> for UopArena {
    fn index_mut(&mut self, handle: UopHandle) -> &mut Uop {
        match self.slots.get_mut(handle.index()) {
            Some(Some(uop)) => uop,
            _ => panic!("stale micro-op handle {}", handle.0),
        }
    }
}
