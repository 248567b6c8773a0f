//! Logical Register Naming.
//!
//! This module describes the register namespace seen by the decoder, which the
//! renaming logic maps onto physical registers. It provides:
//! 1. **Register Classes:** Integer, floating-point stack, and XMM pools.
//! 2. **Operands:** The `Dep` type naming one logical register of a micro-instruction.
//! 3. **Layout:** The number of logical registers per class, which sizes every RAT.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::MAX_ODEPS;

/// Physical register classes; each owns an independent pool, free list, and RAT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegClass {
    /// Integer registers. Condition flags are renamed inside this class.
    Int,
    /// Floating-point stack registers.
    Fp,
    /// Vector (XMM) registers.
    Xmm,
}

impl RegClass {
    /// All register classes, in reporting order.
    pub const ALL: [Self; 3] = [Self::Int, Self::Fp, Self::Xmm];

    /// Dense index of the class, usable for per-class arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Int => 0,
            Self::Fp => 1,
            Self::Xmm => 2,
        }
    }

    /// Short lowercase name used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Fp => "fp",
            Self::Xmm => "xmm",
        }
    }
}

impl fmt::Display for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A logical register operand of a micro-instruction.
///
/// `Fp` indices are relative to the current top of the floating-point stack;
/// the renamer translates them to absolute stack slots before touching the RAT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dep {
    /// Integer register `i`.
    Int(u8),
    /// Condition flag `i`; shares the integer RAT after the integer registers.
    Flag(u8),
    /// Floating-point stack register `st(i)`.
    Fp(u8),
    /// Vector register `xmm(i)`.
    Xmm(u8),
}

impl Dep {
    /// The physical register class this operand is renamed in.
    #[inline]
    pub const fn class(self) -> RegClass {
        match self {
            Self::Int(_) | Self::Flag(_) => RegClass::Int,
            Self::Fp(_) => RegClass::Fp,
            Self::Xmm(_) => RegClass::Xmm,
        }
    }

    /// Returns true for condition flags.
    #[inline]
    pub const fn is_flag(self) -> bool {
        matches!(self, Self::Flag(_))
    }
}

impl fmt::Display for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "r{i}"),
            Self::Flag(i) => write!(f, "flag{i}"),
            Self::Fp(i) => write!(f, "st{i}"),
            Self::Xmm(i) => write!(f, "xmm{i}"),
        }
    }
}

/// Architectural register layout exposed by the decoder.
///
/// The default mirrors a 32-bit x86 front end: eight general-purpose registers,
/// six segment registers and four temporaries (`aux`, `aux2`, `ea`, `data`),
/// four condition-flag groups, an eight-deep floating-point stack, and eight
/// XMM registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchLayout {
    /// Number of integer logical registers (excluding flags).
    #[serde(default = "ArchLayout::default_int_regs")]
    pub int_regs: usize,
    /// Number of condition-flag logical registers.
    #[serde(default = "ArchLayout::default_flag_regs")]
    pub flag_regs: usize,
    /// Depth of the floating-point register stack.
    #[serde(default = "ArchLayout::default_fp_stack_depth")]
    pub fp_stack_depth: usize,
    /// Number of XMM logical registers.
    #[serde(default = "ArchLayout::default_xmm_regs")]
    pub xmm_regs: usize,
}

impl ArchLayout {
    const fn default_int_regs() -> usize {
        18
    }

    const fn default_flag_regs() -> usize {
        4
    }

    const fn default_fp_stack_depth() -> usize {
        8
    }

    const fn default_xmm_regs() -> usize {
        8
    }

    /// Number of RAT entries of a class (integer entries include the flags).
    pub const fn logical_count(&self, class: RegClass) -> usize {
        match class {
            RegClass::Int => self.int_regs + self.flag_regs,
            RegClass::Fp => self.fp_stack_depth,
            RegClass::Xmm => self.xmm_regs,
        }
    }

    /// Smallest per-thread physical pool that can always rename one micro-op.
    pub const fn min_phys_size(&self, class: RegClass) -> usize {
        self.logical_count(class) + MAX_ODEPS
    }

    /// Returns true if `dep` names a register of this layout.
    pub const fn contains(&self, dep: Dep) -> bool {
        match dep {
            Dep::Int(i) => (i as usize) < self.int_regs,
            Dep::Flag(i) => (i as usize) < self.flag_regs,
            Dep::Fp(i) => (i as usize) < self.fp_stack_depth,
            Dep::Xmm(i) => (i as usize) < self.xmm_regs,
        }
    }
}

impl Default for ArchLayout {
    fn default() -> Self {
        Self {
            int_regs: Self::default_int_regs(),
            flag_regs: Self::default_flag_regs(),
            fp_stack_depth: Self::default_fp_stack_depth(),
            xmm_regs: Self::default_xmm_regs(),
        }
    }
}
