//! Opcodes, flags, and instructions (spec §3 "Instruction").
//!
//! Opcodes are partitioned into categories by their high nibble, matching
//! the spec's "arithmetic, logical, comparison, control, memory, conversion,
//! vector, atomic, special (0xF0-)" layout.

use super::Operand;
use crate::types::TypeWord;
use smallvec::SmallVec;
use std::fmt;

/// A single opcode byte. Variants are grouped by high nibble exactly as
/// spec §3 describes; see [`Opcode::category_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // 0x0_ arithmetic
    Add = 0x00,
    Sub = 0x01,
    Mul = 0x02,
    Div = 0x03,
    Neg = 0x04,
    // 0x1_ logical
    And = 0x10,
    Or = 0x11,
    Xor = 0x12,
    Not = 0x13,
    Shl = 0x14,
    Shr = 0x15,
    // 0x2_ comparison
    CmpEq = 0x20,
    CmpNe = 0x21,
    CmpLt = 0x22,
    CmpLe = 0x23,
    CmpGt = 0x24,
    CmpGe = 0x25,
    // 0x3_ control
    Br = 0x30,
    BrCond = 0x31,
    Switch = 0x32,
    Ret = 0x33,
    Unreachable = 0x34,
    Call = 0x35,
    // 0x4_ memory
    Load = 0x40,
    Store = 0x41,
    Alloca = 0x42,
    // 0x5_ conversion
    Trunc = 0x50,
    Sext = 0x51,
    Zext = 0x52,
    Bitcast = 0x53,
    // 0x6_ vector
    VAdd = 0x60,
    VExtract = 0x61,
    VInsert = 0x62,
    // 0x7_ atomic
    AtomicLoad = 0x70,
    AtomicStore = 0x71,
    AtomicRmw = 0x72,
    AtomicCas = 0x73,
    Fence = 0x74,
    // 0xF_ special
    Nop = 0xF0,
    Mov = 0xF1,
}

impl Opcode {
    /// High-nibble category, spec §3.
    pub fn category_name(self) -> &'static str {
        match (self as u8) & 0xF0 {
            0x00 => "arithmetic",
            0x10 => "logical",
            0x20 => "comparison",
            0x30 => "control",
            0x40 => "memory",
            0x50 => "conversion",
            0x60 => "vector",
            0x70 => "atomic",
            _ => "special",
        }
    }

    /// `true` for the five opcodes legal as a block terminator (spec §3).
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Br | Opcode::BrCond | Opcode::Switch | Opcode::Ret | Opcode::Unreachable)
    }

    /// Side-effecting opcodes are never removed by dead-code elimination
    /// even when their result is unused (spec §4.E).
    pub fn has_side_effect(self) -> bool {
        matches!(
            self,
            Opcode::Load
                | Opcode::Store
                | Opcode::Call
                | Opcode::Fence
                | Opcode::AtomicLoad
                | Opcode::AtomicStore
                | Opcode::AtomicRmw
                | Opcode::AtomicCas
        )
    }

    /// Number of source operands this opcode takes, excluding the result.
    /// Used to validate instruction arity (spec §8 invariant 2).
    pub fn arity(self) -> usize {
        match self {
            Opcode::Neg | Opcode::Not => 1,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => 2,
            Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Shl | Opcode::Shr => 2,
            Opcode::CmpEq | Opcode::CmpNe | Opcode::CmpLt | Opcode::CmpLe | Opcode::CmpGt | Opcode::CmpGe => 2,
            Opcode::Br => 1,
            Opcode::BrCond => 3, // cond, true-block, false-block
            Opcode::Switch => 0, // variadic: scrutinee + (value, block) pairs
            Opcode::Ret => 1,
            Opcode::Unreachable => 0,
            Opcode::Call => 0, // variadic: callee + args
            Opcode::Load => 1,
            Opcode::Store => 2,
            Opcode::Alloca => 1, // size/type operand
            Opcode::Trunc | Opcode::Sext | Opcode::Zext | Opcode::Bitcast => 1,
            Opcode::VAdd => 2,
            Opcode::VExtract => 2,
            Opcode::VInsert => 3,
            Opcode::AtomicLoad => 2,  // address, ordering
            Opcode::AtomicStore => 3, // address, value, ordering
            Opcode::AtomicRmw => 3,   // address, operand, ordering
            Opcode::AtomicCas => 4,   // address, expected, replacement, ordering
            Opcode::Fence => 1,       // ordering
            Opcode::Nop => 0,
            Opcode::Mov => 1,
        }
    }

    /// `0` here means "variadic", matching spec §4.F pattern pre-filter
    /// semantics for `expected_operand_count`.
    pub fn is_variadic(self) -> bool {
        matches!(self, Opcode::Switch | Opcode::Call)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Neg => "NEG",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Not => "NOT",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::CmpEq => "CMP_EQ",
            Opcode::CmpNe => "CMP_NE",
            Opcode::CmpLt => "CMP_LT",
            Opcode::CmpLe => "CMP_LE",
            Opcode::CmpGt => "CMP_GT",
            Opcode::CmpGe => "CMP_GE",
            Opcode::Br => "BR",
            Opcode::BrCond => "BR_COND",
            Opcode::Switch => "SWITCH",
            Opcode::Ret => "RET",
            Opcode::Unreachable => "UNREACHABLE",
            Opcode::Call => "CALL",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Alloca => "ALLOCA",
            Opcode::Trunc => "TRUNC",
            Opcode::Sext => "SEXT",
            Opcode::Zext => "ZEXT",
            Opcode::Bitcast => "BITCAST",
            Opcode::VAdd => "VADD",
            Opcode::VExtract => "VEXTRACT",
            Opcode::VInsert => "VINSERT",
            Opcode::AtomicLoad => "ATOMIC_LOAD",
            Opcode::AtomicStore => "ATOMIC_STORE",
            Opcode::AtomicRmw => "ATOMIC_RMW",
            Opcode::AtomicCas => "ATOMIC_CAS",
            Opcode::Fence => "FENCE",
            Opcode::Nop => "NOP",
            Opcode::Mov => "MOV",
        };
        f.write_str(s)
    }
}

/// Flags bitset (spec §3): `{commutative, associative, idempotent, volatile,
/// atomic}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const COMMUTATIVE: Flags = Flags(1 << 0);
    pub const ASSOCIATIVE: Flags = Flags(1 << 1);
    pub const IDEMPOTENT: Flags = Flags(1 << 2);
    pub const VOLATILE: Flags = Flags(1 << 3);
    pub const ATOMIC: Flags = Flags(1 << 4);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits(bits: u8) -> Flags {
        Flags(bits)
    }

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Flags) -> Flags {
        Flags(self.0 | other.0)
    }

    /// All bits set in `mask` are present in `self` (spec §4.F selector
    /// pre-filter: "flag_mask ≠ 0 ⇒ all masked flags present").
    pub fn satisfies_mask(self, mask: Flags) -> bool {
        mask.0 == 0 || self.contains(mask)
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

/// Memory ordering values for atomic operands (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum AtomicOrdering {
    Relaxed = 0,
    Acquire = 1,
    Release = 2,
    AcqRel = 3,
    SeqCst = 4,
}

impl AtomicOrdering {
    pub fn from_i64(v: i64) -> Option<AtomicOrdering> {
        match v {
            0 => Some(AtomicOrdering::Relaxed),
            1 => Some(AtomicOrdering::Acquire),
            2 => Some(AtomicOrdering::Release),
            3 => Some(AtomicOrdering::AcqRel),
            4 => Some(AtomicOrdering::SeqCst),
            _ => None,
        }
    }
}

/// An instruction: opcode, flags, a typed result, and up to four source
/// operands (spec §3). `result` is `Operand::TypeRef(TypeWord::VOID)` (the
/// "no result" marker, see [`Instruction::no_result`]) for instructions that
/// produce no value, e.g. `STORE`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub flags: Flags,
    pub result_type: TypeWord,
    pub result: Operand,
    pub operands: SmallVec<[Operand; 4]>,
}

impl Instruction {
    /// Canonical "no result" marker: an instruction that produces no value
    /// (e.g. `STORE`, `RET`, branches) carries this as its `result`.
    pub fn no_result() -> Operand {
        Operand::TypeRef(TypeWord::VOID)
    }

    pub fn has_result(&self) -> bool {
        !matches!(&self.result, Operand::TypeRef(t) if *t == TypeWord::VOID)
    }
}
