//! Operand variants (spec §3 "Operand").

use super::{BlockId, FuncId, RegId};
use crate::types::TypeWord;

/// The scale applied to a memory operand's index register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl Scale {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Scale> {
        match v {
            1 => Some(Scale::One),
            2 => Some(Scale::Two),
            4 => Some(Scale::Four),
            8 => Some(Scale::Eight),
            _ => None,
        }
    }
}

/// A tagged union over every operand an instruction can reference (spec §3).
/// All register ids are *virtual* until [`crate::regalloc`] runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(RegId, TypeWord),
    Immediate(i64, TypeWord),
    Memory {
        base: RegId,
        index: Option<RegId>,
        scale: Scale,
        offset: i32,
        ty: TypeWord,
    },
    BlockRef(BlockId),
    FuncRef(FuncId),
    TypeRef(TypeWord),
}

impl Operand {
    pub fn register(id: RegId, ty: TypeWord) -> Operand {
        Operand::Register(id, ty)
    }

    pub fn immediate(value: i64, ty: TypeWord) -> Operand {
        Operand::Immediate(value, ty)
    }

    pub fn memory(base: RegId, index: Option<RegId>, scale: Scale, offset: i32, ty: TypeWord) -> Operand {
        Operand::Memory { base, index, scale, offset, ty }
    }

    /// `true` for [`Operand::Register`], the only variant legal as an
    /// instruction result that isn't the unit/no-result marker.
    pub fn is_register(&self) -> bool {
        matches!(self, Operand::Register(..))
    }

    pub fn as_register(&self) -> Option<RegId> {
        match self {
            Operand::Register(id, _) => Some(*id),
            _ => None,
        }
    }

    pub fn as_immediate(&self) -> Option<i64> {
        match self {
            Operand::Immediate(v, _) => Some(*v),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<BlockId> {
        match self {
            Operand::BlockRef(b) => Some(*b),
            _ => None,
        }
    }

    /// The type this operand carries, where applicable. `BlockRef`/`FuncRef`
    /// carry no type of their own (control-flow references and function
    /// references are not typed values); `TypeRef` denotes a type-as-operand
    /// and its "type" is the referenced type itself.
    pub fn ty(&self) -> Option<TypeWord> {
        match self {
            Operand::Register(_, t) | Operand::Immediate(_, t) | Operand::Memory { ty: t, .. } => Some(*t),
            Operand::TypeRef(t) => Some(*t),
            Operand::BlockRef(_) | Operand::FuncRef(_) => None,
        }
    }
}
