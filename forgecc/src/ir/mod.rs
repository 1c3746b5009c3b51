//! The typed IR (spec §3, §4.B): functions, basic blocks, typed instructions,
//! operands. Entity ids are compact `u32` newtypes implementing
//! [`cranelift_entity::EntityRef`] rather than raw pointers (spec §9
//! "cyclic references... re-architect as arena+index").

mod block;
mod function;
mod instruction;
mod operand;
pub mod printer;

pub use block::BasicBlock;
pub use function::Function;
pub use instruction::{AtomicOrdering, Flags, Instruction, Opcode};
pub use operand::{Operand, Scale};

use cranelift_entity::entity_impl;

/// Identifies a basic block within its owning [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);
entity_impl!(BlockId, "block");

/// Identifies a function within a module. Functions reference each other
/// only by id (`FuncRef` operand), never by direct pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(u32);
entity_impl!(FuncId, "fn");

/// A virtual register id, assigned by the front-end prior to allocation.
/// Becomes a physical register or a spill slot once [`crate::regalloc`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegId(u32);
entity_impl!(RegId, "v");
