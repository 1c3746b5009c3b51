//! Basic blocks (spec §3 "Basic block").

use super::{BlockId, Instruction};
use crate::error::{Error, Result};

/// A maximal straight-line instruction sequence with exactly one terminator
/// at its end. `predecessors`/`successors` are *derived* data: recomputed by
/// [`crate::ir::Function::recompute_cfg`] after any edit to block terminators
/// rather than maintained incrementally, matching spec §9's arena+index
/// redesign of the source's raw back-pointers.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    instructions: Vec<Instruction>,
    pub(crate) predecessors: Vec<BlockId>,
    pub(crate) successors: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        BasicBlock {
            id,
            name: name.into(),
            instructions: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Append an instruction. Terminators may only be appended once and must
    /// be the last instruction (spec §8 invariant 1); this is enforced here
    /// rather than only at verification time so malformed IR can never be
    /// built through the builder API.
    pub fn append(&mut self, inst: Instruction) -> Result<()> {
        if let Some(last) = self.instructions.last() {
            if last.opcode.is_terminator() {
                return Err(Error::bad_argument(format!(
                    "block '{}' already has a terminator; cannot append after it",
                    self.name
                )));
            }
        }
        self.instructions.push(inst);
        Ok(())
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.opcode.is_terminator())
    }

    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }
}
