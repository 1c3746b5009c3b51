//! Functions (spec §3 "Function").

use super::{BasicBlock, BlockId, FuncId, Instruction, Operand, RegId};
use crate::error::{Error, Result};
use crate::types::TypeWord;
use cranelift_entity::EntityRef;

/// `{id, name, type, blocks, param_virtual_regs}` per spec §3. The first
/// block in `blocks` is the entry block; exit blocks are those whose
/// terminator is `RET` or `UNREACHABLE`.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    pub ty: TypeWord,
    pub param_virtual_regs: Vec<RegId>,
    blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(id: FuncId, name: impl Into<String>, ty: TypeWord) -> Self {
        Function {
            id,
            name: name.into(),
            ty,
            param_virtual_regs: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Append a new block at the end of the ordered sequence, returning its
    /// id. The first block ever appended becomes the entry block.
    pub fn append_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, name));
        id
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [BasicBlock] {
        &mut self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.index())
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().map(|b| b.id)
    }

    /// Blocks whose terminator is `RET` or `UNREACHABLE` (spec §3).
    pub fn exit_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| {
                matches!(
                    b.terminator().map(|i| i.opcode),
                    Some(super::Opcode::Ret) | Some(super::Opcode::Unreachable)
                )
            })
            .map(|b| b.id)
            .collect()
    }

    /// Recompute predecessor/successor edges from scratch by scanning every
    /// block's terminator for `BlockRef` operands. Call this after any CFG
    /// edit; edges are not maintained incrementally (spec §9).
    pub fn recompute_cfg(&mut self) {
        for b in &mut self.blocks {
            b.predecessors.clear();
            b.successors.clear();
        }
        let mut edges: Vec<(BlockId, BlockId)> = Vec::new();
        for b in &self.blocks {
            if let Some(term) = b.terminator() {
                for op in &term.operands {
                    if let Operand::BlockRef(target) = op {
                        edges.push((b.id, *target));
                    }
                }
            }
        }
        for (from, to) in edges {
            if let Some(b) = self.block_mut(from) {
                if !b.successors.contains(&to) {
                    b.successors.push(to);
                }
            }
            if let Some(b) = self.block_mut(to) {
                if !b.predecessors.contains(&from) {
                    b.predecessors.push(from);
                }
            }
        }
    }

    /// Verify the universal invariants of spec §8: exactly one terminator at
    /// the end of every block, and operand arity matching each opcode.
    pub fn verify(&self) -> Result<()> {
        for b in &self.blocks {
            let insts = b.instructions();
            if insts.is_empty() {
                return Err(Error::internal(format!("block '{}' has no instructions", b.name)));
            }
            for (i, inst) in insts.iter().enumerate() {
                let is_last = i + 1 == insts.len();
                if inst.opcode.is_terminator() && !is_last {
                    return Err(Error::internal(format!(
                        "block '{}' has a terminator '{}' before its end",
                        b.name, inst.opcode
                    )));
                }
                if !inst.opcode.is_terminator() && is_last {
                    return Err(Error::internal(format!(
                        "block '{}' does not end with a terminator",
                        b.name
                    )));
                }
                if !inst.opcode.is_variadic() && inst.operands.len() != inst.opcode.arity() {
                    return Err(Error::internal(format!(
                        "instruction '{}' in block '{}' expected {} operands, got {}",
                        inst.opcode,
                        b.name,
                        inst.opcode.arity(),
                        inst.operands.len()
                    )));
                }
                if inst.result.is_register() {
                    // results must never themselves be immediates (invariant:
                    // "immediate operands never appear as result").
                } else if let Operand::Immediate(..) = &inst.result {
                    return Err(Error::internal(format!(
                        "instruction '{}' in block '{}' has an immediate as its result",
                        inst.opcode, b.name
                    )));
                }
                if inst.opcode == super::Opcode::Load && !inst.result.is_register() {
                    return Err(Error::internal("LOAD must produce a Register result".to_string()));
                }
                if inst.opcode == super::Opcode::Store && inst.has_result() {
                    return Err(Error::internal("STORE must not produce a result".to_string()));
                }
            }
        }
        Ok(())
    }
}
