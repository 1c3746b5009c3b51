//! Common subexpression elimination (spec §4.E): within each extended basic
//! block, hash `(opcode, flags & {commutative, associative}, operand tuple
//! sorted if commutative)` and reuse the first computed result for any later
//! instruction that hashes the same, rewriting its uses to the prior result
//! and deleting the now-redundant instruction.

use crate::analysis::extended_basic_blocks;
use crate::error::Result;
use crate::ir::{Flags, Function, Opcode, Operand, RegId};
use std::collections::HashMap;

fn relevant_flags(flags: Flags) -> Flags {
    let mut out = Flags::NONE;
    if flags.contains(Flags::COMMUTATIVE) {
        out = out | Flags::COMMUTATIVE;
    }
    if flags.contains(Flags::ASSOCIATIVE) {
        out = out | Flags::ASSOCIATIVE;
    }
    out
}

/// A stable key for an instruction's pure computation, independent of
/// operand order when the instruction is commutative.
fn key_for(opcode: Opcode, flags: Flags, operands: &[Operand]) -> Option<(Opcode, u8, Vec<String>)> {
    if opcode.has_side_effect() || opcode.is_terminator() || opcode == Opcode::Nop {
        return None;
    }
    let mut parts: Vec<String> = operands.iter().map(crate::ir::printer::format_operand).collect();
    if flags.contains(Flags::COMMUTATIVE) {
        parts.sort();
    }
    Some((opcode, relevant_flags(flags).bits(), parts))
}

pub fn common_subexpression_elimination(func: &mut Function) -> Result<()> {
    for ebb in extended_basic_blocks(func) {
        let mut seen: HashMap<(Opcode, u8, Vec<String>), RegId> = HashMap::new();
        let mut rewrites: HashMap<RegId, RegId> = HashMap::new();
        let mut dead: Vec<(crate::ir::BlockId, usize)> = Vec::new();

        for &block_id in &ebb {
            let Some(block) = func.block(block_id) else { continue };
            for (idx, inst) in block.instructions().iter().enumerate() {
                let Some(result_reg) = inst.result.as_register() else { continue };
                let resolved: Vec<Operand> = inst
                    .operands
                    .iter()
                    .map(|op| match op {
                        Operand::Register(r, t) => {
                            Operand::Register(*rewrites.get(r).unwrap_or(r), *t)
                        }
                        other => other.clone(),
                    })
                    .collect();
                let Some(key) = key_for(inst.opcode, inst.flags, &resolved) else { continue };
                if let Some(&prior) = seen.get(&key) {
                    rewrites.insert(result_reg, prior);
                    dead.push((block_id, idx));
                } else {
                    seen.insert(key, result_reg);
                }
            }
        }

        // Rewrite operand uses across the whole function (a value computed
        // in one EBB block may be used by a successor outside this EBB).
        for block in func.blocks_mut() {
            for inst in block.instructions_mut() {
                for op in &mut inst.operands {
                    if let Operand::Register(r, t) = op {
                        if let Some(&new_r) = rewrites.get(r) {
                            *op = Operand::Register(new_r, *t);
                        }
                    }
                }
            }
        }

        for (block_id, idx) in dead.into_iter().rev() {
            if let Some(block) = func.block_mut(block_id) {
                block.instructions_mut().remove(idx);
            }
        }
    }
    Ok(())
}
