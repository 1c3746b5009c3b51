//! Loop-invariant code motion (spec §4.E): detect natural loops via
//! dominator backedges, then hoist pure instructions whose operands are all
//! defined outside the loop into the loop's unique predecessor block (the
//! block outside the loop that branches into the header).

use crate::analysis::{natural_loops, DominatorTree};
use crate::error::Result;
use crate::ir::{BlockId, Function, Operand, RegId};
use std::collections::HashMap;

fn is_pure(opcode: crate::ir::Opcode) -> bool {
    !opcode.has_side_effect() && !opcode.is_terminator()
}

pub fn loop_invariant_code_motion(func: &mut Function) -> Result<()> {
    let domtree = DominatorTree::compute(func);
    let loops = natural_loops(func, &domtree);

    // Map every defined register to the block that defines it.
    let mut def_block: HashMap<RegId, BlockId> = HashMap::new();
    for block in func.blocks() {
        for inst in block.instructions() {
            if let Some(r) = inst.result.as_register() {
                def_block.insert(r, block.id);
            }
        }
    }

    for lp in &loops {
        // find the loop's unique entry predecessor: a predecessor of the
        // header that is not itself inside the loop body.
        let Some(header_block) = func.block(lp.header) else { continue };
        let preheader_candidates: Vec<BlockId> =
            header_block.predecessors().iter().copied().filter(|p| !lp.body.contains(p)).collect();
        let [preheader] = preheader_candidates.as_slice() else {
            // Only hoist when there's exactly one loop-entry edge — spec
            // doesn't require preheader insertion, so loops without a
            // natural single entry point are left alone.
            continue;
        };

        let mut hoisted: Vec<(BlockId, usize)> = Vec::new();
        for &block_id in &lp.body {
            let Some(block) = func.block(block_id) else { continue };
            for (idx, inst) in block.instructions().iter().enumerate() {
                if !is_pure(inst.opcode) {
                    continue;
                }
                let all_outside = inst.operands.iter().all(|op| match op {
                    Operand::Register(r, _) => {
                        def_block.get(r).map(|b| !lp.body.contains(b)).unwrap_or(true)
                    }
                    _ => true,
                });
                if all_outside {
                    hoisted.push((block_id, idx));
                }
            }
        }

        // Move hoisted instructions to just before the preheader's
        // terminator, preserving relative order, then remove them from
        // their original blocks (highest index first to keep indices
        // stable during removal).
        let mut moved = Vec::new();
        let mut by_block: HashMap<BlockId, Vec<usize>> = HashMap::new();
        for (b, i) in &hoisted {
            by_block.entry(*b).or_default().push(*i);
        }
        for (b, mut idxs) in by_block {
            idxs.sort_unstable_by(|a, z| z.cmp(a));
            if let Some(block) = func.block_mut(b) {
                for i in idxs {
                    moved.push(block.instructions_mut().remove(i));
                }
            }
        }
        moved.reverse();

        if let Some(pre) = func.block_mut(*preheader) {
            let insts = pre.instructions_mut();
            let term_idx = insts.len().saturating_sub(1);
            for (offset, inst) in moved.into_iter().enumerate() {
                insts.insert(term_idx + offset, inst);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Flags, FuncId, Instruction, Opcode, Operand, RegId};
    use crate::types::TypeWord;
    use cranelift_entity::EntityRef;

    #[test]
    fn hoists_pure_instruction_out_of_loop() {
        // preheader -> header -> body -> header (backedge), header -> exit
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let pre = f.append_block("preheader");
        let header = f.append_block("header");
        let body = f.append_block("body");
        let exit = f.append_block("exit");

        f.block_mut(pre).unwrap().append(br(header)).unwrap();
        // header: BR_COND cond, body, exit (treat as brcond with 3 operands)
        f.block_mut(header)
            .unwrap()
            .append(Instruction {
                opcode: Opcode::BrCond,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: smallvec::smallvec![
                    Operand::register(RegId::new(99), TypeWord::Bool),
                    Operand::BlockRef(body),
                    Operand::BlockRef(exit)
                ],
            })
            .unwrap();
        // body: invariant ADD of two constants defined outside the loop, then back to header.
        f.block_mut(body)
            .unwrap()
            .append(Instruction {
                opcode: Opcode::Add,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: Operand::register(RegId::new(1), TypeWord::I32),
                operands: smallvec::smallvec![Operand::immediate(1, TypeWord::I32), Operand::immediate(2, TypeWord::I32)],
            })
            .unwrap();
        f.block_mut(body).unwrap().append(br(header)).unwrap();
        f.block_mut(exit).unwrap().append(ret()).unwrap();
        f.recompute_cfg();

        loop_invariant_code_motion(&mut f).unwrap();

        assert_eq!(f.block(pre).unwrap().instructions().len(), 2); // hoisted ADD + BR
        assert_eq!(f.block(body).unwrap().instructions().len(), 1); // only BR remains
    }

    fn br(target: BlockId) -> Instruction {
        Instruction {
            opcode: Opcode::Br,
            flags: Flags::NONE,
            result_type: TypeWord::VOID,
            result: Instruction::no_result(),
            operands: smallvec::smallvec![Operand::BlockRef(target)],
        }
    }

    fn ret() -> Instruction {
        Instruction {
            opcode: Opcode::Ret,
            flags: Flags::NONE,
            result_type: TypeWord::VOID,
            result: Instruction::no_result(),
            operands: smallvec::smallvec![],
        }
    }
}
