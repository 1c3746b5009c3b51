//! Peephole pass (spec §4.E): within one basic block, rewrite
//! `ADD rX, rX, 0` / `SUB rX, rX, 0` to `NOP`; collapse runs of `NOP` to a
//! single `NOP`; leave `XOR r, r` alone (already the canonical zero idiom,
//! nothing to rewrite); eliminate `MOV a->b` immediately followed by
//! `MOV b->a` when there is no intervening use of `b`.
//!
//! Instructions are only ever rewritten *in place* to `NOP` while scanning;
//! actual removal from the block's instruction vector happens in one final
//! sweep so that indices stay stable for the whole scan (spec §4.E: "must
//! remove instructions marked NOP only after the pass completes").

use crate::error::Result;
use crate::ir::{Flags, Function, Instruction, Opcode, Operand};

fn make_nop() -> Instruction {
    Instruction {
        opcode: Opcode::Nop,
        flags: Flags::NONE,
        result_type: crate::types::TypeWord::VOID,
        result: Instruction::no_result(),
        operands: Default::default(),
    }
}

fn is_add_or_sub_identity(inst: &Instruction) -> bool {
    if !matches!(inst.opcode, Opcode::Add | Opcode::Sub) {
        return false;
    }
    let Some(result_reg) = inst.result.as_register() else { return false };
    let Some(Operand::Register(src0, _)) = inst.operands.first() else { return false };
    let Some(Operand::Immediate(0, _)) = inst.operands.get(1) else { return false };
    *src0 == result_reg
}

pub fn peephole(func: &mut Function) -> Result<()> {
    for block in func.blocks_mut() {
        let insts = block.instructions_mut();
        let len = insts.len();

        // Pass 1: ADD/SUB identity -> NOP.
        for i in 0..len {
            if is_add_or_sub_identity(&insts[i]) {
                insts[i] = make_nop();
            }
        }

        // Pass 2: MOV a->b immediately followed by MOV b->a -> second MOV
        // becomes NOP (no intervening use of b is possible between adjacent
        // instructions by construction).
        for i in 0..len.saturating_sub(1) {
            let (first, rest) = insts.split_at_mut(i + 1);
            let a = &first[i];
            let b = &rest[0];
            if a.opcode == Opcode::Mov && b.opcode == Opcode::Mov {
                if let (Some(dst_a), Some(Operand::Register(src_a, _))) =
                    (a.result.as_register(), a.operands.first())
                {
                    if let (Some(dst_b), Some(Operand::Register(src_b, _))) =
                        (b.result.as_register(), b.operands.first())
                    {
                        if dst_b == *src_a && *src_b == dst_a {
                            rest[0] = make_nop();
                        }
                    }
                }
            }
        }

        // Pass 3: collapse runs of NOP to a single NOP, then drop the rest.
        let mut kept: Vec<Instruction> = Vec::with_capacity(len);
        let mut prev_was_nop = false;
        for inst in insts.drain(..) {
            if inst.opcode == Opcode::Nop {
                if prev_was_nop {
                    continue;
                }
                prev_was_nop = true;
            } else {
                prev_was_nop = false;
            }
            kept.push(inst);
        }
        *insts = kept;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncId, Instruction, Opcode, Operand, RegId};
    use crate::types::TypeWord;
    use cranelift_entity::EntityRef;

    fn reg(n: u32) -> RegId {
        RegId::new(n as usize)
    }

    #[test]
    fn fold_add_zero_scenario() {
        // spec §8 scenario 1: ADD v1, v0, imm(0); RET v1 -> RET v0, one inst.
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Add,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: Operand::register(reg(1), TypeWord::I32),
                operands: smallvec::smallvec![Operand::register(reg(0), TypeWord::I32), Operand::immediate(0, TypeWord::I32)],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: smallvec::smallvec![Operand::register(reg(1), TypeWord::I32)],
            })
            .unwrap();

        peephole(&mut f).unwrap();
        crate::pass::passes::dead_code_elimination(&mut f).unwrap();

        let block = f.block(entry).unwrap();
        assert_eq!(block.instructions().len(), 1);
        assert_eq!(block.instructions()[0].opcode, Opcode::Ret);
    }

    #[test]
    fn collapses_nop_runs() {
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block.append(make_nop()).unwrap();
        block.append(make_nop()).unwrap();
        block.append(make_nop()).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: Default::default(),
            })
            .unwrap();

        peephole(&mut f).unwrap();
        let block = f.block(entry).unwrap();
        assert_eq!(block.instructions().len(), 2);
        assert_eq!(block.instructions()[0].opcode, Opcode::Nop);
    }

    #[test]
    fn peephole_is_idempotent() {
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Sub,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: Operand::register(reg(0), TypeWord::I32),
                operands: smallvec::smallvec![Operand::register(reg(0), TypeWord::I32), Operand::immediate(0, TypeWord::I32)],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: Default::default(),
            })
            .unwrap();

        peephole(&mut f).unwrap();
        let once = f.clone();
        peephole(&mut f).unwrap();
        assert_eq!(
            format!("{:?}", once.block(entry).unwrap().instructions()),
            format!("{:?}", f.block(entry).unwrap().instructions())
        );
    }
}
