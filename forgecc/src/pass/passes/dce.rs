//! Dead-code elimination (spec §4.E): remove instructions whose result is
//! unused, whose flags don't include `volatile`, and whose opcode has no
//! side effect. Branches and `RET` are never removed (they are terminators,
//! never unused, and excluded explicitly by the spec).
//!
//! Grounded on `cranelift-codegen::dce::do_dce`, which performs the identical
//! single backward scan per block marking `live` results; this version
//! additionally threads liveness *across* blocks within the function since
//! this IR has no pre-built dominator-ordered postorder walk available for
//! free outside `crate::analysis`.

use crate::error::Result;
use crate::ir::{Flags, Instruction, Function, Operand};
use std::collections::HashSet;

/// Whether `inst` must be kept regardless of whether its result is used:
/// side-effecting, volatile, a terminator, or result-less.
fn always_keep(inst: &Instruction) -> bool {
    inst.opcode.has_side_effect() || inst.flags.contains(Flags::VOLATILE) || inst.opcode.is_terminator() || !inst.has_result()
}

/// Whether `inst` survives this round, given the `live` set computed from
/// every instruction kept so far.
fn is_live(inst: &Instruction, live: &HashSet<crate::ir::RegId>) -> bool {
    always_keep(inst) || inst.result.as_register().map(|r| live.contains(&r)).unwrap_or(true)
}

/// Mark every register an operand of `inst` reads, including a `Memory`
/// operand's `base`/`index` — `LOAD`/`STORE` carry real virtual registers
/// there (see [`crate::ir::Operand::Memory`]), and [`crate::regalloc::build_intervals`]
/// already treats them as uses for liveness purposes.
fn mark_operands_live(inst: &Instruction, live: &mut HashSet<crate::ir::RegId>) {
    for op in &inst.operands {
        match op {
            Operand::Register(r, _) => {
                live.insert(*r);
            }
            Operand::Memory { base, index, .. } => {
                live.insert(*base);
                if let Some(idx) = index {
                    live.insert(*idx);
                }
            }
            _ => {}
        }
    }
}

pub fn dead_code_elimination(func: &mut Function) -> Result<()> {
    // Two-pass fixpoint: mark every register used by a kept instruction,
    // then drop the rest, repeating until no further instruction is
    // removed (removing one dead instruction can make its sole consumer's
    // producer dead in turn only when `live` was computed before removal,
    // but because `live` is defined as "referenced by *any* instruction
    // currently in the function", a single backward-per-block scan already
    // reaches fixpoint in one pass).
    loop {
        let mut live: HashSet<_> = HashSet::new();
        for block in func.blocks() {
            for inst in block.instructions() {
                if is_live(inst, &live) {
                    mark_operands_live(inst, &mut live);
                }
            }
        }

        let mut removed_any = false;
        for block in func.blocks_mut() {
            let insts = block.instructions_mut();
            let before = insts.len();
            insts.retain(|inst| is_live(inst, &live));
            if insts.len() != before {
                removed_any = true;
            }
        }
        if !removed_any {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncId, Function, Instruction, Opcode, RegId};
    use crate::types::TypeWord;
    use cranelift_entity::EntityRef;

    #[test]
    fn removes_unused_pure_instruction() {
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Add,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: crate::ir::Operand::register(RegId::new(0), TypeWord::I32),
                operands: smallvec::smallvec![
                    crate::ir::Operand::immediate(1, TypeWord::I32),
                    crate::ir::Operand::immediate(2, TypeWord::I32)
                ],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: smallvec::smallvec![crate::ir::Operand::immediate(0, TypeWord::I32)],
            })
            .unwrap();

        dead_code_elimination(&mut f).unwrap();
        assert_eq!(f.block(entry).unwrap().instructions().len(), 1);
    }

    #[test]
    fn keeps_side_effecting_instruction_even_if_unused() {
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Load,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: crate::ir::Operand::register(RegId::new(0), TypeWord::I32),
                operands: smallvec::smallvec![crate::ir::Operand::register(RegId::new(1), TypeWord::I64)],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: smallvec::smallvec![crate::ir::Operand::immediate(0, TypeWord::I32)],
            })
            .unwrap();

        dead_code_elimination(&mut f).unwrap();
        assert_eq!(f.block(entry).unwrap().instructions().len(), 2);
    }

    #[test]
    fn keeps_producer_whose_only_use_is_a_memory_base() {
        // r0 = ADD 1, 2 (pure); r1 = LOAD [r0]; RET r1. The ADD has no
        // register use, only a Memory-operand `base` use by the LOAD, so it
        // must survive DCE.
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Add,
                flags: Flags::NONE,
                result_type: TypeWord::I64,
                result: crate::ir::Operand::register(RegId::new(0), TypeWord::I64),
                operands: smallvec::smallvec![
                    crate::ir::Operand::immediate(1, TypeWord::I64),
                    crate::ir::Operand::immediate(2, TypeWord::I64)
                ],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Load,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: crate::ir::Operand::register(RegId::new(1), TypeWord::I32),
                operands: smallvec::smallvec![crate::ir::Operand::memory(
                    RegId::new(0),
                    None,
                    crate::ir::Scale::One,
                    0,
                    TypeWord::I32
                )],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: smallvec::smallvec![crate::ir::Operand::register(RegId::new(1), TypeWord::I32)],
            })
            .unwrap();

        dead_code_elimination(&mut f).unwrap();
        let block = f.block(entry).unwrap();
        assert_eq!(block.instructions().len(), 3);
        assert_eq!(block.instructions()[0].opcode, Opcode::Add);
    }
}
