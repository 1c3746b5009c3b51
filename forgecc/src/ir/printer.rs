//! Textual formatter (spec §4.B): `OPCODE [result '='] operand, operand, …`;
//! memory operands format as `[base (+ index[*scale])? (+|- offset)?]`.

use super::{BasicBlock, Function, Instruction, Operand};
use crate::types::CompositePool;
use std::fmt::Write as _;

pub fn format_operand(op: &Operand) -> String {
    match op {
        Operand::Register(id, _) => format!("{id}"),
        Operand::Immediate(v, _) => format!("imm({v})"),
        Operand::Memory { base, index, scale, offset, .. } => {
            let mut s = format!("[{base}");
            if let Some(idx) = index {
                let _ = write!(s, " + {idx}*{}", scale.as_u8());
            }
            if *offset > 0 {
                let _ = write!(s, " + {offset}");
            } else if *offset < 0 {
                let _ = write!(s, " - {}", -(*offset as i64));
            }
            s.push(']');
            s
        }
        Operand::BlockRef(b) => format!("{b}"),
        Operand::FuncRef(f) => format!("{f}"),
        Operand::TypeRef(t) => format!("ty({:#x})", t.raw()),
    }
}

pub fn format_instruction(inst: &Instruction) -> String {
    let mut s = inst.opcode.to_string();
    if inst.has_result() {
        let _ = write!(s, " {} =", format_operand(&inst.result));
    }
    if !inst.operands.is_empty() {
        s.push(' ');
        let parts: Vec<String> = inst.operands.iter().map(format_operand).collect();
        s.push_str(&parts.join(", "));
    }
    s
}

pub fn format_block(block: &BasicBlock) -> String {
    let mut s = format!("{}:\n", block.name);
    for inst in block.instructions() {
        let _ = writeln!(s, "    {}", format_instruction(inst));
    }
    s
}

pub fn format_function(func: &Function, _pool: &CompositePool) -> String {
    let mut s = format!("function {}() {{\n", func.name);
    for block in func.blocks() {
        s.push_str(&format_block(block));
    }
    s.push_str("}\n");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Flags, Instruction, Opcode, Operand, RegId, Scale};
    use crate::types::TypeWord;
    use cranelift_entity::EntityRef;

    #[test]
    fn formats_result_and_operands() {
        let inst = Instruction {
            opcode: Opcode::Add,
            flags: Flags::COMMUTATIVE,
            result_type: TypeWord::I32,
            result: Operand::register(RegId::new(1), TypeWord::I32),
            operands: smallvec::smallvec![
                Operand::register(RegId::new(0), TypeWord::I32),
                Operand::immediate(0, TypeWord::I32),
            ],
        };
        assert_eq!(format_instruction(&inst), "ADD v1 = v0, imm(0)");
    }

    #[test]
    fn formats_memory_operand() {
        let op = Operand::memory(RegId::new(2), Some(RegId::new(3)), Scale::Four, -8, TypeWord::I64);
        assert_eq!(format_operand(&op), "[v2 + v3*4 - 8]");
    }
}
