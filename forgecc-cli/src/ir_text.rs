//! A minimal textual IR reader for the driver binary.
//!
//! The real "source-text lexer/parser that produces IR" is an external
//! collaborator the core only consumes through its builder API (spec §1
//! Out of scope), so this is deliberately small: one block, one type per
//! line, and just enough opcodes (`MOV`, `ADD`, `SUB`, `RET`, `NOP`) to
//! drive the pipeline end to end from a file on disk.
//!
//! Syntax, one instruction per line:
//! ```text
//! v0 = MOV imm(1) i32
//! v1 = MOV imm(2) i32
//! v2 = ADD v0, v1 i32
//! RET v2 i32
//! ```
//!
//! Every line, including `RET`, ends with the type its operands are typed
//! as — there is no separate declaration syntax for registers, so the type
//! has to come from somewhere on the line that defines or uses them.

use anyhow::{bail, Context as _, Result};
use forgecc::ir::{Flags, Function, FuncId, Instruction, Opcode, Operand, RegId};
use forgecc::types::TypeWord;
use cranelift_entity::EntityRef;

fn parse_type(tok: &str) -> Result<TypeWord> {
    Ok(match tok {
        "bool" => TypeWord::BOOL,
        "i8" => TypeWord::I8,
        "i16" => TypeWord::I16,
        "i32" => TypeWord::I32,
        "i64" => TypeWord::I64,
        "f32" => TypeWord::F32,
        "f64" => TypeWord::F64,
        other => bail!("unknown type '{other}'"),
    })
}

fn parse_operand(tok: &str, ty: TypeWord) -> Result<Operand> {
    let tok = tok.trim();
    if let Some(id) = tok.strip_prefix('v') {
        let idx: u32 = id.parse().with_context(|| format!("bad register '{tok}'"))?;
        return Ok(Operand::register(RegId::new(idx as usize), ty));
    }
    if let Some(inner) = tok.strip_prefix("imm(").and_then(|s| s.strip_suffix(')')) {
        let v: i64 = inner.parse().with_context(|| format!("bad immediate '{tok}'"))?;
        return Ok(Operand::immediate(v, ty));
    }
    bail!("unrecognised operand '{tok}'")
}

fn parse_opcode(tok: &str) -> Result<Opcode> {
    Ok(match tok {
        "MOV" => Opcode::Mov,
        "ADD" => Opcode::Add,
        "SUB" => Opcode::Sub,
        "RET" => Opcode::Ret,
        "NOP" => Opcode::Nop,
        other => bail!("unsupported opcode '{other}' in minimal textual IR reader"),
    })
}

/// Parse `text` into a single-block function named `name`.
pub fn parse_function(name: &str, text: &str) -> Result<Function> {
    let mut func = Function::new(FuncId::new(0), name, TypeWord::I32);
    let entry = func.append_block("entry");

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (result_reg, rest) = match line.split_once('=') {
            Some((lhs, rhs)) => {
                let lhs = lhs.trim();
                let id = lhs
                    .strip_prefix('v')
                    .with_context(|| format!("line {}: expected 'vN =', got '{lhs}'", lineno + 1))?;
                let idx: u32 = id.parse().with_context(|| format!("line {}: bad register '{lhs}'", lineno + 1))?;
                (Some(RegId::new(idx as usize)), rhs.trim())
            }
            None => (None, line),
        };

        let mut tokens = rest.split_whitespace();
        let opcode_tok = tokens.next().with_context(|| format!("line {}: missing opcode", lineno + 1))?;
        let opcode = parse_opcode(opcode_tok)?;

        let remainder: Vec<&str> = tokens.collect();
        let (operand_toks, type_tok) = match remainder.split_last() {
            Some((last, rest)) => (rest, *last),
            None => bail!("line {}: missing trailing type", lineno + 1),
        };
        let ty = parse_type(type_tok)?;

        let operands = operand_toks
            .join(" ")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|tok| parse_operand(tok, ty))
            .collect::<Result<smallvec::SmallVec<[Operand; 4]>>>()?;

        let result = match result_reg {
            Some(reg) => Operand::register(reg, ty),
            None => Instruction::no_result(),
        };

        let inst = Instruction { opcode, flags: Flags::NONE, result_type: ty, result, operands };
        func.block_mut(entry).expect("entry block exists").append(inst).map_err(|e| anyhow::anyhow!(e))?;
    }

    func.recompute_cfg();
    func.verify().map_err(|e| anyhow::anyhow!(e))?;
    Ok(func)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_function() {
        let text = "v0 = MOV imm(1) i32\nv1 = MOV imm(2) i32\nv2 = ADD v0, v1 i32\nRET v2 i32\n";
        let func = parse_function("main", text).unwrap();
        assert_eq!(func.blocks().len(), 1);
        assert_eq!(func.blocks()[0].instructions().len(), 4);
    }

    #[test]
    fn rejects_unknown_opcode() {
        let text = "v0 = WIDGET imm(1) i32\n";
        assert!(parse_function("main", text).is_err());
    }
}
