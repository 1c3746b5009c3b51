//! The cost-minimising instruction selector (spec §4.F). Grounded on the
//! contract of `isa::TargetIsa` / `MachBackend::compile`'s lowering step,
//! simplified into the spec's explicit pattern table — `forgecc` does not
//! use ISLE term-rewriting the way modern Cranelift does, since the spec
//! calls for a plain cost-ranked pattern list instead.

use crate::emit::Emitter;
use crate::error::{Error, Result};
use crate::ir::{Flags, Function, Instruction, Opcode};
use crate::target::TargetContext;

/// A candidate lowering for one opcode.
pub struct Pattern {
    pub opcode: Opcode,
    /// `0` means "any operand count", matching the opcode's variadic forms.
    pub expected_operand_count: usize,
    pub expected_flag_mask: Flags,
    /// Lower is better; ties keep the first-registered pattern (spec §4.F).
    pub cost: u8,
    pub name: String,
    pub match_fn: Box<dyn Fn(&Instruction, &TargetContext) -> bool + Send>,
    pub emit_fn: Box<dyn Fn(&Instruction, &mut TargetContext, &mut Emitter) -> Result<()> + Send>,
}

type DefaultEmitFn = Box<dyn Fn(&Instruction, &mut TargetContext, &mut Emitter) -> Result<()> + Send>;

/// Matches each IR instruction against registered patterns, picking the
/// cheapest successful match; falls back to the target's default
/// `map_instruction` (or a caller-provided default) when nothing matches.
pub struct Selector {
    patterns: Vec<Pattern>,
    optimize: bool,
    default: Option<DefaultEmitFn>,
}

impl Selector {
    pub fn new() -> Self {
        Selector { patterns: Vec::new(), optimize: true, default: None }
    }

    /// Dynamic array, grows by doubling; `Vec::push` already amortises this,
    /// so no manual capacity dance is needed here (spec §4.F only specifies
    /// the growth *behavior*, not that callers must manage it by hand).
    pub fn add_pattern(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn set_optimize(&mut self, optimize: bool) {
        self.optimize = optimize;
    }

    pub fn set_default(&mut self, f: DefaultEmitFn) {
        self.default = Some(f);
    }

    /// Select and emit the lowering for one instruction.
    pub fn select(&self, instr: &Instruction, ctx: &mut TargetContext, emitter: &mut Emitter) -> Result<()> {
        if !self.optimize {
            return self.emit_default(instr, ctx, emitter);
        }

        let mut best: Option<&Pattern> = None;
        for pattern in &self.patterns {
            if pattern.opcode != instr.opcode {
                continue;
            }
            if pattern.expected_operand_count != 0 && pattern.expected_operand_count != instr.operands.len() {
                continue;
            }
            if !instr.flags.satisfies_mask(pattern.expected_flag_mask) {
                continue;
            }
            if !(pattern.match_fn)(instr, ctx) {
                continue;
            }
            match best {
                None => best = Some(pattern),
                Some(cur) if pattern.cost < cur.cost => best = Some(pattern),
                _ => {}
            }
        }

        match best {
            Some(p) => {
                log::trace!("selector: chose pattern '{}' for {}", p.name, instr.opcode);
                (p.emit_fn)(instr, ctx, emitter)
            }
            None => self.emit_default(instr, ctx, emitter),
        }
    }

    fn emit_default(&self, instr: &Instruction, ctx: &mut TargetContext, emitter: &mut Emitter) -> Result<()> {
        if let Some(default) = &self.default {
            return default(instr, ctx, emitter);
        }
        ctx.descriptor_map_instruction(instr, emitter).map_err(|_| {
            Error::no_selection(format!("no pattern and no default for opcode {}", instr.opcode))
        })
    }

    pub fn select_block(&self, block: &crate::ir::BasicBlock, ctx: &mut TargetContext, emitter: &mut Emitter) -> Result<()> {
        for inst in block.instructions() {
            self.select(inst, ctx, emitter)?;
        }
        Ok(())
    }

    pub fn select_function(&self, function: &Function, ctx: &mut TargetContext, emitter: &mut Emitter) -> Result<()> {
        for block in function.blocks() {
            self.select_block(block, ctx, emitter)?;
        }
        Ok(())
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncId, Operand, RegId};
    use crate::target::x86_64::X86_64Target;
    use crate::target::TargetContext;
    use crate::types::TypeWord;
    use cranelift_entity::EntityRef;
    use std::sync::{Arc, Mutex};

    fn add_instr() -> Instruction {
        Instruction {
            opcode: Opcode::Add,
            flags: Flags::NONE,
            result_type: TypeWord::I32,
            result: Operand::register(RegId::new(0), TypeWord::I32),
            operands: smallvec::smallvec![Operand::register(RegId::new(1), TypeWord::I32), Operand::register(RegId::new(2), TypeWord::I32)],
        }
    }

    #[test]
    fn cost_tie_keeps_first_registered_scenario() {
        // spec §8 scenario 3.
        let winner = Arc::new(Mutex::new(String::new()));
        let mut selector = Selector::new();
        for name in ["first", "second"] {
            let winner = winner.clone();
            let name_owned = name.to_string();
            selector.add_pattern(Pattern {
                opcode: Opcode::Add,
                expected_operand_count: 2,
                expected_flag_mask: Flags::NONE,
                cost: 10,
                name: name.to_string(),
                match_fn: Box::new(|_, _| true),
                emit_fn: Box::new(move |_, _, _| {
                    *winner.lock().unwrap() = name_owned.clone();
                    Ok(())
                }),
            });
        }

        let target = X86_64Target::new();
        let mut ctx = TargetContext::new(Box::new(target)).unwrap();
        let mut emitter = Emitter::new();
        selector.select(&add_instr(), &mut ctx, &mut emitter).unwrap();
        assert_eq!(*winner.lock().unwrap(), "first");
    }

    #[test]
    fn falls_back_to_default_when_optimize_disabled() {
        let mut selector = Selector::new();
        selector.add_pattern(Pattern {
            opcode: Opcode::Add,
            expected_operand_count: 0,
            expected_flag_mask: Flags::NONE,
            cost: 0,
            name: "never".to_string(),
            match_fn: Box::new(|_, _| true),
            emit_fn: Box::new(|_, _, _| panic!("should not be called")),
        });
        selector.set_optimize(false);

        let target = X86_64Target::new();
        let mut ctx = TargetContext::new(Box::new(target)).unwrap();
        let mut emitter = Emitter::new();
        // default map_instruction on X86_64Target is a minimal stub that
        // just emits a single placeholder byte per instruction.
        selector.select(&add_instr(), &mut ctx, &mut emitter).unwrap();
        assert_eq!(emitter.buffer().len(), 1);
    }
}
