//! Target descriptor & backend contract (spec §4.H), plus the target
//! registry (§4.J, split out into [`registry`]) and an example backend
//! (§4.H "x86-64 shown only as a concrete example", [`x86_64`]).
//!
//! Grounded on `cranelift-codegen::isa::TargetIsa` as the backend contract a
//! codegen core drives through, generalised from Cranelift's CPU-only ISA
//! trait into the spec's broader `device_class` (cpu/gpu/npu/tpu/dsp/fpga/
//! custom). Unlike `TargetIsa`, which folds its own mutable compilation
//! state into the trait object, `forgecc` keeps the descriptor ([`TargetDescriptor`])
//! stateless and capability-only, and threads per-session mutable state
//! through an explicit [`TargetState`] — this is what lets one descriptor
//! value back multiple concurrent [`TargetContext`]s (spec §5 "multiple
//! sessions may run concurrently... the target registry is read-only").

pub mod registry;
pub mod x86_64;

use crate::emit::Emitter;
use crate::error::Result;
use crate::ir::{Function, Instruction};
use std::any::Any;
use std::collections::HashSet;
use target_lexicon::{Architecture, Triple};

/// Byte order a target reads and writes multi-byte values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// What kind of execution unit a target describes (spec §4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Npu,
    Tpu,
    Dsp,
    Fpga,
    Custom,
}

/// A target's machine-resource summary (spec §4.H "a resource record").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRecord {
    pub general_regs: u32,
    pub float_regs: u32,
    pub vector_regs: u32,
    pub vector_width: u32,
    pub min_align: u32,
    pub cache_line: u32,
    pub hw_threads: u32,
    pub exec_units: u32,
    pub pipeline_depth: u32,
    pub issue_width: u32,
}

/// Per-session mutable state for one [`TargetContext`]: the resource record
/// plus an opaque slot a backend can use for its own bookkeeping
/// (`custom_data`, spec §4.H). Kept separate from [`TargetDescriptor`] so the
/// descriptor itself stays `&self`-only and shareable across contexts.
pub struct TargetState {
    pub resources: ResourceRecord,
    pub custom_data: Option<Box<dyn Any + Send>>,
}

impl TargetState {
    fn new(resources: ResourceRecord) -> Self {
        TargetState { resources, custom_data: None }
    }
}

/// The contract a backend implements to plug into the core (spec §4.H).
///
/// `initialize`/`finalize` default to no-ops; a backend **must** provide
/// [`map_instruction`](TargetDescriptor::map_instruction). The provided
/// default [`generate_function`](TargetDescriptor::generate_function) drives
/// the allocator and then lowers every instruction through `map_instruction`
/// in block order, matching spec §4.H's "`generate_function` is expected to
/// drive the allocator and emitter internally" — a backend that wants
/// cost-ranked pattern selection instead should run a [`crate::select::Selector`]
/// over the function and override this method.
pub trait TargetDescriptor: Send {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn version(&self) -> u32;
    fn word_size_bits(&self) -> u32;
    fn endianness(&self) -> Endianness;
    fn device_class(&self) -> DeviceClass;
    fn features(&self) -> &HashSet<String>;
    fn resources(&self) -> ResourceRecord;

    fn initialize(&self, _state: &mut TargetState) -> Result<()> {
        Ok(())
    }

    fn finalize(&self, _state: &mut TargetState) -> Result<()> {
        Ok(())
    }

    /// Map one already-selected IR instruction to target bytes.
    fn map_instruction(&self, state: &mut TargetState, instr: &Instruction, emitter: &mut Emitter) -> Result<()>;

    /// Generate an entire function: register a symbol at the function's
    /// start offset, run the linear-scan allocator over its intervals, then
    /// lower every instruction in block order.
    fn generate_function(&self, state: &mut TargetState, func: &Function, emitter: &mut Emitter) -> Result<()> {
        let start_offset = emitter.current_offset();
        emitter.add_symbol(func.name.clone(), start_offset)?;

        let pool = crate::types::CompositePool::new();
        let intervals = crate::regalloc::build_intervals(func);
        let mut allocator = crate::regalloc::LinearScanAllocator::new(
            state.resources.general_regs,
            state.resources.float_regs,
            state.resources.vector_regs,
        );
        allocator.run(&intervals, &pool, self.word_size_bits(), u64::from(state.resources.min_align))?;
        log::debug!(
            "generate_function '{}': {} intervals, {} spilled, frame_size={}",
            func.name,
            allocator.stats().total,
            allocator.stats().spilled,
            allocator.frame_size()
        );

        for block in func.blocks() {
            for inst in block.instructions() {
                self.map_instruction(state, inst, emitter)?;
            }
        }
        Ok(())
    }
}

/// Owns one backend descriptor plus its per-session [`TargetState`].
/// Initializes on construction and finalizes on [`Drop`] (spec §9 "scoped
/// resource acquisition": an early error return during a session can never
/// leak target resources).
pub struct TargetContext {
    descriptor: Box<dyn TargetDescriptor>,
    state: TargetState,
}

impl TargetContext {
    pub fn new(descriptor: Box<dyn TargetDescriptor>) -> Result<Self> {
        let mut state = TargetState::new(descriptor.resources());
        descriptor.initialize(&mut state)?;
        Ok(TargetContext { descriptor, state })
    }

    pub fn descriptor(&self) -> &dyn TargetDescriptor {
        self.descriptor.as_ref()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.descriptor.features().contains(name)
    }

    pub fn resources(&self) -> ResourceRecord {
        self.state.resources
    }

    /// Lower one instruction through the owned descriptor's `map_instruction`
    /// — the "no pattern matched" fallback path the selector calls into
    /// (spec §4.F "call default emit").
    pub fn descriptor_map_instruction(&mut self, instr: &Instruction, emitter: &mut Emitter) -> Result<()> {
        self.descriptor.map_instruction(&mut self.state, instr, emitter)
    }

    pub fn generate_function(&mut self, func: &Function, emitter: &mut Emitter) -> Result<()> {
        self.descriptor.generate_function(&mut self.state, func, emitter)
    }
}

impl Drop for TargetContext {
    fn drop(&mut self) {
        if let Err(e) = self.descriptor.finalize(&mut self.state) {
            log::debug!("target '{}' finalize failed during context drop: {e}", self.descriptor.name());
        }
    }
}

/// Platform self-detection (spec §4.H): inspects the host triple and returns
/// one of the canonical target names, or `None` if the host isn't one of
/// them. Uses `target_lexicon::Triple::host()`, the same host-detection
/// primitive Cranelift's own `isa::lookup` builds on.
pub fn detect_host_target() -> Option<&'static str> {
    match Triple::host().architecture {
        Architecture::X86_64 => Some("x86_64"),
        Architecture::Aarch64(_) => Some("arm64"),
        Architecture::Riscv64(_) => Some("riscv"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncId, Opcode};
    use crate::target::x86_64::X86_64Target;
    use crate::types::TypeWord;

    #[test]
    fn context_initializes_and_finalizes() {
        let target = X86_64Target::new();
        let ctx = TargetContext::new(Box::new(target)).unwrap();
        assert_eq!(ctx.descriptor().name(), "x86_64");
        drop(ctx);
    }

    #[test]
    fn generate_function_emits_a_symbol_per_function() {
        let target = X86_64Target::new();
        let mut ctx = TargetContext::new(Box::new(target)).unwrap();
        let mut emitter = Emitter::new();

        let mut f = Function::new(FuncId::new(0), "main", TypeWord::VOID);
        let entry = f.append_block("entry");
        f.block_mut(entry)
            .unwrap()
            .append(Instruction {
                opcode: Opcode::Ret,
                flags: crate::ir::Flags::NONE,
                result_type: TypeWord::VOID,
                result: crate::ir::Instruction::no_result(),
                operands: smallvec::smallvec![],
            })
            .unwrap();

        ctx.generate_function(&f, &mut emitter).unwrap();
        assert_eq!(emitter.symbols().len(), 1);
        assert_eq!(emitter.symbols()[0].name, "main");
        assert_eq!(emitter.symbols()[0].offset, 0);
        assert_eq!(emitter.buffer().len(), 1);
    }
}
