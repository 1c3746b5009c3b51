//! An example backend (spec §1 "x86-64 shown only as a concrete example of
//! the backend contract"). This is deliberately not a real x86-64 encoder:
//! `map_instruction` emits one placeholder byte per opcode so the rest of
//! the pipeline (selector fallback, emitter, object container) has a
//! concrete backend to drive end to end, playing the same role Cranelift's
//! own `isa::x64` plays for `cranelift-codegen`'s tests, scaled down to what
//! this spec actually calls out as in-scope (§1 "any specific backend's
//! encoding tables" is explicitly out of scope).

use super::{DeviceClass, Endianness, ResourceRecord, TargetDescriptor, TargetState};
use crate::emit::Emitter;
use crate::error::Result;
use crate::ir::{Instruction, Opcode};
use std::collections::HashSet;

/// A single placeholder byte per opcode, just enough to make `map_instruction`
/// observably distinguish opcodes in tests without encoding real machine code.
fn placeholder_byte(opcode: Opcode) -> u8 {
    opcode as u8
}

pub struct X86_64Target {
    features: HashSet<String>,
}

impl X86_64Target {
    pub fn new() -> Self {
        let features = ["sse2", "sse4.2", "avx2", "popcnt", "bmi2"].iter().map(|s| s.to_string()).collect();
        X86_64Target { features }
    }
}

impl Default for X86_64Target {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetDescriptor for X86_64Target {
    fn name(&self) -> &str {
        "x86_64"
    }

    fn description(&self) -> &str {
        "example x86-64 backend (placeholder encoding, not a real ISA encoder)"
    }

    fn version(&self) -> u32 {
        1
    }

    fn word_size_bits(&self) -> u32 {
        64
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn device_class(&self) -> DeviceClass {
        DeviceClass::Cpu
    }

    fn features(&self) -> &HashSet<String> {
        &self.features
    }

    fn resources(&self) -> ResourceRecord {
        ResourceRecord {
            // 16 general-purpose registers minus rsp/rbp reserved for the
            // frame, matching the usual allocatable GPR count on this ABI.
            general_regs: 14,
            float_regs: 16,
            vector_regs: 16,
            vector_width: 256,
            min_align: 1,
            cache_line: 64,
            hw_threads: 1,
            exec_units: 4,
            pipeline_depth: 14,
            issue_width: 4,
        }
    }

    fn map_instruction(&self, _state: &mut TargetState, instr: &Instruction, emitter: &mut Emitter) -> Result<()> {
        emitter.emit_u8(placeholder_byte(instr.opcode));
        log::trace!("x86_64: mapped {} to 1 placeholder byte", instr.opcode);
        Ok(())
    }
}
