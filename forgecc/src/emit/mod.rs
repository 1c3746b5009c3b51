//! Code emitter (spec §4.I): a growable byte buffer, a symbol table, and a
//! relocation table, finalised into an object container (spec §6 "Object
//! container layout"). Grounded on Cranelift's `binemit` module
//! (`CodeInfo`, `Reloc`, `MemoryCodeSink`), generalised from its "emit
//! straight to a caller-provided sink" model into the spec's self-owned
//! growable buffer.

pub mod object;

use crate::error::{Error, Result};
use crate::target::Endianness;

const INITIAL_CAPACITY: usize = 64 * 1024;
/// Implementation-defined maximum symbol table size (spec §4.I
/// `add_symbol` "fails with TableFull"); mapped onto [`Error::OutOfMemory`]
/// since the spec's own §7 taxonomy has no distinct `TableFull` kind.
const MAX_SYMBOLS: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Assembly,
    Object,
    Executable,
    Library,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    Absolute,
    PcRelative,
    Got,
    Plt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub site: u32,
    pub target_index: u32,
    pub kind: RelocKind,
}

/// Magic `"COIL"` read little-endian (spec §6).
pub const OBJECT_MAGIC: u32 = 0x434F_494C;
pub const OBJECT_VERSION: u32 = 0x0000_0100;

pub struct Emitter {
    buffer: Vec<u8>,
    symbols: Vec<Symbol>,
    relocations: Vec<Relocation>,
    endianness: Endianness,
    timestamp: u32,
}

impl Emitter {
    pub fn new() -> Self {
        Self::with_endianness(Endianness::Little)
    }

    pub fn with_endianness(endianness: Endianness) -> Self {
        Emitter {
            buffer: Vec::with_capacity(INITIAL_CAPACITY),
            symbols: Vec::new(),
            relocations: Vec::new(),
            endianness,
            timestamp: 0,
        }
    }

    /// Caller-supplied timestamp for the object header; zero yields
    /// reproducible builds (spec §4.I "Header (object)").
    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn emit_u8(&mut self, v: u8) {
        self.buffer.push(v);
    }

    pub fn emit_u16(&mut self, v: u16) {
        let bytes = match self.endianness {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        };
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn emit_u32(&mut self, v: u32) {
        let bytes = match self.endianness {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        };
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn emit_u64(&mut self, v: u64) {
        let bytes = match self.endianness {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        };
        self.buffer.extend_from_slice(&bytes);
    }

    /// Register a symbol at the current (or a given) byte offset. Symbol
    /// offsets are strictly non-decreasing in registration order only when
    /// callers register them in emission order, which every code path in
    /// this crate does (spec §8 invariant 7).
    pub fn add_symbol(&mut self, name: impl Into<String>, at_offset: u32) -> Result<usize> {
        if self.symbols.len() >= MAX_SYMBOLS {
            return Err(Error::OutOfMemory);
        }
        let index = self.symbols.len();
        self.symbols.push(Symbol { name: name.into(), offset: at_offset });
        Ok(index)
    }

    pub fn add_relocation(&mut self, site: u32, target_index: u32, kind: RelocKind) {
        self.relocations.push(Relocation { site, target_index, kind });
    }

    pub fn get_buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Alias for [`Emitter::get_buffer`] matching the accessor name used by
    /// call sites that just want "the bytes emitted so far".
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    pub fn current_offset(&self) -> u32 {
        self.buffer.len() as u32
    }

    /// Finalise the buffer for `format`. For `Object`, prepends the three-
    /// word container header (magic, version, timestamp) and appends the
    /// symbol/relocation sections, matching spec §6's layout exactly.
    /// `Assembly` is a no-op (the backend is expected to have written its
    /// own text already). `Executable`/`Library` are reserved and report
    /// `Unsupported`.
    pub fn finalize(&mut self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Assembly => Ok(()),
            OutputFormat::Object => {
                let mut out = Vec::with_capacity(12 + self.buffer.len());
                out.extend_from_slice(&OBJECT_MAGIC.to_le_bytes());
                out.extend_from_slice(&OBJECT_VERSION.to_le_bytes());
                out.extend_from_slice(&self.timestamp.to_le_bytes());
                out.extend_from_slice(&self.buffer);
                out.extend_from_slice(&(self.symbols.len() as u32).to_le_bytes());
                for sym in &self.symbols {
                    let name_bytes = sym.name.as_bytes();
                    out.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
                    out.extend_from_slice(name_bytes);
                    out.extend_from_slice(&sym.offset.to_le_bytes());
                }
                out.extend_from_slice(&(self.relocations.len() as u32).to_le_bytes());
                for reloc in &self.relocations {
                    out.extend_from_slice(&reloc.site.to_le_bytes());
                    out.extend_from_slice(&reloc.target_index.to_le_bytes());
                    out.extend_from_slice(&(reloc_kind_to_u32(reloc.kind)).to_le_bytes());
                }
                self.buffer = out;
                Ok(())
            }
            OutputFormat::Executable | OutputFormat::Library => {
                Err(Error::unsupported(format!("{format:?} output is reserved and not yet implemented")))
            }
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn reloc_kind_to_u32(kind: RelocKind) -> u32 {
    match kind {
        RelocKind::Absolute => 0,
        RelocKind::PcRelative => 1,
        RelocKind::Got => 2,
        RelocKind::Plt => 3,
    }
}

pub(crate) fn reloc_kind_from_u32(v: u32) -> Option<RelocKind> {
    match v {
        0 => Some(RelocKind::Absolute),
        1 => Some(RelocKind::PcRelative),
        2 => Some(RelocKind::Got),
        3 => Some(RelocKind::Plt),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_offsets_non_decreasing() {
        let mut e = Emitter::new();
        e.emit_u32(0);
        let i0 = e.add_symbol("a", e.current_offset()).unwrap();
        e.emit_u32(0);
        let i1 = e.add_symbol("b", e.current_offset()).unwrap();
        assert!(e.symbols()[i0].offset <= e.symbols()[i1].offset);
    }

    #[test]
    fn finalize_object_scenario() {
        // spec §8 scenario 6: empty `main`, RET only.
        let mut e = Emitter::new();
        e.add_symbol("main", 0).unwrap();
        e.finalize(OutputFormat::Object).unwrap();
        let buf = e.get_buffer();
        assert_eq!(&buf[0..4], &[0x4C, 0x49, 0x4F, 0x43]);
        let (symbols, relocations) = object::read(buf).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "main");
        assert_eq!(symbols[0].offset, 0);
        assert!(relocations.is_empty());
    }

    #[test]
    fn executable_output_unsupported() {
        let mut e = Emitter::new();
        assert!(e.finalize(OutputFormat::Executable).is_err());
    }
}
