//! Read-direction parser for the object container written by
//! [`super::Emitter::finalize`]. Spec §6 only specifies the write
//! direction; this module exists so the emit → parse round trip in spec
//! §8's testable properties is actually checkable.
//!
//! The header carries no code-length field (spec §6: "three little-endian
//! 32-bit words"), so the code/symbol-table boundary is not directly
//! known. The symbol and relocation tables are each self-delimiting
//! (length-prefixed names, a leading count), so we locate the boundary by
//! scanning backward from the end of the buffer for the split point whose
//! forward parse consumes exactly to the last byte.

use super::{reloc_kind_from_u32, Relocation, Symbol, OBJECT_MAGIC, OBJECT_VERSION};
use crate::error::{Error, Result};

const HEADER_LEN: usize = 12;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at(bytes: &'a [u8], pos: usize) -> Self {
        Cursor { bytes, pos }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        let s = self.take(4)?;
        Some(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }
}

pub struct ParsedObject {
    pub timestamp: u32,
    pub code: Vec<u8>,
    pub symbols: Vec<Symbol>,
    pub relocations: Vec<Relocation>,
}

/// Parse a full object container: header, code, symbol table, relocation
/// table, in that order (spec §6 layout).
pub fn parse(buf: &[u8]) -> Result<ParsedObject> {
    if buf.len() < HEADER_LEN {
        return Err(Error::bad_encoding("object container shorter than header"));
    }
    let mut header = Cursor::at(buf, 0);
    let magic = header.u32().ok_or_else(|| Error::bad_encoding("truncated header"))?;
    if magic != OBJECT_MAGIC {
        return Err(Error::bad_encoding(format!("bad object magic: {magic:#010x}")));
    }
    let version = header.u32().ok_or_else(|| Error::bad_encoding("truncated header"))?;
    if version != OBJECT_VERSION {
        return Err(Error::bad_encoding(format!("unsupported object version: {version:#010x}")));
    }
    let timestamp = header.u32().ok_or_else(|| Error::bad_encoding("truncated header"))?;

    for code_end in (HEADER_LEN..=buf.len()).rev() {
        if let Some((symbols, relocations)) = try_parse_tables(buf, code_end) {
            return Ok(ParsedObject { timestamp, code: buf[HEADER_LEN..code_end].to_vec(), symbols, relocations });
        }
    }
    Err(Error::bad_encoding("malformed symbol/relocation tables"))
}

fn try_parse_tables(buf: &[u8], tables_start: usize) -> Option<(Vec<Symbol>, Vec<Relocation>)> {
    let mut cur = Cursor::at(buf, tables_start);
    let symbol_count = cur.u32()? as usize;
    let mut symbols = Vec::with_capacity(symbol_count);
    for _ in 0..symbol_count {
        let name_len = cur.u32()? as usize;
        let name = std::str::from_utf8(cur.take(name_len)?).ok()?.to_string();
        let offset = cur.u32()?;
        symbols.push(Symbol { name, offset });
    }

    let reloc_count = cur.u32()? as usize;
    let mut relocations = Vec::with_capacity(reloc_count);
    for _ in 0..reloc_count {
        let site = cur.u32()?;
        let target_index = cur.u32()?;
        let kind = reloc_kind_from_u32(cur.u32()?)?;
        relocations.push(Relocation { site, target_index, kind });
    }

    (cur.pos == buf.len()).then_some((symbols, relocations))
}

/// Convenience wrapper returning just the symbol and relocation tables.
pub fn read(buf: &[u8]) -> Result<(Vec<Symbol>, Vec<Relocation>)> {
    let parsed = parse(buf)?;
    Ok((parsed.symbols, parsed.relocations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{Emitter, OutputFormat, RelocKind};

    #[test]
    fn round_trip_empty_code() {
        let mut e = Emitter::new();
        e.add_symbol("main", 0).unwrap();
        e.add_relocation(4, 0, RelocKind::PcRelative);
        e.finalize(OutputFormat::Object).unwrap();
        let parsed = parse(e.get_buffer()).unwrap();
        assert!(parsed.code.is_empty());
        assert_eq!(parsed.symbols.len(), 1);
        assert_eq!(parsed.symbols[0].name, "main");
        assert_eq!(parsed.relocations.len(), 1);
        assert_eq!(parsed.relocations[0].kind, RelocKind::PcRelative);
    }

    #[test]
    fn round_trip_with_code_bytes() {
        let mut e = Emitter::new();
        e.emit_u32(0xDEAD_BEEF);
        e.emit_u8(0x90);
        e.add_symbol("f", 0).unwrap();
        e.add_symbol("g", 4).unwrap();
        e.finalize(OutputFormat::Object).unwrap();
        let parsed = parse(e.get_buffer()).unwrap();
        assert_eq!(parsed.code.len(), 5);
        assert_eq!(parsed.symbols.len(), 2);
        assert_eq!(parsed.symbols[1].name, "g");
        assert!(parsed.relocations.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 16];
        assert!(read(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_buffer() {
        let mut e = Emitter::new();
        e.add_symbol("main", 0).unwrap();
        e.finalize(OutputFormat::Object).unwrap();
        let buf = e.get_buffer();
        assert!(read(&buf[..buf.len() - 2]).is_err());
    }
}
