//! The 32-bit type word (spec §3 "Type word", §4.A).
//!
//! Every type is a single `u32` token: category in bits `[31:28]`, width in
//! bits in `[27:20]`, a qualifier set in `[19:12]`, and a 12-bit attribute
//! payload in `[11:0]`. Primitive types (void, bool, integer, float, pointer)
//! are fully self-describing from the token alone. Composite types (array,
//! struct, function) additionally store an entry in a [`CompositePool`],
//! keyed by the attribute payload, the way `cranelift-codegen`'s `ir::Type`
//! keeps simple types self-contained but routes structured data (signatures,
//! struct layouts) through a side table owned by the `Function`/`DataFlowGraph`.

use crate::error::{Error, Result};
use std::fmt;

const CATEGORY_SHIFT: u32 = 28;
const WIDTH_SHIFT: u32 = 20;
const QUAL_SHIFT: u32 = 12;

const CATEGORY_MASK: u32 = 0xF;
const WIDTH_MASK: u32 = 0xFF;
const QUAL_MASK: u32 = 0xFF;
const ATTR_MASK: u32 = 0xFFF;

/// The type category, bits `[31:28]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    Void = 0,
    Bool = 1,
    Integer = 2,
    Float = 3,
    Pointer = 4,
    Vector = 5,
    Array = 6,
    Struct = 7,
    Function = 8,
}

impl Category {
    fn from_u32(v: u32) -> Result<Self> {
        Ok(match v {
            0 => Category::Void,
            1 => Category::Bool,
            2 => Category::Integer,
            3 => Category::Float,
            4 => Category::Pointer,
            5 => Category::Vector,
            6 => Category::Array,
            7 => Category::Struct,
            8 => Category::Function,
            other => return Err(Error::bad_encoding(format!("unknown type category {other}"))),
        })
    }

    fn is_composite(self) -> bool {
        matches!(self, Category::Array | Category::Struct | Category::Function)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Void => "void",
            Category::Bool => "bool",
            Category::Integer => "i",
            Category::Float => "f",
            Category::Pointer => "ptr",
            Category::Vector => "vec",
            Category::Array => "array",
            Category::Struct => "struct",
            Category::Function => "fn",
        };
        f.write_str(s)
    }
}

/// Qualifier bits, `[19:12]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Qualifiers(u32);

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers(0);
    pub const UNSIGNED: Qualifiers = Qualifiers(1 << 0);
    pub const CONST: Qualifiers = Qualifiers(1 << 1);
    pub const VOLATILE: Qualifiers = Qualifiers(1 << 2);
    pub const RESTRICT: Qualifiers = Qualifiers(1 << 3);
    pub const ATOMIC: Qualifiers = Qualifiers(1 << 4);

    pub fn bits(self) -> u32 {
        self.0
    }

    fn from_bits(bits: u32) -> Result<Self> {
        if bits & !QUAL_MASK != 0 {
            return Err(Error::bad_encoding("qualifier bits overflow the 8-bit field"));
        }
        Ok(Qualifiers(bits))
    }

    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | other.0)
    }

    /// Qualifiers with `const` cleared, used by [`is_compatible`].
    fn strip_const(self) -> Qualifiers {
        Qualifiers(self.0 & !Self::CONST.0)
    }
}

impl std::ops::BitOr for Qualifiers {
    type Output = Qualifiers;
    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        self.union(rhs)
    }
}

/// A composite type's auxiliary description, stored in a [`CompositePool`]
/// and addressed by the 12-bit attribute payload of its [`TypeWord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeDesc {
    Array { element: TypeWord, count: u32 },
    Struct { fields: Vec<TypeWord> },
    Function { ret: TypeWord, params: Vec<TypeWord>, variadic: bool },
}

/// Owns the composite side table. One pool is shared across all types
/// produced by a compilation session, keeping structured descriptions
/// (array element/count, struct fields, function signatures) out of the
/// 32-bit token itself.
#[derive(Debug, Default, Clone)]
pub struct CompositePool {
    entries: Vec<CompositeDesc>,
}

impl CompositePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, desc: CompositeDesc) -> Result<u32> {
        let idx = self.entries.len() as u32;
        if idx > ATTR_MASK {
            return Err(Error::bad_encoding("composite type pool exhausted (12-bit attribute field)"));
        }
        self.entries.push(desc);
        Ok(idx)
    }

    pub fn get(&self, attrs: u32) -> Option<&CompositeDesc> {
        self.entries.get(attrs as usize)
    }
}

/// A single 32-bit type token (spec §3 "Type word").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeWord(u32);

impl TypeWord {
    pub const fn from_raw(raw: u32) -> Self {
        TypeWord(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn category(self) -> Category {
        Category::from_u32((self.0 >> CATEGORY_SHIFT) & CATEGORY_MASK)
            .expect("TypeWord constructed through encode() always has a valid category")
    }

    pub fn width_bits(self) -> u32 {
        (self.0 >> WIDTH_SHIFT) & WIDTH_MASK
    }

    pub fn qualifiers(self) -> Qualifiers {
        Qualifiers((self.0 >> QUAL_SHIFT) & QUAL_MASK)
    }

    pub fn attributes(self) -> u32 {
        self.0 & ATTR_MASK
    }

    pub const VOID: TypeWord = TypeWord(0);
    pub const BOOL: TypeWord = TypeWord((Category::Bool as u32) << CATEGORY_SHIFT | (8 << WIDTH_SHIFT));
    pub const I8: TypeWord = TypeWord((Category::Integer as u32) << CATEGORY_SHIFT | (8 << WIDTH_SHIFT));
    pub const I16: TypeWord = TypeWord((Category::Integer as u32) << CATEGORY_SHIFT | (16 << WIDTH_SHIFT));
    pub const I32: TypeWord = TypeWord((Category::Integer as u32) << CATEGORY_SHIFT | (32 << WIDTH_SHIFT));
    pub const I64: TypeWord = TypeWord((Category::Integer as u32) << CATEGORY_SHIFT | (64 << WIDTH_SHIFT));
    pub const F32: TypeWord = TypeWord((Category::Float as u32) << CATEGORY_SHIFT | (32 << WIDTH_SHIFT));
    pub const F64: TypeWord = TypeWord((Category::Float as u32) << CATEGORY_SHIFT | (64 << WIDTH_SHIFT));

    /// Encode a primitive (non-composite) type word. Use [`pointer`],
    /// [`vector`], [`array`], [`struct_of`], or [`function`] for composites.
    pub fn encode(category: Category, width_bits: u32, qualifiers: Qualifiers) -> Result<TypeWord> {
        if category.is_composite() {
            return Err(Error::bad_encoding(format!(
                "{category} is a composite category; use a dedicated constructor"
            )));
        }
        Self::validate_width(category, width_bits)?;
        if width_bits > WIDTH_MASK {
            return Err(Error::bad_encoding("width exceeds 8-bit field"));
        }
        let quals = Qualifiers::from_bits(qualifiers.bits())?;
        Ok(TypeWord(
            (category as u32) << CATEGORY_SHIFT | width_bits << WIDTH_SHIFT | quals.bits() << QUAL_SHIFT,
        ))
    }

    fn validate_width(category: Category, width_bits: u32) -> Result<()> {
        match category {
            Category::Void => {
                if width_bits != 0 {
                    return Err(Error::bad_encoding("void must have width 0"));
                }
            }
            Category::Bool => {
                if width_bits != 8 {
                    return Err(Error::bad_encoding("bool must have width 8"));
                }
            }
            Category::Integer | Category::Float => {
                if width_bits == 0 || width_bits % 8 != 0 {
                    return Err(Error::bad_encoding(format!(
                        "{category} width must be a non-zero multiple of 8, got {width_bits}"
                    )));
                }
            }
            Category::Pointer => {
                // validated against the target word size by `pointer()`.
            }
            _ => {}
        }
        Ok(())
    }

    /// Decode back into the four constructor fields (spec §8 invariant 8:
    /// `decode(encode(c,w,q,a)) == (c,w,q,a)`).
    pub fn decode(self) -> (Category, u32, Qualifiers, u32) {
        (self.category(), self.width_bits(), self.qualifiers(), self.attributes())
    }

    /// Build a pointer type; `width_bits` must equal the target word size.
    pub fn pointer(target_word_bits: u32, qualifiers: Qualifiers) -> Result<TypeWord> {
        if target_word_bits == 0 || target_word_bits % 8 != 0 || target_word_bits > WIDTH_MASK {
            return Err(Error::bad_encoding("invalid target word size for pointer"));
        }
        let quals = Qualifiers::from_bits(qualifiers.bits())?;
        Ok(TypeWord(
            (Category::Pointer as u32) << CATEGORY_SHIFT
                | target_word_bits << WIDTH_SHIFT
                | quals.bits() << QUAL_SHIFT,
        ))
    }

    /// Build a vector type of `count` lanes of `element`. `count` is stored
    /// via the composite pool alongside the element type.
    pub fn vector(pool: &mut CompositePool, element: TypeWord, count: u32) -> Result<TypeWord> {
        if count == 0 {
            return Err(Error::bad_encoding("vector count must be non-zero"));
        }
        let attrs = pool.insert(CompositeDesc::Array { element, count })?;
        Ok(TypeWord(
            (Category::Vector as u32) << CATEGORY_SHIFT | element.width_bits() << WIDTH_SHIFT | attrs,
        ))
    }

    /// Build an array type; `count == 0` means unsized.
    pub fn array(pool: &mut CompositePool, element: TypeWord, count: u32) -> Result<TypeWord> {
        let attrs = pool.insert(CompositeDesc::Array { element, count })?;
        Ok(TypeWord((Category::Array as u32) << CATEGORY_SHIFT | attrs))
    }

    /// Build a struct type from an ordered field list.
    pub fn struct_of(pool: &mut CompositePool, fields: Vec<TypeWord>) -> Result<TypeWord> {
        let attrs = pool.insert(CompositeDesc::Struct { fields })?;
        Ok(TypeWord((Category::Struct as u32) << CATEGORY_SHIFT | attrs))
    }

    /// Build a function signature type.
    pub fn function(
        pool: &mut CompositePool,
        ret: TypeWord,
        params: Vec<TypeWord>,
        variadic: bool,
    ) -> Result<TypeWord> {
        let attrs = pool.insert(CompositeDesc::Function { ret, params, variadic })?;
        Ok(TypeWord((Category::Function as u32) << CATEGORY_SHIFT | attrs))
    }

    /// Two types are compatible iff category and width match and qualifier
    /// sets are equal after stripping `const` (spec §3).
    pub fn is_compatible(self, other: TypeWord) -> bool {
        self.category() == other.category()
            && self.width_bits() == other.width_bits()
            && self.qualifiers().strip_const() == other.qualifiers().strip_const()
    }

    /// Size in bytes, per the rules in spec §4.A. `min_align` is the
    /// target's minimum alignment, passed through to [`Self::align_bytes`]
    /// for struct field layout.
    pub fn size_bytes(self, pool: &CompositePool, target_word_bits: u32, min_align: u64) -> Result<u64> {
        Ok(match self.category() {
            Category::Void => 0,
            Category::Bool | Category::Integer | Category::Float => u64::from(self.width_bits()) / 8,
            Category::Pointer => u64::from(target_word_bits) / 8,
            Category::Vector => {
                let CompositeDesc::Array { element, count } = composite(pool, self)? else {
                    return Err(Error::internal("vector attrs did not resolve to an array descriptor"));
                };
                let elem_size = element.size_bytes(pool, target_word_bits, min_align)?;
                let raw = elem_size * u64::from(count);
                raw.next_power_of_two().max(elem_size)
            }
            Category::Array => {
                let CompositeDesc::Array { element, count } = composite(pool, self)? else {
                    return Err(Error::internal("array attrs did not resolve to an array descriptor"));
                };
                if count == 0 {
                    0
                } else {
                    element.size_bytes(pool, target_word_bits, min_align)? * u64::from(count)
                }
            }
            Category::Struct => {
                let CompositeDesc::Struct { fields } = composite(pool, self)? else {
                    return Err(Error::internal("struct attrs did not resolve to a struct descriptor"));
                };
                let mut offset = 0u64;
                let mut max_align = min_align.max(1);
                for field in fields {
                    let align = field.align_bytes(pool, target_word_bits, min_align)?;
                    let size = field.size_bytes(pool, target_word_bits, min_align)?;
                    offset = align_up(offset, align);
                    offset += size;
                    max_align = max_align.max(align);
                }
                align_up(offset, max_align)
            }
            Category::Function => 0,
        })
    }

    /// Alignment in bytes: next power of two `>= width/8`, clamped below by
    /// `min_align` — the target's configured minimum alignment (spec §4.A;
    /// e.g. [`crate::target::ResourceRecord::min_align`]).
    pub fn align_bytes(self, pool: &CompositePool, target_word_bits: u32, min_align: u64) -> Result<u64> {
        let min_align = min_align.max(1);
        Ok(match self.category() {
            Category::Void => min_align,
            Category::Bool | Category::Integer | Category::Float => {
                natural_align(u64::from(self.width_bits()) / 8).max(min_align)
            }
            Category::Pointer => natural_align(u64::from(target_word_bits) / 8).max(min_align),
            Category::Vector | Category::Array => {
                let CompositeDesc::Array { element, .. } = composite(pool, self)? else {
                    return Err(Error::internal("expected array descriptor"));
                };
                element.align_bytes(pool, target_word_bits, min_align)?.max(min_align)
            }
            Category::Struct => {
                let CompositeDesc::Struct { fields } = composite(pool, self)? else {
                    return Err(Error::internal("expected struct descriptor"));
                };
                let mut align = min_align;
                for field in fields {
                    align = align.max(field.align_bytes(pool, target_word_bits, min_align)?);
                }
                align
            }
            Category::Function => min_align,
        })
    }

    pub fn to_string_with(self, pool: &CompositePool) -> String {
        match self.category() {
            Category::Void => "void".to_string(),
            Category::Bool => "bool".to_string(),
            Category::Integer => {
                let prefix = if self.qualifiers().contains(Qualifiers::UNSIGNED) { "u" } else { "i" };
                format!("{prefix}{}", self.width_bits())
            }
            Category::Float => format!("f{}", self.width_bits()),
            Category::Pointer => format!("ptr{}", self.width_bits()),
            Category::Vector => match pool.get(self.attributes()) {
                Some(CompositeDesc::Array { element, count }) => {
                    format!("vec<{}, {}>", element.to_string_with(pool), count)
                }
                _ => "vec<?>".to_string(),
            },
            Category::Array => match pool.get(self.attributes()) {
                Some(CompositeDesc::Array { element, count }) => {
                    format!("[{}; {}]", element.to_string_with(pool), count)
                }
                _ => "[?]".to_string(),
            },
            Category::Struct => match pool.get(self.attributes()) {
                Some(CompositeDesc::Struct { fields }) => {
                    let parts: Vec<String> = fields.iter().map(|f| f.to_string_with(pool)).collect();
                    format!("struct {{ {} }}", parts.join(", "))
                }
                _ => "struct {?}".to_string(),
            },
            Category::Function => match pool.get(self.attributes()) {
                Some(CompositeDesc::Function { ret, params, variadic }) => {
                    let mut parts: Vec<String> = params.iter().map(|p| p.to_string_with(pool)).collect();
                    if *variadic {
                        parts.push("...".to_string());
                    }
                    format!("fn({}) -> {}", parts.join(", "), ret.to_string_with(pool))
                }
                _ => "fn(?)".to_string(),
            },
        }
    }
}

fn composite(pool: &CompositePool, t: TypeWord) -> Result<CompositeDesc> {
    pool.get(t.attributes())
        .cloned()
        .ok_or_else(|| Error::internal("dangling composite attribute index"))
}

fn natural_align(size_bytes: u64) -> u64 {
    if size_bytes == 0 {
        1
    } else {
        size_bytes.next_power_of_two()
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    if align == 0 {
        return offset;
    }
    (offset + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_primitive() {
        let t = TypeWord::encode(Category::Integer, 32, Qualifiers::UNSIGNED).unwrap();
        let (c, w, q, a) = t.decode();
        assert_eq!(c, Category::Integer);
        assert_eq!(w, 32);
        assert_eq!(q, Qualifiers::UNSIGNED);
        assert_eq!(a, 0);
    }

    #[test]
    fn rejects_bad_integer_width() {
        assert!(TypeWord::encode(Category::Integer, 5, Qualifiers::NONE).is_err());
    }

    #[test]
    fn pointer_matches_word_size() {
        let p = TypeWord::pointer(64, Qualifiers::NONE).unwrap();
        let pool = CompositePool::new();
        assert_eq!(p.size_bytes(&pool, 64, 1).unwrap(), 8);
        assert_eq!(p.align_bytes(&pool, 64, 1).unwrap(), 8);
    }

    #[test]
    fn compatibility_ignores_const() {
        let a = TypeWord::encode(Category::Integer, 32, Qualifiers::CONST).unwrap();
        let b = TypeWord::encode(Category::Integer, 32, Qualifiers::NONE).unwrap();
        assert!(a.is_compatible(b));
        let c = TypeWord::encode(Category::Integer, 32, Qualifiers::UNSIGNED).unwrap();
        assert!(!a.is_compatible(c));
    }

    #[test]
    fn struct_size_and_align() {
        let mut pool = CompositePool::new();
        // { i8, i32 } -> i8 at 0, pad to 4, i32 at 4..8, total 8, align 4.
        let s = TypeWord::struct_of(&mut pool, vec![TypeWord::I8, TypeWord::I32]).unwrap();
        assert_eq!(s.size_bytes(&pool, 64, 1).unwrap(), 8);
        assert_eq!(s.align_bytes(&pool, 64, 1).unwrap(), 4);
    }

    #[test]
    fn array_of_unsized_is_zero() {
        let mut pool = CompositePool::new();
        let a = TypeWord::array(&mut pool, TypeWord::I32, 0).unwrap();
        assert_eq!(a.size_bytes(&pool, 64, 1).unwrap(), 0);
    }

    #[test]
    fn vector_size_rounds_to_power_of_two() {
        let mut pool = CompositePool::new();
        // 3 lanes of i32 -> raw 12 bytes -> rounded to 16.
        let v = TypeWord::vector(&mut pool, TypeWord::I32, 3).unwrap();
        assert_eq!(v.size_bytes(&pool, 64, 1).unwrap(), 16);
    }

    #[test]
    fn align_is_power_of_two_and_divides_size_when_nonzero() {
        let mut pool = CompositePool::new();
        for t in [TypeWord::I8, TypeWord::I16, TypeWord::I32, TypeWord::I64, TypeWord::F32, TypeWord::F64] {
            let size = t.size_bytes(&pool, 64, 1).unwrap();
            let align = t.align_bytes(&mut pool, 64, 1).unwrap();
            assert!(align.is_power_of_two());
            if size > 0 {
                assert_eq!(size % align, 0);
            }
        }
    }

    #[test]
    fn min_align_clamps_narrow_types() {
        // a target with a 4-byte minimum alignment must never report a
        // smaller alignment for any type, even i8/bool.
        let pool = CompositePool::new();
        assert_eq!(TypeWord::I8.align_bytes(&pool, 64, 4).unwrap(), 4);
        assert_eq!(TypeWord::BOOL.align_bytes(&pool, 64, 4).unwrap(), 4);
        assert_eq!(TypeWord::I64.align_bytes(&pool, 64, 4).unwrap(), 8);
    }
}
