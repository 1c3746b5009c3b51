//! The linear-scan register allocator (spec §4.G). Live ranges are sorted by
//! program point and walked with an active set and spill slots derived from
//! type size, the same shape `regalloc2`-style allocators use, but
//! implemented directly against the spec's own expire/find/hit/miss
//! algorithm rather than calling out to an external allocator crate, since
//! the spec's contention/steal-or-spill rule is simpler than full SSA-aware
//! global allocation and is meant to be inspectable on its own.

use crate::diag::{Category as DiagCategory, Diagnostic, DiagnosticSink, Severity};
use crate::error::{Error, Result};
use crate::ir::{Function, Operand, RegId};
use crate::types::{Category, CompositePool, TypeWord};
use cranelift_entity::EntityRef;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegClass {
    General,
    Float,
    Vector,
}

fn class_of(ty: TypeWord) -> RegClass {
    match ty.category() {
        Category::Float => RegClass::Float,
        Category::Vector => RegClass::Vector,
        _ => RegClass::General,
    }
}

/// `[start, end)` over a linear program-point ordering; spans the
/// instruction that defines `vreg` to the last instruction that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInterval {
    pub vreg: RegId,
    pub class: RegClass,
    pub ty: TypeWord,
    pub start: usize,
    pub end: usize,
}

/// Walk every block and instruction in order, assigning each instruction a
/// program point, and derive one interval per virtual register from its
/// def point to its last use (inclusive of the def itself).
pub fn build_intervals(func: &Function) -> Vec<LiveInterval> {
    let mut by_vreg: HashMap<RegId, LiveInterval> = HashMap::new();
    let mut point = 0usize;

    let mut touch = |by_vreg: &mut HashMap<RegId, LiveInterval>, reg: RegId, ty: TypeWord, point: usize, is_def: bool| {
        by_vreg
            .entry(reg)
            .and_modify(|iv| {
                iv.end = iv.end.max(point);
                if is_def {
                    iv.start = iv.start.min(point);
                }
            })
            .or_insert(LiveInterval { vreg: reg, class: class_of(ty), ty, start: point, end: point });
    };

    for block in func.blocks() {
        for inst in block.instructions() {
            if let Operand::Register(reg, ty) = &inst.result {
                touch(&mut by_vreg, *reg, *ty, point, true);
            }
            for op in &inst.operands {
                if let Operand::Register(reg, ty) = op {
                    touch(&mut by_vreg, *reg, *ty, point, false);
                }
                if let Operand::Memory { base, index, ty, .. } = op {
                    touch(&mut by_vreg, *base, *ty, point, false);
                    if let Some(idx) = index {
                        touch(&mut by_vreg, *idx, *ty, point, false);
                    }
                }
            }
            point += 1;
        }
    }

    let mut intervals: Vec<LiveInterval> = by_vreg.into_values().collect();
    intervals.sort_by_key(|iv| (iv.start, iv.vreg.index()));
    intervals
}

#[derive(Debug, Clone, Copy)]
struct ActiveEntry {
    vreg: RegId,
    class: RegClass,
    end: usize,
    preg: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorStats {
    pub total: usize,
    pub spilled: usize,
    pub slots: usize,
}

/// The allocator's own fixed-size physical register pools per class; spec
/// §4.G does not name concrete registers, only pool sizes, so assigned
/// registers are plain 0-based indices within their class.
pub struct LinearScanAllocator {
    general_regs: u32,
    float_regs: u32,
    vector_regs: u32,
    assigned: HashMap<RegId, u32>,
    spilled: HashMap<RegId, u32>,
    spill_slot_sizes: Vec<u64>,
    frame_size: u64,
    stats: AllocatorStats,
}

impl LinearScanAllocator {
    pub fn new(general_regs: u32, float_regs: u32, vector_regs: u32) -> Self {
        LinearScanAllocator {
            general_regs,
            float_regs,
            vector_regs,
            assigned: HashMap::new(),
            spilled: HashMap::new(),
            spill_slot_sizes: Vec::new(),
            frame_size: 0,
            stats: AllocatorStats::default(),
        }
    }

    fn pool_size(&self, class: RegClass) -> u32 {
        match class {
            RegClass::General => self.general_regs,
            RegClass::Float => self.float_regs,
            RegClass::Vector => self.vector_regs,
        }
    }

    /// Assign a fresh spill slot to `vreg`, sized from its type (minimum 4
    /// bytes, slots accumulate in allocation order per spec §4.G). `min_align`
    /// is the target's minimum alignment, forwarded to [`TypeWord::size_bytes`].
    fn spill(&mut self, vreg: RegId, ty: TypeWord, pool: &CompositePool, target_word_bits: u32, min_align: u64) -> Result<()> {
        let size = ty.size_bytes(pool, target_word_bits, min_align)?.max(4);
        let offset = self.frame_size;
        self.spill_slot_sizes.push(size);
        self.spilled.insert(vreg, offset as u32);
        self.frame_size += size;
        Ok(())
    }

    /// Run the expire/find/hit/miss algorithm over `intervals`, which must
    /// already be sorted by start (the order [`build_intervals`] returns).
    /// `min_align` is the target's minimum alignment (spec §4.A), used when
    /// sizing spill slots.
    pub fn run(
        &mut self,
        intervals: &[LiveInterval],
        pool: &CompositePool,
        target_word_bits: u32,
        min_align: u64,
    ) -> Result<()> {
        let mut active: Vec<ActiveEntry> = Vec::new();
        self.stats.total += intervals.len();

        for iv in intervals {
            // 1. Expire.
            let mut i = 0;
            while i < active.len() {
                if active[i].end <= iv.start {
                    active.remove(i);
                } else {
                    i += 1;
                }
            }

            // 2. Find register: first index in this class's pool not held
            // by an active interval of the same class.
            let pool_size = self.pool_size(iv.class);
            let held: Vec<u32> = active.iter().filter(|a| a.class == iv.class).map(|a| a.preg).collect();
            let free_reg = (0..pool_size).find(|candidate| !held.contains(candidate));

            match free_reg {
                Some(preg) => {
                    // 3. Hit.
                    self.assigned.insert(iv.vreg, preg);
                    active.push(ActiveEntry { vreg: iv.vreg, class: iv.class, end: iv.end, preg });
                }
                None => {
                    // 4. Miss: find the matching-class active interval with
                    // the greatest end.
                    let victim_pos = active
                        .iter()
                        .enumerate()
                        .filter(|(_, a)| a.class == iv.class)
                        .max_by_key(|(_, a)| a.end)
                        .map(|(pos, _)| pos);

                    match victim_pos {
                        Some(pos) if active[pos].end > iv.end => {
                            let victim = active.remove(pos);
                            self.spill(victim.vreg, victim_reg_ty(intervals, victim.vreg), pool, target_word_bits, min_align)?;
                            self.assigned.insert(iv.vreg, victim.preg);
                            active.push(ActiveEntry { vreg: iv.vreg, class: iv.class, end: iv.end, preg: victim.preg });
                        }
                        _ => {
                            self.spill(iv.vreg, iv.ty, pool, target_word_bits, min_align)?;
                        }
                    }
                }
            }
        }

        self.stats.spilled += self.spilled.len();
        self.stats.slots += self.spill_slot_sizes.len();
        Ok(())
    }

    /// Physical register index for `vreg`, or `None` if spilled or unknown.
    pub fn map(&self, vreg: RegId) -> Option<u32> {
        self.assigned.get(&vreg).copied()
    }

    pub fn is_spilled(&self, vreg: RegId) -> bool {
        self.spilled.contains_key(&vreg)
    }

    pub fn spill_offset(&self, vreg: RegId) -> Result<u32> {
        self.spilled.get(&vreg).copied().ok_or_else(|| Error::bad_argument(format!("{vreg} is not spilled")))
    }

    /// Sum of spill slot sizes, rounded up to 16 bytes (spec §4.G).
    pub fn frame_size(&self) -> u64 {
        let size = self.frame_size;
        size.div_ceil(16) * 16
    }

    pub fn stats(&self) -> AllocatorStats {
        self.stats
    }
}

/// Allocation algorithm choice (spec §4.G "Other algorithms"). Only
/// [`Algorithm::LinearScan`] is implemented; the other two are accepted so
/// callers can select them without a compile error, but [`run_with_algorithm`]
/// falls back to linear scan and reports a warning through the diagnostics
/// sink, per spec §4.G: "Graph-colouring and greedy variants are selectable
/// but fall back to linear-scan if unimplemented (emit a warning through the
/// diagnostics sink)."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    LinearScan,
    GraphColoring,
    Greedy,
}

impl LinearScanAllocator {
    /// Run allocation using `algorithm`; see [`Algorithm`] for the fallback
    /// contract when `algorithm` is not [`Algorithm::LinearScan`].
    pub fn run_with_algorithm(
        &mut self,
        algorithm: Algorithm,
        intervals: &[LiveInterval],
        pool: &CompositePool,
        target_word_bits: u32,
        min_align: u64,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        match algorithm {
            Algorithm::LinearScan => {}
            Algorithm::GraphColoring | Algorithm::Greedy => {
                sink.report(Diagnostic::new(
                    Severity::Warning,
                    DiagCategory::Optimizer,
                    1,
                    format!("{algorithm:?} allocator not implemented; fell back to linear scan"),
                ));
            }
        }
        self.run(intervals, pool, target_word_bits, min_align)
    }
}

/// Linear scan over `intervals` for the original type of `vreg`; used only
/// to size a victim's spill slot, since [`ActiveEntry`] itself does not
/// carry a type.
fn victim_reg_ty(intervals: &[LiveInterval], vreg: RegId) -> TypeWord {
    intervals
        .iter()
        .find(|iv| iv.vreg == vreg)
        .map(|iv| iv.ty)
        .unwrap_or(TypeWord::I32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompositePool;

    fn interval(vreg: u32, start: usize, end: usize) -> LiveInterval {
        LiveInterval { vreg: RegId::new(vreg as usize), class: RegClass::General, ty: TypeWord::I32, start, end }
    }

    #[test]
    fn contention_scenario_spills_greatest_end() {
        // spec §8 scenario 2: 4 intervals, 2 general registers,
        // starts {0,1,2,3}, ends {5,4,3,6}.
        let intervals = vec![interval(0, 0, 5), interval(1, 1, 4), interval(2, 2, 3), interval(3, 3, 6)];
        let mut alloc = LinearScanAllocator::new(2, 0, 0);
        let pool = CompositePool::new();
        alloc.run(&intervals, &pool, 64, 1).unwrap();

        let spilled_vregs: Vec<u32> = (0..4u32).filter(|v| alloc.is_spilled(RegId::new(*v as usize))).collect();
        assert_eq!(spilled_vregs.len(), 1);
        assert_eq!(spilled_vregs[0], 0);
        assert!(alloc.map(RegId::new(0)).is_none());
        assert!(alloc.map(RegId::new(1)).is_some());
        assert!(alloc.map(RegId::new(2)).is_some());
        assert!(alloc.map(RegId::new(3)).is_some());
    }

    #[test]
    fn no_contention_assigns_every_vreg_a_register() {
        let intervals = vec![interval(0, 0, 1), interval(1, 2, 3)];
        let mut alloc = LinearScanAllocator::new(2, 0, 0);
        let pool = CompositePool::new();
        alloc.run(&intervals, &pool, 64, 1).unwrap();
        assert!(alloc.map(RegId::new(0)).is_some());
        assert!(alloc.map(RegId::new(1)).is_some());
        assert_eq!(alloc.stats().spilled, 0);
    }

    #[test]
    fn frame_size_rounds_up_to_16() {
        let intervals = vec![interval(0, 0, 10), interval(1, 0, 10), interval(2, 0, 10)];
        let mut alloc = LinearScanAllocator::new(2, 0, 0);
        let pool = CompositePool::new();
        alloc.run(&intervals, &pool, 64, 1).unwrap();
        assert_eq!(alloc.stats().spilled, 1);
        assert_eq!(alloc.frame_size() % 16, 0);
        assert!(alloc.frame_size() >= 4);
    }

    #[test]
    fn unimplemented_algorithm_falls_back_and_warns() {
        use crate::diag::CollectingSink;

        let intervals = vec![interval(0, 0, 1), interval(1, 2, 3)];
        let mut alloc = LinearScanAllocator::new(2, 0, 0);
        let pool = CompositePool::new();
        let mut sink = CollectingSink::default();
        alloc
            .run_with_algorithm(Algorithm::GraphColoring, &intervals, &pool, 64, 1, &mut sink)
            .unwrap();

        assert!(alloc.map(RegId::new(0)).is_some());
        assert!(alloc.map(RegId::new(1)).is_some());
        assert_eq!(sink.diagnostics.len(), 1);
        assert_eq!(sink.diagnostics[0].severity, Severity::Warning);
        assert_eq!(sink.diagnostics[0].category, DiagCategory::Optimizer);
    }
}
