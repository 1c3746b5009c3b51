//! Auxiliary CFG analyses used by the optimiser passes (spec §4.E): a
//! dominator tree (for LICM's natural-loop detection) and extended basic
//! block discovery (for CSE's scope). Deliberately minimal — this crate does
//! not build SSA or a full e-graph the way `cranelift-codegen`'s
//! `dominator_tree.rs`/`egraph.rs` do, since spec §1 explicitly excludes SSA
//! construction from this core's responsibilities.

use crate::ir::{BlockId, Function};
use std::collections::{HashMap, HashSet};

/// Dominator tree computed with the standard iterative data-flow algorithm
/// (Cooper/Harvey/Kennedy), grounded on `cranelift-codegen::dominator_tree`
/// but trimmed to the single query LICM needs: "does `a` dominate `b`?".
pub struct DominatorTree {
    /// Reverse postorder block list.
    rpo: Vec<BlockId>,
    /// Immediate dominator of each block, indexed by position in `rpo`.
    idom: HashMap<BlockId, BlockId>,
    entry: BlockId,
}

impl DominatorTree {
    pub fn compute(func: &Function) -> Self {
        let Some(entry) = func.entry_block() else {
            return DominatorTree { rpo: Vec::new(), idom: HashMap::new(), entry: BlockId::new(0) };
        };
        let rpo = reverse_postorder(func, entry);
        let position: HashMap<BlockId, usize> = rpo.iter().enumerate().map(|(i, b)| (*b, i)).collect();

        let mut idom: HashMap<BlockId, BlockId> = HashMap::new();
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let preds: Vec<BlockId> = func
                    .block(block)
                    .map(|b| b.predecessors().to_vec())
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|p| idom.contains_key(p))
                    .collect();
                let Some((&first, rest)) = preds.split_first() else { continue };
                let mut new_idom = first;
                for &p in rest {
                    new_idom = intersect(&position, &idom, new_idom, p);
                }
                if idom.get(&block) != Some(&new_idom) {
                    idom.insert(block, new_idom);
                    changed = true;
                }
            }
        }

        DominatorTree { rpo, idom, entry }
    }

    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        loop {
            match self.idom.get(&cur) {
                None => return false,
                Some(&next) => {
                    if next == cur {
                        return a == cur;
                    }
                    if next == a {
                        return true;
                    }
                    cur = next;
                }
            }
        }
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.rpo
    }
}

fn intersect(
    position: &HashMap<BlockId, usize>,
    idom: &HashMap<BlockId, BlockId>,
    mut a: BlockId,
    mut b: BlockId,
) -> BlockId {
    while a != b {
        while position[&a] > position[&b] {
            a = idom[&a];
        }
        while position[&b] > position[&a] {
            b = idom[&b];
        }
    }
    a
}

fn reverse_postorder(func: &Function, entry: BlockId) -> Vec<BlockId> {
    let mut visited = HashSet::new();
    let mut postorder = Vec::new();
    let mut stack = vec![(entry, false)];
    while let Some((block, expanded)) = stack.pop() {
        if expanded {
            postorder.push(block);
            continue;
        }
        if !visited.insert(block) {
            continue;
        }
        stack.push((block, true));
        if let Some(b) = func.block(block) {
            for &succ in b.successors() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
    }
    postorder.reverse();
    postorder
}

/// A natural loop: a header block and the set of blocks in its body,
/// discovered via a dominator backedge (`tail -> header` where `header`
/// dominates `tail`), spec §4.E LICM.
pub struct NaturalLoop {
    pub header: BlockId,
    pub body: HashSet<BlockId>,
}

/// Find all natural loops in `func` using `domtree`.
pub fn natural_loops(func: &Function, domtree: &DominatorTree) -> Vec<NaturalLoop> {
    let mut loops = Vec::new();
    for &block in domtree.reverse_postorder() {
        let Some(b) = func.block(block) else { continue };
        for &succ in b.successors() {
            if domtree.dominates(succ, block) {
                // `block -> succ` is a backedge; `succ` is the loop header.
                let body = find_loop_body(func, succ, block);
                loops.push(NaturalLoop { header: succ, body });
            }
        }
    }
    loops
}

fn find_loop_body(func: &Function, header: BlockId, tail: BlockId) -> HashSet<BlockId> {
    let mut body = HashSet::new();
    body.insert(header);
    if header == tail {
        return body;
    }
    body.insert(tail);
    let mut worklist = vec![tail];
    while let Some(block) = worklist.pop() {
        if let Some(b) = func.block(block) {
            for &pred in b.predecessors() {
                if body.insert(pred) {
                    worklist.push(pred);
                }
            }
        }
    }
    body
}

/// Extended basic blocks: a single-entry region reachable without crossing
/// another block's join point, used to scope CSE (spec §4.E). A block joins
/// its predecessor's EBB iff it has exactly one predecessor and that
/// predecessor is already in the same EBB.
pub fn extended_basic_blocks(func: &Function) -> Vec<Vec<BlockId>> {
    let mut ebbs = Vec::new();
    let mut assigned: HashSet<BlockId> = HashSet::new();
    for b in func.blocks() {
        if assigned.contains(&b.id) {
            continue;
        }
        let mut ebb = vec![b.id];
        assigned.insert(b.id);
        let mut frontier = b.id;
        loop {
            let Some(cur) = func.block(frontier) else { break };
            let mut advanced = false;
            for &succ in cur.successors() {
                if assigned.contains(&succ) {
                    continue;
                }
                if let Some(sb) = func.block(succ) {
                    if sb.predecessors().len() == 1 {
                        ebb.push(succ);
                        assigned.insert(succ);
                        frontier = succ;
                        advanced = true;
                        break;
                    }
                }
            }
            if !advanced {
                break;
            }
        }
        ebbs.push(ebb);
    }
    ebbs
}

use cranelift_entity::EntityRef;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Flags, FuncId, Instruction, Opcode, Operand};
    use crate::types::TypeWord;

    fn linear_func() -> Function {
        // entry -> mid -> exit, straight line, no branching.
        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        let entry = f.append_block("entry");
        let mid = f.append_block("mid");
        let exit = f.append_block("exit");
        f.block_mut(entry).unwrap().append(br(mid)).unwrap();
        f.block_mut(mid).unwrap().append(br(exit)).unwrap();
        f.block_mut(exit).unwrap().append(ret()).unwrap();
        f.recompute_cfg();
        f
    }

    fn br(target: BlockId) -> Instruction {
        Instruction {
            opcode: Opcode::Br,
            flags: Flags::NONE,
            result_type: TypeWord::VOID,
            result: Instruction::no_result(),
            operands: smallvec::smallvec![Operand::BlockRef(target)],
        }
    }

    fn ret() -> Instruction {
        Instruction {
            opcode: Opcode::Ret,
            flags: Flags::NONE,
            result_type: TypeWord::VOID,
            result: Instruction::no_result(),
            operands: smallvec::smallvec![],
        }
    }

    #[test]
    fn dominator_tree_linear_chain() {
        let f = linear_func();
        let dt = DominatorTree::compute(&f);
        let blocks: Vec<BlockId> = f.blocks().iter().map(|b| b.id).collect();
        assert!(dt.dominates(blocks[0], blocks[1]));
        assert!(dt.dominates(blocks[0], blocks[2]));
        assert!(dt.dominates(blocks[1], blocks[2]));
        assert!(!dt.dominates(blocks[2], blocks[0]));
    }

    #[test]
    fn single_ebb_for_linear_chain() {
        let f = linear_func();
        let ebbs = extended_basic_blocks(&f);
        assert_eq!(ebbs.len(), 1);
        assert_eq!(ebbs[0].len(), 3);
    }

    #[test]
    fn no_natural_loops_in_linear_chain() {
        let f = linear_func();
        let dt = DominatorTree::compute(&f);
        assert!(natural_loops(&f, &dt).is_empty());
    }
}
