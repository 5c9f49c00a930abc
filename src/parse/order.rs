//! Reverse structured post-order computation.
//!
//! A depth-first traversal from the entry block, pushing each block after
//! its successors (post-order) and reversing at the end. Two twists make
//! the result "structured":
//!
//! * a block's declared merge block (and, for loops, continue target) is
//!   visited *before* its terminator successors, which lands merges after
//!   the whole construct body in the final (reversed) order — even a merge
//!   no real edge reaches (e.g. after an infinite loop) gets a position;
//! * successor visit order is chosen so the final order reads naturally:
//!   false-then-true for conditional branches (so `then` precedes `else`),
//!   and natural operand order for `OpSwitch` (so later-declared cases
//!   surface *earlier*, except where a fallthrough edge pins a case right
//!   behind its predecessor).
//!
//! Blocks not reached this way are statically dead and get no position.
//! `OpKill` and `OpUnreachable` terminate without successors.

use crate::spv::spec::Op;
use crate::spv::{FunctionIr, ModuleIr};
use crate::FxHashMap;
use crate::FxHashSet;

pub(crate) struct StructuredTraverser<'a> {
    module: &'a ModuleIr,
    /// Label ID -> index in `function.blocks`.
    block_index: FxHashMap<u32, usize>,
    function: &'a FunctionIr,
    visited: FxHashSet<u32>,
    visit_order: Vec<u32>,
}

impl<'a> StructuredTraverser<'a> {
    pub(crate) fn new(module: &'a ModuleIr, function: &'a FunctionIr) -> Self {
        let block_index =
            function.blocks.iter().enumerate().map(|(i, b)| (b.label_id, i)).collect();
        Self { module, block_index, function, visited: FxHashSet::default(), visit_order: vec![] }
    }

    /// The block IDs in reverse structured post-order.
    pub(crate) fn reverse_structured_post_order(mut self) -> Vec<u32> {
        if !self.function.blocks.is_empty() {
            self.visit_backward(self.function.blocks[0].label_id);
        }
        self.visit_order.reverse();
        self.visit_order
    }

    fn visit_backward(&mut self, id: u32) {
        let Some(&index) = self.block_index.get(&id) else {
            // Branches to non-blocks are diagnosed by terminator validation.
            return;
        };
        if !self.visited.insert(id) {
            return;
        }
        let block = &self.function.blocks[index];

        if let Some(merge_index) = block.merge {
            let merge_inst = &self.module.insts[merge_index];
            // Merge first, then the continue target: the reversal puts the
            // merge after everything else in the construct.
            self.visit_backward(merge_inst.operand(0));
            if merge_inst.op == Op::LoopMerge {
                self.visit_backward(merge_inst.operand(1));
            }
        }

        let terminator = &self.module.insts[block.terminator];
        match terminator.op {
            Op::Branch => self.visit_backward(terminator.operand(0)),
            Op::BranchConditional => {
                // False before true, so `then` precedes `else` after the
                // reversal. Duplicate targets collapse to a single visit.
                self.visit_backward(terminator.operand(2));
                self.visit_backward(terminator.operand(1));
            }
            Op::Switch => {
                // Default first, then case targets in operand order.
                self.visit_backward(terminator.operand(1));
                let mut i = 3;
                while i < terminator.operands.len() {
                    self.visit_backward(terminator.operand(i));
                    i += 2;
                }
            }
            // Kill, Unreachable, Return, ReturnValue: dead ends.
            _ => {}
        }

        self.visit_order.push(id);
    }
}
