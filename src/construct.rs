//! Structured control-flow constructs.
//!
//! A [`Construct`] is a region of a function's CFG: the whole function, an
//! if- or switch-selection, one switch case, a loop, or a loop's continue
//! construct. Constructs form a tree (every construct nests entirely inside
//! exactly one parent), computed once per function after the block order is
//! known, and consumed only during structured statement emission.
//!
//! Positions are indices into the function's reverse structured post-order;
//! a construct covers the half-open position range `[begin_pos, end_pos)`.

/// Index of a construct in the per-function construct list.
pub type ConstructId = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstructKind {
    /// The entire function body.
    Function,
    /// An `OpSelectionMerge` + `OpBranchConditional` region.
    IfSelection,
    /// An `OpSelectionMerge` + `OpSwitch` region.
    SwitchSelection,
    /// One case (or default) target region of a switch selection.
    SwitchCase,
    /// The loop proper: from the `OpLoopMerge` header up to (not including)
    /// the continue target.
    Loop,
    /// The continue construct: from the continue target up to (not
    /// including) the loop merge.
    Continue,
}

#[derive(Clone, Debug)]
pub struct Construct {
    pub kind: ConstructKind,
    /// Index of the parent construct; `None` only for the function construct.
    pub parent: Option<ConstructId>,
    /// Nesting depth; the function construct has depth 0.
    pub depth: u32,

    /// The label ID of the first block of the construct (the header, case
    /// head, or continue target), or the function entry block.
    pub begin_id: u32,
    /// The label ID of the block that structurally ends the construct (the
    /// merge block, the continue target for a loop, the next case head for
    /// a case), or 0 for the function construct.
    pub end_id: u32,

    pub begin_pos: u32,
    pub end_pos: u32,
    /// Where the *scope* of names declared in this construct ends. For a
    /// loop this extends over the continue construct: WGSL makes loop-body
    /// declarations visible in `continuing`.
    pub scope_end_pos: u32,
}

impl Construct {
    /// Does this construct contain the given block position?
    pub fn contains_pos(&self, pos: u32) -> bool {
        self.begin_pos <= pos && pos < self.end_pos
    }

    /// Does the construct's *scope* contain the given block position?
    pub fn scope_contains_pos(&self, pos: u32) -> bool {
        self.begin_pos <= pos && pos < self.scope_end_pos
    }
}

/// Walks up the parent chain from `start`, returning the first construct
/// satisfying `pred`, if any.
pub fn enclosing<'a>(
    constructs: &'a [Construct],
    start: ConstructId,
    mut pred: impl FnMut(&Construct) -> bool,
) -> Option<(ConstructId, &'a Construct)> {
    let mut current = Some(start);
    while let Some(id) = current {
        let construct = &constructs[id];
        if pred(construct) {
            return Some((id, construct));
        }
        current = construct.parent;
    }
    None
}

/// The smallest construct that encloses both positions, following parents
/// from `start` (which must contain `first_pos`). Scope ranges are used, so
/// a loop encloses its continue construct for this query.
pub fn smallest_enclosing_scope(
    constructs: &[Construct],
    start: ConstructId,
    first_pos: u32,
    last_pos: u32,
) -> ConstructId {
    let mut current = start;
    loop {
        let construct = &constructs[current];
        if construct.scope_contains_pos(first_pos) && construct.scope_contains_pos(last_pos) {
            return current;
        }
        match construct.parent {
            Some(parent) => current = parent,
            // The function construct contains everything.
            None => return current,
        }
    }
}
