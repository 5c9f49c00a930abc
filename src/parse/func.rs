//! Per-function emission: control-flow reconstruction and instruction
//! translation.
//!
//! A [`FunctionEmitter`] runs a staged pipeline over one SPIR-V function:
//!
//! 1. register basic blocks and validate terminators and merges,
//! 2. compute the reverse structured post-order (see [`super::order`]),
//! 3. find switch case heads, build the construct tree, classify every CFG
//!    edge, and find if-selection internal heads (then/else/premerge),
//! 4. analyze local definitions (inline vs `let` vs hoisted `var`, phi
//!    state variables),
//! 5. walk the blocks in order, emitting structured statements through a
//!    stack of statement frames, translating each instruction to an AST
//!    expression or statement.
//!
//! The construct tree and block order are computed entirely before any
//! statement is emitted, so emission never consults the CFG again.

use super::order::StructuredTraverser;
use super::{Parser, TypedExpr};
use crate::ast;
use crate::construct::{
    enclosing, smallest_enclosing_scope, Construct, ConstructId, ConstructKind,
};
use crate::spv::spec::{self, image_operands, Op};
use crate::spv::{self, RawInst};
use crate::{Failure, FxHashMap, FxHashSet, FxIndexMap, Result};
use itertools::Itertools as _;
use smallvec::SmallVec;
use std::rc::Rc;

/// Classification of a CFG edge, used to decide which structured statement
/// (if any) a branch becomes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// A back-edge to a loop header, from its continue construct.
    Back,
    /// To the merge of the nearest enclosing switch (no intervening loop):
    /// a `break` out of the switch.
    SwitchBreak,
    /// To the merge of the nearest enclosing loop (no intervening switch):
    /// a `break` out of the loop.
    LoopBreak,
    /// To the continue target of the nearest enclosing loop: `continue`.
    LoopContinue,
    /// To the merge of the nearest enclosing if-selection: reconvergence,
    /// not a statement (except for flow-guard updates).
    IfBreak,
    /// From one switch case into a sibling case: `fallthrough`.
    CaseFallThrough,
    /// Ordinary forward flow inside a construct.
    Forward,
}

/// Bookkeeping for one basic block.
#[derive(Clone, Debug, Default)]
pub struct BlockInfo {
    /// The OpLabel result ID.
    pub id: u32,
    /// Index into the function's block list.
    pub block_index: usize,
    /// Position in the reverse structured post-order. Only meaningful when
    /// `reachable` is set.
    pub pos: u32,
    pub reachable: bool,

    /// If this block is a header, the merge block ID.
    pub merge_for_header: u32,
    /// If this block is a loop header, the continue target ID.
    pub continue_for_header: u32,
    /// If this block is a merge, the header that declared it.
    pub header_for_merge: u32,
    /// If this block is a continue target, the loop header that declared it.
    pub header_for_continue: u32,
    /// Continue target which is its own loop header: the continue construct
    /// is the entire loop and no separate loop construct exists.
    pub is_continue_entire_loop: bool,

    /// The innermost enclosing construct, once labeled.
    pub construct: Option<ConstructId>,

    /// Successor edge classification, in terminator operand order.
    pub succ_edge: FxIndexMap<u32, EdgeKind>,

    /// Switch bookkeeping on the *header*:
    pub switch_default_id: u32,
    pub default_is_merge: bool,
    /// Selector values whose target is the merge itself (empty clauses).
    pub empty_case_values: Vec<u64>,

    /// Switch bookkeeping on *case head* blocks: the switch header this
    /// block heads a case (or the default) for.
    pub case_head_for: Option<u32>,
    pub default_head_for: Option<u32>,
    /// Selector values branching to this case head.
    pub case_values: Vec<u64>,

    /// If-selection internal heads (on the selection header).
    pub true_head: u32,
    pub false_head: u32,
    pub premerge_head: u32,
    /// Name of the boolean flow-guard variable, when the premerge needs one.
    pub flow_guard_name: Option<String>,

    /// Result IDs whose hoisted `var` declarations go at the top of this
    /// block's construct.
    pub hoisted_ids: Vec<u32>,
    /// Phi state variables declared at the top of this block.
    pub phis_needing_state_vars: Vec<u32>,
    /// Writes to phi state variables performed at the end of this block.
    pub phi_assignments: Vec<(u32, u32)>,
}

/// Bookkeeping for a locally defined result ID.
#[derive(Clone, Debug)]
struct DefInfo {
    inst_index: usize,
    block_pos: u32,
    num_uses: u32,
    last_use_pos: u32,
    used_in_another_construct: bool,
    requires_named_const_def: bool,
    requires_hoisted_def: bool,
    /// For `OpPhi`: the state variable written by predecessor blocks.
    phi_var: Option<String>,
}

/// What a statement frame builds when it completes.
enum FrameKind {
    FunctionBody,
    /// Whole if construct; completes at the premerge head or the merge.
    If {
        condition: ast::Expression,
        then_stmts: Vec<ast::Statement>,
        else_stmts: Vec<ast::Statement>,
        premerge_head: u32,
        merge_id: u32,
        guard_name: Option<String>,
    },
    /// Then clause; deposits into the nearest `If` frame.
    Then,
    /// Else clause; deposits into the nearest `If` frame.
    Else,
    /// Premerge region wrapped in `if (guard) { ... }`.
    Guard { condition: ast::Expression },
    /// Loop body; ends at the continue target, or at the merge when the
    /// continue construct is the entire loop.
    LoopBody { has_continue: bool },
    /// Continuing clause, carrying the completed loop body.
    Continuing { body: Vec<ast::Statement> },
    /// The switch; completes at its merge.
    Switch {
        selector: ast::Expression,
        selector_signed: bool,
        cases: Vec<ast::SwitchCase>,
        default_is_merge: bool,
        empty_case_values: Vec<u64>,
    },
    /// One case clause; deposits into the nearest `Switch` frame.
    Case { selectors: Vec<ast::Literal>, is_default: bool },
}

struct Frame {
    kind: FrameKind,
    /// The block ID at which this frame completes (0: never, i.e. the
    /// function body frame).
    end_id: u32,
    statements: Vec<ast::Statement>,
}

/// Emits one SPIR-V function onto the parser's AST module.
pub struct FunctionEmitter<'p> {
    parser: &'p mut Parser,
    module: Rc<spv::ModuleIr>,
    function_index: usize,

    block_info: FxHashMap<u32, BlockInfo>,
    block_order: Vec<u32>,
    constructs: Vec<Construct>,

    def_info: FxIndexMap<u32, DefInfo>,
    /// IDs that resolve to a plain identifier (params, vars, emitted defs).
    identifier_values: FxHashSet<u32>,
    /// Single-use values waiting to be inlined at their use site.
    singly_used_values: FxHashMap<u32, TypedExpr>,

    frames: Vec<Frame>,
    /// Completed loop bodies waiting for their continuing clause.
    pending_loop_bodies: Vec<Vec<ast::Statement>>,

    function_variables: Vec<ast::Statement>,
}

impl<'p> FunctionEmitter<'p> {
    pub fn new(parser: &'p mut Parser, function_index: usize) -> Self {
        let module = parser.module_ir();
        Self {
            parser,
            module,
            function_index,
            block_info: FxHashMap::default(),
            block_order: vec![],
            constructs: vec![],
            def_info: FxIndexMap::default(),
            identifier_values: FxHashSet::default(),
            singly_used_values: FxHashMap::default(),
            frames: vec![],
            pending_loop_bodies: vec![],
            function_variables: vec![],
        }
    }

    fn function(&self) -> &spv::FunctionIr {
        &self.module.functions[self.function_index]
    }

    fn fail(&mut self, message: impl Into<String>) -> Failure {
        self.parser.fail(message)
    }

    /// Runs the whole pipeline for this function.
    pub fn emit(&mut self) -> Result<()> {
        if self.function().blocks.is_empty() {
            // A function declaration without a body: nothing to emit.
            return Ok(());
        }
        let (name, params, return_type) = self.emit_function_declaration()?;

        self.register_basic_blocks();
        self.terminators_are_valid()?;
        self.register_merges()?;
        self.compute_block_order_and_positions();
        self.verify_header_continue_merge_order()?;
        self.find_switch_case_headers()?;
        self.label_control_flow_constructs()?;
        self.classify_cfg_edges()?;
        self.find_if_selection_internal_headers()?;
        self.register_locally_defined_values()?;
        self.find_values_needing_named_or_hoisted_definition()?;
        self.emit_function_variables()?;
        let body = self.emit_function_body_statements()?;

        self.parser.ast_module_mut().functions.push(ast::Function {
            name,
            params,
            return_type,
            body,
        });
        Ok(())
    }

    /// Resolves the function's name, parameters, and return type.
    fn emit_function_declaration(
        &mut self,
    ) -> Result<(String, Vec<ast::FunctionParam>, ast::Type)> {
        let function = self.function();
        let fn_id = function.result_id;
        let return_type_id = function.return_type_id;
        let param_indices: Vec<usize> = function.params.clone();

        let name = self.parser.namer.name(fn_id);
        let return_type = self.parser.convert_type(return_type_id)?;

        let mut params = Vec::with_capacity(param_indices.len());
        for index in param_indices {
            let inst = self.module.insts[index].clone();
            let param_id = inst.result_id;
            let ty = if self.is_handle_pointer_type(inst.result_type_id) {
                self.parser.get_type_for_handle_var(param_id)?
            } else {
                self.parser.convert_type(inst.result_type_id)?
            };
            let param_name = self.parser.namer.name(param_id);
            self.identifier_values.insert(param_id);
            params.push(ast::FunctionParam { name: param_name, ty });
        }
        Ok((name, params, return_type))
    }

    // ------------------------------------------------------------------
    // CFG registration and validation
    // ------------------------------------------------------------------

    /// Populates the block info map for every block in the function.
    pub fn register_basic_blocks(&mut self) {
        let labels: Vec<u32> = self.function().blocks.iter().map(|b| b.label_id).collect();
        for (index, id) in labels.into_iter().enumerate() {
            self.block_info
                .insert(id, BlockInfo { id, block_index: index, ..Default::default() });
        }
    }

    /// The unique successor label IDs of a block, in terminator operand
    /// order.
    fn successors(&self, block_id: u32) -> SmallVec<[u32; 4]> {
        let mut result = SmallVec::new();
        let Some(info) = self.block_info.get(&block_id) else { return result };
        let block = &self.function().blocks[info.block_index];
        let terminator = &self.module.insts[block.terminator];
        let mut push = |id: u32| {
            if !result.contains(&id) {
                result.push(id);
            }
        };
        match terminator.op {
            Op::Branch => push(terminator.operand(0)),
            Op::BranchConditional => {
                push(terminator.operand(1));
                push(terminator.operand(2));
            }
            Op::Switch => {
                push(terminator.operand(1));
                let mut i = 3;
                while i < terminator.operands.len() {
                    push(terminator.operand(i));
                    i += 2;
                }
            }
            _ => {}
        }
        result
    }

    fn terminator_of(&self, block_id: u32) -> RawInst {
        let info = &self.block_info[&block_id];
        let block = &self.function().blocks[info.block_index];
        self.module.insts[block.terminator].clone()
    }

    fn merge_inst_of(&self, block_id: u32) -> Option<RawInst> {
        let info = self.block_info.get(&block_id)?;
        let block = &self.function().blocks[info.block_index];
        block.merge.map(|i| self.module.insts[i].clone())
    }

    /// Checks that terminators only branch to labels in this function.
    pub fn terminators_are_valid(&mut self) -> Result<()> {
        let ids: Vec<u32> = self.function().blocks.iter().map(|b| b.label_id).collect();
        for &id in &ids {
            for succ in self.successors(id) {
                if !self.block_info.contains_key(&succ) {
                    return Err(self.fail(format!(
                        "Block {id} branches to {succ} which is not a label in the function"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Records merge/continue cross-links and validates the merge
    /// declarations themselves.
    pub fn register_merges(&mut self) -> Result<()> {
        let ids: Vec<u32> = self.function().blocks.iter().map(|b| b.label_id).collect();
        for &header in &ids {
            let Some(merge_inst) = self.merge_inst_of(header) else { continue };
            let terminator = self.terminator_of(header);
            let merge = merge_inst.operand(0);
            if !self.block_info.contains_key(&merge) {
                return Err(self.fail(format!(
                    "Structured header {header} declares invalid merge block {merge}"
                )));
            }
            match merge_inst.op {
                Op::SelectionMerge => {
                    if !matches!(terminator.op, Op::BranchConditional | Op::Switch) {
                        return Err(self.fail(format!(
                            "Selection header {header} does not end in an OpBranchConditional \
                             or OpSwitch"
                        )));
                    }
                }
                Op::LoopMerge => {
                    if !matches!(terminator.op, Op::Branch | Op::BranchConditional) {
                        return Err(self.fail(format!(
                            "Loop header {header} does not end in an OpBranch or \
                             OpBranchConditional"
                        )));
                    }
                    let continue_target = merge_inst.operand(1);
                    if !self.block_info.contains_key(&continue_target) {
                        return Err(self.fail(format!(
                            "Structured header {header} declares invalid continue target \
                             {continue_target}"
                        )));
                    }
                    if continue_target == merge {
                        return Err(self.fail(format!(
                            "Invalid structured header block {header}: declares block {merge} \
                             as both its merge block and continue target"
                        )));
                    }
                    let previous =
                        self.block_info.get(&continue_target).unwrap().header_for_continue;
                    if previous != 0 {
                        return Err(self.fail(format!(
                            "Block {continue_target} declared as continue target for more than \
                             one header: {previous}, {header}"
                        )));
                    }
                    let info = self.block_info.get_mut(&continue_target).unwrap();
                    info.header_for_continue = header;
                    let info = self.block_info.get_mut(&header).unwrap();
                    info.continue_for_header = continue_target;
                    info.is_continue_entire_loop = continue_target == header;
                }
                _ => {}
            }
            let previous = self.block_info.get(&merge).unwrap().header_for_merge;
            if previous != 0 {
                return Err(self.fail(format!(
                    "Block {merge} declared as merge block for more than one header: \
                     {previous}, {header}"
                )));
            }
            self.block_info.get_mut(&merge).unwrap().header_for_merge = header;
            self.block_info.get_mut(&header).unwrap().merge_for_header = merge;
        }

        // Self-branches only occur in single-block loops, and a single-block
        // loop must name itself as the continue target.
        for &id in &ids {
            let self_branch = self.successors(id).contains(&id);
            let info = &self.block_info[&id];
            let declares_self_continue = info.continue_for_header == id;
            if self_branch && !declares_self_continue {
                return Err(self.fail(format!(
                    "Block {id} branches to itself but is not its own continue target"
                )));
            }
            if declares_self_continue && !self_branch {
                return Err(self.fail(format!(
                    "Loop header block {id} declares itself as its own continue target, but \
                     does not branch to itself"
                )));
            }
        }
        Ok(())
    }

    /// Computes the reverse structured post-order and assigns positions.
    /// Statically unreachable blocks get no position.
    pub fn compute_block_order_and_positions(&mut self) {
        self.block_order =
            StructuredTraverser::new(&self.module, self.function()).reverse_structured_post_order();
        for (pos, &id) in self.block_order.iter().enumerate() {
            let info = self.block_info.get_mut(&id).expect("ordered block was registered");
            info.pos = pos as u32;
            info.reachable = true;
        }
    }

    /// The computed block order (for tests).
    pub fn block_order(&self) -> &[u32] {
        &self.block_order
    }

    /// Block info lookup (for tests).
    pub fn get_block_info(&self, id: u32) -> Option<&BlockInfo> {
        self.block_info.get(&id)
    }

    fn pos_of(&self, id: u32) -> u32 {
        self.block_info[&id].pos
    }

    /// Checks that headers strictly precede their merges, and that a loop's
    /// continue construct sits between its body and its merge.
    pub fn verify_header_continue_merge_order(&mut self) -> Result<()> {
        for i in 0..self.block_order.len() {
            let header = self.block_order[i];
            let info = self.block_info[&header].clone();
            if info.merge_for_header == 0 {
                continue;
            }
            let merge = info.merge_for_header;
            if self.pos_of(merge) <= info.pos {
                return Err(self.fail(format!(
                    "Header {header} does not strictly dominate its merge block {merge}"
                )));
            }
            let ct = info.continue_for_header;
            if ct != 0 && !info.is_continue_entire_loop {
                if self.pos_of(ct) <= info.pos {
                    return Err(self.fail(format!(
                        "Loop header {header} does not dominate its continue target {ct}"
                    )));
                }
                if self.pos_of(merge) <= self.pos_of(ct) {
                    return Err(self.fail(format!(
                        "Merge block {merge} for loop headed at block {header} appears at or \
                         before the loop's continue construct at block {ct}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Marks switch case heads and the default head, and collects selector
    /// values per head.
    pub fn find_switch_case_headers(&mut self) -> Result<()> {
        for i in 0..self.block_order.len() {
            let header = self.block_order[i];
            let Some(merge_inst) = self.merge_inst_of(header) else { continue };
            if merge_inst.op != Op::SelectionMerge {
                continue;
            }
            let terminator = self.terminator_of(header);
            if terminator.op != Op::Switch {
                continue;
            }
            let merge = merge_inst.operand(0);
            let default_id = terminator.operand(1);
            {
                let info = self.block_info.get_mut(&header).unwrap();
                info.switch_default_id = default_id;
                info.default_is_merge = default_id == merge;
            }
            if default_id != merge {
                let default_info = self.block_info.get_mut(&default_id).unwrap();
                if default_info.default_head_for.is_some() {
                    return Err(self.fail(format!(
                        "Block {default_id} is the default target for more than one OpSwitch"
                    )));
                }
                default_info.default_head_for = Some(header);
            }
            let mut i = 2;
            while i + 1 < terminator.operands.len() {
                let value = u64::from(terminator.operand(i));
                let target = terminator.operand(i + 1);
                i += 2;
                if target == merge {
                    self.block_info.get_mut(&header).unwrap().empty_case_values.push(value);
                    continue;
                }
                let target_info = self.block_info.get_mut(&target).unwrap();
                match target_info.case_head_for {
                    Some(other) if other != header => {
                        return Err(self.fail(format!(
                            "Block {target} is a case target for more than one OpSwitch"
                        )));
                    }
                    _ => {}
                }
                target_info.case_head_for = Some(header);
                target_info.case_values.push(value);
            }
        }
        Ok(())
    }

    /// The clause heads of a switch headed at `header`, i.e. case heads plus
    /// the default head when it isn't the merge.
    fn clause_heads_of(&self, header: u32) -> Vec<u32> {
        self.block_order
            .iter()
            .copied()
            .filter(|id| {
                let info = &self.block_info[id];
                info.case_head_for == Some(header) || info.default_head_for == Some(header)
            })
            .sorted_by_key(|id| self.pos_of(*id))
            .collect()
    }

    /// Builds the construct tree and labels each ordered block with its
    /// innermost construct.
    pub fn label_control_flow_constructs(&mut self) -> Result<()> {
        let num_blocks = self.block_order.len() as u32;
        let entry = self.block_order[0];
        self.constructs = vec![Construct {
            kind: ConstructKind::Function,
            parent: None,
            depth: 0,
            begin_id: entry,
            end_id: 0,
            begin_pos: 0,
            end_pos: num_blocks,
            scope_end_pos: num_blocks,
        }];
        let mut stack: Vec<ConstructId> = vec![0];

        for pos in 0..self.block_order.len() {
            let pos = pos as u32;
            let block_id = self.block_order[pos as usize];
            while stack.len() > 1 && self.constructs[*stack.last().unwrap()].end_pos <= pos {
                stack.pop();
            }
            let info = self.block_info[&block_id].clone();

            // A continue target opens its continue construct, which runs to
            // the loop's merge.
            if info.header_for_continue != 0 {
                let header = info.header_for_continue;
                let merge = self.block_info[&header].merge_for_header;
                let end_pos = self.pos_of(merge);
                self.push_construct(
                    &mut stack,
                    ConstructKind::Continue,
                    block_id,
                    merge,
                    pos,
                    end_pos,
                    end_pos,
                );
            }

            // A case head opens its case construct, running to the next
            // clause head (or the switch merge).
            if let Some(header) =
                info.case_head_for.or(info.default_head_for)
            {
                let merge = self.block_info[&header].merge_for_header;
                let heads = self.clause_heads_of(header);
                let end_id = heads
                    .iter()
                    .copied()
                    .filter(|&h| self.pos_of(h) > pos)
                    .min_by_key(|&h| self.pos_of(h))
                    .unwrap_or(merge);
                let end_pos = self.pos_of(end_id);
                self.push_construct(
                    &mut stack,
                    ConstructKind::SwitchCase,
                    block_id,
                    end_id,
                    pos,
                    end_pos,
                    end_pos,
                );
            }

            // A header opens its loop or selection construct.
            if info.merge_for_header != 0 {
                let merge = info.merge_for_header;
                let merge_pos = self.pos_of(merge);
                if info.continue_for_header != 0 && !info.is_continue_entire_loop {
                    // The loop construct runs up to the continue target; the
                    // scope extends over the continue construct, because
                    // loop-body declarations are visible in `continuing`.
                    let ct_pos = self.pos_of(info.continue_for_header);
                    self.push_construct(
                        &mut stack,
                        ConstructKind::Loop,
                        block_id,
                        info.continue_for_header,
                        pos,
                        ct_pos,
                        merge_pos,
                    );
                } else if info.continue_for_header == 0 {
                    let kind = if self.terminator_of(block_id).op == Op::Switch {
                        ConstructKind::SwitchSelection
                    } else {
                        ConstructKind::IfSelection
                    };
                    self.push_construct(
                        &mut stack,
                        kind,
                        block_id,
                        merge,
                        pos,
                        merge_pos,
                        merge_pos,
                    );
                }
                // An entire-loop header needs no loop construct: its
                // continue construct (opened above) is the whole loop.
            }

            self.block_info.get_mut(&block_id).unwrap().construct = Some(*stack.last().unwrap());
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_construct(
        &mut self,
        stack: &mut Vec<ConstructId>,
        kind: ConstructKind,
        begin_id: u32,
        end_id: u32,
        begin_pos: u32,
        end_pos: u32,
        scope_end_pos: u32,
    ) {
        let parent = *stack.last().unwrap();
        let depth = self.constructs[parent].depth + 1;
        self.constructs.push(Construct {
            kind,
            parent: Some(parent),
            depth,
            begin_id,
            end_id,
            begin_pos,
            end_pos,
            scope_end_pos,
        });
        stack.push(self.constructs.len() - 1);
    }

    /// The structured constructs (for tests).
    pub fn constructs(&self) -> &[Construct] {
        &self.constructs
    }

    /// The merge block of the loop associated with a Loop or Continue
    /// construct.
    fn loop_merge_of(&self, construct: &Construct) -> u32 {
        match construct.kind {
            ConstructKind::Loop => self.block_info[&construct.begin_id].merge_for_header,
            ConstructKind::Continue => {
                let header = self.block_info[&construct.begin_id].header_for_continue;
                self.block_info[&header].merge_for_header
            }
            _ => 0,
        }
    }

    /// Classifies every successor edge of every ordered block, checking the
    /// structural validity rules as it goes.
    pub fn classify_cfg_edges(&mut self) -> Result<()> {
        for src_index in 0..self.block_order.len() {
            let src = self.block_order[src_index];
            let src_info = self.block_info[&src].clone();
            let src_construct = src_info.construct.expect("ordered blocks are labeled");
            let successors = self.successors(src);

            let mut fallthrough_count = 0u32;
            for &dest in &successors {
                let dest_info = self.block_info[&dest].clone();
                let kind = if dest_info.pos <= src_info.pos {
                    // Only the continue construct may branch back, and only
                    // to its own loop header.
                    let valid = enclosing(&self.constructs, src_construct, |c| {
                        c.kind == ConstructKind::Continue
                            && self.block_info[&c.begin_id].header_for_continue == dest
                    })
                    .is_some();
                    if !valid {
                        return Err(self.fail(format!(
                            "Invalid backedge ({src}->{dest}): {src} is not in a continue \
                             construct headed by {dest}"
                        )));
                    }
                    EdgeKind::Back
                } else {
                    self.classify_forward_edge(
                        src,
                        src_construct,
                        dest,
                        &dest_info,
                        &mut fallthrough_count,
                    )?
                };
                self.block_info.get_mut(&src).unwrap().succ_edge.insert(dest, kind);
            }

            // Divergence (more than one forward-ish edge) requires a merge
            // instruction to declare the reconvergence point.
            let info = self.block_info[&src].clone();
            let divergent = info
                .succ_edge
                .values()
                .filter(|k| {
                    matches!(
                        k,
                        EdgeKind::Forward | EdgeKind::IfBreak | EdgeKind::CaseFallThrough
                    )
                })
                .count();
            if divergent > 1 && self.merge_inst_of(src).is_none() {
                return Err(self.fail(format!(
                    "Control flow diverges at block {src} but it is not a structured header"
                )));
            }
        }
        Ok(())
    }

    fn classify_forward_edge(
        &mut self,
        src: u32,
        src_construct: ConstructId,
        dest: u32,
        dest_info: &BlockInfo,
        fallthrough_count: &mut u32,
    ) -> Result<EdgeKind> {
        // Walk up the construct chain; the nearest construct that claims the
        // destination wins. A claim becomes invalid when it would cross a
        // construct a WGSL `break`/`continue`/`fallthrough` cannot escape:
        // a loop break must not cross a switch, a switch break must not
        // cross a loop, and so on.
        let mut passed_switch = false;
        let mut passed_loop = false;
        let invalid_exit = |emitter: &mut Self| {
            let begin = emitter.constructs[src_construct].begin_id;
            emitter.fail(format!(
                "Branch from block {src} to block {dest} is an invalid exit from the construct \
                 starting at block {begin}"
            ))
        };
        let mut current = Some(src_construct);
        while let Some(id) = current {
            let construct = self.constructs[id].clone();
            match construct.kind {
                ConstructKind::Loop => {
                    if construct.end_id == dest {
                        if passed_switch || passed_loop {
                            return Err(invalid_exit(self));
                        }
                        return Ok(EdgeKind::LoopContinue);
                    }
                    if self.loop_merge_of(&construct) == dest {
                        if passed_switch || passed_loop {
                            return Err(invalid_exit(self));
                        }
                        return Ok(EdgeKind::LoopBreak);
                    }
                    passed_loop = true;
                }
                ConstructKind::Continue => {
                    if self.loop_merge_of(&construct) == dest {
                        if passed_switch || passed_loop {
                            return Err(invalid_exit(self));
                        }
                        return Ok(EdgeKind::LoopBreak);
                    }
                    passed_loop = true;
                }
                ConstructKind::SwitchSelection => {
                    if construct.end_id == dest {
                        if passed_loop || passed_switch {
                            return Err(invalid_exit(self));
                        }
                        return Ok(EdgeKind::SwitchBreak);
                    }
                    // A fallthrough comes from inside a sibling case, never
                    // from the switch header's own dispatch.
                    if src != construct.begin_id
                        && (dest_info.case_head_for == Some(construct.begin_id)
                            || dest_info.default_head_for == Some(construct.begin_id))
                    {
                        if passed_loop || passed_switch {
                            return Err(invalid_exit(self));
                        }
                        *fallthrough_count += 1;
                        if *fallthrough_count > 1 {
                            return Err(self.fail(format!(
                                "Block {src} has more than one case fallthrough edge"
                            )));
                        }
                        return Ok(EdgeKind::CaseFallThrough);
                    }
                    passed_switch = true;
                }
                ConstructKind::IfSelection => {
                    if construct.end_id == dest {
                        if passed_loop || passed_switch {
                            return Err(invalid_exit(self));
                        }
                        return Ok(EdgeKind::IfBreak);
                    }
                }
                ConstructKind::SwitchCase | ConstructKind::Function => {}
            }
            current = construct.parent;
        }

        // Plain forward flow must stay inside the innermost construct.
        if !self.constructs[src_construct].contains_pos(dest_info.pos) {
            return Err(invalid_exit(self));
        }
        Ok(EdgeKind::Forward)
    }

    /// Finds then/else/premerge heads for each if-selection, and decides
    /// where a flow-guard variable is required.
    pub fn find_if_selection_internal_headers(&mut self) -> Result<()> {
        for i in 0..self.block_order.len() {
            let header = self.block_order[i];
            let Some(merge_inst) = self.merge_inst_of(header) else { continue };
            let terminator = self.terminator_of(header);
            if merge_inst.op != Op::SelectionMerge || terminator.op != Op::BranchConditional {
                continue;
            }
            let merge = merge_inst.operand(0);
            let true_target = terminator.operand(1);
            let false_target = terminator.operand(2);
            let info = self.block_info[&header].clone();

            let mut true_head = 0;
            let mut false_head = 0;
            if info.succ_edge.get(&true_target) == Some(&EdgeKind::Forward)
                && true_target != merge
            {
                true_head = true_target;
            }
            if false_target != true_target
                && info.succ_edge.get(&false_target) == Some(&EdgeKind::Forward)
                && false_target != merge
            {
                false_head = false_target;
            }

            // Premerge: the earliest block at which the two clauses
            // reconverge before the merge.
            let mut premerge_head = 0;
            if true_head != 0 && false_head != 0 {
                let true_pos = self.pos_of(true_head);
                let false_pos = self.pos_of(false_head);
                let mut candidate: Option<u32> = None;
                for p in true_pos..false_pos {
                    let b = self.block_order[p as usize];
                    let b_info = &self.block_info[&b];
                    for (&succ, &kind) in &b_info.succ_edge {
                        if kind == EdgeKind::Forward && succ != merge {
                            let succ_pos = self.pos_of(succ);
                            if succ_pos >= false_pos
                                && candidate.is_none_or(|c| succ_pos < self.pos_of(c))
                            {
                                candidate = Some(succ);
                            }
                        }
                    }
                }
                if let Some(p) = candidate {
                    premerge_head = p;
                    if premerge_head == false_head {
                        // The clauses reconverge right at the false target:
                        // there is no else clause, only a premerge.
                        false_head = 0;
                    }
                }
            }

            // A flow guard is needed when a clause block can either break to
            // the merge or keep flowing forward, without being a header
            // itself: the premerge must then be skipped on the break path.
            let mut flow_guard_name = None;
            if premerge_head != 0 {
                let header_pos = info.pos;
                let premerge_pos = self.pos_of(premerge_head);
                for p in (header_pos + 1)..premerge_pos {
                    let b = self.block_order[p as usize];
                    let b_info = &self.block_info[&b];
                    let has_if_break =
                        b_info.succ_edge.values().any(|&k| k == EdgeKind::IfBreak);
                    let has_forward =
                        b_info.succ_edge.values().any(|&k| k == EdgeKind::Forward);
                    if has_if_break && has_forward && self.merge_inst_of(b).is_none() {
                        flow_guard_name =
                            Some(self.parser.namer.make_derived_name(&format!("guard{header}")));
                        break;
                    }
                }
            }

            let info = self.block_info.get_mut(&header).unwrap();
            info.true_head = true_head;
            info.false_head = false_head;
            info.premerge_head = premerge_head;
            info.flow_guard_name = flow_guard_name;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local definition analysis
    // ------------------------------------------------------------------

    /// Calls `f` for every operand of `inst` that is an ID *use* (skipping
    /// literal operands and label references).
    fn for_each_id_use(inst: &RawInst, mut f: impl FnMut(u32)) {
        let ops = &inst.operands;
        match inst.op {
            Op::Branch | Op::LoopMerge | Op::SelectionMerge | Op::Label | Op::Undef => {}
            Op::BranchConditional | Op::Switch | Op::ReturnValue | Op::Load | Op::ArrayLength
            | Op::CompositeExtract => {
                if !ops.is_empty() {
                    f(ops[0]);
                }
            }
            Op::Variable => {
                // Operand 0 is the storage class literal.
                if ops.len() > 1 {
                    f(ops[1]);
                }
            }
            Op::CompositeInsert | Op::VectorShuffle => {
                if ops.len() >= 2 {
                    f(ops[0]);
                    f(ops[1]);
                }
            }
            Op::ExtInst => {
                // Operand 0 is the import ID, operand 1 the literal number.
                for &id in ops.iter().skip(2) {
                    f(id);
                }
            }
            Op::Phi => {
                // (value, predecessor label) pairs.
                let mut i = 0;
                while i + 1 < ops.len() {
                    f(ops[i]);
                    i += 2;
                }
            }
            Op::ImageSampleImplicitLod
            | Op::ImageSampleExplicitLod
            | Op::ImageSampleProjImplicitLod
            | Op::ImageSampleProjExplicitLod
            | Op::ImageFetch
            | Op::ImageRead => {
                // [image, coord, mask?, id params...]
                for (i, &id) in ops.iter().enumerate() {
                    if i != 2 {
                        f(id);
                    }
                }
            }
            Op::ImageSampleDrefImplicitLod
            | Op::ImageSampleDrefExplicitLod
            | Op::ImageSampleProjDrefImplicitLod
            | Op::ImageSampleProjDrefExplicitLod
            | Op::ImageGather
            | Op::ImageDrefGather
            | Op::ImageWrite => {
                // [image, coord, dref/component/texel, mask?, id params...]
                for (i, &id) in ops.iter().enumerate() {
                    if i != 3 {
                        f(id);
                    }
                }
            }
            _ => {
                for &id in ops.iter() {
                    f(id);
                }
            }
        }
    }

    /// Creates a `DefInfo` for every locally defined result ID, then counts
    /// uses, attributing phi inputs to the predecessor blocks that supply
    /// them.
    pub fn register_locally_defined_values(&mut self) -> Result<()> {
        // Pass 1: definitions, in block order.
        for pos in 0..self.block_order.len() {
            let block_id = self.block_order[pos];
            let block_index = self.block_info[&block_id].block_index;
            let body: Vec<usize> = self.function().blocks[block_index].body.clone();
            for inst_index in body {
                let inst = &self.module.insts[inst_index];
                if inst.result_id == 0 || inst.op == Op::Variable {
                    continue;
                }
                self.def_info.insert(
                    inst.result_id,
                    DefInfo {
                        inst_index,
                        block_pos: pos as u32,
                        num_uses: 0,
                        last_use_pos: 0,
                        used_in_another_construct: false,
                        requires_named_const_def: false,
                        requires_hoisted_def: false,
                        phi_var: None,
                    },
                );
            }
        }

        // Pass 2: uses (body, merge excluded, terminator included).
        for pos in 0..self.block_order.len() {
            let pos = pos as u32;
            let block_id = self.block_order[pos as usize];
            let block_index = self.block_info[&block_id].block_index;
            let block = &self.function().blocks[block_index];
            let mut inst_indices: Vec<usize> = block.body.clone();
            inst_indices.push(block.terminator);
            for inst_index in inst_indices {
                let inst = self.module.insts[inst_index].clone();
                if inst.op == Op::Phi {
                    self.register_phi_inputs(&inst, pos)?;
                    continue;
                }
                let mut uses: SmallVec<[u32; 4]> = SmallVec::new();
                Self::for_each_id_use(&inst, |id| uses.push(id));
                for id in uses {
                    self.record_use(id, pos);
                }
                // The vector operands of a shuffle (and the composite of an
                // insert) are referenced once per component in WGSL, so they
                // always need a name.
                if matches!(
                    inst.op,
                    Op::VectorShuffle | Op::CompositeInsert | Op::VectorInsertDynamic
                ) {
                    for op_index in 0..2.min(inst.operands.len()) {
                        let id = inst.operand(op_index);
                        if let Some(info) = self.def_info.get_mut(&id) {
                            info.requires_named_const_def = true;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn record_use(&mut self, id: u32, pos: u32) {
        let use_construct = self.block_info[&self.block_order[pos as usize]].construct;
        if let Some(info) = self.def_info.get_mut(&id) {
            info.num_uses += 1;
            info.last_use_pos = info.last_use_pos.max(pos);
            let def_construct =
                self.block_info[&self.block_order[info.block_pos as usize]].construct;
            if use_construct != def_construct {
                info.used_in_another_construct = true;
            }
        }
    }

    /// Attributes each phi input value to the predecessor block supplying
    /// it, and records the corresponding state-variable write there.
    fn register_phi_inputs(&mut self, phi: &RawInst, phi_pos: u32) -> Result<()> {
        let phi_id = phi.result_id;
        let mut i = 0;
        while i + 1 < phi.operands.len() {
            let value_id = phi.operand(i);
            let pred_id = phi.operand(i + 1);
            i += 2;
            let Some(pred_info) = self.block_info.get(&pred_id) else {
                return Err(self.fail(format!(
                    "Phi {phi_id} names predecessor {pred_id} which is not a block"
                )));
            };
            if !pred_info.reachable {
                continue;
            }
            let pred_pos = pred_info.pos;
            self.record_use(value_id, pred_pos);
            self.block_info
                .get_mut(&pred_id)
                .unwrap()
                .phi_assignments
                .push((phi_id, value_id));
            // The phi's own liveness covers every assignment site.
            if let Some(info) = self.def_info.get_mut(&phi_id) {
                info.last_use_pos = info.last_use_pos.max(pred_pos);
            }
        }
        Ok(())
    }

    /// Decides, for every local definition, whether it can be inlined at
    /// its single use, needs a `let` definition, or must be hoisted to a
    /// `var` at an outer scope (including phi state variables).
    pub fn find_values_needing_named_or_hoisted_definition(&mut self) -> Result<()> {
        let ids: Vec<u32> = self.def_info.keys().copied().collect();
        for id in ids {
            let info = self.def_info[&id].clone();
            let inst_op = self.module.insts[info.inst_index].op;
            let def_block = self.block_order[info.block_pos as usize];
            let def_construct = self.block_info[&def_block].construct.unwrap();

            if inst_op == Op::Phi {
                let name = self.parser.namer.make_derived_name(&format!("x_{id}_phi"));
                self.def_info.get_mut(&id).unwrap().phi_var = Some(name);
                // Declare the state variable where the scope covers the phi
                // and every assignment site. Assignments from earlier blocks
                // make the effective first position the minimum over those.
                let mut first = info.block_pos;
                let mut last = info.last_use_pos.max(info.block_pos);
                for p in 0..self.block_order.len() {
                    let b = self.block_order[p];
                    if self.block_info[&b].phi_assignments.iter().any(|&(p_id, _)| p_id == id) {
                        first = first.min(p as u32);
                        last = last.max(p as u32);
                    }
                }
                let scope =
                    smallest_enclosing_scope(&self.constructs, def_construct, first, last);
                let scope_begin = self.block_order[self.constructs[scope].begin_pos as usize];
                self.block_info
                    .get_mut(&scope_begin)
                    .unwrap()
                    .phis_needing_state_vars
                    .push(id);
                continue;
            }

            if info.num_uses == 0 {
                continue;
            }
            let last = info.last_use_pos.max(info.block_pos);
            if !self.constructs[def_construct].scope_contains_pos(last) {
                // The definition's construct does not enclose all uses:
                // declare a `var` at the smallest construct that does, and
                // turn the definition into an assignment.
                self.def_info.get_mut(&id).unwrap().requires_hoisted_def = true;
                let scope = smallest_enclosing_scope(
                    &self.constructs,
                    def_construct,
                    info.block_pos,
                    last,
                );
                let scope_begin = self.block_order[self.constructs[scope].begin_pos as usize];
                self.block_info.get_mut(&scope_begin).unwrap().hoisted_ids.push(id);
            } else if info.num_uses != 1 || info.used_in_another_construct {
                self.def_info.get_mut(&id).unwrap().requires_named_const_def = true;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statement emission
    // ------------------------------------------------------------------

    /// Emits `var` declarations for the function's `OpVariable`s.
    pub fn emit_function_variables(&mut self) -> Result<()> {
        let entry_body: Vec<usize> = self.function().blocks[0].body.clone();
        for inst_index in entry_body {
            let inst = self.module.insts[inst_index].clone();
            if inst.op != Op::Variable {
                continue;
            }
            let ptr_ty = self.parser.convert_type(inst.result_type_id)?;
            let store_ty = match ptr_ty {
                ast::Type::Pointer { store, .. } => *store,
                _ => {
                    let id = inst.result_id;
                    return Err(self.fail(format!("variable {id} has a non-pointer type")));
                }
            };
            let init = if inst.operands.len() > 1 {
                Some(self.parser.make_constant_expression(inst.operand(1))?.expr)
            } else {
                None
            };
            let name = self.parser.namer.name(inst.result_id);
            self.identifier_values.insert(inst.result_id);
            self.function_variables.push(ast::Statement::VarDecl {
                kind: ast::VarDeclKind::Var,
                name,
                ty: Some(store_ty),
                init,
            });
        }
        Ok(())
    }

    /// Walks the blocks in order, driving the statement-frame stack.
    pub fn emit_function_body_statements(&mut self) -> Result<Vec<ast::Statement>> {
        self.frames = vec![Frame {
            kind: FrameKind::FunctionBody,
            end_id: 0,
            statements: std::mem::take(&mut self.function_variables),
        }];
        for pos in 0..self.block_order.len() {
            let block_id = self.block_order[pos];
            self.emit_basic_block(block_id)?;
        }
        if self.frames.len() != 1 {
            return Err(self.fail("internal error: statement frames left unclosed"));
        }
        Ok(self.frames.pop().unwrap().statements)
    }

    fn top_statements(&mut self) -> &mut Vec<ast::Statement> {
        &mut self.frames.last_mut().expect("statement stack is never empty").statements
    }

    fn append(&mut self, statement: ast::Statement) {
        self.top_statements().push(statement);
    }

    fn emit_basic_block(&mut self, block_id: u32) -> Result<()> {
        // 1. Complete every frame that ends at this block.
        while self.frames.last().is_some_and(|f| f.end_id == block_id) {
            self.complete_top_frame()?;
        }

        let info = self.block_info[&block_id].clone();

        // 2. Open frames for constructs beginning here.
        for c_index in 0..self.constructs.len() {
            let construct = self.constructs[c_index].clone();
            if construct.begin_id != block_id || construct.begin_pos != info.pos {
                continue;
            }
            match construct.kind {
                ConstructKind::Loop => {
                    self.frames.push(Frame {
                        kind: FrameKind::LoopBody { has_continue: true },
                        end_id: construct.end_id,
                        statements: vec![],
                    });
                }
                ConstructKind::Continue => {
                    if info.is_continue_entire_loop {
                        self.frames.push(Frame {
                            kind: FrameKind::LoopBody { has_continue: false },
                            end_id: construct.end_id,
                            statements: vec![],
                        });
                    } else {
                        let body = self.pending_loop_bodies.pop().unwrap_or_default();
                        self.frames.push(Frame {
                            kind: FrameKind::Continuing { body },
                            end_id: construct.end_id,
                            statements: vec![],
                        });
                    }
                }
                ConstructKind::SwitchCase => {
                    let header = info
                        .case_head_for
                        .or(info.default_head_for)
                        .expect("case construct has a switch header");
                    let selector_signed = self.switch_selector_is_signed(header)?;
                    let selectors = info
                        .case_values
                        .iter()
                        .map(|&v| make_case_literal(v, selector_signed))
                        .collect();
                    self.frames.push(Frame {
                        kind: FrameKind::Case {
                            selectors,
                            is_default: info.default_head_for == Some(header),
                        },
                        end_id: construct.end_id,
                        statements: vec![],
                    });
                }
                _ => {}
            }
        }

        // 3. Hoisted declarations and phi state variables land at the top
        // of the construct they were hoisted to.
        for id in info.hoisted_ids.clone() {
            let inst = self.module.insts[self.def_info[&id].inst_index].clone();
            let ty = self.parser.convert_type(inst.result_type_id)?;
            let name = self.parser.namer.name(id);
            self.append(ast::Statement::VarDecl {
                kind: ast::VarDeclKind::Var,
                name,
                ty: Some(ty),
                init: None,
            });
        }
        for id in info.phis_needing_state_vars.clone() {
            let inst = self.module.insts[self.def_info[&id].inst_index].clone();
            let ty = self.parser.convert_type(inst.result_type_id)?;
            let name = self.def_info[&id].phi_var.clone().expect("phi has a state variable");
            self.append(ast::Statement::VarDecl {
                kind: ast::VarDeclKind::Var,
                name,
                ty: Some(ty),
                init: None,
            });
        }

        // 4. The block's body.
        let block_index = info.block_index;
        let body: Vec<usize> = self.function().blocks[block_index].body.clone();
        for inst_index in body {
            let inst = self.module.insts[inst_index].clone();
            self.emit_statement(&inst)?;
        }

        // 5. Writes to phi state variables, before the terminator.
        for (phi_id, value_id) in info.phi_assignments.clone() {
            let value = self.make_expression(value_id)?;
            let name = self.def_info[&phi_id].phi_var.clone().expect("phi has a state variable");
            self.append(ast::Statement::Assign {
                lhs: ast::Expression::Ident(name),
                rhs: value.expr,
            });
        }

        // 6. The terminator: structured headers start their construct's
        // frames; everything else becomes a normal terminator statement.
        let merge_inst = self.merge_inst_of(block_id);
        let terminator = self.terminator_of(block_id);
        match (merge_inst.as_ref().map(|m| m.op), terminator.op) {
            (Some(Op::SelectionMerge), Op::BranchConditional) => self.emit_if_start(block_id),
            (Some(Op::SelectionMerge), Op::Switch) => self.emit_switch_start(block_id),
            (None, Op::Switch) => {
                Err(self.fail(format!(
                    "OpSwitch in block {block_id} without a selection merge is not supported"
                )))
            }
            _ => self.emit_normal_terminator(block_id),
        }
    }

    fn complete_top_frame(&mut self) -> Result<()> {
        let frame = self.frames.pop().expect("completing a frame requires one");
        match frame.kind {
            FrameKind::FunctionBody => {
                return Err(self.fail("internal error: completed the function body frame"));
            }
            FrameKind::Then => {
                self.deposit_clause(frame.statements, true);
            }
            FrameKind::Else => {
                self.deposit_clause(frame.statements, false);
            }
            FrameKind::If {
                condition,
                then_stmts,
                else_stmts,
                premerge_head,
                merge_id,
                guard_name,
            } => {
                self.append(ast::Statement::If {
                    condition,
                    then_body: then_stmts,
                    else_body: else_stmts,
                });
                if premerge_head != 0 {
                    // The premerge region runs on both paths, guarded so the
                    // break path can skip it.
                    let condition = match guard_name {
                        Some(name) => ast::Expression::Ident(name),
                        None => ast::Literal::Bool(true).into(),
                    };
                    self.frames.push(Frame {
                        kind: FrameKind::Guard { condition },
                        end_id: merge_id,
                        statements: vec![],
                    });
                }
            }
            FrameKind::Guard { condition } => {
                self.append(ast::Statement::If {
                    condition,
                    then_body: frame.statements,
                    else_body: vec![],
                });
            }
            FrameKind::LoopBody { has_continue } => {
                if has_continue {
                    self.pending_loop_bodies.push(frame.statements);
                } else {
                    self.append(ast::Statement::Loop {
                        body: frame.statements,
                        continuing: vec![],
                    });
                }
            }
            FrameKind::Continuing { body } => {
                self.append(ast::Statement::Loop { body, continuing: frame.statements });
            }
            FrameKind::Case { selectors, is_default } => {
                let case = ast::SwitchCase { selectors, is_default, body: frame.statements };
                let deposited =
                    self.nearest_switch_frame().map(|cases| cases.push(case)).is_some();
                if !deposited {
                    return Err(self.fail("internal error: case clause outside a switch frame"));
                }
            }
            FrameKind::Switch {
                selector,
                selector_signed,
                mut cases,
                default_is_merge,
                empty_case_values,
            } => {
                for value in empty_case_values {
                    cases.push(ast::SwitchCase {
                        selectors: vec![make_case_literal(value, selector_signed)],
                        is_default: false,
                        body: vec![],
                    });
                }
                if default_is_merge {
                    cases.push(ast::SwitchCase {
                        selectors: vec![],
                        is_default: true,
                        body: vec![],
                    });
                }
                self.append(ast::Statement::Switch { selector, cases });
            }
        }
        Ok(())
    }

    /// Moves a finished then/else clause into the nearest `If` frame.
    fn deposit_clause(&mut self, statements: Vec<ast::Statement>, is_then: bool) {
        for frame in self.frames.iter_mut().rev() {
            if let FrameKind::If { then_stmts, else_stmts, .. } = &mut frame.kind {
                if is_then {
                    *then_stmts = statements;
                } else {
                    *else_stmts = statements;
                }
                return;
            }
        }
        unreachable!("clause frames always sit above their if frame");
    }

    fn nearest_switch_frame(&mut self) -> Option<&mut Vec<ast::SwitchCase>> {
        for frame in self.frames.iter_mut().rev() {
            if let FrameKind::Switch { cases, .. } = &mut frame.kind {
                return Some(cases);
            }
        }
        None
    }

    fn switch_selector_is_signed(&mut self, header: u32) -> Result<bool> {
        let terminator = self.terminator_of(header);
        let selector_type = self.module.type_id_of(terminator.operand(0));
        Ok(self.parser.convert_type(selector_type)? == ast::Type::I32)
    }

    /// Starts the frames for an if-selection at its header block.
    fn emit_if_start(&mut self, header: u32) -> Result<()> {
        let info = self.block_info[&header].clone();
        let terminator = self.terminator_of(header);
        let merge = info.merge_for_header;
        let true_target = terminator.operand(1);
        let false_target = terminator.operand(2);

        let condition = self.make_expression(terminator.operand(0))?.expr;

        if let Some(guard) = &info.flow_guard_name {
            self.append(ast::Statement::VarDecl {
                kind: ast::VarDeclKind::Var,
                name: guard.clone(),
                ty: Some(ast::Type::Bool),
                init: Some(ast::Literal::Bool(true).into()),
            });
        }

        let then_end = if info.false_head != 0 {
            info.false_head
        } else if info.premerge_head != 0 {
            info.premerge_head
        } else {
            merge
        };
        let else_end = if info.premerge_head != 0 { info.premerge_head } else { merge };

        // Clauses without any blocks of their own still carry the branch's
        // statement (e.g. `if (c) { break; }`).
        let mut then_stmts = vec![];
        if info.true_head == 0 {
            if let Some(stmt) = self.make_branch(header, true_target, true)? {
                then_stmts.push(stmt);
            }
        }
        let mut else_stmts = vec![];
        if info.false_head == 0 && false_target != true_target {
            if let Some(stmt) = self.make_branch(header, false_target, true)? {
                else_stmts.push(stmt);
            }
        }

        self.frames.push(Frame {
            kind: FrameKind::If {
                condition,
                then_stmts,
                else_stmts,
                premerge_head: info.premerge_head,
                merge_id: merge,
                guard_name: info.flow_guard_name.clone(),
            },
            end_id: else_end,
            statements: vec![],
        });
        if info.false_head != 0 {
            self.frames.push(Frame { kind: FrameKind::Else, end_id: else_end, statements: vec![] });
        }
        if info.true_head != 0 {
            self.frames.push(Frame { kind: FrameKind::Then, end_id: then_end, statements: vec![] });
        }
        Ok(())
    }

    /// Starts the switch frame at an `OpSwitch` header block; case frames
    /// open as their head blocks are reached.
    fn emit_switch_start(&mut self, header: u32) -> Result<()> {
        let info = self.block_info[&header].clone();
        let terminator = self.terminator_of(header);
        let selector = self.make_expression(terminator.operand(0))?;
        let selector_signed = selector.ty == ast::Type::I32;
        self.frames.push(Frame {
            kind: FrameKind::Switch {
                selector: selector.expr,
                selector_signed,
                cases: vec![],
                default_is_merge: info.default_is_merge,
                empty_case_values: info.empty_case_values.clone(),
            },
            end_id: info.merge_for_header,
            statements: vec![],
        });
        Ok(())
    }

    /// Emits the statement (if any) for a terminator that is not a
    /// structured header.
    fn emit_normal_terminator(&mut self, block_id: u32) -> Result<()> {
        let terminator = self.terminator_of(block_id);
        match terminator.op {
            Op::Return => {
                self.append(ast::Statement::Return { value: None });
                Ok(())
            }
            Op::ReturnValue => {
                let value = self.make_expression(terminator.operand(0))?;
                self.append(ast::Statement::Return { value: Some(value.expr) });
                Ok(())
            }
            Op::Kill => {
                self.append(ast::Statement::Kill);
                Ok(())
            }
            Op::Unreachable => Ok(()),
            Op::Branch => {
                if let Some(stmt) = self.make_branch(block_id, terminator.operand(0), false)? {
                    self.append(stmt);
                }
                Ok(())
            }
            Op::BranchConditional => {
                let true_target = terminator.operand(1);
                let false_target = terminator.operand(2);
                if true_target == false_target {
                    if let Some(stmt) = self.make_branch(block_id, true_target, false)? {
                        self.append(stmt);
                    }
                    return Ok(());
                }
                let info = self.block_info[&block_id].clone();
                let condition = self.make_expression(terminator.operand(0))?.expr;
                let true_kind = info.succ_edge[&true_target];
                let false_kind = info.succ_edge[&false_target];
                if true_kind == EdgeKind::CaseFallThrough
                    || false_kind == EdgeKind::CaseFallThrough
                {
                    return self.emit_conditional_case_fallthrough(
                        block_id,
                        condition,
                        true_target,
                        false_target,
                        true_kind == EdgeKind::CaseFallThrough,
                    );
                }
                let then_stmt = self.make_branch(block_id, true_target, true)?;
                let else_stmt = self.make_branch(block_id, false_target, true)?;
                if then_stmt.is_none() && else_stmt.is_none() {
                    return Ok(());
                }
                self.append(ast::Statement::If {
                    condition,
                    then_body: then_stmt.into_iter().collect(),
                    else_body: else_stmt.into_iter().collect(),
                });
                Ok(())
            }
            _ => {
                let op = terminator.op;
                Err(self.fail(format!("unhandled terminator {op:?} in block {block_id}")))
            }
        }
    }

    /// A conditional branch where one arm falls through to the next case:
    /// the fallthrough must be the last statement of the clause, so the
    /// other arm's statement is guarded by an `if` placed before it.
    fn emit_conditional_case_fallthrough(
        &mut self,
        block_id: u32,
        condition: ast::Expression,
        true_target: u32,
        false_target: u32,
        fall_through_is_true_branch: bool,
    ) -> Result<()> {
        let other_target = if fall_through_is_true_branch { false_target } else { true_target };
        let other_stmt = self.make_branch(block_id, other_target, true)?;
        if let Some(stmt) = other_stmt {
            let (then_body, else_body) = if fall_through_is_true_branch {
                (vec![], vec![stmt])
            } else {
                (vec![stmt], vec![])
            };
            self.append(ast::Statement::If { condition, then_body, else_body });
        }
        self.append(ast::Statement::Fallthrough);
        Ok(())
    }

    /// The statement (if any) that realizes a branch edge. When `forced`,
    /// a switch-break is emitted even where WGSL's implicit break would
    /// cover it.
    fn make_branch(
        &mut self,
        src: u32,
        dest: u32,
        forced: bool,
    ) -> Result<Option<ast::Statement>> {
        let src_info = self.block_info[&src].clone();
        let Some(&kind) = src_info.succ_edge.get(&dest) else {
            return Err(self.fail(format!("internal error: unclassified edge {src}->{dest}")));
        };
        Ok(match kind {
            EdgeKind::Back | EdgeKind::Forward => None,
            EdgeKind::LoopBreak => Some(ast::Statement::Break),
            EdgeKind::SwitchBreak => {
                if forced {
                    Some(ast::Statement::Break)
                } else {
                    // A branch to the switch merge from the last block of a
                    // clause is WGSL's implicit end-of-case break.
                    let is_last_in_case = enclosing(
                        &self.constructs,
                        src_info.construct.unwrap(),
                        |c| c.kind == ConstructKind::SwitchCase,
                    )
                    .is_some_and(|(_, c)| c.end_pos == src_info.pos + 1);
                    if is_last_in_case { None } else { Some(ast::Statement::Break) }
                }
            }
            EdgeKind::LoopContinue => {
                // An unconditional continue to the very next block is the
                // loop body's natural flow into `continuing`.
                let dest_pos = self.pos_of(dest);
                if dest_pos == src_info.pos + 1 { None } else { Some(ast::Statement::Continue) }
            }
            EdgeKind::IfBreak => {
                let header = self.block_info[&dest].header_for_merge;
                match self.block_info[&header].flow_guard_name.clone() {
                    // Leaving the selection early: lower the guard so the
                    // premerge is skipped.
                    Some(guard) => Some(ast::Statement::Assign {
                        lhs: ast::Expression::Ident(guard),
                        rhs: ast::Literal::Bool(false).into(),
                    }),
                    None => None,
                }
            }
            EdgeKind::CaseFallThrough => Some(ast::Statement::Fallthrough),
        })
    }

    // ------------------------------------------------------------------
    // Instruction translation
    // ------------------------------------------------------------------

    fn is_handle_type(&self, type_id: u32) -> bool {
        match self.module.def(type_id) {
            Some(inst) => match inst.op {
                Op::TypeImage | Op::TypeSampler | Op::TypeSampledImage => true,
                Op::TypePointer => self.is_handle_type(inst.operand(1)),
                _ => false,
            },
            None => false,
        }
    }

    fn is_handle_pointer_type(&self, type_id: u32) -> bool {
        matches!(self.module.def(type_id), Some(inst) if inst.op == Op::TypePointer)
            && self.is_handle_type(type_id)
    }

    /// Emits one non-terminator, non-label instruction.
    fn emit_statement(&mut self, inst: &RawInst) -> Result<()> {
        match inst.op {
            Op::Nop | Op::Undef | Op::Variable | Op::SampledImage | Op::Image => Ok(()),
            Op::Load => {
                if self.is_handle_type(inst.result_type_id) {
                    // Handle loads disappear; image accesses trace through
                    // them back to the declaration.
                    return Ok(());
                }
                let ptr = self.make_expression(inst.operand(0))?;
                let store_ty = match ptr.ty {
                    ast::Type::Pointer { store, .. } => *store,
                    other => other,
                };
                let value = TypedExpr { ty: store_ty, expr: ptr.expr };
                self.emit_const_def_or_write(inst, value)
            }
            Op::Store => {
                let lhs = self.make_expression(inst.operand(0))?;
                let rhs = self.make_expression(inst.operand(1))?;
                self.append(ast::Statement::Assign { lhs: lhs.expr, rhs: rhs.expr });
                Ok(())
            }
            Op::CopyMemory => {
                let lhs = self.make_expression(inst.operand(0))?;
                let rhs = self.make_expression(inst.operand(1))?;
                self.append(ast::Statement::Assign { lhs: lhs.expr, rhs: rhs.expr });
                Ok(())
            }
            Op::FunctionCall => self.emit_function_call(inst),
            Op::ExtInst => {
                if self.parser.is_ignored_extended_instruction(inst) {
                    return Ok(());
                }
                if !self.parser.is_glsl_extended_instruction(inst) {
                    let set = inst.operand(0);
                    return Err(self.fail(format!(
                        "OpExtInst references unknown instruction set {set}"
                    )));
                }
                let value = self.emit_glsl_std_450_ext_inst(inst)?;
                self.emit_evaluated(inst, value)
            }
            Op::Phi => {
                let name = self.def_info[&inst.result_id]
                    .phi_var
                    .clone()
                    .expect("phi was given a state variable");
                let ty = self.parser.convert_type(inst.result_type_id)?;
                let value = TypedExpr { ty, expr: ast::Expression::Ident(name) };
                self.emit_const_def_or_write(inst, value)
            }
            Op::CompositeInsert | Op::VectorInsertDynamic => self.emit_composite_insert(inst),
            Op::ArrayLength => {
                let base = self.make_expression(inst.operand(0))?;
                let member_index = inst.operand(1);
                let struct_id = match self.module.def(self.module.type_id_of(inst.operand(0))) {
                    Some(ptr) if ptr.op == Op::TypePointer => ptr.operand(1),
                    _ => 0,
                };
                let member = self.parser.namer.member_name(struct_id, member_index);
                let value = TypedExpr {
                    ty: ast::Type::U32,
                    expr: ast::Expression::Call {
                        function: "arrayLength".to_string(),
                        args: vec![ast::Expression::member(base.expr, member)],
                    },
                };
                self.emit_const_def_or_write(inst, value)
            }
            Op::ImageSampleImplicitLod
            | Op::ImageSampleExplicitLod
            | Op::ImageSampleDrefImplicitLod
            | Op::ImageSampleDrefExplicitLod
            | Op::ImageGather
            | Op::ImageDrefGather
            | Op::ImageFetch
            | Op::ImageRead
            | Op::ImageWrite
            | Op::ImageQuerySize
            | Op::ImageQuerySizeLod
            | Op::ImageQueryLevels
            | Op::ImageQuerySamples => self.emit_image_access(inst),
            Op::ImageSampleProjImplicitLod
            | Op::ImageSampleProjExplicitLod
            | Op::ImageSampleProjDrefImplicitLod
            | Op::ImageSampleProjDrefExplicitLod
            | Op::ImageQueryLod => {
                let op = inst.op;
                Err(self.fail(format!("{op:?} is not supported in WGSL")))
            }
            _ => {
                if let Some(value) = self.maybe_emit_combinatorial_value(inst)? {
                    return self.emit_evaluated(inst, value);
                }
                let op = inst.op;
                let id = inst.result_id;
                Err(self.fail(format!("unhandled instruction {op:?} producing ID {id}")))
            }
        }
    }

    /// Routes a computed value either into the inline-at-use table or into
    /// a `let`/hoisted-var definition.
    fn emit_evaluated(&mut self, inst: &RawInst, value: TypedExpr) -> Result<()> {
        let info = &self.def_info[&inst.result_id];
        if !info.requires_hoisted_def && !info.requires_named_const_def && info.num_uses == 1 {
            self.singly_used_values.insert(inst.result_id, value);
            return Ok(());
        }
        self.emit_const_def_or_write(inst, value)
    }

    /// Emits `let <name> = <expr>;`, or an assignment to the already
    /// declared hoisted `var`.
    fn emit_const_def_or_write(&mut self, inst: &RawInst, value: TypedExpr) -> Result<()> {
        let id = inst.result_id;
        let name = self.parser.namer.name(id);
        let hoisted = self.def_info.get(&id).is_some_and(|i| i.requires_hoisted_def);
        if hoisted {
            self.append(ast::Statement::Assign {
                lhs: ast::Expression::Ident(name),
                rhs: value.expr,
            });
        } else {
            self.append(ast::Statement::VarDecl {
                kind: ast::VarDeclKind::Let,
                name,
                ty: Some(value.ty),
                init: Some(value.expr),
            });
        }
        self.identifier_values.insert(id);
        Ok(())
    }

    /// Builds the expression for a SPIR-V value ID.
    fn make_expression(&mut self, id: u32) -> Result<TypedExpr> {
        if let Some(expr) = self.singly_used_values.remove(&id) {
            return Ok(expr);
        }
        if self.identifier_values.contains(&id) {
            let ty = self.parser.convert_type(self.module.type_id_of(id))?;
            let name = self.parser.namer.name(id);
            return Ok(TypedExpr { ty, expr: ast::Expression::Ident(name) });
        }
        let Some(inst) = self.module.def(id).cloned() else {
            return Err(self.fail(format!("unhandled expression for ID {id}")));
        };
        match inst.op {
            // A module-scope variable: its name denotes the reference.
            Op::Variable => {
                let ty = self.parser.convert_type(inst.result_type_id)?;
                let name = self.parser.namer.name(id);
                Ok(TypedExpr { ty, expr: ast::Expression::Ident(name) })
            }
            Op::Constant
            | Op::ConstantTrue
            | Op::ConstantFalse
            | Op::ConstantNull
            | Op::ConstantComposite
            | Op::SpecConstant
            | Op::SpecConstantTrue
            | Op::SpecConstantFalse
            | Op::Undef => self.parser.make_constant_expression(id),
            // A load of a handle: stand in for the traced declaration.
            Op::Load if self.is_handle_type(inst.result_type_id) => {
                match self.parser.get_memory_object_declaration_for_handle(id, true) {
                    Some(decl) => {
                        let name = self.parser.namer.name(decl);
                        Ok(TypedExpr { ty: ast::Type::Void, expr: ast::Expression::Ident(name) })
                    }
                    None => Err(self.fail(format!(
                        "could not find memory object declaration for the image underlying \
                         id {id}"
                    ))),
                }
            }
            _ => Err(self.fail(format!("unhandled expression for ID {id}"))),
        }
    }

    /// An operand expression, with its signedness rectified for the
    /// consuming operation.
    fn make_operand(
        &mut self,
        inst: &RawInst,
        operand_index: usize,
        glsl: Option<u32>,
    ) -> Result<TypedExpr> {
        let expr = self.make_expression(inst.operand(operand_index))?;
        self.parser.rectify_operand_signedness(inst.op, glsl, expr)
    }

    /// Builds an expression for a side-effect-free instruction, or `None`
    /// when the opcode is not combinatorial.
    fn maybe_emit_combinatorial_value(&mut self, inst: &RawInst) -> Result<Option<TypedExpr>> {
        let op = inst.op;
        if let Some(binop) = simple_binary_op(op) {
            let arg0 = self.make_operand(inst, 0, None)?;
            let arg1 = self.make_operand(inst, 1, None)?;
            let arg1 = self.parser.rectify_second_operand_signedness(op, &arg0.ty, arg1);
            let ty = self.parser.convert_type(inst.result_type_id)?;
            let value =
                TypedExpr { ty, expr: ast::Expression::binary(binop, arg0.expr, arg1.expr) };
            return Ok(Some(self.parser.rectify_forced_result_type(value, op, None, &arg0.ty)));
        }
        if let Some(value) = self.maybe_emit_shift(inst)? {
            return Ok(Some(value));
        }
        if let Some(value) = self.maybe_emit_unordered_comparison(inst)? {
            return Ok(Some(value));
        }
        match op {
            Op::SNegate | Op::FNegate => {
                let arg = self.make_operand(inst, 0, None)?;
                let arg_ty = arg.ty.clone();
                let ty = self.parser.convert_type(inst.result_type_id)?;
                let value = TypedExpr {
                    ty,
                    expr: ast::Expression::unary(ast::UnaryOp::Negate, arg.expr),
                };
                Ok(Some(self.parser.rectify_forced_result_type(value, op, None, &arg_ty)))
            }
            Op::Not => {
                let arg = self.make_operand(inst, 0, None)?;
                let arg_ty = arg.ty.clone();
                let ty = self.parser.convert_type(inst.result_type_id)?;
                let value = TypedExpr {
                    ty,
                    expr: ast::Expression::unary(ast::UnaryOp::Complement, arg.expr),
                };
                Ok(Some(self.parser.rectify_forced_result_type(value, op, None, &arg_ty)))
            }
            Op::LogicalNot => {
                let arg = self.make_operand(inst, 0, None)?;
                let ty = self.parser.convert_type(inst.result_type_id)?;
                Ok(Some(TypedExpr {
                    ty,
                    expr: ast::Expression::unary(ast::UnaryOp::Not, arg.expr),
                }))
            }
            Op::Bitcast => {
                let arg = self.make_expression(inst.operand(0))?;
                let ty = self.parser.convert_type(inst.result_type_id)?;
                Ok(Some(TypedExpr {
                    ty: ty.clone(),
                    expr: ast::Expression::bitcast(ty, arg.expr),
                }))
            }
            Op::ConvertFToU | Op::ConvertFToS | Op::ConvertSToF | Op::ConvertUToF => {
                self.make_numeric_conversion(inst).map(Some)
            }
            Op::UConvert | Op::SConvert | Op::FConvert => {
                Err(self.fail(format!("{op:?} is not supported")))
            }
            Op::Select => {
                let cond = self.make_expression(inst.operand(0))?;
                let true_value = self.make_expression(inst.operand(1))?;
                let false_value = self.make_expression(inst.operand(2))?;
                let ty = self.parser.convert_type(inst.result_type_id)?;
                Ok(Some(TypedExpr {
                    ty,
                    expr: ast::Expression::Call {
                        function: "select".to_string(),
                        args: vec![false_value.expr, true_value.expr, cond.expr],
                    },
                }))
            }
            Op::Dot | Op::Any | Op::All | Op::IsNan | Op::IsInf | Op::Transpose => {
                let function = match op {
                    Op::Dot => "dot",
                    Op::Any => "any",
                    Op::All => "all",
                    Op::IsNan => "isNan",
                    Op::IsInf => "isInf",
                    _ => "transpose",
                };
                let mut args = vec![];
                for i in 0..inst.operands.len() {
                    args.push(self.make_expression(inst.operand(i))?.expr);
                }
                let ty = self.parser.convert_type(inst.result_type_id)?;
                Ok(Some(TypedExpr {
                    ty,
                    expr: ast::Expression::Call { function: function.to_string(), args },
                }))
            }
            Op::CompositeConstruct => {
                let mut args = Vec::with_capacity(inst.operands.len());
                for i in 0..inst.operands.len() {
                    args.push(self.make_expression(inst.operand(i))?.expr);
                }
                let ty = self.parser.convert_type(inst.result_type_id)?;
                Ok(Some(TypedExpr {
                    ty: ty.clone(),
                    expr: ast::Expression::Construct { ty, args },
                }))
            }
            Op::CompositeExtract => self.make_composite_extract(inst).map(Some),
            Op::VectorShuffle => self.make_vector_shuffle(inst).map(Some),
            Op::VectorExtractDynamic => {
                let vector = self.make_expression(inst.operand(0))?;
                let index = self.make_expression(inst.operand(1))?;
                let ty = self.parser.convert_type(inst.result_type_id)?;
                Ok(Some(TypedExpr {
                    ty,
                    expr: ast::Expression::index(vector.expr, index.expr),
                }))
            }
            Op::AccessChain | Op::InBoundsAccessChain => self.make_access_chain(inst).map(Some),
            Op::PtrAccessChain | Op::InBoundsPtrAccessChain => {
                Err(self.fail(format!("{op:?} is not supported")))
            }
            Op::CopyObject => {
                let arg = self.make_expression(inst.operand(0))?;
                Ok(Some(arg))
            }
            Op::BitReverse | Op::BitCount => Err(self.fail(format!("{op:?} is not supported"))),
            _ => Ok(None),
        }
    }

    fn maybe_emit_shift(&mut self, inst: &RawInst) -> Result<Option<TypedExpr>> {
        let op = inst.op;
        let binop = match op {
            Op::ShiftLeftLogical => ast::BinaryOp::ShiftLeft,
            Op::ShiftRightLogical | Op::ShiftRightArithmetic => ast::BinaryOp::ShiftRight,
            _ => return Ok(None),
        };
        let mut arg0 = self.make_expression(inst.operand(0))?;
        // The shifted value's signedness selects logical vs arithmetic
        // behavior in WGSL; the shift amount is always unsigned.
        arg0 = match op {
            Op::ShiftRightLogical => self.parser.as_unsigned(arg0)?,
            Op::ShiftRightArithmetic => self.parser.as_signed(arg0)?,
            _ => arg0,
        };
        let arg1 = self.make_expression(inst.operand(1))?;
        let arg1 = self.parser.as_unsigned(arg1)?;
        let arg0_ty = arg0.ty.clone();
        let ty = self.parser.convert_type(inst.result_type_id)?;
        let value = TypedExpr { ty, expr: ast::Expression::binary(binop, arg0.expr, arg1.expr) };
        Ok(Some(self.parser.rectify_forced_result_type(value, op, None, &arg0_ty)))
    }

    /// Unordered float comparisons: negate the opposite ordered comparison,
    /// so NaN operands yield true.
    fn maybe_emit_unordered_comparison(&mut self, inst: &RawInst) -> Result<Option<TypedExpr>> {
        let opposite = match inst.op {
            Op::FUnordEqual => ast::BinaryOp::NotEqual,
            Op::FUnordNotEqual => ast::BinaryOp::Equal,
            Op::FUnordLessThan => ast::BinaryOp::GreaterThanEqual,
            Op::FUnordLessThanEqual => ast::BinaryOp::GreaterThan,
            Op::FUnordGreaterThan => ast::BinaryOp::LessThanEqual,
            Op::FUnordGreaterThanEqual => ast::BinaryOp::LessThan,
            _ => return Ok(None),
        };
        let arg0 = self.make_expression(inst.operand(0))?;
        let arg1 = self.make_expression(inst.operand(1))?;
        let ty = self.parser.convert_type(inst.result_type_id)?;
        Ok(Some(TypedExpr {
            ty,
            expr: ast::Expression::unary(
                ast::UnaryOp::Not,
                ast::Expression::binary(opposite, arg0.expr, arg1.expr),
            ),
        }))
    }

    fn make_numeric_conversion(&mut self, inst: &RawInst) -> Result<TypedExpr> {
        let arg = self.make_operand(inst, 0, None)?;
        let requested = self.parser.convert_type(inst.result_type_id)?;
        let ok = match inst.op {
            Op::ConvertSToF | Op::ConvertUToF => {
                matches!(requested.component(), Some(ast::Type::F32))
            }
            Op::ConvertFToU => matches!(requested.component(), Some(ast::Type::U32)),
            _ => matches!(requested.component(), Some(ast::Type::I32)),
        };
        if !ok {
            let op = inst.op;
            return Err(self.fail(format!(
                "{op:?} requires a result type matching the conversion, got {requested}"
            )));
        }
        Ok(TypedExpr {
            ty: requested.clone(),
            expr: ast::Expression::Construct { ty: requested, args: vec![arg.expr] },
        })
    }

    /// `OpCompositeExtract`: a chain of member/index accesses with literal
    /// indices, bounds-checked against the aggregate's shape.
    fn make_composite_extract(&mut self, inst: &RawInst) -> Result<TypedExpr> {
        let mut expr = self.make_expression(inst.operand(0))?.expr;
        let mut current_type_id = self.module.type_id_of(inst.operand(0));
        for i in 1..inst.operands.len() {
            let index = inst.operand(i);
            let (next_expr, next_type) =
                self.walk_composite_index("OpCompositeExtract", expr, current_type_id, index)?;
            expr = next_expr;
            current_type_id = next_type;
        }
        let ty = self.parser.convert_type(inst.result_type_id)?;
        Ok(TypedExpr { ty, expr })
    }

    /// One literal-index step into a composite, with the bounds check and
    /// error message family shared by extract and insert.
    fn walk_composite_index(
        &mut self,
        op_name: &str,
        base: ast::Expression,
        type_id: u32,
        index: u32,
    ) -> Result<(ast::Expression, u32)> {
        let Some(type_inst) = self.module.def(type_id).cloned() else {
            return Err(self.fail(format!("{op_name} indexes into an unknown type {type_id}")));
        };
        match type_inst.op {
            Op::TypeVector => {
                let size = type_inst.operand(1);
                if index >= size {
                    return Err(self.fail(format!(
                        "{op_name} index value {index} is out of bounds for vector of {size} \
                         elements"
                    )));
                }
                let member = ["x", "y", "z", "w"][index as usize];
                Ok((ast::Expression::member(base, member), type_inst.operand(0)))
            }
            Op::TypeMatrix => {
                let columns = type_inst.operand(1);
                if index >= columns {
                    return Err(self.fail(format!(
                        "{op_name} index value {index} is out of bounds for matrix of {columns} \
                         columns"
                    )));
                }
                let index_expr = ast::Literal::U32(index).into();
                Ok((ast::Expression::index(base, index_expr), type_inst.operand(0)))
            }
            Op::TypeArray => {
                let size = self.module.constant_word(type_inst.operand(1)).unwrap_or(0);
                if index >= size {
                    return Err(self.fail(format!(
                        "{op_name} index value {index} is out of bounds for array of {size} \
                         elements"
                    )));
                }
                let index_expr = ast::Literal::U32(index).into();
                Ok((ast::Expression::index(base, index_expr), type_inst.operand(0)))
            }
            Op::TypeRuntimeArray => {
                let index_expr = ast::Literal::U32(index).into();
                Ok((ast::Expression::index(base, index_expr), type_inst.operand(0)))
            }
            Op::TypeStruct => {
                let members = type_inst.operands.len() as u32;
                if index >= members {
                    return Err(self.fail(format!(
                        "{op_name} index value {index} is out of bounds for structure having \
                         {members} members"
                    )));
                }
                let member = self.parser.namer.member_name(type_inst.result_id, index);
                Ok((ast::Expression::member(base, member), type_inst.operand(index as usize)))
            }
            _ => Err(self.fail(format!(
                "{op_name} cannot index into type {}",
                self.parser.show_type(type_id)
            ))),
        }
    }

    /// `OpVectorShuffle`: a constructor pulling components from the two
    /// source vectors. The 0xFFFFFFFF sentinel ("undefined component")
    /// deliberately maps to zero, not to an arbitrary value.
    fn make_vector_shuffle(&mut self, inst: &RawInst) -> Result<TypedExpr> {
        let vec0 = self.make_expression(inst.operand(0))?;
        let vec1 = self.make_expression(inst.operand(1))?;
        let size0 = vec0.ty.shape_size().unwrap_or(0);
        let size1 = vec1.ty.shape_size().unwrap_or(0);
        let component_ty = vec0
            .ty
            .component()
            .cloned()
            .unwrap_or(ast::Type::F32);

        let result_ty = self.parser.convert_type(inst.result_type_id)?;
        let mut args = vec![];
        for i in 2..inst.operands.len() {
            let index = inst.operand(i);
            if index == u32::MAX {
                args.push(self.parser.make_null_value(&component_ty)?);
            } else if index < size0 {
                let member = ["x", "y", "z", "w"][index as usize];
                args.push(ast::Expression::member(vec0.expr.clone(), member));
            } else if index < size0 + size1 {
                let member = ["x", "y", "z", "w"][(index - size0) as usize];
                args.push(ast::Expression::member(vec1.expr.clone(), member));
            } else {
                return Err(self.fail(format!(
                    "OpVectorShuffle component index {index} is out of bounds for a combined \
                     vector of {} elements",
                    size0 + size1
                )));
            }
        }
        Ok(TypedExpr {
            ty: result_ty.clone(),
            expr: ast::Expression::Construct { ty: result_ty, args },
        })
    }

    /// `OpCompositeInsert`/`OpVectorInsertDynamic`: copy to a temporary,
    /// assign the component, and name the result.
    fn emit_composite_insert(&mut self, inst: &RawInst) -> Result<()> {
        // OpCompositeInsert is (Object, Composite, indices...); the dynamic
        // vector form is (Vector, Component, Index).
        let (object_index, composite_index) =
            if inst.op == Op::CompositeInsert { (0, 1) } else { (1, 0) };
        let result_name = self.parser.namer.name(inst.result_id);
        let temp_name = self.parser.namer.make_derived_name(&format!("{result_name}_temp"));
        let composite = self.make_expression(inst.operand(composite_index))?;
        let object = self.make_expression(inst.operand(object_index))?;
        let result_ty = self.parser.convert_type(inst.result_type_id)?;

        self.append(ast::Statement::VarDecl {
            kind: ast::VarDeclKind::Var,
            name: temp_name.clone(),
            ty: Some(result_ty.clone()),
            init: Some(composite.expr),
        });

        let mut lhs = ast::Expression::Ident(temp_name.clone());
        if inst.op == Op::CompositeInsert {
            let mut current_type_id = self.module.type_id_of(inst.operand(composite_index));
            for i in 2..inst.operands.len() {
                let index = inst.operand(i);
                let (next, next_ty) =
                    self.walk_composite_index("OpCompositeInsert", lhs, current_type_id, index)?;
                lhs = next;
                current_type_id = next_ty;
            }
        } else {
            let index = self.make_expression(inst.operand(2))?;
            lhs = ast::Expression::index(lhs, index.expr);
        }
        self.append(ast::Statement::Assign { lhs, rhs: object.expr });

        let value = TypedExpr { ty: result_ty, expr: ast::Expression::Ident(temp_name) };
        self.emit_const_def_or_write(inst, value)
    }

    /// `OpAccessChain`: a member/index chain over the pointee type, yielding
    /// a pointer-typed reference expression.
    fn make_access_chain(&mut self, inst: &RawInst) -> Result<TypedExpr> {
        let base = self.make_expression(inst.operand(0))?;
        let (class, mut pointee_id) = match self.module.def(self.module.type_id_of(inst.operand(0)))
        {
            Some(ptr) if ptr.op == Op::TypePointer => {
                let class = match &base.ty {
                    ast::Type::Pointer { class, .. } => *class,
                    _ => ast::StorageClass::Function,
                };
                (class, ptr.operand(1))
            }
            _ => {
                let id = inst.operand(0);
                return Err(self.fail(format!("OpAccessChain base {id} is not a pointer")));
            }
        };

        let mut expr = base.expr;
        for i in 1..inst.operands.len() {
            let index_id = inst.operand(i);
            let Some(type_inst) = self.module.def(pointee_id).cloned() else {
                return Err(self.fail(format!("invalid access chain through type {pointee_id}")));
            };
            match type_inst.op {
                Op::TypeStruct => {
                    let Some(member_index) = self.module.constant_word(index_id) else {
                        return Err(self.fail(format!(
                            "OpAccessChain index into a structure must be a constant: ID \
                             {index_id}"
                        )));
                    };
                    if member_index as usize >= type_inst.operands.len() {
                        return Err(self.fail(format!(
                            "OpAccessChain index value {member_index} is out of bounds for \
                             structure having {} members",
                            type_inst.operands.len()
                        )));
                    }
                    let member =
                        self.parser.namer.member_name(type_inst.result_id, member_index);
                    expr = ast::Expression::member(expr, member);
                    pointee_id = type_inst.operand(member_index as usize);
                }
                Op::TypeArray | Op::TypeRuntimeArray | Op::TypeVector | Op::TypeMatrix => {
                    let index = self.make_expression(index_id)?;
                    expr = ast::Expression::index(expr, index.expr);
                    pointee_id = type_inst.operand(0);
                }
                _ => {
                    return Err(self.fail(format!(
                        "OpAccessChain cannot index into type {}",
                        self.parser.show_type(pointee_id)
                    )));
                }
            }
        }
        let store = self.parser.convert_type(pointee_id)?;
        Ok(TypedExpr {
            ty: ast::Type::Pointer { class, store: Box::new(store) },
            expr,
        })
    }

    fn emit_function_call(&mut self, inst: &RawInst) -> Result<()> {
        let callee_id = inst.operand(0);
        let function = self.parser.namer.name(callee_id);
        let mut args = Vec::with_capacity(inst.operands.len() - 1);
        for i in 1..inst.operands.len() {
            args.push(self.make_expression(inst.operand(i))?.expr);
        }
        let ty = self.parser.convert_type(inst.result_type_id)?;
        if ty == ast::Type::Void {
            self.append(ast::Statement::Call { function, args });
            return Ok(());
        }
        let value = TypedExpr { ty, expr: ast::Expression::Call { function, args } };
        self.emit_const_def_or_write(inst, value)
    }

    /// A GLSL.std.450 extended instruction becomes a call qualified by the
    /// import alias.
    fn emit_glsl_std_450_ext_inst(&mut self, inst: &RawInst) -> Result<TypedExpr> {
        let ext = inst.operand(1);
        let Some(name) = spec::glsl_std_450_name(ext) else {
            return Err(self.fail(format!("unhandled GLSL.std.450 instruction {ext}")));
        };
        let mut args = Vec::with_capacity(inst.operands.len() - 2);
        let mut first_operand_type = None;
        for i in 2..inst.operands.len() {
            let arg = self.make_operand(inst, i, Some(ext))?;
            if first_operand_type.is_none() {
                first_operand_type = Some(arg.ty.clone());
            }
            args.push(arg.expr);
        }
        let ty = self.parser.convert_type(inst.result_type_id)?;
        let value = TypedExpr {
            ty,
            expr: ast::Expression::Call { function: format!("std::glsl::{name}"), args },
        };
        Ok(match first_operand_type {
            Some(first) => {
                self.parser.rectify_forced_result_type(value, Op::ExtInst, Some(ext), &first)
            }
            None => value,
        })
    }

    // ------------------------------------------------------------------
    // Image access
    // ------------------------------------------------------------------

    fn trace_image_decl(&mut self, inst: &RawInst) -> Result<u32> {
        let id = inst.operand(0);
        match self.parser.get_memory_object_declaration_for_handle(id, true) {
            Some(decl) => Ok(decl),
            None => Err(self.fail(format!(
                "could not find memory object declaration for the image underlying id {id}"
            ))),
        }
    }

    fn trace_sampler_decl(&mut self, inst: &RawInst) -> Result<u32> {
        let id = inst.operand(0);
        match self.parser.get_memory_object_declaration_for_handle(id, false) {
            Some(decl) => Ok(decl),
            None => Err(self.fail(format!(
                "could not find memory object declaration for the sampler underlying id {id}"
            )))
        }
    }

    /// Translates an image instruction into the corresponding `texture*`
    /// builtin call, enforcing the coordinate-arity, ConstOffset,
    /// depth-widening, and texel-narrowing rules.
    fn emit_image_access(&mut self, inst: &RawInst) -> Result<()> {
        let op = inst.op;
        let image_decl = self.trace_image_decl(inst)?;
        let texture_ty = self.parser.get_type_for_handle_var(image_decl)?;
        let ast::Type::Texture(texture) = texture_ty.clone() else {
            let name = self.parser.namer.name(image_decl);
            return Err(self.fail(format!("image access on a non-texture handle {name}")));
        };
        let texture_name = self.parser.namer.name(image_decl);
        let texture_expr = ast::Expression::Ident(texture_name);

        let (dim, is_depth, is_multisampled, storage_format) = match &texture {
            ast::TextureType::Sampled { dim, .. } => (*dim, false, false, None),
            ast::TextureType::Multisampled { dim, .. } => (*dim, false, true, None),
            ast::TextureType::Depth { dim } => (*dim, true, false, None),
            ast::TextureType::Storage { dim, format, .. } => (*dim, false, false, Some(*format)),
        };

        // Query instructions have their own shapes.
        match op {
            Op::ImageQuerySize | Op::ImageQuerySizeLod => {
                return self.emit_image_size_query(inst, texture_expr, dim);
            }
            Op::ImageQueryLevels | Op::ImageQuerySamples => {
                let function = if op == Op::ImageQueryLevels {
                    "textureNumLevels"
                } else {
                    "textureNumSamples"
                };
                let call = ast::Expression::Call {
                    function: function.to_string(),
                    args: vec![texture_expr],
                };
                let declared = self.parser.convert_type(inst.result_type_id)?;
                let value = if declared == ast::Type::U32 {
                    TypedExpr {
                        ty: declared.clone(),
                        expr: ast::Expression::bitcast(declared, call),
                    }
                } else {
                    TypedExpr { ty: declared, expr: call }
                };
                return self.emit_const_def_or_write(inst, value);
            }
            _ => {}
        }

        let is_sampling = matches!(
            op,
            Op::ImageSampleImplicitLod
                | Op::ImageSampleExplicitLod
                | Op::ImageSampleDrefImplicitLod
                | Op::ImageSampleDrefExplicitLod
        );
        let is_dref =
            matches!(op, Op::ImageSampleDrefImplicitLod | Op::ImageSampleDrefExplicitLod
                | Op::ImageDrefGather);
        let is_gather = matches!(op, Op::ImageGather | Op::ImageDrefGather);

        let mut args = vec![texture_expr];
        if is_sampling || is_gather {
            let sampler_decl = self.trace_sampler_decl(inst)?;
            let sampler_name = self.parser.namer.name(sampler_decl);
            args.push(ast::Expression::Ident(sampler_name));
        }

        // Coordinates, with the array index split off.
        let (coords, array_index) = self.make_coordinate_operands(inst, dim)?;
        args.push(coords);
        if let Some(array_index) = array_index {
            args.push(array_index);
        }

        // The extra fixed operand: depth reference or gather component.
        let mut dref = None;
        let mut gather_component = None;
        let fixed_operands;
        if is_dref {
            dref = Some(self.make_expression(inst.operand(2))?.expr);
            fixed_operands = 3;
        } else if is_gather {
            gather_component = Some(self.make_expression(inst.operand(2))?.expr);
            fixed_operands = 3;
        } else if op == Op::ImageWrite {
            fixed_operands = 3;
        } else {
            fixed_operands = 2;
        }

        // Decode the trailing image operands.
        let mut bias = None;
        let mut lod = None;
        let mut grad = None;
        let mut const_offset = None;
        let mut sample_index = None;
        if inst.operands.len() > fixed_operands {
            let mask = inst.operand(fixed_operands);
            let mut next = fixed_operands + 1;
            if mask & image_operands::BIAS != 0 {
                bias = Some(self.make_expression(inst.operand(next))?.expr);
                next += 1;
            }
            if mask & image_operands::LOD != 0 {
                let lod_id = inst.operand(next);
                lod = Some((lod_id, self.make_expression(lod_id)?.expr));
                next += 1;
            }
            if mask & image_operands::GRAD != 0 {
                let ddx = self.make_expression(inst.operand(next))?.expr;
                let ddy = self.make_expression(inst.operand(next + 1))?.expr;
                grad = Some((ddx, ddy));
                next += 2;
            }
            if mask & image_operands::CONST_OFFSET != 0 {
                if !is_sampling && !is_gather {
                    return Err(self.fail(
                        "ConstOffset is only permitted for sampling operations".to_string(),
                    ));
                }
                if !matches!(
                    dim,
                    ast::TextureDim::D2 | ast::TextureDim::D2Array | ast::TextureDim::D3
                ) {
                    return Err(self.fail(
                        "ConstOffset is only permitted for 2D, 2D array and 3D textures"
                            .to_string(),
                    ));
                }
                const_offset = Some(self.make_expression(inst.operand(next))?.expr);
                next += 1;
            }
            if mask & image_operands::SAMPLE != 0 {
                sample_index = Some(self.make_expression(inst.operand(next))?.expr);
            }
        }

        // Pick the builtin and finish the argument list.
        let function = match op {
            Op::ImageSampleImplicitLod => {
                if let Some(bias) = bias {
                    args.push(bias);
                    "textureSampleBias"
                } else {
                    "textureSample"
                }
            }
            Op::ImageSampleExplicitLod => {
                if let Some((ddx, ddy)) = grad {
                    args.push(ddx);
                    args.push(ddy);
                    "textureSampleGrad"
                } else if let Some((_, lod_expr)) = lod {
                    args.push(lod_expr);
                    "textureSampleLevel"
                } else {
                    return Err(self.fail(
                        "explicit-LOD sampling requires a Lod or Grad image operand".to_string(),
                    ));
                }
            }
            Op::ImageSampleDrefImplicitLod | Op::ImageSampleDrefExplicitLod => {
                if grad.is_some() {
                    return Err(self.fail(
                        "depth-reference sampling with explicit gradient is not supported"
                            .to_string(),
                    ));
                }
                if let Some((lod_id, _)) = lod {
                    // Only an explicit LOD of zero is expressible.
                    let is_zero = self
                        .module
                        .constant_word(lod_id)
                        .is_some_and(|w| f32::from_bits(w) == 0.0);
                    if !is_zero {
                        return Err(self.fail(
                            "depth-reference sampling requires level-of-detail 0.0".to_string(),
                        ));
                    }
                }
                args.push(dref.take().expect("dref operand was decoded"));
                "textureSampleCompare"
            }
            Op::ImageGather => {
                // WGSL puts the gather component first.
                let component = gather_component.take().expect("gather component was decoded");
                args.insert(0, component);
                if let Some(offset) = const_offset.take() {
                    args.push(offset);
                }
                let ty = self.parser.convert_type(inst.result_type_id)?;
                let value = TypedExpr {
                    ty,
                    expr: ast::Expression::Call { function: "textureGather".to_string(), args },
                };
                return self.emit_const_def_or_write(inst, value);
            }
            Op::ImageDrefGather => {
                args.push(dref.take().expect("dref operand was decoded"));
                "textureGatherCompare"
            }
            Op::ImageFetch | Op::ImageRead => {
                if let Some((_, lod_expr)) = lod {
                    args.push(lod_expr);
                } else if is_multisampled {
                    if let Some(sample) = sample_index.take() {
                        args.push(sample);
                    }
                } else if storage_format.is_none() {
                    // textureLoad on a sampled texture requires a level.
                    args.push(ast::Literal::I32(0).into());
                }
                "textureLoad"
            }
            Op::ImageWrite => {
                let texel = self.make_expression(inst.operand(2))?;
                let format = match storage_format {
                    Some(format) => format,
                    None => {
                        return Err(self.fail(format!(
                            "OpImageWrite requires a storage texture: {}",
                            self.parser.namer.display_name(image_decl)
                        )));
                    }
                };
                let channels = format.channel_count();
                let provided = texel.ty.shape_size().unwrap_or(1);
                if provided < channels {
                    return Err(self.fail(format!(
                        "texel has too few components for storage texture: {provided} provided \
                         but {channels} required"
                    )));
                }
                let texel_expr = if provided > channels {
                    let swizzle = ["x", "xy", "xyz"][channels as usize - 1];
                    ast::Expression::member(texel.expr, swizzle)
                } else {
                    texel.expr
                };
                args.push(texel_expr);
                self.append(ast::Statement::Call { function: "textureStore".to_string(), args });
                return Ok(());
            }
            _ => unreachable!("image opcode was routed here"),
        };
        if let Some(offset) = const_offset {
            args.push(offset);
        }

        let declared = self.parser.convert_type(inst.result_type_id)?;
        let call = ast::Expression::Call { function: function.to_string(), args };
        // Depth sampling yields a scalar in WGSL, but the SPIR-V result is
        // a 4-component vector: widen to (d, 0, 0, 0).
        let expr = if is_depth && !is_dref && matches!(&declared, ast::Type::Vector { .. }) {
            ast::Expression::Construct {
                ty: declared.clone(),
                args: vec![
                    call,
                    ast::Literal::F32(0.0).into(),
                    ast::Literal::F32(0.0).into(),
                    ast::Literal::F32(0.0).into(),
                ],
            }
        } else {
            call
        };
        self.emit_const_def_or_write(inst, TypedExpr { ty: declared, expr })
    }

    /// Splits the SPIR-V coordinate vector into WGSL coordinates plus an
    /// optional array index, checking arity.
    fn make_coordinate_operands(
        &mut self,
        inst: &RawInst,
        dim: ast::TextureDim,
    ) -> Result<(ast::Expression, Option<ast::Expression>)> {
        let coord = self.make_expression(inst.operand(1))?;
        let required = dim.coord_size() + u32::from(dim.is_arrayed());
        let given = coord.ty.shape_size().unwrap_or(1);
        if given < required {
            return Err(self.fail(format!(
                "image access requires {required} coordinate components, but only {given} are \
                 provided"
            )));
        }
        let coord_size = dim.coord_size();
        let is_float = matches!(coord.ty.component(), Some(ast::Type::F32));
        if dim.is_arrayed() {
            let coords = if coord_size == 1 {
                ast::Expression::member(coord.expr.clone(), "x")
            } else {
                let swizzle = ["x", "xy", "xyz"][coord_size as usize - 1];
                ast::Expression::member(coord.expr.clone(), swizzle)
            };
            let layer_component = ["x", "y", "z", "w"][coord_size as usize];
            let mut layer = ast::Expression::member(coord.expr, layer_component);
            if is_float {
                // The array layer is integral in WGSL.
                layer = ast::Expression::Construct { ty: ast::Type::I32, args: vec![layer] };
            }
            Ok((coords, Some(layer)))
        } else if given > required {
            let swizzle = ["x", "xy", "xyz"][required as usize - 1];
            Ok((ast::Expression::member(coord.expr, swizzle), None))
        } else {
            Ok((coord.expr, None))
        }
    }

    /// `OpImageQuerySize[Lod]` becomes `textureDimensions`, with the layer
    /// count re-attached for arrayed textures (SPIR-V folds it into the
    /// size vector).
    fn emit_image_size_query(
        &mut self,
        inst: &RawInst,
        texture_expr: ast::Expression,
        dim: ast::TextureDim,
    ) -> Result<()> {
        let mut args = vec![texture_expr.clone()];
        if inst.op == Op::ImageQuerySizeLod {
            args.push(self.make_expression(inst.operand(1))?.expr);
        }
        let dims_call =
            ast::Expression::Call { function: "textureDimensions".to_string(), args };
        let declared = self.parser.convert_type(inst.result_type_id)?;
        let expr = if dim.is_arrayed() {
            let mut components = vec![];
            for i in 0..dim.coord_size() {
                let member = ["x", "y", "z"][i as usize];
                components.push(ast::Expression::member(dims_call.clone(), member));
            }
            components.push(ast::Expression::Call {
                function: "textureNumLayers".to_string(),
                args: vec![texture_expr],
            });
            ast::Expression::Construct { ty: declared.clone(), args: components }
        } else if declared.is_unsigned_scalar_or_vector() {
            ast::Expression::bitcast(declared.clone(), dims_call)
        } else {
            dims_call
        };
        self.emit_const_def_or_write(inst, TypedExpr { ty: declared, expr })
    }
}

/// A switch selector literal with the selector's signedness.
fn make_case_literal(value: u64, signed: bool) -> ast::Literal {
    if signed {
        ast::Literal::I32(value as u32 as i32)
    } else {
        ast::Literal::U32(value as u32)
    }
}

/// Binary opcodes that map 1:1 onto an AST binary operator (shifts and
/// unordered comparisons are handled separately).
fn simple_binary_op(op: Op) -> Option<ast::BinaryOp> {
    use ast::BinaryOp as B;
    Some(match op {
        Op::IAdd | Op::FAdd => B::Add,
        Op::ISub | Op::FSub => B::Subtract,
        Op::IMul
        | Op::FMul
        | Op::VectorTimesScalar
        | Op::MatrixTimesScalar
        | Op::VectorTimesMatrix
        | Op::MatrixTimesVector
        | Op::MatrixTimesMatrix => B::Multiply,
        Op::UDiv | Op::SDiv | Op::FDiv => B::Divide,
        Op::UMod | Op::SMod | Op::SRem | Op::FRem | Op::FMod => B::Modulo,
        Op::BitwiseAnd => B::And,
        Op::BitwiseOr => B::Or,
        Op::BitwiseXor => B::Xor,
        Op::LogicalAnd => B::LogicalAnd,
        Op::LogicalOr => B::LogicalOr,
        Op::LogicalEqual | Op::IEqual | Op::FOrdEqual => B::Equal,
        Op::LogicalNotEqual | Op::INotEqual | Op::FOrdNotEqual => B::NotEqual,
        Op::ULessThan | Op::SLessThan | Op::FOrdLessThan => B::LessThan,
        Op::ULessThanEqual | Op::SLessThanEqual | Op::FOrdLessThanEqual => B::LessThanEqual,
        Op::UGreaterThan | Op::SGreaterThan | Op::FOrdGreaterThan => B::GreaterThan,
        Op::UGreaterThanEqual | Op::SGreaterThanEqual | Op::FOrdGreaterThanEqual => {
            B::GreaterThanEqual
        }
        _ => return None,
    })
}
