//! The block-order fixture matrix.
//!
//! Each fixture is a CFG shape with its exact expected reverse structured
//! post-order. These orderings are the behavioral contract for the
//! structured traversal: switch cases surface in naturally-reversed order
//! unless a fallthrough pins one behind its predecessor; loop bodies,
//! continue targets, and merges follow the loop header; merges always come
//! last in their construct.

mod common;

use common::*;
use spv2wgsl::parse::{FunctionEmitter, Parser};
use spv2wgsl::spv::spec::Op;

fn label(id: u32) -> Vec<u32> {
    inst(Op::Label, &[id])
}

fn branch(to: u32) -> Vec<u32> {
    inst(Op::Branch, &[to])
}

fn branch_cond(cond: u32, t: u32, f: u32) -> Vec<u32> {
    inst(Op::BranchConditional, &[cond, t, f])
}

fn sel_merge(merge: u32) -> Vec<u32> {
    inst(Op::SelectionMerge, &[merge, 0])
}

fn loop_merge(merge: u32, cont: u32) -> Vec<u32> {
    inst(Op::LoopMerge, &[merge, cont, 0])
}

fn switch(selector: u32, default: u32, pairs: &[(u32, u32)]) -> Vec<u32> {
    let mut operands = vec![selector, default];
    for &(value, target) in pairs {
        operands.push(value);
        operands.push(target);
    }
    inst(Op::Switch, &operands)
}

fn ret() -> Vec<u32> {
    inst(Op::Return, &[])
}

fn block_order_of(body: &[Vec<u32>]) -> Vec<u32> {
    let words = assemble_function(body);
    let mut parser = Parser::new(&words);
    parser.build_internal_module().expect("module decodes");
    let mut fe = FunctionEmitter::new(&mut parser, 0);
    fe.register_basic_blocks();
    fe.compute_block_order_and_positions();
    fe.block_order().to_vec()
}

#[test]
fn one_block() {
    let words = assemble_function(&[label(42), ret()]);
    let mut parser = Parser::new(&words);
    parser.build_internal_module().unwrap();
    let mut fe = FunctionEmitter::new(&mut parser, 0);
    fe.register_basic_blocks();
    fe.compute_block_order_and_positions();
    assert_eq!(fe.block_order(), &[42]);
    assert_eq!(fe.get_block_info(42).unwrap().pos, 0);
}

#[test]
fn ignores_statically_unreachable() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(15), // statically dead
        ret(),
        label(20),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20]);
}

#[test]
fn kill_is_a_dead_end() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(15),
        ret(),
        label(20),
        inst(Op::Kill, &[]),
    ]);
    assert_eq!(order, vec![10, 20]);
}

#[test]
fn unreachable_is_a_dead_end() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(15),
        ret(),
        label(20),
        inst(Op::Unreachable, &[]),
    ]);
    assert_eq!(order, vec![10, 20]);
}

#[test]
fn reorders_a_sequence() {
    let words = assemble_function(&[
        label(10),
        branch(20),
        label(30),
        ret(),
        label(20),
        branch(30), // backtrack in binary order
    ]);
    let mut parser = Parser::new(&words);
    parser.build_internal_module().unwrap();
    let mut fe = FunctionEmitter::new(&mut parser, 0);
    fe.register_basic_blocks();
    fe.compute_block_order_and_positions();
    assert_eq!(fe.block_order(), &[10, 20, 30]);
    assert_eq!(fe.get_block_info(10).unwrap().pos, 0);
    assert_eq!(fe.get_block_info(20).unwrap().pos, 1);
    assert_eq!(fe.get_block_info(30).unwrap().pos, 2);
}

#[test]
fn duplicate_conditional_targets_collapse() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        branch_cond(COND, 20, 20),
        label(99),
        ret(),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 20, 99]);
}

#[test]
fn respects_conditional_branch_order() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        branch_cond(COND, 20, 30),
        label(99),
        ret(),
        label(30),
        ret(),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 20, 30, 99]);
}

#[test]
fn true_only_branch() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        branch_cond(COND, 20, 99),
        label(99),
        ret(),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 20, 99]);
}

#[test]
fn false_only_branch() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        branch_cond(COND, 99, 20),
        label(99),
        ret(),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 20, 99]);
}

#[test]
fn switch_order_naturally_reversed() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 99, &[(20, 20), (30, 30)]),
        label(99),
        ret(),
        label(30),
        ret(),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 30, 20, 99]);
}

#[test]
fn switch_with_default_naturally_reversed() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 80, &[(20, 20), (30, 30)]),
        label(80), // the default case
        branch(99),
        label(99),
        ret(),
        label(30),
        ret(),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 30, 20, 80, 99]);
}

#[test]
fn switch_default_same_as_a_case() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 30, &[(20, 20), (30, 30), (40, 40)]),
        label(99),
        ret(),
        label(30),
        branch(99),
        label(20),
        branch(99),
        label(40),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 40, 20, 30, 99]);
}

#[test]
fn respects_switch_case_fallthrough() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 99, &[(20, 20), (30, 30), (40, 40), (50, 50)]),
        label(50),
        branch(99),
        label(99),
        ret(),
        label(40),
        branch(99),
        label(30),
        branch(50), // fallthrough
        label(20),
        branch(40), // fallthrough
    ]);
    assert_eq!(order, vec![10, 30, 50, 20, 40, 99]);
}

#[test]
fn respects_fallthrough_from_default() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 80, &[(20, 20), (30, 30), (40, 40)]),
        label(80), // the default case
        branch(30), // fallthrough to another case
        label(99),
        ret(),
        label(40),
        branch(99),
        label(30),
        branch(40),
        label(20),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 20, 80, 30, 40, 99]);
}

#[test]
fn respects_fallthrough_case_to_default_to_case() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 80, &[(20, 20), (30, 30)]),
        label(99),
        ret(),
        label(20),
        branch(80), // fallthrough to default
        label(80),
        branch(30), // fallthrough to case 30
        label(30),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 20, 80, 30, 99]);
}

#[test]
fn fallthrough_in_opposite_directions() {
    // A backward fallthrough is not valid SPIR-V, but the ordering
    // algorithm tolerates it.
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 99, &[(20, 20), (30, 30), (40, 40), (50, 50)]),
        label(99),
        ret(),
        label(20),
        branch(30), // forward
        label(40),
        branch(99),
        label(30),
        branch(99),
        label(50),
        branch(40), // backward
    ]);
    assert_eq!(order, vec![10, 50, 40, 20, 30, 99]);
}

#[test]
fn interleaved_fallthrough_chains() {
    let order = block_order_of(&[
        label(10),
        sel_merge(99),
        switch(SELECTOR, 99, &[(20, 20), (30, 30), (40, 40), (50, 50)]),
        label(99),
        ret(),
        label(20),
        branch(40),
        label(30),
        branch(50),
        label(40),
        branch(60),
        label(50),
        branch(70),
        label(60),
        branch(99),
        label(70),
        branch(99),
    ]);
    assert_eq!(order, vec![10, 30, 50, 70, 20, 40, 60, 99]);
}

#[test]
fn single_block_loop_simple() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 20),
        branch_cond(COND, 20, 99),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 99]);
}

#[test]
fn single_block_loop_infinite() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 20),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 99]);
}

#[test]
fn single_block_loop_duplicate_infinite() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 20),
        branch_cond(COND, 20, 20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 99]);
}

#[test]
fn loop_header_has_break_if() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99), // like While
        label(30),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

#[test]
fn loop_header_has_break_unless() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 99, 30),
        label(30),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

#[test]
fn loop_body_has_break() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch(99), // break
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

#[test]
fn loop_body_has_break_if() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch_cond(COND2, 99, 40), // break-if
        label(40),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 40, 50, 99]);
}

#[test]
fn loop_body_has_continue_if() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch_cond(COND2, 50, 40), // continue-if
        label(40),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 40, 50, 99]);
}

#[test]
fn loop_body_contains_if() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        sel_merge(49),
        branch_cond(COND2, 40, 45),
        label(40),
        branch(49),
        label(45),
        branch(49),
        label(49),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 40, 45, 49, 50, 99]);
}

#[test]
fn loop_body_if_breaks() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        sel_merge(49),
        branch_cond(COND2, 40, 49),
        label(40),
        branch(99), // break from nested if
        label(49),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 40, 49, 50, 99]);
}

#[test]
fn loop_body_if_continues() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        sel_merge(49),
        branch_cond(COND2, 40, 49),
        label(40),
        branch(50), // continue from nested if
        label(49),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 40, 49, 50, 99]);
}

#[test]
fn loop_body_contains_switch() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        sel_merge(49),
        switch(SELECTOR, 49, &[(40, 40), (45, 45)]),
        label(40),
        branch(49),
        label(45),
        branch(49),
        label(49),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 45, 40, 49, 50, 99]);
}

#[test]
fn loop_body_switch_case_breaks() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        sel_merge(49),
        switch(SELECTOR, 49, &[(40, 40), (45, 45)]),
        label(40),
        branch(99), // escapes the loop, not just the switch
        label(45),
        branch(49),
        label(49),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 45, 40, 49, 50, 99]);
}

#[test]
fn loop_body_switch_case_continues() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        sel_merge(49),
        switch(SELECTOR, 49, &[(40, 40), (45, 45)]),
        label(40),
        branch(50), // continue bypasses the switch merge
        label(45),
        branch(49),
        label(49),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 45, 40, 49, 50, 99]);
}

#[test]
fn loop_body_switch_continue_and_break() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        switch(SELECTOR, 99, &[(50, 50)]), // default breaks, 50 continues
        label(40),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

#[test]
fn loop_continue_is_a_sequence() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch(50),
        label(50),
        branch(60),
        label(60),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 60, 99]);
}

#[test]
fn loop_continue_contains_if() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch(50),
        label(50),
        sel_merge(89),
        branch_cond(COND2, 60, 70),
        label(89),
        branch(20), // backedge
        label(60),
        branch(89),
        label(70),
        branch(89),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 60, 70, 89, 99]);
}

#[test]
fn loop_continue_has_break_if() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch(50),
        label(50),
        branch_cond(COND2, 99, 20),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

#[test]
fn loop_continue_has_break_unless() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch(50),
        label(50),
        branch_cond(COND2, 20, 99),
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

#[test]
fn loop_continue_ends_in_switch() {
    let order = block_order_of(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        branch(50),
        label(50),
        switch(SELECTOR, 20, &[(99, 99)]), // obtuse but orderable
        label(99),
        ret(),
    ]);
    assert_eq!(order, vec![10, 20, 30, 50, 99]);
}

fn nested_loop_fixture(inner_continue_terminator: Vec<u32>) -> Vec<Vec<u32>> {
    vec![
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        loop_merge(49, 40),
        branch_cond(COND2, 35, 49),
        label(35),
        branch(37),
        label(37),
        branch(40),
        label(40), // inner loop's continue target
        inner_continue_terminator,
        label(49), // inner loop's merge
        branch(50),
        label(50), // outer loop's continue target
        branch(20),
        label(99),
        ret(),
    ]
}

#[test]
fn loop_in_loop() {
    let order = block_order_of(&nested_loop_fixture(branch(30)));
    assert_eq!(order, vec![10, 20, 30, 35, 37, 40, 49, 50, 99]);
}

#[test]
fn loop_in_loop_inner_continue_breaks() {
    // Backedge plus inner break, from the inner continue target.
    let order = block_order_of(&nested_loop_fixture(branch_cond(COND3, 30, 49)));
    assert_eq!(order, vec![10, 20, 30, 35, 37, 40, 49, 50, 99]);
}

#[test]
fn loop_in_loop_inner_continue_continues_outer() {
    let order = block_order_of(&nested_loop_fixture(branch_cond(COND3, 30, 50)));
    assert_eq!(order, vec![10, 20, 30, 35, 37, 40, 49, 50, 99]);
}

#[test]
fn loop_in_loop_switch_backedge_break_continue() {
    // default -> backedge, 49 -> inner break, 50 -> outer continue.
    let order =
        block_order_of(&nested_loop_fixture(switch(SELECTOR, 30, &[(49, 49), (50, 50)])));
    assert_eq!(order, vec![10, 20, 30, 35, 37, 40, 49, 50, 99]);
}

// ---------------------------------------------------------------------
// Merge registration diagnostics
// ---------------------------------------------------------------------

fn register_merges_error(body: &[Vec<u32>]) -> String {
    let words = assemble_function(body);
    let mut parser = Parser::new(&words);
    parser.build_internal_module().unwrap();
    let mut fe = FunctionEmitter::new(&mut parser, 0);
    fe.register_basic_blocks();
    assert!(fe.register_merges().is_err());
    drop(fe);
    parser.error_string()
}

#[test]
fn merge_same_as_continue_is_rejected() {
    let error = register_merges_error(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(50, 50),
        branch_cond(COND, 20, 99),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(
        error,
        "Invalid structured header block 20: declares block 50 as both its merge block and \
         continue target"
    );
}

#[test]
fn continue_target_reuse_is_rejected() {
    let error = register_merges_error(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(49, 40),
        branch_cond(COND, 30, 49),
        label(30),
        branch(40),
        label(40),
        branch(20),
        label(49),
        branch(50),
        label(50),
        loop_merge(99, 40),
        branch_cond(COND, 60, 99),
        label(60),
        branch(70),
        label(70),
        branch(50),
        label(99),
        ret(),
    ]);
    assert_eq!(
        error,
        "Block 40 declared as continue target for more than one header: 20, 50"
    );
}

#[test]
fn invalid_continue_target_is_rejected() {
    let error = register_merges_error(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 999),
        branch_cond(COND, 20, 99),
        label(99),
        ret(),
    ]);
    assert_eq!(error, "Structured header 20 declares invalid continue target 999");
}

#[test]
fn self_branch_without_self_continue_is_rejected() {
    let error = register_merges_error(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 30),
        branch_cond(COND, 20, 99),
        label(30),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(error, "Block 20 branches to itself but is not its own continue target");
}

#[test]
fn self_continue_without_self_branch_is_rejected() {
    let error = register_merges_error(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 20),
        branch_cond(COND, 30, 99),
        label(30),
        branch(20),
        label(99),
        ret(),
    ]);
    assert_eq!(
        error,
        "Loop header block 20 declares itself as its own continue target, but does not branch \
         to itself"
    );
}
