//! Function-body emission: structured statements and instruction
//! translation.

mod common;

use common::*;
use spv2wgsl::parse_module;
use spv2wgsl::spv::spec::Op;

/// Extra well-known IDs for these fixtures.
const INT: u32 = 40;
const INT_30: u32 = 41;
const INT_40: u32 = 42;
const PTR_PRIV_UINT: u32 = 43;
const VAR_A: u32 = 44;
const F32T: u32 = 45;
const VEC2F: u32 = 46;
const F32_1: u32 = 47;
const F32_2: u32 = 48;
const VEC2_C: u32 = 49;
const UINT_1: u32 = 53;
const UINT_2: u32 = 54;
const UINT_0: u32 = 55;
const UINT_10: u32 = 56;
const PTR_PRIV_F32: u32 = 58;
const VAR_F: u32 = 59;
const PTR_PRIV_VEC2: u32 = 51;
const VAR_V: u32 = 52;

fn preamble() -> Vec<Vec<u32>> {
    let mut instructions = common_types();
    instructions.extend([
        inst(Op::TypeInt, &[INT, 32, 1]),
        inst(Op::Constant, &[INT, INT_30, 30]),
        inst(Op::Constant, &[INT, INT_40, 40]),
        inst(Op::TypePointer, &[PTR_PRIV_UINT, 6, UINT]),
        inst(Op::Variable, &[PTR_PRIV_UINT, VAR_A, 6]),
        inst(Op::TypeFloat, &[F32T, 32]),
        inst(Op::TypeVector, &[VEC2F, F32T, 2]),
        inst(Op::Constant, &[F32T, F32_1, 0x3F80_0000]), // 1.0
        inst(Op::Constant, &[F32T, F32_2, 0x4000_0000]), // 2.0
        inst(Op::ConstantComposite, &[VEC2F, VEC2_C, F32_1, F32_2]),
        inst(Op::Constant, &[UINT, UINT_1, 1]),
        inst(Op::Constant, &[UINT, UINT_2, 2]),
        inst(Op::Constant, &[UINT, UINT_0, 0]),
        inst(Op::Constant, &[UINT, UINT_10, 10]),
        inst(Op::TypePointer, &[PTR_PRIV_F32, 6, F32T]),
        inst(Op::Variable, &[PTR_PRIV_F32, VAR_F, 6]),
        inst(Op::TypePointer, &[PTR_PRIV_VEC2, 6, VEC2F]),
        inst(Op::Variable, &[PTR_PRIV_VEC2, VAR_V, 6]),
    ]);
    instructions
}

fn parse_body(body: &[Vec<u32>]) -> spv2wgsl::ast::Module {
    let mut instructions = preamble();
    instructions.push(inst(Op::Function, &[VOID, FN, 0, VOIDFN]));
    instructions.extend(body.iter().cloned());
    instructions.push(inst(Op::FunctionEnd, &[]));
    parse_module(&assemble(&instructions)).expect("parses")
}

fn parse_body_error(body: &[Vec<u32>]) -> String {
    let mut instructions = preamble();
    instructions.push(inst(Op::Function, &[VOID, FN, 0, VOIDFN]));
    instructions.extend(body.iter().cloned());
    instructions.push(inst(Op::FunctionEnd, &[]));
    parse_module(&assemble(&instructions)).unwrap_err().message().to_string()
}

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

fn store(ptr: u32, value: u32) -> Vec<u32> {
    inst(Op::Store, &[ptr, value])
}

fn ret() -> Vec<u32> {
    inst(Op::Return, &[])
}

#[test]
fn if_else_shape() {
    let module = parse_body(&[
        label(10),
        sel_merge(99),
        branch_cond(COND, 20, 30),
        label(20),
        store(VAR_A, UINT_1),
        branch(99),
        label(30),
        store(VAR_A, UINT_2),
        branch(99),
        label(99),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("if (true) {"), "{dump}");
    assert!(dump.contains("x_44 = 1u;"), "{dump}");
    assert!(dump.contains("} else {"), "{dump}");
    assert!(dump.contains("x_44 = 2u;"), "{dump}");
}

#[test]
fn single_armed_if() {
    let module = parse_body(&[
        label(10),
        sel_merge(99),
        branch_cond(COND, 20, 99),
        label(20),
        store(VAR_A, UINT_1),
        branch(99),
        label(99),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("if (true) {"), "{dump}");
    assert!(!dump.contains("} else {"), "{dump}");
}

#[test]
fn while_style_loop_breaks_from_header() {
    let module = parse_body(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 50),
        branch_cond(COND, 30, 99),
        label(30),
        store(VAR_A, UINT_1),
        branch(50),
        label(50),
        branch(20),
        label(99),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("loop {"), "{dump}");
    // The header's conditional becomes a break-unless at the top of the
    // loop body.
    assert!(dump.contains("} else {\n      break;"), "{dump}");
    assert!(dump.contains("x_44 = 1u;"), "{dump}");
    // The empty continue construct leaves no continuing clause.
    assert!(!dump.contains("continuing"), "{dump}");
}

#[test]
fn switch_emits_cases_in_block_order() {
    let module = parse_body(&[
        label(10),
        sel_merge(99),
        inst(Op::Switch, &[SELECTOR, 99, 20, 20, 30, 30]),
        label(99),
        ret(),
        label(30),
        store(VAR_A, UINT_1),
        branch(99),
        label(20),
        store(VAR_A, UINT_2),
        branch(99),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("switch (42u) {"), "{dump}");
    // Case 30 surfaces before case 20 ("naturally reversed"), the default
    // (which is the merge) comes out as an empty trailing clause.
    let pos_30 = dump.find("case 30u").expect("case 30 exists");
    let pos_20 = dump.find("case 20u").expect("case 20 exists");
    assert!(pos_30 < pos_20, "{dump}");
    assert!(dump.contains("default:"), "{dump}");
}

#[test]
fn switch_case_fallthrough_statement() {
    let module = parse_body(&[
        label(10),
        sel_merge(99),
        inst(Op::Switch, &[SELECTOR, 99, 20, 20, 30, 30]),
        label(99),
        ret(),
        label(20),
        store(VAR_A, UINT_1),
        branch(30), // fallthrough
        label(30),
        store(VAR_A, UINT_2),
        branch(99),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("fallthrough;"), "{dump}");
    let pos_20 = dump.find("case 20u").expect("case 20 exists");
    let pos_30 = dump.find("case 30u").expect("case 30 exists");
    assert!(pos_20 < pos_30, "fallthrough pins case 20 before case 30: {dump}");
}

#[test]
fn sdiv_with_unsigned_result_casts_the_result_not_the_operands() {
    let module = parse_body(&[
        label(10),
        inst(Op::SDiv, &[UINT, 60, INT_30, INT_40]),
        store(VAR_A, 60),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("x_44 = bitcast<u32>((30 / 40));"), "{dump}");
}

#[test]
fn vector_shuffle_maps_undefined_component_to_zero() {
    let module = parse_body(&[
        label(10),
        inst(Op::VectorShuffle, &[VEC2F, 60, VEC2_C, VEC2_C, 0, 0xFFFF_FFFF]),
        store(VAR_V, 60),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(
        dump.contains("vec2<f32>(vec2<f32>(1.0, 2.0).x, 0.0)"),
        "{dump}"
    );
}

#[test]
fn composite_extract_bounds_check() {
    let error = parse_body_error(&[
        label(10),
        inst(Op::CompositeExtract, &[F32T, 60, VEC2_C, 5]),
        store(VAR_F, 60),
        ret(),
    ]);
    assert_eq!(
        error,
        "OpCompositeExtract index value 5 is out of bounds for vector of 2 elements"
    );
}

#[test]
fn composite_extract_in_bounds() {
    let module = parse_body(&[
        label(10),
        inst(Op::CompositeExtract, &[F32T, 60, VEC2_C, 1]),
        store(VAR_F, 60),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("x_59 = vec2<f32>(1.0, 2.0).y;"), "{dump}");
}

#[test]
fn glsl_std_450_call_is_qualified_by_the_import_alias() {
    let mut instructions = vec![inst_str(Op::ExtInstImport, &[90], "GLSL.std.450")];
    instructions.extend(preamble());
    instructions.extend([
        inst(Op::Function, &[VOID, FN, 0, VOIDFN]),
        label(10),
        inst(Op::ExtInst, &[F32T, 60, 90, 31 /* Sqrt */, F32_1]),
        store(VAR_F, 60),
        ret(),
        inst(Op::FunctionEnd, &[]),
    ]);
    let module = parse_module(&assemble(&instructions)).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains("x_59 = std::glsl::sqrt(1.0);"), "{dump}");
}

#[test]
fn loop_with_phi_uses_a_state_variable() {
    let module = parse_body(&[
        label(10),
        branch(20),
        label(20),
        inst(Op::Phi, &[UINT, 70, UINT_0, 10, 71, 50]),
        inst(Op::ULessThan, &[BOOL, 72, 70, UINT_10]),
        loop_merge(99, 50),
        branch_cond(72, 30, 99),
        label(30),
        branch(50),
        label(50),
        inst(Op::IAdd, &[UINT, 71, 70, UINT_1]),
        branch(20),
        label(99),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    // State variable declared outside the loop, written by both the entry
    // block and the continuing clause, read into a let at the phi.
    assert!(dump.contains("var x_70_phi : u32;"), "{dump}");
    assert!(dump.contains("x_70_phi = 0u;"), "{dump}");
    assert!(dump.contains("let x_70 : u32 = x_70_phi;"), "{dump}");
    assert!(dump.contains("continuing {"), "{dump}");
    assert!(dump.contains("x_70_phi = (x_70 + 1u);"), "{dump}");
    assert!(dump.contains("(x_70 < 10u)"), "{dump}");
}

#[test]
fn value_escaping_its_construct_is_hoisted() {
    // The definition sits in an if-selection whose other path breaks out of
    // the loop, so the use after the if's merge is dominated but not
    // enclosed: the value becomes a hoisted var at the loop body's top.
    let module = parse_body(&[
        label(10),
        branch(20),
        label(20),
        loop_merge(99, 60),
        branch(25),
        label(25),
        sel_merge(49),
        branch_cond(COND, 30, 99),
        label(30),
        inst(Op::IAdd, &[UINT, 80, UINT_1, UINT_2]),
        branch(49),
        label(49),
        store(VAR_A, 80),
        branch(60),
        label(60),
        branch(20),
        label(99),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("var x_80 : u32;"), "{dump}");
    assert!(dump.contains("x_80 = (1u + 2u);"), "{dump}");
    assert!(dump.contains("x_44 = x_80;"), "{dump}");
    // The break-on-false arm of the selection.
    assert!(dump.contains("} else {\n      break;"), "{dump}");
}

#[test]
fn local_variable_store_through_access_chain() {
    let mut instructions = preamble();
    instructions.extend([
        inst(Op::TypePointer, &[61, 7, VEC2F]), // ptr<function, vec2<f32>>
        inst(Op::TypePointer, &[62, 7, F32T]),  // ptr<function, f32>
        inst(Op::Function, &[VOID, FN, 0, VOIDFN]),
        label(10),
        inst(Op::Variable, &[61, 60, 7]),
        inst(Op::AccessChain, &[62, 63, 60, UINT_1]),
        store(63, F32_2),
        ret(),
        inst(Op::FunctionEnd, &[]),
    ]);
    let module = parse_module(&assemble(&instructions)).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains("var x_60 : vec2<f32>;"), "{dump}");
    assert!(dump.contains("x_60[1u] = 2.0;"), "{dump}");
}

#[test]
fn load_becomes_a_named_definition() {
    let module = parse_body(&[
        label(10),
        inst(Op::Load, &[UINT, 60, VAR_A]),
        inst(Op::IAdd, &[UINT, 61, 60, UINT_1]),
        store(VAR_A, 61),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("let x_60 : u32 = x_44;"), "{dump}");
    assert!(dump.contains("x_44 = (x_60 + 1u);"), "{dump}");
}

#[test]
fn function_calls_resolve_callee_names() {
    // A callee defined textually after the caller still resolves, because
    // functions are emitted callee-first.
    let mut instructions = preamble();
    instructions.extend([
        inst_str(Op::Name, &[200], "helper"),
        inst(Op::Function, &[VOID, FN, 0, VOIDFN]),
        label(10),
        inst(Op::FunctionCall, &[VOID, 60, 200]),
        ret(),
        inst(Op::FunctionEnd, &[]),
        inst(Op::Function, &[VOID, 200, 0, VOIDFN]),
        label(11),
        store(VAR_A, UINT_1),
        ret(),
        inst(Op::FunctionEnd, &[]),
    ]);
    let module = parse_module(&assemble(&instructions)).expect("parses");
    // Callee first in the emitted module.
    assert_eq!(module.functions[0].name, "helper");
    let dump = module.to_wgsl_string();
    assert!(dump.contains("helper();"), "{dump}");
}

#[test]
fn kill_becomes_discard() {
    let module = parse_body(&[label(10), inst(Op::Kill, &[])]);
    assert!(module.to_wgsl_string().contains("discard;"));
}

#[test]
fn select_maps_to_the_builtin() {
    let module = parse_body(&[
        label(10),
        inst(Op::Select, &[UINT, 60, COND, UINT_1, UINT_2]),
        store(VAR_A, 60),
        ret(),
    ]);
    let dump = module.to_wgsl_string();
    assert!(dump.contains("x_44 = select(2u, 1u, true);"), "{dump}");
}

#[test]
fn unordered_comparison_negates_the_ordered_opposite() {
    let mut instructions = preamble();
    instructions.extend([
        inst(Op::TypePointer, &[61, 6, BOOL]),
        inst(Op::Variable, &[61, 62, 6]),
        inst(Op::Function, &[VOID, FN, 0, VOIDFN]),
        label(10),
        inst(Op::FUnordLessThan, &[BOOL, 60, F32_1, F32_2]),
        store(62, 60),
        ret(),
        inst(Op::FunctionEnd, &[]),
    ]);
    let module = parse_module(&assemble(&instructions)).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains("x_62 = !((1.0 >= 2.0));"), "{dump}");
}

#[test]
fn unsupported_instruction_fails_with_its_opcode() {
    let error = parse_body_error(&[
        label(10),
        inst(Op::BitReverse, &[UINT, 60, UINT_1]),
        store(VAR_A, 60),
        ret(),
    ]);
    assert!(error.contains("BitReverse is not supported"), "{error}");
}
