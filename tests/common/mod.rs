//! A minimal word-level SPIR-V assembler for tests.
//!
//! Tests build binary modules directly: each instruction is its opcode word
//! (word count in the high half) followed by its operand words, prefixed by
//! a standard header. Well-known result IDs for the shared type/constant
//! preamble are provided as constants.

#![allow(dead_code)]

use spv2wgsl::spv::spec::Op;

/// %void
pub const VOID: u32 = 1;
/// %voidfn = OpTypeFunction %void
pub const VOIDFN: u32 = 2;
/// %bool
pub const BOOL: u32 = 3;
/// %cond = OpConstantTrue %bool
pub const COND: u32 = 4;
/// %uint
pub const UINT: u32 = 5;
/// %selector = OpConstant %uint 42
pub const SELECTOR: u32 = 6;
/// %cond2 = OpConstantFalse %bool
pub const COND2: u32 = 7;
/// %cond3 = OpConstantNull %bool
pub const COND3: u32 = 8;
/// The function being tested.
pub const FN: u32 = 100;

/// Encodes one instruction.
pub fn inst(op: Op, operands: &[u32]) -> Vec<u32> {
    let mut words = vec![((operands.len() as u32 + 1) << 16) | (op as u32)];
    words.extend_from_slice(operands);
    words
}

/// Encodes a literal string operand (NUL-terminated, little-endian packed).
pub fn str_words(s: &str) -> Vec<u32> {
    let mut bytes: Vec<u8> = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// An instruction whose trailing operand is a literal string.
pub fn inst_str(op: Op, operands: &[u32], s: &str) -> Vec<u32> {
    let mut all = operands.to_vec();
    all.extend(str_words(s));
    inst(op, &all)
}

/// Assembles a module from instruction encodings.
pub fn assemble(instructions: &[Vec<u32>]) -> Vec<u32> {
    let mut words = vec![0x0723_0203, 0x0001_0000, 0, 1000, 0];
    for i in instructions {
        words.extend_from_slice(i);
    }
    words
}

/// The shared preamble: void/bool/uint types, a void function type, and
/// the condition/selector constants the CFG fixtures use.
pub fn common_types() -> Vec<Vec<u32>> {
    vec![
        inst(Op::TypeVoid, &[VOID]),
        inst(Op::TypeFunction, &[VOIDFN, VOID]),
        inst(Op::TypeBool, &[BOOL]),
        inst(Op::ConstantTrue, &[BOOL, COND]),
        inst(Op::TypeInt, &[UINT, 32, 0]),
        inst(Op::Constant, &[UINT, SELECTOR, 42]),
        inst(Op::ConstantFalse, &[BOOL, COND2]),
        inst(Op::ConstantNull, &[BOOL, COND3]),
    ]
}

/// Assembles the common preamble, a `void` function `%100` with the given
/// body instructions, and the function end.
pub fn assemble_function(body: &[Vec<u32>]) -> Vec<u32> {
    let mut instructions = common_types();
    instructions.push(inst(Op::Function, &[VOID, FN, 0, VOIDFN]));
    instructions.extend(body.iter().cloned());
    instructions.push(inst(Op::FunctionEnd, &[]));
    assemble(&instructions)
}
