//! Binary SPIR-V decoding into [`ModuleIr`](super::ModuleIr).
//!
//! Decoding is purely structural: headers, instruction framing, section
//! routing, and the function/basic-block shape. Anything malformed at this
//! level is an error; semantic validation is the caller's responsibility.

use super::spec::{self, Op};
use super::{BlockIr, Decoration, FunctionIr, ModuleIr, RawInst, Source};
use smallvec::SmallVec;

/// Decodes a module from its words.
pub fn parse_words(words: &[u32]) -> Result<ModuleIr, String> {
    if words.len() < spec::HEADER_LEN {
        return Err(format!("invalid SPIR-V: only {} words, shorter than a header", words.len()));
    }
    if words[0] != spec::MAGIC {
        return Err(format!("invalid SPIR-V magic number: {:#010x}", words[0]));
    }

    let mut module = ModuleIr { id_bound: words[3], ..Default::default() };

    // Function/block decoding state.
    let mut current_function: Option<FunctionIr> = None;
    let mut current_block: Option<BlockIr> = None;

    // OpLine scope state; instructions outside any scope are numbered by
    // their position in the module, counting from 1.
    let mut op_line: Option<Source> = None;
    let mut instruction_number = 0u32;

    let mut offset = spec::HEADER_LEN;
    while offset < words.len() {
        let first = words[offset];
        let word_count = (first >> 16) as usize;
        let opcode = (first & 0xFFFF) as u16;
        if word_count == 0 {
            return Err(format!("invalid SPIR-V: zero word count at word {offset}"));
        }
        if offset + word_count > words.len() {
            return Err(format!(
                "invalid SPIR-V: instruction at word {offset} runs past the end of the module"
            ));
        }
        let inst_words = &words[offset + 1..offset + word_count];
        offset += word_count;
        instruction_number += 1;

        let op = Op::from_u16(opcode)
            .ok_or_else(|| format!("unsupported SPIR-V opcode {opcode}"))?;

        // Debug line scope tracking happens before anything else, matching
        // how line info applies to subsequent instructions.
        match op {
            Op::Line => {
                if inst_words.len() >= 3 {
                    op_line = Some(Source { line: inst_words[1], col: inst_words[2] });
                }
                continue;
            }
            Op::NoLine => {
                op_line = None;
                continue;
            }
            _ => {}
        }

        let (has_type, has_result) = op.result_shape();
        let mut operand_words = inst_words;
        let mut result_type_id = 0;
        let mut result_id = 0;
        if has_type {
            if operand_words.is_empty() {
                return Err(format!("invalid SPIR-V: {op:?} is missing its result type"));
            }
            result_type_id = operand_words[0];
            operand_words = &operand_words[1..];
        }
        if has_result {
            if operand_words.is_empty() {
                return Err(format!("invalid SPIR-V: {op:?} is missing its result ID"));
            }
            result_id = operand_words[0];
            operand_words = &operand_words[1..];
        }

        let index = module.insts.len();
        module.insts.push(RawInst {
            op,
            result_type_id,
            result_id,
            operands: SmallVec::from_slice(operand_words),
        });
        module.inst_source.push(
            op_line.unwrap_or(Source { line: instruction_number, col: 0 }),
        );

        if result_id != 0 {
            if result_id >= module.id_bound {
                return Err(format!("result ID {result_id} exceeds the module ID bound"));
            }
            if !module.record_def(result_id, index) {
                return Err(format!("result ID {result_id} is defined more than once"));
            }
        }

        route_instruction(&mut module, index, &mut current_function, &mut current_block)?;
    }

    if current_function.is_some() {
        return Err("invalid SPIR-V: module ends inside a function".into());
    }
    Ok(module)
}

/// Decodes a module from raw bytes (native-endian words).
pub fn parse_bytes(bytes: &[u8]) -> Result<ModuleIr, String> {
    let words: &[u32] = bytemuck::try_cast_slice(bytes)
        .map_err(|_| "invalid SPIR-V: byte length is not a multiple of 4".to_string())?;
    parse_words(words)
}

fn route_instruction(
    module: &mut ModuleIr,
    index: usize,
    current_function: &mut Option<FunctionIr>,
    current_block: &mut Option<BlockIr>,
) -> Result<(), String> {
    let inst = module.insts[index].clone();
    match inst.op {
        Op::ExtInstImport => module.ext_inst_imports.push(index),
        Op::EntryPoint => module.entry_points.push(index),
        Op::ExecutionMode => module.execution_modes.push(index),
        Op::Name | Op::MemberName => module.debug_names.push(index),

        Op::Decorate => {
            if inst.operands.len() < 2 {
                return Err("invalid SPIR-V: OpDecorate is missing its decoration".into());
            }
            let target = inst.operand(0);
            let deco: Decoration = SmallVec::from_slice(&inst.operands[1..]);
            module.decorations.entry(target).or_default().push(deco);
        }
        Op::MemberDecorate => {
            if inst.operands.len() < 3 {
                return Err("invalid SPIR-V: OpMemberDecorate is missing its decoration".into());
            }
            let target = inst.operand(0);
            let member = inst.operand(1);
            let deco: Decoration = SmallVec::from_slice(&inst.operands[2..]);
            module.member_decorations.entry((target, member)).or_default().push(deco);
        }
        Op::DecorationGroup | Op::GroupDecorate | Op::GroupMemberDecorate => {
            return Err("decoration groups are not supported".into());
        }

        Op::TypeVoid
        | Op::TypeBool
        | Op::TypeInt
        | Op::TypeFloat
        | Op::TypeVector
        | Op::TypeMatrix
        | Op::TypeImage
        | Op::TypeSampler
        | Op::TypeSampledImage
        | Op::TypeArray
        | Op::TypeRuntimeArray
        | Op::TypeStruct
        | Op::TypePointer
        | Op::TypeFunction
        | Op::ConstantTrue
        | Op::ConstantFalse
        | Op::Constant
        | Op::ConstantComposite
        | Op::ConstantNull
        | Op::SpecConstantTrue
        | Op::SpecConstantFalse
        | Op::SpecConstant
        | Op::SpecConstantComposite
        | Op::SpecConstantOp
        | Op::Undef
            if current_function.is_none() =>
        {
            module.types_consts_globals.push(index);
        }
        Op::Variable if current_function.is_none() => {
            module.types_consts_globals.push(index);
        }

        Op::Function => {
            if current_function.is_some() {
                return Err("invalid SPIR-V: nested OpFunction".into());
            }
            *current_function = Some(FunctionIr {
                def: index,
                result_id: inst.result_id,
                return_type_id: inst.result_type_id,
                function_type_id: if inst.operands.len() >= 2 { inst.operand(1) } else { 0 },
                params: vec![],
                blocks: vec![],
            });
        }
        Op::FunctionParameter => match current_function {
            Some(f) if f.blocks.is_empty() && current_block.is_none() => f.params.push(index),
            _ => return Err("invalid SPIR-V: misplaced OpFunctionParameter".into()),
        },
        Op::Label => {
            if current_function.is_none() || current_block.is_some() {
                return Err("invalid SPIR-V: misplaced OpLabel".into());
            }
            *current_block = Some(BlockIr {
                label_id: inst.result_id,
                body: vec![],
                merge: None,
                terminator: index,
            });
        }
        Op::SelectionMerge | Op::LoopMerge => match current_block {
            Some(block) => block.merge = Some(index),
            None => return Err("invalid SPIR-V: merge instruction outside a block".into()),
        },
        Op::Branch
        | Op::BranchConditional
        | Op::Switch
        | Op::Kill
        | Op::Return
        | Op::ReturnValue
        | Op::Unreachable => {
            let function =
                current_function.as_mut().ok_or("invalid SPIR-V: terminator outside a function")?;
            let mut block =
                current_block.take().ok_or("invalid SPIR-V: terminator outside a block")?;
            block.terminator = index;
            function.blocks.push(block);
        }
        Op::FunctionEnd => {
            if current_block.is_some() {
                return Err("invalid SPIR-V: OpFunctionEnd inside a basic block".into());
            }
            let function =
                current_function.take().ok_or("invalid SPIR-V: stray OpFunctionEnd")?;
            module.functions.push(function);
        }

        // Anything else inside a block is a body instruction; anything else
        // at module scope (OpSource, capabilities, the memory model, ...) is
        // kept in the arena but needs no routing.
        _ => {
            if let Some(block) = current_block {
                block.body.push(index);
            }
        }
    }
    Ok(())
}
