//! SPIR-V instruction-level representation consumed by the reader.
//!
//! This is the "internal module" the parser builds before any AST emission:
//! a flat instruction arena plus the lookup tables the rest of the crate
//! queries (definitions by result ID, decorations, names, entry points,
//! per-function basic-block structure).
//!
//! The reader assumes its input already passed an external SPIR-V validator
//! (see the crate docs): structural problems in the binary encoding are
//! still detected and reported here, but *semantic* validity (arity of
//! known instructions, type rules, dominance) is taken as a precondition,
//! and fixed-arity operand access indexes directly on that basis.

pub mod read;
pub mod spec;

use crate::{FxHashMap, FxIndexMap};
use smallvec::SmallVec;
use spec::Op;

/// An encoded decoration: the decoration number followed by its literal
/// operands, e.g. `[ARRAY_STRIDE, 16]`.
pub type Decoration = SmallVec<[u32; 2]>;

/// A single decoded SPIR-V instruction.
///
/// `operands` holds the *in*-operands only: the result type and result ID
/// words (when the opcode has them) are split out during decoding.
#[derive(Clone, Debug)]
pub struct RawInst {
    pub op: Op,
    /// Result type ID, or 0 when the opcode has none.
    pub result_type_id: u32,
    /// Result ID, or 0 when the opcode has none.
    pub result_id: u32,
    pub operands: SmallVec<[u32; 4]>,
}

impl RawInst {
    /// The `i`th in-operand word.
    pub fn operand(&self, i: usize) -> u32 {
        self.operands[i]
    }

    /// Decodes a literal string starting at in-operand `start`.
    pub fn string_operand(&self, start: usize) -> Option<String> {
        decode_literal_string(self.operands.get(start..)?)
    }
}

/// Decodes a SPIR-V literal string: UTF-8 bytes packed little-endian into
/// words, terminated by a NUL byte.
pub fn decode_literal_string(words: &[u32]) -> Option<String> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for &word in words {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                return String::from_utf8(bytes).ok();
            }
            bytes.push(byte);
        }
    }
    // Missing NUL terminator.
    None
}

/// How many words a literal string occupies (including the NUL terminator
/// and padding), so that trailing operands can be located.
pub fn literal_string_word_count(words: &[u32]) -> usize {
    for (i, &word) in words.iter().enumerate() {
        if word.to_le_bytes().contains(&0) {
            return i + 1;
        }
    }
    words.len()
}

/// A basic block of a function body.
#[derive(Clone, Debug)]
pub struct BlockIr {
    /// The result ID of the `OpLabel` starting this block.
    pub label_id: u32,
    /// Indices (into the instruction arena) of the block's body instructions,
    /// excluding the label, the merge instruction, and the terminator.
    pub body: Vec<usize>,
    /// Index of the `OpSelectionMerge`/`OpLoopMerge`, if the block has one.
    pub merge: Option<usize>,
    /// Index of the block terminator.
    pub terminator: usize,
}

/// A function definition: its `OpFunction`, parameters, and basic blocks in
/// the order they appear in the binary.
#[derive(Clone, Debug)]
pub struct FunctionIr {
    /// Index of the `OpFunction` instruction.
    pub def: usize,
    pub result_id: u32,
    /// The return type ID (the result type of `OpFunction`).
    pub return_type_id: u32,
    /// The `OpTypeFunction` ID.
    pub function_type_id: u32,
    /// Indices of the `OpFunctionParameter` instructions, in order.
    pub params: Vec<usize>,
    pub blocks: Vec<BlockIr>,
}

impl FunctionIr {
    /// The entry basic block (the first block in the binary).
    pub fn entry_block(&self) -> &BlockIr {
        &self.blocks[0]
    }
}

/// Source location bookkeeping for diagnostics: either carried over from an
/// `OpLine`, or the 1-based instruction index within the module.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Source {
    pub line: u32,
    pub col: u32,
}

/// The decoded module: instruction arena plus lookup tables.
#[derive(Debug, Default)]
pub struct ModuleIr {
    pub insts: Vec<RawInst>,
    pub id_bound: u32,

    /// Per-instruction source locations (parallel to `insts`), from `OpLine`
    /// scopes where present, instruction counting otherwise.
    pub inst_source: Vec<Source>,

    /// Result ID -> index of the defining instruction.
    def_index: FxHashMap<u32, usize>,

    /// Indices of `OpExtInstImport` instructions.
    pub ext_inst_imports: Vec<usize>,
    /// Indices of `OpEntryPoint` instructions.
    pub entry_points: Vec<usize>,
    /// Indices of `OpExecutionMode` instructions.
    pub execution_modes: Vec<usize>,
    /// Indices of `OpName`/`OpMemberName` instructions, in module order.
    pub debug_names: Vec<usize>,
    /// Indices of type, constant, and module-scope variable instructions,
    /// in module order.
    pub types_consts_globals: Vec<usize>,

    /// Decorations per target ID, in module order.
    pub decorations: FxIndexMap<u32, Vec<Decoration>>,
    /// Member decorations per (struct ID, member index), in module order.
    pub member_decorations: FxIndexMap<(u32, u32), Vec<Decoration>>,

    pub functions: Vec<FunctionIr>,
}

impl ModuleIr {
    /// Looks up the defining instruction for a result ID.
    pub fn def(&self, id: u32) -> Option<&RawInst> {
        self.def_index.get(&id).map(|&i| &self.insts[i])
    }

    /// Looks up the arena index of the defining instruction for a result ID.
    pub fn def_index(&self, id: u32) -> Option<usize> {
        self.def_index.get(&id).copied()
    }

    pub(crate) fn record_def(&mut self, id: u32, index: usize) -> bool {
        self.def_index.insert(id, index).is_none()
    }

    /// The source location for an instruction arena index.
    pub fn source_for(&self, inst_index: usize) -> Source {
        self.inst_source.get(inst_index).copied().unwrap_or_default()
    }

    /// The result type ID of the instruction defining `id`, or 0.
    pub fn type_id_of(&self, id: u32) -> u32 {
        self.def(id).map_or(0, |inst| inst.result_type_id)
    }

    /// Decorations attached to `id` (empty if none).
    pub fn decorations_for(&self, id: u32) -> &[Decoration] {
        self.decorations.get(&id).map_or(&[], |v| v.as_slice())
    }

    /// Decorations attached to member `member_index` of struct `id`.
    pub fn decorations_for_member(&self, id: u32, member_index: u32) -> &[Decoration] {
        self.member_decorations.get(&(id, member_index)).map_or(&[], |v| v.as_slice())
    }

    /// Returns the single literal operand of a decoration on `id`, if that
    /// decoration is present (e.g. `ArrayStride`, `Location`).
    pub fn decoration_value(&self, id: u32, decoration: u32) -> Option<u32> {
        self.decorations_for(id)
            .iter()
            .find(|d| d.first() == Some(&decoration))
            .and_then(|d| d.get(1))
            .copied()
    }

    /// Is the unit decoration (no operands) present on `id`?
    pub fn has_decoration(&self, id: u32, decoration: u32) -> bool {
        self.decorations_for(id).iter().any(|d| d.first() == Some(&decoration))
    }

    /// Evaluates an integer constant (`OpConstant` of 32-bit int type) as its
    /// raw word. Returns `None` for anything else.
    pub fn constant_word(&self, id: u32) -> Option<u32> {
        let inst = self.def(id)?;
        match inst.op {
            Op::Constant | Op::SpecConstant => Some(inst.operand(0)),
            _ => None,
        }
    }

    /// Evaluates a boolean constant. `OpConstantNull` of bool type is `false`.
    pub fn constant_bool(&self, id: u32) -> Option<bool> {
        let inst = self.def(id)?;
        match inst.op {
            Op::ConstantTrue | Op::SpecConstantTrue => Some(true),
            Op::ConstantFalse | Op::SpecConstantFalse | Op::ConstantNull => Some(false),
            _ => None,
        }
    }

    /// The function (by index) defining `id`, if `id` is an `OpFunction`.
    pub fn function_by_id(&self, id: u32) -> Option<&FunctionIr> {
        self.functions.iter().find(|f| f.result_id == id)
    }

    /// Function indices ordered so that callees precede their callers.
    ///
    /// Mutual/self recursion is rejected by SPIR-V validity, so the call
    /// graph is a DAG and the post-order below is well-defined.
    pub fn topologically_ordered_functions(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.functions.len());
        let mut visited = vec![false; self.functions.len()];
        // Map function result ID -> index, for call edges.
        let id_to_index: FxHashMap<u32, usize> =
            self.functions.iter().enumerate().map(|(i, f)| (f.result_id, i)).collect();

        fn visit(
            module: &ModuleIr,
            id_to_index: &FxHashMap<u32, usize>,
            visited: &mut [bool],
            order: &mut Vec<usize>,
            index: usize,
        ) {
            if visited[index] {
                return;
            }
            visited[index] = true;
            for block in &module.functions[index].blocks {
                for &inst_index in &block.body {
                    let inst = &module.insts[inst_index];
                    if inst.op == Op::FunctionCall {
                        if let Some(&callee) = id_to_index.get(&inst.operand(0)) {
                            visit(module, id_to_index, visited, order, callee);
                        }
                    }
                }
            }
            order.push(index);
        }

        for index in 0..self.functions.len() {
            visit(self, &id_to_index, &mut visited, &mut order, index);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_string_decoding() {
        // "GLSL.std.450" packed little-endian, NUL-terminated.
        let words = [0x4c53_4c47u32, 0x6474_732e, 0x3035_342e, 0x0000_0000];
        assert_eq!(decode_literal_string(&words).as_deref(), Some("GLSL.std.450"));
        assert_eq!(literal_string_word_count(&words), 4);
    }

    #[test]
    fn literal_string_requires_terminator() {
        assert_eq!(decode_literal_string(&[0x6161_6161]), None);
    }

    #[test]
    fn empty_literal_string() {
        assert_eq!(decode_literal_string(&[0]).as_deref(), Some(""));
    }
}
