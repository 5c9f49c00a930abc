//! # `spv2wgsl`
//!
//! A front end that reads a binary SPIR-V shader module and reconstructs a
//! structured, statement-level AST suitable for re-emission as WGSL source.
//!
//! SPIR-V is an unstructured label-and-branch IR (basic blocks plus
//! `OpBranch`/`OpBranchConditional`/`OpSwitch`, with structure *declared*
//! via `OpSelectionMerge`/`OpLoopMerge`); the output AST only has structured
//! control flow (`if`, `loop`, `switch`, `break`, `continue`,
//! `fallthrough`). Recovering that structure from an arbitrary valid CFG is
//! the core of this crate.
//!
//! #### Notable types/modules
//!
//! * [`parse_module`]/[`parse_module_bytes`]: one-shot parsing entry points
//! * [`ast::Module`]: the output AST, exclusively owning all of its nodes
//! * [`parse::Parser`]: the staged module-level parser
//! * [`parse::FunctionEmitter`]: per-function control-flow reconstruction
//!   and instruction translation
//! * [`spv`]: the instruction-level SPIR-V representation the parser reads
//!
//! The parser is a pure, deterministic, single-threaded function of the
//! input words. Input is expected to have passed an external SPIR-V
//! validator first; structural problems are still detected and reported,
//! and any failure discards the whole module (there is no partial output).

// BEGIN - Embark standard lints v6 for Rust 1.55+
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::flat_map_option,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::from_iter_instead_of_collect,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_digit_groups,
    clippy::large_stack_arrays,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_same_arms,
    clippy::match_wild_err_arm,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::missing_enforced_import_renames,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::needless_for_each,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::rc_mutex,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::single_match_else,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v6 for Rust 1.55+
// crate-specific exceptions:
#![allow(
    // `match` is used when `if let` chains would be longer to read.
    clippy::single_match_else,
)]
#![forbid(unsafe_code)]

pub mod ast;
pub mod construct;
pub mod namer;
pub mod parse;
pub mod spv;
pub mod usage;

use std::fmt;

#[doc(hidden)]
pub(crate) type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[doc(hidden)]
pub(crate) type FxHashSet<V> = rustc_hash::FxHashSet<V>;
#[doc(hidden)]
pub(crate) type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
#[doc(hidden)]
#[allow(dead_code)]
pub(crate) type FxIndexSet<V> =
    indexmap::IndexSet<V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Marker for "this parse has failed"; the message lives in the parser's
/// [`Diagnostics`]. Being zero-sized keeps `?` propagation free while the
/// accumulated error string stays in one place.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Failure;

/// Crate-wide result type for parsing stages.
pub type Result<T> = std::result::Result<T, Failure>;

/// Accumulates diagnostic messages for one parse attempt.
///
/// Failure is sticky: once anything has failed, every later stage becomes a
/// no-op that immediately reports failure again, so the first diagnostic is
/// not buried under cascading follow-on errors.
#[derive(Default)]
pub struct Diagnostics {
    messages: Vec<String>,
    failed: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Has any failure been recorded?
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Records a failure with a message and returns the [`Failure`] marker
    /// for `?`/`return Err(...)` propagation.
    pub fn fail(&mut self, message: impl Into<String>) -> Failure {
        self.failed = true;
        self.messages.push(message.into());
        Failure
    }

    /// The accumulated error text (one line per message).
    pub fn error_string(&self) -> String {
        self.messages.join("\n")
    }
}

/// The error type of the one-shot entry points: the accumulated diagnostic
/// text of the failed parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a binary SPIR-V module (as words) into an AST module.
pub fn parse_module(words: &[u32]) -> std::result::Result<ast::Module, ParseError> {
    let mut parser = parse::Parser::new(words);
    match parser.parse() {
        Ok(()) => Ok(parser.take_module()),
        Err(Failure) => Err(ParseError { message: parser.error_string() }),
    }
}

/// Parses a binary SPIR-V module (as native-endian bytes) into an AST module.
pub fn parse_module_bytes(bytes: &[u8]) -> std::result::Result<ast::Module, ParseError> {
    let mut parser = parse::Parser::new_from_bytes(bytes);
    match parser.parse() {
        Ok(()) => Ok(parser.take_module()),
        Err(Failure) => Err(ParseError { message: parser.error_string() }),
    }
}
