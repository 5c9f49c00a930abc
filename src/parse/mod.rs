//! Module-level parsing: orchestration, types, constants, globals, handles.
//!
//! [`Parser`] drives one parse as a sequence of stages, each gated on the
//! success of the previous one (failure is sticky; see
//! [`Diagnostics`](crate::Diagnostics)):
//!
//! 1. build the internal SPIR-V representation ([`spv::ModuleIr`]),
//! 2. register extended-instruction imports (only `GLSL.std.450`, once),
//! 3. register user names and struct member names,
//! 4. register entry points, handle usage, and types,
//! 5. emit scalar spec constants and module-scope variables,
//! 6. emit entry points,
//! 7. emit function bodies, callees before callers.

pub mod func;
pub(crate) mod order;

pub use func::FunctionEmitter;

use crate::ast;
use crate::namer::Namer;
use crate::spv::spec::{self, decoration, Dim, ExecutionModel, ImageFormat, Op, StorageClass};
use crate::spv::{self, RawInst};
use crate::usage::Usage;
use crate::{Diagnostics, Failure, FxHashMap, FxHashSet, Result};
use std::rc::Rc;

/// An AST expression together with its AST type.
#[derive(Clone, Debug)]
pub struct TypedExpr {
    pub ty: ast::Type,
    pub expr: ast::Expression,
}

/// One registered entry point, before AST emission.
#[derive(Clone, Debug)]
struct EntryPointInfo {
    stage: ast::PipelineStage,
    name: String,
    function_id: u32,
}

/// Parser for one SPIR-V module.
pub struct Parser {
    input: std::result::Result<Vec<u32>, String>,
    diags: Diagnostics,

    module_ir: Option<Rc<spv::ModuleIr>>,
    ast_module: ast::Module,
    pub(crate) namer: Namer,

    /// SPIR-V IDs importing "GLSL.std.450".
    glsl_std_450_imports: FxHashSet<u32>,
    /// SPIR-V IDs importing ignorable (NonSemantic) instruction sets.
    ignored_imports: FxHashSet<u32>,

    entry_points: Vec<EntryPointInfo>,
    /// Function ID -> workgroup size from `OpExecutionMode LocalSize`.
    workgroup_sizes: FxHashMap<u32, [u32; 3]>,

    /// Memoized type conversion, SPIR-V type ID -> AST type.
    id_to_type: FxHashMap<u32, ast::Type>,
    /// Struct member AST types by declared struct name (for zero values).
    struct_members_by_name: FxHashMap<String, Vec<ast::Type>>,
    /// Type IDs "enclosing" an old-style `BufferBlock` buffer: the struct
    /// itself, arrays of it, and pointers to those. Such types live in the
    /// Storage class even when SPIR-V says Uniform.
    remap_buffer_block_type: FxHashSet<u32>,

    /// Usage per sampler/image memory object declaration ID.
    handle_usage: FxHashMap<u32, Usage>,
    /// Memoized handle tracing (image side / sampler side).
    mem_obj_decl_image: FxHashMap<u32, Option<u32>>,
    mem_obj_decl_sampler: FxHashMap<u32, Option<u32>>,
    /// Memoized concrete handle store type per declaration ID.
    handle_type: FxHashMap<u32, ast::Type>,

    /// Scalar spec constants already surfaced as module-scope constants.
    spec_constant_names: FxHashMap<u32, String>,

    /// Function indices in callee-before-caller order.
    topo_function_order: Vec<usize>,
}

impl Parser {
    pub fn new(words: &[u32]) -> Self {
        Self::with_input(Ok(words.to_vec()))
    }

    pub fn new_from_bytes(bytes: &[u8]) -> Self {
        let input = bytemuck::try_cast_slice::<u8, u32>(bytes)
            .map(<[u32]>::to_vec)
            .map_err(|_| "invalid SPIR-V: byte length is not a multiple of 4".to_string());
        Self::with_input(input)
    }

    fn with_input(input: std::result::Result<Vec<u32>, String>) -> Self {
        Self {
            input,
            diags: Diagnostics::new(),
            module_ir: None,
            ast_module: ast::Module::default(),
            namer: Namer::new(),
            glsl_std_450_imports: FxHashSet::default(),
            ignored_imports: FxHashSet::default(),
            entry_points: vec![],
            workgroup_sizes: FxHashMap::default(),
            id_to_type: FxHashMap::default(),
            struct_members_by_name: FxHashMap::default(),
            remap_buffer_block_type: FxHashSet::default(),
            handle_usage: FxHashMap::default(),
            mem_obj_decl_image: FxHashMap::default(),
            mem_obj_decl_sampler: FxHashMap::default(),
            handle_type: FxHashMap::default(),
            spec_constant_names: FxHashMap::default(),
            topo_function_order: vec![],
        }
    }

    /// Runs the whole parse.
    pub fn parse(&mut self) -> Result<()> {
        self.build_internal_module()?;
        self.parse_internal_module()
    }

    /// Moves the finished AST module out of the parser.
    pub fn take_module(&mut self) -> ast::Module {
        std::mem::take(&mut self.ast_module)
    }

    /// Read-only view of the module built so far (for tests).
    pub fn module(&self) -> &ast::Module {
        &self.ast_module
    }

    pub(crate) fn ast_module_mut(&mut self) -> &mut ast::Module {
        &mut self.ast_module
    }

    pub fn success(&self) -> bool {
        !self.diags.failed()
    }

    pub fn error_string(&self) -> String {
        self.diags.error_string()
    }

    /// Records a failure and returns the propagation marker.
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> Failure {
        self.diags.fail(message)
    }

    fn check_ok(&self) -> Result<()> {
        if self.diags.failed() { Err(Failure) } else { Ok(()) }
    }

    /// The internal SPIR-V representation. Only valid between
    /// [`Self::build_internal_module`] and [`Self::reset_internal_module`].
    pub fn module_ir(&self) -> Rc<spv::ModuleIr> {
        self.module_ir.clone().expect("internal module has not been built")
    }

    /// Decodes the binary into [`spv::ModuleIr`] and computes the
    /// callee-before-caller function order.
    pub fn build_internal_module(&mut self) -> Result<()> {
        self.check_ok()?;
        let words = match &self.input {
            Ok(words) => words,
            Err(message) => {
                let message = message.clone();
                return Err(self.fail(message));
            }
        };
        match spv::read::parse_words(words) {
            Ok(module) => {
                self.topo_function_order = module.topologically_ordered_functions();
                self.module_ir = Some(Rc::new(module));
                Ok(())
            }
            Err(message) => Err(self.fail(message)),
        }
    }

    /// Tears down the internal representation (the AST module survives).
    pub fn reset_internal_module(&mut self) {
        self.module_ir = None;
        self.glsl_std_450_imports.clear();
        self.ignored_imports.clear();
    }

    pub fn parse_internal_module(&mut self) -> Result<()> {
        self.parse_internal_module_except_functions()?;
        self.emit_functions()?;
        self.check_ok()
    }

    /// All module-level stages, in order, without function bodies.
    pub fn parse_internal_module_except_functions(&mut self) -> Result<()> {
        self.check_ok()?;
        self.register_extended_instruction_imports()?;
        self.register_user_and_struct_member_names()?;
        self.register_entry_points()?;
        self.register_handle_usage()?;
        self.register_types()?;
        self.emit_scalar_spec_constants()?;
        self.emit_module_scope_variables()?;
        self.emit_entry_points()?;
        self.check_ok()
    }

    /// Registers `OpExtInstImport`s. Only `"GLSL.std.450"` is recognized
    /// (deduplicated to a single AST import no matter how many SPIR-V IDs
    /// name it); `NonSemantic.*` sets are ignored; anything else fails.
    pub fn register_extended_instruction_imports(&mut self) -> Result<()> {
        self.check_ok()?;
        let module = self.module_ir();
        for &index in &module.ext_inst_imports {
            let inst = &module.insts[index];
            let name = match inst.string_operand(0) {
                Some(name) => name,
                None => return Err(self.fail("OpExtInstImport has a malformed set name")),
            };
            if name == "GLSL.std.450" {
                if self.glsl_std_450_imports.is_empty() {
                    self.ast_module
                        .imports
                        .push(ast::Import { path: name, alias: "std::glsl".to_string() });
                }
                self.glsl_std_450_imports.insert(inst.result_id);
            } else if name.starts_with("NonSemantic.") {
                self.ignored_imports.insert(inst.result_id);
            } else {
                return Err(self.fail(format!("unrecognized extended instruction set: {name}")));
            }
        }
        Ok(())
    }

    pub(crate) fn is_glsl_extended_instruction(&self, inst: &RawInst) -> bool {
        inst.op == Op::ExtInst && self.glsl_std_450_imports.contains(&inst.operand(0))
    }

    pub(crate) fn is_ignored_extended_instruction(&self, inst: &RawInst) -> bool {
        inst.op == Op::ExtInst && self.ignored_imports.contains(&inst.operand(0))
    }

    /// Registers names: entry point names first (they are the API contact
    /// point, with the highest priority for preservation), then `OpName`
    /// and `OpMemberName`, then synthesized struct member names.
    pub fn register_user_and_struct_member_names(&mut self) -> Result<()> {
        self.check_ok()?;
        let module = self.module_ir();

        for &index in &module.entry_points {
            let inst = &module.insts[index];
            let function_id = inst.operand(1);
            let name = match inst.string_operand(2) {
                Some(name) if !name.is_empty() => name,
                _ => return Err(self.fail("OpEntryPoint has a malformed name")),
            };
            // One function can implement several entry points; the first one
            // names the function, later ones only reserve their own name so
            // no derived identifier can accidentally take it.
            self.namer.suggest_sanitized_name(function_id, &name);
            let sanitized = Namer::sanitize(&name);
            if !self.namer.is_registered(&sanitized) {
                self.namer.register_without_id(&sanitized);
            }
        }

        for &index in &module.debug_names {
            let inst = &module.insts[index];
            match inst.op {
                Op::Name => {
                    if let Some(name) = inst.string_operand(1) {
                        if !name.is_empty() {
                            self.namer.suggest_sanitized_name(inst.operand(0), &name);
                        }
                    }
                }
                Op::MemberName => {
                    if let Some(name) = inst.string_operand(2) {
                        if !name.is_empty() {
                            self.namer.suggest_sanitized_member_name(
                                inst.operand(0),
                                inst.operand(1),
                                &name,
                            );
                        }
                    }
                }
                _ => {}
            }
        }

        for &index in &module.types_consts_globals {
            let inst = &module.insts[index];
            if inst.op == Op::TypeStruct {
                self.namer
                    .resolve_member_names_for_struct(inst.result_id, inst.operands.len() as u32);
            }
        }
        Ok(())
    }

    /// Collects `(stage, name, function)` triples and workgroup sizes.
    pub fn register_entry_points(&mut self) -> Result<()> {
        self.check_ok()?;
        let module = self.module_ir();
        for &index in &module.entry_points {
            let inst = &module.insts[index];
            let stage = match ExecutionModel::from_u32(inst.operand(0)) {
                Some(ExecutionModel::Vertex) => ast::PipelineStage::Vertex,
                Some(ExecutionModel::Fragment) => ast::PipelineStage::Fragment,
                Some(ExecutionModel::GLCompute) => ast::PipelineStage::Compute,
                None => {
                    return Err(self.fail(format!(
                        "unsupported execution model for entry point: {}",
                        inst.operand(0)
                    )));
                }
            };
            let function_id = inst.operand(1);
            let name = inst.string_operand(2).unwrap_or_default();
            self.entry_points.push(EntryPointInfo { stage, name, function_id });
        }
        for &index in &module.execution_modes {
            let inst = &module.insts[index];
            // OpExecutionMode %fn LocalSize x y z
            if inst.operand(1) == 17 && inst.operands.len() >= 5 {
                self.workgroup_sizes.insert(
                    inst.operand(0),
                    [inst.operand(2), inst.operand(3), inst.operand(4)],
                );
            }
        }
        Ok(())
    }

    /// Emits the `EntryPoint` AST nodes. A second entry point reusing an
    /// already-taken name (same name, different stage) gets a derived name,
    /// like any other identifier collision.
    pub fn emit_entry_points(&mut self) -> Result<()> {
        self.check_ok()?;
        let infos = self.entry_points.clone();
        let mut emitted_names = FxHashSet::default();
        for info in infos {
            let function_name = self.namer.name(info.function_id);
            let sanitized = Namer::sanitize(&info.name);
            let ep_name = if emitted_names.contains(&sanitized) {
                self.namer.make_derived_name(&sanitized)
            } else {
                sanitized
            };
            emitted_names.insert(ep_name.clone());
            self.ast_module.entry_points.push(ast::EntryPoint {
                stage: info.stage,
                name: ep_name,
                function: function_name,
                workgroup_size: self.workgroup_sizes.get(&info.function_id).copied(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Types and decorations
    // ------------------------------------------------------------------

    /// Converts every type in the module (so aliases come out in declaration
    /// order). `OpTypeFunction` has no AST counterpart and is skipped.
    pub fn register_types(&mut self) -> Result<()> {
        self.check_ok()?;
        self.register_buffer_block_remap();
        let module = self.module_ir();
        for &index in &module.types_consts_globals {
            let inst = &module.insts[index];
            match inst.op {
                Op::TypeFunction => {}
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
                | Op::TypePointer => {
                    self.convert_type(inst.result_id)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Seeds [`Self::remap_buffer_block_type`]: `BufferBlock` structs, plus
    /// arrays of and pointers to them. SPIR-V orders type declarations
    /// dependency-first, so one forward pass suffices.
    fn register_buffer_block_remap(&mut self) {
        let module = self.module_ir();
        for &index in &module.types_consts_globals {
            let inst = &module.insts[index];
            let enclosed = match inst.op {
                Op::TypeStruct => {
                    module.has_decoration(inst.result_id, decoration::BUFFER_BLOCK)
                }
                Op::TypeArray | Op::TypeRuntimeArray => {
                    self.remap_buffer_block_type.contains(&inst.operand(0))
                }
                Op::TypePointer => self.remap_buffer_block_type.contains(&inst.operand(1)),
                _ => false,
            };
            if enclosed {
                self.remap_buffer_block_type.insert(inst.result_id);
            }
        }
    }

    /// A short description of a type for diagnostics.
    pub(crate) fn show_type(&self, type_id: u32) -> String {
        match self.module_ir().def(type_id) {
            Some(inst) => format!("%{type_id} = {:?}", inst.op),
            None => format!("SPIR-V type {type_id}"),
        }
    }

    /// Converts a SPIR-V type to an AST type, memoized per type ID.
    ///
    /// Stride-decorated (runtime) arrays and structs come out as named
    /// types: stride is not purely structural in WGSL, and struct identity
    /// is by declared name, never deduplicated by layout.
    pub fn convert_type(&mut self, type_id: u32) -> Result<ast::Type> {
        self.check_ok()?;
        if let Some(ty) = self.id_to_type.get(&type_id) {
            return Ok(ty.clone());
        }
        let module = self.module_ir();
        let inst = match module.def(type_id) {
            Some(inst) => inst.clone(),
            None => return Err(self.fail(format!("ID is not a SPIR-V type: {type_id}"))),
        };
        let ty = match inst.op {
            Op::TypeVoid => ast::Type::Void,
            Op::TypeBool => ast::Type::Bool,
            Op::TypeInt => {
                let width = inst.operand(0);
                if width != 32 {
                    return Err(self.fail(format!("unhandled integer width: {width}")));
                }
                if inst.operand(1) == 1 { ast::Type::I32 } else { ast::Type::U32 }
            }
            Op::TypeFloat => {
                let width = inst.operand(0);
                if width != 32 {
                    return Err(self.fail(format!("unhandled float width: {width}")));
                }
                ast::Type::F32
            }
            Op::TypeVector => {
                let elem = self.convert_type(inst.operand(0))?;
                ast::Type::vector(elem, inst.operand(1))
            }
            Op::TypeMatrix => {
                // The column type is a vector; its element must be f32.
                let column = self.convert_type(inst.operand(0))?;
                match column {
                    ast::Type::Vector { size, elem } if *elem == ast::Type::F32 => {
                        ast::Type::Matrix { columns: inst.operand(1), rows: size }
                    }
                    _ => {
                        return Err(self.fail(format!(
                            "matrix columns must be vectors of f32: {}",
                            self.show_type(type_id)
                        )));
                    }
                }
            }
            Op::TypeArray => {
                let elem = self.convert_type(inst.operand(0))?;
                let length_id = inst.operand(1);
                let size = match module.constant_word(length_id) {
                    Some(n) if n > 0 => n,
                    _ => {
                        return Err(self.fail(format!(
                            "array size is not a positive constant: {}",
                            self.show_type(type_id)
                        )));
                    }
                };
                let stride = module.decoration_value(type_id, decoration::ARRAY_STRIDE);
                let ty = ast::Type::Array { elem: Box::new(elem), size, stride };
                if stride.is_some() {
                    self.generate_alias(type_id, ty)
                } else {
                    ty
                }
            }
            Op::TypeRuntimeArray => {
                let elem = self.convert_type(inst.operand(0))?;
                let stride = module.decoration_value(type_id, decoration::ARRAY_STRIDE);
                let ty = ast::Type::RuntimeArray { elem: Box::new(elem), stride };
                if stride.is_some() {
                    self.generate_alias(type_id, ty)
                } else {
                    ty
                }
            }
            Op::TypeStruct => self.convert_struct_type(&inst)?,
            Op::TypePointer => {
                let storage_class = inst.operand(0);
                let pointee_id = inst.operand(1);
                let class = self.convert_storage_class(storage_class, pointee_id)?;
                let store = self.convert_type(pointee_id)?;
                ast::Type::Pointer { class, store: Box::new(store) }
            }
            // Samplers and images are handled through usage inference, not
            // through plain type conversion.
            Op::TypeSampler | Op::TypeImage | Op::TypeSampledImage => ast::Type::Void,
            _ => {
                return Err(self.fail(format!("unknown SPIR-V type with ID {type_id}")));
            }
        };
        self.id_to_type.insert(type_id, ty.clone());
        Ok(ty)
    }

    /// Maps a SPIR-V storage class (applying the `BufferBlock` remap for
    /// the given pointee) to the AST storage class.
    pub(crate) fn convert_storage_class(
        &mut self,
        storage_class: u32,
        pointee_id: u32,
    ) -> Result<ast::StorageClass> {
        let class = match StorageClass::from_u32(storage_class) {
            Some(class) => class,
            None => {
                return Err(self.fail(format!("unknown SPIR-V storage class: {storage_class}")));
            }
        };
        Ok(match class {
            StorageClass::Input => ast::StorageClass::Input,
            StorageClass::Output => ast::StorageClass::Output,
            StorageClass::Uniform => {
                if self.remap_buffer_block_type.contains(&pointee_id) {
                    ast::StorageClass::Storage
                } else {
                    ast::StorageClass::Uniform
                }
            }
            StorageClass::StorageBuffer => ast::StorageClass::Storage,
            StorageClass::UniformConstant => ast::StorageClass::UniformConstant,
            StorageClass::Workgroup => ast::StorageClass::Workgroup,
            StorageClass::Private => ast::StorageClass::Private,
            StorageClass::Function => ast::StorageClass::Function,
            StorageClass::PushConstant | StorageClass::Image => {
                return Err(
                    self.fail(format!("unsupported storage class: {storage_class}"))
                );
            }
        })
    }

    /// Declares the struct and returns a by-name reference to it. Two
    /// structurally identical `OpTypeStruct`s stay distinct declarations:
    /// identity is the declared name, which keeps accessor chains correct
    /// in nested structs.
    fn convert_struct_type(&mut self, inst: &RawInst) -> Result<ast::Type> {
        let struct_id = inst.result_id;
        let module = self.module_ir();

        let name = if self.namer.has_name(struct_id) {
            self.namer.name(struct_id)
        } else {
            let derived = self.namer.make_derived_name("S");
            // Adopt the derived name as the ID's name so later references
            // (e.g. diagnostics) agree.
            self.namer.save_name(struct_id, &derived);
            derived
        };

        let mut members = Vec::with_capacity(inst.operands.len());
        let mut member_types = Vec::with_capacity(inst.operands.len());
        for (index, &member_type_id) in inst.operands.iter().enumerate() {
            let member_index = index as u32;
            let ty = self.convert_type(member_type_id)?;
            let mut decorations = vec![];
            for deco in module.decorations_for_member(struct_id, member_index) {
                if let Some(converted) =
                    self.convert_member_decoration(struct_id, member_index, deco)?
                {
                    decorations.push(converted);
                }
            }
            member_types.push(ty.clone());
            members.push(ast::StructMember {
                name: self.namer.member_name(struct_id, member_index),
                ty,
                decorations,
            });
        }

        let is_block = module.has_decoration(struct_id, decoration::BLOCK)
            || module.has_decoration(struct_id, decoration::BUFFER_BLOCK);
        self.struct_members_by_name.insert(name.clone(), member_types);
        self.ast_module.type_decls.push(ast::TypeDecl::Struct(ast::StructDecl {
            name: name.clone(),
            members,
            is_block,
        }));
        Ok(ast::Type::Named(name))
    }

    /// Emits an alias declaration for a type that needs a user-visible name
    /// (stride-decorated arrays), returning the by-name reference.
    fn generate_alias(&mut self, type_id: u32, ty: ast::Type) -> ast::Type {
        let name = if self.namer.has_name(type_id) {
            self.namer.name(type_id)
        } else {
            let derived = self.namer.make_derived_name("Arr");
            self.namer.save_name(type_id, &derived);
            derived
        };
        self.ast_module.type_decls.push(ast::TypeDecl::Alias { name: name.clone(), ty });
        ast::Type::Named(name)
    }

    /// Converts one encoded member decoration. `Ok(None)` means the
    /// decoration is recognized and deliberately dropped.
    pub fn convert_member_decoration(
        &mut self,
        struct_type_id: u32,
        member_index: u32,
        deco: &spv::Decoration,
    ) -> Result<Option<ast::MemberDecoration>> {
        let Some(&kind) = deco.first() else {
            return Err(self.fail("malformed SPIR-V decoration: it's empty"));
        };
        match kind {
            decoration::OFFSET => {
                if deco.len() != 2 {
                    return Err(self.fail(format!(
                        "malformed Offset decoration: expected 1 literal operand, has {}: \
                         member {member_index} of {}",
                        deco.len() - 1,
                        self.show_type(struct_type_id)
                    )));
                }
                Ok(Some(ast::MemberDecoration::Offset(deco[1])))
            }
            // WGSL has no member decoration for these; dropped, not errors.
            decoration::NON_READABLE | decoration::NON_WRITABLE => Ok(None),
            // WGSL only has column-major matrices.
            decoration::COL_MAJOR => Ok(None),
            decoration::ROW_MAJOR => Err(self.fail(format!(
                "WGSL does not support row-major matrices: can't translate member \
                 {member_index} of {}",
                self.show_type(struct_type_id)
            ))),
            decoration::MATRIX_STRIDE => {
                if deco.len() != 2 {
                    return Err(self.fail(format!(
                        "malformed MatrixStride decoration: expected 1 literal operand, has {}: \
                         member {member_index} of {}",
                        deco.len() - 1,
                        self.show_type(struct_type_id)
                    )));
                }
                Ok(None)
            }
            _ => Err(self.fail(format!(
                "unhandled member decoration: {kind} on member {member_index} of {}",
                self.show_type(struct_type_id)
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    /// Builds an AST expression for a SPIR-V constant ID.
    pub fn make_constant_expression(&mut self, id: u32) -> Result<TypedExpr> {
        self.check_ok()?;
        let module = self.module_ir();
        let inst = match module.def(id) {
            Some(inst) => inst.clone(),
            None => return Err(self.fail(format!("ID {id} is not a registered instruction"))),
        };
        let ty = self.convert_type(inst.result_type_id)?;

        if let Some(name) = self.spec_constant_names.get(&id) {
            return Ok(TypedExpr { ty, expr: ast::Expression::Ident(name.clone()) });
        }

        let expr = match inst.op {
            // Undef is remapped to the zero value.
            Op::Undef | Op::ConstantNull => self.make_null_value(&ty)?,
            Op::ConstantTrue => ast::Literal::Bool(true).into(),
            Op::ConstantFalse => ast::Literal::Bool(false).into(),
            Op::Constant => {
                let word = inst.operand(0);
                match ty {
                    ast::Type::U32 => ast::Literal::U32(word).into(),
                    ast::Type::I32 => ast::Literal::I32(word as i32).into(),
                    ast::Type::F32 => ast::Literal::F32(f32::from_bits(word)).into(),
                    _ => {
                        return Err(self.fail(format!(
                            "unhandled constant type {} for value ID {id}",
                            inst.result_type_id
                        )));
                    }
                }
            }
            Op::ConstantComposite => {
                let mut args = Vec::with_capacity(inst.operands.len());
                for &component in &inst.operands {
                    args.push(self.make_constant_expression(component)?.expr);
                }
                ast::Expression::Construct { ty: ty.clone(), args }
            }
            _ => {
                return Err(self.fail(format!(
                    "unhandled constant type {} for value ID {id}",
                    inst.result_type_id
                )));
            }
        };
        Ok(TypedExpr { ty, expr })
    }

    /// The explicit zero value for a type: literal zeros for scalars, and a
    /// full-arity constructor of zero-valued components for composites.
    pub fn make_null_value(&mut self, ty: &ast::Type) -> Result<ast::Expression> {
        Ok(match ty {
            ast::Type::Bool => ast::Literal::Bool(false).into(),
            ast::Type::U32 => ast::Literal::U32(0).into(),
            ast::Type::I32 => ast::Literal::I32(0).into(),
            ast::Type::F32 => ast::Literal::F32(0.0).into(),
            ast::Type::Vector { size, elem } => {
                let component = self.make_null_value(elem)?;
                ast::Expression::Construct {
                    ty: ty.clone(),
                    args: (0..*size).map(|_| component.clone()).collect(),
                }
            }
            ast::Type::Matrix { columns, rows } => {
                let column_ty = ast::Type::vector(ast::Type::F32, *rows);
                let column = self.make_null_value(&column_ty)?;
                ast::Expression::Construct {
                    ty: ty.clone(),
                    args: (0..*columns).map(|_| column.clone()).collect(),
                }
            }
            ast::Type::Array { elem, size, .. } => {
                let component = self.make_null_value(elem)?;
                ast::Expression::Construct {
                    ty: ty.clone(),
                    args: (0..*size).map(|_| component.clone()).collect(),
                }
            }
            ast::Type::Named(name) => {
                // A named struct gets per-member zeros; a plain alias gets
                // the zero-argument constructor.
                let members = self.struct_members_by_name.get(name).cloned();
                match members {
                    Some(member_types) => {
                        let mut args = Vec::with_capacity(member_types.len());
                        for member_ty in &member_types {
                            args.push(self.make_null_value(member_ty)?);
                        }
                        ast::Expression::Construct { ty: ty.clone(), args }
                    }
                    None => ast::Expression::Construct { ty: ty.clone(), args: vec![] },
                }
            }
            _ => {
                return Err(self.fail(format!("can't make null value for type: {ty}")));
            }
        })
    }

    /// Surfaces scalar spec constants as named module-scope constants.
    pub fn emit_scalar_spec_constants(&mut self) -> Result<()> {
        self.check_ok()?;
        let module = self.module_ir();
        for &index in &module.types_consts_globals {
            let inst = module.insts[index].clone();
            let literal = match inst.op {
                Op::SpecConstantTrue => ast::Literal::Bool(true),
                Op::SpecConstantFalse => ast::Literal::Bool(false),
                Op::SpecConstant => {
                    let word = inst.operand(0);
                    match self.convert_type(inst.result_type_id)? {
                        ast::Type::U32 => ast::Literal::U32(word),
                        ast::Type::I32 => ast::Literal::I32(word as i32),
                        ast::Type::F32 => ast::Literal::F32(f32::from_bits(word)),
                        _ => {
                            return Err(self.fail(format!(
                                "unsupported spec constant type for ID {}",
                                inst.result_id
                            )));
                        }
                    }
                }
                _ => continue,
            };
            let ty = self.convert_type(inst.result_type_id)?;
            let name = self.namer.name(inst.result_id);
            let mut decorations = vec![];
            if let Some(spec_id) = module.decoration_value(inst.result_id, decoration::SPEC_ID) {
                decorations.push(ast::VarDecoration::ConstantId(spec_id));
            }
            self.spec_constant_names.insert(inst.result_id, name.clone());
            self.ast_module.globals.push(ast::GlobalVar {
                kind: ast::GlobalKind::Const,
                name,
                class: None,
                ty,
                init: Some(literal.into()),
                decorations,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Module-scope variables
    // ------------------------------------------------------------------

    /// Emits module-scope variables, handle variables included.
    pub fn emit_module_scope_variables(&mut self) -> Result<()> {
        self.check_ok()?;
        let module = self.module_ir();
        for &index in &module.types_consts_globals {
            let inst = module.insts[index].clone();
            if inst.op != Op::Variable {
                continue;
            }
            let storage_class = inst.operand(0);
            let var = if StorageClass::from_u32(storage_class)
                == Some(StorageClass::UniformConstant)
            {
                self.make_handle_variable(&inst)?
            } else {
                self.make_plain_variable(&inst, storage_class)?
            };
            self.ast_module.globals.push(var);
        }
        Ok(())
    }

    fn make_plain_variable(
        &mut self,
        inst: &RawInst,
        storage_class: u32,
    ) -> Result<ast::GlobalVar> {
        let pointer_ty = self.convert_type(inst.result_type_id)?;
        let store_ty = match pointer_ty {
            ast::Type::Pointer { store, .. } => *store,
            _ => {
                return Err(self.fail(format!(
                    "variable {} has a non-pointer type",
                    inst.result_id
                )));
            }
        };
        let pointee_id = match self.module_ir().def(inst.result_type_id) {
            Some(ptr_inst) => ptr_inst.operand(1),
            None => 0,
        };
        let class = self.convert_storage_class(storage_class, pointee_id)?;
        let init = if inst.operands.len() > 1 {
            Some(self.make_constant_expression(inst.operand(1))?.expr)
        } else {
            None
        };
        let decorations = self.convert_variable_decorations(inst.result_id)?;
        Ok(ast::GlobalVar {
            kind: ast::GlobalKind::Var,
            name: self.namer.name(inst.result_id),
            class: Some(class),
            ty: store_ty,
            init,
            decorations,
        })
    }

    fn make_handle_variable(&mut self, inst: &RawInst) -> Result<ast::GlobalVar> {
        let store_ty = self.get_type_for_handle_var(inst.result_id)?;
        let decorations = self.convert_variable_decorations(inst.result_id)?;
        Ok(ast::GlobalVar {
            kind: ast::GlobalKind::Var,
            name: self.namer.name(inst.result_id),
            class: Some(ast::StorageClass::UniformConstant),
            ty: store_ty,
            init: None,
            decorations,
        })
    }

    fn convert_variable_decorations(&mut self, id: u32) -> Result<Vec<ast::VarDecoration>> {
        let module = self.module_ir();
        let mut result = vec![];
        for deco in module.decorations_for(id) {
            match deco.first().copied() {
                Some(decoration::BUILTIN) => {
                    let value = deco.get(1).copied().unwrap_or(u32::MAX);
                    match spec::builtin_wgsl_name(value) {
                        Some(name) => result.push(ast::VarDecoration::Builtin(name)),
                        None => {
                            return Err(
                                self.fail(format!("unsupported builtin {value} on ID {id}"))
                            );
                        }
                    }
                }
                Some(decoration::LOCATION) => {
                    result.push(ast::VarDecoration::Location(deco.get(1).copied().unwrap_or(0)));
                }
                Some(decoration::BINDING) => {
                    result.push(ast::VarDecoration::Binding(deco.get(1).copied().unwrap_or(0)));
                }
                Some(decoration::DESCRIPTOR_SET) => {
                    result.push(ast::VarDecoration::Group(deco.get(1).copied().unwrap_or(0)));
                }
                // Interpolation and access hints have no AST counterpart
                // at module scope; dropped without error.
                _ => {}
            }
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Handles: tracing and usage
    // ------------------------------------------------------------------

    /// Traces an SSA value back to the `OpVariable`/`OpFunctionParameter`
    /// it ultimately refers to, following loads, copies, access chains, and
    /// `OpSampledImage` (taking the image or sampler side per
    /// `follow_image`). Returns `None` when the chain dead-ends.
    pub(crate) fn get_memory_object_declaration_for_handle(
        &mut self,
        id: u32,
        follow_image: bool,
    ) -> Option<u32> {
        let module = self.module_ir();
        let mut visited = FxHashSet::default();
        let mut current = id;
        loop {
            let memo = if follow_image {
                &self.mem_obj_decl_image
            } else {
                &self.mem_obj_decl_sampler
            };
            if let Some(&result) = memo.get(&current) {
                return self.memoize_handle_path(follow_image, visited, result);
            }
            // A cycle means malformed input; mark the whole path dead.
            if !visited.insert(current) {
                return self.memoize_handle_path(follow_image, visited, None);
            }
            let inst = match module.def(current) {
                Some(inst) => inst,
                None => return self.memoize_handle_path(follow_image, visited, None),
            };
            current = match inst.op {
                Op::Variable | Op::FunctionParameter => {
                    let found = inst.result_id;
                    return self.memoize_handle_path(follow_image, visited, Some(found));
                }
                Op::Load | Op::CopyObject | Op::Image => inst.operand(0),
                Op::AccessChain
                | Op::InBoundsAccessChain
                | Op::PtrAccessChain
                | Op::InBoundsPtrAccessChain => inst.operand(0),
                Op::SampledImage => inst.operand(if follow_image { 0 } else { 1 }),
                _ => return self.memoize_handle_path(follow_image, visited, None),
            };
        }
    }

    fn memoize_handle_path(
        &mut self,
        follow_image: bool,
        visited: FxHashSet<u32>,
        result: Option<u32>,
    ) -> Option<u32> {
        let memo = if follow_image {
            &mut self.mem_obj_decl_image
        } else {
            &mut self.mem_obj_decl_sampler
        };
        for id in visited {
            memo.insert(id, result);
        }
        result
    }

    fn trace_image(&mut self, inst: &RawInst) -> Result<u32> {
        let id = inst.operand(0);
        self.get_memory_object_declaration_for_handle(id, true).ok_or_else(|| {
            self.fail(format!(
                "could not find memory object declaration for the image underlying id {id}"
            ))
        })
    }

    fn trace_sampler(&mut self, inst: &RawInst) -> Result<u32> {
        let id = inst.operand(0);
        self.get_memory_object_declaration_for_handle(id, false).ok_or_else(|| {
            self.fail(format!(
                "could not find memory object declaration for the sampler underlying id {id}"
            ))
        })
    }

    /// Scans every image instruction in the module and accumulates usage
    /// bits on the underlying declarations. Functions are visited callees
    /// first, so a callee's formal-parameter usage is known by the time its
    /// call sites are scanned and can be propagated to the arguments.
    pub fn register_handle_usage(&mut self) -> Result<()> {
        self.check_ok()?;
        let module = self.module_ir();
        for &f_index in &self.topo_function_order.clone() {
            let function = &module.functions[f_index];
            for block in &function.blocks {
                for &inst_index in &block.body {
                    let inst = module.insts[inst_index].clone();
                    match inst.op {
                        Op::ImageRead => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage.entry(image).or_default().add_storage_read_texture();
                        }
                        Op::ImageWrite => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage
                                .entry(image)
                                .or_default()
                                .add_storage_write_texture();
                        }
                        Op::ImageFetch | Op::ImageQuerySizeLod => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage.entry(image).or_default().add_sampled_texture();
                        }
                        Op::ImageSampleImplicitLod
                        | Op::ImageSampleExplicitLod
                        | Op::ImageSampleProjImplicitLod
                        | Op::ImageSampleProjExplicitLod
                        | Op::ImageGather
                        | Op::ImageQueryLod => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage.entry(image).or_default().add_sampled_texture();
                            let sampler = self.trace_sampler(&inst)?;
                            self.handle_usage.entry(sampler).or_default().add_sampler();
                        }
                        Op::ImageSampleDrefImplicitLod
                        | Op::ImageSampleDrefExplicitLod
                        | Op::ImageSampleProjDrefImplicitLod
                        | Op::ImageSampleProjDrefExplicitLod
                        | Op::ImageDrefGather => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage.entry(image).or_default().add_depth_texture();
                            let sampler = self.trace_sampler(&inst)?;
                            self.handle_usage.entry(sampler).or_default().add_comparison_sampler();
                        }
                        Op::ImageQueryLevels => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage.entry(image).or_default().add_texture();
                        }
                        Op::ImageQuerySamples => {
                            let image = self.trace_image(&inst)?;
                            self.handle_usage
                                .entry(image)
                                .or_default()
                                .add_multisampled_texture();
                        }
                        // OpImageQuerySize applies to multisampled or storage
                        // images; neither can be forced from the query alone.
                        Op::ImageQuerySize => {}
                        Op::FunctionCall => {
                            self.propagate_call_handle_usage(&inst)?;
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn propagate_call_handle_usage(&mut self, inst: &RawInst) -> Result<()> {
        let module = self.module_ir();
        let callee_id = inst.operand(0);
        let params: Vec<u32> = match module.function_by_id(callee_id) {
            Some(callee) => {
                callee.params.iter().map(|&p| module.insts[p].result_id).collect()
            }
            None => return Err(self.fail(format!("call to unknown function {callee_id}"))),
        };
        if params.len() != inst.operands.len() - 1 {
            return Err(self.fail(format!(
                "called function has {} parameters, but the call supplies {}",
                params.len(),
                inst.operands.len() - 1
            )));
        }
        for (i, &formal) in params.iter().enumerate() {
            let Some(formal_usage) = self.handle_usage.get(&formal).copied() else { continue };
            let actual = inst.operand(i + 1);
            let as_sampler = self.get_memory_object_declaration_for_handle(actual, false);
            let as_image = self.get_memory_object_declaration_for_handle(actual, true);
            if let Some(decl) = as_sampler {
                self.handle_usage.entry(decl).or_default().add(&formal_usage);
            }
            if let Some(decl) = as_image {
                if as_sampler != Some(decl) {
                    self.handle_usage.entry(decl).or_default().add(&formal_usage);
                }
            }
        }
        Ok(())
    }

    /// The usage inferred for a declaration ID (empty if none was recorded).
    pub fn get_handle_usage(&self, id: u32) -> Usage {
        self.handle_usage.get(&id).copied().unwrap_or_default()
    }

    /// The SPIR-V `OpTypeSampler`/`OpTypeImage` underlying a handle
    /// variable or function parameter, rejecting handle shapes WGSL cannot
    /// express.
    fn get_spirv_type_for_handle_memory_object_declaration(
        &mut self,
        var_id: u32,
    ) -> Result<RawInst> {
        let module = self.module_ir();
        let var = match module.def(var_id) {
            Some(inst) => inst.clone(),
            None => return Err(self.fail(format!("unknown handle declaration {var_id}"))),
        };
        let ptr_type = match module.def(var.result_type_id) {
            Some(inst) if inst.op == Op::TypePointer => inst.clone(),
            _ => {
                return Err(self.fail(format!(
                    "invalid type for variable or function parameter {var_id}"
                )));
            }
        };
        let raw_handle_type = match module.def(ptr_type.operand(1)) {
            Some(inst) => inst.clone(),
            None => {
                return Err(self.fail(format!(
                    "invalid pointer type for variable or function parameter {var_id}"
                )));
            }
        };
        match raw_handle_type.op {
            Op::TypeSampler | Op::TypeImage => Ok(raw_handle_type),
            Op::TypeArray | Op::TypeRuntimeArray => Err(self.fail(format!(
                "arrays of textures or samplers are not supported in WGSL; can't translate \
                 variable or function parameter {var_id}"
            ))),
            Op::TypeSampledImage => Err(self.fail(format!(
                "WGSL does not support combined image-samplers: variable or function \
                 parameter {var_id}"
            ))),
            _ => Err(self.fail(format!(
                "invalid type for image or sampler variable or function parameter {var_id}"
            ))),
        }
    }

    /// The concrete WGSL handle (store) type for a handle declaration,
    /// combining accumulated usage with the declared SPIR-V type. Fails on
    /// contradictory usage, and on anything WGSL cannot express.
    pub fn get_type_for_handle_var(&mut self, var_id: u32) -> Result<ast::Type> {
        if let Some(ty) = self.handle_type.get(&var_id) {
            return Ok(ty.clone());
        }
        let raw_handle_type = self.get_spirv_type_for_handle_memory_object_declaration(var_id)?;

        let mut usage = self.get_handle_usage(var_id);
        if !usage.is_valid() {
            let name = self.namer.name(var_id);
            return Err(self.fail(format!(
                "invalid sampler or texture usage for variable {name}: {usage}"
            )));
        }

        // A handle can be statically referenced without any use that pins
        // its kind down; fall back to the declared store type.
        if !usage.is_complete() {
            if raw_handle_type.op == Op::TypeSampler {
                usage.add_sampler();
            } else {
                // OpTypeImage operands:
                // [sampled type, dim, depth, arrayed, ms, sampled, format]
                if raw_handle_type.operands.len() != 7 {
                    return Err(self.fail(format!(
                        "invalid SPIR-V image type: expected 7 operands: {}",
                        self.show_type(raw_handle_type.result_id)
                    )));
                }
                let sampled_param = raw_handle_type.operand(5);
                let format_param = raw_handle_type.operand(6);
                if format_param != 0 || sampled_param == 2 {
                    // Only storage images carry a format.
                    let module = self.module_ir();
                    let nonwritable =
                        module.has_decoration(var_id, decoration::NON_WRITABLE);
                    let nonreadable =
                        module.has_decoration(var_id, decoration::NON_READABLE);
                    if nonwritable && nonreadable {
                        return Err(self.fail(format!(
                            "storage image variable is both NonWritable and NonReadable: {}",
                            self.namer.display_name(var_id)
                        )));
                    }
                    if !nonwritable && !nonreadable {
                        return Err(self.fail(format!(
                            "storage image variable is neither NonWritable nor NonReadable: {}",
                            self.namer.display_name(var_id)
                        )));
                    }
                    if nonwritable {
                        usage.add_storage_read_texture();
                    } else {
                        usage.add_storage_write_texture();
                    }
                } else {
                    usage.add_sampled_texture();
                }
            }
        }

        let ty = if usage.is_sampler() {
            ast::Type::Sampler { comparison: usage.is_comparison_sampler() }
        } else if usage.is_texture() {
            self.texture_type_for(var_id, &raw_handle_type, &usage)?
        } else {
            return Err(self.fail(format!(
                "unsupported: UniformConstant variable is not a recognized sampler or \
                 texture: {}",
                self.namer.display_name(var_id)
            )));
        };
        self.handle_type.insert(var_id, ty.clone());
        Ok(ty)
    }

    fn texture_type_for(
        &mut self,
        var_id: u32,
        image_type: &RawInst,
        usage: &Usage,
    ) -> Result<ast::Type> {
        let sampled_type_id = image_type.operand(0);
        let dim_param = image_type.operand(1);
        let depth_param = image_type.operand(2);
        let arrayed = image_type.operand(3) == 1;
        let multisampled = image_type.operand(4) == 1;
        let format_param = image_type.operand(6);

        let dim = match (Dim::from_u32(dim_param), arrayed) {
            (Some(Dim::D1), false) => ast::TextureDim::D1,
            (Some(Dim::D2), false) => ast::TextureDim::D2,
            (Some(Dim::D2), true) => ast::TextureDim::D2Array,
            (Some(Dim::D3), false) => ast::TextureDim::D3,
            (Some(Dim::Cube), false) => ast::TextureDim::Cube,
            (Some(Dim::Cube), true) => ast::TextureDim::CubeArray,
            (Some(_), true) => {
                return Err(self.fail(format!(
                    "WGSL arrayed textures must be 2d_array or cube_array: invalid arrayed \
                     texture variable {}",
                    self.namer.display_name(var_id)
                )));
            }
            (None, _) => {
                return Err(self.fail(format!(
                    "invalid texture dimensionality {dim_param} for variable {}",
                    self.namer.display_name(var_id)
                )));
            }
        };

        // WGSL textures are always formatted; unformatted images are
        // sampled.
        if usage.is_sampled_texture() || format_param == 0 {
            // Vulkan ignores the "depth" bit on OpTypeImage, so a
            // depth-reference *usage* also forces a depth texture.
            if depth_param == 1 || usage.is_depth_texture() {
                return Ok(ast::Type::Texture(ast::TextureType::Depth { dim }));
            }
            let component = self.convert_type(sampled_type_id)?;
            if multisampled {
                if dim != ast::TextureDim::D2 {
                    return Err(self.fail(format!(
                        "WGSL multisampled textures must be 2d and non-arrayed: invalid \
                         multisampled texture variable {}",
                        self.namer.display_name(var_id)
                    )));
                }
                return Ok(ast::Type::Texture(ast::TextureType::Multisampled {
                    dim,
                    component: Box::new(component),
                }));
            }
            return Ok(ast::Type::Texture(ast::TextureType::Sampled {
                dim,
                component: Box::new(component),
            }));
        }

        let format = match ImageFormat::from_u32(format_param) {
            Some(format) if format != ImageFormat::Unknown => format,
            _ => {
                return Err(self.fail(format!(
                    "invalid storage texture format {format_param} for variable {}",
                    self.namer.display_name(var_id)
                )));
            }
        };
        let access = if usage.is_storage_read_texture() {
            ast::AccessMode::Read
        } else {
            ast::AccessMode::Write
        };
        Ok(ast::Type::Texture(ast::TextureType::Storage { dim, format, access }))
    }

    // ------------------------------------------------------------------
    // Signedness reconciliation
    // ------------------------------------------------------------------

    pub(crate) fn unsigned_type_for(ty: &ast::Type) -> Option<ast::Type> {
        match ty {
            ast::Type::I32 => Some(ast::Type::U32),
            ast::Type::Vector { size, elem } if **elem == ast::Type::I32 => {
                Some(ast::Type::vector(ast::Type::U32, *size))
            }
            _ => None,
        }
    }

    pub(crate) fn signed_type_for(ty: &ast::Type) -> Option<ast::Type> {
        match ty {
            ast::Type::U32 => Some(ast::Type::I32),
            ast::Type::Vector { size, elem } if **elem == ast::Type::U32 => {
                Some(ast::Type::vector(ast::Type::I32, *size))
            }
            _ => None,
        }
    }

    /// A signed integer type matching the shape of `other`.
    pub(crate) fn signed_int_matching_shape(&mut self, other: &ast::Type) -> Result<ast::Type> {
        match other.shape_size() {
            Some(1) => Ok(ast::Type::I32),
            Some(size) => Ok(ast::Type::vector(ast::Type::I32, size)),
            None => {
                Err(self.fail(format!("required numeric scalar or vector, but got {other}")))
            }
        }
    }

    /// An unsigned integer type matching the shape of `other`.
    pub(crate) fn unsigned_int_matching_shape(&mut self, other: &ast::Type) -> Result<ast::Type> {
        match other.shape_size() {
            Some(1) => Ok(ast::Type::U32),
            Some(size) => Ok(ast::Type::vector(ast::Type::U32, size)),
            None => {
                Err(self.fail(format!("required numeric scalar or vector, but got {other}")))
            }
        }
    }

    /// Casts to the signed type of the same shape if the value is unsigned.
    pub(crate) fn as_signed(&mut self, expr: TypedExpr) -> Result<TypedExpr> {
        if expr.ty.is_unsigned_scalar_or_vector() {
            let ty = self.signed_int_matching_shape(&expr.ty)?;
            return Ok(TypedExpr { expr: ast::Expression::bitcast(ty.clone(), expr.expr), ty });
        }
        Ok(expr)
    }

    /// Casts to the unsigned type of the same shape if the value is signed.
    pub(crate) fn as_unsigned(&mut self, expr: TypedExpr) -> Result<TypedExpr> {
        if expr.ty.is_signed_scalar_or_vector() {
            let ty = self.unsigned_int_matching_shape(&expr.ty)?;
            return Ok(TypedExpr { expr: ast::Expression::bitcast(ty.clone(), expr.expr), ty });
        }
        Ok(expr)
    }

    fn assumes_signed_operands(op: Op, glsl: Option<u32>) -> bool {
        if let Some(ext) = glsl {
            return spec::glsl_assumes_signed_operands(ext);
        }
        matches!(
            op,
            Op::SNegate
                | Op::SDiv
                | Op::SRem
                | Op::SMod
                | Op::SLessThan
                | Op::SLessThanEqual
                | Op::SGreaterThan
                | Op::SGreaterThanEqual
                | Op::ConvertSToF
        )
    }

    fn assumes_unsigned_operands(op: Op, glsl: Option<u32>) -> bool {
        if let Some(ext) = glsl {
            return spec::glsl_assumes_unsigned_operands(ext);
        }
        matches!(
            op,
            Op::UDiv
                | Op::UMod
                | Op::ULessThan
                | Op::ULessThanEqual
                | Op::UGreaterThan
                | Op::UGreaterThanEqual
                | Op::ConvertUToF
        )
    }

    /// WGSL requires matching operand signedness for these; the second
    /// operand bends to the first.
    pub(crate) fn assumes_second_operand_matches_first(op: Op) -> bool {
        matches!(
            op,
            Op::IAdd
                | Op::ISub
                | Op::IMul
                | Op::IEqual
                | Op::INotEqual
                | Op::BitwiseAnd
                | Op::BitwiseOr
                | Op::BitwiseXor
        )
    }

    /// Ops whose WGSL result type is pinned to the first operand's type
    /// ("forced"), even when the SPIR-V result type disagrees in
    /// signedness.
    pub(crate) fn forced_result_type(
        op: Op,
        glsl: Option<u32>,
        first_operand_type: &ast::Type,
    ) -> Option<ast::Type> {
        let forced = match op {
            Op::IAdd
            | Op::ISub
            | Op::IMul
            | Op::SDiv
            | Op::SRem
            | Op::SMod
            | Op::UDiv
            | Op::UMod
            | Op::SNegate
            | Op::Not
            | Op::BitwiseAnd
            | Op::BitwiseOr
            | Op::BitwiseXor
            | Op::ShiftLeftLogical
            | Op::ShiftRightLogical
            | Op::ShiftRightArithmetic => true,
            Op::ExtInst => glsl.is_some_and(|ext| {
                spec::glsl_assumes_signed_operands(ext) || spec::glsl_assumes_unsigned_operands(ext)
            }),
            _ => false,
        };
        forced.then(|| first_operand_type.clone())
    }

    /// Inserts a cast around an operand whose signedness disagrees with
    /// what the operation assumes. No-op for operations with no assumption,
    /// or operands that already conform.
    pub(crate) fn rectify_operand_signedness(
        &mut self,
        op: Op,
        glsl: Option<u32>,
        expr: TypedExpr,
    ) -> Result<TypedExpr> {
        let requires_signed = Self::assumes_signed_operands(op, glsl);
        let requires_unsigned = Self::assumes_unsigned_operands(op, glsl);
        if requires_signed {
            if let Some(ty) = Self::signed_type_for(&expr.ty) {
                return Ok(TypedExpr {
                    expr: ast::Expression::bitcast(ty.clone(), expr.expr),
                    ty,
                });
            }
        } else if requires_unsigned {
            if let Some(ty) = Self::unsigned_type_for(&expr.ty) {
                return Ok(TypedExpr {
                    expr: ast::Expression::bitcast(ty.clone(), expr.expr),
                    ty,
                });
            }
        }
        Ok(expr)
    }

    /// Casts the second operand to the first operand's type where WGSL
    /// demands matched signedness.
    pub(crate) fn rectify_second_operand_signedness(
        &mut self,
        op: Op,
        first_operand_type: &ast::Type,
        second: TypedExpr,
    ) -> TypedExpr {
        if &second.ty != first_operand_type && Self::assumes_second_operand_matches_first(op) {
            return TypedExpr {
                ty: first_operand_type.clone(),
                expr: ast::Expression::bitcast(first_operand_type.clone(), second.expr),
            };
        }
        second
    }

    /// Wraps `expr` in a cast to the declared result type when the
    /// operation's forced result type differs from it. This casts the
    /// *result*, not the operands: `OpSDiv %uint %a %b` with signed `a`,
    /// `b` becomes `bitcast<u32>(a / b)`.
    pub(crate) fn rectify_forced_result_type(
        &mut self,
        expr: TypedExpr,
        op: Op,
        glsl: Option<u32>,
        first_operand_type: &ast::Type,
    ) -> TypedExpr {
        match Self::forced_result_type(op, glsl, first_operand_type) {
            Some(forced) if forced != expr.ty => TypedExpr {
                expr: ast::Expression::bitcast(expr.ty.clone(), expr.expr),
                ty: expr.ty,
            },
            _ => expr,
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    /// Emits every function body, callees before callers (a call site needs
    /// the callee's resolved return type).
    pub fn emit_functions(&mut self) -> Result<()> {
        self.check_ok()?;
        for f_index in self.topo_function_order.clone() {
            self.emit_function(f_index)?;
        }
        Ok(())
    }

    /// Emits a single function by its index in the internal module.
    pub fn emit_function(&mut self, function_index: usize) -> Result<()> {
        self.check_ok()?;
        let mut emitter = FunctionEmitter::new(self, function_index);
        emitter.emit()
    }
}
