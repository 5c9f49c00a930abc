//! The structured, statement-oriented output AST.
//!
//! These are deliberately plain data holders: the [`Module`] exclusively
//! owns every node it contains, and nodes refer to other declarations only
//! by identifier string (a function name, a struct name), never by pointer,
//! so the whole tree is trivially clonable and has no ownership cycles.
//!
//! The textual form produced by [`Module::to_wgsl_string`] is a WGSL-like
//! dump used as a debugging and testing aid, not a stable wire format.

use crate::spv::spec::ImageFormat;
use itertools::Itertools as _;
use std::fmt::{self, Write as _};

/// A shader pipeline stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Vertex,
    Fragment,
    Compute,
}

impl PipelineStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }
}

/// AST-level storage classes (WGSL address spaces, plus the entry-point IO
/// classes of the older pipeline-IO model).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Input,
    Output,
    Uniform,
    UniformConstant,
    Storage,
    Workgroup,
    Private,
    Function,
}

impl StorageClass {
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
            Self::Uniform => "uniform",
            Self::UniformConstant => "uniform_constant",
            Self::Storage => "storage",
            Self::Workgroup => "workgroup",
            Self::Private => "private",
            Self::Function => "function",
        }
    }
}

/// Texture dimensionalities, WGSL-style (arrayed-ness folded in).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureDim {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

impl TextureDim {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::D1 => "1d",
            Self::D2 => "2d",
            Self::D2Array => "2d_array",
            Self::D3 => "3d",
            Self::Cube => "cube",
            Self::CubeArray => "cube_array",
        }
    }

    pub fn is_arrayed(self) -> bool {
        matches!(self, Self::D2Array | Self::CubeArray)
    }

    /// Number of coordinate components, excluding any array index.
    pub fn coord_size(self) -> u32 {
        match self {
            Self::D1 => 1,
            Self::D2 | Self::D2Array => 2,
            Self::D3 | Self::Cube | Self::CubeArray => 3,
        }
    }
}

/// Storage texture access mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}

/// A concrete texture type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureType {
    Sampled { dim: TextureDim, component: Box<Type> },
    Multisampled { dim: TextureDim, component: Box<Type> },
    Depth { dim: TextureDim },
    Storage { dim: TextureDim, format: ImageFormat, access: AccessMode },
}

/// A type reference.
///
/// Structs and aliases appear as [`Type::Named`] references to a
/// [`TypeDecl`] owned by the module; everything else is structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    I32,
    U32,
    F32,
    Vector { size: u32, elem: Box<Type> },
    /// Matrices are always `f32` in WGSL.
    Matrix { columns: u32, rows: u32 },
    Array { elem: Box<Type>, size: u32, stride: Option<u32> },
    RuntimeArray { elem: Box<Type>, stride: Option<u32> },
    Pointer { class: StorageClass, store: Box<Type> },
    Sampler { comparison: bool },
    Texture(TextureType),
    Named(String),
}

impl Type {
    pub fn vector(elem: Type, size: u32) -> Self {
        Self::Vector { size, elem: Box::new(elem) }
    }

    /// The scalar component type of a scalar or vector; `None` otherwise.
    pub fn component(&self) -> Option<&Type> {
        match self {
            Self::Bool | Self::I32 | Self::U32 | Self::F32 => Some(self),
            Self::Vector { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Vector size, or 1 for scalars; `None` for non-numeric shapes.
    pub fn shape_size(&self) -> Option<u32> {
        match self {
            Self::Bool | Self::I32 | Self::U32 | Self::F32 => Some(1),
            Self::Vector { size, .. } => Some(*size),
            _ => None,
        }
    }

    pub fn is_signed_scalar_or_vector(&self) -> bool {
        matches!(self.component(), Some(Type::I32))
    }

    pub fn is_unsigned_scalar_or_vector(&self) -> bool {
        matches!(self.component(), Some(Type::U32))
    }

    pub fn is_integer_scalar_or_vector(&self) -> bool {
        matches!(self.component(), Some(Type::I32 | Type::U32))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::I32 => f.write_str("i32"),
            Self::U32 => f.write_str("u32"),
            Self::F32 => f.write_str("f32"),
            Self::Vector { size, elem } => write!(f, "vec{size}<{elem}>"),
            Self::Matrix { columns, rows } => write!(f, "mat{columns}x{rows}<f32>"),
            Self::Array { elem, size, stride } => {
                if let Some(stride) = stride {
                    write!(f, "[[stride({stride})]] ")?;
                }
                write!(f, "array<{elem}, {size}>")
            }
            Self::RuntimeArray { elem, stride } => {
                if let Some(stride) = stride {
                    write!(f, "[[stride({stride})]] ")?;
                }
                write!(f, "array<{elem}>")
            }
            Self::Pointer { class, store } => write!(f, "ptr<{}, {store}>", class.name()),
            Self::Sampler { comparison: false } => f.write_str("sampler"),
            Self::Sampler { comparison: true } => f.write_str("sampler_comparison"),
            Self::Texture(tex) => match tex {
                TextureType::Sampled { dim, component } => {
                    write!(f, "texture_{}<{component}>", dim.suffix())
                }
                TextureType::Multisampled { dim, component } => {
                    write!(f, "texture_multisampled_{}<{component}>", dim.suffix())
                }
                TextureType::Depth { dim } => write!(f, "texture_depth_{}", dim.suffix()),
                TextureType::Storage { dim, format, access } => write!(
                    f,
                    "texture_storage_{}<{}, {}>",
                    dim.suffix(),
                    format.wgsl_name(),
                    match access {
                        AccessMode::Read => "read",
                        AccessMode::Write => "write",
                    }
                ),
            },
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A scalar literal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}u"),
            // Debug formatting always keeps a decimal point.
            Self::F32(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `!`
    Not,
    /// `~`
    Complement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
            Self::Complement => "~",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        }
    }
}

/// An expression tree node.
//
// `derive_more::From` only generates conversions for the single-field
// variants (`Literal`, `Ident`); the rest are built through the helper
// constructors below.
#[derive(Clone, Debug, PartialEq, derive_more::From)]
pub enum Expression {
    Literal(Literal),
    Ident(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// A value-preserving bit reinterpretation to another type (the
    /// signedness casts the reader inserts are these).
    Bitcast {
        ty: Type,
        expr: Box<Expression>,
    },
    /// A type constructor; zero arguments means the zero value.
    Construct {
        ty: Type,
        args: Vec<Expression>,
    },
    Member {
        base: Box<Expression>,
        member: String,
    },
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        function: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn unary(op: UnaryOp, expr: Expression) -> Self {
        Self::Unary { op, expr: Box::new(expr) }
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Self::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn bitcast(ty: Type, expr: Expression) -> Self {
        Self::Bitcast { ty, expr: Box::new(expr) }
    }

    pub fn member(base: Expression, member: impl Into<String>) -> Self {
        Self::Member { base: Box::new(base), member: member.into() }
    }

    pub fn index(base: Expression, index: Expression) -> Self {
        Self::Index { base: Box::new(base), index: Box::new(index) }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Ident(name) => f.write_str(name),
            Self::Unary { op, expr } => write!(f, "{}({expr})", op.symbol()),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Bitcast { ty, expr } => write!(f, "bitcast<{ty}>({expr})"),
            Self::Construct { ty, args } => {
                write!(f, "{ty}(")?;
                write_comma_separated(f, args)?;
                f.write_str(")")
            }
            Self::Member { base, member } => write!(f, "{base}.{member}"),
            Self::Index { base, index } => write!(f, "{base}[{index}]"),
            Self::Call { function, args } => {
                write!(f, "{function}(")?;
                write_comma_separated(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// `var` vs `let` for local declarations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarDeclKind {
    Var,
    Let,
}

/// One clause of a `switch`.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// The selector literals; empty for a pure `default` clause.
    pub selectors: Vec<Literal>,
    pub is_default: bool,
    pub body: Vec<Statement>,
}

/// A statement node.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    VarDecl {
        kind: VarDeclKind,
        name: String,
        ty: Option<Type>,
        init: Option<Expression>,
    },
    Assign {
        lhs: Expression,
        rhs: Expression,
    },
    /// A call whose result (if any) is discarded.
    Call {
        function: String,
        args: Vec<Expression>,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Switch {
        selector: Expression,
        cases: Vec<SwitchCase>,
    },
    Loop {
        body: Vec<Statement>,
        continuing: Vec<Statement>,
    },
    Break,
    Continue,
    Fallthrough,
    Return {
        value: Option<Expression>,
    },
    /// WGSL `discard` (SPIR-V `OpKill`).
    Kill,
}

/// An extended-instruction-set import (`import "GLSL.std.450" as std::glsl`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub alias: String,
}

/// An entry point: a stage, its API-visible name, and the implementing
/// function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    pub stage: PipelineStage,
    pub name: String,
    pub function: String,
    pub workgroup_size: Option<[u32; 3]>,
}

/// A decoration on a struct member.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemberDecoration {
    Offset(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    pub decorations: Vec<MemberDecoration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<StructMember>,
    /// Carries the SPIR-V `Block`/`BufferBlock` decoration.
    pub is_block: bool,
}

/// A named type declaration owned by the module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDecl {
    Struct(StructDecl),
    Alias { name: String, ty: Type },
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(s) => &s.name,
            Self::Alias { name, .. } => name,
        }
    }
}

/// A decoration on a module-scope variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VarDecoration {
    Builtin(&'static str),
    Location(u32),
    Binding(u32),
    Group(u32),
    ConstantId(u32),
}

/// Is a module-scope declaration a `var` or a constant?
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GlobalKind {
    Var,
    Const,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalVar {
    pub kind: GlobalKind,
    pub name: String,
    pub class: Option<StorageClass>,
    pub ty: Type,
    pub init: Option<Expression>,
    pub decorations: Vec<VarDecoration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionParam {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub return_type: Type,
    pub body: Vec<Statement>,
}

/// The parsed module: exclusive owner of all AST nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub imports: Vec<Import>,
    pub entry_points: Vec<EntryPoint>,
    pub type_decls: Vec<TypeDecl>,
    pub globals: Vec<GlobalVar>,
    pub functions: Vec<Function>,
}

impl Module {
    /// Renders the module as WGSL-like text (a debugging/testing aid).
    pub fn to_wgsl_string(&self) -> String {
        let mut out = String::new();
        for import in &self.imports {
            let _ = writeln!(out, "import \"{}\" as {};", import.path, import.alias);
        }
        for ep in &self.entry_points {
            let _ = writeln!(out, "entry_point {} as \"{}\" = {};", ep.stage.name(), ep.name, ep.function);
        }
        for decl in &self.type_decls {
            match decl {
                TypeDecl::Alias { name, ty } => {
                    let _ = writeln!(out, "type {name} = {ty};");
                }
                TypeDecl::Struct(s) => {
                    if s.is_block {
                        let _ = writeln!(out, "[[block]]");
                    }
                    let _ = writeln!(out, "struct {} {{", s.name);
                    for member in &s.members {
                        let mut decos = String::new();
                        for deco in &member.decorations {
                            match deco {
                                MemberDecoration::Offset(n) => {
                                    let _ = write!(decos, "[[offset({n})]] ");
                                }
                            }
                        }
                        let _ = writeln!(out, "  {decos}{} : {};", member.name, member.ty);
                    }
                    let _ = writeln!(out, "}};");
                }
            }
        }
        for global in &self.globals {
            if !global.decorations.is_empty() {
                let decos = global
                    .decorations
                    .iter()
                    .map(|d| match d {
                        VarDecoration::Builtin(name) => format!("builtin({name})"),
                        VarDecoration::Location(n) => format!("location({n})"),
                        VarDecoration::Binding(n) => format!("binding({n})"),
                        VarDecoration::Group(n) => format!("group({n})"),
                        VarDecoration::ConstantId(n) => format!("constant_id({n})"),
                    })
                    .join(", ");
                let _ = write!(out, "[[{decos}]] ");
            }
            let keyword = match global.kind {
                GlobalKind::Var => "var",
                GlobalKind::Const => "let",
            };
            let _ = match global.class {
                Some(class) => write!(out, "{keyword}<{}> {}", class.name(), global.name),
                None => write!(out, "{keyword} {}", global.name),
            };
            let _ = write!(out, " : {}", global.ty);
            if let Some(init) = &global.init {
                let _ = write!(out, " = {init}");
            }
            let _ = writeln!(out, ";");
        }
        for function in &self.functions {
            let params: Vec<String> =
                function.params.iter().map(|p| format!("{} : {}", p.name, p.ty)).collect();
            let _ = writeln!(
                out,
                "fn {}({}) -> {} {{",
                function.name,
                params.join(", "),
                function.return_type
            );
            write_statements(&mut out, &function.body, 1);
            let _ = writeln!(out, "}}");
        }
        out
    }
}

fn write_statements(out: &mut String, statements: &[Statement], depth: usize) {
    let indent = "  ".repeat(depth);
    for statement in statements {
        match statement {
            Statement::VarDecl { kind, name, ty, init } => {
                let keyword = match kind {
                    VarDeclKind::Var => "var",
                    VarDeclKind::Let => "let",
                };
                let _ = write!(out, "{indent}{keyword} {name}");
                if let Some(ty) = ty {
                    let _ = write!(out, " : {ty}");
                }
                if let Some(init) = init {
                    let _ = write!(out, " = {init}");
                }
                let _ = writeln!(out, ";");
            }
            Statement::Assign { lhs, rhs } => {
                let _ = writeln!(out, "{indent}{lhs} = {rhs};");
            }
            Statement::Call { function, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                let _ = writeln!(out, "{indent}{function}({});", args.join(", "));
            }
            Statement::If { condition, then_body, else_body } => {
                let _ = writeln!(out, "{indent}if ({condition}) {{");
                write_statements(out, then_body, depth + 1);
                if else_body.is_empty() {
                    let _ = writeln!(out, "{indent}}}");
                } else {
                    let _ = writeln!(out, "{indent}}} else {{");
                    write_statements(out, else_body, depth + 1);
                    let _ = writeln!(out, "{indent}}}");
                }
            }
            Statement::Switch { selector, cases } => {
                let _ = writeln!(out, "{indent}switch ({selector}) {{");
                for case in cases {
                    let mut label = String::new();
                    if !case.selectors.is_empty() {
                        let values: Vec<String> =
                            case.selectors.iter().map(|v| v.to_string()).collect();
                        label.push_str(&format!("case {}", values.join(", ")));
                        if case.is_default {
                            label.push_str(", default");
                        }
                    } else {
                        label.push_str("default");
                    }
                    let _ = writeln!(out, "{indent}  {label}: {{");
                    write_statements(out, &case.body, depth + 2);
                    let _ = writeln!(out, "{indent}  }}");
                }
                let _ = writeln!(out, "{indent}}}");
            }
            Statement::Loop { body, continuing } => {
                let _ = writeln!(out, "{indent}loop {{");
                write_statements(out, body, depth + 1);
                if !continuing.is_empty() {
                    let _ = writeln!(out, "{indent}  continuing {{");
                    write_statements(out, continuing, depth + 2);
                    let _ = writeln!(out, "{indent}  }}");
                }
                let _ = writeln!(out, "{indent}}}");
            }
            Statement::Break => {
                let _ = writeln!(out, "{indent}break;");
            }
            Statement::Continue => {
                let _ = writeln!(out, "{indent}continue;");
            }
            Statement::Fallthrough => {
                let _ = writeln!(out, "{indent}fallthrough;");
            }
            Statement::Return { value } => {
                let _ = match value {
                    Some(value) => writeln!(out, "{indent}return {value};"),
                    None => writeln!(out, "{indent}return;"),
                };
            }
            Statement::Kill => {
                let _ = writeln!(out, "{indent}discard;");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_display() {
        assert_eq!(Type::vector(Type::F32, 4).to_string(), "vec4<f32>");
        assert_eq!(
            Type::Array { elem: Box::new(Type::U32), size: 2, stride: Some(8) }.to_string(),
            "[[stride(8)]] array<u32, 2>"
        );
        assert_eq!(
            Type::Texture(TextureType::Storage {
                dim: TextureDim::D2,
                format: ImageFormat::Rgba32Float,
                access: AccessMode::Write,
            })
            .to_string(),
            "texture_storage_2d<rgba32float, write>"
        );
        assert_eq!(Type::Texture(TextureType::Depth { dim: TextureDim::D2Array }).to_string(), "texture_depth_2d_array");
    }

    #[test]
    fn expression_display() {
        let expr = Expression::bitcast(
            Type::U32,
            Expression::binary(
                BinaryOp::Divide,
                Expression::Literal(Literal::I32(30)),
                Expression::Literal(Literal::I32(40)),
            ),
        );
        assert_eq!(expr.to_string(), "bitcast<u32>((30 / 40))");
    }

    #[test]
    fn float_literals_keep_a_decimal_point() {
        assert_eq!(Literal::F32(1.0).to_string(), "1.0");
        assert_eq!(Literal::F32(0.25).to_string(), "0.25");
    }

    #[test]
    fn statement_writer_shapes() {
        let mut out = String::new();
        write_statements(
            &mut out,
            &[Statement::Loop {
                body: vec![Statement::If {
                    condition: Expression::ident("x_cond"),
                    then_body: vec![Statement::Break],
                    else_body: vec![],
                }],
                continuing: vec![Statement::Assign {
                    lhs: Expression::ident("i"),
                    rhs: Expression::binary(
                        BinaryOp::Add,
                        Expression::ident("i"),
                        Expression::Literal(Literal::I32(1)),
                    ),
                }],
            }],
            0,
        );
        let expected = "loop {\n  if (x_cond) {\n    break;\n  }\n  continuing {\n    i = (i + 1);\n  }\n}\n";
        assert_eq!(out, expected);
    }
}
