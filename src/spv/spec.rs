//! SPIR-V binary-level definitions: opcodes, enums, and well-known tables.
//!
//! Only the subset of the SPIR-V grammar that the reader consumes is
//! represented. Everything here is a plain Rust enum with the binary
//! discriminant spelled out, so a `match` over one of these types is the
//! dispatch table for that operand kind: every value either has an arm, or
//! falls into the explicit unknown/unsupported arm.

/// SPIR-V magic number (first word of a module in native endianness).
pub const MAGIC: u32 = 0x0723_0203;

/// Word index of the ID bound in the module header.
pub const HEADER_LEN: usize = 5;

/// SPIR-V opcodes understood by the reader.
///
/// The numeric values are the opcode words from the SPIR-V specification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Op {
    Nop = 0,
    Undef = 1,
    SourceContinued = 2,
    Source = 3,
    SourceExtension = 4,
    Name = 5,
    MemberName = 6,
    String = 7,
    Line = 8,
    Extension = 10,
    ExtInstImport = 11,
    ExtInst = 12,
    MemoryModel = 14,
    EntryPoint = 15,
    ExecutionMode = 16,
    Capability = 17,

    TypeVoid = 19,
    TypeBool = 20,
    TypeInt = 21,
    TypeFloat = 22,
    TypeVector = 23,
    TypeMatrix = 24,
    TypeImage = 25,
    TypeSampler = 26,
    TypeSampledImage = 27,
    TypeArray = 28,
    TypeRuntimeArray = 29,
    TypeStruct = 30,
    TypePointer = 32,
    TypeFunction = 33,

    ConstantTrue = 41,
    ConstantFalse = 42,
    Constant = 43,
    ConstantComposite = 44,
    ConstantNull = 46,
    SpecConstantTrue = 48,
    SpecConstantFalse = 49,
    SpecConstant = 50,
    SpecConstantComposite = 51,
    SpecConstantOp = 52,

    Function = 54,
    FunctionParameter = 55,
    FunctionEnd = 56,
    FunctionCall = 57,

    Variable = 59,
    Load = 61,
    Store = 62,
    CopyMemory = 63,
    AccessChain = 65,
    InBoundsAccessChain = 66,
    PtrAccessChain = 67,
    ArrayLength = 68,
    InBoundsPtrAccessChain = 70,

    Decorate = 71,
    MemberDecorate = 72,
    DecorationGroup = 73,
    GroupDecorate = 74,
    GroupMemberDecorate = 75,

    VectorExtractDynamic = 77,
    VectorInsertDynamic = 78,
    VectorShuffle = 79,
    CompositeConstruct = 80,
    CompositeExtract = 81,
    CompositeInsert = 82,
    CopyObject = 83,
    Transpose = 84,

    SampledImage = 86,
    ImageSampleImplicitLod = 87,
    ImageSampleExplicitLod = 88,
    ImageSampleDrefImplicitLod = 89,
    ImageSampleDrefExplicitLod = 90,
    ImageSampleProjImplicitLod = 91,
    ImageSampleProjExplicitLod = 92,
    ImageSampleProjDrefImplicitLod = 93,
    ImageSampleProjDrefExplicitLod = 94,
    ImageFetch = 95,
    ImageGather = 96,
    ImageDrefGather = 97,
    ImageRead = 98,
    ImageWrite = 99,
    Image = 100,
    ImageQuerySizeLod = 103,
    ImageQuerySize = 104,
    ImageQueryLod = 105,
    ImageQueryLevels = 106,
    ImageQuerySamples = 107,

    ConvertFToU = 109,
    ConvertFToS = 110,
    ConvertSToF = 111,
    ConvertUToF = 112,
    UConvert = 113,
    SConvert = 114,
    FConvert = 115,
    Bitcast = 124,

    SNegate = 126,
    FNegate = 127,
    IAdd = 128,
    FAdd = 129,
    ISub = 130,
    FSub = 131,
    IMul = 132,
    FMul = 133,
    UDiv = 134,
    SDiv = 135,
    FDiv = 136,
    UMod = 137,
    SRem = 138,
    SMod = 139,
    FRem = 140,
    FMod = 141,
    VectorTimesScalar = 142,
    MatrixTimesScalar = 143,
    VectorTimesMatrix = 144,
    MatrixTimesVector = 145,
    MatrixTimesMatrix = 146,
    Dot = 148,

    Any = 154,
    All = 155,
    IsNan = 156,
    IsInf = 157,

    LogicalEqual = 164,
    LogicalNotEqual = 165,
    LogicalOr = 166,
    LogicalAnd = 167,
    LogicalNot = 168,
    Select = 169,
    IEqual = 170,
    INotEqual = 171,
    UGreaterThan = 172,
    SGreaterThan = 173,
    UGreaterThanEqual = 174,
    SGreaterThanEqual = 175,
    ULessThan = 176,
    SLessThan = 177,
    ULessThanEqual = 178,
    SLessThanEqual = 179,
    FOrdEqual = 180,
    FUnordEqual = 181,
    FOrdNotEqual = 182,
    FUnordNotEqual = 183,
    FOrdLessThan = 184,
    FUnordLessThan = 185,
    FOrdGreaterThan = 186,
    FUnordGreaterThan = 187,
    FOrdLessThanEqual = 188,
    FUnordLessThanEqual = 189,
    FOrdGreaterThanEqual = 190,
    FUnordGreaterThanEqual = 191,

    ShiftRightLogical = 194,
    ShiftRightArithmetic = 195,
    ShiftLeftLogical = 196,
    BitwiseOr = 197,
    BitwiseXor = 198,
    BitwiseAnd = 199,
    Not = 200,
    BitReverse = 204,
    BitCount = 205,

    Phi = 245,
    LoopMerge = 246,
    SelectionMerge = 247,
    Label = 248,
    Branch = 249,
    BranchConditional = 250,
    Switch = 251,
    Kill = 252,
    Return = 253,
    ReturnValue = 254,
    Unreachable = 255,

    NoLine = 317,
}

impl Op {
    pub fn from_u16(word: u16) -> Option<Self> {
        use Op::*;
        Some(match word {
            0 => Nop,
            1 => Undef,
            2 => SourceContinued,
            3 => Source,
            4 => SourceExtension,
            5 => Name,
            6 => MemberName,
            7 => String,
            8 => Line,
            10 => Extension,
            11 => ExtInstImport,
            12 => ExtInst,
            14 => MemoryModel,
            15 => EntryPoint,
            16 => ExecutionMode,
            17 => Capability,
            19 => TypeVoid,
            20 => TypeBool,
            21 => TypeInt,
            22 => TypeFloat,
            23 => TypeVector,
            24 => TypeMatrix,
            25 => TypeImage,
            26 => TypeSampler,
            27 => TypeSampledImage,
            28 => TypeArray,
            29 => TypeRuntimeArray,
            30 => TypeStruct,
            32 => TypePointer,
            33 => TypeFunction,
            41 => ConstantTrue,
            42 => ConstantFalse,
            43 => Constant,
            44 => ConstantComposite,
            46 => ConstantNull,
            48 => SpecConstantTrue,
            49 => SpecConstantFalse,
            50 => SpecConstant,
            51 => SpecConstantComposite,
            52 => SpecConstantOp,
            54 => Function,
            55 => FunctionParameter,
            56 => FunctionEnd,
            57 => FunctionCall,
            59 => Variable,
            61 => Load,
            62 => Store,
            63 => CopyMemory,
            65 => AccessChain,
            66 => InBoundsAccessChain,
            67 => PtrAccessChain,
            68 => ArrayLength,
            70 => InBoundsPtrAccessChain,
            71 => Decorate,
            72 => MemberDecorate,
            73 => DecorationGroup,
            74 => GroupDecorate,
            75 => GroupMemberDecorate,
            77 => VectorExtractDynamic,
            78 => VectorInsertDynamic,
            79 => VectorShuffle,
            80 => CompositeConstruct,
            81 => CompositeExtract,
            82 => CompositeInsert,
            83 => CopyObject,
            84 => Transpose,
            86 => SampledImage,
            87 => ImageSampleImplicitLod,
            88 => ImageSampleExplicitLod,
            89 => ImageSampleDrefImplicitLod,
            90 => ImageSampleDrefExplicitLod,
            91 => ImageSampleProjImplicitLod,
            92 => ImageSampleProjExplicitLod,
            93 => ImageSampleProjDrefImplicitLod,
            94 => ImageSampleProjDrefExplicitLod,
            95 => ImageFetch,
            96 => ImageGather,
            97 => ImageDrefGather,
            98 => ImageRead,
            99 => ImageWrite,
            100 => Image,
            103 => ImageQuerySizeLod,
            104 => ImageQuerySize,
            105 => ImageQueryLod,
            106 => ImageQueryLevels,
            107 => ImageQuerySamples,
            109 => ConvertFToU,
            110 => ConvertFToS,
            111 => ConvertSToF,
            112 => ConvertUToF,
            113 => UConvert,
            114 => SConvert,
            115 => FConvert,
            124 => Bitcast,
            126 => SNegate,
            127 => FNegate,
            128 => IAdd,
            129 => FAdd,
            130 => ISub,
            131 => FSub,
            132 => IMul,
            133 => FMul,
            134 => UDiv,
            135 => SDiv,
            136 => FDiv,
            137 => UMod,
            138 => SRem,
            139 => SMod,
            140 => FRem,
            141 => FMod,
            142 => VectorTimesScalar,
            143 => MatrixTimesScalar,
            144 => VectorTimesMatrix,
            145 => MatrixTimesVector,
            146 => MatrixTimesMatrix,
            148 => Dot,
            154 => Any,
            155 => All,
            156 => IsNan,
            157 => IsInf,
            164 => LogicalEqual,
            165 => LogicalNotEqual,
            166 => LogicalOr,
            167 => LogicalAnd,
            168 => LogicalNot,
            169 => Select,
            170 => IEqual,
            171 => INotEqual,
            172 => UGreaterThan,
            173 => SGreaterThan,
            174 => UGreaterThanEqual,
            175 => SGreaterThanEqual,
            176 => ULessThan,
            177 => SLessThan,
            178 => ULessThanEqual,
            179 => SLessThanEqual,
            180 => FOrdEqual,
            181 => FUnordEqual,
            182 => FOrdNotEqual,
            183 => FUnordNotEqual,
            184 => FOrdLessThan,
            185 => FUnordLessThan,
            186 => FOrdGreaterThan,
            187 => FUnordGreaterThan,
            188 => FOrdLessThanEqual,
            189 => FUnordLessThanEqual,
            190 => FOrdGreaterThanEqual,
            191 => FUnordGreaterThanEqual,
            194 => ShiftRightLogical,
            195 => ShiftRightArithmetic,
            196 => ShiftLeftLogical,
            197 => BitwiseOr,
            198 => BitwiseXor,
            199 => BitwiseAnd,
            200 => Not,
            204 => BitReverse,
            205 => BitCount,
            245 => Phi,
            246 => LoopMerge,
            247 => SelectionMerge,
            248 => Label,
            249 => Branch,
            250 => BranchConditional,
            251 => Switch,
            252 => Kill,
            253 => Return,
            254 => ReturnValue,
            255 => Unreachable,
            317 => NoLine,
            _ => return None,
        })
    }

    /// Does an instruction with this opcode produce a result ID, and does it
    /// also carry a result type? Returns `(has_result_type, has_result_id)`.
    //
    // This is the minimal slice of the grammar the decoder needs in order to
    // split an instruction's words into (type, result, in-operands).
    pub fn result_shape(self) -> (bool, bool) {
        use Op::*;
        match self {
            // No result at all.
            Nop | SourceContinued | Source | SourceExtension | Name | MemberName | Line
            | Extension | MemoryModel | EntryPoint | ExecutionMode | Capability | FunctionEnd
            | Store | CopyMemory | Decorate | MemberDecorate | GroupDecorate
            | GroupMemberDecorate | ImageWrite | LoopMerge | SelectionMerge | Branch
            | BranchConditional | Switch | Kill | Return | ReturnValue | Unreachable | NoLine => {
                (false, false)
            }

            // Result ID without a result type.
            ExtInstImport | String | TypeVoid | TypeBool | TypeInt | TypeFloat | TypeVector
            | TypeMatrix | TypeImage | TypeSampler | TypeSampledImage | TypeArray
            | TypeRuntimeArray | TypeStruct | TypePointer | TypeFunction | Label
            | DecorationGroup => (false, true),

            // Everything else here has both.
            _ => (true, true),
        }
    }
}

/// SPIR-V storage classes the reader accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StorageClass {
    UniformConstant = 0,
    Input = 1,
    Uniform = 2,
    Output = 3,
    Workgroup = 4,
    Private = 6,
    Function = 7,
    PushConstant = 9,
    Image = 11,
    StorageBuffer = 12,
}

impl StorageClass {
    pub fn from_u32(word: u32) -> Option<Self> {
        use StorageClass::*;
        Some(match word {
            0 => UniformConstant,
            1 => Input,
            2 => Uniform,
            3 => Output,
            4 => Workgroup,
            6 => Private,
            7 => Function,
            9 => PushConstant,
            11 => Image,
            12 => StorageBuffer,
            _ => return None,
        })
    }
}

/// Decoration numbers (only the ones the reader looks at).
pub mod decoration {
    pub const SPEC_ID: u32 = 1;
    pub const BLOCK: u32 = 2;
    pub const BUFFER_BLOCK: u32 = 3;
    pub const ROW_MAJOR: u32 = 4;
    pub const COL_MAJOR: u32 = 5;
    pub const ARRAY_STRIDE: u32 = 6;
    pub const MATRIX_STRIDE: u32 = 7;
    pub const BUILTIN: u32 = 11;
    pub const FLAT: u32 = 14;
    pub const NON_WRITABLE: u32 = 24;
    pub const NON_READABLE: u32 = 25;
    pub const LOCATION: u32 = 30;
    pub const BINDING: u32 = 33;
    pub const DESCRIPTOR_SET: u32 = 34;
    pub const OFFSET: u32 = 35;
}

/// Execution models (shader stages).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ExecutionModel {
    Vertex = 0,
    Fragment = 4,
    GLCompute = 5,
}

impl ExecutionModel {
    pub fn from_u32(word: u32) -> Option<Self> {
        Some(match word {
            0 => Self::Vertex,
            4 => Self::Fragment,
            5 => Self::GLCompute,
            _ => return None,
        })
    }
}

/// Image dimensionalities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Dim {
    D1 = 0,
    D2 = 1,
    D3 = 2,
    Cube = 3,
}

impl Dim {
    pub fn from_u32(word: u32) -> Option<Self> {
        Some(match word {
            0 => Self::D1,
            1 => Self::D2,
            2 => Self::D3,
            3 => Self::Cube,
            _ => return None,
        })
    }
}

/// Image operand bitmask values (the optional trailing operands of image
/// instructions).
pub mod image_operands {
    pub const BIAS: u32 = 0x1;
    pub const LOD: u32 = 0x2;
    pub const GRAD: u32 = 0x4;
    pub const CONST_OFFSET: u32 = 0x8;
    pub const SAMPLE: u32 = 0x40;
}

/// Texel formats for storage images, as WGSL spells them.
///
/// `Unknown` is significant: an image type with an unknown format is a
/// sampled texture, never a storage texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Unknown,
    Rgba32Float,
    Rgba16Float,
    R32Float,
    Rgba8Unorm,
    Rgba8Snorm,
    Rg32Float,
    Rgba32Uint,
    Rgba16Uint,
    Rgba8Uint,
    R32Uint,
    Rg32Uint,
    Rgba32Sint,
    Rgba16Sint,
    Rgba8Sint,
    R32Sint,
    Rg32Sint,
}

impl ImageFormat {
    pub fn from_u32(word: u32) -> Option<Self> {
        use ImageFormat::*;
        Some(match word {
            0 => Unknown,
            1 => Rgba32Float,
            2 => Rgba16Float,
            3 => R32Float,
            4 => Rgba8Unorm,
            5 => Rgba8Snorm,
            6 => Rg32Float,
            21 => Rgba32Sint,
            22 => Rgba16Sint,
            23 => Rgba8Sint,
            24 => R32Sint,
            25 => Rg32Sint,
            30 => Rgba32Uint,
            31 => Rgba16Uint,
            32 => Rgba8Uint,
            33 => R32Uint,
            35 => Rg32Uint,
            _ => return None,
        })
    }

    /// The WGSL spelling of the format.
    pub fn wgsl_name(self) -> &'static str {
        use ImageFormat::*;
        match self {
            Unknown => "unknown",
            Rgba32Float => "rgba32float",
            Rgba16Float => "rgba16float",
            R32Float => "r32float",
            Rgba8Unorm => "rgba8unorm",
            Rgba8Snorm => "rgba8snorm",
            Rg32Float => "rg32float",
            Rgba32Uint => "rgba32uint",
            Rgba16Uint => "rgba16uint",
            Rgba8Uint => "rgba8uint",
            R32Uint => "r32uint",
            Rg32Uint => "rg32uint",
            Rgba32Sint => "rgba32sint",
            Rgba16Sint => "rgba16sint",
            Rgba8Sint => "rgba8sint",
            R32Sint => "r32sint",
            Rg32Sint => "rg32sint",
        }
    }

    /// Number of channels a texel of this format carries.
    pub fn channel_count(self) -> u32 {
        use ImageFormat::*;
        match self {
            Unknown => 0,
            R32Float | R32Uint | R32Sint => 1,
            Rg32Float | Rg32Uint | Rg32Sint => 2,
            Rgba32Float | Rgba16Float | Rgba8Unorm | Rgba8Snorm | Rgba32Uint | Rgba16Uint
            | Rgba8Uint | Rgba32Sint | Rgba16Sint | Rgba8Sint => 4,
        }
    }

    /// Scalar component class of a texel: 0 = float, 1 = unsigned, 2 = signed.
    pub fn component_class(self) -> u32 {
        use ImageFormat::*;
        match self {
            Unknown => 0,
            Rgba32Float | Rgba16Float | R32Float | Rgba8Unorm | Rgba8Snorm | Rg32Float => 0,
            Rgba32Uint | Rgba16Uint | Rgba8Uint | R32Uint | Rg32Uint => 1,
            Rgba32Sint | Rgba16Sint | Rgba8Sint | R32Sint | Rg32Sint => 2,
        }
    }
}

/// Well-known builtin numbers, mapped to WGSL builtin names.
pub fn builtin_wgsl_name(builtin: u32) -> Option<&'static str> {
    Some(match builtin {
        0 => "position",
        15 => "frag_coord",
        17 => "front_facing",
        22 => "frag_depth",
        24 => "num_workgroups",
        26 => "workgroup_id",
        27 => "local_invocation_id",
        28 => "global_invocation_id",
        29 => "local_invocation_index",
        42 => "vertex_index",
        43 => "instance_index",
        _ => return None,
    })
}

/// GLSL.std.450 extended instruction numbers, mapped to callable names.
///
/// The names are the lower-cased GLSL.std.450 spellings; the function
/// emitter qualifies them with the import alias (`std::glsl::sqrt`).
pub fn glsl_std_450_name(inst: u32) -> Option<&'static str> {
    Some(match inst {
        1 => "round",
        2 => "roundeven",
        3 => "trunc",
        4 => "fabs",
        5 => "sabs",
        6 => "fsign",
        7 => "ssign",
        8 => "floor",
        9 => "ceil",
        10 => "fract",
        11 => "radians",
        12 => "degrees",
        13 => "sin",
        14 => "cos",
        15 => "tan",
        16 => "asin",
        17 => "acos",
        18 => "atan",
        19 => "sinh",
        20 => "cosh",
        21 => "tanh",
        22 => "asinh",
        23 => "acosh",
        24 => "atanh",
        25 => "atan2",
        26 => "pow",
        27 => "exp",
        28 => "log",
        29 => "exp2",
        30 => "log2",
        31 => "sqrt",
        32 => "inversesqrt",
        33 => "determinant",
        34 => "matrixinverse",
        37 => "fmin",
        38 => "umin",
        39 => "smin",
        40 => "fmax",
        41 => "umax",
        42 => "smax",
        43 => "fclamp",
        44 => "uclamp",
        45 => "sclamp",
        46 => "fmix",
        48 => "step",
        49 => "smoothstep",
        50 => "fma",
        53 => "ldexp",
        66 => "length",
        67 => "distance",
        68 => "cross",
        69 => "normalize",
        70 => "faceforward",
        71 => "reflect",
        72 => "refract",
        79 => "nmin",
        80 => "nmax",
        81 => "nclamp",
        _ => return None,
    })
}

/// Does the given GLSL.std.450 instruction assume signed integer operands?
pub fn glsl_assumes_signed_operands(inst: u32) -> bool {
    matches!(inst, 5 | 7 | 39 | 42 | 45)
}

/// Does the given GLSL.std.450 instruction assume unsigned integer operands?
pub fn glsl_assumes_unsigned_operands(inst: u32) -> bool {
    matches!(inst, 38 | 41 | 44)
}
