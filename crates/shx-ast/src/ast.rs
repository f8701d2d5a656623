//! The abstract syntax tree of a type-resolved HLSL translation unit.
//!
//! Ownership is strictly tree-shaped: the [`Program`] owns its declaration
//! arenas and the global statement list; statements own their child
//! statements and expressions. All cross-references (symbol references,
//! resolved call targets, struct bases, forward declarations) are non-owning
//! [`Handle`]s, so back-edges never create shared ownership.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use bitflags::bitflags;

use crate::arena::{Arena, Handle};
use crate::intrinsic::{Intrinsic, IntrinsicUsage};
use crate::report::{Error, SourceArea};
use crate::semantic::IndexedSemantic;
use crate::ty::{
    BufferType, DataType, RegisterType, SamplerType, TypeDenoter, UniformBufferType,
};

bitflags! {
    /// Flags shared by all node kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u32 {
        /// Reachable from the entry point (set by the reference analyzer).
        const REACHABLE = 1 << 0;
        /// Dead code after an unconditional return path.
        const DEAD_CODE = 1 << 1;
        /// Synthesized during conversion, not part of the source program.
        const BUILT_IN = 1 << 2;
        /// Skipped by the code generator (no GLSL equivalent).
        const DISABLE_CODEGEN = 1 << 3;
        /// Already processed by the converter.
        const WAS_CONVERTED = 1 << 4;
    }
}

bitflags! {
    /// Flags specific to variable declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VarFlags: u32 {
        const SHADER_INPUT = 1 << 0;
        const SHADER_OUTPUT = 1 << 1;
        const SYSTEM_VALUE = 1 << 2;
        const WRITTEN_TO = 1 << 3;
        const ENTRY_POINT_OUTPUT = 1 << 4;
        const ENTRY_POINT_LOCAL = 1 << 5;
    }
}

bitflags! {
    /// Flags specific to structure declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StructFlags: u32 {
        const SHADER_INPUT = 1 << 0;
        const SHADER_OUTPUT = 1 << 1;
        const NESTED = 1 << 2;
        /// Also used as a parameter/variable type outside the entry point.
        const NON_ENTRY_POINT_PARAM = 1 << 3;
    }
}

bitflags! {
    /// Flags specific to function declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FunctionFlags: u32 {
        const ENTRY_POINT = 1 << 0;
        const SECONDARY_ENTRY_POINT = 1 << 1;
        const MEMBER = 1 << 2;
    }
}

/// Pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderTarget {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderTarget {
    /// The conventional output file extension (`vert`, `frag`, ...).
    pub fn file_ext(self) -> &'static str {
        match self {
            ShaderTarget::Vertex => "vert",
            ShaderTarget::TessControl => "tesc",
            ShaderTarget::TessEvaluation => "tese",
            ShaderTarget::Geometry => "geom",
            ShaderTarget::Fragment => "frag",
            ShaderTarget::Compute => "comp",
        }
    }
}

impl fmt::Display for ShaderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderTarget::Vertex => "vertex shader",
            ShaderTarget::TessControl => "tessellation-control shader",
            ShaderTarget::TessEvaluation => "tessellation-evaluation shader",
            ShaderTarget::Geometry => "geometry shader",
            ShaderTarget::Fragment => "fragment shader",
            ShaderTarget::Compute => "compute shader",
        };
        write!(f, "{name}")
    }
}

/* ----- Operators ----- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinaryOp {
    LogicalAnd,
    LogicalOr,
    Or,
    Xor,
    And,
    LShift,
    RShift,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::And => "&",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_compare(self) -> bool {
        (BinaryOp::Equal..=BinaryOp::GreaterEqual).contains(&self)
    }

    /// Logical or comparison operators, whose result type is boolean.
    pub fn is_boolean(self) -> bool {
        self.is_logical() || self.is_compare()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    LogicalNot,
    Not,
    Nop,
    Negate,
    Inc,
    Dec,
}

impl UnaryOp {
    pub fn token(self) -> &'static str {
        match self {
            UnaryOp::LogicalNot => "!",
            UnaryOp::Not => "~",
            UnaryOp::Nop => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LShift,
    RShift,
    Or,
    And,
    Xor,
}

impl AssignOp {
    pub fn token(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::LShift => "<<=",
            AssignOp::RShift => ">>=",
            AssignOp::Or => "|=",
            AssignOp::And => "&=",
            AssignOp::Xor => "^=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtrlTransfer {
    Break,
    Continue,
    Discard,
}

impl CtrlTransfer {
    pub fn keyword(self) -> &'static str {
        match self {
            CtrlTransfer::Break => "break",
            CtrlTransfer::Continue => "continue",
            CtrlTransfer::Discard => "discard",
        }
    }
}

/* ----- Modifiers ----- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageClass {
    Extern,
    Precise,
    Shared,
    GroupShared,
    Static,
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterpModifier {
    NoInterpolation,
    Linear,
    Centroid,
    NoPerspective,
    Sample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeModifier {
    Const,
    RowMajor,
    ColumnMajor,
    Snorm,
    Unorm,
}

/// A type together with its declaration modifiers.
#[derive(Debug, Clone, Default)]
pub struct TypeSpecifier {
    pub denoter: TypeDenoter,
    pub is_input: bool,
    pub is_output: bool,
    pub is_uniform: bool,
    pub storage_classes: BTreeSet<StorageClass>,
    pub interp_modifiers: BTreeSet<InterpModifier>,
    pub type_modifiers: BTreeSet<TypeModifier>,
}

impl TypeSpecifier {
    pub fn new(denoter: TypeDenoter) -> Self {
        Self {
            denoter,
            ..Self::default()
        }
    }

    pub fn is_const(&self) -> bool {
        self.type_modifiers.contains(&TypeModifier::Const)
    }

    pub fn is_const_or_uniform(&self) -> bool {
        self.is_const() || self.is_uniform
    }
}

impl Default for TypeDenoter {
    fn default() -> Self {
        TypeDenoter::Void
    }
}

/* ----- Attributes and registers ----- */

/// Statement attribute (`[numthreads(x,y,z)]`, `[unroll]`, ...).
#[derive(Debug, Clone)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub args: Vec<Expr>,
    pub flags: NodeFlags,
    pub area: SourceArea,
}

impl Attribute {
    pub fn new(kind: AttributeKind, args: Vec<Expr>) -> Self {
        Self {
            kind,
            args,
            flags: NodeFlags::default(),
            area: SourceArea::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    NumThreads,
    EarlyDepthStencil,
    Unroll,
    Loop,
    Branch,
    Flatten,
    Domain,
    Partitioning,
    OutputTopology,
    OutputControlPoints,
    PatchConstantFunc,
    MaxTessFactor,
    MaxVertexCount,
    Unknown(String),
}

/// `register(bN|tN|sN|uN)` slot declaration, optionally profile-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSlot {
    pub register_type: RegisterType,
    pub slot: u32,
    /// Restricts the register to one target; `None` affects all targets.
    pub target: Option<ShaderTarget>,
}

impl RegisterSlot {
    pub fn new(register_type: RegisterType, slot: u32) -> Self {
        Self {
            register_type,
            slot,
            target: None,
        }
    }

    /// Returns the first slot applying to `target`.
    pub fn for_target(slots: &[RegisterSlot], target: ShaderTarget) -> Option<&RegisterSlot> {
        slots
            .iter()
            .find(|slot| slot.target.is_none() || slot.target == Some(target))
    }
}

/* ----- Type cache ----- */

/// Lazily memoized type denoter slot of a typed node.
///
/// Derivation is free of side effects apart from populating the slot;
/// mutation passes invalidate through [`TypeCache::reset`].
#[derive(Debug, Clone, Default)]
pub struct TypeCache(RefCell<Option<TypeDenoter>>);

impl TypeCache {
    pub fn get_or_derive(
        &self,
        derive: impl FnOnce() -> Result<TypeDenoter, Error>,
    ) -> Result<TypeDenoter, Error> {
        if let Some(cached) = self.0.borrow().clone() {
            return Ok(cached);
        }
        let derived = derive()?;
        *self.0.borrow_mut() = Some(derived.clone());
        Ok(derived)
    }

    pub fn cached(&self) -> Option<TypeDenoter> {
        self.0.borrow().clone()
    }

    pub fn reset(&self) {
        *self.0.borrow_mut() = None;
    }
}

/* ----- Expressions ----- */

/// A reference to the declaration an identifier resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolRef {
    Var(Handle<VarDecl>),
    Buffer(Handle<BufferDecl>),
    Sampler(Handle<SamplerDecl>),
    Struct(Handle<StructDecl>),
    Function(Handle<FunctionDecl>),
}

/// Dot-separated identifier chain (`input.position.xyz`).
///
/// Each link carries its own array indices; links without a symbol reference
/// are member accesses or vector/matrix subscripts resolved against the
/// preceding link's type.
#[derive(Debug, Clone)]
pub struct VarIdent {
    pub ident: String,
    pub array_indices: Vec<Expr>,
    pub symbol: Option<SymbolRef>,
    pub next: Option<Box<VarIdent>>,
    pub area: SourceArea,
}

impl VarIdent {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            array_indices: Vec::new(),
            symbol: None,
            next: None,
            area: SourceArea::default(),
        }
    }

    pub fn with_symbol(ident: impl Into<String>, symbol: SymbolRef) -> Self {
        Self {
            symbol: Some(symbol),
            ..Self::new(ident)
        }
    }

    /// Returns the last link of the chain.
    pub fn last(&self) -> &VarIdent {
        let mut link = self;
        while let Some(next) = link.next.as_deref() {
            link = next;
        }
        link
    }

    /// The full dot-separated spelling, used in diagnostics.
    pub fn full_name(&self) -> String {
        let mut name = self.ident.clone();
        let mut link = self;
        while let Some(next) = link.next.as_deref() {
            name.push('.');
            name.push_str(&next.ident);
            link = next;
        }
        name
    }

    /// Removes the first link, promoting the second one, and accumulates the
    /// removed link's array indices onto it.
    pub fn pop_front(&mut self) {
        if let Some(next) = self.next.take() {
            let mut indices = std::mem::take(&mut self.array_indices);
            let next = *next;
            indices.extend(next.array_indices);
            self.ident = next.ident;
            self.symbol = next.symbol;
            self.next = next.next;
            self.area = next.area;
            self.array_indices = indices;
        }
    }
}

/// A variable access, optionally with an assignment.
#[derive(Debug, Clone)]
pub struct VarAccess {
    pub ident: VarIdent,
    pub assign_op: Option<AssignOp>,
    pub assign_expr: Option<Box<Expr>>,
}

/// A named function call, an intrinsic call or a type constructor.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    /// Call name; `None` for type constructors like `float4(...)`.
    pub name: Option<VarIdent>,
    /// Constructed type; `None` unless this is a type constructor.
    pub constructor: Option<TypeDenoter>,
    /// Resolved function implementation (never a forward declaration).
    pub func: Option<Handle<FunctionDecl>>,
    /// Intrinsic identity, if this call is an intrinsic.
    pub intrinsic: Option<Intrinsic>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Placeholder expression (dynamic array dimensions).
    Null,
    Literal {
        data_type: DataType,
        value: String,
    },
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    PostUnary {
        expr: Box<Expr>,
        op: UnaryOp,
    },
    Call(FunctionCall),
    /// Source-level parenthesised expression.
    Bracket(Box<Expr>),
    /// Member access on a non-identifier expression (`foo().bar`).
    Suffix {
        expr: Box<Expr>,
        ident: VarIdent,
    },
    ArrayAccess {
        expr: Box<Expr>,
        indices: Vec<Expr>,
    },
    Cast {
        to: TypeDenoter,
        expr: Box<Expr>,
    },
    Var(VarAccess),
    InitializerList(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub area: SourceArea,
    pub flags: NodeFlags,
    pub ty: TypeCache,
}

impl Expr {
    pub fn new(kind: ExprKind, area: SourceArea) -> Self {
        Self {
            kind,
            area,
            flags: NodeFlags::default(),
            ty: TypeCache::default(),
        }
    }

    /// A node created during conversion, with no source position.
    pub fn synthesized(kind: ExprKind) -> Self {
        let mut expr = Self::new(kind, SourceArea::default());
        expr.flags |= NodeFlags::BUILT_IN;
        expr
    }

    /// Returns the variable identifier if this is a plain variable access
    /// (possibly bracketed).
    pub fn var_ident(&self) -> Option<&VarIdent> {
        match &self.kind {
            ExprKind::Var(access) => Some(&access.ident),
            ExprKind::Bracket(inner) => inner.var_ident(),
            _ => None,
        }
    }
}

/* ----- Statements ----- */

#[derive(Debug, Clone, Default)]
pub struct CodeBlock {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` marks the `default` case.
    pub expr: Option<Expr>,
    pub stmts: Vec<Stmt>,
    pub area: SourceArea,
}

/// One `T a, b, c;` statement; the variables share one type specifier.
#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub vars: Vec<Handle<VarDecl>>,
}

#[derive(Debug, Clone)]
pub struct BufferDeclStmt {
    pub decls: Vec<Handle<BufferDecl>>,
}

#[derive(Debug, Clone)]
pub struct SamplerDeclStmt {
    pub decls: Vec<Handle<SamplerDecl>>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Null,
    Block(CodeBlock),
    VarDecl(VarDeclStmt),
    BufferDecls(BufferDeclStmt),
    SamplerDecls(SamplerDeclStmt),
    Struct(Handle<StructDecl>),
    Alias(Vec<Handle<AliasDecl>>),
    Function(Handle<FunctionDecl>),
    UniformBuffer(Handle<UniformBufferDecl>),
    For {
        init: Box<Stmt>,
        condition: Option<Expr>,
        iteration: Option<Expr>,
        body: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    If {
        condition: Expr,
        body: Box<Stmt>,
        /// `else` branch; an `else if` cascade nests another `If` here.
        else_branch: Option<Box<Stmt>>,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Expr(Expr),
    Return {
        expr: Option<Expr>,
    },
    CtrlTransfer(CtrlTransfer),
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub area: SourceArea,
    pub flags: NodeFlags,
    pub attribs: Vec<Attribute>,
    /// Optional commentary carried over from the source.
    pub comment: Option<String>,
}

impl Stmt {
    pub fn new(kind: StmtKind, area: SourceArea) -> Self {
        Self {
            kind,
            area,
            flags: NodeFlags::default(),
            attribs: Vec::new(),
            comment: None,
        }
    }

    pub fn synthesized(kind: StmtKind) -> Self {
        let mut stmt = Self::new(kind, SourceArea::default());
        stmt.flags |= NodeFlags::BUILT_IN;
        stmt
    }
}

/* ----- Declarations ----- */

/// `packoffset(...)` annotation on a constant-buffer member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOffset {
    pub register_name: String,
    pub vector_component: Option<char>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub ident: String,
    pub type_spec: TypeSpecifier,
    /// Array dimension sizes; zero means a dynamic dimension.
    pub array_dims: Vec<u32>,
    pub semantic: Option<IndexedSemantic>,
    pub pack_offset: Option<PackOffset>,
    /// DX9-era annotations; ignored by analyzers and generators.
    pub annotations: Vec<Stmt>,
    pub initializer: Option<Expr>,
    pub flags: NodeFlags,
    pub var_flags: VarFlags,
    pub area: SourceArea,
    /// Containing structure, for members.
    pub struct_decl: Option<Handle<StructDecl>>,
    /// Containing constant buffer, for buffer members.
    pub uniform_buffer: Option<Handle<UniformBufferDecl>>,
    pub ty: TypeCache,
}

impl VarDecl {
    pub fn new(ident: impl Into<String>, type_spec: TypeSpecifier) -> Self {
        Self {
            ident: ident.into(),
            type_spec,
            array_dims: Vec::new(),
            semantic: None,
            pack_offset: None,
            annotations: Vec::new(),
            initializer: None,
            flags: NodeFlags::default(),
            var_flags: VarFlags::default(),
            area: SourceArea::default(),
            struct_decl: None,
            uniform_buffer: None,
            ty: TypeCache::default(),
        }
    }

    pub fn has_system_value_semantic(&self) -> bool {
        self.semantic
            .as_ref()
            .is_some_and(|sem| sem.is_system_value())
    }
}

/// Texture or buffer object declaration.
#[derive(Debug, Clone)]
pub struct BufferDecl {
    pub ident: String,
    pub buffer_type: BufferType,
    /// Element type of structured/typed buffers.
    pub elem: Option<TypeDenoter>,
    pub array_dims: Vec<u32>,
    pub slot_registers: Vec<RegisterSlot>,
    pub flags: NodeFlags,
    pub area: SourceArea,
}

/// Sampler state declaration.
#[derive(Debug, Clone)]
pub struct SamplerDecl {
    pub ident: String,
    pub sampler_type: SamplerType,
    pub slot_registers: Vec<RegisterSlot>,
    /// DX9-style state value assignments; disabled for code generation.
    pub sampler_values: Vec<SamplerValue>,
    pub flags: NodeFlags,
    pub area: SourceArea,
}

/// One DX9-style sampler state assignment (`MipFilter = LINEAR;`).
#[derive(Debug, Clone)]
pub struct SamplerValue {
    pub name: String,
    pub value: Expr,
    pub flags: NodeFlags,
    pub area: SourceArea,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    /// Declared name; empty for anonymous structures.
    pub ident: String,
    pub base_struct: Option<Handle<StructDecl>>,
    pub members: Vec<Handle<VarDecl>>,
    pub methods: Vec<Handle<FunctionDecl>>,
    /// Instance name generated for the interface block form.
    pub alias_name: String,
    pub flags: NodeFlags,
    pub struct_flags: StructFlags,
    pub area: SourceArea,
}

impl StructDecl {
    pub fn is_anonymous(&self) -> bool {
        self.ident.is_empty()
    }

    pub fn is_shader_io(&self) -> bool {
        self.struct_flags
            .intersects(StructFlags::SHADER_INPUT | StructFlags::SHADER_OUTPUT)
    }
}

/// Type alias (`typedef`) declaration.
#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub ident: String,
    pub denoter: TypeDenoter,
    pub flags: NodeFlags,
    pub area: SourceArea,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub ident: String,
    pub return_type: TypeSpecifier,
    pub semantic: Option<IndexedSemantic>,
    /// Parameters; each is a single-variable declaration.
    pub parameters: Vec<Handle<VarDecl>>,
    /// `None` for forward declarations.
    pub body: Option<CodeBlock>,
    pub attribs: Vec<Attribute>,
    pub flags: NodeFlags,
    pub fn_flags: FunctionFlags,
    pub area: SourceArea,
    /// Implementation, for forward declarations.
    pub impl_decl: Option<Handle<FunctionDecl>>,
    /// All forward declarations, for implementations.
    pub forward_decls: Vec<Handle<FunctionDecl>>,
    /// Containing structure, for member functions.
    pub struct_decl: Option<Handle<StructDecl>>,
}

impl FunctionDecl {
    pub fn is_forward_decl(&self) -> bool {
        self.body.is_none()
    }

    pub fn has_void_return_type(&self) -> bool {
        self.return_type.denoter.is_void()
    }

    pub fn is_entry_point(&self) -> bool {
        self.fn_flags.contains(FunctionFlags::ENTRY_POINT)
    }
}

/// Constant buffer (`cbuffer`/`tbuffer`) declaration.
#[derive(Debug, Clone)]
pub struct UniformBufferDecl {
    pub ident: String,
    pub buffer_type: UniformBufferType,
    pub slot_registers: Vec<RegisterSlot>,
    pub members: Vec<Handle<VarDecl>>,
    pub flags: NodeFlags,
    pub area: SourceArea,
}

/* ----- Per-stage layout metadata ----- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue {
    DomainTri,
    DomainQuad,
    DomainIsoline,
    OutputTopologyPoint,
    OutputTopologyLine,
    OutputTopologyTriangleCw,
    OutputTopologyTriangleCcw,
    PartitioningInteger,
    PartitioningPow2,
    PartitioningFractionalEven,
    PartitioningFractionalOdd,
}

impl AttributeValue {
    /// Parses a `[domain(...)]` attribute argument.
    pub fn domain(value: &str) -> Option<AttributeValue> {
        match value {
            "tri" => Some(AttributeValue::DomainTri),
            "quad" => Some(AttributeValue::DomainQuad),
            "isoline" => Some(AttributeValue::DomainIsoline),
            _ => None,
        }
    }

    /// Parses a `[partitioning(...)]` attribute argument.
    pub fn partitioning(value: &str) -> Option<AttributeValue> {
        match value {
            "integer" => Some(AttributeValue::PartitioningInteger),
            "pow2" => Some(AttributeValue::PartitioningPow2),
            "fractional_even" => Some(AttributeValue::PartitioningFractionalEven),
            "fractional_odd" => Some(AttributeValue::PartitioningFractionalOdd),
            _ => None,
        }
    }

    /// Parses an `[outputtopology(...)]` attribute argument.
    pub fn output_topology(value: &str) -> Option<AttributeValue> {
        match value {
            "point" => Some(AttributeValue::OutputTopologyPoint),
            "line" => Some(AttributeValue::OutputTopologyLine),
            "triangle_cw" => Some(AttributeValue::OutputTopologyTriangleCw),
            "triangle_ccw" => Some(AttributeValue::OutputTopologyTriangleCcw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Point,
    Line,
    LineAdj,
    Triangle,
    TriangleAdj,
}

#[derive(Debug, Clone, Default)]
pub struct TessControlLayout {
    pub output_control_points: u32,
    pub max_tess_factor: f32,
    pub patch_const_function: Option<Handle<FunctionDecl>>,
}

#[derive(Debug, Clone, Default)]
pub struct TessEvaluationLayout {
    pub domain: Option<AttributeValue>,
    pub partitioning: Option<AttributeValue>,
    pub output_topology: Option<AttributeValue>,
}

#[derive(Debug, Clone, Default)]
pub struct GeometryLayout {
    pub input_primitive: Option<PrimitiveType>,
    /// Must be a point, line or triangle stream type.
    pub output_primitive: Option<BufferType>,
    pub max_vertices: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FragmentLayout {
    pub frag_coord_used: bool,
    pub pixel_center_integer: bool,
    pub early_depth_stencil: bool,
    /// Shader-model 3 screen-space behavior (`gl_FragCoord` origin layout).
    pub screen_space_sm3: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ComputeLayout {
    /// `[numthreads(x,y,z)]`; all zero when unset.
    pub num_threads: [u32; 3],
}

/// Entry-point input/output metadata, filled by the converter and consumed
/// by the generator to synthesize local copies and output assignments.
#[derive(Debug, Clone, Default)]
pub struct EntryPointIo {
    /// The entry point's input parameters with resolved declarations.
    pub inputs: Vec<Handle<VarDecl>>,
    /// Semantic of a non-struct return value.
    pub return_semantic: Option<IndexedSemantic>,
    /// Structure returned by the entry point, if any.
    pub output_struct: Option<Handle<StructDecl>>,
}

/* ----- Program ----- */

/// A complete, type-resolved translation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub source_name: Option<String>,
    pub global_stmts: Vec<Stmt>,

    pub var_decls: Arena<VarDecl>,
    pub buffer_decls: Arena<BufferDecl>,
    pub sampler_decls: Arena<SamplerDecl>,
    pub struct_decls: Arena<StructDecl>,
    pub alias_decls: Arena<AliasDecl>,
    pub functions: Arena<FunctionDecl>,
    pub uniform_buffers: Arena<UniformBufferDecl>,

    pub entry_point: Option<Handle<FunctionDecl>>,
    /// Every intrinsic appearing at a reachable call site, with the argument
    /// base types observed there. Filled by the reference analyzer.
    pub used_intrinsics: BTreeMap<Intrinsic, IntrinsicUsage>,
    pub entry_io: EntryPointIo,

    pub layout_tess_control: TessControlLayout,
    pub layout_tess_evaluation: TessEvaluationLayout,
    pub layout_geometry: GeometryLayout,
    pub layout_fragment: FragmentLayout,
    pub layout_compute: ComputeLayout,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_intrinsic_usage(&mut self, intrinsic: Intrinsic, arg_types: Vec<DataType>) {
        self.used_intrinsics
            .entry(intrinsic)
            .or_default()
            .record(arg_types);
    }

    pub fn intrinsic_usage(&self, intrinsic: Intrinsic) -> Option<&IntrinsicUsage> {
        self.used_intrinsics.get(&intrinsic)
    }

    /// Finds a function implementation by name, preferring implementations
    /// over forward declarations.
    pub fn find_function(&self, ident: &str) -> Option<Handle<FunctionDecl>> {
        let mut forward = None;
        for (handle, func) in self.functions.iter() {
            if func.ident == ident {
                if !func.is_forward_decl() {
                    return Some(handle);
                }
                forward.get_or_insert(handle);
            }
        }
        forward.map(|handle| {
            self.functions[handle]
                .impl_decl
                .unwrap_or(handle)
        })
    }

    /* --- Structures --- */

    /// Looks up a member by name, searching the derived struct before its
    /// bases (member shadowing).
    pub fn struct_member(&self, s: Handle<StructDecl>, name: &str) -> Option<Handle<VarDecl>> {
        let decl = &self.struct_decls[s];
        decl.members
            .iter()
            .copied()
            .find(|&m| self.var_decls[m].ident == name)
            .or_else(|| {
                decl.base_struct
                    .and_then(|base| self.struct_member(base, name))
            })
    }

    /// All members in base-then-derived order, the order they are emitted.
    pub fn struct_members_base_first(&self, s: Handle<StructDecl>) -> Vec<Handle<VarDecl>> {
        let mut members = Vec::new();
        self.collect_members_base_first(s, &mut members);
        members
    }

    fn collect_members_base_first(&self, s: Handle<StructDecl>, out: &mut Vec<Handle<VarDecl>>) {
        let decl = &self.struct_decls[s];
        if let Some(base) = decl.base_struct {
            self.collect_members_base_first(base, out);
        }
        out.extend(decl.members.iter().copied());
    }

    pub fn is_base_of(&self, base: Handle<StructDecl>, derived: Handle<StructDecl>) -> bool {
        let mut current = self.struct_decls[derived].base_struct;
        while let Some(b) = current {
            if b == base {
                return true;
            }
            current = self.struct_decls[b].base_struct;
        }
        false
    }

    pub fn struct_has_non_system_value_members(&self, s: Handle<StructDecl>) -> bool {
        self.struct_members_base_first(s)
            .iter()
            .any(|&m| !self.var_decls[m].has_system_value_semantic())
    }

    /* --- Type resolution --- */

    /// Resolves alias layers of `ty` until a non-alias denoter remains.
    pub fn resolved_type(&self, ty: &TypeDenoter) -> Result<TypeDenoter, Error> {
        let mut current = ty.clone();
        // Alias chains are acyclic by construction; bound the walk anyway.
        for _ in 0..=self.alias_decls.len() {
            match current {
                TypeDenoter::Alias(handle) => {
                    current = self.alias_decls[handle].denoter.clone();
                }
                other => return Ok(other),
            }
        }
        Err(Error::missing_reference("cyclic type alias chain"))
    }

    /// Structural type equivalence, modulo alias resolution.
    pub fn types_equivalent(&self, a: &TypeDenoter, b: &TypeDenoter) -> bool {
        let (Ok(a), Ok(b)) = (self.resolved_type(a), self.resolved_type(b)) else {
            return false;
        };
        match (&a, &b) {
            (TypeDenoter::Array { base: ab, dims: ad }, TypeDenoter::Array { base: bb, dims: bd }) => {
                ad == bd && self.types_equivalent(ab, bb)
            }
            _ => a == b,
        }
    }

    /// The declared name of a struct or alias denoter, if any.
    pub fn type_ident<'a>(&'a self, ty: &'a TypeDenoter) -> Option<&'a str> {
        match ty {
            TypeDenoter::Struct(handle) => Some(self.struct_decls[*handle].ident.as_str()),
            TypeDenoter::Alias(handle) => Some(self.alias_decls[*handle].ident.as_str()),
            _ => None,
        }
    }

    /// The (cached) type of a variable declaration.
    pub fn var_decl_type(&self, handle: Handle<VarDecl>) -> TypeDenoter {
        let var = &self.var_decls[handle];
        var.ty
            .get_or_derive(|| {
                let base = var.type_spec.denoter.clone();
                Ok(if var.array_dims.is_empty() {
                    base
                } else {
                    base.array_of(var.array_dims.clone())
                })
            })
            .unwrap_or(TypeDenoter::Void)
    }

    fn symbol_type(&self, ident: &VarIdent, symbol: SymbolRef) -> Result<TypeDenoter, Error> {
        match symbol {
            SymbolRef::Var(handle) => Ok(self.var_decl_type(handle)),
            SymbolRef::Buffer(handle) => {
                let decl = &self.buffer_decls[handle];
                if decl.buffer_type.is_texture() {
                    Ok(TypeDenoter::Texture {
                        buffer_type: decl.buffer_type,
                        decl: Some(handle),
                    })
                } else {
                    Ok(TypeDenoter::Buffer {
                        buffer_type: decl.buffer_type,
                        elem: decl.elem.clone().map(Box::new),
                    })
                }
            }
            SymbolRef::Sampler(handle) => {
                Ok(TypeDenoter::Sampler(self.sampler_decls[handle].sampler_type))
            }
            SymbolRef::Struct(handle) => Ok(TypeDenoter::Struct(handle)),
            SymbolRef::Function(handle) => Err(Error::invalid_argument(format!(
                "function '{}' used as a value",
                self.functions[handle].ident
            ))
            .with_area(ident.area)),
        }
    }

    /// Applies `count` array indices to `ty`.
    fn indexed_type(
        &self,
        ty: TypeDenoter,
        count: usize,
        area: SourceArea,
    ) -> Result<TypeDenoter, Error> {
        if count == 0 {
            return Ok(ty);
        }
        match self.resolved_type(&ty)? {
            TypeDenoter::Array { base, dims } => {
                if count < dims.len() {
                    Ok(TypeDenoter::Array {
                        base,
                        dims: dims[count..].to_vec(),
                    })
                } else {
                    self.indexed_type(*base, count - dims.len(), area)
                }
            }
            TypeDenoter::Base(dt) if dt.is_matrix() => {
                // Indexing a matrix yields one row.
                let (_, cols) = dt.matrix_dim();
                let row = DataType::vector_of(dt.base_type(), cols).ok_or_else(|| {
                    Error::invalid_argument(format!("cannot index type '{dt}'")).with_area(area)
                })?;
                self.indexed_type(TypeDenoter::Base(row), count - 1, area)
            }
            TypeDenoter::Base(dt) if dt.is_vector() => {
                self.indexed_type(TypeDenoter::Base(dt.base_type()), count - 1, area)
            }
            TypeDenoter::Buffer { elem, .. } => {
                let elem = elem.map(|e| *e).unwrap_or(TypeDenoter::Base(DataType::UInt4));
                self.indexed_type(elem, count - 1, area)
            }
            other => Err(
                Error::invalid_argument(format!("too many array indices for type ({other:?})"))
                    .with_area(area),
            ),
        }
    }

    /// Resolves a member/subscript chain starting from `base`.
    fn member_chain_type(
        &self,
        base: TypeDenoter,
        link: &VarIdent,
    ) -> Result<TypeDenoter, Error> {
        let resolved = self.resolved_type(&base)?;
        let mut ty = match &resolved {
            TypeDenoter::Struct(handle) => {
                let member = self.struct_member(*handle, &link.ident).ok_or_else(|| {
                    Error::missing_reference(format!(
                        "struct '{}' has no member '{}'",
                        self.struct_decls[*handle].ident, link.ident
                    ))
                    .with_area(link.area)
                })?;
                self.var_decl_type(member)
            }
            TypeDenoter::Base(dt) => {
                let subscript = crate::ty::subscript_data_type(*dt, &link.ident)
                    .map_err(|err| err.with_area(link.area))?;
                TypeDenoter::Base(subscript)
            }
            other => {
                return Err(Error::invalid_argument(format!(
                    "member access '{}' on non-composite type ({other:?})",
                    link.ident
                ))
                .with_area(link.area));
            }
        };
        ty = self.indexed_type(ty, link.array_indices.len(), link.area)?;
        match link.next.as_deref() {
            Some(next) => self.member_chain_type(ty, next),
            None => Ok(ty),
        }
    }

    /// The type of a full identifier chain.
    pub fn var_ident_type(&self, ident: &VarIdent) -> Result<TypeDenoter, Error> {
        let symbol = ident.symbol.ok_or_else(|| {
            Error::missing_reference(format!("unresolved identifier '{}'", ident.ident))
                .with_area(ident.area)
        })?;
        let mut ty = self.symbol_type(ident, symbol)?;
        ty = self.indexed_type(ty, ident.array_indices.len(), ident.area)?;
        match ident.next.as_deref() {
            Some(next) => self.member_chain_type(ty, next),
            None => Ok(ty),
        }
    }

    /// The (cached) type of an expression.
    pub fn expr_type(&self, expr: &Expr) -> Result<TypeDenoter, Error> {
        expr.ty.get_or_derive(|| self.derive_expr_type(expr))
    }

    fn derive_expr_type(&self, expr: &Expr) -> Result<TypeDenoter, Error> {
        match &expr.kind {
            ExprKind::Null => Ok(TypeDenoter::Void),
            ExprKind::Literal { data_type, .. } => Ok(TypeDenoter::Base(*data_type)),
            ExprKind::Ternary { then_expr, .. } => self.expr_type(then_expr),
            ExprKind::Binary { lhs, op, rhs } => {
                let lhs_ty = self.resolved_type(&self.expr_type(lhs)?)?;
                if op.is_boolean() {
                    // Comparisons vectorize; logical operators stay scalar.
                    let dims = if op.is_compare() {
                        lhs_ty
                            .as_base()
                            .and_then(DataType::vector_dim)
                            .unwrap_or(1)
                    } else {
                        1
                    };
                    let dt = DataType::vector_of(DataType::Bool, dims)
                        .unwrap_or(DataType::Bool);
                    return Ok(TypeDenoter::Base(dt));
                }
                // Scalars broadcast against vectors and matrices.
                if lhs_ty.as_base().is_some_and(DataType::is_scalar) {
                    let rhs_ty = self.resolved_type(&self.expr_type(rhs)?)?;
                    if rhs_ty.as_base().is_some_and(|dt| !dt.is_scalar()) {
                        return Ok(rhs_ty);
                    }
                }
                Ok(lhs_ty)
            }
            ExprKind::Unary { op, expr } => {
                if matches!(op, UnaryOp::LogicalNot) {
                    Ok(TypeDenoter::Base(DataType::Bool))
                } else {
                    self.expr_type(expr)
                }
            }
            ExprKind::PostUnary { expr, .. } => self.expr_type(expr),
            ExprKind::Call(call) => self.call_type(call, expr.area),
            ExprKind::Bracket(inner) => self.expr_type(inner),
            ExprKind::Suffix { expr, ident } => {
                let base = self.expr_type(expr)?;
                self.member_chain_type(base, ident)
            }
            ExprKind::ArrayAccess { expr, indices } => {
                let base = self.expr_type(expr)?;
                self.indexed_type(base, indices.len(), expr.area)
            }
            ExprKind::Cast { to, .. } => Ok(to.clone()),
            ExprKind::Var(access) => self.var_ident_type(&access.ident),
            ExprKind::InitializerList(exprs) => match exprs.first() {
                Some(first) => self.expr_type(first),
                None => Ok(TypeDenoter::Void),
            },
        }
    }

    fn call_type(&self, call: &FunctionCall, area: SourceArea) -> Result<TypeDenoter, Error> {
        if let Some(constructor) = &call.constructor {
            return Ok(constructor.clone());
        }
        if let Some(func) = call.func {
            return Ok(self.functions[func].return_type.denoter.clone());
        }
        if let Some(intrinsic) = call.intrinsic {
            let mut arg_types = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                arg_types.push(self.resolved_type(&self.expr_type(arg)?)?);
            }
            return Ok(self.intrinsic_type(intrinsic, &arg_types));
        }
        Err(Error::missing_reference(match &call.name {
            Some(name) => format!("unresolved function call '{}'", name.full_name()),
            None => "function call without a name".into(),
        })
        .with_area(area))
    }

    /// Result type of an intrinsic call, derived from the argument types.
    fn intrinsic_type(&self, intrinsic: Intrinsic, args: &[TypeDenoter]) -> TypeDenoter {
        let base_of = |ty: &TypeDenoter| ty.as_base();
        let first = args.first().and_then(base_of);
        match intrinsic {
            Intrinsic::Dot | Intrinsic::Length | Intrinsic::Distance | Intrinsic::Determinant => {
                TypeDenoter::Base(first.map(DataType::base_type).unwrap_or(DataType::Float))
            }
            Intrinsic::Any | Intrinsic::All => TypeDenoter::Base(DataType::Bool),
            Intrinsic::Mul => {
                let (Some(a), Some(b)) = (first, args.get(1).and_then(base_of)) else {
                    return TypeDenoter::Void;
                };
                let base = if a.is_real() { a.base_type() } else { b.base_type() };
                let dt = match (a.is_matrix(), b.is_matrix()) {
                    (true, true) => {
                        DataType::matrix_of(base, a.matrix_dim().0, b.matrix_dim().1)
                    }
                    // mul(M, v): result has M's row count.
                    (true, false) => DataType::vector_of(base, a.matrix_dim().0),
                    // mul(v, M): result has M's column count.
                    (false, true) => DataType::vector_of(base, b.matrix_dim().1),
                    (false, false) => {
                        if a.is_scalar() {
                            Some(b)
                        } else if b.is_scalar() {
                            Some(a)
                        } else {
                            // Two vectors contract to a scalar.
                            Some(base)
                        }
                    }
                };
                dt.map(TypeDenoter::Base).unwrap_or(TypeDenoter::Void)
            }
            Intrinsic::Transpose => {
                let dt = first.and_then(|dt| {
                    let (rows, cols) = dt.matrix_dim();
                    DataType::matrix_of(dt.base_type(), cols, rows)
                });
                dt.map(TypeDenoter::Base).unwrap_or(TypeDenoter::Void)
            }
            Intrinsic::TextureSample
            | Intrinsic::TextureSampleBias
            | Intrinsic::TextureSampleGrad
            | Intrinsic::TextureSampleLevel
            | Intrinsic::TextureLoad => TypeDenoter::Base(DataType::Float4),
            Intrinsic::TextureSampleCmp | Intrinsic::TextureSampleCmpLevelZero => {
                TypeDenoter::Base(DataType::Float)
            }
            Intrinsic::Clip | Intrinsic::TextureGetDimensions => TypeDenoter::Void,
            i if i.is_atomic() => TypeDenoter::Void,
            _ => args.first().cloned().unwrap_or(TypeDenoter::Void),
        }
    }
}
