//! AST node definitions.
//!
//! Every node is a [`Node`]: a shared header (flags, location, use count,
//! type) plus a [`NodeKind`] payload. Expressions, statements and types all
//! live in one arena and reference each other by [`NodeId`], which keeps
//! back-references (a member expression pointing at a struct field, a
//! resolved identifier pointing at its definition) cycle-safe.
//!
//! Kind membership that the original design expressed as ordinal range
//! checks is expressed here as predicates on the tag (`is_expr`,
//! `is_type`, ...).

use cinderc_util::{sym, Idx, Loc, Symbol};

use crate::flags::NodeFlags;
use crate::package::PkgId;

/// Arena index of a node. 4 bytes, copyable, stable for the lifetime of
/// the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

static_assertions::assert_eq_size!(NodeId, u32);

impl Idx for NodeId {
    fn from_usize(idx: usize) -> Self {
        NodeId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl NodeId {
    // Pre-seeded singletons; see `Ast::new`.
    pub const BAD: NodeId = NodeId(0);
    pub const VOID: NodeId = NodeId(1);
    pub const BOOL: NodeId = NodeId(2);
    pub const I8: NodeId = NodeId(3);
    pub const I16: NodeId = NodeId(4);
    pub const I32: NodeId = NodeId(5);
    pub const I64: NodeId = NodeId(6);
    pub const INT: NodeId = NodeId(7);
    pub const U8: NodeId = NodeId(8);
    pub const U16: NodeId = NodeId(9);
    pub const U32: NodeId = NodeId(10);
    pub const U64: NodeId = NodeId(11);
    pub const UINT: NodeId = NodeId(12);
    pub const F32: NodeId = NodeId(13);
    pub const F64: NodeId = NodeId(14);
    pub const UNKNOWN: NodeId = NodeId(15);
    /// The `&[u8]` slice type backing the builtin `str` alias.
    pub const STR_SLICE: NodeId = NodeId(16);
    /// The builtin `str` alias.
    pub const STR: NodeId = NodeId(17);
}

/// Primitive types. Singletons: every use of `bool` is `NodeId::BOOL`.
///
/// `Int`/`Uint` are target-dependent aliases of a concrete width;
/// [`PrimType::canonical`] normalizes them. `Unknown` is the must-resolve
/// sentinel a checked node never keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    F32,
    F64,
    Unknown,
}

impl PrimType {
    pub fn name(self) -> Symbol {
        match self {
            PrimType::Void => sym::VOID,
            PrimType::Bool => sym::BOOL,
            PrimType::I8 => sym::I8,
            PrimType::I16 => sym::I16,
            PrimType::I32 => sym::I32,
            PrimType::I64 => sym::I64,
            PrimType::Int => sym::INT,
            PrimType::U8 => sym::U8,
            PrimType::U16 => sym::U16,
            PrimType::U32 => sym::U32,
            PrimType::U64 => sym::U64,
            PrimType::Uint => sym::UINT,
            PrimType::F32 => sym::F32,
            PrimType::F64 => sym::F64,
            PrimType::Unknown => sym::UNKNOWN,
        }
    }

    /// Normalize `int`/`uint` to the target's concrete width.
    pub fn canonical(self, int_size: u8) -> PrimType {
        match (self, int_size) {
            (PrimType::Int, 4) => PrimType::I32,
            (PrimType::Int, _) => PrimType::I64,
            (PrimType::Uint, 4) => PrimType::U32,
            (PrimType::Uint, _) => PrimType::U64,
            _ => self,
        }
    }

    pub fn size(self, int_size: u8, ptr_size: u8) -> u64 {
        let _ = ptr_size;
        match self.canonical(int_size) {
            PrimType::Void | PrimType::Unknown => 0,
            PrimType::Bool | PrimType::I8 | PrimType::U8 => 1,
            PrimType::I16 | PrimType::U16 => 2,
            PrimType::I32 | PrimType::U32 | PrimType::F32 => 4,
            PrimType::I64 | PrimType::U64 | PrimType::F64 => 8,
            PrimType::Int | PrimType::Uint => unreachable!("canonicalized above"),
        }
    }

    pub fn is_int(self) -> bool {
        matches!(
            self,
            PrimType::I8
                | PrimType::I16
                | PrimType::I32
                | PrimType::I64
                | PrimType::Int
                | PrimType::U8
                | PrimType::U16
                | PrimType::U32
                | PrimType::U64
                | PrimType::Uint
        )
    }

    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            PrimType::I8 | PrimType::I16 | PrimType::I32 | PrimType::I64 | PrimType::Int
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimType::F32 | PrimType::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_int() || self.is_float()
    }

    /// Inclusive integer value range, for literal fitting.
    /// Returns `None` for non-integer types.
    pub fn int_range(self, int_size: u8) -> Option<(i128, u128)> {
        match self.canonical(int_size) {
            PrimType::I8 => Some((i8::MIN as i128, i8::MAX as u128)),
            PrimType::I16 => Some((i16::MIN as i128, i16::MAX as u128)),
            PrimType::I32 => Some((i32::MIN as i128, i32::MAX as u128)),
            PrimType::I64 => Some((i64::MIN as i128, i64::MAX as u128)),
            PrimType::U8 => Some((0, u8::MAX as u128)),
            PrimType::U16 => Some((0, u16::MAX as u128)),
            PrimType::U32 => Some((0, u32::MAX as u128)),
            PrimType::U64 => Some((0, u64::MAX as u128)),
            _ => None,
        }
    }
}

/// Operators, shared by prefix, postfix, binary and assignment nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // bitwise
    And,
    Or,
    Xor,
    Shl,
    Shr,
    // logical
    LAnd,
    LOr,
    Not,
    // comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    // assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    // prefix/postfix
    Neg,
    Inc,
    Dec,
    Ref,
    MutRef,
    Deref,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
            Op::And => "&",
            Op::Or => "|",
            Op::Xor => "^",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::LAnd => "&&",
            Op::LOr => "||",
            Op::Not => "!",
            Op::Eq => "==",
            Op::NotEq => "!=",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::LtEq => "<=",
            Op::GtEq => ">=",
            Op::Assign => "=",
            Op::AddAssign => "+=",
            Op::SubAssign => "-=",
            Op::MulAssign => "*=",
            Op::DivAssign => "/=",
            Op::RemAssign => "%=",
            Op::AndAssign => "&=",
            Op::OrAssign => "|=",
            Op::XorAssign => "^=",
            Op::ShlAssign => "<<=",
            Op::ShrAssign => ">>=",
            Op::Neg => "-",
            Op::Inc => "++",
            Op::Dec => "--",
            Op::Ref => "&",
            Op::MutRef => "mut&",
            Op::Deref => "*",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Eq | Op::NotEq | Op::Lt | Op::Gt | Op::LtEq | Op::GtEq)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Op::LAnd | Op::LOr | Op::Not)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Rem | Op::Neg)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, Op::And | Op::Or | Op::Xor | Op::Shl | Op::Shr)
    }

    /// The base operator of a compound assignment (`+=` → `+`).
    pub fn compound_base(self) -> Option<Op> {
        match self {
            Op::AddAssign => Some(Op::Add),
            Op::SubAssign => Some(Op::Sub),
            Op::MulAssign => Some(Op::Mul),
            Op::DivAssign => Some(Op::Div),
            Op::RemAssign => Some(Op::Rem),
            Op::AndAssign => Some(Op::And),
            Op::OrAssign => Some(Op::Or),
            Op::XorAssign => Some(Op::Xor),
            Op::ShlAssign => Some(Op::Shl),
            Op::ShrAssign => Some(Op::Shr),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// payloads

/// A source file's worth of parsed declarations.
#[derive(Clone, Debug)]
pub struct UnitData {
    pub imports: Vec<NodeId>,
    pub decls: Vec<NodeId>,
}

/// One name in a selective import list.
#[derive(Clone, Debug)]
pub struct ImportMember {
    pub name: Symbol,
    /// Local rename: `name as alias`.
    pub alias: Option<Symbol>,
    pub loc: Loc,
}

/// `import a, b as c from "pkg"` / `import * from "pkg"`.
#[derive(Clone, Debug)]
pub struct ImportData {
    /// Package path string as written in source.
    pub path: String,
    /// Resolved by the package loader before the checker runs.
    pub pkg: Option<PkgId>,
    /// `import "pkg" as name` binds the whole namespace.
    pub alias: Option<(Symbol, Loc)>,
    pub members: Vec<ImportMember>,
    /// `import * from "pkg"`.
    pub star: bool,
    pub star_loc: Loc,
}

/// Function declaration or method (`fun T.name`).
#[derive(Clone, Debug)]
pub struct FunData {
    pub name: Option<Symbol>,
    pub name_loc: Loc,
    /// Receiver type for methods.
    pub recv: Option<NodeId>,
    /// `Param` nodes.
    pub params: Vec<NodeId>,
    /// Result type node.
    pub result: NodeId,
    pub result_loc: Loc,
    /// `Block` body; `None` for declarations.
    pub body: Option<NodeId>,
    /// Enclosing namespace (back-reference, not a child).
    pub ns_parent: Option<NodeId>,
}

/// Shared payload of `Field`, `Param`, `Var` and `Let`.
#[derive(Clone, Debug)]
pub struct LocalData {
    pub name: Symbol,
    pub name_loc: Loc,
    /// Declared type; `NodeId::UNKNOWN` when inferred from the initializer.
    pub ty: NodeId,
    pub init: Option<NodeId>,
    /// Byte offset within the enclosing struct (fields only).
    pub offset: u64,
    /// `this` receiver parameter.
    pub is_this: bool,
    /// `mut this` receiver parameter.
    pub is_mut: bool,
}

#[derive(Clone, Debug)]
pub struct CallData {
    pub recv: NodeId,
    pub args: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct TypeConsData {
    pub ty: NodeId,
    pub args: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct IdData {
    pub name: Symbol,
    /// Resolved declaration (back-reference, not a child).
    pub target: Option<NodeId>,
}

/// Namespace value, e.g. a package's public API.
#[derive(Clone, Debug)]
pub struct NsData {
    pub name: Symbol,
    pub members: Vec<(Symbol, NodeId)>,
}

#[derive(Clone, Debug)]
pub struct MemberData {
    pub recv: NodeId,
    pub name: Symbol,
    pub name_loc: Loc,
    /// Resolved field or type function (back-reference, not a child).
    pub target: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub struct SubscriptData {
    pub recv: NodeId,
    pub index: NodeId,
    /// Constant index value when known at compile time.
    pub index_val: u64,
}

#[derive(Clone, Debug)]
pub struct OpData {
    pub op: Op,
    pub expr: NodeId,
}

#[derive(Clone, Debug)]
pub struct BinOpData {
    pub op: Op,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Clone, Debug)]
pub struct AssignData {
    /// `Assign` or a compound-assign operator.
    pub op: Op,
    pub lhs: NodeId,
    pub rhs: NodeId,
}

#[derive(Clone, Debug)]
pub struct IfData {
    pub cond: NodeId,
    pub then_block: NodeId,
    pub else_block: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ForData {
    pub init: Option<NodeId>,
    pub cond: Option<NodeId>,
    pub update: Option<NodeId>,
    pub body: NodeId,
}

/// Size, alignment and cached type-id, shared by all user types.
#[derive(Clone, Debug, Default)]
pub struct TypeHeader {
    pub size: u64,
    pub align: u8,
    /// Canonical structural key, computed and cached by the checker.
    pub typeid: Option<Symbol>,
}

#[derive(Clone, Debug)]
pub struct ArrayTypeData {
    pub elem: NodeId,
    /// Length expression as written; `len` is its checked constant value.
    pub len_expr: Option<NodeId>,
    pub len: u64,
    pub th: TypeHeader,
}

#[derive(Clone, Debug)]
pub struct FunTypeData {
    /// `Param` nodes; a leading `this` marks a method type.
    pub params: Vec<NodeId>,
    pub result: NodeId,
    pub th: TypeHeader,
}

/// Payload of the single-element wrapper types: pointer, references,
/// slices and optional.
#[derive(Clone, Debug)]
pub struct ElemTypeData {
    pub elem: NodeId,
    pub th: TypeHeader,
}

#[derive(Clone, Debug)]
pub struct StructTypeData {
    pub name: Option<Symbol>,
    /// `Field` nodes in declaration order.
    pub fields: Vec<NodeId>,
    /// `Placeholder` nodes when this struct is a template.
    pub tparams: Vec<NodeId>,
    /// Enclosing namespace (back-reference, not a child).
    pub ns_parent: Option<NodeId>,
    pub th: TypeHeader,
}

#[derive(Clone, Debug)]
pub struct AliasTypeData {
    pub name: Symbol,
    pub elem: NodeId,
    pub th: TypeHeader,
}

/// Use of a template with arguments, e.g. `Foo<bool>`.
#[derive(Clone, Debug)]
pub struct TemplateTypeData {
    /// The template (usually an `Unresolved` until checked).
    pub recv: NodeId,
    pub args: Vec<NodeId>,
    pub th: TypeHeader,
}

/// Template parameter inside a template body.
#[derive(Clone, Debug)]
pub struct PlaceholderData {
    pub name: Symbol,
    pub default: Option<NodeId>,
    pub th: TypeHeader,
}

/// Named type not yet resolved to its definition.
#[derive(Clone, Debug)]
pub struct UnresolvedData {
    pub name: Symbol,
    /// Resolution result (back-reference, not a child).
    pub resolved: Option<NodeId>,
    pub th: TypeHeader,
}

// ---------------------------------------------------------------------------
// kinds

/// The closed sum of node kinds.
#[derive(Clone, Debug)]
pub enum NodeKind {
    // nodes
    Bad,
    Comment,
    Unit(UnitData),

    // statements
    Typedef { name: Symbol, ty: NodeId },
    Import(ImportData),

    // expressions
    Fun(FunData),
    Block { children: Vec<NodeId> },
    Call(CallData),
    TypeCons(TypeConsData),
    Id(IdData),
    NsExpr(NsData),
    Field(LocalData),
    Param(LocalData),
    Var(LocalData),
    Let(LocalData),
    Member(MemberData),
    Subscript(SubscriptData),
    PrefixOp(OpData),
    PostfixOp(OpData),
    Deref { expr: NodeId },
    BinOp(BinOpData),
    Assign(AssignData),
    If(IfData),
    For(ForData),
    Return { value: Option<NodeId> },
    BoolLit { value: bool },
    IntLit { value: u64 },
    FloatLit { value: f64 },
    StrLit { bytes: Vec<u8> },
    ArrayLit { values: Vec<NodeId> },

    // types
    Prim(PrimType),
    ArrayType(ArrayTypeData),
    FunType(FunTypeData),
    PtrType(ElemTypeData),
    RefType(ElemTypeData),
    MutRefType(ElemTypeData),
    SliceType(ElemTypeData),
    MutSliceType(ElemTypeData),
    OptionalType(ElemTypeData),
    StructType(StructTypeData),
    AliasType(AliasTypeData),
    NsType { th: TypeHeader },
    TemplateType(TemplateTypeData),
    Placeholder(PlaceholderData),
    Unresolved(UnresolvedData),
}

/// An AST node: shared header plus kind payload.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub flags: NodeFlags,
    pub loc: Loc,
    /// Number of resolved uses of this node.
    pub nuse: u32,
    /// Type of the expression this node evaluates to. `NodeId::UNKNOWN`
    /// until checked; type nodes point at themselves.
    pub ty: NodeId,
}

impl Node {
    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Prim(_)
                | NodeKind::ArrayType(_)
                | NodeKind::FunType(_)
                | NodeKind::PtrType(_)
                | NodeKind::RefType(_)
                | NodeKind::MutRefType(_)
                | NodeKind::SliceType(_)
                | NodeKind::MutSliceType(_)
                | NodeKind::OptionalType(_)
                | NodeKind::StructType(_)
                | NodeKind::AliasType(_)
                | NodeKind::NsType { .. }
                | NodeKind::TemplateType(_)
                | NodeKind::Placeholder(_)
                | NodeKind::Unresolved(_)
        )
    }

    pub fn is_prim_type(&self) -> bool {
        matches!(self.kind, NodeKind::Prim(_))
    }

    pub fn is_user_type(&self) -> bool {
        self.is_type() && !self.is_prim_type()
    }

    pub fn is_expr(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Fun(_)
                | NodeKind::Block { .. }
                | NodeKind::Call(_)
                | NodeKind::TypeCons(_)
                | NodeKind::Id(_)
                | NodeKind::NsExpr(_)
                | NodeKind::Field(_)
                | NodeKind::Param(_)
                | NodeKind::Var(_)
                | NodeKind::Let(_)
                | NodeKind::Member(_)
                | NodeKind::Subscript(_)
                | NodeKind::PrefixOp(_)
                | NodeKind::PostfixOp(_)
                | NodeKind::Deref { .. }
                | NodeKind::BinOp(_)
                | NodeKind::Assign(_)
                | NodeKind::If(_)
                | NodeKind::For(_)
                | NodeKind::Return { .. }
                | NodeKind::BoolLit { .. }
                | NodeKind::IntLit { .. }
                | NodeKind::FloatLit { .. }
                | NodeKind::StrLit { .. }
                | NodeKind::ArrayLit { .. }
        )
    }

    /// Local bindings: field, parameter, var, let.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Field(_) | NodeKind::Param(_) | NodeKind::Var(_) | NodeKind::Let(_)
        )
    }

    /// Pointer, reference or mutable reference type.
    pub fn is_ptr_like_type(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::PtrType(_) | NodeKind::RefType(_) | NodeKind::MutRefType(_)
        )
    }

    pub fn local(&self) -> Option<&LocalData> {
        match &self.kind {
            NodeKind::Field(l) | NodeKind::Param(l) | NodeKind::Var(l) | NodeKind::Let(l) => {
                Some(l)
            }
            _ => None,
        }
    }

    pub fn local_mut(&mut self) -> Option<&mut LocalData> {
        match &mut self.kind {
            NodeKind::Field(l) | NodeKind::Param(l) | NodeKind::Var(l) | NodeKind::Let(l) => {
                Some(l)
            }
            _ => None,
        }
    }

    /// The word used for this binding kind in diagnostics.
    pub fn local_kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Field(_) => "field",
            NodeKind::Param(_) => "parameter",
            NodeKind::Var(_) => "var",
            NodeKind::Let(_) => "let",
            _ => "value",
        }
    }

    pub fn type_header(&self) -> Option<&TypeHeader> {
        match &self.kind {
            NodeKind::ArrayType(d) => Some(&d.th),
            NodeKind::FunType(d) => Some(&d.th),
            NodeKind::PtrType(d)
            | NodeKind::RefType(d)
            | NodeKind::MutRefType(d)
            | NodeKind::SliceType(d)
            | NodeKind::MutSliceType(d)
            | NodeKind::OptionalType(d) => Some(&d.th),
            NodeKind::StructType(d) => Some(&d.th),
            NodeKind::AliasType(d) => Some(&d.th),
            NodeKind::NsType { th } => Some(th),
            NodeKind::TemplateType(d) => Some(&d.th),
            NodeKind::Placeholder(d) => Some(&d.th),
            NodeKind::Unresolved(d) => Some(&d.th),
            _ => None,
        }
    }

    pub fn type_header_mut(&mut self) -> Option<&mut TypeHeader> {
        match &mut self.kind {
            NodeKind::ArrayType(d) => Some(&mut d.th),
            NodeKind::FunType(d) => Some(&mut d.th),
            NodeKind::PtrType(d)
            | NodeKind::RefType(d)
            | NodeKind::MutRefType(d)
            | NodeKind::SliceType(d)
            | NodeKind::MutSliceType(d)
            | NodeKind::OptionalType(d) => Some(&mut d.th),
            NodeKind::StructType(d) => Some(&mut d.th),
            NodeKind::AliasType(d) => Some(&mut d.th),
            NodeKind::NsType { th } => Some(th),
            NodeKind::TemplateType(d) => Some(&mut d.th),
            NodeKind::Placeholder(d) => Some(&mut d.th),
            NodeKind::Unresolved(d) => Some(&mut d.th),
            _ => None,
        }
    }
}

impl NodeKind {
    /// Visit every semantic child slot.
    ///
    /// Back-references (`Id.target`, `Member.target`, `Unresolved.resolved`,
    /// `ns_parent`, namespace members) and the computed `Node.ty` are not
    /// children and are never visited; declared types inside payloads are.
    pub fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        match self {
            NodeKind::Bad
            | NodeKind::Comment
            | NodeKind::Import(_)
            | NodeKind::Id(_)
            | NodeKind::NsExpr(_)
            | NodeKind::BoolLit { .. }
            | NodeKind::IntLit { .. }
            | NodeKind::FloatLit { .. }
            | NodeKind::StrLit { .. }
            | NodeKind::Prim(_)
            | NodeKind::NsType { .. }
            | NodeKind::Unresolved(_) => {}
            NodeKind::Unit(d) => {
                for c in d.imports.iter_mut().chain(d.decls.iter_mut()) {
                    f(c);
                }
            }
            NodeKind::Typedef { ty, .. } => f(ty),
            NodeKind::Fun(d) => {
                if let Some(recv) = &mut d.recv {
                    f(recv);
                }
                for p in &mut d.params {
                    f(p);
                }
                f(&mut d.result);
                if let Some(body) = &mut d.body {
                    f(body);
                }
            }
            NodeKind::Block { children } => {
                for c in children {
                    f(c);
                }
            }
            NodeKind::Call(d) => {
                f(&mut d.recv);
                for a in &mut d.args {
                    f(a);
                }
            }
            NodeKind::TypeCons(d) => {
                f(&mut d.ty);
                for a in &mut d.args {
                    f(a);
                }
            }
            NodeKind::Field(d) | NodeKind::Param(d) | NodeKind::Var(d) | NodeKind::Let(d) => {
                f(&mut d.ty);
                if let Some(init) = &mut d.init {
                    f(init);
                }
            }
            NodeKind::Member(d) => f(&mut d.recv),
            NodeKind::Subscript(d) => {
                f(&mut d.recv);
                f(&mut d.index);
            }
            NodeKind::PrefixOp(d) | NodeKind::PostfixOp(d) => f(&mut d.expr),
            NodeKind::Deref { expr } => f(expr),
            NodeKind::BinOp(d) => {
                f(&mut d.left);
                f(&mut d.right);
            }
            NodeKind::Assign(d) => {
                f(&mut d.lhs);
                f(&mut d.rhs);
            }
            NodeKind::If(d) => {
                f(&mut d.cond);
                f(&mut d.then_block);
                if let Some(e) = &mut d.else_block {
                    f(e);
                }
            }
            NodeKind::For(d) => {
                if let Some(i) = &mut d.init {
                    f(i);
                }
                if let Some(c) = &mut d.cond {
                    f(c);
                }
                if let Some(u) = &mut d.update {
                    f(u);
                }
                f(&mut d.body);
            }
            NodeKind::Return { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }
            NodeKind::ArrayLit { values } => {
                for v in values {
                    f(v);
                }
            }
            NodeKind::ArrayType(d) => {
                f(&mut d.elem);
                if let Some(l) = &mut d.len_expr {
                    f(l);
                }
            }
            NodeKind::FunType(d) => {
                for p in &mut d.params {
                    f(p);
                }
                f(&mut d.result);
            }
            NodeKind::PtrType(d)
            | NodeKind::RefType(d)
            | NodeKind::MutRefType(d)
            | NodeKind::SliceType(d)
            | NodeKind::MutSliceType(d)
            | NodeKind::OptionalType(d) => f(&mut d.elem),
            NodeKind::StructType(d) => {
                for p in &mut d.tparams {
                    f(p);
                }
                for fld in &mut d.fields {
                    f(fld);
                }
            }
            NodeKind::AliasType(d) => f(&mut d.elem),
            NodeKind::TemplateType(d) => {
                f(&mut d.recv);
                for a in &mut d.args {
                    f(a);
                }
            }
            NodeKind::Placeholder(d) => {
                if let Some(def) = &mut d.default {
                    f(def);
                }
            }
        }
    }

    /// Semantic children, in visit order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut kind = self.clone();
        let mut out = Vec::new();
        kind.for_each_child_mut(&mut |c| out.push(*c));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prim_canonical() {
        assert_eq!(PrimType::Int.canonical(4), PrimType::I32);
        assert_eq!(PrimType::Int.canonical(8), PrimType::I64);
        assert_eq!(PrimType::Uint.canonical(4), PrimType::U32);
        assert_eq!(PrimType::Uint.canonical(8), PrimType::U64);
        assert_eq!(PrimType::Bool.canonical(4), PrimType::Bool);
    }

    #[test]
    fn test_prim_sizes() {
        assert_eq!(PrimType::Void.size(4, 8), 0);
        assert_eq!(PrimType::Bool.size(4, 8), 1);
        assert_eq!(PrimType::Int.size(4, 8), 4);
        assert_eq!(PrimType::Int.size(8, 8), 8);
        assert_eq!(PrimType::F64.size(4, 8), 8);
    }

    #[test]
    fn test_prim_ranges() {
        assert_eq!(PrimType::I8.int_range(4), Some((-128, 127)));
        assert_eq!(PrimType::U8.int_range(4), Some((0, 255)));
        assert_eq!(PrimType::Int.int_range(4), Some((i32::MIN as i128, i32::MAX as u128)));
        assert_eq!(PrimType::Bool.int_range(4), None);
    }

    #[test]
    fn test_op_classes() {
        assert!(Op::Eq.is_comparison());
        assert!(Op::LAnd.is_logical());
        assert!(Op::Add.is_arithmetic());
        assert!(Op::Shl.is_bitwise());
        assert_eq!(Op::AddAssign.compound_base(), Some(Op::Add));
        assert_eq!(Op::Assign.compound_base(), None);
    }

    #[test]
    fn test_children_of_binop() {
        let kind = NodeKind::BinOp(BinOpData { op: Op::Add, left: NodeId(5), right: NodeId(6) });
        assert_eq!(kind.children(), vec![NodeId(5), NodeId(6)]);
    }

    #[test]
    fn test_id_target_is_not_a_child() {
        let kind = NodeKind::Id(IdData { name: Symbol::intern("x"), target: Some(NodeId(9)) });
        assert!(kind.children().is_empty());
    }

    #[test]
    fn test_local_declared_type_is_a_child() {
        let kind = NodeKind::Var(LocalData {
            name: Symbol::intern("x"),
            name_loc: Loc::NONE,
            ty: NodeId::I32,
            init: Some(NodeId(20)),
            offset: 0,
            is_this: false,
            is_mut: false,
        });
        assert_eq!(kind.children(), vec![NodeId::I32, NodeId(20)]);
    }
}
