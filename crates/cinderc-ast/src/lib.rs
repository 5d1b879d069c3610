//! cinderc-ast - AST Data Model
//!
//! The tree the parser produces and the checker decorates. One arena per
//! package holds every node; statements, expressions and types are all
//! [`Node`]s distinguished by [`NodeKind`], referencing each other through
//! 4-byte [`NodeId`]s.
//!
//! Design notes:
//!
//! - Nodes carry a shared header (kind, flags, location, use count, type)
//!   and a per-kind payload. Kind membership checks are predicates on the
//!   tag (`is_expr`, `is_type`, `is_prim_type`, ...).
//! - The arena is append-only. Nodes are mutated in place during checking
//!   (resolved targets, computed types, flags) but never freed, so
//!   back-references across the graph are always valid.
//! - Primitive types are seeded singletons with constant ids: the checker
//!   and backend compare `NodeId`s to test "is this bool".
//! - [`transform::transform`] provides the clone-on-change child rewrite
//!   used by template instantiation.

pub mod arena;
pub mod flags;
pub mod node;
pub mod package;
pub mod transform;

pub use arena::Ast;
pub use flags::{NodeFlags, Visibility};
pub use node::{
    AliasTypeData, ArrayTypeData, AssignData, BinOpData, CallData, ElemTypeData, ForData, FunData,
    FunTypeData, IdData, IfData, ImportData, ImportMember, LocalData, MemberData, Node, NodeId,
    NodeKind, NsData, Op, OpData, PlaceholderData, PrimType, StructTypeData, SubscriptData,
    TemplateTypeData, TypeConsData, TypeHeader, UnitData, UnresolvedData,
};
pub use package::{Pkg, PkgId, PkgStore};
pub use transform::transform;
