//! Type compatibility.
//!
//! Four predicates over the type algebra, all operating after alias
//! unwrapping and `int`/`uint` normalization:
//!
//! - [`equivalent`]: the same type.
//! - [`compatible`]: symmetric operand compatibility for binary operators;
//!   references auto-dereference on both sides.
//! - [`assignable`]: `dst ← src`; reference dereference is permitted on
//!   the source side only.
//! - [`convertible`]: explicit casts; any primitive-to-primitive cast is
//!   allowed.
//!
//! Owner types (custom `drop`, transitive ownership, raw pointers and
//! aliases of such) are move-only: two equivalent owner structs are still
//! not `assignable`, the ownership transfer being the business of a later
//! pass.

use cinderc_ast::{Ast, NodeFlags, NodeId, NodeKind, PrimType};

use crate::Target;

/// Follow alias elements to the underlying type.
pub fn unwrap_alias(ast: &Ast, mut t: NodeId) -> NodeId {
    loop {
        match &ast[t].kind {
            NodeKind::AliasType(d) => t = d.elem,
            _ => return t,
        }
    }
}

/// Unwrap `&T` and `mut&T` (not raw pointers).
pub fn unwrap_refs(ast: &Ast, mut t: NodeId) -> NodeId {
    loop {
        t = unwrap_alias(ast, t);
        match &ast[t].kind {
            NodeKind::RefType(d) | NodeKind::MutRefType(d) => t = d.elem,
            _ => return t,
        }
    }
}

/// Unwrap pointers, references and aliases down to the base type.
pub fn unwrap_ptrs(ast: &Ast, mut t: NodeId) -> NodeId {
    loop {
        t = unwrap_alias(ast, t);
        match &ast[t].kind {
            NodeKind::RefType(d) | NodeKind::MutRefType(d) | NodeKind::PtrType(d) => t = d.elem,
            _ => return t,
        }
    }
}

/// Alias-unwrapped, `int`/`uint`-normalized view of a type.
pub fn canonical(ast: &Ast, target: &Target, t: NodeId) -> NodeId {
    let t = unwrap_alias(ast, t);
    match &ast[t].kind {
        NodeKind::Prim(PrimType::Int) => match target.int_size {
            4 => NodeId::I32,
            _ => NodeId::I64,
        },
        NodeKind::Prim(PrimType::Uint) => match target.int_size {
            4 => NodeId::U32,
            _ => NodeId::U64,
        },
        _ => t,
    }
}

/// A type whose values have resource semantics and cannot be freely
/// copied: it has a custom `drop`, transitively owns values, is a raw
/// pointer, or is an alias of an owner. Aliases of primitives are never
/// owners.
pub fn is_owner(ast: &Ast, t: NodeId) -> bool {
    let flags = ast[t].flags;
    if flags.intersects(NodeFlags::DROP | NodeFlags::SUBOWNERS) {
        return true;
    }
    match &ast[t].kind {
        NodeKind::PtrType(_) => true,
        NodeKind::AliasType(d) => !ast[d.elem].is_prim_type() && is_owner(ast, d.elem),
        _ => false,
    }
}

/// Same type after unwrapping aliases and normalizing `int`/`uint`.
pub fn equivalent(ast: &Ast, target: &Target, x: NodeId, y: NodeId) -> bool {
    let x = canonical(ast, target, x);
    let y = canonical(ast, target, y);
    if x == y {
        return true;
    }
    // Structural fallback for types that have not met the interner yet.
    match (&ast[x].kind, &ast[y].kind) {
        (NodeKind::Prim(a), NodeKind::Prim(b)) => {
            a.canonical(target.int_size) == b.canonical(target.int_size)
        }
        (NodeKind::PtrType(a), NodeKind::PtrType(b))
        | (NodeKind::RefType(a), NodeKind::RefType(b))
        | (NodeKind::MutRefType(a), NodeKind::MutRefType(b))
        | (NodeKind::SliceType(a), NodeKind::SliceType(b))
        | (NodeKind::MutSliceType(a), NodeKind::MutSliceType(b))
        | (NodeKind::OptionalType(a), NodeKind::OptionalType(b)) => {
            equivalent(ast, target, a.elem, b.elem)
        }
        (NodeKind::ArrayType(a), NodeKind::ArrayType(b)) => {
            a.len == b.len && equivalent(ast, target, a.elem, b.elem)
        }
        (NodeKind::FunType(a), NodeKind::FunType(b)) => {
            a.params.len() == b.params.len()
                && equivalent(ast, target, a.result, b.result)
                && a.params.iter().zip(&b.params).all(|(&p, &q)| {
                    let pt = ast[p].local().map(|l| l.ty).unwrap_or(p);
                    let qt = ast[q].local().map(|l| l.ty).unwrap_or(q);
                    equivalent(ast, target, pt, qt)
                })
        }
        (NodeKind::StructType(a), NodeKind::StructType(b)) => {
            a.fields.len() == b.fields.len()
                && a.fields.iter().zip(&b.fields).all(|(&p, &q)| {
                    let (pl, ql) = (ast[p].local(), ast[q].local());
                    match (pl, ql) {
                        (Some(pl), Some(ql)) => {
                            pl.name == ql.name && equivalent(ast, target, pl.ty, ql.ty)
                        }
                        _ => false,
                    }
                })
        }
        _ => false,
    }
}

/// `dst ← src`. Reference dereference on the source side only.
pub fn assignable(ast: &Ast, target: &Target, dst: NodeId, src: NodeId) -> bool {
    let d = canonical(ast, target, dst);
    let s = canonical(ast, target, src);

    if equivalent(ast, target, d, s) {
        // Owner structs are move-only.
        return !(matches!(ast[d].kind, NodeKind::StructType(_)) && is_owner(ast, d));
    }

    match (&ast[d].kind, &ast[s].kind) {
        // *T <- *U iff T <- U
        (NodeKind::PtrType(a), NodeKind::PtrType(b)) => assignable(ast, target, a.elem, b.elem),
        // &T <- *U iff T <- U
        (NodeKind::RefType(a), NodeKind::PtrType(b)) => assignable(ast, target, a.elem, b.elem),
        // ?T <- ?U and ?T <- U with inner compatibility
        (NodeKind::OptionalType(a), NodeKind::OptionalType(b)) => {
            assignable(ast, target, a.elem, b.elem)
        }
        (NodeKind::OptionalType(a), _) => assignable(ast, target, a.elem, s),
        // &T <- &T, &T <- mut&T; never mut&T <- &T
        (NodeKind::RefType(a), NodeKind::RefType(b))
        | (NodeKind::RefType(a), NodeKind::MutRefType(b))
        | (NodeKind::MutRefType(a), NodeKind::MutRefType(b)) => {
            equivalent(ast, target, a.elem, b.elem)
        }
        // slices: &[T] <- &[T] | mut&[T]; mut&[T] <- mut&[T];
        // plus slicing an array reference of the same element
        (NodeKind::SliceType(a), NodeKind::SliceType(b))
        | (NodeKind::SliceType(a), NodeKind::MutSliceType(b))
        | (NodeKind::MutSliceType(a), NodeKind::MutSliceType(b)) => {
            equivalent(ast, target, a.elem, b.elem)
        }
        (NodeKind::SliceType(a), NodeKind::RefType(r))
        | (NodeKind::SliceType(a), NodeKind::MutRefType(r))
        | (NodeKind::MutSliceType(a), NodeKind::MutRefType(r)) => {
            match &ast[unwrap_alias(ast, r.elem)].kind {
                NodeKind::ArrayType(arr) => equivalent(ast, target, a.elem, arr.elem),
                _ => false,
            }
        }
        // implicit dereference of a source reference
        (_, NodeKind::RefType(b)) | (_, NodeKind::MutRefType(b)) => {
            assignable(ast, target, d, b.elem)
        }
        _ => false,
    }
}

/// Symmetric operand compatibility: equal after dereferencing references
/// on both sides.
pub fn compatible(ast: &Ast, target: &Target, x: NodeId, y: NodeId) -> bool {
    let x = unwrap_refs(ast, canonical(ast, target, x));
    let y = unwrap_refs(ast, canonical(ast, target, y));
    equivalent(ast, target, x, y)
}

/// Explicit cast: any primitive to any primitive; otherwise the same type,
/// possibly after unwrapping references.
pub fn convertible(ast: &Ast, target: &Target, dst: NodeId, src: NodeId) -> bool {
    let d = canonical(ast, target, dst);
    let s = canonical(ast, target, src);
    if ast[d].is_prim_type() && ast[s].is_prim_type() {
        let numericish = |t: NodeId| {
            !matches!(ast[t].kind, NodeKind::Prim(PrimType::Void | PrimType::Unknown))
        };
        return numericish(d) && numericish(s);
    }
    if equivalent(ast, target, d, s) {
        return true;
    }
    equivalent(ast, target, unwrap_refs(ast, d), unwrap_refs(ast, s))
}
