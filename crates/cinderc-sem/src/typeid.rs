//! Structural type identity.
//!
//! Every type has a *type-id*: a canonical byte string uniquely describing
//! its structure. Primitives are a single tag character; composites are a
//! tag followed by their children's ids, with decimal length prefixes for
//! the variable-length parts (struct fields, function parameters), which
//! keeps the encoding self-delimiting.
//!
//! Struct ids are purely structural (field names and types); alias ids
//! embed the alias name, so `str` stays distinct from a bare `&[u8]`.
//! `int`/`uint` are normalized to the target's concrete width before
//! encoding, which is what makes `int` and `i32` the same type on a
//! 32-bit-int target.
//!
//! The checker hash-conses user types on their type-id: the first type
//! checked with a given id becomes canonical and every later structural
//! duplicate resolves to it, so structural equality is pointer equality
//! from then on.

use cinderc_ast::{Ast, NodeId, NodeKind, PrimType};
use cinderc_util::Symbol;

use crate::{Target, Typecheck};

/// Encode the type-id of `t` without caching. `t`'s components must
/// already be checked.
pub fn typeid_str(ast: &Ast, target: &Target, t: NodeId) -> String {
    let mut out = String::new();
    encode(ast, target, t, &mut out);
    out
}

fn encode(ast: &Ast, target: &Target, t: NodeId, out: &mut String) {
    match &ast[t].kind {
        NodeKind::Prim(p) => out.push(prim_tag(*p, target)),
        NodeKind::PtrType(d) => {
            out.push('*');
            encode(ast, target, d.elem, out);
        }
        NodeKind::RefType(d) => {
            out.push('&');
            encode(ast, target, d.elem, out);
        }
        NodeKind::MutRefType(d) => {
            out.push('%');
            encode(ast, target, d.elem, out);
        }
        NodeKind::SliceType(d) => {
            out.push('[');
            encode(ast, target, d.elem, out);
        }
        NodeKind::MutSliceType(d) => {
            out.push(']');
            encode(ast, target, d.elem, out);
        }
        NodeKind::OptionalType(d) => {
            out.push('?');
            encode(ast, target, d.elem, out);
        }
        NodeKind::ArrayType(d) => {
            out.push('n');
            out.push_str(&d.len.to_string());
            out.push(':');
            encode(ast, target, d.elem, out);
        }
        NodeKind::FunType(d) => {
            out.push('^');
            out.push_str(&d.params.len().to_string());
            out.push(':');
            for &p in &d.params {
                let pt = ast[p].local().map(|l| l.ty).unwrap_or(p);
                encode(ast, target, pt, out);
            }
            encode(ast, target, d.result, out);
        }
        NodeKind::StructType(d) => {
            out.push('{');
            out.push_str(&d.fields.len().to_string());
            out.push(':');
            for &f in &d.fields {
                let local = ast[f].local().expect("struct field");
                let name = local.name.as_str();
                out.push_str(&name.len().to_string());
                out.push(':');
                out.push_str(name);
                encode(ast, target, local.ty, out);
            }
            out.push('}');
        }
        NodeKind::AliasType(d) => {
            out.push('=');
            let name = d.name.as_str();
            out.push_str(&name.len().to_string());
            out.push(':');
            out.push_str(name);
            encode(ast, target, d.elem, out);
        }
        NodeKind::Placeholder(d) => {
            out.push('T');
            let name = d.name.as_str();
            out.push_str(&name.len().to_string());
            out.push(':');
            out.push_str(name);
        }
        NodeKind::TemplateType(d) => {
            // Uninstantiated template use; only reachable inside template
            // bodies, where ids are scrubbed at instantiation anyway.
            out.push('@');
            encode(ast, target, d.recv, out);
            out.push_str(&d.args.len().to_string());
            out.push(':');
            for &a in &d.args {
                encode(ast, target, a, out);
            }
        }
        NodeKind::NsType { .. } => out.push('N'),
        NodeKind::Unresolved(d) => match d.resolved {
            Some(r) => encode(ast, target, r, out),
            None => out.push('!'),
        },
        _ => out.push('!'),
    }
}

fn prim_tag(p: PrimType, target: &Target) -> char {
    match p.canonical(target.int_size) {
        PrimType::Void => 'v',
        PrimType::Bool => 'b',
        PrimType::I8 => 'a',
        PrimType::I16 => 's',
        PrimType::I32 => 'i',
        PrimType::I64 => 'l',
        PrimType::U8 => 'A',
        PrimType::U16 => 'S',
        PrimType::U32 => 'I',
        PrimType::U64 => 'L',
        PrimType::F32 => 'f',
        PrimType::F64 => 'd',
        PrimType::Unknown => '!',
        PrimType::Int | PrimType::Uint => unreachable!("canonicalized"),
    }
}

impl<'a> Typecheck<'a> {
    /// The type-id of `t`, computed once and cached on the node.
    pub(crate) fn typeid(&mut self, t: NodeId) -> Symbol {
        if let Some(th) = self.ast[t].type_header() {
            if let Some(id) = th.typeid {
                return id;
            }
        }
        let id = Symbol::intern(&typeid_str(self.ast, self.target, t));
        if let Some(th) = self.ast[t].type_header_mut() {
            th.typeid = Some(id);
        }
        id
    }

    /// Canonicalize a user type by its type-id.
    ///
    /// The first type interned with a given id becomes canonical; callers
    /// must replace their reference with the returned node. Primitives are
    /// singletons and never pass through here.
    pub(crate) fn intern_usertype(&mut self, t: NodeId) -> NodeId {
        debug_assert!(self.ast[t].is_user_type(), "interning a non-user type");
        let id = self.typeid(t);
        match self.usertypes.get(&id) {
            Some(&canonical) => canonical,
            None => {
                self.usertypes.insert(id, t);
                t
            }
        }
    }
}
