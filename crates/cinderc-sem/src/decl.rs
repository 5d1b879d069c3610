//! Declaration and type checking.
//!
//! Functions, typedefs, and the type kinds themselves: struct layout with
//! natural alignment, alias resolution with cycle breaking, template
//! definition handling, and the post-analysis fixed point that propagates
//! ownership once all `drop` functions are known.
//!
//! Function checking is split in two: the *signature* (receiver,
//! parameters, result, the interned function type, `drop`/`main`
//! validation, method registration) can be computed on demand when a
//! not-yet-checked function is referenced, while the *body* is only
//! checked from the declaration pass.

use cinderc_ast::{NodeFlags, NodeId, NodeKind, Visibility};
use cinderc_util::sym;
use tracing::debug;

use crate::{compat, Typecheck};

fn align_up(x: u64, align: u64) -> u64 {
    debug_assert!(align > 0);
    x.div_ceil(align) * align
}

impl<'a> Typecheck<'a> {
    // -- functions ----------------------------------------------------------

    /// Check a function's signature. Idempotent; safe to call on demand
    /// when the function is referenced before its declaration is reached.
    pub(crate) fn check_fun_signature(&mut self, n: NodeId) {
        if self.ast[n].flags.contains(NodeFlags::MARK2) || self.err.is_some() {
            return;
        }
        self.ast[n].flags.insert(NodeFlags::MARK2);
        let data = match &self.ast[n].kind {
            NodeKind::Fun(d) => d.clone(),
            _ => return,
        };

        let recv = data.recv.map(|r| self.typ(r));

        // Parameters are checked in a throwaway frame; the body pass
        // re-binds them.
        self.scope.enter();
        let mut params = data.params.clone();
        for p in params.iter_mut() {
            if let Some(r) = recv {
                if self.ast[*p].local().is_some_and(|l| l.is_this) {
                    if let Some(l) = self.ast[*p].local_mut() {
                        l.ty = r;
                    }
                }
            }
            *p = self.check_expr(*p);
        }
        let result = self.typ(data.result);
        self.scope.leave();

        let loc = self.loc_of(n);
        let ft = self.ast.fun_type(params.clone(), result, loc);
        let ft = self.typ(ft);
        self.set_ty(n, ft);

        if let NodeKind::Fun(d) = &mut self.ast[n].kind {
            d.recv = recv;
            d.params = params.clone();
            d.result = result;
            // Methods hang off their receiver's namespace.
            d.ns_parent = recv.or(d.ns_parent);
        }

        // `drop` gives the receiver type resource semantics; its shape is
        // fixed.
        if data.name == Some(sym::DROP) {
            if let Some(r) = recv {
                let ok = params.len() == 1
                    && self.ast[params[0]].local().is_some_and(|l| l.is_this && l.is_mut)
                    && result == NodeId::VOID;
                if ok {
                    self.add_flags(r, NodeFlags::DROP);
                } else {
                    self.error(
                        data.name_loc,
                        "invalid signature of \"drop\" function, expecting (mut this)void",
                    );
                }
            }
        }

        if let (Some(r), Some(name)) = (recv, data.name) {
            let tid = self.typeid(r);
            self.pkgs.get_mut(self.pkg).tfundefs.insert((tid, name), n);
        }

        if self.pkgs.get(self.pkg).is_main && data.name == Some(sym::MAIN) && recv.is_none() {
            if !params.is_empty() || result != NodeId::VOID {
                self.error(
                    data.name_loc,
                    "invalid signature of \"main\" function, expecting ()void",
                );
            }
            self.pkgs.get_mut(self.pkg).mainfun = Some(n);
        }

        if self.flags(n).contains(NodeFlags::PUB) {
            let fname = data.name.unwrap_or(sym::UNDERSCORE);
            for &p in &params {
                if let Some(pt) = self.ast[p].local().map(|l| l.ty) {
                    self.check_pub_exposure(fname, pt);
                }
            }
            self.check_pub_exposure(fname, result);
        }
    }

    /// Check a function declaration, body included.
    pub(crate) fn check_fun(&mut self, n: NodeId) -> NodeId {
        if !self.begin_check(n) {
            return n;
        }
        self.check_fun_signature(n);
        let data = match &self.ast[n].kind {
            NodeKind::Fun(d) => d.clone(),
            _ => return n,
        };
        let Some(body) = data.body else { return n };

        self.scope.enter();
        for &p in &data.params {
            if let Some(l) = self.ast[p].local() {
                if l.name != sym::UNDERSCORE {
                    let name = l.name;
                    self.scope.define(name, p);
                }
            }
        }

        self.fun_stack.push(n);
        let result = data.result;
        if result != NodeId::VOID {
            self.add_flags(body, NodeFlags::RVALUE);
        }
        self.typectx_push(result);
        let body = self.check_expr(body);
        self.typectx_pop();
        if let NodeKind::Fun(d) = &mut self.ast[n].kind {
            d.body = Some(body);
        }

        if result != NodeId::VOID && !self.flags(body).contains(NodeFlags::EXIT) {
            self.wrap_implicit_return(n, body, result, data.name, data.result_loc);
        }
        self.fun_stack.pop();
        self.scope.leave();
        n
    }

    /// A non-void function whose body does not exit returns its trailing
    /// expression; wrap it in an implicit `return`.
    fn wrap_implicit_return(
        &mut self,
        fun: NodeId,
        body: NodeId,
        result: NodeId,
        fname: Option<cinderc_util::Symbol>,
        result_loc: cinderc_util::Loc,
    ) {
        let _ = fun;
        let bty = self.ty_of(body);
        let last = match &self.ast[body].kind {
            NodeKind::Block { children } => children.last().copied(),
            _ => None,
        };

        let value_ok = compat::assignable(self.ast, self.target, result, bty)
            || self.owner_init_ok(result, bty)
            || self.is_unknown(body);
        if last.is_none() || bty == NodeId::VOID || !value_ok {
            if !self.is_unknown(body) {
                let loc = last.map(|l| self.loc_of(l)).unwrap_or_else(|| self.loc_of(body));
                if bty == NodeId::VOID || last.is_none() {
                    self.error(loc, "missing return value");
                } else {
                    self.error(loc, format!("invalid function result type: {}", self.type_str(bty)));
                }
                if let Some(fname) = fname {
                    self.help(
                        result_loc,
                        format!("function {} returns {}", fname, self.type_str(result)),
                    );
                }
            }
            return;
        }

        let last = last.expect("checked above");
        if matches!(self.ast[last].kind, NodeKind::Return { .. }) {
            return;
        }
        let loc = self.loc_of(last);
        let ret = self.ast.ret(Some(last), loc);
        self.ast[ret].flags.insert(NodeFlags::CHECKED);
        self.ast[ret].ty = NodeId::VOID;
        if let NodeKind::Block { children } = &mut self.ast[body].kind {
            *children.last_mut().expect("non-empty") = ret;
        }
        self.add_flags(body, NodeFlags::EXIT);
    }

    // -- typedefs -----------------------------------------------------------

    pub(crate) fn check_typedef(&mut self, n: NodeId) -> NodeId {
        if !self.begin_check(n) {
            return n;
        }
        let (name, ty) = match &self.ast[n].kind {
            NodeKind::Typedef { name, ty } => (*name, *ty),
            _ => return n,
        };

        // Name the type and propagate the typedef's visibility before
        // checking, so recursive references and exposure checks see both.
        if let NodeKind::StructType(d) = &mut self.ast[ty].kind {
            if d.name.is_none() {
                d.name = Some(name);
            }
        }
        let vis = self.flags(n) & (NodeFlags::PKG | NodeFlags::PUB);
        self.add_flags(ty, vis);

        let ty2 = self.typ(ty);
        if ty2 != ty {
            if let NodeKind::Typedef { ty: slot, .. } = &mut self.ast[n].kind {
                *slot = ty2;
            }
            // Keep name resolution pointing at the canonical instance.
            self.scope.define(name, ty2);
            self.pkgs.get_mut(self.pkg).defs.insert(name, ty2);
        }

        if self.flags(n).contains(NodeFlags::PUB) {
            let ftys: Vec<NodeId> = match &self.ast[ty2].kind {
                NodeKind::StructType(d) => {
                    d.fields.iter().filter_map(|&f| self.ast[f].local().map(|l| l.ty)).collect()
                }
                _ => Vec::new(),
            };
            for ft in ftys {
                self.check_pub_exposure(name, ft);
            }
        }
        n
    }

    /// A public declaration must not expose less-visible named types.
    fn check_pub_exposure(&mut self, decl_name: cinderc_util::Symbol, t: NodeId) {
        let mut t = t;
        // Walk through wrappers to the named type, if any.
        loop {
            match &self.ast[t].kind {
                NodeKind::PtrType(d)
                | NodeKind::RefType(d)
                | NodeKind::MutRefType(d)
                | NodeKind::SliceType(d)
                | NodeKind::MutSliceType(d)
                | NodeKind::OptionalType(d) => t = d.elem,
                NodeKind::ArrayType(d) => t = d.elem,
                _ => break,
            }
        }
        let tname = match &self.ast[t].kind {
            NodeKind::StructType(d) => match d.name {
                Some(name) => name,
                None => return,
            },
            NodeKind::AliasType(d) => d.name,
            _ => return,
        };
        if tname == sym::STR {
            return; // builtin
        }
        if self.flags(t).visibility() < Visibility::Pub {
            let loc = self.loc_of(t);
            self.error(
                loc,
                format!("non-public type \"{tname}\" in public declaration \"{decl_name}\""),
            );
        }
    }

    // -- types --------------------------------------------------------------

    /// Check a type node, returning its canonical (interned) form.
    pub(crate) fn typ(&mut self, t: NodeId) -> NodeId {
        if self.err.is_some() || self.ast[t].is_prim_type() {
            return t;
        }
        if !self.ast[t].is_type() {
            return t;
        }
        if self.ast[t].flags.contains(NodeFlags::CHECKED) {
            return match &self.ast[t].kind {
                NodeKind::Unresolved(d) => d.resolved.unwrap_or(NodeId::UNKNOWN),
                // A template use deferred inside a template body; reaching
                // it from instantiated code resolves it for real (memoized).
                NodeKind::TemplateType(_) if self.template_nest == 0 => {
                    self.instantiate_template(t)
                }
                // A checked alias seen again while still marked is a cycle.
                NodeKind::AliasType(d) if self.ast[t].flags.contains(NodeFlags::MARK1) => {
                    let name = d.name;
                    let loc = self.loc_of(t);
                    self.error(loc, format!("circular type alias \"{name}\""));
                    if let NodeKind::AliasType(d) = &mut self.ast[t].kind {
                        d.elem = NodeId::UNKNOWN;
                    }
                    t
                }
                _ => t,
            };
        }
        self.ast[t].flags.insert(NodeFlags::CHECKED);

        match &self.ast[t].kind {
            NodeKind::ArrayType(_) => self.check_array_type(t),
            NodeKind::FunType(_) => self.check_fun_type(t),
            NodeKind::PtrType(_)
            | NodeKind::RefType(_)
            | NodeKind::MutRefType(_)
            | NodeKind::SliceType(_)
            | NodeKind::MutSliceType(_)
            | NodeKind::OptionalType(_) => self.check_elem_type(t),
            NodeKind::StructType(_) => self.check_struct_type(t),
            NodeKind::AliasType(_) => self.check_alias_type(t),
            NodeKind::TemplateType(_) => self.instantiate_template(t),
            NodeKind::Placeholder(_) => {
                debug_assert!(self.template_nest > 0, "placeholder outside a template");
                t
            }
            NodeKind::Unresolved(_) => self.resolve_named_type(t),
            NodeKind::NsType { .. } => t,
            _ => t,
        }
    }

    pub(crate) fn type_size(&self, t: NodeId) -> u64 {
        match &self.ast[t].kind {
            NodeKind::Prim(p) => p.size(self.target.int_size, self.target.ptr_size),
            NodeKind::PtrType(_)
            | NodeKind::RefType(_)
            | NodeKind::MutRefType(_)
            | NodeKind::FunType(_) => self.target.ptr_size as u64,
            NodeKind::SliceType(_) | NodeKind::MutSliceType(_) => 2 * self.target.ptr_size as u64,
            _ => self.ast[t].type_header().map(|h| h.size).unwrap_or(0),
        }
    }

    pub(crate) fn type_align(&self, t: NodeId) -> u64 {
        match &self.ast[t].kind {
            NodeKind::Prim(p) => p.size(self.target.int_size, self.target.ptr_size).max(1),
            NodeKind::PtrType(_)
            | NodeKind::RefType(_)
            | NodeKind::MutRefType(_)
            | NodeKind::FunType(_)
            | NodeKind::SliceType(_)
            | NodeKind::MutSliceType(_) => self.target.ptr_size as u64,
            _ => self.ast[t].type_header().map(|h| h.align as u64).unwrap_or(1).max(1),
        }
    }

    fn check_array_type(&mut self, t: NodeId) -> NodeId {
        let d = match &self.ast[t].kind {
            NodeKind::ArrayType(d) => d.clone(),
            _ => return t,
        };
        let elem = self.typ(d.elem);
        let mut len = d.len;
        let mut len_expr = d.len_expr;
        if let Some(le) = len_expr {
            let le2 = self.check_rvalue_ctx(le, NodeId::UINT);
            len_expr = Some(le2);
            match self.ast[le2].kind {
                NodeKind::IntLit { value } => len = value,
                _ => {
                    if !self.is_unknown(le2) {
                        let loc = self.loc_of(le2);
                        self.error(loc, "array length must be a constant expression");
                    }
                }
            }
            if len == 0 {
                let loc = self.loc_of(t);
                self.error(loc, "zero-length array");
            }
        }
        let size = len.saturating_mul(self.type_size(elem));
        let align = self.type_align(elem).min(u8::MAX as u64) as u8;
        if let NodeKind::ArrayType(d) = &mut self.ast[t].kind {
            d.elem = elem;
            d.len = len;
            d.len_expr = len_expr;
            d.th.size = size;
            d.th.align = align;
        }
        self.intern_usertype(t)
    }

    fn check_fun_type(&mut self, t: NodeId) -> NodeId {
        let d = match &self.ast[t].kind {
            NodeKind::FunType(d) => d.clone(),
            _ => return t,
        };
        for &p in &d.params {
            // Parameters from a checked function signature are done; bare
            // parameter types written in type position still need a visit.
            if self.ast[p].flags.contains(NodeFlags::CHECKED) {
                continue;
            }
            self.ast[p].flags.insert(NodeFlags::CHECKED);
            if let Some(pt) = self.ast[p].local().map(|l| l.ty) {
                let pt2 = self.typ(pt);
                if let Some(l) = self.ast[p].local_mut() {
                    l.ty = pt2;
                }
                self.ast[p].ty = pt2;
            }
        }
        let result = self.typ(d.result);
        let ptr = self.target.ptr_size;
        if let NodeKind::FunType(d) = &mut self.ast[t].kind {
            d.result = result;
            d.th.size = ptr as u64;
            d.th.align = ptr;
        }
        self.intern_usertype(t)
    }

    fn check_elem_type(&mut self, t: NodeId) -> NodeId {
        let elem = match &self.ast[t].kind {
            NodeKind::PtrType(d)
            | NodeKind::RefType(d)
            | NodeKind::MutRefType(d)
            | NodeKind::SliceType(d)
            | NodeKind::MutSliceType(d)
            | NodeKind::OptionalType(d) => d.elem,
            _ => return t,
        };
        let elem = self.typ(elem);
        let ptr = self.target.ptr_size as u64;
        let (size, align) = match &self.ast[t].kind {
            NodeKind::SliceType(_) | NodeKind::MutSliceType(_) => (2 * ptr, ptr),
            NodeKind::OptionalType(_) => {
                // Value plus a presence tag, padded to the value's
                // alignment.
                let a = self.type_align(elem).max(1);
                (self.type_size(elem) + a, a)
            }
            _ => (ptr, ptr),
        };
        match &mut self.ast[t].kind {
            NodeKind::PtrType(d)
            | NodeKind::RefType(d)
            | NodeKind::MutRefType(d)
            | NodeKind::SliceType(d)
            | NodeKind::MutSliceType(d)
            | NodeKind::OptionalType(d) => {
                d.elem = elem;
                d.th.size = size;
                d.th.align = align.min(u8::MAX as u64) as u8;
            }
            _ => {}
        }
        self.intern_usertype(t)
    }

    fn check_struct_type(&mut self, t: NodeId) -> NodeId {
        let d = match &self.ast[t].kind {
            NodeKind::StructType(d) => d.clone(),
            _ => return t,
        };

        // A struct with unsubstituted template parameters is a template
        // definition: check its body symbolically and defer the rest to
        // instantiation.
        if !d.tparams.is_empty() && !self.flags(t).contains(NodeFlags::TEMPLATEI) {
            self.add_flags(t, NodeFlags::TEMPLATE);
            self.template_nest += 1;
            self.scope.enter();
            for &tp in &d.tparams {
                if let NodeKind::Placeholder(p) = &self.ast[tp].kind {
                    let (pname, pdefault) = (p.name, p.default);
                    self.scope.define(pname, tp);
                    self.ast[tp].flags.insert(NodeFlags::CHECKED);
                    if let Some(def) = pdefault {
                        self.typ(def);
                    }
                }
            }
            let mut fields = d.fields;
            for slot in fields.iter_mut() {
                *slot = self.check_expr(*slot);
            }
            self.scope.leave();
            self.template_nest -= 1;
            if let NodeKind::StructType(s) = &mut self.ast[t].kind {
                s.fields = fields;
            }
            return t;
        }

        let mut fields = d.fields;
        for slot in fields.iter_mut() {
            *slot = self.check_expr(*slot);
        }

        // Duplicate field names.
        for i in 0..fields.len() {
            let Some(name) = self.ast[fields[i]].local().map(|l| l.name) else { continue };
            for &later in &fields[i + 1..] {
                if self.ast[later].local().map(|l| l.name) == Some(name) {
                    let loc = self.ast[later].local().map(|l| l.name_loc).unwrap_or_default();
                    self.error(loc, format!("duplicate field \"{name}\""));
                }
            }
        }

        // Field layout: declaration order, natural alignment.
        let mut offset = 0u64;
        let mut max_align = 1u64;
        let mut subowners = false;
        for &f in &fields {
            let Some(fty) = self.ast[f].local().map(|l| l.ty) else { continue };
            let a = self.type_align(fty);
            let size = self.type_size(fty);
            offset = align_up(offset, a);
            if let Some(l) = self.ast[f].local_mut() {
                l.offset = offset;
            }
            offset += size;
            max_align = max_align.max(a);
            subowners |= compat::is_owner(self.ast, fty);
        }
        let size = align_up(offset, max_align);

        if let NodeKind::StructType(s) = &mut self.ast[t].kind {
            s.fields = fields;
            s.th.size = size;
            s.th.align = max_align.min(u8::MAX as u64) as u8;
        }
        if subowners {
            self.add_flags(t, NodeFlags::SUBOWNERS);
        }
        let canon = self.intern_usertype(t);
        self.postanalyze.push(canon);
        canon
    }

    fn check_alias_type(&mut self, t: NodeId) -> NodeId {
        let d = match &self.ast[t].kind {
            NodeKind::AliasType(d) => d.clone(),
            _ => return t,
        };
        self.ast[t].flags.insert(NodeFlags::MARK1);
        let elem = self.typ(d.elem);
        self.ast[t].flags.remove(NodeFlags::MARK1);

        let (size, align) = (self.type_size(elem), self.type_align(elem));
        if let NodeKind::AliasType(d) = &mut self.ast[t].kind {
            // A broken cycle rewrote the element to unknown; keep that.
            if d.elem != NodeId::UNKNOWN {
                d.elem = elem;
            }
            d.th.size = size;
            d.th.align = align.min(u8::MAX as u64) as u8;
        }
        let canon = self.intern_usertype(t);
        self.postanalyze.push(canon);
        canon
    }

    fn resolve_named_type(&mut self, t: NodeId) -> NodeId {
        let name = match &self.ast[t].kind {
            NodeKind::Unresolved(d) => d.name,
            _ => return t,
        };
        let loc = self.loc_of(t);

        let mut found = self.scope.lookup(name, crate::Scope::MAX_DEPTH);
        if found.is_none() {
            if let Some(&def) = self.pkgs.get(self.pkg).defs.get(&name) {
                self.ast[def].flags.raise_to_pkg();
                found = Some(def);
            }
        }

        let Some(def) = found else {
            self.error(loc, format!("unknown type \"{name}\""));
            self.suggest_name(name, loc);
            self.add_flags(t, NodeFlags::UNKNOWN);
            return NodeId::UNKNOWN;
        };
        if !self.ast[def].is_type() {
            self.error(loc, format!("\"{name}\" is not a type"));
            self.add_flags(t, NodeFlags::UNKNOWN);
            return NodeId::UNKNOWN;
        }
        self.ast.mark_used(def);
        let resolved = self.typ(def);
        if let NodeKind::Unresolved(d) = &mut self.ast[t].kind {
            d.resolved = Some(resolved);
        }
        resolved
    }

    // -- post-analysis ------------------------------------------------------

    /// Owner propagation fixed point. A struct whose field types became
    /// owners (e.g. through a `drop` defined after the struct) gains
    /// `SUBOWNERS`; aliases follow their element.
    pub(crate) fn post_analyze(&mut self) {
        debug!(types = self.postanalyze.len(), "post-analysis");
        loop {
            let mut changed = false;
            for i in 0..self.postanalyze.len() {
                let t = self.postanalyze[i];
                if self.ast[t].flags.contains(NodeFlags::SUBOWNERS) {
                    continue;
                }
                let owner_now = match &self.ast[t].kind {
                    NodeKind::StructType(d) => d
                        .fields
                        .iter()
                        .filter_map(|&f| self.ast[f].local().map(|l| l.ty))
                        .any(|ft| compat::is_owner(self.ast, ft)),
                    NodeKind::AliasType(d) => {
                        !self.ast[d.elem].is_prim_type() && compat::is_owner(self.ast, d.elem)
                    }
                    _ => false,
                };
                if owner_now {
                    self.ast[t].flags.insert(NodeFlags::SUBOWNERS);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}
