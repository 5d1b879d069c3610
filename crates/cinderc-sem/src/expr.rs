//! Expression checking.
//!
//! One visit per expression kind: resolve what it names, assign its type,
//! coerce literals into the active type context, and rewrite nodes where
//! checking changes their meaning (a call of a type becomes a construction
//! or cast, an equivalent-typed primitive cast collapses to its argument).
//!
//! Check functions return the node to store in the parent's slot, which is
//! usually the input node but may be a replacement. A node is checked at
//! most once; re-visits are no-ops.

use cinderc_ast::{NodeFlags, NodeId, NodeKind, Op, PrimType};
use cinderc_util::{sym, Symbol};
use rustc_hash::FxHashSet;

use crate::{compat, Typecheck};

impl<'a> Typecheck<'a> {
    /// Check any expression node. Returns the node to use in its place.
    pub(crate) fn check_expr(&mut self, n: NodeId) -> NodeId {
        if self.err.is_some() {
            return n;
        }
        if self.ast[n].is_type() {
            return self.typ(n);
        }
        if matches!(self.ast[n].kind, NodeKind::Fun(_)) {
            return self.check_fun(n);
        }
        if !self.begin_check(n) {
            return n;
        }
        match &self.ast[n].kind {
            NodeKind::Id(_) => self.check_id(n),
            NodeKind::Field(_) | NodeKind::Param(_) | NodeKind::Var(_) | NodeKind::Let(_) => {
                self.check_local(n)
            }
            NodeKind::Block { .. } => self.check_block(n),
            NodeKind::If(_) => self.check_if(n),
            NodeKind::Return { .. } => self.check_return(n),
            NodeKind::Call(_) => self.check_call(n),
            NodeKind::TypeCons(_) => self.check_typecons(n),
            NodeKind::BinOp(_) => self.check_binop(n),
            NodeKind::Assign(_) => self.check_assign(n),
            NodeKind::PrefixOp(_) => self.check_prefix_op(n),
            NodeKind::PostfixOp(_) => self.check_postfix_op(n),
            NodeKind::Deref { .. } => self.check_deref(n),
            NodeKind::Member(_) => self.check_member(n),
            NodeKind::Subscript(_) => self.check_subscript(n),
            NodeKind::BoolLit { .. } => {
                self.set_ty(n, NodeId::BOOL);
                self.add_flags(n, NodeFlags::CONST);
                n
            }
            NodeKind::IntLit { .. } => self.check_int_lit(n),
            NodeKind::FloatLit { .. } => self.check_float_lit(n),
            NodeKind::StrLit { .. } => self.check_str_lit(n),
            NodeKind::ArrayLit { .. } => self.check_array_lit(n),
            NodeKind::For(_) => {
                // TODO: implement 'for' statement checking
                let loc = self.loc_of(n);
                self.error(loc, "'for' loops are not implemented");
                self.set_ty(n, NodeId::VOID);
                n
            }
            NodeKind::NsExpr(_) => {
                // TODO: implement namespace expression checking
                let loc = self.loc_of(n);
                self.error(loc, "namespace expressions are not implemented");
                n
            }
            _ => n,
        }
    }

    /// Check `n` as a value.
    pub(crate) fn check_rvalue(&mut self, n: NodeId) -> NodeId {
        self.add_flags(n, NodeFlags::RVALUE);
        self.check_expr(n)
    }

    /// Check `n` as a value under type context `ctx`.
    pub(crate) fn check_rvalue_ctx(&mut self, n: NodeId, ctx: NodeId) -> NodeId {
        self.add_flags(n, NodeFlags::RVALUE);
        if ctx == NodeId::UNKNOWN {
            return self.check_expr(n);
        }
        self.typectx_push(ctx);
        let out = self.check_expr(n);
        self.typectx_pop();
        out
    }

    /// Substitution type after an error: the current context when there is
    /// one, `unknown` otherwise.
    pub(crate) fn error_ty(&self) -> NodeId {
        let c = self.typectx();
        if c == NodeId::UNKNOWN {
            NodeId::UNKNOWN
        } else {
            c
        }
    }

    // -- identifiers --------------------------------------------------------

    fn check_id(&mut self, n: NodeId) -> NodeId {
        let name = match &self.ast[n].kind {
            NodeKind::Id(d) => d.name,
            _ => return n,
        };
        let loc = self.loc_of(n);

        if name == sym::UNDERSCORE {
            self.error(loc, "cannot use \"_\" as a value");
            self.add_flags(n, NodeFlags::UNKNOWN);
            let t = self.error_ty();
            self.set_ty(n, t);
            return n;
        }

        let mut found = self.scope.lookup(name, crate::Scope::MAX_DEPTH);
        if found.is_none() {
            // Fall back to the package-level definitions; a hit upgrades
            // the referent to package visibility.
            if let Some(&t) = self.pkgs.get(self.pkg).defs.get(&name) {
                self.ast[t].flags.raise_to_pkg();
                found = Some(t);
            }
        }

        let Some(target) = found else {
            self.error(loc, format!("unknown identifier \"{name}\""));
            self.suggest_name(name, loc);
            self.add_flags(n, NodeFlags::UNKNOWN);
            let t = self.error_ty();
            self.set_ty(n, t);
            return n;
        };

        self.ast.mark_used(target);

        if self.ast[target].is_type() {
            // The identifier names a type: the id becomes a type reference.
            let t = self.typ(target);
            if let NodeKind::Id(d) = &mut self.ast[n].kind {
                d.target = Some(t);
            }
            self.set_ty(n, t);
            return n;
        }

        // Top-level referents may not be checked yet (declarations are
        // visible regardless of source order).
        match self.ast[target].kind {
            NodeKind::Fun(_) => {
                self.check_fun_signature(target);
            }
            NodeKind::Var(_) | NodeKind::Let(_)
                if !self.ast[target].flags.contains(NodeFlags::CHECKED) =>
            {
                self.check_expr(target);
            }
            _ => {}
        }

        if let NodeKind::Id(d) = &mut self.ast[n].kind {
            d.target = Some(target);
        }
        let tty = self.ty_of(target);
        self.set_ty(n, tty);
        if self.ast[target].flags.contains(NodeFlags::NARROWED) {
            self.add_flags(n, NodeFlags::NARROWED);
        }
        self.inherit_unknown(n, target);
        n
    }

    // -- local bindings -----------------------------------------------------

    /// Check a `var`/`let`/`param`/`field` declaration.
    pub(crate) fn check_local(&mut self, n: NodeId) -> NodeId {
        let local = match self.ast[n].local() {
            Some(l) => l.clone(),
            None => return n,
        };
        let kindword = self.ast[n].local_kind_name();
        let is_field = matches!(self.ast[n].kind, NodeKind::Field(_));

        let mut ty =
            if local.ty != NodeId::UNKNOWN { self.typ(local.ty) } else { NodeId::UNKNOWN };

        let mut init = local.init;
        if let Some(iv) = init {
            let iv2 = if ty == NodeId::UNKNOWN {
                self.check_rvalue(iv)
            } else {
                self.check_rvalue_ctx(iv, ty)
            };
            init = Some(iv2);
            let ity = self.ty_of(iv2);
            if ty == NodeId::UNKNOWN {
                ty = ity;
            } else if !compat::assignable(self.ast, self.target, ty, ity)
                && !self.is_unknown(iv2)
                && !self.owner_init_ok(ty, ity)
            {
                self.error(
                    self.loc_of(iv2),
                    format!(
                        "cannot assign value of type {} to {} of type {}",
                        self.type_str(ity),
                        kindword,
                        self.type_str(ty)
                    ),
                );
            }
        } else if ty == NodeId::UNKNOWN {
            self.error(local.name_loc, format!("missing type for {kindword} \"{}\"", local.name));
        }

        // A value of type void can only exist as a narrowing artifact.
        if compat::canonical(self.ast, self.target, ty) == NodeId::VOID
            && ty != NodeId::UNKNOWN
            && !self.flags(n).contains(NodeFlags::NARROWED)
        {
            self.error(local.name_loc, "cannot define a value of type void");
        }

        if local.is_this {
            ty = self.this_param_type(ty, local.is_mut);
        }

        // `_` of owner type gets a unique internal name; the later
        // ownership pass tracks values by name.
        let mut name = local.name;
        if name == sym::UNDERSCORE && ty != NodeId::UNKNOWN && compat::is_owner(self.ast, ty) {
            name = self.gen_name();
        }

        if let Some(l) = self.ast[n].local_mut() {
            l.name = name;
            l.ty = ty;
            l.init = init;
        }
        self.set_ty(n, ty);

        if !is_field && name != sym::UNDERSCORE {
            match self.scope.lookup(name, 0) {
                Some(prev) if prev == n => {} // pre-defined top-level binding
                Some(_) => {
                    self.error(local.name_loc, format!("duplicate definition \"{name}\""));
                }
                None => self.scope.define(name, n),
            }
        }
        n
    }

    /// Moving a value into a fresh binding is initialization, not
    /// assignment; equivalently-typed owners are allowed here.
    pub(crate) fn owner_init_ok(&self, dst: NodeId, src: NodeId) -> bool {
        compat::equivalent(self.ast, self.target, dst, src)
            && compat::is_owner(self.ast, compat::canonical(self.ast, self.target, dst))
    }

    /// The effective type of a `this` parameter: by value for primitives
    /// and small immutable structs, a reference otherwise.
    fn this_param_type(&mut self, recv: NodeId, is_mut: bool) -> NodeId {
        if is_mut {
            return self.make_ref(recv, true);
        }
        let c = compat::canonical(self.ast, self.target, recv);
        if self.ast[c].is_prim_type() {
            return recv;
        }
        if matches!(self.ast[c].kind, NodeKind::StructType(_))
            && self.type_size(c) <= 2 * self.target.ptr_size as u64
        {
            return recv;
        }
        self.make_ref(recv, false)
    }

    pub(crate) fn make_ref(&mut self, elem: NodeId, mutable: bool) -> NodeId {
        let loc = self.loc_of(elem);
        let t = if mutable { self.ast.mutref_type(elem, loc) } else { self.ast.ref_type(elem, loc) };
        self.typ(t)
    }

    pub(crate) fn make_optional(&mut self, elem: NodeId) -> NodeId {
        let loc = self.loc_of(elem);
        let t = self.ast.optional_type(elem, loc);
        self.typ(t)
    }

    // -- blocks -------------------------------------------------------------

    fn check_block(&mut self, n: NodeId) -> NodeId {
        let mut children = match &self.ast[n].kind {
            NodeKind::Block { children } => children.clone(),
            _ => return n,
        };
        let rvalue = self.flags(n).contains(NodeFlags::RVALUE);

        self.scope.enter();
        let mut exited = false;
        let mut last_ty = NodeId::VOID;
        let mut checked_upto = children.len();
        let count = children.len();
        for i in 0..count {
            if exited {
                // Everything after an unconditional exit is unused and not
                // checked.
                checked_upto = i;
                break;
            }
            let is_last = i + 1 == count;
            let c = children[i];
            let c2 = if rvalue && is_last { self.check_rvalue(c) } else { self.check_expr(c) };
            children[i] = c2;
            if self.exits(c2) {
                exited = true;
                self.add_flags(n, NodeFlags::EXIT);
            }
            if is_last {
                last_ty = self.ty_of(c2);
            }
        }

        for (i, &c) in children.iter().enumerate().take(checked_upto) {
            let is_value = rvalue && i + 1 == count;
            if is_value || self.ast[c].nuse > 0 {
                continue;
            }
            match &self.ast[c].kind {
                NodeKind::Var(l) | NodeKind::Let(l) => {
                    if l.name != sym::UNDERSCORE && !l.name.as_str().starts_with('_') {
                        let (name, loc) = (l.name, l.name_loc);
                        self.warning(loc, format!("unused variable \"{name}\""));
                    }
                }
                _ => {
                    if !self.has_side_effects(c) {
                        let loc = self.loc_of(c);
                        self.warning(loc, "unused expression");
                    }
                }
            }
        }
        self.scope.leave();

        if let NodeKind::Block { children: slot } = &mut self.ast[n].kind {
            *slot = children;
        }
        let ty = if rvalue && !exited { last_ty } else { NodeId::VOID };
        self.set_ty(n, ty);
        n
    }

    /// Does this statement unconditionally leave the enclosing block?
    fn exits(&self, n: NodeId) -> bool {
        match &self.ast[n].kind {
            NodeKind::Return { .. } => true,
            NodeKind::Block { .. } | NodeKind::If(_) => {
                self.ast[n].flags.contains(NodeFlags::EXIT)
            }
            _ => false,
        }
    }

    fn has_side_effects(&self, n: NodeId) -> bool {
        match &self.ast[n].kind {
            NodeKind::Call(_)
            | NodeKind::Assign(_)
            | NodeKind::Return { .. }
            | NodeKind::TypeCons(_)
            | NodeKind::Var(_)
            | NodeKind::Let(_)
            | NodeKind::Fun(_)
            | NodeKind::For(_) => true,
            NodeKind::PrefixOp(d) | NodeKind::PostfixOp(d)
                if matches!(d.op, Op::Inc | Op::Dec) =>
            {
                true
            }
            _ => self.ast[n].kind.children().iter().any(|&c| self.has_side_effects(c)),
        }
    }

    // -- if -----------------------------------------------------------------

    fn check_if(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::If(d) => d.clone(),
            _ => return n,
        };
        let rvalue = self.flags(n).contains(NodeFlags::RVALUE);

        self.scope.enter(); // holds condition definitions and narrowed bindings
        let cond = self.check_rvalue_ctx(d.cond, NodeId::BOOL);

        let narrowing = if self.flags(cond).contains(NodeFlags::UNKNOWN) {
            Default::default()
        } else {
            self.narrow_condition(cond)
        };

        let ct = compat::canonical(self.ast, self.target, self.ty_of(cond));
        let cond_ok = ct == NodeId::BOOL
            || self.optional_inner(self.ty_of(cond)).is_some()
            || self.flags(cond).intersects(NodeFlags::NARROWED | NodeFlags::UNKNOWN);
        if !cond_ok {
            let loc = self.loc_of(cond);
            let t = self.type_str(self.ty_of(cond));
            self.error(loc, format!("invalid condition of type {t}"));
        }

        for &(name, def) in &narrowing.then_defs {
            self.scope.define(name, def);
        }
        if rvalue {
            self.add_flags(d.then_block, NodeFlags::RVALUE);
        }
        let then_block = self.check_expr(d.then_block);
        self.scope.leave();

        let else_block = d.else_block.map(|e| {
            self.scope.enter();
            for &(name, def) in &narrowing.else_defs {
                self.scope.define(name, def);
            }
            if rvalue {
                self.add_flags(e, NodeFlags::RVALUE);
            }
            let e2 = self.check_expr(e);
            self.scope.leave();
            e2
        });

        if let NodeKind::If(slot) = &mut self.ast[n].kind {
            slot.cond = cond;
            slot.then_block = then_block;
            slot.else_block = else_block;
        }

        if rvalue {
            let tt = self.ty_of(then_block);
            match else_block {
                Some(e) => {
                    let et = self.ty_of(e);
                    let then_exits = self.flags(then_block).contains(NodeFlags::EXIT);
                    let else_exits = self.flags(e).contains(NodeFlags::EXIT);
                    if compat::equivalent(self.ast, self.target, tt, et) {
                        self.set_ty(n, tt);
                    } else if then_exits {
                        self.set_ty(n, et);
                    } else if else_exits {
                        self.set_ty(n, tt);
                    } else {
                        if !self.is_unknown(then_block) && !self.is_unknown(e) {
                            let loc = self.loc_of(n);
                            let msg = format!(
                                "incompatible types in if branches: {} and {}",
                                self.type_str(tt),
                                self.type_str(et)
                            );
                            self.error(loc, msg);
                        }
                        self.set_ty(n, tt);
                    }
                    if then_exits && else_exits {
                        self.add_flags(n, NodeFlags::EXIT);
                    }
                }
                None => {
                    // No else-branch: the value may be absent.
                    let ty =
                        if tt == NodeId::VOID { NodeId::VOID } else { self.make_optional(tt) };
                    self.set_ty(n, ty);
                }
            }
        } else {
            self.set_ty(n, NodeId::VOID);
        }
        n
    }

    // -- return -------------------------------------------------------------

    fn check_return(&mut self, n: NodeId) -> NodeId {
        let value = match &self.ast[n].kind {
            NodeKind::Return { value } => *value,
            _ => return n,
        };
        let loc = self.loc_of(n);
        self.set_ty(n, NodeId::VOID);

        let Some(&fun) = self.fun_stack.last() else {
            self.error(loc, "return outside of function");
            return n;
        };
        let (result, fname, result_loc) = match &self.ast[fun].kind {
            NodeKind::Fun(f) => (f.result, f.name, f.result_loc),
            _ => return n,
        };

        match value {
            Some(v) => {
                let v2 = self.check_rvalue_ctx(v, result);
                if let NodeKind::Return { value } = &mut self.ast[n].kind {
                    *value = Some(v2);
                }
                let vt = self.ty_of(v2);
                if !compat::assignable(self.ast, self.target, result, vt)
                    && !self.owner_init_ok(result, vt)
                    && !self.is_unknown(v2)
                {
                    let vloc = self.loc_of(v2);
                    self.error(vloc, format!("invalid function result type: {}", self.type_str(vt)));
                    if let Some(fname) = fname {
                        self.help(
                            result_loc,
                            format!("function {} returns {}", fname, self.type_str(result)),
                        );
                    }
                }
            }
            None => {
                if result != NodeId::VOID {
                    self.error(loc, "missing return value");
                    if let Some(fname) = fname {
                        self.help(
                            result_loc,
                            format!("function {} returns {}", fname, self.type_str(result)),
                        );
                    }
                }
            }
        }
        n
    }

    // -- calls --------------------------------------------------------------

    fn check_call(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::Call(d) => d.clone(),
            _ => return n,
        };
        let recv = self.check_rvalue(d.recv);
        if let NodeKind::Call(slot) = &mut self.ast[n].kind {
            slot.recv = recv;
        }
        if self.is_unknown(recv) {
            self.inherit_unknown(n, recv);
            let t = self.error_ty();
            self.set_ty(n, t);
            return n;
        }

        // A call of a type is a construction or cast.
        let type_target = if self.ast[recv].is_type() {
            Some(recv)
        } else {
            match &self.ast[recv].kind {
                NodeKind::Id(id) => id.target.filter(|&t| self.ast[t].is_type()),
                _ => None,
            }
        };
        if let Some(t) = type_target {
            return self.check_cons(n, t, d.args);
        }

        let ft = compat::canonical(self.ast, self.target, self.ty_of(recv));
        if matches!(self.ast[ft].kind, NodeKind::FunType(_)) {
            return self.check_fun_call(n, recv, ft, d.args);
        }

        let loc = self.loc_of(n);
        let t = self.type_str(self.ty_of(recv));
        self.error(loc, format!("cannot call value of type {t}"));
        let et = self.error_ty();
        self.set_ty(n, et);
        n
    }

    fn check_typecons(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::TypeCons(d) => d.clone(),
            _ => return n,
        };
        self.check_cons(n, d.ty, d.args)
    }

    /// Type construction or cast: `T(args...)`. Rewrites `n` into a
    /// `TypeCons` (or collapses a no-op cast into its argument).
    fn check_cons(&mut self, n: NodeId, t: NodeId, args: Vec<NodeId>) -> NodeId {
        let t = self.typ(t);
        let loc = self.loc_of(n);
        let tc = compat::canonical(self.ast, self.target, t);

        match &self.ast[tc].kind {
            NodeKind::Prim(PrimType::Void) => {
                if !args.is_empty() {
                    self.error(loc, format!("wrong number of arguments: expected 0, got {}", args.len()));
                }
                self.ast[n].kind =
                    NodeKind::TypeCons(cinderc_ast::TypeConsData { ty: t, args: Vec::new() });
                self.set_ty(n, t);
                n
            }
            NodeKind::Prim(_) => {
                if args.len() != 1 {
                    self.error(
                        loc,
                        format!("wrong number of arguments in type conversion: expected 1, got {}", args.len()),
                    );
                    self.ast[n].kind = NodeKind::TypeCons(cinderc_ast::TypeConsData { ty: t, args });
                    self.set_ty(n, t);
                    return n;
                }
                let a = self.check_rvalue_ctx(args[0], t);
                let at = self.ty_of(a);
                if compat::equivalent(self.ast, self.target, t, at) {
                    // Casting to the same type is a no-op.
                    return a;
                }
                if !compat::convertible(self.ast, self.target, t, at) && !self.is_unknown(a) {
                    self.error(
                        self.loc_of(a),
                        format!("cannot convert value of type {} to {}", self.type_str(at), self.type_str(t)),
                    );
                }
                if self.flags(a).contains(NodeFlags::CONST) {
                    self.add_flags(n, NodeFlags::CONST);
                }
                self.ast[n].kind =
                    NodeKind::TypeCons(cinderc_ast::TypeConsData { ty: t, args: vec![a] });
                self.set_ty(n, t);
                n
            }
            NodeKind::StructType(_) => self.check_struct_cons(n, t, tc, args),
            _ => {
                self.error(loc, format!("constructing {} is not implemented", self.type_str(t)));
                self.set_ty(n, t);
                n
            }
        }
    }

    fn check_struct_cons(
        &mut self,
        n: NodeId,
        t: NodeId,
        st: NodeId,
        args: Vec<NodeId>,
    ) -> NodeId {
        let fields = match &self.ast[st].kind {
            NodeKind::StructType(d) => d.fields.clone(),
            _ => return n,
        };
        let loc = self.loc_of(n);
        if args.len() > fields.len() {
            self.error(
                loc,
                format!("wrong number of arguments: expected at most {}, got {}", fields.len(), args.len()),
            );
        }

        let field_named = |tc: &Self, f: NodeId| tc.ast[f].local().map(|l| l.name);
        let mut seen: FxHashSet<Symbol> = FxHashSet::default();
        let mut out_args = Vec::with_capacity(args.len());

        for arg in args.into_iter().take(fields.len()) {
            let (fname, named_value): (Symbol, Option<NodeId>) = match &self.ast[arg].kind {
                NodeKind::Param(l) => (l.name, l.init),
                NodeKind::Id(d) => (d.name, None),
                _ => {
                    let aloc = self.loc_of(arg);
                    self.error(
                        aloc,
                        "invalid struct constructor argument; expecting a field name or \"name: value\"",
                    );
                    continue;
                }
            };
            let Some(fidx) = fields.iter().position(|&f| field_named(self, f) == Some(fname))
            else {
                let aloc = self.loc_of(arg);
                self.error(aloc, format!("no field \"{}\" in struct {}", fname, self.type_str(t)));
                continue;
            };
            if !seen.insert(fname) {
                let aloc = self.loc_of(arg);
                self.error(aloc, format!("duplicate field \"{fname}\""));
                continue;
            }
            let fty = self.ast[fields[fidx]].local().map(|l| l.ty).unwrap_or(NodeId::UNKNOWN);

            let value = match named_value {
                Some(v) => {
                    // `name: value` — checked under the field's type, then
                    // recorded on the argument node.
                    self.add_flags(n, NodeFlags::NAMEDPARAMS);
                    let v2 = self.check_rvalue_ctx(v, fty);
                    self.ast[arg].flags.insert(NodeFlags::CHECKED);
                    self.ast[arg].ty = fty;
                    if let Some(l) = self.ast[arg].local_mut() {
                        l.ty = fty;
                        l.init = Some(v2);
                    }
                    out_args.push(arg);
                    v2
                }
                None => {
                    // Positional identifier matching a field name.
                    let v2 = self.check_rvalue_ctx(arg, fty);
                    out_args.push(v2);
                    v2
                }
            };

            let vt = self.ty_of(value);
            if !compat::assignable(self.ast, self.target, fty, vt)
                && !self.owner_init_ok(fty, vt)
                && !self.is_unknown(value)
            {
                let vloc = self.loc_of(value);
                self.error(
                    vloc,
                    format!(
                        "cannot assign value of type {} to field of type {}",
                        self.type_str(vt),
                        self.type_str(fty)
                    ),
                );
            }
        }

        self.ast[n].kind = NodeKind::TypeCons(cinderc_ast::TypeConsData { ty: t, args: out_args });
        self.set_ty(n, t);
        n
    }

    fn check_fun_call(
        &mut self,
        n: NodeId,
        recv: NodeId,
        ft: NodeId,
        args: Vec<NodeId>,
    ) -> NodeId {
        let (params, result) = match &self.ast[ft].kind {
            NodeKind::FunType(d) => (d.params.clone(), d.result),
            _ => return n,
        };
        let loc = self.loc_of(n);

        // A leading `this` is supplied by the member lowering and does not
        // count against call arity.
        let this_offset =
            params.first().map_or(false, |&p| self.ast[p].local().is_some_and(|l| l.is_this))
                as usize;
        let avail: Vec<NodeId> = params[this_offset..].to_vec();
        let pname = |tc: &Self, p: NodeId| tc.ast[p].local().map(|l| l.name);
        let pty =
            |tc: &Self, p: NodeId| tc.ast[p].local().map(|l| l.ty).unwrap_or(NodeId::UNKNOWN);

        let mut bound: Vec<Option<NodeId>> = vec![None; avail.len()];
        let mut out_args = Vec::with_capacity(args.len());
        let mut seen_named = false;
        let mut arity_error = false;

        for (i, arg) in args.iter().copied().enumerate() {
            if let NodeKind::Param(l) = &self.ast[arg].kind {
                let (aname, ainit) = (l.name, l.init);
                seen_named = true;
                self.add_flags(n, NodeFlags::NAMEDPARAMS);
                let aloc = self.loc_of(arg);
                let Some(j) = avail.iter().position(|&p| pname(self, p) == Some(aname)) else {
                    self.error(aloc, format!("no parameter named \"{aname}\""));
                    continue;
                };
                if bound[j].is_some() {
                    self.error(aloc, format!("duplicate argument \"{aname}\""));
                    continue;
                }
                if j < i {
                    self.error(aloc, format!("named argument \"{aname}\" is in the wrong position"));
                }
                let want = pty(self, avail[j]);
                let Some(v) = ainit else { continue };
                let v2 = self.check_rvalue_ctx(v, want);
                self.ast[arg].flags.insert(NodeFlags::CHECKED);
                self.ast[arg].ty = want;
                if let Some(l) = self.ast[arg].local_mut() {
                    l.ty = want;
                    l.init = Some(v2);
                }
                self.check_arg_type(v2, want, aname);
                bound[j] = Some(arg);
                out_args.push(arg);
            } else {
                if seen_named {
                    let aloc = self.loc_of(arg);
                    self.error(aloc, "positional argument after named argument");
                }
                if i >= avail.len() {
                    if !arity_error {
                        self.error(
                            loc,
                            format!("wrong number of arguments: expected {}, got {}", avail.len(), args.len()),
                        );
                        arity_error = true;
                    }
                    continue;
                }
                let want = pty(self, avail[i]);
                let v2 = self.check_rvalue_ctx(arg, want);
                let want_name = pname(self, avail[i]).unwrap_or(sym::UNDERSCORE);
                self.check_arg_type(v2, want, want_name);
                bound[i] = Some(v2);
                out_args.push(v2);
            }
        }

        if !arity_error && bound.iter().any(Option::is_none) {
            self.error(
                loc,
                format!("wrong number of arguments: expected {}, got {}", avail.len(), out_args.len()),
            );
        }

        if let NodeKind::Call(slot) = &mut self.ast[n].kind {
            slot.recv = recv;
            slot.args = out_args;
        }
        self.set_ty(n, result);

        if !self.flags(n).contains(NodeFlags::RVALUE) {
            let rc = compat::canonical(self.ast, self.target, result);
            if compat::is_owner(self.ast, rc) {
                self.warning(loc, "unused result; ownership transferred");
            }
        }
        n
    }

    fn check_arg_type(&mut self, arg: NodeId, want: NodeId, pname: Symbol) {
        let at = self.ty_of(arg);
        if !compat::assignable(self.ast, self.target, want, at)
            && !self.owner_init_ok(want, at)
            && !self.is_unknown(arg)
        {
            let loc = self.loc_of(arg);
            self.error(
                loc,
                format!(
                    "cannot pass value of type {} to parameter \"{}\" of type {}",
                    self.type_str(at),
                    pname,
                    self.type_str(want)
                ),
            );
        }
    }

    // -- operators ----------------------------------------------------------

    fn check_binop(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::BinOp(d) => d.clone(),
            _ => return n,
        };
        let left = self.check_rvalue(d.left);
        let lt = self.ty_of(left);
        let right = self.check_rvalue_ctx(d.right, lt);
        if let NodeKind::BinOp(slot) = &mut self.ast[n].kind {
            slot.left = left;
            slot.right = right;
        }
        self.inherit_unknown(n, left);
        self.inherit_unknown(n, right);
        let rt = self.ty_of(right);
        let loc = self.loc_of(n);
        let unknown = self.is_unknown(left) || self.is_unknown(right);

        if d.op.is_comparison() {
            if !compat::equivalent(self.ast, self.target, lt, rt) && !unknown {
                self.error(
                    loc,
                    format!("cannot compare values of type {} and {}", self.type_str(lt), self.type_str(rt)),
                );
            }
            self.set_ty(n, NodeId::BOOL);
            if !unknown && !self.op_allowed(lt, d.op) {
                self.op_error(loc, d.op, lt);
            }
            return n;
        }

        if matches!(d.op, Op::LAnd | Op::LOr) {
            for side in [left, right] {
                if unknown {
                    break;
                }
                if !self.bool_like(side) {
                    let sloc = self.loc_of(side);
                    let t = self.type_str(self.ty_of(side));
                    self.error(sloc, format!("invalid operand of type {} for '{}'", t, d.op.as_str()));
                }
            }
            self.set_ty(n, NodeId::BOOL);
            return n;
        }

        // Arithmetic, bitwise and shift operators.
        if !compat::compatible(self.ast, self.target, lt, rt) && !unknown {
            self.error(
                loc,
                format!(
                    "mismatched types {} and {} in '{}' operation",
                    self.type_str(lt),
                    self.type_str(rt),
                    d.op.as_str()
                ),
            );
        }
        self.set_ty(n, lt);
        if !unknown && !self.op_allowed(lt, d.op) {
            self.op_error(loc, d.op, lt);
        }
        n
    }

    /// Valid operand of `&&`, `||`, `!` and `if`: bool, optional, or a
    /// flow-narrowed binding.
    fn bool_like(&self, n: NodeId) -> bool {
        let t = compat::canonical(self.ast, self.target, self.ty_of(n));
        t == NodeId::BOOL
            || self.optional_inner(self.ty_of(n)).is_some()
            || self.flags(n).contains(NodeFlags::NARROWED)
    }

    fn op_error(&mut self, loc: cinderc_util::Loc, op: Op, t: NodeId) {
        self.error(
            loc,
            format!("operator '{}' is not defined for type {}", op.as_str(), self.type_str(t)),
        );
    }

    /// Which operators a type admits.
    fn op_allowed(&self, t: NodeId, op: Op) -> bool {
        let c = compat::canonical(self.ast, self.target, t);
        let base = op.compound_base().unwrap_or(op);
        match &self.ast[c].kind {
            NodeKind::Prim(p) => {
                if p.is_int() {
                    return !base.is_logical();
                }
                if p.is_float() {
                    return matches!(
                        base,
                        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Neg | Op::Assign
                    ) || base.is_comparison();
                }
                match p {
                    PrimType::Bool => {
                        matches!(base, Op::LAnd | Op::LOr | Op::Not | Op::Eq | Op::NotEq | Op::Assign)
                    }
                    _ => false,
                }
            }
            NodeKind::OptionalType(_) => {
                matches!(base, Op::LAnd | Op::LOr | Op::Not | Op::Eq | Op::NotEq | Op::Assign)
            }
            // Structs and pointer-like types: identity comparison and
            // assignment only.
            _ => matches!(base, Op::Eq | Op::NotEq | Op::Assign),
        }
    }

    fn check_assign(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::Assign(d) => d.clone(),
            _ => return n,
        };

        // `_ = expr` evaluates and discards.
        if let NodeKind::Id(id) = &self.ast[d.lhs].kind {
            if id.name == sym::UNDERSCORE {
                let rhs = self.check_rvalue(d.rhs);
                let rt = self.ty_of(rhs);
                self.ast[d.lhs].flags.insert(NodeFlags::CHECKED);
                self.ast[d.lhs].ty = rt;
                if let NodeKind::Assign(slot) = &mut self.ast[n].kind {
                    slot.rhs = rhs;
                }
                self.set_ty(n, rt);
                return n;
            }
        }

        let lhs = self.check_expr(d.lhs);
        let lt = self.ty_of(lhs);
        let rhs = self.check_rvalue_ctx(d.rhs, lt);
        if let NodeKind::Assign(slot) = &mut self.ast[n].kind {
            slot.lhs = lhs;
            slot.rhs = rhs;
        }
        self.inherit_unknown(n, lhs);
        self.inherit_unknown(n, rhs);
        let rt = self.ty_of(rhs);
        let loc = self.loc_of(n);
        let unknown = self.is_unknown(lhs) || self.is_unknown(rhs);

        if let Some(base) = d.op.compound_base() {
            if !unknown && !compat::compatible(self.ast, self.target, lt, rt) {
                self.error(
                    loc,
                    format!(
                        "mismatched types {} and {} in '{}' operation",
                        self.type_str(lt),
                        self.type_str(rt),
                        base.as_str()
                    ),
                );
            }
            if !unknown && !self.op_allowed(lt, d.op) {
                self.op_error(loc, d.op, lt);
            }
        } else if !unknown && !compat::assignable(self.ast, self.target, lt, rt) {
            let lc = compat::canonical(self.ast, self.target, lt);
            if compat::equivalent(self.ast, self.target, lt, rt) && compat::is_owner(self.ast, lc)
            {
                self.error(
                    loc,
                    format!("cannot assign to owner of type {}; owners can only be moved", self.type_str(lt)),
                );
            } else {
                self.error(
                    loc,
                    format!("cannot assign value of type {} to {}", self.type_str(rt), self.type_str(lt)),
                );
            }
        }

        self.check_assign_target(lhs);
        self.set_ty(n, lt);
        n
    }

    /// Validate that the left-hand side of an assignment is writable.
    fn check_assign_target(&mut self, l: NodeId) {
        if self.is_unknown(l) {
            return;
        }
        match &self.ast[l].kind {
            NodeKind::Id(d) => {
                let name = d.name;
                let Some(target) = d.target else { return };
                if self.ast[target].flags.contains(NodeFlags::NARROWED) {
                    let loc = self.loc_of(l);
                    self.error(loc, format!("cannot assign to type-narrowed binding \"{name}\""));
                    return;
                }
                match &self.ast[target].kind {
                    NodeKind::Var(_) => {}
                    NodeKind::Let(_) | NodeKind::Param(_) | NodeKind::Field(_) => {
                        let word = self.ast[target].local_kind_name();
                        let loc = self.loc_of(l);
                        self.error(loc, format!("cannot assign to {word} \"{name}\""));
                    }
                    _ => {
                        let loc = self.loc_of(l);
                        self.error(loc, format!("cannot assign to \"{name}\""));
                    }
                }
            }
            NodeKind::Member(d) => {
                let recv = d.recv;
                let rt = compat::unwrap_alias(self.ast, self.ty_of(recv));
                match &self.ast[rt].kind {
                    NodeKind::MutRefType(_) | NodeKind::PtrType(_) => {}
                    NodeKind::RefType(_) => {
                        let loc = self.loc_of(l);
                        let t = self.type_str(rt);
                        self.error(loc, format!("cannot assign through reference of type {t}"));
                    }
                    NodeKind::StructType(_) => {
                        // A struct value: the receiver chain itself must be
                        // writable, and a by-value parameter is not (except
                        // `this`).
                        if let NodeKind::Id(id) = &self.ast[recv].kind {
                            let name = id.name;
                            if let Some(t) = id.target {
                                if let Some(lp) = self.ast[t].local() {
                                    if matches!(self.ast[t].kind, NodeKind::Param(_))
                                        && !lp.is_this
                                    {
                                        let loc = self.loc_of(l);
                                        self.error(
                                            loc,
                                            format!("cannot assign to member of parameter \"{name}\""),
                                        );
                                    }
                                }
                            }
                        } else {
                            self.check_assign_target(recv);
                        }
                    }
                    _ => {}
                }
            }
            NodeKind::Deref { expr } => {
                let st = compat::unwrap_alias(self.ast, self.ty_of(*expr));
                match &self.ast[st].kind {
                    NodeKind::PtrType(_) | NodeKind::MutRefType(_) => {}
                    NodeKind::RefType(_) => {
                        let loc = self.loc_of(l);
                        let t = self.type_str(st);
                        self.error(loc, format!("cannot assign through reference of type {t}"));
                    }
                    _ => {
                        let loc = self.loc_of(l);
                        self.error(loc, "invalid assignment target");
                    }
                }
            }
            NodeKind::Subscript(_) => {}
            _ => {
                let loc = self.loc_of(l);
                self.error(loc, "invalid assignment target");
            }
        }
    }

    fn check_prefix_op(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::PrefixOp(d) => d.clone(),
            _ => return n,
        };
        let loc = self.loc_of(n);
        match d.op {
            Op::Ref | Op::MutRef => {
                let e = self.check_rvalue(d.expr);
                self.store_op_expr(n, e);
                let ty = self.make_ref(self.ty_of(e), d.op == Op::MutRef);
                self.set_ty(n, ty);
            }
            Op::Not => {
                let e = self.check_rvalue_ctx(d.expr, NodeId::BOOL);
                self.store_op_expr(n, e);
                if !self.bool_like(e) && !self.is_unknown(e) {
                    self.op_error(loc, Op::Not, self.ty_of(e));
                }
                self.set_ty(n, NodeId::BOOL);
            }
            Op::Neg => {
                let e = self.check_rvalue(d.expr);
                self.store_op_expr(n, e);
                let et = self.ty_of(e);
                let c = compat::canonical(self.ast, self.target, et);
                let numeric =
                    matches!(&self.ast[c].kind, NodeKind::Prim(p) if p.is_numeric());
                if !numeric && !self.is_unknown(e) {
                    self.op_error(loc, Op::Neg, et);
                }
                if self.flags(e).contains(NodeFlags::CONST) {
                    self.add_flags(n, NodeFlags::CONST);
                }
                self.set_ty(n, et);
            }
            Op::Inc | Op::Dec => self.check_incdec(n, d.expr, d.op),
            _ => {
                let e = self.check_rvalue(d.expr);
                self.store_op_expr(n, e);
                let et = self.ty_of(e);
                self.set_ty(n, et);
            }
        }
        let e = match &self.ast[n].kind {
            NodeKind::PrefixOp(d) => d.expr,
            _ => return n,
        };
        self.inherit_unknown(n, e);
        n
    }

    fn check_postfix_op(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::PostfixOp(d) => d.clone(),
            _ => return n,
        };
        match d.op {
            Op::Inc | Op::Dec => self.check_incdec(n, d.expr, d.op),
            _ => {
                let e = self.check_rvalue(d.expr);
                self.store_op_expr(n, e);
                let et = self.ty_of(e);
                self.set_ty(n, et);
            }
        }
        n
    }

    fn check_incdec(&mut self, n: NodeId, expr: NodeId, op: Op) {
        let e = self.check_expr(expr);
        self.store_op_expr(n, e);
        self.check_assign_target(e);
        let et = self.ty_of(e);
        if !self.is_unknown(e) && !self.op_allowed(et, Op::Add) {
            let loc = self.loc_of(n);
            self.op_error(loc, op, et);
        }
        self.set_ty(n, et);
    }

    fn store_op_expr(&mut self, n: NodeId, e: NodeId) {
        match &mut self.ast[n].kind {
            NodeKind::PrefixOp(d) | NodeKind::PostfixOp(d) => d.expr = e,
            _ => {}
        }
    }

    fn check_deref(&mut self, n: NodeId) -> NodeId {
        let expr = match &self.ast[n].kind {
            NodeKind::Deref { expr } => *expr,
            _ => return n,
        };
        let e = self.check_rvalue(expr);
        if let NodeKind::Deref { expr: slot } = &mut self.ast[n].kind {
            *slot = e;
        }
        self.inherit_unknown(n, e);
        let t = compat::unwrap_alias(self.ast, self.ty_of(e));
        let loc = self.loc_of(n);
        match &self.ast[t].kind {
            NodeKind::PtrType(d) => {
                let elem = d.elem;
                self.set_ty(n, elem);
            }
            NodeKind::RefType(d) | NodeKind::MutRefType(d) => {
                let elem = d.elem;
                let ec = compat::canonical(self.ast, self.target, elem);
                if compat::is_owner(self.ast, ec) {
                    self.error(
                        loc,
                        format!("cannot move owner value of type {} out of reference", self.type_str(elem)),
                    );
                }
                self.set_ty(n, elem);
            }
            _ => {
                if !self.is_unknown(e) {
                    let ts = self.type_str(self.ty_of(e));
                    self.error(loc, format!("cannot dereference value of type {ts}"));
                }
                let et = self.error_ty();
                self.set_ty(n, et);
            }
        }
        n
    }

    // -- member access ------------------------------------------------------

    fn check_member(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::Member(d) => d.clone(),
            _ => return n,
        };
        let recv = self.check_rvalue(d.recv);
        if let NodeKind::Member(slot) = &mut self.ast[n].kind {
            slot.recv = recv;
        }
        if self.is_unknown(recv) {
            self.inherit_unknown(n, recv);
            let t = self.error_ty();
            self.set_ty(n, t);
            return n;
        }
        let rt = self.ty_of(recv);

        // Member of an imported package namespace.
        if let NodeKind::Id(id) = &self.ast[recv].kind {
            if let Some(t) = id.target {
                if let NodeKind::NsExpr(ns) = &self.ast[t].kind {
                    let (nsname, member) = (
                        ns.name,
                        ns.members.iter().find(|(mn, _)| *mn == d.name).map(|&(_, m)| m),
                    );
                    return self.resolve_ns_member(n, nsname, d.name, member);
                }
            }
        }

        // Optional receivers must be narrowed before use.
        if self.optional_inner(rt).is_some() {
            self.error(d.name_loc, "optional value may not be valid");
            if let NodeKind::Id(id) = &self.ast[recv].kind {
                let rname = id.name;
                self.help(
                    d.name_loc,
                    format!("check it first, e.g. \"if {rname} {rname}.{}\"", d.name),
                );
            }
            let t = self.error_ty();
            self.set_ty(n, t);
            return n;
        }

        let base = compat::unwrap_ptrs(self.ast, rt);

        // Struct fields.
        if let NodeKind::StructType(st) = &self.ast[base].kind {
            let field = st
                .fields
                .iter()
                .copied()
                .find(|&f| self.ast[f].local().map(|l| l.name) == Some(d.name));
            if let Some(f) = field {
                self.ast.mark_used(f);
                if let NodeKind::Member(slot) = &mut self.ast[n].kind {
                    slot.target = Some(f);
                }
                let fty = self.ast[f].local().map(|l| l.ty).unwrap_or(NodeId::UNKNOWN);
                self.set_ty(n, fty);
                return n;
            }
        }

        // Type functions, keyed by the receiver's unwrapped-pointer
        // type-id.
        let tid = self.typeid(base);
        if let Some(&fun) = self.pkgs.get(self.pkg).tfundefs.get(&(tid, d.name)) {
            self.check_fun_signature(fun);
            self.ast.mark_used(fun);
            if let NodeKind::Member(slot) = &mut self.ast[n].kind {
                slot.target = Some(fun);
            }
            let fty = self.ty_of(fun);
            self.set_ty(n, fty);
            return n;
        }

        self.error(
            d.name_loc,
            format!("type {} has no member \"{}\"", self.type_str(rt), d.name),
        );
        self.add_flags(n, NodeFlags::UNKNOWN);
        let t = self.error_ty();
        self.set_ty(n, t);
        n
    }

    fn resolve_ns_member(
        &mut self,
        n: NodeId,
        nsname: Symbol,
        name: Symbol,
        member: Option<NodeId>,
    ) -> NodeId {
        match member {
            Some(m) => {
                self.ast.mark_used(m);
                let ty = if self.ast[m].is_type() { self.typ(m) } else { self.ty_of(m) };
                if let NodeKind::Member(slot) = &mut self.ast[n].kind {
                    slot.target = Some(m);
                }
                self.set_ty(n, ty);
            }
            None => {
                let loc = self.loc_of(n);
                self.error(loc, format!("\"{nsname}\" has no member \"{name}\""));
                self.add_flags(n, NodeFlags::UNKNOWN);
                let t = self.error_ty();
                self.set_ty(n, t);
            }
        }
        n
    }

    // -- subscripts ---------------------------------------------------------

    fn check_subscript(&mut self, n: NodeId) -> NodeId {
        let d = match &self.ast[n].kind {
            NodeKind::Subscript(d) => d.clone(),
            _ => return n,
        };
        let recv = self.check_rvalue(d.recv);
        let index = self.check_rvalue_ctx(d.index, NodeId::UINT);
        if let NodeKind::Subscript(slot) = &mut self.ast[n].kind {
            slot.recv = recv;
            slot.index = index;
        }
        self.inherit_unknown(n, recv);
        self.inherit_unknown(n, index);

        let base = compat::unwrap_refs(self.ast, self.ty_of(recv));
        let (elem, arr_len) = match &self.ast[base].kind {
            NodeKind::ArrayType(a) => (a.elem, Some(a.len)),
            NodeKind::SliceType(s) | NodeKind::MutSliceType(s) => (s.elem, None),
            _ => {
                if !self.is_unknown(recv) {
                    let loc = self.loc_of(n);
                    let t = self.type_str(self.ty_of(recv));
                    self.error(loc, format!("cannot index value of type {t}"));
                }
                let t = self.error_ty();
                self.set_ty(n, t);
                return n;
            }
        };

        match self.ast[index].kind {
            NodeKind::IntLit { value } => {
                // Constant index: bounds-check against a known array length.
                if let Some(len) = arr_len {
                    if value >= len {
                        let iloc = self.loc_of(index);
                        self.error(iloc, format!("array index {value} out of bounds (length {len})"));
                    }
                }
                if let NodeKind::Subscript(slot) = &mut self.ast[n].kind {
                    slot.index_val = value;
                }
            }
            _ => {
                let ic = compat::canonical(self.ast, self.target, self.ty_of(index));
                let is_uint = matches!(
                    &self.ast[ic].kind,
                    NodeKind::Prim(p) if p.is_int() && !p.is_signed_int()
                );
                if !is_uint && !self.is_unknown(index) {
                    let iloc = self.loc_of(index);
                    let t = self.type_str(self.ty_of(index));
                    self.error(iloc, format!("invalid array index type {t}; expecting uint"));
                }
            }
        }
        self.set_ty(n, elem);
        n
    }

    // -- literals -----------------------------------------------------------

    fn check_int_lit(&mut self, n: NodeId) -> NodeId {
        let value = match self.ast[n].kind {
            NodeKind::IntLit { value } => value,
            _ => return n,
        };
        self.add_flags(n, NodeFlags::CONST);
        let ctx = self.typectx();
        let c = compat::canonical(self.ast, self.target, ctx);

        if let NodeKind::Prim(p) = self.ast[c].kind {
            if let Some((_, max)) = p.int_range(self.target.int_size) {
                if value as u128 > max {
                    let loc = self.loc_of(n);
                    self.error(loc, format!("integer constant overflows {}", self.type_str(ctx)));
                }
                self.set_ty(n, ctx);
                return n;
            }
            if p.is_float() {
                self.set_ty(n, ctx);
                return n;
            }
        }

        // No useful context: pick the smallest type that fits, starting at
        // the target's int.
        let int_max = PrimType::Int.int_range(self.target.int_size).map(|(_, m)| m).unwrap_or(0);
        let ty = if value as u128 <= int_max {
            NodeId::INT
        } else if i64::try_from(value).is_ok() {
            NodeId::I64
        } else {
            NodeId::U64
        };
        self.set_ty(n, ty);
        n
    }

    fn check_float_lit(&mut self, n: NodeId) -> NodeId {
        let value = match self.ast[n].kind {
            NodeKind::FloatLit { value } => value,
            _ => return n,
        };
        self.add_flags(n, NodeFlags::CONST);
        let ctx = self.typectx();
        let c = compat::canonical(self.ast, self.target, ctx);
        if c == NodeId::F32 {
            // Detect values that only overflow in single precision.
            if value.is_finite() && (value as f32).is_infinite() {
                let loc = self.loc_of(n);
                self.error(loc, "float constant overflows f32");
            }
            self.set_ty(n, ctx);
        } else if c == NodeId::F64 {
            self.set_ty(n, ctx);
        } else {
            self.set_ty(n, NodeId::F64);
        }
        n
    }

    fn check_str_lit(&mut self, n: NodeId) -> NodeId {
        let len = match &self.ast[n].kind {
            NodeKind::StrLit { bytes } => bytes.len() as u64,
            _ => return n,
        };
        self.add_flags(n, NodeFlags::CONST);
        let ctx = self.typectx();
        let is_str_ctx = ctx == NodeId::STR
            || matches!(&self.ast[ctx].kind, NodeKind::AliasType(a) if a.name == sym::STR);
        if is_str_ctx {
            self.set_ty(n, NodeId::STR);
            return n;
        }
        // Without a str context a literal is a reference to a fixed-size
        // byte array: &[u8 N].
        let loc = self.loc_of(n);
        let arr = self.ast.array_type(NodeId::U8, None, loc);
        if let NodeKind::ArrayType(a) = &mut self.ast[arr].kind {
            a.len = len;
        }
        let arr = self.typ(arr);
        let ty = self.make_ref(arr, false);
        self.set_ty(n, ty);
        n
    }

    fn check_array_lit(&mut self, n: NodeId) -> NodeId {
        let mut values = match &self.ast[n].kind {
            NodeKind::ArrayLit { values } => values.clone(),
            _ => return n,
        };
        let ctx = compat::canonical(self.ast, self.target, self.typectx());

        let ty = if let NodeKind::ArrayType(a) = &self.ast[ctx].kind {
            let (elem, cap) = (a.elem, a.len);
            for (i, slot) in values.iter_mut().enumerate() {
                if (i as u64) >= cap {
                    let loc = self.loc_of(*slot);
                    self.error(loc, "excess value in array literal");
                    break;
                }
                *slot = self.check_rvalue_ctx(*slot, elem);
                self.check_element_type(*slot, elem);
            }
            self.typectx()
        } else {
            if values.is_empty() {
                let loc = self.loc_of(n);
                self.error(loc, "cannot infer the type of an empty array literal");
                let t = self.error_ty();
                self.set_ty(n, t);
                return n;
            }
            values[0] = self.check_rvalue(values[0]);
            let elem = self.ty_of(values[0]);
            for slot in values.iter_mut().skip(1) {
                *slot = self.check_rvalue_ctx(*slot, elem);
                self.check_element_type(*slot, elem);
            }
            let loc = self.loc_of(n);
            let arr = self.ast.array_type(elem, None, loc);
            if let NodeKind::ArrayType(a) = &mut self.ast[arr].kind {
                a.len = values.len() as u64;
            }
            self.typ(arr)
        };

        if values.iter().all(|&v| self.ast[v].flags.contains(NodeFlags::CONST)) {
            self.add_flags(n, NodeFlags::CONST);
        }
        if let NodeKind::ArrayLit { values: slot } = &mut self.ast[n].kind {
            *slot = values;
        }
        self.set_ty(n, ty);
        n
    }

    fn check_element_type(&mut self, v: NodeId, elem: NodeId) {
        let vt = self.ty_of(v);
        if !compat::assignable(self.ast, self.target, elem, vt) && !self.is_unknown(v) {
            let loc = self.loc_of(v);
            self.error(
                loc,
                format!(
                    "cannot assign value of type {} to element of type {}",
                    self.type_str(vt),
                    self.type_str(elem)
                ),
            );
        }
    }
}
