//! Edge case tests for cinderc-sem

#[cfg(test)]
mod tests {
    use crate::testutil::{assert_has, errors, helps, warnings, Fixture};
    use cinderc_ast::{ImportData, ImportMember, NodeFlags, NodeId, NodeKind, Op};
    use cinderc_util::{Loc, Symbol};

    fn s(name: &str) -> Symbol {
        Symbol::intern(name)
    }

    // ==================== IDENTIFIER RESOLUTION ====================

    /// EDGE CASE: Unknown identifier suggests the closest name in scope.
    #[test]
    fn test_edge_unknown_identifier_suggestion() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let one = ast.int_lit(1, Loc::NONE);
        let alpha = ast.let_(s("alpha"), NodeId::INT, Some(one), Loc::NONE);
        let typo = ast.id(s("alpah"), Loc::NONE);
        let x = ast.let_(s("x"), NodeId::INT, Some(typo), Loc::NONE);
        let unit = ast.unit(vec![], vec![alpha, x], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "unknown identifier \"alpah\"");
        assert_has(&helps(&r), "did you mean \"alpha\"?");
    }

    /// EDGE CASE: A renamed import is suggested when the original name is
    /// referenced.
    #[test]
    fn test_edge_renamed_import_suggestion() {
        let mut fx = Fixture::new();
        let def = fx.ast.let_(s("a"), NodeId::INT, None, Loc::NONE);
        fx.ast[def].flags.insert(NodeFlags::CHECKED | NodeFlags::PUB);
        fx.ast[def].ty = NodeId::INT;
        let ns = fx.ast.add(
            NodeKind::NsExpr(cinderc_ast::NsData { name: s("p"), members: vec![(s("a"), def)] }),
            Loc::NONE,
        );
        let mut pkg = cinderc_ast::Pkg::new("p");
        pkg.api_ns = Some(ns);
        let p = fx.pkgs.add(pkg);

        let imp = fx.ast.import(
            ImportData {
                path: "p".into(),
                pkg: Some(p),
                alias: None,
                members: vec![ImportMember { name: s("a"), alias: Some(s("b")), loc: Loc::NONE }],
                star: false,
                star_loc: Loc::NONE,
            },
            Loc::NONE,
        );
        let aref = fx.ast.id(s("a"), Loc::NONE);
        let x = fx.ast.let_(s("x"), NodeId::INT, Some(aref), Loc::NONE);
        let unit = fx.ast.unit(vec![imp], vec![x], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "unknown identifier \"a\"");
        assert_has(&helps(&r), "did you mean \"b\"?");
    }

    /// EDGE CASE: Duplicate top-level definitions.
    #[test]
    fn test_edge_duplicate_definition() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let b1 = ast.block(vec![], Loc::NONE);
        let f1 = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(b1), Loc::NONE);
        let b2 = ast.block(vec![], Loc::NONE);
        let f2 = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(b2), Loc::NONE);
        let unit = ast.unit(vec![], vec![f1, f2], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "duplicate definition \"f\"");
    }

    // ==================== TYPE INTERNING ====================

    /// EDGE CASE: Structurally equal struct types intern to one node.
    #[test]
    fn test_edge_struct_interning() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let xa = ast.field(s("x"), NodeId::INT, None, Loc::NONE);
        let sa = ast.struct_type(Some(s("A")), vec![xa], vec![], Loc::NONE);
        let ta = ast.typedef(s("A"), sa, Loc::NONE);
        let xb = ast.field(s("x"), NodeId::INT, None, Loc::NONE);
        let sb = ast.struct_type(Some(s("B")), vec![xb], vec![], Loc::NONE);
        let tb = ast.typedef(s("B"), sb, Loc::NONE);
        let unit = ast.unit(vec![], vec![ta, tb], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        let defs = &fx.pkgs.get(fx.pkg).defs;
        assert_eq!(defs[&s("A")], defs[&s("B")], "same structure, same node");
    }

    /// EDGE CASE: Interning a clone yields the original.
    #[test]
    fn test_edge_intern_clone() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let o1 = ast.optional_type(NodeId::INT, Loc::NONE);
        let x = ast.var(s("x"), o1, None, Loc::NONE);
        let o2 = ast.optional_type(NodeId::INT, Loc::NONE);
        let y = ast.var(s("y"), o2, None, Loc::NONE);
        let unit = ast.unit(vec![], vec![x, y], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        assert_eq!(fx.ast[x].ty, fx.ast[y].ty, "structural equality implies identity");
    }

    // ==================== LITERALS ====================

    /// EDGE CASE: Integer constant too large for its context.
    #[test]
    fn test_edge_int_overflow() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let v = ast.int_lit(256, Loc::NONE);
        let x = ast.let_(s("x"), NodeId::I8, Some(v), Loc::NONE);
        let unit = ast.unit(vec![], vec![x], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "integer constant overflows i8");
    }

    /// EDGE CASE: String literals bind to `str` in a str context and to
    /// `&[u8 N]` otherwise.
    #[test]
    fn test_edge_str_literal_types() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let l1 = ast.str_lit(*b"hi", Loc::NONE);
        let a = ast.let_(s("a"), NodeId::STR, Some(l1), Loc::NONE);
        let l2 = ast.str_lit(*b"hi", Loc::NONE);
        let b = ast.let_(s("b"), NodeId::UNKNOWN, Some(l2), Loc::NONE);
        let unit = ast.unit(vec![], vec![a, b], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        assert_eq!(fx.ast[a].ty, NodeId::STR);
        assert_eq!(fx.ast.type_str(fx.ast[b].ty), "&[u8 2]");
    }

    /// EDGE CASE: Float constant that only overflows in single precision.
    #[test]
    fn test_edge_f32_overflow() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let v = ast.float_lit(1e40, Loc::NONE);
        let x = ast.let_(s("x"), NodeId::F32, Some(v), Loc::NONE);
        let unit = ast.unit(vec![], vec![x], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "float constant overflows f32");
    }

    // ==================== CONTROL FLOW ====================

    /// EDGE CASE: Condition that is neither bool nor optional.
    #[test]
    fn test_edge_invalid_condition_type() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let one = ast.int_lit(1, Loc::NONE);
        let thenb = ast.block(vec![], Loc::NONE);
        let iff = ast.if_expr(one, thenb, None, Loc::NONE);
        let body = ast.block(vec![iff], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "invalid condition of type");
    }

    /// EDGE CASE: rvalue-if with mismatched branch types.
    #[test]
    fn test_edge_if_branch_mismatch() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let c = ast.bool_lit(true, Loc::NONE);
        let one = ast.int_lit(1, Loc::NONE);
        let thenb = ast.block(vec![one], Loc::NONE);
        let t = ast.bool_lit(true, Loc::NONE);
        let elseb = ast.block(vec![t], Loc::NONE);
        let iff = ast.if_expr(c, thenb, Some(elseb), Loc::NONE);
        let body = ast.block(vec![iff], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::INT, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "incompatible types in if branches: int and bool");
    }

    /// EDGE CASE: rvalue-if without an else-branch wraps in an optional.
    #[test]
    fn test_edge_if_without_else_is_optional() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let c = ast.bool_lit(true, Loc::NONE);
        let one = ast.int_lit(1, Loc::NONE);
        let thenb = ast.block(vec![one], Loc::NONE);
        let iff = ast.if_expr(c, thenb, None, Loc::NONE);
        let x = ast.var(s("x"), NodeId::UNKNOWN, Some(iff), Loc::NONE);
        let body = ast.block(vec![x], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        let xty = fx.ast[x].ty;
        assert!(matches!(fx.ast[xty].kind, NodeKind::OptionalType(_)));
    }

    /// EDGE CASE: 'for' checking is not implemented.
    #[test]
    fn test_edge_for_not_implemented() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let b = ast.block(vec![], Loc::NONE);
        let fornode =
            ast.add(NodeKind::For(cinderc_ast::ForData { init: None, cond: None, update: None, body: b }), Loc::NONE);
        let body = ast.block(vec![fornode], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "'for' loops are not implemented");
    }

    // ==================== MUTABILITY ====================

    /// EDGE CASE: Assigning to a `let` binding.
    #[test]
    fn test_edge_assign_to_let() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let one = ast.int_lit(1, Loc::NONE);
        let x = ast.let_(s("x"), NodeId::INT, Some(one), Loc::NONE);
        let xr = ast.id(s("x"), Loc::NONE);
        let two = ast.int_lit(2, Loc::NONE);
        let asg = ast.assign(Op::Assign, xr, two, Loc::NONE);
        let body = ast.block(vec![x, asg], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "cannot assign to let \"x\"");
    }

    /// EDGE CASE: Assigning to a narrowed binding.
    #[test]
    fn test_edge_assign_to_narrowed() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let opt = ast.optional_type(NodeId::INT, Loc::NONE);
        let a = ast.param(s("a"), opt, Loc::NONE);
        let cond = ast.id(s("a"), Loc::NONE);
        let ar = ast.id(s("a"), Loc::NONE);
        let three = ast.int_lit(3, Loc::NONE);
        let asg = ast.assign(Op::Assign, ar, three, Loc::NONE);
        let thenb = ast.block(vec![asg], Loc::NONE);
        let iff = ast.if_expr(cond, thenb, None, Loc::NONE);
        let body = ast.block(vec![iff], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![a], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "cannot assign to type-narrowed binding \"a\"");
    }

    /// EDGE CASE: Dereferencing a reference to an owner would move it.
    #[test]
    fn test_edge_deref_owner_reference() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let st = ast.struct_type(Some(s("R")), vec![], vec![], Loc::NONE);
        let td = ast.typedef(s("R"), st, Loc::NONE);
        let recv = ast.unresolved(s("R"), Loc::NONE);
        let this = ast.this_param(NodeId::UNKNOWN, true, Loc::NONE);
        let dbody = ast.block(vec![], Loc::NONE);
        let dropf =
            ast.fun(Some(s("drop")), Some(recv), vec![this], NodeId::VOID, Some(dbody), Loc::NONE);

        let rty = ast.unresolved(s("R"), Loc::NONE);
        let pref = ast.ref_type(rty, Loc::NONE);
        let p = ast.param(s("p"), pref, Loc::NONE);
        let pr = ast.id(s("p"), Loc::NONE);
        let der = ast.deref(pr, Loc::NONE);
        let x = ast.var(s("x"), NodeId::UNKNOWN, Some(der), Loc::NONE);
        let body = ast.block(vec![x], Loc::NONE);
        let g = ast.fun(Some(s("g")), None, vec![p], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![td, dropf, g], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "cannot move owner value of type R out of reference");
    }

    // ==================== MEMBERS & SUBSCRIPTS ====================

    /// EDGE CASE: Member access on an optional must be narrowed first.
    #[test]
    fn test_edge_member_on_optional() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let fld = ast.field(s("x"), NodeId::INT, None, Loc::NONE);
        let st = ast.struct_type(Some(s("P")), vec![fld], vec![], Loc::NONE);
        let td = ast.typedef(s("P"), st, Loc::NONE);

        let pty = ast.unresolved(s("P"), Loc::NONE);
        let opt = ast.optional_type(pty, Loc::NONE);
        let a = ast.param(s("a"), opt, Loc::NONE);
        let ar = ast.id(s("a"), Loc::NONE);
        let mem = ast.member(ar, s("x"), Loc::NONE);
        let ret = ast.ret(Some(mem), Loc::NONE);
        let body = ast.block(vec![ret], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![a], NodeId::INT, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![td, f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "optional value may not be valid");
        assert_has(&helps(&r), "if a a.x");
    }

    /// EDGE CASE: Methods are found through the receiver's type-id.
    #[test]
    fn test_edge_method_lookup() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let fld = ast.field(s("x"), NodeId::INT, None, Loc::NONE);
        let st = ast.struct_type(Some(s("P")), vec![fld], vec![], Loc::NONE);
        let td = ast.typedef(s("P"), st, Loc::NONE);

        let recv = ast.unresolved(s("P"), Loc::NONE);
        let this = ast.this_param(NodeId::UNKNOWN, false, Loc::NONE);
        let xid = ast.id(s("x"), Loc::NONE);
        let thisid = ast.id(s("this"), Loc::NONE);
        let getx = ast.member(thisid, s("x"), Loc::NONE);
        let _ = xid;
        let ret = ast.ret(Some(getx), Loc::NONE);
        let mbody = ast.block(vec![ret], Loc::NONE);
        let getter =
            ast.fun(Some(s("get")), Some(recv), vec![this], NodeId::INT, Some(mbody), Loc::NONE);

        let pty2 = ast.unresolved(s("P"), Loc::NONE);
        let a = ast.param(s("a"), pty2, Loc::NONE);
        let ar = ast.id(s("a"), Loc::NONE);
        let mem = ast.member(ar, s("get"), Loc::NONE);
        let call = ast.call(mem, vec![], Loc::NONE);
        let ret2 = ast.ret(Some(call), Loc::NONE);
        let body = ast.block(vec![ret2], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![a], NodeId::INT, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![td, getter, f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        assert_eq!(fx.ast[call].ty, NodeId::INT);
    }

    /// EDGE CASE: Constant subscript out of array bounds.
    #[test]
    fn test_edge_const_index_out_of_bounds() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let three = ast.int_lit(3, Loc::NONE);
        let arr = ast.array_type(NodeId::INT, Some(three), Loc::NONE);
        let a = ast.var(s("a"), arr, None, Loc::NONE);
        let ar = ast.id(s("a"), Loc::NONE);
        let five = ast.int_lit(5, Loc::NONE);
        let sub = ast.subscript(ar, five, Loc::NONE);
        let x = ast.let_(s("x"), NodeId::INT, Some(sub), Loc::NONE);
        let body = ast.block(vec![a, x], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "array index 5 out of bounds (length 3)");
    }

    // ==================== DECLARATIONS ====================

    /// EDGE CASE: Alias cycles are broken with a diagnostic.
    #[test]
    fn test_edge_alias_cycle() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let ub = ast.unresolved(s("B"), Loc::NONE);
        let alias_a = ast.alias_type(s("A"), ub, Loc::NONE);
        let ta = ast.typedef(s("A"), alias_a, Loc::NONE);
        let ua = ast.unresolved(s("A"), Loc::NONE);
        let alias_b = ast.alias_type(s("B"), ua, Loc::NONE);
        let tb = ast.typedef(s("B"), alias_b, Loc::NONE);
        let unit = ast.unit(vec![], vec![ta, tb], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "circular type alias");
    }

    /// EDGE CASE: `main` must have no parameters and a void result.
    #[test]
    fn test_edge_main_signature() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let one = ast.int_lit(1, Loc::NONE);
        let ret = ast.ret(Some(one), Loc::NONE);
        let body = ast.block(vec![ret], Loc::NONE);
        let f = ast.fun(Some(s("main")), None, vec![], NodeId::INT, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&errors(&r), "invalid signature of \"main\" function, expecting ()void");
        assert_eq!(fx.pkgs.get(fx.pkg).mainfun, Some(f), "main is still recorded");
    }

    /// EDGE CASE: Owner propagation reaches structs whose drop is defined
    /// after the struct that embeds them.
    #[test]
    fn test_edge_owner_propagation_fixed_point() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        // type Outer { r Inner }
        let inner_ref = ast.unresolved(s("Inner"), Loc::NONE);
        let fld = ast.field(s("r"), inner_ref, None, Loc::NONE);
        let outer = ast.struct_type(Some(s("Outer")), vec![fld], vec![], Loc::NONE);
        let t_outer = ast.typedef(s("Outer"), outer, Loc::NONE);
        // type Inner {}
        let inner = ast.struct_type(Some(s("Inner")), vec![], vec![], Loc::NONE);
        let t_inner = ast.typedef(s("Inner"), inner, Loc::NONE);
        // fun Inner.drop(mut this) — after both structs
        let recv = ast.unresolved(s("Inner"), Loc::NONE);
        let this = ast.this_param(NodeId::UNKNOWN, true, Loc::NONE);
        let dbody = ast.block(vec![], Loc::NONE);
        let dropf =
            ast.fun(Some(s("drop")), Some(recv), vec![this], NodeId::VOID, Some(dbody), Loc::NONE);
        let unit = ast.unit(vec![], vec![t_outer, t_inner, dropf], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        assert!(fx.ast[inner].flags.contains(NodeFlags::DROP));
        assert!(
            fx.ast[outer].flags.contains(NodeFlags::SUBOWNERS),
            "post-analysis propagates ownership into the embedding struct"
        );
        assert!(crate::compat::is_owner(&fx.ast, outer));
    }

    // ==================== WARNINGS ====================

    /// EDGE CASE: Unused variables are reported.
    #[test]
    fn test_edge_unused_variable() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let one = ast.int_lit(1, Loc::NONE);
        let x = ast.let_(s("x"), NodeId::INT, Some(one), Loc::NONE);
        let body = ast.block(vec![x], Loc::NONE);
        let f = ast.fun(Some(s("f")), None, vec![], NodeId::VOID, Some(body), Loc::NONE);
        let unit = ast.unit(vec![], vec![f], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_has(&warnings(&r), "unused variable \"x\"");
    }

    /// EDGE CASE: Discarding an owner result transfers ownership.
    #[test]
    fn test_edge_unused_owner_result() {
        let mut fx = Fixture::new();
        let ast = &mut fx.ast;
        let st = ast.struct_type(Some(s("R")), vec![], vec![], Loc::NONE);
        let td = ast.typedef(s("R"), st, Loc::NONE);
        let recv = ast.unresolved(s("R"), Loc::NONE);
        let this = ast.this_param(NodeId::UNKNOWN, true, Loc::NONE);
        let dbody = ast.block(vec![], Loc::NONE);
        let dropf =
            ast.fun(Some(s("drop")), Some(recv), vec![this], NodeId::VOID, Some(dbody), Loc::NONE);

        // fun mk() R { return R() }
        let rid = ast.id(s("R"), Loc::NONE);
        let cons = ast.call(rid, vec![], Loc::NONE);
        let ret = ast.ret(Some(cons), Loc::NONE);
        let mkbody = ast.block(vec![ret], Loc::NONE);
        let rres = ast.unresolved(s("R"), Loc::NONE);
        let mk = ast.fun(Some(s("mk")), None, vec![], rres, Some(mkbody), Loc::NONE);

        // fun use() void { mk() }
        let mkid = ast.id(s("mk"), Loc::NONE);
        let call = ast.call(mkid, vec![], Loc::NONE);
        let ubody = ast.block(vec![call], Loc::NONE);
        let usef = ast.fun(Some(s("use")), None, vec![], NodeId::VOID, Some(ubody), Loc::NONE);
        let unit = ast.unit(vec![], vec![td, dropf, mk, usef], Loc::NONE);

        let r = fx.run(&[unit]);
        assert_eq!(errors(&r), Vec::<String>::new());
        assert_has(&warnings(&r), "unused result; ownership transferred");
    }
}
