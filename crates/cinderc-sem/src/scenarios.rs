//! End-to-end checker scenarios, built as the parser would build them.

use cinderc_ast::{ImportData, ImportMember, NodeFlags, NodeId, NodeKind, NsData, Op};
use cinderc_util::{Loc, Symbol};

use crate::testutil::{assert_has, errors, helps, warnings, Fixture};

fn s(name: &str) -> Symbol {
    Symbol::intern(name)
}

/// `fun f() int { return true }`
#[test]
fn scenario_return_type_mismatch() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let t = ast.bool_lit(true, Loc::NONE);
    let ret = ast.ret(Some(t), Loc::NONE);
    let body = ast.block(vec![ret], Loc::NONE);
    let f = ast.fun(Some(s("f")), None, vec![], NodeId::INT, Some(body), Loc::NONE);
    let unit = ast.unit(vec![], vec![f], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_has(&errors(&r), "invalid function result type: bool");
    assert_has(&helps(&r), "function f returns int");
}

/// `fun f(a ?int) int { if a { a } else { 0 } }` — no diagnostics, and `a`
/// is an `int` inside the then-branch.
#[test]
fn scenario_narrowing() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let opt = ast.optional_type(NodeId::INT, Loc::NONE);
    let a = ast.param(s("a"), opt, Loc::NONE);
    let cond = ast.id(s("a"), Loc::NONE);
    let then_use = ast.id(s("a"), Loc::NONE);
    let then_b = ast.block(vec![then_use], Loc::NONE);
    let zero = ast.int_lit(0, Loc::NONE);
    let else_b = ast.block(vec![zero], Loc::NONE);
    let iff = ast.if_expr(cond, then_b, Some(else_b), Loc::NONE);
    let body = ast.block(vec![iff], Loc::NONE);
    let f = ast.fun(Some(s("f")), None, vec![a], NodeId::INT, Some(body), Loc::NONE);
    let unit = ast.unit(vec![], vec![f], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_eq!(errors(&r), Vec::<String>::new());

    // Inside the then-branch the narrowed binding has the inner type.
    assert_eq!(fx.ast[then_use].ty, NodeId::INT);
    let narrowed = match &fx.ast[then_use].kind {
        NodeKind::Id(d) => d.target.unwrap(),
        _ => panic!("id expected"),
    };
    assert!(fx.ast[narrowed].flags.contains(NodeFlags::NARROWED));

    // Narrowing is local: the original parameter keeps its wide type.
    let aty = fx.ast[a].ty;
    assert!(matches!(fx.ast[aty].kind, NodeKind::OptionalType(_)));
}

/// `fun f(a ?int) int { if a || !a { 1 } else { 0 } }`
#[test]
fn scenario_narrowing_with_or_is_rejected() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let opt = ast.optional_type(NodeId::INT, Loc::NONE);
    let a = ast.param(s("a"), opt, Loc::NONE);
    let lhs = ast.id(s("a"), Loc::NONE);
    let a2 = ast.id(s("a"), Loc::NONE);
    let rhs = ast.prefix_op(Op::Not, a2, Loc::NONE);
    let cond = ast.binop(Op::LOr, lhs, rhs, Loc::NONE);
    let one = ast.int_lit(1, Loc::NONE);
    let then_b = ast.block(vec![one], Loc::NONE);
    let zero = ast.int_lit(0, Loc::NONE);
    let else_b = ast.block(vec![zero], Loc::NONE);
    let iff = ast.if_expr(cond, then_b, Some(else_b), Loc::NONE);
    let body = ast.block(vec![iff], Loc::NONE);
    let f = ast.fun(Some(s("f")), None, vec![a], NodeId::INT, Some(body), Loc::NONE);
    let unit = ast.unit(vec![], vec![f], Loc::NONE);

    let r = fx.run(&[unit]);
    let errs = errors(&r);
    assert_has(&errs, "cannot use type-narrowing let/var definition with '||' operation");
    let count = errs
        .iter()
        .filter(|m| m.contains("type-narrowing let/var definition"))
        .count();
    assert_eq!(count, 1, "the narrowing error is reported once");
}

/// `type T {}; fun T.drop(this T) {}` — drop must take `mut this`.
#[test]
fn scenario_invalid_drop_signature() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let st = ast.struct_type(Some(s("T")), vec![], vec![], Loc::NONE);
    let td = ast.typedef(s("T"), st, Loc::NONE);
    let recv = ast.unresolved(s("T"), Loc::NONE);
    let this = ast.this_param(NodeId::UNKNOWN, false, Loc::NONE);
    let body = ast.block(vec![], Loc::NONE);
    let f = ast.fun(Some(s("drop")), Some(recv), vec![this], NodeId::VOID, Some(body), Loc::NONE);
    let unit = ast.unit(vec![], vec![td, f], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_has(&errors(&r), "invalid signature of \"drop\" function, expecting (mut this)void");
}

/// A correct `drop` marks the receiver type as an owner.
#[test]
fn scenario_valid_drop_marks_owner() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let st = ast.struct_type(Some(s("T")), vec![], vec![], Loc::NONE);
    let td = ast.typedef(s("T"), st, Loc::NONE);
    let recv = ast.unresolved(s("T"), Loc::NONE);
    let this = ast.this_param(NodeId::UNKNOWN, true, Loc::NONE);
    let body = ast.block(vec![], Loc::NONE);
    let f = ast.fun(Some(s("drop")), Some(recv), vec![this], NodeId::VOID, Some(body), Loc::NONE);
    let unit = ast.unit(vec![], vec![td, f], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_eq!(errors(&r), Vec::<String>::new());
    assert!(fx.ast[st].flags.contains(NodeFlags::DROP));
    assert!(crate::compat::is_owner(&fx.ast, st));
}

/// `var x [int 3] = [1,2,3,4]`
#[test]
fn scenario_excess_array_value() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let three = ast.int_lit(3, Loc::NONE);
    let arr = ast.array_type(NodeId::INT, Some(three), Loc::NONE);
    let values: Vec<_> = (1..=4).map(|v| ast.int_lit(v, Loc::NONE)).collect();
    let lit = ast.array_lit(values, Loc::NONE);
    let x = ast.var(s("x"), arr, Some(lit), Loc::NONE);
    let unit = ast.unit(vec![], vec![x], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_has(&errors(&r), "excess value in array literal");
}

/// `import a from "p"; import * from "q"` where `q` also exports `a`.
#[test]
fn scenario_star_import_shadows() {
    let mut fx = Fixture::new();

    // Exporters: packages p and q, each exporting `a`.
    let mut mk_pkg = |fx: &mut Fixture, pkgname: &str| {
        let def = fx.ast.let_(s("a"), NodeId::INT, None, Loc::NONE);
        fx.ast[def].flags.insert(NodeFlags::CHECKED | NodeFlags::PUB);
        fx.ast[def].ty = NodeId::INT;
        let ns = fx.ast.add(
            NodeKind::NsExpr(NsData { name: s(pkgname), members: vec![(s("a"), def)] }),
            Loc::NONE,
        );
        let mut pkg = cinderc_ast::Pkg::new(pkgname);
        pkg.api_ns = Some(ns);
        fx.pkgs.add(pkg)
    };
    let p = mk_pkg(&mut fx, "p");
    let q = mk_pkg(&mut fx, "q");

    let imp1 = fx.ast.import(
        ImportData {
            path: "p".into(),
            pkg: Some(p),
            alias: None,
            members: vec![ImportMember { name: s("a"), alias: None, loc: Loc::NONE }],
            star: false,
            star_loc: Loc::NONE,
        },
        Loc::NONE,
    );
    let imp2 = fx.ast.import(
        ImportData {
            path: "q".into(),
            pkg: Some(q),
            alias: None,
            members: vec![],
            star: true,
            star_loc: Loc::NONE,
        },
        Loc::NONE,
    );
    let unit = fx.ast.unit(vec![imp1, imp2], vec![], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_has(&errors(&r), "importing \"a\" shadows previous import");
}

/// `let x int = 256; let y i8 = x`
#[test]
fn scenario_narrower_let_assignment() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let v = ast.int_lit(256, Loc::NONE);
    let x = ast.let_(s("x"), NodeId::INT, Some(v), Loc::NONE);
    let xref = ast.id(s("x"), Loc::NONE);
    let y = ast.let_(s("y"), NodeId::I8, Some(xref), Loc::NONE);
    let unit = ast.unit(vec![], vec![x, y], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_has(&errors(&r), "cannot assign value of type int to let of type i8");
}

/// `type Foo<T, U = int> { x T; y U }; var v Foo<bool>; var w Foo<bool>`
/// — one instantiation, reused by pointer identity.
#[test]
fn scenario_template_instance_cache() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let tp_t = ast.placeholder(s("T"), None, Loc::NONE);
    let tp_u = ast.placeholder(s("U"), Some(NodeId::INT), Loc::NONE);
    let xt = ast.unresolved(s("T"), Loc::NONE);
    let x = ast.field(s("x"), xt, None, Loc::NONE);
    let yt = ast.unresolved(s("U"), Loc::NONE);
    let y = ast.field(s("y"), yt, None, Loc::NONE);
    let foo = ast.struct_type(Some(s("Foo")), vec![x, y], vec![tp_t, tp_u], Loc::NONE);
    let td = ast.typedef(s("Foo"), foo, Loc::NONE);

    let foo_v = ast.unresolved(s("Foo"), Loc::NONE);
    let tv = ast.template_type(foo_v, vec![NodeId::BOOL], Loc::NONE);
    let v = ast.var(s("v"), tv, None, Loc::NONE);
    let foo_w = ast.unresolved(s("Foo"), Loc::NONE);
    let tw = ast.template_type(foo_w, vec![NodeId::BOOL], Loc::NONE);
    let w = ast.var(s("w"), tw, None, Loc::NONE);
    let unit = ast.unit(vec![], vec![td, v, w], Loc::NONE);

    let r = fx.run(&[unit]);
    assert_eq!(errors(&r), Vec::<String>::new());

    let vty = fx.ast[v].ty;
    let wty = fx.ast[w].ty;
    assert_eq!(vty, wty, "the second use reuses the cached instance");
    assert_ne!(vty, foo, "the instance is not the template itself");
    assert!(fx.ast[vty].flags.contains(NodeFlags::TEMPLATEI));
    assert!(!fx.ast[vty].flags.contains(NodeFlags::TEMPLATE));
    assert!(fx.ast[foo].flags.contains(NodeFlags::TEMPLATE));

    // The instance's fields carry the substituted types.
    match &fx.ast[vty].kind {
        NodeKind::StructType(d) => {
            let ftys: Vec<_> = d.fields.iter().map(|&f| fx.ast[f].local().unwrap().ty).collect();
            assert_eq!(ftys, vec![NodeId::BOOL, NodeId::INT]);
        }
        other => panic!("expected struct instance, got {other:?}"),
    }
}

/// Re-running the checker over a checked AST is a no-op.
#[test]
fn scenario_recheck_is_noop() {
    let mut fx = Fixture::new();
    let ast = &mut fx.ast;
    let t = ast.bool_lit(true, Loc::NONE);
    let ret = ast.ret(Some(t), Loc::NONE);
    let body = ast.block(vec![ret], Loc::NONE);
    let f = ast.fun(Some(s("f")), None, vec![], NodeId::INT, Some(body), Loc::NONE);
    let unit = ast.unit(vec![], vec![f], Loc::NONE);

    let first = fx.run(&[unit]);
    assert_eq!(first.error_count(), 1);
    let second = fx.run(&[unit]);
    assert_eq!(second.error_count(), 0, "second run reports nothing new");
    assert_eq!(warnings(&second), Vec::<String>::new());
}
