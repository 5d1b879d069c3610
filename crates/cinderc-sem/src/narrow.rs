//! Optional-type flow narrowing.
//!
//! When an optional participates in an `if` condition, the branches know
//! more than the binding's declared type: `if x` sees `x` present in the
//! then-branch and absent in the else-branch. The narrower walks the
//! condition and records, per referenced optional binding, the type each
//! branch observes; `!` toggles the sense, and under `||` nothing definite
//! can be concluded, so narrowing participants there are rejected.
//!
//! Narrowing is scoped shadowing, not mutation: the binding is cloned with
//! the narrower type and defined in the branch scope, so the original
//! (wider) binding reappears automatically outside the `if`.

use cinderc_ast::{NodeFlags, NodeId, NodeKind};
use cinderc_util::Symbol;
use tracing::trace;

use crate::{compat, Typecheck};

/// Narrowed bindings produced from one condition.
#[derive(Default)]
pub struct Narrowing {
    /// Clones to define when entering the then-branch.
    pub then_defs: Vec<(Symbol, NodeId)>,
    /// Inverse clones, staged until the else-branch is entered.
    pub else_defs: Vec<(Symbol, NodeId)>,
    /// An invalid operator combination was diagnosed; the walk stopped.
    failed: bool,
}

impl<'a> Typecheck<'a> {
    /// Analyze an already-checked `if` condition.
    pub(crate) fn narrow_condition(&mut self, cond: NodeId) -> Narrowing {
        let mut out = Narrowing::default();
        self.narrow_walk(cond, false, false, &mut out);
        trace!(
            then_defs = out.then_defs.len(),
            else_defs = out.else_defs.len(),
            "narrowed condition"
        );
        out
    }

    fn narrow_walk(&mut self, n: NodeId, neg: bool, in_or: bool, out: &mut Narrowing) {
        if out.failed {
            return;
        }
        match &self.ast[n].kind {
            NodeKind::Id(d) => {
                let (name, target) = (d.name, d.target);
                let Some(target) = target else { return };
                if !self.ast[target].is_local() {
                    return;
                }
                let inner = match self.optional_inner(self.ty_of(target)) {
                    Some(inner) => inner,
                    None => return,
                };
                if in_or {
                    self.narrow_op_error(n, "||");
                    out.failed = true;
                    return;
                }
                let (then_ty, else_ty) =
                    if neg { (NodeId::VOID, inner) } else { (inner, NodeId::VOID) };
                let then_clone = self.narrowed_clone(target, then_ty);
                let else_clone = self.narrowed_clone(target, else_ty);
                out.then_defs.push((name, then_clone));
                out.else_defs.push((name, else_clone));
            }
            NodeKind::Var(d) | NodeKind::Let(d) => {
                // Short-form definition in the condition: `if let x = f()`.
                let name = d.name;
                let Some(inner) = self.optional_inner(self.ty_of(n)) else { return };
                if in_or {
                    self.narrow_op_error(n, "||");
                    out.failed = true;
                    return;
                }
                if neg {
                    self.narrow_op_error(n, "!");
                    out.failed = true;
                    return;
                }
                let clone = self.narrowed_clone(n, inner);
                out.then_defs.push((name, clone));
                // The definition does not exist in the else-branch.
            }
            NodeKind::PrefixOp(d) if d.op == cinderc_ast::Op::Not => {
                let expr = d.expr;
                self.narrow_walk(expr, !neg, in_or, out);
            }
            NodeKind::BinOp(d) if d.op == cinderc_ast::Op::LAnd => {
                let (l, r) = (d.left, d.right);
                self.narrow_walk(l, neg, in_or, out);
                self.narrow_walk(r, neg, in_or, out);
            }
            NodeKind::BinOp(d) if d.op == cinderc_ast::Op::LOr => {
                let (l, r) = (d.left, d.right);
                self.narrow_walk(l, neg, true, out);
                self.narrow_walk(r, neg, true, out);
            }
            _ => {}
        }
    }

    fn narrow_op_error(&mut self, n: NodeId, op: &str) {
        let loc = self.loc_of(n);
        self.error(
            loc,
            format!("cannot use type-narrowing let/var definition with '{op}' operation"),
        );
    }

    /// The inner type when `t` is (an alias of) an optional.
    pub(crate) fn optional_inner(&self, t: NodeId) -> Option<NodeId> {
        match &self.ast[compat::unwrap_alias(self.ast, t)].kind {
            NodeKind::OptionalType(d) => Some(d.elem),
            _ => None,
        }
    }

    /// Clone a binding with a narrowed type. The clone is already checked;
    /// it shadows the original inside one branch scope.
    fn narrowed_clone(&mut self, binding: NodeId, ty: NodeId) -> NodeId {
        let clone = self.ast.clone_node(binding);
        self.ast[clone].ty = ty;
        if let Some(local) = self.ast[clone].local_mut() {
            local.ty = ty;
        }
        self.ast[clone].flags.insert(NodeFlags::NARROWED | NodeFlags::CHECKED);
        clone
    }
}
