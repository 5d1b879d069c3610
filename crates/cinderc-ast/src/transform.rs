//! Generic AST rewriting.
//!
//! [`transform`] walks a subtree in pre-order and lets the caller replace
//! any node. Parents of replaced children are cloned with the changed slot
//! updated, so the original subtree stays intact; untouched subtrees are
//! shared between the original and the result. Template instantiation is
//! the main consumer: it maps placeholder types to argument types and gets
//! back a copy of the template body that is exactly as deep as the
//! substitution requires.
//!
//! The walk visits every semantic child (expressions, declared types,
//! sub-statements) but never an expression's computed type or any
//! back-reference; see [`NodeKind::for_each_child_mut`].

use crate::arena::Ast;
use crate::node::{NodeId, NodeKind};

/// Replacement decision for one node.
///
/// Return `Some(new)` to substitute the whole subtree, `None` to keep the
/// node and descend into its children.
pub type ReplaceFn<'a> = dyn FnMut(&mut Ast, NodeId) -> Option<NodeId> + 'a;

/// Rewrite the subtree rooted at `n`.
///
/// Returns `n` itself when nothing under it was replaced.
pub fn transform(ast: &mut Ast, n: NodeId, f: &mut ReplaceFn<'_>) -> NodeId {
    if let Some(replacement) = f(ast, n) {
        return replacement;
    }

    // Detach the payload so child slots can be rewritten while the arena
    // is borrowed for the recursive walks.
    let mut kind = ast[n].kind.clone();
    let mut changed = false;
    rewrite_children(ast, &mut kind, &mut changed, f);

    if !changed {
        return n;
    }
    let id = ast.clone_node(n);
    ast[id].kind = kind;
    id
}

fn rewrite_children(ast: &mut Ast, kind: &mut NodeKind, changed: &mut bool, f: &mut ReplaceFn<'_>) {
    // Recursing from inside the closure is fine because `kind` is detached
    // from the arena.
    kind.for_each_child_mut(&mut |slot| {
        let new = transform(ast, *slot, f);
        if new != *slot {
            *slot = new;
            *changed = true;
        }
    });
}
