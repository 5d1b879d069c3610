//! Template instantiation.
//!
//! A template is a user type with placeholder parameters; a template-type
//! node bundles a template with argument types. Instantiation substitutes
//! placeholders with arguments via the generic AST transformer, memoizes
//! instances on `(template, argument type-ids)`, and re-checks the result.
//!
//! The instance is registered in the cache *before* it is checked, so a
//! self-referential template (`type List<T> { next *List<T> }`) finds its
//! own instance and terminates.
//!
//! While the checker is inside a template definition (`template_nest >
//! 0`), uses of templates stay symbolic: substitution would only find
//! placeholders, so the work is deferred until an outer instantiation
//! reaches the node with concrete arguments.

use cinderc_ast::{transform, NodeFlags, NodeId, NodeKind};
use tracing::debug;

use crate::Typecheck;

impl<'a> Typecheck<'a> {
    /// Check a `TemplateType` node: resolve the template, then return the
    /// canonical instance (or the node itself when deferred).
    pub(crate) fn instantiate_template(&mut self, tt: NodeId) -> NodeId {
        let (recv, args, loc) = match &self.ast[tt].kind {
            NodeKind::TemplateType(d) => (d.recv, d.args.clone(), self.ast[tt].loc),
            _ => return tt,
        };

        let recv = self.typ(recv);
        // Resolve argument types up front: inside a template body this
        // turns named uses of template parameters into placeholder nodes,
        // which is what substitution looks for later.
        let args: Vec<NodeId> = args.iter().map(|&a| self.typ(a)).collect();
        if let NodeKind::TemplateType(d) = &mut self.ast[tt].kind {
            d.recv = recv;
            d.args = args.clone();
        }

        if self.template_nest > 0 {
            // Inside a template definition: leave the use symbolic.
            return tt;
        }

        let tparams = match &self.ast[recv].kind {
            NodeKind::StructType(d) if !d.tparams.is_empty() => d.tparams.clone(),
            _ => {
                let name = self.type_str(recv);
                self.error(loc, format!("type {name} is not a template"));
                return NodeId::UNKNOWN;
            }
        };

        // Arity: required parameters are those without a default.
        let required = tparams
            .iter()
            .take_while(|&&p| {
                matches!(&self.ast[p].kind, NodeKind::Placeholder(d) if d.default.is_none())
            })
            .count();
        let total = tparams.len();
        if args.len() > total || args.len() < required {
            let what = if args.len() > total { "too many" } else { "too few" };
            self.error(
                loc,
                format!(
                    "{what} template arguments: expected {}, got {}",
                    if required == total {
                        required.to_string()
                    } else {
                        format!("{required} to {total}")
                    },
                    args.len()
                ),
            );
            for &p in &tparams {
                if let NodeKind::Placeholder(d) = &self.ast[p].kind {
                    let (name, ploc) = (d.name, self.ast[p].loc);
                    self.help(ploc, format!("template parameter \"{name}\" is defined here"));
                }
            }
            return NodeId::UNKNOWN;
        }

        // Full argument list: explicit args, then defaults.
        let mut full_args = Vec::with_capacity(total);
        for (i, &p) in tparams.iter().enumerate() {
            let arg = match args.get(i) {
                Some(&a) => a,
                None => match &self.ast[p].kind {
                    NodeKind::Placeholder(d) => d.default.expect("arity checked above"),
                    _ => NodeId::UNKNOWN,
                },
            };
            full_args.push(self.typ(arg));
        }

        let key_ids: Vec<_> = full_args.iter().map(|&a| self.typeid(a)).collect();
        let key = (recv, key_ids);
        if let Some(&inst) = self.instances.get(&key) {
            return inst;
        }

        debug!(template = %self.type_str(recv), args = full_args.len(), "instantiating template");

        let first_new = self.ast.next_id();
        let result = transform(self.ast, recv, &mut |ast, n| {
            if !matches!(ast[n].kind, NodeKind::Placeholder(_)) {
                return None;
            }
            tparams.iter().position(|&p| p == n).map(|i| full_args[i])
        });
        // A template with no reachable placeholders still gets its own
        // instance node.
        let inst = if result == recv { self.ast.clone_node(recv) } else { result };

        // Substituted paths are fresh clones carrying the template's
        // checked state; scrub them so the instance is re-checked and
        // re-keyed.
        use cinderc_util::Idx;
        for i in first_new.index()..self.ast.next_id().index() {
            let id = NodeId::from_usize(i);
            self.ast[id].flags.remove(NodeFlags::CHECKED | NodeFlags::TEMPLATE);
            if let Some(th) = self.ast[id].type_header_mut() {
                th.typeid = None;
                th.size = 0;
                th.align = 0;
            }
        }
        self.ast[inst].flags.insert(NodeFlags::TEMPLATEI);

        // Register before checking so recursive references resolve to this
        // very instance.
        self.instances.insert(key.clone(), inst);
        let checked = self.typ(inst);
        if checked != inst {
            self.instances.insert(key, checked);
        }
        checked
    }
}
