//! Import binding.
//!
//! Resolves `import` statements against the exporting package's API
//! namespace, which the loader materialized as a namespace value of
//! `(name, node)` pairs before any importer is checked.
//!
//! Renamed imports (`x as y`) feed the "did you mean" table: a later
//! reference to `x` by its original name suggests `y`.

use cinderc_ast::{NodeFlags, NodeId, NodeKind};
use cinderc_util::{edit_distance, Loc, Symbol};

use crate::Typecheck;

impl<'a> Typecheck<'a> {
    /// Bind one `import` statement into the current unit scope.
    pub(crate) fn bind_import(&mut self, imp: NodeId) {
        if self.err.is_some() || !self.begin_check(imp) {
            return;
        }
        let data = match &self.ast[imp].kind {
            NodeKind::Import(d) => d.clone(),
            _ => return,
        };
        let loc = self.loc_of(imp);

        let Some(pkg_id) = data.pkg else {
            self.error(loc, format!("package \"{}\" is not loaded", data.path));
            return;
        };
        let Some(ns) = self.pkgs.get(pkg_id).api_ns else {
            self.error(loc, format!("package \"{}\" has no API namespace", data.path));
            return;
        };
        let members = match &self.ast[ns].kind {
            NodeKind::NsExpr(d) => d.members.clone(),
            _ => return,
        };

        // The namespace value itself needs a type before anything
        // references it through an alias.
        if self.ast[ns].ty == NodeId::UNKNOWN {
            let nst = self
                .ast
                .add_type(NodeKind::NsType { th: cinderc_ast::TypeHeader::default() }, loc);
            self.ast[nst].flags.insert(NodeFlags::CHECKED);
            self.ast[ns].ty = nst;
            self.ast[ns].flags.insert(NodeFlags::CHECKED);
        }

        // `import "pkg" as name` binds the whole namespace value.
        if let Some((alias, alias_loc)) = data.alias {
            self.add_flags(ns, NodeFlags::PKGNS);
            self.bind_imported_name(alias, ns, alias_loc);
        }

        for m in &data.members {
            let Some(&(_, node)) = members.iter().find(|(name, _)| *name == m.name) else {
                self.error(
                    m.loc,
                    format!("no member \"{}\" in package \"{}\"", m.name, data.path),
                );
                self.suggest_member(m.name, m.loc, &members);
                continue;
            };
            let local = m.alias.unwrap_or(m.name);
            if let Some(alias) = m.alias {
                // References to the original name should suggest the rename.
                self.didyoumean.push((m.name, alias));
            }
            self.bind_imported_name(local, node, m.loc);
        }

        if data.star {
            for &(name, node) in &members {
                // Members named by this same statement are already bound.
                if data.members.iter().any(|m| m.alias.unwrap_or(m.name) == name) {
                    continue;
                }
                self.bind_imported_name(name, node, data.star_loc);
            }
        }
    }

    fn bind_imported_name(&mut self, name: Symbol, node: NodeId, loc: Loc) {
        if self.scope.lookup(name, 0).is_some() {
            if self.imported.contains(&name) {
                self.error(loc, format!("importing \"{name}\" shadows previous import"));
            } else {
                self.error(loc, format!("duplicate definition \"{name}\""));
            }
            return;
        }
        self.scope.define(name, node);
        self.imported.insert(name);
    }

    fn suggest_member(&mut self, name: Symbol, loc: Loc, members: &[(Symbol, NodeId)]) {
        let mut best: Option<(usize, Symbol)> = None;
        for &(candidate, _) in members {
            if let Some(d) = edit_distance(name.as_str(), candidate.as_str(), 2) {
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, candidate));
                }
            }
        }
        if let Some((_, candidate)) = best {
            self.help(loc, format!("did you mean \"{candidate}\"?"));
        }
    }
}
