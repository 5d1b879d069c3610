//! cinderc-sem - Semantic Analyzer & Type Checker
//!
//! The late identifier resolver and type checker. One pass over the parsed
//! AST that resolves names, infers and checks types, narrows optionals
//! across control flow, interns structural user types, instantiates
//! generic templates, and reports diagnostics.
//!
//! Entry point: [`typecheck`]. It creates a [`Typecheck`], enters a
//! package scope, and for each unit enters a unit scope, binds imports,
//! defines top-level declarations (so declarations see each other
//! regardless of source order) and then statement-checks the unit. A final
//! post-analysis pass propagates ownership through struct types once all
//! `drop` functions are known.
//!
//! Error policy: diagnostics never abort the pass. On an error the checker
//! substitutes a safe placeholder type (`void`, `unknown`, or the current
//! type context) and continues; cascading messages are suppressed by the
//! unknown-type test. Only resource exhaustion stops checking, via the
//! checker's fatal error field.
//!
//! A single checker instance is single-threaded. Checkers for different
//! packages may run in parallel; the only process-wide shared state is the
//! symbol interner, which is lock-protected.

pub mod compat;
pub mod decl;
pub mod expr;
pub mod import;
pub mod instantiate;
pub mod narrow;
pub mod scope;
pub mod typeid;

mod edge_cases;
#[cfg(test)]
mod scenarios;
#[cfg(test)]
pub(crate) mod testutil;

use cinderc_ast::{Ast, NodeFlags, NodeId, NodeKind, PkgId, PkgStore};
use cinderc_util::{edit_distance, Diagnostic, Level, Loc, Reporter, SourceMap, Symbol};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

pub use scope::Scope;

/// Fatal checker errors. Ordinary type errors are diagnostics, not values
/// of this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SemError {
    /// The node arena is exhausted.
    #[error("out of memory")]
    NoMem,
}

/// Compilation target description.
///
/// Decides what `int`/`uint` alias to, pointer-dependent type sizes, and
/// the threshold for passing `this` by value.
#[derive(Clone, Copy, Debug)]
pub struct Target {
    /// Size of `int`/`uint` in bytes: 4 or 8.
    pub int_size: u8,
    /// Pointer size in bytes.
    pub ptr_size: u8,
}

impl Default for Target {
    fn default() -> Target {
        Target { int_size: 4, ptr_size: 8 }
    }
}

/// Checker state for one package.
pub struct Typecheck<'a> {
    pub(crate) ast: &'a mut Ast,
    pub(crate) srcmap: &'a SourceMap,
    pub(crate) pkgs: &'a mut PkgStore,
    pub(crate) pkg: PkgId,
    pub(crate) target: &'a Target,
    pub(crate) reporter: &'a Reporter,

    pub(crate) scope: Scope,
    /// Type context stack: the type an expression is checked "under".
    pub(crate) typectx: Vec<NodeId>,
    /// Canonical user types by type-id.
    pub(crate) usertypes: FxHashMap<Symbol, NodeId>,
    /// Template instance cache: (template, argument type-ids) -> instance.
    pub(crate) instances: FxHashMap<(NodeId, Vec<Symbol>), NodeId>,
    /// Struct and alias types awaiting owner propagation.
    pub(crate) postanalyze: Vec<NodeId>,
    /// Renamed imports: references to the old name suggest the new one.
    pub(crate) didyoumean: Vec<(Symbol, Symbol)>,
    /// Names bound by imports in the current unit.
    pub(crate) imported: rustc_hash::FxHashSet<Symbol>,
    /// Non-zero while checking a template definition body.
    pub(crate) template_nest: u32,
    /// Enclosing functions, innermost last.
    pub(crate) fun_stack: Vec<NodeId>,
    /// Counter for synthesized names.
    pub(crate) tmp_count: u32,
    /// Fatal error; set once, all further work is skipped.
    pub(crate) err: Option<SemError>,
}

/// Type-check all `units` of `pkg`.
///
/// On return every visited node is flagged `CHECKED`, every expression
/// carries a concrete type, user types are canonicalized and identifiers
/// are resolved. Diagnostics went to `reporter`; the `Err` case is
/// reserved for resource exhaustion.
pub fn typecheck(
    ast: &mut Ast,
    srcmap: &SourceMap,
    pkgs: &mut PkgStore,
    pkg: PkgId,
    units: &[NodeId],
    target: &Target,
    reporter: &Reporter,
) -> Result<(), SemError> {
    let mut tc = Typecheck {
        ast,
        srcmap,
        pkgs,
        pkg,
        target,
        reporter,
        scope: Scope::new(),
        typectx: Vec::new(),
        usertypes: FxHashMap::default(),
        instances: FxHashMap::default(),
        postanalyze: Vec::new(),
        didyoumean: Vec::new(),
        imported: rustc_hash::FxHashSet::default(),
        template_nest: 0,
        fun_stack: Vec::new(),
        tmp_count: 0,
        err: None,
    };

    tc.scope.enter(); // package scope
    tc.scope.define(cinderc_util::sym::STR, NodeId::STR);
    tc.typ(NodeId::STR); // canonicalize the builtin alias and its element

    for &unit in units {
        tc.check_unit(unit);
    }
    tc.post_analyze();
    tc.scope.leave();

    match tc.err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl<'a> Typecheck<'a> {
    pub(crate) fn check_unit(&mut self, unit: NodeId) {
        if self.err.is_some() || !self.begin_check(unit) {
            return;
        }
        let data = match &self.ast[unit].kind {
            NodeKind::Unit(d) => d.clone(),
            _ => return,
        };
        debug!(decls = data.decls.len(), imports = data.imports.len(), "checking unit");

        self.scope.enter(); // unit scope
        self.imported.clear();
        for &imp in &data.imports {
            self.bind_import(imp);
        }
        // Define top-level declarations before checking anything, so they
        // are visible to each other regardless of source order.
        for &d in &data.decls {
            self.define_toplevel(d);
        }
        let mut decls = data.decls;
        for slot in &mut decls {
            *slot = self.check_decl(*slot);
        }
        if let NodeKind::Unit(d) = &mut self.ast[unit].kind {
            d.decls = decls;
        }
        self.scope.leave();
    }

    fn define_toplevel(&mut self, decl: NodeId) {
        let named: Option<(Symbol, NodeId, Loc)> = match &self.ast[decl].kind {
            NodeKind::Fun(f) if f.recv.is_none() => {
                f.name.map(|name| (name, decl, f.name_loc))
            }
            NodeKind::Typedef { name, ty } => Some((*name, *ty, self.ast[decl].loc)),
            NodeKind::Var(l) | NodeKind::Let(l) => Some((l.name, decl, l.name_loc)),
            _ => None,
        };
        let Some((name, target, loc)) = named else { return };
        if self.scope.lookup(name, 0).is_some() {
            self.error(loc, format!("duplicate definition \"{name}\""));
            return;
        }
        self.scope.define(name, target);
        let pkg = self.pkgs.get_mut(self.pkg);
        pkg.defs.insert(name, target);
    }

    pub(crate) fn check_decl(&mut self, n: NodeId) -> NodeId {
        if self.err.is_some() {
            return n;
        }
        match &self.ast[n].kind {
            NodeKind::Fun(_) => self.check_fun(n),
            NodeKind::Typedef { .. } => self.check_typedef(n),
            NodeKind::Import(_) => n, // bound before declarations
            NodeKind::Comment | NodeKind::Bad => n,
            _ => self.check_expr(n),
        }
    }

    // -- check-once guard ---------------------------------------------------

    /// Returns false when `n` was already visited; otherwise marks it
    /// visited. Re-running the checker over a checked AST is a no-op.
    pub(crate) fn begin_check(&mut self, n: NodeId) -> bool {
        if self.ast[n].flags.contains(NodeFlags::CHECKED) {
            return false;
        }
        self.ast[n].flags.insert(NodeFlags::CHECKED);
        true
    }

    // -- type context -------------------------------------------------------

    pub(crate) fn typectx_push(&mut self, t: NodeId) {
        self.typectx.push(t);
    }

    pub(crate) fn typectx_pop(&mut self) {
        self.typectx.pop();
    }

    /// The current type context, or `UNKNOWN` when none is active.
    pub(crate) fn typectx(&self) -> NodeId {
        self.typectx.last().copied().unwrap_or(NodeId::UNKNOWN)
    }

    // -- small accessors ----------------------------------------------------

    pub(crate) fn flags(&self, n: NodeId) -> NodeFlags {
        self.ast[n].flags
    }

    pub(crate) fn add_flags(&mut self, n: NodeId, f: NodeFlags) {
        self.ast[n].flags.insert(f);
    }

    pub(crate) fn ty_of(&self, n: NodeId) -> NodeId {
        self.ast[n].ty
    }

    pub(crate) fn set_ty(&mut self, n: NodeId, t: NodeId) {
        self.ast[n].ty = t;
    }

    pub(crate) fn loc_of(&self, n: NodeId) -> Loc {
        self.ast[n].loc
    }

    pub(crate) fn is_unknown(&self, n: NodeId) -> bool {
        self.ast[n].flags.contains(NodeFlags::UNKNOWN) || self.ast[n].ty == NodeId::UNKNOWN
    }

    /// Propagate the `UNKNOWN` flag from a child.
    pub(crate) fn inherit_unknown(&mut self, n: NodeId, child: NodeId) {
        if self.ast[child].flags.contains(NodeFlags::UNKNOWN) {
            self.ast[n].flags.insert(NodeFlags::UNKNOWN);
        }
    }

    pub(crate) fn type_str(&self, t: NodeId) -> String {
        self.ast.type_str(t)
    }

    // -- diagnostics --------------------------------------------------------

    fn diag(&self, level: Level, loc: Loc, message: String) {
        let context = if loc.is_none() {
            format!("{level}: {message}")
        } else {
            format!(
                "{}:{}:{}: {level}: {message}",
                self.srcmap.file_name(loc.srcfile()),
                loc.line(),
                loc.col(),
            )
        };
        let excerpt = (!loc.is_none())
            .then(|| self.srcmap.line_text(loc.srcfile(), loc.line()).ok())
            .flatten()
            .map(str::to_string);
        self.reporter.report(Diagnostic { level, origin: loc, message, context, excerpt });
    }

    pub(crate) fn error(&mut self, loc: Loc, message: impl Into<String>) {
        if self.err.is_some() {
            return;
        }
        self.diag(Level::Error, loc, message.into());
    }

    pub(crate) fn warning(&mut self, loc: Loc, message: impl Into<String>) {
        if self.err.is_some() {
            return;
        }
        self.diag(Level::Warning, loc, message.into());
    }

    pub(crate) fn help(&mut self, loc: Loc, message: impl Into<String>) {
        if self.err.is_some() {
            return;
        }
        self.diag(Level::Help, loc, message.into());
    }

    /// "did you mean" support for unresolved identifiers: renamed imports
    /// first, then the closest name in scope by edit distance.
    pub(crate) fn suggest_name(&mut self, name: Symbol, loc: Loc) {
        if let Some(&(_, new)) = self.didyoumean.iter().find(|(old, _)| *old == name) {
            self.help(loc, format!("did you mean \"{new}\"?"));
            return;
        }
        let mut best: Option<(usize, Symbol)> = None;
        for (candidate, _) in self.scope.iter_all() {
            if candidate == name {
                continue;
            }
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

    /// Synthesize a unique internal name, used for `_` bindings of owner
    /// type which a later ownership pass must track by name.
    pub(crate) fn gen_name(&mut self) -> Symbol {
        self.tmp_count += 1;
        Symbol::intern_fmt(format_args!("_anon{}", self.tmp_count))
    }
}
