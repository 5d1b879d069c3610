//! Shared test fixtures.

use cinderc_ast::{Ast, NodeId, Pkg, PkgId, PkgStore};
use cinderc_util::{Level, Reporter, SourceMap};

use crate::{typecheck, Target};

pub(crate) struct Fixture {
    pub ast: Ast,
    pub srcmap: SourceMap,
    pub pkgs: PkgStore,
    pub pkg: PkgId,
    pub target: Target,
}

impl Fixture {
    pub fn new() -> Fixture {
        let mut pkgs = PkgStore::new();
        let mut main = Pkg::new("main");
        main.is_main = true;
        let pkg = pkgs.add(main);
        Fixture {
            ast: Ast::new(),
            srcmap: SourceMap::new(),
            pkgs,
            pkg,
            target: Target::default(),
        }
    }

    /// Run the checker over `units` and return the collected diagnostics.
    pub fn run(&mut self, units: &[NodeId]) -> Reporter {
        let reporter = Reporter::new();
        typecheck(
            &mut self.ast,
            &self.srcmap,
            &mut self.pkgs,
            self.pkg,
            units,
            &self.target,
            &reporter,
        )
        .expect("checker must not fail fatally in tests");
        reporter
    }
}

pub(crate) fn errors(r: &Reporter) -> Vec<String> {
    r.messages(Level::Error)
}

pub(crate) fn warnings(r: &Reporter) -> Vec<String> {
    r.messages(Level::Warning)
}

pub(crate) fn helps(r: &Reporter) -> Vec<String> {
    r.messages(Level::Help)
}

pub(crate) fn assert_has(list: &[String], needle: &str) {
    assert!(
        list.iter().any(|m| m.contains(needle)),
        "expected a message containing {needle:?}, got: {list:#?}"
    );
}
