//! Packages.
//!
//! A package is a set of source files sharing a namespace. The loader
//! discovers packages, parses their units and fills `api_ns` before any
//! importer is checked; the checker populates `defs`, `tfundefs` and
//! `mainfun` as it goes.

use cinderc_util::{Idx, IndexVec, Symbol};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::node::NodeId;

/// Index of a package inside a [`PkgStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PkgId(pub u32);

impl Idx for PkgId {
    fn from_usize(idx: usize) -> Self {
        PkgId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A package record.
pub struct Pkg {
    pub name: String,
    /// Top-level definitions by name, in definition order.
    pub defs: IndexMap<Symbol, NodeId>,
    /// Type functions (methods), keyed by receiver type-id then name.
    pub tfundefs: FxHashMap<(Symbol, Symbol), NodeId>,
    /// Namespace value exposing the public API; set by the loader.
    pub api_ns: Option<NodeId>,
    /// Entry point, recorded while checking the main package.
    pub mainfun: Option<NodeId>,
    /// Digest of the emitted public header; computed by the loader.
    pub api_sha256: [u8; 32],
    /// Whether this is the program's main package.
    pub is_main: bool,
}

impl Pkg {
    pub fn new(name: impl Into<String>) -> Pkg {
        Pkg {
            name: name.into(),
            defs: IndexMap::new(),
            tfundefs: FxHashMap::default(),
            api_ns: None,
            mainfun: None,
            api_sha256: [0; 32],
            is_main: false,
        }
    }
}

/// All packages of a build.
pub struct PkgStore {
    pkgs: IndexVec<PkgId, Pkg>,
}

impl PkgStore {
    pub fn new() -> PkgStore {
        PkgStore { pkgs: IndexVec::new() }
    }

    pub fn add(&mut self, pkg: Pkg) -> PkgId {
        self.pkgs.push(pkg)
    }

    pub fn get(&self, id: PkgId) -> &Pkg {
        &self.pkgs[id]
    }

    pub fn get_mut(&mut self, id: PkgId) -> &mut Pkg {
        &mut self.pkgs[id]
    }
}

impl Default for PkgStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkg_store() {
        let mut store = PkgStore::new();
        let id = store.add(Pkg::new("mylib"));
        assert_eq!(store.get(id).name, "mylib");
        assert!(store.get(id).defs.is_empty());
        assert!(!store.get(id).is_main);
    }

    #[test]
    fn test_defs_keep_insertion_order() {
        let mut pkg = Pkg::new("p");
        pkg.defs.insert(Symbol::intern("zebra"), NodeId::BAD);
        pkg.defs.insert(Symbol::intern("apple"), NodeId::BAD);
        let names: Vec<_> = pkg.defs.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["zebra", "apple"]);
    }
}
