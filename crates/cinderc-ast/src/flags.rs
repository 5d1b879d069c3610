//! Node flags.
//!
//! Every AST node carries one 32-bit flag set. Visibility is encoded in two
//! bits: neither set means unit-private, `PKG` means visible to the whole
//! package, `PUB` means exported. The remaining bits are checker state and
//! type properties; `MARK1`/`MARK2` are scratch bits for graph walks (alias
//! cycle detection, owner propagation).

use bitflags::bitflags;

bitflags! {
    /// Flag set shared by all AST nodes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NodeFlags: u32 {
        /// Package-visible declaration.
        const PKG = 1 << 0;
        /// Public (exported) declaration. Implies package visibility.
        const PUB = 1 << 1;
        /// Node has been visited by the checker.
        const CHECKED = 1 << 2;
        /// Expression is used as a value.
        const RVALUE = 1 << 3;
        /// Binding's type is flow-narrowed from an optional.
        const NARROWED = 1 << 4;
        /// Subtree contains an unresolved identifier.
        const UNKNOWN = 1 << 5;
        /// Type has a custom `drop` function.
        const DROP = 1 << 6;
        /// Type transitively contains owning values.
        const SUBOWNERS = 1 << 7;
        /// Block ends with `return` or another unconditional exit.
        const EXIT = 1 << 8;
        /// Compile-time constant.
        const CONST = 1 << 9;
        /// Call uses named arguments.
        const NAMEDPARAMS = 1 << 10;
        /// Namespace value represents a package.
        const PKGNS = 1 << 11;
        /// Type is a generic template definition.
        const TEMPLATE = 1 << 12;
        /// Type is an instantiated template.
        const TEMPLATEI = 1 << 13;
        /// Scratch bit for graph walks.
        const MARK1 = 1 << 14;
        /// Scratch bit for graph walks.
        const MARK2 = 1 << 15;
    }
}

/// Declaration visibility, derived from the `PKG`/`PUB` flag bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    /// Visible inside the defining source file only.
    Unit,
    /// Visible inside the defining package.
    Pkg,
    /// Exported from the package.
    Pub,
}

impl NodeFlags {
    pub fn visibility(self) -> Visibility {
        if self.contains(NodeFlags::PUB) {
            Visibility::Pub
        } else if self.contains(NodeFlags::PKG) {
            Visibility::Pkg
        } else {
            Visibility::Unit
        }
    }

    /// Raise visibility to at least package level.
    pub fn raise_to_pkg(&mut self) {
        self.insert(NodeFlags::PKG);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unit_visibility() {
        assert_eq!(NodeFlags::default().visibility(), Visibility::Unit);
    }

    #[test]
    fn test_visibility_order() {
        assert!(Visibility::Unit < Visibility::Pkg);
        assert!(Visibility::Pkg < Visibility::Pub);
    }

    #[test]
    fn test_pub_wins_over_pkg() {
        let f = NodeFlags::PKG | NodeFlags::PUB;
        assert_eq!(f.visibility(), Visibility::Pub);
    }

    #[test]
    fn test_raise_to_pkg() {
        let mut f = NodeFlags::default();
        f.raise_to_pkg();
        assert_eq!(f.visibility(), Visibility::Pkg);
        let mut p = NodeFlags::PUB;
        p.raise_to_pkg();
        assert_eq!(p.visibility(), Visibility::Pub);
    }

    #[test]
    fn test_marks_are_disjoint() {
        let f = NodeFlags::MARK1 | NodeFlags::MARK2;
        assert!(f.contains(NodeFlags::MARK1));
        assert!(!f.contains(NodeFlags::CHECKED));
    }
}
