//! String interning.
//!
//! A [`Symbol`] is a 4-byte handle to a string stored in a global table.
//! Two symbols compare equal iff their strings are byte-identical, so
//! equality is a single integer comparison and symbols can key hash maps
//! without touching string data.
//!
//! The table is process-wide and thread-safe: lookups go through a
//! `DashMap` keyed by the string itself, and the reverse index is an
//! append-only vector behind a `parking_lot::RwLock`. Interned strings are
//! leaked once and live for the whole process, which is the usual compiler
//! trade-off: the set of distinct identifiers in a build is small and
//! bounded, and `'static` strings avoid any lifetime plumbing.
//!
//! Reserved names (primitive type names, `_`, `this`, `drop`, ...) are
//! pre-interned at table construction so they have fixed indices and can be
//! exposed as constants in [`sym`].

use std::fmt;
use std::sync::LazyLock;

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;

/// An interned string.
///
/// `Symbol` is exactly 4 bytes; comparison and hashing never look at the
/// underlying string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    index: u32,
}

static_assertions::assert_eq_size!(Symbol, u32);

/// Global symbol table.
///
/// `map` answers "is this string interned and under which index"; `strings`
/// answers the reverse in O(1). The write lock on `strings` also serializes
/// inserts so a string is never interned twice under a race.
struct SymbolTable {
    map: DashMap<&'static str, u32, RandomState>,
    strings: RwLock<Vec<&'static str>>,
}

static TABLE: LazyLock<SymbolTable> = LazyLock::new(|| {
    let table = SymbolTable {
        map: DashMap::with_capacity_and_hasher(1024, RandomState::new()),
        strings: RwLock::new(Vec::with_capacity(1024)),
    };
    for (index, s) in sym::PREDEFINED.iter().enumerate() {
        table.strings.write().push(s);
        table.map.insert(s, index as u32);
    }
    table
});

impl Symbol {
    /// Intern a string, returning its symbol.
    ///
    /// Returns the existing symbol when the string was interned before.
    pub fn intern(s: &str) -> Symbol {
        if let Some(index) = TABLE.map.get(s) {
            return Symbol { index: *index };
        }
        let mut strings = TABLE.strings.write();
        // Another thread may have inserted while we waited for the lock.
        if let Some(index) = TABLE.map.get(s) {
            return Symbol { index: *index };
        }
        let interned: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let index = strings.len() as u32;
        strings.push(interned);
        TABLE.map.insert(interned, index);
        Symbol { index }
    }

    /// Intern the result of a format expression.
    ///
    /// Used for synthesized names, e.g. unique internal names for `_`
    /// bindings of owner type.
    pub fn intern_fmt(args: fmt::Arguments<'_>) -> Symbol {
        match args.as_str() {
            Some(s) => Symbol::intern(s),
            None => Symbol::intern(&args.to_string()),
        }
    }

    /// The interned string.
    #[inline]
    pub fn as_str(self) -> &'static str {
        TABLE.strings.read()[self.index as usize]
    }

    /// Raw table index. Stable for the lifetime of the process.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    const fn predefined(index: u32) -> Symbol {
        Symbol { index }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

/// Pre-interned symbols with fixed indices.
///
/// Order here must match `PREDEFINED`.
pub mod sym {
    use super::Symbol;

    /// Strings interned at table construction, in index order.
    pub(super) const PREDEFINED: &[&str] = &[
        "_", "this", "drop", "main", "str", "as", "from", "void", "bool", "i8", "i16", "i32",
        "i64", "int", "u8", "u16", "u32", "u64", "uint", "f32", "f64", "unknown",
    ];

    pub const UNDERSCORE: Symbol = Symbol::predefined(0);
    pub const THIS: Symbol = Symbol::predefined(1);
    pub const DROP: Symbol = Symbol::predefined(2);
    pub const MAIN: Symbol = Symbol::predefined(3);
    pub const STR: Symbol = Symbol::predefined(4);
    pub const AS: Symbol = Symbol::predefined(5);
    pub const FROM: Symbol = Symbol::predefined(6);
    pub const VOID: Symbol = Symbol::predefined(7);
    pub const BOOL: Symbol = Symbol::predefined(8);
    pub const I8: Symbol = Symbol::predefined(9);
    pub const I16: Symbol = Symbol::predefined(10);
    pub const I32: Symbol = Symbol::predefined(11);
    pub const I64: Symbol = Symbol::predefined(12);
    pub const INT: Symbol = Symbol::predefined(13);
    pub const U8: Symbol = Symbol::predefined(14);
    pub const U16: Symbol = Symbol::predefined(15);
    pub const U32: Symbol = Symbol::predefined(16);
    pub const U64: Symbol = Symbol::predefined(17);
    pub const UINT: Symbol = Symbol::predefined(18);
    pub const F32: Symbol = Symbol::predefined(19);
    pub const F64: Symbol = Symbol::predefined(20);
    pub const UNKNOWN: Symbol = Symbol::predefined(21);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_intern_same_string() {
        let s1 = Symbol::intern("hello");
        let s2 = Symbol::intern("hello");
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_intern_different_strings() {
        let s1 = Symbol::intern("hello");
        let s2 = Symbol::intern("world");
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_as_str_round_trip() {
        let s = Symbol::intern("round_trip_me");
        assert_eq!(s.as_str(), "round_trip_me");
    }

    #[test]
    fn test_predefined_symbols() {
        assert_eq!(sym::UNDERSCORE, Symbol::intern("_"));
        assert_eq!(sym::THIS, Symbol::intern("this"));
        assert_eq!(sym::DROP, Symbol::intern("drop"));
        assert_eq!(sym::STR.as_str(), "str");
        assert_eq!(sym::UINT.as_str(), "uint");
        assert_eq!(sym::F64.as_str(), "f64");
    }

    #[test]
    fn test_intern_fmt() {
        let s = Symbol::intern_fmt(format_args!("_tmp{}", 7));
        assert_eq!(s.as_str(), "_tmp7");
        assert_eq!(s, Symbol::intern("_tmp7"));
    }

    #[test]
    fn test_empty_string() {
        let s = Symbol::intern("");
        assert_eq!(s.as_str(), "");
    }

    #[test]
    fn test_display() {
        let s = Symbol::intern("shown");
        assert_eq!(format!("{s}"), "shown");
    }

    #[test]
    fn test_concurrent_same_string() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| Symbol::intern("concurrent_same")))
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for s in &results[1..] {
            assert_eq!(results[0], *s);
        }
    }

    #[test]
    fn test_concurrent_distinct_strings() {
        let handles: Vec<_> = (0..16)
            .map(|i| thread::spawn(move || Symbol::intern(&format!("thread_sym_{i}"))))
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for i in 0..results.len() {
            for j in (i + 1)..results.len() {
                assert_ne!(results[i], results[j]);
            }
        }
    }
}
