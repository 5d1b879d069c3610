//! cinderc-util - Core Utilities and Foundation Types
//!
//! Foundation types shared by every cinderc crate:
//!
//! - [`Symbol`]: interned, identity-comparable strings. The global table is
//!   process-wide and thread-safe so the scanner and several checkers can
//!   share it.
//! - [`Loc`] and [`SourceMap`]: packed 64-bit source locations plus the map
//!   translating source-file ids back to file records.
//! - [`Diagnostic`], [`Reporter`]: the diagnostic record and the sink that
//!   collects records, forwards them to a caller-supplied handler, and
//!   counts errors atomically.
//! - [`IndexVec`] / [`Idx`]: typed index vectors. The AST arena and the
//!   package store are both `IndexVec`s, so node and package handles are
//!   4-byte copyable ids instead of references.
//! - [`edit_distance`]: bounded Levenshtein distance for "did you mean"
//!   suggestions.

pub mod diag;
pub mod error;
pub mod index_vec;
pub mod loc;
pub mod strdist;
pub mod symbol;

pub use diag::{Diagnostic, Level, Reporter};
pub use error::SourceMapError;
pub use index_vec::{Idx, IndexVec};
pub use loc::{Loc, SourceFile, SourceMap, SrcFileId};
pub use strdist::edit_distance;
pub use symbol::{sym, Symbol};
