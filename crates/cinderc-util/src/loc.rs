//! Source location tracking.
//!
//! A [`Loc`] packs an entire source position into 64 bits:
//!
//! ```text
//! ┌──────────┬─────────┬────────┬─────────┐
//! │ srcfile  │  line   │  col   │  width  │
//! │ 20 bits  │ 20 bits │ 12 bits│ 12 bits │
//! └──────────┴─────────┴────────┴─────────┘
//!  63      44 43     24 23    12 11      0
//! ```
//!
//! The zero value is "unknown location". Fields that overflow their bit
//! width saturate rather than wrap, so a pathological input produces a
//! clamped but still ordered location instead of garbage.
//!
//! `srcfile` is an index into a [`SourceMap`], which owns the file records.
//! Index 0 is reserved for "unknown file" so that `Loc::NONE` never maps to
//! a real file.

use crate::error::SourceMapError;
use crate::index_vec::{Idx, IndexVec};

const SRCFILE_BITS: u32 = 20;
const LINE_BITS: u32 = 20;
const COL_BITS: u32 = 12;
const WIDTH_BITS: u32 = 12;

const SRCFILE_MAX: u32 = (1 << SRCFILE_BITS) - 1;
const LINE_MAX: u32 = (1 << LINE_BITS) - 1;
const COL_MAX: u32 = (1 << COL_BITS) - 1;
const WIDTH_MAX: u32 = (1 << WIDTH_BITS) - 1;

/// Packed source location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc(u64);

static_assertions::assert_eq_size!(Loc, u64);

impl Loc {
    /// Unknown location.
    pub const NONE: Loc = Loc(0);

    /// Pack a location. Out-of-range fields saturate.
    pub fn new(srcfile: SrcFileId, line: u32, col: u32, width: u32) -> Loc {
        let srcfile = (srcfile.0).min(SRCFILE_MAX) as u64;
        let line = line.min(LINE_MAX) as u64;
        let col = col.min(COL_MAX) as u64;
        let width = width.min(WIDTH_MAX) as u64;
        Loc(srcfile << (LINE_BITS + COL_BITS + WIDTH_BITS)
            | line << (COL_BITS + WIDTH_BITS)
            | col << WIDTH_BITS
            | width)
    }

    #[inline]
    pub fn srcfile(self) -> SrcFileId {
        SrcFileId((self.0 >> (LINE_BITS + COL_BITS + WIDTH_BITS)) as u32 & SRCFILE_MAX)
    }

    /// Line number, 1-based. 0 means unknown.
    #[inline]
    pub fn line(self) -> u32 {
        (self.0 >> (COL_BITS + WIDTH_BITS)) as u32 & LINE_MAX
    }

    /// Column number, 1-based. 0 means unknown.
    #[inline]
    pub fn col(self) -> u32 {
        (self.0 >> WIDTH_BITS) as u32 & COL_MAX
    }

    /// Width of the highlighted range in characters.
    #[inline]
    pub fn width(self) -> u32 {
        self.0 as u32 & WIDTH_MAX
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Same position with a different width.
    pub fn with_width(self, width: u32) -> Loc {
        Loc(self.0 & !(WIDTH_MAX as u64) | (width.min(WIDTH_MAX) as u64))
    }

    /// Zero-width location just past the end of this one.
    pub fn after(self) -> Loc {
        Loc::new(self.srcfile(), self.line(), self.col() + self.width(), 0)
    }
}

/// Identifier of a source file inside a [`SourceMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SrcFileId(pub u32);

impl Idx for SrcFileId {
    fn from_usize(idx: usize) -> Self {
        SrcFileId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl SrcFileId {
    /// Reserved id for "unknown file".
    pub const UNKNOWN: SrcFileId = SrcFileId(0);
}

/// A source file record: its display name and contents.
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// Translates [`SrcFileId`]s back to file records.
///
/// Index 0 is a placeholder so `Loc::NONE` resolves to `<unknown>`.
pub struct SourceMap {
    files: IndexVec<SrcFileId, SourceFile>,
}

impl SourceMap {
    pub fn new() -> SourceMap {
        let mut files = IndexVec::new();
        files.push(SourceFile { name: "<unknown>".to_string(), text: String::new() });
        SourceMap { files }
    }

    /// Register a file, returning its id.
    pub fn add_file(&mut self, name: impl Into<String>, text: impl Into<String>) -> SrcFileId {
        self.files.push(SourceFile { name: name.into(), text: text.into() })
    }

    pub fn file(&self, id: SrcFileId) -> Option<&SourceFile> {
        self.files.get(id)
    }

    /// Display name for a file id; `<unknown>` when out of range.
    pub fn file_name(&self, id: SrcFileId) -> &str {
        self.files.get(id).map(|f| f.name.as_str()).unwrap_or("<unknown>")
    }

    /// The text of one source line (1-based), without its newline.
    pub fn line_text(&self, id: SrcFileId, line: u32) -> Result<&str, SourceMapError> {
        let file = self
            .files
            .get(id)
            .ok_or_else(|| SourceMapError::FileNotFound(format!("srcfile {}", id.0)))?;
        if line == 0 {
            return Err(SourceMapError::InvalidLine { line: 0, max_lines: 0 });
        }
        file.text.lines().nth(line as usize - 1).ok_or_else(|| SourceMapError::InvalidLine {
            line: line as usize,
            max_lines: file.text.lines().count(),
        })
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}
