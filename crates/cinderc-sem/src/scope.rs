//! Lexical scope stack.
//!
//! A flat array of `(name, node)` bindings with a stack of frame base
//! indices. Entering a frame records the current length; leaving truncates
//! back to it, so unwinding a frame is O(1) and shadowed bindings reappear
//! automatically.
//!
//! `stash`/`unstash` temporarily set the innermost frame aside: the
//! checker uses this when it must resolve names as if a frame did not
//! exist (e.g. checking a declared type that must not see the bindings the
//! declaration itself introduced).

use cinderc_ast::NodeId;
use cinderc_util::Symbol;

pub struct Scope {
    entries: Vec<(Symbol, NodeId)>,
    bases: Vec<u32>,
    stashed: Vec<(Symbol, NodeId)>,
}

impl Scope {
    /// Look through every frame.
    pub const MAX_DEPTH: u32 = u32::MAX;

    pub fn new() -> Scope {
        Scope { entries: Vec::new(), bases: Vec::new(), stashed: Vec::new() }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.bases.len()
    }

    /// Open a new frame.
    pub fn enter(&mut self) {
        self.bases.push(self.entries.len() as u32);
    }

    /// Close the innermost frame, dropping its bindings.
    pub fn leave(&mut self) {
        let base = self.bases.pop().expect("scope underflow");
        self.entries.truncate(base as usize);
    }

    /// Bind `name` in the innermost frame. Shadowing an outer binding is
    /// normal; re-binding within the same frame is the caller's mistake to
    /// diagnose beforehand.
    pub fn define(&mut self, name: Symbol, n: NodeId) {
        self.entries.push((name, n));
    }

    /// Remove the most recent binding of `name` from the innermost frame.
    pub fn undefine(&mut self, name: Symbol) {
        let base = self.bases.last().copied().unwrap_or(0) as usize;
        if let Some(pos) = self.entries[base..].iter().rposition(|(k, _)| *k == name) {
            self.entries.remove(base + pos);
        }
    }

    /// Resolve `name`, looking at most `maxdepth` frames outward.
    /// `0` means the innermost frame only; [`Scope::MAX_DEPTH`] means all.
    pub fn lookup(&self, name: Symbol, maxdepth: u32) -> Option<NodeId> {
        for (i, &(k, v)) in self.entries.iter().enumerate().rev() {
            if self.depth_of(i) > maxdepth {
                return None;
            }
            if k == name {
                return Some(v);
            }
        }
        None
    }

    /// How many frame boundaries lie between the top of the stack and
    /// entry `i`.
    fn depth_of(&self, i: usize) -> u32 {
        let above = self.bases.partition_point(|&b| b as usize <= i);
        (self.bases.len() - above) as u32
    }

    /// Bindings of the innermost frame, most recent first.
    pub fn iter_frame(&self) -> impl Iterator<Item = (Symbol, NodeId)> + '_ {
        let base = self.bases.last().copied().unwrap_or(0) as usize;
        self.entries[base..].iter().rev().copied()
    }

    /// All visible bindings, innermost first.
    pub fn iter_all(&self) -> impl Iterator<Item = (Symbol, NodeId)> + '_ {
        self.entries.iter().rev().copied()
    }

    /// Set the innermost frame's bindings aside.
    pub fn stash(&mut self) {
        debug_assert!(self.stashed.is_empty(), "stash already in use");
        let base = self.bases.last().copied().unwrap_or(0) as usize;
        self.stashed = self.entries.split_off(base);
    }

    /// Restore bindings saved by [`Scope::stash`].
    pub fn unstash(&mut self) {
        self.entries.append(&mut self.stashed);
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
