//! Diagnostic records and the reporter that collects them.
//!
//! A [`Diagnostic`] is a finished record: severity, origin location, the
//! short message, a contextual message carrying the `file:line:col: level:`
//! prefix, and optionally the source line the location points into. The
//! checker renders records (it owns the `SourceMap`); this module only
//! defines the shape and the collection side.
//!
//! The [`Reporter`] forwards every record to a caller-supplied handler and
//! keeps them for later inspection. The error count is an atomic so driver
//! code can poll it from another thread while a checker runs.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::loc::Loc;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that fails the compilation.
    Error,
    /// A warning; compilation continues.
    Warning,
    /// A suggestion attached to a preceding error or warning.
    Help,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Help => write!(f, "help"),
        }
    }
}

/// A finished diagnostic record.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    /// Origin of the diagnostic; may be `Loc::NONE`.
    pub origin: Loc,
    /// The bare message, e.g. `unknown identifier "x"`.
    pub message: String,
    /// Message with `file:line:col: level:` prefix.
    pub context: String,
    /// The source line `origin` points into, when available.
    pub excerpt: Option<String>,
}

type Sink = Box<dyn Fn(&Diagnostic)>;

/// Collects diagnostics and forwards them to a handler.
pub struct Reporter {
    sink: Option<Sink>,
    collected: RefCell<Vec<Diagnostic>>,
    errcount: AtomicUsize,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter { sink: None, collected: RefCell::new(Vec::new()), errcount: AtomicUsize::new(0) }
    }

    /// A reporter that forwards each record to `sink` as it is emitted.
    pub fn with_sink(sink: impl Fn(&Diagnostic) + 'static) -> Reporter {
        Reporter {
            sink: Some(Box::new(sink)),
            collected: RefCell::new(Vec::new()),
            errcount: AtomicUsize::new(0),
        }
    }

    /// Record a diagnostic.
    pub fn report(&self, diag: Diagnostic) {
        if diag.level == Level::Error {
            self.errcount.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(sink) = &self.sink {
            sink(&diag);
        }
        self.collected.borrow_mut().push(diag);
    }

    /// Number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.errcount.load(Ordering::Relaxed)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Snapshot of all records reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.collected.borrow().clone()
    }

    /// Messages of all records at `level`, in report order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.collected
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .map(|d| d.message.clone())
            .collect()
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn mkdiag(level: Level, msg: &str) -> Diagnostic {
        Diagnostic {
            level,
            origin: Loc::NONE,
            message: msg.to_string(),
            context: format!("<unknown>: {level}: {msg}"),
            excerpt: None,
        }
    }

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
        assert_eq!(format!("{}", Level::Help), "help");
    }

    #[test]
    fn test_error_count() {
        let r = Reporter::new();
        assert_eq!(r.error_count(), 0);
        r.report(mkdiag(Level::Warning, "w"));
        assert_eq!(r.error_count(), 0);
        r.report(mkdiag(Level::Error, "e"));
        r.report(mkdiag(Level::Help, "h"));
        assert_eq!(r.error_count(), 1);
        assert!(r.has_errors());
    }

    #[test]
    fn test_collects_in_order() {
        let r = Reporter::new();
        r.report(mkdiag(Level::Error, "first"));
        r.report(mkdiag(Level::Error, "second"));
        let msgs = r.messages(Level::Error);
        assert_eq!(msgs, vec!["first", "second"]);
    }

    #[test]
    fn test_sink_called() {
        let count = Rc::new(Cell::new(0));
        let c2 = count.clone();
        let r = Reporter::with_sink(move |_| c2.set(c2.get() + 1));
        r.report(mkdiag(Level::Error, "e"));
        r.report(mkdiag(Level::Warning, "w"));
        assert_eq!(count.get(), 2);
    }
}
