//! Diagnostics sink (spec §4.C / §6 "Diagnostics sink protocol").
//!
//! Diagnostics are the user-visible reporting channel; they are distinct from
//! the `log` crate calls scattered through the rest of this crate, which are
//! developer trace output only (spec §9 "co-mingled logging and
//! diagnostics"). A pass that wants the user to see something reports a
//! `Diagnostic`; a pass that wants a developer to see something calls
//! `log::trace!`/`log::debug!`.

use core::fmt;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Which subsystem raised the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Parser,
    Type,
    Instruction,
    Target,
    Optimizer,
    Generator,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::General => "general",
            Category::Parser => "parser",
            Category::Type => "type",
            Category::Instruction => "instruction",
            Category::Target => "target",
            Category::Optimizer => "optimizer",
            Category::Generator => "generator",
        };
        f.write_str(s)
    }
}

/// An optional source location attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// One reported event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub code: u32,
    pub message: String,
    pub location: Option<SourceLoc>,
}

impl Diagnostic {
    pub fn new(severity: Severity, category: Category, code: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            category,
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.location = Some(SourceLoc {
            file: file.into(),
            line,
            column,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}/{}: {}", self.severity, self.category, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " ({}:{}:{})", loc.file, loc.line, loc.column)?;
        }
        Ok(())
    }
}

/// Receives one diagnostic per call, in reporting order. The core never
/// retains a sink's user data beyond a single call.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Default sink: prints to standard error in the spec's canonical form.
#[derive(Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        eprintln!("{diagnostic}");
    }
}

/// Sink that only accumulates, useful for tests and for drivers that want to
/// inspect diagnostics after a session rather than stream them.
#[derive(Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_without_location() {
        let d = Diagnostic::new(Severity::Warning, Category::Optimizer, 12, "fell back to linear scan");
        assert_eq!(format!("{d}"), "[warning] optimizer/12: fell back to linear scan");
    }

    #[test]
    fn formats_with_location() {
        let d = Diagnostic::new(Severity::Error, Category::Parser, 3, "unexpected token")
            .with_location("a.ir", 10, 4);
        assert_eq!(format!("{d}"), "[error] parser/3: unexpected token (a.ir:10:4)");
    }

    #[test]
    fn collecting_sink_preserves_order() {
        let mut sink = CollectingSink::default();
        sink.report(Diagnostic::new(Severity::Info, Category::General, 1, "one"));
        sink.report(Diagnostic::new(Severity::Info, Category::General, 2, "two"));
        assert_eq!(sink.diagnostics[0].code, 1);
        assert_eq!(sink.diagnostics[1].code, 2);
    }
}
