//! # Diagnostics Module
//!
//! One diagnostic engine is shared by every stage of the pipeline: lexer,
//! parser, symbol binding, type resolution, AIR building and code generation
//! all report into the same accumulator. Stages never unwind on user errors;
//! they push a [`Diagnostic`] and keep going where that is feasible, and the
//! driver checks [`DiagnosticEngine::has_errors`] at stage boundaries.
//!
//! Internal invariant violations are different: those are compiler bugs, not
//! user errors, and go through the [`ice!`] macro which aborts immediately
//! with the source position of the failed check.

use std::fmt::Write as _;

use colored::Colorize;

use crate::lexer::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Pipeline stage a diagnostic originated from. Attached to every diagnostic
/// for filtering; not part of the user-visible rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
    SymbolBinding,
    TypeResolution,
    TypeChecking,
    AirBuilding,
    Codegen,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub phase: Phase,
    pub location: Location,
    pub message: String,
}

/// Accumulates every diagnostic of one compilation. Errors past the budget
/// are dropped so a single broken declaration cannot flood the terminal.
#[derive(Debug)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    max_errors: usize,
    treat_warnings_as_errors: bool,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self {
            diagnostics: vec![],
            error_count: 0,
            warning_count: 0,
            max_errors: 20,
            treat_warnings_as_errors: false,
        }
    }
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_max_errors(&mut self, max: usize) {
        self.max_errors = max;
    }

    pub fn set_warnings_as_errors(&mut self, value: bool) {
        self.treat_warnings_as_errors = value;
    }

    pub fn report(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Warning && self.treat_warnings_as_errors {
            diagnostic.severity = Severity::Error;
        }

        match diagnostic.severity {
            Severity::Error => {
                if self.reached_error_limit() {
                    return;
                }
                self.error_count += 1;
            }
            Severity::Warning => {
                self.warning_count += 1;
            }
        }

        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, phase: Phase, location: Location, message: impl ToString) {
        self.report(Diagnostic {
            severity: Severity::Error,
            phase,
            location,
            message: message.to_string(),
        });
    }

    pub fn warning(&mut self, phase: Phase, location: Location, message: impl ToString) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            phase,
            location,
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn reached_error_limit(&self) -> bool {
        self.error_count >= self.max_errors
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }

    /// Render all diagnostics in `file:line:col: severity: message` form,
    /// followed by the summary line.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();

        for diagnostic in &self.diagnostics {
            let label = match diagnostic.severity {
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            let label = if color {
                match diagnostic.severity {
                    Severity::Warning => label.magenta().bold().to_string(),
                    Severity::Error => label.red().bold().to_string(),
                }
            } else {
                label.to_string()
            };

            let _ = writeln!(
                out,
                "{}: {}: {}",
                diagnostic.location, label, diagnostic.message
            );
        }

        if self.error_count > 0 || self.warning_count > 0 {
            out.push('\n');
            if self.error_count > 0 {
                let _ = write!(out, "{} error(s)", self.error_count);
            }
            if self.warning_count > 0 {
                if self.error_count > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{} warning(s)", self.warning_count);
            }
            out.push_str(" generated.\n");
        }

        out
    }

    pub fn print_all(&self) {
        eprint!("{}", self.render(true));
    }
}

/// Abort with an "internal compiler error" locating the failed check. Only
/// for invariants a previous pass is supposed to have established.
#[macro_export]
macro_rules! ice {
    ($($arg:tt)*) => {
        panic!(
            "internal compiler error at {}:{}: {}",
            file!(),
            line!(),
            format!($($arg)*)
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_counting() {
        let mut engine = DiagnosticEngine::new();
        engine.error(Phase::Parser, Location::new(1, 1), "first");
        engine.warning(Phase::Parser, Location::new(1, 2), "second");

        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);
    }

    #[test]
    fn test_error_budget() {
        let mut engine = DiagnosticEngine::new();
        engine.set_max_errors(3);
        for i in 0..10 {
            engine.error(Phase::AirBuilding, Location::new(1, i), "boom");
        }

        assert_eq!(engine.error_count(), 3);
        assert_eq!(engine.all().len(), 3);
        assert!(engine.reached_error_limit());
    }

    #[test]
    fn test_warnings_as_errors() {
        let mut engine = DiagnosticEngine::new();
        engine.set_warnings_as_errors(true);
        engine.warning(Phase::TypeResolution, Location::new(1, 1), "sketchy");

        assert!(engine.has_errors());
    }

    #[test]
    fn test_render_format() {
        let mut engine = DiagnosticEngine::new();
        engine.error(
            Phase::AirBuilding,
            Location::in_file(3, 7, "main.kea"),
            "Type mismatch in assignment: expected 'int', got 'bool'",
        );

        let rendered = engine.render(false);
        assert!(rendered.starts_with(
            "main.kea:3:7: error: Type mismatch in assignment: expected 'int', got 'bool'"
        ));
        assert!(rendered.contains("1 error(s) generated."));
    }

    #[test]
    fn test_render_without_file() {
        let mut engine = DiagnosticEngine::new();
        engine.warning(Phase::Parser, Location::new(2, 5), "odd");

        let rendered = engine.render(false);
        assert!(rendered.starts_with("2:5: warning: odd"));
        assert!(rendered.contains("1 warning(s) generated."));
    }
}
