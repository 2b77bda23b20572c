//! Severity levels, diagnostics, and the Reporter
//!
//! Syntax problems never abort a parse. Each one is recorded as a
//! [`Diagnostic`] and, by the caller, as a `SystemMessage` node near
//! the offending location. The [`Reporter`] filters by severity and
//! tracks whether the configured halt level has been reached.

use serde::Serialize;
use std::fmt;

/// Diagnostic severity. The numeric values mirror the reporting and
/// halt thresholds in [`crate::settings::Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info = 1,
    Warning = 2,
    Error = 3,
    Severe = 4,
}

impl Severity {
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Severe => "SEVERE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recorded problem, independent of its tree anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub source: Option<String>,
    pub line: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.source.as_deref().unwrap_or("<input>");
        match self.line {
            Some(line) => write!(f, "{}:{}: ({}) {}", source, line, self.severity, self.message),
            None => write!(f, "{}: ({}) {}", source, self.severity, self.message),
        }
    }
}

/// Collects diagnostics, applying the report threshold and the halt
/// level. Severities below `report_level` are still recorded in the
/// tree by callers but are not surfaced in the parallel list.
#[derive(Debug)]
pub struct Reporter {
    report_level: u8,
    halt_level: u8,
    diagnostics: Vec<Diagnostic>,
    halted: bool,
}

impl Reporter {
    pub fn new(report_level: u8, halt_level: u8) -> Self {
        Self {
            report_level,
            halt_level,
            diagnostics: Vec::new(),
            halted: false,
        }
    }

    /// Record a diagnostic. Returns true if it met the report level.
    pub fn report(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        source: Option<String>,
        line: Option<usize>,
    ) -> bool {
        if severity.level() >= self.halt_level {
            self.halted = true;
        }
        let surfaced = severity.level() >= self.report_level;
        if surfaced {
            self.diagnostics.push(Diagnostic {
                severity,
                message: message.into(),
                source,
                line,
            });
        }
        surfaced
    }

    /// True once a diagnostic at or above the halt level was seen.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
