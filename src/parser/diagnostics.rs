//! Problems found in user source, collected per compilation unit.
//!
//! A diagnostic carries its range, a severity, a problem id and the message
//! arguments. The text is produced from a per-id template only when asked for,
//! so consumers can match on the id instead of parsing messages.

use std::fmt;

use super::span::{LineMap, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemId {
    /// Unexpected token; arguments: found, then legal continuations
    ParsingError,
    /// A token had to be inserted; arguments: inserted text
    InsertToComplete,
    /// A token had to be dropped; arguments: deleted text
    DeleteToken,
    /// Token is not one of a fixed set; arguments: found, then suggestions
    InvalidToken,
    /// Dialect construct without a dialect; arguments: construct
    FeatureUnavailable,
    DuplicateModifier,
    VoidVariable,
    /// Advice extra parameter is neither `returning` nor `throwing`
    InvalidExtraParameter,
    PointcutSyntax,
    PerClauseSyntax,
    DeclareSyntax,
    LexicalError,
    /// Parsing stopped; arguments: reason
    UnitAbandoned,
    UninitializedLocal,
    UndeclaredException,
    UnreachableCode,
}

impl ProblemId {
    fn template(self) -> &'static str {
        match self {
            ProblemId::ParsingError => "Syntax error on token \"{0}\", {1} expected",
            ProblemId::InsertToComplete => "Syntax error, insert \"{0}\" to complete {1}",
            ProblemId::DeleteToken => "Syntax error on token \"{0}\", delete this token",
            ProblemId::InvalidToken => "Syntax error on token \"{0}\", {1} expected",
            ProblemId::FeatureUnavailable => "{0} is not available: no dialect support is configured",
            ProblemId::DuplicateModifier => "Duplicate modifier \"{0}\"",
            ProblemId::VoidVariable => "void is an invalid type for the variable {0}",
            ProblemId::InvalidExtraParameter => "Syntax error on token \"{0}\", {1} expected",
            ProblemId::PointcutSyntax => "Invalid pointcut: {0}",
            ProblemId::PerClauseSyntax => "Invalid per clause: {0}",
            ProblemId::DeclareSyntax => "Invalid declare statement: {0}",
            ProblemId::LexicalError => "Invalid character \"{0}\"",
            ProblemId::UnitAbandoned => "Parsing of this compilation unit stopped: {0}",
            ProblemId::UninitializedLocal => "The local variable {0} may not have been initialized",
            ProblemId::UndeclaredException => "Unhandled exception type {0}",
            ProblemId::UnreachableCode => "Unreachable code",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            ProblemId::UndeclaredException | ProblemId::UnreachableCode => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub start: usize,
    pub end: usize,
    pub severity: Severity,
    pub id: ProblemId,
    pub arguments: Vec<String>,
}

impl Diagnostic {
    pub fn new(id: ProblemId, span: Span, arguments: Vec<String>) -> Self {
        Self {
            start: span.start,
            end: span.end,
            severity: id.default_severity(),
            id,
            arguments,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Fill the template. Argument `{1}` of suggestion-carrying problems is the
    /// tail of the argument list joined with `, `.
    pub fn message(&self) -> String {
        let template = self.id.template();
        let first = self.arguments.first().map(String::as_str).unwrap_or("");
        let rest = if self.arguments.len() > 1 {
            self.arguments[1..].join(", ")
        } else {
            String::new()
        };
        let rest = if rest.is_empty() { "a construct".to_string() } else { rest };
        template.replace("{0}", first).replace("{1}", &rest)
    }

    /// `line:column: severity: message` form used by the command line.
    pub fn render(&self, lines: &LineMap) -> String {
        format!("{}: {}: {}", lines.location(self.start), self.severity, self.message())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}..={}]: {}", self.severity, self.start, self.end, self.message())
    }
}

/// Ordered collector for one compilation unit.
#[derive(Debug, Clone)]
pub struct ProblemReporter {
    diagnostics: Vec<Diagnostic>,
    max_errors: usize,
    error_count: usize,
}

impl ProblemReporter {
    pub fn new(max_errors: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            max_errors: max_errors.max(1),
            error_count: 0,
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        log::debug!("diagnostic: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, id: ProblemId, span: Span, arguments: &[&str]) {
        self.report(Diagnostic::new(id, span, arguments.iter().map(|a| a.to_string()).collect()));
    }

    pub fn warning(&mut self, id: ProblemId, span: Span, arguments: &[&str]) {
        let mut diagnostic = Diagnostic::new(id, span, arguments.iter().map(|a| a.to_string()).collect());
        diagnostic.severity = Severity::Warning;
        self.report(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// True once the unit has used up its error budget.
    pub fn budget_exhausted(&self) -> bool {
        self.error_count >= self.max_errors
    }

    pub fn has(&self, id: ProblemId) -> bool {
        self.diagnostics.iter().any(|d| d.id == id)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_templates() {
        let d = Diagnostic::new(
            ProblemId::InvalidExtraParameter,
            Span::new(3, 8),
            vec!["thrown".into(), "throwing".into(), "returning".into(), ":".into()],
        );
        assert_eq!(d.message(), "Syntax error on token \"thrown\", throwing, returning, : expected");
        let d = Diagnostic::new(ProblemId::DeleteToken, Span::at(4), vec!["*".into()]);
        assert_eq!(d.message(), "Syntax error on token \"*\", delete this token");
    }

    #[test]
    fn test_error_budget() {
        let mut reporter = ProblemReporter::new(2);
        reporter.warning(ProblemId::UndeclaredException, Span::at(0), &["Exception"]);
        reporter.error(ProblemId::VoidVariable, Span::at(0), &["x"]);
        assert!(!reporter.budget_exhausted());
        reporter.error(ProblemId::VoidVariable, Span::at(1), &["y"]);
        assert!(reporter.budget_exhausted());
        assert_eq!(reporter.diagnostics().len(), 3);
        assert_eq!(reporter.error_count(), 2);
    }
}
