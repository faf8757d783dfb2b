//! Stage diagnostics.
//!
//! Every stage reports errors in the same shape: line, column, message and
//! the text of the offending source line. Because the builtin prelude is
//! prepended to the user's source before lexing, the sink subtracts the
//! prelude's line count when rendering positions, so reported lines match
//! the file the user wrote.

use std::fmt;

use lachs::Span;

#[derive(Clone)]
pub struct Diagnostic {
    pub line: i64,
    pub column: usize,
    pub message: String,
    pub source_line: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Line: {}, Column: {}\n{}\n{}",
            self.line, self.column, self.message, self.source_line
        )
    }
}

pub struct Diagnostics {
    source_lines: Vec<String>,
    line_offset: usize,
    reports: Vec<Diagnostic>,
    errored: bool,
}

impl Diagnostics {
    /// `line_offset` is the number of prelude lines prepended to `source`.
    pub fn new(source: &str, line_offset: usize) -> Self {
        Self {
            source_lines: source.lines().map(str::to_string).collect(),
            line_offset,
            reports: Vec::new(),
            errored: false,
        }
    }

    fn diagnostic_at(&self, span: &Span, message: String) -> Diagnostic {
        let (line, column) = (span.start.0, span.start.1);
        Diagnostic {
            line: line as i64 + 1 - self.line_offset as i64,
            column: column + 1,
            message,
            source_line: self
                .source_lines
                .get(line)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Record an error and set the stage's error flag.
    pub fn report(&mut self, span: &Span, message: impl Into<String>) {
        self.errored = true;
        let diagnostic = self.diagnostic_at(span, message.into());
        self.reports.push(diagnostic);
    }

    /// Record a non-fatal warning; the stage still succeeds.
    pub fn warn(&mut self, span: &Span, message: impl Into<String>) {
        let diagnostic = self.diagnostic_at(span, message.into());
        self.reports.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.errored
    }

    pub fn reports(&self) -> &[Diagnostic] {
        &self.reports
    }

    /// The line a span sits on, adjusted for the prelude offset.
    pub fn user_line(&self, span: &Span) -> i64 {
        span.start.0 as i64 + 1 - self.line_offset as i64
    }

    pub fn print_all(&self) {
        for report in &self.reports {
            eprintln!("{}", report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_adjusts_for_prelude_offset() {
        let mut diagnostics = Diagnostics::new("a\nb\nc\nd", 2);
        let span = Span {
            start: (3, 4),
            end: (3, 5),
            source: String::new(),
        };
        diagnostics.report(&span, "boom");

        let report = &diagnostics.reports()[0];
        assert_eq!(report.line, 2);
        assert_eq!(report.column, 5);
        assert_eq!(report.source_line, "d");
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn warn_does_not_set_error_flag() {
        let mut diagnostics = Diagnostics::new("x", 0);
        diagnostics.warn(&Span::default(), "heads up");
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.reports().len(), 1);
    }
}
