//! The ParseError type for wrapping reader diagnostics.

use std::fmt;

use crate::{error::Diagnostic, span::Location};

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Error type for reading a document.
///
/// Wraps the diagnostics gathered up to the failure. At least one of them
/// is an error; warnings emitted before it are kept too.
///
/// The display form names the first error's element and position:
///
/// ```text
/// unparsable content <collaboration> detected; this may indicate an invalid BPMN 2.0 diagram file
///     line: 2
///     column: 29
///     nested error: unrecognized element <collaboration>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The first error-severity diagnostic.
    pub fn primary(&self) -> Option<&Diagnostic> {
        self.errors().next().or_else(|| self.diagnostics.first())
    }

    pub fn line(&self) -> Option<u32> {
        self.location().map(|l| l.line)
    }

    pub fn column(&self) -> Option<u32> {
        self.location().map(|l| l.column)
    }

    /// Message of the underlying failure.
    pub fn nested_error(&self) -> Option<&str> {
        self.primary().map(Diagnostic::message)
    }

    fn location(&self) -> Option<Location> {
        self.primary().and_then(Diagnostic::location)
    }

    fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity().is_error())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.primary() else {
            return Ok(());
        };
        match first.element() {
            Some(element) => write!(
                f,
                "unparsable content <{element}> detected; \
                 this may indicate an invalid BPMN 2.0 diagram file"
            )?,
            None => write!(f, "{first}")?,
        }
        if let Some(location) = first.location() {
            write!(f, "\n\tline: {}\n\tcolumn: {}", location.line, location.column)?;
        }
        if first.element().is_some() {
            write!(f, "\n\tnested error: {}", first.message())?;
        }
        let more = self.errors().count().saturating_sub(1);
        if more > 0 {
            write!(f, " (+{more} more)")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_error_from_diagnostic() {
        let diag = Diagnostic::error("test error").with_code(ErrorCode::E001);
        let err: ParseError = diag.into();

        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.nested_error(), Some("test error"));
    }

    #[test]
    fn test_display_without_element() {
        let err: ParseError = Diagnostic::error("unexpected end of stream")
            .with_code(ErrorCode::E001)
            .with_location(Location::new(1, 14))
            .into();

        assert_eq!(
            err.to_string(),
            "error[E001]: unexpected end of stream\n\tline: 1\n\tcolumn: 14"
        );
    }

    #[test]
    fn test_display_with_element() {
        let err: ParseError = Diagnostic::error("unrecognized element <collaboration>")
            .with_code(ErrorCode::E100)
            .with_location(Location::new(2, 29))
            .with_element("collaboration")
            .into();

        assert_eq!(
            err.to_string(),
            "unparsable content <collaboration> detected; this may indicate an invalid BPMN 2.0 diagram file\n\
             \tline: 2\n\
             \tcolumn: 29\n\
             \tnested error: unrecognized element <collaboration>"
        );
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.column(), Some(29));
    }

    #[test]
    fn test_display_skips_leading_warnings() {
        let err: ParseError = vec![
            Diagnostic::warning("duplicate id <A>"),
            Diagnostic::error("first error"),
            Diagnostic::error("second error"),
        ]
        .into();

        assert_eq!(err.to_string(), "error: first error (+1 more)");
    }
}
