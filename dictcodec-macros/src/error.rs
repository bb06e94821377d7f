//! Error type for the macro crate.
//!
//! Every failure while reading a derive input becomes a [`ParseError`], which
//! is reported to the user through [`ParseError::into_syn_error`].

use proc_macro2::Span;
use std::fmt;

/// Error raised while parsing derive input.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// What went wrong, as shown to the user.
    pub message: String,
    /// Source span for error reporting.
    pub span: Option<Span>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

impl ParseError {
    /// Create an error with no span and no suggestions.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            suggestions: Vec::new(),
        }
    }

    /// Point the error at a span of the derive input.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Append a fix hint. Hints are reported in the order they were added.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Convert to a syn::Error for proc-macro error reporting.
    ///
    /// Falls back to the call site when no span was attached. Each suggestion
    /// becomes an extra error at the same span.
    pub fn into_syn_error(self) -> syn::Error {
        let span = self.span.unwrap_or_else(Span::call_site);
        let mut error = syn::Error::new(span, &self.message);

        for suggestion in self.suggestions {
            error.combine(syn::Error::new(span, format!("suggestion: {}", suggestion)));
        }

        error
    }
}

/// Attribute errors from darling keep their message and span.
impl From<darling::Error> for ParseError {
    fn from(error: darling::Error) -> Self {
        let span = error.span();
        Self::new(error.to_string()).with_span(span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_suggestions() {
        let error = ParseError::new("generic records are not supported")
            .with_suggestion("declare a concrete record per instantiation");
        assert_eq!(
            error.to_string(),
            "generic records are not supported\nSuggestions:\n  - declare a concrete record per instantiation"
        );
    }

    #[test]
    fn test_syn_error_carries_each_suggestion() {
        let error = ParseError::new("unknown rename rule")
            .with_suggestion("use camelCase")
            .with_suggestion("use snake_case")
            .into_syn_error();
        let messages: Vec<_> = error.into_iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            [
                "unknown rename rule",
                "suggestion: use camelCase",
                "suggestion: use snake_case"
            ]
        );
    }

    #[test]
    fn test_darling_error_keeps_message() {
        let error = ParseError::from(darling::Error::unknown_field("renam"));
        assert!(error.message.contains("renam"));
        assert!(error.span.is_some());
    }
}
