use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// A declaration error with source location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
    /// Related locations, e.g. the first declaration of a duplicate.
    pub secondary: Vec<(Range<usize>, String)>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
            secondary: Vec::new(),
        }
    }

    /// A TOML syntax or shape error. toml reports spans for most of these.
    pub fn from_toml(error: &toml::de::Error, file_id: usize) -> Self {
        let span = error.span().unwrap_or(0..0);
        ParseError::error(error.message().trim_end(), span, file_id)
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let mut labels = vec![Label::primary(self.file_id, self.span.clone())];
        for (span, message) in &self.secondary {
            labels.push(Label::secondary(self.file_id, span.clone()).with_message(message));
        }
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}
