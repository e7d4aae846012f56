use std::ops::Range;

use blockform::layout::path::{Area, GroupPath, NodePath};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// A layout that does not place every field of its block exactly once.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutValidationError {
    #[error("block '{block}': layout references unknown field '{field}' at {path}")]
    UnknownField {
        block: String,
        field: String,
        path: NodePath,
        span: Option<Range<usize>>,
    },
    #[error("block '{block}': field '{field}' is placed more than once (at {first} and at {second})")]
    DuplicateField {
        block: String,
        field: String,
        first: NodePath,
        second: NodePath,
        span: Option<Range<usize>>,
    },
    #[error("block '{block}': field '{field}' is not placed anywhere in the layout")]
    MissingField { block: String, field: String },
}

/// A block with a custom form template whose layout nests groups.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "block '{block}' renders with form template '{template}', which does not allow the nested group at {path}"
)]
pub struct TemplateConstraintError {
    pub block: String,
    pub template: String,
    pub path: NodePath,
    pub span: Option<Range<usize>>,
}

/// An edit that cannot be applied to the layout it was given.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("edit #{edit}: no group at {path}")]
    NoSuchGroup { edit: usize, path: GroupPath },
    #[error("edit #{edit}: index {index} is out of range for {area} of the group at {path} (length {len})")]
    IndexOutOfRange {
        edit: usize,
        path: GroupPath,
        area: Area,
        index: usize,
        len: usize,
    },
    #[error("edit #{edit}: field '{field}' is not in the layout")]
    FieldNotFound { edit: usize, field: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] LayoutValidationError),
    #[error(transparent)]
    TemplateConstraint(#[from] TemplateConstraintError),
    #[error("block '{block}': {source}")]
    Edit {
        block: String,
        #[source]
        source: EditError,
    },
    #[error("unknown block '{0}'")]
    UnknownBlock(String),
    #[error("block '{block}' inherits a layout but has no parent block")]
    MissingParent { block: String },
    #[error("field '{field}' of block '{block}' nests block '{nested}', which is not declared before it")]
    NestedBlockOrder {
        block: String,
        field: String,
        nested: String,
    },
}

impl ComposeError {
    /// Source span of the offending node, when the layout was parsed from a file.
    pub fn span(&self) -> Option<&Range<usize>> {
        match self {
            ComposeError::Validation(LayoutValidationError::UnknownField { span, .. })
            | ComposeError::Validation(LayoutValidationError::DuplicateField { span, .. })
            | ComposeError::TemplateConstraint(TemplateConstraintError { span, .. }) => {
                span.as_ref()
            }
            _ => None,
        }
    }

    /// Location of the offending node in the layout tree.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            ComposeError::Validation(LayoutValidationError::UnknownField { path, .. })
            | ComposeError::Validation(LayoutValidationError::DuplicateField {
                second: path, ..
            })
            | ComposeError::TemplateConstraint(TemplateConstraintError { path, .. }) => Some(path),
            _ => None,
        }
    }

    /// Convert to a codespan-reporting Diagnostic. Errors without a span
    /// carry the layout path as a note instead of a label.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let mut diagnostic = Diagnostic::error().with_message(self.to_string());
        if let Some(span) = self.span() {
            diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, span.clone())]);
        } else if let Some(path) = self.path() {
            diagnostic = diagnostic.with_notes(vec![format!("at {}", path)]);
        }
        if let ComposeError::TemplateConstraint(_) = self {
            diagnostic = diagnostic.with_notes(vec![
                "blocks with a form template may only list field names in children and settings"
                    .to_string(),
            ]);
        }
        diagnostic
    }
}
