pub mod kind;

pub use kind::{Choice, FieldKind};

use crate::value::FieldValue;

/// A leaf entry of a block definition.
/// The composer only cares about the name, the type tag and whether it is required;
/// the rest is carried through to rendered widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: Option<String>,
    /// Value shown when nothing has been bound yet.
    pub default: Option<FieldValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let required = kind.required_by_default();
        Field {
            name: name.into(),
            kind,
            required,
            help_text: None,
            default: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Name of the nested block definition, for `FieldKind::Block` fields.
    pub fn nested_block(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Block(name) => Some(name),
            _ => None,
        }
    }
}
