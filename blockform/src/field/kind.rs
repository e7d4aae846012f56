use std::fmt;

/// One option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Choice {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Semantic type tag of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text.
    Char,
    /// Multi-line plain text.
    Text,
    RichText,
    Choice(Vec<Choice>),
    Boolean,
    Date,
    Email,
    /// Image with alt text.
    Image,
    /// Bare image reference.
    ImageChooser,
    /// Fixed content with no input.
    Static,
    /// Another block definition embedded as a single field.
    Block(String),
}

impl FieldKind {
    /// Build a kind from its declaration tag. Tags carrying data
    /// (`choice`, `block`) are built by the parser directly.
    pub fn from_tag(tag: &str) -> Option<FieldKind> {
        let kind = match tag {
            "char" => FieldKind::Char,
            "text" => FieldKind::Text,
            "rich_text" => FieldKind::RichText,
            "boolean" => FieldKind::Boolean,
            "date" => FieldKind::Date,
            "email" => FieldKind::Email,
            "image" => FieldKind::Image,
            "image_chooser" => FieldKind::ImageChooser,
            "static" => FieldKind::Static,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Char => "char",
            FieldKind::Text => "text",
            FieldKind::RichText => "rich_text",
            FieldKind::Choice(_) => "choice",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
            FieldKind::Image => "image",
            FieldKind::ImageChooser => "image_chooser",
            FieldKind::Static => "static",
            FieldKind::Block(_) => "block",
        }
    }

    /// Fields are required unless declared otherwise, except booleans
    /// (an unchecked box is a valid answer) and static content.
    pub fn required_by_default(&self) -> bool {
        !matches!(self, FieldKind::Boolean | FieldKind::Static)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Block(name) => write!(f, "block({})", name),
            FieldKind::Choice(choices) => write!(f, "choice({})", choices.len()),
            other => write!(f, "{}", other.tag()),
        }
    }
}
