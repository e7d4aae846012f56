use std::fmt;

use thiserror::Error;

/// A heading template interpolating a group's field values, e.g. `"{first_name} {surname}"`.
/// `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFormat {
    source: String,
    parts: Vec<LabelPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPart {
    Literal(String),
    /// A `{name}` placeholder.
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelFormatError {
    #[error("unclosed '{{' at offset {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at offset {0}")]
    Unmatched(usize),
    #[error("empty placeholder at offset {0}")]
    EmptyPlaceholder(usize),
}

impl LabelFormatError {
    /// Byte offset of the problem within the template.
    pub fn offset(&self) -> usize {
        match self {
            LabelFormatError::Unclosed(at)
            | LabelFormatError::Unmatched(at)
            | LabelFormatError::EmptyPlaceholder(at) => *at,
        }
    }
}

impl LabelFormat {
    pub fn parse(source: &str) -> Result<LabelFormat, LabelFormatError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((at, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(LabelFormatError::Unclosed(at));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(LabelFormatError::EmptyPlaceholder(at));
                    }
                    if !literal.is_empty() {
                        parts.push(LabelPart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(LabelPart::Field(name.to_string()));
                }
                '}' => return Err(LabelFormatError::Unmatched(at)),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(LabelPart::Literal(literal));
        }

        Ok(LabelFormat {
            source: source.to_string(),
            parts,
        })
    }

    pub fn parts(&self) -> &[LabelPart] {
        &self.parts
    }

    /// Names referenced by placeholders, in order of appearance.
    pub fn field_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                LabelPart::Field(name) => Some(name.as_str()),
                LabelPart::Literal(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_literals_and_placeholders() {
        let format = LabelFormat::parse("{first_name} {surname}").unwrap();
        assert_eq!(
            format.parts(),
            &[
                LabelPart::Field("first_name".into()),
                LabelPart::Literal(" ".into()),
                LabelPart::Field("surname".into()),
            ]
        );
        assert_eq!(format.field_names(), vec!["first_name", "surname"]);
    }

    #[test]
    fn doubled_braces_are_literal() {
        let format = LabelFormat::parse("{{{rating}}} stars").unwrap();
        assert_eq!(
            format.parts(),
            &[
                LabelPart::Literal("{".into()),
                LabelPart::Field("rating".into()),
                LabelPart::Literal("} stars".into()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        assert_eq!(LabelFormat::parse("{name"), Err(LabelFormatError::Unclosed(0)));
        assert_eq!(LabelFormat::parse("a } b"), Err(LabelFormatError::Unmatched(2)));
        assert_eq!(
            LabelFormat::parse("x { }"),
            Err(LabelFormatError::EmptyPlaceholder(2))
        );
    }
}
