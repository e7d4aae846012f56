use std::collections::BTreeMap;
use std::fmt;

/// A value bound to a field of a block form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Bool(bool),
    /// Values of a nested block field.
    Block(FieldValues),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// True for values that would not satisfy a required field.
    /// An unchecked boolean counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Bool(b) => !b,
            FieldValue::Block(values) => values.iter().all(|(_, v)| v.is_empty()),
        }
    }

    pub fn as_block(&self) -> Option<&FieldValues> {
        match self {
            FieldValue::Block(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Block(values) => {
                let mut first = true;
                for (name, value) in values.iter() {
                    if value.is_empty() {
                        continue;
                    }
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Current bound values of a block's fields, keyed by field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldValues {
    values: BTreeMap<String, FieldValue>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Values of a nested block field, or an empty set.
    pub fn nested(&self, name: &str) -> FieldValues {
        self.get(name)
            .and_then(FieldValue::as_block)
            .cloned()
            .unwrap_or_default()
    }

    /// Text of a field as used when formatting labels: empty when unbound.
    pub fn display_text(&self, name: &str) -> String {
        self.get(name).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validation messages produced by the host field type system, keyed by field name.
/// Errors of nested block fields are kept in their own `FieldErrors`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldErrors {
    own: BTreeMap<String, Vec<String>>,
    nested: BTreeMap<String, FieldErrors>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.own.entry(name.into()).or_default().push(message.into());
    }

    pub fn with(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(name, message);
        self
    }

    /// Attach the errors of a nested block field. Empty sets are dropped.
    pub fn add_nested(&mut self, name: impl Into<String>, errors: FieldErrors) {
        if !errors.is_empty() {
            self.nested.insert(name.into(), errors);
        }
    }

    /// Messages reported directly against `name`.
    pub fn messages(&self, name: &str) -> &[String] {
        self.own.get(name).map(|m| m.as_slice()).unwrap_or(&[])
    }

    pub fn nested(&self, name: &str) -> Option<&FieldErrors> {
        self.nested.get(name)
    }

    pub fn has_errors(&self, name: &str) -> bool {
        self.error_count(name) > 0
    }

    /// Number of errors attributable to `name`, including those inside a nested block.
    pub fn error_count(&self, name: &str) -> usize {
        self.messages(name).len() + self.nested(name).map(|n| n.total()).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.own.values().map(|m| m.len()).sum::<usize>()
            + self.nested.values().map(|n| n.total()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Names of fields with at least one error, own or nested.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .own
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(k, _)| k.as_str())
            .chain(self.nested.keys().map(|k| k.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchecked_boolean_is_empty() {
        assert!(FieldValue::Bool(false).is_empty());
        assert!(!FieldValue::Bool(true).is_empty());
        assert!(FieldValue::text("   ").is_empty());
    }

    #[test]
    fn display_text_of_unbound_field_is_empty() {
        let values = FieldValues::new().with("first_name", FieldValue::text("Ada"));
        assert_eq!(values.display_text("first_name"), "Ada");
        assert_eq!(values.display_text("surname"), "");
    }

    #[test]
    fn nested_errors_count_towards_parent_field() {
        let mut errors = FieldErrors::new().with("headline", "This field is required.");
        let inner = FieldErrors::new()
            .with("title", "This field is required.")
            .with("body", "This field is required.");
        errors.add_nested("content", inner);
        errors.add_nested("ignored", FieldErrors::new());

        assert_eq!(errors.error_count("content"), 2);
        assert_eq!(errors.error_count("headline"), 1);
        assert_eq!(errors.total(), 3);
        assert_eq!(errors.field_names(), vec!["content", "headline"]);
        assert!(errors.nested("ignored").is_none());
        assert!(errors.has_errors("content"));
        assert!(!errors.has_errors("ignored"));
    }
}
