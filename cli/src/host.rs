//! Stand-in for the host framework's field validation.
//!
//! The composer never validates values itself; it only routes the messages
//! produced here to the sections that contain the offending fields.

use blockform::field::{Field, FieldKind};
use blockform::value::{FieldErrors, FieldValue, FieldValues};
use composer::Composer;
use log::debug;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Validate submitted values of `block`, recursing into nested block fields.
pub fn validate(composer: &Composer<'_>, block: &str, values: &FieldValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let Some(definition) = composer.definition(block) else {
        return errors;
    };

    for field in definition.fields() {
        if let Some(nested) = field.nested_block() {
            let nested_errors = validate(composer, nested, &values.nested(&field.name));
            errors.add_nested(field.name.clone(), nested_errors);
            continue;
        }
        let value = values.get(&field.name).or(field.default.as_ref());
        if let Some(message) = check_field(field, value) {
            errors.add(field.name.clone(), message);
        }
    }

    debug!(
        "host validation of '{}' produced {} error(s)",
        block,
        errors.total()
    );
    errors
}

fn check_field(field: &Field, value: Option<&FieldValue>) -> Option<String> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return field.required.then(|| REQUIRED.to_string()),
    };

    match &field.kind {
        FieldKind::Email if !is_valid_email(&value.to_string()) => Some(INVALID_EMAIL.to_string()),
        FieldKind::Choice(choices) => {
            let text = value.to_string();
            if choices.iter().any(|c| c.value == text) {
                None
            } else {
                Some(format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    text
                ))
            }
        }
        _ => None,
    }
}

fn is_valid_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
