use blockform::layout::Group;
use blockform::layout::label_format::{LabelFormat, LabelPart};
use blockform::value::FieldValues;

/// Evaluate a group's label format against the bound values (submitted or
/// default) of its immediate fields.
///
/// Placeholders naming anything other than an immediate field render verbatim,
/// and unbound fields render as empty text. Returns `None` when every field
/// placeholder is empty, so the caller falls back to the static heading.
pub fn format_label(format: &LabelFormat, group: &Group, values: &FieldValues) -> Option<String> {
    let immediate = group.immediate_fields();
    let mut out = String::new();
    let mut placeholders = 0;
    let mut filled = 0;

    for part in format.parts() {
        match part {
            LabelPart::Literal(text) => out.push_str(text),
            LabelPart::Field(name) if immediate.contains(&name.as_str()) => {
                placeholders += 1;
                let text = values.display_text(name);
                if !text.trim().is_empty() {
                    filled += 1;
                }
                out.push_str(&text);
            }
            LabelPart::Field(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
    }

    if placeholders > 0 && filled == 0 {
        return None;
    }
    let out = out.trim();
    if out.is_empty() {
        None
    } else {
        Some(out.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockform::value::FieldValue;

    fn name_group() -> Group {
        Group::with_children(["surname", "first_name"])
            .heading("Basic info")
            .label_format(LabelFormat::parse("{first_name} {surname}").unwrap())
    }

    fn label(values: &FieldValues) -> Option<String> {
        let group = name_group();
        format_label(group.label_format.as_ref().unwrap(), &group, values)
    }

    #[test]
    fn combines_child_values() {
        let values = FieldValues::new()
            .with("first_name", FieldValue::text("Ada"))
            .with("surname", FieldValue::text("Lovelace"));
        assert_eq!(label(&values).as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn partially_filled_values_are_trimmed() {
        let values = FieldValues::new().with("surname", FieldValue::text("Lovelace"));
        assert_eq!(label(&values).as_deref(), Some("Lovelace"));
    }

    #[test]
    fn all_empty_falls_back() {
        assert_eq!(label(&FieldValues::new()), None);
        let blank = FieldValues::new().with("first_name", FieldValue::text("  "));
        assert_eq!(label(&blank), None);
    }

    #[test]
    fn unknown_placeholders_render_verbatim() {
        let group = Group::with_children(["rating"])
            .label_format(LabelFormat::parse("{rating} stars by {author}").unwrap());
        let values = FieldValues::new().with("rating", FieldValue::text("5"));
        assert_eq!(
            format_label(group.label_format.as_ref().unwrap(), &group, &values).as_deref(),
            Some("5 stars by {author}")
        );
    }
}
