use blockform::value::{FieldValue, FieldValues};

/// Convert a TOML table of submitted values into field values.
/// Sub-tables become nested block values; booleans stay booleans; every other
/// scalar is kept as its text form.
pub fn from_table(table: &toml::Table) -> FieldValues {
    let mut values = FieldValues::new();
    for (name, value) in table {
        values.insert(name.clone(), from_value(value));
    }
    values
}

fn from_value(value: &toml::Value) -> FieldValue {
    match value {
        toml::Value::String(s) => FieldValue::Text(s.clone()),
        toml::Value::Boolean(b) => FieldValue::Bool(*b),
        toml::Value::Integer(n) => FieldValue::Text(n.to_string()),
        toml::Value::Float(f) => FieldValue::Text(f.to_string()),
        toml::Value::Datetime(d) => FieldValue::Text(d.to_string()),
        toml::Value::Table(table) => FieldValue::Block(from_table(table)),
        toml::Value::Array(items) => FieldValue::Text(
            items
                .iter()
                .map(|item| from_value(item).to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    }
}

/// Read a values file. The whole file is one table of field values.
pub fn load(path: &str) -> Result<FieldValues, String> {
    let source =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
    let table: toml::Table =
        toml::from_str(&source).map_err(|e| format!("invalid values file '{}': {}", path, e))?;
    Ok(from_table(&table))
}
