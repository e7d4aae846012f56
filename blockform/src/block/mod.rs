use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;

use crate::edit::LayoutEdit;
use crate::field::Field;
use crate::layout::Layout;

/// Where a block's layout comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutSource {
    /// Nothing declared: every field in declaration order.
    Implicit,
    Declared(Layout),
    /// A subclass reusing its parent's layout unchanged.
    Inherited,
    /// A subclass editing a copy of its parent's layout.
    Derived(Vec<LayoutEdit>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("block '{block}' declares field '{field}' more than once")]
    DuplicateField { block: String, field: String },
}

/// A named block with typed fields and an optional layout.
#[derive(Debug, Clone)]
pub struct BlockDefinition {
    pub name: String,
    pub icon: Option<String>,
    /// External template that renders this block's form instead of the group renderer.
    pub form_template: Option<String>,
    pub layout: LayoutSource,
    /// Byte span in the declaration source, when parsed from one.
    pub span: Option<Range<usize>>,
    fields: Vec<Field>,
    /// Names declared by this definition itself (as opposed to inherited).
    own: BTreeSet<String>,
    parent: Option<Arc<BlockDefinition>>,
}

impl BlockDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        BlockDefinition {
            name: name.into(),
            icon: None,
            form_template: None,
            layout: LayoutSource::Implicit,
            span: None,
            fields: Vec::new(),
            own: BTreeSet::new(),
            parent: None,
        }
    }

    /// Start a subclass of `parent`: its fields, icon and form template are
    /// copied, and the layout is inherited until one is declared or derived.
    pub fn extend(name: impl Into<String>, parent: Arc<BlockDefinition>) -> Self {
        BlockDefinition {
            name: name.into(),
            icon: parent.icon.clone(),
            form_template: parent.form_template.clone(),
            layout: LayoutSource::Inherited,
            span: None,
            fields: parent.fields.clone(),
            own: BTreeSet::new(),
            parent: Some(parent),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_form_template(mut self, template: impl Into<String>) -> Self {
        self.form_template = Some(template.into());
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = LayoutSource::Declared(layout);
        self
    }

    pub fn with_edits(mut self, edits: Vec<LayoutEdit>) -> Self {
        self.layout = LayoutSource::Derived(edits);
        self
    }

    pub fn with_fields(
        mut self,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<Self, DefinitionError> {
        for field in fields {
            self.add_field(field)?;
        }
        Ok(self)
    }

    /// Append a field. Redeclaring an inherited field replaces it in place;
    /// redeclaring one of this block's own fields is an error.
    pub fn add_field(&mut self, field: Field) -> Result<(), DefinitionError> {
        if self.own.contains(&field.name) {
            return Err(DefinitionError::DuplicateField {
                block: self.name.clone(),
                field: field.name,
            });
        }
        self.own.insert(field.name.clone());
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(inherited) => *inherited = field,
            None => self.fields.push(field),
        }
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn parent(&self) -> Option<&BlockDefinition> {
        self.parent.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    fn person() -> Arc<BlockDefinition> {
        let person = BlockDefinition::new("person")
            .with_icon("user")
            .with_fields([
                Field::new("first_name", FieldKind::Char),
                Field::new("surname", FieldKind::Char),
                Field::new("email", FieldKind::Email),
            ])
            .unwrap();
        Arc::new(person)
    }

    #[test]
    fn duplicate_own_field_is_rejected() {
        let result = BlockDefinition::new("b").with_fields([
            Field::new("title", FieldKind::Char),
            Field::new("title", FieldKind::Text),
        ]);
        assert_eq!(
            result.unwrap_err(),
            DefinitionError::DuplicateField {
                block: "b".into(),
                field: "title".into()
            }
        );
    }

    #[test]
    fn subclass_appends_and_overrides_fields() {
        let parent = person();
        let employee = BlockDefinition::extend("employee", Arc::clone(&parent))
            .with_icon("group")
            .with_fields([
                Field::new("role", FieldKind::Char),
                Field::new("email", FieldKind::Email).optional(),
            ])
            .unwrap();

        assert_eq!(
            employee.field_names(),
            vec!["first_name", "surname", "email", "role"]
        );
        assert!(!employee.field("email").unwrap().required);
        assert!(parent.field("email").unwrap().required);
        assert_eq!(employee.icon.as_deref(), Some("group"));
        assert_eq!(employee.layout, LayoutSource::Inherited);
        assert_eq!(employee.parent().map(|p| p.name.as_str()), Some("person"));
    }

    #[test]
    fn boolean_fields_default_to_optional() {
        assert!(!Field::new("available", FieldKind::Boolean).required);
        assert!(Field::new("biography", FieldKind::RichText).required);
    }
}
