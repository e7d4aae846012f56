use std::collections::HashMap;

use blockform::Catalog;
use blockform::block::BlockDefinition;
use blockform::layout::Layout;
use blockform::value::{FieldErrors, FieldValues};
use log::{debug, info};

use crate::error::ComposeError;
use crate::render::{FormTree, NestedForms, render_with};
use crate::resolve::resolve_layout;

/// A catalog with every block's layout resolved and validated.
///
/// All layout errors surface here, when the catalog is loaded. Rendering a
/// block afterwards cannot fail on layout grounds.
pub struct Composer<'a> {
    catalog: &'a Catalog,
    layouts: HashMap<String, Layout>,
}

impl<'a> Composer<'a> {
    /// Resolve every block in declaration order, collecting all errors.
    pub fn new(catalog: &'a Catalog) -> Result<Self, Vec<ComposeError>> {
        let mut layouts = HashMap::new();
        let mut errors = Vec::new();

        for (position, definition) in catalog.blocks.iter().enumerate() {
            for field in definition.fields() {
                let Some(nested) = field.nested_block() else {
                    continue;
                };
                match catalog.position(nested) {
                    Some(p) if p < position => {}
                    Some(_) => errors.push(ComposeError::NestedBlockOrder {
                        block: definition.name.clone(),
                        field: field.name.clone(),
                        nested: nested.to_string(),
                    }),
                    None => errors.push(ComposeError::UnknownBlock(nested.to_string())),
                }
            }

            match resolve_layout(definition) {
                Ok(layout) => {
                    layouts.insert(definition.name.clone(), layout);
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            info!("composed {} block layout(s)", layouts.len());
            Ok(Composer { catalog, layouts })
        } else {
            Err(errors)
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn definition(&self, name: &str) -> Option<&BlockDefinition> {
        self.catalog.get(name).map(|d| d.as_ref())
    }

    /// The resolved layout of a block.
    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(name)
    }

    /// Render a block's form, expanding nested block fields into their own forms.
    pub fn render_block(
        &self,
        name: &str,
        values: &FieldValues,
        errors: &FieldErrors,
    ) -> Result<FormTree, ComposeError> {
        self.render_prefixed(name, values, errors, name)
            .ok_or_else(|| ComposeError::UnknownBlock(name.to_string()))
    }

    fn render_prefixed(
        &self,
        name: &str,
        values: &FieldValues,
        errors: &FieldErrors,
        prefix: &str,
    ) -> Option<FormTree> {
        let definition = self.definition(name)?;
        let layout = self.layout(name)?;
        debug!("rendering '{}' with prefix '{}'", name, prefix);
        let nested: &dyn NestedForms = self;
        Some(render_with(
            definition,
            layout,
            values,
            errors,
            prefix,
            Some(nested),
        ))
    }
}

impl NestedForms for Composer<'_> {
    fn nested_form(
        &self,
        block: &str,
        values: &FieldValues,
        errors: &FieldErrors,
        prefix: &str,
    ) -> Option<FormTree> {
        self.render_prefixed(block, values, errors, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockform::field::{Field, FieldKind};
    use blockform::layout::{Group, LayoutNode};
    use blockform::value::FieldValue;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new(0);
        catalog.push(
            BlockDefinition::new("address")
                .with_fields([
                    Field::new("street", FieldKind::Char),
                    Field::new("city", FieldKind::Char),
                ])
                .unwrap(),
        );
        catalog.push(
            BlockDefinition::new("contact")
                .with_fields([
                    Field::new("name", FieldKind::Char),
                    Field::new("address", FieldKind::Block("address".into())),
                ])
                .unwrap()
                .with_layout(Layout::Root(Group::with_children([
                    LayoutNode::from("name"),
                    Group::with_children(["address"]).heading("Where").into(),
                ]))),
        );
        catalog
    }

    #[test]
    fn nested_blocks_render_with_prefixed_ids() {
        let catalog = catalog();
        let composer = Composer::new(&catalog).unwrap();
        let values = FieldValues::new().with(
            "address",
            FieldValue::Block(FieldValues::new().with("city", FieldValue::text("Leeds"))),
        );
        let mut nested = FieldErrors::new();
        nested.add("street", "This field is required.");
        let mut errors = FieldErrors::new();
        errors.add_nested("address", nested);

        let tree = composer.render_block("contact", &values, &errors).unwrap();
        let address = tree.widget("address").unwrap();
        assert_eq!(address.id, "contact-address");
        assert_eq!(address.nested_error_count, 1);

        let inner = address.nested.as_ref().unwrap();
        assert_eq!(inner.widget("street").unwrap().id, "contact-address-street");
        assert_eq!(inner.widget("city").unwrap().value, FieldValue::text("Leeds"));
        assert_eq!(inner.error_count(), 1);

        assert_eq!(tree.error_count(), 1);
        assert_eq!(tree.flagged_sections(), vec!["Where"]);
    }

    #[test]
    fn unknown_block_is_an_error() {
        let catalog = catalog();
        let composer = Composer::new(&catalog).unwrap();
        assert_eq!(
            composer
                .render_block("nope", &FieldValues::new(), &FieldErrors::new())
                .unwrap_err(),
            ComposeError::UnknownBlock("nope".into())
        );
    }

    #[test]
    fn collects_errors_from_every_block() {
        let mut catalog = Catalog::new(0);
        catalog.push(
            BlockDefinition::new("outer")
                .with_fields([Field::new("inner", FieldKind::Block("inner".into()))])
                .unwrap(),
        );
        catalog.push(
            BlockDefinition::new("inner")
                .with_fields([Field::new("a", FieldKind::Char)])
                .unwrap()
                .with_layout(Layout::Flat(vec!["a".into(), "a".into()])),
        );

        let errors = match Composer::new(&catalog) {
            Ok(_) => panic!("expected errors"),
            Err(errors) => errors,
        };
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ComposeError::NestedBlockOrder { .. }));
        assert!(matches!(errors[1], ComposeError::Validation(_)));
    }
}
