use std::collections::HashMap;

use blockform::block::{BlockDefinition, LayoutSource};
use blockform::layout::path::{Area, NodePath};
use blockform::layout::{FieldRef, Group, Layout, LayoutNode};
use log::{debug, warn};

use crate::derive::derive_named;
use crate::error::{ComposeError, LayoutValidationError, TemplateConstraintError};

/// Compute a block's effective layout and validate it against the block's fields.
///
/// Blocks without a layout anywhere in their inheritance chain get a flat one
/// listing every field in declaration order. Subclasses otherwise reuse or
/// derive from their parent's resolved layout.
pub fn resolve_layout(definition: &BlockDefinition) -> Result<Layout, ComposeError> {
    let layout = match &definition.layout {
        LayoutSource::Implicit => implicit_layout(definition),
        LayoutSource::Declared(layout) => layout.clone(),
        LayoutSource::Inherited if !declares_layout(parent_of(definition)?) => {
            implicit_layout(definition)
        }
        LayoutSource::Inherited => resolve_layout(parent_of(definition)?)?,
        LayoutSource::Derived(edits) => {
            derive_named(&definition.name, parent_of(definition)?, edits)?
        }
    };
    validate_layout(definition, &layout)?;
    debug!(
        "resolved layout of '{}': {} node(s), {} field(s)",
        definition.name,
        layout.node_count(),
        definition.fields().len()
    );
    Ok(layout)
}

fn implicit_layout(definition: &BlockDefinition) -> Layout {
    Layout::Flat(
        definition
            .fields()
            .iter()
            .map(|f| LayoutNode::field(f.name.clone()))
            .collect(),
    )
}

/// Whether `definition` or one of its ancestors declares or derives a layout.
fn declares_layout(definition: &BlockDefinition) -> bool {
    match &definition.layout {
        LayoutSource::Implicit => false,
        LayoutSource::Declared(_) | LayoutSource::Derived(_) => true,
        LayoutSource::Inherited => definition.parent().is_some_and(declares_layout),
    }
}

fn parent_of(definition: &BlockDefinition) -> Result<&BlockDefinition, ComposeError> {
    definition.parent().ok_or_else(|| ComposeError::MissingParent {
        block: definition.name.clone(),
    })
}

/// Check that `layout` places every field of `definition` exactly once, and that
/// a block with a form template has no nested groups.
pub fn validate_layout(definition: &BlockDefinition, layout: &Layout) -> Result<(), ComposeError> {
    let root = layout.to_root();

    if let Some(template) = &definition.form_template {
        check_template_constraint(definition, template, &root)?;
    }

    let mut placed: HashMap<&str, NodePath> = HashMap::new();
    for_each_field(&root, &NodePath::root(), &mut |field, path| {
        if !definition.has_field(&field.name) {
            return Err(LayoutValidationError::UnknownField {
                block: definition.name.clone(),
                field: field.name.clone(),
                path,
                span: field.span.clone(),
            });
        }
        if let Some(first) = placed.get(field.name.as_str()) {
            return Err(LayoutValidationError::DuplicateField {
                block: definition.name.clone(),
                field: field.name.clone(),
                first: first.clone(),
                second: path,
                span: field.span.clone(),
            });
        }
        placed.insert(&field.name, path);
        Ok(())
    })?;

    if let Some(missing) = definition
        .fields()
        .iter()
        .find(|f| !placed.contains_key(f.name.as_str()))
    {
        return Err(LayoutValidationError::MissingField {
            block: definition.name.clone(),
            field: missing.name.clone(),
        }
        .into());
    }

    warn_on_label_formats(definition, &root);
    Ok(())
}

/// Check only the at-most-once rule. Used between derivation steps, where
/// the layout may still lack fields the subclass adds later.
pub(crate) fn check_unique(block: &str, layout: &Layout) -> Result<(), LayoutValidationError> {
    let root = layout.to_root();
    let mut placed: HashMap<&str, NodePath> = HashMap::new();
    for_each_field(&root, &NodePath::root(), &mut |field, path| {
        if let Some(first) = placed.get(field.name.as_str()) {
            return Err(LayoutValidationError::DuplicateField {
                block: block.to_string(),
                field: field.name.clone(),
                first: first.clone(),
                second: path,
                span: field.span.clone(),
            });
        }
        placed.insert(&field.name, path);
        Ok(())
    })
}

/// Visit every field reference under `group`, children before settings, depth-first.
fn for_each_field<'a, F>(group: &'a Group, path: &NodePath, visit: &mut F) -> Result<(), LayoutValidationError>
where
    F: FnMut(&'a FieldRef, NodePath) -> Result<(), LayoutValidationError>,
{
    for area in [Area::Children, Area::Settings] {
        for (index, node) in group.nodes(area).iter().enumerate() {
            match node {
                LayoutNode::Field(field) => visit(field, path.join(area, index, None))?,
                LayoutNode::Group(inner) => {
                    let inner_path = path.join(area, index, inner.heading.as_deref());
                    for_each_field(inner, &inner_path, visit)?;
                }
            }
        }
    }
    Ok(())
}

fn check_template_constraint(
    definition: &BlockDefinition,
    template: &str,
    root: &Group,
) -> Result<(), TemplateConstraintError> {
    for area in [Area::Children, Area::Settings] {
        for (index, node) in root.nodes(area).iter().enumerate() {
            if let LayoutNode::Group(group) = node {
                return Err(TemplateConstraintError {
                    block: definition.name.clone(),
                    template: template.to_string(),
                    path: NodePath::root().join(area, index, group.heading.as_deref()),
                    span: group.span.clone(),
                });
            }
        }
    }
    Ok(())
}

fn warn_on_label_formats(definition: &BlockDefinition, group: &Group) {
    if let Some(format) = &group.label_format {
        let immediate = group.immediate_fields();
        for name in format.field_names() {
            if !immediate.contains(&name) {
                warn!(
                    "block '{}': label_format \"{}\" refers to '{}', which is not a field of the group; it will render verbatim",
                    definition.name, format, name
                );
            }
        }
    }
    for node in group.children.iter().chain(group.settings.iter()) {
        if let LayoutNode::Group(inner) = node {
            warn_on_label_formats(definition, inner);
        }
    }
}
