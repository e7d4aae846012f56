pub mod label;

use blockform::block::BlockDefinition;
use blockform::field::FieldKind;
use blockform::layout::attrs::Attrs;
use blockform::layout::{Group, Layout, LayoutNode};
use blockform::value::{FieldErrors, FieldValue, FieldValues};
use log::warn;

use crate::render::label::format_label;

/// A rendered block form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormTree {
    pub block: String,
    pub icon: Option<String>,
    /// Set when an external template renders this form from the field and settings lists.
    pub form_template: Option<String>,
    pub root: FormSection,
    /// Errors keyed to fields that have no widget in the layout.
    /// They are counted in the root section's `error_count`.
    pub unplaced_errors: Vec<UnplacedError>,
}

/// Errors reported against a field the rendered layout does not show.
#[derive(Debug, Clone, PartialEq)]
pub struct UnplacedError {
    pub field: String,
    pub messages: Vec<String>,
    /// Own messages plus errors inside a nested block.
    pub count: usize,
}

/// A group rendered as a visual section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormSection {
    pub heading: Option<String>,
    /// Heading computed from the label format, if it produced anything.
    pub label: Option<String>,
    pub icon: Option<String>,
    pub classname: Option<String>,
    pub help_text: Option<String>,
    pub attrs: Attrs,
    /// Declared collapsed via its display class.
    pub collapsed: bool,
    /// Whether the section is shown expanded: not collapsed, or holding errors.
    pub open: bool,
    pub children: Vec<FormNode>,
    pub settings: Vec<FormNode>,
    /// Errors anywhere below this section, settings included.
    pub error_count: usize,
    /// Errors anywhere inside this section's settings area.
    pub settings_error_count: usize,
    /// Whether the settings area is shown expanded.
    pub settings_open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormNode {
    Section(FormSection),
    Field(FieldWidget),
}

/// A field bound to its value and errors.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWidget {
    pub name: String,
    /// Prefix-joined id, unique across nested blocks.
    pub id: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: Option<String>,
    pub value: FieldValue,
    pub errors: Vec<String>,
    /// Errors inside a nested block field.
    pub nested_error_count: usize,
    /// The nested block's own form, when rendered through a catalog.
    pub nested: Option<Box<FormTree>>,
}

impl FieldWidget {
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.nested_error_count
    }
}

impl FormNode {
    pub fn error_count(&self) -> usize {
        match self {
            FormNode::Section(section) => section.error_count,
            FormNode::Field(widget) => widget.error_count(),
        }
    }

    pub fn as_section(&self) -> Option<&FormSection> {
        match self {
            FormNode::Section(section) => Some(section),
            FormNode::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldWidget> {
        match self {
            FormNode::Field(widget) => Some(widget),
            FormNode::Section(_) => None,
        }
    }

    /// Field name, or section heading, or `(group)` for an untitled section.
    pub fn describe(&self) -> &str {
        match self {
            FormNode::Field(widget) => &widget.name,
            FormNode::Section(section) => section.heading.as_deref().unwrap_or("(group)"),
        }
    }
}

impl FormSection {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// The text to show as the section title.
    pub fn title(&self) -> Option<&str> {
        self.label.as_deref().or(self.heading.as_deref())
    }

    /// This section and every section below it, depth-first, children before settings.
    pub fn sections(&self) -> Vec<&FormSection> {
        let mut out = vec![self];
        for node in self.children.iter().chain(self.settings.iter()) {
            if let FormNode::Section(inner) = node {
                out.extend(inner.sections());
            }
        }
        out
    }

    pub fn widgets(&self) -> Vec<&FieldWidget> {
        let mut out = Vec::new();
        for node in self.children.iter().chain(self.settings.iter()) {
            match node {
                FormNode::Field(widget) => out.push(widget),
                FormNode::Section(inner) => out.extend(inner.widgets()),
            }
        }
        out
    }
}

impl FormTree {
    pub fn error_count(&self) -> usize {
        self.root.error_count
    }

    /// First section with the given static heading.
    pub fn section(&self, heading: &str) -> Option<&FormSection> {
        self.root
            .sections()
            .into_iter()
            .find(|s| s.heading.as_deref() == Some(heading))
    }

    pub fn widget(&self, name: &str) -> Option<&FieldWidget> {
        self.root.widgets().into_iter().find(|w| w.name == name)
    }

    /// Headings of the non-root sections that carry errors, in render order.
    pub fn flagged_sections(&self) -> Vec<&str> {
        self.root
            .sections()
            .into_iter()
            .skip(1)
            .filter(|s| s.has_errors())
            .map(|s| s.heading.as_deref().unwrap_or("(group)"))
            .collect()
    }
}

/// Renders nested block fields with their own definitions and layouts.
pub trait NestedForms {
    fn nested_form(
        &self,
        block: &str,
        values: &FieldValues,
        errors: &FieldErrors,
        prefix: &str,
    ) -> Option<FormTree>;
}

/// Render a resolved layout with bound values and field errors.
///
/// Every group becomes a section and every field a widget. Error counts are summed
/// up through every ancestor section, settings included, so a collapsed or
/// settings-hidden group holding an error is flagged and opened. Nested block
/// fields are rendered as plain widgets; use `Composer::render_block` to expand them.
pub fn render_form(
    definition: &BlockDefinition,
    layout: &Layout,
    values: &FieldValues,
    errors: &FieldErrors,
) -> FormTree {
    render_with(definition, layout, values, errors, &definition.name, None)
}

pub(crate) fn render_with(
    definition: &BlockDefinition,
    layout: &Layout,
    values: &FieldValues,
    errors: &FieldErrors,
    prefix: &str,
    nested: Option<&dyn NestedForms>,
) -> FormTree {
    let renderer = Renderer {
        definition,
        values,
        errors,
        prefix,
        nested,
    };
    let mut root = renderer.section(&layout.to_root());
    let unplaced_errors = renderer.unplaced_errors(&root);
    root.error_count += unplaced_errors.iter().map(|e| e.count).sum::<usize>();
    FormTree {
        block: definition.name.clone(),
        icon: definition.icon.clone(),
        form_template: definition.form_template.clone(),
        root,
        unplaced_errors,
    }
}

struct Renderer<'a> {
    definition: &'a BlockDefinition,
    values: &'a FieldValues,
    errors: &'a FieldErrors,
    prefix: &'a str,
    nested: Option<&'a dyn NestedForms>,
}

impl Renderer<'_> {
    fn section(&self, group: &Group) -> FormSection {
        let children: Vec<FormNode> = group.children.iter().filter_map(|n| self.node(n)).collect();
        let settings: Vec<FormNode> = group.settings.iter().filter_map(|n| self.node(n)).collect();

        let settings_error_count: usize = settings.iter().map(FormNode::error_count).sum();
        let error_count =
            children.iter().map(FormNode::error_count).sum::<usize>() + settings_error_count;
        let collapsed = group.is_collapsed();
        let label = group
            .label_format
            .as_ref()
            .and_then(|format| format_label(format, group, &self.bound_values(group)));

        FormSection {
            heading: group.heading.clone(),
            label,
            icon: group.icon.clone(),
            classname: group.classname.clone(),
            help_text: group.help_text.clone(),
            attrs: group.attrs.clone(),
            collapsed,
            open: !collapsed || error_count > 0,
            children,
            settings,
            error_count,
            settings_error_count,
            settings_open: settings_error_count > 0,
        }
    }

    fn node(&self, node: &LayoutNode) -> Option<FormNode> {
        match node {
            LayoutNode::Field(field) => self.widget(&field.name).map(FormNode::Field),
            LayoutNode::Group(group) => Some(FormNode::Section(self.section(group))),
        }
    }

    fn widget(&self, name: &str) -> Option<FieldWidget> {
        let Some(field) = self.definition.field(name) else {
            warn!(
                "block '{}' has no field '{}'; leaving it out of the form",
                self.definition.name, name
            );
            return None;
        };

        let id = format!("{}-{}", self.prefix, name);
        let value = self.bound_value(name).unwrap_or_default();
        let no_errors = FieldErrors::new();
        let nested_errors = self.errors.nested(name).unwrap_or(&no_errors);
        let nested = match (field.nested_block(), self.nested) {
            (Some(block), Some(source)) => source
                .nested_form(block, &self.values.nested(name), nested_errors, &id)
                .map(Box::new),
            _ => None,
        };

        Some(FieldWidget {
            name: field.name.clone(),
            id,
            kind: field.kind.clone(),
            required: field.required,
            help_text: field.help_text.clone(),
            value,
            errors: self.errors.messages(name).to_vec(),
            nested_error_count: nested_errors.total(),
            nested,
        })
    }

    /// Submitted value of a field, else its default.
    fn bound_value(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).cloned().or_else(|| {
            self.definition
                .field(name)
                .and_then(|field| field.default.clone())
        })
    }

    fn bound_values(&self, group: &Group) -> FieldValues {
        let mut bound = FieldValues::new();
        for name in group.immediate_fields() {
            if let Some(value) = self.bound_value(name) {
                bound.insert(name, value);
            }
        }
        bound
    }

    fn unplaced_errors(&self, root: &FormSection) -> Vec<UnplacedError> {
        let shown: Vec<&str> = root.widgets().into_iter().map(|w| w.name.as_str()).collect();
        self.errors
            .field_names()
            .into_iter()
            .filter(|name| !shown.contains(name))
            .map(|name| {
                let count = self.errors.error_count(name);
                warn!(
                    "block '{}': {} error(s) for '{}', which has no widget in the layout",
                    self.definition.name, count, name
                );
                UnplacedError {
                    field: name.to_string(),
                    messages: self.errors.messages(name).to_vec(),
                    count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockform::field::Field;
    use blockform::layout::label_format::LabelFormat;

    fn simple_reorder() -> BlockDefinition {
        BlockDefinition::new("simple_reorder")
            .with_icon("user")
            .with_fields([
                Field::new("first_name", FieldKind::Char),
                Field::new("surname", FieldKind::Char),
                Field::new("photo", FieldKind::Image).optional(),
                Field::new("biography", FieldKind::RichText),
            ])
            .unwrap()
    }

    #[test]
    fn groups_become_sections_in_layout_order() {
        let def = simple_reorder();
        let layout = Layout::Flat(vec![
            "photo".into(),
            Group::with_children(["first_name", "surname"])
                .heading("Name")
                .into(),
            "biography".into(),
        ]);
        let tree = render_form(&def, &layout, &FieldValues::new(), &FieldErrors::new());

        let top: Vec<&str> = tree.root.children.iter().map(FormNode::describe).collect();
        assert_eq!(top, vec!["photo", "Name", "biography"]);
        let name = tree.root.children[1].as_section().unwrap();
        let inner: Vec<&str> = name.children.iter().map(FormNode::describe).collect();
        assert_eq!(inner, vec!["first_name", "surname"]);
        assert!(name.open && !name.collapsed);
        assert!(tree.root.settings.is_empty());
        assert_eq!(tree.widget("photo").unwrap().id, "simple_reorder-photo");
    }

    #[test]
    fn errors_in_nested_settings_flag_every_ancestor() {
        let def = BlockDefinition::new("person")
            .with_fields([
                Field::new("first_name", FieldKind::Char),
                Field::new("available", FieldKind::Boolean),
                Field::new("email", FieldKind::Email),
                Field::new("theme", FieldKind::Char).optional(),
            ])
            .unwrap();
        let layout = Layout::Root(
            Group::with_children(["first_name"]).settings([
                LayoutNode::from(
                    Group::with_children(["available"])
                        .settings(["email"])
                        .heading("Contact & Visibility")
                        .classname("collapsed"),
                ),
                LayoutNode::from("theme"),
            ]),
        );
        let errors = FieldErrors::new().with("email", "This field is required.");
        let tree = render_form(&def, &layout, &FieldValues::new(), &errors);

        assert_eq!(tree.error_count(), 1);
        assert_eq!(tree.root.settings_error_count, 1);
        assert!(tree.root.settings_open);

        let contact = tree.section("Contact & Visibility").unwrap();
        assert!(contact.collapsed);
        assert!(contact.open);
        assert_eq!(contact.error_count, 1);
        assert_eq!(contact.settings_error_count, 1);
        assert_eq!(tree.flagged_sections(), vec!["Contact & Visibility"]);
        assert_eq!(tree.widget("email").unwrap().errors, vec!["This field is required."]);
    }

    #[test]
    fn collapsed_section_without_errors_stays_closed() {
        let def = simple_reorder();
        let layout = Layout::Root(Group::with_children([
            LayoutNode::from("photo"),
            Group::with_children(["first_name", "surname", "biography"])
                .classname("collapsed")
                .heading("Rest")
                .into(),
        ]));
        let tree = render_form(&def, &layout, &FieldValues::new(), &FieldErrors::new());
        let rest = tree.section("Rest").unwrap();
        assert!(rest.collapsed && !rest.open);
        assert!(!tree.root.settings_open);
    }

    #[test]
    fn label_format_uses_bound_values_and_defaults() {
        let def = BlockDefinition::new("person")
            .with_fields([
                Field::new("first_name", FieldKind::Char),
                Field::new("surname", FieldKind::Char).with_default(FieldValue::text("Doe")),
            ])
            .unwrap();
        let layout = Layout::Flat(vec![
            Group::with_children(["surname", "first_name"])
                .heading("Basic info")
                .label_format(LabelFormat::parse("{first_name} {surname}").unwrap())
                .into(),
        ]);

        let values = FieldValues::new().with("first_name", FieldValue::text("Jane"));
        let tree = render_form(&def, &layout, &values, &FieldErrors::new());
        assert_eq!(tree.section("Basic info").unwrap().title(), Some("Jane Doe"));
        assert_eq!(tree.widget("surname").unwrap().value, FieldValue::text("Doe"));

        let tree = render_form(&def, &layout, &FieldValues::new(), &FieldErrors::new());
        assert_eq!(tree.section("Basic info").unwrap().title(), Some("Doe"));

        let blank = FieldValues::new().with("surname", FieldValue::text(""));
        let tree = render_form(&def, &layout, &blank, &FieldErrors::new());
        assert_eq!(tree.section("Basic info").unwrap().title(), Some("Basic info"));
    }

    #[test]
    fn errors_for_fields_without_widgets_are_counted_at_the_root() {
        let def = BlockDefinition::new("b")
            .with_fields([Field::new("a", FieldKind::Char)])
            .unwrap();
        let layout = Layout::Flat(vec![Group::with_children(["a"]).heading("A").into()]);
        let mut nested = FieldErrors::new();
        nested.add("x", "Enter a whole number.");
        let mut errors = FieldErrors::new().with("ghost", "Unexpected value.");
        errors.add_nested("phantom", nested);
        let tree = render_form(&def, &layout, &FieldValues::new(), &errors);

        assert_eq!(tree.error_count(), errors.total());
        assert_eq!(tree.error_count(), 2);
        assert!(tree.root.has_errors());
        assert!(tree.flagged_sections().is_empty());
        assert_eq!(
            tree.unplaced_errors,
            vec![
                UnplacedError {
                    field: "ghost".into(),
                    messages: vec!["Unexpected value.".into()],
                    count: 1,
                },
                UnplacedError {
                    field: "phantom".into(),
                    messages: Vec::new(),
                    count: 1,
                },
            ]
        );
    }
}
