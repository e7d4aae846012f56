use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use toml::Spanned;

use crate::Catalog;
use crate::block::{BlockDefinition, DefinitionError, LayoutSource};
use crate::edit::LayoutEdit;
use crate::field::{Choice, Field, FieldKind};
use crate::layout::attrs::Attrs;
use crate::layout::label_format::LabelFormat;
use crate::layout::path::{Area, GroupPath};
use crate::layout::{FieldRef, Group, Layout, LayoutNode};
use crate::parser::error::ParseError;
use crate::parser::schema::{RawBlock, RawDocument, RawEdit, RawField, RawGroup, RawLayout, RawNode};
use crate::value::FieldValue;

const FIELD_TYPES: &str =
    "char, text, rich_text, choice, boolean, date, email, image, image_chooser, static, block";

const EDIT_OPS: &str =
    "append_child, insert_child, append_setting, insert_setting, append_root_group, remove_field";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Turn raw declarations into block definitions, collecting every error.
pub(crate) fn lower_document(
    document: RawDocument,
    file_id: usize,
) -> Result<Catalog, Vec<ParseError>> {
    let mut state = LowerState::new(file_id);
    for block in document.blocks {
        state.lower_block(block);
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Lowering state
// ---------------------------------------------------------------------------

struct LowerState {
    file_id: usize,
    catalog: Catalog,
    /// Span of the name of every block declared so far.
    declared: HashMap<String, Range<usize>>,
    errors: Vec<ParseError>,
}

impl LowerState {
    fn new(file_id: usize) -> Self {
        LowerState {
            file_id,
            catalog: Catalog::new(file_id),
            declared: HashMap::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Range<usize>) -> &mut ParseError {
        self.errors
            .push(ParseError::error(message, span, self.file_id));
        let last = self.errors.len() - 1;
        &mut self.errors[last]
    }

    fn finalize(self) -> Result<Catalog, Vec<ParseError>> {
        if self.errors.is_empty() {
            Ok(self.catalog)
        } else {
            Err(self.errors)
        }
    }

    // -----------------------------------------------------------------------
    // Blocks and fields
    // -----------------------------------------------------------------------

    fn lower_block(&mut self, raw: Spanned<RawBlock>) {
        let span = raw.span();
        let raw = raw.into_inner();
        let name_span = raw.name.span();
        let name = raw.name.into_inner();

        if let Some(first) = self.declared.get(&name).cloned() {
            let err = self.error(format!("block '{}' is declared more than once", name), name_span);
            err.secondary.push((first, "first declared here".to_string()));
            return;
        }

        let mut definition = match raw.extends {
            Some(parent) => {
                let parent_span = parent.span();
                let parent_name = parent.into_inner();
                match self.catalog.get(&parent_name) {
                    Some(parent) => BlockDefinition::extend(name.clone(), Arc::clone(parent)),
                    None => {
                        let err = self.error(
                            format!("block '{}' extends unknown block '{}'", name, parent_name),
                            parent_span,
                        );
                        err.notes
                            .push("a parent block must be declared before the blocks that extend it".into());
                        return;
                    }
                }
            }
            None => BlockDefinition::new(name.clone()),
        };
        definition.span = Some(span);
        if raw.icon.is_some() {
            definition.icon = raw.icon;
        }
        if raw.form_template.is_some() {
            definition.form_template = raw.form_template;
        }

        let mut field_spans: HashMap<String, Range<usize>> = HashMap::new();
        for field in raw.fields {
            let Some((field, field_span)) = self.lower_field(field.into_inner()) else {
                continue;
            };
            let field_name = field.name.clone();
            match definition.add_field(field) {
                Ok(()) => {
                    field_spans.insert(field_name, field_span);
                }
                Err(DefinitionError::DuplicateField { block, field }) => {
                    let first = field_spans.get(&field).cloned();
                    let err = self.error(
                        format!("block '{}' declares field '{}' more than once", block, field),
                        field_span,
                    );
                    if let Some(first) = first {
                        err.secondary.push((first, "first declared here".to_string()));
                    }
                }
            }
        }

        let has_parent = definition.parent().is_some();
        match (raw.layout, raw.edits.is_empty()) {
            (Some(layout), true) => {
                definition.layout = LayoutSource::Declared(self.lower_layout(layout));
            }
            (Some(layout), false) => {
                let err = self.error(
                    format!("block '{}' declares both a layout and layout edits", name),
                    layout.span(),
                );
                err.notes
                    .push("declare a full layout, or edit the parent's layout, not both".into());
            }
            (None, false) if !has_parent => {
                let span = raw.edits[0].span();
                let err = self.error(
                    format!("block '{}' edits a layout but does not extend a block", name),
                    span,
                );
                err.notes.push("add `extends = \"<parent>\"` to the block".into());
            }
            (None, false) => {
                let edits = raw
                    .edits
                    .into_iter()
                    .filter_map(|edit| self.lower_edit(edit))
                    .collect();
                definition.layout = LayoutSource::Derived(edits);
            }
            (None, true) => {}
        }

        self.declared.insert(name, name_span);
        self.catalog.push(definition);
    }

    fn lower_field(&mut self, raw: RawField) -> Option<(Field, Range<usize>)> {
        let name_span = raw.name.span();
        let name = raw.name.into_inner();
        let kind_span = raw.kind.span();
        let tag = raw.kind.into_inner();

        let kind = match tag.as_str() {
            "choice" => {
                if raw.choices.is_empty() {
                    self.error(format!("choice field '{}' has no choices", name), kind_span);
                    return None;
                }
                let choices = raw
                    .choices
                    .into_iter()
                    .map(|(value, label)| Choice::new(value, label))
                    .collect();
                FieldKind::Choice(choices)
            }
            "block" => {
                let Some(block) = raw.block else {
                    self.error(
                        format!("block field '{}' does not name a block", name),
                        kind_span,
                    );
                    return None;
                };
                let block_span = block.span();
                let block = block.into_inner();
                if !self.declared.contains_key(&block) {
                    let err = self.error(
                        format!("field '{}' uses unknown block '{}'", name, block),
                        block_span,
                    );
                    err.notes
                        .push("nested blocks must be declared before the blocks that use them".into());
                    return None;
                }
                FieldKind::Block(block)
            }
            other => match FieldKind::from_tag(other) {
                Some(kind) => {
                    if !raw.choices.is_empty() {
                        self.error(
                            format!("field '{}' is not a choice field but declares choices", name),
                            kind_span.clone(),
                        );
                    }
                    if let Some(block) = &raw.block {
                        self.error(
                            format!("field '{}' is not a block field but names a block", name),
                            block.span(),
                        );
                    }
                    kind
                }
                None => {
                    let err =
                        self.error(format!("unknown field type '{}'", other), kind_span);
                    err.notes.push(format!("expected one of: {}", FIELD_TYPES));
                    return None;
                }
            },
        };

        let mut field = Field::new(name, kind);
        if let Some(required) = raw.required {
            field.required = required;
        }
        field.help_text = raw.help_text;
        if let Some(default) = raw.default {
            let span = default.span();
            field.default = match default.into_inner() {
                toml::Value::String(s) => Some(FieldValue::Text(s)),
                toml::Value::Boolean(b) => Some(FieldValue::Bool(b)),
                toml::Value::Integer(n) => Some(FieldValue::Text(n.to_string())),
                toml::Value::Float(n) => Some(FieldValue::Text(n.to_string())),
                toml::Value::Datetime(d) => Some(FieldValue::Text(d.to_string())),
                _ => {
                    self.error("default must be a string, number, boolean or date", span);
                    None
                }
            };
        }
        Some((field, name_span))
    }

    // -----------------------------------------------------------------------
    // Layouts
    // -----------------------------------------------------------------------

    fn lower_layout(&mut self, raw: Spanned<RawLayout>) -> Layout {
        let span = raw.span();
        match raw.into_inner() {
            RawLayout::Flat(nodes) => {
                Layout::Flat(nodes.into_iter().map(|n| self.lower_spanned(n)).collect())
            }
            RawLayout::Root(group) => Layout::Root(self.lower_group(group, span)),
        }
    }

    fn lower_spanned(&mut self, raw: Spanned<RawNode>) -> LayoutNode {
        let span = raw.span();
        self.lower_node(raw.into_inner(), span)
    }

    fn lower_node(&mut self, raw: RawNode, span: Range<usize>) -> LayoutNode {
        match raw {
            RawNode::Field(name) => LayoutNode::Field(FieldRef {
                name,
                span: Some(span),
            }),
            RawNode::Group(group) => LayoutNode::Group(self.lower_group(group, span)),
        }
    }

    fn lower_group(&mut self, raw: RawGroup, span: Range<usize>) -> Group {
        let children = raw.children.into_iter().map(|n| self.lower_spanned(n)).collect();
        let settings = raw.settings.into_iter().map(|n| self.lower_spanned(n)).collect();

        let mut attrs = Attrs::new();
        if let Some(table) = raw.attrs {
            let attrs_span = table.span();
            for (key, value) in table.into_inner() {
                match value {
                    toml::Value::String(s) => attrs.insert(key, s),
                    toml::Value::Boolean(b) => attrs.insert(key, b.to_string()),
                    toml::Value::Integer(n) => attrs.insert(key, n.to_string()),
                    other => {
                        self.error(
                            format!(
                                "attribute '{}' must be a string, number or boolean, not {}",
                                key,
                                other.type_str()
                            ),
                            attrs_span.clone(),
                        );
                    }
                }
            }
        }

        let label_format = raw.label_format.and_then(|format| {
            let format_span = format.span();
            match LabelFormat::parse(format.get_ref()) {
                Ok(format) => Some(format),
                Err(e) => {
                    // +1 skips the opening quote
                    let at = format_span.start + 1 + e.offset();
                    self.error(format!("invalid label_format: {}", e), at..at + 1);
                    None
                }
            }
        });

        Group {
            heading: raw.heading,
            icon: raw.icon,
            classname: raw.classname,
            help_text: raw.help_text,
            attrs,
            label_format,
            children,
            settings,
            span: Some(span),
        }
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    fn lower_edit(&mut self, raw: Spanned<RawEdit>) -> Option<LayoutEdit> {
        let span = raw.span();
        let raw = raw.into_inner();
        let op_span = raw.op.span();
        let op = raw.op.into_inner();

        let group = match raw.group {
            Some(steps) => self.lower_group_path(steps)?,
            None => GroupPath::root(),
        };

        let node = match (raw.field, raw.node) {
            (Some(field), None) => Some(LayoutNode::field(field)),
            (None, Some(node)) => Some(self.lower_node(node, span.clone())),
            (None, None) => None,
            (Some(_), Some(_)) => {
                self.error("an edit takes either `field` or `node`, not both", span);
                return None;
            }
        };

        let needs_node = |state: &mut LowerState, node: Option<LayoutNode>| {
            if node.is_none() {
                state.error(format!("edit '{}' needs a `field` or `node`", op), span.clone());
            }
            node
        };
        let needs_index = |state: &mut LowerState, index: Option<usize>| {
            if index.is_none() {
                state.error(format!("edit '{}' needs an `index`", op), span.clone());
            }
            index
        };

        let edit = match op.as_str() {
            "append_child" => LayoutEdit::AppendChild {
                group,
                node: needs_node(self, node)?,
            },
            "insert_child" => LayoutEdit::InsertChild {
                group,
                index: needs_index(self, raw.index)?,
                node: needs_node(self, node)?,
            },
            "append_setting" => LayoutEdit::AppendSetting {
                group,
                node: needs_node(self, node)?,
            },
            "insert_setting" => LayoutEdit::InsertSetting {
                group,
                index: needs_index(self, raw.index)?,
                node: needs_node(self, node)?,
            },
            "append_root_group" => match needs_node(self, node)? {
                LayoutNode::Group(group) => LayoutEdit::AppendRootGroup(group),
                LayoutNode::Field(_) => {
                    self.error("append_root_group needs a group `node`", span.clone());
                    return None;
                }
            },
            "remove_field" => match node {
                Some(LayoutNode::Field(field)) => LayoutEdit::RemoveField(field.name),
                _ => {
                    self.error("remove_field needs a `field`", span.clone());
                    return None;
                }
            },
            other => {
                let err = self.error(format!("unknown edit '{}'", other), op_span);
                err.notes.push(format!("expected one of: {}", EDIT_OPS));
                return None;
            }
        };
        Some(edit)
    }

    /// `[1, "s0"]` is children[1], then settings[0]. `"c2"` is children[2].
    fn lower_group_path(&mut self, raw: Spanned<Vec<toml::Value>>) -> Option<GroupPath> {
        let span = raw.span();
        let mut path = GroupPath::root();
        for step in raw.into_inner() {
            let parsed = match &step {
                toml::Value::Integer(n) => usize::try_from(*n).ok().map(|i| (Area::Children, i)),
                toml::Value::String(s) => {
                    let (area, digits) = match s.split_at_checked(1) {
                        Some(("s", rest)) => (Area::Settings, rest),
                        Some(("c", rest)) => (Area::Children, rest),
                        _ => (Area::Children, s.as_str()),
                    };
                    digits.parse::<usize>().ok().map(|i| (area, i))
                }
                _ => None,
            };
            match parsed {
                Some(step) => path.steps.push(step),
                None => {
                    let err = self.error(format!("invalid group path step {}", step), span);
                    err.notes.push(
                        "use a child index (1), \"c1\" for children[1] or \"s1\" for settings[1]"
                            .into(),
                    );
                    return None;
                }
            }
        }
        Some(path)
    }
}
