pub mod attrs;
pub mod label_format;
pub mod path;

use std::ops::Range;

use crate::layout::attrs::Attrs;
use crate::layout::label_format::LabelFormat;
use crate::layout::path::Area;

/// A reference to a field by name, placed somewhere in a layout.
#[derive(Debug, Clone)]
pub struct FieldRef {
    pub name: String,
    /// Byte span in the declaration source, when parsed from one.
    pub span: Option<Range<usize>>,
}

impl FieldRef {
    pub fn new(name: impl Into<String>) -> Self {
        FieldRef {
            name: name.into(),
            span: None,
        }
    }
}

// Spans are provenance only; two references to the same field are equal.
impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FieldRef {}

/// A node of the layout tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Field(FieldRef),
    Group(Group),
}

impl LayoutNode {
    pub fn field(name: impl Into<String>) -> Self {
        LayoutNode::Field(FieldRef::new(name))
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            LayoutNode::Field(field) => Some(&field.name),
            LayoutNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            LayoutNode::Group(group) => Some(group),
            LayoutNode::Field(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            LayoutNode::Group(group) => Some(group),
            LayoutNode::Field(_) => None,
        }
    }

    pub fn span(&self) -> Option<&Range<usize>> {
        match self {
            LayoutNode::Field(field) => field.span.as_ref(),
            LayoutNode::Group(group) => group.span.as_ref(),
        }
    }

    /// Number of nodes in this subtree, counting this one.
    pub fn node_count(&self) -> usize {
        match self {
            LayoutNode::Field(_) => 1,
            LayoutNode::Group(group) => 1 + group.descendant_count(),
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LayoutNode::Field(field) => out.push(&field.name),
            LayoutNode::Group(group) => group.collect_leaves(out),
        }
    }
}

impl From<&str> for LayoutNode {
    fn from(name: &str) -> Self {
        LayoutNode::field(name)
    }
}

impl From<String> for LayoutNode {
    fn from(name: String) -> Self {
        LayoutNode::field(name)
    }
}

impl From<FieldRef> for LayoutNode {
    fn from(field: FieldRef) -> Self {
        LayoutNode::Field(field)
    }
}

impl From<Group> for LayoutNode {
    fn from(group: Group) -> Self {
        LayoutNode::Group(group)
    }
}

/// A visual grouping of fields and sub-groups within a block form.
/// `settings` holds nodes rendered in the secondary settings area.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub heading: Option<String>,
    pub icon: Option<String>,
    /// Space-separated display classes, e.g. "collapsed".
    pub classname: Option<String>,
    pub help_text: Option<String>,
    pub attrs: Attrs,
    pub label_format: Option<LabelFormat>,
    pub children: Vec<LayoutNode>,
    pub settings: Vec<LayoutNode>,
    pub span: Option<Range<usize>>,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.heading == other.heading
            && self.icon == other.icon
            && self.classname == other.classname
            && self.help_text == other.help_text
            && self.attrs == other.attrs
            && self.label_format == other.label_format
            && self.children == other.children
            && self.settings == other.settings
    }
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<LayoutNode>,
    {
        Group {
            children: children.into_iter().map(Into::into).collect(),
            ..Group::default()
        }
    }

    pub fn settings<I, N>(mut self, settings: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<LayoutNode>,
    {
        self.settings = settings.into_iter().map(Into::into).collect();
        self
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn classname(mut self, classname: impl Into<String>) -> Self {
        self.classname = Some(classname.into());
        self
    }

    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key, value);
        self
    }

    pub fn label_format(mut self, format: LabelFormat) -> Self {
        self.label_format = Some(format);
        self
    }

    pub fn nodes(&self, area: Area) -> &[LayoutNode] {
        match area {
            Area::Children => &self.children,
            Area::Settings => &self.settings,
        }
    }

    pub fn nodes_mut(&mut self, area: Area) -> &mut Vec<LayoutNode> {
        match area {
            Area::Children => &mut self.children,
            Area::Settings => &mut self.settings,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.classname
            .as_deref()
            .is_some_and(|c| c.split_whitespace().any(|class| class == "collapsed"))
    }

    /// Field names placed directly in this group (children, then settings).
    pub fn immediate_fields(&self) -> Vec<&str> {
        self.children
            .iter()
            .chain(self.settings.iter())
            .filter_map(LayoutNode::field_name)
            .collect()
    }

    /// Every field name in this subtree, in render order:
    /// children first, then settings, depth-first.
    pub fn leaf_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .chain(self.settings.iter())
            .map(LayoutNode::node_count)
            .sum()
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        for node in self.children.iter().chain(self.settings.iter()) {
            node.collect_leaves(out);
        }
    }
}

/// How a block's fields map onto groups.
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    /// A single root group, which may have settings.
    Root(Group),
    /// A flat sequence treated as an implicit root group with no settings.
    Flat(Vec<LayoutNode>),
}

impl Layout {
    /// Normalize to a root group.
    pub fn into_root(self) -> Group {
        match self {
            Layout::Root(group) => group,
            Layout::Flat(children) => Group {
                children,
                ..Group::default()
            },
        }
    }

    pub fn to_root(&self) -> Group {
        self.clone().into_root()
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            Layout::Root(group) => &group.children,
            Layout::Flat(children) => children,
        }
    }

    pub fn settings(&self) -> &[LayoutNode] {
        match self {
            Layout::Root(group) => &group.settings,
            Layout::Flat(_) => &[],
        }
    }

    pub fn leaf_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for node in self.children().iter().chain(self.settings().iter()) {
            node.collect_leaves(&mut out);
        }
        out
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        self.children()
            .iter()
            .chain(self.settings().iter())
            .map(LayoutNode::node_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_like() -> Layout {
        Layout::Root(
            Group::with_children([
                LayoutNode::from("photo"),
                Group::with_children(["surname", "first_name"])
                    .heading("Basic info")
                    .into(),
            ])
            .settings([
                LayoutNode::from(
                    Group::with_children(["available"])
                        .settings(["email"])
                        .heading("Contact"),
                ),
                LayoutNode::from("theme"),
            ]),
        )
    }

    #[test]
    fn leaf_names_visit_children_before_settings() {
        assert_eq!(
            person_like().leaf_names(),
            vec!["photo", "surname", "first_name", "available", "email", "theme"]
        );
    }

    #[test]
    fn flat_layout_normalizes_to_settingless_root() {
        let flat = Layout::Flat(vec!["a".into(), "b".into()]);
        let root = flat.to_root();
        assert_eq!(root.children.len(), 2);
        assert!(root.settings.is_empty());
        assert!(root.heading.is_none());
    }

    #[test]
    fn collapsed_is_a_class_token() {
        assert!(Group::new().classname("wide collapsed").is_collapsed());
        assert!(!Group::new().classname("uncollapsed").is_collapsed());
        assert!(!Group::new().is_collapsed());
    }

    #[test]
    fn spans_do_not_affect_equality() {
        let mut parsed = FieldRef::new("photo");
        parsed.span = Some(10..17);
        assert_eq!(LayoutNode::Field(parsed), LayoutNode::from("photo"));
    }

    #[test]
    fn node_count_includes_nested_groups() {
        // photo, Basic info (+2), Contact (+2), theme
        assert_eq!(person_like().node_count(), 8);
    }
}
