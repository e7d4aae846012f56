use std::fmt;

use crate::layout::path::GroupPath;
use crate::layout::{Group, LayoutNode};

/// A structural change applied to a copy of a parent block's layout
/// when a child block derives its own.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEdit {
    /// Append to the `children` of the group at `group`.
    AppendChild { group: GroupPath, node: LayoutNode },
    /// Insert into the `children` of the group at `group`; `index` may equal the length.
    InsertChild {
        group: GroupPath,
        index: usize,
        node: LayoutNode,
    },
    AppendSetting { group: GroupPath, node: LayoutNode },
    InsertSetting {
        group: GroupPath,
        index: usize,
        node: LayoutNode,
    },
    /// Append a new group to the root's `children`.
    AppendRootGroup(Group),
    /// Drop every reference to a field, wherever it is.
    RemoveField(String),
}

impl LayoutEdit {
    pub fn append_child(group: GroupPath, node: impl Into<LayoutNode>) -> Self {
        LayoutEdit::AppendChild {
            group,
            node: node.into(),
        }
    }

    pub fn insert_child(group: GroupPath, index: usize, node: impl Into<LayoutNode>) -> Self {
        LayoutEdit::InsertChild {
            group,
            index,
            node: node.into(),
        }
    }

    pub fn append_setting(group: GroupPath, node: impl Into<LayoutNode>) -> Self {
        LayoutEdit::AppendSetting {
            group,
            node: node.into(),
        }
    }

    pub fn insert_setting(group: GroupPath, index: usize, node: impl Into<LayoutNode>) -> Self {
        LayoutEdit::InsertSetting {
            group,
            index,
            node: node.into(),
        }
    }
}

fn describe_node(node: &LayoutNode) -> String {
    match node {
        LayoutNode::Field(field) => format!("'{}'", field.name),
        LayoutNode::Group(group) => match &group.heading {
            Some(heading) => format!("group \"{}\"", heading),
            None => "group".to_string(),
        },
    }
}

impl fmt::Display for LayoutEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutEdit::AppendChild { group, node } => {
                write!(f, "append {} to {}.children", describe_node(node), group)
            }
            LayoutEdit::InsertChild { group, index, node } => write!(
                f,
                "insert {} at {}.children[{}]",
                describe_node(node),
                group,
                index
            ),
            LayoutEdit::AppendSetting { group, node } => {
                write!(f, "append {} to {}.settings", describe_node(node), group)
            }
            LayoutEdit::InsertSetting { group, index, node } => write!(
                f,
                "insert {} at {}.settings[{}]",
                describe_node(node),
                group,
                index
            ),
            LayoutEdit::AppendRootGroup(group) => match &group.heading {
                Some(heading) => write!(f, "append group \"{}\" to root.children", heading),
                None => write!(f, "append group to root.children"),
            },
            LayoutEdit::RemoveField(name) => write!(f, "remove '{}'", name),
        }
    }
}
