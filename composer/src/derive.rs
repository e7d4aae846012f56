use blockform::block::BlockDefinition;
use blockform::edit::LayoutEdit;
use blockform::layout::path::{Area, GroupPath};
use blockform::layout::{Group, Layout, LayoutNode};
use log::{debug, trace};

use crate::error::{ComposeError, EditError};
use crate::resolve::{check_unique, resolve_layout};

/// Derive a new layout from `parent`'s resolved layout by applying `edits` in order.
///
/// The parent's layout is resolved into an owned value and every edit consumes
/// and returns a layout, so nothing is shared with the parent's stored layout.
/// The at-most-once rule is re-checked after each edit.
pub fn derive_layout(parent: &BlockDefinition, edits: &[LayoutEdit]) -> Result<Layout, ComposeError> {
    derive_named(&parent.name, parent, edits)
}

/// As `derive_layout`, reporting errors against the derived block `block`.
pub(crate) fn derive_named(
    block: &str,
    parent: &BlockDefinition,
    edits: &[LayoutEdit],
) -> Result<Layout, ComposeError> {
    let base = resolve_layout(parent)?;
    debug!(
        "deriving layout of '{}' from '{}' with {} edit(s)",
        block,
        parent.name,
        edits.len()
    );

    let mut layout = Layout::Root(base.into_root());
    for (index, edit) in edits.iter().enumerate() {
        trace!("edit #{}: {}", index, edit);
        layout = apply_edit(layout, edit, index).map_err(|source| ComposeError::Edit {
            block: block.to_string(),
            source,
        })?;
        check_unique(block, &layout)?;
    }
    Ok(layout)
}

/// Apply one edit. `index` is the edit's position, used in error messages.
pub fn apply_edit(layout: Layout, edit: &LayoutEdit, index: usize) -> Result<Layout, EditError> {
    let mut root = layout.into_root();
    match edit {
        LayoutEdit::AppendChild { group, node } => {
            group_at(&mut root, group, index)?.children.push(node.clone());
        }
        LayoutEdit::InsertChild {
            group,
            index: at,
            node,
        } => insert_at(&mut root, group, Area::Children, *at, node, index)?,
        LayoutEdit::AppendSetting { group, node } => {
            group_at(&mut root, group, index)?.settings.push(node.clone());
        }
        LayoutEdit::InsertSetting {
            group,
            index: at,
            node,
        } => insert_at(&mut root, group, Area::Settings, *at, node, index)?,
        LayoutEdit::AppendRootGroup(group) => {
            root.children.push(LayoutNode::Group(group.clone()));
        }
        LayoutEdit::RemoveField(name) => {
            if !remove_field(&mut root, name) {
                return Err(EditError::FieldNotFound {
                    edit: index,
                    field: name.clone(),
                });
            }
        }
    }
    Ok(Layout::Root(root))
}

fn group_at<'a>(root: &'a mut Group, path: &GroupPath, edit: usize) -> Result<&'a mut Group, EditError> {
    let mut current = root;
    for &(area, i) in &path.steps {
        current = match current.nodes_mut(area).get_mut(i) {
            Some(LayoutNode::Group(group)) => group,
            _ => {
                return Err(EditError::NoSuchGroup {
                    edit,
                    path: path.clone(),
                });
            }
        };
    }
    Ok(current)
}

fn insert_at(
    root: &mut Group,
    path: &GroupPath,
    area: Area,
    at: usize,
    node: &LayoutNode,
    edit: usize,
) -> Result<(), EditError> {
    let nodes = group_at(root, path, edit)?.nodes_mut(area);
    if at > nodes.len() {
        return Err(EditError::IndexOutOfRange {
            edit,
            path: path.clone(),
            area,
            index: at,
            len: nodes.len(),
        });
    }
    nodes.insert(at, node.clone());
    Ok(())
}

fn remove_field(group: &mut Group, name: &str) -> bool {
    let mut removed = false;
    for area in [Area::Children, Area::Settings] {
        let nodes = group.nodes_mut(area);
        let before = nodes.len();
        nodes.retain(|n| n.field_name() != Some(name));
        removed |= nodes.len() != before;
        for node in nodes.iter_mut() {
            if let Some(inner) = node.as_group_mut() {
                removed |= remove_field(inner, name);
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use blockform::block::LayoutSource;
    use blockform::field::{Field, FieldKind};

    fn parent() -> Arc<BlockDefinition> {
        let def = BlockDefinition::new("person")
            .with_fields(
                ["photo", "surname", "first_name", "biography", "job_title", "theme"]
                    .into_iter()
                    .map(|n| Field::new(n, FieldKind::Char)),
            )
            .unwrap()
            .with_layout(Layout::Root(
                Group::with_children([
                    LayoutNode::from("photo"),
                    Group::with_children(["surname", "first_name"])
                        .heading("Basic info")
                        .into(),
                    Group::with_children(["biography"])
                        .settings(["job_title"])
                        .heading("Biography & Work")
                        .into(),
                ])
                .settings(["theme"]),
            ));
        Arc::new(def)
    }

    #[test]
    fn appends_into_nested_group_and_inserts_setting() {
        let parent = parent();
        let layout = derive_layout(
            &parent,
            &[
                LayoutEdit::append_child(GroupPath::root().child(1), "role"),
                LayoutEdit::insert_setting(GroupPath::root(), 0, "active_status"),
                LayoutEdit::insert_child(GroupPath::root().child(2), 0, "summary"),
            ],
        )
        .unwrap();

        let basic = layout.children()[1].as_group().unwrap();
        assert_eq!(basic.leaf_names(), vec!["surname", "first_name", "role"]);
        assert_eq!(layout.settings()[0], LayoutNode::from("active_status"));
        let bio = layout.children()[2].as_group().unwrap();
        assert_eq!(bio.children[0], LayoutNode::from("summary"));
    }

    #[test]
    fn parent_layout_is_untouched() {
        let parent = parent();
        let before = resolve_layout(&parent).unwrap();
        let mut derived = derive_layout(
            &parent,
            &[LayoutEdit::AppendRootGroup(
                Group::with_children(["start_date"]).heading("Employment Details"),
            )],
        )
        .unwrap();
        if let Layout::Root(root) = &mut derived {
            root.children[1]
                .as_group_mut()
                .unwrap()
                .children
                .push("mutated".into());
        }

        assert_eq!(resolve_layout(&parent).unwrap(), before);
        assert!(matches!(&parent.layout, LayoutSource::Declared(l) if *l == before));
    }

    #[test]
    fn bad_group_path_names_the_edit() {
        let err = derive_layout(
            &parent(),
            &[
                LayoutEdit::append_child(GroupPath::root(), "x"),
                LayoutEdit::append_child(GroupPath::root().child(0), "y"),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "block 'person': edit #1: no group at root.children[0]"
        );
    }

    #[test]
    fn insert_past_the_end_is_rejected() {
        let err = apply_edit(
            resolve_layout(&parent()).unwrap(),
            &LayoutEdit::insert_setting(GroupPath::root(), 5, "x"),
            0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EditError::IndexOutOfRange {
                edit: 0,
                path: GroupPath::root(),
                area: Area::Settings,
                index: 5,
                len: 1
            }
        );
    }

    #[test]
    fn duplicate_introduced_by_an_edit_fails_immediately() {
        let err = derive_layout(
            &parent(),
            &[LayoutEdit::append_setting(GroupPath::root().child(1), "theme")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Validation(crate::error::LayoutValidationError::DuplicateField { ref field, .. })
                if field == "theme"
        ));
    }

    #[test]
    fn appended_field_must_be_declared_by_the_subclass() {
        let child = BlockDefinition::extend("employee", parent())
            .with_fields([Field::new("role", FieldKind::Char)])
            .unwrap()
            .with_edits(vec![
                LayoutEdit::append_child(GroupPath::root(), "role"),
                LayoutEdit::append_child(GroupPath::root().child(1), "nickname"),
            ]);
        let err = resolve_layout(&child).unwrap_err();
        assert!(matches!(
            &err,
            ComposeError::Validation(crate::error::LayoutValidationError::UnknownField { block, field, .. })
                if block == "employee" && field == "nickname"
        ));
        assert_eq!(
            err.path().unwrap().to_string(),
            "root > children[1] \"Basic info\" > children[2]"
        );
    }

    #[test]
    fn remove_field_reaches_nested_settings() {
        let layout = apply_edit(
            resolve_layout(&parent()).unwrap(),
            &LayoutEdit::RemoveField("job_title".into()),
            0,
        )
        .unwrap();
        assert!(!layout.leaf_names().contains(&"job_title"));
        assert_eq!(
            apply_edit(layout, &LayoutEdit::RemoveField("job_title".into()), 1).unwrap_err(),
            EditError::FieldNotFound {
                edit: 1,
                field: "job_title".into()
            }
        );
    }

    #[test]
    fn flat_layout_gains_settings_when_edited() {
        let flat = Layout::Flat(vec!["a".into()]);
        let layout = apply_edit(flat, &LayoutEdit::append_setting(GroupPath::root(), "b"), 0).unwrap();
        assert!(matches!(layout, Layout::Root(_)));
        assert_eq!(layout.leaf_names(), vec!["a", "b"]);
    }
}
