//! Worksheet and index inheritance from enclosing containers.

use sheetsync_parse::{Binding, IndexSpecifier};

use crate::host::SceneTree;

/// Resolve the binding of `node`, filling an unset worksheet or index from
/// the closest ancestor that names one.
///
/// The two fields are inherited independently. The walk stops after the
/// first page-like ancestor, which is consulted last, or after `max_depth`
/// steps. Returns `None` when the node no longer exists.
pub fn resolve<T, F>(
    tree: &T,
    node: T::NodeId,
    mut parse_fn: F,
    max_depth: usize,
) -> Option<Binding>
where
    T: SceneTree + ?Sized,
    F: FnMut(&str) -> Binding,
{
    let own = parse_fn(tree.name(node)?);
    let mut worksheet = own.worksheet().map(str::to_string);
    let mut index: Option<IndexSpecifier> = own.index();

    let mut current = tree.parent(node);
    let mut depth = 0;
    while let Some(ancestor) = current {
        if worksheet.is_some() && index.is_some() {
            break;
        }
        if depth >= max_depth {
            tracing::warn!(?node, max_depth, "ancestor walk exceeded max depth");
            break;
        }
        depth += 1;

        if let Some(name) = tree.name(ancestor) {
            let inherited = parse_fn(name);
            if worksheet.is_none() {
                worksheet = inherited.worksheet().map(str::to_string);
            }
            if index.is_none() {
                index = inherited.index();
            }
        }
        if tree.kind(ancestor).is_page_like() {
            break;
        }
        current = tree.parent(ancestor);
    }

    Some(own.inherit(worksheet.as_deref(), index))
}
