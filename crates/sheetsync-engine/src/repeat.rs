//! Growing and shrinking repeat containers.
//!
//! A repeat container (`@` in its name) keeps its first child as the
//! template. Expansion appends copies of the template or removes children
//! from the tail until the child count matches the target. Either the whole
//! change lands or the container is put back to its previous child count.

use sheetsync_parse::Binding;

use crate::error::{MutationError, RepeatError};
use crate::host::{NodeMutator, SceneTree};

/// Children added or removed by one expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    pub added: usize,
    pub removed: usize,
}

impl Expansion {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Resize `container` to `target` children. `target` is clamped to 1 since
/// the template is never removed.
pub fn expand<D>(doc: &mut D, container: D::NodeId, target: usize) -> Result<Expansion, RepeatError>
where
    D: NodeMutator + ?Sized,
{
    let children = doc.children(container);
    let Some(&template) = children.first() else {
        return Err(RepeatError::NoTemplate);
    };
    if !doc.has_auto_layout(container) {
        return Err(RepeatError::NoAutoLayout);
    }

    let target = target.max(1);
    let current = children.len();
    if target > current {
        grow(doc, container, template, target - current)
    } else if target < current {
        shrink(doc, container, template, &children[target..])
    } else {
        Ok(Expansion::default())
    }
}

fn grow<D>(
    doc: &mut D,
    container: D::NodeId,
    template: D::NodeId,
    count: usize,
) -> Result<Expansion, RepeatError>
where
    D: NodeMutator + ?Sized,
{
    let mut added = Vec::with_capacity(count);
    for _ in 0..count {
        match doc.duplicate(container, template) {
            Ok(copy) => added.push(copy),
            Err(err) => {
                tracing::warn!(
                    ?container,
                    added = added.len(),
                    error = %err,
                    "rolling back repeat growth"
                );
                for copy in added.into_iter().rev() {
                    doc.remove(copy).map_err(RepeatError::RollbackFailed)?;
                }
                return Err(RepeatError::RolledBack(err));
            }
        }
    }
    Ok(Expansion {
        added: count,
        removed: 0,
    })
}

fn shrink<D>(
    doc: &mut D,
    container: D::NodeId,
    template: D::NodeId,
    surplus: &[D::NodeId],
) -> Result<Expansion, RepeatError>
where
    D: NodeMutator + ?Sized,
{
    let mut removed = 0;
    for &child in surplus.iter().rev() {
        if let Err(err) = doc.remove(child) {
            tracing::warn!(?container, removed, error = %err, "rolling back repeat shrink");
            restore(doc, container, template, removed).map_err(RepeatError::RollbackFailed)?;
            return Err(RepeatError::RolledBack(err));
        }
        removed += 1;
    }
    Ok(Expansion { added: 0, removed })
}

/// Removed children cannot be revived, so the count is restored with fresh
/// template copies.
fn restore<D>(
    doc: &mut D,
    container: D::NodeId,
    template: D::NodeId,
    count: usize,
) -> Result<(), MutationError>
where
    D: NodeMutator + ?Sized,
{
    for _ in 0..count {
        doc.duplicate(container, template)?;
    }
    Ok(())
}

/// First descendant of `container`, depth first, whose name carries a label.
/// Ignored subtrees are not searched.
pub fn first_bound_descendant<D, F>(
    doc: &D,
    container: D::NodeId,
    mut parse_fn: F,
) -> Option<D::NodeId>
where
    D: SceneTree + ?Sized,
    F: FnMut(&str) -> Binding,
{
    let mut stack: Vec<D::NodeId> = doc.children(container).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        let Some(name) = doc.name(node) else {
            continue;
        };
        let binding = parse_fn(name);
        if binding.is_ignored() {
            continue;
        }
        if binding.has_labels() {
            return Some(node);
        }
        stack.extend(doc.children(node).into_iter().rev());
    }
    None
}
