use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sheetsync_engine::repeat::expand;
use sheetsync_engine::{Expansion, RepeatError, SceneTree, Scope, SyncEngine};
use sheetsync_testkit::{MemoryDocument, NodeId, sheet, table};

/// Page with an auto-layout container holding `count` copies of `#Name`.
fn list(count: usize) -> (MemoryDocument, NodeId) {
    let mut doc = MemoryDocument::new();
    let page = doc.add_page("Page 1");
    let container = doc.add_auto_layout(page, "@List");
    for _ in 0..count {
        doc.add_text(container, "#Name");
    }
    (doc, container)
}

#[test]
fn grows_by_cloning_the_template() {
    let (mut doc, container) = list(3);
    let before = doc.children(container);

    let expansion = expand(&mut doc, container, 7).unwrap();

    assert_eq!(expansion, Expansion { added: 4, removed: 0 });
    let after = doc.children(container);
    assert_eq!(after.len(), 7);
    assert_eq!(after[..3], before[..]);
    assert!(after.iter().all(|&id| doc.name(id) == Some("#Name")));
}

#[test]
fn shrinks_from_the_tail_and_keeps_the_template() {
    let (mut doc, container) = list(3);
    let before = doc.children(container);

    let expansion = expand(&mut doc, container, 1).unwrap();

    assert_eq!(expansion, Expansion { added: 0, removed: 2 });
    assert_eq!(doc.children(container), [before[0]]);
    assert!(!doc.is_alive(before[1]));
    assert!(!doc.is_alive(before[2]));
}

#[test]
fn template_survives_a_zero_target() {
    let (mut doc, container) = list(2);
    let template = doc.children(container)[0];

    let expansion = expand(&mut doc, container, 0).unwrap();

    assert_eq!(expansion.removed, 1);
    assert_eq!(doc.children(container), [template]);
}

#[test]
fn matching_count_is_a_noop() {
    let (mut doc, container) = list(3);
    assert!(expand(&mut doc, container, 3).unwrap().is_noop());
}

#[test]
fn preconditions_are_checked_before_mutating() {
    let mut doc = MemoryDocument::new();
    let page = doc.add_page("Page 1");
    let empty = doc.add_auto_layout(page, "@Empty");
    let manual = doc.add_frame(page, "@Manual");
    doc.add_text(manual, "#Name");

    assert_eq!(expand(&mut doc, empty, 3), Err(RepeatError::NoTemplate));
    assert_eq!(expand(&mut doc, manual, 3), Err(RepeatError::NoAutoLayout));
    assert_eq!(doc.children(manual).len(), 1);
}

#[test]
fn failed_growth_is_rolled_back() {
    let (mut doc, container) = list(3);
    let before = doc.children(container);
    doc.fail_duplicate_after(2);

    let err = expand(&mut doc, container, 7).unwrap_err();

    assert!(matches!(err, RepeatError::RolledBack(_)));
    assert_eq!(doc.children(container), before);
}

#[test]
fn failed_shrink_restores_the_count() {
    let (mut doc, container) = list(4);
    let template = doc.children(container)[0];
    doc.fail_remove_after(1);

    let err = expand(&mut doc, container, 1).unwrap_err();

    assert!(matches!(err, RepeatError::RolledBack(_)));
    let after = doc.children(container);
    assert_eq!(after.len(), 4);
    assert_eq!(after[0], template);
}

#[test]
fn failed_rollback_is_reported() {
    let (mut doc, container) = list(1);
    doc.fail_duplicate_after(2);
    doc.fail_remove_after(0);

    let err = expand(&mut doc, container, 5).unwrap_err();

    assert!(matches!(err, RepeatError::RollbackFailed(_)));
}

#[test]
fn sync_expands_to_the_label_row_count() {
    let (mut doc, container) = list(3);
    let mut data = table(vec![sheet(
        "Sheet1",
        &[("Name", &["a", "b", "c", "d", "e", "f", "g", "", ""])],
    )]);

    let result = SyncEngine::new(&mut doc).run(&mut data, &Scope::Document);

    assert!(result.success);
    assert!(!result.has_errors(), "{:?}", result.errors);
    let children = doc.children(container);
    assert_eq!(children.len(), 7);
    let texts: Vec<&str> = children.iter().map(|&id| doc.text(id)).collect();
    assert_eq!(texts, ["a", "b", "c", "d", "e", "f", "g"]);
    assert_eq!(result.layers_processed, 7);
}

#[test]
fn sync_shrinks_and_binds_the_template() {
    let (mut doc, container) = list(3);
    let template = doc.children(container)[0];
    let mut data = table(vec![sheet("Sheet1", &[("Name", &["only"])])]);

    let result = SyncEngine::new(&mut doc).run(&mut data, &Scope::Document);

    assert_eq!(doc.children(container), [template]);
    assert_eq!(doc.text(template), "only");
    assert_eq!(result.layers_processed, 1);
}

#[test]
fn repeat_uses_the_worksheet_of_its_bound_descendant() {
    let mut doc = MemoryDocument::new();
    let page = doc.add_page("Page 1");
    let container = doc.add_auto_layout(page, "@Team // People");
    let card = doc.add_frame(container, "Card");
    doc.add_text(card, "Avatar");
    doc.add_text(card, "#Name");
    let mut data = table(vec![
        sheet("Sheet1", &[("Name", &["x"])]),
        sheet("People", &[("Name", &["p1", "p2"])]),
    ]);

    SyncEngine::new(&mut doc).run(&mut data, &Scope::Document);

    let cards = doc.children(container);
    assert_eq!(cards.len(), 2);
    let texts: Vec<&str> = cards
        .iter()
        .map(|&card| doc.text(doc.children(card)[1]))
        .collect();
    assert_eq!(texts, ["p1", "p2"]);
}

#[test]
fn nested_repeat_copies_are_expanded() {
    let mut doc = MemoryDocument::new();
    let page = doc.add_page("Page 1");
    let rows = doc.add_auto_layout(page, "@Rows");
    let row = doc.add_auto_layout(rows, "@Row");
    doc.add_text(row, "#Cell");
    let mut data = table(vec![sheet("Sheet1", &[("Cell", &["a", "b", "c"])])]);

    let result = SyncEngine::new(&mut doc).run(&mut data, &Scope::Document);

    assert!(!result.has_errors(), "{:?}", result.errors);
    let expanded = doc.children(rows);
    assert_eq!(expanded.len(), 3);
    for row in expanded {
        assert_eq!(doc.children(row).len(), 3);
    }
    assert_eq!(result.layers_processed, 9);
}

#[test]
fn containers_without_layout_only_warn() {
    let mut doc = MemoryDocument::new();
    let page = doc.add_page("Page 1");
    let container = doc.add_frame(page, "@List");
    doc.add_text(container, "#Name");
    let mut data = table(vec![sheet("Sheet1", &[("Name", &["a", "b", "c"])])]);

    let result = SyncEngine::new(&mut doc).run(&mut data, &Scope::Document);

    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("auto layout"));
    assert_eq!(doc.children(container).len(), 1);
    assert_eq!(result.layers_processed, 1);
}

#[test]
fn failed_expansion_is_a_layer_error() {
    let (mut doc, container) = list(2);
    doc.fail_duplicate_after(1);
    let mut data = table(vec![sheet("Sheet1", &[("Name", &["a", "b", "c", "d"])])]);

    let result = SyncEngine::new(&mut doc).run(&mut data, &Scope::Document);

    assert!(result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].layer.starts_with("@List"));
    assert!(result.errors[0].message.contains("rolled back"));
    assert_eq!(doc.children(container).len(), 2);
    assert_eq!(result.layers_processed, 2);
}

#[test]
fn cancellation_before_expansion_leaves_containers_alone() {
    let (mut doc, container) = list(1);
    let mut data = table(vec![sheet("Sheet1", &[("Name", &["a", "b", "c"])])]);
    let flag = Arc::new(AtomicBool::new(false));
    let trigger = Arc::clone(&flag);

    let result = SyncEngine::new(&mut doc)
        .with_cancellation(flag)
        .with_progress(move |message: &str, _percent: u8| {
            if message == "Expanding repeats" {
                trigger.store(true, Ordering::Relaxed);
            }
        })
        .run(&mut data, &Scope::Document);

    assert!(!result.success);
    assert!(result.cancelled);
    assert_eq!(result.layers_processed, 0);
    assert_eq!(doc.children(container).len(), 1);
    assert!(doc.log().is_empty());
}
