use proptest::prelude::*;
use sheetsync_engine::{IndexTracker, LabelIndex, match_label, normalize};
use sheetsync_parse::IndexSpecifier;

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn loose_label_lookup() {
    let available = labels(&["First Name", "Email"]);
    assert_eq!(match_label("FIRST NAME", &available), Some("First Name"));
    assert_eq!(match_label("first-name", &available), Some("First Name"));
    assert_eq!(match_label("nope", &available), None);
}

#[test]
fn index_reports_sheet_positions() {
    let index = LabelIndex::new(["Title", "Subtitle", "Body"]);
    assert_eq!(index.position("title"), Some(0));
    assert_eq!(index.position("sub title"), Some(1));
    assert_eq!(index.position("od"), Some(2));
    assert!(!index.is_empty());
}

fn label_names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[A-Za-z][A-Za-z0-9 _-]{0,12}", 1..8)
}

proptest! {
    #[test]
    fn normalize_is_idempotent(s in "\\PC{0,48}") {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.contains(char::is_whitespace));
        prop_assert!(!once.contains(['_', '-']));
    }

    #[test]
    fn every_label_finds_itself(raw in label_names()) {
        let index = LabelIndex::new(&raw);
        for label in &raw {
            let found = index.find(label);
            prop_assert!(found.is_some());
            prop_assert_eq!(normalize(found.unwrap_or_default()), normalize(label));
        }
    }
}

proptest! {
    #[test]
    fn random_draws_cycle_through_every_row(len in 1usize..24, seed in any::<u64>()) {
        let values: Vec<String> = (0..len).map(|i| format!("row {i}")).collect();
        let mut tracker = IndexTracker::new(seed);
        let mut cycle: Vec<usize> = (0..len)
            .filter_map(|_| tracker.next("Name", "Sheet1", IndexSpecifier::Random, &values))
            .collect();
        cycle.sort_unstable();
        prop_assert_eq!(cycle, (0..len).collect::<Vec<_>>());
        let next = tracker.next("Name", "Sheet1", IndexSpecifier::Random, &values);
        prop_assert!(next.is_some_and(|row| row < len));
    }

    #[test]
    fn specific_rows_are_clamped(n in 1u32..1000, len in 1usize..50) {
        let values = vec![String::from("v"); len];
        let mut tracker = IndexTracker::new(0);
        let row = tracker.next("Name", "Sheet1", IndexSpecifier::Specific(n), &values);
        prop_assert_eq!(row, Some((n as usize - 1).min(len - 1)));
    }
}
