//! Label normalization and lookup.
//!
//! Labels requested by layer names rarely match the table headers byte for
//! byte (`#first_name` vs `First Name`). Both sides are normalized by
//! dropping whitespace, `_` and `-` and lowercasing. Lookup tries an exact
//! normalized match first and then falls back to the first label (in sheet
//! order) whose normalized form *contains* the request.
//!
//! The substring fallback is deliberately permissive: `#name` matches
//! `Full Name` when no `Name` column exists, and a short request can match
//! an unrelated longer label. Layers that need precision should spell the
//! label out.

use rustc_hash::FxHashMap;

pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized lookup over an ordered set of labels.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    originals: Vec<String>,
    normalized: Vec<String>,
    exact: FxHashMap<String, usize>,
}

impl LabelIndex {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for label in labels {
            let original = label.as_ref().to_string();
            let normalized = normalize(&original);
            let position = index.originals.len();
            index.exact.entry(normalized.clone()).or_insert(position);
            index.originals.push(original);
            index.normalized.push(normalized);
        }
        index
    }

    /// Position of the best match for `requested`.
    pub fn position(&self, requested: &str) -> Option<usize> {
        let needle = normalize(requested);
        if needle.is_empty() {
            return None;
        }
        if let Some(&position) = self.exact.get(&needle) {
            return Some(position);
        }
        self.normalized
            .iter()
            .position(|candidate| candidate.contains(&needle))
    }

    /// Original spelling of the best match for `requested`.
    pub fn find(&self, requested: &str) -> Option<&str> {
        self.position(requested)
            .map(|position| self.originals[position].as_str())
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// One-off match without keeping an index around.
pub fn match_label<'a>(requested: &str, available: &'a [String]) -> Option<&'a str> {
    LabelIndex::new(available)
        .position(requested)
        .map(|position| available[position].as_str())
}
