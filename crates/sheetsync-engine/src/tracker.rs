//! Row selection state for one sync run.
//!
//! Each `(label, worksheet, mode)` key owns its own cursor and random
//! history, so `#Name.n` and `#Name.x` on neighbouring layers never disturb
//! each other. `None` from [`IndexTracker::next`] means there is nothing to
//! show; callers skip the layer.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use sheetsync_common::is_blank;
use sheetsync_parse::IndexSpecifier;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TrackerKey {
    label: String,
    worksheet: String,
    mode: IndexSpecifier,
}

#[derive(Debug, Default)]
struct KeyState {
    cursor: usize,
    /// Rows already drawn in the current random cycle.
    history: FxHashSet<usize>,
}

pub struct IndexTracker {
    states: FxHashMap<TrackerKey, KeyState>,
    rng: SmallRng,
}

impl IndexTracker {
    pub fn new(seed: u64) -> Self {
        Self {
            states: FxHashMap::default(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Pick the zero-based row to read for `label` in `worksheet`.
    pub fn next(
        &mut self,
        label: &str,
        worksheet: &str,
        spec: IndexSpecifier,
        values: &[String],
    ) -> Option<usize> {
        let len = values.len();
        if len == 0 {
            return None;
        }
        match spec {
            IndexSpecifier::Specific(n) => Some((n as usize).saturating_sub(1).min(len - 1)),
            IndexSpecifier::Increment => {
                let state = self.state(label, worksheet, spec);
                let row = state.cursor % len;
                state.cursor = (row + 1) % len;
                Some(row)
            }
            IndexSpecifier::IncrementNonBlank => {
                let state = self.state(label, worksheet, spec);
                let start = state.cursor % len;
                let row = (start..len)
                    .chain(0..start)
                    .find(|&row| !is_blank(&values[row]))?;
                state.cursor = (row + 1) % len;
                Some(row)
            }
            IndexSpecifier::Random => {
                let eligible = (0..len).collect();
                self.draw(label, worksheet, spec, eligible)
            }
            IndexSpecifier::RandomNonBlank => {
                let eligible = (0..len).filter(|&row| !is_blank(&values[row])).collect();
                self.draw(label, worksheet, spec, eligible)
            }
        }
    }

    fn state(&mut self, label: &str, worksheet: &str, mode: IndexSpecifier) -> &mut KeyState {
        let key = TrackerKey {
            label: label.to_string(),
            worksheet: worksheet.to_string(),
            mode,
        };
        self.states.entry(key).or_default()
    }

    /// Uniform draw among `eligible` rows not yet seen in the current cycle.
    fn draw(
        &mut self,
        label: &str,
        worksheet: &str,
        mode: IndexSpecifier,
        eligible: Vec<usize>,
    ) -> Option<usize> {
        if eligible.is_empty() {
            return None;
        }
        let key = TrackerKey {
            label: label.to_string(),
            worksheet: worksheet.to_string(),
            mode,
        };
        let state = self.states.entry(key).or_default();
        let mut unseen: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|row| !state.history.contains(row))
            .collect();
        if unseen.is_empty() {
            state.history.clear();
            unseen = eligible;
        }
        let row = unseen[self.rng.gen_range(0..unseen.len())];
        state.history.insert(row);
        Some(row)
    }

    /// Number of keys touched so far.
    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }
}
