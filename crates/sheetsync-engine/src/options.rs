use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables for one sync run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Seed for random row selection. Derived from the clock when `None`.
    pub seed: Option<u64>,
    /// Layers bound between two progress reports.
    pub batch_size: usize,
    /// Upper bound on ancestor walks, guarding against malformed trees.
    pub max_depth: usize,
    /// Bind layers inside main component definitions without a `+` prefix.
    pub include_component_definitions: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            seed: None,
            batch_size: 50,
            max_depth: 256,
            include_component_definitions: false,
        }
    }
}

impl SyncOptions {
    /// Options with a fixed random seed, so repeated runs pick the same rows.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub(crate) fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x5eed)
        })
    }
}
