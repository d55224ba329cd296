//! Meta crate re-exporting the sheetsync building blocks. Depend on this
//! crate and pick layers with feature flags, or reach for the individual
//! crates when only one piece is needed.

#[cfg(feature = "common")]
pub use sheetsync_common as common;

#[cfg(feature = "parse")]
pub use sheetsync_parse as parse;

#[cfg(feature = "engine")]
pub use sheetsync_engine as engine;

#[cfg(feature = "common")]
pub use sheetsync_common::{Orientation, Rgb, Table, TableError, Worksheet};

#[cfg(feature = "parse")]
pub use sheetsync_parse::{Binding, IndexSpecifier, SpecialValue, parse_chained};

#[cfg(feature = "engine")]
pub use sheetsync_engine::{
    NodeKind, NodeMutator, SceneTree, Scope, SyncEngine, SyncError, SyncOptions, SyncResult,
};
