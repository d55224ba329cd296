//! Sync engine for pushing table data into a layer tree.
//!
//! A run walks the layers in a [`Scope`], reads the binding encoded in each
//! layer name, picks a row for every bound label and turns the cell value
//! into host mutations. The host document is reached only through the
//! traits in [`host`].
//!
//! Phases, in order:
//! 1. acquire the [`Table`](sheetsync_common::Table) from a [`TableSource`]
//! 2. index worksheet labels and swap-target components
//! 3. expand repeat containers ([`repeat`])
//! 4. re-walk the scope to collect bound layers
//! 5. resolve inheritance, select rows, dispatch values
//! 6. return a [`SyncResult`]

pub mod apply;
pub mod dispatch;
mod engine;
pub mod error;
pub mod host;
pub mod inherit;
pub mod matcher;
mod options;
pub mod repeat;
mod report;
pub mod tracker;

pub use engine::SyncEngine;
pub use error::{
    AcquireError, FetchError, FontError, MutationError, RepeatError, SetupError, SyncError,
};
pub use host::{
    FontId, FontLoader, ImageFetcher, Mutation, NoImages, NodeKind, NodeMutator, PreloadedFonts,
    ProgressSink, SceneTree, Scope, SilentProgress, TableSource, TextProperty,
};
pub use matcher::{LabelIndex, match_label, normalize};
pub use options::SyncOptions;
pub use repeat::Expansion;
pub use report::{LayerError, SyncResult};
pub use tracker::IndexTracker;
