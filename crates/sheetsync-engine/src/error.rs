use thiserror::Error;

use crate::host::{FontId, NodeKind};

/// The host refused or could not perform a change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("layer no longer exists")]
    NodeNotFound,
    #[error("operation is not supported on {0:?} layers")]
    Unsupported(NodeKind),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("font `{font}` could not be loaded: {reason}")]
pub struct FontError {
    pub font: FontId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to fetch image `{url}`: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct AcquireError(pub String);

/// Fatal errors that abort a run before any layer is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("could not load table data: {0}")]
    Acquire(#[from] AcquireError),
    #[error("table data contains no worksheets")]
    EmptyTable,
    #[error("active worksheet `{0}` is not part of the table")]
    UnknownActiveWorksheet(String),
}

/// Recoverable errors scoped to a single layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("worksheet `{0}` not found")]
    MissingWorksheet(String),
    #[error("label `{label}` not found in worksheet `{worksheet}`")]
    UnmatchedLabel { label: String, worksheet: String },
    #[error("component `{0}` not found")]
    UnknownComponent(String),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Image(#[from] FetchError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error(transparent)]
    Repeat(#[from] RepeatError),
}

/// Why a repeat container was not expanded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepeatError {
    #[error("repeat container has no children to use as a template")]
    NoTemplate,
    #[error("repeat container has no auto layout")]
    NoAutoLayout,
    #[error("repeat expansion failed and was rolled back: {0}")]
    RolledBack(MutationError),
    #[error("repeat expansion failed and could not be rolled back: {0}")]
    RollbackFailed(MutationError),
}

impl RepeatError {
    /// Preconditions that were not met; nothing was mutated.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NoTemplate | Self::NoAutoLayout)
    }
}
