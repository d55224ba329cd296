#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Error attached to one layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerError {
    /// `name (id)` of the layer.
    pub layer: String,
    pub message: String,
}

/// Outcome of one sync run.
///
/// `success` is false when setup failed or the run was cancelled. Per-layer
/// errors are listed in `errors` and never flip `success` on their own.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncResult {
    pub success: bool,
    pub layers_processed: usize,
    pub layers_updated: usize,
    pub errors: Vec<LayerError>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

impl SyncResult {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![LayerError {
                layer: String::new(),
                message: message.into(),
            }],
            ..Default::default()
        }
    }

    pub(crate) fn error(&mut self, layer: String, message: impl Into<String>) {
        self.errors.push(LayerError {
            layer,
            message: message.into(),
        });
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
