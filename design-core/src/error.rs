//! Error types for canvas operations.

use thiserror::Error;

use crate::element::ElementId;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Element not found in scene.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A direct-manipulation gesture was rejected.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Workspace dimensions must be finite and positive.
    #[error("Invalid workspace size: {width}x{height}")]
    InvalidWorkspace {
        /// Requested width in pixels.
        width: f64,
        /// Requested height in pixels.
        height: f64,
    },

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Template lookup failed.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
}

/// Reasons a transform gesture is refused.
///
/// A refused gesture leaves the element untouched and records no history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The element is locked against changes.
    #[error("Element is locked: {0}")]
    Locked(ElementId),

    /// No element is currently selected.
    #[error("Nothing selected")]
    NoSelection,

    /// Resize factors must be finite and greater than zero.
    #[error("Invalid scale factors: ({0}, {1})")]
    InvalidScale(f64, f64),

    /// The selected element no longer exists.
    #[error("Element not found: {0}")]
    Missing(ElementId),
}
