//! Export error types.

use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that abort an export. No partial document is ever returned.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Physical dimensions must be finite and positive.
    #[error("Invalid physical dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: f64,
        /// Requested height.
        height: f64,
    },

    /// Unrecognised physical unit.
    #[error("Unknown unit: {0}")]
    InvalidUnit(String),

    /// The rasterization collaborator failed.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// Building the PDF document failed.
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}
