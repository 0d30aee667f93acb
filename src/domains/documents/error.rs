//! Document rendering error types.

use thiserror::Error;

/// Errors that can occur while rendering or storing an artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The spreadsheet writer rejected the workbook.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// The PDF writer failed.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Packaging an OOXML archive failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O errors while writing the artifact to disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document description cannot be rendered as given.
    #[error("Invalid document: {0}")]
    InvalidInput(String),

    /// The render task itself failed (e.g. it panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RenderError {
    /// Create a new "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
