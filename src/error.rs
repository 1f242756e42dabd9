//! Error types for TFLite model decoding.

use thiserror::Error;

/// All errors that can occur when decoding a TFLite model.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while opening a model or catalog file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container does not carry the `TFL3` file identifier.
    #[error("Invalid FlatBuffers identifier '{found}' in '{source_name}'.")]
    InvalidIdentifier { found: String, source_name: String },

    /// An offset or length points past the end of the buffer.
    #[error("Unexpected end of buffer")]
    UnexpectedEof,

    /// Buffer structure is invalid.
    #[error("Invalid file structure: {0}")]
    InvalidFileStructure(String),

    /// The metadata catalog document is not valid JSON.
    #[error("Metadata catalog parse error: {0}")]
    CatalogParse(#[from] serde_json::Error),
}
