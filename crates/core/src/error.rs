//! Error types for VBA source extraction.

use thiserror::Error;
use vbadump_ovba::ContainerError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning or dumping VBA source.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// OLE/CFB container error.
    #[error("OLE/CFB error: {0}")]
    CfbError(String),

    /// ZIP archive error (for .docm/.xlsm wrappers).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// The selected entry index does not exist.
    #[error("Entry {index} not found: the container has {count} entries")]
    EntryNotFound { index: usize, count: usize },

    /// The selected entry exists but carries no compressed VBA source.
    #[error("Entry {index} ({name}) holds no VBA source")]
    NoMacroSource { index: usize, name: String },

    /// The compressed VBA source could not be decompressed.
    #[error("Decompression error: {0}")]
    DecompressionError(#[from] ContainerError),
}
