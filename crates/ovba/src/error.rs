//! Error types for MS-OVBA decompression.

use thiserror::Error;

/// Reasons a compressed container or one of its chunks fails to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressionError {
    /// The container is empty or does not start with `0x01`.
    #[error("compressed container signature mismatch: expected 0x01, found {}", describe_byte(.found))]
    SignatureMismatch { found: Option<u8> },

    /// A chunk header is truncated or declares more bytes than remain.
    #[error("malformed chunk header: declares {declared} bytes but only {available} remain")]
    MalformedHeader { declared: usize, available: usize },

    /// A copy token appeared before any byte was decompressed in its chunk.
    #[error("copy token references an empty decompression buffer")]
    EmptyBufferReference,

    /// A copy token reaches further back than the chunk's decompressed bytes.
    #[error("copy token offset {offset} exceeds decompressed length {available}")]
    OffsetOverrun { offset: usize, available: usize },

    /// The flag byte announces a copy token but only one byte is left.
    #[error("truncated copy token at end of chunk")]
    TruncatedCopyToken,
}

fn describe_byte(found: &Option<u8>) -> String {
    match found {
        Some(byte) => format!("{:#04x}", byte),
        None => "end of input".to_string(),
    }
}

/// A container-level failure.
///
/// Carries the bytes decoded from the chunks preceding the failing one so
/// callers can decide whether a partial dump is still useful. The partial
/// bytes are not line-ending normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("chunk at container offset {offset}: {source}")]
pub struct ContainerError {
    /// Byte offset of the failing chunk (or signature) within the container.
    pub offset: usize,
    /// Output of the chunks decoded before the failure.
    pub partial: Vec<u8>,
    #[source]
    pub source: DecompressionError,
}

impl ContainerError {
    pub fn new(offset: usize, partial: Vec<u8>, source: DecompressionError) -> Self {
        Self {
            offset,
            partial,
            source,
        }
    }

    /// The decoder error behind this failure.
    pub fn kind(&self) -> &DecompressionError {
        &self.source
    }
}
