//! MS-OVBA compressed container decoder.
//!
//! VBA module source is stored inside compound-file streams as an MS-OVBA
//! "CompressedContainer". This crate finds where that container starts in a
//! raw stream and decompresses it back into the original source bytes. It
//! performs no I/O.

pub mod compression;
pub mod error;
pub mod locate;

pub use compression::{decompress, CONTAINER_SIGNATURE, MAX_CHUNK_SIZE};
pub use error::{ContainerError, DecompressionError};
pub use locate::{locate, locate_container};
