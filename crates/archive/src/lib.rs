//! Zip unwrapping backend for VBA source extraction.
//!
//! Macro-enabled Office Open XML files (.docm, .xlsm, .pptm) are zip
//! archives; their VBA project lives in an embedded compound file such as
//! `word/vbaProject.bin`.

pub mod reader;

pub use reader::{ArchiveReader, EmbeddedFile};
