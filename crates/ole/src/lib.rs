//! Compound file (OLE/CFB) traversal backend for VBA source extraction.
//!
//! Reads every storage and stream of a Microsoft Compound File Binary
//! container so the entry scanner can look for compressed VBA source.

pub mod reader;

pub use reader::OleReader;
