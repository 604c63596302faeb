//! Byte-level access to IL buffers.
//!
//! - [`crate::file::io`] - little-endian primitive reads and writes
//! - [`crate::file::parser`] - cursor used by the instruction decoder

pub mod io;
pub mod parser;
