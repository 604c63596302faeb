//! Cursor over an IL byte buffer.
//!
//! [`crate::file::parser::Parser`] keeps a position inside a method body and offers
//! bounds-checked little-endian reads. The instruction decoder drives one parser per buffer:
//! it reads the opcode byte (and the second byte of escape-prefixed opcodes), then skips over
//! the operand payload whose size is determined by the opcode descriptor.
//!
//! # Examples
//!
//! ```rust
//! use cilflow::Parser;
//!
//! let il = [0x20, 0x05, 0x00, 0x00, 0x00, 0x2A]; // ldc.i4 5; ret
//! let mut parser = Parser::new(&il);
//!
//! assert_eq!(parser.read_le::<u8>()?, 0x20);
//! assert_eq!(parser.read_le::<i32>()?, 5);
//! assert_eq!(parser.pos(), 5);
//! assert!(parser.has_more_data());
//! # Ok::<(), cilflow::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// A bounds-checked cursor over a byte slice.
///
/// All reads validate that enough data remains before touching the buffer, so truncated
/// operands at the end of a method body surface as [`crate::Error::OutOfBounds`] instead of
/// panics.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns `true` if there are bytes left beyond the current position.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the new position would exceed the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(target) if target <= self.data.len() => {
                self.position = target;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Current position of the cursor.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read a little-endian value of type `T` and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }
}
