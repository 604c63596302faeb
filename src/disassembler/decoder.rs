//! CIL instruction decoding.
//!
//! Decoding walks a method body from offset zero, one instruction after the other. Each step
//! reads an opcode byte, consults the two-byte table when the byte is the `0xFE` escape, and
//! skips the operand whose size follows from the opcode (`switch` reads its case count first).
//! The result is a sequence of [`crate::disassembler::Instruction`] views that tile the buffer
//! without gaps or overlaps.
//!
//! # Example: Decoding a Single Instruction
//!
//! ```rust
//! use cilflow::{Parser, disassembler::decode_instruction};
//! let code = [0x2A]; // ret
//! let mut parser = Parser::new(&code);
//! let instr = decode_instruction(&mut parser)?;
//! assert_eq!(instr.name(), "ret");
//! # Ok::<(), cilflow::Error>(())
//! ```
//!
//! # Example: Decoding a Stream of Instructions
//!
//! ```rust
//! use cilflow::disassembler::{decode, decode_stream};
//! let code = [0x00, 0x2A]; // nop, ret
//! let instrs = decode_stream(&code)?;
//! assert_eq!(instrs.len(), 2);
//!
//! // The lazy form can be restarted from the buffer at any time
//! assert_eq!(decode(&code).count(), 2);
//! # Ok::<(), cilflow::Error>(())
//! ```

use crate::{
    disassembler::{
        instruction::{il_label, Instruction},
        opcodes::{OpCode, FE_PREFIX},
    },
    file::parser::Parser,
    Error::UnknownOpCode,
    Result,
};

/// Decodes the instruction at the parser's current position and advances past it.
///
/// # Errors
///
/// - [`crate::Error::UnknownOpCode`] if the opcode byte (or escape pair) is not in the table
/// - [`crate::Error::Malformed`] if the operand or the escape pair is truncated, or if a
///   branch target lies before the start of the buffer
/// - [`crate::Error::OutOfBounds`] if the parser is already exhausted
pub fn decode_instruction<'a>(parser: &mut Parser<'a>) -> Result<Instruction<'a>> {
    let offset = parser.pos();
    let first = parser.read_le::<u8>()?;

    let opcode = match OpCode::from_byte(first) {
        Some(opcode) => opcode,
        None if first == FE_PREFIX => {
            let Ok(second) = parser.read_le::<u8>() else {
                return Err(malformed_error!(
                    "Truncated two-byte opcode at {}",
                    il_label(offset)
                ));
            };
            OpCode::from_pair(first, second).ok_or(UnknownOpCode {
                offset,
                opcode: u16::from_be_bytes([first, second]),
            })?
        }
        None => {
            return Err(UnknownOpCode {
                offset,
                opcode: u16::from(first),
            })
        }
    };

    let operand_size = match opcode.operand.size() {
        Some(size) => size,
        None => {
            let Ok(count) = parser.read_le::<u32>() else {
                return Err(malformed_error!(
                    "Truncated switch table at {}",
                    il_label(offset)
                ));
            };
            // The case count has already been consumed
            (count as usize).checked_mul(4).ok_or_else(|| {
                malformed_error!("Switch table too large at {}", il_label(offset))
            })?
        }
    };

    if parser.advance_by(operand_size).is_err() {
        return Err(malformed_error!(
            "Truncated operand for '{}' at {}",
            opcode.name,
            il_label(offset)
        ));
    }

    let instruction = Instruction {
        il: parser.data(),
        offset,
        opcode,
        size: parser.pos() - offset,
    };

    let expected_targets = match instruction.switch_case_count() {
        Some(count) => count,
        None => usize::from(opcode.operand.is_branch_target()),
    };
    if instruction.targets().len() != expected_targets {
        return Err(malformed_error!(
            "Branch target of '{}' at {} lies before the method start",
            opcode.name,
            il_label(offset)
        ));
    }

    Ok(instruction)
}

/// Lazy, restartable decoding of an IL buffer.
///
/// Yields instructions in offset order. After the first error the iterator is fused and
/// yields nothing more.
pub struct InstructionIter<'a> {
    parser: Parser<'a>,
    failed: bool,
}

impl<'a> Iterator for InstructionIter<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.parser.has_more_data() {
            return None;
        }

        let result = decode_instruction(&mut self.parser);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for InstructionIter<'_> {}

/// Starts lazily decoding `il` from offset zero.
#[must_use]
pub fn decode(il: &[u8]) -> InstructionIter<'_> {
    InstructionIter {
        parser: Parser::new(il),
        failed: false,
    }
}

/// Decodes the whole buffer.
///
/// # Errors
///
/// Returns the first decoding error encountered, see [`decode_instruction`].
pub fn decode_stream(il: &[u8]) -> Result<Vec<Instruction<'_>>> {
    let instructions = decode(il).collect::<Result<Vec<_>>>()?;
    log::trace!(
        "decoded {} instructions from {} bytes",
        instructions.len(),
        il.len()
    );
    Ok(instructions)
}
