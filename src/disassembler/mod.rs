//! CIL (Common Intermediate Language) disassembler and instruction encoder.
//!
//! This module turns a method body into a sequence of instructions and back. It holds the
//! fixed opcode table, the lazy decoder built on top of it and an encoder that writes IL by
//! mnemonic with symbolic labels.
//!
//! # Key Types
//! - [`OpCode`] - Immutable descriptor of one opcode
//! - [`Instruction`] - A decoded instruction, borrowing the IL buffer
//! - [`Operand`] - Instruction operands (immediates, tokens, targets)
//! - [`FlowType`] - How instructions affect control flow
//! - [`InstructionEncoder`] - Writes IL with label fixups
//!
//! # Main Functions
//! - [`decode_instruction`] - Decode a single instruction
//! - [`decode`] - Lazily decode a buffer
//! - [`decode_stream`] - Decode a whole buffer
//!
//! # Example
//! ```rust
//! use cilflow::disassembler::decode_instruction;
//! use cilflow::Parser;
//! let bytecode = &[0x00, 0x2A]; // nop, ret
//! let mut parser = Parser::new(bytecode);
//! let instruction = decode_instruction(&mut parser)?;
//! assert_eq!(instruction.name(), "nop");
//! # Ok::<(), cilflow::Error>(())
//! ```

mod decoder;
mod encoder;
mod instruction;
mod opcodes;

pub use decoder::{decode, decode_instruction, decode_stream, InstructionIter};
pub use encoder::InstructionEncoder;
pub use instruction::{il_label, Instruction, Operand};
pub use opcodes::{
    FlowType, OpCode, OperandType, StackPop, StackPush, TokenKind, FE_PREFIX,
};
