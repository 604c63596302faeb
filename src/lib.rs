// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cilflow
//!
//! Control-flow path enumeration and evaluation-stack data-flow recovery for CIL
//! (Common Intermediate Language) method bodies.
//!
//! `cilflow` takes the raw IL bytes of one method and its exception-handling clauses, and
//! reconstructs how values move through the evaluation stack: which instruction produced each
//! value another instruction consumes, along every bounded path from entry to return. The
//! result is precise enough to print each computed value as a nested expression.
//!
//! ## Features
//!
//! - **Complete opcode table** - every ECMA-335 opcode with operand, flow and stack classes
//! - **Lazy decoding** - bounds-checked instruction decoding straight from the byte buffer
//! - **Run partitioning** - basic blocks annotated with why control may enter them
//! - **Bounded path enumeration** - terminates on loops, models `finally` on `leave`
//! - **Data-flow recovery** - producer/consumer edges, optionally simulated in parallel
//! - **Expression rendering** - nested, cycle-safe textual rendering of computed values
//!
//! ## Quick Start
//!
//! ```rust
//! use cilflow::prelude::*;
//!
//! // ldc.i4.1; ldc.i4.2; add; stloc.0; ret
//! let il = [0x17, 0x18, 0x58, 0x0A, 0x2A];
//! let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;
//!
//! assert_eq!(analysis.paths().len(), 1);
//! assert_eq!(analysis.dataflow().producers(0x02, 1), vec![0x00]);
//! assert_eq!(analysis.renderer().describe_input(0x03, 0).as_deref(), Some("add(ldc.i4.1, ldc.i4.2)"));
//! # Ok::<(), cilflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`disassembler`] - opcode table, decoder and encoder
//! - [`analysis`] - runs, paths, stack simulation, data flow and expressions
//! - [`metadata`] - tokens, exception regions and the [`metadata::resolver::TokenResolver`]
//!   capability through which callers supply names and callee signatures
//! - [`file`] - bounds-checked little-endian byte access
//! - [`Error`] and [`Result`] - error handling
//!
//! Loading assemblies, locating method bodies and resolving tokens against real metadata are
//! left to the caller.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilflow::prelude::*;
///
/// let instructions = decode_stream(&[0x00, 0x2A])?;
/// assert_eq!(instructions[1].name(), "ret");
/// # Ok::<(), cilflow::Error>(())
/// ```
pub mod prelude;

/// Instructions, decoder and encoder based on ECMA-335
///
/// # Key Types
///
/// - [`disassembler::OpCode`] - Static descriptor of an opcode
/// - [`disassembler::Instruction`] - A decoded instruction borrowing the IL buffer
/// - [`disassembler::InstructionEncoder`] - Emits IL by mnemonic with label fixups
///
/// # Examples
///
/// ```rust
/// use cilflow::{disassembler::decode_instruction, Parser};
///
/// let bytecode = &[0x00, 0x2A]; // nop, ret
/// let mut parser = Parser::new(bytecode);
/// let instruction = decode_instruction(&mut parser)?;
///
/// assert_eq!(instruction.name(), "nop");
/// assert_eq!(parser.pos(), 1);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub mod disassembler;

/// Control-flow and data-flow analysis of a method body
pub mod analysis;

/// Metadata tokens, exception regions and token resolution
pub mod metadata;

/// Low-level byte access
pub mod file;

pub use error::Error;
pub use file::parser::Parser;

/// The result type used throughout `cilflow`.
pub type Result<T> = std::result::Result<T, Error>;
