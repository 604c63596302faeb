use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into two groups. Malformed input (unknown opcodes, truncated operands, branch
/// targets that do not land on an instruction) means the IL buffer cannot be analysed and aborts
/// the analysis of the method. An unsupported stack behavior signals a limit of the simulator
/// rather than bad input.
///
/// Approximations of the analysis itself (partially modelled `finally` flow, exception paths that
/// are not enumerated, cyclic producer chains) are never reported as errors.
///
/// # Examples
///
/// ```rust
/// use cilflow::{disassembler::decode_stream, Error};
///
/// match decode_stream(&[0xFE, 0xFF]) {
///     Err(Error::UnknownOpCode { offset, opcode }) => {
///         assert_eq!(offset, 0);
///         assert_eq!(opcode, 0xFEFF);
///     }
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The byte (or escape-prefixed byte pair) at `offset` is not a known opcode.
    ///
    /// `opcode` holds the single byte for one-byte lookups, or `prefix << 8 | second` when the
    /// two-byte table was consulted.
    #[error("Unknown opcode 0x{opcode:04X} at IL_{offset:04X}")]
    UnknownOpCode {
        /// Offset of the first opcode byte within the IL buffer
        offset: usize,
        /// The raw opcode value that failed to match
        opcode: u16,
    },

    /// The IL is damaged and could not be analysed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading the IL buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// An instruction carries a stack behavior the simulator has no mapping for.
    ///
    /// This is a gap in the implementation, not a property of the input.
    #[error("Unsupported stack behavior for '{mnemonic}' at IL_{offset:04X}")]
    UnsupportedStackBehavior {
        /// Offset of the instruction
        offset: usize,
        /// Mnemonic of the instruction
        mnemonic: &'static str,
    },

    /// This feature is not supported.
    #[error("This feature is not supported")]
    NotSupported,

    /// The encoder was asked for a mnemonic that is not in the opcode table.
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// The encoder was asked for a branch it cannot emit (wrong opcode or displacement out of
    /// range for the short form).
    #[error("Invalid branch: {0}")]
    InvalidBranch(String),

    /// A branch or switch references a label that was never defined.
    #[error("Undefined label: {0}")]
    UndefinedLabel(String),

    /// A label was defined twice.
    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    /// The resolver could not supply a method signature that the stack simulation depends on.
    #[error("Unable to resolve the signature of {0}")]
    UnresolvedToken(Token),
}
