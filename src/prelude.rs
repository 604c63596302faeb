//! # cilflow Prelude
//!
//! Re-exports of the types needed to run the pipeline and inspect its results.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilflow operations
pub use crate::Error;

/// The result type used throughout cilflow
pub use crate::Result;

/// Cursor over the IL buffer
pub use crate::Parser;

// ================================================================================================
// Disassembly
// ================================================================================================

pub use crate::disassembler::{
    decode, decode_instruction, decode_stream, il_label, FlowType, Instruction,
    InstructionEncoder, OpCode, Operand, OperandType,
};

// ================================================================================================
// Metadata
// ================================================================================================

pub use crate::metadata::{
    exceptions::{ExceptionHandlerFlags, ExceptionRegion},
    resolver::{MethodSignature, NullResolver, StaticResolver, TokenResolver},
    token::Token,
};

// ================================================================================================
// Analysis
// ================================================================================================

pub use crate::analysis::{
    build_runs, enumerate_paths, AnalysisConfig, ControlFlowPath, ControlFlowPaths,
    ControlFlowSource, DataFlowMap, DataFlowSource, ExpressionRenderer, MethodAnalysis, Run,
    StackSimulator,
};
