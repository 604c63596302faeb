//! Control-flow and data-flow analysis of a single method body.
//!
//! The pipeline runs in four stages, each consuming the output of the previous one:
//!
//! 1. [`build_runs`] partitions decoded instructions into [`Run`]s and records why control
//!    may enter each of them
//! 2. [`enumerate_paths`] walks the run graph from the entry run and collects every distinct
//!    path that ends in a return, visiting each run a bounded number of times
//! 3. [`StackSimulator`] replays each path over an abstract evaluation stack and records
//!    producer/consumer edges into a [`DataFlowMap`]
//! 4. [`ExpressionRenderer`] follows those edges backwards to print values as nested
//!    expressions
//!
//! [`MethodAnalysis`] runs all stages at once. The [`listing`] module prints each stage.
//!
//! # Usage
//!
//! ```rust
//! use cilflow::{
//!     analysis::{AnalysisConfig, MethodAnalysis},
//!     metadata::resolver::NullResolver,
//! };
//!
//! // ldc.i4.0; brtrue.s +1; nop; ret
//! let il = [0x16, 0x2D, 0x01, 0x00, 0x2A];
//! let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;
//!
//! let keys: Vec<&str> = analysis.paths().keys().collect();
//! assert_eq!(keys, vec!["IL_0000=>IL_0004", "IL_0000=>IL_0003=>IL_0004"]);
//! # Ok::<(), cilflow::Error>(())
//! ```
//!
//! # Limitations
//!
//! - Handlers are only entered through the single `finally` insertion made when a branch
//!   leaves a protected range. Exceptional edges into `catch`, `filter` and `fault` handlers
//!   are not followed.
//! - The evaluation stack is not reset at handler entry or by `leave`.

mod config;
mod dataflow;
mod expression;
pub mod listing;
mod method;
mod paths;
mod runs;
mod stack;

pub use config::AnalysisConfig;
pub use dataflow::{DataFlowMap, DataFlowSource};
pub use expression::{ExpressionRenderer, UNKNOWN};
pub use method::MethodAnalysis;
pub use paths::{enumerate_paths, path_key, ControlFlowPath, ControlFlowPaths};
pub use runs::{build_runs, find_run, ControlFlowSource, Run};
pub use stack::{EvaluationStack, StackEffect, StackSimulator};
