//! Abstract evaluation-stack simulation.
//!
//! The simulator replays a path instruction by instruction over a stack that holds, instead of
//! values, the offsets of the instructions that pushed them. Every pop therefore identifies a
//! producer, which is recorded as a [`DataFlowSource`](crate::analysis::DataFlowSource) in the
//! shared [`DataFlowMap`].
//!
//! Pop and push counts come from the opcode's stack classes. Calls consult the
//! [`TokenResolver`] for the callee's parameter count and return type:
//!
//! | Opcode               | Pops                                                      | Pushes                    |
//! |----------------------|-----------------------------------------------------------|---------------------------|
//! | `call` / `callvirt`  | parameters, plus one for non-static, non-constructor callees | 0 for `void`, 1 otherwise |
//! | `calli`              | as `call`, plus the function pointer                      | 0 for `void`, 1 otherwise |
//! | `newobj`             | parameters                                                | 1                         |
//! | `ret`                | 1 if the stack is not empty                               | 0                         |

use rayon::prelude::*;

use crate::{
    analysis::{
        config::AnalysisConfig,
        dataflow::DataFlowMap,
        paths::{ControlFlowPath, ControlFlowPaths},
        runs::{find_run, Run},
    },
    disassembler::{il_label, Instruction},
    metadata::resolver::TokenResolver,
    Error, Result,
};

/// Evaluation stack of producer offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStack {
    slots: Vec<usize>,
}

impl EvaluationStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the offset of a producing instruction.
    pub fn push(&mut self, producer: usize) {
        self.slots.push(producer);
    }

    /// Pops the producer on top of the stack.
    pub fn pop(&mut self) -> Option<usize> {
        self.slots.pop()
    }

    /// Number of values on the stack
    #[must_use]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// `true` when the stack holds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Producers from the bottom of the stack to the top
    #[must_use]
    pub fn snapshot(&self) -> &[usize] {
        &self.slots
    }
}

/// Number of values an instruction takes from and leaves on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    /// Values popped
    pub pops: usize,
    /// Values pushed
    pub pushes: usize,
}

/// Replays paths over an [`EvaluationStack`], recording data-flow edges.
pub struct StackSimulator<'r> {
    resolver: &'r dyn TokenResolver,
}

impl<'r> StackSimulator<'r> {
    /// Creates a simulator resolving callee signatures through `resolver`.
    #[must_use]
    pub fn new(resolver: &'r dyn TokenResolver) -> Self {
        StackSimulator { resolver }
    }

    /// Stack effect of `instruction` when executed with `depth` values on the stack.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::UnresolvedToken`] if the callee signature of a call is unknown
    /// - [`crate::Error::UnsupportedStackBehavior`] for a variable stack class this simulator
    ///   does not model
    pub fn stack_effect(&self, instruction: &Instruction<'_>, depth: usize) -> Result<StackEffect> {
        let opcode = instruction.opcode();

        if opcode.is_ret() {
            return Ok(StackEffect {
                pops: usize::from(depth > 0),
                pushes: 0,
            });
        }

        match (opcode.pop.count(), opcode.push.count()) {
            (Some(pops), Some(pushes)) => Ok(StackEffect { pops, pushes }),
            _ if opcode.is_call_site() => self.call_effect(instruction),
            _ => Err(Error::UnsupportedStackBehavior {
                offset: instruction.offset(),
                mnemonic: opcode.name,
            }),
        }
    }

    fn call_effect(&self, instruction: &Instruction<'_>) -> Result<StackEffect> {
        let opcode = instruction.opcode();
        let Some(token) = instruction.token() else {
            return Err(malformed_error!(
                "{} at {} carries no token",
                opcode.name,
                il_label(instruction.offset())
            ));
        };
        let Some(signature) = self.resolver.resolve_method_signature(token) else {
            return Err(Error::UnresolvedToken(token));
        };

        let mut pops = signature.param_count;
        if signature.pops_instance() && !opcode.is_newobj() {
            pops += 1;
        }
        if opcode.is_calli() {
            pops += 1;
        }

        let pushes = match opcode.push.count() {
            Some(fixed) => fixed,
            None => usize::from(!signature.returns_void),
        };

        Ok(StackEffect { pops, pushes })
    }

    /// Replays the instructions of `run` on `stack`.
    ///
    /// Popping an empty stack records nothing for that position.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`StackSimulator::stack_effect`].
    pub fn simulate_run(
        &self,
        run: &Run<'_>,
        stack: &mut EvaluationStack,
        dataflow: &DataFlowMap,
    ) -> Result<()> {
        for instruction in run.instructions() {
            let effect = self.stack_effect(instruction, stack.depth())?;
            let offset = instruction.offset();

            for position in 0..effect.pops {
                match stack.pop() {
                    Some(producer) => {
                        dataflow.record(offset, position, producer);
                    }
                    None => log::warn!(
                        "stack underflow at {} ({}), pop #{position} has no producer",
                        il_label(offset),
                        instruction.name()
                    ),
                }
            }

            for _ in 0..effect.pushes {
                stack.push(offset);
            }
        }

        Ok(())
    }

    /// Replays one path from an empty stack. Returns the stack left behind.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Malformed`] if a path entry does not start a run
    /// - the errors of [`StackSimulator::stack_effect`]
    pub fn simulate(
        &self,
        runs: &[Run<'_>],
        path: &ControlFlowPath,
        dataflow: &DataFlowMap,
    ) -> Result<EvaluationStack> {
        let mut stack = EvaluationStack::new();

        for &start in path.runs() {
            let Some(run) = find_run(runs, start) else {
                return Err(malformed_error!(
                    "Path {} visits {} which does not start a run",
                    path,
                    il_label(start)
                ));
            };
            self.simulate_run(run, &mut stack, dataflow)?;
        }

        log::trace!("simulated {path}, final depth {}", stack.depth());
        Ok(stack)
    }

    /// Replays every path into `dataflow`, concurrently when `config.parallel` is set.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`StackSimulator::simulate`].
    pub fn simulate_all(
        &self,
        runs: &[Run<'_>],
        paths: &ControlFlowPaths,
        dataflow: &DataFlowMap,
        config: &AnalysisConfig,
    ) -> Result<()> {
        if config.parallel {
            paths
                .as_slice()
                .par_iter()
                .try_for_each(|path| self.simulate(runs, path, dataflow).map(drop))?;
        } else {
            for path in paths {
                self.simulate(runs, path, dataflow)?;
            }
        }

        log::debug!(
            "simulated {} paths, {} data-flow edges",
            paths.len(),
            dataflow.len()
        );
        Ok(())
    }
}
