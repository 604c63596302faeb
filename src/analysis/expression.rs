//! Rendering of computed values as nested expressions.
//!
//! The value an instruction produces is rendered by following the data-flow map backwards:
//! an instruction with no recorded inputs is a leaf (`ldc.i4 5`, `ldstr "hello"`), anything
//! else becomes `leaf(arg, arg, ...)`. Arguments appear in evaluation order, which is the
//! reverse of pop order. When different paths delivered different producers for the same
//! argument, the alternatives are joined with ` or `.
//!
//! Loops that keep a value on the stack make producer chains cyclic. A chain that comes back
//! to an instruction already being rendered prints `/* recursive IL_XXXX */` instead.
//!
//! Producer chains are walked with an explicit work stack, so their length is bounded by
//! memory rather than by the thread's call stack.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    analysis::dataflow::DataFlowMap,
    disassembler::{il_label, Instruction},
    metadata::resolver::TokenResolver,
};

/// Placeholder for an offset that is not an instruction start.
pub const UNKNOWN: &str = "/* unknown */";

/// Renders instructions of one method as expressions over their data-flow inputs.
pub struct ExpressionRenderer<'r, 'a> {
    instructions: HashMap<usize, &'r Instruction<'a>>,
    dataflow: &'r DataFlowMap,
    resolver: &'r dyn TokenResolver,
}

impl<'r, 'a> ExpressionRenderer<'r, 'a> {
    /// Creates a renderer over the decoded `instructions` of a method.
    #[must_use]
    pub fn new(
        instructions: &'r [Instruction<'a>],
        dataflow: &'r DataFlowMap,
        resolver: &'r dyn TokenResolver,
    ) -> Self {
        ExpressionRenderer {
            instructions: instructions
                .iter()
                .map(|instruction| (instruction.offset(), instruction))
                .collect(),
            dataflow,
            resolver,
        }
    }

    /// The instruction starting at `offset`.
    #[must_use]
    pub fn instruction(&self, offset: usize) -> Option<&'r Instruction<'a>> {
        self.instructions.get(&offset).copied()
    }

    /// The instruction itself without its inputs, e.g. `call System.Console::WriteLine`.
    #[must_use]
    pub fn leaf(&self, offset: usize) -> String {
        match self.instruction(offset) {
            Some(instruction) => instruction.text(self.resolver),
            None => UNKNOWN.to_string(),
        }
    }

    /// Renders the value computed at `offset` with all of its inputs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilflow::{
    ///     analysis::{AnalysisConfig, MethodAnalysis},
    ///     metadata::resolver::NullResolver,
    /// };
    ///
    /// // ldc.i4.1; ldc.i4.2; add; stloc.0; ret
    /// let il = [0x17, 0x18, 0x58, 0x0A, 0x2A];
    /// let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;
    /// assert_eq!(analysis.describe(0x03), "stloc.0(add(ldc.i4.1, ldc.i4.2))");
    /// # Ok::<(), cilflow::Error>(())
    /// ```
    #[must_use]
    pub fn describe(&self, offset: usize) -> String {
        let mut visited = HashSet::new();
        self.render(offset, &mut visited)
    }

    /// Renders the alternatives feeding pop `position` of `consumer`, joined with ` or `.
    ///
    /// Returns `None` when no producer was recorded.
    #[must_use]
    pub fn describe_input(&self, consumer: usize, position: usize) -> Option<String> {
        let alternatives = self.alternatives(consumer, position);
        (!alternatives.is_empty()).then(|| alternatives.join(" or "))
    }

    /// Renders each distinct producer feeding pop `position` of `consumer`, in ascending
    /// producer order.
    #[must_use]
    pub fn alternatives(&self, consumer: usize, position: usize) -> Vec<String> {
        let mut visited = HashSet::from([consumer]);
        self.dataflow
            .producers(consumer, position)
            .into_iter()
            .map(|producer| self.render(producer, &mut visited))
            .collect()
    }

    /// Renders every input of `offset` in evaluation order (deepest pop first).
    #[must_use]
    pub fn arguments(&self, offset: usize) -> Vec<String> {
        let mut visited = HashSet::from([offset]);
        self.positions(offset)
            .into_iter()
            .rev()
            .map(|position| {
                self.dataflow
                    .producers(offset, position)
                    .into_iter()
                    .map(|producer| self.render(producer, &mut visited))
                    .collect::<Vec<_>>()
                    .join(" or ")
            })
            .collect()
    }

    /// Pop positions with recorded producers, ascending.
    fn positions(&self, offset: usize) -> Vec<usize> {
        self.dataflow
            .sources(offset)
            .iter()
            .map(|source| source.position)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn enter(&self, offset: usize, visited: &mut HashSet<usize>) -> Step {
        if self.instruction(offset).is_none() {
            return Step::Done(UNKNOWN.to_string());
        }
        if !visited.insert(offset) {
            return Step::Done(format!("/* recursive {} */", il_label(offset)));
        }

        let leaf = self.leaf(offset);
        let positions = self.positions(offset);
        if positions.is_empty() {
            visited.remove(&offset);
            return Step::Done(leaf);
        }

        Step::Descend(Frame {
            offset,
            leaf,
            positions,
            producers: Vec::new(),
            alternatives: Vec::new(),
            arguments: Vec::new(),
        })
    }

    fn render(&self, root: usize, visited: &mut HashSet<usize>) -> String {
        let mut frames: Vec<Frame> = Vec::new();
        let mut next = Some(root);
        let mut finished: Option<String> = None;

        loop {
            if let Some(offset) = next.take() {
                match self.enter(offset, visited) {
                    Step::Done(text) => finished = Some(text),
                    Step::Descend(frame) => frames.push(frame),
                }
            }

            let Some(top) = frames.last_mut() else {
                return finished.unwrap_or_default();
            };
            if let Some(text) = finished.take() {
                top.alternatives.push(text);
            }
            if let Some(producer) = top.producers.pop() {
                next = Some(producer);
                continue;
            }
            if !top.alternatives.is_empty() {
                top.arguments.push(top.alternatives.join(" or "));
                top.alternatives.clear();
            }
            if let Some(position) = top.positions.pop() {
                top.producers = self.dataflow.producers(top.offset, position);
                top.producers.reverse();
                continue;
            }

            if let Some(frame) = frames.pop() {
                visited.remove(&frame.offset);
                finished = Some(format!("{}({})", frame.leaf, frame.arguments.join(", ")));
            }
        }
    }
}

/// An instruction whose inputs are still being rendered.
struct Frame {
    offset: usize,
    leaf: String,
    /// Positions still to render, ascending; popping yields the deepest first.
    positions: Vec<usize>,
    /// Producers of the current position still to render, descending.
    producers: Vec<usize>,
    alternatives: Vec<String>,
    arguments: Vec<String>,
}

enum Step {
    Done(String),
    Descend(Frame),
}
