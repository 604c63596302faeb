//! One-call analysis of a method body.

use crate::{
    analysis::{
        config::AnalysisConfig,
        dataflow::DataFlowMap,
        expression::ExpressionRenderer,
        listing,
        paths::{enumerate_paths, ControlFlowPaths},
        runs::{build_runs, Run},
        stack::StackSimulator,
    },
    disassembler::{decode_stream, Instruction},
    metadata::{exceptions::ExceptionRegion, resolver::TokenResolver},
    Error, Result,
};

/// The output of every pipeline stage for one method body.
///
/// # Examples
///
/// ```rust
/// use cilflow::{
///     analysis::{AnalysisConfig, MethodAnalysis},
///     metadata::resolver::NullResolver,
/// };
///
/// // ldc.i4 5; ret
/// let il = [0x20, 0x05, 0x00, 0x00, 0x00, 0x2A];
/// let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;
///
/// assert_eq!(analysis.runs().len(), 1);
/// assert_eq!(analysis.paths().len(), 1);
/// assert_eq!(analysis.describe(0x05), "ret(ldc.i4 5)");
/// # Ok::<(), cilflow::Error>(())
/// ```
pub struct MethodAnalysis<'a> {
    instructions: Vec<Instruction<'a>>,
    runs: Vec<Run<'a>>,
    paths: ControlFlowPaths,
    dataflow: DataFlowMap,
    resolver: &'a dyn TokenResolver,
}

impl<'a> MethodAnalysis<'a> {
    /// Decodes `il`, partitions it into runs, enumerates paths and simulates each of them.
    ///
    /// # Arguments
    ///
    /// * `il` - The method body
    /// * `regions` - Exception-handling clauses, offsets relative to `il`
    /// * `resolver` - Token names and callee signatures
    /// * `config` - Enumeration and simulation settings
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; [`crate::Error::Empty`] for an empty body.
    pub fn analyze(
        il: &'a [u8],
        regions: &[ExceptionRegion],
        resolver: &'a dyn TokenResolver,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        if il.is_empty() {
            return Err(Error::Empty);
        }

        let instructions = decode_stream(il)?;
        let runs = build_runs(&instructions, il.len(), regions)?;
        let paths = enumerate_paths(&runs, regions, config)?;

        let dataflow = DataFlowMap::new();
        StackSimulator::new(resolver).simulate_all(&runs, &paths, &dataflow, config)?;

        log::debug!(
            "analysed {} bytes: {} instructions, {} runs, {} paths, {} edges",
            il.len(),
            instructions.len(),
            runs.len(),
            paths.len(),
            dataflow.len()
        );

        Ok(MethodAnalysis {
            instructions,
            runs,
            paths,
            dataflow,
            resolver,
        })
    }

    /// Decoded instructions in offset order
    #[must_use]
    pub fn instructions(&self) -> &[Instruction<'a>] {
        &self.instructions
    }

    /// Runs in offset order
    #[must_use]
    pub fn runs(&self) -> &[Run<'a>] {
        &self.runs
    }

    /// Enumerated paths
    #[must_use]
    pub fn paths(&self) -> &ControlFlowPaths {
        &self.paths
    }

    /// Data-flow edges recorded over all paths
    #[must_use]
    pub fn dataflow(&self) -> &DataFlowMap {
        &self.dataflow
    }

    /// Expression renderer over this method.
    #[must_use]
    pub fn renderer(&self) -> ExpressionRenderer<'_, 'a> {
        ExpressionRenderer::new(&self.instructions, &self.dataflow, self.resolver)
    }

    /// Renders the value computed at `offset`, see [`ExpressionRenderer::describe`].
    #[must_use]
    pub fn describe(&self, offset: usize) -> String {
        self.renderer().describe(offset)
    }

    /// See [`listing::instruction_listing`].
    #[must_use]
    pub fn instruction_listing(&self) -> String {
        listing::instruction_listing(&self.instructions, self.resolver)
    }

    /// See [`listing::run_listing`].
    #[must_use]
    pub fn run_listing(&self) -> String {
        listing::run_listing(&self.runs, self.resolver)
    }

    /// See [`listing::dataflow_listing`].
    #[must_use]
    pub fn dataflow_listing(&self) -> String {
        listing::dataflow_listing(&self.instructions, &self.dataflow, self.resolver)
    }

    /// See [`listing::statement_listing`].
    #[must_use]
    pub fn statement_listing(&self) -> String {
        listing::statement_listing(&self.runs, &self.renderer(), &self.dataflow)
    }
}

impl std::fmt::Debug for MethodAnalysis<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodAnalysis")
            .field("instructions", &self.instructions.len())
            .field("runs", &self.runs.len())
            .field("paths", &self.paths.len())
            .field("edges", &self.dataflow.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::resolver::NullResolver,
        test::{diamond, resolver, try_finally},
    };

    #[test]
    fn every_stage_is_exposed() {
        let il = diamond();
        let analysis =
            MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default()).unwrap();

        assert_eq!(analysis.instructions().len(), 7);
        assert_eq!(analysis.runs().len(), 4);
        assert_eq!(analysis.paths().len(), 2);
        assert_eq!(analysis.dataflow().producers(0x13, 0), vec![0x07, 0x0E]);
        assert_eq!(analysis.describe(0x13), "stloc.0(ldc.i4 1 or ldc.i4 2)");
        assert!(analysis.run_listing().contains("// from Branch IL_000C"));
        assert!(analysis.statement_listing().contains("goto IL_0013"));
    }

    #[test]
    fn regions_and_resolver_flow_through() {
        let (il, regions) = try_finally();
        let resolver = resolver();
        let analysis =
            MethodAnalysis::analyze(&il, &regions, &resolver, &AnalysisConfig::default())
                .unwrap();

        assert!(analysis.paths().contains_key("IL_0000=>IL_000C=>IL_0013"));
        assert!(analysis
            .instruction_listing()
            .contains("IL_000D: call System.Console::WriteLine"));
        assert!(analysis
            .dataflow_listing()
            .contains("IL_000D: call System.Console::WriteLine\n    // pop#0 using result of IL_000C\n"));
    }

    #[test]
    fn empty_body() {
        assert!(matches!(
            MethodAnalysis::analyze(&[], &[], &NullResolver, &AnalysisConfig::default()),
            Err(Error::Empty)
        ));
    }
}
