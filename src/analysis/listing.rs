//! Plain-text renderings of each analysis stage.
//!
//! All listings use `IL_XXXX` labels and four-space indentation below a run header, e.g.
//!
//! ```text
//! IL_0013:
//!     // from Branch IL_000C
//!     // from ConditionalFallthrough IL_0005
//!     IL_0013: stloc.0
//!     IL_0014: ret
//! ```

use std::fmt::Write;

use crate::{
    analysis::{
        dataflow::DataFlowMap,
        expression::{ExpressionRenderer, UNKNOWN},
        runs::Run,
    },
    disassembler::{il_label, FlowType, Instruction},
    metadata::resolver::TokenResolver,
};

/// One `IL_XXXX: name operand` line per instruction.
#[must_use]
pub fn instruction_listing(
    instructions: &[Instruction<'_>],
    resolver: &dyn TokenResolver,
) -> String {
    let mut output = String::new();
    for instruction in instructions {
        let _ = writeln!(output, "{}", instruction.render(resolver));
    }
    output
}

/// Runs with the reasons control may enter them, followed by their instructions.
#[must_use]
pub fn run_listing(runs: &[Run<'_>], resolver: &dyn TokenResolver) -> String {
    let mut output = String::new();
    for run in runs {
        let _ = writeln!(output, "{}:", il_label(run.start()));
        for source in run.sources() {
            let _ = writeln!(output, "    // from {source}");
        }
        for instruction in run.instructions() {
            let _ = writeln!(output, "    {}", instruction.render(resolver));
        }
    }
    output
}

/// Disassembly annotated with the producer of every popped value.
#[must_use]
pub fn dataflow_listing(
    instructions: &[Instruction<'_>],
    dataflow: &DataFlowMap,
    resolver: &dyn TokenResolver,
) -> String {
    let mut output = String::new();
    for instruction in instructions {
        let _ = writeln!(output, "{}", instruction.render(resolver));
        for source in dataflow.sources(instruction.offset()) {
            let _ = writeln!(
                output,
                "    // pop#{} using result of {}",
                source.position,
                il_label(source.producer)
            );
        }
    }
    output
}

/// The statement an instruction contributes to the summary, if any.
///
/// - local stores become `local_N = (expr)`, or `local_N = (a) or (b)` for merged values
/// - calls whose result nobody consumes are printed as expressions
/// - conditional branches become `name(inputs) goto IL_XXXX`, switches list their targets
/// - unconditional branches become `goto IL_XXXX`
/// - `ret` becomes `return` or `return expr`
#[must_use]
pub fn statement(
    renderer: &ExpressionRenderer<'_, '_>,
    dataflow: &DataFlowMap,
    instruction: &Instruction<'_>,
) -> Option<String> {
    let offset = instruction.offset();
    let opcode = instruction.opcode();

    if instruction.is_local_store() {
        let index = instruction.local_index()?;
        let alternatives = renderer.alternatives(offset, 0);
        let value = if alternatives.is_empty() {
            UNKNOWN.to_string()
        } else {
            alternatives
                .iter()
                .map(|alternative| format!("({alternative})"))
                .collect::<Vec<_>>()
                .join(" or ")
        };
        return Some(format!("local_{index} = {value}"));
    }

    if opcode.is_call_site() {
        return (!dataflow.is_consumed(offset)).then(|| renderer.describe(offset));
    }

    if opcode.is_ret() {
        return Some(match renderer.describe_input(offset, 0) {
            Some(value) => format!("return {value}"),
            None => "return".to_string(),
        });
    }

    match instruction.flow() {
        FlowType::ConditionalBranch => {
            let condition = format!(
                "{}({})",
                instruction.name(),
                renderer.arguments(offset).join(", ")
            );
            let targets = instruction
                .targets()
                .into_iter()
                .map(il_label)
                .collect::<Vec<_>>()
                .join(", ");
            if opcode.is_switch() {
                Some(format!("{condition} {targets}"))
            } else {
                Some(format!("{condition} goto {targets}"))
            }
        }
        FlowType::UnconditionalBranch => instruction
            .branch_target()
            .map(|target| format!("goto {}", il_label(target))),
        _ => None,
    }
}

/// Per run, the statements its instructions contribute.
#[must_use]
pub fn statement_listing(
    runs: &[Run<'_>],
    renderer: &ExpressionRenderer<'_, '_>,
    dataflow: &DataFlowMap,
) -> String {
    let mut output = String::new();
    for run in runs {
        let _ = writeln!(output, "{}:", il_label(run.start()));
        for instruction in run.instructions() {
            if let Some(line) = statement(renderer, dataflow, instruction) {
                let _ = writeln!(output, "    {line}");
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            config::AnalysisConfig, paths::enumerate_paths, runs::build_runs,
            stack::StackSimulator,
        },
        disassembler::decode_stream,
        metadata::exceptions::ExceptionRegion,
        test::{assemble, diamond, resolver, straight_line, try_finally},
    };

    fn listings(il: &[u8], regions: &[ExceptionRegion]) -> (String, String, String, String) {
        let resolver = resolver();
        let config = AnalysisConfig::default();
        let instructions = decode_stream(il).unwrap();
        let runs = build_runs(&instructions, il.len(), regions).unwrap();
        let paths = enumerate_paths(&runs, regions, &config).unwrap();
        let dataflow = DataFlowMap::new();
        StackSimulator::new(&resolver)
            .simulate_all(&runs, &paths, &dataflow, &config)
            .unwrap();
        let renderer = ExpressionRenderer::new(&instructions, &dataflow, &resolver);

        (
            instruction_listing(&instructions, &resolver),
            run_listing(&runs, &resolver),
            dataflow_listing(&instructions, &dataflow, &resolver),
            statement_listing(&runs, &renderer, &dataflow),
        )
    }

    #[test]
    fn straight_line_listings() {
        let (instructions, runs, dataflow, statements) = listings(&straight_line(), &[]);

        assert_eq!(
            instructions,
            "IL_0000: ldc.i4.1\nIL_0001: ldc.i4.2\nIL_0002: add\nIL_0003: stloc.0\nIL_0004: ret\n"
        );
        assert!(runs.starts_with("IL_0000:\n    // from MethodEntry\n    IL_0000: ldc.i4.1\n"));
        assert!(dataflow.contains(
            "IL_0002: add\n    // pop#0 using result of IL_0001\n    // pop#1 using result of IL_0000\n"
        ));
        assert_eq!(
            statements,
            "IL_0000:\n    local_0 = (add(ldc.i4.1, ldc.i4.2))\n    return\n"
        );
    }

    #[test]
    fn branch_statements() {
        let (_, runs, _, statements) = listings(&diamond(), &[]);

        assert!(runs.contains("IL_0007:\n    // from ConditionalFallthrough IL_0005\n"));
        assert!(runs.contains("IL_000E:\n    // from Branch IL_0005\n"));
        assert_eq!(
            statements,
            "IL_0000:\n    brtrue.s(ldc.i4 0) goto IL_000E\n\
             IL_0007:\n    goto IL_0013\n\
             IL_000E:\n\
             IL_0013:\n    local_0 = (ldc.i4 1) or (ldc.i4 2)\n    return\n"
        );
    }

    #[test]
    fn calls_and_regions() {
        let (il, regions) = try_finally();
        let (instructions, runs, _, statements) = listings(&il, &regions);

        assert!(instructions.contains("IL_0000: ldstr \"hello\"\n"));
        assert!(instructions.contains("IL_0005: call System.Console::WriteLine\n"));
        assert!(runs.starts_with(
            "IL_0000:\n    // from MethodEntry\n    // from BeginTry exception block #0\n"
        ));
        assert!(runs.contains("IL_000C:\n    // from BeginHandler exception block #0\n"));
        assert_eq!(
            statements,
            "IL_0000:\n    call System.Console::WriteLine(ldstr \"hello\")\n    goto IL_0013\n\
             IL_000C:\n    call System.Console::WriteLine(ldc.i4.1)\n\
             IL_0013:\n    return\n"
        );
    }

    #[test]
    fn switch_and_unknown_store() {
        // stloc.1 with nothing on the stack, then a switch
        let il = assemble(|e| {
            e.emit("stloc.1")?;
            e.emit("ldarg.0")?;
            e.emit_switch(&["a", "b"])?;
            e.define_label("a")?;
            e.define_label("b")?;
            e.emit("ret")
        });
        let (_, _, _, statements) = listings(&il, &[]);

        assert!(statements.contains("    local_1 = /* unknown */\n"));
        assert!(statements.contains("    switch(ldarg.0) IL_000F, IL_000F\n"));
    }
}
