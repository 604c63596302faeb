//! Pipeline integration tests.
//!
//! These tests drive every stage through the public API:
//! 1. Encode IL with `InstructionEncoder`
//! 2. Decode it and partition it into runs
//! 3. Enumerate paths and simulate the evaluation stack
//! 4. Render expressions from the recorded data flow

use std::collections::HashSet;

use cilflow::{
    analysis::{
        build_runs, enumerate_paths, AnalysisConfig, DataFlowMap, EvaluationStack,
        MethodAnalysis, StackSimulator,
    },
    disassembler::{decode, decode_stream, InstructionEncoder, Operand},
    metadata::resolver::NullResolver,
    Result,
};

fn encode(build: impl FnOnce(&mut InstructionEncoder) -> Result<()>) -> Result<Vec<u8>> {
    let mut encoder = InstructionEncoder::new();
    build(&mut encoder)?;
    encoder.finish()
}

fn diamond() -> Result<Vec<u8>> {
    encode(|e| {
        e.emit_instruction("ldc.i4", Some(Operand::Int32(0)))?;
        e.emit_branch("brtrue", "taken")?;
        e.emit_instruction("ldc.i4", Some(Operand::Int32(1)))?;
        e.emit_branch("br", "end")?;
        e.define_label("taken")?;
        e.emit_instruction("ldc.i4", Some(Operand::Int32(2)))?;
        e.define_label("end")?;
        e.emit("stloc.0")?;
        e.emit("ret")
    })
}

#[test]
fn decoding_tiles_the_buffer() -> Result<()> {
    let il = encode(|e| {
        e.emit("ldarg.0")?;
        e.emit_ldc_i4(1000)?;
        e.emit_instruction("ldc.i8", Some(Operand::Int64(-1)))?;
        e.emit_instruction("ldc.r8", Some(Operand::Float64(2.5)))?;
        e.emit("pop")?;
        e.emit("pop")?;
        e.emit_switch(&["end", "end", "end"])?;
        e.emit_ldloc(300)?;
        e.emit_stloc(2)?;
        e.emit_instruction("ldarg.s", Some(Operand::Var(4)))?;
        e.emit("pop")?;
        e.define_label("end")?;
        e.emit("ret")
    })?;

    let instructions = decode_stream(&il)?;
    let mut expected = 0;
    for instruction in &instructions {
        assert_eq!(instruction.offset(), expected);
        expected = instruction.next_offset();
    }
    assert_eq!(expected, il.len());

    let lazily: Vec<_> = decode(&il).collect::<Result<_>>()?;
    assert_eq!(lazily, instructions);
    Ok(())
}

#[test]
fn branch_targets_land_on_instructions() -> Result<()> {
    let mut encoder = InstructionEncoder::new();
    encoder.emit("nop")?;
    encoder.define_label("top")?;
    encoder.emit("ldarg.0")?;
    encoder.emit_branch("brfalse", "out")?;
    encoder.emit("ldarg.0")?;
    encoder.emit_switch(&["top", "out"])?;
    encoder.emit_branch("br.s", "top")?;
    encoder.define_label("out")?;
    encoder.emit("ret")?;

    let top = encoder.label_offset("top").unwrap();
    let out = encoder.label_offset("out").unwrap();
    let il = encoder.finish()?;

    let instructions = decode_stream(&il)?;
    let starts: HashSet<usize> = instructions.iter().map(|i| i.offset()).collect();

    for instruction in &instructions {
        for target in instruction.targets() {
            assert!(starts.contains(&target), "{instruction} targets a non-start");
        }
    }

    let targets: Vec<usize> = instructions.iter().flat_map(|i| i.targets()).collect();
    assert_eq!(targets, vec![out, top, out, top]);
    Ok(())
}

#[test]
fn run_partitioning_is_order_independent() -> Result<()> {
    let il = diamond()?;
    let instructions = decode_stream(&il)?;

    let first = build_runs(&instructions, il.len(), &[])?;
    let again = build_runs(&instructions, il.len(), &[])?;
    let mut reversed = instructions.clone();
    reversed.reverse();
    let from_reversed = build_runs(&reversed, il.len(), &[])?;

    assert_eq!(first, again);
    assert_eq!(first, from_reversed);
    assert_eq!(
        first.iter().map(|run| run.start()).collect::<Vec<_>>(),
        vec![0x00, 0x0A, 0x14, 0x19]
    );
    Ok(())
}

#[test]
fn loops_terminate() -> Result<()> {
    // while (true) { if (arg0) return; }
    let il = encode(|e| {
        e.define_label("top")?;
        e.emit("ldarg.0")?;
        e.emit_branch("brtrue.s", "done")?;
        e.emit_branch("br.s", "top")?;
        e.define_label("done")?;
        e.emit("ret")
    })?;

    for limit in 0..4 {
        let config = AnalysisConfig::default().with_revisit_limit(limit);
        let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &config)?;
        assert_eq!(analysis.paths().len(), limit + 1);
        for path in analysis.paths() {
            assert_eq!(path.runs().last(), Some(&0x05));
        }
    }
    Ok(())
}

#[test]
fn balanced_run_leaves_an_empty_stack() -> Result<()> {
    let il = [0x02, 0x03, 0x58, 0x17, 0x5A, 0x0A, 0x2A];
    let instructions = decode_stream(&il)?;
    let runs = build_runs(&instructions, il.len(), &[])?;
    let dataflow = DataFlowMap::new();

    let mut stack = EvaluationStack::new();
    StackSimulator::new(&NullResolver).simulate_run(&runs[0], &mut stack, &dataflow)?;

    assert!(stack.is_empty());
    assert_eq!(dataflow.len(), 5);
    Ok(())
}

#[test]
fn straight_line_store() -> Result<()> {
    let il = [0x17, 0x18, 0x58, 0x0A, 0x2A];
    let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;

    assert_eq!(
        analysis.renderer().describe_input(0x03, 0).as_deref(),
        Some("add(ldc.i4.1, ldc.i4.2)")
    );
    Ok(())
}

#[test]
fn constant_return() -> Result<()> {
    let il = [0x20, 0x05, 0x00, 0x00, 0x00, 0x2A];
    let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;

    assert_eq!(analysis.runs().len(), 1);
    assert_eq!(analysis.paths().len(), 1);
    assert_eq!(analysis.dataflow().consumers(), vec![0x05]);
    assert_eq!(analysis.renderer().describe_input(0x05, 0).as_deref(), Some("ldc.i4 5"));
    Ok(())
}

#[test]
fn diamond_merges_producers() -> Result<()> {
    let il = diamond()?;
    let analysis = MethodAnalysis::analyze(&il, &[], &NullResolver, &AnalysisConfig::default())?;
    let paths = enumerate_paths(analysis.runs(), &[], &AnalysisConfig::default())?;

    assert_eq!(paths.len(), 2);
    assert_eq!(analysis.paths().len(), 2);
    assert_eq!(analysis.dataflow().producers(0x19, 0), vec![0x0A, 0x14]);
    assert_eq!(analysis.describe(0x19), "stloc.0(ldc.i4 1 or ldc.i4 2)");
    Ok(())
}
