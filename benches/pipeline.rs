//! Benchmarks for the analysis pipeline.
//!
//! Measures each stage on synthetic method bodies:
//! - Decoding a long straight-line body
//! - Run partitioning and path enumeration on a chain of diamonds
//! - Full analysis (sequential and parallel) including stack simulation

extern crate cilflow;

use std::hint::black_box;

use cilflow::{
    analysis::{build_runs, enumerate_paths, AnalysisConfig, MethodAnalysis},
    disassembler::{decode_stream, InstructionEncoder},
    metadata::resolver::NullResolver,
};
use criterion::{criterion_group, criterion_main, Criterion};

/// `count` repetitions of `ldarg.0; ldc.i4 n; add; stloc.0`, then `ret`.
fn straight_line(count: usize) -> Vec<u8> {
    let mut encoder = InstructionEncoder::new();
    for n in 0..count {
        encoder.emit("ldarg.0").unwrap();
        encoder.emit_ldc_i4(i32::try_from(n).unwrap()).unwrap();
        encoder.emit("add").unwrap();
        encoder.emit_stloc(0).unwrap();
    }
    encoder.emit("ret").unwrap();
    encoder.finish().unwrap()
}

/// `count` diamonds in sequence; the number of paths doubles with every diamond.
fn diamonds(count: usize) -> Vec<u8> {
    let mut encoder = InstructionEncoder::new();
    for n in 0..count {
        encoder.emit("ldarg.0").unwrap();
        encoder.emit_branch("brtrue.s", &format!("taken{n}")).unwrap();
        encoder.emit("ldc.i4.1").unwrap();
        encoder.emit_branch("br.s", &format!("join{n}")).unwrap();
        encoder.define_label(&format!("taken{n}")).unwrap();
        encoder.emit("ldc.i4.2").unwrap();
        encoder.define_label(&format!("join{n}")).unwrap();
        encoder.emit_stloc(0).unwrap();
    }
    encoder.emit("ret").unwrap();
    encoder.finish().unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let il = straight_line(1_000);

    c.bench_function("decode_straight_line_1000", |b| {
        b.iter(|| {
            let instructions = decode_stream(black_box(&il)).unwrap();
            black_box(instructions)
        });
    });
}

fn bench_paths(c: &mut Criterion) {
    let il = diamonds(8);
    let instructions = decode_stream(&il).unwrap();
    let config = AnalysisConfig::default();

    c.bench_function("runs_diamonds_8", |b| {
        b.iter(|| {
            let runs = build_runs(black_box(&instructions), il.len(), &[]).unwrap();
            black_box(runs)
        });
    });

    let runs = build_runs(&instructions, il.len(), &[]).unwrap();
    c.bench_function("paths_diamonds_8", |b| {
        b.iter(|| {
            let paths = enumerate_paths(black_box(&runs), &[], &config).unwrap();
            black_box(paths)
        });
    });
}

fn bench_analysis(c: &mut Criterion) {
    let il = diamonds(8);

    c.bench_function("analyze_diamonds_8", |b| {
        b.iter(|| {
            let analysis = MethodAnalysis::analyze(
                black_box(&il),
                &[],
                &NullResolver,
                &AnalysisConfig::default(),
            )
            .unwrap();
            black_box(analysis.dataflow().len())
        });
    });

    let parallel = AnalysisConfig::default().with_parallel(true);
    c.bench_function("analyze_diamonds_8_parallel", |b| {
        b.iter(|| {
            let analysis =
                MethodAnalysis::analyze(black_box(&il), &[], &NullResolver, &parallel).unwrap();
            black_box(analysis.dataflow().len())
        });
    });
}

criterion_group!(benches, bench_decode, bench_paths, bench_analysis);
criterion_main!(benches);
