//! Partitioning of a method body into runs.
//!
//! A run is a maximal instruction sequence that control can only enter at its first
//! instruction. Run boundaries are the offsets where control may arrive from somewhere other
//! than the preceding instruction:
//!
//! - offset zero (method entry)
//! - the start of every protected range, handler and filter
//! - every branch and switch target
//! - the instruction after a conditional branch (the not-taken side)
//!
//! Code that follows an unconditional transfer (`br`, `leave`, `ret`, `throw`) without being
//! targeted stays in the preceding run.
//!
//! Every boundary carries the set of [`ControlFlowSource`]s that explain why control arrives
//! there. Sources are kept in a canonical order, so building runs twice from the same input,
//! in whatever order the instructions are supplied, gives identical results.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::{
    disassembler::{il_label, FlowType, Instruction},
    metadata::exceptions::ExceptionRegion,
    Error, Result,
};

/// Why control may enter a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlFlowSource {
    /// The method starts here
    MethodEntry,
    /// A protected range starts here
    TryBegin {
        /// Index of the region in the method's region list
        clause: usize,
    },
    /// A handler starts here
    HandlerBegin {
        /// Index of the region in the method's region list
        clause: usize,
    },
    /// A filter expression starts here
    FilterBegin {
        /// Index of the region in the method's region list
        clause: usize,
    },
    /// Target of the branch or switch at `from`
    Branch {
        /// Offset of the branching instruction
        from: usize,
    },
    /// Not-taken side of the conditional branch at `from`
    ConditionalFallthrough {
        /// Offset of the branching instruction
        from: usize,
    },
}

impl ControlFlowSource {
    /// The instruction that transfers control here, for instruction-caused sources
    #[must_use]
    pub const fn instruction(&self) -> Option<usize> {
        match self {
            ControlFlowSource::Branch { from } | ControlFlowSource::ConditionalFallthrough { from } => {
                Some(*from)
            }
            _ => None,
        }
    }

    /// The exception region involved, for region-caused sources
    #[must_use]
    pub const fn clause(&self) -> Option<usize> {
        match self {
            ControlFlowSource::TryBegin { clause }
            | ControlFlowSource::HandlerBegin { clause }
            | ControlFlowSource::FilterBegin { clause } => Some(*clause),
            _ => None,
        }
    }
}

impl fmt::Display for ControlFlowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlFlowSource::MethodEntry => f.write_str("MethodEntry"),
            ControlFlowSource::TryBegin { clause } => {
                write!(f, "BeginTry exception block #{clause}")
            }
            ControlFlowSource::HandlerBegin { clause } => {
                write!(f, "BeginHandler exception block #{clause}")
            }
            ControlFlowSource::FilterBegin { clause } => {
                write!(f, "BeginFilter exception block #{clause}")
            }
            ControlFlowSource::Branch { from } => write!(f, "Branch {}", il_label(*from)),
            ControlFlowSource::ConditionalFallthrough { from } => {
                write!(f, "ConditionalFallthrough {}", il_label(*from))
            }
        }
    }
}

/// A contiguous slice of instructions with a single entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Run<'a> {
    start: usize,
    end: usize,
    instructions: Vec<Instruction<'a>>,
    sources: Vec<ControlFlowSource>,
}

impl<'a> Run<'a> {
    /// Offset of the first instruction
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset just past the last instruction; the next run starts here
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// The instructions of the run, in offset order
    #[must_use]
    pub fn instructions(&self) -> &[Instruction<'a>] {
        &self.instructions
    }

    /// Incoming control-flow sources, in canonical order
    #[must_use]
    pub fn sources(&self) -> &[ControlFlowSource] {
        &self.sources
    }

    /// The instruction that decides where control goes after this run
    #[must_use]
    pub fn last(&self) -> Option<&Instruction<'a>> {
        self.instructions.last()
    }

    /// `true` if this is the run the method starts in
    #[must_use]
    pub fn is_entry(&self) -> bool {
        self.sources.contains(&ControlFlowSource::MethodEntry)
    }

    /// `true` if `offset` lies inside this run
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Finds the run starting exactly at `start`. `runs` must be ordered by start offset, as
/// [`build_runs`] returns them.
#[must_use]
pub fn find_run<'r, 'a>(runs: &'r [Run<'a>], start: usize) -> Option<&'r Run<'a>> {
    runs.binary_search_by_key(&start, Run::start)
        .ok()
        .map(|index| &runs[index])
}

struct Boundaries<'i, 'a> {
    instructions: &'i [Instruction<'a>],
    sources: BTreeMap<usize, BTreeSet<ControlFlowSource>>,
    starts: BTreeSet<usize>,
}

impl Boundaries<'_, '_> {
    fn is_instruction_start(&self, offset: usize) -> bool {
        self.instructions
            .binary_search_by_key(&offset, Instruction::offset)
            .is_ok()
    }

    fn add(&mut self, offset: usize, source: ControlFlowSource) -> Result<()> {
        if !self.is_instruction_start(offset) {
            return Err(malformed_error!(
                "{} does not start an instruction (from {})",
                il_label(offset),
                source
            ));
        }

        self.starts.insert(offset);
        self.sources.entry(offset).or_default().insert(source);
        Ok(())
    }
}

/// Partitions `instructions` into runs and attaches incoming control-flow sources.
///
/// `instructions` must tile `[0, il_len)`, as [`crate::disassembler::decode_stream`] produces
/// them; their order does not matter.
///
/// # Errors
///
/// - [`crate::Error::Empty`] if there is nothing to partition
/// - [`crate::Error::Malformed`] if a branch target or region offset does not start an
///   instruction, or if the instructions do not tile the buffer
pub fn build_runs<'a>(
    instructions: &[Instruction<'a>],
    il_len: usize,
    regions: &[ExceptionRegion],
) -> Result<Vec<Run<'a>>> {
    if instructions.is_empty() || il_len == 0 {
        return Err(Error::Empty);
    }

    let mut ordered = instructions.to_vec();
    ordered.sort_by_key(Instruction::offset);

    let mut expected = 0;
    for instruction in &ordered {
        if instruction.offset() != expected {
            return Err(malformed_error!(
                "Instructions do not tile the buffer at {}",
                il_label(expected)
            ));
        }
        expected = instruction.next_offset();
    }
    if expected != il_len {
        return Err(malformed_error!(
            "Instructions end at {} but the buffer is {} bytes long",
            il_label(expected),
            il_len
        ));
    }

    let mut boundaries = Boundaries {
        instructions: &ordered,
        sources: BTreeMap::new(),
        starts: BTreeSet::new(),
    };

    boundaries.add(0, ControlFlowSource::MethodEntry)?;

    for (clause, region) in regions.iter().enumerate() {
        boundaries.add(region.try_start(), ControlFlowSource::TryBegin { clause })?;
        boundaries.add(
            region.handler_start(),
            ControlFlowSource::HandlerBegin { clause },
        )?;
        if let Some(filter) = region.filter_start() {
            boundaries.add(filter, ControlFlowSource::FilterBegin { clause })?;
        }
    }

    for instruction in &ordered {
        let from = instruction.offset();
        for target in instruction.targets() {
            boundaries.add(target, ControlFlowSource::Branch { from })?;
        }

        let next = instruction.next_offset();
        if matches!(instruction.flow(), FlowType::ConditionalBranch) && next < il_len {
            boundaries.add(next, ControlFlowSource::ConditionalFallthrough { from })?;
        }
    }

    let Boundaries {
        mut sources,
        starts,
        ..
    } = boundaries;
    let starts = starts.into_iter().collect::<Vec<_>>();

    let mut runs = Vec::with_capacity(starts.len());
    for (index, &start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(il_len);

        let first = ordered.partition_point(|i| i.offset() < start);
        let last = ordered.partition_point(|i| i.offset() < end);
        let slice = &ordered[first..last];

        match slice.last() {
            Some(tail) if tail.next_offset() == end => {}
            _ => {
                return Err(malformed_error!(
                    "Run {} does not end at the next boundary {}",
                    il_label(start),
                    il_label(end)
                ))
            }
        }

        runs.push(Run {
            start,
            end,
            instructions: slice.to_vec(),
            sources: sources
                .remove(&start)
                .map(|set| set.into_iter().collect())
                .unwrap_or_default(),
        });
    }

    log::debug!(
        "partitioned {} instructions into {} runs",
        ordered.len(),
        runs.len()
    );

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disassembler::decode_stream,
        test::{accumulator_loop, assemble, diamond, straight_line},
    };

    #[test]
    fn single_run() {
        let il = straight_line();
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &[]).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start(), 0);
        assert_eq!(runs[0].end(), il.len());
        assert_eq!(runs[0].instructions().len(), 5);
        assert_eq!(runs[0].sources(), &[ControlFlowSource::MethodEntry]);
        assert!(runs[0].is_entry());
    }

    #[test]
    fn diamond_runs() {
        let il = diamond();
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &[]).unwrap();

        let starts = runs.iter().map(Run::start).collect::<Vec<_>>();
        assert_eq!(starts, vec![0x00, 0x07, 0x0E, 0x13]);

        assert_eq!(
            runs[1].sources(),
            &[ControlFlowSource::ConditionalFallthrough { from: 0x05 }]
        );
        assert_eq!(runs[2].sources(), &[ControlFlowSource::Branch { from: 0x05 }]);
        assert_eq!(runs[3].sources(), &[ControlFlowSource::Branch { from: 0x0C }]);

        for pair in runs.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert_eq!(find_run(&runs, 0x0E).map(Run::start), Some(0x0E));
        assert!(find_run(&runs, 0x0F).is_none());
    }

    #[test]
    fn loop_runs() {
        let il = accumulator_loop();
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &[]).unwrap();

        let starts = runs.iter().map(Run::start).collect::<Vec<_>>();
        assert_eq!(starts, vec![0, 1, 6]);
        assert_eq!(runs[1].sources(), &[ControlFlowSource::Branch { from: 4 }]);
        assert_eq!(
            runs[2].sources(),
            &[ControlFlowSource::ConditionalFallthrough { from: 4 }]
        );
    }

    #[test]
    fn idempotent_and_order_independent() {
        let il = diamond();
        let instructions = decode_stream(&il).unwrap();
        let mut reversed = instructions.clone();
        reversed.reverse();

        let first = build_runs(&instructions, il.len(), &[]).unwrap();
        let second = build_runs(&instructions, il.len(), &[]).unwrap();
        let shuffled = build_runs(&reversed, il.len(), &[]).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, shuffled);
    }

    #[test]
    fn switch_sources_are_canonical() {
        let il = assemble(|e| {
            e.emit("ldarg.0")?;
            e.emit_switch(&["b", "a", "b"])?;
            e.define_label("a")?;
            e.emit("ret")?;
            e.define_label("b")?;
            e.emit("ret")
        });
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &[]).unwrap();

        // ldarg.0 + switch, then "a", then "b"
        assert_eq!(runs.len(), 3);
        assert_eq!(
            runs[1].sources(),
            &[
                ControlFlowSource::Branch { from: 1 },
                ControlFlowSource::ConditionalFallthrough { from: 1 },
            ]
        );
        assert_eq!(runs[2].sources(), &[ControlFlowSource::Branch { from: 1 }]);
    }

    #[test]
    fn exception_regions() {
        // try { nop; leave.s end } catch { pop; leave.s end } end: ret
        let il = assemble(|e| {
            e.emit("nop")?;
            e.emit_branch("leave.s", "end")?;
            e.emit("pop")?;
            e.emit_branch("leave.s", "end")?;
            e.define_label("end")?;
            e.emit("ret")
        });
        let regions = [ExceptionRegion::catch(0, 3, 3, 3)];
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &regions).unwrap();

        let starts = runs.iter().map(Run::start).collect::<Vec<_>>();
        assert_eq!(starts, vec![0, 3, 6]);
        assert_eq!(
            runs[0].sources(),
            &[
                ControlFlowSource::MethodEntry,
                ControlFlowSource::TryBegin { clause: 0 },
            ]
        );
        assert_eq!(
            runs[1].sources(),
            &[ControlFlowSource::HandlerBegin { clause: 0 }]
        );
        assert_eq!(runs[1].sources()[0].to_string(), "BeginHandler exception block #0");
        assert_eq!(
            runs[2].sources(),
            &[
                ControlFlowSource::Branch { from: 1 },
                ControlFlowSource::Branch { from: 4 },
            ]
        );
    }

    #[test]
    fn filter_source_at_filter_offset() {
        // try { nop; leave.s end } filter { pop; ldc.i4.1; endfilter } handler { pop; leave.s end } end: ret
        let il = assemble(|e| {
            e.emit("nop")?;
            e.emit_branch("leave.s", "end")?;
            e.emit("pop")?;
            e.emit("ldc.i4.1")?;
            e.emit("endfilter")?;
            e.emit("pop")?;
            e.emit_branch("leave.s", "end")?;
            e.define_label("end")?;
            e.emit("ret")
        });
        let regions = [ExceptionRegion::filter(0, 3, 3, 7, 3)];
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &regions).unwrap();

        assert_eq!(
            find_run(&runs, 3).unwrap().sources(),
            &[ControlFlowSource::FilterBegin { clause: 0 }]
        );
        assert_eq!(
            find_run(&runs, 7).unwrap().sources(),
            &[ControlFlowSource::HandlerBegin { clause: 0 }]
        );
    }

    #[test]
    fn code_after_return_stays_in_the_run() {
        let il = assemble(|e| {
            e.emit("ret")?;
            e.emit("nop")?;
            e.emit("ret")
        });
        let instructions = decode_stream(&il).unwrap();
        let runs = build_runs(&instructions, il.len(), &[]).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].instructions().len(), 3);
        assert_eq!(runs[0].sources().len(), 1);
    }

    #[test]
    fn malformed_inputs() {
        // br.s into the middle of ldc.i4
        let il = [0x2B, 0x01, 0x20, 0x00, 0x00, 0x00, 0x00, 0x2A];
        let instructions = decode_stream(&il).unwrap();
        assert!(matches!(
            build_runs(&instructions, il.len(), &[]),
            Err(Error::Malformed { .. })
        ));

        let il = straight_line();
        let instructions = decode_stream(&il).unwrap();
        let region = [ExceptionRegion::catch(0, 2, 40, 1)];
        assert!(matches!(
            build_runs(&instructions, il.len(), &region),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            build_runs(&instructions, il.len() + 1, &[]),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(build_runs(&[], 0, &[]), Err(Error::Empty)));
    }
}
