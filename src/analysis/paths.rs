//! Bounded enumeration of entry-to-return paths.
//!
//! The enumerator walks the run graph breadth-first from the entry run. A path is the list of
//! run start offsets visited so far; every dequeued path is extended by the successors of its
//! last run, as decided by that run's final instruction:
//!
//! | Last instruction            | Successors                                               |
//! |-----------------------------|----------------------------------------------------------|
//! | unconditional branch        | the target, after the `finally` handler when leaving one |
//! | `switch`                    | every distinct target, then the fall-through             |
//! | other conditional branch    | the target, then the fall-through                        |
//! | return class                | none; the path is recorded                               |
//! | `throw` inside catch/filter | the fall-through                                         |
//! | other `throw`               | none; the path is dropped                                |
//! | anything else               | the fall-through                                         |
//!
//! A successor is only enqueued while its offset occurs at most `revisit_limit` times in the
//! path, which bounds every loop and makes the enumeration terminate.

use std::collections::{HashSet, VecDeque};

use crate::{
    analysis::{
        config::AnalysisConfig,
        runs::{find_run, Run},
    },
    disassembler::{il_label, FlowType, Instruction},
    metadata::exceptions::ExceptionRegion,
    Error, Result,
};

/// Renders the identifying key of a path, e.g. `IL_0000=>IL_0007=>IL_0013`.
#[must_use]
pub fn path_key(runs: &[usize]) -> String {
    runs.iter()
        .map(|offset| il_label(*offset))
        .collect::<Vec<_>>()
        .join("=>")
}

/// One execution path through the method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlFlowPath {
    key: String,
    runs: Vec<usize>,
}

impl ControlFlowPath {
    /// Builds a path from the start offsets of the runs it visits.
    #[must_use]
    pub fn new(runs: Vec<usize>) -> Self {
        ControlFlowPath {
            key: path_key(&runs),
            runs,
        }
    }

    /// The path key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run start offsets, in execution order
    #[must_use]
    pub fn runs(&self) -> &[usize] {
        &self.runs
    }
}

impl std::fmt::Display for ControlFlowPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// The distinct paths of a method, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowPaths {
    paths: Vec<ControlFlowPath>,
    keys: HashSet<String>,
}

impl ControlFlowPaths {
    /// Adds a path unless one with the same key is already present. Returns `true` if added.
    pub fn insert(&mut self, path: ControlFlowPath) -> bool {
        if !self.keys.insert(path.key.clone()) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Number of distinct paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// `true` when no return is reachable
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// `true` if a path with this key was found
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// The path with this key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ControlFlowPath> {
        self.paths.iter().find(|path| path.key == key)
    }

    /// Iterates the paths in discovery order
    pub fn iter(&self) -> std::slice::Iter<'_, ControlFlowPath> {
        self.paths.iter()
    }

    /// The paths in discovery order
    #[must_use]
    pub fn as_slice(&self) -> &[ControlFlowPath] {
        &self.paths
    }

    /// Keys in discovery order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(ControlFlowPath::key)
    }
}

impl<'p> IntoIterator for &'p ControlFlowPaths {
    type Item = &'p ControlFlowPath;
    type IntoIter = std::slice::Iter<'p, ControlFlowPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

struct Enumerator<'r, 'a> {
    runs: &'r [Run<'a>],
    regions: &'r [ExceptionRegion],
    config: &'r AnalysisConfig,
    queue: VecDeque<(&'r Run<'a>, Vec<usize>)>,
}

impl<'r, 'a> Enumerator<'r, 'a> {
    fn admits(&self, path: &[usize], next: usize) -> bool {
        path.iter().filter(|&&offset| offset == next).count() <= self.config.revisit_limit
    }

    fn target(&self, from: &Instruction<'a>, target: usize) -> Result<&'r Run<'a>> {
        find_run(self.runs, target).ok_or_else(|| {
            malformed_error!(
                "Branch at {} targets {} which does not start a run",
                il_label(from.offset()),
                il_label(target)
            )
        })
    }

    fn enqueue_target(&mut self, path: &[usize], run: &'r Run<'a>) {
        if self.admits(path, run.start()) {
            self.queue.push_back((run, path.to_vec()));
        }
    }

    fn enqueue_fallthrough(&mut self, path: &[usize], last: &Instruction<'a>) {
        let next = last.next_offset();
        if !self.admits(path, next) {
            return;
        }

        match find_run(self.runs, next) {
            Some(run) => self.queue.push_back((run, path.to_vec())),
            None => log::warn!(
                "dropping path {}: execution falls off the method after {}",
                path_key(path),
                il_label(last.offset())
            ),
        }
    }

    fn leaving_finally(&self, from: usize, target: usize) -> Option<&'r ExceptionRegion> {
        self.regions
            .iter()
            .find(|region| {
                region.is_finally() && region.try_contains(from) && !region.try_contains(target)
            })
    }

    fn is_caught(&self, offset: usize) -> bool {
        self.regions
            .iter()
            .any(|region| region.handles_exceptions() && region.try_contains(offset))
    }

    fn run(mut self, entry: &'r Run<'a>) -> Result<ControlFlowPaths> {
        let mut paths = ControlFlowPaths::default();
        self.queue.push_back((entry, Vec::new()));

        while let Some((run, mut path)) = self.queue.pop_front() {
            path.push(run.start());
            log::trace!("visiting {}", path_key(&path));

            let Some(last) = run.last() else {
                continue;
            };

            match last.flow() {
                FlowType::UnconditionalBranch => {
                    let Some(target) = last.branch_target() else {
                        continue;
                    };
                    if self.config.model_finally {
                        if let Some(region) = self.leaving_finally(last.offset(), target) {
                            path.push(region.handler_start());
                        }
                    }
                    let next = self.target(last, target)?;
                    self.enqueue_target(&path, next);
                }
                FlowType::ConditionalBranch => {
                    let mut seen = HashSet::new();
                    for target in last.targets() {
                        if seen.insert(target) {
                            let next = self.target(last, target)?;
                            self.enqueue_target(&path, next);
                        }
                    }
                    self.enqueue_fallthrough(&path, last);
                }
                FlowType::Return => {
                    let path = ControlFlowPath::new(path);
                    if paths.insert(path) {
                        log::trace!("recorded path #{}", paths.len());
                    }
                }
                FlowType::Throw if !self.is_caught(last.offset()) => {
                    log::trace!(
                        "path {} ends in an uncaught throw at {}",
                        path_key(&path),
                        il_label(last.offset())
                    );
                }
                _ => self.enqueue_fallthrough(&path, last),
            }
        }

        Ok(paths)
    }
}

/// Enumerates the distinct entry-to-return paths through `runs`.
///
/// # Errors
///
/// - [`crate::Error::Empty`] if `runs` is empty
/// - [`crate::Error::Malformed`] if no run is marked as method entry, or if a branch target
///   does not start a run
pub fn enumerate_paths(
    runs: &[Run<'_>],
    regions: &[ExceptionRegion],
    config: &AnalysisConfig,
) -> Result<ControlFlowPaths> {
    if runs.is_empty() {
        return Err(Error::Empty);
    }

    let Some(entry) = runs.iter().find(|run| run.is_entry()) else {
        return Err(malformed_error!("No run is marked as method entry"));
    };

    let paths = Enumerator {
        runs,
        regions,
        config,
        queue: VecDeque::new(),
    }
    .run(entry)?;

    log::debug!("enumerated {} paths over {} runs", paths.len(), runs.len());
    Ok(paths)
}
