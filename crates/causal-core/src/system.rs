//! ClockSystem - fixed-point clock resolution and global ordering
//!
//! Processes may depend on tasks of processes listed after them, so a single
//! sweep is not always enough. The system sweeps every process repeatedly
//! until one full sweep resolves them all, or the iteration bound runs out.
//!
//! ```text
//!   pass 1:  p ✗   q ✗   r ✓
//!   pass 2:  p ✓   q ✓   r ✓   -> resolved
//! ```
//!
//! Once resolved, tasks are ordered by clock, then by process position, then
//! by position within the process.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{ClockError, Result};
use crate::graph::HappensBefore;
use crate::process::Process;
use crate::task::{Task, TaskArena};
use crate::types::{constants, TaskId, TaskPath};

/// Summary of a successful [`ClockSystem::resolve_all`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Full passes run, including the final all-resolved one
    pub iterations: u32,

    /// Highest clock handed out
    pub max_clock: u64,
}

/// One entry of the global order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedTask {
    pub task: TaskId,
    pub process: String,
    pub label: String,
    pub clock: u64,
}

impl OrderedTask {
    /// `P<process>(<task>) [Clock=<value>]`
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OrderedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}({}) [Clock={}]", self.process, self.label, self.clock)
    }
}

/// Total execution order of every task in a resolved system
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    entries: Vec<OrderedTask>,
}

impl ExecutionOrder {
    pub fn entries(&self) -> &[OrderedTask] {
        &self.entries
    }

    /// Task handles in execution order
    pub fn tasks(&self) -> Vec<TaskId> {
        self.entries.iter().map(|e| e.task).collect()
    }

    /// Human-readable descriptors in execution order
    pub fn descriptors(&self) -> Vec<String> {
        self.entries.iter().map(OrderedTask::descriptor).collect()
    }

    /// Lines of the form `\t-pos:<n>=><descriptor>`, 1-based
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("\t-pos:{}=>{}", i + 1, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered collection of processes sharing one task arena
#[derive(Clone, Debug)]
pub struct ClockSystem {
    processes: Vec<Process>,
    arena: TaskArena,
    config: ResolverConfig,
    resolved: bool,
    iterations: u32,
}

impl ClockSystem {
    pub(crate) fn from_parts(processes: Vec<Process>, arena: TaskArena, config: ResolverConfig) -> Self {
        Self {
            processes,
            arena,
            config,
            resolved: false,
            iterations: 0,
        }
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn process(&self, index: usize) -> Result<&Process> {
        self.processes.get(index).ok_or_else(|| {
            let err = ClockError::IndexOutOfRange {
                context: "process",
                index,
                len: self.processes.len(),
            };
            warn!("{}", err);
            err
        })
    }

    pub fn arena(&self) -> &TaskArena {
        &self.arena
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.arena.get(id)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Passes run by the last call to [`ClockSystem::resolve_all`]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn task_count(&self) -> usize {
        self.arena.len()
    }

    pub fn task_id(&self, path: &TaskPath) -> Option<TaskId> {
        let process = self.processes.iter().find(|p| p.label() == path.process)?;
        process
            .tasks()
            .iter()
            .copied()
            .find(|&id| self.arena.get(id).map(Task::label) == Some(path.task.as_str()))
    }

    pub fn task_path(&self, id: TaskId) -> Option<TaskPath> {
        let task = self.arena.get(id)?;
        let process = self.processes.get(task.process())?;
        Some(TaskPath::new(process.label(), task.label()))
    }

    /// Tasks that declared `id` as their dependency
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.arena.dependents_of(id)
    }

    pub fn happens_before(&self) -> HappensBefore {
        HappensBefore::new(&self.processes, &self.arena)
    }

    /// Fail with [`ClockError::CyclicDependency`] if the happens-before graph has a cycle
    pub fn check_acyclic(&self) -> Result<()> {
        match self.happens_before().find_cycle() {
            Some(cycle) => Err(ClockError::CyclicDependency {
                iterations: 0,
                cycle: self.paths(&cycle),
            }),
            None => Ok(()),
        }
    }

    /// Clock of the task at `task_index` in the process at `process_index`
    pub fn clock_of(&self, process_index: usize, task_index: usize) -> Result<u64> {
        self.process(process_index)?.clock_at(task_index, &self.arena)
    }

    /// Run clock passes over every process until all resolve.
    ///
    /// Every process is visited on every pass. Stops after the first pass in
    /// which all processes succeed, or after `max_iterations` passes.
    pub fn resolve_all(&mut self) -> Result<ResolutionReport> {
        if self.resolved {
            return Ok(self.report());
        }

        let limit = self.config.max_iterations;
        let mut finished = false;
        let mut iterations = 0;

        while !finished && iterations < limit {
            iterations += 1;
            finished = true;
            for process in &mut self.processes {
                let outcome = process.assign_clocks(&mut self.arena);
                debug!(iteration = iterations, process = %process.label(), ?outcome, "clock pass");
                finished = outcome.is_resolved() && finished;
            }
        }

        self.iterations = iterations;
        self.resolved = finished;

        if finished {
            let report = self.report();
            info!(
                iterations = report.iterations,
                max_clock = report.max_clock,
                "clock resolution converged"
            );
            return Ok(report);
        }

        let err = self.diagnose(iterations);
        warn!(code = err.code(), "{}", err);
        Err(err)
    }

    /// Global order by clock, then process position, then task position.
    ///
    /// Refuses with [`ClockError::SystemUnresolved`] unless resolution succeeded.
    pub fn compute_order(&self) -> Result<ExecutionOrder> {
        if !self.resolved {
            let err = ClockError::SystemUnresolved;
            warn!("{}", err);
            return Err(err);
        }

        let max_clock = self.arena.max_clock().unwrap_or(0);
        let mut entries = Vec::with_capacity(self.arena.len());

        for clock in constants::FIRST_CLOCK..=max_clock {
            for process in &self.processes {
                for &id in process.tasks() {
                    let Some(task) = self.arena.get(id) else {
                        continue;
                    };
                    if task.clock() == Some(clock) {
                        entries.push(OrderedTask {
                            task: id,
                            process: process.label().to_string(),
                            label: task.label().to_string(),
                            clock,
                        });
                    }
                }
            }
        }

        Ok(ExecutionOrder { entries })
    }

    fn report(&self) -> ResolutionReport {
        ResolutionReport {
            iterations: self.iterations,
            max_clock: self.arena.max_clock().unwrap_or(0),
        }
    }

    fn diagnose(&self, iterations: u32) -> ClockError {
        if self.config.diagnose_cycles {
            if let Some(cycle) = self.happens_before().find_cycle() {
                return ClockError::CyclicDependency {
                    iterations,
                    cycle: self.paths(&cycle),
                };
            }
        }
        ClockError::ConvergenceFailure { iterations }
    }

    fn paths(&self, ids: &[TaskId]) -> Vec<TaskPath> {
        ids.iter().filter_map(|&id| self.task_path(id)).collect()
    }
}
