//! Process - an ordered sequence of local events
//!
//! A process walks its tasks in order and hands out increasing logical
//! clocks. A task with a dependency is pushed past the dependency's clock:
//!
//! ```text
//!   clock(t) = max(counter, clock(dep) + 1)
//!   counter  = clock(t) + 1
//! ```
//!
//! If a dependency has no clock yet the pass stops. Clocks already assigned
//! are kept, so the pass can simply be run again once other processes have
//! made progress.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{ClockError, Result};
use crate::task::TaskArena;
use crate::types::{constants, TaskId};

/// Outcome of a single [`Process::assign_clocks`] pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every task received a clock
    Resolved,

    /// Stopped at `position`, whose dependency has no clock yet
    Blocked { position: usize, waiting_on: TaskId },
}

impl PassOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

/// An ordered sequence of tasks sharing one local clock
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Process {
    label: String,
    tasks: Vec<TaskId>,
    clock_resolved: bool,
}

impl Process {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tasks: Vec::new(),
            clock_resolved: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_clock_resolved(&self) -> bool {
        self.clock_resolved
    }

    pub(crate) fn push_task(&mut self, task: TaskId) {
        self.tasks.push(task);
    }

    /// Task handle at a position
    pub fn task_at(&self, index: usize) -> Result<TaskId> {
        self.tasks
            .get(index)
            .copied()
            .ok_or(ClockError::IndexOutOfRange {
                context: "task_at",
                index,
                len: self.tasks.len(),
            })
    }

    /// Assign clocks to every task in sequence order.
    ///
    /// Stops at the first task whose dependency is still unclocked and marks
    /// the process unresolved; earlier assignments from this pass are kept.
    pub fn assign_clocks(&mut self, arena: &mut TaskArena) -> PassOutcome {
        let mut counter = constants::FIRST_CLOCK;

        for (position, &id) in self.tasks.iter().enumerate() {
            let dependency = arena.get(id).and_then(|task| task.depends_on());

            let value = match dependency {
                None => counter,
                Some(dep) => match arena.clock_of(dep) {
                    Some(dep_clock) => counter.max(dep_clock + 1),
                    None => {
                        trace!(process = %self.label, position, waiting_on = %dep, "dependency unclocked");
                        self.clock_resolved = false;
                        return PassOutcome::Blocked {
                            position,
                            waiting_on: dep,
                        };
                    }
                },
            };

            match arena.get_mut(id) {
                Some(task) => task.set_clock(value),
                None => {
                    self.clock_resolved = false;
                    return PassOutcome::Blocked {
                        position,
                        waiting_on: id,
                    };
                }
            }
            counter = value + 1;
        }

        self.clock_resolved = true;
        PassOutcome::Resolved
    }

    /// Clock of the task at `index`.
    ///
    /// Fails while the process is unresolved or when `index` is out of range.
    pub fn clock_at(&self, index: usize, arena: &TaskArena) -> Result<u64> {
        if !self.clock_resolved {
            let err = ClockError::UnresolvedClockQuery {
                process: self.label.clone(),
            };
            warn!(process = %self.label, index, "{}", err);
            return Err(err);
        }

        let id = self.task_at(index).map_err(|err| {
            warn!(process = %self.label, index, "{}", err);
            err
        })?;

        arena
            .clock_of(id)
            .ok_or_else(|| ClockError::UnresolvedClockQuery {
                process: self.label.clone(),
            })
    }
}
