//! Tasks and the arena that owns them
//!
//! A task is a passive event: a label, an optional single predecessor and the
//! logical clock its process assigns to it. The inverse of `depends_on` is not
//! stored; [`TaskArena::dependents_of`] derives it by scanning.

use serde::{Deserialize, Serialize};

use crate::types::TaskId;

/// A single event within a process
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Label used for display, unique within the owning process
    label: String,

    /// Logical clock, `None` until the owning process reaches this task
    clock: Option<u64>,

    /// Task that must happen before this one
    depends_on: Option<TaskId>,

    /// Index of the owning process
    process: usize,
}

impl Task {
    pub fn new(label: impl Into<String>, process: usize) -> Self {
        Self {
            label: label.into(),
            clock: None,
            depends_on: None,
            process,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn clock(&self) -> Option<u64> {
        self.clock
    }

    pub fn depends_on(&self) -> Option<TaskId> {
        self.depends_on
    }

    pub fn process(&self) -> usize {
        self.process
    }

    pub fn is_clocked(&self) -> bool {
        self.clock.is_some()
    }

    pub(crate) fn set_depends_on(&mut self, dependency: TaskId) {
        self.depends_on = Some(dependency);
    }

    pub(crate) fn set_clock(&mut self, value: u64) {
        debug_assert!(
            self.clock.map_or(true, |current| current <= value),
            "clock of task {} would decrease",
            self.label
        );
        self.clock = Some(value);
    }
}

/// Flat storage for every task of a clock system
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskArena {
    tasks: Vec<Task>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, task: Task) -> TaskId {
        let id = TaskId::new(self.tasks.len());
        self.tasks.push(task);
        id
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id.index())
    }

    /// Clock of a task, `None` if unknown or not yet assigned
    pub fn clock_of(&self, id: TaskId) -> Option<u64> {
        self.get(id).and_then(Task::clock)
    }

    /// Tasks whose `depends_on` points at `id`
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.iter()
            .filter(|(_, task)| task.depends_on == Some(id))
            .map(|(task_id, _)| task_id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, task)| (TaskId::new(index), task))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Highest clock assigned so far
    pub fn max_clock(&self) -> Option<u64> {
        self.tasks.iter().filter_map(Task::clock).max()
    }
}
