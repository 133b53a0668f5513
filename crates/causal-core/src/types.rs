//! Core type definitions for causal ordering
//!
//! Tasks live in a single arena owned by the [`ClockSystem`](crate::ClockSystem)
//! and are addressed by [`TaskId`]. Human-facing references use [`TaskPath`],
//! the `"<process>/<task>"` pair of labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClockError;

/// TaskId - Stable handle of a task inside the task arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(usize);

impl TaskId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the task in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// TaskPath - Label-based reference to a task, written `process/task`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskPath {
    pub process: String,
    pub task: String,
}

impl TaskPath {
    pub fn new(process: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            task: task.into(),
        }
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.process,
            constants::TASK_PATH_SEPARATOR,
            self.task
        )
    }
}

impl FromStr for TaskPath {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_once(constants::TASK_PATH_SEPARATOR)
            .map(|(process, task)| (process.trim(), task.trim()));
        match parts {
            Some((process, task)) if !process.is_empty() && !task.is_empty() => {
                Ok(Self::new(process, task))
            }
            _ => Err(ClockError::InvalidTaskPath(s.to_string())),
        }
    }
}

impl Serialize for TaskPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// System constants
pub mod constants {
    /// Maximum number of full passes before resolution gives up
    pub const CLOCK_CALCULATION_LIMIT: u32 = 15;

    /// Clock value handed to the first undependent task of a process
    pub const FIRST_CLOCK: u64 = 1;

    /// Separator between process and task labels in a [`TaskPath`](super::TaskPath)
    pub const TASK_PATH_SEPARATOR: char = '/';
}
