//! Error types for clock resolution and graph construction

use crate::types::TaskPath;
use thiserror::Error;

/// Result type alias for causal ordering operations
pub type Result<T> = std::result::Result<T, ClockError>;

/// Errors that can occur while building, resolving or ordering a clock system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    // === Clock Queries ===
    /// Clock read before the owning process reached the resolved state
    #[error("Clock has not been defined yet for process {process}")]
    UnresolvedClockQuery { process: String },

    /// Task or process position outside the valid range
    #[error("Invalid index {index} at {context} (length {len})")]
    IndexOutOfRange {
        context: &'static str,
        index: usize,
        len: usize,
    },

    // === Resolution ===
    /// Fixed-point driver exhausted its iteration bound
    #[error("Clock resolution did not converge after {iterations} iterations")]
    ConvergenceFailure { iterations: u32 },

    /// Happens-before cycle found among the listed tasks
    #[error("Cyclic dependency after {iterations} iterations: {}", format_cycle(.cycle))]
    CyclicDependency {
        iterations: u32,
        cycle: Vec<TaskPath>,
    },

    /// Ordering requested before every process was resolved
    #[error("Clock has not been defined yet for all processes")]
    SystemUnresolved,

    // === Graph Construction ===
    /// Process label not declared
    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    /// Task path does not name a declared task
    #[error("Unknown task: {0}")]
    UnknownTask(TaskPath),

    /// Process label declared twice
    #[error("Duplicate process label: {0}")]
    DuplicateProcess(String),

    /// Task label declared twice within one process
    #[error("Duplicate task label: {0}")]
    DuplicateTask(TaskPath),

    /// A task may depend on at most one predecessor
    #[error("Task {task} already depends on {existing}")]
    DependencyAlreadySet { task: TaskPath, existing: TaskPath },

    /// Process or task label that cannot be written as a task path
    #[error("Invalid label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    /// Task path not of the form `process/task`
    #[error("Invalid task path: {0:?}")]
    InvalidTaskPath(String),

    // === Configuration ===
    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn format_cycle(cycle: &[TaskPath]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl ClockError {
    /// Stable numeric code, printed alongside CLI diagnostics
    pub fn code(&self) -> u32 {
        match self {
            Self::UnresolvedClockQuery { .. } => 1001,
            Self::IndexOutOfRange { .. } => 1002,
            Self::ConvergenceFailure { .. } => 1003,
            Self::CyclicDependency { .. } => 1004,
            Self::SystemUnresolved => 1005,
            Self::UnknownProcess(_) | Self::UnknownTask(_) => 2001,
            Self::DuplicateProcess(_) | Self::DuplicateTask(_) => 2002,
            Self::DependencyAlreadySet { .. } => 2003,
            Self::InvalidTaskPath(_) => 2004,
            Self::InvalidLabel { .. } => 2005,
            Self::InvalidConfig(_) => 3001,
        }
    }

    /// Whether the error means the graph could not be brought to a resolved state
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ConvergenceFailure { .. } | Self::CyclicDependency { .. } | Self::SystemUnresolved
        )
    }
}
