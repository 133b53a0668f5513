//! # Causal Core
//!
//! Causal execution ordering for a set of processes using simplified Lamport
//! logical clocks.
//!
//! This crate provides:
//! - `Task` / `TaskArena` - events and the arena that owns them
//! - `Process` - an ordered sequence of tasks with its own clock pass
//! - `ClockSystem` - fixed-point resolution and the global total order
//! - `GraphBuilder` / `GraphSpec` - declarative construction of the graph
//!
//! ## Ordering
//!
//! ```text
//!   clock(t) > clock(dep(t))                 (causality)
//!   order    = (clock, process position, task position)
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod process;
pub mod sample;
pub mod system;
pub mod task;
pub mod types;

pub use config::*;
pub use error::*;
pub use graph::*;
pub use process::*;
pub use system::*;
pub use task::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ResolverConfig;
    pub use crate::error::{ClockError, Result};
    pub use crate::graph::{GraphBuilder, GraphSpec};
    pub use crate::process::Process;
    pub use crate::sample::reference_graph;
    pub use crate::system::{ClockSystem, ExecutionOrder, ResolutionReport};
    pub use crate::task::Task;
    pub use crate::types::*;
}
