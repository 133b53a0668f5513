//! Reference graph: three processes and six cross-process dependencies
//!
//! ```text
//!   p:  1 - 2 - 3 - 4
//!   q:  1 - 2 - 3 - 4 - 5 - 6 - 7
//!   r:  1 - 2 - 3 - 4
//! ```
//!
//! Edges (task <- dependency): p2 <- q1, p4 <- q5, q2 <- p1, q7 <- r2,
//! r3 <- q4, r4 <- q1.

use crate::graph::{DependencySpec, GraphSpec, ProcessSpec};
use crate::types::TaskPath;

const PROCESSES: [(&str, usize); 3] = [("p", 4), ("q", 7), ("r", 4)];

const DEPENDENCIES: [((&str, &str), (&str, &str)); 6] = [
    (("p", "2"), ("q", "1")),
    (("p", "4"), ("q", "5")),
    (("q", "2"), ("p", "1")),
    (("q", "7"), ("r", "2")),
    (("r", "3"), ("q", "4")),
    (("r", "4"), ("q", "1")),
];

/// The built-in sample graph used when no graph file is given
pub fn reference_graph() -> GraphSpec {
    let processes = PROCESSES
        .iter()
        .map(|&(label, count)| ProcessSpec {
            label: label.to_string(),
            tasks: (1..=count).map(|n| n.to_string()).collect(),
        })
        .collect();

    let dependencies = DEPENDENCIES
        .iter()
        .map(|&((tp, tt), (dp, dt))| DependencySpec {
            task: TaskPath::new(tp, tt),
            depends_on: TaskPath::new(dp, dt),
        })
        .collect();

    GraphSpec {
        processes,
        dependencies,
    }
}
