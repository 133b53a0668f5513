//! Graph construction and happens-before analysis
//!
//! A clock system is built from a declarative description: processes with
//! their task labels, plus an edge list of `task <- depends_on` pairs. The
//! description can be assembled in code with [`GraphBuilder`] or loaded from
//! a file as a [`GraphSpec`]:
//!
//! ```toml
//! [[process]]
//! label = "p"
//! tasks = ["1", "2"]
//!
//! [[dependency]]
//! task = "p/2"
//! depends_on = "q/1"
//! ```
//!
//! [`HappensBefore`] turns a built system into a petgraph DAG combining
//! program order with dependency edges, used to name the tasks of a cycle
//! when resolution cannot converge.

use hashbrown::{HashMap, HashSet};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::ResolverConfig;
use crate::error::{ClockError, Result};
use crate::process::Process;
use crate::system::ClockSystem;
use crate::task::{Task, TaskArena};
use crate::types::{constants, TaskId, TaskPath};

/// Declared process: a label and its task labels in sequence order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub label: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Declared dependency edge: `task` happens after `depends_on`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub task: TaskPath,
    pub depends_on: TaskPath,
}

/// Serializable description of a process/task graph
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    #[serde(default, rename = "process")]
    pub processes: Vec<ProcessSpec>,

    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencySpec>,
}

impl GraphSpec {
    pub fn task_count(&self) -> usize {
        self.processes.iter().map(|p| p.tasks.len()).sum()
    }

    /// Build a clock system with the given resolver settings
    pub fn build(&self, config: ResolverConfig) -> Result<ClockSystem> {
        let mut builder = GraphBuilder::new().config(config);
        for process in &self.processes {
            builder = builder.process(&process.label, &process.tasks);
        }
        for edge in &self.dependencies {
            builder = builder.depends_on(edge.task.clone(), edge.depends_on.clone());
        }
        builder.build()
    }
}

/// Builder for a fully wired [`ClockSystem`]
///
/// Declarations are recorded as given and validated together in
/// [`GraphBuilder::build`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    processes: Vec<ProcessSpec>,
    dependencies: Vec<DependencySpec>,
    config: ResolverConfig,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare a process and its tasks in sequence order
    pub fn process<I, S>(mut self, label: impl Into<String>, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.processes.push(ProcessSpec {
            label: label.into(),
            tasks: tasks.into_iter().map(|t| t.as_ref().to_string()).collect(),
        });
        self
    }

    /// Declare that `task` happens after `depends_on`
    pub fn depends_on(mut self, task: TaskPath, depends_on: TaskPath) -> Self {
        self.dependencies.push(DependencySpec { task, depends_on });
        self
    }

    /// Same as [`GraphBuilder::depends_on`], with `process/task` strings
    pub fn edge(self, task: &str, depends_on: &str) -> Result<Self> {
        Ok(self.depends_on(task.parse()?, depends_on.parse()?))
    }

    pub fn build(self) -> Result<ClockSystem> {
        self.config.validate()?;

        let mut arena = TaskArena::new();
        let mut processes = Vec::with_capacity(self.processes.len());
        let mut process_labels = HashSet::new();
        let mut index: HashMap<TaskPath, TaskId> = HashMap::new();

        for (process_index, spec) in self.processes.iter().enumerate() {
            check_label(&spec.label)?;
            if spec.label.contains(constants::TASK_PATH_SEPARATOR) {
                return Err(ClockError::InvalidLabel {
                    label: spec.label.clone(),
                    reason: "contains the task path separator",
                });
            }
            if !process_labels.insert(spec.label.as_str()) {
                return Err(ClockError::DuplicateProcess(spec.label.clone()));
            }

            let mut process = Process::new(spec.label.clone());
            for label in &spec.tasks {
                check_label(label)?;
                let path = TaskPath::new(spec.label.clone(), label.clone());
                if index.contains_key(&path) {
                    return Err(ClockError::DuplicateTask(path));
                }
                let id = arena.push(Task::new(label.clone(), process_index));
                process.push_task(id);
                index.insert(path, id);
            }
            processes.push(process);
        }

        let lookup = |path: &TaskPath| -> Result<TaskId> {
            if !process_labels.contains(path.process.as_str()) {
                return Err(ClockError::UnknownProcess(path.process.clone()));
            }
            index
                .get(path)
                .copied()
                .ok_or_else(|| ClockError::UnknownTask(path.clone()))
        };

        let mut wired: HashMap<TaskId, &TaskPath> = HashMap::new();
        for edge in &self.dependencies {
            let task = lookup(&edge.task)?;
            let dependency = lookup(&edge.depends_on)?;

            if let Some(existing) = wired.get(&task) {
                return Err(ClockError::DependencyAlreadySet {
                    task: edge.task.clone(),
                    existing: (*existing).clone(),
                });
            }
            wired.insert(task, &edge.depends_on);

            if let Some(t) = arena.get_mut(task) {
                t.set_depends_on(dependency);
            }
        }

        tracing::debug!(
            processes = processes.len(),
            tasks = arena.len(),
            dependencies = wired.len(),
            "clock system built"
        );

        Ok(ClockSystem::from_parts(processes, arena, self.config))
    }
}

/// Labels must survive being written into and parsed back from a [`TaskPath`]
fn check_label(label: &str) -> Result<()> {
    let reason = if label.is_empty() {
        "is empty"
    } else if label.trim() != label {
        "has leading or trailing whitespace"
    } else {
        return Ok(());
    };
    Err(ClockError::InvalidLabel {
        label: label.to_string(),
        reason,
    })
}

/// Happens-before graph of a clock system
///
/// Nodes are tasks (node index == arena index). Edges run from each task to
/// its successor in the same process and from each dependency to its
/// dependent task.
pub struct HappensBefore {
    graph: DiGraph<TaskId, ()>,
}

impl HappensBefore {
    pub(crate) fn new(processes: &[Process], arena: &TaskArena) -> Self {
        let mut graph = DiGraph::with_capacity(arena.len(), arena.len() * 2);
        for (id, _) in arena.iter() {
            graph.add_node(id);
        }

        for process in processes {
            for pair in process.tasks().windows(2) {
                graph.add_edge(node(pair[0]), node(pair[1]), ());
            }
        }

        for (id, task) in arena.iter() {
            if let Some(dep) = task.depends_on() {
                graph.add_edge(node(dep), node(id), ());
            }
        }

        Self { graph }
    }

    /// Direct happens-before predecessors of a task
    pub fn predecessors(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct happens-before successors of a task
    pub fn successors(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: TaskId, direction: Direction) -> Vec<TaskId> {
        if id.index() >= self.graph.node_count() {
            return Vec::new();
        }
        let mut out: Vec<TaskId> = self
            .graph
            .neighbors_directed(node(id), direction)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        out.sort();
        out
    }

    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    /// One cycle, as the sequence of tasks walked before returning to the first
    pub fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut components = tarjan_scc(&self.graph);
        components.sort_by_key(|component| component.iter().map(|n| n.index()).min());

        for component in components {
            let start = component.iter().copied().min()?;
            if component.len() == 1 {
                if self.graph.contains_edge(start, start) {
                    return Some(vec![TaskId::new(start.index())]);
                }
                continue;
            }
            let members: HashSet<NodeIndex> = component.into_iter().collect();
            return self.walk_cycle(start, &members);
        }

        None
    }

    /// Shortest path from `start` back to itself inside one strongly connected component
    fn walk_cycle(&self, start: NodeIndex, members: &HashSet<NodeIndex>) -> Option<Vec<TaskId>> {
        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = self.graph.neighbors(current).collect();
            next.sort();
            for n in next {
                if !members.contains(&n) {
                    continue;
                }
                if n == start {
                    let mut path = vec![current];
                    let mut cursor = current;
                    while let Some(&p) = previous.get(&cursor) {
                        path.push(p);
                        cursor = p;
                    }
                    path.reverse();
                    return Some(path.into_iter().map(|n| TaskId::new(n.index())).collect());
                }
                if !previous.contains_key(&n) {
                    previous.insert(n, current);
                    queue.push_back(n);
                }
            }
        }

        None
    }
}

fn node(id: TaskId) -> NodeIndex {
    NodeIndex::new(id.index())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> TaskPath {
        raw.parse().unwrap()
    }

    #[test]
    fn test_builder_wires_dependencies() {
        let system = GraphBuilder::new()
            .process("p", ["1", "2"])
            .process("q", ["1"])
            .edge("p/2", "q/1")
            .unwrap()
            .build()
            .unwrap();

        let p2 = system.task_id(&path("p/2")).unwrap();
        let q1 = system.task_id(&path("q/1")).unwrap();
        assert_eq!(system.arena().get(p2).unwrap().depends_on(), Some(q1));
        assert_eq!(system.dependents_of(q1), vec![p2]);
    }

    #[test]
    fn test_unknown_references() {
        let err = GraphBuilder::new()
            .process("p", ["1"])
            .edge("p/1", "z/1")
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, ClockError::UnknownProcess("z".into()));

        let err = GraphBuilder::new()
            .process("p", ["1"])
            .edge("p/9", "p/1")
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, ClockError::UnknownTask(path("p/9")));
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = GraphBuilder::new()
            .process("p", ["1"])
            .process("p", ["2"])
            .build()
            .unwrap_err();
        assert_eq!(err, ClockError::DuplicateProcess("p".into()));

        let err = GraphBuilder::new().process("p", ["1", "1"]).build().unwrap_err();
        assert_eq!(err, ClockError::DuplicateTask(path("p/1")));
    }

    #[test]
    fn test_second_dependency_rejected() {
        let err = GraphBuilder::new()
            .process("p", ["1"])
            .process("q", ["1", "2"])
            .edge("p/1", "q/1")
            .unwrap()
            .edge("p/1", "q/2")
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            ClockError::DependencyAlreadySet {
                task: path("p/1"),
                existing: path("q/1"),
            }
        );
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: GraphSpec = toml::from_str(
            r#"
            [[process]]
            label = "a"
            tasks = ["1", "2"]

            [[process]]
            label = "b"
            tasks = ["1"]

            [[dependency]]
            task = "b/1"
            depends_on = "a/2"
            "#,
        )
        .unwrap();

        assert_eq!(spec.task_count(), 3);
        assert_eq!(spec.dependencies[0].depends_on, path("a/2"));
        assert!(spec.build(ResolverConfig::default()).is_ok());
    }

    #[test]
    fn test_process_label_with_separator_rejected() {
        let err = GraphBuilder::new()
            .process("a/b", ["1"])
            .process("c", ["1"])
            .build()
            .unwrap_err();

        assert_eq!(err.code(), 2005);
        assert!(matches!(err, ClockError::InvalidLabel { ref label, .. } if label == "a/b"));
    }

    #[test]
    fn test_blank_or_padded_labels_rejected() {
        for (process, task) in [("", "1"), (" p", "1"), ("p ", "1"), ("p", ""), ("p", " 1")] {
            let result = GraphBuilder::new().process(process, [task]).build();
            assert!(
                matches!(result, Err(ClockError::InvalidLabel { .. })),
                "{process:?}/{task:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_spec_survives_toml_roundtrip() {
        // Task labels may contain the separator: paths split at the first one
        let spec = GraphBuilder::new()
            .process("a", ["1", "x/2"])
            .process("c", ["1"])
            .edge("c/1", "a/x/2")
            .unwrap();
        let spec = GraphSpec {
            processes: spec.processes,
            dependencies: spec.dependencies,
        };
        assert!(spec.build(ResolverConfig::default()).is_ok());

        let reloaded: GraphSpec = toml::from_str(&toml::to_string(&spec).unwrap()).unwrap();

        assert_eq!(reloaded, spec);
        let mut system = reloaded.build(ResolverConfig::default()).unwrap();
        system.resolve_all().unwrap();
        assert_eq!(system.clock_of(1, 0), Ok(3));
    }

    #[test]
    fn test_happens_before_edges() {
        let system = GraphBuilder::new()
            .process("p", ["1", "2"])
            .process("q", ["1"])
            .edge("q/1", "p/1")
            .unwrap()
            .build()
            .unwrap();
        let graph = system.happens_before();

        let p1 = system.task_id(&path("p/1")).unwrap();
        let p2 = system.task_id(&path("p/2")).unwrap();
        let q1 = system.task_id(&path("q/1")).unwrap();

        assert_eq!(graph.successors(p1), vec![p2, q1]);
        assert_eq!(graph.predecessors(q1), vec![p1]);
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_mutual_dependency_cycle() {
        let system = GraphBuilder::new()
            .process("a", ["1"])
            .process("b", ["1"])
            .edge("a/1", "b/1")
            .unwrap()
            .edge("b/1", "a/1")
            .unwrap()
            .build()
            .unwrap();

        let cycle = system.happens_before().find_cycle().unwrap();
        assert_eq!(cycle.len(), 2);
    }

    #[test]
    fn test_cycle_through_program_order() {
        // p2 waits on q1, q1 waits on p2's successor p3
        let system = GraphBuilder::new()
            .process("p", ["1", "2", "3"])
            .process("q", ["1"])
            .edge("p/2", "q/1")
            .unwrap()
            .edge("q/1", "p/3")
            .unwrap()
            .build()
            .unwrap();

        let cycle = system.happens_before().find_cycle().unwrap();
        let labels: Vec<String> = cycle
            .iter()
            .map(|&id| system.task_path(id).unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["p/2", "p/3", "q/1"]);
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let system = GraphBuilder::new()
            .process("p", ["1"])
            .edge("p/1", "p/1")
            .unwrap()
            .build()
            .unwrap();

        let cycle = system.happens_before().find_cycle().unwrap();
        assert_eq!(cycle.len(), 1);
    }
}
