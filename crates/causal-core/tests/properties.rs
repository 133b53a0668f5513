//! Property tests over generated acyclic graphs
//!
//! Tasks get a rank `position * MAX_PROCESSES + process`. Dependencies only
//! point at tasks of strictly lower rank, so program order and dependency
//! edges together never form a cycle. With at most 15 tasks every pass clocks
//! at least one new task, which keeps resolution inside the default bound.

use causal_core::prelude::*;
use proptest::prelude::*;

const MAX_PROCESSES: usize = 3;
const MAX_TASKS: usize = 5;

#[derive(Clone, Debug)]
struct GeneratedGraph {
    sizes: Vec<usize>,
    edges: Vec<(TaskPath, TaskPath)>,
}

impl GeneratedGraph {
    fn build(&self) -> ClockSystem {
        let mut builder = GraphBuilder::new();
        for (p, &size) in self.sizes.iter().enumerate() {
            builder = builder.process(format!("p{p}"), (1..=size).map(|t| t.to_string()));
        }
        for (task, dep) in &self.edges {
            builder = builder.depends_on(task.clone(), dep.clone());
        }
        builder.build().expect("generated graph is well formed")
    }
}

fn rank(process: usize, position: usize) -> usize {
    position * MAX_PROCESSES + process
}

fn generated_graph() -> impl Strategy<Value = GeneratedGraph> {
    (
        prop::collection::vec(1..=MAX_TASKS, 1..=MAX_PROCESSES),
        prop::collection::vec(prop::option::of(any::<u16>()), MAX_PROCESSES * MAX_TASKS),
    )
        .prop_map(|(sizes, picks)| {
            let all: Vec<(usize, usize)> = sizes
                .iter()
                .enumerate()
                .flat_map(|(p, &size)| (0..size).map(move |pos| (p, pos)))
                .collect();

            let mut edges = Vec::new();
            for (slot, &(p, pos)) in all.iter().enumerate() {
                let Some(pick) = picks[slot] else { continue };
                let candidates: Vec<&(usize, usize)> = all
                    .iter()
                    .filter(|&&(dp, dpos)| rank(dp, dpos) < rank(p, pos))
                    .collect();
                if candidates.is_empty() {
                    continue;
                }
                let &(dp, dpos) = candidates[pick as usize % candidates.len()];
                edges.push((
                    TaskPath::new(format!("p{p}"), (pos + 1).to_string()),
                    TaskPath::new(format!("p{dp}"), (dpos + 1).to_string()),
                ));
            }

            GeneratedGraph { sizes, edges }
        })
}

proptest! {
    #[test]
    fn acyclic_graphs_converge(graph in generated_graph()) {
        let mut system = graph.build();
        prop_assert!(system.check_acyclic().is_ok());

        let report = system.resolve_all().unwrap();

        prop_assert!(report.iterations <= constants::CLOCK_CALCULATION_LIMIT);
        prop_assert!(system.is_resolved());
        prop_assert!(system.arena().iter().all(|(_, task)| task.is_clocked()));
    }

    #[test]
    fn dependencies_precede_dependents(graph in generated_graph()) {
        let mut system = graph.build();
        system.resolve_all().unwrap();
        let arena = system.arena();

        for (_, task) in arena.iter() {
            if let Some(dep) = task.depends_on() {
                prop_assert!(task.clock().unwrap() > arena.clock_of(dep).unwrap());
            }
        }
    }

    #[test]
    fn clocks_strictly_increase_within_process(graph in generated_graph()) {
        let mut system = graph.build();
        system.resolve_all().unwrap();

        for (index, process) in system.processes().iter().enumerate() {
            let clocks: Vec<u64> = (0..process.len())
                .map(|t| system.clock_of(index, t).unwrap())
                .collect();
            prop_assert!(clocks.windows(2).all(|w| w[0] < w[1]), "{:?}", clocks);
        }
    }

    #[test]
    fn order_is_complete_and_sorted(graph in generated_graph()) {
        let mut system = graph.build();
        system.resolve_all().unwrap();
        let order = system.compute_order().unwrap();

        prop_assert_eq!(order.len(), system.task_count());

        let mut seen = order.tasks();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), system.task_count());

        let process_of = |entry: &causal_core::OrderedTask| {
            system.task(entry.task).map(|t| t.process()).unwrap()
        };
        for pair in order.entries().windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.clock <= b.clock);
            if a.clock == b.clock {
                prop_assert!(process_of(a) <= process_of(b));
            }
        }
    }
}
