//! Property tests for flattening and validators on arbitrary graphs

use std::collections::{BTreeSet, HashSet, VecDeque};

use dep_graph::{
    ComponentType, CyclicDependencyValidator, Graph, GraphBuilder, GraphValidator, Settings,
    ValidatorRegistry,
};
use proptest::prelude::*;

fn build(node_count: usize, edges: &[(usize, usize)]) -> Graph {
    let mut builder = GraphBuilder::new();
    let ids: Vec<_> = (0..node_count)
        .map(|i| {
            builder.add_component(format!("n{i}"), "1", ComponentType::FileShare, Settings::new())
        })
        .collect();
    for &(from, to) in edges {
        builder.add_dependency(ids[from], ids[to], "1");
    }
    builder.with_root(ids[0]).build()
}

fn reachable(node_count: usize, edges: &[(usize, usize)]) -> BTreeSet<String> {
    let mut seen = HashSet::from([0usize]);
    let mut queue = VecDeque::from([0usize]);
    while let Some(n) = queue.pop_front() {
        for &(from, to) in edges {
            if from == n && seen.insert(to) {
                queue.push_back(to);
            }
        }
    }
    (0..node_count)
        .filter(|i| seen.contains(i))
        .map(|i| format!("n{i}"))
        .collect()
}

fn flattened_names(graph: &Graph) -> Vec<String> {
    graph
        .flattened(true, true)
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..9).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..24)))
}

proptest! {
    #[test]
    fn flattening_is_idempotent_and_order_independent((n, edges) in arb_graph()) {
        let graph = build(n, &edges);
        let first = flattened_names(&graph);
        let second = flattened_names(&graph);
        prop_assert_eq!(&first, &second);

        let mut reversed_edges = edges.clone();
        reversed_edges.reverse();
        let reversed = build(n, &reversed_edges);

        let as_set = |names: &[String]| names.iter().cloned().collect::<BTreeSet<_>>();
        prop_assert_eq!(as_set(&first), as_set(&flattened_names(&reversed)));
    }

    #[test]
    fn flattening_yields_exactly_the_reachable_nodes((n, edges) in arb_graph()) {
        let graph = build(n, &edges);
        let names = flattened_names(&graph);
        let unique: BTreeSet<_> = names.iter().cloned().collect();

        prop_assert_eq!(names.len(), unique.len(), "duplicate component in flattening");
        prop_assert_eq!(unique, reachable(n, &edges));
    }

    #[test]
    fn every_reported_cycle_is_a_real_cycle((n, edges) in arb_graph()) {
        let graph = build(n, &edges);
        for finding in CyclicDependencyValidator.validate(&graph) {
            let ids = &finding.components;
            prop_assert!(!ids.is_empty());
            for (i, id) in ids.iter().enumerate() {
                let next = ids[(i + 1) % ids.len()];
                prop_assert!(
                    graph.successors(*id).any(|dep| dep.target() == next),
                    "missing edge in reported cycle"
                );
            }
        }
    }

    #[test]
    fn acyclic_graphs_have_no_cycle_findings((n, edges) in arb_graph()) {
        // Keep only forward edges: i -> j with i < j cannot form a cycle
        let forward: Vec<_> = edges.into_iter().filter(|(a, b)| a < b).collect();
        let graph = build(n, &forward);
        prop_assert!(graph.circular_dependencies().is_empty());
    }
}

#[test]
fn registry_reports_both_kinds_of_findings() {
    let mut builder = GraphBuilder::new();
    let app = builder.add_component("app", "1", ComponentType::Local, Settings::new());
    let a = builder.add_component("A", "1", ComponentType::FileShare, Settings::new());
    let b = builder.add_component("B", "1", ComponentType::FileShare, Settings::new());
    let x1 = builder.add_component("X", "1.0", ComponentType::FileShare, Settings::new());
    let x2 = builder.add_component("X", "1.1", ComponentType::FileShare, Settings::new());
    builder.add_dependency(app, a, "1");
    builder.add_dependency(a, b, "1");
    builder.add_dependency(b, a, "1");
    builder.add_dependency(a, x1, "1.0");
    builder.add_dependency(b, x2, "1.1");
    let graph = builder.with_root(app).build();

    let findings = ValidatorRegistry::with_builtins().validate(&graph);
    let validators: Vec<_> = findings.iter().map(|f| f.validator.as_str()).collect();
    assert_eq!(validators, ["CyclicDependencyValidator", "SideBySideValidator"]);
    assert_eq!(graph.circular_dependencies().len(), 1);
    assert_eq!(graph.side_by_side_dependencies().len(), 1);
}
