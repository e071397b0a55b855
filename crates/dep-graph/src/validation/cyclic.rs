use std::collections::HashSet;

use super::{GraphValidator, ValidationError};
use crate::{ComponentId, Graph};

/// Reports every cycle reachable from the root.
///
/// Depth-first walk keeping a global visited set and the current path. An
/// edge back onto the path produces one finding holding the path from the
/// repeated node's position to the current node. Nodes fully explored on
/// another path are not walked again, so one physical cycle is reported once.
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclicDependencyValidator;

impl CyclicDependencyValidator {
    pub const NAME: &'static str = "CyclicDependencyValidator";

    fn visit(
        graph: &Graph,
        id: ComponentId,
        visited: &mut HashSet<ComponentId>,
        stack: &mut Vec<ComponentId>,
        findings: &mut Vec<ValidationError>,
    ) {
        visited.insert(id);
        stack.push(id);

        for dep in graph.successors(id) {
            let target = dep.target();
            if let Some(pos) = stack.iter().position(|&on_path| on_path == target) {
                let cycle = stack[pos..].to_vec();
                findings.push(ValidationError::new(
                    Self::NAME,
                    describe(graph, &cycle),
                    cycle,
                ));
                continue;
            }
            if visited.contains(&target) {
                continue;
            }
            Self::visit(graph, target, visited, stack, findings);
        }

        stack.pop();
    }
}

fn describe(graph: &Graph, cycle: &[ComponentId]) -> String {
    let mut path: Vec<String> = cycle
        .iter()
        .map(|id| {
            let c = graph.component(*id);
            format!("{}@{}", c.name(), c.version())
        })
        .collect();
    if let Some(first) = path.first().cloned() {
        path.push(first);
    }
    format!("Circular dependency detected: {}", path.join(" -> "))
}

impl GraphValidator for CyclicDependencyValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, graph: &Graph) -> Vec<ValidationError> {
        let mut findings = Vec::new();
        if let Some(root) = graph.root_id() {
            let mut visited = HashSet::new();
            let mut stack = Vec::new();
            Self::visit(graph, root, &mut visited, &mut stack, &mut findings);
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComponentType, GraphBuilder, Settings};
    use pretty_assertions::assert_eq;

    fn cycle_names(graph: &Graph) -> Vec<Vec<String>> {
        CyclicDependencyValidator
            .validate(graph)
            .iter()
            .map(|e| {
                e.components
                    .iter()
                    .map(|id| graph.component(*id).name().to_string())
                    .collect()
            })
            .collect()
    }

    fn chain(edges: &[(&str, &str)], root: &str) -> Graph {
        let mut b = GraphBuilder::new();
        for (from, to) in edges {
            let f = b.add_component(*from, "1", ComponentType::FileShare, Settings::new());
            let t = b.add_component(*to, "1", ComponentType::FileShare, Settings::new());
            b.add_dependency(f, t, "1");
        }
        let root = b.add_component(root, "1", ComponentType::FileShare, Settings::new());
        b.with_root(root).build()
    }

    #[test]
    fn three_node_cycle_reported_once() {
        let graph = chain(&[("A", "B"), ("B", "C"), ("C", "A")], "A");
        assert_eq!(cycle_names(&graph), [["A", "B", "C"]]);
    }

    #[test]
    fn self_loop_is_single_element_cycle() {
        let graph = chain(&[("A", "A")], "A");
        assert_eq!(cycle_names(&graph), [["A"]]);
    }

    #[test]
    fn edge_disjoint_cycles_reported_separately() {
        let graph = chain(&[("A", "B"), ("B", "A"), ("A", "C"), ("C", "A")], "A");
        assert_eq!(cycle_names(&graph), [["A", "B"], ["A", "C"]]);
    }

    #[test]
    fn cycle_below_root_excludes_prefix() {
        let graph = chain(&[("R", "A"), ("A", "B"), ("B", "A")], "R");
        assert_eq!(cycle_names(&graph), [["A", "B"]]);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let graph = chain(&[("R", "A"), ("R", "B"), ("A", "C"), ("B", "C")], "R");
        assert!(cycle_names(&graph).is_empty());
    }

    #[test]
    fn message_names_the_path() {
        let graph = chain(&[("A", "B"), ("B", "A")], "A");
        let findings = CyclicDependencyValidator.validate(&graph);
        assert_eq!(
            findings[0].message,
            "Circular dependency detected: A@1 -> B@1 -> A@1"
        );
        assert_eq!(findings[0].validator, CyclicDependencyValidator::NAME);
    }
}
