use std::collections::BTreeMap;

use super::{GraphValidator, ValidationError};
use crate::{ComponentId, ComponentKey, ComponentName, Graph};

/// Reports components required at more than one version in the closure.
///
/// Components with `IgnoreInSideBySideAnomalyChecks = True` take no part in
/// the check.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideBySideValidator;

impl SideBySideValidator {
    pub const NAME: &'static str = "SideBySideValidator";
}

impl GraphValidator for SideBySideValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, graph: &Graph) -> Vec<ValidationError> {
        let mut by_name: BTreeMap<&ComponentName, Vec<(ComponentId, &ComponentKey)>> =
            BTreeMap::new();

        for component in graph.flattened(true, true) {
            if component.ignored_in_side_by_side_checks() {
                tracing::debug!(component = %component, "Excluded from side-by-side check");
                continue;
            }
            let group = by_name.entry(component.name()).or_default();
            if !group.iter().any(|(_, key)| *key == component.key()) {
                group.push((component.id(), component.key()));
            }
        }

        by_name
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .map(|(name, group)| {
                let versions: Vec<String> = group
                    .iter()
                    .map(|(_, key)| format!("{} ({})", key.version, key.kind))
                    .collect();
                ValidationError::new(
                    Self::NAME,
                    format!(
                        "Component '{}' is referenced side by side in versions: {}",
                        name,
                        versions.join(", ")
                    ),
                    group.into_iter().map(|(id, _)| id).collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComponentType, GraphBuilder, SettingKey, Settings};
    use pretty_assertions::assert_eq;

    fn conflicting(ignore_second: bool) -> Graph {
        let mut b = GraphBuilder::new();
        let root = b.add_component("app", "1", ComponentType::Local, Settings::new());
        let left = b.add_component("left", "1", ComponentType::FileShare, Settings::new());
        let x10 = b.add_component("X", "1.0", ComponentType::FileShare, Settings::new());
        let x11_settings = if ignore_second {
            Settings::new().with(SettingKey::IgnoreInSideBySideAnomalyChecks, "True")
        } else {
            Settings::new()
        };
        let x11 = b.add_component("X", "1.1", ComponentType::FileShare, x11_settings);
        b.add_dependency(root, left, "1");
        b.add_dependency(left, x10, "1.0");
        b.add_dependency(root, x11, "1.1");
        b.with_root(root).build()
    }

    #[test]
    fn two_versions_yield_one_finding() {
        let graph = conflicting(false);
        let findings = SideBySideValidator.validate(&graph);

        assert_eq!(findings.len(), 1);
        let versions: Vec<&str> = findings[0]
            .components
            .iter()
            .map(|id| graph.component(*id).version().as_str())
            .collect();
        assert_eq!(versions, ["1.0", "1.1"]);
        assert!(findings[0].message.contains("1.0 (FileShare)"));
        assert!(findings[0].message.contains("1.1 (FileShare)"));
        assert_eq!(graph.side_by_side_dependencies(), findings.as_slice());
    }

    #[test]
    fn ignored_instance_suppresses_finding() {
        let graph = conflicting(true);
        assert!(SideBySideValidator.validate(&graph).is_empty());
    }

    #[test]
    fn same_version_via_two_paths_is_fine() {
        let mut b = GraphBuilder::new();
        let root = b.add_component("app", "1", ComponentType::Local, Settings::new());
        let a = b.add_component("a", "1", ComponentType::FileShare, Settings::new());
        let x = b.add_component("X", "1.0", ComponentType::FileShare, Settings::new());
        b.add_dependency(root, a, "1");
        b.add_dependency(root, x, "1.0");
        b.add_dependency(a, x, "1.0");
        let graph = b.with_root(root).build();

        assert!(SideBySideValidator.validate(&graph).is_empty());
    }

    #[test]
    fn unreachable_components_are_not_checked() {
        let mut b = GraphBuilder::new();
        let root = b.add_component("app", "1", ComponentType::Local, Settings::new());
        let x = b.add_component("X", "1.0", ComponentType::FileShare, Settings::new());
        b.add_component("X", "2.0", ComponentType::FileShare, Settings::new());
        b.add_dependency(root, x, "1.0");
        let graph = b.with_root(root).build();

        assert!(SideBySideValidator.validate(&graph).is_empty());
    }
}
