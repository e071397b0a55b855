//! Arena-backed dependency graph and its builder

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::component::{
    Component, ComponentId, ComponentKey, ComponentType, Dependency, DependencyId,
};
use crate::settings::Settings;
use crate::validation::{
    CyclicDependencyValidator, GraphValidator, SideBySideValidator, ValidationError,
};
use crate::{ComponentName, ComponentVersion};

/// A fully built, read-only dependency graph.
///
/// Holds the validation results of the built-in validators, computed once by
/// [`GraphBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct Graph {
    components: Vec<Component>,
    dependencies: Vec<Dependency>,
    root: Option<ComponentId>,
    root_target_path: Option<PathBuf>,
    side_by_side: Vec<ValidationError>,
    circular: Vec<ValidationError>,
}

impl Graph {
    /// A graph without root, trivially valid.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root_component(&self) -> Option<&Component> {
        self.root.map(|id| self.component(id))
    }

    pub fn root_id(&self) -> Option<ComponentId> {
        self.root
    }

    /// Folder the root's dependencies are materialized under.
    pub fn root_component_target_path(&self) -> Option<&Path> {
        self.root_target_path.as_deref()
    }

    /// Side-by-side findings captured at build time.
    pub fn side_by_side_dependencies(&self) -> &[ValidationError] {
        &self.side_by_side
    }

    /// Cycle findings captured at build time.
    pub fn circular_dependencies(&self) -> &[ValidationError] {
        &self.circular
    }

    /// Resolve a handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different graph.
    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0)
    }

    pub fn dependency(&self, id: DependencyId) -> &Dependency {
        &self.dependencies[id.0]
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Outgoing edges of a component.
    pub fn successors(&self, id: ComponentId) -> impl Iterator<Item = &Dependency> {
        self.component(id)
            .successors
            .iter()
            .map(|dep| &self.dependencies[dep.0])
    }

    /// Incoming edges of a component.
    pub fn predecessors(&self, id: ComponentId) -> impl Iterator<Item = &Dependency> {
        self.component(id)
            .predecessors
            .iter()
            .map(|dep| &self.dependencies[dep.0])
    }

    /// Find a component by name and version.
    pub fn find(&self, name: &str, version: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.name().as_str() == name && c.version().as_str() == version)
    }

    /// Whether neither built-in validator reported anything.
    pub fn is_valid(&self) -> bool {
        self.side_by_side.is_empty() && self.circular.is_empty()
    }

    /// Flatten the graph into each distinct component exactly once.
    ///
    /// Depth-first pre-order following successor insertion order, so the
    /// result is deterministic. `recursive = false` stops at the root's
    /// direct successors; `include_root = false` omits the root.
    pub fn flattened(&self, include_root: bool, recursive: bool) -> Vec<&Component> {
        self.flattened_ids(include_root, recursive)
            .into_iter()
            .map(|id| self.component(id))
            .collect()
    }

    /// Handle-returning variant of [`Graph::flattened`].
    pub fn flattened_ids(&self, include_root: bool, recursive: bool) -> Vec<ComponentId> {
        let Some(root) = self.root else {
            return Vec::new();
        };

        let mut visited = HashSet::from([root]);
        let mut out = Vec::new();
        if include_root {
            out.push(root);
        }

        if recursive {
            let mut stack = vec![root];
            self.flatten_from(root, &mut visited, &mut stack, &mut out);
        } else {
            for dep in self.successors(root) {
                if visited.insert(dep.target) {
                    out.push(dep.target);
                }
            }
        }
        out
    }

    fn flatten_from(
        &self,
        id: ComponentId,
        visited: &mut HashSet<ComponentId>,
        stack: &mut Vec<ComponentId>,
        out: &mut Vec<ComponentId>,
    ) {
        for dep in self.successors(id) {
            let target = dep.target;
            // On-path repeats are cycles, visited ones are diamonds
            if stack.contains(&target) || !visited.insert(target) {
                continue;
            }
            out.push(target);
            stack.push(target);
            self.flatten_from(target, visited, stack, out);
            stack.pop();
        }
    }
}

/// Builds a [`Graph`] in one discovery pass.
///
/// Components are deduplicated by [`ComponentKey`]: adding the same
/// name/version/type twice returns the existing handle, so a logical node
/// never has two in-memory copies.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    components: Vec<Component>,
    dependencies: Vec<Dependency>,
    index: HashMap<ComponentKey, ComponentId>,
    root: Option<ComponentId>,
    root_target_path: Option<PathBuf>,
    fallback: Arc<Settings>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings every component consults when its own mapping lacks a key.
    pub fn with_fallback_settings(mut self, fallback: Settings) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn with_root(mut self, root: ComponentId) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_root_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_target_path = Some(path.into());
        self
    }

    pub fn set_root(&mut self, root: ComponentId) {
        self.root = Some(root);
    }

    /// Look up an already added component.
    pub fn find(&self, key: &ComponentKey) -> Option<ComponentId> {
        self.index.get(key).copied()
    }

    /// Add a component, or return the handle of the identical one already present.
    pub fn add_component(
        &mut self,
        name: impl Into<ComponentName>,
        version: impl Into<ComponentVersion>,
        kind: ComponentType,
        settings: Settings,
    ) -> ComponentId {
        let key = ComponentKey {
            name: name.into(),
            version: version.into(),
            kind,
        };
        if let Some(id) = self.index.get(&key) {
            return *id;
        }

        let id = ComponentId(self.components.len());
        self.index.insert(key.clone(), id);
        self.components.push(Component {
            id,
            key,
            settings,
            fallback: Arc::clone(&self.fallback),
            successors: Vec::new(),
            predecessors: Vec::new(),
        });
        id
    }

    /// Link `source` to `target` with the required version.
    ///
    /// The edge is recorded in `source`'s successors and `target`'s
    /// predecessors.
    ///
    /// # Panics
    ///
    /// Panics if either handle was not issued by this builder.
    pub fn add_dependency(
        &mut self,
        source: ComponentId,
        target: ComponentId,
        version: impl Into<ComponentVersion>,
    ) -> DependencyId {
        assert!(
            source.0 < self.components.len() && target.0 < self.components.len(),
            "dependency endpoints must belong to this builder"
        );
        let id = DependencyId(self.dependencies.len());
        self.dependencies.push(Dependency {
            id,
            source,
            target,
            version: version.into(),
        });
        self.components[source.0].successors.push(id);
        self.components[target.0].predecessors.push(id);
        id
    }

    /// Finish the graph and run the built-in validators once.
    pub fn build(self) -> Graph {
        let mut components = self.components;
        for component in &mut components {
            component.fallback = Arc::clone(&self.fallback);
        }

        let mut graph = Graph {
            components,
            dependencies: self.dependencies,
            root: self.root,
            root_target_path: self.root_target_path,
            side_by_side: Vec::new(),
            circular: Vec::new(),
        };
        graph.circular = CyclicDependencyValidator.validate(&graph);
        graph.side_by_side = SideBySideValidator.validate(&graph);

        if !graph.is_valid() {
            tracing::warn!(
                circular = graph.circular.len(),
                side_by_side = graph.side_by_side.len(),
                "Dependency graph has validation findings"
            );
        }
        graph
    }
}
