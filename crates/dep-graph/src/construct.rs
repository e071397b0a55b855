//! Graph construction through resolvers
//!
//! Expansion is depth-first from the root definition. Each logical node
//! (name, version, type) is expanded at most once; later edges to it are
//! linked to the existing component. Cycles therefore end expansion without
//! disappearing from the graph, and [`CyclicDependencyValidator`] reports
//! them afterwards.
//!
//! [`CyclicDependencyValidator`]: crate::CyclicDependencyValidator

use std::collections::HashSet;
use std::path::PathBuf;

use crate::{
    ComponentDefinition, ComponentId, ComponentKey, ComponentType, Error, Graph, GraphBuilder,
    ResolverRegistry, Result, Settings,
};

/// Name given to a root definition that does not declare one.
pub const DEFAULT_ROOT_NAME: &str = "root";
/// Version given to a root definition that does not declare one.
pub const DEFAULT_ROOT_VERSION: &str = "local";

/// Builds a [`Graph`] by expanding definitions through a [`ResolverRegistry`].
#[derive(Debug)]
pub struct GraphConstructor<'a> {
    resolvers: &'a ResolverRegistry,
    fallback: Settings,
}

impl<'a> GraphConstructor<'a> {
    pub fn new(resolvers: &'a ResolverRegistry) -> Self {
        Self {
            resolvers,
            fallback: Settings::new(),
        }
    }

    /// Settings consulted by every component when its own lack a key.
    pub fn with_fallback_settings(mut self, fallback: Settings) -> Self {
        self.fallback = fallback;
        self
    }

    /// Construct the graph rooted at `root`, materialized under `target_path`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a dependency's type has no resolver or the required
    ///   version does not exist
    /// - `Connection` if a store cannot be reached
    /// - `DefinitionParse` if a definition document is malformed
    pub fn construct(
        &self,
        root: &ComponentDefinition,
        target_path: impl Into<PathBuf>,
    ) -> Result<Graph> {
        let mut builder = GraphBuilder::new()
            .with_fallback_settings(self.fallback.clone())
            .with_root_target_path(target_path);

        let root_key = ComponentKey {
            name: root.name.clone().unwrap_or_else(|| DEFAULT_ROOT_NAME.into()),
            version: root
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_ROOT_VERSION.into()),
            kind: ComponentType::Local,
        };
        let root_id = builder.add_component(
            root_key.name.clone(),
            root_key.version.clone(),
            root_key.kind,
            root.settings.clone(),
        );
        builder.set_root(root_id);

        let mut expanded = HashSet::from([root_key]);
        self.expand(&mut builder, root_id, root, &mut expanded)?;

        let graph = builder.build();
        tracing::info!(
            components = graph.component_count(),
            "Constructed dependency graph"
        );
        Ok(graph)
    }

    fn expand(
        &self,
        builder: &mut GraphBuilder,
        from: ComponentId,
        definition: &ComponentDefinition,
        expanded: &mut HashSet<ComponentKey>,
    ) -> Result<()> {
        for dep in &definition.dependencies {
            let effective = dep.settings.merged_over(&self.fallback);
            let resolver = self.resolvers.create(dep.kind, &effective)?;

            if !resolver.exists(&dep.name, Some(&dep.version))? {
                return Err(Error::not_found(format!(
                    "{}@{} ({})",
                    dep.name, dep.version, dep.kind
                )));
            }

            let target = builder.add_component(
                dep.name.clone(),
                dep.version.clone(),
                dep.kind,
                dep.settings.clone(),
            );
            builder.add_dependency(from, target, dep.version.clone());

            let key = ComponentKey {
                name: dep.name.clone(),
                version: dep.version.clone(),
                kind: dep.kind,
            };
            if !expanded.insert(key) {
                tracing::debug!(component = %dep.name, version = %dep.version, "Already expanded");
                continue;
            }

            if let Some(child) = resolver.load_component_definition(&dep.name, &dep.version)? {
                self.expand(builder, target, &child, expanded)?;
            }
        }
        Ok(())
    }
}
