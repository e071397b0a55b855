//! Project context shared by all commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dep_fs::{NormalizedPath, io};
use dep_git::{GitRemote, GitResolver};
use dep_graph::{ComponentDefinition, DEFINITION_FILE, Graph, GraphConstructor, ResolverRegistry};
use dep_sync::{BackendClients, DownloaderFactory, EngineConfig, WatermarkStore};

use crate::error::{CliError, Result};

/// Engine configuration location inside the project.
pub const CONFIG_FILE: &str = ".depman/config.toml";

/// A project folder with its root definition and engine configuration.
#[derive(Debug)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub definition: ComponentDefinition,
    pub config: EngineConfig,
}

impl ProjectContext {
    /// Load `component.toml` and `.depman/config.toml` from `project`.
    pub fn load(project: &Path) -> Result<Self> {
        let root = io::canonicalize(project).map_err(|_| {
            CliError::user(format!("project folder {} does not exist", project.display()))
        })?;
        let definition_path = root.join(DEFINITION_FILE);
        if !definition_path.is_file() {
            return Err(CliError::user(format!(
                "no {DEFINITION_FILE} found in {}",
                root.display()
            )));
        }
        let content = io::read_text(&NormalizedPath::new(&definition_path))?;
        let location = definition_path.display().to_string();
        let definition = ComponentDefinition::from_toml(&content, &location)?;
        let config = EngineConfig::load(root.join(CONFIG_FILE))?;
        tracing::debug!(root = %root.display(), "Loaded project");

        Ok(Self {
            root,
            definition,
            config,
        })
    }

    pub fn resolvers(&self) -> ResolverRegistry {
        let mut registry = ResolverRegistry::with_file_share();
        if let Some(path) = self.config.version_control_path(&self.root) {
            GitResolver::register(&mut registry, path);
        }
        registry
    }

    /// Construct the project graph with components placed under `target`.
    pub fn graph(&self, target: &Path) -> Result<Graph> {
        let resolvers = self.resolvers();
        Ok(GraphConstructor::new(&resolvers)
            .with_fallback_settings(self.config.defaults.clone())
            .construct(&self.definition, target)?)
    }

    pub fn factory(&self) -> Result<DownloaderFactory> {
        let mut clients = BackendClients::default();
        if let Some(path) = self.config.version_control_path(&self.root) {
            clients = clients.with_version_control(Arc::new(GitRemote::open(path)?));
        }
        Ok(DownloaderFactory::new(clients, self.config.sync_options()))
    }

    pub fn store(&self) -> Result<WatermarkStore> {
        Ok(WatermarkStore::open(
            self.config.watermark_path(&self.root),
            self.config.robustness(),
        )?)
    }
}
