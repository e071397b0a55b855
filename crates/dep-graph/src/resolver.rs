//! Component discovery capability and the file-share resolver
//!
//! A resolver answers "which components/versions exist" and "what does this
//! version depend on" for one backing store. "Not found" is reported through
//! `Ok(false)` / `Ok(None)`; failing to reach the store at all is an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::definition::{ComponentDefinition, DEFINITION_FILE};
use crate::{ComponentName, ComponentType, ComponentVersion, Error, Result, SettingKey, Settings};

/// Per-backend component discovery.
pub trait Resolver: Send + Sync {
    /// Names of all components available in the store.
    fn list_component_names(&self) -> Result<Vec<ComponentName>>;

    /// Versions available for a component.
    fn list_versions(&self, name: &ComponentName) -> Result<Vec<ComponentVersion>>;

    /// Definition document of a version, `None` when it has none.
    fn load_component_definition(
        &self,
        name: &ComponentName,
        version: &ComponentVersion,
    ) -> Result<Option<ComponentDefinition>>;

    /// Whether a component (and optionally a specific version) exists.
    fn exists(&self, name: &ComponentName, version: Option<&ComponentVersion>) -> Result<bool>;
}

type ResolverConstructor = dyn Fn(&Settings) -> Result<Box<dyn Resolver>> + Send + Sync;

/// Resolver constructors keyed by component type.
///
/// Resolvers are built per dependency entry because their location comes
/// from that entry's settings.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    constructors: HashMap<ComponentType, Arc<ResolverConstructor>>,
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.constructors.keys().map(|k| k.as_str()).collect();
        kinds.sort();
        f.debug_struct("ResolverRegistry").field("kinds", &kinds).finish()
    }
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the file-share resolver for every directory-backed type.
    pub fn with_file_share() -> Self {
        let mut registry = Self::new();
        for kind in [
            ComponentType::FileShare,
            ComponentType::BuildResult,
            ComponentType::VNextBuildResult,
            ComponentType::Local,
        ] {
            registry.register(kind, |settings| {
                let root = settings.require(SettingKey::FileShareRootPath)?;
                Ok(Box::new(FileShareResolver::new(root)) as Box<dyn Resolver>)
            });
        }
        registry
    }

    /// Register (or replace) the constructor for a component type.
    pub fn register<F>(&mut self, kind: ComponentType, constructor: F)
    where
        F: Fn(&Settings) -> Result<Box<dyn Resolver>> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Arc::new(constructor));
    }

    pub fn supports(&self, kind: ComponentType) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Build the resolver for a dependency entry.
    pub fn create(&self, kind: ComponentType, settings: &Settings) -> Result<Box<dyn Resolver>> {
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| Error::not_found(format!("resolver for component type {kind}")))?;
        constructor(settings)
    }
}

/// Resolver over a `<root>/<name>/<version>/component.toml` directory layout.
#[derive(Debug, Clone)]
pub struct FileShareResolver {
    root: PathBuf,
}

impl FileShareResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(Error::Connection {
                location: self.root.display().to_string(),
                reason: "file share root is not an accessible directory".into(),
            })
        }
    }

    fn subdirectories(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| dep_fs::Error::io(dir, e))? {
            let entry = entry.map_err(|e| dep_fs::Error::io(dir, e))?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Resolver for FileShareResolver {
    fn list_component_names(&self) -> Result<Vec<ComponentName>> {
        self.ensure_reachable()?;
        Ok(self
            .subdirectories(&self.root)?
            .into_iter()
            .map(ComponentName::from)
            .collect())
    }

    fn list_versions(&self, name: &ComponentName) -> Result<Vec<ComponentVersion>> {
        self.ensure_reachable()?;
        let dir = self.root.join(name.as_str());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(self
            .subdirectories(&dir)?
            .into_iter()
            .map(ComponentVersion::from)
            .collect())
    }

    fn load_component_definition(
        &self,
        name: &ComponentName,
        version: &ComponentVersion,
    ) -> Result<Option<ComponentDefinition>> {
        self.ensure_reachable()?;
        let path = self
            .root
            .join(name.as_str())
            .join(version.as_str())
            .join(DEFINITION_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| dep_fs::Error::io(&path, e))?;
        ComponentDefinition::from_toml(&content, &path.display().to_string()).map(Some)
    }

    fn exists(&self, name: &ComponentName, version: Option<&ComponentVersion>) -> Result<bool> {
        self.ensure_reachable()?;
        let mut dir = self.root.join(name.as_str());
        if let Some(version) = version {
            dir = dir.join(version.as_str());
        }
        Ok(dir.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn share() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("libfoo/1.0")).unwrap();
        fs::create_dir_all(dir.path().join("libfoo/1.1")).unwrap();
        fs::create_dir_all(dir.path().join("libbar/2.0")).unwrap();
        fs::write(
            dir.path().join("libfoo/1.1").join(DEFINITION_FILE),
            "[[dependency]]\nname = \"libbar\"\nversion = \"2.0\"\ntype = \"FileShare\"\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn lists_names_and_versions_sorted() {
        let dir = share();
        let resolver = FileShareResolver::new(dir.path());

        let names: Vec<String> = resolver
            .list_component_names()
            .unwrap()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, ["libbar", "libfoo"]);

        let versions = resolver.list_versions(&"libfoo".into()).unwrap();
        assert_eq!(versions, vec![ComponentVersion::from("1.0"), "1.1".into()]);
        assert!(resolver.list_versions(&"nope".into()).unwrap().is_empty());
    }

    #[test]
    fn missing_definition_is_none_not_error() {
        let dir = share();
        let resolver = FileShareResolver::new(dir.path());
        assert!(resolver
            .load_component_definition(&"libfoo".into(), &"1.0".into())
            .unwrap()
            .is_none());
        let def = resolver
            .load_component_definition(&"libfoo".into(), &"1.1".into())
            .unwrap()
            .unwrap();
        assert_eq!(def.dependencies[0].name.as_str(), "libbar");
    }

    #[test]
    fn exists_distinguishes_absent_from_unreachable() {
        let dir = share();
        let resolver = FileShareResolver::new(dir.path());
        assert!(resolver.exists(&"libfoo".into(), None).unwrap());
        assert!(resolver.exists(&"libfoo".into(), Some(&"1.0".into())).unwrap());
        assert!(!resolver.exists(&"libfoo".into(), Some(&"9.9".into())).unwrap());

        let unreachable = FileShareResolver::new(dir.path().join("no-such-share"));
        assert!(matches!(
            unreachable.exists(&"libfoo".into(), None),
            Err(Error::Connection { .. })
        ));
    }

    #[test]
    fn registry_requires_root_setting() {
        let registry = ResolverRegistry::with_file_share();
        assert!(matches!(
            registry.create(ComponentType::FileShare, &Settings::new()),
            Err(Error::Configuration { .. })
        ));
        assert!(matches!(
            registry.create(ComponentType::Subversion, &Settings::new()),
            Err(Error::NotFound { .. })
        ));
    }
}
