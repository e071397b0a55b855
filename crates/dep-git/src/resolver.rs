//! Component discovery over `<name>/<version>` tags

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dep_graph::{
    ComponentDefinition, ComponentName, ComponentType, ComponentVersion, DEFINITION_FILE, Resolver,
    ResolverRegistry,
};
use git2::Repository;

/// Component types served from version control.
pub const VERSION_CONTROL_TYPES: [ComponentType; 3] = [
    ComponentType::SourceControl,
    ComponentType::SourceControlCopy,
    ComponentType::BinaryRepository,
];

/// Resolver over a git repository publishing one tag per component version.
///
/// A tag `libfoo/1.2` publishes version `1.2` of `libfoo`; its definition is
/// `libfoo/component.toml` in the tagged tree. Component names are read from
/// tags only, so untagged folders are invisible.
pub struct GitResolver {
    path: PathBuf,
    repo: Mutex<Repository>,
}

impl std::fmt::Debug for GitResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitResolver").field("path", &self.path).finish()
    }
}

impl GitResolver {
    /// Open the repository; failure is a connection error.
    pub fn open(path: impl AsRef<Path>) -> dep_graph::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = Repository::open(&path).map_err(|e| connection(&path, &e))?;
        Ok(Self {
            path,
            repo: Mutex::new(repo),
        })
    }

    /// Register a resolver over `path` for every version-control type.
    pub fn register(registry: &mut ResolverRegistry, path: impl Into<PathBuf>) {
        let path = path.into();
        for kind in VERSION_CONTROL_TYPES {
            let path = path.clone();
            registry.register(kind, move |_settings| {
                Ok(Box::new(GitResolver::open(&path)?) as Box<dyn Resolver>)
            });
        }
    }

    fn repo(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All `(name, version)` pairs published as tags.
    fn published(&self) -> dep_graph::Result<BTreeSet<(String, String)>> {
        let tags = self
            .repo()
            .tag_names(None)
            .map_err(|e| connection(&self.path, &e))?;
        Ok(tags
            .iter()
            .flatten()
            .filter_map(|tag| tag.split_once('/'))
            .filter(|(name, version)| !name.is_empty() && !version.is_empty())
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect())
    }
}

fn connection(path: &Path, err: &git2::Error) -> dep_graph::Error {
    dep_graph::Error::Connection {
        location: path.display().to_string(),
        reason: err.message().to_string(),
    }
}

impl Resolver for GitResolver {
    fn list_component_names(&self) -> dep_graph::Result<Vec<ComponentName>> {
        let names: BTreeSet<String> = self.published()?.into_iter().map(|(name, _)| name).collect();
        Ok(names.into_iter().map(ComponentName::from).collect())
    }

    fn list_versions(&self, name: &ComponentName) -> dep_graph::Result<Vec<ComponentVersion>> {
        Ok(self
            .published()?
            .into_iter()
            .filter(|(published, _)| published == name.as_str())
            .map(|(_, version)| ComponentVersion::from(version))
            .collect())
    }

    fn load_component_definition(
        &self,
        name: &ComponentName,
        version: &ComponentVersion,
    ) -> dep_graph::Result<Option<ComponentDefinition>> {
        let tag = format!("{name}/{version}");
        let repo = self.repo();
        let commit = match repo
            .revparse_single(&format!("refs/tags/{tag}"))
            .and_then(|object| object.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(connection(&self.path, &e)),
        };

        let definition = Path::new(name.as_str()).join(DEFINITION_FILE);
        let entry = match commit.tree().and_then(|tree| tree.get_path(&definition)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(connection(&self.path, &e)),
        };
        let blob = entry
            .to_object(&repo)
            .and_then(|object| object.peel_to_blob())
            .map_err(|e| connection(&self.path, &e))?;
        let location = format!("{}@{tag}:{}", self.path.display(), definition.display());
        let content =
            std::str::from_utf8(blob.content()).map_err(|e| dep_graph::Error::DefinitionParse {
                location: location.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(%location, "Loaded definition from git");
        ComponentDefinition::from_toml(content, &location).map(Some)
    }

    fn exists(
        &self,
        name: &ComponentName,
        version: Option<&ComponentVersion>,
    ) -> dep_graph::Result<bool> {
        Ok(self.published()?.iter().any(|(published, published_version)| {
            published == name.as_str() && version.is_none_or(|v| v.as_str() == published_version)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dep_test_utils::git::{commit_files, real_git_repo, tag};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, GitResolver) {
        let dir = TempDir::new().unwrap();
        let repo = real_git_repo(dir.path());
        let v1 = commit_files(&repo, &[("libfoo/src/a.c", "a")], &[], "libfoo 1.0");
        tag(&repo, "libfoo/1.0", v1);
        let v2 = commit_files(
            &repo,
            &[(
                "libfoo/component.toml",
                "[[dependency]]\nname = \"libbar\"\nversion = \"3.0\"\ntype = \"SourceControlCopy\"\n",
            )],
            &[],
            "libfoo 2.0",
        );
        tag(&repo, "libfoo/2.0", v2);
        tag(&repo, "libbar/3.0", v2);
        tag(&repo, "release", v2);
        let resolver = GitResolver::open(dir.path()).unwrap();
        (dir, resolver)
    }

    #[test]
    fn names_and_versions_come_from_tags() {
        let (_dir, resolver) = fixture();
        assert_eq!(
            resolver.list_component_names().unwrap(),
            vec![ComponentName::from("libbar"), ComponentName::from("libfoo")]
        );
        assert_eq!(
            resolver.list_versions(&"libfoo".into()).unwrap(),
            vec![ComponentVersion::from("1.0"), ComponentVersion::from("2.0")]
        );
        assert!(resolver.list_versions(&"nothing".into()).unwrap().is_empty());
    }

    #[test]
    fn definitions_are_read_from_the_tagged_tree() {
        let (_dir, resolver) = fixture();
        let untagged = resolver.load_component_definition(&"libfoo".into(), &"1.0".into());
        assert_eq!(untagged.unwrap(), None);

        let def = resolver
            .load_component_definition(&"libfoo".into(), &"2.0".into())
            .unwrap()
            .unwrap();
        assert_eq!(def.dependencies.len(), 1);
        assert_eq!(def.dependencies[0].name.as_str(), "libbar");
        let unknown = resolver.load_component_definition(&"libfoo".into(), &"9.9".into());
        assert_eq!(unknown.unwrap(), None);
    }

    #[test]
    fn existence_checks_report_absence_as_false() {
        let (_dir, resolver) = fixture();
        assert!(resolver.exists(&"libfoo".into(), None).unwrap());
        assert!(resolver.exists(&"libfoo".into(), Some(&"2.0".into())).unwrap());
        assert!(!resolver.exists(&"libfoo".into(), Some(&"3.0".into())).unwrap());
        assert!(!resolver.exists(&"release".into(), None).unwrap());
    }

    #[test]
    fn unopenable_repository_is_a_connection_error() {
        let dir = TempDir::new().unwrap();
        let err = GitResolver::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, dep_graph::Error::Connection { .. }));
    }
}
