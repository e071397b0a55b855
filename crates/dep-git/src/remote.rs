//! [`RemoteRepository`] over a local git repository

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dep_sync::{RemoteItem, RemoteRepository};
use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};

use crate::{Error, Result};

/// Version specs that mean "tip of the current branch".
const LATEST_ALIASES: &[&str] = &["T", "HEAD", "latest"];

/// Reads branch content of a git repository at a revision.
///
/// Server paths are `/`-separated paths inside the repository tree; the empty
/// path is the tree root. A version is any revspec git understands (commit
/// id, branch, tag); `T` and `latest` mean `HEAD`. Change ids are blob ids, so
/// a file is fetched again only when its content changed.
///
/// Folder mappings are kept in memory for the lifetime of the client.
pub struct GitRemote {
    path: PathBuf,
    repo: Mutex<Repository>,
    mappings: Mutex<BTreeMap<PathBuf, String>>,
}

impl std::fmt::Debug for GitRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRemote").field("path", &self.path).finish()
    }
}

impl GitRemote {
    /// Open the repository at `path` (work tree or bare).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = Repository::open(&path)?;
        tracing::debug!(path = %path.display(), "Opened git repository");
        Ok(Self {
            path,
            repo: Mutex::new(repo),
            mappings: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active folder mappings as `(server path, local path)`.
    pub fn mappings(&self) -> Vec<(String, PathBuf)> {
        self.lock_mappings()
            .iter()
            .map(|(local, server)| (server.clone(), local.clone()))
            .collect()
    }

    fn repo(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mappings(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.mappings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn items(&self, path: &str, version: &str) -> Result<Vec<RemoteItem>> {
        let repo = self.repo();
        let commit = find_commit(&repo, version)?;
        let path = trim(path);
        let tree = if path.is_empty() {
            commit.tree()?
        } else {
            let entry = commit
                .tree()?
                .get_path(Path::new(path))
                .map_err(|e| missing(e, path, version))?;
            entry
                .to_object(&repo)?
                .into_tree()
                .map_err(|_| Error::WrongKind {
                    path: path.to_string(),
                    revision: version.to_string(),
                    expected: "folder",
                })?
        };

        let mut items = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            let Some(name) = entry.name() else {
                return TreeWalkResult::Skip;
            };
            let relative = format!("{root}{name}");
            match entry.kind() {
                Some(ObjectType::Tree) => items.push(RemoteItem::folder(relative)),
                Some(ObjectType::Blob) => {
                    items.push(RemoteItem::file(relative, entry.id().to_string()))
                }
                // Submodule commits carry no content of their own
                _ => {}
            }
            TreeWalkResult::Ok
        })?;
        Ok(items)
    }

    fn blob(&self, path: &str, version: &str) -> Result<Vec<u8>> {
        let repo = self.repo();
        let commit = find_commit(&repo, version)?;
        let path = trim(path);
        let entry = commit
            .tree()?
            .get_path(Path::new(path))
            .map_err(|e| missing(e, path, version))?;
        let blob = entry
            .to_object(&repo)?
            .into_blob()
            .map_err(|_| Error::WrongKind {
                path: path.to_string(),
                revision: version.to_string(),
                expected: "file",
            })?;
        Ok(blob.content().to_vec())
    }
}

fn trim(path: &str) -> &str {
    path.trim_matches('/')
}

fn find_commit<'r>(repo: &'r Repository, version: &str) -> Result<git2::Commit<'r>> {
    let spec = version.trim();
    let spec = if LATEST_ALIASES.iter().any(|alias| alias.eq_ignore_ascii_case(spec)) {
        "HEAD"
    } else {
        spec
    };
    repo.revparse_single(spec)
        .and_then(|object| object.peel_to_commit())
        .map_err(|e| match e.code() {
            git2::ErrorCode::NotFound
            | git2::ErrorCode::InvalidSpec
            | git2::ErrorCode::UnbornBranch => Error::RevisionNotFound {
                spec: version.to_string(),
            },
            _ => Error::Git(e),
        })
}

fn missing(err: git2::Error, path: &str, version: &str) -> Error {
    if err.code() == git2::ErrorCode::NotFound {
        Error::PathNotFound {
            path: path.to_string(),
            revision: version.to_string(),
        }
    } else {
        Error::Git(err)
    }
}

impl RemoteRepository for GitRemote {
    fn name(&self) -> &str {
        "git"
    }

    fn list_items(&self, path: &str, version: &str) -> dep_sync::Result<Vec<RemoteItem>> {
        Ok(self.items(path, version)?)
    }

    fn fetch(&self, path: &str, version: &str) -> dep_sync::Result<Vec<u8>> {
        Ok(self.blob(path, version)?)
    }

    fn resolve_version(&self, _path: &str, version: &str) -> dep_sync::Result<String> {
        let repo = self.repo();
        Ok(find_commit(&repo, version)?.id().to_string())
    }

    fn map_folder(&self, server_path: &str, local_path: &Path) -> dep_sync::Result<()> {
        self.lock_mappings()
            .insert(local_path.to_path_buf(), server_path.to_string());
        tracing::debug!(server_path, local = %local_path.display(), "Mapped folder");
        Ok(())
    }

    fn unmap_folder(&self, local_path: &Path) -> dep_sync::Result<()> {
        self.lock_mappings().remove(local_path);
        Ok(())
    }
}
