//! Git repository fixtures.
//!
//! Repositories are built with `git2` only, so tests do not depend on a `git`
//! executable being installed.

use std::fs;
use std::path::Path;

/// Initialises a work-tree repository with no commits.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> git2::Repository {
    git2::Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Writes `files` into the work tree, stages everything and commits on the
/// current branch.
///
/// Files not listed keep their content; pass `remove` to delete paths in the
/// same commit. Returns the new commit id.
///
/// # Panics
/// Panics if any filesystem or git operation fails.
pub fn commit_files(
    repo: &git2::Repository,
    files: &[(&str, &str)],
    remove: &[&str],
    message: &str,
) -> git2::Oid {
    let workdir = repo
        .workdir()
        .unwrap_or_else(|| panic!("commit_files: repository is bare"));
    for (relative, content) in files {
        let path = workdir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("commit_files: create {}: {e}", parent.display()));
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("commit_files: write {}: {e}", path.display()));
    }
    for relative in remove {
        fs::remove_file(workdir.join(relative))
            .unwrap_or_else(|e| panic!("commit_files: remove {relative}: {e}"));
    }

    let mut index = repo
        .index()
        .unwrap_or_else(|e| panic!("commit_files: index: {e}"));
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .and_then(|()| index.update_all(["*"], None))
        .and_then(|()| index.write())
        .unwrap_or_else(|e| panic!("commit_files: stage: {e}"));
    let tree_id = index
        .write_tree()
        .unwrap_or_else(|e| panic!("commit_files: write tree: {e}"));
    let tree = repo
        .find_tree(tree_id)
        .unwrap_or_else(|e| panic!("commit_files: find tree: {e}"));

    let signature = git2::Signature::now("Test User", "test@test.com")
        .unwrap_or_else(|e| panic!("commit_files: signature: {e}"));
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("commit_files: commit: {e}"))
}

/// Tags `target` with a lightweight tag.
///
/// # Panics
/// Panics if the object or the tag cannot be created.
pub fn tag(repo: &git2::Repository, name: &str, target: git2::Oid) {
    let object = repo
        .find_object(target, None)
        .unwrap_or_else(|e| panic!("tag: find {target}: {e}"));
    repo.tag_lightweight(name, &object, false)
        .unwrap_or_else(|e| panic!("tag: create {name}: {e}"));
}
