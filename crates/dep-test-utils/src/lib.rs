//! Shared test fixtures for the Dependency Manager workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: temporary source trees and [`snapshot`]s of directories
//! - [`tarball`]: in-memory `.tar.gz` archives
//! - [`git`]: git repositories with committed content
//! - [`workspace`]: [`TestWorkspace`] for CLI scenarios

pub mod git;
pub mod tarball;
pub mod tree;
pub mod workspace;

pub use tarball::TarballBuilder;
pub use tree::{SourceTree, snapshot};
pub use workspace::TestWorkspace;
