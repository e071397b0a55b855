//! Git backend for Dependency Manager
//!
//! A local git repository serves version-control components: [`GitRemote`]
//! lets the sync engines read branch content at a revision, [`GitResolver`]
//! discovers components published as `<name>/<version>` tags.

pub mod error;
pub mod remote;
pub mod resolver;

pub use error::{Error, Result};
pub use remote::GitRemote;
pub use resolver::GitResolver;
