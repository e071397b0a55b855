//! Filesystem primitives for Dependency Manager
//!
//! Provides forward-slash normalized relative paths, I/O operations that
//! retry transient failures, and a format-agnostic configuration store.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
