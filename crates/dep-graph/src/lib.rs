//! Component graph model for Dependency Manager
//!
//! A project's transitive dependency closure is discovered once through
//! [`Resolver`]s, stored as an arena-backed [`Graph`] and then only read:
//!
//! - **Identity**: [`ComponentName`] and [`ComponentVersion`] compare by exact value
//! - **Graph model**: [`Component`] nodes and [`Dependency`] edges addressed by handle
//! - **Flattening**: [`Graph::flattened`] yields each logical node exactly once
//! - **Validation**: cycle and side-by-side detection behind [`GraphValidator`]
//! - **Construction**: [`GraphConstructor`] expands definitions through resolvers
//!
//! # Example
//!
//! ```
//! use dep_graph::{ComponentType, GraphBuilder, Settings};
//!
//! let mut builder = GraphBuilder::new();
//! let app = builder.add_component("app", "1.0", ComponentType::Local, Settings::new());
//! let lib = builder.add_component("lib", "2.0", ComponentType::FileShare, Settings::new());
//! builder.add_dependency(app, lib, "2.0");
//! let graph = builder.with_root(app).build();
//!
//! let names: Vec<_> = graph.flattened(false, true).iter().map(|c| c.name().as_str()).collect();
//! assert_eq!(names, ["lib"]);
//! assert!(graph.circular_dependencies().is_empty());
//! ```

pub mod component;
pub mod construct;
pub mod definition;
pub mod error;
pub mod graph;
pub mod identity;
pub mod resolver;
pub mod settings;
pub mod validation;

pub use component::{Component, ComponentId, ComponentKey, ComponentType, Dependency, DependencyId};
pub use construct::GraphConstructor;
pub use definition::{ComponentDefinition, DEFINITION_FILE, DependencyDefinition};
pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder};
pub use identity::{ComponentName, ComponentVersion};
pub use resolver::{FileShareResolver, Resolver, ResolverRegistry};
pub use settings::{SettingKey, Settings, parse_bool};
pub use validation::{
    CyclicDependencyValidator, GraphValidator, SideBySideValidator, ValidationError,
    ValidatorRegistry,
};
