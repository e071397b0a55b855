//! Post-hoc validators over a built graph
//!
//! Validators are pure functions of a [`Graph`]: they never fail and
//! report findings as [`ValidationError`] values. An empty result means the
//! graph is valid for that validator.

mod cyclic;
mod registry;
mod side_by_side;

pub use cyclic::CyclicDependencyValidator;
pub use registry::ValidatorRegistry;
pub use side_by_side::SideBySideValidator;

use std::fmt;

use crate::{ComponentId, Graph};

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the validator that produced the finding
    pub validator: String,
    /// Human-readable description
    pub message: String,
    /// Components implicated, in the order the validator found them
    pub components: Vec<ComponentId>,
}

impl ValidationError {
    pub fn new(
        validator: impl Into<String>,
        message: impl Into<String>,
        components: Vec<ComponentId>,
    ) -> Self {
        Self {
            validator: validator.into(),
            message: message.into(),
            components,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.validator, self.message)
    }
}

/// A validator that inspects a built graph.
pub trait GraphValidator: Send + Sync {
    /// Registry name of the validator.
    fn name(&self) -> &'static str;

    /// Inspect the graph. Never fails; no findings means valid.
    fn validate(&self, graph: &Graph) -> Vec<ValidationError>;
}
