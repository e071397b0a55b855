//! Name-keyed registry of graph validators.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{CyclicDependencyValidator, GraphValidator, SideBySideValidator, ValidationError};
use crate::{Error, Graph, Result};

/// Historical names still found in older definition files.
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("CircularDependencyValidator", CyclicDependencyValidator::NAME),
    ("SideBySideAnomalyValidator", SideBySideValidator::NAME),
];

/// Registry of validators keyed by name.
///
/// Built once at startup and passed to whatever needs it.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Arc<dyn GraphValidator>>,
    aliases: HashMap<String, String>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.names())
            .finish()
    }
}

impl ValidatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding both built-in validators and their legacy aliases.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CyclicDependencyValidator));
        registry.register(Arc::new(SideBySideValidator));
        for (alias, canonical) in LEGACY_ALIASES {
            registry.aliases.insert(alias.to_string(), canonical.to_string());
        }
        registry
    }

    /// Register a validator under its own name, replacing any previous one.
    ///
    /// Returns the replaced validator.
    pub fn register(
        &mut self,
        validator: Arc<dyn GraphValidator>,
    ) -> Option<Arc<dyn GraphValidator>> {
        let name = validator.name().to_string();
        self.register_as(name, validator)
    }

    /// Register a validator under an explicit name, replacing any previous one.
    pub fn register_as(
        &mut self,
        name: impl Into<String>,
        validator: Arc<dyn GraphValidator>,
    ) -> Option<Arc<dyn GraphValidator>> {
        self.validators.insert(name.into(), validator)
    }

    /// Look a validator up by name or legacy alias.
    pub fn get(&self, name: &str) -> Result<Arc<dyn GraphValidator>> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.validators
            .get(canonical)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("validator '{name}'")))
    }

    /// All registered validators in name order.
    pub fn all(&self) -> Vec<Arc<dyn GraphValidator>> {
        self.validators.values().cloned().collect()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    /// Run every registered validator and concatenate the findings.
    pub fn validate(&self, graph: &Graph) -> Vec<ValidationError> {
        self.validators
            .values()
            .flat_map(|validator| validator.validate(graph))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
