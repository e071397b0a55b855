//! Component nodes and dependency edges
//!
//! Components and dependencies live in the arenas of a [`Graph`](crate::Graph)
//! and refer to each other through [`ComponentId`] / [`DependencyId`]
//! handles. The relationships may be cyclic; the storage never is.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::settings::{SettingKey, Settings, parse_bool};
use crate::{ComponentName, ComponentVersion, Error, Result};

/// Handle of a component inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of a dependency edge inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyId(pub(crate) usize);

impl DependencyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of backing store a component comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComponentType {
    FileShare,
    BuildResult,
    SourceControl,
    SourceControlCopy,
    BinaryRepository,
    Local,
    Subversion,
    VNextBuildResult,
}

impl ComponentType {
    pub const ALL: [ComponentType; 8] = [
        Self::FileShare,
        Self::BuildResult,
        Self::SourceControl,
        Self::SourceControlCopy,
        Self::BinaryRepository,
        Self::Local,
        Self::Subversion,
        Self::VNextBuildResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileShare => "FileShare",
            Self::BuildResult => "BuildResult",
            Self::SourceControl => "SourceControl",
            Self::SourceControlCopy => "SourceControlCopy",
            Self::BinaryRepository => "BinaryRepository",
            Self::Local => "Local",
            Self::Subversion => "Subversion",
            Self::VNextBuildResult => "VNextBuildResult",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::not_found(format!("component type '{s}'")))
    }
}

impl TryFrom<String> for ComponentType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ComponentType> for String {
    fn from(kind: ComponentType) -> Self {
        kind.as_str().to_string()
    }
}

/// Logical identity of a node: two components with equal keys are the same node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentKey {
    pub name: ComponentName,
    pub version: ComponentVersion,
    pub kind: ComponentType,
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.kind)
    }
}

/// One versioned dependency node.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) key: ComponentKey,
    pub(crate) settings: Settings,
    pub(crate) fallback: Arc<Settings>,
    pub(crate) successors: Vec<DependencyId>,
    pub(crate) predecessors: Vec<DependencyId>,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &ComponentName {
        &self.key.name
    }

    pub fn version(&self) -> &ComponentVersion {
        &self.key.version
    }

    pub fn kind(&self) -> ComponentType {
        self.key.kind
    }

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// The component's own settings, without fallback.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look a setting up in the component's own settings, then in the fallback.
    pub fn setting(&self, key: SettingKey) -> Option<&str> {
        self.settings.get(key).or_else(|| self.fallback.get(key))
    }

    /// Own settings layered over the fallback mapping.
    pub fn effective_settings(&self) -> Settings {
        self.settings.merged_over(&self.fallback)
    }

    /// Outgoing edges in insertion order.
    pub fn successors(&self) -> &[DependencyId] {
        &self.successors
    }

    /// Incoming edges in insertion order.
    pub fn predecessors(&self) -> &[DependencyId] {
        &self.predecessors
    }

    /// Whether side-by-side checks should skip this component.
    pub fn ignored_in_side_by_side_checks(&self) -> bool {
        self.setting(SettingKey::IgnoreInSideBySideAnomalyChecks)
            .and_then(parse_bool)
            .unwrap_or(false)
    }

    /// Whether the payload is a set of archives to extract.
    pub fn is_compressed(&self) -> bool {
        self.setting(SettingKey::CompressedDependency)
            .and_then(parse_bool)
            .unwrap_or(false)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// A required-version link from one component to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub(crate) id: DependencyId,
    pub(crate) source: ComponentId,
    pub(crate) target: ComponentId,
    pub(crate) version: ComponentVersion,
}

impl Dependency {
    pub fn id(&self) -> DependencyId {
        self.id
    }

    pub fn source(&self) -> ComponentId {
        self.source
    }

    pub fn target(&self) -> ComponentId {
        self.target
    }

    /// The version the source requires of the target.
    pub fn version(&self) -> &ComponentVersion {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_parses_any_case() {
        assert_eq!(
            "sourcecontrolcopy".parse::<ComponentType>().unwrap(),
            ComponentType::SourceControlCopy
        );
        assert!(matches!(
            "Ftp".parse::<ComponentType>(),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn setting_falls_back_when_absent() {
        let component = Component {
            id: ComponentId(0),
            key: ComponentKey {
                name: "lib".into(),
                version: "1.0".into(),
                kind: ComponentType::FileShare,
            },
            settings: Settings::new().with(SettingKey::IncludeFilter, "*.dll"),
            fallback: Arc::new(
                Settings::new()
                    .with(SettingKey::IncludeFilter, "*")
                    .with(SettingKey::IgnoreInSideBySideAnomalyChecks, "True"),
            ),
            successors: Vec::new(),
            predecessors: Vec::new(),
        };

        assert_eq!(component.setting(SettingKey::IncludeFilter), Some("*.dll"));
        assert!(component.ignored_in_side_by_side_checks());
        assert!(!component.is_compressed());
        assert_eq!(component.to_string(), "lib@1.0 (FileShare)");
    }
}
