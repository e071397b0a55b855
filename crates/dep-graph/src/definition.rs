//! Component definition documents
//!
//! A definition lists the direct dependencies of one component version.
//! Definitions are stored as `component.toml`:
//!
//! ```toml
//! name = "app"
//! version = "1.0"
//!
//! [[dependency]]
//! name = "libfoo"
//! version = "2.1"
//! type = "FileShare"
//!
//! [dependency.settings]
//! FileShareRootPath = "//share/components"
//! IncludeFilter = "*.dll;*.pdb"
//! ```

use serde::{Deserialize, Serialize};

use crate::{ComponentName, ComponentType, ComponentVersion, Error, Result, Settings};

/// File name of a definition document inside a component version folder.
pub const DEFINITION_FILE: &str = "component.toml";

/// Parsed definition of one component version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ComponentName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ComponentVersion>,
    /// Settings of the defined component itself
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
    #[serde(default, rename = "dependency", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyDefinition>,
}

/// One direct dependency entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDefinition {
    pub name: ComponentName,
    pub version: ComponentVersion,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl ComponentDefinition {
    /// Parse TOML content; `location` only decorates the error.
    pub fn from_toml(content: &str, location: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::DefinitionParse {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::DefinitionParse {
            location: self
                .name
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SettingKey;

    #[test]
    fn parses_dependencies_with_settings() {
        let def = ComponentDefinition::from_toml(
            r#"
name = "app"
version = "1.0"

[[dependency]]
name = "libfoo"
version = "2.1"
type = "fileshare"

[dependency.settings]
FileShareRootPath = "//share/components"

[[dependency]]
name = "tools"
version = "C123"
type = "SourceControlCopy"
"#,
            "app/component.toml",
        )
        .unwrap();

        assert_eq!(def.name, Some(ComponentName::from("app")));
        assert_eq!(def.dependencies.len(), 2);
        assert_eq!(def.dependencies[0].kind, ComponentType::FileShare);
        assert_eq!(
            def.dependencies[0].settings.get(SettingKey::FileShareRootPath),
            Some("//share/components")
        );
        assert!(def.dependencies[1].settings.is_empty());
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let err = ComponentDefinition::from_toml(
            r#"
[[dependency]]
name = "x"
version = "1"
type = "Ftp"
"#,
            "broken.toml",
        )
        .unwrap_err();
        assert!(matches!(err, Error::DefinitionParse { .. }));
    }

    #[test]
    fn empty_document_has_no_dependencies() {
        let def = ComponentDefinition::from_toml("", "empty.toml").unwrap();
        assert!(def.dependencies.is_empty());
    }

    #[test]
    fn serialized_definition_parses_back() {
        let def = ComponentDefinition {
            name: Some("app".into()),
            version: Some("1".into()),
            settings: Settings::new(),
            dependencies: vec![DependencyDefinition {
                name: "lib".into(),
                version: "2".into(),
                kind: ComponentType::Subversion,
                settings: Settings::new().with(SettingKey::VersionSpec, "HEAD"),
            }],
        };
        let text = def.to_toml().unwrap();
        assert_eq!(ComponentDefinition::from_toml(&text, "mem").unwrap(), def);
    }
}
