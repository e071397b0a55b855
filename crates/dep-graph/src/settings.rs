//! Immutable settings keyed by a closed set of names

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Every setting a component definition or downloader may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SettingKey {
    /// Root folder of a file-share or build-drop store
    FileShareRootPath,
    /// Server path of a version-control folder
    ServerRootPath,
    /// Version/revision selector for version-control and Subversion stores
    VersionSpec,
    /// Repository URL of a Subversion store
    SubversionRootPath,
    BuildTeamProject,
    BuildDefinition,
    BuildNumber,
    BuildStatus,
    BuildQuality,
    BinaryTeamProject,
    /// Destination folder below the root target path
    RelativeOutputPath,
    /// `;`-separated include patterns
    IncludeFilter,
    /// `;`-separated exclude patterns
    ExcludeFilter,
    /// `sourceoffset=X,localoffset=Y` entries separated by `;`
    FolderMappings,
    /// `Copy` (default) or `Move`
    OperationType,
    IgnoreInSideBySideAnomalyChecks,
    /// Marks the payload as archives to extract
    CompressedDependency,
    DeleteArchiveFiles,
    /// Path of an external extraction tool
    ArchiveExtractorPath,
}

impl SettingKey {
    pub const ALL: [SettingKey; 19] = [
        Self::FileShareRootPath,
        Self::ServerRootPath,
        Self::VersionSpec,
        Self::SubversionRootPath,
        Self::BuildTeamProject,
        Self::BuildDefinition,
        Self::BuildNumber,
        Self::BuildStatus,
        Self::BuildQuality,
        Self::BinaryTeamProject,
        Self::RelativeOutputPath,
        Self::IncludeFilter,
        Self::ExcludeFilter,
        Self::FolderMappings,
        Self::OperationType,
        Self::IgnoreInSideBySideAnomalyChecks,
        Self::CompressedDependency,
        Self::DeleteArchiveFiles,
        Self::ArchiveExtractorPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileShareRootPath => "FileShareRootPath",
            Self::ServerRootPath => "ServerRootPath",
            Self::VersionSpec => "VersionSpec",
            Self::SubversionRootPath => "SubversionRootPath",
            Self::BuildTeamProject => "BuildTeamProject",
            Self::BuildDefinition => "BuildDefinition",
            Self::BuildNumber => "BuildNumber",
            Self::BuildStatus => "BuildStatus",
            Self::BuildQuality => "BuildQuality",
            Self::BinaryTeamProject => "BinaryTeamProject",
            Self::RelativeOutputPath => "RelativeOutputPath",
            Self::IncludeFilter => "IncludeFilter",
            Self::ExcludeFilter => "ExcludeFilter",
            Self::FolderMappings => "FolderMappings",
            Self::OperationType => "OperationType",
            Self::IgnoreInSideBySideAnomalyChecks => "IgnoreInSideBySideAnomalyChecks",
            Self::CompressedDependency => "CompressedDependency",
            Self::DeleteArchiveFiles => "DeleteArchiveFiles",
            Self::ArchiveExtractorPath => "ArchiveExtractorPath",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::configuration(format!("unknown setting '{s}'")))
    }
}

impl TryFrom<String> for SettingKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SettingKey> for String {
    fn from(key: SettingKey) -> Self {
        key.as_str().to_string()
    }
}

/// Parse a boolean setting value (`True`/`False`, any case).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Immutable mapping from [`SettingKey`] to string values.
///
/// An absent key and a key mapped to the empty string are different things.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<SettingKey, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: SettingKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    /// Return a copy without the given keys.
    pub fn without(&self, keys: &[SettingKey]) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| !keys.contains(k))
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        Self { values }
    }

    /// Layer `self` over `fallback`: own values win.
    pub fn merged_over(&self, fallback: &Settings) -> Self {
        let mut values = fallback.values.clone();
        values.extend(self.values.iter().map(|(k, v)| (*k, v.clone())));
        Self { values }
    }

    pub fn get(&self, key: SettingKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: SettingKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Read a boolean setting.
    ///
    /// Absent is `Ok(None)`; present but unparseable is a configuration error.
    pub fn get_bool(&self, key: SettingKey) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => parse_bool(raw).map(Some).ok_or_else(|| {
                Error::configuration(format!("setting {key} has non-boolean value '{raw}'"))
            }),
        }
    }

    /// Read a setting that must be present and non-empty.
    pub fn require(&self, key: SettingKey) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::configuration(format!("required setting {key} is missing"))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(SettingKey, String)> for Settings {
    fn from_iter<I: IntoIterator<Item = (SettingKey, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_case_insensitively() {
        assert_eq!(
            "includefilter".parse::<SettingKey>().unwrap(),
            SettingKey::IncludeFilter
        );
        assert!("NoSuchSetting".parse::<SettingKey>().is_err());
    }

    #[test]
    fn every_key_round_trips_through_its_name() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>().unwrap(), key);
        }
    }

    #[test]
    fn absent_differs_from_empty() {
        let settings = Settings::new().with(SettingKey::IncludeFilter, "");
        assert_eq!(settings.get(SettingKey::IncludeFilter), Some(""));
        assert_eq!(settings.get(SettingKey::ExcludeFilter), None);
        assert!(settings.require(SettingKey::IncludeFilter).is_err());
    }

    #[test]
    fn merged_over_prefers_own_values() {
        let fallback = Settings::new()
            .with(SettingKey::FileShareRootPath, "/fallback")
            .with(SettingKey::BuildQuality, "Released");
        let own = Settings::new().with(SettingKey::FileShareRootPath, "/own");

        let merged = own.merged_over(&fallback);
        assert_eq!(merged.get(SettingKey::FileShareRootPath), Some("/own"));
        assert_eq!(merged.get(SettingKey::BuildQuality), Some("Released"));
    }

    #[test]
    fn get_bool_rejects_garbage() {
        let settings = Settings::new()
            .with(SettingKey::DeleteArchiveFiles, "TRUE")
            .with(SettingKey::CompressedDependency, "yes");
        assert_eq!(settings.get_bool(SettingKey::DeleteArchiveFiles).unwrap(), Some(true));
        assert!(settings.get_bool(SettingKey::CompressedDependency).is_err());
        assert_eq!(settings.get_bool(SettingKey::OperationType).unwrap(), None);
    }

    #[test]
    fn settings_deserialize_from_toml_table() {
        let settings: Settings = toml::from_str(
            r#"
FileShareRootPath = "//share/components"
includefilter = "*.dll;*.pdb"
"#,
        )
        .unwrap();
        assert_eq!(settings.get(SettingKey::IncludeFilter), Some("*.dll;*.pdb"));
        assert_eq!(settings.len(), 2);
    }
}
