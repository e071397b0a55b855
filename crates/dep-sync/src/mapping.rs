//! Folder mappings restricting a sync to named subfolders
//!
//! `FolderMappings` is a `;`-separated list of `sourceoffset=X,localoffset=Y`
//! entries. Each entry syncs source subfolder `X` into destination subfolder
//! `Y`; folders outside every entry are left alone.

use std::fmt;

use dep_fs::NormalizedPath;
use dep_graph::{SettingKey, Settings};

use crate::{Error, Result};

/// One source-to-destination subfolder pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMapping {
    pub source_offset: NormalizedPath,
    pub local_offset: NormalizedPath,
}

impl fmt::Display for FolderMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sourceoffset={},localoffset={}",
            self.source_offset, self.local_offset
        )
    }
}

/// Parsed `FolderMappings` setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderMappings {
    entries: Vec<FolderMapping>,
}

impl FolderMappings {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let mut source = None;
            let mut local = None;
            for part in entry.split(',') {
                let (name, value) = part.split_once('=').ok_or_else(|| {
                    Error::configuration(format!("malformed folder mapping '{entry}'"))
                })?;
                let value = NormalizedPath::new(value.trim().trim_matches(['/', '\\']));
                match name.trim().to_ascii_lowercase().as_str() {
                    "sourceoffset" => source = Some(value),
                    "localoffset" => local = Some(value),
                    other => {
                        return Err(Error::configuration(format!(
                            "unknown folder mapping field '{other}' in '{entry}'"
                        )));
                    }
                }
            }
            match (source, local) {
                (Some(source_offset), Some(local_offset)) => entries.push(FolderMapping {
                    source_offset,
                    local_offset,
                }),
                _ => {
                    return Err(Error::configuration(format!(
                        "folder mapping '{entry}' needs both sourceoffset and localoffset"
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Mappings from the `FolderMappings` setting; absent means none.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings
            .get(SettingKey::FolderMappings)
            .map(Self::parse)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// The mappings a run iterates: the configured ones, or the identity
    /// mapping of the whole tree when none are configured.
    pub fn effective(&self) -> Vec<FolderMapping> {
        if self.entries.is_empty() {
            vec![FolderMapping {
                source_offset: NormalizedPath::root(),
                local_offset: NormalizedPath::root(),
            }]
        } else {
            self.entries.clone()
        }
    }

    /// Destination-relative path of a source-relative path, or `None` when
    /// no mapping covers it.
    pub fn map_relative(&self, source: &NormalizedPath) -> Option<NormalizedPath> {
        if self.entries.is_empty() {
            return Some(source.clone());
        }
        self.entries.iter().find_map(|mapping| {
            if !source.starts_with(&mapping.source_offset) {
                return None;
            }
            let remainder = source.components().skip(mapping.source_offset.depth());
            Some(remainder.fold(mapping.local_offset.clone(), |acc, segment| acc.join(segment)))
        })
    }

    pub fn entries(&self) -> &[FolderMapping] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for FolderMappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        f.write_str(&joined.join(";"))
    }
}
