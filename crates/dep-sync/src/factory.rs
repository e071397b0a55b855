//! Downloader selection by component type or by name

use std::collections::HashMap;
use std::sync::Arc;

use dep_graph::{Component, ComponentType, SettingKey, Settings};

use crate::{
    ArchiveDownloader, Downloader, Error, FileShareCopier, RemoteRepository, Result,
    SubversionDownloader, SyncOptions, VersionControlCopier, VersionControlMapper,
};

/// Historical downloader names still found in older definition files.
const LEGACY_ALIASES: &[(&str, ComponentType)] = &[
    ("FileShareCopier", ComponentType::FileShare),
    ("Downloader_FileShare", ComponentType::FileShare),
    ("BuildDropCopier", ComponentType::BuildResult),
    ("SourceControlMapper", ComponentType::SourceControl),
    ("SourceControlCopier", ComponentType::SourceControlCopy),
    ("BinaryRepositoryCopier", ComponentType::BinaryRepository),
    ("SvnDownloader", ComponentType::Subversion),
    ("VNextBuildDownloader", ComponentType::VNextBuildResult),
];

/// Backend clients the remote engines talk to.
#[derive(Clone, Default)]
pub struct BackendClients {
    pub version_control: Option<Arc<dyn RemoteRepository>>,
    pub subversion: Option<Arc<dyn RemoteRepository>>,
}

impl std::fmt::Debug for BackendClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClients")
            .field("version_control", &self.version_control.as_ref().map(|c| c.name().to_string()))
            .field("subversion", &self.subversion.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl BackendClients {
    pub fn with_version_control(mut self, client: Arc<dyn RemoteRepository>) -> Self {
        self.version_control = Some(client);
        self
    }

    pub fn with_subversion(mut self, client: Arc<dyn RemoteRepository>) -> Self {
        self.subversion = Some(client);
        self
    }
}

/// Builds the downloader for a component.
///
/// Built once at startup and passed to whatever needs it.
#[derive(Debug, Clone)]
pub struct DownloaderFactory {
    clients: BackendClients,
    options: SyncOptions,
    aliases: HashMap<String, ComponentType>,
}

impl DownloaderFactory {
    pub fn new(clients: BackendClients, options: SyncOptions) -> Self {
        let aliases = LEGACY_ALIASES
            .iter()
            .map(|(name, kind)| (name.to_ascii_lowercase(), *kind))
            .collect();
        Self {
            clients,
            options,
            aliases,
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Downloader for a graph node, chosen by its type and wrapped for
    /// archive extraction when the node is compressed.
    pub fn for_component(&self, component: &Component) -> Result<Arc<dyn Downloader>> {
        self.for_type(component.kind(), &component.effective_settings())
    }

    /// Downloader for a component type with the given settings.
    pub fn for_type(
        &self,
        kind: ComponentType,
        settings: &Settings,
    ) -> Result<Arc<dyn Downloader>> {
        let engine = self.engine(kind)?;
        self.decorate(engine, settings)
    }

    /// Downloader by canonical type name or legacy alias.
    ///
    /// # Errors
    ///
    /// `NotFound` when the name is neither a component type nor an alias.
    pub fn by_name(&self, name: &str, settings: &Settings) -> Result<Arc<dyn Downloader>> {
        let kind = match name.parse::<ComponentType>() {
            Ok(kind) => kind,
            Err(_) => *self
                .aliases
                .get(&name.trim().to_ascii_lowercase())
                .ok_or_else(|| Error::not_found(format!("downloader '{name}'")))?,
        };
        self.for_type(kind, settings)
    }

    fn engine(&self, kind: ComponentType) -> Result<Arc<dyn Downloader>> {
        let engine: Arc<dyn Downloader> = match kind {
            ComponentType::FileShare
            | ComponentType::BuildResult
            | ComponentType::VNextBuildResult
            | ComponentType::Local => {
                Arc::new(FileShareCopier::new(self.options).with_download_type(kind.as_str()))
            }
            ComponentType::SourceControlCopy | ComponentType::BinaryRepository => Arc::new(
                VersionControlCopier::new(self.version_control(kind)?, self.options)
                    .with_download_type(kind.as_str()),
            ),
            ComponentType::SourceControl => {
                Arc::new(VersionControlMapper::new(self.version_control(kind)?, self.options))
            }
            ComponentType::Subversion => {
                let client = self.clients.subversion.clone().ok_or_else(|| {
                    Error::configuration("no Subversion client is configured")
                })?;
                Arc::new(SubversionDownloader::new(client, self.options))
            }
        };
        Ok(engine)
    }

    fn version_control(&self, kind: ComponentType) -> Result<Arc<dyn RemoteRepository>> {
        self.clients.version_control.clone().ok_or_else(|| {
            Error::configuration(format!("no version control client is configured for {kind}"))
        })
    }

    fn decorate(
        &self,
        engine: Arc<dyn Downloader>,
        settings: &Settings,
    ) -> Result<Arc<dyn Downloader>> {
        if bool_setting(settings, SettingKey::CompressedDependency)? != Some(true) {
            return Ok(engine);
        }
        let delete_archives = bool_setting(settings, SettingKey::DeleteArchiveFiles)?
            .ok_or_else(|| {
                Error::configuration(format!(
                    "{} requires {}",
                    SettingKey::CompressedDependency,
                    SettingKey::DeleteArchiveFiles
                ))
            })?;
        Ok(Arc::new(ArchiveDownloader::new(engine, delete_archives, self.options)))
    }
}

fn bool_setting(settings: &Settings, key: SettingKey) -> Result<Option<bool>> {
    match settings.get(key) {
        None => Ok(None),
        Some(raw) => dep_graph::parse_bool(raw)
            .map(Some)
            .ok_or_else(|| Error::configuration(format!("{key} has non-boolean value '{raw}'"))),
    }
}
