//! Version-control engines: item copy and workspace mapping

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dep_graph::{SettingKey, Settings};

use crate::engine::{self, Tracker};
use crate::remote::{self, RemoteFetch};
use crate::{Downloader, RemoteRepository, Result, SyncOptions, Watermark};

/// Canonical name of the version-control copy downloader.
pub const SOURCE_CONTROL_COPY: &str = "SourceControlCopy";
/// Canonical name of the version-control mapping downloader.
pub const SOURCE_CONTROL: &str = "SourceControl";

/// Tag holding the version a run resolved `VersionSpec` to.
pub const VERSION_TAG: &str = "version";
/// Prefix of the tags recording folder mappings, keyed by local path.
pub const MAPPING_TAG_PREFIX: &str = "mapping:";

/// Copies items of a version-control branch by content, in parallel.
///
/// The observed state of an item is its change id.
#[derive(Clone)]
pub struct VersionControlCopier {
    repository: Arc<dyn RemoteRepository>,
    download_type: String,
    options: SyncOptions,
}

impl std::fmt::Debug for VersionControlCopier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionControlCopier")
            .field("repository", &self.repository.name())
            .field("download_type", &self.download_type)
            .finish()
    }
}

impl VersionControlCopier {
    pub fn new(repository: Arc<dyn RemoteRepository>, options: SyncOptions) -> Self {
        Self {
            repository,
            download_type: SOURCE_CONTROL_COPY.to_string(),
            options,
        }
    }

    /// Report a different download type, e.g. for binary repositories.
    pub fn with_download_type(mut self, download_type: impl Into<String>) -> Self {
        self.download_type = download_type.into();
        self
    }
}

impl Downloader for VersionControlCopier {
    fn download_type(&self) -> &str {
        &self.download_type
    }

    fn download(
        &self,
        source: &str,
        destination: &Path,
        watermark: &mut Watermark,
        force: bool,
        settings: &Settings,
    ) -> Result<()> {
        let (filter, mappings) = remote::prepare(source, destination, settings)?;
        let spec = engine::require_setting(settings, SettingKey::VersionSpec)?;
        let version = self.repository.resolve_version(source, spec)?;

        watermark.download_type = self.download_type.clone();
        let tracker = Tracker::new(watermark);
        tracker.set_tag(VERSION_TAG, version.clone());

        let fetch = RemoteFetch {
            repository: self.repository.as_ref(),
            version: &version,
            filter: &filter,
            options: self.options,
            parallel: true,
            force,
        };
        let mut fetched = 0;
        for mapping in mappings.effective() {
            let server_path = RemoteFetch::server_path(source, &mapping);
            let local = mapping.local_offset.under(destination);
            fetched += fetch.run(&server_path, &local, &tracker)?;
        }

        tracing::info!(
            source,
            %version,
            destination = %destination.display(),
            fetched,
            "Version control copy finished"
        );
        Ok(())
    }

    fn revert_download(&self, watermark: &mut Watermark) -> Result<()> {
        let removed = engine::revert_artifacts(watermark, self.options.robustness)?;
        watermark.tags.remove(VERSION_TAG);
        tracing::info!(removed, download_type = %self.download_type, "Reverted download");
        Ok(())
    }
}

/// Maps local folders to server folders of a workspace, then fetches
/// sequentially. Reverting removes the mappings again.
#[derive(Clone)]
pub struct VersionControlMapper {
    repository: Arc<dyn RemoteRepository>,
    options: SyncOptions,
}

impl std::fmt::Debug for VersionControlMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionControlMapper")
            .field("repository", &self.repository.name())
            .finish()
    }
}

impl VersionControlMapper {
    pub fn new(repository: Arc<dyn RemoteRepository>, options: SyncOptions) -> Self {
        Self {
            repository,
            options,
        }
    }
}

impl Downloader for VersionControlMapper {
    fn download_type(&self) -> &str {
        SOURCE_CONTROL
    }

    fn download(
        &self,
        source: &str,
        destination: &Path,
        watermark: &mut Watermark,
        force: bool,
        settings: &Settings,
    ) -> Result<()> {
        let (filter, mappings) = remote::prepare(source, destination, settings)?;
        let spec = engine::require_setting(settings, SettingKey::VersionSpec)?;
        let version = self.repository.resolve_version(source, spec)?;

        watermark.download_type = SOURCE_CONTROL.to_string();
        let tracker = Tracker::new(watermark);
        tracker.set_tag(VERSION_TAG, version.clone());

        let fetch = RemoteFetch {
            repository: self.repository.as_ref(),
            version: &version,
            filter: &filter,
            options: self.options,
            parallel: false,
            force,
        };
        let mut fetched = 0;
        for mapping in mappings.effective() {
            let server_path = RemoteFetch::server_path(source, &mapping);
            let local = mapping.local_offset.under(destination);
            self.repository.map_folder(&server_path, &local)?;
            tracker.set_tag(
                format!("{MAPPING_TAG_PREFIX}{}", Watermark::key_for(&local)),
                server_path.clone(),
            );
            fetched += fetch.run(&server_path, &local, &tracker)?;
        }

        tracing::info!(
            source,
            %version,
            destination = %destination.display(),
            fetched,
            "Version control mapping finished"
        );
        Ok(())
    }

    fn revert_download(&self, watermark: &mut Watermark) -> Result<()> {
        let mapped: Vec<String> = watermark
            .tags
            .keys()
            .filter(|tag| tag.starts_with(MAPPING_TAG_PREFIX))
            .cloned()
            .collect();
        for tag in mapped {
            let local = PathBuf::from(&tag[MAPPING_TAG_PREFIX.len()..]);
            self.repository.unmap_folder(&local)?;
            watermark.tags.remove(&tag);
            tracing::debug!(local = %local.display(), "Unmapped folder");
        }

        let removed = engine::revert_artifacts(watermark, self.options.robustness)?;
        watermark.tags.remove(VERSION_TAG);
        tracing::info!(removed, download_type = SOURCE_CONTROL, "Reverted download");
        Ok(())
    }
}
