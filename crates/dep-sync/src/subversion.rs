//! Subversion engine

use std::path::Path;
use std::sync::Arc;

use dep_graph::{SettingKey, Settings};

use crate::engine::{self, Tracker};
use crate::remote::{self, RemoteFetch};
use crate::{Downloader, Error, RemoteRepository, Result, SyncOptions, Watermark};

/// Canonical name of the Subversion downloader.
pub const SUBVERSION: &str = "Subversion";
/// Tag holding the revision a run was pinned to.
pub const REVISION_TAG: &str = "revision";

/// Exports a Subversion tree at one revision.
///
/// `VersionSpec` is `HEAD` or a revision number. `HEAD` is resolved once per
/// run so that every item comes from the same revision. The observed state
/// of an item is its last-changed revision.
#[derive(Clone)]
pub struct SubversionDownloader {
    repository: Arc<dyn RemoteRepository>,
    options: SyncOptions,
}

impl std::fmt::Debug for SubversionDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubversionDownloader")
            .field("repository", &self.repository.name())
            .finish()
    }
}

impl SubversionDownloader {
    pub fn new(repository: Arc<dyn RemoteRepository>, options: SyncOptions) -> Self {
        Self {
            repository,
            options,
        }
    }
}

fn validate_revision(spec: &str) -> Result<&str> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("HEAD") || spec.parse::<u64>().is_ok() {
        Ok(spec)
    } else {
        Err(Error::configuration(format!(
            "Subversion revision must be HEAD or a number, got '{spec}'"
        )))
    }
}

impl Downloader for SubversionDownloader {
    fn download_type(&self) -> &str {
        SUBVERSION
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
        let spec = validate_revision(engine::require_setting(settings, SettingKey::VersionSpec)?)?;
        let revision = self.repository.resolve_version(source, spec)?;

        watermark.download_type = SUBVERSION.to_string();
        let tracker = Tracker::new(watermark);
        tracker.set_tag(REVISION_TAG, revision.clone());

        let fetch = RemoteFetch {
            repository: self.repository.as_ref(),
            version: &revision,
            filter: &filter,
            options: self.options,
            parallel: false,
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
            %revision,
            destination = %destination.display(),
            fetched,
            "Subversion export finished"
        );
        Ok(())
    }

    fn revert_download(&self, watermark: &mut Watermark) -> Result<()> {
        let removed = engine::revert_artifacts(watermark, self.options.robustness)?;
        watermark.tags.remove(REVISION_TAG);
        tracing::info!(removed, download_type = SUBVERSION, "Reverted download");
        Ok(())
    }
}
