//! Archive-extraction decorator over any downloader
//!
//! A compressed dependency is downloaded in four phases:
//!
//! 1. the wrapped downloader fetches into a private staging folder, without
//!    folder mappings and against a scratch watermark;
//! 2. every archive found in staging is extracted in place, skipping entries
//!    whose recorded modification time is unchanged and whose destination
//!    copy still exists;
//! 3. the staging tree is moved into the destination, honoring the original
//!    folder mappings;
//! 4. the scratch download is reverted and the staging folder deleted.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use dep_fs::NormalizedPath;
use dep_graph::{SettingKey, Settings};
use flate2::read::GzDecoder;
use walkdir::WalkDir;

use crate::engine::{self, Tracker};
use crate::{
    Downloader, Error, FileShareCopier, FolderMappings, OperationType, Result, SyncOptions,
    Watermark,
};

/// Prefix of the watermark keys tracking archive entries.
pub const ARCHIVE_KEY_PREFIX: &str = "archive:";

/// Archive formats recognized in staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Detect the format from a file name, case-insensitively.
    pub fn detect(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Where an extracted entry ends up and how it is tracked.
struct EntryPlan {
    key: String,
    final_destination: PathBuf,
}

/// Per-run inputs of the extraction phase.
struct Extraction<'a> {
    staging: &'a Path,
    destination: &'a Path,
    mappings: &'a FolderMappings,
    force: bool,
}

impl Extraction<'_> {
    /// Plan one entry of `archive`, or `None` when no mapping relocates it.
    fn plan(&self, archive: &NormalizedPath, entry: &NormalizedPath) -> Option<EntryPlan> {
        let folder = archive.parent().unwrap_or_default();
        let staged = entry.components().fold(folder, |acc, s| acc.join(s));
        let mapped = self.mappings.map_relative(&staged)?;
        Some(EntryPlan {
            key: format!("{ARCHIVE_KEY_PREFIX}{archive}/{entry}"),
            final_destination: mapped.under(self.destination),
        })
    }

    /// Whether the entry must be extracted again.
    fn is_needed(&self, plan: &EntryPlan, state: &str, watermark: &Watermark) -> bool {
        engine::needs_fetch(
            watermark.state(&plan.key),
            state,
            &plan.final_destination,
            self.force,
        )
    }
}

/// Wraps a downloader whose payload is a set of archives.
#[derive(Clone)]
pub struct ArchiveDownloader {
    inner: Arc<dyn Downloader>,
    delete_archives: bool,
    options: SyncOptions,
}

impl std::fmt::Debug for ArchiveDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveDownloader")
            .field("inner", &self.inner.download_type())
            .field("delete_archives", &self.delete_archives)
            .finish()
    }
}

impl ArchiveDownloader {
    pub fn new(inner: Arc<dyn Downloader>, delete_archives: bool, options: SyncOptions) -> Self {
        Self {
            inner,
            delete_archives,
            options,
        }
    }

    pub fn inner(&self) -> &Arc<dyn Downloader> {
        &self.inner
    }

    pub fn deletes_archives(&self) -> bool {
        self.delete_archives
    }

    /// Extract every archive below staging; returns the archive paths.
    fn extract_all(
        &self,
        extraction: &Extraction<'_>,
        extractor: Option<&Path>,
        watermark: &mut Watermark,
    ) -> Result<Vec<PathBuf>> {
        let mut archives = Vec::new();
        for entry in WalkDir::new(extraction.staging).sort_by_file_name() {
            let entry = entry.map_err(|e| engine::walk_error(extraction.staging, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if let Some(kind) = ArchiveKind::detect(&name) {
                archives.push((entry.path().to_path_buf(), kind));
            }
        }

        for (archive, kind) in &archives {
            let Some(relative) = NormalizedPath::relative_to(extraction.staging, archive) else {
                continue;
            };
            let target = archive.parent().unwrap_or(extraction.staging);
            let extracted = match (extractor, kind) {
                (Some(tool), _) => {
                    extract_with_tool(tool, archive, target, &relative, extraction, watermark)?
                }
                (None, ArchiveKind::TarGz) => {
                    extract_tar_gz(archive, target, &relative, extraction, watermark)?
                }
                (None, ArchiveKind::Zip) => {
                    return Err(Error::archive(
                        archive,
                        "zip archives need ArchiveExtractorPath to be configured",
                    ));
                }
            };
            tracing::debug!(archive = %relative, extracted, "Extracted archive");
        }

        Ok(archives.into_iter().map(|(path, _)| path).collect())
    }
}

/// Extract a gzip tarball with the built-in reader.
fn extract_tar_gz(
    archive_path: &Path,
    target: &Path,
    relative: &NormalizedPath,
    extraction: &Extraction<'_>,
    watermark: &mut Watermark,
) -> Result<usize> {
    let corrupt = |e: std::io::Error| Error::archive(archive_path, e.to_string());
    let file = File::open(archive_path).map_err(|e| dep_fs::Error::io(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_mtime(true);

    let mut extracted = 0;
    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        if !entry.header().entry_type().is_file() {
            entry.unpack_in(target).map_err(corrupt)?;
            continue;
        }
        let entry_path = NormalizedPath::new(entry.path().map_err(corrupt)?);
        let Some(plan) = extraction.plan(relative, &entry_path) else {
            continue;
        };
        let state = entry.header().mtime().map_err(corrupt)?.to_string();
        if !extraction.is_needed(&plan, &state, watermark) {
            tracing::debug!(entry = %entry_path, "Archive entry unchanged, skipping");
            continue;
        }
        if !entry.unpack_in(target).map_err(corrupt)? {
            tracing::warn!(entry = %entry_path, "Archive entry escapes its folder, skipped");
            continue;
        }
        watermark.update_state(plan.key, state);
        extracted += 1;
    }
    Ok(extracted)
}

/// Extract through an external bsdtar-compatible tool.
///
/// The `-v` listing names one extracted path per line, optionally prefixed
/// with `x `. bsdtar writes it to stderr and other tools to stdout, so both
/// streams are read. Entries that turn out unchanged are removed from
/// staging again.
fn extract_with_tool(
    tool: &Path,
    archive_path: &Path,
    target: &Path,
    relative: &NormalizedPath,
    extraction: &Extraction<'_>,
    watermark: &mut Watermark,
) -> Result<usize> {
    let mut child = Command::new(tool)
        .arg("-x")
        .arg("-v")
        .arg("-f")
        .arg(archive_path)
        .arg("-C")
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::archive(archive_path, format!("cannot run {}: {e}", tool.display())))?;

    let stderr = child.stderr.take();
    let stderr_reader = std::thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut text);
        }
        text
    });

    let mut listing = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            listing.push(line.map_err(|e| Error::archive(archive_path, e.to_string()))?);
        }
    }

    let status = child.wait().map_err(|e| dep_fs::Error::io(tool, e))?;
    let stderr = stderr_reader.join().unwrap_or_default();
    if !status.success() {
        return Err(Error::archive(
            archive_path,
            format!("{} exited with {status}: {}", tool.display(), stderr.trim()),
        ));
    }

    let reported: BTreeSet<NormalizedPath> = listing
        .iter()
        .map(String::as_str)
        .chain(stderr.lines())
        .filter_map(listed_entry)
        .collect();

    let mut extracted = 0;
    for entry_path in reported {
        let staged = entry_path.under(target);
        if !staged.is_file() {
            continue;
        }
        let Some(plan) = extraction.plan(relative, &entry_path) else {
            continue;
        };
        let state = engine::timestamp_state(&staged)?;
        if !extraction.is_needed(&plan, &state, watermark) {
            fs::remove_file(&staged).map_err(|e| dep_fs::Error::io(&staged, e))?;
            continue;
        }
        watermark.update_state(plan.key, state);
        extracted += 1;
    }
    Ok(extracted)
}

/// Entry path named by one listing line, if it names a file.
fn listed_entry(line: &str) -> Option<NormalizedPath> {
    let line = line.trim();
    let line = line.strip_prefix("x ").unwrap_or(line).trim();
    if line.is_empty() || line.ends_with('/') || line.ends_with('\\') {
        return None;
    }
    Some(NormalizedPath::new(line))
}

impl Downloader for ArchiveDownloader {
    fn download_type(&self) -> &str {
        self.inner.download_type()
    }

    fn supports_local_source(&self) -> bool {
        self.inner.supports_local_source()
    }

    fn download(
        &self,
        source: &str,
        destination: &Path,
        watermark: &mut Watermark,
        force: bool,
        settings: &Settings,
    ) -> Result<()> {
        engine::validate_endpoints(source, destination)?;
        let mappings = FolderMappings::from_settings(settings)?;
        let extractor = settings
            .get(SettingKey::ArchiveExtractorPath)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        // Staging next to the destination keeps the final moves on one device
        let staging_parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        engine::ensure_dir(staging_parent, &Tracker::new(watermark), self.options.robustness)?;
        let staging = tempfile::Builder::new()
            .prefix(".depman-staging-")
            .tempdir_in(staging_parent)
            .map_err(|e| dep_fs::Error::io(staging_parent, e))?;

        // Phase 1
        let inner_settings = settings.without(&[
            SettingKey::FolderMappings,
            SettingKey::CompressedDependency,
            SettingKey::DeleteArchiveFiles,
            SettingKey::ArchiveExtractorPath,
        ]);
        let mut scratch = Watermark::new(self.inner.download_type());
        self.inner
            .download(source, staging.path(), &mut scratch, true, &inner_settings)?;

        // Phase 2
        let extraction = Extraction {
            staging: staging.path(),
            destination,
            mappings: &mappings,
            force,
        };
        let archives = self.extract_all(&extraction, extractor.as_deref(), watermark)?;
        if self.delete_archives {
            for archive in &archives {
                fs::remove_file(archive).map_err(|e| dep_fs::Error::io(archive, e))?;
            }
        }

        // Phase 3
        let mut relocation =
            Settings::new().with(SettingKey::OperationType, OperationType::Move.as_str());
        if let Some(raw) = settings.get(SettingKey::FolderMappings) {
            relocation = relocation.with(SettingKey::FolderMappings, raw);
        }
        let staging_source = staging.path().to_string_lossy();
        if self.inner.supports_local_source() {
            self.inner
                .download(&staging_source, destination, watermark, force, &relocation)?;
        } else {
            FileShareCopier::new(self.options).download(
                &staging_source,
                destination,
                watermark,
                force,
                &relocation,
            )?;
        }
        watermark.download_type = self.inner.download_type().to_string();

        // Phase 4
        self.inner.revert_download(&mut scratch)?;
        if let Err(e) = staging.close() {
            tracing::warn!(error = %e, "Could not remove staging folder");
        }

        tracing::info!(
            source,
            destination = %destination.display(),
            archives = archives.len(),
            "Compressed dependency download finished"
        );
        Ok(())
    }

    fn revert_download(&self, watermark: &mut Watermark) -> Result<()> {
        let removed = engine::revert_artifacts(watermark, self.options.robustness)?;
        watermark
            .watermarks
            .retain(|key, _| !key.starts_with(ARCHIVE_KEY_PREFIX));
        tracing::info!(
            removed,
            download_type = self.inner.download_type(),
            "Reverted compressed download"
        );
        Ok(())
    }
}
