//! Sync session: drives downloaders over a flattened graph

use std::collections::BTreeSet;
use std::path::PathBuf;

use dep_graph::{Component, ComponentType, Graph, SettingKey, Settings};

use crate::{DownloaderFactory, Error, Result, Watermark, WatermarkStore};

/// Outcome of one [`SyncSession::get`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Store keys of the components that were synchronized, in graph order
    pub synced: Vec<String>,
}

/// Runs downloads for a graph and keeps the watermark store current.
///
/// The store is saved after every component, so an interrupted run can be
/// resumed or cleaned.
#[derive(Debug)]
pub struct SyncSession<'f> {
    factory: &'f DownloaderFactory,
    store: WatermarkStore,
}

impl<'f> SyncSession<'f> {
    pub fn new(factory: &'f DownloaderFactory, store: WatermarkStore) -> Self {
        Self { factory, store }
    }

    pub fn store(&self) -> &WatermarkStore {
        &self.store
    }

    pub fn into_store(self) -> WatermarkStore {
        self.store
    }

    /// Where a component's payload is read from.
    pub fn source_for(component: &Component) -> Result<String> {
        let settings = component.effective_settings();
        match component.kind() {
            ComponentType::FileShare
            | ComponentType::BuildResult
            | ComponentType::VNextBuildResult
            | ComponentType::Local => {
                let root = required(&settings, SettingKey::FileShareRootPath, component)?;
                Ok(PathBuf::from(root)
                    .join(component.name().as_str())
                    .join(component.version().as_str())
                    .to_string_lossy()
                    .into_owned())
            }
            ComponentType::SourceControl
            | ComponentType::SourceControlCopy
            | ComponentType::BinaryRepository => {
                Ok(required(&settings, SettingKey::ServerRootPath, component)?.to_string())
            }
            ComponentType::Subversion => {
                Ok(required(&settings, SettingKey::SubversionRootPath, component)?.to_string())
            }
        }
    }

    /// Where a component's payload is written to.
    pub fn destination_for(graph: &Graph, component: &Component) -> Result<PathBuf> {
        let root = graph
            .root_component_target_path()
            .ok_or_else(|| Error::configuration("graph has no root component target path"))?;
        let relative = component
            .setting(SettingKey::RelativeOutputPath)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(component.name().as_str());
        Ok(root.join(relative))
    }

    /// Download every non-root component reachable from the root.
    ///
    /// A failed download still stores what it recorded before failing, then
    /// the error is returned.
    pub fn get(&mut self, graph: &Graph, force: bool) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for component in graph.flattened(false, true) {
            let key = WatermarkStore::key(component.name().as_str(), component.version().as_str());
            let downloader = self.factory.for_component(component)?;
            let source = Self::source_for(component)?;
            let destination = Self::destination_for(graph, component)?;
            let mut watermark = self
                .store
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Watermark::new(downloader.download_type()));

            tracing::debug!(
                component = %key,
                %source,
                destination = %destination.display(),
                download_type = downloader.download_type(),
                "Synchronizing component"
            );
            let outcome = downloader.download(
                &source,
                &destination,
                &mut watermark,
                force,
                &component.effective_settings(),
            );

            self.store.insert(key.clone(), watermark);
            self.store.save()?;
            outcome?;
            report.synced.push(key);
        }
        tracing::info!(components = report.synced.len(), "Sync finished");
        Ok(report)
    }

    /// Revert every stored download and empty the store.
    ///
    /// A download may leave a folder behind because another download still
    /// has files in it. Such watermarks keep the folder recorded and are
    /// reverted again after the others, until a pass removes nothing more.
    /// Whatever remains stays in the store. Returns how many downloads were
    /// reverted.
    pub fn clean(&mut self) -> Result<usize> {
        let mut pending: Vec<String> = self.store.keys().map(str::to_string).collect();
        let mut reverted = BTreeSet::new();
        loop {
            let mut residual = Vec::new();
            let mut progressed = false;
            for key in pending {
                let Some(mut watermark) = self.store.get(&key).cloned() else {
                    continue;
                };
                let recorded = watermark.artifacts_to_clean.len();
                if !watermark.download_type.is_empty() {
                    let downloader =
                        self.factory.by_name(&watermark.download_type, &Settings::new())?;
                    if let Err(err) = downloader.revert_download(&mut watermark) {
                        self.store.insert(key, watermark);
                        self.store.save()?;
                        return Err(err);
                    }
                    reverted.insert(key.clone());
                }
                let remaining = watermark.artifacts_to_clean.len();
                progressed |= remaining < recorded;

                if remaining == 0 || watermark.download_type.is_empty() {
                    self.store.remove(&key);
                    tracing::debug!(component = %key, "Cleaned component");
                } else {
                    tracing::debug!(component = %key, remaining, "Folders still in use");
                    self.store.insert(key.clone(), watermark);
                    residual.push(key);
                }
                self.store.save()?;
            }
            if residual.is_empty() || !progressed {
                if !residual.is_empty() {
                    tracing::warn!(
                        components = residual.len(),
                        "Some folders are not empty and were left in place"
                    );
                }
                break;
            }
            pending = residual;
        }
        tracing::info!(reverted = reverted.len(), "Clean finished");
        Ok(reverted.len())
    }
}

fn required<'s>(settings: &'s Settings, key: SettingKey, component: &Component) -> Result<&'s str> {
    settings.get(key).ok_or_else(|| {
        Error::configuration(format!(
            "{} {} ({}) has no {key}",
            component.name(),
            component.version(),
            component.kind()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendClients, SyncOptions};
    use dep_graph::GraphBuilder;
    use dep_test_utils::{SourceTree, snapshot};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn factory() -> DownloaderFactory {
        DownloaderFactory::new(
            BackendClients::default(),
            SyncOptions {
                robustness: dep_fs::RobustnessConfig::no_retry(),
                ..Default::default()
            },
        )
    }

    fn graph(share: &SourceTree, target: &std::path::Path) -> Graph {
        let defaults = Settings::new().with(SettingKey::FileShareRootPath, share.root_str());
        let mut builder = GraphBuilder::new()
            .with_fallback_settings(defaults)
            .with_root_target_path(target);
        let app = builder.add_component("app", "1.0", ComponentType::Local, Settings::new());
        let lib = builder.add_component("lib", "2.0", ComponentType::FileShare, Settings::new());
        let tools = builder.add_component(
            "tools",
            "0.1",
            ComponentType::FileShare,
            Settings::new().with(SettingKey::RelativeOutputPath, "bin/tools"),
        );
        builder.add_dependency(app, lib, "2.0");
        builder.add_dependency(lib, tools, "0.1");
        builder.with_root(app).build()
    }

    fn share() -> SourceTree {
        SourceTree::new()
            .file("lib/2.0/include/lib.h", "h")
            .file("lib/2.0/lib.a", "a")
            .file("tools/0.1/run.sh", "#!/bin/sh")
    }

    #[test]
    fn get_places_each_component_and_persists_watermarks() {
        let share = share();
        let target = TempDir::new().unwrap();
        let factory = factory();
        let store_path = target.path().join(".depman/watermarks.json");
        let store =
            WatermarkStore::open(&store_path, dep_fs::RobustnessConfig::no_retry()).unwrap();
        let mut session = SyncSession::new(&factory, store);

        let report = session.get(&graph(&share, target.path()), false).unwrap();

        assert_eq!(report.synced, ["lib@2.0", "tools@0.1"]);
        assert_eq!(snapshot(&target.path().join("lib")), ["include/lib.h", "lib.a"]);
        assert_eq!(snapshot(&target.path().join("bin/tools")), ["run.sh"]);

        let reopened =
            WatermarkStore::open(&store_path, dep_fs::RobustnessConfig::no_retry()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("lib@2.0").unwrap().download_type, "FileShare");
    }

    #[test]
    fn clean_reverts_everything_and_empties_store() {
        let share = share();
        let target = TempDir::new().unwrap();
        let factory = factory();
        let store_path = target.path().join("state/watermarks.json");
        let store =
            WatermarkStore::open(&store_path, dep_fs::RobustnessConfig::no_retry()).unwrap();
        let mut session = SyncSession::new(&factory, store);
        session.get(&graph(&share, target.path()), false).unwrap();

        assert_eq!(session.clean().unwrap(), 2);

        assert!(session.store().is_empty());
        assert!(!target.path().join("lib").exists());
        assert!(!target.path().join("bin").exists());
    }

    #[test]
    fn clean_removes_folders_shared_with_a_later_download() {
        let share = SourceTree::new()
            .file("alpha/1.0/a.txt", "a")
            .file("beta/1.0/b.txt", "b");
        let target = TempDir::new().unwrap();
        let defaults = Settings::new().with(SettingKey::FileShareRootPath, share.root_str());
        let mut builder = GraphBuilder::new()
            .with_fallback_settings(defaults)
            .with_root_target_path(target.path());
        let app = builder.add_component("app", "1.0", ComponentType::Local, Settings::new());
        let alpha = builder.add_component(
            "alpha",
            "1.0",
            ComponentType::FileShare,
            Settings::new().with(SettingKey::RelativeOutputPath, "pkg"),
        );
        let beta = builder.add_component(
            "beta",
            "1.0",
            ComponentType::FileShare,
            Settings::new().with(SettingKey::RelativeOutputPath, "pkg/extra"),
        );
        builder.add_dependency(app, alpha, "1.0");
        builder.add_dependency(app, beta, "1.0");
        let graph = builder.with_root(app).build();

        let factory = factory();
        let store_path = target.path().join("state/watermarks.json");
        let store =
            WatermarkStore::open(&store_path, dep_fs::RobustnessConfig::no_retry()).unwrap();
        let mut session = SyncSession::new(&factory, store);
        session.get(&graph, false).unwrap();
        assert_eq!(snapshot(&target.path().join("pkg")), ["a.txt", "extra/b.txt"]);

        assert_eq!(session.clean().unwrap(), 2);

        assert!(!target.path().join("pkg").exists());
        assert!(session.store().is_empty());
    }

    #[test]
    fn clean_keeps_watermark_of_folder_holding_foreign_files() {
        let share = share();
        let target = TempDir::new().unwrap();
        let factory = factory();
        let store_path = target.path().join("state/watermarks.json");
        let store =
            WatermarkStore::open(&store_path, dep_fs::RobustnessConfig::no_retry()).unwrap();
        let mut session = SyncSession::new(&factory, store);
        session.get(&graph(&share, target.path()), false).unwrap();
        fs::write(target.path().join("lib/notes.txt"), "mine").unwrap();

        assert_eq!(session.clean().unwrap(), 2);

        assert_eq!(snapshot(&target.path().join("lib")), ["notes.txt"]);
        assert_eq!(session.store().keys().collect::<Vec<_>>(), ["lib@2.0"]);

        fs::remove_file(target.path().join("lib/notes.txt")).unwrap();
        assert_eq!(session.clean().unwrap(), 1);
        assert!(!target.path().join("lib").exists());
        assert!(session.store().is_empty());
    }

    #[test]
    fn missing_source_root_is_configuration_error() {
        let target = TempDir::new().unwrap();
        let mut builder = GraphBuilder::new().with_root_target_path(target.path());
        let app = builder.add_component("app", "1.0", ComponentType::Local, Settings::new());
        let lib = builder.add_component("lib", "2.0", ComponentType::FileShare, Settings::new());
        builder.add_dependency(app, lib, "2.0");
        let graph = builder.with_root(app).build();

        let err = SyncSession::source_for(graph.component(lib)).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn destination_requires_root_target_path() {
        let mut builder = GraphBuilder::new();
        let app = builder.add_component("app", "1.0", ComponentType::Local, Settings::new());
        let graph = builder.with_root(app).build();
        assert!(SyncSession::destination_for(&graph, graph.component(app)).is_err());
    }
}
