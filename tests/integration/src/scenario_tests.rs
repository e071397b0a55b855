//! Cross-crate scenarios: definitions on disk, graph construction,
//! validation and a full get/clean cycle over several backends.

use std::fs;
use std::sync::Arc;

use dep_fs::RobustnessConfig;
use dep_git::{GitRemote, GitResolver};
use dep_graph::{
    ComponentDefinition, CyclicDependencyValidator, GraphConstructor, GraphValidator,
    ResolverRegistry, SettingKey, Settings, SideBySideValidator, ValidatorRegistry,
};
use dep_sync::{BackendClients, DownloaderFactory, SyncOptions, SyncSession, WatermarkStore};
use dep_test_utils::git::{commit_files, real_git_repo, tag};
use dep_test_utils::{TarballBuilder, TestWorkspace, snapshot};
use pretty_assertions::assert_eq;

fn options() -> SyncOptions {
    SyncOptions {
        robustness: RobustnessConfig::no_retry(),
        max_parallel_fetches: 3,
    }
}

fn share_defaults(ws: &TestWorkspace) -> Settings {
    Settings::new().with(
        SettingKey::FileShareRootPath,
        ws.share().to_string_lossy().into_owned(),
    )
}

fn root(deps: &str) -> ComponentDefinition {
    ComponentDefinition::from_toml(&format!("name = \"app\"\nversion = \"1.0\"\n{deps}"), "root").unwrap()
}

fn dependency(name: &str, version: &str, kind: &str) -> String {
    format!("\n[[dependency]]\nname = \"{name}\"\nversion = \"{version}\"\ntype = \"{kind}\"\n")
}

#[test]
fn diamond_with_cycle_is_reported_and_synced_once_per_node() {
    let ws = TestWorkspace::new();
    ws.publish("a", "1", &[("a.txt", "a")]);
    ws.publish_definition("a", "1", &[("c", "1", "FileShare")]);
    ws.publish("b", "1", &[("b.txt", "b")]);
    ws.publish_definition("b", "1", &[("c", "1", "FileShare")]);
    ws.publish("c", "1", &[("c.txt", "c")]);
    ws.publish_definition("c", "1", &[("a", "1", "FileShare")]);

    let registry = ResolverRegistry::with_file_share();
    let definition = root(&format!(
        "{}{}",
        dependency("a", "1", "FileShare"),
        dependency("b", "1", "FileShare")
    ));
    let target = ws.root().join("out");
    let graph = GraphConstructor::new(&registry)
        .with_fallback_settings(share_defaults(&ws))
        .construct(&definition, &target)
        .unwrap();

    assert_eq!(graph.component_count(), 4);
    assert!(!graph.is_valid());
    let findings = ValidatorRegistry::with_builtins().validate(&graph);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].validator, CyclicDependencyValidator::NAME);

    let names: Vec<&str> = graph.flattened(false, true).iter().map(|c| c.name().as_str()).collect();
    assert_eq!(names, ["a", "c", "b"]);

    let factory = DownloaderFactory::new(BackendClients::default(), options());
    let store = WatermarkStore::open(ws.root().join("state/wm.json"), RobustnessConfig::no_retry()).unwrap();
    let mut session = SyncSession::new(&factory, store);
    assert_eq!(session.get(&graph, false).unwrap().synced, ["a@1", "c@1", "b@1"]);
    assert!(target.join("c/c.txt").is_file());

    assert_eq!(session.clean().unwrap(), 3);
    assert!(snapshot(&target).is_empty());
}

#[test]
fn side_by_side_opt_out_silences_the_finding() {
    let ws = TestWorkspace::new();
    ws.publish("lib", "1.0", &[]);
    ws.publish("lib", "2.0", &[]);
    ws.publish("tool", "1", &[]);
    ws.write(
        "share/tool/1/component.toml",
        &format!(
            "{}\n[dependency.settings]\nIgnoreInSideBySideAnomalyChecks = \"True\"\n",
            dependency("lib", "1.0", "FileShare")
        ),
    );
    let registry = ResolverRegistry::with_file_share();
    let definition = root(&format!(
        "{}{}",
        dependency("tool", "1", "FileShare"),
        dependency("lib", "2.0", "FileShare")
    ));

    let graph = GraphConstructor::new(&registry)
        .with_fallback_settings(share_defaults(&ws))
        .construct(&definition, ws.root())
        .unwrap();

    assert!(graph.side_by_side_dependencies().is_empty());
    assert!(SideBySideValidator.validate(&graph).is_empty());
}

#[test]
fn mixed_backends_share_one_target_and_clean_together() {
    let ws = TestWorkspace::new();
    ws.publish("headers", "1.0", &[("include/api.h", "api")]);
    let tarball = TarballBuilder::new()
        .file("bin/tool", "tool")
        .file("share/doc.txt", "doc")
        .build();
    fs::create_dir_all(ws.share().join("toolchain/5")).unwrap();
    fs::write(ws.share().join("toolchain/5/toolchain.tar.gz"), tarball).unwrap();

    let server = ws.root().join("server");
    fs::create_dir_all(&server).unwrap();
    let repo = real_git_repo(&server);
    let head = commit_files(&repo, &[("sdk/lib/sdk.a", "sdk"), ("sdk/README", "r")], &[], "sdk");
    tag(&repo, "sdk/3.1", head);

    let mut registry = ResolverRegistry::with_file_share();
    GitResolver::register(&mut registry, &server);
    let definition = root(&format!(
        "{}{}\n[dependency.settings]\nCompressedDependency = \"True\"\nDeleteArchiveFiles = \"True\"\nRelativeOutputPath = \"tools\"\n{}\n[dependency.settings]\nServerRootPath = \"sdk\"\nVersionSpec = \"sdk/3.1\"\nIncludeFilter = \"*.a\"\n",
        dependency("headers", "1.0", "FileShare"),
        dependency("toolchain", "5", "FileShare"),
        dependency("sdk", "3.1", "SourceControlCopy"),
    ));
    let target = ws.root().join("out");
    let graph = GraphConstructor::new(&registry)
        .with_fallback_settings(share_defaults(&ws))
        .construct(&definition, &target)
        .unwrap();
    assert!(graph.is_valid());

    let remote = Arc::new(GitRemote::open(&server).unwrap());
    let factory = DownloaderFactory::new(BackendClients::default().with_version_control(remote), options());
    let store_path = ws.root().join("state/wm.json");
    let store = WatermarkStore::open(&store_path, RobustnessConfig::no_retry()).unwrap();
    let mut session = SyncSession::new(&factory, store);
    session.get(&graph, false).unwrap();

    assert_eq!(
        snapshot(&target),
        [
            "headers/include/api.h",
            "sdk/lib/sdk.a",
            "tools/bin/tool",
            "tools/share/doc.txt"
        ]
    );

    // Watermarks survive across sessions; a fresh session cleans everything
    drop(session);
    let store = WatermarkStore::open(&store_path, RobustnessConfig::no_retry()).unwrap();
    assert_eq!(store.len(), 3);
    let mut session = SyncSession::new(&factory, store);
    assert_eq!(session.clean().unwrap(), 3);
    assert!(!target.exists() || snapshot(&target).is_empty());
}
