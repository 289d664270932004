//! End-to-end tests of the split pipeline through the library API.
//!
//! Each test runs the orchestrator over a fixture tree in a temporary
//! directory. Build verification uses `sh` scripts in place of meson and
//! ninja, so these run offline and without a compiler.

#[allow(dead_code)]
mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{fixtures, ScrollFixture};
use scroll_split::descriptor::TreeKind;
use scroll_split::error::{Error, Result};
use scroll_split::manifest::{Manifest, RewriteRule};
use scroll_split::phases::orchestrator::{Orchestrator, RunConfig};
use scroll_split::phases::transform::transform;
use scroll_split::phases::verify::VerifyOptions;
use scroll_split::phases::{RunState, Stage, Workspace};
use scroll_split::publish::{PrReference, Publisher};
use walkdir::WalkDir;

fn version() -> semver::Version {
    semver::Version::new(1, 11, 3)
}

fn config(fixture: &ScrollFixture) -> RunConfig {
    RunConfig::new(
        fixture.manifest(),
        fixture.source(),
        Workspace::under(&fixture.workspace(), "scene-scroll"),
        version(),
    )
}

/// Every file under `root` with its bytes
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

type Calls = Arc<Mutex<Vec<(PathBuf, String, String)>>>;

/// Records what it is asked to publish
struct RecordingPublisher {
    calls: Calls,
    fail_on: Option<PathBuf>,
}

impl RecordingPublisher {
    fn new() -> (Self, Calls) {
        let calls = Calls::default();
        (
            Self {
                calls: Arc::clone(&calls),
                fail_on: None,
            },
            calls,
        )
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, tree: &Path, branch_name: &str, report_excerpt: &str) -> Result<PrReference> {
        if self.fail_on.as_deref() == Some(tree) {
            return Err(Error::Publish {
                tree: tree.to_path_buf(),
                message: "remote rejected the push".to_string(),
            });
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push((
            tree.to_path_buf(),
            branch_name.to_string(),
            report_excerpt.to_string(),
        ));
        Ok(PrReference(format!("pr-{}", calls.len())))
    }
}

#[test]
fn test_full_split_produces_both_trees() {
    let fixture = ScrollFixture::new();

    let report = Orchestrator::new(config(&fixture)).run();

    assert_eq!(report.state, RunState::Reached(Stage::Done), "{:?}", report.errors);
    assert!(report.overall_success);
    assert!(report.errors.is_empty());
    assert_eq!(report.extracted.len(), 4);
    assert!(report.verification_skipped);

    // Library tree: relocated files with rewritten includes
    let scene = fixture.read("workspace/scene-scroll/src/scene.c");
    assert!(scene.contains("#include <scene-scroll/scene.h>"));
    assert!(scene.contains("#include <scene-scroll/color.h>"));
    assert!(!scene.contains("sway/tree"));
    let header = fixture.read("workspace/scene-scroll/include/scene-scroll/scene.h");
    assert!(header.contains("#include <scene-scroll/color.h>"));

    let library_meson = fixture.read("workspace/scene-scroll/meson.build");
    assert!(library_meson.contains("version: '1.11.3'"));
    assert!(library_meson.contains("  'src/scene.c',\n  'src/color.c',"));
    assert!(library_meson.contains("'include/scene-scroll/scene.h',"));
    assert!(fixture.library().join("README.md").exists());

    // Standalone tree: no scene sources, external dependency declared
    assert!(!fixture.standalone().join("sway/tree/scene").exists());
    let sway_meson = fixture.read("workspace/scroll-standalone/sway/meson.build");
    assert!(!sway_meson.contains("scene.c"));
    assert!(!sway_meson.contains("color.c"));
    assert!(sway_meson.contains("'tree/view.c'"));
    assert!(!sway_meson.contains("subdir('tree/scene')"));
    assert!(sway_meson.contains("dependencies: [wlroots, math, scene_scroll_dep]"));

    let root_meson = fixture.read("workspace/scroll-standalone/meson.build");
    assert!(root_meson.contains("version: '1.11.3'"));
    assert!(root_meson.contains(
        "scene_scroll_dep = dependency('scene-scroll', version: '>=1.11.3', required: true)"
    ));

    let main = fixture.read("workspace/scroll-standalone/sway/main.c");
    assert!(main.contains("#include <scene-scroll/scene.h>"));
    assert!(main.contains("#include \"sway/tree/view.h\""));

    // Redirect stub at the old header path
    let redirect = fixture.read("workspace/scroll-standalone/include/sway/tree/scene.h");
    assert!(redirect.contains("#include <scene-scroll/scene.h>"));

    // The scene directory's own descriptor is outside the manifest
    assert_eq!(
        report.unexpected_files,
        vec![PathBuf::from("sway/tree/scene/meson.build")]
    );
    assert!(report.warnings.iter().any(|w| w.contains("dropped subdir")));
}

#[test]
fn test_single_file_split() {
    let temp = tempfile::TempDir::new().unwrap();
    let source = temp.path().join("src");
    fs::create_dir_all(&source).unwrap();
    fs::write(
        source.join("meson.build"),
        "project('demo', 'c')\nsrcs = files('a.c', 'main.c')\nexecutable('demo', srcs)\n",
    )
    .unwrap();
    fs::write(source.join("a.c"), "#include \"sway/x.h\"\nint a;\n").unwrap();
    fs::write(source.join("main.c"), "int main(void) { return 0; }\n").unwrap();
    let manifest = temp.path().join("manifest.yaml");
    fs::write(
        &manifest,
        r#"
library:
  name: lib
scene_files:
  implementation:
    - a.c
modifications:
  include_patterns:
    - from: '#include "sway/x.h"'
      to: '#include <lib/x.h>'
      literal: true
"#,
    )
    .unwrap();

    let workspace = Workspace::under(&temp.path().join("ws"), "lib");
    let report = Orchestrator::new(RunConfig::new(
        &manifest,
        &source,
        workspace.clone(),
        semver::Version::new(0, 2, 0),
    ))
    .run();

    assert!(report.overall_success, "{:?}", report.errors);
    let a = fs::read_to_string(workspace.library.join("a.c")).unwrap();
    assert!(a.contains("#include <lib/x.h>"));

    let standalone = fs::read_to_string(workspace.standalone.join("meson.build")).unwrap();
    assert!(!standalone.contains("'a.c'"));
    assert!(standalone.contains("'main.c'"));
    assert!(!workspace.standalone.join("a.c").exists());
}

#[test]
fn test_missing_file_aborts_before_copying() {
    let fixture = ScrollFixture::new();
    fixture.remove_source_file("sway/tree/scene/color.c");

    let report = Orchestrator::new(config(&fixture)).run();

    assert_eq!(report.state, RunState::Failed(Stage::Loaded));
    assert!(!report.overall_success);
    assert_eq!(report.missing_files.len(), 1);
    assert_eq!(
        report.missing_files[0].path,
        PathBuf::from("sway/tree/scene/color.c")
    );
    assert_eq!(report.errors.len(), 1);
    assert!(report.extracted.is_empty());
    assert!(!fixture.workspace().exists());
}

#[test]
fn test_workspace_inside_source_is_rejected() {
    let fixture = ScrollFixture::new();
    let before = snapshot(&fixture.source());
    let nested = fixture.source().join("out");
    let mut config = config(&fixture);
    config.workspace = Workspace::under(&nested, "scene-scroll");

    let report = Orchestrator::new(config).run();

    assert_eq!(report.state, RunState::Failed(Stage::Loaded));
    assert!(report.errors[0].contains("overlaps the source tree"));
    assert!(!nested.exists());
    assert_eq!(snapshot(&fixture.source()), before);
}

#[test]
fn test_standalone_tree_on_source_is_rejected() {
    let fixture = ScrollFixture::new();
    let before = snapshot(&fixture.source());
    let mut config = config(&fixture);
    config.workspace = Workspace {
        library: fixture.workspace().join("scene-scroll"),
        standalone: fixture.source(),
    };

    let report = Orchestrator::new(config).run();

    assert_eq!(report.state, RunState::Failed(Stage::Loaded));
    assert_eq!(snapshot(&fixture.source()), before);
    assert!(!fixture.workspace().exists());
}

#[test]
fn test_parent_library_name_deletes_nothing() {
    let fixture = ScrollFixture::new()
        .with_manifest(&fixtures::MANIFEST.replace("name: scene-scroll", "name: '..'"));
    fs::create_dir_all(fixture.path().join("precious")).unwrap();
    fs::write(fixture.path().join("precious/keep.txt"), "keep\n").unwrap();
    let before = snapshot(&fixture.source());
    let mut config = config(&fixture);
    config.workspace = Workspace::under(&fixture.workspace(), "..");

    let report = Orchestrator::new(config).run();

    assert_eq!(report.state, RunState::Failed(Stage::Loaded));
    assert!(report.errors[0].contains("not a valid directory name"));
    assert!(fixture.path().join("precious/keep.txt").exists());
    assert!(fixture.manifest().exists());
    assert_eq!(snapshot(&fixture.source()), before);
}

#[test]
fn test_non_utf8_source_is_reported() {
    let fixture = ScrollFixture::new();
    fs::write(
        fixture.source().join("sway/legacy.c"),
        b"/* caf\xe9 */\n#include \"sway/tree/scene.h\"\n",
    )
    .unwrap();

    let report = Orchestrator::new(config(&fixture)).run();

    assert!(report.overall_success, "{:?}", report.errors);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("sway/legacy.c is not valid UTF-8")));
    let copied = fs::read(fixture.standalone().join("sway/legacy.c")).unwrap();
    assert!(copied.ends_with(b"#include \"sway/tree/scene.h\"\n"));
}

#[test]
#[cfg(unix)]
fn test_unresolvable_dependency_fails_build_but_run_completes() {
    let fixture = ScrollFixture::new();
    let configure = r#"if grep -q "dependency('scene-scroll'" meson.build; then echo 'Run-time dependency scene-scroll found: NO (tried pkgconfig)' >&2; echo 'meson.build:14:0: ERROR: Dependency "scene-scroll" not found' >&2; exit 1; fi"#;
    let options = VerifyOptions {
        timeout: Duration::from_secs(60),
        configure: vec!["sh".into(), "-c".into(), configure.into()],
        compile: vec!["sh".into(), "-c".into(), "echo compiled".into()],
    };

    let report = Orchestrator::new(config(&fixture).verify(Some(options))).run();

    assert_eq!(report.state, RunState::Reached(Stage::Done));
    assert!(!report.overall_success);
    assert!(!report.verification_skipped);

    let builds = report.builds.as_ref().unwrap();
    let library = builds.iter().find(|b| b.tree == TreeKind::Library).unwrap();
    let standalone = builds.iter().find(|b| b.tree == TreeKind::Standalone).unwrap();
    assert!(library.success, "{}", library.log_excerpt);
    assert!(!standalone.success);
    assert!(standalone
        .log_excerpt
        .contains("Dependency \"scene-scroll\" not found"));
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("standalone build failed")));
}

#[test]
fn test_runs_are_deterministic() {
    let fixture = ScrollFixture::new();
    let first = Workspace::under(&fixture.path().join("first"), "scene-scroll");
    let second = Workspace::under(&fixture.path().join("second"), "scene-scroll");

    let mut config_a = config(&fixture);
    config_a.workspace = first.clone();
    let mut config_b = config(&fixture);
    config_b.workspace = second.clone();

    assert!(Orchestrator::new(config_a).run().overall_success);
    assert!(Orchestrator::new(config_b).run().overall_success);

    assert_eq!(snapshot(&first.library), snapshot(&second.library));
    assert_eq!(snapshot(&first.standalone), snapshot(&second.standalone));
}

#[test]
fn test_rerun_into_same_workspace() {
    let fixture = ScrollFixture::new();

    assert!(Orchestrator::new(config(&fixture)).run().overall_success);
    let library = snapshot(&fixture.library());
    let standalone = snapshot(&fixture.standalone());

    let report = Orchestrator::new(config(&fixture)).run();
    assert!(report.overall_success, "{:?}", report.errors);
    assert_eq!(snapshot(&fixture.library()), library);
    assert_eq!(snapshot(&fixture.standalone()), standalone);
}

#[test]
fn test_transformed_trees_are_fixed_points() {
    let fixture = ScrollFixture::new();
    assert!(Orchestrator::new(config(&fixture)).run().overall_success);

    let manifest = Manifest::load(fixture.manifest()).unwrap();
    let before = snapshot(&fixture.standalone());

    let library = transform(&fixture.library(), manifest.rewrite_rules()).unwrap();
    let standalone = transform(&fixture.standalone(), manifest.rewrite_rules()).unwrap();

    assert_eq!(library.total(), 0);
    assert_eq!(standalone.total(), 0);
    assert_eq!(snapshot(&fixture.standalone()), before);
}

#[test]
fn test_unmatched_rule_is_a_warning() {
    let fixture = ScrollFixture::new();
    let manifest = common::fixtures::MANIFEST.replace(
        "  file_patterns:",
        "    - from: '#include \"sway/tree/workspace_legacy.h\"'\n      to: '#include <scene-scroll/legacy.h>'\n      literal: true\n  file_patterns:",
    );
    let fixture = fixture.with_manifest(&manifest);
    assert_eq!(
        Manifest::load(fixture.manifest()).unwrap().rewrite_rules().len(),
        3
    );

    let report = Orchestrator::new(config(&fixture)).run();

    assert!(report.overall_success);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("workspace_legacy.h") && w.contains("matched nothing")));
    let legacy = report
        .rules
        .iter()
        .find(|r| r.from.contains("workspace_legacy"))
        .unwrap();
    assert_eq!(legacy.matches, 0);
}

#[test]
fn test_publishes_library_before_standalone() {
    let fixture = ScrollFixture::new();
    let (publisher, calls) = RecordingPublisher::new();

    let report = Orchestrator::with_publisher(
        config(&fixture).create_prs(true),
        Box::new(publisher),
    )
    .run();

    assert!(report.overall_success);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, fixture.library());
    assert_eq!(calls[1].0, fixture.standalone());
    assert_eq!(calls[0].1, "update-1.11.3");
    assert!(calls[0].2.contains("Automated split from Scroll 1.11.3"));
    assert!(calls[1].2.contains("Related library change: pr-1"));

    assert_eq!(report.published.len(), 2);
    assert_eq!(report.published[0].tree, TreeKind::Library);
    assert_eq!(report.published[0].reference, "pr-1");
}

#[test]
fn test_dry_run_does_not_publish() {
    let fixture = ScrollFixture::new();
    let (publisher, calls) = RecordingPublisher::new();

    let report = Orchestrator::with_publisher(
        config(&fixture).create_prs(true).dry_run(true),
        Box::new(publisher),
    )
    .run();

    assert!(report.overall_success);
    assert!(report.dry_run);
    assert!(calls.lock().unwrap().is_empty());
    assert!(report.published.is_empty());
    // The trees are still produced
    assert!(fixture.library().join("meson.build").exists());
}

#[test]
fn test_publish_failure_is_a_warning() {
    let fixture = ScrollFixture::new();
    let (mut publisher, calls) = RecordingPublisher::new();
    publisher.fail_on = Some(fixture.library());

    let report = Orchestrator::with_publisher(
        config(&fixture).create_prs(true),
        Box::new(publisher),
    )
    .run();

    assert!(report.overall_success);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("failed to publish the library tree")));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].2.contains("Related library change: not published"));
}

#[test]
fn test_custom_branch_and_report_rendering() {
    let fixture = ScrollFixture::new();
    let report = Orchestrator::new(config(&fixture).branch("scene-refresh")).run();

    assert_eq!(report.branch, "scene-refresh");
    let markdown = report.to_markdown();
    assert!(markdown.starts_with("# Scroll Split Operation Report"));
    assert!(markdown.contains("**Scroll Version**: 1.11.3"));
    assert!(markdown.contains("**Branch**: scene-refresh"));
    assert!(markdown.contains("sway/tree/scene/scene.c"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["state"]["state"], "reached");
    assert_eq!(json["state"]["stage"], "done");
    assert_eq!(json["extracted"].as_array().unwrap().len(), 4);
}

#[test]
fn test_progress_callback_sees_each_stage() {
    let fixture = ScrollFixture::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let report = Orchestrator::new(config(&fixture))
        .on_progress(move |message| sink.lock().unwrap().push(message.to_string()))
        .run();

    assert!(report.overall_success);
    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            "Loading manifest",
            "Extracting scene files",
            "Rewriting includes",
            "Generating build files",
        ]
    );
}

#[test]
fn test_rules_from_api_match_manifest() {
    // Sanity check on the fixture rules used throughout this file
    let rule = RewriteRule::pattern(
        r#"#include "sway/tree/scene/(\w+)\.h""#,
        "#include <scene-scroll/$1.h>",
    )
    .unwrap();
    let (out, n) = rule.apply(common::fixtures::VIEW_C);
    assert_eq!(n, 1);
    assert!(out.contains("#include <scene-scroll/color.h>"));
}
