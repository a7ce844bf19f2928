use std::fs;
use std::path::Path;

use lcp_core::{BuildEnv, BuildOptions, LcpError, MissPolicy, ProjectLayout};
use serde_json::json;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn scaffold(root: &Path) -> ProjectLayout {
    let layout = ProjectLayout::new(root);
    write(&layout.metadata_path, r#"{"name":"pkg","version":"1.2.3"}"#);
    write(
        &layout.source_dir.join("lcp_manifest.json"),
        r#"{"name":"pkg","version":"0.0.0"}"#,
    );
    write(
        &layout.source_dir.join("a.json"),
        "{\n  \"title\": \"X {{SLOT}}\"\n}\n",
    );
    write(&layout.source_dir.join("tables.json"), r#"{"rows":[]}"#);
    write(&layout.template_dir.join("frag.html"), "\n<b>Y</b>\n");
    write(
        &layout.template_map_path(),
        r#"[{"source":"frag.html","destination":"a.json","operation":{"type":"replace","path":"/title","target":"{{SLOT}}"}}]"#,
    );
    layout
}

fn read_entry(archive: &Path, name: &str) -> serde_json::Value {
    let mut zip = zip::ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
    let entry = zip.by_name(name).unwrap();
    serde_json::from_reader(entry).unwrap()
}

#[test]
fn build_project_writes_versioned_archive() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    let out = lcp_core::build_project(
        &layout,
        &BuildEnv::ci(Some("42")),
        &BuildOptions::default(),
    )
    .unwrap();
    assert_eq!(out.version.version, "1.2.42");
    assert_eq!(out.archive_path, layout.build_dir.join("pkg_1.2.42.lcp"));
    assert_eq!(out.entries, 3);
    assert_eq!(
        read_entry(&out.archive_path, "lcp_manifest.json"),
        json!({"name": "pkg", "version": "1.2.42"})
    );
    assert!(!layout.build_dir.join("pkg_1.2.42.lcp.partial").exists());
}

#[test]
fn build_project_runs_templates() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    let out = lcp_core::build_project(
        &layout,
        &BuildEnv::local(),
        &BuildOptions {
            run_templates: true,
        },
    )
    .unwrap();
    assert_eq!(out.archive_path, layout.build_dir.join("pkg_1.2.3.lcp"));
    assert_eq!(
        read_entry(&out.archive_path, "a.json"),
        json!({"title": "X <b>Y</b>"})
    );
}

#[test]
fn build_dir_is_recreated_each_run() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    write(&layout.build_dir.join("stale.lcp"), "old");
    lcp_core::build_project(&layout, &BuildEnv::local(), &BuildOptions::default()).unwrap();
    assert!(!layout.build_dir.join("stale.lcp").exists());
    assert!(layout.build_dir.join("pkg_1.2.3.lcp").exists());
}

#[test]
fn failed_build_leaves_no_archive() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    fs::remove_file(layout.source_dir.join("lcp_manifest.json")).unwrap();
    let err = lcp_core::build_project(&layout, &BuildEnv::local(), &BuildOptions::default())
        .unwrap_err();
    assert!(matches!(err, LcpError::MissingManifest(_)));
    assert_eq!(fs::read_dir(&layout.build_dir).unwrap().count(), 0);
}

#[test]
fn strict_templates_fail_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    write(&layout.source_dir.join("a.json"), r#"{"title":"no slot"}"#);
    let env = BuildEnv::local().with_miss_policy(MissPolicy::Fail);
    let err = lcp_core::build_project(
        &layout,
        &env,
        &BuildOptions {
            run_templates: true,
        },
    )
    .unwrap_err();
    match err {
        LcpError::InFile { file, source } => {
            assert_eq!(file, "a.json");
            assert!(matches!(*source, LcpError::UnresolvedTemplate { .. }));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn build_then_extract_restores_json_sources() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    write(&layout.source_dir.join("icon.svg"), "<svg/>");
    let out = lcp_core::build_project(&layout, &BuildEnv::local(), &BuildOptions::default())
        .unwrap();

    let target = tempfile::tempdir().unwrap();
    let written = lcp_core::extract_file(&out.archive_path, target.path()).unwrap();
    assert_eq!(written, ["a.json", "lcp_manifest.json", "tables.json"]);
    for name in &written {
        let back: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(target.path().join(name)).unwrap()).unwrap();
        let orig: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(layout.source_dir.join(name)).unwrap())
                .unwrap();
        assert_eq!(back, orig);
    }
    assert!(!target.path().join("icon.svg").exists());
}

#[test]
fn verify_reports_valid_invalid_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    write(
        &layout.schema_dir.join("a.schema.json"),
        r#"{"type":"object","required":["title"],"properties":{"title":{"type":"string"}}}"#,
    );
    let report = lcp_core::verify_dir(&layout.source_dir, &layout.schema_dir).unwrap();
    assert_eq!(report.valid, ["a.json"]);
    assert_eq!(report.skipped, ["lcp_manifest.json", "tables.json"]);

    write(&layout.source_dir.join("a.json"), r#"{"title":5}"#);
    let err = lcp_core::verify_dir(&layout.source_dir, &layout.schema_dir).unwrap_err();
    assert!(matches!(err, LcpError::ValidationFailed(1)));
}

#[test]
fn verify_without_schema_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    fs::create_dir_all(&layout.schema_dir).unwrap();
    let err = lcp_core::verify_dir(&layout.source_dir, &layout.schema_dir).unwrap_err();
    assert!(matches!(err, LcpError::MissingSchema(name) if name == "a.json"));

    let missing_dir = dir.path().join("no-schemas");
    assert!(matches!(
        lcp_core::verify_dir(&layout.source_dir, &missing_dir),
        Err(LcpError::SchemaLoad { .. })
    ));
}

#[test]
fn verify_loads_only_top_level_json_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let layout = scaffold(dir.path());
    write(
        &layout.schema_dir.join("a.schema.json"),
        r#"{"type":"object","required":["title"]}"#,
    );
    write(&layout.schema_dir.join("README.md"), "not a schema {");
    write(&layout.schema_dir.join("nested").join("broken.json"), "{");
    let report = lcp_core::verify_dir(&layout.source_dir, &layout.schema_dir).unwrap();
    assert_eq!(report.valid, ["a.json"]);

    // a schema path that is not a directory cannot be listed
    let not_a_dir = dir.path().join("schemas.json");
    write(&not_a_dir, "{}");
    assert!(matches!(
        lcp_core::verify_dir(&layout.source_dir, &not_a_dir),
        Err(LcpError::SchemaLoad { .. })
    ));
}
