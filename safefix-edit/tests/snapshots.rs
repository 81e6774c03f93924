use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use safefix_edit::SnapshotStore;
use std::fs;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    project: Utf8PathBuf,
    store: SnapshotStore,
}

fn fixture(files: &[(&str, &str)]) -> Fixture {
    let temp = TempDir::new().unwrap();
    let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let project = base.join("project");
    for (rel, content) in files {
        let p = project.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, content).unwrap();
    }
    fs::create_dir_all(&project).unwrap();
    let store = SnapshotStore::new(base.join("snapshots"), project.clone());
    Fixture {
        _temp: temp,
        project,
        store,
    }
}

fn read(root: &Utf8Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[test]
fn same_basename_in_different_dirs_gets_distinct_backups() {
    let fx = fixture(&[
        ("a/util.js", "export const a = 1;\n"),
        ("b/util.js", "export const b = 2;\n"),
    ]);
    let handle = fx
        .store
        .create(&["a/util.js".into(), "b/util.js".into()])
        .unwrap();

    let a = &handle.entries[Utf8Path::new("a/util.js")];
    let b = &handle.entries[Utf8Path::new("b/util.js")];
    assert_ne!(a.backup_path, b.backup_path);
    assert_eq!(fs::read_to_string(&a.backup_path).unwrap(), "export const a = 1;\n");
    assert_eq!(fs::read_to_string(&b.backup_path).unwrap(), "export const b = 2;\n");
    fx.store.cleanup(handle);
}

#[test]
fn restore_brings_back_original_content_and_removes_snapshot() {
    let fx = fixture(&[("src/app.js", "console.log(1);\nrun();\n")]);
    let handle = fx.store.create(&["src/app.js".into()]).unwrap();
    let dir = handle.dir.clone();

    fs::write(fx.project.join("src/app.js"), "run();\n").unwrap();
    let report = fx.store.restore(handle);

    assert!(report.is_complete());
    assert_eq!(report.restored, vec![Utf8PathBuf::from("src/app.js")]);
    assert_eq!(read(&fx.project, "src/app.js"), "console.log(1);\nrun();\n");
    assert!(!dir.exists());
}

#[test]
fn unreadable_files_are_excluded_not_fatal() {
    let fx = fixture(&[("ok.js", "debugger;\n")]);
    let handle = fx
        .store
        .create(&["ok.js".into(), "missing.js".into()])
        .unwrap();
    assert!(handle.contains(Utf8Path::new("ok.js")));
    assert!(!handle.contains(Utf8Path::new("missing.js")));
    assert_eq!(handle.excluded.len(), 1);
    assert_eq!(handle.excluded[0].0, Utf8PathBuf::from("missing.js"));
    fx.store.cleanup(handle);
}

#[test]
fn restore_reports_corrupt_backup_and_restores_the_rest() {
    let fx = fixture(&[("a.js", "a();\n"), ("b.js", "b();\n")]);
    let handle = fx.store.create(&["a.js".into(), "b.js".into()]).unwrap();
    let dir = handle.dir.clone();

    fs::write(&handle.entries[Utf8Path::new("a.js")].backup_path, "tampered").unwrap();
    assert!(!fx.store.verify(&handle));

    fs::write(fx.project.join("a.js"), "").unwrap();
    fs::write(fx.project.join("b.js"), "").unwrap();
    let report = fx.store.restore(handle);

    assert_eq!(report.restored, vec![Utf8PathBuf::from("b.js")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, Utf8PathBuf::from("a.js"));
    assert!(report.failures[0].reason.contains("corrupt"));
    assert_eq!(read(&fx.project, "b.js"), "b();\n");
    assert!(dir.exists(), "snapshot kept after a partial restore");
}

#[test]
fn verify_detects_missing_backup() {
    let fx = fixture(&[("a.js", "a();\n")]);
    let handle = fx.store.create(&["a.js".into()]).unwrap();
    assert!(fx.store.verify(&handle));
    fs::remove_file(&handle.entries[Utf8Path::new("a.js")].backup_path).unwrap();
    assert!(!fx.store.verify(&handle));
    fx.store.cleanup(handle);
}

#[test]
fn cleanup_is_idempotent() {
    let fx = fixture(&[("a.js", "a();\n")]);
    let handle = fx.store.create(&["a.js".into()]).unwrap();
    let id = handle.id.clone();
    fs::remove_dir_all(&handle.dir).unwrap();
    fx.store.cleanup(handle);
    assert!(fx.store.open(&id).is_err());
}

#[test]
fn list_open_and_gc() {
    let fx = fixture(&[("a.js", "a();\n")]);
    let handle = fx.store.create(&["a.js".into()]).unwrap();
    let id = handle.id.clone();
    drop(handle);

    let listed = fx.store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].files, 1);

    let reopened = fx.store.open(&id).unwrap();
    assert!(reopened.contains(Utf8Path::new("a.js")));
    assert!(fx.store.verify(&reopened));

    assert!(fx.store.gc(24).unwrap().is_empty());
    assert_eq!(fx.store.gc(0).unwrap(), vec![id]);
    assert!(fx.store.list().unwrap().is_empty());
}

#[test]
fn manifest_records_schema_and_hashes() {
    let fx = fixture(&[("a.js", "a();\n")]);
    let handle = fx.store.create(&["a.js".into()]).unwrap();
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(handle.dir.join("snapshot.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["schema"], "safefix.snapshot.v1");
    assert_eq!(manifest["entries"][0]["original"], "a.js");
    assert_eq!(manifest["entries"][0]["backup"], "files/a.js");
    assert_eq!(
        manifest["entries"][0]["sha256"].as_str().unwrap().len(),
        64
    );
    fx.store.cleanup(handle);
}

#[test]
fn parent_dir_target_and_same_named_inner_file_restore_independently() {
    let fx = fixture(&[("up/y.js", "inner();\n")]);
    let outside = fx.project.parent().unwrap().join("up/y.js");
    fs::create_dir_all(outside.parent().unwrap()).unwrap();
    fs::write(&outside, "outer();\n").unwrap();

    let handle = fx
        .store
        .create(&["../up/y.js".into(), "up/y.js".into()])
        .unwrap();
    let a = &handle.entries[Utf8Path::new("../up/y.js")];
    let b = &handle.entries[Utf8Path::new("up/y.js")];
    assert_ne!(a.backup_path, b.backup_path);
    assert!(fx.store.verify(&handle));

    fs::write(&outside, "MUTATED\n").unwrap();
    fs::write(fx.project.join("up/y.js"), "MUTATED\n").unwrap();
    let report = fx.store.restore(handle);

    assert!(report.is_complete(), "{:?}", report.failures);
    assert_eq!(fs::read_to_string(&outside).unwrap(), "outer();\n");
    assert_eq!(read(&fx.project, "up/y.js"), "inner();\n");
}
